//! Retry strategy library
//!
//! Maps (data type, service, error message) to a [`RetryStrategy`]. The
//! first matching mapping wins; anything unmatched uses the default.

use super::strategy::RetryStrategy;
use crate::domain::{DataVertical, Result, ServiceId, TransferError};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// One configured mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryMapping {
    /// Restrict to one data type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<DataVertical>,

    /// Restrict to one service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,

    /// Restrict to errors whose message matches any of these patterns
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub error_patterns: Vec<String>,

    /// Strategy applied on match
    pub strategy: RetryStrategy,
}

impl RetryMapping {
    /// Mapping that applies to every error
    pub fn new(strategy: RetryStrategy) -> Self {
        Self {
            data_type: None,
            service: None,
            error_patterns: Vec::new(),
            strategy,
        }
    }

    /// Restricts the mapping to a data type
    pub fn for_data_type(mut self, data_type: DataVertical) -> Self {
        self.data_type = Some(data_type);
        self
    }

    /// Restricts the mapping to a service
    pub fn for_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Restricts the mapping to matching error messages
    pub fn matching(mut self, pattern: impl Into<String>) -> Self {
        self.error_patterns.push(pattern.into());
        self
    }
}

#[derive(Debug, Clone)]
struct CompiledMapping {
    data_type: Option<DataVertical>,
    service: Option<ServiceId>,
    patterns: Vec<Regex>,
    strategy: RetryStrategy,
}

impl CompiledMapping {
    fn applies_to(&self, data_type: DataVertical, service: &ServiceId) -> bool {
        self.data_type.map_or(true, |d| d == data_type)
            && self.service.as_ref().map_or(true, |s| s == service)
    }

    fn matches_error(&self, message: &str) -> bool {
        self.patterns.is_empty() || self.patterns.iter().any(|p| p.is_match(message))
    }
}

/// Selects retry strategies
#[derive(Debug, Clone)]
pub struct RetryStrategyLibrary {
    mappings: Vec<CompiledMapping>,
    default: RetryStrategy,
}

impl Default for RetryStrategyLibrary {
    fn default() -> Self {
        Self {
            mappings: Vec::new(),
            default: RetryStrategy::default(),
        }
    }
}

impl RetryStrategyLibrary {
    /// Builds a library from mappings and a default strategy
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a pattern does not compile, a
    /// service name is invalid, or a strategy fails validation.
    pub fn new(mappings: Vec<RetryMapping>, default: RetryStrategy) -> Result<Self> {
        default
            .validate()
            .map_err(|e| TransferError::Configuration(format!("default retry strategy: {e}")))?;

        let mut compiled = Vec::with_capacity(mappings.len());
        for (index, mapping) in mappings.into_iter().enumerate() {
            mapping.strategy.validate().map_err(|e| {
                TransferError::Configuration(format!("retry mapping #{index}: {e}"))
            })?;
            let service = mapping
                .service
                .map(ServiceId::new)
                .transpose()
                .map_err(|e| TransferError::Configuration(format!("retry mapping #{index}: {e}")))?;
            let patterns = mapping
                .error_patterns
                .iter()
                .map(|p| {
                    Regex::new(p).map_err(|e| {
                        TransferError::Configuration(format!(
                            "retry mapping #{index}: invalid pattern '{p}': {e}"
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            compiled.push(CompiledMapping {
                data_type: mapping.data_type,
                service,
                patterns,
                strategy: mapping.strategy,
            });
        }

        Ok(Self {
            mappings: compiled,
            default,
        })
    }

    /// Library that always uses one strategy
    pub fn uniform(strategy: RetryStrategy) -> Self {
        Self {
            mappings: Vec::new(),
            default: strategy,
        }
    }

    /// The fallback strategy
    pub fn default_strategy(&self) -> &RetryStrategy {
        &self.default
    }

    /// Strategy for a (data type, service) pair, ignoring error-specific mappings
    pub fn strategy_for(&self, data_type: DataVertical, service: &ServiceId) -> &RetryStrategy {
        self.mappings
            .iter()
            .find(|m| m.patterns.is_empty() && m.applies_to(data_type, service))
            .map(|m| &m.strategy)
            .unwrap_or(&self.default)
    }

    /// Strategy for a specific failure
    pub fn strategy_for_error(
        &self,
        data_type: DataVertical,
        service: &ServiceId,
        error: &TransferError,
    ) -> &RetryStrategy {
        let message = error.to_string();
        self.mappings
            .iter()
            .find(|m| m.applies_to(data_type, service) && m.matches_error(&message))
            .map(|m| &m.strategy)
            .unwrap_or(&self.default)
    }
}
