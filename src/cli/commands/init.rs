//! `porter init`: write a starter configuration file

use clap::Args;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const MINIMAL_TEMPLATE: &str = r#"# Porter Configuration File

[application]
log_level = "info"

[transfer]
max_concurrent_uploads = 4
upload_batch_size = 50
page_size = 100

[retry.default]
type = "exponential_backoff"
max_attempts = 5
initial_interval_ms = 1000
multiplier = 2.0
max_interval_ms = 30000

[job_store]
kind = "file"
path = "./porter-jobs"

[logging]
local_enabled = true
local_path = "./logs"
local_rotation = "daily"
local_max_size_mb = 100
"#;

const ANNOTATED_TEMPLATE: &str = r#"# Porter Configuration File
#
# Values of the form ${VAR} are read from the environment (or a .env file).
# Any setting can also be overridden with PORTER_<SECTION>_<KEY>, e.g.
# PORTER_TRANSFER_PAGE_SIZE=50.

[application]
# trace | debug | info | warn | error
log_level = "info"

[transfer]
# Uploads in flight per page, 1-64
max_concurrent_uploads = 4
# Items handed to the uploader at a time
upload_batch_size = 50
# Items per exported page
page_size = 100

# Strategy used when no mapping matches
[retry.default]
type = "exponential_backoff"   # no_retry | uniform | exponential_backoff | skip
max_attempts = 5
initial_interval_ms = 1000
multiplier = 2.0
max_interval_ms = 30000

# Mappings are tried in order; the first match wins.
# A mapping matches when every field it sets matches.

# Give up at once on media the destination rejects, but keep the job going
[[retry.mappings]]
data_type = "photos"
error_patterns = ["(?i)unsupported media type"]
strategy = { type = "skip" }

# Rate-limited service: fixed 5s delay
[[retry.mappings]]
service = "local"
error_patterns = ["(?i)rate limit"]
strategy = { type = "uniform", max_attempts = 10, interval_ms = 5000 }

[job_store]
# memory: jobs vanish on exit; file: jobs survive restarts and can be resumed
kind = "file"
path = "./porter-jobs"

[credentials]
export_token = "${PORTER_EXPORT_TOKEN}"
import_token = "${PORTER_IMPORT_TOKEN}"

[logging]
local_enabled = true
local_path = "./logs"
# daily | hourly | never
local_rotation = "daily"
local_max_size_mb = 100
"#;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// File to create
    #[arg(short, long, default_value = "porter.toml")]
    pub output: PathBuf,

    /// Include retry mappings and credential placeholders
    #[arg(long)]
    pub with_examples: bool,

    /// Replace an existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    fn template(&self) -> &'static str {
        if self.with_examples {
            ANNOTATED_TEMPLATE
        } else {
            MINIMAL_TEMPLATE
        }
    }

    /// Writes the template; exit code 2 when the file exists without `--force`
    pub async fn execute(&self) -> anyhow::Result<i32> {
        let output = self.output.display();
        tracing::info!(output = %output, with_examples = self.with_examples, "Writing starter configuration");

        if self.output.exists() && !self.force {
            println!("❌ {output} already exists (pass --force to replace it)");
            return Ok(2);
        }

        if let Err(e) = write_template(&self.output, self.template()) {
            tracing::error!(output = %output, error = %e, "Unable to write configuration");
            println!("❌ Could not write {output}: {e}");
            return Ok(5);
        }

        println!("✅ Wrote {output}");
        println!();
        println!("Then:");
        println!("  - review [transfer] and [retry] in {output}");
        println!("  - put PORTER_EXPORT_TOKEN / PORTER_IMPORT_TOKEN in .env if your services need them");
        println!("  - check the file with `porter validate-config`");
        println!("  - start a copy with `porter transfer --source <dir> --destination <dir> --data-type photos`");
        Ok(0)
    }
}

fn write_template(path: &Path, template: &str) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, template)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{parse_config, JobStoreKind};

    fn args(output: PathBuf, with_examples: bool, force: bool) -> InitArgs {
        InitArgs {
            output,
            with_examples,
            force,
        }
    }

    #[test]
    fn test_minimal_template_is_a_valid_file_store_config() {
        let config = parse_config(MINIMAL_TEMPLATE).unwrap();
        assert_eq!(config.job_store.kind, JobStoreKind::File);
        assert_eq!(config.transfer.page_size, 100);
        assert!(config.retry.mappings.is_empty());
    }

    #[test]
    fn test_annotated_template_has_mappings_and_tokens() {
        std::env::set_var("PORTER_EXPORT_TOKEN", "export-token");
        std::env::set_var("PORTER_IMPORT_TOKEN", "import-token");

        let config = parse_config(ANNOTATED_TEMPLATE).unwrap();
        assert_eq!(config.retry.mappings.len(), 2);
        assert!(config.credentials.export_token.is_some());
    }

    #[tokio::test]
    async fn test_existing_file_needs_force() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("porter.toml");
        fs::write(&output, "# existing").unwrap();

        assert_eq!(args(output.clone(), false, false).execute().await.unwrap(), 2);
        assert_eq!(fs::read_to_string(&output).unwrap(), "# existing");

        assert_eq!(args(output.clone(), false, true).execute().await.unwrap(), 0);
        assert!(fs::read_to_string(&output).unwrap().contains("[job_store]"));
    }

    #[tokio::test]
    async fn test_creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("conf").join("porter.toml");

        assert_eq!(args(output.clone(), true, false).execute().await.unwrap(), 0);
        assert!(fs::read_to_string(&output).unwrap().contains("[[retry.mappings]]"));
    }
}
