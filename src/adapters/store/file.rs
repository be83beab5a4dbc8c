//! File-backed job store
//!
//! Each job has two files under the store directory:
//!
//! - `<job_id>.json` holds the job record and its aggregates. Writes go to a
//!   temporary file that is renamed over the document.
//! - `<job_id>.records.jsonl` is an append-only log of data record writes,
//!   one `put` or `remove` per line. A record write appends a single line;
//!   the log is rewritten only when dead lines outnumber live records.
//!
//! Replayed logs are cached per job. A store-wide lock serializes every
//! mutation, so a restarted worker always sees the last completed write.

use super::memory::JobEntry;
use super::traits::{JobStore, ERROR_KEY_PREFIX, RESULT_KEY_PREFIX};
use crate::domain::{
    ErrorDetail, ItemCounts, JobId, JobProgress, Result, TransferError, TransferJob,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Logs shorter than this are never compacted
const COMPACT_MIN_LINES: usize = 256;

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum RecordOp {
    Put { key: String, value: Value },
    Remove { key: String },
}

/// Replayed state of one job's record log
#[derive(Debug, Default)]
struct RecordLog {
    live: BTreeMap<String, Value>,
    lines: usize,
}

impl RecordLog {
    fn apply(&mut self, op: RecordOp) {
        match op {
            RecordOp::Put { key, value } => {
                self.live.insert(key, value);
            }
            RecordOp::Remove { key } => {
                self.live.remove(&key);
            }
        }
        self.lines += 1;
    }

    fn needs_compaction(&self) -> bool {
        self.lines >= COMPACT_MIN_LINES && self.lines > 2 * self.live.len()
    }
}

/// Job store persisted as JSON files on disk
#[derive(Debug)]
pub struct FileJobStore {
    root: PathBuf,
    logs: Mutex<HashMap<JobId, RecordLog>>,
}

impl FileJobStore {
    /// Opens a store rooted at `root`, creating the directory if needed
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root).await.map_err(|e| {
            TransferError::Store(format!(
                "Failed to create job store directory {}: {e}",
                root.display()
            ))
        })?;
        tracing::debug!(path = %root.display(), "Opened file job store");
        Ok(Self {
            root,
            logs: Mutex::new(HashMap::new()),
        })
    }

    /// Directory holding the job files
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn document_path(&self, job_id: JobId) -> PathBuf {
        self.root.join(format!("{job_id}.json"))
    }

    fn records_path(&self, job_id: JobId) -> PathBuf {
        self.root.join(format!("{job_id}.records.jsonl"))
    }

    async fn read_entry(&self, job_id: JobId) -> Result<Option<JobEntry>> {
        let path = self.document_path(job_id);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let entry = serde_json::from_slice(&bytes).map_err(|e| {
                    TransferError::Store(format!("Corrupt job document {}: {e}", path.display()))
                })?;
                Ok(Some(entry))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(TransferError::Store(format!(
                "Failed to read job document {}: {e}",
                path.display()
            ))),
        }
    }

    async fn write_entry(&self, job_id: JobId, entry: &JobEntry) -> Result<()> {
        let path = self.document_path(job_id);
        let tmp = self.root.join(format!(".{job_id}.json.tmp"));
        let bytes = serde_json::to_vec_pretty(entry)?;
        replace_file(&tmp, &path, &bytes).await
    }

    /// Runs `f` against the job's document and writes it back
    async fn modify<T>(
        &self,
        job_id: JobId,
        f: impl FnOnce(&mut JobEntry) -> Result<T> + Send,
    ) -> Result<T> {
        let _guard = self.logs.lock().await;
        let mut entry = self.read_entry(job_id).await?.unwrap_or_default();
        let out = f(&mut entry)?;
        self.write_entry(job_id, &entry).await?;
        Ok(out)
    }

    async fn read(&self, job_id: JobId) -> Result<Option<JobEntry>> {
        let _guard = self.logs.lock().await;
        self.read_entry(job_id).await
    }

    /// Replays a job's record log from disk
    ///
    /// A trailing line that does not parse is the remains of an interrupted
    /// append. It is dropped and the log is rewritten without it.
    async fn load_records(&self, job_id: JobId) -> Result<RecordLog> {
        let path = self.records_path(job_id);
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(RecordLog::default()),
            Err(e) => {
                return Err(TransferError::Store(format!(
                    "Failed to read record log {}: {e}",
                    path.display()
                )))
            }
        };

        let mut log = RecordLog::default();
        let mut torn = false;
        {
            let mut lines = text.lines().filter(|l| !l.trim().is_empty()).peekable();
            while let Some(line) = lines.next() {
                match serde_json::from_str::<RecordOp>(line) {
                    Ok(op) => log.apply(op),
                    Err(e) if lines.peek().is_none() => {
                        tracing::warn!(job_id = %job_id, error = %e, "Dropping torn record log line");
                        torn = true;
                    }
                    Err(e) => {
                        return Err(TransferError::Store(format!(
                            "Corrupt record log {}: {e}",
                            path.display()
                        )))
                    }
                }
            }
        }
        if torn {
            self.compact(job_id, &mut log).await?;
        }
        Ok(log)
    }

    /// Cached record log for `job_id`, replayed on first use
    async fn records<'a>(
        &self,
        logs: &'a mut HashMap<JobId, RecordLog>,
        job_id: JobId,
    ) -> Result<&'a mut RecordLog> {
        if !logs.contains_key(&job_id) {
            let log = self.load_records(job_id).await?;
            logs.insert(job_id, log);
        }
        Ok(logs.entry(job_id).or_default())
    }

    /// Appends one write to the job's log, then applies it to the cache
    async fn append(&self, job_id: JobId, log: &mut RecordLog, op: RecordOp) -> Result<()> {
        let path = self.records_path(job_id);
        let mut line = serde_json::to_vec(&op)?;
        line.push(b'\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| TransferError::Store(format!("Failed to open {}: {e}", path.display())))?;
        let written = match file.write_all(&line).await {
            Ok(()) => file.flush().await,
            Err(e) => Err(e),
        };
        written.map_err(|e| {
            TransferError::Store(format!("Failed to append to {}: {e}", path.display()))
        })?;

        log.apply(op);
        if log.needs_compaction() {
            self.compact(job_id, log).await?;
        }
        Ok(())
    }

    /// Rewrites the log as one `put` per live record
    async fn compact(&self, job_id: JobId, log: &mut RecordLog) -> Result<()> {
        let mut bytes = Vec::new();
        for (key, value) in &log.live {
            let op = RecordOp::Put {
                key: key.clone(),
                value: value.clone(),
            };
            serde_json::to_writer(&mut bytes, &op)?;
            bytes.push(b'\n');
        }
        let tmp = self.root.join(format!(".{job_id}.records.jsonl.tmp"));
        replace_file(&tmp, &self.records_path(job_id), &bytes).await?;

        tracing::debug!(
            job_id = %job_id,
            before = log.lines,
            after = log.live.len(),
            "Compacted record log"
        );
        log.lines = log.live.len();
        Ok(())
    }
}

async fn replace_file(tmp: &Path, path: &Path, bytes: &[u8]) -> Result<()> {
    tokio::fs::write(tmp, bytes)
        .await
        .map_err(|e| TransferError::Store(format!("Failed to write {}: {e}", tmp.display())))?;
    tokio::fs::rename(tmp, path)
        .await
        .map_err(|e| TransferError::Store(format!("Failed to replace {}: {e}", path.display())))?;
    Ok(())
}

fn list_prefixed(live: &BTreeMap<String, Value>, prefix: &str) -> Vec<(String, Value)> {
    live.range(prefix.to_string()..)
        .take_while(|(k, _)| k.starts_with(prefix))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

#[async_trait]
impl JobStore for FileJobStore {
    async fn create_job(&self, job: &TransferJob) -> Result<()> {
        self.modify(job.id, |entry| {
            if entry.job.is_some() {
                return Err(TransferError::Store(format!(
                    "Job {} already exists",
                    job.id
                )));
            }
            entry.job = Some(job.clone());
            Ok(())
        })
        .await
    }

    async fn find_job(&self, job_id: JobId) -> Result<Option<TransferJob>> {
        Ok(self.read(job_id).await?.and_then(|e| e.job))
    }

    async fn update_job(&self, job: &TransferJob) -> Result<()> {
        let _guard = self.logs.lock().await;
        let mut entry = match self.read_entry(job.id).await? {
            Some(entry) if entry.job.is_some() => entry,
            _ => return Err(TransferError::NotFound(format!("Job {}", job.id))),
        };
        entry.job = Some(job.clone());
        self.write_entry(job.id, &entry).await
    }

    async fn list_jobs(&self) -> Result<Vec<TransferJob>> {
        let _guard = self.logs.lock().await;
        let mut dir = tokio::fs::read_dir(&self.root).await.map_err(|e| {
            TransferError::Store(format!("Failed to list {}: {e}", self.root.display()))
        })?;

        let mut jobs = Vec::new();
        while let Some(item) = dir.next_entry().await? {
            let name = item.file_name();
            let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(".json")) else {
                continue;
            };
            let Ok(job_id) = JobId::from_str(stem) else {
                continue;
            };
            if let Some(job) = self.read_entry(job_id).await?.and_then(|e| e.job) {
                jobs.push(job);
            }
        }
        jobs.sort_by_key(|j| j.created_at);
        Ok(jobs)
    }

    async fn add_counts(&self, job_id: JobId, counts: &ItemCounts) -> Result<()> {
        self.modify(job_id, |entry| {
            entry.add_counts(counts);
            Ok(())
        })
        .await
    }

    async fn add_bytes(&self, job_id: JobId, bytes: u64) -> Result<()> {
        self.modify(job_id, |entry| {
            entry.bytes += bytes;
            Ok(())
        })
        .await
    }

    async fn add_errors_to_job(&self, job_id: JobId, errors: &[ErrorDetail]) -> Result<()> {
        self.modify(job_id, |entry| {
            entry.add_errors(errors);
            Ok(())
        })
        .await
    }

    async fn job_progress(&self, job_id: JobId) -> Result<JobProgress> {
        let mut logs = self.logs.lock().await;
        let mut entry = self.read_entry(job_id).await?.unwrap_or_default();
        let log = self.records(&mut logs, job_id).await?;

        // Only error records and results that resolve explicit errors matter here
        let relevant: BTreeMap<String, Value> = log
            .live
            .iter()
            .filter(|(key, _)| {
                key.starts_with(ERROR_KEY_PREFIX)
                    || key
                        .strip_prefix(RESULT_KEY_PREFIX)
                        .is_some_and(|id| entry.errors.iter().any(|e| e.id == id))
            })
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entry.data = relevant;
        Ok(entry.progress())
    }

    async fn create_data(&self, job_id: JobId, key: &str, value: Value) -> Result<()> {
        let mut logs = self.logs.lock().await;
        let log = self.records(&mut logs, job_id).await?;
        if log.live.contains_key(key) {
            return Err(TransferError::Store(format!(
                "Data record '{key}' already exists for job {job_id}"
            )));
        }
        let op = RecordOp::Put {
            key: key.to_string(),
            value,
        };
        self.append(job_id, log, op).await
    }

    async fn update_data(&self, job_id: JobId, key: &str, value: Value) -> Result<()> {
        let mut logs = self.logs.lock().await;
        let log = self.records(&mut logs, job_id).await?;
        if !log.live.contains_key(key) {
            return Err(TransferError::NotFound(format!(
                "Data record '{key}' for job {job_id}"
            )));
        }
        let op = RecordOp::Put {
            key: key.to_string(),
            value,
        };
        self.append(job_id, log, op).await
    }

    async fn put_data(&self, job_id: JobId, key: &str, value: Value) -> Result<()> {
        let mut logs = self.logs.lock().await;
        let log = self.records(&mut logs, job_id).await?;
        let op = RecordOp::Put {
            key: key.to_string(),
            value,
        };
        self.append(job_id, log, op).await
    }

    async fn find_data(&self, job_id: JobId, key: &str) -> Result<Option<Value>> {
        let mut logs = self.logs.lock().await;
        let log = self.records(&mut logs, job_id).await?;
        Ok(log.live.get(key).cloned())
    }

    async fn remove_data(&self, job_id: JobId, key: &str) -> Result<()> {
        let mut logs = self.logs.lock().await;
        let log = self.records(&mut logs, job_id).await?;
        if !log.live.contains_key(key) {
            return Ok(());
        }
        let op = RecordOp::Remove {
            key: key.to_string(),
        };
        self.append(job_id, log, op).await
    }

    async fn list_data(&self, job_id: JobId, prefix: &str) -> Result<Vec<(String, Value)>> {
        let mut logs = self.logs.lock().await;
        let log = self.records(&mut logs, job_id).await?;
        Ok(list_prefixed(&log.live, prefix))
    }
}
