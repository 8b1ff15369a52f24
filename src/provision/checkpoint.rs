//! Per-site provisioning records.
//!
//! Each site being provisioned gets `<state_dir>/<subdomain>.json`, rewritten
//! after every completed step. The record tells an operator how far a run
//! got and whether its compensating teardown succeeded.

use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use wpfleet_common::{ProvisionRecord, ProvisionStatus, ProvisionStep};

use crate::errors::ProvisionError;
use crate::provision::naming::SiteName;

#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, site: &SiteName) -> PathBuf {
        self.dir.join(format!("{}.json", site.as_str()))
    }

    /// Start a fresh record for `site`, replacing any earlier one.
    pub async fn begin(&self, site: &SiteName) -> Result<ProvisionRecord, ProvisionError> {
        let record = ProvisionRecord {
            site_id: site.as_str().to_string(),
            step: None,
            status: ProvisionStatus::InProgress,
            last_error: None,
            updated_at: Utc::now(),
        };
        self.save(&record).await?;
        Ok(record)
    }

    /// Mark `step` as completed.
    pub async fn advance(
        &self,
        record: &mut ProvisionRecord,
        step: ProvisionStep,
    ) -> Result<(), ProvisionError> {
        record.step = Some(step);
        record.updated_at = Utc::now();
        self.save(record).await
    }

    /// Close the record with a terminal status.
    pub async fn finish(
        &self,
        record: &mut ProvisionRecord,
        status: ProvisionStatus,
        last_error: Option<String>,
    ) -> Result<(), ProvisionError> {
        record.status = status;
        record.last_error = last_error;
        record.updated_at = Utc::now();
        self.save(record).await
    }

    pub async fn load(&self, site: &SiteName) -> Result<Option<ProvisionRecord>, ProvisionError> {
        let path = self.path_for(site);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ProvisionError::Checkpoint(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )));
            }
        };
        serde_json::from_slice(&bytes).map(Some).map_err(|e| {
            ProvisionError::Checkpoint(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    pub async fn remove(&self, site: &SiteName) -> Result<(), ProvisionError> {
        let path = self.path_for(site);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ProvisionError::Checkpoint(format!(
                "failed to remove {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Write through a temp file and rename so readers never see half a record.
    async fn save(&self, record: &ProvisionRecord) -> Result<(), ProvisionError> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            ProvisionError::Checkpoint(format!("failed to create {}: {}", self.dir.display(), e))
        })?;

        let path = self.dir.join(format!("{}.json", record.site_id));
        let tmp = self.dir.join(format!(".{}.json.tmp", record.site_id));
        let json = serde_json::to_vec_pretty(record)
            .map_err(|e| ProvisionError::Checkpoint(format!("failed to encode record: {}", e)))?;

        tokio::fs::write(&tmp, json).await.map_err(|e| {
            ProvisionError::Checkpoint(format!("failed to write {}: {}", tmp.display(), e))
        })?;
        tokio::fs::rename(&tmp, &path).await.map_err(|e| {
            ProvisionError::Checkpoint(format!("failed to replace {}: {}", path.display(), e))
        })
    }
}
