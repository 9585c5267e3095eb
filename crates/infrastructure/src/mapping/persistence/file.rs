use async_trait::async_trait;
use domainwall_application::ports::MappingPersistencePort;
use domainwall_domain::{DomainError, DomainRecord};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::fs;
use tracing::{debug, info};

use super::format::FileVersion;
use super::{v1, v2};

/// Line-oriented mapping file, written atomically through `<path>.tmp`.
pub struct FileMappingPersistence {
    path: PathBuf,
    epoch: AtomicI64,
}

impl FileMappingPersistence {
    pub fn new(path: impl Into<PathBuf>, epoch: i64) -> Self {
        Self {
            path: path.into(),
            epoch: AtomicI64::new(epoch),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }

    /// Parses file contents. Blank input means no prior knowledge.
    pub fn parse(contents: &str, epoch: i64) -> Result<Vec<DomainRecord>, DomainError> {
        let mut lines = contents.lines();
        let version = match lines.find(|line| !line.trim().is_empty()) {
            Some(line) => line.parse::<FileVersion>()?,
            None => return Ok(Vec::new()),
        };

        match version {
            FileVersion::V1 => Ok(v1::read(lines)),
            FileVersion::V2 => v2::read(lines, epoch),
        }
    }
}

#[async_trait]
impl MappingPersistencePort for FileMappingPersistence {
    async fn load(&self) -> Result<Vec<DomainRecord>, DomainError> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No persisted mappings");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(DomainError::IoError(format!(
                    "failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        let records = Self::parse(&contents, self.epoch())?;
        info!(path = %self.path.display(), records = records.len(), "Mapping file read");
        Ok(records)
    }

    async fn save(&self, records: &[DomainRecord]) -> Result<(), DomainError> {
        let contents = v2::write(self.epoch(), records)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| {
                DomainError::IoError(format!("failed to create {}: {}", parent.display(), e))
            })?;
        }

        let tmp = self.tmp_path();
        fs::write(&tmp, contents.as_bytes())
            .await
            .map_err(|e| DomainError::IoError(format!("failed to write {}: {}", tmp.display(), e)))?;
        fs::rename(&tmp, &self.path).await.map_err(|e| {
            DomainError::IoError(format!(
                "failed to rename {} to {}: {}",
                tmp.display(),
                self.path.display(),
                e
            ))
        })?;

        debug!(path = %self.path.display(), records = records.len(), "Mapping file written");
        Ok(())
    }

    fn epoch(&self) -> i64 {
        self.epoch.load(Ordering::Relaxed)
    }

    fn set_epoch(&self, epoch: i64) {
        self.epoch.store(epoch, Ordering::Relaxed);
    }
}
