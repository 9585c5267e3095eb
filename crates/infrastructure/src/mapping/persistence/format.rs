use chrono::{DateTime, Utc};
use domainwall_domain::{DomainError, DomainName, DomainRecord, MappingValue};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::warn;

/// Features this reader implements; a file requiring anything else is rejected.
pub const SUPPORTED_FEATURES: &[&str] = &["Epoch"];

const TYPE_IP: &str = "ip";
const TYPE_NAME: &str = "name";

/// On-disk format generation, read from the first line of the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileVersion {
    V1,
    V2,
}

impl FileVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileVersion::V1 => "1",
            FileVersion::V2 => "2",
        }
    }
}

impl FromStr for FileVersion {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" => Ok(FileVersion::V1),
            "2" => Ok(FileVersion::V2),
            other => Err(DomainError::UnsupportedPersistenceVersion(other.to_string())),
        }
    }
}

/// One persisted mapping. Unknown fields are ignored on read.
#[derive(Debug, Serialize, Deserialize)]
pub(super) struct MappingLine {
    #[serde(rename = "LHS")]
    pub lhs: String,
    #[serde(rename = "RHS")]
    pub rhs: String,
    #[serde(rename = "Expiry")]
    pub expiry: DateTime<Utc>,
    #[serde(rename = "Type")]
    pub kind: String,
}

impl MappingLine {
    pub fn from_record(record: &DomainRecord) -> Self {
        Self {
            lhs: record.domain.to_string(),
            rhs: record.value.to_string(),
            expiry: record.expiry,
            kind: record.value.type_tag().to_string(),
        }
    }

    pub fn into_record(self) -> Result<DomainRecord, DomainError> {
        let domain = DomainName::new(&self.lhs)?;
        let value = match self.kind.as_str() {
            TYPE_IP => MappingValue::Ip(self.rhs.parse().map_err(|_| {
                DomainError::Persistence(format!("invalid IP '{}'", self.rhs))
            })?),
            TYPE_NAME => MappingValue::Name(DomainName::new(&self.rhs)?),
            other => {
                return Err(DomainError::Persistence(format!(
                    "unknown mapping type '{}'",
                    other
                )))
            }
        };
        Ok(DomainRecord::new(domain, value, self.expiry))
    }
}

/// Reads mapping lines until the input ends or a line fails to parse; the
/// rest of the file is ignored from that point.
pub(super) fn read_mapping_lines<'a>(lines: impl Iterator<Item = &'a str>) -> Vec<DomainRecord> {
    let mut records = Vec::new();
    for (index, line) in lines.enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let parsed = serde_json::from_str::<MappingLine>(line)
            .map_err(|e| DomainError::Persistence(e.to_string()))
            .and_then(MappingLine::into_record);
        match parsed {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!(line = index, error = %e, "Stopped reading persisted mappings");
                break;
            }
        }
    }
    records
}

pub(super) fn write_mapping_lines(out: &mut String, records: &[DomainRecord]) -> Result<(), DomainError> {
    for record in records {
        let line = serde_json::to_string(&MappingLine::from_record(record))
            .map_err(|e| DomainError::Persistence(e.to_string()))?;
        out.push_str(&line);
        out.push('\n');
    }
    Ok(())
}
