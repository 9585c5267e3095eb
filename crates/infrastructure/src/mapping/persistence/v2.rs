use domainwall_domain::{DomainError, DomainRecord};
use serde::{Deserialize, Serialize};

use super::format::{read_mapping_lines, write_mapping_lines, FileVersion, SUPPORTED_FEATURES};

const EPOCH_FEATURE: &str = "Epoch";

#[derive(Debug, Default, Serialize, Deserialize)]
struct Header {
    #[serde(rename = "RequiredFeatures", default)]
    required_features: Vec<String>,
    #[serde(rename = "Epoch", default)]
    epoch: i64,
}

/// Version 2: a JSON header carrying the epoch and required features, then
/// mapping lines as in version 1.
pub(super) fn read<'a>(
    mut body: impl Iterator<Item = &'a str>,
    expected_epoch: i64,
) -> Result<Vec<DomainRecord>, DomainError> {
    let header = match body.find(|line| !line.trim().is_empty()) {
        Some(line) => serde_json::from_str::<Header>(line)
            .map_err(|e| DomainError::Persistence(format!("invalid v2 header: {}", e)))?,
        None => return Ok(Vec::new()),
    };

    let unsupported: Vec<String> = header
        .required_features
        .iter()
        .filter(|f| !SUPPORTED_FEATURES.contains(&f.as_str()))
        .cloned()
        .collect();
    if !unsupported.is_empty() {
        return Err(DomainError::UnsupportedFeatures(unsupported));
    }

    if header.epoch != expected_epoch {
        return Err(DomainError::EpochMismatch {
            found: header.epoch,
            expected: expected_epoch,
        });
    }

    Ok(read_mapping_lines(body))
}

pub(super) fn write(epoch: i64, records: &[DomainRecord]) -> Result<String, DomainError> {
    let header = Header {
        required_features: vec![EPOCH_FEATURE.to_string()],
        epoch,
    };
    let mut out = String::with_capacity(64 + records.len() * 96);
    out.push_str(FileVersion::V2.as_str());
    out.push('\n');
    out.push_str(
        &serde_json::to_string(&header).map_err(|e| DomainError::Persistence(e.to_string()))?,
    );
    out.push('\n');
    write_mapping_lines(&mut out, records)?;
    Ok(out)
}
