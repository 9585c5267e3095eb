use crate::domain_name::{normalize, DomainName};
use crate::errors::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Policy-declared domain selector.
///
/// Matching is label based: a `*` segment stands for one or more whole
/// labels, never for part of a label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DomainPattern {
    /// `example.com`
    Exact(DomainName),
    /// `*.example.com`, stores `example.com`
    Suffix(DomainName),
    /// `example.*`, stores `example`
    Prefix(DomainName),
    /// `update.*.example.io`
    Infix {
        prefix: DomainName,
        suffix: DomainName,
    },
}

impl DomainPattern {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let normalized = normalize(raw);
        let labels: Vec<&str> = normalized.split('.').collect();

        if labels
            .iter()
            .any(|label| label.contains('*') && *label != "*")
        {
            return Err(DomainError::InvalidDomainPattern(format!(
                "'{}': wildcard must be a whole label",
                raw
            )));
        }

        let wildcard_positions: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, label)| **label == "*")
            .map(|(i, _)| i)
            .collect();

        let invalid = |reason: &str| DomainError::InvalidDomainPattern(format!("'{}': {}", raw, reason));

        match wildcard_positions.as_slice() {
            [] => DomainName::new(&normalized)
                .map(DomainPattern::Exact)
                .map_err(|e| invalid(&e.to_string())),
            [pos] => {
                let before = labels[..*pos].join(".");
                let after = labels[*pos + 1..].join(".");
                let name = |part: &str| DomainName::new(part).map_err(|e| invalid(&e.to_string()));

                match (before.is_empty(), after.is_empty()) {
                    (true, true) => Err(invalid("bare wildcard matches everything")),
                    (true, false) => Ok(DomainPattern::Suffix(name(&after)?)),
                    (false, true) => Ok(DomainPattern::Prefix(name(&before)?)),
                    (false, false) => Ok(DomainPattern::Infix {
                        prefix: name(&before)?,
                        suffix: name(&after)?,
                    }),
                }
            }
            _ => Err(invalid("only a single wildcard segment is supported")),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        !matches!(self, DomainPattern::Exact(_))
    }

    pub fn matches(&self, name: &DomainName) -> bool {
        let name = name.as_str();
        match self {
            DomainPattern::Exact(exact) => exact.as_str() == name,
            DomainPattern::Suffix(suffix) => has_label_suffix(name, suffix.as_str()),
            DomainPattern::Prefix(prefix) => has_label_prefix(name, prefix.as_str()),
            DomainPattern::Infix { prefix, suffix } => {
                let (prefix, suffix) = (prefix.as_str(), suffix.as_str());
                // "prefix." + at least one label + ".suffix"
                name.len() > prefix.len() + suffix.len() + 2
                    && has_label_prefix(name, prefix)
                    && has_label_suffix(name, suffix)
            }
        }
    }
}

fn has_label_suffix(name: &str, suffix: &str) -> bool {
    name.len() > suffix.len() + 1
        && name.ends_with(suffix)
        && name.as_bytes()[name.len() - suffix.len() - 1] == b'.'
}

fn has_label_prefix(name: &str, prefix: &str) -> bool {
    name.len() > prefix.len() + 1
        && name.starts_with(prefix)
        && name.as_bytes()[prefix.len()] == b'.'
}

impl fmt::Display for DomainPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainPattern::Exact(name) => write!(f, "{}", name),
            DomainPattern::Suffix(suffix) => write!(f, "*.{}", suffix),
            DomainPattern::Prefix(prefix) => write!(f, "{}.*", prefix),
            DomainPattern::Infix { prefix, suffix } => write!(f, "{}.*.{}", prefix, suffix),
        }
    }
}

impl FromStr for DomainPattern {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DomainPattern {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DomainPattern> for String {
    fn from(value: DomainPattern) -> Self {
        value.to_string()
    }
}
