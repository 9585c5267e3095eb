use crate::domain_pattern::DomainPattern;
use crate::errors::DomainError;
use crate::membership::SetId;
use serde::{Deserialize, Serialize};

/// Statically configured domain selector set.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DomainSetConfig {
    pub id: String,
    #[serde(default)]
    pub domains: Vec<String>,
}

impl DomainSetConfig {
    pub fn set_id(&self) -> SetId {
        SetId::new(&self.id)
    }

    pub fn patterns(&self) -> Result<Vec<DomainPattern>, DomainError> {
        self.domains.iter().map(|d| DomainPattern::parse(d)).collect()
    }
}
