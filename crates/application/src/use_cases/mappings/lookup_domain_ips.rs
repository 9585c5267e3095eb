use domainwall_domain::DomainName;
use std::collections::BTreeSet;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::debug;

use crate::ports::MappingStorePort;

pub struct LookupDomainIpsUseCase {
    store: Arc<dyn MappingStorePort>,
}

impl LookupDomainIpsUseCase {
    pub fn new(store: Arc<dyn MappingStorePort>) -> Self {
        Self { store }
    }

    /// A CNAME cycle or an over-deep chain resolves to nothing.
    pub fn execute(&self, domain: &DomainName) -> BTreeSet<IpAddr> {
        match self.store.lookup_ips(domain) {
            Ok(ips) => ips,
            Err(e) => {
                debug!(domain = %domain, error = %e, "Domain resolution failed");
                BTreeSet::new()
            }
        }
    }
}
