use domainwall_domain::{DomainError, DomainPattern, SetId};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::ports::{MembershipProjectorPort, ProjectionTicket};

pub struct RegisterDomainSetUseCase {
    projector: Arc<dyn MembershipProjectorPort>,
}

impl RegisterDomainSetUseCase {
    pub fn new(projector: Arc<dyn MembershipProjectorPort>) -> Self {
        Self { projector }
    }

    /// Registers a new selector set or replaces the patterns of an existing one.
    #[instrument(skip(self, domains))]
    pub fn execute(&self, set_id: SetId, domains: &[String]) -> Result<ProjectionTicket, DomainError> {
        let patterns = domains
            .iter()
            .map(|d| DomainPattern::parse(d))
            .collect::<Result<Vec<_>, _>>()?;

        let pattern_count = patterns.len();
        let ticket = self.projector.register_set(set_id.clone(), patterns);

        info!(
            set_id = %set_id,
            patterns = pattern_count,
            deltas = ticket.deltas(),
            "Domain set registered"
        );
        Ok(ticket)
    }
}
