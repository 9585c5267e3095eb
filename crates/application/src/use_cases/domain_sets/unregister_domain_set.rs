use domainwall_domain::{DomainError, SetId};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::ports::{MembershipProjectorPort, ProjectionTicket};

pub struct UnregisterDomainSetUseCase {
    projector: Arc<dyn MembershipProjectorPort>,
}

impl UnregisterDomainSetUseCase {
    pub fn new(projector: Arc<dyn MembershipProjectorPort>) -> Self {
        Self { projector }
    }

    #[instrument(skip(self))]
    pub fn execute(&self, set_id: &SetId) -> Result<ProjectionTicket, DomainError> {
        let ticket = self.projector.unregister_set(set_id)?;
        info!(set_id = %set_id, removed = ticket.deltas(), "Domain set unregistered");
        Ok(ticket)
    }
}
