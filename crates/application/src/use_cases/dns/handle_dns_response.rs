use domainwall_domain::{DnsObservation, DomainError, DomainName};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::ports::{
    Clock, DnsMessageDecoder, MappingStorePort, MembershipProjectorPort, ProjectionTicket,
};
use crate::services::{TrustDecision, TrustFilter};

#[derive(Debug)]
pub struct DnsResponseOutcome {
    pub trust: Option<TrustDecision>,
    pub answers: usize,
    pub changed: Vec<DomainName>,
    pub ticket: ProjectionTicket,
}

impl DnsResponseOutcome {
    fn no_information(trust: Option<TrustDecision>, answers: usize) -> Self {
        Self {
            trust,
            answers,
            changed: Vec::new(),
            ticket: ProjectionTicket::ready(),
        }
    }
}

/// Decode, trust-check, ingest and project one snooped DNS response.
pub struct HandleDnsResponseUseCase {
    decoder: Arc<dyn DnsMessageDecoder>,
    trust_filter: Arc<TrustFilter>,
    store: Arc<dyn MappingStorePort>,
    projector: Arc<dyn MembershipProjectorPort>,
    clock: Arc<dyn Clock>,
}

impl HandleDnsResponseUseCase {
    pub fn new(
        decoder: Arc<dyn DnsMessageDecoder>,
        trust_filter: Arc<TrustFilter>,
        store: Arc<dyn MappingStorePort>,
        projector: Arc<dyn MembershipProjectorPort>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            decoder,
            trust_filter,
            store,
            projector,
            clock,
        }
    }

    /// Decode failures are returned as errors; callers treat them as
    /// "no new information".
    #[instrument(skip(self, observation), fields(server = %observation.flow.server))]
    pub async fn execute(
        &self,
        observation: &DnsObservation,
    ) -> Result<DnsResponseOutcome, DomainError> {
        let observed_at = self.clock.now();
        let parsed = self
            .decoder
            .decode(&observation.payload, observation.flow.protocol)?;

        if !parsed.has_answers() {
            return Ok(DnsResponseOutcome::no_information(None, 0));
        }

        let decision = self.trust_filter.evaluate(&observation.flow).await;
        if let TrustDecision::Untrusted(reason) = decision {
            debug!(
                client = %observation.flow.client,
                reason = ?reason,
                answers = parsed.answers.len(),
                "Discarding untrusted DNS response"
            );
            return Ok(DnsResponseOutcome::no_information(
                Some(decision),
                parsed.answers.len(),
            ));
        }

        let mutation = self.store.ingest(&parsed.answers, observed_at);
        let ticket = if mutation.changed.is_empty() {
            ProjectionTicket::ready()
        } else {
            self.projector.on_names_changed(&mutation.changed)
        };

        debug!(
            question = ?parsed.question_name.as_ref().map(|n| n.as_str()),
            answers = parsed.answers.len(),
            changed = mutation.changed.len(),
            deltas = ticket.deltas(),
            "DNS response ingested"
        );

        Ok(DnsResponseOutcome {
            trust: Some(decision),
            answers: parsed.answers.len(),
            changed: mutation.changed,
            ticket,
        })
    }
}
