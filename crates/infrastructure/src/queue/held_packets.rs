use domainwall_application::ports::MembershipView;
use domainwall_domain::{
    DefaultDisposition, PacketId, PacketState, PendingPacket, ReleaseReason, RetryBudget, Verdict,
};
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::time::Instant;

/// A verdict ready to be handed back to the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Release {
    pub id: PacketId,
    pub verdict: Verdict,
    pub reason: ReleaseReason,
}

/// Denied packets waiting for their destination to join a domain set.
///
/// Every admitted packet leaves through exactly one [`Release`].
pub struct HeldPacketTable {
    budget: RetryBudget,
    capacity: usize,
    do_not_repeat_mark: u32,
    held: BTreeMap<PacketId, PendingPacket>,
}

impl HeldPacketTable {
    pub fn new(budget: RetryBudget, capacity: usize, do_not_repeat_mark: u32) -> Self {
        Self {
            budget,
            capacity,
            do_not_repeat_mark,
            held: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.held.len()
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }

    /// First pass for a packet policy denied. Returns a release when the
    /// packet is decided without holding.
    pub fn admit(
        &mut self,
        id: PacketId,
        destination: IpAddr,
        mark: u32,
        is_member: bool,
        now: Instant,
    ) -> Option<Release> {
        let mut packet = PendingPacket::received(id, destination, mark, now);

        if is_member {
            packet.finish(true);
            return self.take(&mut packet, ReleaseReason::MembershipUpdated);
        }
        if self.held.len() >= self.capacity {
            packet.finish(false);
            return self.take(&mut packet, ReleaseReason::Overflow);
        }

        match packet.queue(now, &self.budget) {
            PacketState::Queued => {
                self.held.insert(id, packet);
                None
            }
            _ => self.take(&mut packet, ReleaseReason::BudgetExhausted),
        }
    }

    /// Releases every held packet headed to `ip`.
    pub fn on_member_added(&mut self, ip: IpAddr, now: Instant) -> Vec<Release> {
        let budget = self.budget;
        self.release_where(|packet| {
            if packet.destination != ip {
                return None;
            }
            packet.re_evaluate(true, now, &budget);
            Some(ReleaseReason::MembershipUpdated)
        })
    }

    /// Re-checks membership for every held packet, due or not. Used when
    /// membership notifications were missed.
    pub fn reconcile(&mut self, view: &dyn MembershipView, now: Instant) -> Vec<Release> {
        let budget = self.budget;
        self.release_where(|packet| {
            if !view.contains(&packet.destination) {
                return None;
            }
            packet.re_evaluate(true, now, &budget);
            Some(ReleaseReason::MembershipUpdated)
        })
    }

    /// Retries packets whose timer fired.
    pub fn on_tick(&mut self, view: &dyn MembershipView, now: Instant) -> Vec<Release> {
        let budget = self.budget;
        self.release_where(|packet| {
            if !packet.is_due(now) {
                return None;
            }
            match packet.re_evaluate(view.contains(&packet.destination), now, &budget) {
                PacketState::Accepted => Some(ReleaseReason::MembershipUpdated),
                PacketState::DeniedFinal => Some(ReleaseReason::BudgetExhausted),
                _ => None,
            }
        })
    }

    /// Hands every held packet back for a final policy pass.
    pub fn drain(&mut self) -> Vec<Release> {
        self.release_where(|packet| {
            packet.finish(true);
            Some(ReleaseReason::Drained)
        })
    }

    /// Releases everything with the configured fallback verdict when the
    /// queue transport is going away.
    pub fn abandon(&mut self, disposition: DefaultDisposition) -> Vec<Release> {
        let held = std::mem::take(&mut self.held);
        held.into_values()
            .filter_map(|mut packet| {
                packet.finish(disposition == DefaultDisposition::Accept);
                packet.take_verdict(self.do_not_repeat_mark).map(|_| Release {
                    id: packet.id,
                    verdict: disposition.verdict(packet.mark),
                    reason: ReleaseReason::ConnectionFailure,
                })
            })
            .collect()
    }

    fn take(&self, packet: &mut PendingPacket, reason: ReleaseReason) -> Option<Release> {
        packet
            .take_verdict(self.do_not_repeat_mark)
            .map(|verdict| Release {
                id: packet.id,
                verdict,
                reason,
            })
    }

    /// Removes packets for which `decide` reports a reason and which
    /// reached a final state.
    fn release_where<F>(&mut self, mut decide: F) -> Vec<Release>
    where
        F: FnMut(&mut PendingPacket) -> Option<ReleaseReason>,
    {
        let mut finished = Vec::new();
        for (id, packet) in self.held.iter_mut() {
            if let Some(reason) = decide(packet) {
                if packet.state().is_final() {
                    finished.push((*id, reason));
                }
            }
        }

        let mut releases = Vec::with_capacity(finished.len());
        for (id, reason) in finished {
            if let Some(mut packet) = self.held.remove(&id) {
                if let Some(release) = self.take(&mut packet, reason) {
                    releases.push(release);
                }
            }
        }
        releases
    }
}
