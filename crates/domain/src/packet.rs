use bytes::Bytes;
use std::fmt;
use std::net::IpAddr;
use std::time::{Duration, Instant};

/// Handle for a packet currently owned by a queue session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PacketId(pub u64);

impl fmt::Display for PacketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A packet handed to userspace by the kernel queue.
#[derive(Debug, Clone)]
pub struct QueuedPacket {
    pub id: PacketId,
    /// Full IP packet, starting at the network header.
    pub payload: Bytes,
    pub mark: u32,
}

impl QueuedPacket {
    pub fn new(id: PacketId, payload: Bytes, mark: u32) -> Self {
        Self { id, payload, mark }
    }
}

/// Final disposition handed back to the kernel queue.
///
/// Every variant carries the mark the packet must leave with, so NAT and
/// routing marks survive the trip through userspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept { mark: u32 },
    /// Re-inject at the start of the hook for another policy pass.
    Repeat { mark: u32 },
    Drop,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Accept { .. } => "accept",
            Verdict::Repeat { .. } => "repeat",
            Verdict::Drop => "drop",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketState {
    Received,
    Queued,
    ReEvaluated,
    Accepted,
    DeniedFinal,
}

impl PacketState {
    pub fn is_final(&self) -> bool {
        matches!(self, PacketState::Accepted | PacketState::DeniedFinal)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReleaseReason {
    /// Destination became a member of a resolved domain set.
    MembershipUpdated,
    /// Hold window or retry attempts exhausted.
    BudgetExhausted,
    /// Queue transport failed while the packet was held.
    ConnectionFailure,
    /// Shutdown or mode change.
    Drained,
    /// Hold table full.
    Overflow,
    /// Already repeated once, or not a decodable IP packet.
    Rejected,
    /// Delaying is off; handed straight back for a final policy pass.
    NotDelayed,
}

impl ReleaseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseReason::MembershipUpdated => "membership_updated",
            ReleaseReason::BudgetExhausted => "budget_exhausted",
            ReleaseReason::ConnectionFailure => "connection_failure",
            ReleaseReason::Drained => "drained",
            ReleaseReason::Overflow => "overflow",
            ReleaseReason::Rejected => "rejected",
            ReleaseReason::NotDelayed => "not_delayed",
        }
    }
}

/// Limits on how long a denied packet may wait for its destination to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    pub max_attempts: u32,
    pub window: Duration,
    pub interval: Duration,
}

/// A denied packet held in userspace while the membership view catches up.
///
/// Transitions: `Received -> Queued -> ReEvaluated -> {Accepted | Queued | DeniedFinal}`.
/// Once final, the packet produces exactly one verdict.
#[derive(Debug, Clone)]
pub struct PendingPacket {
    pub id: PacketId,
    pub destination: IpAddr,
    /// Mark as received; NAT and routing bits must survive every re-queue.
    pub mark: u32,
    first_seen: Instant,
    next_retry: Instant,
    attempts: u32,
    state: PacketState,
    verdict_taken: bool,
}

impl PendingPacket {
    pub fn received(id: PacketId, destination: IpAddr, mark: u32, now: Instant) -> Self {
        Self {
            id,
            destination,
            mark,
            first_seen: now,
            next_retry: now,
            attempts: 0,
            state: PacketState::Received,
            verdict_taken: false,
        }
    }

    pub fn state(&self) -> PacketState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn first_seen(&self) -> Instant {
        self.first_seen
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.state == PacketState::Queued && now >= self.next_retry
    }

    fn has_budget(&self, now: Instant, budget: &RetryBudget) -> bool {
        self.attempts < budget.max_attempts
            && now.saturating_duration_since(self.first_seen) < budget.window
    }

    /// Policy denied the packet on its first pass.
    pub fn queue(&mut self, now: Instant, budget: &RetryBudget) -> PacketState {
        if self.state == PacketState::Received {
            self.state = if self.has_budget(now, budget) {
                self.next_retry = now + budget.interval;
                PacketState::Queued
            } else {
                PacketState::DeniedFinal
            };
        }
        self.state
    }

    /// Re-runs the membership check for a queued packet.
    pub fn re_evaluate(&mut self, is_member: bool, now: Instant, budget: &RetryBudget) -> PacketState {
        if self.state != PacketState::Queued && self.state != PacketState::Received {
            return self.state;
        }
        self.state = PacketState::ReEvaluated;
        self.attempts += 1;

        self.state = if is_member {
            PacketState::Accepted
        } else if self.has_budget(now, budget) {
            self.next_retry = now + budget.interval;
            PacketState::Queued
        } else {
            PacketState::DeniedFinal
        };
        self.state
    }

    /// Forces a final state regardless of the remaining budget.
    pub fn finish(&mut self, accepted: bool) -> PacketState {
        if !self.state.is_final() {
            self.state = if accepted {
                PacketState::Accepted
            } else {
                PacketState::DeniedFinal
            };
        }
        self.state
    }

    /// The verdict for a finished packet, handed out at most once.
    pub fn take_verdict(&mut self, do_not_repeat_mark: u32) -> Option<Verdict> {
        if self.verdict_taken {
            return None;
        }
        let verdict = match self.state {
            PacketState::Accepted => Verdict::Repeat {
                mark: self.mark | do_not_repeat_mark,
            },
            PacketState::DeniedFinal => Verdict::Drop,
            _ => return None,
        };
        self.verdict_taken = true;
        Some(verdict)
    }
}
