use std::time::Duration;

use tokio::time::Instant;

/// Rejoin scheduling for a room transport.
///
/// Join attempts are spaced at least `floor` apart, measured from the start
/// of the previous attempt. Only one rejoin can be pending, so a close and
/// an error reported for the same transport schedule a single retry.
/// There is no attempt limit.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    floor: Duration,
    last_join_started: Option<Instant>,
    rejoin_pending: bool,
}

impl ReconnectPolicy {
    pub fn new(floor: Duration) -> Self {
        Self {
            floor,
            last_join_started: None,
            rejoin_pending: false,
        }
    }

    pub fn floor(&self) -> Duration {
        self.floor
    }

    /// Record the start of a join attempt; clears any pending rejoin
    pub fn join_started(&mut self, now: Instant) {
        self.last_join_started = Some(now);
        self.rejoin_pending = false;
    }

    /// The transport closed or errored at `now`. Returns how long to wait
    /// before rejoining, or `None` if a rejoin is already pending.
    pub fn transport_lost(&mut self, now: Instant) -> Option<Duration> {
        if self.rejoin_pending {
            return None;
        }
        self.rejoin_pending = true;

        let elapsed = match self.last_join_started {
            Some(started) => now.saturating_duration_since(started),
            None => self.floor,
        };
        Some(self.floor.saturating_sub(elapsed))
    }

    pub fn is_rejoin_pending(&self) -> bool {
        self.rejoin_pending
    }
}
