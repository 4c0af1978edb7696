use std::time::Instant;

/// Resumption bookkeeping for one gateway client.
///
/// Only the lifecycle driver mutates it; callers get copies through
/// [`Client::session`](crate::gateway::Client::session).
#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// Assigned by the remote in `READY`; required to resume
    pub session_id: Option<String>,
    /// Highest sequence number observed in any dispatch frame
    pub sequence: Option<u64>,
    /// Endpoint the remote asked resume attempts to use
    pub resume_gateway_url: Option<String>,
    pub last_heartbeat_sent_at: Option<Instant>,
    pub last_heartbeat_acked_at: Option<Instant>,
    /// When the current connection reached `Ready`
    pub connected_since: Option<Instant>,
}

impl Session {
    /// Record a dispatch sequence number. The stored value never decreases.
    pub fn observe(&mut self, sequence: u64) {
        self.sequence = Some(self.sequence.map_or(sequence, |current| current.max(sequence)));
    }

    /// Whether the next handshake should be a Resume rather than an Identify.
    #[must_use]
    pub fn can_resume(&self) -> bool {
        self.session_id.is_some()
    }

    /// Forget the session so the next handshake identifies from scratch.
    pub fn clear(&mut self) {
        self.session_id = None;
        self.sequence = None;
        self.resume_gateway_url = None;
    }

    pub(crate) fn heartbeat_sent(&mut self, at: Instant) {
        self.last_heartbeat_sent_at = Some(at);
    }

    pub(crate) fn heartbeat_acked(&mut self, at: Instant) {
        self.last_heartbeat_acked_at = Some(at);
    }
}
