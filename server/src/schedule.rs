use railsync_shared::{ClientId, Message, Reliability};

/// Work parked in the server's time queue. Only notifications are ever
/// delayed; handler execution itself never blocks on these.
#[derive(Clone, PartialEq, Debug)]
pub(crate) enum Scheduled {
    Send(ScheduledSend),
    /// Force-completes a stalled barrier if the generation still matches.
    BarrierTimeout { generation: u64 },
}

#[derive(Clone, PartialEq, Debug)]
pub(crate) struct ScheduledSend {
    pub to: ClientId,
    pub message: Message,
    pub reliability: Reliability,
    pub kind: SendKind,
}

#[derive(Clone, PartialEq, Debug)]
pub(crate) enum SendKind {
    /// Delayed authority notice to the requesting client. Expedited when one
    /// of the releasing owners disconnects mid-window.
    AuthorityNotice { releasers: Vec<ClientId> },
    /// Barrier resume notice; the one flagged `completes` unblocks the next
    /// queued barrier once delivered.
    BarrierResume { completes: bool },
}
