use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};

use log::{info, trace, warn};

use railsync_shared::{
    Car, ClientId, Message, Reliability, TimeQueue, Transport,
};

use crate::{
    schedule::{Scheduled, ScheduledSend, SendKind},
    users::{half_rtt, UserRegistry},
};

/// Coordinates the "spawn new cars -> every client finishes loading them ->
/// resume, ordered by latency" handshake.
///
/// At most one barrier is in flight; a spawn arriving meanwhile is queued and
/// started only after the in-flight barrier's resume sequence completes. A
/// client that disconnects while loading is dropped from the requirement; one
/// that connects mid-barrier is exempted (it will pick the new cars up in its
/// own full sync).
#[derive(Debug)]
pub struct BarrierCoordinator {
    state: BarrierState,
    pending: VecDeque<PendingInit>,
    generation: u64,
    timeout: Option<Duration>,
}

#[derive(Debug)]
enum BarrierState {
    Idle,
    Loading {
        introducer: ClientId,
        acks: HashSet<ClientId>,
    },
}

#[derive(Debug)]
struct PendingInit {
    introducer: ClientId,
    cars: Vec<Car>,
}

impl BarrierCoordinator {
    pub fn new(timeout: Option<Duration>) -> Self {
        BarrierCoordinator {
            state: BarrierState::Idle,
            pending: VecDeque::new(),
            generation: 0,
            timeout,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, BarrierState::Loading { .. })
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn on_entities_init(
        &mut self,
        introducer: ClientId,
        cars: Vec<Car>,
        users: &UserRegistry,
        io: &mut dyn Transport,
        scheduler: &mut TimeQueue<Scheduled>,
        now: Instant,
    ) {
        if self.is_loading() {
            info!("barrier in flight, queueing init of {} car(s) from {introducer}", cars.len());
            self.pending.push_back(PendingInit { introducer, cars });
            return;
        }
        self.begin(introducer, cars, users, io, scheduler, now);
    }

    pub(crate) fn acknowledge(
        &mut self,
        sender: ClientId,
        users: &UserRegistry,
        io: &mut dyn Transport,
        scheduler: &mut TimeQueue<Scheduled>,
        now: Instant,
    ) {
        let BarrierState::Loading { acks, .. } = &mut self.state else {
            return;
        };
        trace!("< ENTITIES_INIT_FINISHED from {sender}");
        acks.insert(sender);
        self.check_complete(users, io, scheduler, now);
    }

    /// A client joining mid-barrier must not block it: the snapshot it missed
    /// arrives with its own full sync.
    pub(crate) fn client_connected(&mut self, client: ClientId) {
        if let BarrierState::Loading { acks, .. } = &mut self.state {
            acks.insert(client);
        }
    }

    /// The caller has already removed the client from the registry.
    pub(crate) fn client_disconnected(
        &mut self,
        client: ClientId,
        users: &UserRegistry,
        io: &mut dyn Transport,
        scheduler: &mut TimeQueue<Scheduled>,
        now: Instant,
    ) {
        // No deferred work may reference a departed client.
        self.pending.retain(|p| p.introducer != client);

        if let BarrierState::Loading { acks, .. } = &mut self.state {
            acks.remove(&client);
            self.check_complete(users, io, scheduler, now);
        }
    }

    pub(crate) fn on_timeout(
        &mut self,
        generation: u64,
        users: &UserRegistry,
        io: &mut dyn Transport,
        scheduler: &mut TimeQueue<Scheduled>,
        now: Instant,
    ) {
        if generation != self.generation {
            return;
        }
        let BarrierState::Loading { introducer, acks } = &self.state else {
            return;
        };
        for straggler in users.iter().filter(|c| !acks.contains(c)) {
            warn!(
                "barrier opened by {introducer} timed out waiting for {straggler}, forcing completion"
            );
        }
        self.complete(users, io, scheduler, now);
    }

    /// Starts the next queued barrier after the in-flight resume sequence has
    /// gone out.
    pub(crate) fn run_next(
        &mut self,
        users: &UserRegistry,
        io: &mut dyn Transport,
        scheduler: &mut TimeQueue<Scheduled>,
        now: Instant,
    ) {
        if self.is_loading() {
            return;
        }
        if let Some(next) = self.pending.pop_front() {
            self.begin(next.introducer, next.cars, users, io, scheduler, now);
        }
    }

    fn begin(
        &mut self,
        introducer: ClientId,
        cars: Vec<Car>,
        users: &UserRegistry,
        io: &mut dyn Transport,
        scheduler: &mut TimeQueue<Scheduled>,
        now: Instant,
    ) {
        self.generation += 1;
        self.state = BarrierState::Loading {
            introducer,
            acks: HashSet::from([introducer]),
        };

        trace!("> ENTITIES_INIT ({} car(s))", cars.len());
        let snapshot = Message::EntitiesInit { cars };
        for client in users.others(introducer) {
            if let Err(err) = io.send(client, &snapshot, Reliability::Reliable) {
                warn!("failed to send init snapshot to {client}: {err}");
            }
        }

        if let Some(timeout) = self.timeout {
            scheduler.schedule(
                now,
                timeout,
                Scheduled::BarrierTimeout {
                    generation: self.generation,
                },
            );
        }

        self.check_complete(users, io, scheduler, now);
    }

    fn check_complete(
        &mut self,
        users: &UserRegistry,
        io: &mut dyn Transport,
        scheduler: &mut TimeQueue<Scheduled>,
        now: Instant,
    ) {
        let BarrierState::Loading { acks, .. } = &self.state else {
            return;
        };
        if users.iter().all(|c| acks.contains(&c)) {
            self.complete(users, io, scheduler, now);
        }
    }

    /// Schedules the resume notices, lowest half-RTT first with zero delay,
    /// each later client held back by its latency gap to the fastest. The
    /// fastest client's notice carries the hook that starts the next queued
    /// barrier once delivered.
    fn complete(
        &mut self,
        users: &UserRegistry,
        io: &mut dyn Transport,
        scheduler: &mut TimeQueue<Scheduled>,
        now: Instant,
    ) {
        self.state = BarrierState::Idle;

        let mut by_latency: Vec<ClientId> = users.iter().collect();
        by_latency.sort_by_key(|c| half_rtt(io, *c));

        let Some(fastest) = by_latency.first().copied() else {
            // Everyone left mid-barrier; nothing to notify, move on.
            self.run_next(users, io, scheduler, now);
            return;
        };
        let lowest = half_rtt(io, fastest);

        trace!("> ENTITIES_INIT_FINISHED to {} client(s)", by_latency.len());
        for client in &by_latency {
            let delay = half_rtt(io, *client)
                .checked_sub(lowest)
                .unwrap_or(Duration::ZERO);
            scheduler.schedule(
                now,
                delay,
                Scheduled::Send(ScheduledSend {
                    to: *client,
                    message: Message::EntitiesInitFinished,
                    reliability: Reliability::Reliable,
                    kind: SendKind::BarrierResume {
                        completes: *client == fastest,
                    },
                }),
            );
        }
    }
}
