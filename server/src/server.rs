use std::time::Instant;

use log::{trace, warn};

use railsync_shared::{
    cascade_lever, set_cock, set_coupled, set_hose, set_mu_link, ApplyOutcome, CarSync, ClientId,
    EntityStore, Message, Reliability, TimeQueue, Transport, TransportEvent,
};

use crate::{
    authority::AuthorityManager,
    barrier::BarrierCoordinator,
    error::ServerError,
    schedule::{Scheduled, ScheduledSend, SendKind},
    server_config::ServerConfig,
    users::UserRegistry,
};

/// The authoritative relay. Holds the canonical entity store, arbitrates
/// authority, runs initialization barriers, and rebroadcasts every accepted
/// mutation to the other connected clients.
///
/// Sans-io: the server never talks to a socket. The owning context feeds it
/// transport events through `process` and calls `advance` on every service
/// pass to flush deliveries whose hold-back delay has elapsed.
pub struct Server {
    users: UserRegistry,
    store: EntityStore,
    authority: AuthorityManager,
    barrier: BarrierCoordinator,
    scheduler: TimeQueue<Scheduled>,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        Server {
            users: UserRegistry::new(),
            store: EntityStore::new(),
            authority: AuthorityManager::new(),
            barrier: BarrierCoordinator::new(config.barrier_timeout),
            scheduler: TimeQueue::new(),
        }
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn users(&self) -> &UserRegistry {
        &self.users
    }

    pub fn is_barrier_loading(&self) -> bool {
        self.barrier.is_loading()
    }

    /// Feeds one transport event through the dispatcher.
    pub fn process(
        &mut self,
        now: Instant,
        event: TransportEvent,
        io: &mut dyn Transport,
    ) -> Result<(), ServerError> {
        match event {
            TransportEvent::Connected(client) => {
                self.users.add(client);
                self.barrier.client_connected(client);
                Ok(())
            }
            TransportEvent::Disconnected(client) => self.on_disconnected(now, client, io),
            TransportEvent::Message { from, message } => {
                self.on_message(now, from, message, io)
            }
        }
    }

    /// Flushes every scheduled delivery that has come due. Call on every
    /// service pass.
    pub fn advance(&mut self, now: Instant, io: &mut dyn Transport) {
        while let Some(scheduled) = self.scheduler.pop_due(now) {
            match scheduled {
                Scheduled::Send(send) => {
                    trace!("> {} to {} (held back)", send.message.tag(), send.to);
                    if let Err(err) = io.send(send.to, &send.message, send.reliability) {
                        warn!("failed delayed send of {} to {}: {err}", send.message.tag(), send.to);
                    }
                    if let SendKind::BarrierResume { completes: true } = send.kind {
                        self.barrier
                            .run_next(&self.users, io, &mut self.scheduler, now);
                    }
                }
                Scheduled::BarrierTimeout { generation } => {
                    self.barrier
                        .on_timeout(generation, &self.users, io, &mut self.scheduler, now);
                }
            }
        }
    }

    fn on_disconnected(
        &mut self,
        now: Instant,
        client: ClientId,
        io: &mut dyn Transport,
    ) -> Result<(), ServerError> {
        self.users.remove(client);

        // Anything still addressed to the departed client is dead.
        let dropped = self.scheduler.take_matching(|item| match item {
            Scheduled::Send(send) => send.to == client,
            Scheduled::BarrierTimeout { .. } => false,
        });

        // The fastest client's resume notice carries the hook that starts the
        // next queued barrier; if it died here, the hook must fire anyway or
        // every queued spawn is stranded.
        let lost_completion_hook = dropped.iter().any(|item| {
            matches!(
                item,
                Scheduled::Send(ScheduledSend {
                    kind: SendKind::BarrierResume { completes: true },
                    ..
                })
            )
        });

        // A held-back authority notice whose equalization window was measured
        // against the departed releaser has lost its reason to wait.
        let expedited = self.scheduler.take_matching(|item| match item {
            Scheduled::Send(send) => match &send.kind {
                SendKind::AuthorityNotice { releasers } => releasers.contains(&client),
                SendKind::BarrierResume { .. } => false,
            },
            Scheduled::BarrierTimeout { .. } => false,
        });
        for item in expedited {
            if let Scheduled::Send(send) = item {
                trace!("> {} to {} (expedited)", send.message.tag(), send.to);
                if let Err(err) = io.send(send.to, &send.message, send.reliability) {
                    warn!("failed expedited send of {} to {}: {err}", send.message.tag(), send.to);
                }
            }
        }

        self.barrier
            .client_disconnected(client, &self.users, io, &mut self.scheduler, now);

        if lost_completion_hook {
            self.barrier
                .run_next(&self.users, io, &mut self.scheduler, now);
        }
        Ok(())
    }

    fn on_message(
        &mut self,
        now: Instant,
        from: ClientId,
        message: Message,
        io: &mut dyn Transport,
    ) -> Result<(), ServerError> {
        trace!("< {} from {from}", message.tag());
        match &message {
            Message::EntitiesInit { cars } => {
                for car in cars {
                    self.store.insert(car.clone());
                }
                self.barrier.on_entities_init(
                    from,
                    cars.clone(),
                    &self.users,
                    io,
                    &mut self.scheduler,
                    now,
                );
            }
            Message::EntitiesInitFinished => {
                self.barrier
                    .acknowledge(from, &self.users, io, &mut self.scheduler, now);
            }
            Message::HostSync { cars } => {
                self.store.replace_all(cars.clone());
            }
            Message::SyncAllRequest => {
                let snapshot = Message::SyncAll {
                    cars: self.store.active().cloned().collect(),
                };
                trace!("> SYNC_ALL to {from} ({} car(s))", self.store.len());
                io.send(from, &snapshot, Reliability::Reliable)?;
            }
            Message::SyncAll { .. } => {
                warn!("unexpected SYNC_ALL from {from}, ignoring");
            }
            Message::CarSync(sync) => {
                self.apply_car_sync(sync);
                self.rebroadcast(from, &message, io);
            }
            Message::LocationUpdate { updates } => {
                for update in updates {
                    self.store.ensure(&update.car);
                    let outcome = self.store.apply_if_newer(&update.car, update.timestamp, |car| {
                        car.position = update.position;
                        car.rotation = update.rotation;
                        car.forward = update.forward;
                        car.bogies = update.bogies.clone();
                        car.is_stationary = update.is_stationary;
                    });
                    if outcome == ApplyOutcome::Stale {
                        trace!("stale location for {} at {}", update.car, update.timestamp);
                    }
                }
                self.rebroadcast(from, &message, io);
            }
            Message::Lever(change) => {
                self.store.ensure(&change.car);
                cascade_lever(&mut self.store, &change.car, change.lever, change.value);
                self.rebroadcast(from, &message, io);
            }
            Message::Couple(change) => {
                set_coupled(
                    &mut self.store,
                    &change.car_a,
                    change.a_end,
                    &change.car_b,
                    change.b_end,
                    true,
                );
                self.rebroadcast(from, &message, io);
            }
            Message::Uncouple(change) => {
                set_coupled(
                    &mut self.store,
                    &change.car_a,
                    change.a_end,
                    &change.car_b,
                    change.b_end,
                    false,
                );
                self.rebroadcast(from, &message, io);
            }
            Message::CoupleHose(change) => {
                set_hose(
                    &mut self.store,
                    &change.car_a,
                    change.a_end,
                    &change.car_b,
                    change.b_end,
                    change.connected,
                );
                self.rebroadcast(from, &message, io);
            }
            Message::CoupleCock(change) => {
                set_cock(&mut self.store, &change.car, change.end, change.open);
                self.rebroadcast(from, &message, io);
            }
            Message::Damage(damage) => {
                self.store.upsert(&damage.car, |car| match damage.kind {
                    railsync_shared::DamageKind::Car => {
                        car.car_health = damage.new_health;
                        car.car_damage_data = damage.data.clone();
                    }
                    railsync_shared::DamageKind::Cargo => {
                        car.cargo_health = damage.new_health;
                    }
                });
                self.rebroadcast(from, &message, io);
            }
            Message::CargoChange(change) => {
                self.store.upsert(&change.car, |car| {
                    car.cargo_type = change.cargo_type.clone();
                    car.cargo_amount = change.amount;
                });
                self.rebroadcast(from, &message, io);
            }
            Message::MuChange(change) => {
                set_mu_link(
                    &mut self.store,
                    &change.car_a,
                    change.a_end,
                    &change.car_b,
                    change.b_end,
                    change.connected,
                );
                self.rebroadcast(from, &message, io);
            }
            Message::AuthChange(change) => {
                // Own notification discipline; not a plain rebroadcast.
                self.authority.execute_transfer(
                    change,
                    &mut self.store,
                    &self.users,
                    io,
                    &mut self.scheduler,
                    now,
                );
            }
            Message::PlayerCarChange(change) => {
                if let Some(car) = &change.car {
                    self.store.ensure(car);
                }
                self.rebroadcast(from, &message, io);
            }
            Message::Rerail(rerail) => {
                self.store.upsert(&rerail.car, |car| {
                    car.bogies = [rerail.bogie_1.clone(), rerail.bogie_2.clone()];
                    car.position = rerail.position;
                    car.forward = rerail.forward;
                    car.rotation = rerail.rotation;
                    car.car_health = rerail.car_health;
                    car.cargo_health = rerail.cargo_health;
                    if car.kind.is_loco() {
                        car.reset_controls();
                    }
                });
                self.rebroadcast(from, &message, io);
            }
            Message::Derail(derail) => {
                self.store.upsert(&derail.car, |car| {
                    car.bogies = [derail.bogie_1.clone(), derail.bogie_2.clone()];
                    car.car_health = derail.car_health;
                    car.cargo_health = derail.cargo_health;
                });
                self.rebroadcast(from, &message, io);
            }
            Message::Removal(removal) => {
                self.store.mark_removed(&removal.car);
                self.rebroadcast(from, &message, io);
            }
        }
        Ok(())
    }

    fn apply_car_sync(&mut self, sync: &CarSync) {
        self.store.upsert(&sync.car, |car| {
            let steamer = car.steamer.get_or_insert_with(Default::default);
            steamer.fire_on = sync.fire_on;
            steamer.coal_in_firebox = sync.coal_in_firebox;
            steamer.coal_in_tender = sync.coal_in_tender;
            steamer.whistle = sync.whistle;
        });
    }

    /// Relays an accepted mutation to every other connected client in random
    /// order, so no client is systematically favored by join position. Send
    /// failures are logged per target; one closed connection must not starve
    /// the rest of the fan-out.
    fn rebroadcast(&mut self, from: ClientId, message: &Message, io: &mut dyn Transport) {
        let mut targets = self.users.others(from);
        fastrand::shuffle(&mut targets);
        let reliability = message.reliability();
        for target in targets {
            if let Err(err) = io.send(target, message, reliability) {
                warn!("failed to relay {} to {target}: {err}", message.tag());
            }
        }
    }
}
