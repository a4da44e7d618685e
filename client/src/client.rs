use log::{debug, trace, warn};

use railsync_shared::{
    cascade_lever, resync_plan, set_cock, set_coupled, set_hose, set_mu_link, ApplyOutcome, Car,
    CarDamage, CarDerail, CarId, CarRemoval, CarRerail, CarSync, CargoChange, ClientId,
    CockChange, CouplingChange, DamageKind, EntityStore, HoseChange, LeverChange, LocationUpdate,
    Message, MessageBuffer, MuChange, Reliability, ResyncAction, Transport,
};

use crate::{error::ClientError, world_hook::WorldHook};

/// Non-authoritative replica of the shared session. Mirrors the server's
/// entity store, forwards accepted mutations to the local physics engine
/// through a [`WorldHook`], and defers reliable edits that arrive before the
/// initial full sync has materialized.
///
/// Unknown entity references are logged and skipped here, never synthesized:
/// only the authoritative side may fabricate records, the replica heals on the
/// next full sync.
pub struct Client {
    local: ClientId,
    store: EntityStore,
    buffer: MessageBuffer<Message>,
}

impl Client {
    pub fn new(local: ClientId) -> Self {
        Client {
            local,
            store: EntityStore::new(),
            buffer: MessageBuffer::new(),
        }
    }

    pub fn local_id(&self) -> ClientId {
        self.local
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    /// Whether the initial sync has completed and edits apply directly.
    pub fn is_synced(&self) -> bool {
        self.buffer.is_ready()
    }

    pub fn deferred_count(&self) -> usize {
        self.buffer.len()
    }

    /// Feeds one inbound message through the dispatcher. Edits arriving before
    /// the replica is ready are deferred in arrival order; positional updates
    /// are dropped instead (a fresh one arrives soon).
    pub fn process(
        &mut self,
        message: Message,
        hook: &mut dyn WorldHook,
        io: &mut dyn Transport,
    ) -> Result<(), ClientError> {
        if !self.buffer.is_ready() {
            if message.requires_ready_replica() {
                trace!("deferring {} until replica is ready", message.tag());
                self.buffer.defer(message);
                return Ok(());
            }
            if let Message::LocationUpdate { .. } = &message {
                trace!("replica not ready, dropping location batch");
                return Ok(());
            }
        }
        self.handle(message, hook, io)
    }

    fn handle(
        &mut self,
        message: Message,
        hook: &mut dyn WorldHook,
        io: &mut dyn Transport,
    ) -> Result<(), ClientError> {
        trace!("< {}", message.tag());
        match message {
            Message::EntitiesInit { cars } => {
                // Real-time updates stay paused until the resume notice.
                hook.pause_world();
                for car in cars {
                    self.materialize(car, hook);
                }
                trace!("> ENTITIES_INIT_FINISHED");
                io.send(
                    ClientId::HOST,
                    &Message::EntitiesInitFinished,
                    Reliability::Reliable,
                )?;
            }
            Message::EntitiesInitFinished => {
                hook.resume_world();
            }
            Message::HostSync { .. } | Message::SyncAllRequest => {
                warn!("unexpected {} on the client, ignoring", message.tag());
            }
            Message::SyncAll { cars } => {
                let fresh: Vec<CarId> = cars
                    .iter()
                    .filter(|car| !self.store.contains(car.id()))
                    .map(|car| car.id().clone())
                    .collect();
                self.store.replace_all(cars);
                for id in fresh {
                    if let Some(car) = self.store.get(&id) {
                        hook.spawn_car(car);
                    }
                    self.run_resync(&id, hook);
                }
                if !self.buffer.is_ready() {
                    self.finish_loading(hook, io)?;
                }
            }
            Message::CarSync(sync) => {
                if self.known("CAR_SYNC", &sync.car) {
                    if let Some(car) = self.store.get_mut(&sync.car) {
                        let steamer = car.steamer.get_or_insert_with(Default::default);
                        steamer.fire_on = sync.fire_on;
                        steamer.coal_in_firebox = sync.coal_in_firebox;
                        steamer.coal_in_tender = sync.coal_in_tender;
                        steamer.whistle = sync.whistle;
                    }
                    hook.sync_steam(&sync);
                }
            }
            Message::LocationUpdate { updates } => {
                for update in updates {
                    match self.store.apply_if_newer(&update.car, update.timestamp, |car| {
                        car.position = update.position;
                        car.rotation = update.rotation;
                        car.forward = update.forward;
                        car.bogies = update.bogies.clone();
                        car.is_stationary = update.is_stationary;
                    }) {
                        ApplyOutcome::Applied => hook.move_car(&update),
                        ApplyOutcome::Stale => {
                            trace!("stale location for {} at {}", update.car, update.timestamp);
                        }
                        ApplyOutcome::Unknown => {
                            debug!("location for unknown car {}, skipping", update.car);
                        }
                    }
                }
            }
            Message::Lever(change) => {
                if self.known("LEVER", &change.car) {
                    let applied =
                        cascade_lever(&mut self.store, &change.car, change.lever, change.value);
                    for id in &applied {
                        hook.apply_lever(id, change.lever, change.value);
                    }
                }
            }
            Message::Couple(change) => {
                if self.known("COUPLE", &change.car_a) && self.known("COUPLE", &change.car_b) {
                    set_coupled(
                        &mut self.store,
                        &change.car_a,
                        change.a_end,
                        &change.car_b,
                        change.b_end,
                        true,
                    );
                    hook.couple(
                        &change.car_a,
                        change.a_end,
                        &change.car_b,
                        change.b_end,
                        change.via_chain_interaction,
                    );
                }
            }
            Message::Uncouple(change) => {
                if self.known("UNCOUPLE", &change.car_a) && self.known("UNCOUPLE", &change.car_b) {
                    set_coupled(
                        &mut self.store,
                        &change.car_a,
                        change.a_end,
                        &change.car_b,
                        change.b_end,
                        false,
                    );
                    hook.uncouple(&change.car_a, change.a_end, &change.car_b, change.b_end);
                }
            }
            Message::CoupleHose(change) => {
                if self.known("COUPLE_HOSE", &change.car_a)
                    && self.known("COUPLE_HOSE", &change.car_b)
                {
                    set_hose(
                        &mut self.store,
                        &change.car_a,
                        change.a_end,
                        &change.car_b,
                        change.b_end,
                        change.connected,
                    );
                    hook.connect_hose(
                        &change.car_a,
                        change.a_end,
                        &change.car_b,
                        change.b_end,
                        change.connected,
                    );
                }
            }
            Message::CoupleCock(change) => {
                if self.known("COUPLE_COCK", &change.car) {
                    set_cock(&mut self.store, &change.car, change.end, change.open);
                    hook.set_cock(&change.car, change.end, change.open);
                }
            }
            Message::Damage(damage) => {
                if self.known("DAMAGE", &damage.car) {
                    apply_damage(&mut self.store, &damage);
                    hook.apply_damage(&damage);
                }
            }
            Message::CargoChange(change) => {
                if self.known("CARGO_CHANGE", &change.car) {
                    self.store.upsert(&change.car, |car| {
                        car.cargo_type = change.cargo_type.clone();
                        car.cargo_amount = change.amount;
                    });
                    hook.load_cargo(&change.car, &change.cargo_type, change.amount);
                }
            }
            Message::MuChange(change) => {
                if self.known("MU_CHANGE", &change.car_a) && self.known("MU_CHANGE", &change.car_b)
                {
                    set_mu_link(
                        &mut self.store,
                        &change.car_a,
                        change.a_end,
                        &change.car_b,
                        change.b_end,
                        change.connected,
                    );
                    hook.link_multiple_unit(
                        &change.car_a,
                        change.a_end,
                        &change.car_b,
                        change.b_end,
                        change.connected,
                    );
                }
            }
            Message::AuthChange(change) => {
                for id in &change.cars {
                    if let Some(car) = self.store.get_mut(id) {
                        car.authority_owner = change.new_owner;
                        hook.authority_changed(id, change.new_owner, change.new_owner == self.local);
                    } else {
                        debug!("AUTH_CHANGE references unknown car {id}, skipping");
                    }
                }
            }
            Message::PlayerCarChange(change) => {
                hook.player_car_changed(change.player, change.car.as_ref());
            }
            Message::Rerail(rerail) => {
                if self.known("RERAIL", &rerail.car) {
                    apply_rerail(&mut self.store, &rerail);
                    hook.rerail(&rerail);
                }
            }
            Message::Derail(derail) => {
                if self.known("DERAIL", &derail.car) {
                    apply_derail(&mut self.store, &derail);
                    hook.derail(&derail);
                }
            }
            Message::Removal(removal) => {
                if self.known("REMOVAL", &removal.car) {
                    self.store.mark_removed(&removal.car);
                    hook.remove_car(&removal.car);
                }
            }
        }
        Ok(())
    }

    /// Flips readiness and replays every deferred edit in arrival order.
    fn finish_loading(
        &mut self,
        hook: &mut dyn WorldHook,
        io: &mut dyn Transport,
    ) -> Result<(), ClientError> {
        let queued = self.buffer.drain();
        if !queued.is_empty() {
            debug!("replica ready, replaying {} deferred message(s)", queued.len());
        }
        for message in queued {
            self.handle(message, hook, io)?;
        }
        Ok(())
    }

    /// Inserts a snapshot record and, if the car was previously unknown,
    /// spawns it physically and heals its coupling relations.
    fn materialize(&mut self, car: Car, hook: &mut dyn WorldHook) {
        let id = car.id().clone();
        let fresh = !self.store.contains(&id);
        self.store.insert(car);
        if fresh {
            if let Some(stored) = self.store.get(&id) {
                hook.spawn_car(stored);
            }
            self.run_resync(&id, hook);
        }
    }

    /// Issues the physical calls needed to bring a freshly materialized car up
    /// to the stored relation state. The mechanical coupling is only attempted
    /// within interaction range; out-of-range facts wait for the next resync.
    fn run_resync(&self, id: &CarId, hook: &mut dyn WorldHook) {
        for action in resync_plan(&self.store, id) {
            match action {
                ResyncAction::Couple { end, to, to_end } => {
                    if hook.couplers_in_range(id, end, &to, to_end) {
                        hook.couple(id, end, &to, to_end, false);
                    } else {
                        debug!("{id} {end}: {to} out of coupling range, retrying on next resync");
                    }
                }
                ResyncAction::ConnectHose { end, to, to_end } => {
                    hook.connect_hose(id, end, &to, to_end, true);
                }
                ResyncAction::OpenCock { end } => hook.set_cock(id, end, true),
                ResyncAction::LinkMultipleUnit { end, to, to_end } => {
                    hook.link_multiple_unit(id, end, &to, to_end, true);
                }
            }
        }
    }

    fn known(&self, tag: &str, id: &CarId) -> bool {
        let known = self.store.contains(id);
        if !known {
            debug!("{tag} references unknown car {id}, skipping");
        }
        known
    }

    fn send(&self, io: &mut dyn Transport, message: Message) -> Result<(), ClientError> {
        trace!("> {}", message.tag());
        let reliability = message.reliability();
        io.send(ClientId::HOST, &message, reliability)?;
        Ok(())
    }

    // Outbound surface. Local effects are applied to the replica store first;
    // the physical change already happened in the engine, on the player's own
    // action.

    /// Introduces locally spawned cars into the running session, opening an
    /// initialization barrier on the server.
    pub fn introduce_cars(
        &mut self,
        io: &mut dyn Transport,
        cars: Vec<Car>,
    ) -> Result<(), ClientError> {
        for car in &cars {
            self.store.insert(car.clone());
        }
        self.send(io, Message::EntitiesInit { cars })
    }

    pub fn request_full_sync(&mut self, io: &mut dyn Transport) -> Result<(), ClientError> {
        self.send(io, Message::SyncAllRequest)
    }

    /// Host only: pushes the full world state, replacing the server's store.
    pub fn send_host_sync(
        &mut self,
        io: &mut dyn Transport,
        cars: Vec<Car>,
    ) -> Result<(), ClientError> {
        self.send(io, Message::HostSync { cars })
    }

    /// Batched positional snapshots. Escalates to the reliable channel when
    /// any car in the batch is stationary.
    pub fn send_location_updates(
        &mut self,
        io: &mut dyn Transport,
        updates: Vec<LocationUpdate>,
    ) -> Result<(), ClientError> {
        for update in &updates {
            self.store.apply_if_newer(&update.car, update.timestamp, |car| {
                car.position = update.position;
                car.rotation = update.rotation;
                car.forward = update.forward;
                car.bogies = update.bogies.clone();
                car.is_stationary = update.is_stationary;
            });
        }
        self.send(io, Message::LocationUpdate { updates })
    }

    pub fn send_lever(
        &mut self,
        io: &mut dyn Transport,
        change: LeverChange,
    ) -> Result<(), ClientError> {
        cascade_lever(&mut self.store, &change.car, change.lever, change.value);
        self.send(io, Message::Lever(change))
    }

    pub fn send_couple(
        &mut self,
        io: &mut dyn Transport,
        change: CouplingChange,
    ) -> Result<(), ClientError> {
        set_coupled(
            &mut self.store,
            &change.car_a,
            change.a_end,
            &change.car_b,
            change.b_end,
            true,
        );
        self.send(io, Message::Couple(change))
    }

    pub fn send_uncouple(
        &mut self,
        io: &mut dyn Transport,
        change: CouplingChange,
    ) -> Result<(), ClientError> {
        set_coupled(
            &mut self.store,
            &change.car_a,
            change.a_end,
            &change.car_b,
            change.b_end,
            false,
        );
        self.send(io, Message::Uncouple(change))
    }

    pub fn send_hose(
        &mut self,
        io: &mut dyn Transport,
        change: HoseChange,
    ) -> Result<(), ClientError> {
        set_hose(
            &mut self.store,
            &change.car_a,
            change.a_end,
            &change.car_b,
            change.b_end,
            change.connected,
        );
        self.send(io, Message::CoupleHose(change))
    }

    pub fn send_cock(
        &mut self,
        io: &mut dyn Transport,
        change: CockChange,
    ) -> Result<(), ClientError> {
        set_cock(&mut self.store, &change.car, change.end, change.open);
        self.send(io, Message::CoupleCock(change))
    }

    pub fn send_damage(
        &mut self,
        io: &mut dyn Transport,
        damage: CarDamage,
    ) -> Result<(), ClientError> {
        apply_damage(&mut self.store, &damage);
        self.send(io, Message::Damage(damage))
    }

    pub fn send_cargo(
        &mut self,
        io: &mut dyn Transport,
        change: CargoChange,
    ) -> Result<(), ClientError> {
        self.store.upsert(&change.car, |car| {
            car.cargo_type = change.cargo_type.clone();
            car.cargo_amount = change.amount;
        });
        self.send(io, Message::CargoChange(change))
    }

    pub fn send_mu(
        &mut self,
        io: &mut dyn Transport,
        change: MuChange,
    ) -> Result<(), ClientError> {
        set_mu_link(
            &mut self.store,
            &change.car_a,
            change.a_end,
            &change.car_b,
            change.b_end,
            change.connected,
        );
        self.send(io, Message::MuChange(change))
    }

    pub fn send_car_sync(
        &mut self,
        io: &mut dyn Transport,
        sync: CarSync,
    ) -> Result<(), ClientError> {
        self.store.upsert(&sync.car, |car| {
            let steamer = car.steamer.get_or_insert_with(Default::default);
            steamer.fire_on = sync.fire_on;
            steamer.coal_in_firebox = sync.coal_in_firebox;
            steamer.coal_in_tender = sync.coal_in_tender;
            steamer.whistle = sync.whistle;
        });
        self.send(io, Message::CarSync(sync))
    }

    /// Asks the server to move authority over a cut of cars to this client.
    /// The owner is committed server-side; the confirming notice arrives as an
    /// `AUTH_CHANGE` after the latency-equalizing delay.
    pub fn request_authority(
        &mut self,
        io: &mut dyn Transport,
        cars: Vec<CarId>,
    ) -> Result<(), ClientError> {
        let new_owner = self.local;
        self.send(
            io,
            Message::AuthChange(railsync_shared::AuthorityChange { cars, new_owner }),
        )
    }

    pub fn send_player_car_change(
        &mut self,
        io: &mut dyn Transport,
        car: Option<CarId>,
    ) -> Result<(), ClientError> {
        let player = self.local;
        self.send(
            io,
            Message::PlayerCarChange(railsync_shared::PlayerCarChange { player, car }),
        )
    }

    pub fn send_rerail(
        &mut self,
        io: &mut dyn Transport,
        rerail: CarRerail,
    ) -> Result<(), ClientError> {
        apply_rerail(&mut self.store, &rerail);
        self.send(io, Message::Rerail(rerail))
    }

    pub fn send_derail(
        &mut self,
        io: &mut dyn Transport,
        derail: CarDerail,
    ) -> Result<(), ClientError> {
        apply_derail(&mut self.store, &derail);
        self.send(io, Message::Derail(derail))
    }

    pub fn send_removal(
        &mut self,
        io: &mut dyn Transport,
        removal: CarRemoval,
    ) -> Result<(), ClientError> {
        self.store.mark_removed(&removal.car);
        self.send(io, Message::Removal(removal))
    }
}

fn apply_damage(store: &mut EntityStore, damage: &CarDamage) {
    store.upsert(&damage.car, |car| match damage.kind {
        DamageKind::Car => {
            car.car_health = damage.new_health;
            car.car_damage_data = damage.data.clone();
        }
        DamageKind::Cargo => {
            car.cargo_health = damage.new_health;
        }
    });
}

fn apply_rerail(store: &mut EntityStore, rerail: &CarRerail) {
    store.upsert(&rerail.car, |car| {
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
}

fn apply_derail(store: &mut EntityStore, derail: &CarDerail) {
    store.upsert(&derail.car, |car| {
        car.bogies = [derail.bogie_1.clone(), derail.bogie_2.clone()];
        car.car_health = derail.car_health;
        car.cargo_health = derail.cargo_health;
    });
}
