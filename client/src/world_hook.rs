use railsync_shared::{
    Car, CarDamage, CarDerail, CarEnd, CarId, CarRerail, CarSync, ClientId, LocationUpdate,
    Lever,
};

/// Boundary to the local physics/rendering engine. The replication core keeps
/// the replica store; everything the player actually sees happens behind this
/// trait.
///
/// All callbacks default to no-ops so an integration only implements what its
/// engine surface needs.
pub trait WorldHook {
    /// A previously-unknown car has materialized from a snapshot.
    fn spawn_car(&mut self, car: &Car) {
        let _ = car;
    }

    fn remove_car(&mut self, id: &CarId) {
        let _ = id;
    }

    /// Accepted positional snapshot; stale ones never reach here.
    fn move_car(&mut self, update: &LocationUpdate) {
        let _ = update;
    }

    fn apply_lever(&mut self, id: &CarId, lever: Lever, value: f32) {
        let _ = (id, lever, value);
    }

    fn couple(&mut self, id: &CarId, end: CarEnd, to: &CarId, to_end: CarEnd, via_chain: bool) {
        let _ = (id, end, to, to_end, via_chain);
    }

    fn uncouple(&mut self, id: &CarId, end: CarEnd, from: &CarId, from_end: CarEnd) {
        let _ = (id, end, from, from_end);
    }

    fn connect_hose(&mut self, id: &CarId, end: CarEnd, to: &CarId, to_end: CarEnd, connected: bool) {
        let _ = (id, end, to, to_end, connected);
    }

    fn set_cock(&mut self, id: &CarId, end: CarEnd, open: bool) {
        let _ = (id, end, open);
    }

    fn link_multiple_unit(&mut self, id: &CarId, end: CarEnd, to: &CarId, to_end: CarEnd, connected: bool) {
        let _ = (id, end, to, to_end, connected);
    }

    fn apply_damage(&mut self, damage: &CarDamage) {
        let _ = damage;
    }

    fn load_cargo(&mut self, id: &CarId, cargo_type: &str, amount: f32) {
        let _ = (id, cargo_type, amount);
    }

    fn sync_steam(&mut self, sync: &CarSync) {
        let _ = sync;
    }

    /// Authority over `id` has moved; `mine` is true when the local player is
    /// the new owner and may start simulating the car.
    fn authority_changed(&mut self, id: &CarId, new_owner: ClientId, mine: bool) {
        let _ = (id, new_owner, mine);
    }

    fn player_car_changed(&mut self, player: ClientId, car: Option<&CarId>) {
        let _ = (player, car);
    }

    fn rerail(&mut self, rerail: &CarRerail) {
        let _ = rerail;
    }

    fn derail(&mut self, derail: &CarDerail) {
        let _ = derail;
    }

    /// Real-time updates pause while an initialization barrier is loading and
    /// resume when its notice arrives.
    fn pause_world(&mut self) {}

    fn resume_world(&mut self) {}

    /// Whether the two couplers are physically close enough to join. The
    /// materialization resync attempts the mechanical coupling only when they
    /// are; the stored fact is retried on the next resync otherwise.
    fn couplers_in_range(&self, id: &CarId, end: CarEnd, to: &CarId, to_end: CarEnd) -> bool {
        let _ = (id, end, to, to_end);
        true
    }
}
