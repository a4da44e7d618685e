use serde::{Deserialize, Serialize};

use crate::{
    math::{Quat, Vec3},
    messages::reliability::Reliability,
    types::{ClientId, Timestamp},
    world::car::{Bogie, Car, CarEnd, CarId},
    world::controls::Lever,
};

/// One car's positional snapshot, sent over the unreliable channel and
/// reconciled by `timestamp`.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct LocationUpdate {
    pub car: CarId,
    pub position: Vec3,
    pub rotation: Quat,
    pub forward: Vec3,
    pub bogies: [Bogie; 2],
    pub is_stationary: bool,
    pub timestamp: Timestamp,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct LeverChange {
    pub car: CarId,
    pub lever: Lever,
    pub value: f32,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct CouplingChange {
    pub car_a: CarId,
    pub a_end: CarEnd,
    pub car_b: CarId,
    pub b_end: CarEnd,
    /// Whether the player joined the cars by chain interaction rather than
    /// buffer contact; the physics side replays the same gesture.
    pub via_chain_interaction: bool,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct HoseChange {
    pub car_a: CarId,
    pub a_end: CarEnd,
    pub car_b: CarId,
    pub b_end: CarEnd,
    pub connected: bool,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct CockChange {
    pub car: CarId,
    pub end: CarEnd,
    pub open: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum DamageKind {
    Car,
    Cargo,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct CarDamage {
    pub car: CarId,
    pub kind: DamageKind,
    pub new_health: f32,
    /// Opaque serialized damage blob, passed through to the physics side.
    pub data: String,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct CargoChange {
    pub car: CarId,
    pub cargo_type: String,
    pub amount: f32,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct MuChange {
    pub car_a: CarId,
    pub a_end: CarEnd,
    pub car_b: CarId,
    pub b_end: CarEnd,
    pub connected: bool,
}

/// Transfers authority over a cut of cars to one new owner in a single
/// message; grabbing a consist moves every car in it.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct AuthorityChange {
    pub cars: Vec<CarId>,
    pub new_owner: ClientId,
}

/// Player-to-car association ("which car is this player driving").
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct PlayerCarChange {
    pub player: ClientId,
    pub car: Option<CarId>,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct CarRerail {
    pub car: CarId,
    pub bogie_1: Bogie,
    pub bogie_2: Bogie,
    pub position: Vec3,
    pub forward: Vec3,
    pub rotation: Quat,
    pub car_health: f32,
    pub cargo_health: f32,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct CarDerail {
    pub car: CarId,
    pub bogie_1: Bogie,
    pub bogie_2: Bogie,
    pub car_health: f32,
    pub cargo_health: f32,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct CarRemoval {
    pub car: CarId,
}

/// Reliable partial merge of a steam locomotive's burn state; too coarse for
/// the positional channel, too frequent for a full snapshot.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct CarSync {
    pub car: CarId,
    pub fire_on: bool,
    pub coal_in_firebox: f32,
    pub coal_in_tender: f32,
    pub whistle: f32,
}

/// Every message exchanged through the transport adapter. A closed sum type:
/// dispatchers match exhaustively, so a new tag fails to compile until every
/// handler decides what to do with it.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub enum Message {
    /// New cars introduced into the running session; opens an initialization
    /// barrier.
    EntitiesInit { cars: Vec<Car> },
    /// Barrier acknowledgment (client -> server) and resume notice
    /// (server -> client).
    EntitiesInitFinished,
    /// Host pushes its full world state, replacing the server's store.
    HostSync { cars: Vec<Car> },
    /// Client asks for the full active snapshot.
    SyncAllRequest,
    /// Full active snapshot (server -> client).
    SyncAll { cars: Vec<Car> },
    CarSync(CarSync),
    /// Batched positional snapshots. Unreliable, unless a car in the batch
    /// reports stationary: the last physical position must survive packet
    /// loss, so stationary batches escalate to the reliable channel.
    LocationUpdate { updates: Vec<LocationUpdate> },
    Lever(LeverChange),
    Couple(CouplingChange),
    Uncouple(CouplingChange),
    CoupleHose(HoseChange),
    CoupleCock(CockChange),
    Damage(CarDamage),
    CargoChange(CargoChange),
    MuChange(MuChange),
    AuthChange(AuthorityChange),
    PlayerCarChange(PlayerCarChange),
    Rerail(CarRerail),
    Derail(CarDerail),
    Removal(CarRemoval),
}

impl Message {
    /// Delivery guarantee for this tag, fixed by protocol.
    pub fn reliability(&self) -> Reliability {
        match self {
            Message::LocationUpdate { updates } => {
                if updates.iter().any(|u| u.is_stationary) {
                    Reliability::Reliable
                } else {
                    Reliability::Unreliable
                }
            }
            _ => Reliability::Reliable,
        }
    }

    /// Whether a client may only process this message once its own
    /// initialization handshake has completed. Such messages are deferred, not
    /// dropped. Positional updates are exempt (a fresh one arrives soon).
    pub fn requires_ready_replica(&self) -> bool {
        match self {
            Message::EntitiesInit { .. }
            | Message::CarSync(_)
            | Message::Lever(_)
            | Message::Couple(_)
            | Message::Uncouple(_)
            | Message::CoupleHose(_)
            | Message::CoupleCock(_)
            | Message::Damage(_)
            | Message::CargoChange(_)
            | Message::MuChange(_)
            | Message::AuthChange(_)
            | Message::PlayerCarChange(_)
            | Message::Rerail(_)
            | Message::Derail(_)
            | Message::Removal(_) => true,
            Message::EntitiesInitFinished
            | Message::HostSync { .. }
            | Message::SyncAllRequest
            | Message::SyncAll { .. }
            | Message::LocationUpdate { .. } => false,
        }
    }

    /// Wire tag name, for trace logging.
    pub fn tag(&self) -> &'static str {
        match self {
            Message::EntitiesInit { .. } => "ENTITIES_INIT",
            Message::EntitiesInitFinished => "ENTITIES_INIT_FINISHED",
            Message::HostSync { .. } => "HOST_SYNC",
            Message::SyncAllRequest => "SYNC_ALL_REQUEST",
            Message::SyncAll { .. } => "SYNC_ALL",
            Message::CarSync(_) => "CAR_SYNC",
            Message::LocationUpdate { .. } => "LOCATION_UPDATE",
            Message::Lever(_) => "LEVER",
            Message::Couple(_) => "COUPLE",
            Message::Uncouple(_) => "UNCOUPLE",
            Message::CoupleHose(_) => "COUPLE_HOSE",
            Message::CoupleCock(_) => "COUPLE_COCK",
            Message::Damage(_) => "DAMAGE",
            Message::CargoChange(_) => "CARGO_CHANGE",
            Message::MuChange(_) => "MU_CHANGE",
            Message::AuthChange(_) => "AUTH_CHANGE",
            Message::PlayerCarChange(_) => "SWITCH",
            Message::Rerail(_) => "RERAIL",
            Message::Derail(_) => "DERAIL",
            Message::Removal(_) => "REMOVAL",
        }
    }
}
