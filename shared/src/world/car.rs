use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    math::{Quat, Vec3},
    types::{ClientId, Timestamp},
};

/// Globally-unique, stable identifier of a car for the lifetime of the session.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub struct CarId(String);

impl CarId {
    pub fn new(id: impl Into<String>) -> Self {
        CarId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What kind of rolling stock a car is. `Unknown` is the placeholder kind a
/// record synthesized from a stray mutation carries until the first full sync
/// fills it in.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum CarKind {
    #[default]
    Unknown,
    Freight,
    Shunter,
    Diesel,
    SteamHeavy,
    Tender,
}

impl CarKind {
    pub fn is_loco(&self) -> bool {
        matches!(self, CarKind::Shunter | CarKind::Diesel | CarKind::SteamHeavy)
    }

    /// Only shunters and diesels carry multiple-unit cabling.
    pub fn supports_multiple_unit(&self) -> bool {
        matches!(self, CarKind::Shunter | CarKind::Diesel)
    }
}

/// One of the two ends of a car. Couplers, hoses, cocks and MU cables all
/// attach per end.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum CarEnd {
    Front,
    Rear,
}

impl CarEnd {
    pub fn opposite(&self) -> CarEnd {
        match self {
            CarEnd::Front => CarEnd::Rear,
            CarEnd::Rear => CarEnd::Front,
        }
    }
}

impl fmt::Display for CarEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CarEnd::Front => f.write_str("front"),
            CarEnd::Rear => f.write_str("rear"),
        }
    }
}

/// One track-contact point. A car has exactly two.
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct Bogie {
    pub track: String,
    pub position_along_track: f64,
    pub derailed: bool,
}

/// Coupler state for one end of a car. The hose and the cock are secondary
/// attributes: a hose can be connected without the couplers being joined, and
/// the cock is a per-coupler valve independent of both.
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct CouplerEnd {
    pub coupled_to: Option<CarId>,
    pub hose_connected_to: Option<CarId>,
    pub cock_open: bool,
}

/// Multiple-unit cabling: an undirected link per end, degree at most one each.
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct MultipleUnit {
    pub front_connected_to: Option<CarId>,
    pub rear_connected_to: Option<CarId>,
}

impl MultipleUnit {
    pub fn link(&self, end: CarEnd) -> Option<&CarId> {
        match end {
            CarEnd::Front => self.front_connected_to.as_ref(),
            CarEnd::Rear => self.rear_connected_to.as_ref(),
        }
    }

    pub fn set_link(&mut self, end: CarEnd, to: Option<CarId>) {
        match end {
            CarEnd::Front => self.front_connected_to = to,
            CarEnd::Rear => self.rear_connected_to = to,
        }
    }
}

#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct ShunterControls {
    pub engine_on: bool,
    pub main_fuse_on: bool,
    pub side_fuse_1_on: bool,
    pub side_fuse_2_on: bool,
}

#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct DieselControls {
    pub engine_on: bool,
    pub main_fuse_on: bool,
    pub side_fuse_1_on: bool,
    pub side_fuse_2_on: bool,
    pub side_fuse_3_on: bool,
}

#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct SteamerControls {
    pub fire_door: f32,
    pub water_dump: f32,
    pub steam_release: f32,
    pub blower: f32,
    pub blank_valve: f32,
    pub fire_out: f32,
    pub injector: f32,
    pub sander: f32,
    pub light_lever: f32,
    pub light_switch: f32,
    pub fire_on: bool,
    pub coal_in_firebox: f32,
    pub coal_in_tender: f32,
    pub whistle: f32,
}

/// Canonical replicated record of one car. Owned by the entity state store;
/// every other component reads and writes through it.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Car {
    id: CarId,
    pub kind: CarKind,
    pub position: Vec3,
    pub rotation: Quat,
    pub forward: Vec3,
    pub bogies: [Bogie; 2],
    pub is_stationary: bool,
    pub car_health: f32,
    /// Opaque serialized damage blob, interpreted only by the physics side.
    pub car_damage_data: String,
    pub cargo_health: f32,
    pub cargo_type: String,
    pub cargo_amount: f32,
    pub front_coupler: CouplerEnd,
    pub rear_coupler: CouplerEnd,
    pub multiple_unit: MultipleUnit,
    pub throttle: f32,
    pub brake: f32,
    pub independent_brake: f32,
    pub sander: f32,
    pub reverser: f32,
    pub shunter: Option<ShunterControls>,
    pub diesel: Option<DieselControls>,
    pub steamer: Option<SteamerControls>,
    pub authority_owner: ClientId,
    pub updated_at: Timestamp,
    /// Removal is a tombstone so late stale references still resolve.
    pub is_removed: bool,
}

impl Car {
    pub fn new(id: CarId, kind: CarKind) -> Self {
        Car {
            id,
            kind,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            forward: Vec3::ZERO,
            bogies: [Bogie::default(), Bogie::default()],
            is_stationary: true,
            car_health: 1.0,
            car_damage_data: String::new(),
            cargo_health: 1.0,
            cargo_type: String::new(),
            cargo_amount: 0.0,
            front_coupler: CouplerEnd::default(),
            rear_coupler: CouplerEnd::default(),
            multiple_unit: MultipleUnit::default(),
            throttle: 0.0,
            brake: 0.0,
            independent_brake: 0.0,
            sander: 0.0,
            reverser: 0.0,
            shunter: None,
            diesel: None,
            steamer: None,
            authority_owner: ClientId::HOST,
            updated_at: 0,
            is_removed: false,
        }
    }

    /// Record synthesized from a mutation referencing an id nobody has spawned
    /// yet. The kind stays `Unknown` until the next full sync.
    pub fn placeholder(id: CarId) -> Self {
        Car::new(id, CarKind::Unknown)
    }

    pub fn id(&self) -> &CarId {
        &self.id
    }

    pub fn coupler(&self, end: CarEnd) -> &CouplerEnd {
        match end {
            CarEnd::Front => &self.front_coupler,
            CarEnd::Rear => &self.rear_coupler,
        }
    }

    pub fn coupler_mut(&mut self, end: CarEnd) -> &mut CouplerEnd {
        match end {
            CarEnd::Front => &mut self.front_coupler,
            CarEnd::Rear => &mut self.rear_coupler,
        }
    }

    /// Rerailing a locomotive returns its controls to safe defaults: levers
    /// zeroed, independent brake set, fuses pulled, engine off.
    pub fn reset_controls(&mut self) {
        self.throttle = 0.0;
        self.sander = 0.0;
        self.brake = 0.0;
        self.independent_brake = 1.0;
        self.reverser = 0.0;
        if let Some(shunter) = &mut self.shunter {
            shunter.engine_on = false;
            shunter.main_fuse_on = false;
            shunter.side_fuse_1_on = false;
            shunter.side_fuse_2_on = false;
        }
        if let Some(diesel) = &mut self.diesel {
            diesel.engine_on = false;
            diesel.main_fuse_on = false;
            diesel.side_fuse_1_on = false;
            diesel.side_fuse_2_on = false;
            diesel.side_fuse_3_on = false;
        }
    }
}
