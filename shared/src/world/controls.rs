use serde::{Deserialize, Serialize};

use crate::world::car::{Car, CarKind};

/// Every replicated control input. Only the first five cascade across
/// multiple-unit links; the rest are local to the car they arrive on.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Lever {
    Throttle,
    Brake,
    IndependentBrake,
    Sander,
    Reverser,
    MainFuse,
    SideFuse1,
    SideFuse2,
    SideFuse3,
    FusePowerStarter,
    FireDoor,
    WaterDump,
    SteamRelease,
    Blower,
    BlankValve,
    FireOut,
    Injector,
    SteamSander,
    LightLever,
    LightSwitch,
}

impl Lever {
    /// Whether this control is slaved across multiple-unit links.
    pub fn cascades(&self) -> bool {
        matches!(
            self,
            Lever::Throttle
                | Lever::Brake
                | Lever::IndependentBrake
                | Lever::Sander
                | Lever::Reverser
        )
    }
}

/// Writes one control input into a car record, including the kind-specific
/// fuse/engine interlocks: pulling any fuse kills the engine, and the power
/// starter only lights it when every fuse of that kind is on.
pub fn apply_lever(car: &mut Car, lever: Lever, value: f32) {
    match lever {
        Lever::Throttle => car.throttle = value,
        Lever::Brake => car.brake = value,
        Lever::IndependentBrake => car.independent_brake = value,
        Lever::Sander => car.sander = value,
        Lever::Reverser => car.reverser = value,
        _ => {}
    }

    let on = value == 1.0;
    match car.kind {
        CarKind::Shunter => {
            let shunter = car.shunter.get_or_insert_with(Default::default);
            match lever {
                Lever::MainFuse => {
                    shunter.main_fuse_on = on;
                    if !on {
                        shunter.engine_on = false;
                    }
                }
                Lever::SideFuse1 => {
                    shunter.side_fuse_1_on = on;
                    if !on {
                        shunter.engine_on = false;
                    }
                }
                Lever::SideFuse2 => {
                    shunter.side_fuse_2_on = on;
                    if !on {
                        shunter.engine_on = false;
                    }
                }
                Lever::FusePowerStarter => {
                    if shunter.main_fuse_on
                        && shunter.side_fuse_1_on
                        && shunter.side_fuse_2_on
                        && on
                    {
                        shunter.engine_on = true;
                    } else if !on {
                        shunter.engine_on = false;
                    }
                }
                _ => {}
            }
        }
        CarKind::Diesel => {
            let diesel = car.diesel.get_or_insert_with(Default::default);
            match lever {
                Lever::MainFuse => {
                    diesel.main_fuse_on = on;
                    if !on {
                        diesel.engine_on = false;
                    }
                }
                Lever::SideFuse1 => {
                    diesel.side_fuse_1_on = on;
                    if !on {
                        diesel.engine_on = false;
                    }
                }
                Lever::SideFuse2 => {
                    diesel.side_fuse_2_on = on;
                    if !on {
                        diesel.engine_on = false;
                    }
                }
                Lever::SideFuse3 => {
                    diesel.side_fuse_3_on = on;
                    if !on {
                        diesel.engine_on = false;
                    }
                }
                Lever::FusePowerStarter => {
                    if diesel.main_fuse_on
                        && diesel.side_fuse_1_on
                        && diesel.side_fuse_2_on
                        && diesel.side_fuse_3_on
                        && on
                    {
                        diesel.engine_on = true;
                    } else if !on {
                        diesel.engine_on = false;
                    }
                }
                _ => {}
            }
        }
        CarKind::SteamHeavy => {
            let steamer = car.steamer.get_or_insert_with(Default::default);
            match lever {
                Lever::FireDoor => steamer.fire_door = value,
                Lever::WaterDump => steamer.water_dump = value,
                Lever::SteamRelease => steamer.steam_release = value,
                Lever::Blower => steamer.blower = value,
                Lever::BlankValve => steamer.blank_valve = value,
                Lever::FireOut => steamer.fire_out = value,
                Lever::Injector => steamer.injector = value,
                Lever::SteamSander => steamer.sander = value,
                Lever::LightLever => steamer.light_lever = value,
                Lever::LightSwitch => steamer.light_switch = value,
                _ => {}
            }
        }
        _ => {}
    }
}
