//! # Railsync Shared
//! Common replication functionality shared between the railsync-server &
//! railsync-client crates: the car data model, the last-writer-wins entity
//! store, the coupling relation graph, control cascading, the readiness
//! buffer and the message taxonomy.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod buffer;
mod math;
mod messages;
mod time_queue;
mod transport;
mod types;
mod world;

pub use buffer::MessageBuffer;
pub use math::{Quat, Vec3};
pub use messages::{
    message::{
        AuthorityChange, CarDamage, CarDerail, CargoChange, CarRemoval, CarRerail, CarSync,
        CockChange, CouplingChange, DamageKind, HoseChange, LeverChange, LocationUpdate, Message,
        MuChange, PlayerCarChange,
    },
    reliability::Reliability,
};
pub use time_queue::TimeQueue;
pub use transport::{
    error::TransportError,
    memory::{MemoryTransport, SentMessage},
    Transport, TransportEvent,
};
pub use types::{ClientId, Timestamp};
pub use world::{
    car::{
        Bogie, Car, CarEnd, CarId, CarKind, CouplerEnd, DieselControls, MultipleUnit,
        ShunterControls, SteamerControls,
    },
    cascade::cascade_lever,
    controls::{apply_lever, Lever},
    coupling::{
        resync_plan, set_cock, set_coupled, set_hose, set_mu_link, ResyncAction,
    },
    store::{ApplyOutcome, EntityStore},
};
