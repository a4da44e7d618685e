pub mod car;
pub mod cascade;
pub mod controls;
pub mod coupling;
pub mod store;
