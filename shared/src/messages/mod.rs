pub mod message;
pub mod reliability;
