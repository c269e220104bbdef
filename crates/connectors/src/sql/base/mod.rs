pub mod destination;
pub mod error;
