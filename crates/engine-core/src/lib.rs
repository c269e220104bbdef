pub mod error;
pub mod mapping;
pub mod progress;
pub mod stats;
