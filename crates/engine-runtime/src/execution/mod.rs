pub mod categorize;
pub mod executor;
pub mod ordering;
pub mod preview;

pub use executor::run;
