pub mod error;
pub mod export;
pub mod loader;
pub mod schema;
pub mod validation;
