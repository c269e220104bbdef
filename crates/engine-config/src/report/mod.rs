pub mod finding;
pub mod mapping;
pub mod migration;
pub mod validation;
pub mod verdict;
