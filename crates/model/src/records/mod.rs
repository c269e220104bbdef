pub mod batch;
pub mod dump;
pub mod row;
