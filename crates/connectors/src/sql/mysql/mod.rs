pub mod adapter;
pub mod source;
