pub mod inference;
pub mod mapper;
pub mod naming;
pub mod preview;
