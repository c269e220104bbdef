pub mod failed_row;
pub mod validation;
