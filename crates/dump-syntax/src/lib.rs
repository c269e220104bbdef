pub mod encoding;
pub mod error;
pub mod lexer;
pub mod normalize;
pub mod sentinel;

pub use lexer::{InsertStatement, parse_insert};
pub use normalize::normalize_token;
