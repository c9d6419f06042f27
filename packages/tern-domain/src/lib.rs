pub mod dedup;
pub mod record;
pub mod source;

mod error;

pub use error::{Error, Result};
