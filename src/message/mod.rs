//! IRC message model, line grammar and tag codec.

mod parse;
pub mod tags;
mod types;

pub use self::parse::RawMessage;
pub use self::tags::{TagValue, Tags};
pub use self::types::Message;
