//! Ingress helpers for the damage-zone model.
//!
//! This crate re-exports the data contracts from `damage_schema` and turns the
//! text and JSON records produced by external transports into
//! [`DamageEvent`]s without depending on the core model.

mod command_text;
mod events;

pub use command_text::{parse_command_line, CommandParseError, ConsoleCommand};
pub use damage_schema::*;
pub use events::{decode_event_json, decode_event_lines, encode_event_json, EventDecodeError};
