//! Command Normalizer
//!
//! Turns a `RawInvocation` into a `NormalizedCommand` or a typed
//! `Rejection`:
//!
//! 1. Name resolution: exact, then snake_case transform, else `UnknownCommand`
//! 2. Parameter resolution: exact, alias, snake_case key; unknown keys dropped
//! 3. Value canonicalisation: addresses reduced to bare hex, integers to decimal
//! 4. Completeness: the first missing required parameter is `MissingParameter`
//!
//! No I/O happens here.

mod address;
mod naming;
mod normalizer;

pub use address::{canonicalize_address, is_hex, parse_integer};
pub use naming::{closest_name, edit_distance, to_snake_case};
pub use normalizer::{NormalizedCommand, Normalizer, Rejection};
