//! Text↔graph reconciliation: the two-pass parser (component D) and the
//! graph→text serializer (component E). Both operate on a `core_state::World`
//! and never raise errors up the stack — diagnostics are returned as data
//! (`ParseReport`) per the error-handling design.

pub mod date;
pub mod parse;
pub mod serialize;

pub use date::{format_date, parse_date};
pub use parse::{parse_text, strip_borders, ParseReport};
pub use serialize::{serialize, ProjectionFilter, Serialized};
