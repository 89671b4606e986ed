//! Snippet marker round-trip layer.
//!
//! # Responsibility
//! - Wrap snippet bodies in language-appropriate begin/end comment markers.
//! - Parse marked text back into ephemeral patches.
//!
//! # Invariants
//! - `parse(wrap(spec, body))` yields one patch with a byte-identical body.
//! - Attribute escaping round-trips every id and filename.

pub mod checksum;
pub mod marker;

pub use checksum::fnv1a_hex;
pub use marker::{parse, wrap, MarkerError, MarkerResult};
