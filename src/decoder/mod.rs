//! Binary element decoding primitives.
//!
//! Shared by every binary geometry format:
//! - [`decode_vertex_buffer`] - self-describing interleaved vertex blocks
//! - [`decode_index_buffer`] - 16/32-bit index streams
//! - [`decode_curve`] - parametric animation curves
//! - [`BinaryWriter`] - the matching encoder

mod curve;
mod index;
mod reader;
mod vertex;
mod writer;

pub use curve::{decode_curve, Curve};
pub use index::decode_index_buffer;
pub use reader::BinaryReader;
pub use vertex::{decode_vertex_buffer, read_scalar};
pub use writer::BinaryWriter;
