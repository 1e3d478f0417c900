//! # Block Module
//!
//! Block type definitions and block face handling.

pub mod block_side;
pub mod block_type;

/// The underlying integer type used to represent block types in chunk storage.
pub type BlockTypeSize = u16;
