#![warn(clippy::pedantic)]

pub mod error;
pub mod layout;
pub mod string_heap;
pub mod type_tag;

pub use error::WireError;
pub use layout::{ExpressionRecord, Regions, RootHeader};
pub use type_tag::{ArgType, TagBlock, TagBlocks, TypeTag};
