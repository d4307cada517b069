#![warn(clippy::pedantic)]

pub mod shape;
pub mod value;

pub use shape::Shape;
pub use value::{Expression, Value};
pub use wisent_wire::ArgType;
