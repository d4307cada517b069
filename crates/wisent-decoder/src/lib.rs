#![warn(clippy::pedantic)]

pub mod eager;
pub mod error;
pub mod lazy;
pub mod slot;

pub use eager::{DEFAULT_MAX_DEPTH, EagerDecoder};
pub use error::DecodeError;
pub use lazy::{Arguments, LazyValue, LazyView};
pub use slot::{SlotValue, read_slot};
