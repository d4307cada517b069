use wisent_wire::string_heap::read_string;
use wisent_wire::{ArgType, Regions, WireError};

/// One argument slot interpreted according to its type tag.
///
/// Strings and symbols borrow from the buffer's string heap. Expressions
/// stay as an index into the expression table until someone follows them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SlotValue<'a> {
    Bool(bool),
    Long(u64),
    Double(f64),
    String(&'a str),
    Symbol(&'a str),
    Expression(u64),
}

impl SlotValue<'_> {
    #[must_use]
    pub fn arg_type(&self) -> ArgType {
        match self {
            Self::Bool(_) => ArgType::Bool,
            Self::Long(_) => ArgType::Long,
            Self::Double(_) => ArgType::Double,
            Self::String(_) => ArgType::String,
            Self::Symbol(_) => ArgType::Symbol,
            Self::Expression(_) => ArgType::Expression,
        }
    }
}

/// Read slot `slot` as a value of `arg_type`.
///
/// A bool is the low byte of the slot; any non-zero byte is `true`.
///
/// # Errors
///
/// - [`WireError::SlotOutOfRange`] if `slot` is past `argCount`.
/// - String heap errors for `String` and `Symbol` slots.
pub fn read_slot<'a>(
    regions: &Regions<'a>,
    arg_type: ArgType,
    slot: usize,
) -> Result<SlotValue<'a>, WireError> {
    let word = regions.arg_word(slot)?;
    Ok(match arg_type {
        ArgType::Bool => SlotValue::Bool(word & 0xFF != 0),
        ArgType::Long => SlotValue::Long(word),
        ArgType::Double => SlotValue::Double(f64::from_bits(word)),
        ArgType::String => SlotValue::String(read_string(regions.strings(), word)?),
        ArgType::Symbol => SlotValue::Symbol(read_string(regions.strings(), word)?),
        ArgType::Expression => SlotValue::Expression(word),
    })
}
