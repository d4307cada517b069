use std::fmt;
use std::ops::Range;

use crate::error::WireError;
use crate::layout::Regions;

/// Bit 7 of a tag word: set when the word starts a run.
pub const RUN_BIT: u64 = 0x80;

/// Low 7 bits of a run tag word carry the run's argument type.
const TYPE_MASK: u64 = 0x7F;

/// The run length lives in the low 32 bits of the following tag word.
const RUN_LENGTH_MASK: u64 = 0xFFFF_FFFF;

/// The six argument types a slot can hold.
///
/// ```text
/// ┌──────┬────────────┬──────────────────────────────────────────┐
/// │ Wire │ Type       │ Slot contents                            │
/// ├──────┼────────────┼──────────────────────────────────────────┤
/// │ 0    │ Bool       │ low byte, non-zero = true                │
/// │ 1    │ Long       │ u64                                      │
/// │ 2    │ Double     │ IEEE-754 f64 bits                        │
/// │ 3    │ String     │ offset into the string heap              │
/// │ 4    │ Symbol     │ offset into the string heap              │
/// │ 5    │ Expression │ index into the expression table          │
/// └──────┴────────────┴──────────────────────────────────────────┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArgType {
    Bool = 0,
    Long = 1,
    Double = 2,
    String = 3,
    Symbol = 4,
    Expression = 5,
}

impl ArgType {
    /// Every variant in wire order.
    pub const ALL: [Self; 6] = [
        Self::Bool,
        Self::Long,
        Self::Double,
        Self::String,
        Self::Symbol,
        Self::Expression,
    ];

    /// Map a raw tag value to its type, or `None` if out of range.
    #[must_use]
    pub fn from_raw(value: u64) -> Option<Self> {
        match value {
            0 => Some(Self::Bool),
            1 => Some(Self::Long),
            2 => Some(Self::Double),
            3 => Some(Self::String),
            4 => Some(Self::Symbol),
            5 => Some(Self::Expression),
            _ => None,
        }
    }

    #[must_use]
    pub fn raw(self) -> u64 {
        self as u64
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "Bool",
            Self::Long => "Long",
            Self::Double => "Double",
            Self::String => "String",
            Self::Symbol => "Symbol",
            Self::Expression => "Expression",
        }
    }
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded type tag: either a single slot or a homogeneous run.
///
/// On the wire a run is a tag word with [`RUN_BIT`] set whose length is
/// packed into the tag word of the *next* slot:
///
/// ```text
///   argTypes[i]     = 0x80 | type
///   argTypes[i + 1] = run length N (low 32 bits)
///   argTypes[i + 2 .. i + N]  covered by the run, not consulted
/// ```
///
/// Decoding into this enum once per logical tag keeps the overlap of the
/// length word out of every caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeTag {
    Single(ArgType),
    Run(ArgType, u32),
}

impl TypeTag {
    /// Decode the tag at `slot`.
    ///
    /// # Errors
    ///
    /// - [`WireError::SlotOutOfRange`] if `slot` is past `argCount`.
    /// - [`WireError::UnknownTypeTag`] if the type bits name no variant.
    /// - [`WireError::MalformedRun`] if a run tag sits on the last slot
    ///   (no room for its length word) or declares fewer than two slots,
    ///   since its length word already occupies slot `i + 1`.
    pub fn read(regions: &Regions<'_>, slot: usize) -> Result<Self, WireError> {
        let word = regions.tag_word(slot)?;

        if word & RUN_BIT == 0 {
            return ArgType::from_raw(word)
                .map(Self::Single)
                .ok_or(WireError::UnknownTypeTag { slot, value: word });
        }

        let raw_type = word & TYPE_MASK;
        let arg_type = ArgType::from_raw(raw_type).ok_or(WireError::UnknownTypeTag {
            slot,
            value: raw_type,
        })?;

        let length_word = slot
            .checked_add(1)
            .and_then(|next| regions.tag_word(next).ok())
            .ok_or(WireError::MalformedRun {
                slot,
                reason: "run length word lies past the argument types",
            })?;
        #[allow(clippy::cast_possible_truncation)]
        let length = (length_word & RUN_LENGTH_MASK) as u32;
        if length < 2 {
            return Err(WireError::MalformedRun {
                slot,
                reason: "run shorter than two slots",
            });
        }

        Ok(Self::Run(arg_type, length))
    }

    #[must_use]
    pub fn arg_type(self) -> ArgType {
        match self {
            Self::Single(arg_type) | Self::Run(arg_type, _) => arg_type,
        }
    }

    /// Number of slots this tag covers.
    #[must_use]
    pub fn span(self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Run(_, length) => length as usize,
        }
    }
}

/// A homogeneous block of child slots: one single slot or one whole run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagBlock {
    pub arg_type: ArgType,
    pub slots: Range<usize>,
}

/// Walks a child slot range tag by tag, yielding one [`TagBlock`] per
/// logical tag.
///
/// Only tag words are read; skipping a block never touches the value
/// slots. After the first error the iterator is exhausted.
#[derive(Clone, Debug)]
pub struct TagBlocks<'a> {
    regions: Regions<'a>,
    cursor: usize,
    end: usize,
}

impl<'a> TagBlocks<'a> {
    #[must_use]
    pub fn new(regions: Regions<'a>, slots: Range<usize>) -> Self {
        Self {
            regions,
            cursor: slots.start,
            end: slots.end,
        }
    }

    /// Slots not yet covered by a yielded block.
    #[must_use]
    pub fn remaining(&self) -> Range<usize> {
        self.cursor..self.end
    }
}

impl Iterator for TagBlocks<'_> {
    type Item = Result<TagBlock, WireError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.end {
            return None;
        }
        let start = self.cursor;

        let tag = match TypeTag::read(&self.regions, start) {
            Ok(tag) => tag,
            Err(err) => {
                self.cursor = self.end;
                return Some(Err(err));
            }
        };

        let end = match start.checked_add(tag.span()) {
            Some(end) if end <= self.end => end,
            _ => {
                self.cursor = self.end;
                return Some(Err(WireError::MalformedRun {
                    slot: start,
                    reason: "run extends past the expression's child range",
                }));
            }
        };

        self.cursor = end;
        Some(Ok(TagBlock {
            arg_type: tag.arg_type(),
            slots: start..end,
        }))
    }
}
