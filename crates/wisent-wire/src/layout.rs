use std::ops::Range;

use crate::error::WireError;

/// Size of the fixed root header in bytes.
///
/// Two counts followed by 16 bytes the producer uses for its own
/// bookkeeping (the mapping address it was built at and the string fill
/// index).
pub const HEADER_SIZE: usize = 32;

/// Width of one argument slot and of one type tag word.
pub const SLOT_SIZE: usize = 8;

/// Width of one expression record: head offset, start child, end child.
pub const EXPRESSION_SIZE: usize = 24;

/// Read a little-endian `u64` at `at`, or `None` if the word would run
/// past the end of `buf`.
pub(crate) fn read_word(buf: &[u8], at: usize) -> Option<u64> {
    let end = at.checked_add(SLOT_SIZE)?;
    let bytes: [u8; SLOT_SIZE] = buf.get(at..end)?.try_into().ok()?;
    Some(u64::from_le_bytes(bytes))
}

/// The root header: the first 32 bytes of every buffer.
///
/// ```text
/// ┌────────┬─────────┬──────────────────────────────────────┐
/// │ Offset │ Size    │ Description                          │
/// ├────────┼─────────┼──────────────────────────────────────┤
/// │ 0x00   │ 8 bytes │ argCount  (u64)                      │
/// │ 0x08   │ 8 bytes │ exprCount (u64)                      │
/// │ 0x10   │ 16 bytes│ Reserved, producer-internal, ignored │
/// └────────┴─────────┴──────────────────────────────────────┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RootHeader {
    pub arg_count: u64,
    pub expr_count: u64,
}

impl RootHeader {
    /// Parse the two counts from the first 32 bytes of `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::TruncatedBuffer`] if `buf` is shorter than
    /// [`HEADER_SIZE`].
    pub fn read_from(buf: &[u8]) -> Result<Self, WireError> {
        let truncated = || WireError::TruncatedBuffer {
            required: HEADER_SIZE as u64,
            actual: buf.len(),
        };
        if buf.len() < HEADER_SIZE {
            return Err(truncated());
        }
        let arg_count = read_word(buf, 0).ok_or_else(truncated)?;
        let expr_count = read_word(buf, SLOT_SIZE).ok_or_else(truncated)?;
        Ok(Self {
            arg_count,
            expr_count,
        })
    }

    /// Minimum buffer length implied by the counts:
    /// `32 + argCount * 16 + exprCount * 24`.
    ///
    /// Saturates instead of wrapping, so absurd counts yield a length no
    /// real buffer can satisfy.
    #[must_use]
    pub fn required_len(&self) -> u64 {
        (HEADER_SIZE as u64)
            .saturating_add(self.arg_count.saturating_mul(2 * SLOT_SIZE as u64))
            .saturating_add(self.expr_count.saturating_mul(EXPRESSION_SIZE as u64))
    }
}

/// One 24-byte record of the expression table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExpressionRecord {
    /// Offset of the head name in the string heap.
    pub head: u64,
    /// First child slot (inclusive).
    pub start: u64,
    /// One past the last child slot.
    pub end: u64,
}

/// The four regions of a buffer, split according to its header.
///
/// ```text
/// ┌──────────┬──────────────────┬──────────────────┬───────────────────┬──────────┐
/// │ header   │ args             │ argTypes         │ exprs             │ strings  │
/// │ 32 bytes │ argCount × 8     │ argCount × 8     │ exprCount × 24    │ the rest │
/// └──────────┴──────────────────┴──────────────────┴───────────────────┴──────────┘
/// ```
///
/// `args` and `argTypes` are parallel: slot `i` of one describes slot `i`
/// of the other. `Regions` only borrows the buffer and is `Copy`, so lazy
/// views can hand it around freely.
#[derive(Clone, Copy, Debug)]
pub struct Regions<'a> {
    header: RootHeader,
    args: &'a [u8],
    arg_types: &'a [u8],
    exprs: &'a [u8],
    strings: &'a [u8],
}

impl<'a> Regions<'a> {
    /// Split `buf` into its four regions.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::TruncatedBuffer`] if the buffer is shorter
    /// than the header, or shorter than the size the header counts imply.
    pub fn parse(buf: &'a [u8]) -> Result<Self, WireError> {
        let header = RootHeader::read_from(buf)?;
        let required = header.required_len();
        let truncated = WireError::TruncatedBuffer {
            required,
            actual: buf.len(),
        };
        if required > buf.len() as u64 {
            return Err(truncated);
        }

        // Both products are bounded by `required`, which fits in the buffer.
        let Ok(arg_bytes) = usize::try_from(header.arg_count * SLOT_SIZE as u64) else {
            return Err(truncated);
        };
        let Ok(expr_bytes) = usize::try_from(header.expr_count * EXPRESSION_SIZE as u64) else {
            return Err(truncated);
        };

        let (args, rest) = buf[HEADER_SIZE..].split_at(arg_bytes);
        let (arg_types, rest) = rest.split_at(arg_bytes);
        let (exprs, strings) = rest.split_at(expr_bytes);

        Ok(Self {
            header,
            args,
            arg_types,
            exprs,
            strings,
        })
    }

    #[must_use]
    pub fn header(&self) -> RootHeader {
        self.header
    }

    /// Number of argument slots (`argCount`).
    #[must_use]
    pub fn arg_count(&self) -> usize {
        self.args.len() / SLOT_SIZE
    }

    /// Number of expression records (`exprCount`).
    #[must_use]
    pub fn expr_count(&self) -> usize {
        self.exprs.len() / EXPRESSION_SIZE
    }

    #[must_use]
    pub fn args(&self) -> &'a [u8] {
        self.args
    }

    #[must_use]
    pub fn arg_types(&self) -> &'a [u8] {
        self.arg_types
    }

    #[must_use]
    pub fn exprs(&self) -> &'a [u8] {
        self.exprs
    }

    #[must_use]
    pub fn strings(&self) -> &'a [u8] {
        self.strings
    }

    /// The raw 8-byte value word of argument slot `slot`.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::SlotOutOfRange`] if `slot >= argCount`.
    pub fn arg_word(&self, slot: usize) -> Result<u64, WireError> {
        self.slot_word(self.args, slot)
    }

    /// The raw 8-byte type tag word of argument slot `slot`.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::SlotOutOfRange`] if `slot >= argCount`.
    pub fn tag_word(&self, slot: usize) -> Result<u64, WireError> {
        self.slot_word(self.arg_types, slot)
    }

    fn slot_word(&self, region: &[u8], slot: usize) -> Result<u64, WireError> {
        slot.checked_mul(SLOT_SIZE)
            .and_then(|at| read_word(region, at))
            .ok_or(WireError::SlotOutOfRange {
                slot: slot as u64,
                count: self.arg_count(),
            })
    }

    /// Read expression record `index` from the expression table.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::ExpressionOutOfRange`] if `index >= exprCount`.
    pub fn expression(&self, index: u64) -> Result<ExpressionRecord, WireError> {
        let out_of_range = WireError::ExpressionOutOfRange {
            index,
            count: self.expr_count(),
        };
        let Some(base) = usize::try_from(index)
            .ok()
            .and_then(|i| i.checked_mul(EXPRESSION_SIZE))
        else {
            return Err(out_of_range);
        };
        match (
            read_word(self.exprs, base),
            read_word(self.exprs, base + SLOT_SIZE),
            read_word(self.exprs, base + 2 * SLOT_SIZE),
        ) {
            (Some(head), Some(start), Some(end)) => Ok(ExpressionRecord { head, start, end }),
            _ => Err(out_of_range),
        }
    }

    /// Resolve the child slot range of expression `index`, checking that
    /// it lies inside the argument region.
    ///
    /// # Errors
    ///
    /// - [`WireError::ExpressionOutOfRange`] if the record does not exist.
    /// - [`WireError::ChildRangeOutOfBounds`] if `start > end` or
    ///   `end > argCount`.
    pub fn child_range(&self, index: u64) -> Result<Range<usize>, WireError> {
        let record = self.expression(index)?;
        let count = self.arg_count();
        let out_of_bounds = WireError::ChildRangeOutOfBounds {
            index,
            start: record.start,
            end: record.end,
            count,
        };
        if record.start > record.end || record.end > count as u64 {
            return Err(out_of_bounds);
        }
        // Both bounds are <= count, which is a usize.
        match (usize::try_from(record.start), usize::try_from(record.end)) {
            (Ok(start), Ok(end)) => Ok(start..end),
            _ => Err(out_of_bounds),
        }
    }
}
