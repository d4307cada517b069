/// Errors raised while reading the raw regions of a Wisent buffer.
///
/// Every read from the buffer is bounds-checked, so a corrupt or hostile
/// buffer surfaces as one of these variants rather than a panic. Each
/// variant carries the slot, offset, or index where the read failed.
///
/// ```text
///   WireError
///   ├── TruncatedBuffer         ← header counts imply more bytes than exist
///   ├── UnknownTypeTag          ← tag word outside Bool..=Expression
///   ├── InvalidStringEncoding   ← heap bytes are not UTF-8
///   ├── SlotOutOfRange          ← args / argTypes index past argCount
///   ├── ExpressionOutOfRange    ← expression index past exprCount
///   ├── StringOffsetOutOfRange  ← heap offset past the end of the heap
///   ├── ChildRangeOutOfBounds   ← [start, end) not inside the args region
///   └── MalformedRun            ← run-length tag that cannot be honoured
/// ```
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The header declares more argument slots or expressions than the
    /// buffer can hold.
    #[error("truncated buffer: header implies {required} bytes, buffer has {actual}")]
    TruncatedBuffer { required: u64, actual: usize },

    /// A tag word resolved to a value outside the six argument types.
    #[error("unknown type tag {value:#x} at slot {slot}")]
    UnknownTypeTag { slot: usize, value: u64 },

    /// The string starting at `offset` is not valid UTF-8.
    #[error("invalid UTF-8 in string heap at offset {offset}")]
    InvalidStringEncoding { offset: u64 },

    #[error("argument slot {slot} out of range ({count} slots)")]
    SlotOutOfRange { slot: u64, count: usize },

    #[error("expression {index} out of range ({count} expressions)")]
    ExpressionOutOfRange { index: u64, count: usize },

    #[error("string offset {offset} past end of heap ({len} bytes)")]
    StringOffsetOutOfRange { offset: u64, len: usize },

    /// An expression record names a child range that is reversed or
    /// reaches past the argument region.
    #[error("expression {index} child range {start}..{end} exceeds {count} argument slots")]
    ChildRangeOutOfBounds {
        index: u64,
        start: u64,
        end: u64,
        count: usize,
    },

    /// A run tag is too short, has no room for its length word, or spills
    /// past the child range of its expression.
    #[error("malformed run at slot {slot}: {reason}")]
    MalformedRun { slot: usize, reason: &'static str },
}
