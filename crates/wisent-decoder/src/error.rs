use wisent_wire::WireError;

/// Errors that can occur while decoding a buffer into values.
///
/// Wire-level faults (truncation, bad tags, bad strings) arrive wrapped
/// from `wisent-wire`. The decoder adds structural failures: named lookups
/// that miss, container shapes that break their promotion rule, and
/// references nested deeper than the configured limit.
///
/// ```text
///   DecodeError
///   ├── Wire(WireError)        ← layout, tag, heap, and bounds failures
///   ├── KeyNotFound            ← map lookup exhausted without a match
///   ├── IndexOutOfRange        ← at(n) past the last argument
///   ├── MalformedShape         ← Object/Table child breaks its rule
///   ├── TypeMismatch           ← value is not the kind the caller needs
///   ├── DepthLimitExceeded     ← cyclic or absurdly deep references
///   └── InExpression           ← any of the above, tagged with the
///                                 expression index where it happened
/// ```
///
/// None of these are recoverable inside a session: a failed decode needs
/// a fresh load/attach/decode/release cycle.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error(transparent)]
    Wire(#[from] WireError),

    /// A named lookup on a container-shaped node found no child with that
    /// head. The data does not match the schema the caller expected.
    #[error("key {key:?} not found")]
    KeyNotFound { key: String },

    #[error("argument index {index} out of range ({len} arguments)")]
    IndexOutOfRange { index: usize, len: usize },

    /// An `Object` child without exactly one argument, a `Table` child
    /// that is not an expression, and the like.
    #[error("malformed {shape} at expression {index}: {reason}")]
    MalformedShape {
        shape: &'static str,
        index: u64,
        reason: &'static str,
    },

    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("expression nesting exceeds depth limit {limit}")]
    DepthLimitExceeded { limit: usize },

    #[error("in expression {index}: {source}")]
    InExpression {
        index: u64,
        #[source]
        source: Box<DecodeError>,
    },
}

impl DecodeError {
    /// Tag this error with the expression it occurred in.
    ///
    /// Only the innermost expression is recorded; an error that already
    /// carries an index passes through unchanged.
    #[must_use]
    pub fn in_expression(self, index: u64) -> Self {
        match self {
            Self::InExpression { .. } => self,
            other => Self::InExpression {
                index,
                source: Box::new(other),
            },
        }
    }

    /// The error with any expression annotation stripped.
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::InExpression { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
