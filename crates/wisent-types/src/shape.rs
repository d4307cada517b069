/// Container shapes recognised by head name.
///
/// The producer writes JSON objects, arrays, and CSV tables as expressions
/// with a reserved head. The eager decoder promotes them into native maps
/// and sequences; everything else stays a generic `(head, children)` node.
///
/// ```text
/// ┌─────────┬────────────────────────────────────────────────────────────┐
/// │ Head    │ Children                                                   │
/// ├─────────┼────────────────────────────────────────────────────────────┤
/// │ Object  │ key expressions, each with exactly one argument            │
/// │ List    │ the elements, in order                                     │
/// │ Table   │ column expressions: ('name, value) or name(values…)       │
/// │ (other) │ anything                                                   │
/// └─────────┴────────────────────────────────────────────────────────────┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    Object,
    List,
    Table,
    Generic,
}

impl Shape {
    /// Resolve the shape of an expression from its head name.
    #[must_use]
    pub fn from_head(head: &str) -> Self {
        match head {
            "Object" => Self::Object,
            "List" => Self::List,
            "Table" => Self::Table,
            _ => Self::Generic,
        }
    }

    /// The reserved head name, or `None` for [`Shape::Generic`].
    #[must_use]
    pub fn head(self) -> Option<&'static str> {
        match self {
            Self::Object => Some("Object"),
            Self::List => Some("List"),
            Self::Table => Some("Table"),
            Self::Generic => None,
        }
    }
}
