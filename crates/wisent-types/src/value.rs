use std::collections::BTreeMap;
use std::fmt;

/// A fully materialized node of the decoded tree.
///
/// Scalars map one-to-one onto the slot types. Expressions whose head is
/// a recognised [`Shape`](crate::Shape) are promoted into `Object`,
/// `List`, or `Table`; all others remain a generic [`Expression`].
///
/// Mappings use `BTreeMap`, so two values compare equal as key/value sets
/// regardless of the order the producer wrote the keys in.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    Long(u64),
    Double(f64),
    String(String),
    /// An interned name. Stored like a string, distinct only in its tag.
    Symbol(String),
    Object(BTreeMap<String, Value>),
    List(Vec<Value>),
    /// Column name to column value (usually a `List`).
    Table(BTreeMap<String, Value>),
    Expression(Expression),
}

/// A generic `(head, children)` node with no promotion applied.
#[derive(Clone, Debug, PartialEq)]
pub struct Expression {
    pub head: String,
    pub arguments: Vec<Value>,
}

impl Value {
    /// Short variant name, used in diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "Bool",
            Self::Long(_) => "Long",
            Self::Double(_) => "Double",
            Self::String(_) => "String",
            Self::Symbol(_) => "Symbol",
            Self::Object(_) => "Object",
            Self::List(_) => "List",
            Self::Table(_) => "Table",
            Self::Expression(_) => "Expression",
        }
    }

    /// Numeric view of `Long` and `Double`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Long(v) => Some(*v as f64),
            Self::Double(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Self::Symbol(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_expression(&self) -> Option<&Expression> {
        match self {
            Self::Expression(expr) => Some(expr),
            _ => None,
        }
    }

    /// Look up `key` in an `Object` or a `Table`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Object(map) | Self::Table(map) => map.get(key),
            _ => None,
        }
    }
}

fn write_joined<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    items: impl IntoIterator<Item = T>,
    separator: &str,
) -> fmt::Result {
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

fn write_map(f: &mut fmt::Formatter<'_>, map: &BTreeMap<String, Value>) -> fmt::Result {
    f.write_str("{")?;
    write_joined(f, map.iter().map(|(k, v)| format!("{k}: {v}")), ", ")?;
    f.write_str("}")
}

/// S-expression-like rendering:
///
/// ```text
///   true  42  1.5  "text"  'Symbol
///   (Head arg arg)  [a, b]  {key: value}  Table{col: [..]}
/// ```
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v:?}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Symbol(s) => write!(f, "'{s}"),
            Self::Object(map) => write_map(f, map),
            Self::List(items) => {
                f.write_str("[")?;
                write_joined(f, items, ", ")?;
                f.write_str("]")
            }
            Self::Table(map) => {
                f.write_str("Table")?;
                write_map(f, map)
            }
            Self::Expression(expr) => write!(f, "{expr}"),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.head)?;
        for argument in &self.arguments {
            write!(f, " {argument}")?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(entries: &[(&str, Value)]) -> Value {
        Value::Object(
            entries
                .iter()
                .map(|(k, v)| ((*k).to_owned(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn display_scalars() {
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Long(42).to_string(), "42");
        assert_eq!(Value::Double(2.0).to_string(), "2.0");
        assert_eq!(Value::String("a \"b\"".into()).to_string(), r#""a \"b\"""#);
        assert_eq!(Value::Symbol("Missing".into()).to_string(), "'Missing");
    }

    #[test]
    fn display_nested() {
        let value = object(&[
            ("b", Value::List(vec![Value::Long(1), Value::Double(0.5)])),
            (
                "a",
                Value::Expression(Expression {
                    head: "Point".into(),
                    arguments: vec![Value::Long(3), Value::Symbol("x".into())],
                }),
            ),
        ]);
        assert_eq!(value.to_string(), "{a: (Point 3 'x), b: [1, 0.5]}");
    }

    #[test]
    fn display_empty_expression() {
        let expr = Expression {
            head: "Null".into(),
            arguments: vec![],
        };
        assert_eq!(expr.to_string(), "(Null)");
    }

    #[test]
    fn object_equality_ignores_insertion_order() {
        let one = object(&[("a", Value::Long(1)), ("b", Value::Long(2))]);
        let two = object(&[("b", Value::Long(2)), ("a", Value::Long(1))]);
        assert_eq!(one, two);
    }

    #[test]
    fn get_reads_objects_and_tables() {
        let table = Value::Table(
            [("x".to_owned(), Value::List(vec![Value::Long(1)]))]
                .into_iter()
                .collect(),
        );
        assert_eq!(table.get("x").and_then(Value::as_list).map(<[_]>::len), Some(1));
        assert!(table.get("y").is_none());
        assert!(Value::Long(1).get("x").is_none());
    }

    #[test]
    fn numeric_view() {
        assert_eq!(Value::Long(3).as_f64(), Some(3.0));
        assert_eq!(Value::Double(0.25).as_f64(), Some(0.25));
        assert_eq!(Value::Symbol("Missing".into()).as_f64(), None);
    }
}
