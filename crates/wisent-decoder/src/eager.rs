use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use wisent_types::{Expression, Shape, Value};
use wisent_wire::string_heap::read_string;
use wisent_wire::{ArgType, Regions, TagBlocks};

use crate::error::DecodeError;
use crate::slot::{SlotValue, read_slot};

/// Default bound on expression nesting.
///
/// The producer never nests anywhere near this deep. A buffer that does
/// is either hostile or contains a reference cycle.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Materializes a whole buffer into an owned [`Value`] tree.
///
/// Decoding starts at expression 0 and recurses through every reachable
/// expression, expanding runs in place and applying container promotion
/// at each node:
///
/// ```text
/// ┌─────────┬──────────────────────────────────────────────────────┐
/// │ Head    │ Result                                               │
/// ├─────────┼──────────────────────────────────────────────────────┤
/// │ Object  │ Value::Object, child head -> its single argument     │
/// │ List    │ Value::List, children in slot order                  │
/// │ Table   │ Value::Table, column name -> column value            │
/// │ other   │ Value::Expression(head, children)                    │
/// └─────────┴──────────────────────────────────────────────────────┘
/// ```
///
/// The entries of an `Object` or `Table` are decoded raw: the entry
/// expression's own head is the key and is never itself promoted, so a
/// key called `List` stays a key.
///
/// Nothing is cached. Any failure aborts the decode and is reported with
/// the index of the innermost expression it occurred in.
///
/// # Example
///
/// ```rust
/// use wisent_decoder::EagerDecoder;
/// use wisent_fixtures::{BufferBuilder, longs, object};
///
/// let buf = BufferBuilder::new().build(&object(vec![("xs", longs(&[1, 2, 3]))]));
/// let value = EagerDecoder::decode(&buf).unwrap();
/// assert_eq!(value.to_string(), "{xs: [1, 2, 3]}");
/// ```
#[derive(Clone, Debug)]
pub struct EagerDecoder {
    max_depth: usize,
}

impl Default for EagerDecoder {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl EagerDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail with [`DecodeError::DepthLimitExceeded`] past `max_depth`
    /// levels of nested expressions.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Decode `buf` with default settings.
    ///
    /// # Errors
    ///
    /// Any [`DecodeError`]; see [`EagerDecoder::decode_buffer`].
    pub fn decode(buf: &[u8]) -> Result<Value, DecodeError> {
        Self::default().decode_buffer(buf)
    }

    /// Parse the buffer layout and materialize the root expression.
    ///
    /// # Errors
    ///
    /// - [`DecodeError::Wire`] for layout, tag, heap and bounds faults.
    /// - [`DecodeError::MalformedShape`] for an `Object`/`Table` entry
    ///   that breaks its promotion rule.
    /// - [`DecodeError::DepthLimitExceeded`] for over-deep nesting.
    ///
    /// Every error except a failed layout parse arrives wrapped in
    /// [`DecodeError::InExpression`].
    pub fn decode_buffer(&self, buf: &[u8]) -> Result<Value, DecodeError> {
        let regions = Regions::parse(buf)?;
        self.decode_regions(&regions)
    }

    /// Materialize the root (expression 0) of already parsed regions.
    ///
    /// # Errors
    ///
    /// See [`EagerDecoder::decode_buffer`].
    pub fn decode_regions(&self, regions: &Regions<'_>) -> Result<Value, DecodeError> {
        self.decode_expression(regions, 0)
    }

    /// Materialize the subtree rooted at expression `index`.
    ///
    /// # Errors
    ///
    /// See [`EagerDecoder::decode_buffer`].
    pub fn decode_expression(
        &self,
        regions: &Regions<'_>,
        index: u64,
    ) -> Result<Value, DecodeError> {
        self.expression(regions, index, 0)
    }

    // ── Recursion ─────────────────────────────────────────────────────

    fn expression(
        &self,
        regions: &Regions<'_>,
        index: u64,
        depth: usize,
    ) -> Result<Value, DecodeError> {
        self.promote(regions, index, depth)
            .map_err(|err| err.in_expression(index))
    }

    fn promote(
        &self,
        regions: &Regions<'_>,
        index: u64,
        depth: usize,
    ) -> Result<Value, DecodeError> {
        self.check_depth(depth)?;
        let head = head_of(regions, index)?;

        match Shape::from_head(head) {
            Shape::List => Ok(Value::List(self.children(regions, index, depth)?)),
            Shape::Object => {
                let mut map = BTreeMap::new();
                for child in self.entry_indices(regions, index, Shape::Object)? {
                    let (key, arguments) = self.entry(regions, child, depth + 1)?;
                    let value = object_entry(child, arguments)?;
                    insert_first(&mut map, key, value);
                }
                Ok(Value::Object(map))
            }
            Shape::Table => {
                let mut map = BTreeMap::new();
                for child in self.entry_indices(regions, index, Shape::Table)? {
                    let (head, arguments) = self.entry(regions, child, depth + 1)?;
                    let (key, value) = table_column(head, arguments);
                    insert_first(&mut map, key, value);
                }
                Ok(Value::Table(map))
            }
            Shape::Generic => Ok(Value::Expression(Expression {
                head: head.to_owned(),
                arguments: self.children(regions, index, depth)?,
            })),
        }
    }

    /// Decode an `Object`/`Table` entry as `(head, arguments)` without
    /// promoting the entry itself.
    fn entry<'a>(
        &self,
        regions: &Regions<'a>,
        index: u64,
        depth: usize,
    ) -> Result<(&'a str, Vec<Value>), DecodeError> {
        let raw = || -> Result<_, DecodeError> {
            self.check_depth(depth)?;
            let head = head_of(regions, index)?;
            Ok((head, self.children(regions, index, depth)?))
        };
        raw().map_err(|err| err.in_expression(index))
    }

    /// Decode every child slot of `index` in order.
    fn children(
        &self,
        regions: &Regions<'_>,
        index: u64,
        depth: usize,
    ) -> Result<Vec<Value>, DecodeError> {
        let range = regions.child_range(index)?;
        let mut values = Vec::with_capacity(range.len());
        for block in TagBlocks::new(*regions, range) {
            let block = block?;
            for slot in block.slots {
                let value = match read_slot(regions, block.arg_type, slot)? {
                    SlotValue::Bool(v) => Value::Bool(v),
                    SlotValue::Long(v) => Value::Long(v),
                    SlotValue::Double(v) => Value::Double(v),
                    SlotValue::String(s) => Value::String(s.to_owned()),
                    SlotValue::Symbol(s) => Value::Symbol(s.to_owned()),
                    SlotValue::Expression(child) => self.expression(regions, child, depth + 1)?,
                };
                values.push(value);
            }
        }
        Ok(values)
    }

    /// Expression indices of the entries of an `Object` or `Table`.
    fn entry_indices(
        &self,
        regions: &Regions<'_>,
        index: u64,
        shape: Shape,
    ) -> Result<Vec<u64>, DecodeError> {
        let range = regions.child_range(index)?;
        let mut entries = Vec::with_capacity(range.len());
        for block in TagBlocks::new(*regions, range) {
            let block = block?;
            if block.arg_type != ArgType::Expression {
                return Err(DecodeError::MalformedShape {
                    shape: shape_name(shape),
                    index,
                    reason: "entry is not an expression",
                });
            }
            for slot in block.slots {
                entries.push(regions.arg_word(slot)?);
            }
        }
        Ok(entries)
    }

    fn check_depth(&self, depth: usize) -> Result<(), DecodeError> {
        if depth > self.max_depth {
            return Err(DecodeError::DepthLimitExceeded {
                limit: self.max_depth,
            });
        }
        Ok(())
    }
}

// ── Promotion rules ───────────────────────────────────────────────────
//
// Shared with `LazyView::materialize`, which must agree with the eager
// result value for value.

fn head_of<'a>(regions: &Regions<'a>, index: u64) -> Result<&'a str, DecodeError> {
    let record = regions.expression(index)?;
    Ok(read_string(regions.strings(), record.head)?)
}

fn shape_name(shape: Shape) -> &'static str {
    shape.head().unwrap_or("expression")
}

/// An `Object` entry must carry exactly one argument: its value.
pub(crate) fn object_entry(entry: u64, arguments: Vec<Value>) -> Result<Value, DecodeError> {
    let mut arguments = arguments.into_iter();
    match (arguments.next(), arguments.next()) {
        (Some(value), None) => Ok(value),
        _ => Err(DecodeError::MalformedShape {
            shape: "Object",
            index: entry,
            reason: "entry must have exactly one argument",
        }),
    }
}

/// Resolve a `Table` entry to `(column name, column value)`.
///
/// Two layouts are accepted:
///
/// ```text
///   (any 'name <container>)   -> name, <container>
///   (name cell cell ...)      -> name, [cell, cell, ...]
/// ```
///
/// The first is the named-column form; its second argument is always a
/// nested expression. The second is how CSV data is written, one cell per
/// argument, and cells are never expressions. A two-cell column whose
/// first cell is a symbol therefore stays in the second form.
pub(crate) fn table_column(head: &str, arguments: Vec<Value>) -> (String, Value) {
    if let [Value::Symbol(name), value] = arguments.as_slice() {
        if is_container(value) {
            return (name.clone(), value.clone());
        }
    }
    (head.to_owned(), Value::List(arguments))
}

fn is_container(value: &Value) -> bool {
    matches!(
        value,
        Value::Object(_) | Value::List(_) | Value::Table(_) | Value::Expression(_)
    )
}

/// Duplicate keys keep their first occurrence, like `map_lookup`.
pub(crate) fn insert_first(map: &mut BTreeMap<String, Value>, key: impl Into<String>, value: Value) {
    if let Entry::Vacant(slot) = map.entry(key.into()) {
        slot.insert(value);
    }
}
