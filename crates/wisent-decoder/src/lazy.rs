use std::collections::BTreeMap;
use std::ops::Range;

use wisent_types::{ArgType, Expression, Shape, Value};
use wisent_wire::string_heap::read_string;
use wisent_wire::{Regions, TagBlock, TagBlocks};

use crate::eager::{DEFAULT_MAX_DEPTH, insert_first, object_entry, table_column};
use crate::error::DecodeError;
use crate::slot::{SlotValue, read_slot};

/// A handle on one expression node, decoded on demand.
///
/// A view is the four borrowed regions plus an expression index. It is
/// `Copy` and costs nothing to pass around. Nothing is decoded until asked
/// for: [`head`](Self::head) reads one heap string,
/// [`arguments`](Self::arguments) decodes children one at a time, and a
/// nested expression becomes another view instead of a subtree.
///
/// Views keep the raw shape. An `Object` is just an expression whose
/// children are key expressions; navigate it with
/// [`map_lookup`](Self::map_lookup). [`materialize`](Self::materialize)
/// applies the container promotion of the eager decoder.
///
/// ```text
///   root ──map_lookup("resources")──▶ (resources [..])
///        ──at(0)───────────────────▶ (List (Object ..) ..)
///        ──map_lookup("Object")─────▶ (Object (name ..) (path ..))
/// ```
#[derive(Clone, Copy, Debug)]
pub struct LazyView<'a> {
    regions: Regions<'a>,
    index: u64,
}

impl<'a> LazyView<'a> {
    /// Parse `buf` and return a view of its root, expression 0.
    ///
    /// # Errors
    ///
    /// Layout errors from [`Regions::parse`], or
    /// [`ExpressionOutOfRange`](wisent_wire::WireError::ExpressionOutOfRange)
    /// for a buffer with no expressions.
    pub fn root(buf: &'a [u8]) -> Result<Self, DecodeError> {
        Self::new(Regions::parse(buf)?, 0)
    }

    /// A view of expression `index`.
    ///
    /// # Errors
    ///
    /// Returns `ExpressionOutOfRange` if the record does not exist.
    pub fn new(regions: Regions<'a>, index: u64) -> Result<Self, DecodeError> {
        regions.expression(index)?;
        Ok(Self { regions, index })
    }

    #[must_use]
    pub fn index(&self) -> u64 {
        self.index
    }

    #[must_use]
    pub fn regions(&self) -> Regions<'a> {
        self.regions
    }

    /// The node's head name, borrowed from the string heap.
    ///
    /// # Errors
    ///
    /// String heap errors for a bad head offset.
    pub fn head(&self) -> Result<&'a str, DecodeError> {
        let head = || -> Result<&'a str, DecodeError> {
            let record = self.regions.expression(self.index)?;
            Ok(read_string(self.regions.strings(), record.head)?)
        };
        head().map_err(|err| err.in_expression(self.index))
    }

    /// The container shape named by the head.
    ///
    /// # Errors
    ///
    /// See [`head`](Self::head).
    pub fn shape(&self) -> Result<Shape, DecodeError> {
        Ok(Shape::from_head(self.head()?))
    }

    /// Number of child slots, with runs counted slot by slot.
    ///
    /// # Errors
    ///
    /// Returns `ChildRangeOutOfBounds` for a corrupt record.
    pub fn arity(&self) -> Result<usize, DecodeError> {
        self.regions
            .child_range(self.index)
            .map(|slots| slots.len())
            .map_err(|err| DecodeError::from(err).in_expression(self.index))
    }

    /// Every child, in slot order.
    ///
    /// The sequence is single-pass; call again to restart. A corrupt child
    /// range shows up as the first item.
    #[must_use]
    pub fn arguments(&self) -> Arguments<'a> {
        Arguments::new(self.regions, self.index, None)
    }

    /// Only the children of type `arg_type`.
    ///
    /// Blocks of any other type are stepped over by their tag alone; their
    /// value slots are never read. Skipping a run of a thousand `Missing`
    /// symbols costs one tag read.
    #[must_use]
    pub fn typed_arguments(&self, arg_type: ArgType) -> Arguments<'a> {
        Arguments::new(self.regions, self.index, Some(arg_type))
    }

    /// The `n`-th child.
    ///
    /// Equivalent to `arguments().nth(n)`: every child before the `n`-th is
    /// decoded and checked, so `at` fails exactly where a drain would.
    ///
    /// # Errors
    ///
    /// - [`DecodeError::IndexOutOfRange`] if the node has `n` or fewer
    ///   children.
    /// - Any error met on the way to the `n`-th child.
    pub fn at(&self, n: usize) -> Result<LazyValue<'a>, DecodeError> {
        let mut arguments = self.arguments();
        for passed in 0..n {
            match arguments.next() {
                Some(Ok(_)) => {}
                Some(Err(err)) => return Err(err),
                None => {
                    return Err(DecodeError::IndexOutOfRange {
                        index: n,
                        len: passed,
                    });
                }
            }
        }
        arguments
            .next()
            .unwrap_or(Err(DecodeError::IndexOutOfRange { index: n, len: n }))
    }

    /// The first child expression whose head is `key`.
    ///
    /// On an `Object` this is the key expression; its value is `.at(0)`,
    /// or use [`field`](Self::field). On a `List` it finds the first
    /// element of a given shape (`map_lookup("Object")`).
    ///
    /// # Errors
    ///
    /// [`DecodeError::KeyNotFound`] when no child matches. The data does
    /// not have the shape the caller expected.
    pub fn map_lookup(&self, key: &str) -> Result<LazyView<'a>, DecodeError> {
        for argument in self.typed_arguments(ArgType::Expression) {
            if let LazyValue::Expression(child) = argument? {
                if child.head()? == key {
                    return Ok(child);
                }
            }
        }
        Err(DecodeError::KeyNotFound {
            key: key.to_owned(),
        })
    }

    /// The value under `key` of an `Object`-shaped node.
    ///
    /// # Errors
    ///
    /// `KeyNotFound`, or `IndexOutOfRange` for a key without a value.
    pub fn field(&self, key: &str) -> Result<LazyValue<'a>, DecodeError> {
        self.map_lookup(key)?.at(0)
    }

    /// The node holding the values of column `name` of a `Table`.
    ///
    /// Entries are keyed the way [`materialize`](Self::materialize) keys
    /// them. A named column `(any 'name [values])` is found by its symbol
    /// and yields the values container, whatever its head. A column written
    /// cell by cell is found by its head and yields the column expression
    /// itself. Either way, the arguments of the result are the cells. The
    /// first entry with a matching key wins.
    ///
    /// # Errors
    ///
    /// `KeyNotFound` if there is no such column.
    pub fn column(&self, name: &str) -> Result<LazyView<'a>, DecodeError> {
        for argument in self.typed_arguments(ArgType::Expression) {
            let LazyValue::Expression(entry) = argument? else {
                continue;
            };
            match entry.named_column()? {
                Some((key, values)) if key == name => return Ok(values),
                Some(_) => {}
                None if entry.head()? == name => return Ok(entry),
                None => {}
            }
        }
        Err(DecodeError::KeyNotFound {
            key: name.to_owned(),
        })
    }

    /// The `'name` and values view of a named column entry, or `None` for
    /// any other layout.
    fn named_column(&self) -> Result<Option<(&'a str, LazyView<'a>)>, DecodeError> {
        if self.arity()? != 2 {
            return Ok(None);
        }
        let mut arguments = self.arguments();
        match (arguments.next().transpose()?, arguments.next().transpose()?) {
            (Some(LazyValue::Symbol(key)), Some(LazyValue::Expression(values))) => {
                Ok(Some((key, values)))
            }
            _ => Ok(None),
        }
    }

    /// Decode the whole subtree by draining [`arguments`](Self::arguments)
    /// and promoting containers exactly as
    /// [`EagerDecoder`](crate::EagerDecoder) does.
    ///
    /// The walk keeps its open nodes on a heap stack, one frame per
    /// level, so nesting down to [`DEFAULT_MAX_DEPTH`] costs no call stack.
    ///
    /// # Errors
    ///
    /// Any error met while draining, annotated with the innermost
    /// expression index. Nesting deeper than [`DEFAULT_MAX_DEPTH`] is
    /// `DepthLimitExceeded`.
    pub fn materialize(&self) -> Result<Value, DecodeError> {
        let mut root = Frame::open(*self, 0, false)?;
        let mut open: Vec<Frame<'a>> = Vec::new();
        loop {
            let frame = open.last_mut().unwrap_or(&mut root);
            let index = frame.view.index;
            match frame.arguments.next() {
                Some(Ok(LazyValue::Expression(child))) => {
                    let child = Frame::open(child, frame.depth + 1, frame.node.takes_entries())?;
                    open.push(child);
                }
                Some(Ok(scalar)) => frame
                    .push_scalar(scalar)
                    .map_err(|err| err.in_expression(index))?,
                Some(Err(err)) => return Err(err.in_expression(index)),
                None => match open.pop() {
                    Some(done) => {
                        let parent = open.last_mut().unwrap_or(&mut root);
                        let index = parent.view.index;
                        parent
                            .accept(done)
                            .map_err(|err| err.in_expression(index))?;
                    }
                    None => return Ok(root.node.into_value()),
                },
            }
        }
    }
}

// ── Materialize frames ────────────────────────────────────────────────

/// One open node of [`LazyView::materialize`]: its cursor and what has
/// been decoded of it so far.
struct Frame<'a> {
    view: LazyView<'a>,
    depth: usize,
    arguments: Arguments<'a>,
    node: Partial<'a>,
}

enum Partial<'a> {
    List(Vec<Value>),
    Generic(&'a str, Vec<Value>),
    Object(BTreeMap<String, Value>),
    Table(BTreeMap<String, Value>),
    /// An `Object` or `Table` entry, kept raw until its parent resolves it.
    Entry(&'a str, Vec<Value>),
}

impl<'a> Frame<'a> {
    /// Start decoding `view` at `depth`. Entries of an `Object` or `Table`
    /// are opened raw, without promotion.
    fn open(view: LazyView<'a>, depth: usize, entry: bool) -> Result<Self, DecodeError> {
        let open = || -> Result<Self, DecodeError> {
            if depth > DEFAULT_MAX_DEPTH {
                return Err(DecodeError::DepthLimitExceeded {
                    limit: DEFAULT_MAX_DEPTH,
                });
            }
            let head = view.head()?;
            let node = if entry {
                Partial::Entry(head, Vec::new())
            } else {
                match Shape::from_head(head) {
                    Shape::List => Partial::List(Vec::new()),
                    Shape::Object => Partial::Object(BTreeMap::new()),
                    Shape::Table => Partial::Table(BTreeMap::new()),
                    Shape::Generic => Partial::Generic(head, Vec::new()),
                }
            };
            Ok(Self {
                view,
                depth,
                arguments: view.arguments(),
                node,
            })
        };
        open().map_err(|err| err.in_expression(view.index))
    }

    fn push_scalar(&mut self, scalar: LazyValue<'a>) -> Result<(), DecodeError> {
        let value = scalar.to_value()?;
        match &mut self.node {
            Partial::List(items) | Partial::Generic(_, items) | Partial::Entry(_, items) => {
                items.push(value);
                Ok(())
            }
            Partial::Object(_) | Partial::Table(_) => Err(self.not_an_entry()),
        }
    }

    /// Fold a finished child into this node.
    fn accept(&mut self, child: Frame<'a>) -> Result<(), DecodeError> {
        let entry_index = child.view.index;
        match &mut self.node {
            Partial::List(items) | Partial::Generic(_, items) | Partial::Entry(_, items) => {
                items.push(child.node.into_value());
            }
            Partial::Object(map) => {
                let Partial::Entry(key, arguments) = child.node else {
                    return Err(self.not_an_entry());
                };
                insert_first(map, key, object_entry(entry_index, arguments)?);
            }
            Partial::Table(map) => {
                let Partial::Entry(head, arguments) = child.node else {
                    return Err(self.not_an_entry());
                };
                let (key, value) = table_column(head, arguments);
                insert_first(map, key, value);
            }
        }
        Ok(())
    }

    fn not_an_entry(&self) -> DecodeError {
        DecodeError::MalformedShape {
            shape: match self.node {
                Partial::Table(_) => "Table",
                _ => "Object",
            },
            index: self.view.index,
            reason: "entry is not an expression",
        }
    }
}

impl Partial<'_> {
    fn takes_entries(&self) -> bool {
        matches!(self, Self::Object(_) | Self::Table(_))
    }

    fn into_value(self) -> Value {
        match self {
            Self::List(items) => Value::List(items),
            Self::Object(map) => Value::Object(map),
            Self::Table(map) => Value::Table(map),
            Self::Generic(head, arguments) | Self::Entry(head, arguments) => {
                Value::Expression(Expression {
                    head: head.to_owned(),
                    arguments,
                })
            }
        }
    }
}

/// One child produced by a [`LazyView`]: a scalar, or a view of a nested
/// expression.
#[derive(Clone, Copy, Debug)]
pub enum LazyValue<'a> {
    Bool(bool),
    Long(u64),
    Double(f64),
    String(&'a str),
    Symbol(&'a str),
    Expression(LazyView<'a>),
}

impl<'a> LazyValue<'a> {
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
    pub fn as_view(&self) -> Option<LazyView<'a>> {
        match self {
            Self::Expression(view) => Some(*view),
            _ => None,
        }
    }

    /// The nested expression, or `TypeMismatch`.
    ///
    /// # Errors
    ///
    /// [`DecodeError::TypeMismatch`] for scalars.
    pub fn into_view(self) -> Result<LazyView<'a>, DecodeError> {
        self.as_view().ok_or(DecodeError::TypeMismatch {
            expected: "Expression",
            found: self.arg_type().name(),
        })
    }

    /// Convert to an owned [`Value`], materializing nested expressions.
    ///
    /// # Errors
    ///
    /// See [`LazyView::materialize`].
    pub fn to_value(&self) -> Result<Value, DecodeError> {
        Ok(match *self {
            Self::Bool(v) => Value::Bool(v),
            Self::Long(v) => Value::Long(v),
            Self::Double(v) => Value::Double(v),
            Self::String(s) => Value::String(s.to_owned()),
            Self::Symbol(s) => Value::Symbol(s.to_owned()),
            Self::Expression(view) => return view.materialize(),
        })
    }
}

/// Cursor over the children of one expression.
///
/// Holds the tag block being expanded and the remaining slots. Runs are
/// expanded in place; with a type filter, blocks of other types are
/// dropped by their tag alone. After the first error the cursor yields
/// nothing more.
#[derive(Debug)]
pub struct Arguments<'a> {
    regions: Regions<'a>,
    parent: u64,
    filter: Option<ArgType>,
    blocks: TagBlocks<'a>,
    current: Option<(ArgType, Range<usize>)>,
    pending: Option<DecodeError>,
}

impl<'a> Arguments<'a> {
    fn new(regions: Regions<'a>, parent: u64, filter: Option<ArgType>) -> Self {
        let (slots, pending) = match regions.child_range(parent) {
            Ok(slots) => (slots, None),
            Err(err) => (0..0, Some(DecodeError::from(err).in_expression(parent))),
        };
        Self {
            regions,
            parent,
            filter,
            blocks: TagBlocks::new(regions, slots),
            current: None,
            pending,
        }
    }

    /// Load the next block that passes the filter into `current`.
    fn next_block(&mut self) -> Option<Result<(), DecodeError>> {
        if let Some(err) = self.pending.take() {
            self.fuse();
            return Some(Err(err));
        }
        loop {
            match self.blocks.next()? {
                Ok(TagBlock { arg_type, slots }) => {
                    if self.filter.is_none_or(|wanted| wanted == arg_type) {
                        self.current = Some((arg_type, slots));
                        return Some(Ok(()));
                    }
                }
                Err(err) => {
                    self.fuse();
                    return Some(Err(DecodeError::from(err).in_expression(self.parent)));
                }
            }
        }
    }

    fn decode(&self, arg_type: ArgType, slot: usize) -> Result<LazyValue<'a>, DecodeError> {
        Ok(match read_slot(&self.regions, arg_type, slot)? {
            SlotValue::Bool(v) => LazyValue::Bool(v),
            SlotValue::Long(v) => LazyValue::Long(v),
            SlotValue::Double(v) => LazyValue::Double(v),
            SlotValue::String(s) => LazyValue::String(s),
            SlotValue::Symbol(s) => LazyValue::Symbol(s),
            SlotValue::Expression(index) => {
                LazyValue::Expression(LazyView::new(self.regions, index)?)
            }
        })
    }

    fn fuse(&mut self) {
        self.current = None;
        self.blocks = TagBlocks::new(self.regions, 0..0);
    }
}

impl<'a> Iterator for Arguments<'a> {
    type Item = Result<LazyValue<'a>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((arg_type, slots)) = &mut self.current {
                let arg_type = *arg_type;
                if let Some(slot) = slots.next() {
                    let value = self.decode(arg_type, slot);
                    if value.is_err() {
                        self.fuse();
                    }
                    return Some(value.map_err(|err| err.in_expression(self.parent)));
                }
                self.current = None;
            }
            if let Err(err) = self.next_block()? {
                return Some(Err(err));
            }
        }
    }
}
