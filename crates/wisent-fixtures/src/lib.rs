//! Buffer builder for tests, benches, and fuzz seeds.
//!
//! Lays out a tree of [`Node`]s in the Wisent buffer format:
//!
//! - slot 0 holds an `Expression` argument pointing at expression 0, the
//!   root, exactly as the producer writes it;
//! - expressions are numbered breadth-first and each one's children occupy
//!   a contiguous slot range;
//! - runs of at least [`BufferBuilder::min_run`] equal scalar tags are
//!   compressed with the run bit and a length word in the next tag slot;
//! - every string gets its own NUL-terminated heap entry.
//!
//! [`RawBuffer`] exposes the four regions before serialization so tests can
//! corrupt individual words.

#![allow(clippy::pedantic)]

use std::collections::VecDeque;

use wisent_wire::ArgType;
use wisent_wire::layout::HEADER_SIZE;
use wisent_wire::type_tag::RUN_BIT;

/// Minimum run length the producer compresses.
pub const PRODUCER_MIN_RUN: usize = 5;

/// One node of a tree to encode.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Bool(bool),
    Long(u64),
    Double(f64),
    Str(String),
    Symbol(String),
    Expr { head: String, children: Vec<Node> },
}

impl Node {
    fn arg_type(&self) -> ArgType {
        match self {
            Self::Bool(_) => ArgType::Bool,
            Self::Long(_) => ArgType::Long,
            Self::Double(_) => ArgType::Double,
            Self::Str(_) => ArgType::String,
            Self::Symbol(_) => ArgType::Symbol,
            Self::Expr { .. } => ArgType::Expression,
        }
    }
}

// ── Node constructors ─────────────────────────────────────────────────

pub fn boolean(v: bool) -> Node {
    Node::Bool(v)
}

pub fn long(v: u64) -> Node {
    Node::Long(v)
}

pub fn double(v: f64) -> Node {
    Node::Double(v)
}

pub fn string(s: &str) -> Node {
    Node::Str(s.to_owned())
}

pub fn symbol(s: &str) -> Node {
    Node::Symbol(s.to_owned())
}

pub fn expr(head: &str, children: Vec<Node>) -> Node {
    Node::Expr {
        head: head.to_owned(),
        children,
    }
}

/// `Object` with one single-argument key expression per entry.
pub fn object(entries: Vec<(&str, Node)>) -> Node {
    expr(
        "Object",
        entries
            .into_iter()
            .map(|(key, value)| expr(key, vec![value]))
            .collect(),
    )
}

pub fn list(items: Vec<Node>) -> Node {
    expr("List", items)
}

pub fn longs(values: &[u64]) -> Node {
    list(values.iter().copied().map(long).collect())
}

pub fn doubles(values: &[f64]) -> Node {
    list(values.iter().copied().map(double).collect())
}

/// `Table` whose columns are two-argument expressions `('name, value)`.
/// Each column expression is also headed by its name.
pub fn table(columns: Vec<(&str, Node)>) -> Node {
    expr(
        "Table",
        columns
            .into_iter()
            .map(|(name, value)| expr(name, vec![symbol(name), value]))
            .collect(),
    )
}

/// `Table` as the producer writes CSV data: each column is an expression
/// headed by the column name whose arguments are the cell values.
pub fn producer_table(columns: Vec<(&str, Vec<Node>)>) -> Node {
    expr(
        "Table",
        columns
            .into_iter()
            .map(|(name, values)| expr(name, values))
            .collect(),
    )
}

/// A data package: `{name, resources: [{name, path: <table>}]}`.
pub fn datapackage(table: Node) -> Node {
    object(vec![
        ("name", string("datapackage")),
        (
            "resources",
            list(vec![object(vec![
                ("name", string("data")),
                ("path", table),
            ])]),
        ),
    ])
}

// ── Raw regions ───────────────────────────────────────────────────────

/// The four regions of a buffer as plain words, before serialization.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawBuffer {
    pub args: Vec<u64>,
    pub tags: Vec<u64>,
    /// `(head offset, start child, end child)` per expression.
    pub exprs: Vec<[u64; 3]>,
    pub strings: Vec<u8>,
}

impl RawBuffer {
    /// Append `s` plus a NUL terminator to the heap, returning its offset.
    pub fn push_string(&mut self, s: &str) -> u64 {
        let offset = self.strings.len() as u64;
        self.strings.extend_from_slice(s.as_bytes());
        self.strings.push(0);
        offset
    }

    /// Serialize with a header whose counts match the regions.
    pub fn to_bytes(&self) -> Vec<u8> {
        assert_eq!(self.args.len(), self.tags.len(), "args and tags are parallel");
        let mut buf = Vec::with_capacity(
            HEADER_SIZE + self.args.len() * 16 + self.exprs.len() * 24 + self.strings.len(),
        );
        buf.extend_from_slice(&(self.args.len() as u64).to_le_bytes());
        buf.extend_from_slice(&(self.exprs.len() as u64).to_le_bytes());
        buf.resize(HEADER_SIZE, 0);
        for word in self.args.iter().chain(&self.tags) {
            buf.extend_from_slice(&word.to_le_bytes());
        }
        for record in &self.exprs {
            for word in record {
                buf.extend_from_slice(&word.to_le_bytes());
            }
        }
        buf.extend_from_slice(&self.strings);
        buf
    }
}

// ── Builder ───────────────────────────────────────────────────────────

/// Lays out a [`Node`] tree as a Wisent buffer.
#[derive(Clone, Debug)]
pub struct BufferBuilder {
    min_run: Option<usize>,
    expression_runs: bool,
}

impl Default for BufferBuilder {
    fn default() -> Self {
        Self {
            min_run: Some(PRODUCER_MIN_RUN),
            expression_runs: false,
        }
    }
}

impl BufferBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Never emit run tags.
    pub fn without_runs(mut self) -> Self {
        self.min_run = None;
        self
    }

    /// Compress runs of at least `n` equal tags (`n >= 2`).
    pub fn min_run(mut self, n: usize) -> Self {
        assert!(n >= 2, "a run needs room for its length word");
        self.min_run = Some(n);
        self
    }

    /// Also compress runs of `Expression` arguments, which the producer
    /// never does but the format allows.
    pub fn with_expression_runs(mut self) -> Self {
        self.expression_runs = true;
        self
    }

    pub fn build(&self, root: &Node) -> Vec<u8> {
        self.build_raw(root).to_bytes()
    }

    pub fn build_raw(&self, root: &Node) -> RawBuffer {
        assert!(
            matches!(root, Node::Expr { .. }),
            "the root of a buffer must be an expression"
        );

        let mut raw = RawBuffer::default();
        raw.args.push(0);
        raw.tags.push(ArgType::Expression.raw());
        raw.exprs.push([0; 3]);

        let mut queue = VecDeque::from([(0usize, root)]);
        while let Some((index, node)) = queue.pop_front() {
            let Node::Expr { head, children } = node else {
                unreachable!("only expressions are queued");
            };
            let head_offset = raw.push_string(head);
            let start = raw.args.len();

            for child in children {
                let word = match child {
                    Node::Bool(v) => u64::from(*v),
                    Node::Long(v) => *v,
                    Node::Double(v) => v.to_bits(),
                    Node::Str(s) | Node::Symbol(s) => raw.push_string(s),
                    Node::Expr { .. } => {
                        let child_index = raw.exprs.len();
                        raw.exprs.push([0; 3]);
                        queue.push_back((child_index, child));
                        child_index as u64
                    }
                };
                raw.args.push(word);
                raw.tags.push(child.arg_type().raw());
            }

            let end = raw.args.len();
            raw.exprs[index] = [head_offset, start as u64, end as u64];
            self.compress_runs(&mut raw.tags[start..end]);
        }
        raw
    }

    fn compress_runs(&self, tags: &mut [u64]) {
        let Some(min_run) = self.min_run else {
            return;
        };
        let mut i = 0;
        while i < tags.len() {
            let tag = tags[i];
            let mut j = i + 1;
            while j < tags.len() && tags[j] == tag {
                j += 1;
            }
            let length = j - i;
            let eligible = self.expression_runs || tag != ArgType::Expression.raw();
            if eligible && length >= min_run {
                tags[i] = tag | RUN_BIT;
                tags[i + 1] = length as u64;
            }
            i = j;
        }
    }
}
