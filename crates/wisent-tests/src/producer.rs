//! The load service's buffer layout, rebuilt for the golden fixtures.
//!
//! `datapackage.wisent` is the buffer the service writes for
//! `datapackage.json` and the CSV it references. [`produce`] lays a
//! document out the same way:
//!
//! - expressions are numbered depth-first, in document order;
//! - arguments are grouped by nesting layer, so the children of one
//!   expression are contiguous and each layer follows the one above it;
//! - five or more equal scalar tags in a row become a run, and a run ends
//!   at every expression slot and expression boundary;
//! - JSON `null`, `true` and `false` become the symbols `Null`, `True`
//!   and `False`;
//! - a string ending in `.csv` is replaced by that file, loaded as a
//!   `Table` with one expression per column.
//!
//! ```text
//!   layer 0 │ root slot
//!   layer 1 │ children of the root
//!   layer 2 │ children of layer-1 expressions, parent by parent
//!   ...
//! ```
//!
//! The CSV reader splits on commas and does not understand quoting.

use std::path::Path;

use anyhow::{Context, Result, bail};
use serde_json::Value as Json;
use wisent_fixtures::{PRODUCER_MIN_RUN, RawBuffer};
use wisent_wire::ArgType;
use wisent_wire::type_tag::RUN_BIT;

/// First reserved header word as the service fills it: the address the
/// segment was mapped at. The second is the heap length.
const MAPPING_BASE: u64 = 0x7f3a_0000_0000;

/// Lay out `dir/datapackage.json`, with its CSV resources loaded from
/// `dir`, the way the load service does.
///
/// # Errors
///
/// Unreadable files or invalid JSON.
pub fn produce(dir: &Path) -> Result<Vec<u8>> {
    let path = dir.join("datapackage.json");
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let json: Json = serde_json::from_str(&text)
        .with_context(|| format!("cannot parse {}", path.display()))?;
    let document = Item::from_json(&json, dir)?;
    Ok(Writer::new(&document).write(&document))
}

// ── Document ──────────────────────────────────────────────────────────

/// A JSON document with its CSV references already loaded.
enum Item {
    Object(Vec<(String, Item)>),
    List(Vec<Item>),
    Table(Vec<Column>),
    Long(u64),
    Double(f64),
    String(String),
    Symbol(&'static str),
}

struct Column {
    name: String,
    cells: Vec<Cell>,
}

enum Cell {
    Long(u64),
    Double(f64),
    String(String),
    Missing,
}

impl Item {
    fn from_json(json: &Json, dir: &Path) -> Result<Self> {
        Ok(match json {
            Json::Null => Self::Symbol("Null"),
            Json::Bool(true) => Self::Symbol("True"),
            Json::Bool(false) => Self::Symbol("False"),
            Json::Number(n) => {
                if let Some(v) = n.as_i64() {
                    Self::Long(v as u64)
                } else if let Some(v) = n.as_u64() {
                    Self::Long(v)
                } else {
                    Self::Double(n.as_f64().with_context(|| format!("number {n} out of range"))?)
                }
            }
            Json::String(s) if s.ends_with(".csv") => Self::Table(load_csv(&dir.join(s))?),
            Json::String(s) => Self::String(s.clone()),
            Json::Array(items) => Self::List(
                items
                    .iter()
                    .map(|item| Self::from_json(item, dir))
                    .collect::<Result<_>>()?,
            ),
            Json::Object(map) => Self::Object(
                map.iter()
                    .map(|(key, value)| Ok((key.clone(), Self::from_json(value, dir)?)))
                    .collect::<Result<_>>()?,
            ),
        })
    }
}

/// One column per header field. A column is `Long` if every non-empty
/// cell parses as an `i64`, else `Double` if every one parses as an `f64`,
/// else `String`. Empty cells are `Missing` in any column.
fn load_csv(path: &Path) -> Result<Vec<Column>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let mut lines = text.lines().map(|line| line.split(',').collect::<Vec<_>>());
    let Some(header) = lines.next() else {
        bail!("{} has no header row", path.display());
    };
    let rows: Vec<Vec<&str>> = lines.collect();

    Ok(header
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let cells: Vec<&str> = rows
                .iter()
                .map(|row| row.get(i).copied().unwrap_or(""))
                .collect();
            Column {
                name: (*name).to_owned(),
                cells: typed_cells(&cells),
            }
        })
        .collect())
}

fn typed_cells(cells: &[&str]) -> Vec<Cell> {
    let all = |parse: fn(&str) -> Option<Cell>| -> Option<Vec<Cell>> {
        cells
            .iter()
            .map(|cell| if cell.is_empty() { Some(Cell::Missing) } else { parse(cell) })
            .collect()
    };
    if cells.is_empty() {
        return Vec::new();
    }
    all(|cell| cell.parse::<i64>().ok().map(|v| Cell::Long(v as u64)))
        .or_else(|| all(|cell| cell.parse::<f64>().ok().map(Cell::Double)))
        .unwrap_or_else(|| {
            cells
                .iter()
                .map(|cell| {
                    if cell.is_empty() {
                        Cell::Missing
                    } else {
                        Cell::String((*cell).to_owned())
                    }
                })
                .collect()
        })
}

// ── Layout ────────────────────────────────────────────────────────────

/// Argument slots per nesting layer and the expression total.
#[derive(Default)]
struct Census {
    layers: Vec<usize>,
    expressions: usize,
}

impl Census {
    fn bump(&mut self, layer: usize, slots: usize) {
        if self.layers.len() <= layer {
            self.layers.resize(layer + 1, 0);
        }
        self.layers[layer] += slots;
    }

    fn count(&mut self, item: &Item, layer: usize) {
        self.bump(layer, 1);
        match item {
            Item::Object(entries) => {
                self.expressions += 1;
                for (_, value) in entries {
                    self.bump(layer + 1, 1);
                    self.expressions += 1;
                    self.count(value, layer + 2);
                }
            }
            Item::List(items) => {
                self.expressions += 1;
                for item in items {
                    self.count(item, layer + 1);
                }
            }
            Item::Table(columns) => {
                self.expressions += 1 + columns.len();
                self.bump(layer + 1, columns.len());
                self.bump(layer + 2, columns.iter().map(|c| c.cells.len()).sum());
            }
            Item::Long(_) | Item::Double(_) | Item::String(_) | Item::Symbol(_) => {}
        }
    }
}

/// The expression receiving arguments and how many it has so far.
#[derive(Clone, Copy)]
struct Open {
    expression: usize,
    written: usize,
}

struct Writer {
    raw: RawBuffer,
    /// Next free slot of each layer.
    next_slot: Vec<usize>,
    current: Open,
    outer: Vec<Open>,
    next_expression: usize,
    layer: usize,
    run: usize,
}

impl Writer {
    fn new(document: &Item) -> Self {
        let mut census = Census::default();
        census.count(document, 0);

        let mut next_slot = Vec::with_capacity(census.layers.len());
        let mut total = 0;
        for slots in census.layers {
            total += slots;
            next_slot.push(total);
        }
        Self {
            raw: RawBuffer {
                args: vec![0; total],
                tags: vec![0; total],
                exprs: vec![[0; 3]; census.expressions],
                strings: Vec::new(),
            },
            next_slot,
            // The root slot is written before expression 0 is opened,
            // at its still-zero start.
            current: Open {
                expression: 0,
                written: 0,
            },
            outer: Vec::new(),
            next_expression: 0,
            layer: 0,
            run: 0,
        }
    }

    fn write(mut self, document: &Item) -> Vec<u8> {
        self.value(document);
        let heap_len = self.raw.strings.len() as u64;
        let mut buf = self.raw.to_bytes();
        buf[16..24].copy_from_slice(&MAPPING_BASE.to_le_bytes());
        buf[24..32].copy_from_slice(&heap_len.to_le_bytes());
        buf
    }

    fn value(&mut self, item: &Item) {
        match item {
            Item::Object(entries) => {
                self.start("Object");
                for (key, value) in entries {
                    self.start(key);
                    self.value(value);
                    self.end();
                }
                self.end();
            }
            Item::List(items) => {
                self.start("List");
                for item in items {
                    self.value(item);
                }
                self.end();
            }
            Item::Table(columns) => {
                self.start("Table");
                for column in columns {
                    self.start(&column.name);
                    for cell in &column.cells {
                        match cell {
                            Cell::Long(v) => self.scalar(ArgType::Long, *v),
                            Cell::Double(v) => self.scalar(ArgType::Double, v.to_bits()),
                            Cell::String(s) => self.string(ArgType::String, s),
                            Cell::Missing => self.string(ArgType::Symbol, "Missing"),
                        }
                    }
                    self.end();
                }
                self.end();
            }
            Item::Long(v) => self.scalar(ArgType::Long, *v),
            Item::Double(v) => self.scalar(ArgType::Double, v.to_bits()),
            Item::String(s) => self.string(ArgType::String, s),
            Item::Symbol(s) => self.string(ArgType::Symbol, s),
        }
    }

    /// Open a new expression as the next argument of the current one.
    fn start(&mut self, head: &str) {
        let expression = self.next_expression;
        self.next_expression += 1;

        let slot = self.next_arg();
        self.raw.args[slot] = expression as u64;
        self.raw.tags[slot] = ArgType::Expression.raw();
        self.close_run(slot);

        let head = self.raw.push_string(head);
        let start = self.next_slot[self.layer];
        self.layer += 1;
        self.raw.exprs[expression] = [head, start as u64, 0];
        self.outer.push(self.current);
        self.current = Open {
            expression,
            written: 0,
        };
    }

    fn end(&mut self) {
        let Open {
            expression,
            written,
        } = self.current;
        let end = self.raw.exprs[expression][1] as usize + written;
        self.raw.exprs[expression][2] = end as u64;
        self.close_run(end);
        if let Some(outer) = self.outer.pop() {
            self.current = outer;
        }
        self.layer -= 1;
        self.next_slot[self.layer] = end;
    }

    fn next_arg(&mut self) -> usize {
        let slot = self.raw.exprs[self.current.expression][1] as usize + self.current.written;
        self.current.written += 1;
        slot
    }

    fn string(&mut self, arg_type: ArgType, s: &str) {
        let offset = self.raw.push_string(s);
        self.scalar(arg_type, offset);
    }

    fn scalar(&mut self, arg_type: ArgType, word: u64) {
        let slot = self.next_arg();
        self.raw.args[slot] = word;
        self.raw.tags[slot] = arg_type.raw();
        if self.run > 0 && self.raw.tags[slot - 1] != self.raw.tags[slot] {
            self.close_run(slot);
        }
        self.run += 1;
    }

    /// End the run of equal tags just before `end`, tagging it if long
    /// enough.
    fn close_run(&mut self, end: usize) {
        if self.run >= PRODUCER_MIN_RUN {
            let start = end - self.run;
            self.raw.tags[start] |= RUN_BIT;
            self.raw.tags[start + 1] = self.run as u64;
        }
        self.run = 0;
    }
}
