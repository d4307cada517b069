//! Column aggregation over a data package.
//!
//! A data package produced from a JSON descriptor with a CSV resource has
//! this shape once loaded:
//!
//! ```text
//!   Object
//!   ├── name:      "..."
//!   └── resources: List
//!                  └── Object
//!                      ├── name: "..."
//!                      └── path: Table
//!                                ├── <column>: cells...
//!                                └── <column>: cells...
//! ```
//!
//! Both strategies walk to the first resource's table and sum the numeric
//! cells of one column, skipping `Missing` and any other non-numeric cell.
//! Doubles are summed before longs in both, so the floating point results
//! are identical.

use wisent_decoder::{DecodeError, LazyView};
use wisent_types::{ArgType, Value};

/// Sum and count of the numeric cells of a column.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Aggregate {
    pub sum: f64,
    pub count: usize,
}

impl Aggregate {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

// ── Lazy ──────────────────────────────────────────────────────────────

/// The table of the first resource, found by head lookups alone.
///
/// # Errors
///
/// `KeyNotFound` naming the first step that does not match.
pub fn locate_table_lazy<'a>(root: &LazyView<'a>) -> Result<LazyView<'a>, DecodeError> {
    root.map_lookup("resources")?
        .at(0)?
        .into_view()?
        .map_lookup("Object")?
        .map_lookup("path")?
        .map_lookup("Table")
}

/// Sum column `column` of the first resource through a lazy view.
///
/// Only `Double` and `Long` blocks are decoded. A run of `Missing` cells
/// is stepped over by its tag.
///
/// # Errors
///
/// See [`locate_table_lazy`]; `KeyNotFound` for an unknown column.
pub fn sum_column_lazy(root: &LazyView<'_>, column: &str) -> Result<Aggregate, DecodeError> {
    let cells = locate_table_lazy(root)?.column(column)?;
    let mut aggregate = Aggregate::default();
    for arg_type in [ArgType::Double, ArgType::Long] {
        for cell in cells.typed_arguments(arg_type) {
            if let Some(value) = cell?.as_f64() {
                aggregate.add(value);
            }
        }
    }
    Ok(aggregate)
}

// ── Eager ─────────────────────────────────────────────────────────────

/// The table of the first resource of a materialized data package.
///
/// # Errors
///
/// `KeyNotFound` for a missing step, `TypeMismatch` if `resources` is not
/// a list.
pub fn locate_table_eager(root: &Value) -> Result<&Value, DecodeError> {
    let resources = lookup(root, "resources")?;
    let resources = resources.as_list().ok_or(DecodeError::TypeMismatch {
        expected: "List",
        found: resources.kind(),
    })?;
    let resource = resources
        .iter()
        .find(|value| matches!(value, Value::Object(_)))
        .ok_or_else(|| not_found("Object"))?;
    match lookup(resource, "path")? {
        table @ Value::Table(_) => Ok(table),
        _ => Err(not_found("Table")),
    }
}

/// Sum column `column` of the first resource of a materialized package.
///
/// # Errors
///
/// See [`locate_table_eager`]; `KeyNotFound` for an unknown column and
/// `TypeMismatch` for a column that is not a list.
pub fn sum_column_eager(root: &Value, column: &str) -> Result<Aggregate, DecodeError> {
    let cells = lookup(locate_table_eager(root)?, column)?;
    let cells = cells.as_list().ok_or(DecodeError::TypeMismatch {
        expected: "List",
        found: cells.kind(),
    })?;

    let mut aggregate = Aggregate::default();
    for cell in cells.iter().filter(|cell| matches!(cell, Value::Double(_))) {
        aggregate.add(cell.as_f64().unwrap_or_default());
    }
    for cell in cells.iter().filter(|cell| matches!(cell, Value::Long(_))) {
        aggregate.add(cell.as_f64().unwrap_or_default());
    }
    Ok(aggregate)
}

fn lookup<'v>(value: &'v Value, key: &str) -> Result<&'v Value, DecodeError> {
    value.get(key).ok_or_else(|| not_found(key))
}

fn not_found(key: &str) -> DecodeError {
    DecodeError::KeyNotFound {
        key: key.to_owned(),
    }
}
