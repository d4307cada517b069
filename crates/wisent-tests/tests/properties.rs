//! Properties every decoder build must satisfy.
//!
//! - **Strategy agreement**: the eager decoder and a fully drained lazy
//!   view produce equal values for every node.
//! - **Run expansion**: a run of `N` tags yields exactly `N` arguments,
//!   each equal to a direct slot read.
//! - **Chunked strings**: a 40-byte string comes back whole.
//! - **Lookup**: `map_lookup` finds present keys and rejects absent ones
//!   with `KeyNotFound`.
//! - **Positional access**: `at(n)` equals the `n`-th drained argument.
//! - **Tables**: both strategies expose a column as its list of values.
//! - **Truncation**: a header claiming more than the buffer holds is
//!   `TruncatedBuffer`, never an out-of-range read.

use wisent_decoder::{DecodeError, EagerDecoder, LazyValue, LazyView, SlotValue, read_slot};
use wisent_fixtures::{
    BufferBuilder, Node, boolean, datapackage, double, doubles, expr, list, long, longs, object,
    producer_table, string, symbol, table,
};
use wisent_tests::golden;
use wisent_types::Value;
use wisent_wire::layout::HEADER_SIZE;
use wisent_wire::{ArgType, Regions, TagBlocks, WireError};

fn sample_trees() -> Vec<Node> {
    vec![
        longs(&[]),
        longs(&[1, 2, 3, 4, 5, 6, 7]),
        expr(
            "Mixed",
            vec![
                boolean(true),
                long(u64::MAX),
                double(-0.0),
                string(""),
                symbol("Null"),
                list(vec![]),
            ],
        ),
        object(vec![
            ("a", long(1)),
            ("b", object(vec![("c", doubles(&[0.5, 1.5, 2.5, 3.5, 4.5, 5.5]))])),
        ]),
        table(vec![("x", longs(&[1, 2, 3])), ("y", longs(&[4, 5, 6]))]),
        datapackage(producer_table(vec![
            (
                "rate",
                vec![
                    double(1.0),
                    symbol("Missing"),
                    symbol("Missing"),
                    symbol("Missing"),
                    symbol("Missing"),
                    symbol("Missing"),
                    double(2.0),
                ],
            ),
            ("name", (0..6).map(|i| string(&format!("row {i}"))).collect()),
        ])),
    ]
}

/// Every expression index reachable in `buf`, each materialized both ways.
fn assert_strategies_agree(buf: &[u8]) {
    let regions = Regions::parse(buf).unwrap();
    let eager = EagerDecoder::new();
    for index in 0..regions.expr_count() as u64 {
        let expected = eager.decode_expression(&regions, index).unwrap();
        let lazy = LazyView::new(regions, index).unwrap().materialize().unwrap();
        assert_eq!(lazy, expected, "expression {index}");
    }
}

// ── Strategy agreement ────────────────────────────────────────────────────────

#[test]
fn eager_and_lazy_agree_on_every_node() {
    for tree in sample_trees() {
        assert_strategies_agree(&BufferBuilder::new().build(&tree));
        assert_strategies_agree(&BufferBuilder::new().without_runs().build(&tree));
        assert_strategies_agree(&BufferBuilder::new().min_run(2).with_expression_runs().build(&tree));
    }
}

#[test]
fn eager_and_lazy_agree_on_golden_buffer() {
    assert_strategies_agree(&golden("datapackage.wisent"));
}

#[test]
fn run_compression_does_not_change_values() {
    for tree in sample_trees() {
        let plain = EagerDecoder::decode(&BufferBuilder::new().without_runs().build(&tree)).unwrap();
        let packed = EagerDecoder::decode(&BufferBuilder::new().min_run(2).build(&tree)).unwrap();
        assert_eq!(plain, packed);
    }
}

// ── Run expansion ─────────────────────────────────────────────────────────────

#[test]
fn run_yields_exactly_its_length() {
    let values: Vec<f64> = (0..9).map(|i| f64::from(i) * 0.5).collect();
    let buf = BufferBuilder::new().build(&expr(
        "Row",
        std::iter::once(string("lead"))
            .chain(values.iter().copied().map(double))
            .collect(),
    ));
    let regions = Regions::parse(&buf).unwrap();
    let root = LazyView::root(&buf).unwrap();

    let blocks: Vec<_> = TagBlocks::new(regions, regions.child_range(0).unwrap())
        .collect::<Result<_, _>>()
        .unwrap();
    let run = blocks
        .iter()
        .find(|block| block.arg_type == ArgType::Double)
        .unwrap();
    assert_eq!(run.slots.len(), 9);

    let doubles: Vec<_> = root
        .typed_arguments(ArgType::Double)
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(doubles.len(), 9);
    for (slot, value) in run.slots.clone().zip(&doubles) {
        let SlotValue::Double(direct) = read_slot(&regions, ArgType::Double, slot).unwrap() else {
            panic!("slot {slot} is not a double");
        };
        assert!(matches!(value, LazyValue::Double(v) if v.to_bits() == direct.to_bits()));
    }
}

// ── Chunked strings ───────────────────────────────────────────────────────────

#[test]
fn forty_character_string_is_not_truncated() {
    let text = "abcdefghij".repeat(4);
    let buf = BufferBuilder::new().build(&object(vec![("k", string(&text))]));

    let eager = EagerDecoder::decode(&buf).unwrap();
    assert_eq!(eager.get("k").and_then(Value::as_str), Some(text.as_str()));

    let lazy = LazyView::root(&buf).unwrap().field("k").unwrap();
    assert!(matches!(lazy, LazyValue::String(s) if s == text));
}

// ── Lookup ────────────────────────────────────────────────────────────────────

#[test]
fn map_lookup_present_and_absent_keys() {
    let buf = BufferBuilder::new().build(&object(vec![("a", long(1)), ("b", long(2))]));
    let root = LazyView::root(&buf).unwrap();

    let a = root.map_lookup("a").unwrap();
    assert_eq!(a.head().unwrap(), "a");
    assert!(matches!(a.at(0).unwrap(), LazyValue::Long(1)));

    let err = root.map_lookup("c").unwrap_err();
    assert!(matches!(err, DecodeError::KeyNotFound { ref key } if key == "c"));
    assert_eq!(err.to_string(), "key \"c\" not found");
}

// ── Positional access ─────────────────────────────────────────────────────────

#[test]
fn at_equals_nth_drained_argument() {
    for tree in sample_trees() {
        let buf = BufferBuilder::new().build(&tree);
        let root = LazyView::root(&buf).unwrap();
        let drained: Vec<Value> = root
            .arguments()
            .map(|argument| argument.unwrap().to_value().unwrap())
            .collect();
        for (n, expected) in drained.iter().enumerate() {
            assert_eq!(&root.at(n).unwrap().to_value().unwrap(), expected);
        }
        assert!(matches!(
            root.at(drained.len()),
            Err(DecodeError::IndexOutOfRange { .. })
        ));
    }
}

// ── Tables ────────────────────────────────────────────────────────────────────

#[test]
fn table_column_through_both_strategies() {
    let buf = BufferBuilder::new().build(&table(vec![
        ("x", longs(&[1, 2, 3])),
        ("y", longs(&[4, 5, 6])),
    ]));
    let expected = Value::List(vec![Value::Long(1), Value::Long(2), Value::Long(3)]);

    let eager = EagerDecoder::decode(&buf).unwrap();
    assert!(matches!(eager, Value::Table(_)));
    assert_eq!(eager.get("x"), Some(&expected));

    let column = LazyView::root(&buf).unwrap().column("x").unwrap();
    assert_eq!(column.materialize().unwrap(), expected);
}

// ── Truncation ────────────────────────────────────────────────────────────────

#[test]
fn overstated_counts_are_truncated_buffer() {
    let mut buf = BufferBuilder::new().build(&longs(&[1, 2, 3]));
    buf[0..8].copy_from_slice(&1_000u64.to_le_bytes());

    for result in [
        EagerDecoder::decode(&buf).map(drop),
        LazyView::root(&buf).map(drop),
    ] {
        assert!(matches!(
            result,
            Err(DecodeError::Wire(WireError::TruncatedBuffer { actual, .. })) if actual == buf.len()
        ));
    }
}

#[test]
fn every_prefix_of_a_buffer_fails_cleanly() {
    let buf = golden("datapackage.wisent");
    for len in 0..buf.len() {
        let prefix = &buf[..len];
        let eager = EagerDecoder::decode(prefix);
        if len < HEADER_SIZE {
            assert!(eager.is_err(), "prefix {len}");
        }
        let _ = LazyView::root(prefix).and_then(|root| root.materialize());
    }
}
