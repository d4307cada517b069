//! Edge case integration tests for the decoders.
//!
//! - **Empty and boundary values**: empty containers, strings that fill a
//!   heap chunk exactly or straddle one, `u64::MAX`, Bool slots with junk
//!   in the upper bytes.
//! - **Hostile layouts**: unknown tags, run tags that cannot be honoured,
//!   child ranges and references that point outside the buffer, strings
//!   that are not UTF-8. Every one must surface as an error from both
//!   strategies, never a panic.
//! - **Deep and cyclic nesting**: bounded by the depth limit.
//! - **Producer quirks**: duplicate keys, runs over expression tags.
//!
//! Hand-written buffers put the root at expression 0 with slot 0 pointing
//! back at it, like the load service does.

use std::collections::BTreeMap;

use wisent_decoder::{DEFAULT_MAX_DEPTH, DecodeError, EagerDecoder, LazyView};
use wisent_fixtures::{BufferBuilder, RawBuffer, long, list, longs, object, string, table};
use wisent_types::{Expression, Value};
use wisent_wire::type_tag::RUN_BIT;
use wisent_wire::{ArgType, WireError};

// ── Helpers ───────────────────────────────────────────────────────────────────

/// A buffer whose root `(head ...)` has the given `(tag, arg)` children.
fn root_with(head: &str, children: &[(u64, u64)]) -> RawBuffer {
    let mut raw = RawBuffer::default();
    let head = raw.push_string(head);
    raw.args.push(0);
    raw.tags.push(ArgType::Expression.raw());
    for &(tag, arg) in children {
        raw.tags.push(tag);
        raw.args.push(arg);
    }
    raw.exprs.push([head, 1, 1 + children.len() as u64]);
    raw
}

/// Decode with both strategies, requiring both to fail the same way.
fn both_fail(buf: &[u8]) -> DecodeError {
    let eager = EagerDecoder::decode(buf).expect_err("eager decode should fail");
    let lazy = LazyView::root(buf)
        .and_then(|root| root.materialize())
        .expect_err("lazy materialize should fail");
    assert_eq!(
        eager.root_cause().to_string(),
        lazy.root_cause().to_string(),
        "strategies disagree"
    );
    eager
}

/// Decode with both strategies, requiring both to agree.
fn both_ok(buf: &[u8]) -> Value {
    let eager = EagerDecoder::decode(buf).unwrap();
    let lazy = LazyView::root(buf).unwrap().materialize().unwrap();
    assert_eq!(lazy, eager);
    eager
}

fn row(arguments: Vec<Value>) -> Value {
    Value::Expression(Expression {
        head: "Row".into(),
        arguments,
    })
}

// ── Empty and boundary values ─────────────────────────────────────────────────

#[test]
fn empty_containers() {
    let empty = BTreeMap::new();
    assert_eq!(
        both_ok(&BufferBuilder::new().build(&object(vec![]))),
        Value::Object(empty.clone())
    );
    assert_eq!(both_ok(&BufferBuilder::new().build(&list(vec![]))), Value::List(vec![]));
    assert_eq!(
        both_ok(&BufferBuilder::new().build(&table(vec![]))),
        Value::Table(empty)
    );

    let buf = BufferBuilder::new().build(&list(vec![]));
    assert!(matches!(
        LazyView::root(&buf).unwrap().at(0),
        Err(DecodeError::IndexOutOfRange { index: 0, len: 0 })
    ));
}

#[test]
fn header_only_buffer_has_no_root() {
    let buf = RawBuffer::default().to_bytes();
    let err = both_fail(&buf);
    assert!(matches!(
        err.root_cause(),
        DecodeError::Wire(WireError::ExpressionOutOfRange { index: 0, count: 0 })
    ));
}

#[test]
fn string_filling_a_whole_chunk() {
    let text = "x".repeat(32);
    let value = both_ok(&BufferBuilder::new().build(&object(vec![("k", string(&text))])));
    assert_eq!(value.get("k").and_then(Value::as_str), Some(text.as_str()));
}

#[test]
fn multibyte_character_across_chunk_boundary() {
    let text = format!("{}é and more", "a".repeat(31));
    let value = both_ok(&BufferBuilder::new().build(&object(vec![("k", string(&text))])));
    assert_eq!(value.get("k").and_then(Value::as_str), Some(text.as_str()));
}

#[test]
fn unterminated_string_at_heap_end() {
    let mut raw = root_with("Row", &[]);
    let tail = raw.strings.len() as u64;
    raw.strings.extend_from_slice(b"tail");
    raw.tags.push(ArgType::String.raw());
    raw.args.push(tail);
    raw.exprs[0][2] = 2;

    assert_eq!(both_ok(&raw.to_bytes()), row(vec![Value::String("tail".into())]));
}

#[test]
fn largest_long_survives() {
    let value = both_ok(&BufferBuilder::new().build(&object(vec![("max", long(u64::MAX))])));
    assert_eq!(value.get("max"), Some(&Value::Long(u64::MAX)));
}

#[test]
fn bool_reads_only_the_low_byte() {
    let bool_tag = ArgType::Bool.raw();
    let raw = root_with("Row", &[(bool_tag, 0x100), (bool_tag, 0x0101), (bool_tag, 0)]);
    assert_eq!(
        both_ok(&raw.to_bytes()),
        row(vec![Value::Bool(false), Value::Bool(true), Value::Bool(false)])
    );
}

// ── Hostile layouts ───────────────────────────────────────────────────────────

#[test]
fn unknown_tag() {
    let raw = root_with("Row", &[(ArgType::Long.raw(), 1), (9, 0)]);
    let err = both_fail(&raw.to_bytes());
    assert!(matches!(
        err.root_cause(),
        DecodeError::Wire(WireError::UnknownTypeTag { slot: 2, value: 9 })
    ));
}

#[test]
fn unknown_tag_inside_a_run() {
    let raw = root_with("Row", &[(RUN_BIT | 0x7E, 0), (3, 0), (0x7E, 0)]);
    let err = both_fail(&raw.to_bytes());
    assert!(matches!(
        err.root_cause(),
        DecodeError::Wire(WireError::UnknownTypeTag { slot: 1, value: 0x7E })
    ));
}

#[test]
fn run_tag_on_the_last_slot() {
    let raw = root_with("Row", &[(RUN_BIT | ArgType::Long.raw(), 7)]);
    let err = both_fail(&raw.to_bytes());
    assert!(matches!(
        err.root_cause(),
        DecodeError::Wire(WireError::MalformedRun { slot: 1, .. })
    ));
}

#[test]
fn run_shorter_than_two() {
    for length in [0, 1] {
        let long_run = RUN_BIT | ArgType::Long.raw();
        let raw = root_with("Row", &[(long_run, 7), (length, 8), (ArgType::Long.raw(), 9)]);
        let err = both_fail(&raw.to_bytes());
        assert!(
            matches!(err.root_cause(), DecodeError::Wire(WireError::MalformedRun { slot: 1, .. })),
            "length {length}: {err}"
        );
    }
}

#[test]
fn run_spilling_past_child_range() {
    let long_run = RUN_BIT | ArgType::Long.raw();
    let mut raw = root_with("Row", &[(long_run, 1), (4, 2), (long_run, 3), (4, 4)]);
    // Shrink the root to the first two slots of its four-slot run.
    raw.exprs[0][2] = 3;
    let err = both_fail(&raw.to_bytes());
    assert!(matches!(
        err.root_cause(),
        DecodeError::Wire(WireError::MalformedRun { slot: 1, .. })
    ));
}

#[test]
fn child_range_outside_args() {
    let mut raw = root_with("Row", &[(ArgType::Long.raw(), 1)]);
    raw.exprs[0][2] = 10;
    assert!(matches!(
        both_fail(&raw.to_bytes()).root_cause(),
        DecodeError::Wire(WireError::ChildRangeOutOfBounds { index: 0, end: 10, .. })
    ));

    raw.exprs[0] = [0, 2, 1];
    assert!(matches!(
        both_fail(&raw.to_bytes()).root_cause(),
        DecodeError::Wire(WireError::ChildRangeOutOfBounds { index: 0, start: 2, .. })
    ));
}

#[test]
fn dangling_expression_reference() {
    let raw = root_with("Row", &[(ArgType::Expression.raw(), 7)]);
    assert!(matches!(
        both_fail(&raw.to_bytes()).root_cause(),
        DecodeError::Wire(WireError::ExpressionOutOfRange { index: 7, count: 1 })
    ));
}

#[test]
fn string_offset_past_heap() {
    let raw = root_with("Row", &[(ArgType::Symbol.raw(), 1_000)]);
    assert!(matches!(
        both_fail(&raw.to_bytes()).root_cause(),
        DecodeError::Wire(WireError::StringOffsetOutOfRange { offset: 1_000, .. })
    ));
}

#[test]
fn invalid_utf8_in_heap() {
    let mut raw = root_with("Row", &[]);
    let bad = raw.strings.len() as u64;
    raw.strings.extend_from_slice(&[0xFF, 0xFE, 0]);
    raw.tags.push(ArgType::String.raw());
    raw.args.push(bad);
    raw.exprs[0][2] = 2;
    assert!(matches!(
        both_fail(&raw.to_bytes()).root_cause(),
        DecodeError::Wire(WireError::InvalidStringEncoding { .. })
    ));
}

#[test]
fn object_entry_that_is_not_an_expression() {
    let raw = root_with("Object", &[(ArgType::Long.raw(), 1)]);
    assert!(matches!(
        both_fail(&raw.to_bytes()).root_cause(),
        DecodeError::MalformedShape { shape: "Object", index: 0, .. }
    ));
}

// ── Deep and cyclic nesting ───────────────────────────────────────────────────

#[test]
fn self_reference_hits_depth_limit() {
    let raw = root_with("Loop", &[(ArgType::Expression.raw(), 0)]);
    let err = both_fail(&raw.to_bytes());
    assert!(matches!(
        err.root_cause(),
        DecodeError::DepthLimitExceeded { limit: DEFAULT_MAX_DEPTH }
    ));
}

#[test]
fn custom_depth_limit() {
    let buf = BufferBuilder::new().build(&list(vec![list(vec![list(vec![])])]));
    let shallow = EagerDecoder::new().with_max_depth(1).decode_buffer(&buf);
    assert!(matches!(
        shallow.map_err(|err| err.root_cause().to_string()),
        Err(message) if message == "expression nesting exceeds depth limit 1"
    ));
    assert!(EagerDecoder::new().with_max_depth(2).decode_buffer(&buf).is_ok());
}

// ── Producer quirks ───────────────────────────────────────────────────────────

#[test]
fn duplicate_keys_keep_the_first() {
    let buf = BufferBuilder::new().build(&object(vec![("a", long(1)), ("b", long(2)), ("a", long(3))]));
    let value = both_ok(&buf);
    assert_eq!(value.get("a"), Some(&Value::Long(1)));

    let root = LazyView::root(&buf).unwrap();
    assert_eq!(root.map_lookup("a").unwrap().at(0).unwrap().to_value().unwrap(), Value::Long(1));
}

#[test]
fn runs_over_expression_tags() {
    let tree = object(
        (0..8)
            .map(|i| (["k0", "k1", "k2", "k3", "k4", "k5", "k6", "k7"][i], longs(&[i as u64])))
            .collect(),
    );
    let plain = both_ok(&BufferBuilder::new().without_runs().build(&tree));
    let runs = both_ok(&BufferBuilder::new().with_expression_runs().build(&tree));
    assert_eq!(plain, runs);

    let buf = BufferBuilder::new().with_expression_runs().build(&tree);
    let root = LazyView::root(&buf).unwrap();
    assert_eq!(root.arity().unwrap(), 8);
    assert_eq!(
        root.field("k6").unwrap().to_value().unwrap(),
        Value::List(vec![Value::Long(6)])
    );
}
