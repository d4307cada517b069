/// Printing shared by the subcommands.
///
/// The tree goes to stdout either in the s-expression form of
/// `Value`'s `Display` or as JSON. The JSON form undoes the producer's
/// encoding of JSON literals: the symbols `Null`, `True` and `False`
/// become `null`, `true` and `false`.
use anyhow::{Context, Result};
use serde_json::{Map, Number, json};
use wisent_session::Aggregate;
use wisent_types::Value;

pub fn print_value(value: &Value, as_json: bool) -> Result<()> {
    if as_json {
        let text = serde_json::to_string_pretty(&to_json(value)).context("cannot render JSON")?;
        println!("{text}");
    } else {
        println!("{value}");
    }
    Ok(())
}

pub fn print_aggregate(column: &str, aggregate: &Aggregate) {
    println!("column: {column}");
    println!("sum:    {}", aggregate.sum);
    println!("count:  {}", aggregate.count);
    if let Some(mean) = aggregate.mean() {
        println!("mean:   {mean}");
    }
}

fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Bool(v) => json!(v),
        Value::Long(v) => json!(v),
        Value::Double(v) => Number::from_f64(*v).map_or(serde_json::Value::Null, Into::into),
        Value::String(s) => json!(s),
        Value::Symbol(s) => match s.as_str() {
            "Null" => serde_json::Value::Null,
            "True" => json!(true),
            "False" => json!(false),
            other => json!(other),
        },
        Value::Object(map) | Value::Table(map) => map
            .iter()
            .map(|(k, v)| (k.clone(), to_json(v)))
            .collect::<Map<_, _>>()
            .into(),
        Value::List(items) => items.iter().map(to_json).collect(),
        Value::Expression(expr) => json!({
            "head": expr.head,
            "arguments": expr.arguments.iter().map(to_json).collect::<Vec<_>>(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use wisent_types::Expression;

    use super::*;

    #[test]
    fn json_literals_round_back() {
        let value = Value::List(vec![
            Value::Symbol("Null".into()),
            Value::Symbol("True".into()),
            Value::Symbol("Missing".into()),
            Value::Double(f64::NAN),
        ]);
        assert_eq!(to_json(&value), json!([null, true, "Missing", null]));
    }

    #[test]
    fn json_expression_keeps_head() {
        let value = Value::Expression(Expression {
            head: "Point".into(),
            arguments: vec![Value::Long(1)],
        });
        assert_eq!(to_json(&value), json!({"head": "Point", "arguments": [1]}));
    }
}
