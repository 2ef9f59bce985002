//! Best-effort conversion of textual test case inputs and outputs into
//! [`StructuredValue`]s.
//!
//! Parsing never fails: each strategy either declines (`None`) or produces a
//! value, and a strategy that applies but cannot parse yields the original
//! text. Known limitation: a string answer containing spaces, such as
//! `"hello world"`, is read as a list of tokens.

pub use common::models::StructuredValue;
use serde_json::{Number, Value};

type Strategy = fn(&str, &str) -> Option<StructuredValue>;

const INPUT_STRATEGIES: [Strategy; 4] = [assignment, structured, space_separated, numeric];
const OUTPUT_STRATEGIES: [Strategy; 2] = [structured, numeric];

/// Parses a raw test case input. Non-string JSON values pass through.
pub fn parse_input(raw: &Value) -> StructuredValue {
    match raw {
        Value::String(text) => parse_input_text(text),
        other => StructuredValue::from(other.clone()),
    }
}

/// Parses a raw expected output. Non-string JSON values pass through.
pub fn parse_output(raw: &Value) -> StructuredValue {
    match raw {
        Value::String(text) => parse_output_text(text),
        other => StructuredValue::from(other.clone()),
    }
}

pub fn parse_input_text(text: &str) -> StructuredValue {
    apply(&INPUT_STRATEGIES, text)
}

pub fn parse_output_text(text: &str) -> StructuredValue {
    apply(&OUTPUT_STRATEGIES, text)
}

fn apply(strategies: &[Strategy], text: &str) -> StructuredValue {
    let trimmed = text.trim();
    strategies
        .iter()
        .find_map(|strategy| strategy(text, trimmed))
        .unwrap_or_else(|| StructuredValue::text(text))
}

// `nums = [1, 2, 3]` -> the value after the last `=`
fn assignment(raw: &str, trimmed: &str) -> Option<StructuredValue> {
    let (_, rhs) = trimmed.rsplit_once('=')?;
    Some(parse_structured(rhs.trim()).unwrap_or_else(|| StructuredValue::text(raw)))
}

fn structured(raw: &str, trimmed: &str) -> Option<StructuredValue> {
    if !(trimmed.starts_with('[') || trimmed.starts_with('{')) {
        return None;
    }
    Some(parse_structured(trimmed).unwrap_or_else(|| StructuredValue::text(raw)))
}

fn space_separated(_raw: &str, trimmed: &str) -> Option<StructuredValue> {
    if !trimmed.contains(' ') {
        return None;
    }
    let mut tokens = trimmed
        .split_whitespace()
        .map(|token| match coerce_number(token) {
            Some(n) => StructuredValue::Number(n),
            None => StructuredValue::text(token),
        })
        .collect::<Vec<_>>();
    if tokens.len() == 1 {
        tokens.pop()
    } else {
        Some(StructuredValue::List(tokens))
    }
}

fn numeric(_raw: &str, trimmed: &str) -> Option<StructuredValue> {
    coerce_number(trimmed).map(StructuredValue::Number)
}

/// JSON parse with single quotes read as double quotes.
fn parse_structured(text: &str) -> Option<StructuredValue> {
    serde_json::from_str::<Value>(&text.replace('\'', "\""))
        .ok()
        .map(StructuredValue::from)
}

/// Decimal integers keep integer representation; other finite decimal
/// literals become floats. `inf`, `NaN` and the empty string are not numeric.
pub fn coerce_number(token: &str) -> Option<Number> {
    if token.is_empty() {
        return None;
    }
    if let Ok(i) = token.parse::<i64>() {
        return Some(i.into());
    }
    if !token
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
    {
        return None;
    }
    token
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .and_then(Number::from_f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn int(i: i64) -> StructuredValue {
        StructuredValue::from(i)
    }

    fn float(f: f64) -> StructuredValue {
        StructuredValue::Number(Number::from_f64(f).unwrap())
    }

    #[test]
    fn plain_number_and_plain_string() {
        assert_eq!(parse_input_text("5"), int(5));
        assert_eq!(parse_input_text("-12"), int(-12));
        assert_eq!(parse_input_text("2.5"), float(2.5));
        assert_eq!(parse_input_text("abc"), StructuredValue::text("abc"));
    }

    #[test]
    fn assignment_matches_direct_parse() {
        let cases = [
            ("nums = [2, 7, 11, 15]", "[2, 7, 11, 15]"),
            ("s = 'hello'", "'hello'"),
            ("grid = [['a', 'b'], ['c']]", "[['a', 'b'], ['c']]"),
            ("m = {'x': 1, 'y': [1, 2]}", "{'x': 1, 'y': [1, 2]}"),
            ("n = 42", "42"),
        ];
        for (input, rhs) in cases {
            let direct: Value = serde_json::from_str(&rhs.replace('\'', "\"")).unwrap();
            assert_eq!(parse_input_text(input), StructuredValue::from(direct), "{input}");
        }
    }

    #[test]
    fn assignment_uses_last_equals_sign() {
        assert_eq!(parse_input_text("nums = [1, 2], target = 9"), int(9));
    }

    #[test]
    fn failed_assignment_returns_original_text() {
        let raw = "name = alice";
        assert_eq!(parse_input_text(raw), StructuredValue::text(raw));
    }

    #[test]
    fn bracketed_input_with_single_quotes() {
        assert_eq!(
            parse_input_text("['a', 'b']"),
            StructuredValue::List(vec!["a".into(), "b".into()])
        );
        assert_eq!(
            parse_input_text("{'k': 3}"),
            StructuredValue::Record(BTreeMap::from([("k".to_string(), int(3))]))
        );
    }

    #[test]
    fn malformed_brackets_fall_back_to_text() {
        assert_eq!(parse_input_text("[1, 2"), StructuredValue::text("[1, 2"));
    }

    #[test]
    fn space_separated_numbers_become_list() {
        for len in 2..8 {
            let text = (0..len).map(|i| (i * 3).to_string()).collect::<Vec<_>>().join(" ");
            match parse_input_text(&text) {
                StructuredValue::List(items) => {
                    assert_eq!(items.len(), len);
                    assert!(items.iter().all(|v| matches!(v, StructuredValue::Number(_))));
                }
                other => panic!("expected list, got {other:?}"),
            }
        }
    }

    #[test]
    fn space_separated_mixed_tokens() {
        assert_eq!(
            parse_input_text("3 abc 4.5"),
            StructuredValue::List(vec![int(3), "abc".into(), float(4.5)])
        );
        // known limitation
        assert_eq!(
            parse_input_text("hello world"),
            StructuredValue::List(vec!["hello".into(), "world".into()])
        );
    }

    #[test]
    fn single_token_after_trim_is_scalar() {
        assert_eq!(parse_input_text(" 7 "), int(7));
    }

    #[test]
    fn non_finite_literals_stay_text() {
        assert_eq!(parse_input_text("inf"), StructuredValue::text("inf"));
        assert_eq!(parse_input_text("NaN"), StructuredValue::text("NaN"));
        assert_eq!(parse_output_text("infinity"), StructuredValue::text("infinity"));
    }

    #[test]
    fn non_string_values_pass_through() {
        assert_eq!(parse_input(&json!(5)), int(5));
        assert_eq!(
            parse_input(&json!([1, "a"])),
            StructuredValue::List(vec![int(1), "a".into()])
        );
        assert_eq!(parse_output(&json!(null)), StructuredValue::Null);
    }

    #[test]
    fn output_skips_assignment_and_splitting() {
        assert_eq!(parse_output_text("x = 5"), StructuredValue::text("x = 5"));
        assert_eq!(parse_output_text("1 2"), StructuredValue::text("1 2"));
        assert_eq!(parse_output_text("[1,2]"), StructuredValue::List(vec![int(1), int(2)]));
        assert_eq!(parse_output_text("10"), int(10));
        assert_eq!(parse_output_text("yes"), StructuredValue::text("yes"));
    }

    #[test]
    fn reserialized_values_parse_back_equal() {
        let values = [
            int(5),
            float(-0.25),
            StructuredValue::List(vec![int(1), float(2.5), "x".into()]),
            StructuredValue::Record(BTreeMap::from([
                ("a".to_string(), int(1)),
                ("b".to_string(), StructuredValue::List(vec![int(2)])),
            ])),
        ];
        for value in values {
            assert_eq!(parse_output_text(&value.to_string()), value);
        }
    }
}
