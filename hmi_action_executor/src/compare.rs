//! Condition operators
//!
//! Operands compare numerically when both have a numeric reading (booleans
//! count as `1`/`0`, text must parse after trimming and be non-empty).
//! Otherwise their display forms compare as strings, with an absent value
//! rendered as `"undefined"`. `contains` always tests substrings.

use hmi_common::value::TagValue;
use std::cmp::Ordering;
use std::str::FromStr;

/// Text used for an absent operand.
pub const UNDEFINED: &str = "undefined";

/// Comparison operator of a `CONDITION` node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `>`
    Greater,
    /// `>=`
    GreaterOrEqual,
    /// `<`
    Less,
    /// `<=`
    LessOrEqual,
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// `contains`
    Contains,
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ">" => Ok(Self::Greater),
            ">=" => Ok(Self::GreaterOrEqual),
            "<" => Ok(Self::Less),
            "<=" => Ok(Self::LessOrEqual),
            "==" => Ok(Self::Equal),
            "!=" => Ok(Self::NotEqual),
            "contains" => Ok(Self::Contains),
            other => Err(other.to_string()),
        }
    }
}

fn text(value: Option<&TagValue>) -> String {
    value.map_or_else(|| UNDEFINED.to_string(), ToString::to_string)
}

/// Evaluate `left <op> right`.
pub fn compare(left: Option<&TagValue>, op: Operator, right: Option<&TagValue>) -> bool {
    if op == Operator::Contains {
        return text(left).contains(&text(right));
    }

    let numeric = match (left.and_then(TagValue::as_number), right.and_then(TagValue::as_number)) {
        (Some(a), Some(b)) => Some((a, b)),
        _ => None,
    };

    match numeric {
        // NaN never orders, so every operator but `!=` is false.
        Some((a, b)) => match op {
            Operator::Greater => a > b,
            Operator::GreaterOrEqual => a >= b,
            Operator::Less => a < b,
            Operator::LessOrEqual => a <= b,
            Operator::Equal => a == b,
            Operator::NotEqual => a != b,
            Operator::Contains => unreachable!(),
        },
        None => {
            let ordering = text(left).cmp(&text(right));
            match op {
                Operator::Greater => ordering == Ordering::Greater,
                Operator::GreaterOrEqual => ordering != Ordering::Less,
                Operator::Less => ordering == Ordering::Less,
                Operator::LessOrEqual => ordering != Ordering::Greater,
                Operator::Equal => ordering == Ordering::Equal,
                Operator::NotEqual => ordering != Ordering::Equal,
                Operator::Contains => unreachable!(),
            }
        }
    }
}

/// Evaluate with an operator given as text. Unknown operators are false.
pub fn evaluate(left: Option<&TagValue>, operator: &str, right: Option<&TagValue>) -> bool {
    operator
        .parse::<Operator>()
        .is_ok_and(|op| compare(left, op, right))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: impl Into<TagValue>) -> Option<TagValue> {
        Some(x.into())
    }

    #[test]
    fn test_numeric_comparison() {
        assert!(evaluate(v(10).as_ref(), ">", v("9").as_ref()));
        assert!(evaluate(v(2.5).as_ref(), "<=", v(2.5).as_ref()));
        assert!(evaluate(v(true).as_ref(), "==", v(1).as_ref()));
        assert!(evaluate(v(" 7 ").as_ref(), "==", v(7.0).as_ref()));
        // Numerically 10 > 9, lexically "10" < "9"
        assert!(!evaluate(v("10").as_ref(), "<", v("9").as_ref()));
    }

    #[test]
    fn test_string_comparison() {
        assert!(evaluate(v("abc").as_ref(), "<", v("abd").as_ref()));
        assert!(evaluate(v("run").as_ref(), "==", v("run").as_ref()));
        assert!(evaluate(v("").as_ref(), "!=", v(0).as_ref()));
        assert!(evaluate(v(false).as_ref(), "==", v("false").as_ref()));
    }

    #[test]
    fn test_nan_text_compares_as_string() {
        assert!(evaluate(v("NaN").as_ref(), "==", v("NaN").as_ref()));
        assert!(!evaluate(v("NaN").as_ref(), "!=", v("NaN").as_ref()));
        assert!(evaluate(v("NaN").as_ref(), ">", v(5).as_ref()));
    }

    #[test]
    fn test_absent_value_is_undefined() {
        assert!(evaluate(None, "==", v("undefined").as_ref()));
        assert!(!evaluate(None, "==", v(0).as_ref()));
        assert!(evaluate(None, "!=", v(0).as_ref()));
        assert!(evaluate(None, "contains", v("def").as_ref()));
        assert!(evaluate(v(1).as_ref(), "!=", None));
    }

    #[test]
    fn test_contains_is_substring() {
        assert!(evaluate(v("ALARM: overheat").as_ref(), "contains", v("overheat").as_ref()));
        assert!(evaluate(v(1234).as_ref(), "contains", v(23).as_ref()));
        assert!(!evaluate(v("abc").as_ref(), "contains", v("x").as_ref()));
    }

    #[test]
    fn test_unknown_operator_is_false() {
        assert!(!evaluate(v(1).as_ref(), "<>", v(2).as_ref()));
        assert!(!evaluate(v(1).as_ref(), "===", v(1).as_ref()));
        assert!("=~".parse::<Operator>().is_err());
    }
}
