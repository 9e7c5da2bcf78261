//! Equality and compliance rules for attribute values.
//!
//! Values are JSON values. Equality is structural with two configurable
//! leniencies: a string holding a numeric literal equals the number it
//! denotes, and a one-element array equals its only element. Compliance asks
//! whether a preview value satisfies the baseline value: sets by inclusion,
//! sequences by multiset inclusion, maps key by key.

use super::DeltaOptions;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// Attribute names whose values have set semantics.
pub const SET_ATTRIBUTES: &[&str] = &[
    "tags",
    "tag",
    "before",
    "after",
    "require",
    "notify",
    "subscribe",
];

/// Whether an attribute with this name is compared as a set.
#[must_use]
pub fn is_set_attribute(name: &str) -> bool {
    SET_ATTRIBUTES.contains(&name)
}

/// A numeric value recovered from JSON or from a numeric string literal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Numeric {
    Int(i128),
    Float(f64),
}

impl Numeric {
    fn from_json(n: &serde_json::Number) -> Option<Self> {
        if let Some(i) = n.as_i64() {
            Some(Self::Int(i128::from(i)))
        } else if let Some(u) = n.as_u64() {
            Some(Self::Int(i128::from(u)))
        } else {
            n.as_f64().map(Self::Float)
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
        }
    }

    fn same_value(self, other: Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            (a, b) => a.as_f64() == b.as_f64(),
        }
    }
}

fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^([+-]?)(?:0[xX]([0-9A-Fa-f]+)|0([0-7]+)|((?:0|[1-9][0-9]*)(?:\.[0-9]+)?(?:[eE][+-]?[0-9]+)?))$",
        )
        .expect("static numeric literal regex")
    })
}

/// Parse a numeric literal: decimal, `0x` hex, leading-zero octal, or float
/// with optional exponent. Anything else is not a number.
#[must_use]
pub fn parse_number(literal: &str) -> Option<Numeric> {
    let captures = number_pattern().captures(literal)?;
    let negative = &captures[1] == "-";

    let magnitude = if let Some(hex) = captures.get(2) {
        integer(hex.as_str(), 16)?
    } else if let Some(octal) = captures.get(3) {
        integer(octal.as_str(), 8)?
    } else {
        let decimal = captures.get(4)?.as_str();
        if decimal.contains(['.', 'e', 'E']) {
            Numeric::Float(decimal.parse().ok()?)
        } else {
            integer(decimal, 10)?
        }
    };

    Some(match (negative, magnitude) {
        (false, n) => n,
        (true, Numeric::Int(i)) => Numeric::Int(-i),
        (true, Numeric::Float(f)) => Numeric::Float(-f),
    })
}

/// Decides equality and compliance between baseline and preview values.
#[derive(Debug, Clone, Copy)]
pub struct ValueComparator {
    string_numeric_lenient: bool,
    array_value_lenient: bool,
}

impl ValueComparator {
    /// Comparator with both leniencies enabled.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            string_numeric_lenient: true,
            array_value_lenient: true,
        }
    }

    /// Comparator configured from delta options.
    #[must_use]
    pub const fn from_options(options: &DeltaOptions) -> Self {
        Self {
            string_numeric_lenient: !options.diff_string_numeric,
            array_value_lenient: !options.diff_array_value,
        }
    }

    /// Whether two values are equal.
    #[must_use]
    pub fn equal(&self, a: &Value, b: &Value) -> bool {
        if a == b {
            return true;
        }
        match (a, b) {
            (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
            (Value::String(s), Value::Number(n)) | (Value::Number(n), Value::String(s)) => {
                self.string_numeric_lenient && string_equals_number(s, n)
            }
            (Value::Array(x), Value::Array(y)) => {
                x.len() == y.len() && x.iter().zip(y).all(|(a, b)| self.equal(a, b))
            }
            (Value::Object(x), Value::Object(y)) => {
                x.len() == y.len()
                    && x
                        .iter()
                        .all(|(k, v)| y.get(k).is_some_and(|w| self.equal(v, w)))
            }
            (Value::Array(x), other) | (other, Value::Array(x)) => {
                self.array_value_lenient && x.len() == 1 && self.equal(&x[0], other)
            }
            _ => false,
        }
    }

    /// Whether `preview` satisfies `baseline`.
    #[must_use]
    pub fn compliant(&self, baseline: &Value, preview: &Value) -> bool {
        match (baseline, preview) {
            (Value::Array(b), Value::Array(p)) => self.sequence_compliant(b, p),
            (Value::Object(b), Value::Object(p)) => self.map_compliant(b, p),
            (Value::Array(b), other) if self.array_value_lenient && b.len() == 1 => {
                self.compliant(&b[0], other)
            }
            (other, Value::Array(p)) if self.array_value_lenient && p.len() == 1 => {
                self.compliant(other, &p[0])
            }
            _ => self.equal(baseline, preview),
        }
    }

    /// Whether two values are equal when both are treated as sets.
    #[must_use]
    pub fn set_equal(&self, a: &Value, b: &Value) -> bool {
        let a = self.as_set(a);
        let b = self.as_set(b);
        self.is_subset(&a, &b) && self.is_subset(&b, &a)
    }

    /// Whether the baseline set is contained in the preview set.
    #[must_use]
    pub fn set_compliant(&self, baseline: &Value, preview: &Value) -> bool {
        self.is_subset(&self.as_set(baseline), &self.as_set(preview))
    }

    /// Equality honoring the set semantics of reserved attribute names.
    #[must_use]
    pub fn attribute_equal(&self, name: &str, baseline: &Value, preview: &Value) -> bool {
        if is_set_attribute(name) {
            self.set_equal(baseline, preview)
        } else {
            self.equal(baseline, preview)
        }
    }

    /// Compliance honoring the set semantics of reserved attribute names.
    #[must_use]
    pub fn attribute_compliant(&self, name: &str, baseline: &Value, preview: &Value) -> bool {
        if is_set_attribute(name) {
            self.set_compliant(baseline, preview)
        } else {
            self.compliant(baseline, preview)
        }
    }

    // Each baseline element consumes one distinct preview element, so
    // duplicates in the baseline need duplicates in the preview.
    fn sequence_compliant(&self, baseline: &[Value], preview: &[Value]) -> bool {
        if baseline.len() > preview.len() {
            return false;
        }
        let mut remaining: Vec<&Value> = preview.iter().collect();
        baseline.iter().all(|wanted| {
            remaining
                .iter()
                .position(|candidate| self.equal(wanted, candidate))
                .map(|idx| remaining.swap_remove(idx))
                .is_some()
        })
    }

    fn map_compliant(&self, baseline: &Map<String, Value>, preview: &Map<String, Value>) -> bool {
        baseline
            .iter()
            .all(|(key, value)| preview.get(key).is_some_and(|p| self.compliant(value, p)))
    }

    fn as_set<'v>(&self, value: &'v Value) -> Vec<&'v Value> {
        let items: Vec<&Value> = match value {
            Value::Array(items) => items.iter().collect(),
            Value::Null => Vec::new(),
            scalar => vec![scalar],
        };
        let mut distinct: Vec<&Value> = Vec::with_capacity(items.len());
        for item in items {
            if !distinct.iter().any(|seen| self.equal(seen, item)) {
                distinct.push(item);
            }
        }
        distinct
    }

    fn is_subset(&self, smaller: &[&Value], larger: &[&Value]) -> bool {
        smaller
            .iter()
            .all(|item| larger.iter().any(|candidate| self.equal(item, candidate)))
    }
}

impl Default for ValueComparator {
    fn default() -> Self {
        Self::new()
    }
}

/// Integer digits in `radix`; literals wider than `i128` keep their
/// magnitude as a float.
fn integer(digits: &str, radix: u32) -> Option<Numeric> {
    if let Ok(i) = i128::from_str_radix(digits, radix) {
        return Some(Numeric::Int(i));
    }
    if radix == 10 {
        return digits.parse().ok().map(Numeric::Float);
    }
    digits
        .chars()
        .try_fold(0.0_f64, |acc, c| {
            c.to_digit(radix)
                .map(|d| acc.mul_add(f64::from(radix), f64::from(d)))
        })
        .map(Numeric::Float)
}

fn numbers_equal(a: &serde_json::Number, b: &serde_json::Number) -> bool {
    match (Numeric::from_json(a), Numeric::from_json(b)) {
        (Some(x), Some(y)) => x.same_value(y),
        _ => false,
    }
}

fn string_equals_number(s: &str, n: &serde_json::Number) -> bool {
    match (parse_number(s), Numeric::from_json(n)) {
        (Some(x), Some(y)) => x.same_value(y),
        _ => false,
    }
}
