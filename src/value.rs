// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Typed values produced by expression evaluation
//!
//! The template engine only needs this closed set of kinds: it converts them
//! back to JSON for full-value placeholders and renders the scalar kinds to
//! text for inline placeholders.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, SecondsFormat};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde_json::{Map, Number, Value};
use std::fmt;
use std::str::FromStr;

// Full-precision FHIR lexical forms; partial dates stay strings
static DATE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date pattern"));

static DATETIME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:\d{2})$")
        .expect("valid dateTime pattern")
});

static TIME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{2}:\d{2}:\d{2}(\.\d+)?$").expect("valid time pattern"));

/// FHIR Quantity
#[derive(Debug, Clone, PartialEq)]
pub struct Quantity {
    /// Numeric value
    pub value: Decimal,
    /// `<`, `<=`, `>=` or `>`
    pub comparator: Option<String>,
    /// Human readable unit
    pub unit: Option<String>,
    /// Unit system URI
    pub system: Option<String>,
    /// Coded unit
    pub code: Option<String>,
}

impl Quantity {
    const FIELDS: [&'static str; 5] = ["value", "comparator", "unit", "system", "code"];

    /// Create a quantity with an optional unit
    pub fn new(value: Decimal, unit: Option<String>) -> Self {
        Self {
            value,
            comparator: None,
            unit,
            system: None,
            code: None,
        }
    }

    /// Recognise a FHIR Quantity object.
    ///
    /// Only objects made exclusively of Quantity fields qualify, and only
    /// when the value fits a decimal exactly, so the conversion back to JSON
    /// never loses data.
    pub fn from_object(obj: &Map<String, Value>) -> Option<Self> {
        if !obj.keys().all(|k| Self::FIELDS.contains(&k.as_str())) {
            return None;
        }
        if !(obj.contains_key("unit") || obj.contains_key("code")) {
            return None;
        }
        let value = match obj.get("value")? {
            Value::Number(n) => exact_decimal(n)?,
            _ => return None,
        };
        let text = |key: &str| obj.get(key).and_then(Value::as_str).map(str::to_string);

        Some(Self {
            value,
            comparator: text("comparator"),
            unit: text("unit"),
            system: text("system"),
            code: text("code"),
        })
    }

    /// Convert to a FHIR Quantity object
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("value".to_string(), decimal_to_json(&self.value));
        let optional = [
            ("comparator", &self.comparator),
            ("unit", &self.unit),
            ("system", &self.system),
            ("code", &self.code),
        ];
        for (key, field) in optional {
            if let Some(text) = field {
                obj.insert(key.to_string(), Value::String(text.clone()));
            }
        }
        Value::Object(obj)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unit.as_ref().or(self.code.as_ref()) {
            Some(unit) => write!(f, "{} '{}'", self.value, unit),
            None => write!(f, "{}", self.value),
        }
    }
}

/// A single item of an evaluation result
///
/// Temporal kinds keep the text they were read from; that text is what
/// ends up in the output.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultValue {
    /// Structured value (object, or anything without a scalar kind)
    Complex(Value),
    /// Quantity
    Quantity(Quantity),
    /// String
    String(String),
    /// 64-bit integer
    Integer(i64),
    /// Arbitrary precision decimal
    Decimal(Decimal),
    /// JSON number outside the integer and decimal ranges, kept as read
    Number(Number),
    /// Calendar date
    Date {
        /// Parsed date
        value: NaiveDate,
        /// Lexical form
        text: String,
    },
    /// Date and time with offset
    DateTime {
        /// Parsed date and time
        value: DateTime<FixedOffset>,
        /// Lexical form
        text: String,
    },
    /// Time of day
    Time {
        /// Parsed time
        value: NaiveTime,
        /// Lexical form
        text: String,
    },
    /// Boolean
    Boolean(bool),
}

impl ResultValue {
    /// Date value with its canonical `YYYY-MM-DD` text
    pub fn date(value: NaiveDate) -> Self {
        Self::Date {
            text: value.format("%Y-%m-%d").to_string(),
            value,
        }
    }

    /// DateTime value with RFC 3339 text
    pub fn datetime(value: DateTime<FixedOffset>) -> Self {
        Self::DateTime {
            text: value.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            value,
        }
    }

    /// Time value with `HH:MM:SS[.fff]` text
    pub fn time(value: NaiveTime) -> Self {
        Self::Time {
            text: value.format("%H:%M:%S%.f").to_string(),
            value,
        }
    }

    /// Type the JSON value found in an input document or variable.
    ///
    /// Date, time and Quantity detection only applies to FHIR resource
    /// input. Arrays are not flattened here; callers iterate them.
    pub fn from_json(value: Value, resource_input: bool) -> Self {
        match value {
            Value::Bool(b) => Self::Boolean(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Integer(i)
                } else if let Some(d) = exact_decimal(&n) {
                    Self::Decimal(d)
                } else {
                    Self::Number(n)
                }
            }
            Value::String(s) if resource_input => match parse_temporal(&s) {
                Some(temporal) => temporal,
                None => Self::String(s),
            },
            Value::String(s) => Self::String(s),
            Value::Object(obj) if resource_input => match Quantity::from_object(&obj) {
                Some(quantity) => Self::Quantity(quantity),
                None => Self::Complex(Value::Object(obj)),
            },
            other => Self::Complex(other),
        }
    }

    /// Convert to the JSON inserted into the output document
    pub fn into_json(self) -> Value {
        match self {
            Self::Complex(value) => value,
            Self::Quantity(q) => q.to_json(),
            Self::String(s) => Value::String(s),
            Self::Integer(i) => Value::Number(i.into()),
            Self::Decimal(d) => decimal_to_json(&d),
            Self::Number(n) => Value::Number(n),
            Self::Boolean(b) => Value::Bool(b),
            Self::Date { text, .. } | Self::DateTime { text, .. } | Self::Time { text, .. } => {
                Value::String(text)
            }
        }
    }

    /// Textual form used inside strings, `None` for structured kinds.
    ///
    /// Temporal values use the same text they get as JSON string values.
    pub fn render_text(&self) -> Option<String> {
        match self {
            Self::Complex(_) | Self::Quantity(_) => None,
            Self::String(s) => Some(s.clone()),
            Self::Integer(i) => Some(i.to_string()),
            Self::Decimal(d) => Some(d.to_string()),
            Self::Number(n) => Some(n.to_string()),
            Self::Boolean(b) => Some(b.to_string()),
            Self::Date { text, .. } | Self::DateTime { text, .. } | Self::Time { text, .. } => {
                Some(text.clone())
            }
        }
    }

    /// Whether this value is a structured kind
    pub fn is_complex(&self) -> bool {
        matches!(self, Self::Complex(_) | Self::Quantity(_))
    }

    /// Get the type name for this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Complex(_) => "Complex",
            Self::Quantity(_) => "Quantity",
            Self::String(_) => "String",
            Self::Integer(_) => "Integer",
            Self::Decimal(_) | Self::Number(_) => "Decimal",
            Self::Boolean(_) => "Boolean",
            Self::Date { .. } => "Date",
            Self::DateTime { .. } => "DateTime",
            Self::Time { .. } => "Time",
        }
    }
}

impl From<&str> for ResultValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<i64> for ResultValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for ResultValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<Decimal> for ResultValue {
    fn from(value: Decimal) -> Self {
        Self::Decimal(value)
    }
}

impl fmt::Display for ResultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Complex(value) => write!(f, "{value}"),
            Self::Quantity(q) => write!(f, "{q}"),
            other => write!(f, "{}", other.render_text().unwrap_or_default()),
        }
    }
}

/// Decimal holding exactly the number's text, if there is one
fn exact_decimal(n: &Number) -> Option<Decimal> {
    let text = n.to_string();
    Decimal::from_str(&text)
        .ok()
        .filter(|d| d.to_string() == text)
}

fn decimal_to_json(d: &Decimal) -> Value {
    match d.to_string().parse::<Number>() {
        Ok(number) => Value::Number(number),
        Err(_) => Value::String(d.to_string()),
    }
}

fn parse_temporal(text: &str) -> Option<ResultValue> {
    let typed = if DATE_PATTERN.is_match(text) {
        ResultValue::Date {
            value: NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()?,
            text: text.to_string(),
        }
    } else if DATETIME_PATTERN.is_match(text) {
        ResultValue::DateTime {
            value: DateTime::parse_from_rfc3339(text).ok()?,
            text: text.to_string(),
        }
    } else if TIME_PATTERN.is_match(text) {
        ResultValue::Time {
            value: NaiveTime::parse_from_str(text, "%H:%M:%S%.f").ok()?,
            text: text.to_string(),
        }
    } else {
        return None;
    };
    Some(typed)
}
