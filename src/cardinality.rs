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

//! Cardinality markers and result shaping for full-value placeholders

use serde_json::Value;
use std::fmt;

use crate::error::{Result, TemplateError};
use crate::value::ResultValue;

/// Cardinality contract expressed by a placeholder marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    /// No marker: exactly one value
    Required,
    /// `?`: zero or one value
    Optional,
    /// `*`: zero or more values, always an array
    ZeroOrMore,
    /// `+`: one or more values, always an array
    OneOrMore,
}

impl Cardinality {
    /// Parse a marker character
    pub fn from_marker(marker: char) -> Option<Self> {
        match marker {
            '?' => Some(Self::Optional),
            '*' => Some(Self::ZeroOrMore),
            '+' => Some(Self::OneOrMore),
            _ => None,
        }
    }

    /// Marker character, `None` for [`Cardinality::Required`]
    pub fn marker(&self) -> Option<char> {
        match self {
            Self::Required => None,
            Self::Optional => Some('?'),
            Self::ZeroOrMore => Some('*'),
            Self::OneOrMore => Some('+'),
        }
    }

    /// Whether the resolved value is always packaged as an array
    pub fn is_array(&self) -> bool {
        matches!(self, Self::ZeroOrMore | Self::OneOrMore)
    }

    /// Whether at least one value is required
    pub fn is_mandatory(&self) -> bool {
        matches!(self, Self::Required | Self::OneOrMore)
    }

    /// Shape an evaluation result according to this contract.
    ///
    /// An empty optional result becomes `null` so the pruner can drop the
    /// field later. Values are converted to JSON as-is, never coerced.
    pub fn resolve(&self, expression: &str, results: Vec<ResultValue>) -> Result<Value> {
        if results.is_empty() {
            return if self.is_mandatory() {
                Err(TemplateError::MissingMandatoryValue {
                    expression: expression.to_string(),
                    cardinality: *self,
                })
            } else {
                Ok(Value::Null)
            };
        }

        if self.is_array() {
            return Ok(Value::Array(
                results.into_iter().map(ResultValue::into_json).collect(),
            ));
        }

        let count = results.len();
        let mut iter = results.into_iter();
        match (iter.next(), count) {
            (Some(single), 1) => Ok(single.into_json()),
            _ => Err(TemplateError::CardinalityMismatch {
                expression: expression.to_string(),
                count,
            }),
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => write!(f, "1..1"),
            Self::Optional => write!(f, "0..1"),
            Self::ZeroOrMore => write!(f, "0..*"),
            Self::OneOrMore => write!(f, "1..*"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn strings(values: &[&str]) -> Vec<ResultValue> {
        values
            .iter()
            .map(|v| ResultValue::String(v.to_string()))
            .collect()
    }

    #[test]
    fn test_required_single_value() {
        let value = Cardinality::Required
            .resolve("Patient.id", strings(&["p1"]))
            .unwrap();
        assert_eq!(value, json!("p1"));
    }

    #[test]
    fn test_required_errors() {
        let missing = Cardinality::Required.resolve("Patient.id", vec![]);
        assert!(matches!(
            missing,
            Err(TemplateError::MissingMandatoryValue {
                cardinality: Cardinality::Required,
                ..
            })
        ));

        let many = Cardinality::Required.resolve("Patient.name", strings(&["a", "b"]));
        assert_eq!(
            many,
            Err(TemplateError::CardinalityMismatch {
                expression: "Patient.name".to_string(),
                count: 2
            })
        );
    }

    #[test]
    fn test_optional() {
        assert_eq!(
            Cardinality::Optional.resolve("x", vec![]).unwrap(),
            Value::Null
        );
        assert_eq!(
            Cardinality::Optional.resolve("x", strings(&["a"])).unwrap(),
            json!("a")
        );
        assert!(matches!(
            Cardinality::Optional.resolve("x", strings(&["a", "b"])),
            Err(TemplateError::CardinalityMismatch { count: 2, .. })
        ));
    }

    #[test]
    fn test_zero_or_more_always_wraps() {
        assert_eq!(
            Cardinality::ZeroOrMore.resolve("x", vec![]).unwrap(),
            Value::Null
        );
        assert_eq!(
            Cardinality::ZeroOrMore
                .resolve("x", vec![ResultValue::Complex(json!({"code": "a"}))])
                .unwrap(),
            json!([{"code": "a"}])
        );
    }

    #[test]
    fn test_one_or_more() {
        assert!(matches!(
            Cardinality::OneOrMore.resolve("x", vec![]),
            Err(TemplateError::MissingMandatoryValue {
                cardinality: Cardinality::OneOrMore,
                ..
            })
        ));
        assert_eq!(
            Cardinality::OneOrMore
                .resolve("x", vec![ResultValue::Integer(1), ResultValue::Integer(2)])
                .unwrap(),
            json!([1, 2])
        );
    }

    #[test]
    fn test_marker_round_trip() {
        for marker in ['?', '*', '+'] {
            let cardinality = Cardinality::from_marker(marker).unwrap();
            assert_eq!(cardinality.marker(), Some(marker));
        }
        assert_eq!(Cardinality::from_marker('#'), None);
        assert_eq!(Cardinality::Required.marker(), None);
    }
}
