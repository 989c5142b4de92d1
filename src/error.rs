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

//! Error types for template evaluation
//!
//! Every failure aborts the whole evaluation. Each variant carries the
//! placeholder expression or section text that caused it.

use thiserror::Error;

use crate::cardinality::Cardinality;
use crate::evaluator::ExpressionError;

/// Result type alias for template operations
pub type Result<T> = std::result::Result<T, TemplateError>;

/// Errors raised while resolving a template
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TemplateError {
    /// A required placeholder resolved to an empty collection
    #[error("Mandatory value missing for expression '{expression}' (expected {cardinality})")]
    MissingMandatoryValue {
        /// Placeholder expression
        expression: String,
        /// Cardinality contract of the placeholder
        cardinality: Cardinality,
    },

    /// A non-array placeholder resolved to more than one value
    #[error("Expression '{expression}' returned {count} values where at most one is allowed")]
    CardinalityMismatch {
        /// Placeholder expression
        expression: String,
        /// Number of values returned
        count: usize,
    },

    /// An inline placeholder resolved to a structured value
    #[error("Expression '{expression}' returned a {value_type} value inside a string")]
    ComplexValueInStringContext {
        /// Placeholder expression
        expression: String,
        /// Type name of the offending value
        value_type: String,
    },

    /// An inline placeholder did not resolve to exactly one value
    #[error("Expression '{expression}' returned {count} values inside a string, exactly one is required")]
    MultipleOrEmptyResultInStringContext {
        /// Placeholder expression
        expression: String,
        /// Number of values returned
        count: usize,
    },

    /// Section field name is not of the form `{{#name}}`
    #[error("Invalid section field '{field}', expected '{{{{#name}}}}'")]
    InvalidSectionFieldFormat {
        /// The offending field name
        field: String,
    },

    /// Section statement is not a full placeholder
    #[error("Invalid statement '{statement}' for section '{section}', expected a placeholder")]
    InvalidSectionStatementFormat {
        /// Section field name
        section: String,
        /// The offending statement
        statement: String,
    },

    /// Section value field is not one of `{{*}}`, `{{+}}`, `{{?}}`
    #[error("Invalid value field '{field}' for section '{section}'")]
    InvalidSectionValueFormat {
        /// Section field name
        section: String,
        /// The offending value field name
        field: String,
    },

    /// A `{{+}}` section produced no output
    #[error("Section '{section}' with statement '{statement}' requires at least one element")]
    SectionCardinalityViolation {
        /// Section field name
        section: String,
        /// Section statement
        statement: String,
    },

    /// The expression evaluator failed
    #[error("Failed to evaluate expression '{expression}': {source}")]
    ExpressionEvaluationFailure {
        /// Expression or section statement being evaluated
        expression: String,
        /// Underlying evaluator error
        #[source]
        source: ExpressionError,
    },
}

impl TemplateError {
    /// Wrap an evaluator failure with the expression that caused it
    pub fn evaluation_failure(expression: impl Into<String>, source: ExpressionError) -> Self {
        Self::ExpressionEvaluationFailure {
            expression: expression.into(),
            source,
        }
    }

    /// The expression or section text this error refers to
    pub fn expression(&self) -> &str {
        match self {
            Self::MissingMandatoryValue { expression, .. }
            | Self::CardinalityMismatch { expression, .. }
            | Self::ComplexValueInStringContext { expression, .. }
            | Self::MultipleOrEmptyResultInStringContext { expression, .. }
            | Self::ExpressionEvaluationFailure { expression, .. } => expression,
            Self::InvalidSectionFieldFormat { field } => field,
            Self::InvalidSectionStatementFormat { statement, .. } => statement,
            Self::InvalidSectionValueFormat { section, .. }
            | Self::SectionCardinalityViolation { section, .. } => section,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_missing_value_message_mentions_contract() {
        let single = TemplateError::MissingMandatoryValue {
            expression: "Patient.id".to_string(),
            cardinality: Cardinality::Required,
        };
        let many = TemplateError::MissingMandatoryValue {
            expression: "Patient.name".to_string(),
            cardinality: Cardinality::OneOrMore,
        };

        assert!(single.to_string().contains("1..1"));
        assert!(many.to_string().contains("1..*"));
    }

    #[test]
    fn test_section_field_message_escapes_braces() {
        let err = TemplateError::InvalidSectionFieldFormat {
            field: "{{#bad name}}".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid section field '{{#bad name}}', expected '{{#name}}'"
        );
    }

    #[test]
    fn test_evaluation_failure_keeps_source() {
        let err = TemplateError::evaluation_failure(
            "%missing",
            ExpressionError::UnknownVariable {
                name: "missing".to_string(),
            },
        );

        assert_eq!(err.expression(), "%missing");
        let source = err.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("Variable %missing not found"));
    }
}
