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

//! Section (loop) evaluation
//!
//! ```json
//! {
//!   "{{#member}}": "{{Group.member}}",
//!   "{{*}}": { "reference": "{{%member.entity.reference}}" }
//! }
//! ```
//!
//! `{{*}}` and `{{+}}` bind the loop variable to each element in turn and
//! collect one output per element. `{{?}}` evaluates the sub-template once,
//! with the variable bound to the single element, or to an array of all
//! elements when there are several.

use serde_json::Value;
use std::sync::Arc;

use crate::cardinality::Cardinality;
use crate::context::VariableScope;
use crate::error::{Result, TemplateError};
use crate::grammar;
use crate::node::SectionNode;
use crate::value::ResultValue;
use crate::walker::Resolver;

/// A section whose field names and statement passed validation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Section<'a> {
    /// Section field name, `{{#variable}}`
    pub field: &'a str,
    /// Loop variable bound for the sub-template
    pub variable: &'a str,
    /// List-producing expression
    pub expression: &'a str,
    /// How the sub-template is repeated and shaped
    pub mode: Cardinality,
    /// Sub-template
    pub template: &'a Value,
}

impl<'a> Section<'a> {
    /// Validate the raw fields of a section object
    pub fn parse(node: SectionNode<'a>) -> Result<Self> {
        let variable = grammar::parse_section_field(node.section_field).ok_or_else(|| {
            TemplateError::InvalidSectionFieldFormat {
                field: node.section_field.to_string(),
            }
        })?;

        let expression = node
            .statement
            .as_str()
            .and_then(grammar::parse_full_placeholder)
            .map(|placeholder| placeholder.expression)
            .ok_or_else(|| TemplateError::InvalidSectionStatementFormat {
                section: node.section_field.to_string(),
                statement: match node.statement {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                },
            })?;

        let mode = grammar::parse_section_value_field(node.value_field).ok_or_else(|| {
            TemplateError::InvalidSectionValueFormat {
                section: node.section_field.to_string(),
                field: node.value_field.to_string(),
            }
        })?;

        Ok(Self {
            field: node.section_field,
            variable,
            expression,
            mode,
            template: node.template,
        })
    }

    /// Loop variable values, one entry per sub-template evaluation
    fn bindings(&self, results: Vec<ResultValue>) -> Vec<Value> {
        match self.mode {
            Cardinality::Optional => match results.len() {
                0 => Vec::new(),
                1 => results.into_iter().map(ResultValue::into_json).collect(),
                _ => vec![Value::Array(
                    results.into_iter().map(ResultValue::into_json).collect(),
                )],
            },
            _ => results.into_iter().map(ResultValue::into_json).collect(),
        }
    }

    /// Shape the collected outputs
    fn shape(&self, mut outputs: Vec<Value>) -> Result<Value> {
        match self.mode {
            Cardinality::OneOrMore if outputs.is_empty() => {
                Err(TemplateError::SectionCardinalityViolation {
                    section: self.field.to_string(),
                    statement: self.expression.to_string(),
                })
            }
            Cardinality::ZeroOrMore if outputs.is_empty() => Ok(Value::Null),
            Cardinality::ZeroOrMore | Cardinality::OneOrMore => Ok(Value::Array(outputs)),
            _ => Ok(outputs.pop().unwrap_or(Value::Null)),
        }
    }
}

impl Resolver<'_> {
    /// Resolve a section object to null, one value or an array
    pub(crate) fn resolve_section(
        &self,
        node: SectionNode<'_>,
        scope: &Arc<VariableScope>,
    ) -> Result<Value> {
        let section = Section::parse(node)?;
        let results = self.evaluate_expression(section.expression, scope)?;

        let bindings = section.bindings(results);
        log::trace!(
            "section '{}' over '{}': {} iteration(s)",
            section.variable,
            section.expression,
            bindings.len()
        );

        let outputs = bindings
            .into_iter()
            .map(|binding| {
                let iteration = VariableScope::with_variable(scope, section.variable, binding);
                self.walk(section.template, &iteration)
            })
            .collect::<Result<Vec<_>>>()?;

        section.shape(outputs)
    }
}
