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

//! Recursive template resolution

use serde_json::{Map, Value};
use std::sync::Arc;

use crate::coercion;
use crate::context::VariableScope;
use crate::error::{Result, TemplateError};
use crate::evaluator::{EvaluationEnvironment, EvaluatorServices, ExpressionEvaluator};
use crate::node::{TemplateNode, classify};
use crate::value::ResultValue;

/// Resolves one template against one input document
pub(crate) struct Resolver<'a> {
    pub(crate) evaluator: &'a dyn ExpressionEvaluator,
    pub(crate) services: &'a EvaluatorServices,
    pub(crate) resource_input: bool,
    pub(crate) input: &'a Value,
}

impl Resolver<'_> {
    /// Evaluate an expression in `scope`, wrapping evaluator failures
    pub(crate) fn evaluate_expression(
        &self,
        expression: &str,
        scope: &VariableScope,
    ) -> Result<Vec<ResultValue>> {
        let env = EvaluationEnvironment {
            variables: scope,
            services: self.services,
            resource_input: self.resource_input,
        };
        let results = self
            .evaluator
            .evaluate(expression, self.input, &env)
            .map_err(|source| TemplateError::evaluation_failure(expression, source))?;

        log::trace!("'{expression}' returned {} value(s)", results.len());
        Ok(results)
    }

    /// Resolve every placeholder and section below `template`.
    ///
    /// The result is not pruned; empty optional values show up as `null`.
    pub(crate) fn walk(&self, template: &Value, scope: &Arc<VariableScope>) -> Result<Value> {
        match classify(template) {
            TemplateNode::FullPlaceholder(placeholder) => {
                let results = self.evaluate_expression(placeholder.expression, scope)?;
                placeholder
                    .cardinality
                    .resolve(placeholder.expression, results)
            }
            TemplateNode::Inline { text, placeholders } => {
                coercion::render_inline(text, &placeholders, |expression| {
                    self.evaluate_expression(expression, scope)
                })
                .map(Value::String)
            }
            TemplateNode::Section(section) => self.resolve_section(section, scope),
            TemplateNode::Object(fields) => fields
                .iter()
                .map(|(name, value)| Ok((name.clone(), self.walk(value, scope)?)))
                .collect::<Result<Map<String, Value>>>()
                .map(Value::Object),
            TemplateNode::Array(items) => {
                let mut resolved = Vec::with_capacity(items.len());
                for item in items {
                    match self.walk(item, scope)? {
                        // Arrays produced by placeholders or sections are spliced in
                        Value::Array(nested) => resolved.extend(nested),
                        Value::Null => {}
                        other => resolved.push(other),
                    }
                }
                Ok(Value::Array(resolved))
            }
            TemplateNode::Literal(value) => Ok(value.clone()),
        }
    }
}
