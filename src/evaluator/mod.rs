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

//! Expression evaluator contract
//!
//! The template engine never interprets expression text itself. It hands
//! each placeholder expression, the input document and the current variable
//! scope to an [`ExpressionEvaluator`] and consumes the ordered result.
//! [`PathEvaluator`] is the bundled implementation.

mod error;
pub mod path;
mod services;

pub use error::ExpressionError;
pub use path::PathEvaluator;
pub use services::{EvaluatorServices, FunctionLibrary, IdentityService, TerminologyService};

use serde_json::Value;

use crate::context::VariableScope;
use crate::value::ResultValue;

/// Everything an evaluator may consult besides the input document
#[derive(Clone, Copy)]
pub struct EvaluationEnvironment<'a> {
    /// Variables visible to the expression
    pub variables: &'a VariableScope,
    /// Function libraries and external services
    pub services: &'a EvaluatorServices,
    /// Whether the input follows the FHIR resource format
    pub resource_input: bool,
}

/// Evaluates expression text against an input document.
///
/// Implementations must be free of side effects: the same expression, input
/// and environment always produce the same result. Cardinality matters, so
/// the returned items keep their order and count.
pub trait ExpressionEvaluator: Send + Sync {
    /// Evaluate `expression` and return its ordered result collection
    fn evaluate(
        &self,
        expression: &str,
        input: &Value,
        env: &EvaluationEnvironment<'_>,
    ) -> Result<Vec<ResultValue>, ExpressionError>;
}
