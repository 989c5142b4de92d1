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

//! Pluggable capabilities handed to the expression evaluator
//!
//! The template engine treats these as opaque: it stores them at build time
//! and passes them along with every evaluation.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use super::ExpressionError;
use crate::value::ResultValue;

/// Additional functions callable from expressions
pub trait FunctionLibrary: Send + Sync {
    /// Library name, used in diagnostics
    fn name(&self) -> &str;

    /// Call `function` on `focus` with already evaluated arguments.
    ///
    /// Returns `None` when this library does not provide `function`.
    fn call(
        &self,
        function: &str,
        focus: &[ResultValue],
        args: &[Vec<ResultValue>],
        services: &EvaluatorServices,
    ) -> Option<Result<Vec<ResultValue>, ExpressionError>>;
}

/// Terminology lookups
pub trait TerminologyService: Send + Sync {
    /// Display text of `code` in `system`, if known
    fn lookup_display(&self, system: &str, code: &str) -> Result<Option<String>, ExpressionError>;

    /// Translate a code using a concept map, returning Coding objects
    fn translate(
        &self,
        concept_map: &str,
        system: &str,
        code: &str,
    ) -> Result<Vec<Value>, ExpressionError>;
}

/// Identity resolution for business identifiers
pub trait IdentityService: Send + Sync {
    /// Resolve an identifier to the id of the matching resource
    fn resolve_identifier(
        &self,
        resource_type: &str,
        system: Option<&str>,
        value: &str,
    ) -> Result<Option<String>, ExpressionError>;
}

/// Function libraries and services configured on the engine
#[derive(Clone, Default)]
pub struct EvaluatorServices {
    /// Libraries consulted in order for non built-in functions
    pub function_libraries: Vec<Arc<dyn FunctionLibrary>>,
    /// Optional terminology service
    pub terminology: Option<Arc<dyn TerminologyService>>,
    /// Optional identity service
    pub identity: Option<Arc<dyn IdentityService>>,
}

impl EvaluatorServices {
    /// Dispatch a function call to the first library providing it
    pub fn call_function(
        &self,
        function: &str,
        focus: &[ResultValue],
        args: &[Vec<ResultValue>],
    ) -> Option<Result<Vec<ResultValue>, ExpressionError>> {
        self.function_libraries
            .iter()
            .find_map(|library| library.call(function, focus, args, self))
    }
}

impl fmt::Debug for EvaluatorServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let libraries: Vec<&str> = self.function_libraries.iter().map(|l| l.name()).collect();
        f.debug_struct("EvaluatorServices")
            .field("function_libraries", &libraries)
            .field("terminology", &self.terminology.is_some())
            .field("identity", &self.identity.is_some())
            .finish()
    }
}
