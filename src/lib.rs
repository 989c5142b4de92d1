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

//! FHIR template engine
//!
//! Fills JSON templates with values computed by FHIRPath-style expressions.
//! Placeholders are written as `{{expr}}`, optionally with a cardinality
//! marker (`{{? expr}}`, `{{* expr}}`, `{{+ expr}}`), and two-field section
//! objects repeat a sub-template over a list. Empty results are pruned from
//! the output.

pub mod cardinality;
pub mod coercion;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod grammar;
pub mod node;
pub mod prune;
pub mod section;
pub mod value;
mod walker;

// Re-export main types
pub use cardinality::Cardinality;
pub use config::TemplateEngineConfig;
pub use context::VariableScope;
pub use engine::{FhirTemplateEngine, FhirTemplateEngineBuilder};
pub use error::{Result, TemplateError};
pub use evaluator::{
    EvaluationEnvironment, EvaluatorServices, ExpressionError, ExpressionEvaluator,
    FunctionLibrary, IdentityService, PathEvaluator, TerminologyService,
};
pub use node::{TemplateNode, classify};
pub use prune::prune_empty;
pub use value::{Quantity, ResultValue};
