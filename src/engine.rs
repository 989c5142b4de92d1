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

//! Template engine - the main entry point for template evaluation

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::TemplateEngineConfig;
use crate::context::VariableScope;
use crate::error::Result;
use crate::evaluator::{
    EvaluatorServices, ExpressionEvaluator, FunctionLibrary, IdentityService, PathEvaluator,
    TerminologyService,
};
use crate::prune::prune_empty;
use crate::walker::Resolver;

/// Fills JSON templates from an input document and context variables.
///
/// The engine is immutable once built and can be shared between threads;
/// every call builds its own variable scopes.
///
/// # Examples
///
/// ```rust
/// use octofhir_fhir_template::FhirTemplateEngine;
/// use serde_json::json;
/// use std::collections::HashMap;
///
/// let engine = FhirTemplateEngine::new();
/// let template = json!({
///     "resourceType": "Observation",
///     "valueQuantity": {"value": "{{value}}", "unit": "{{? unit}}"}
/// });
/// let output = engine
///     .evaluate_sync(&template, &HashMap::new(), &json!({"value": 6.3}))
///     .unwrap();
///
/// assert_eq!(output, json!({"resourceType": "Observation", "valueQuantity": {"value": 6.3}}));
/// ```
#[derive(Clone)]
pub struct FhirTemplateEngine {
    evaluator: Arc<dyn ExpressionEvaluator>,
    services: EvaluatorServices,
    config: TemplateEngineConfig,
    static_scope: Arc<VariableScope>,
}

impl Default for FhirTemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FhirTemplateEngine {
    /// Create an engine with the bundled path evaluator and no parameters
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Start building a configured engine
    pub fn builder() -> FhirTemplateEngineBuilder {
        FhirTemplateEngineBuilder::default()
    }

    /// Configuration the engine was built with
    pub fn config(&self) -> &TemplateEngineConfig {
        &self.config
    }

    /// Services handed to the expression evaluator
    pub fn services(&self) -> &EvaluatorServices {
        &self.services
    }

    /// Evaluate `template` against `input`.
    ///
    /// `context_params` override static parameters of the same name. The
    /// computation itself never suspends; the async signature only lets
    /// callers drive it from a task.
    ///
    /// Pruning applies to the top level too: when every field of the
    /// template resolves to nothing, the result is `null`, not `{}`. For
    /// example `{"subject": "{{? X.subject}}"}` with no subject gives `null`.
    pub async fn evaluate(
        &self,
        template: &Value,
        context_params: &HashMap<String, Value>,
        input: &Value,
    ) -> Result<Value> {
        self.evaluate_sync(template, context_params, input)
    }

    /// Synchronous variant of [`FhirTemplateEngine::evaluate`]
    pub fn evaluate_sync(
        &self,
        template: &Value,
        context_params: &HashMap<String, Value>,
        input: &Value,
    ) -> Result<Value> {
        log::debug!(
            "Evaluating template with {} context parameter(s)",
            context_params.len()
        );

        let scope = VariableScope::child(
            &self.static_scope,
            context_params
                .iter()
                .map(|(name, value)| (name.clone(), value.clone())),
        );
        let resolver = Resolver {
            evaluator: self.evaluator.as_ref(),
            services: &self.services,
            resource_input: self.config.resource_input,
            input,
        };

        let resolved = resolver.walk(template, &scope)?;
        let output = prune_empty(resolved);

        log::debug!("Template evaluation finished");
        Ok(output)
    }
}

impl fmt::Debug for FhirTemplateEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FhirTemplateEngine")
            .field("services", &self.services)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Builder for [`FhirTemplateEngine`]
#[derive(Default)]
pub struct FhirTemplateEngineBuilder {
    config: TemplateEngineConfig,
    services: EvaluatorServices,
    evaluator: Option<Arc<dyn ExpressionEvaluator>>,
}

impl FhirTemplateEngineBuilder {
    /// Replace the whole configuration
    pub fn with_config(mut self, config: TemplateEngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Add a variable visible to every evaluation
    pub fn with_static_parameter(mut self, name: impl Into<String>, value: Value) -> Self {
        self.config = self.config.with_static_parameter(name, value);
        self
    }

    /// Treat inputs as FHIR resources
    pub fn with_resource_input(mut self, resource_input: bool) -> Self {
        self.config = self.config.with_resource_input(resource_input);
        self
    }

    /// Register an additional function library
    pub fn with_function_library(mut self, library: Arc<dyn FunctionLibrary>) -> Self {
        self.services.function_libraries.push(library);
        self
    }

    /// Set the terminology service
    pub fn with_terminology_service(mut self, service: Arc<dyn TerminologyService>) -> Self {
        self.services.terminology = Some(service);
        self
    }

    /// Set the identity service
    pub fn with_identity_service(mut self, service: Arc<dyn IdentityService>) -> Self {
        self.services.identity = Some(service);
        self
    }

    /// Use a custom expression evaluator instead of [`PathEvaluator`]
    pub fn with_evaluator(mut self, evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    /// Build the engine
    pub fn build(self) -> FhirTemplateEngine {
        let static_scope = VariableScope::root(
            self.config
                .static_parameters
                .iter()
                .map(|(name, value)| (name.clone(), value.clone())),
        );

        FhirTemplateEngine {
            evaluator: self
                .evaluator
                .unwrap_or_else(|| Arc::new(PathEvaluator::new())),
            services: self.services,
            config: self.config,
            static_scope,
        }
    }
}
