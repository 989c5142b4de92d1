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

//! Template engine configuration

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Construction-time settings of a template engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TemplateEngineConfig {
    /// Variables visible to every evaluation, overridden by call parameters
    pub static_parameters: HashMap<String, Value>,
    /// Whether input documents are FHIR resources
    pub resource_input: bool,
}

impl TemplateEngineConfig {
    /// Create an empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from JSON text
    pub fn from_json_str(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Add a static parameter
    pub fn with_static_parameter(mut self, name: impl Into<String>, value: Value) -> Self {
        self.static_parameters.insert(name.into(), value);
        self
    }

    /// Set whether input documents are FHIR resources
    pub fn with_resource_input(mut self, resource_input: bool) -> Self {
        self.resource_input = resource_input;
        self
    }
}
