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

// Error types for expression evaluation

use thiserror::Error;

/// Errors reported by an expression evaluator
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    /// Expression text could not be parsed
    #[error("Parse error at position {position}: {message}")]
    Syntax {
        /// Byte offset of the failure
        position: usize,
        /// Human-readable error message
        message: String,
    },

    /// Variable not found
    #[error("Variable %{name} not found")]
    UnknownVariable {
        /// Variable name
        name: String,
    },

    /// Unknown function
    #[error("Unknown function: {name}")]
    UnknownFunction {
        /// Function name
        name: String,
    },

    /// Function evaluation error
    #[error("Function '{name}' error: {message}")]
    Function {
        /// Function name
        name: String,
        /// Human-readable error message
        message: String,
    },

    /// Invalid operation
    #[error("Invalid operation: {message}")]
    InvalidOperation {
        /// Error message
        message: String,
    },

    /// Terminology or identity service failure
    #[error("Service '{service}' error: {message}")]
    Service {
        /// Service name
        service: String,
        /// Error message
        message: String,
    },
}

impl ExpressionError {
    /// Create a function error
    pub fn function(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Function {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a service error
    pub fn service(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Service {
            service: service.into(),
            message: message.into(),
        }
    }
}
