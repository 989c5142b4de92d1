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

//! Removal of empty structure from resolved documents

use serde_json::{Map, Value};

/// Drop `null` leaves and the containers left empty by dropping them.
///
/// Works bottom-up: an object or array whose members are all pruned away
/// becomes `null` itself, so a wholly empty document collapses to `null`.
/// Applying it twice gives the same result as applying it once.
pub fn prune_empty(value: Value) -> Value {
    match value {
        Value::Object(fields) => {
            let pruned: Map<String, Value> = fields
                .into_iter()
                .filter_map(|(name, value)| match prune_empty(value) {
                    Value::Null => None,
                    kept => Some((name, kept)),
                })
                .collect();
            if pruned.is_empty() {
                Value::Null
            } else {
                Value::Object(pruned)
            }
        }
        Value::Array(items) => {
            let pruned: Vec<Value> = items
                .into_iter()
                .map(prune_empty)
                .filter(|item| !item.is_null())
                .collect();
            if pruned.is_empty() {
                Value::Null
            } else {
                Value::Array(pruned)
            }
        }
        other => other,
    }
}
