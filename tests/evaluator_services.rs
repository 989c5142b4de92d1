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

//! Custom evaluators, function libraries and services

use chrono::{NaiveDate, NaiveTime};
use octofhir_fhir_template::{
    EvaluationEnvironment, EvaluatorServices, ExpressionError, ExpressionEvaluator,
    FhirTemplateEngine, FunctionLibrary, IdentityService, ResultValue, TemplateError,
    TerminologyService,
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;

/// Returns canned results keyed by expression text
struct CannedEvaluator {
    results: HashMap<&'static str, Vec<ResultValue>>,
}

impl ExpressionEvaluator for CannedEvaluator {
    fn evaluate(
        &self,
        expression: &str,
        _input: &Value,
        env: &EvaluationEnvironment<'_>,
    ) -> Result<Vec<ResultValue>, ExpressionError> {
        if let Some(name) = expression.strip_prefix('%') {
            return match env.variables.get(name) {
                Some(Value::Array(items)) => Ok(items
                    .iter()
                    .map(|item| ResultValue::from_json(item.clone(), false))
                    .collect()),
                Some(value) => Ok(vec![ResultValue::from_json(value.clone(), false)]),
                None => Err(ExpressionError::UnknownVariable {
                    name: name.to_string(),
                }),
            };
        }
        self.results
            .get(expression)
            .cloned()
            .ok_or_else(|| ExpressionError::InvalidOperation {
                message: format!("no result for {expression}"),
            })
    }
}

struct Terminology;

impl TerminologyService for Terminology {
    fn lookup_display(&self, system: &str, code: &str) -> Result<Option<String>, ExpressionError> {
        match (system, code) {
            ("http://loinc.org", "2345-7") => Ok(Some("Glucose".to_string())),
            ("http://loinc.org", _) => Ok(None),
            _ => Err(ExpressionError::service("terminology", format!("unknown system {system}"))),
        }
    }

    fn translate(
        &self,
        _concept_map: &str,
        _system: &str,
        code: &str,
    ) -> Result<Vec<Value>, ExpressionError> {
        Ok(vec![json!({"system": "http://snomed.info/sct", "code": format!("sct-{code}")})])
    }
}

struct Identity;

impl IdentityService for Identity {
    fn resolve_identifier(
        &self,
        resource_type: &str,
        _system: Option<&str>,
        value: &str,
    ) -> Result<Option<String>, ExpressionError> {
        Ok((resource_type == "Patient").then(|| format!("pid-{value}")))
    }
}

/// Exposes the terminology and identity services to expressions
struct ServiceFunctions;

impl ServiceFunctions {
    fn text_arg(args: &[Vec<ResultValue>], index: usize) -> Option<String> {
        args.get(index)?.first()?.render_text()
    }
}

impl FunctionLibrary for ServiceFunctions {
    fn name(&self) -> &str {
        "services"
    }

    fn call(
        &self,
        function: &str,
        focus: &[ResultValue],
        args: &[Vec<ResultValue>],
        services: &EvaluatorServices,
    ) -> Option<Result<Vec<ResultValue>, ExpressionError>> {
        match function {
            "display" => {
                let terminology = services.terminology.as_ref()?;
                let system = Self::text_arg(args, 0)?;
                Some(
                    focus
                        .iter()
                        .filter_map(ResultValue::render_text)
                        .map(|code| terminology.lookup_display(&system, &code))
                        .filter_map(|result| result.transpose())
                        .map(|result| result.map(ResultValue::String))
                        .collect(),
                )
            }
            "translate" => {
                let terminology = services.terminology.as_ref()?;
                let map = Self::text_arg(args, 0)?;
                let system = Self::text_arg(args, 1)?;
                let mut codings = Vec::new();
                for code in focus.iter().filter_map(ResultValue::render_text) {
                    match terminology.translate(&map, &system, &code) {
                        Ok(found) => codings.extend(found.into_iter().map(ResultValue::Complex)),
                        Err(e) => return Some(Err(e)),
                    }
                }
                Some(Ok(codings))
            }
            "resolveIdentifier" => {
                let identity = services.identity.as_ref()?;
                let resource_type = Self::text_arg(args, 0)?;
                Some(
                    focus
                        .iter()
                        .filter_map(ResultValue::render_text)
                        .map(|value| identity.resolve_identifier(&resource_type, None, &value))
                        .filter_map(|result| result.transpose())
                        .map(|result| result.map(ResultValue::String))
                        .collect(),
                )
            }
            _ => None,
        }
    }
}

fn service_engine() -> FhirTemplateEngine {
    FhirTemplateEngine::builder()
        .with_function_library(Arc::new(ServiceFunctions))
        .with_terminology_service(Arc::new(Terminology))
        .with_identity_service(Arc::new(Identity))
        .build()
}

#[tokio::test]
async fn test_function_library_reaches_services() {
    let input = json!({"code": "2345-7", "mrn": "12345"});
    let template = json!({
        "code": {
            "coding": [{
                "system": "http://loinc.org",
                "code": "{{code}}",
                "display": "{{? code.display('http://loinc.org')}}"
            }, "{{* code.translate('loinc-to-sct', 'http://loinc.org')}}"]
        },
        "subject": {"reference": "Patient/{{mrn.resolveIdentifier('Patient')}}"}
    });

    let output = service_engine()
        .evaluate(&template, &HashMap::new(), &input)
        .await
        .unwrap();

    assert_eq!(
        output,
        json!({
            "code": {
                "coding": [
                    {"system": "http://loinc.org", "code": "2345-7", "display": "Glucose"},
                    {"system": "http://snomed.info/sct", "code": "sct-2345-7"}
                ]
            },
            "subject": {"reference": "Patient/pid-12345"}
        })
    );
}

#[tokio::test]
async fn test_service_errors_are_wrapped() {
    let input = json!({"code": "x"});
    let template = json!({"display": "{{code.display('urn:unknown')}}"});

    let err = service_engine()
        .evaluate(&template, &HashMap::new(), &input)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        TemplateError::ExpressionEvaluationFailure {
            expression: "code.display('urn:unknown')".to_string(),
            source: ExpressionError::service("terminology", "unknown system urn:unknown"),
        }
    );
}

#[tokio::test]
async fn test_functions_without_library_are_unknown() {
    let engine = FhirTemplateEngine::new();
    let err = engine
        .evaluate(
            &json!({"d": "{{code.display('http://loinc.org')}}"}),
            &HashMap::new(),
            &json!({"code": "2345-7"}),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        TemplateError::ExpressionEvaluationFailure {
            source: ExpressionError::UnknownFunction { .. },
            ..
        }
    ));
}

#[tokio::test]
async fn test_custom_evaluator_temporal_rendering() {
    let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    let time = NaiveTime::from_hms_opt(8, 30, 0).unwrap();
    let results = HashMap::from([
        ("birthDate", vec![ResultValue::date(date)]),
        ("checkIn", vec![ResultValue::time(time)]),
        ("flags", vec![true.into(), false.into()]),
    ]);
    let engine = FhirTemplateEngine::builder()
        .with_evaluator(Arc::new(CannedEvaluator { results }))
        .build();

    let template = json!({
        "birthDate": "{{birthDate}}",
        "text": "Born {{birthDate}}, seen at {{checkIn}}",
        "flags": "{{+ flags}}"
    });
    let output = engine
        .evaluate(&template, &HashMap::new(), &Value::Null)
        .await
        .unwrap();

    assert_eq!(
        output,
        json!({
            "birthDate": "2024-03-01",
            "text": "Born 2024-03-01, seen at 08:30:00",
            "flags": [true, false]
        })
    );
}

#[tokio::test]
async fn test_custom_evaluator_sees_loop_variables() {
    let results = HashMap::from([(
        "items",
        vec![ResultValue::from("a"), ResultValue::from("b")],
    )]);
    let engine = FhirTemplateEngine::builder()
        .with_evaluator(Arc::new(CannedEvaluator { results }))
        .build();

    let template = json!({
        "one": {"{{#i}}": "{{items}}", "{{?}}": {"all": "{{* %i}}"}},
        "each": {"{{#i}}": "{{items}}", "{{+}}": "item {{%i}}"}
    });
    let output = engine
        .evaluate(&template, &HashMap::new(), &Value::Null)
        .await
        .unwrap();

    // With several elements the optional section binds them all at once
    assert_eq!(
        output,
        json!({"one": {"all": ["a", "b"]}, "each": ["item a", "item b"]})
    );
}
