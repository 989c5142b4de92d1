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

//! Bundled path evaluator
//!
//! Covers the FHIRPath subset templates use most: member navigation with
//! collection flattening, `%variables`, literals and function invocations.
//!
//! ```text
//! expression := term ("." invocation)*
//! term       := "%" identifier | literal | invocation
//! invocation := identifier [ "(" [ expression ("," expression)* ] ")" ]
//! ```

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{is_not, take_while},
    character::complete::{char, digit1, multispace0, satisfy},
    combinator::{all_consuming, map, map_res, opt, recognize},
    error::ErrorKind,
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded},
};
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

use super::{EvaluationEnvironment, ExpressionError, ExpressionEvaluator};
use crate::value::ResultValue;

type ParseResult<'a, T> = IResult<&'a str, T>;

/// Parsed path expression
#[derive(Debug, Clone, PartialEq)]
pub struct PathExpression {
    root: Term,
    steps: Vec<Invocation>,
}

#[derive(Debug, Clone, PartialEq)]
enum Term {
    Variable(String),
    Literal(ResultValue),
    Invocation(Invocation),
}

#[derive(Debug, Clone, PartialEq)]
enum Invocation {
    Member(String),
    Function {
        name: String,
        args: Vec<PathExpression>,
    },
}

/// Variables that default to the input document when not bound
const INPUT_VARIABLES: [&str; 3] = ["context", "resource", "rootResource"];

/// FHIRPath-subset evaluator used when no other evaluator is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct PathEvaluator;

impl PathEvaluator {
    /// Create a new path evaluator
    pub fn new() -> Self {
        Self
    }

    /// Parse expression text
    pub fn parse(expression: &str) -> Result<PathExpression, ExpressionError> {
        match all_consuming(delimited(multispace0, parse_expression, multispace0))
            .parse(expression)
        {
            Ok((_, parsed)) => Ok(parsed),
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(ExpressionError::Syntax {
                position: expression.len() - e.input.len(),
                message: format!("unexpected input in '{expression}'"),
            }),
            Err(nom::Err::Incomplete(_)) => Err(ExpressionError::Syntax {
                position: expression.len(),
                message: format!("incomplete expression '{expression}'"),
            }),
        }
    }

    fn evaluate_expression(
        &self,
        expression: &PathExpression,
        input: &Value,
        env: &EvaluationEnvironment<'_>,
    ) -> Result<Vec<ResultValue>, ExpressionError> {
        let mut focus = self.evaluate_root(&expression.root, input, env)?;
        for step in &expression.steps {
            focus = self.invoke(step, focus, input, env)?;
        }
        Ok(focus)
    }

    fn evaluate_root(
        &self,
        term: &Term,
        input: &Value,
        env: &EvaluationEnvironment<'_>,
    ) -> Result<Vec<ResultValue>, ExpressionError> {
        match term {
            Term::Variable(name) => match env.variables.get(name) {
                Some(value) => Ok(collection_from_json(value, env.resource_input)),
                None if INPUT_VARIABLES.contains(&name.as_str()) => {
                    Ok(collection_from_json(input, env.resource_input))
                }
                None => Err(ExpressionError::UnknownVariable { name: name.clone() }),
            },
            Term::Literal(value) => Ok(vec![value.clone()]),
            Term::Invocation(Invocation::Member(name))
                if env.resource_input && name.starts_with(|c: char| c.is_ascii_uppercase()) =>
            {
                // A leading type name selects the resource itself
                let resource_type = input.get("resourceType").and_then(Value::as_str);
                if resource_type == Some(name.as_str()) {
                    Ok(collection_from_json(input, true))
                } else {
                    Ok(Vec::new())
                }
            }
            Term::Invocation(invocation) => {
                let focus = collection_from_json(input, env.resource_input);
                self.invoke(invocation, focus, input, env)
            }
        }
    }

    fn invoke(
        &self,
        invocation: &Invocation,
        focus: Vec<ResultValue>,
        input: &Value,
        env: &EvaluationEnvironment<'_>,
    ) -> Result<Vec<ResultValue>, ExpressionError> {
        match invocation {
            Invocation::Member(name) => Ok(focus
                .iter()
                .flat_map(|item| navigate(item, name, env.resource_input))
                .collect()),
            Invocation::Function { name, args } => {
                let args = args
                    .iter()
                    .map(|arg| self.evaluate_expression(arg, input, env))
                    .collect::<Result<Vec<_>, _>>()?;

                if let Some(result) = call_builtin(name, &focus, &args) {
                    return result;
                }
                env.services
                    .call_function(name, &focus, &args)
                    .unwrap_or_else(|| Err(ExpressionError::UnknownFunction { name: name.clone() }))
            }
        }
    }
}

impl ExpressionEvaluator for PathEvaluator {
    fn evaluate(
        &self,
        expression: &str,
        input: &Value,
        env: &EvaluationEnvironment<'_>,
    ) -> Result<Vec<ResultValue>, ExpressionError> {
        let parsed = Self::parse(expression)?;
        self.evaluate_expression(&parsed, input, env)
    }
}

fn collection_from_json(value: &Value, resource_input: bool) -> Vec<ResultValue> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items
            .iter()
            .filter(|item| !item.is_null())
            .map(|item| ResultValue::from_json(item.clone(), resource_input))
            .collect(),
        other => vec![ResultValue::from_json(other.clone(), resource_input)],
    }
}

fn navigate(item: &ResultValue, name: &str, resource_input: bool) -> Vec<ResultValue> {
    match item {
        ResultValue::Complex(Value::Object(obj)) => obj
            .get(name)
            .map(|child| collection_from_json(child, resource_input))
            .unwrap_or_default(),
        ResultValue::Quantity(quantity) => quantity
            .to_json()
            .get(name)
            .map(|child| collection_from_json(child, resource_input))
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

fn call_builtin(
    name: &str,
    focus: &[ResultValue],
    args: &[Vec<ResultValue>],
) -> Option<Result<Vec<ResultValue>, ExpressionError>> {
    let result: Vec<ResultValue> = match name {
        "first" => focus.first().cloned().into_iter().collect(),
        "last" => focus.last().cloned().into_iter().collect(),
        "count" => vec![ResultValue::Integer(focus.len() as i64)],
        "exists" => vec![ResultValue::Boolean(!focus.is_empty())],
        "empty" => vec![ResultValue::Boolean(focus.is_empty())],
        "toString" => focus
            .iter()
            .filter_map(|item| match item {
                ResultValue::Quantity(quantity) => Some(quantity.to_string()),
                other => other.render_text(),
            })
            .map(ResultValue::String)
            .collect(),
        _ => return None,
    };

    if !args.is_empty() {
        return Some(Err(ExpressionError::function(
            name,
            "function takes no arguments",
        )));
    }
    Some(Ok(result))
}

fn parse_expression(input: &str) -> ParseResult<'_, PathExpression> {
    let (rest, root) = term(input)?;
    let (rest, steps) = many0(preceded(
        delimited(multispace0, char('.'), multispace0),
        invocation,
    ))
    .parse(rest)?;
    Ok((rest, PathExpression { root, steps }))
}

fn term(input: &str) -> ParseResult<'_, Term> {
    alt((
        map(preceded(char('%'), identifier), Term::Variable),
        map(string_literal, |s| Term::Literal(ResultValue::String(s))),
        map(number_literal, Term::Literal),
        map(invocation, |invocation| match invocation {
            Invocation::Member(name) if name == "true" => Term::Literal(true.into()),
            Invocation::Member(name) if name == "false" => Term::Literal(false.into()),
            other => Term::Invocation(other),
        }),
    ))
    .parse(input)
}

fn invocation(input: &str) -> ParseResult<'_, Invocation> {
    let (rest, name) = identifier(input)?;
    let (rest, args) = opt(delimited(
        preceded(multispace0, char('(')),
        separated_list0(
            char(','),
            delimited(multispace0, parse_expression, multispace0),
        ),
        preceded(multispace0, char(')')),
    ))
    .parse(rest)?;

    let invocation = match args {
        Some(args) => Invocation::Function { name, args },
        None => Invocation::Member(name),
    };
    Ok((rest, invocation))
}

fn identifier(input: &str) -> ParseResult<'_, String> {
    alt((
        map(
            recognize(pair(
                satisfy(|c| c.is_ascii_alphabetic() || c == '_'),
                take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
            )),
            str::to_string,
        ),
        map(delimited(char('`'), is_not("`"), char('`')), str::to_string),
    ))
    .parse(input)
}

fn number_literal(input: &str) -> ParseResult<'_, ResultValue> {
    map_res(
        recognize(pair(digit1, opt(pair(char('.'), digit1)))),
        |text: &str| {
            if text.contains('.') {
                Decimal::from_str(text)
                    .map(ResultValue::Decimal)
                    .map_err(|_| ErrorKind::Float)
            } else {
                text.parse::<i64>()
                    .map(ResultValue::Integer)
                    .map_err(|_| ErrorKind::Digit)
            }
        },
    )
    .parse(input)
}

fn string_literal(input: &str) -> ParseResult<'_, String> {
    let (mut rest, _) = char('\'').parse(input)?;
    let mut text = String::new();
    loop {
        let mut chars = rest.chars();
        match chars.next() {
            Some('\'') => return Ok((chars.as_str(), text)),
            Some('\\') => {
                let escaped = chars.next().ok_or_else(|| {
                    nom::Err::Failure(nom::error::Error::new(input, ErrorKind::Escaped))
                })?;
                text.push(match escaped {
                    'n' => '\n',
                    'r' => '\r',
                    't' => '\t',
                    other => other,
                });
            }
            Some(c) => text.push(c),
            None => {
                return Err(nom::Err::Failure(nom::error::Error::new(
                    input,
                    ErrorKind::Char,
                )));
            }
        }
        rest = chars.as_str();
    }
}
