// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Request Schemas
//!
//! Per-operation JSON Schema documents checked by the validation layer.
//!
//! Schemas are embedded in the binary. Setting `SCHEMA_DIR` loads
//! `{operation}.json` files from that directory instead. Every document is
//! compiled once at startup with [`jsonschema`]; a missing or invalid
//! document fails startup.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use jsonschema::error::ValidationErrorKind;
use jsonschema::{ValidationError, Validator};
use serde_json::Value;

use crate::user::Operation;

const EMBEDDED: [(Operation, &str); 4] = [
    (
        Operation::Register,
        include_str!("../schemas/user/register.json"),
    ),
    (Operation::Login, include_str!("../schemas/user/login.json")),
    (
        Operation::VerifyOtp,
        include_str!("../schemas/user/verify_otp.json"),
    ),
    (
        Operation::GetAllUsers,
        include_str!("../schemas/user/get_all_users.json"),
    ),
];

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("schema {name} could not be read: {source}")]
    Read {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("schema {name} is not valid JSON: {source}")]
    Parse {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("schema {name} is invalid: {reason}")]
    Invalid { name: String, reason: String },
}

/// A compiled schema for one operation's input.
pub struct Schema {
    name: String,
    validator: Validator,
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Schema {
    /// Parse and compile a schema document.
    pub fn compile(name: &str, source: &str) -> Result<Self, SchemaError> {
        let document: Value =
            serde_json::from_str(source).map_err(|source| SchemaError::Parse {
                name: name.to_string(),
                source,
            })?;
        let validator = jsonschema::validator_for(&document).map_err(|e| SchemaError::Invalid {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            name: name.to_string(),
            validator,
        })
    }

    /// All violations of `value` against this schema, sorted. Empty means
    /// valid.
    pub fn validate(&self, value: &Value) -> Vec<String> {
        let mut violations: Vec<String> = self.validator.iter_errors(value).map(|e| describe(&e)).collect();
        violations.sort();
        violations.dedup();
        violations
    }
}

/// Caller-facing message for one validation error.
fn describe(error: &ValidationError<'_>) -> String {
    let field = error
        .instance_path
        .as_str()
        .trim_start_matches('/')
        .replace('/', ".");

    match &error.kind {
        ValidationErrorKind::Required { property } => match property.as_str() {
            Some(name) => format!("{name} is required"),
            None => format!("{property} is required"),
        },
        ValidationErrorKind::Type { .. } if field.is_empty() => {
            "request body must be a JSON object".to_string()
        }
        ValidationErrorKind::Type { .. } => format!("{field} has an invalid type"),
        ValidationErrorKind::MinLength { limit } => {
            format!("{field} must be at least {limit} characters")
        }
        ValidationErrorKind::MaxLength { limit } => {
            format!("{field} must be at most {limit} characters")
        }
        ValidationErrorKind::Pattern { .. } => format!("{field} has an invalid format"),
        ValidationErrorKind::Minimum { limit } => {
            format!("{field} must be greater than or equal to {limit}")
        }
        ValidationErrorKind::Maximum { limit } => {
            format!("{field} must be less than or equal to {limit}")
        }
        ValidationErrorKind::AdditionalProperties { unexpected } => {
            format!("{} is not allowed", unexpected.join(", "))
        }
        ValidationErrorKind::Enum { .. } => format!("{field} is not one of the allowed values"),
        _ if field.is_empty() => error.to_string(),
        _ => format!("{field}: {error}"),
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Compiled schemas keyed by operation.
#[derive(Debug)]
pub struct SchemaRegistry {
    schemas: HashMap<Operation, Schema>,
}

impl SchemaRegistry {
    /// Load every schema, from `dir` when given, otherwise the embedded copies.
    pub fn load(dir: Option<&Path>) -> Result<Self, SchemaError> {
        let mut schemas = HashMap::with_capacity(EMBEDDED.len());
        for (operation, embedded) in EMBEDDED {
            let name = operation.schema_name();
            let schema = match dir {
                Some(dir) => {
                    let path = dir.join(format!("{name}.json"));
                    let source = std::fs::read_to_string(&path).map_err(|source| {
                        SchemaError::Read {
                            name: path.display().to_string(),
                            source,
                        }
                    })?;
                    Schema::compile(name, &source)?
                }
                None => Schema::compile(name, embedded)?,
            };
            schemas.insert(operation, schema);
        }
        Ok(Self { schemas })
    }

    /// The embedded schemas.
    pub fn embedded() -> Result<Self, SchemaError> {
        Self::load(None)
    }

    /// Violations of `value` for `operation`. Operations without a schema
    /// accept any input.
    pub fn validate(&self, operation: Operation, value: &Value) -> Vec<String> {
        self.schemas
            .get(&operation)
            .map(|schema| schema.validate(value))
            .unwrap_or_default()
    }
}
