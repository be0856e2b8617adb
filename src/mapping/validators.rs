//! Field-level validators attached by the storage mapper. Built once per
//! schema, run at write time in declaration order, short-circuiting on the
//! first failure.

use crate::error::{AppError, MappingError};
use crate::schema::{FieldDefinition, FieldType, ValidationSpec};
use regex::Regex;
use serde_json::Value;

#[derive(Clone, Debug)]
pub enum Check {
    Email,
    UrlScheme,
    Length { min: Option<u32>, max: Option<u32> },
    Range { min: Option<f64>, max: Option<f64> },
    ChoiceSet(Vec<String>),
    /// Every element of a multi-choice array must be in the set.
    MultiChoiceSet(Vec<String>),
    Pattern { regex: Regex, message: Option<String> },
}

/// Ordered validator chain for one field.
#[derive(Clone, Debug)]
pub struct FieldValidator {
    pub field: String,
    pub checks: Vec<Check>,
}

impl FieldValidator {
    /// Build the chain for a field: built-in checks first (email/url format,
    /// length, range, choice membership), then custom rules.
    pub fn for_field(field: &FieldDefinition) -> Result<Option<Self>, MappingError> {
        let mut checks = Vec::new();

        match field.field_type {
            FieldType::Email => checks.push(Check::Email),
            FieldType::Url => checks.push(Check::UrlScheme),
            _ => {}
        }
        if field.min_length.is_some() || field.max_length.is_some() {
            checks.push(Check::Length {
                min: field.min_length,
                max: field.max_length,
            });
        }
        if field.min_value.is_some() || field.max_value.is_some() {
            checks.push(Check::Range {
                min: field.min_value,
                max: field.max_value,
            });
        }
        if let Some(choices) = &field.choices {
            let values: Vec<String> = choices.iter().map(|c| c.value.clone()).collect();
            match field.field_type {
                FieldType::MultiChoice => checks.push(Check::MultiChoiceSet(values)),
                _ => checks.push(Check::ChoiceSet(values)),
            }
        }
        for spec in &field.validation_rules {
            checks.push(compile_rule(&field.name, spec)?);
        }

        if checks.is_empty() {
            Ok(None)
        } else {
            Ok(Some(FieldValidator {
                field: field.name.clone(),
                checks,
            }))
        }
    }

    /// Run the chain against a value. Null values pass; `required` is
    /// enforced separately by the data-access service.
    pub fn run(&self, value: &Value) -> Result<(), AppError> {
        if value.is_null() {
            return Ok(());
        }
        for check in &self.checks {
            self.run_check(check, value)?;
        }
        Ok(())
    }

    fn run_check(&self, check: &Check, value: &Value) -> Result<(), AppError> {
        let field = &self.field;
        match check {
            Check::Email => {
                if let Some(s) = value.as_str() {
                    if !s.contains('@') || s.len() < 3 {
                        return Err(AppError::validation(field, "must be a valid email address"));
                    }
                }
            }
            Check::UrlScheme => {
                if let Some(s) = value.as_str() {
                    if !s.starts_with("http://") && !s.starts_with("https://") {
                        return Err(AppError::validation(field, "must be an http(s) URL"));
                    }
                }
            }
            Check::Length { min, max } => {
                if let Some(s) = value.as_str() {
                    let len = s.chars().count() as u32;
                    if let Some(min) = min {
                        if len < *min {
                            return Err(AppError::validation(
                                field,
                                format!("must be at least {} characters", min),
                            ));
                        }
                    }
                    if let Some(max) = max {
                        if len > *max {
                            return Err(AppError::validation(
                                field,
                                format!("must be at most {} characters", max),
                            ));
                        }
                    }
                }
            }
            Check::Range { min, max } => {
                if let Some(n) = value.as_f64() {
                    if let Some(min) = min {
                        if n < *min {
                            return Err(AppError::validation(
                                field,
                                format!("must be at least {}", min),
                            ));
                        }
                    }
                    if let Some(max) = max {
                        if n > *max {
                            return Err(AppError::validation(
                                field,
                                format!("must be at most {}", max),
                            ));
                        }
                    }
                }
            }
            Check::ChoiceSet(values) => {
                if let Some(s) = value.as_str() {
                    if !values.iter().any(|v| v == s) {
                        return Err(AppError::validation(
                            field,
                            format!("must be one of: {}", values.join(", ")),
                        ));
                    }
                }
            }
            Check::MultiChoiceSet(values) => {
                if let Some(items) = value.as_array() {
                    for item in items {
                        let s = item.as_str().ok_or_else(|| {
                            AppError::validation(field, "entries must be strings")
                        })?;
                        if !values.iter().any(|v| v == s) {
                            return Err(AppError::validation(
                                field,
                                format!("'{}' is not one of: {}", s, values.join(", ")),
                            ));
                        }
                    }
                } else {
                    return Err(AppError::validation(field, "must be an array of choices"));
                }
            }
            Check::Pattern { regex, message } => {
                if let Some(s) = value.as_str() {
                    if !regex.is_match(s) {
                        let reason = message
                            .clone()
                            .unwrap_or_else(|| "does not match required pattern".into());
                        return Err(AppError::Validation {
                            field: field.clone(),
                            reason,
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

fn compile_rule(field: &str, spec: &ValidationSpec) -> Result<Check, MappingError> {
    match spec.rule.as_str() {
        "regex" => {
            let pattern = spec.value.as_str().ok_or_else(|| MappingError::InvalidRule {
                field: field.into(),
                reason: "regex rule value must be a string".into(),
            })?;
            let regex = Regex::new(pattern).map_err(|e| MappingError::InvalidRule {
                field: field.into(),
                reason: e.to_string(),
            })?;
            Ok(Check::Pattern {
                regex,
                message: spec.message.clone(),
            })
        }
        other => Err(MappingError::InvalidRule {
            field: field.into(),
            reason: format!("unknown rule type '{}'", other),
        }),
    }
}
