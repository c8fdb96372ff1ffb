use chrono::{DateTime, Utc};
use log::debug;
use semver::Version;
use serde_json::{Map, Value};
use std::fmt::Debug;
use thiserror::Error;

use crate::release::{IncrementError, ReleaseType};

pub mod custom_setters;
pub mod date_setter;
pub mod version_setter;

#[derive(Debug, Error)]
pub enum FieldError {
    #[error("{0} is not a valid semantic version")]
    InvalidVersion(String),
    #[error("expected {expected}, found {found}")]
    UnexpectedType { expected: &'static str, found: String },
    #[error("incrementing {0} overflows")]
    Overflow(String),
    #[error("\"{0}\" is not a valid date format")]
    InvalidDateFormat(String),
    #[error(transparent)]
    Semver(#[from] semver::Error),
}

impl From<IncrementError> for FieldError {
    fn from(error: IncrementError) -> Self {
        match error {
            IncrementError::Overflow(version) => FieldError::Overflow(version),
            IncrementError::Prerelease(error) => FieldError::Semver(error),
        }
    }
}

/// State shared by every setter for the duration of one batch.
#[derive(Debug)]
pub struct SetterContext {
    pub release: ReleaseType,
    pub normalize: bool,
    pub now: DateTime<Utc>,
    pub date_format: String,
    normalized_version: Option<Version>,
    last_version: Option<Version>,
}

impl SetterContext {
    pub fn new(release: ReleaseType, normalize: bool, now: DateTime<Utc>, date_format: impl Into<String>) -> Self {
        SetterContext {
            release,
            normalize,
            now,
            date_format: date_format.into(),
            normalized_version: None,
            last_version: None,
        }
    }

    /// The first version computed in this batch, if any.
    pub fn normalized_version(&self) -> Option<&Version> {
        self.normalized_version.as_ref()
    }

    pub fn record_version(&mut self, version: &Version) {
        if self.normalized_version.is_none() {
            self.normalized_version = Some(version.clone());
        }
        self.last_version = Some(version.clone());
    }

    /// The version the batch settled on: the normalized one, or the last one computed.
    pub fn resulting_version(&self) -> Option<&Version> {
        if self.normalize {
            self.normalized_version.as_ref()
        } else {
            self.last_version.as_ref()
        }
    }
}

/// Computes a new value for one document field.
///
/// `Ok(None)` leaves the field as it is. An error also leaves the field unchanged and
/// is reported as a warning for that file.
pub trait FieldSetter: Debug {
    fn set(&self, current: &Value, ctx: &mut SetterContext) -> Result<Option<Value>, FieldError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub field: String,
    pub value: Value,
}

#[derive(Debug)]
pub struct FieldWarning {
    pub field: String,
    pub error: FieldError,
}

#[derive(Debug, Default)]
pub struct AppliedFields {
    pub changes: Vec<FieldChange>,
    pub warnings: Vec<FieldWarning>,
}

/// Field name to setter mapping, applied in registration order.
#[derive(Debug, Default)]
pub struct SetterRegistry {
    entries: Vec<(String, Box<dyn FieldSetter>)>,
}

impl SetterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the `version` and `date` setters.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("version", Box::new(version_setter::VersionSetter));
        registry.register("date", Box::new(date_setter::DateSetter::default()));
        registry
    }

    /// Registers `setter` for `field`, replacing any setter already registered for it.
    pub fn register(&mut self, field: impl Into<String>, setter: Box<dyn FieldSetter>) {
        let field = field.into();
        debug!("Registering setter for field '{}': {:?}", field, setter);
        match self.entries.iter_mut().find(|(name, _)| *name == field) {
            Some(entry) => entry.1 = setter,
            None => self.entries.push((field, setter)),
        }
    }

    /// Runs every setter whose field is a top-level key of `document`.
    pub fn apply(&self, document: &mut Map<String, Value>, ctx: &mut SetterContext) -> AppliedFields {
        let mut applied = AppliedFields::default();
        for (field, setter) in &self.entries {
            let Some(current) = document.get_mut(field) else {
                continue;
            };
            match setter.set(current, ctx) {
                Ok(Some(value)) => {
                    *current = value.clone();
                    applied.changes.push(FieldChange { field: field.clone(), value });
                }
                Ok(None) => debug!("Setter for '{}' left the field unchanged", field),
                Err(error) => applied.warnings.push(FieldWarning { field: field.clone(), error }),
            }
        }
        applied
    }
}

/// Renders a value for log lines: strings without quotes, everything else as JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
