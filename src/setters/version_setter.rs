use log::debug;
use serde_json::Value;

use crate::release::{increment, parse_version};
use crate::setters::{FieldError, FieldSetter, SetterContext};

/// The built-in `version` setter.
///
/// With normalization on, every file after the first successful bump receives the
/// version computed for that first file, whatever its own value is.
#[derive(Debug, Default, Clone, Copy)]
pub struct VersionSetter;

impl FieldSetter for VersionSetter {
    fn set(&self, current: &Value, ctx: &mut SetterContext) -> Result<Option<Value>, FieldError> {
        if ctx.normalize {
            if let Some(normalized) = ctx.normalized_version() {
                return Ok(Some(Value::String(normalized.to_string())));
            }
        }

        let text = current
            .as_str()
            .ok_or_else(|| FieldError::InvalidVersion(current.to_string()))?;
        let version = parse_version(text).ok_or_else(|| FieldError::InvalidVersion(format!("\"{text}\"")))?;
        let next = increment(&version, ctx.release)?;
        debug!("Incrementing version from {} -> {}", version, next);

        ctx.record_version(&next);
        Ok(Some(Value::String(next.to_string())))
    }
}
