use chrono::format::{Item, StrftimeItems};
use std::fmt::Write;

use serde_json::Value;

use crate::setters::{FieldError, FieldSetter, SetterContext};

/// Fails when `pattern` contains a `strftime` specifier chrono does not know.
pub fn validate_date_format(pattern: &str) -> Result<(), FieldError> {
    if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
        return Err(FieldError::InvalidDateFormat(pattern.to_string()));
    }
    Ok(())
}

/// Writes the batch instant formatted with its own pattern, or the batch's `dateformat`.
#[derive(Debug, Default, Clone)]
pub struct DateSetter {
    format: Option<String>,
}

impl DateSetter {
    pub fn with_format(format: impl Into<String>) -> Self {
        DateSetter {
            format: Some(format.into()),
        }
    }
}

impl FieldSetter for DateSetter {
    fn set(&self, _current: &Value, ctx: &mut SetterContext) -> Result<Option<Value>, FieldError> {
        let format = self.format.as_deref().unwrap_or(&ctx.date_format);
        let mut formatted = String::new();
        write!(formatted, "{}", ctx.now.format(format))
            .map_err(|_| FieldError::InvalidDateFormat(format.to_string()))?;
        Ok(Some(Value::String(formatted)))
    }
}
