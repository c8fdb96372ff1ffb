use serde::Deserialize;
use serde_json::Value;

use crate::release::{increment, parse_version};
use crate::setters::date_setter::{DateSetter, validate_date_format};
use crate::setters::{FieldError, FieldSetter, SetterContext};

fn default_step() -> i64 {
    1
}

/// A setter as written in the config file, e.g. `buildNumber = { kind = "increment" }`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SetterKind {
    /// Increment the field's own semantic version by the release type.
    Version,
    /// The batch instant, formatted with `format` or the batch `dateformat`.
    Date { format: Option<String> },
    /// The batch instant in milliseconds since the Unix epoch.
    Timestamp,
    /// Add `step` to an integer field.
    Increment {
        #[serde(default = "default_step")]
        step: i64,
    },
    /// Replace the field with a fixed value.
    Set { value: Value },
}

impl SetterKind {
    pub fn into_setter(self) -> Result<Box<dyn FieldSetter>, FieldError> {
        Ok(match self {
            SetterKind::Version => Box::new(SemverSetter),
            SetterKind::Date { format: Some(format) } => {
                validate_date_format(&format)?;
                Box::new(DateSetter::with_format(format))
            }
            SetterKind::Date { format: None } => Box::new(DateSetter::default()),
            SetterKind::Timestamp => Box::new(TimestampSetter),
            SetterKind::Increment { step } => Box::new(IncrementSetter { step }),
            SetterKind::Set { value } => Box::new(LiteralSetter { value }),
        })
    }
}

/// Bumps a version-like field independently of the normalized batch version.
#[derive(Debug, Default, Clone, Copy)]
pub struct SemverSetter;

impl FieldSetter for SemverSetter {
    fn set(&self, current: &Value, ctx: &mut SetterContext) -> Result<Option<Value>, FieldError> {
        let text = current
            .as_str()
            .ok_or_else(|| FieldError::InvalidVersion(current.to_string()))?;
        let version = parse_version(text).ok_or_else(|| FieldError::InvalidVersion(format!("\"{text}\"")))?;
        Ok(Some(Value::String(increment(&version, ctx.release)?.to_string())))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TimestampSetter;

impl FieldSetter for TimestampSetter {
    fn set(&self, _current: &Value, ctx: &mut SetterContext) -> Result<Option<Value>, FieldError> {
        Ok(Some(Value::from(ctx.now.timestamp_millis())))
    }
}

/// Adds `step` to an integer, or to a string holding one (the result stays a string).
#[derive(Debug, Clone, Copy)]
pub struct IncrementSetter {
    pub step: i64,
}

impl FieldSetter for IncrementSetter {
    fn set(&self, current: &Value, _ctx: &mut SetterContext) -> Result<Option<Value>, FieldError> {
        let add = |n: i64| {
            n.checked_add(self.step)
                .ok_or_else(|| FieldError::Overflow(n.to_string()))
        };
        match current {
            Value::Number(number) if number.is_i64() => {
                let n = number.as_i64().unwrap_or_default();
                Ok(Some(Value::from(add(n)?)))
            }
            Value::String(text) => match text.trim().parse::<i64>() {
                Ok(n) => Ok(Some(Value::String(add(n)?.to_string()))),
                Err(_) => Err(FieldError::UnexpectedType {
                    expected: "an integer",
                    found: current.to_string(),
                }),
            },
            other => Err(FieldError::UnexpectedType {
                expected: "an integer",
                found: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LiteralSetter {
    pub value: Value,
}

impl FieldSetter for LiteralSetter {
    fn set(&self, _current: &Value, _ctx: &mut SetterContext) -> Result<Option<Value>, FieldError> {
        Ok(Some(self.value.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::ReleaseType;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn context() -> SetterContext {
        let now = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        SetterContext::new(ReleaseType::Major, true, now, "%Y")
    }

    fn run(kind: SetterKind, current: Value) -> Result<Option<Value>, FieldError> {
        kind.into_setter().unwrap().set(&current, &mut context())
    }

    #[test]
    fn test_semver_setter_is_not_normalized() {
        let mut ctx = context();
        let value = SemverSetter.set(&json!("0.4.1"), &mut ctx).unwrap();
        assert_eq!(value, Some(json!("1.0.0")));
        assert!(ctx.normalized_version().is_none());
    }

    #[test]
    fn test_timestamp_setter() {
        let value = run(SetterKind::Timestamp, json!(0)).unwrap();
        assert_eq!(value, Some(json!(1_577_836_800_000_i64)));
    }

    #[test]
    fn test_increment_number_and_string() {
        let kind = SetterKind::Increment { step: 2 };
        assert_eq!(run(kind.clone(), json!(40)).unwrap(), Some(json!(42)));
        assert_eq!(run(kind, json!("7")).unwrap(), Some(json!("9")));
    }

    #[test]
    fn test_increment_rejects_non_integers() {
        let kind = SetterKind::Increment { step: 1 };
        assert!(matches!(
            run(kind.clone(), json!(1.5)),
            Err(FieldError::UnexpectedType { .. })
        ));
        assert!(matches!(
            run(kind.clone(), json!("abc")),
            Err(FieldError::UnexpectedType { .. })
        ));
        assert!(matches!(
            run(SetterKind::Increment { step: 1 }, json!(i64::MAX)),
            Err(FieldError::Overflow(_))
        ));
    }

    #[test]
    fn test_literal_setter() {
        let value = run(SetterKind::Set { value: json!({ "a": [1] }) }, json!(null)).unwrap();
        assert_eq!(value, Some(json!({ "a": [1] })));
    }

    #[test]
    fn test_date_kind_rejects_bad_format() {
        let result = SetterKind::Date { format: Some("%Q".to_string()) }.into_setter();
        assert!(matches!(result, Err(FieldError::InvalidDateFormat(_))));
    }

    #[test]
    fn test_kind_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            setter: SetterKind,
        }
        let parsed: Wrapper = toml::from_str(r#"setter = { kind = "increment" }"#).unwrap();
        assert_eq!(parsed.setter, SetterKind::Increment { step: 1 });

        let parsed: Wrapper = toml::from_str(r#"setter = { kind = "set", value = "stable" }"#).unwrap();
        assert_eq!(parsed.setter, SetterKind::Set { value: json!("stable") });

        let parsed: Wrapper = toml::from_str(r#"setter = { kind = "date", format = "%Y" }"#).unwrap();
        assert_eq!(parsed.setter, SetterKind::Date { format: Some("%Y".to_string()) });
    }
}
