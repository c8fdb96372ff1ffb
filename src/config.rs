use chrono::{DateTime, Utc};
use log::debug;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::arguments::Arguments;
use crate::release::ReleaseType;
use crate::setters::FieldSetter;
use crate::setters::FieldError;
use crate::setters::custom_setters::SetterKind;
use crate::setters::date_setter::validate_date_format;

/// `2013-07-04 18:30:15 +00:00`
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S %:z";
pub const DEFAULT_CONFIG_FILE: &str = "bumpup.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("\"{0}\" is not a valid release type: major, minor, patch, or build.")]
    InvalidReleaseType(String),
    #[error("\"{0}\" is not a valid date format")]
    InvalidDateFormat(String),
    #[error("Invalid setter for field '{field}': {source}")]
    InvalidSetter {
        field: String,
        #[source]
        source: FieldError,
    },
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// `files = "package.json"` or `files = ["package.json", "bower.json"]`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(PathBuf),
    Many(Vec<PathBuf>),
}

impl From<OneOrMany> for Vec<PathBuf> {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(path) => vec![path],
            OneOrMany::Many(paths) => paths,
        }
    }
}

/// Contents of a `bumpup.toml` file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub files: Option<OneOrMany>,
    pub release: Option<ReleaseType>,
    pub dateformat: Option<String>,
    pub normalize: Option<bool>,
    #[serde(default)]
    pub setters: BTreeMap<String, SetterKind>,
}

impl ConfigFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!("Loading config file: '{}'", path.display());
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Everything one batch needs besides the file list.
#[derive(Debug)]
pub struct BumpOptions {
    pub release: ReleaseType,
    pub dateformat: String,
    pub normalize: bool,
    /// Used instead of the current time when set.
    pub timestamp: Option<DateTime<Utc>>,
    /// Extra setters, merged over the built-in `version` and `date` ones.
    pub setters: Vec<(String, Box<dyn FieldSetter>)>,
}

impl Default for BumpOptions {
    fn default() -> Self {
        BumpOptions {
            release: ReleaseType::default(),
            dateformat: DEFAULT_DATE_FORMAT.to_string(),
            normalize: true,
            timestamp: None,
            setters: Vec::new(),
        }
    }
}

impl BumpOptions {
    pub fn with_release(mut self, release: ReleaseType) -> Self {
        self.release = release;
        self
    }

    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    pub fn with_dateformat(mut self, dateformat: impl Into<String>) -> Self {
        self.dateformat = dateformat.into();
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_setter(mut self, field: impl Into<String>, setter: impl FieldSetter + 'static) -> Self {
        self.setters.push((field.into(), Box::new(setter)));
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_date_format(&self.dateformat)
            .map_err(|_| ConfigError::InvalidDateFormat(self.dateformat.clone()))
    }
}

/// The file list and options after merging CLI arguments over the config file.
#[derive(Debug)]
pub struct ResolvedConfig {
    pub files: Vec<PathBuf>,
    pub options: BumpOptions,
}

impl ResolvedConfig {
    /// Loads the config file named by `--config`, or `bumpup.toml` if it exists, then merges.
    pub fn resolve(args: &Arguments) -> Result<Self, ConfigError> {
        let config = match &args.config {
            Some(path) => ConfigFile::load(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => ConfigFile::load(DEFAULT_CONFIG_FILE)?,
            None => ConfigFile::default(),
        };
        Self::merge(args, config)
    }

    pub fn merge(args: &Arguments, config: ConfigFile) -> Result<Self, ConfigError> {
        let mut options = BumpOptions::default()
            .with_release(args.release.or(config.release).unwrap_or_default())
            .with_normalize(!args.no_normalize && config.normalize.unwrap_or(true));
        if let Some(dateformat) = args.date_format.clone().or(config.dateformat) {
            options = options.with_dateformat(dateformat);
        }
        options.timestamp = args.timestamp;

        for (field, kind) in config.setters {
            let setter = kind
                .into_setter()
                .map_err(|source| ConfigError::InvalidSetter { field: field.clone(), source })?;
            options.setters.push((field, setter));
        }
        options.validate()?;

        let files = if args.files.is_empty() {
            config.files.map(Vec::from).unwrap_or_default()
        } else {
            args.files.clone()
        };

        debug!("Resolved files: {:?}", files);
        debug!("Resolved options: {:?}", options);
        Ok(ResolvedConfig { files, options })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(contents: &str) -> ConfigFile {
        toml::from_str(contents).unwrap()
    }

    #[test]
    fn test_files_single_path() {
        let config = parse(r#"files = "package.json""#);
        let files: Vec<PathBuf> = config.files.unwrap().into();
        assert_eq!(files, vec![PathBuf::from("package.json")]);
    }

    #[test]
    fn test_files_list_keeps_order() {
        let config = parse(r#"files = ["b.json", "a.json"]"#);
        let files: Vec<PathBuf> = config.files.unwrap().into();
        assert_eq!(files, vec![PathBuf::from("b.json"), PathBuf::from("a.json")]);
    }

    #[test]
    fn test_full_config() {
        let config = parse(
            r#"
files = ["package.json"]
release = "MINOR"
dateformat = "%Y-%m-%d %H:%M"
normalize = false

[setters]
timestamp = { kind = "timestamp" }
buildNumber = { kind = "increment", step = 5 }
"#,
        );
        assert_eq!(config.release, Some(ReleaseType::Minor));
        assert_eq!(config.dateformat.as_deref(), Some("%Y-%m-%d %H:%M"));
        assert_eq!(config.normalize, Some(false));
        assert_eq!(config.setters["timestamp"], SetterKind::Timestamp);
        assert_eq!(config.setters["buildNumber"], SetterKind::Increment { step: 5 });
    }

    #[test]
    fn test_invalid_release_in_config() {
        let err = toml::from_str::<ConfigFile>(r#"release = "huge""#).unwrap_err();
        assert!(err.to_string().contains("not a valid release type"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(toml::from_str::<ConfigFile>(r#"colour = "blue""#).is_err());
    }

    #[test]
    fn test_defaults() {
        let options = BumpOptions::default();
        assert_eq!(options.release, ReleaseType::Patch);
        assert_eq!(options.dateformat, DEFAULT_DATE_FORMAT);
        assert!(options.normalize);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_invalid_date_format() {
        let options = BumpOptions::default().with_dateformat("%Q");
        assert!(matches!(options.validate(), Err(ConfigError::InvalidDateFormat(_))));
    }

    #[test]
    fn test_merge_cli_overrides_config() {
        let args = Arguments::parse_from(["bumpup", "major", "-f", "a.json", "--no-normalize", "-d", "%Y"]);
        let config = parse(
            r#"
files = ["b.json"]
release = "minor"
dateformat = "%m"
normalize = true
"#,
        );
        let resolved = ResolvedConfig::merge(&args, config).unwrap();
        assert_eq!(resolved.files, vec![PathBuf::from("a.json")]);
        assert_eq!(resolved.options.release, ReleaseType::Major);
        assert_eq!(resolved.options.dateformat, "%Y");
        assert!(!resolved.options.normalize);
    }

    #[test]
    fn test_merge_falls_back_to_config() {
        let args = Arguments::parse_from(["bumpup"]);
        let config = parse(
            r#"
files = "b.json"
release = "build"
normalize = false

[setters]
stamp = { kind = "timestamp" }
"#,
        );
        let resolved = ResolvedConfig::merge(&args, config).unwrap();
        assert_eq!(resolved.files, vec![PathBuf::from("b.json")]);
        assert_eq!(resolved.options.release, ReleaseType::Build);
        assert_eq!(resolved.options.dateformat, DEFAULT_DATE_FORMAT);
        assert!(!resolved.options.normalize);
        assert_eq!(resolved.options.setters.len(), 1);
        assert_eq!(resolved.options.setters[0].0, "stamp");
    }

    #[test]
    fn test_merge_rejects_invalid_setter() {
        let args = Arguments::parse_from(["bumpup"]);
        let config = parse(
            r#"
[setters]
built = { kind = "date", format = "%Q" }
"#,
        );
        let err = ResolvedConfig::merge(&args, config).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSetter { ref field, .. } if field == "built"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = ConfigFile::load("/definitely/not/here/bumpup.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
