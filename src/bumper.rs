use chrono::Utc;
use log::{debug, info, warn};
use semver::Version;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::{BumpOptions, ConfigError};
use crate::indentation::{detect_indentation, to_json_string};
use crate::setters::{FieldChange, FieldWarning, SetterContext, SetterRegistry, display_value};

#[derive(Debug, Error)]
pub enum FileError {
    #[error("Couldn't read \"{}\": {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Couldn't inspect indentation of \"{}\": {source}", .path.display())]
    Indentation {
        path: PathBuf,
        #[source]
        source: regex::Error,
    },
    #[error("Couldn't parse \"{}\" as JSON: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("\"{}\" does not contain a JSON object", .0.display())]
    NotAnObject(PathBuf),
    #[error("Couldn't serialize \"{}\": {source}", .path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Couldn't write to \"{}\": {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug)]
pub enum FileStatus {
    /// The path does not exist; nothing was read or written.
    Missing,
    Bumped {
        changes: Vec<FieldChange>,
        warnings: Vec<FieldWarning>,
    },
    /// The file was left as it was before the failing step.
    Failed(FileError),
}

#[derive(Debug)]
pub struct FileReport {
    pub path: PathBuf,
    pub status: FileStatus,
}

impl FileReport {
    /// The new value written to `field`, if it changed.
    pub fn change(&self, field: &str) -> Option<&Value> {
        match &self.status {
            FileStatus::Bumped { changes, .. } => changes
                .iter()
                .find(|change| change.field == field)
                .map(|change| &change.value),
            _ => None,
        }
    }

    pub fn warnings(&self) -> &[FieldWarning] {
        match &self.status {
            FileStatus::Bumped { warnings, .. } => warnings.as_slice(),
            _ => &[],
        }
    }
}

/// Per-file outcomes of one `bump` call, in input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub files: Vec<FileReport>,
    version: Option<Version>,
}

impl BatchReport {
    /// The normalized version, or the last version computed when normalization is off.
    pub fn version(&self) -> Option<&Version> {
        self.version.as_ref()
    }

    pub fn bumped(&self) -> impl Iterator<Item = &FileReport> {
        self.files
            .iter()
            .filter(|file| matches!(file.status, FileStatus::Bumped { .. }))
    }

    pub fn failed(&self) -> impl Iterator<Item = &FileReport> {
        self.files
            .iter()
            .filter(|file| matches!(file.status, FileStatus::Failed(_)))
    }

    pub fn missing(&self) -> impl Iterator<Item = &FileReport> {
        self.files
            .iter()
            .filter(|file| matches!(file.status, FileStatus::Missing))
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Bumps `version`, `date` and any custom fields in every file of `files`, in order.
///
/// Only invalid options abort, and they do so before any file is touched. Missing,
/// unreadable, malformed or unwritable files are logged and recorded in the report.
pub fn bump<P: AsRef<Path>>(files: &[P], options: BumpOptions) -> Result<BatchReport, ConfigError> {
    options.validate()?;

    if files.is_empty() {
        warn!("Nothing to bump up.");
        return Ok(BatchReport::default());
    }

    let BumpOptions {
        release,
        dateformat,
        normalize,
        timestamp,
        setters,
    } = options;

    let mut registry = SetterRegistry::with_builtins();
    for (field, setter) in setters {
        registry.register(field, setter);
    }

    let now = timestamp.unwrap_or_else(Utc::now);
    debug!("Bumping {} file(s) with release type '{}' at {}", files.len(), release, now);
    let mut ctx = SetterContext::new(release, normalize, now, dateformat);
    let mut report = BatchReport::default();

    for path in files {
        let path = path.as_ref();
        let status = if !path.exists() {
            warn!("File \"{}\" not found.", path.display());
            FileStatus::Missing
        } else {
            match bump_file(path, &registry, &mut ctx) {
                Ok(status) => status,
                Err(error) => {
                    warn!("{}", error);
                    FileStatus::Failed(error)
                }
            }
        };
        report.files.push(FileReport {
            path: path.to_path_buf(),
            status,
        });
    }

    report.version = ctx.resulting_version().cloned();
    let bumped = report.bumped().count();
    match report.version() {
        Some(version) => info!("Bumped {} of {} file(s) to version {}", bumped, files.len(), version),
        None => info!("Bumped {} of {} file(s), no version computed", bumped, files.len()),
    }

    Ok(report)
}

fn bump_file(path: &Path, registry: &SetterRegistry, ctx: &mut SetterContext) -> Result<FileStatus, FileError> {
    debug!("Reading file: '{}'", path.display());
    let contents = fs::read_to_string(path).map_err(|source| FileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let contents = contents.strip_prefix('\u{feff}').unwrap_or(&contents);

    let indentation = detect_indentation(contents).map_err(|source| FileError::Indentation {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Detected indentation {:?} in '{}'", indentation, path.display());

    let document = serde_json::from_str::<Value>(contents).map_err(|source| FileError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    let Value::Object(mut document) = document else {
        return Err(FileError::NotAnObject(path.to_path_buf()));
    };

    let applied = registry.apply(&mut document, ctx);
    for change in &applied.changes {
        info!(
            "Bumping \"{}\" {} to: {}",
            path.display(),
            change.field,
            display_value(&change.value)
        );
    }
    for warning in &applied.warnings {
        warn!(
            "Couldn't bump {} in \"{}\": {}",
            warning.field,
            path.display(),
            warning.error
        );
    }

    let output = to_json_string(&Value::Object(document), indentation.as_deref()).map_err(|source| {
        FileError::Serialize {
            path: path.to_path_buf(),
            source,
        }
    })?;
    fs::write(path, output).map_err(|source| FileError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(FileStatus::Bumped {
        changes: applied.changes,
        warnings: applied.warnings,
    })
}
