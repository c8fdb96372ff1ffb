use log::debug;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use serde_json::ser::{PrettyFormatter, Serializer};

fn tab_runs_regex() -> Result<Regex, regex::Error> {
    Regex::new(r"(?m)^\t+")
}

fn space_runs_regex() -> Result<Regex, regex::Error> {
    Regex::new(r"(?m)^ +")
}

/// Detects the indentation unit used by a JSON document.
///
/// Leading tab runs and leading space runs are counted independently; the more
/// common kind wins, ties go to spaces, and the shortest run of the winner is
/// returned. `None` means no line is indented and the document should be written
/// compact.
pub fn detect_indentation(text: &str) -> Result<Option<String>, regex::Error> {
    let tabs: Vec<&str> = tab_runs_regex()?.find_iter(text).map(|m| m.as_str()).collect();
    let spaces: Vec<&str> = space_runs_regex()?.find_iter(text).map(|m| m.as_str()).collect();
    debug!("Found {} tab and {} space indented line(s)", tabs.len(), spaces.len());

    let prevalent = if tabs.len() > spaces.len() { tabs } else { spaces };
    Ok(prevalent
        .into_iter()
        .min_by_key(|run| run.len())
        .map(str::to_string))
}

/// Serializes `value`, pretty-printed with `indentation` or compact when there is none.
pub fn to_json_string(value: &Value, indentation: Option<&str>) -> serde_json::Result<String> {
    match indentation.filter(|unit| !unit.is_empty()) {
        None => serde_json::to_string(value),
        Some(unit) => {
            let mut buffer = Vec::new();
            let formatter = PrettyFormatter::with_indent(unit.as_bytes());
            let mut serializer = Serializer::with_formatter(&mut buffer, formatter);
            value.serialize(&mut serializer)?;
            Ok(String::from_utf8_lossy(&buffer).into_owned())
        }
    }
}
