//! Reads raw corpus records from a directory of JSON files

use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use larder_core::Result;

/// A file or entry that could not be turned into a record
#[derive(Debug, Clone, PartialEq)]
pub struct LoadFailure {
    pub source: String,
    pub reason: String,
}

/// Records read from the ingestion source, plus what was skipped
#[derive(Debug, Default)]
pub struct LoadedRecords {
    pub records: Vec<Map<String, Value>>,
    pub failures: Vec<LoadFailure>,
}

/// Read every `*.json` file directly under `dir`, in file name order.
///
/// A file holds one JSON object or an array of objects. Unreadable files and
/// non-object entries are skipped and listed in `failures`; only a missing or
/// unreadable directory is an error.
pub async fn load_records(dir: &Path) -> Result<LoadedRecords> {
    let mut paths: Vec<PathBuf> = Vec::new();
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    let mut loaded = LoadedRecords::default();
    for path in paths {
        let source = path.display().to_string();

        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) => {
                loaded.failures.push(LoadFailure { source, reason: e.to_string() });
                continue;
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(record)) => loaded.records.push(record),
            Ok(Value::Array(items)) => {
                for (i, item) in items.into_iter().enumerate() {
                    match item {
                        Value::Object(record) => loaded.records.push(record),
                        other => loaded.failures.push(LoadFailure {
                            source: format!("{}[{}]", source, i),
                            reason: format!("expected an object, found {}", kind(&other)),
                        }),
                    }
                }
            }
            Ok(other) => loaded.failures.push(LoadFailure {
                source,
                reason: format!("expected an object or array, found {}", kind(&other)),
            }),
            Err(e) => loaded.failures.push(LoadFailure {
                source,
                reason: format!("invalid JSON: {}", e),
            }),
        }
    }

    debug!(
        dir = %dir.display(),
        records = loaded.records.len(),
        skipped = loaded.failures.len(),
        "loaded corpus records"
    );
    Ok(loaded)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
