//! The exiftool subprocess boundary.
//!
//! `MetadataTool` is the seam tests and alternative tools plug into; the
//! real implementation shells out to exiftool, reading with `-j` (JSON) and
//! writing back with `-overwrite_original_in_place`. Missing fields in the
//! tool's output are explicit `None`s, never string-search hits.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;

use super::error::PipelineError;

pub const TOOL_BIN: &str = "exiftool";

/// Fields reported by the metadata tool for one file. Any of them may be
/// absent; absent fields fall back to filename-derived values downstream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolFields {
    pub title: Option<String>,
    pub year: Option<String>,
    pub category: Option<String>,
}

/// Fields stamped back into an organized copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFields {
    pub title: String,
    pub year: String,
    pub category: String,
}

#[async_trait]
pub trait MetadataTool: Send + Sync {
    /// Read title/year/category from a file. A tool failure is an error;
    /// a clean run with missing fields is not.
    async fn read_fields(&self, path: &Path) -> Result<ToolFields, PipelineError>;

    /// Stamp title/year/category into the file in place.
    async fn write_fields(&self, path: &Path, fields: &WrittenFields)
        -> Result<(), PipelineError>;
}

/// The real exiftool subprocess wrapper.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExifTool;

impl ExifTool {
    /// Probe for exiftool on the PATH. Called before any destructive action
    /// so a missing tool surfaces as a startup error, not a mid-run one.
    pub async fn ensure_available() -> Result<(), PipelineError> {
        let status = Command::new(TOOL_BIN)
            .arg("-ver")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(s) if s.success() => Ok(()),
            _ => Err(PipelineError::ToolMissing(TOOL_BIN.to_string())),
        }
    }
}

#[async_trait]
impl MetadataTool for ExifTool {
    async fn read_fields(&self, path: &Path) -> Result<ToolFields, PipelineError> {
        let output = Command::new(TOOL_BIN)
            .args(["-j", "-Title", "-Year", "-Category"])
            .arg(path)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| PipelineError::Tool(format!("failed to spawn {TOOL_BIN}: {e}")))?;

        if !output.status.success() {
            return Err(PipelineError::Tool(format!(
                "{TOOL_BIN} exited with {} for {}",
                output.status,
                path.display()
            )));
        }

        parse_tool_output(&output.stdout)
    }

    async fn write_fields(
        &self,
        path: &Path,
        fields: &WrittenFields,
    ) -> Result<(), PipelineError> {
        let output = Command::new(TOOL_BIN)
            .args(["-charset", "utf8"])
            .arg(format!("-Title={}", fields.title))
            .arg(format!("-Year={}", fields.year))
            .arg(format!("-Category={}", fields.category))
            .arg("-overwrite_original_in_place")
            .arg(path)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| PipelineError::Tool(format!("failed to spawn {TOOL_BIN}: {e}")))?;

        if !output.status.success() {
            return Err(PipelineError::Tool(format!(
                "{TOOL_BIN} write-back exited with {} for {}: {}",
                output.status,
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

/// Parse exiftool's `-j` output: a one-element JSON array of objects.
/// Numeric values (a bare `"Year": 2021`) are accepted and stringified.
pub(crate) fn parse_tool_output(stdout: &[u8]) -> Result<ToolFields, PipelineError> {
    let value: Value = serde_json::from_slice(stdout)
        .map_err(|e| PipelineError::MalformedOutput(e.to_string()))?;

    let object = value
        .as_array()
        .and_then(|a| a.first())
        .and_then(|v| v.as_object())
        .ok_or_else(|| {
            PipelineError::MalformedOutput("expected a one-element JSON array".to_string())
        })?;

    Ok(ToolFields {
        title: field_string(object, "Title"),
        year: field_string(object, "Year"),
        category: field_string(object, "Category"),
    })
}

fn field_string(object: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    match object.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_three_fields() {
        let raw = br#"[{"SourceFile":"a.pdf","Title":"A Study","Year":"2021","Category":"Articles"}]"#;
        let fields = parse_tool_output(raw).unwrap();
        assert_eq!(fields.title.as_deref(), Some("A Study"));
        assert_eq!(fields.year.as_deref(), Some("2021"));
        assert_eq!(fields.category.as_deref(), Some("Articles"));
    }

    #[test]
    fn missing_fields_are_none() {
        let raw = br#"[{"SourceFile":"a.pdf","Title":"A Study"}]"#;
        let fields = parse_tool_output(raw).unwrap();
        assert_eq!(fields.title.as_deref(), Some("A Study"));
        assert_eq!(fields.year, None);
        assert_eq!(fields.category, None);
    }

    #[test]
    fn numeric_year_is_stringified() {
        let raw = br#"[{"Year":2019}]"#;
        let fields = parse_tool_output(raw).unwrap();
        assert_eq!(fields.year.as_deref(), Some("2019"));
    }

    #[test]
    fn blank_strings_count_as_missing() {
        let raw = br#"[{"Title":"   ","Year":""}]"#;
        let fields = parse_tool_output(raw).unwrap();
        assert_eq!(fields.title, None);
        assert_eq!(fields.year, None);
    }

    #[test]
    fn values_are_trimmed() {
        let raw = br#"[{"Title":"  A Study  "}]"#;
        let fields = parse_tool_output(raw).unwrap();
        assert_eq!(fields.title.as_deref(), Some("A Study"));
    }

    #[test]
    fn empty_array_is_malformed() {
        assert!(matches!(
            parse_tool_output(b"[]"),
            Err(PipelineError::MalformedOutput(_))
        ));
    }

    #[test]
    fn non_json_is_malformed() {
        assert!(matches!(
            parse_tool_output(b"not json at all"),
            Err(PipelineError::MalformedOutput(_))
        ));
    }
}
