//! Manifest egress: rendering and writing

use crate::error::ManifestError;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use std::path::Path;

/// Renders a manifest back to text
pub trait ManifestFormatter: Send + Sync {
    /// Render `package_json`
    fn format(&self, package_json: &Value) -> Result<String, ManifestError>;
}

/// Pretty JSON with a trailing newline
#[derive(Debug, Clone, Copy)]
pub struct JsonManifestFormatter {
    indent: usize,
}

impl JsonManifestFormatter {
    /// Create formatter indenting with `indent` spaces
    #[inline]
    #[must_use]
    pub fn new(indent: usize) -> Self {
        Self { indent }
    }
}

impl Default for JsonManifestFormatter {
    fn default() -> Self {
        Self::new(2)
    }
}

impl ManifestFormatter for JsonManifestFormatter {
    fn format(&self, package_json: &Value) -> Result<String, ManifestError> {
        let indent = " ".repeat(self.indent);
        let mut buf = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(indent.as_bytes()));
        package_json
            .serialize(&mut serializer)
            .map_err(ManifestError::Format)?;

        let mut text = String::from_utf8_lossy(&buf).into_owned();
        text.push('\n');
        Ok(text)
    }
}

/// Persists rendered manifest text
#[async_trait]
pub trait ManifestWriter: Send + Sync {
    /// Write `contents` to `path`
    async fn write(&self, path: &Path, contents: &str) -> Result<(), ManifestError>;
}

/// Writes straight to the filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FsManifestWriter;

#[async_trait]
impl ManifestWriter for FsManifestWriter {
    async fn write(&self, path: &Path, contents: &str) -> Result<(), ManifestError> {
        tokio::fs::write(path, contents)
            .await
            .map_err(|e| ManifestError::io_error(path, e))?;
        tracing::debug!(path = %path.display(), bytes = contents.len(), "manifest written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn formats_with_two_space_indent_and_newline() {
        let text = JsonManifestFormatter::default()
            .format(&json!({"name": "svc", "skuba": {"version": "1.2.0"}}))
            .unwrap();
        assert_eq!(
            text,
            "{\n  \"name\": \"svc\",\n  \"skuba\": {\n    \"version\": \"1.2.0\"\n  }\n}\n"
        );
    }

    #[test]
    fn custom_indent() {
        let text = JsonManifestFormatter::new(4).format(&json!({"a": 1})).unwrap();
        assert_eq!(text, "{\n    \"a\": 1\n}\n");
    }

    #[tokio::test]
    async fn fs_writer_writes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("package.json");

        FsManifestWriter.write(&path, "{}\n").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}\n");
    }

    #[tokio::test]
    async fn fs_writer_reports_missing_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing/package.json");

        let result = FsManifestWriter.write(&path, "{}").await;
        assert!(matches!(result, Err(ManifestError::Io { .. })));
    }
}
