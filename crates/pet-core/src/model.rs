use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

use crate::expression::BUILTIN_EXPRESSIONS;

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ModelSetting {
    file_references: FileReferences,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct FileReferences {
    #[serde(default)]
    expressions: Vec<ExpressionEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ExpressionEntry {
    name: String,
    file: String,
}

/// Read expression names from a `*.model3.json` setting.
///
/// Entries whose expression file is missing next to the setting are skipped,
/// the same way a model loader would skip them.
pub fn load_expression_names(setting_path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(setting_path)
        .with_context(|| format!("Failed to read model setting {}", setting_path.display()))?;
    let setting: ModelSetting = serde_json::from_str(&content)
        .with_context(|| format!("Invalid model setting {}", setting_path.display()))?;

    let model_dir = setting_path.parent().unwrap_or_else(|| Path::new("."));
    let mut names = Vec::new();
    for entry in setting.file_references.expressions {
        if model_dir.join(&entry.file).is_file() {
            names.push(entry.name);
        } else {
            warn!(expression = %entry.name, file = %entry.file, "Expression file missing, skipping");
        }
    }

    info!(count = names.len(), path = %setting_path.display(), "Loaded model expressions");
    Ok(names)
}

/// Expression names for an optional model setting, falling back to the
/// built-in `F01`..`F08` set.
pub fn expression_library(setting_path: Option<&Path>) -> Result<Vec<String>> {
    match setting_path {
        Some(path) => load_expression_names(path),
        None => Ok(BUILTIN_EXPRESSIONS.iter().map(|s| s.to_string()).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SETTING: &str = r#"{
        "Version": 3,
        "FileReferences": {
            "Moc": "Haru.moc3",
            "Expressions": [
                {"Name": "F01", "File": "expressions/F01.exp3.json"},
                {"Name": "F05", "File": "expressions/F05.exp3.json"},
                {"Name": "F09", "File": "expressions/F09.exp3.json"}
            ]
        }
    }"#;

    #[test]
    fn test_load_skips_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("expressions")).unwrap();
        fs::write(dir.path().join("expressions/F01.exp3.json"), "{}").unwrap();
        fs::write(dir.path().join("expressions/F05.exp3.json"), "{}").unwrap();
        let setting = dir.path().join("Haru.model3.json");
        fs::write(&setting, SETTING).unwrap();

        let names = load_expression_names(&setting).unwrap();
        assert_eq!(names, vec!["F01".to_string(), "F05".to_string()]);
    }

    #[test]
    fn test_setting_without_expressions() {
        let dir = tempfile::tempdir().unwrap();
        let setting = dir.path().join("bare.model3.json");
        fs::write(&setting, r#"{"FileReferences": {"Moc": "bare.moc3"}}"#).unwrap();

        assert!(load_expression_names(&setting).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_setting_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let setting = dir.path().join("broken.model3.json");
        fs::write(&setting, "not json").unwrap();

        assert!(load_expression_names(&setting).is_err());
    }

    #[test]
    fn test_builtin_library() {
        let names = expression_library(None).unwrap();
        assert_eq!(names.len(), 8);
        assert_eq!(names[0], "F01");
    }
}
