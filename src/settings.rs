use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SalesError};
use crate::parser::TableParser;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: String,
    /// Field keys in column order. When set, pastes are mapped by position.
    #[serde(default)]
    pub column_layout: Option<Vec<String>>,
    #[serde(default)]
    pub strict_mode: bool,
    #[serde(default)]
    pub batch_import: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
            column_layout: None,
            strict_mode: false,
            batch_import: false,
        }
    }
}

impl Settings {
    /// Parser configured from the saved column layout and strictness.
    pub fn parser(&self) -> Result<TableParser> {
        let parser = match &self.column_layout {
            Some(layout) if !layout.is_empty() => TableParser::with_positional(layout.as_slice())?,
            _ => TableParser::new(),
        };
        Ok(parser.strict(self.strict_mode))
    }

    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("salestrack.db")
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("salestrack")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("salestrack")
}

pub fn load_settings() -> Settings {
    let path = settings_path();
    if path.exists() {
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_default()
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| SalesError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

pub fn settings_file_exists() -> bool {
    settings_path().exists()
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::columns::ColumnStrategy;

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            data_dir: "/tmp/test".to_string(),
            column_layout: Some(vec!["store".into(), "vendor".into()]),
            strict_mode: true,
            batch_import: true,
        };
        let json = serde_json::to_string_pretty(&settings).unwrap();
        std::fs::write(&path, &json).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let loaded: Settings = serde_json::from_str(&content).unwrap();
        assert_eq!(loaded.data_dir, "/tmp/test");
        assert_eq!(loaded.column_layout.as_deref().map(|l| l.len()), Some(2));
        assert!(loaded.strict_mode);
        assert!(loaded.batch_import);
    }

    #[test]
    fn test_load_merges_with_defaults() {
        let json = r#"{"data_dir": "/tmp/test"}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert!(s.column_layout.is_none());
        assert!(!s.strict_mode);
        assert!(!s.batch_import);
    }

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert!(!s.data_dir.is_empty());
        assert!(s.db_path().ends_with("salestrack.db"));
    }

    #[test]
    fn test_parser_from_settings() {
        let header = Settings::default().parser().unwrap();
        assert_eq!(header.strategy(), &ColumnStrategy::HeaderMatch { strict: false });

        let strict = Settings {
            strict_mode: true,
            ..Default::default()
        };
        assert_eq!(strict.parser().unwrap().strategy(), &ColumnStrategy::HeaderMatch { strict: true });

        let positional = Settings {
            column_layout: Some(vec!["store".into(), "Sale Price".into()]),
            ..Default::default()
        };
        assert!(matches!(positional.parser().unwrap().strategy(), ColumnStrategy::Positional(f) if f.len() == 2));

        let bad = Settings {
            column_layout: Some(vec!["bogus".into()]),
            ..Default::default()
        };
        assert!(matches!(bad.parser(), Err(SalesError::UnknownField(_))));
    }

    #[test]
    fn test_shellexpand_tilde() {
        if let Some(home) = dirs::home_dir() {
            let expanded = shellexpand_path("~/sales");
            assert!(expanded.starts_with(&*home.to_string_lossy()));
        }
    }
}
