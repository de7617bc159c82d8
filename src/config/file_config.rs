use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub projects_dir: Option<String>,
    pub project: Option<String>,
    pub log_level: Option<String>,

    // Feature configs
    pub journal: Option<JournalConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct JournalConfig {
    pub snapshots_enabled: Option<bool>,
    /// Oldest snapshots beyond this count are pruned, 0 keeps all of them.
    pub max_snapshots: Option<usize>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_full_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
projects_dir = "/srv/takes"
project = "pilot"
log_level = "debug"

[journal]
snapshots_enabled = false
max_snapshots = 10
"#
        )
        .unwrap();

        let config = FileConfig::load(file.path()).unwrap();
        assert_eq!(config.projects_dir.as_deref(), Some("/srv/takes"));
        assert_eq!(config.project.as_deref(), Some("pilot"));
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        let journal = config.journal.unwrap();
        assert_eq!(journal.snapshots_enabled, Some(false));
        assert_eq!(journal.max_snapshots, Some(10));
    }

    #[test]
    fn test_load_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = FileConfig::load(file.path()).unwrap();
        assert!(config.projects_dir.is_none());
        assert!(config.journal.is_none());
    }

    #[test]
    fn test_load_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "projects_dir = [").unwrap();
        let err = FileConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
