mod file_config;

pub use file_config::{FileConfig, JournalConfig};

use crate::catalog_store::{JournalSettings, DEFAULT_MAX_SNAPSHOTS};
use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use std::path::{Component, Path, PathBuf};
use tracing::level_filters::LevelFilter;

pub const DEFAULT_PROJECT: &str = "default";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogVerbosity {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogVerbosity {
    pub fn to_filter(self) -> LevelFilter {
        match self {
            LogVerbosity::Error => LevelFilter::ERROR,
            LogVerbosity::Warn => LevelFilter::WARN,
            LogVerbosity::Info => LevelFilter::INFO,
            LogVerbosity::Debug => LevelFilter::DEBUG,
            LogVerbosity::Trace => LevelFilter::TRACE,
        }
    }
}

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub projects_dir: Option<PathBuf>,
    pub project: Option<String>,
    pub max_snapshots: Option<usize>,
    pub no_snapshots: bool,
    pub log_level: LogVerbosity,
}

pub fn parse_path(s: &str) -> Result<PathBuf> {
    let path = PathBuf::from(s);
    if path.is_absolute() {
        return Ok(path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(path))
}

/// Project selection flags shared by both binaries.
#[derive(Args, Debug, Clone, Default)]
pub struct ProjectArgs {
    /// TOML config file; its values override the flags below.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory holding one sub-directory per project.
    #[clap(long, value_parser = parse_path)]
    pub projects_dir: Option<PathBuf>,

    /// Project name, a single directory under the projects directory.
    #[clap(long)]
    pub project: Option<String>,

    /// Number of snapshots kept in the journal, 0 keeps all of them.
    #[clap(long)]
    pub max_snapshots: Option<usize>,

    /// Don't journal snapshots before mutations.
    #[clap(long)]
    pub no_snapshots: bool,

    /// Default log level, LOG_LEVEL takes precedence.
    #[clap(long, value_enum, default_value_t)]
    pub log_level: LogVerbosity,
}

impl ProjectArgs {
    pub fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            projects_dir: self.projects_dir.clone(),
            project: self.project.clone(),
            max_snapshots: self.max_snapshots,
            no_snapshots: self.no_snapshots,
            log_level: self.log_level,
        }
    }

    /// Loads the config file, if any, and resolves it against the flags.
    pub fn resolve(&self) -> Result<AppConfig> {
        let file_config = match &self.config {
            Some(path) => Some(
                FileConfig::load(path)
                    .with_context(|| format!("Could not load config {:?}", path))?,
            ),
            None => None,
        };
        AppConfig::resolve(&self.to_cli_config(), file_config)
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub projects_dir: PathBuf,
    pub project: String,
    pub log_level: LogVerbosity,
    pub journal: JournalSettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let projects_dir = file
            .projects_dir
            .map(PathBuf::from)
            .or_else(|| cli.projects_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("projects_dir must be specified via --projects-dir or in config file")
            })?;

        if !projects_dir.exists() {
            bail!("Projects directory does not exist: {:?}", projects_dir);
        }
        if !projects_dir.is_dir() {
            bail!("projects_dir is not a directory: {:?}", projects_dir);
        }

        let project = file
            .project
            .or_else(|| cli.project.clone())
            .unwrap_or_else(|| DEFAULT_PROJECT.to_string());
        if !is_single_component(&project) {
            bail!("Invalid project name {:?}: must be a single directory name", project);
        }

        let log_level = file
            .log_level
            .and_then(|s| parse_log_level(&s))
            .unwrap_or(cli.log_level);

        let journal_file = file.journal.unwrap_or_default();
        let journal = JournalSettings {
            snapshots_enabled: journal_file.snapshots_enabled.unwrap_or(!cli.no_snapshots),
            max_snapshots: journal_file
                .max_snapshots
                .or(cli.max_snapshots)
                .unwrap_or(DEFAULT_MAX_SNAPSHOTS),
        };

        Ok(Self {
            projects_dir,
            project,
            log_level,
            journal,
        })
    }

    pub fn project_root(&self) -> PathBuf {
        self.projects_dir.join(&self.project)
    }
}

fn is_single_component(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Parses a log level string. Uses clap's ValueEnum trait for parsing.
fn parse_log_level(s: &str) -> Option<LogVerbosity> {
    LogVerbosity::from_str(s, true).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_temp_projects_dir() -> TempDir {
        TempDir::new().unwrap()
    }

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("debug"), Some(LogVerbosity::Debug));
        assert_eq!(parse_log_level("WARN"), Some(LogVerbosity::Warn));
        assert!(parse_log_level("loud").is_none());
    }

    #[test]
    fn test_resolve_cli_only() {
        let temp_dir = make_temp_projects_dir();
        let cli = CliConfig {
            projects_dir: Some(temp_dir.path().to_path_buf()),
            project: Some("pilot".to_string()),
            max_snapshots: Some(5),
            no_snapshots: true,
            log_level: LogVerbosity::Debug,
        };

        let config = AppConfig::resolve(&cli, None).unwrap();

        assert_eq!(config.projects_dir, temp_dir.path());
        assert_eq!(config.project, "pilot");
        assert_eq!(config.project_root(), temp_dir.path().join("pilot"));
        assert_eq!(config.log_level, LogVerbosity::Debug);
        assert!(!config.journal.snapshots_enabled);
        assert_eq!(config.journal.max_snapshots, 5);
    }

    #[test]
    fn test_resolve_defaults() {
        let temp_dir = make_temp_projects_dir();
        let cli = CliConfig {
            projects_dir: Some(temp_dir.path().to_path_buf()),
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli, None).unwrap();
        assert_eq!(config.project, DEFAULT_PROJECT);
        assert_eq!(config.log_level, LogVerbosity::Info);
        assert_eq!(config.journal, JournalSettings::default());
    }

    #[test]
    fn test_resolve_toml_overrides_cli() {
        let temp_dir = make_temp_projects_dir();
        let cli = CliConfig {
            projects_dir: Some(PathBuf::from("/should/be/overridden")),
            project: Some("cli-project".to_string()),
            max_snapshots: Some(5),
            log_level: LogVerbosity::Warn,
            ..Default::default()
        };

        let file_config = FileConfig {
            projects_dir: Some(temp_dir.path().to_string_lossy().to_string()),
            project: Some("toml-project".to_string()),
            log_level: Some("trace".to_string()),
            journal: Some(JournalConfig {
                snapshots_enabled: Some(false),
                max_snapshots: None,
            }),
        };

        let config = AppConfig::resolve(&cli, Some(file_config)).unwrap();

        // TOML values should override CLI
        assert_eq!(config.projects_dir, temp_dir.path());
        assert_eq!(config.project, "toml-project");
        assert_eq!(config.log_level, LogVerbosity::Trace);
        assert!(!config.journal.snapshots_enabled);
        // CLI value used when TOML doesn't specify
        assert_eq!(config.journal.max_snapshots, 5);
    }

    #[test]
    fn test_resolve_missing_projects_dir_error() {
        let cli = CliConfig::default();
        let result = AppConfig::resolve(&cli, None);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("projects_dir must be specified"));
    }

    #[test]
    fn test_resolve_nonexistent_projects_dir_error() {
        let cli = CliConfig {
            projects_dir: Some(PathBuf::from("/nonexistent/path/that/should/not/exist")),
            ..Default::default()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("does not exist"));
    }

    #[test]
    fn test_resolve_projects_dir_not_directory_error() {
        let temp_file = tempfile::NamedTempFile::new().unwrap();
        let cli = CliConfig {
            projects_dir: Some(temp_file.path().to_path_buf()),
            ..Default::default()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not a directory"));
    }

    #[test]
    fn test_project_args_with_config_file() {
        let temp_dir = make_temp_projects_dir();
        let config_path = temp_dir.path().join("takebin.toml");
        std::fs::write(&config_path, "project = \"from-file\"\n").unwrap();

        let args = ProjectArgs {
            config: Some(config_path),
            projects_dir: Some(temp_dir.path().to_path_buf()),
            project: Some("from-flag".to_string()),
            ..Default::default()
        };
        let config = args.resolve().unwrap();
        assert_eq!(config.project, "from-file");

        let missing = ProjectArgs {
            config: Some(temp_dir.path().join("nope.toml")),
            ..args
        };
        assert!(missing.resolve().is_err());
    }

    #[test]
    fn test_parse_path_makes_relative_paths_absolute() {
        assert!(parse_path("projects").unwrap().is_absolute());
        assert_eq!(parse_path("/srv/takes").unwrap(), PathBuf::from("/srv/takes"));
    }

    #[test]
    fn test_resolve_rejects_unsafe_project_names() {
        let temp_dir = make_temp_projects_dir();
        for name in ["../escape", "a/b", "/abs", "..", ""] {
            let cli = CliConfig {
                projects_dir: Some(temp_dir.path().to_path_buf()),
                project: Some(name.to_string()),
                ..Default::default()
            };
            assert!(
                AppConfig::resolve(&cli, None).is_err(),
                "{:?} should be rejected",
                name
            );
        }
    }
}
