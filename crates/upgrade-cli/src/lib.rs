//! Upgrade CLI
//!
//! Argument parsing, configuration layering and exit-code mapping for the
//! `upgrade` binary:
//!
//! ```text
//! upgrade [--project DIR] [--config FILE] [--patches DIR] [--tool-version V]
//!         [--verbose] [--json-logs] <check|apply> [--json]
//! ```
//!
//! Configuration comes from `--config`, else `<project>/upgrade.toml` when
//! present, else defaults. `--patches` and `--tool-version` override the
//! file. A run without any target version fails.

#![warn(unreachable_pub)]

pub mod console;

use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use console::{ConsoleLogger, Stream};
use std::path::PathBuf;
use std::sync::Arc;
use upgrade_catalog::{BuiltinStrategy, PatchCatalog};
use upgrade_core::{Collaborators, MigrationOrchestrator, MigrationResult, UpgradeConfig};
use upgrade_patch::Mode;

/// Configuration file looked up in the project directory
pub const CONFIG_FILE: &str = "upgrade.toml";

/// Exit code for a project with pending patches
pub const EXIT_FIXABLE: i32 = 1;

/// Command-line definition
#[must_use]
pub fn command() -> Command {
    let json = Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Print the result as JSON");

    Command::new("upgrade")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Check and apply versioned project upgrade patches")
        .subcommand_required(true)
        .arg(
            Arg::new("project")
                .long("project")
                .value_name("DIR")
                .default_value(".")
                .value_parser(value_parser!(PathBuf))
                .help("Project directory (package.json is searched upwards)"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("Configuration file"),
        )
        .arg(
            Arg::new("patches")
                .long("patches")
                .value_name("DIR")
                .value_parser(value_parser!(PathBuf))
                .help("Root of the directory-per-version patch catalog"),
        )
        .arg(
            Arg::new("tool-version")
                .long("tool-version")
                .value_name("VERSION")
                .help("Version to upgrade to (overrides tool_version in the config file)"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .action(ArgAction::SetTrue)
                .help("Enable debug diagnostics"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .action(ArgAction::SetTrue)
                .help("Emit diagnostics as JSON"),
        )
        .subcommand(
            Command::new("check")
                .about("Report whether any patches are pending")
                .arg(json.clone()),
        )
        .subcommand(
            Command::new("apply")
                .about("Apply pending patches and advance the recorded version")
                .arg(json),
        )
}

/// Parsed command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Directory the manifest search starts from
    pub project: PathBuf,
    /// Explicit configuration file
    pub config: Option<PathBuf>,
    /// Patch catalog root override
    pub patches: Option<PathBuf>,
    /// Target version override
    pub tool_version: Option<String>,
    /// Debug diagnostics
    pub verbose: bool,
    /// JSON diagnostics
    pub json_logs: bool,
    /// Check or apply
    pub mode: Mode,
    /// Print the result as JSON
    pub json: bool,
}

impl Invocation {
    /// Extract from clap matches
    ///
    /// # Errors
    /// Fails if no known subcommand was given
    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let (mode, sub) = match matches.subcommand() {
            Some(("check", sub)) => (Mode::Check, sub),
            Some(("apply", sub)) => (Mode::Apply, sub),
            Some((other, _)) => bail!("unknown subcommand '{other}'"),
            None => bail!("a subcommand is required"),
        };

        Ok(Self {
            project: matches
                .get_one::<PathBuf>("project")
                .cloned()
                .unwrap_or_else(|| PathBuf::from(".")),
            config: matches.get_one::<PathBuf>("config").cloned(),
            patches: matches.get_one::<PathBuf>("patches").cloned(),
            tool_version: matches.get_one::<String>("tool-version").cloned(),
            verbose: matches.get_flag("verbose"),
            json_logs: matches.get_flag("json-logs"),
            mode,
            json: sub.get_flag("json"),
        })
    }

    /// Parse from an argument list
    ///
    /// # Errors
    /// Fails on invalid arguments
    pub fn parse_from<I, T>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let matches = command().try_get_matches_from(args)?;
        Self::from_matches(&matches)
    }

    /// Default `tracing` filter directive
    #[must_use]
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "warn"
        }
    }

    /// Effective configuration
    ///
    /// # Errors
    /// Fails if a configuration file exists but is invalid, or if an override
    /// is invalid
    pub async fn config(&self) -> Result<UpgradeConfig> {
        let path = match &self.config {
            Some(path) => Some(path.clone()),
            None => {
                let candidate = self.project.join(CONFIG_FILE);
                tokio::fs::try_exists(&candidate)
                    .await
                    .unwrap_or(false)
                    .then_some(candidate)
            }
        };

        let mut config = match path {
            Some(path) => UpgradeConfig::load(&path)
                .await
                .with_context(|| format!("loading {}", path.display()))?,
            None => UpgradeConfig::new(),
        };

        if let Some(patches) = &self.patches {
            config = config.with_patches_dir(patches);
        }
        if let Some(version) = &self.tool_version {
            config = config.with_tool_version(version);
        }
        config.validate()?;
        Ok(config)
    }
}

/// Run the orchestrator for an invocation
///
/// # Errors
/// Fails on configuration, resolution or patch errors
pub async fn run(invocation: &Invocation) -> Result<MigrationResult> {
    let config = invocation.config().await?;
    let tool_version = config
        .tool_version()
        .context("pass --tool-version or set tool_version in the configuration file")?;
    tracing::debug!(
        project = %invocation.project.display(),
        patches = ?config.patches_dir,
        %tool_version,
        "resolved invocation"
    );

    // Keep stdout clean for the JSON result
    let stream = if invocation.json { Stream::Stderr } else { Stream::Stdout };
    let logger = Arc::new(ConsoleLogger::detect(stream));

    let catalog = PatchCatalog::with_defaults(
        BuiltinStrategy::new(),
        config.patches_dir.clone(),
        &invocation.project,
    );
    let collaborators =
        Collaborators::filesystem(&invocation.project, tool_version, &config).with_logger(logger);
    let orchestrator = MigrationOrchestrator::new(config, catalog, collaborators);

    orchestrator
        .run(invocation.mode)
        .await
        .with_context(|| format!("{} failed", invocation.mode))
}

/// Process exit code for a result
#[must_use]
pub fn exit_code(result: &MigrationResult) -> i32 {
    if result.ok() {
        0
    } else {
        EXIT_FIXABLE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use upgrade_patch::Version;

    #[test]
    fn parses_global_flags_and_subcommand() {
        let invocation = Invocation::parse_from([
            "upgrade",
            "--project",
            "svc",
            "--patches",
            "patches",
            "--tool-version",
            "2.1.0",
            "-v",
            "check",
            "--json",
        ])
        .unwrap();

        assert_eq!(
            invocation,
            Invocation {
                project: PathBuf::from("svc"),
                config: None,
                patches: Some(PathBuf::from("patches")),
                tool_version: Some("2.1.0".to_string()),
                verbose: true,
                json_logs: false,
                mode: Mode::Check,
                json: true,
            }
        );
        assert_eq!(invocation.log_level(), "debug");
    }

    #[test]
    fn defaults() {
        let invocation = Invocation::parse_from(["upgrade", "apply"]).unwrap();
        assert_eq!(invocation.project, PathBuf::from("."));
        assert_eq!(invocation.mode, Mode::Apply);
        assert!(!invocation.json);
        assert_eq!(invocation.log_level(), "warn");
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Invocation::parse_from(["upgrade"]).is_err());
        assert!(Invocation::parse_from(["upgrade", "migrate"]).is_err());
    }

    #[tokio::test]
    async fn rejects_bad_tool_version() {
        let dir = tempfile::TempDir::new().unwrap();
        let project = dir.path().to_str().unwrap();
        let invocation =
            Invocation::parse_from(["upgrade", "--project", project, "--tool-version", "next", "check"]).unwrap();
        assert!(invocation.config().await.is_err());
    }

    #[tokio::test]
    async fn tool_version_flag_overrides_config_file() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "tool_version = \"1.5.0\"\n").unwrap();
        let project = dir.path().to_str().unwrap();

        let invocation = Invocation::parse_from(["upgrade", "--project", project, "check"]).unwrap();
        assert_eq!(invocation.config().await.unwrap().tool_version().unwrap(), Version::new(1, 5, 0));

        let invocation =
            Invocation::parse_from(["upgrade", "--project", project, "--tool-version", "2.0.0", "check"]).unwrap();
        assert_eq!(invocation.config().await.unwrap().tool_version().unwrap(), Version::new(2, 0, 0));
    }

    #[tokio::test]
    async fn run_without_tool_version_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("package.json"), r#"{"name": "svc"}"#).unwrap();
        let project = dir.path().to_str().unwrap();

        let invocation = Invocation::parse_from(["upgrade", "--project", project, "check"]).unwrap();
        let err = run(&invocation).await.unwrap_err();
        assert!(format!("{err:#}").contains("no tool version configured"));
    }

    #[tokio::test]
    async fn apply_runs_pending_index_patch() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("package.json"),
            r#"{"name": "svc", "skuba": {"version": "1.0.0"}}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "tool_version = \"1.1.0\"\npatches_dir = \"patches\"\n",
        )
        .unwrap();
        let tag = dir.path().join("patches/1.1.0");
        std::fs::create_dir_all(&tag).unwrap();
        std::fs::write(
            tag.join("index.json"),
            r#"{"patches":[{"description":"Add .nvmrc","action":"write_file","path":".nvmrc","contents":"20\n"}]}"#,
        )
        .unwrap();

        let project = dir.path().to_str().unwrap();
        let invocation = Invocation::parse_from(["upgrade", "--project", project, "apply", "--json"]).unwrap();
        let result = run(&invocation).await.unwrap();

        assert!(matches!(result, MigrationResult::Applied { .. }));
        assert_eq!(std::fs::read_to_string(dir.path().join(".nvmrc")).unwrap(), "20\n");
    }

    #[tokio::test]
    async fn project_config_file_is_picked_up_and_overridden() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "tool_name = \"acme\"\npatches_dir = \"from-file\"\n",
        )
        .unwrap();

        let project = dir.path().to_str().unwrap();
        let invocation = Invocation::parse_from(["upgrade", "--project", project, "check"]).unwrap();
        let config = invocation.config().await.unwrap();
        assert_eq!(config.tool_name, "acme");
        assert_eq!(config.patches_dir, Some(dir.path().join("from-file")));

        let invocation =
            Invocation::parse_from(["upgrade", "--project", project, "--patches", "cli", "check"]).unwrap();
        assert_eq!(invocation.config().await.unwrap().patches_dir, Some(PathBuf::from("cli")));
    }

    #[tokio::test]
    async fn missing_explicit_config_is_an_error() {
        let invocation = Invocation::parse_from(["upgrade", "--config", "/nonexistent/upgrade.toml", "check"]).unwrap();
        assert!(invocation.config().await.is_err());
    }

    #[test]
    fn fixable_exits_nonzero() {
        assert_eq!(exit_code(&MigrationResult::UpToDate), 0);
        assert_eq!(exit_code(&MigrationResult::Applied { reports: vec![] }), 0);
        assert_eq!(
            exit_code(&MigrationResult::Fixable { annotations: vec![] }),
            EXIT_FIXABLE
        );
    }
}
