//! Configuration module for quiz-game.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values.

use crate::address::DEFAULT_INFO_FILE;
use crate::quiz::{default_questions, Question};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::PathBuf;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "quiz-game")]
#[command(author = "quiz-game authors")]
#[command(version = "0.1.0")]
#[command(about = "A line-oriented TCP quiz server and console client", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Two-line server address file (host, then port)
    #[arg(short, long, global = true)]
    pub info_file: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub mode: ModeArgs,
}

#[derive(Subcommand, Debug)]
pub enum ModeArgs {
    /// Run the quiz server
    Server {
        /// Number of worker threads (defaults to number of CPU cores)
        #[arg(short = 'w', long)]
        workers: Option<usize>,
    },
    /// Connect to a quiz server and play from the console
    Client,
}

/// Which endpoint this process runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Server,
    Client,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub quiz: QuizConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server-related configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address file shared by server and client
    #[serde(default = "default_info_file")]
    pub info_file: PathBuf,
    /// Number of worker threads
    pub workers: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            info_file: default_info_file(),
            workers: None,
        }
    }
}

/// Question set configuration
#[derive(Debug, Deserialize)]
pub struct QuizConfig {
    #[serde(default = "default_questions")]
    pub questions: Vec<Question>,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            questions: default_questions(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_info_file() -> PathBuf {
    PathBuf::from(DEFAULT_INFO_FILE)
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub mode: Mode,
    pub info_file: PathBuf,
    pub workers: Option<usize>,
    pub log_level: String,
    pub questions: Vec<Question>,
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_args(CliArgs::parse())
    }

    pub fn from_args(cli: CliArgs) -> Result<Self, ConfigError> {
        // Load TOML config if specified
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        if toml_config.quiz.questions.is_empty() {
            return Err(ConfigError::NoQuestions);
        }

        let (mode, workers) = match cli.mode {
            ModeArgs::Server { workers } => (Mode::Server, workers.or(toml_config.server.workers)),
            ModeArgs::Client => (Mode::Client, None),
        };

        // Merge CLI args with TOML config (CLI takes precedence)
        Ok(Config {
            mode,
            info_file: cli.info_file.unwrap_or(toml_config.server.info_file),
            workers,
            log_level: if cli.log_level != "info" {
                cli.log_level
            } else {
                toml_config.logging.level
            },
            questions: toml_config.quiz.questions,
        })
    }

    /// Runtime worker thread count; `None` or 0 means one per CPU core.
    pub fn worker_threads(&self) -> Option<usize> {
        self.workers.filter(|&workers| workers > 0)
    }
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    FileRead(PathBuf, std::io::Error),
    TomlParse(PathBuf, toml::de::Error),
    NoQuestions,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileRead(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::TomlParse(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::NoQuestions => write!(f, "Question list is empty"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_args(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = TomlConfig::default();
        assert_eq!(config.server.info_file, PathBuf::from("server_info.txt"));
        assert_eq!(config.server.workers, None);
        assert_eq!(config.quiz.questions.len(), 5);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_toml_parsing() {
        let toml_str = r#"
            [server]
            info_file = "/etc/quiz/server_info.txt"
            workers = 4

            [[quiz.questions]]
            prompt = "What is 2 + 2?"
            answer = "4"

            [logging]
            level = "debug"
        "#;

        let config: TomlConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.server.info_file,
            PathBuf::from("/etc/quiz/server_info.txt")
        );
        assert_eq!(config.server.workers, Some(4));
        assert_eq!(config.quiz.questions, [Question::new("What is 2 + 2?", "4")]);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_flagless_invocation_matches_defaults() {
        let config = Config::from_args(parse_args(&["quiz-game", "client"])).unwrap();
        assert_eq!(config.mode, Mode::Client);
        assert_eq!(config.info_file, PathBuf::from("server_info.txt"));
        assert_eq!(config.log_level, "info");
        assert_eq!(config.questions, default_questions());
    }

    #[test]
    fn test_cli_overrides_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quiz.toml");
        std::fs::write(
            &path,
            "[server]\nworkers = 2\ninfo_file = \"a.txt\"\n[logging]\nlevel = \"warn\"\n",
        )
        .unwrap();
        let path = path.to_str().unwrap();

        let config = Config::from_args(parse_args(&["quiz-game", "--config", path, "server"])).unwrap();
        assert_eq!(config.mode, Mode::Server);
        assert_eq!(config.workers, Some(2));
        assert_eq!(config.info_file, PathBuf::from("a.txt"));
        assert_eq!(config.log_level, "warn");

        let config = Config::from_args(parse_args(&[
            "quiz-game",
            "--config",
            path,
            "--info-file",
            "b.txt",
            "--log-level",
            "debug",
            "server",
            "-w",
            "8",
        ]))
        .unwrap();
        assert_eq!(config.workers, Some(8));
        assert_eq!(config.info_file, PathBuf::from("b.txt"));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_zero_workers_means_auto() {
        let config = Config::from_args(parse_args(&["quiz-game", "server", "-w", "0"])).unwrap();
        assert_eq!(config.workers, Some(0));
        assert_eq!(config.worker_threads(), None);

        let config = Config::from_args(parse_args(&["quiz-game", "server", "-w", "3"])).unwrap();
        assert_eq!(config.worker_threads(), Some(3));

        let config = Config::from_args(parse_args(&["quiz-game", "server"])).unwrap();
        assert_eq!(config.worker_threads(), None);
    }

    #[test]
    fn test_empty_question_list_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quiz.toml");
        std::fs::write(&path, "[quiz]\nquestions = []\n").unwrap();

        let result = Config::from_args(parse_args(&[
            "quiz-game",
            "--config",
            path.to_str().unwrap(),
            "server",
        ]));
        assert!(matches!(result, Err(ConfigError::NoQuestions)));
    }

    #[test]
    fn test_missing_config_file() {
        let result = Config::from_args(parse_args(&[
            "quiz-game",
            "--config",
            "/nonexistent/quiz.toml",
            "client",
        ]));
        assert!(matches!(result, Err(ConfigError::FileRead(..))));
    }
}
