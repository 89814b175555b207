//! `qualia.toml`: which checkers run, how they run, and how the engine logs.

mod diagnostics;
mod schema;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Once;

use qualia_check::{CheckOptions, CheckRun};
use qualia_checkers::{builtin, BuiltinError, BUILTIN_CHECKERS};
use qualia_factory::{CheckerOptions, CheckerSet, QualifierChecker};
use qualia_flow::FlowConfig;
use qualia_hierarchy::MalformedHierarchy;
use qualia_hir::Program;
use qualia_types::{ArrayCovariance, DefaultPrecedence, TypeStore};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::diagnostics::{ConfigDiagnostics, ConfigWarning};
pub use crate::schema::json_schema;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[schemars(deny_unknown_fields)]
pub struct QualiaConfig {
    #[serde(default)]
    pub checking: CheckingConfig,

    /// Per-checker policy overrides, keyed by checker name.
    #[serde(default)]
    pub checker: BTreeMap<String, CheckerOverrides>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[schemars(deny_unknown_fields)]
pub struct CheckingConfig {
    /// Built-in checkers to compose, in registration order.
    #[serde(default = "CheckingConfig::default_checkers")]
    pub checkers: Vec<String>,

    /// Refine routines in parallel.
    #[serde(default = "default_true")]
    pub parallel_flow: bool,

    /// Per-routine limit on dataflow block visits. Unset derives one from the
    /// routine's size and the lattice heights.
    #[serde(default)]
    #[schemars(range(min = 1))]
    pub max_block_visits: Option<usize>,

    /// Report casts that may be unsafe as warnings.
    #[serde(default = "default_true")]
    pub report_unsafe_casts: bool,
}

impl CheckingConfig {
    fn default_checkers() -> Vec<String> {
        vec!["nullness".to_owned()]
    }
}

impl Default for CheckingConfig {
    fn default() -> Self {
        Self {
            checkers: Self::default_checkers(),
            parallel_flow: true,
            max_block_visits: None,
            report_unsafe_casts: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Unset fields keep the checker's own choice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[schemars(deny_unknown_fields)]
pub struct CheckerOverrides {
    #[serde(default)]
    pub array_covariance: Option<ArrayCovariance>,
    #[serde(default)]
    pub default_precedence: Option<DefaultPrecedence>,
}

impl CheckerOverrides {
    fn apply(&self, mut options: CheckerOptions) -> CheckerOptions {
        if let Some(covariance) = self.array_covariance {
            options.array_covariance = covariance;
        }
        if let Some(precedence) = self.default_precedence {
            options.default_precedence = precedence;
        }
        options
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[schemars(deny_unknown_fields)]
pub struct LoggingConfig {
    /// A level (`info`, `debug`, ...) or a full `EnvFilter` directive string.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,

    /// Emit logs as JSON lines.
    #[serde(default)]
    pub json: bool,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_owned()
    }

    pub(crate) fn normalize_level(input: &str) -> String {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Self::default_level();
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "trace" => "trace".to_owned(),
            "debug" => "debug".to_owned(),
            "info" => "info".to_owned(),
            "warn" | "warning" => "warn".to_owned(),
            "error" => "error".to_owned(),
            _ => trimmed.to_owned(),
        }
    }

    fn config_env_filter(&self) -> tracing_subscriber::EnvFilter {
        tracing_subscriber::EnvFilter::try_new(Self::normalize_level(&self.level)).unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::default()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
        })
    }

    /// Effective filter: the configured level, with `RUST_LOG` merged on top.
    pub fn env_filter(&self) -> tracing_subscriber::EnvFilter {
        let env_directives = std::env::var("RUST_LOG")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());
        match env_directives {
            Some(env_directives) => {
                let combined = format!("{},{env_directives}", Self::normalize_level(&self.level));
                tracing_subscriber::EnvFilter::try_new(combined)
                    .or_else(|_| tracing_subscriber::EnvFilter::try_new(env_directives))
                    .unwrap_or_else(|_| self.config_env_filter())
            }
            None => self.config_env_filter(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
    #[error(transparent)]
    Checker(#[from] BuiltinError),
    #[error(transparent)]
    Hierarchy(#[from] MalformedHierarchy),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        // `Display` embeds a source snippet; keep only the message.
        ConfigError::Toml(err.message().to_owned())
    }
}

impl QualiaConfig {
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::load_from_str(&text)
    }

    pub fn load_from_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Like [`QualiaConfig::load_from_str`], also reporting unknown keys and
    /// settings that will not take effect.
    pub fn load_from_str_with_diagnostics(text: &str) -> Result<(Self, ConfigDiagnostics), ConfigError> {
        let (config, unknown_keys) = diagnostics::deserialize_toml_with_unknown_keys::<QualiaConfig>(text)?;
        let diagnostics = ConfigDiagnostics {
            unknown_keys,
            warnings: config.validate(),
        };
        Ok((config, diagnostics))
    }

    pub fn load_from_path_with_diagnostics(
        path: impl AsRef<Path>,
    ) -> Result<(Self, ConfigDiagnostics), ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::load_from_str_with_diagnostics(&text)
    }

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        for name in &self.checking.checkers {
            if !BUILTIN_CHECKERS.contains(&name.as_str()) {
                warnings.push(ConfigWarning::UnknownChecker { name: name.clone() });
            }
        }
        for name in self.checker.keys() {
            if !self.checking.checkers.contains(name) {
                warnings.push(ConfigWarning::InactiveOverride { name: name.clone() });
            }
        }
        if self.checking.max_block_visits == Some(0) {
            warnings.push(ConfigWarning::InvalidValue {
                toml_path: "checking.max_block_visits".to_owned(),
                message: "must be at least 1; every routine would stop before its first block".to_owned(),
            });
        }
        warnings
    }

    #[must_use]
    pub fn check_options(&self) -> CheckOptions {
        CheckOptions {
            flow: FlowConfig {
                parallel: self.checking.parallel_flow,
                max_block_visits: self.checking.max_block_visits,
            },
            report_unsafe_casts: self.checking.report_unsafe_casts,
        }
    }

    /// Instantiate and compose the configured checkers.
    pub fn checker_set(&self) -> Result<CheckerSet, ConfigError> {
        let mut checkers = Vec::with_capacity(self.checking.checkers.len());
        for name in &self.checking.checkers {
            let checker = builtin(name)?;
            let options = match self.checker.get(name) {
                Some(overrides) => overrides.apply(checker.options()),
                None => checker.options(),
            };
            checkers.push((checker, options));
        }
        Ok(CheckerSet::with_options(checkers)?)
    }

    /// A ready-to-run check over `program`.
    pub fn check_run<'a>(&self, store: &'a TypeStore, program: &'a Program) -> Result<CheckRun<'a>, ConfigError> {
        let checkers = self.checker_set()?;
        tracing::debug!(
            target: "qualia.config",
            checkers = checkers.len(),
            parallel = self.checking.parallel_flow,
            "configured check run"
        );
        Ok(CheckRun::new(store, program, checkers, self.check_options()))
    }
}

static TRACING_INIT: Once = Once::new();

/// Install the global `tracing` subscriber. Only the first call has an effect.
pub fn init_tracing(config: &LoggingConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::Layer;

    TRACING_INIT.call_once(|| {
        let layer: Box<dyn Layer<_> + Send + Sync> = if config.json {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .boxed()
        };
        // Another subscriber may already be installed (e.g. by a test harness).
        let _ = tracing_subscriber::registry()
            .with(config.env_filter())
            .with(layer)
            .try_init();
    });
}
