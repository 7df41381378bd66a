//! Runtime configuration.
//!
//! # Responsibility
//! - Load `RegistrarConfig` from TOML, falling back to the embedded default.
//! - Hold the read-only department/category catalog used by authoring
//!   validation.
//!
//! # Invariants
//! - A loaded config has already passed `validate`.
//! - Catalog lookups are case-insensitive and return the canonical label.

use log::info;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CONFIG: &str = r#"
[database]
path = "data/registrar.db"

[logging]
level = "info"

[verification]
endpoint = "https://challenges.cloudflare.com/turnstile/v0/siteverify"
secret_env = "TURNSTILE_SECRET_KEY"
timeout_ms = 5000

[eligibility]
course_min_age = 18
volunteer_min_age = 16

[catalog]
departments = ["Formación", "Jóvenes", "Familias", "Música", "Misiones"]
event_categories = ["Logística", "Cocina", "Acogida", "Niños", "Técnica"]
"#;

#[derive(Debug, Clone, Deserialize)]
pub struct RegistrarConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    pub verification: VerificationConfig,
    #[serde(default)]
    pub eligibility: EligibilityConfig,
    pub catalog: Catalog,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Absolute directory for rolling log files; `None` leaves logging off.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: None,
        }
    }
}

fn default_log_level() -> String {
    crate::logging::default_log_level().as_str().to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerificationConfig {
    pub endpoint: String,
    /// Name of the environment variable holding the verifier secret.
    pub secret_env: String,
    pub timeout_ms: u64,
}

impl VerificationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Reads the verifier secret from the configured environment variable.
    pub fn secret(&self) -> Result<String, ConfigError> {
        match std::env::var(&self.secret_env) {
            Ok(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(ConfigError::MissingSecret(self.secret_env.clone())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct EligibilityConfig {
    pub course_min_age: u32,
    pub volunteer_min_age: u32,
}

impl Default for EligibilityConfig {
    fn default() -> Self {
        Self {
            course_min_age: 18,
            volunteer_min_age: 16,
        }
    }
}

/// Injected catalog of allowed course departments and event categories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Catalog {
    pub departments: Vec<String>,
    pub event_categories: Vec<String>,
}

impl Catalog {
    pub fn new(departments: Vec<String>, event_categories: Vec<String>) -> Self {
        Self {
            departments,
            event_categories,
        }
    }

    /// Canonical department label matching `input`, if any.
    pub fn resolve_department(&self, input: &str) -> Option<&str> {
        resolve(&self.departments, input)
    }

    /// Canonical event category label matching `input`, if any.
    pub fn resolve_category(&self, input: &str) -> Option<&str> {
        resolve(&self.event_categories, input)
    }
}

fn resolve<'a>(labels: &'a [String], input: &str) -> Option<&'a str> {
    let wanted = input.trim().to_lowercase();
    if wanted.is_empty() {
        return None;
    }
    labels
        .iter()
        .find(|label| label.trim().to_lowercase() == wanted)
        .map(|label| label.trim())
}

#[derive(Debug)]
pub enum ConfigError {
    Read { path: PathBuf, source: std::io::Error },
    Parse(toml::de::Error),
    Invalid(String),
    MissingSecret(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "failed to parse config: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
            Self::MissingSecret(name) => {
                write!(f, "verification secret env var `{name}` is not set")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

impl RegistrarConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Embedded default configuration.
    pub fn embedded_default() -> Result<Self, ConfigError> {
        Self::from_toml_str(DEFAULT_CONFIG)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database.path is empty".to_string()));
        }
        if self.verification.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "verification.endpoint is empty".to_string(),
            ));
        }
        if self.verification.timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "verification.timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.catalog.departments.iter().all(|d| d.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "catalog.departments must not be empty".to_string(),
            ));
        }
        if self
            .catalog
            .event_categories
            .iter()
            .all(|c| c.trim().is_empty())
        {
            return Err(ConfigError::Invalid(
                "catalog.event_categories must not be empty".to_string(),
            ));
        }
        if let Err(err) = crate::logging::LogLevel::parse(&self.logging.level) {
            return Err(ConfigError::Invalid(format!("logging.level: {err}")));
        }
        if let Some(dir) = &self.logging.dir {
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid(format!(
                    "logging.dir must be absolute, got `{}`",
                    dir.display()
                )));
            }
        }
        Ok(())
    }
}

/// Loads config from `path`, or the embedded default when `path` is `None`.
pub fn load_config(path: Option<&Path>) -> Result<RegistrarConfig, ConfigError> {
    let Some(path) = path else {
        info!("event=config_load module=config status=ok source=embedded");
        return RegistrarConfig::embedded_default();
    };

    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config = RegistrarConfig::from_toml_str(&contents)?;
    info!(
        "event=config_load module=config status=ok source=file path={}",
        path.display()
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::{load_config, Catalog, ConfigError, RegistrarConfig};
    use std::io::Write;

    #[test]
    fn embedded_default_is_valid() {
        let config = RegistrarConfig::embedded_default().unwrap();
        assert_eq!(config.eligibility.course_min_age, 18);
        assert_eq!(config.eligibility.volunteer_min_age, 16);
        assert_eq!(config.verification.timeout().as_millis(), 5000);
        assert!(config.logging.dir.is_none());
    }

    #[test]
    fn catalog_lookup_is_case_insensitive_and_canonical() {
        let catalog = Catalog::new(
            vec!["Formación".to_string(), "Música".to_string()],
            vec!["Cocina".to_string()],
        );
        assert_eq!(catalog.resolve_department("  música "), Some("Música"));
        assert_eq!(catalog.resolve_department("FORMACIÓN"), Some("Formación"));
        assert_eq!(catalog.resolve_department("Deportes"), None);
        assert_eq!(catalog.resolve_category("cocina"), Some("Cocina"));
        assert_eq!(catalog.resolve_category(""), None);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = RegistrarConfig::from_toml_str(
            r#"
            [database]
            path = "a.db"
            [verification]
            endpoint = "http://localhost/verify"
            secret_env = "X"
            timeout_ms = 0
            [catalog]
            departments = ["A"]
            event_categories = ["B"]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn empty_catalog_is_rejected() {
        let err = RegistrarConfig::from_toml_str(
            r#"
            [database]
            path = "a.db"
            [verification]
            endpoint = "http://localhost/verify"
            secret_env = "X"
            timeout_ms = 100
            [catalog]
            departments = []
            event_categories = ["B"]
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("departments"));
    }

    #[test]
    fn load_config_reads_file_and_reports_missing_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
            [database]
            path = "custom.db"
            [verification]
            endpoint = "http://localhost/verify"
            secret_env = "REGISTRAR_TEST_SECRET"
            timeout_ms = 250
            [eligibility]
            course_min_age = 21
            volunteer_min_age = 14
            [catalog]
            departments = ["A"]
            event_categories = ["B"]
            "#
        )
        .unwrap();
        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.database.path.to_str(), Some("custom.db"));
        assert_eq!(config.eligibility.course_min_age, 21);

        let missing = load_config(Some(std::path::Path::new("/nonexistent/registrar.toml")));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn missing_secret_env_is_reported_by_name() {
        let config = RegistrarConfig::embedded_default().unwrap();
        let mut verification = config.verification.clone();
        verification.secret_env = "REGISTRAR_SECRET_THAT_IS_NEVER_SET".to_string();
        let err = verification.secret().unwrap_err();
        assert!(err.to_string().contains("REGISTRAR_SECRET_THAT_IS_NEVER_SET"));
    }
}
