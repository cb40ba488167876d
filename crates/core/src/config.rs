//! Layered service configuration: built-in defaults, then an optional TOML file (with
//! `${VAR}` interpolation), then `CARBONQUOTE_*` environment variables, then programmatic
//! overrides. The result is validated once, before anything starts.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const ENV_PREFIX: &str = "CARBONQUOTE_";
const DEFAULT_FILE: &str = "carbonquote.toml";

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub quoting: QuotingConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct QuotingConfig {
    pub base_currency: String,
    pub default_transaction_amount: Decimal,
    pub quote_ttl_hours: u32,
    pub kg_co2e_per_tree: Decimal,
    pub storage: StorageBackend,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Where created quotes are persisted. Lookup tables are always served from memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Memory,
    Sqlite,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

/// Values set by the embedding binary; these win over every other layer.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub server_port: Option<u16>,
    pub storage: Option<StorageBackend>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { url: "sqlite://carbonquote.db".to_string(), max_connections: 5, timeout_secs: 30 }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_address: "127.0.0.1".to_string(), port: 8080, graceful_shutdown_secs: 15 }
    }
}

impl Default for QuotingConfig {
    fn default() -> Self {
        Self {
            base_currency: "EUR".to_string(),
            default_transaction_amount: Decimal::from(100),
            quote_ttl_hours: 24,
            kg_co2e_per_tree: Decimal::from(40),
            storage: StorageBackend::Memory,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::Compact }
    }
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(ConfigError::Validation(format!(
                "unsupported quote storage `{other}` (expected memory|sqlite)"
            ))),
        }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = match find_config_file(options.config_path.as_deref()) {
            Some(path) => read_file(&path)?,
            None if options.require_file => {
                let expected = options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_FILE));
                return Err(ConfigError::MissingConfigFile(expected));
            }
            None => Self::default(),
        };

        config.apply_env()?;
        config.apply_overrides(options.overrides);
        config.quoting.base_currency = config.quoting.base_currency.trim().to_ascii_uppercase();
        config.validate()?;

        Ok(config)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        let Self { database, server, quoting, logging } = self;

        env_override(&mut database.url, "DATABASE_URL")?;
        env_override(&mut database.max_connections, "DATABASE_MAX_CONNECTIONS")?;
        env_override(&mut database.timeout_secs, "DATABASE_TIMEOUT_SECS")?;

        env_override(&mut server.bind_address, "SERVER_BIND_ADDRESS")?;
        env_override(&mut server.port, "SERVER_PORT")?;
        env_override(&mut server.graceful_shutdown_secs, "SERVER_GRACEFUL_SHUTDOWN_SECS")?;

        env_override(&mut quoting.base_currency, "QUOTING_BASE_CURRENCY")?;
        let amount = &mut quoting.default_transaction_amount;
        env_override(amount, "QUOTING_DEFAULT_TRANSACTION_AMOUNT")?;
        env_override(&mut quoting.quote_ttl_hours, "QUOTING_QUOTE_TTL_HOURS")?;
        env_override(&mut quoting.kg_co2e_per_tree, "QUOTING_KG_CO2E_PER_TREE")?;
        env_override(&mut quoting.storage, "QUOTING_STORAGE")?;

        // Short aliases first so the sectioned names win when both are set.
        env_override(&mut logging.level, "LOG_LEVEL")?;
        env_override(&mut logging.level, "LOGGING_LEVEL")?;
        env_override(&mut logging.format, "LOG_FORMAT")?;
        env_override(&mut logging.format, "LOGGING_FORMAT")?;

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        let ConfigOverrides { database_url, server_port, storage, log_level } = overrides;
        self.database.url = database_url.unwrap_or_else(|| self.database.url.clone());
        self.server.port = server_port.unwrap_or(self.server.port);
        self.quoting.storage = storage.unwrap_or(self.quoting.storage);
        self.logging.level = log_level.unwrap_or_else(|| self.logging.level.clone());
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let Self { database, server, quoting, logging } = self;

        let url = database.url.trim();
        require(
            url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:",
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)",
        )?;
        require(
            database.max_connections > 0,
            "database.max_connections must be greater than zero",
        )?;
        require(
            (1..=300).contains(&database.timeout_secs),
            "database.timeout_secs must be in range 1..=300",
        )?;

        require(!server.bind_address.trim().is_empty(), "server.bind_address must not be empty")?;
        require(server.port > 0, "server.port must be greater than zero")?;
        require(
            server.graceful_shutdown_secs > 0,
            "server.graceful_shutdown_secs must be greater than zero",
        )?;

        let currency = quoting.base_currency.as_str();
        if currency.len() != 3 || !currency.chars().all(|ch| ch.is_ascii_uppercase()) {
            return Err(ConfigError::Validation(format!(
                "quoting.base_currency must be a three-letter ISO 4217 code, got `{currency}`"
            )));
        }
        require(
            quoting.default_transaction_amount > Decimal::ZERO,
            "quoting.default_transaction_amount must be greater than zero",
        )?;
        require(quoting.quote_ttl_hours > 0, "quoting.quote_ttl_hours must be greater than zero")?;
        require(
            quoting.kg_co2e_per_tree > Decimal::ZERO,
            "quoting.kg_co2e_per_tree must be greater than zero",
        )?;

        require(
            matches!(
                logging.level.trim().to_ascii_lowercase().as_str(),
                "trace" | "debug" | "info" | "warn" | "error"
            ),
            "logging.level must be one of trace|debug|info|warn|error",
        )
    }
}

fn find_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) => path.exists().then(|| path.to_path_buf()),
        None => [PathBuf::from(DEFAULT_FILE), Path::new("config").join(DEFAULT_FILE)]
            .into_iter()
            .find(|path| path.exists()),
    }
}

fn read_file(path: &Path) -> Result<AppConfig, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    toml::from_str(&interpolate_env_vars(&raw)?)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

/// Replaces every `${VAR}` with the value of `VAR`; an unset variable is an error.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some((before, after)) = rest.split_once("${") {
        let (var, tail) = after.split_once('}').ok_or(ConfigError::UnterminatedInterpolation)?;
        let value = env::var(var)
            .map_err(|_| ConfigError::MissingEnvInterpolation { var: var.to_string() })?;
        output.push_str(before);
        output.push_str(&value);
        rest = tail;
    }
    output.push_str(rest);

    Ok(output)
}

/// Overwrites `slot` with `CARBONQUOTE_<name>` when that variable is set and non-blank.
fn env_override<T: FromStr>(slot: &mut T, name: &str) -> Result<(), ConfigError> {
    let key = format!("{ENV_PREFIX}{name}");
    let Some(raw) = env::var(&key).ok().filter(|value| !value.trim().is_empty()) else {
        return Ok(());
    };
    *slot = raw.trim().parse().map_err(|_| ConfigError::InvalidEnvOverride { key, value: raw })?;
    Ok(())
}

fn require(condition: bool, message: &str) -> Result<(), ConfigError> {
    if condition {
        Ok(())
    } else {
        Err(ConfigError::Validation(message.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::{Mutex, MutexGuard, OnceLock};

    use rust_decimal::Decimal;
    use tempfile::TempDir;

    use super::{
        interpolate_env_vars, AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat,
        StorageBackend,
    };

    /// Serialises tests that touch process environment and unsets their variables on drop.
    struct ScopedEnv {
        keys: Vec<&'static str>,
        _lock: MutexGuard<'static, ()>,
    }

    impl ScopedEnv {
        fn set(vars: &[(&'static str, &str)]) -> Self {
            static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
            let lock = LOCK
                .get_or_init(|| Mutex::new(()))
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            for (key, value) in vars {
                env::set_var(key, value);
            }
            Self { keys: vars.iter().map(|(key, _)| *key).collect(), _lock: lock }
        }
    }

    impl Drop for ScopedEnv {
        fn drop(&mut self) {
            for key in &self.keys {
                env::remove_var(key);
            }
        }
    }

    fn write_config(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("carbonquote.toml");
        fs::write(&path, contents).expect("write config file");
        path
    }

    fn from_file(path: PathBuf) -> Result<AppConfig, ConfigError> {
        AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
    }

    #[test]
    fn defaults_describe_the_demo_quoting_setup() {
        let _env = ScopedEnv::set(&[]);
        let config = AppConfig::load(LoadOptions::default()).expect("defaults load");

        assert_eq!(config.quoting.base_currency, "EUR");
        assert_eq!(config.quoting.default_transaction_amount, Decimal::from(100));
        assert_eq!(config.quoting.quote_ttl_hours, 24);
        assert_eq!(config.quoting.storage, StorageBackend::Memory);
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn file_values_are_interpolated_and_partial_sections_keep_defaults() {
        let _env = ScopedEnv::set(&[("TEST_CARBONQUOTE_DB_PATH", "interpolated.db")]);
        let dir = TempDir::new().expect("temp dir");
        let path = write_config(
            &dir,
            r#"
[database]
url = "sqlite://${TEST_CARBONQUOTE_DB_PATH}"

[quoting]
base_currency = "gbp"
kg_co2e_per_tree = 21.5
storage = "sqlite"
"#,
        );

        let config = from_file(path).expect("file load");

        assert_eq!(config.database.url, "sqlite://interpolated.db");
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.quoting.base_currency, "GBP");
        assert_eq!(config.quoting.kg_co2e_per_tree, Decimal::new(215, 1));
        assert_eq!(config.quoting.quote_ttl_hours, 24);
        assert_eq!(config.quoting.storage, StorageBackend::Sqlite);
    }

    #[test]
    fn interpolation_reports_unset_and_unterminated_variables() {
        let _env = ScopedEnv::set(&[]);
        env::remove_var("TEST_CARBONQUOTE_UNSET");

        let unset = interpolate_env_vars("url = \"${TEST_CARBONQUOTE_UNSET}\"");
        assert!(matches!(
            unset,
            Err(ConfigError::MissingEnvInterpolation { ref var }) if var == "TEST_CARBONQUOTE_UNSET"
        ));
        assert!(matches!(
            interpolate_env_vars("url = \"${OPEN"),
            Err(ConfigError::UnterminatedInterpolation)
        ));
        assert_eq!(interpolate_env_vars("cost = $5").expect("plain text"), "cost = $5");
    }

    #[test]
    fn logging_aliases_apply_but_sectioned_names_win() {
        let _env = ScopedEnv::set(&[
            ("CARBONQUOTE_LOG_LEVEL", "warn"),
            ("CARBONQUOTE_LOG_FORMAT", "json"),
            ("CARBONQUOTE_LOGGING_LEVEL", "error"),
        ]);

        let config = AppConfig::load(LoadOptions::default()).expect("env load");

        assert_eq!(config.logging.level, "error");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn precedence_is_defaults_then_file_then_env_then_overrides() {
        let _env = ScopedEnv::set(&[
            ("CARBONQUOTE_DATABASE_URL", "sqlite://from-env.db"),
            ("CARBONQUOTE_QUOTING_QUOTE_TTL_HOURS", "48"),
        ]);
        let dir = TempDir::new().expect("temp dir");
        let path = write_config(
            &dir,
            r#"
[database]
url = "sqlite://from-file.db"

[server]
port = 9090

[quoting]
quote_ttl_hours = 12

[logging]
level = "warn"
"#,
        );

        let config = AppConfig::load(LoadOptions {
            config_path: Some(path),
            overrides: ConfigOverrides {
                database_url: Some("sqlite://from-override.db".to_string()),
                log_level: Some("debug".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("layered load");

        assert_eq!(config.database.url, "sqlite://from-override.db");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.quoting.quote_ttl_hours, 48);
        assert_eq!(config.server.port, 9090);
    }

    #[test]
    fn unparsable_env_value_names_the_variable() {
        let _env = ScopedEnv::set(&[("CARBONQUOTE_QUOTING_DEFAULT_TRANSACTION_AMOUNT", "lots")]);

        let error = AppConfig::load(LoadOptions::default()).expect_err("bad override");

        match error {
            ConfigError::InvalidEnvOverride { key, value } => {
                assert_eq!(key, "CARBONQUOTE_QUOTING_DEFAULT_TRANSACTION_AMOUNT");
                assert_eq!(value, "lots");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn invalid_values_fail_validation_with_the_field_name() {
        let _env = ScopedEnv::set(&[("CARBONQUOTE_QUOTING_BASE_CURRENCY", "EURO")]);

        let error = AppConfig::load(LoadOptions::default()).expect_err("bad currency");

        assert!(matches!(
            error,
            ConfigError::Validation(ref message) if message.contains("quoting.base_currency")
        ));
    }

    #[test]
    fn non_sqlite_database_url_is_rejected() {
        let _env = ScopedEnv::set(&[]);
        let dir = TempDir::new().expect("temp dir");
        let path = write_config(&dir, "[database]\nurl = \"postgres://localhost/quotes\"\n");

        let error = from_file(path).expect_err("postgres url");

        assert!(matches!(
            error,
            ConfigError::Validation(ref message) if message.contains("database.url")
        ));
    }

    #[test]
    fn required_file_must_exist() {
        let _env = ScopedEnv::set(&[]);
        let dir = TempDir::new().expect("temp dir");
        let missing = dir.path().join("absent.toml");

        let result = AppConfig::load(LoadOptions {
            config_path: Some(missing.clone()),
            require_file: true,
            ..LoadOptions::default()
        });

        assert!(matches!(
            result,
            Err(ConfigError::MissingConfigFile(ref path)) if *path == missing
        ));
    }
}
