//! Configuration loading and validation
//!
//! The dashboard is configured by a single TOML file holding the bootstrap
//! settings (port, logging), the upstream API settings, the indicator lists
//! and the credential store. The file is located in this priority order:
//! 1. Command-line argument (highest priority)
//! 2. `PAINEL_CONFIG` environment variable
//! 3. User config directory (`~/.config/painel/painel.toml` on Linux)
//! 4. `./painel.toml` in the working directory
//!
//! The raw [`TomlConfig`] is validated once at startup into the immutable
//! [`AppConfig`]; nothing downstream reads the file again.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::selection::{EntityCode, EntityKind, Network, DEFAULT_ASSESSMENT_YEAR};
use crate::{CredentialStore, Error, Result};

/// Environment variable naming the configuration file
pub const CONFIG_ENV_VAR: &str = "PAINEL_CONFIG";
/// Environment override for `[api] installation_id`
pub const INSTALLATION_ID_ENV_VAR: &str = "PAINEL_INSTALLATION_ID";
/// Environment override for `[api] session_token`
pub const SESSION_TOKEN_ENV_VAR: &str = "PAINEL_SESSION_TOKEN";
/// Environment override for `[master] senha_mestra`
pub const MASTER_PASSWORD_ENV_VAR: &str = "PAINEL_MASTER_PASSWORD";

const CONFIG_FILE_NAME: &str = "painel.toml";

pub const DEFAULT_API_URL: &str =
    "https://criancaalfabetizada.caeddigital.net/portal/functions/getDadosResultado";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;
pub const DEFAULT_CLIENT_VERSION: &str = "js2.19.0";
pub const DEFAULT_SESSION_IDLE_SECS: u64 = 1800;
pub const DEFAULT_PORT: u16 = 8501;
pub const DEFAULT_BIND: &str = "127.0.0.1";

/// Indigenous schools of the regional office, used when the file lists none
pub const DEFAULT_INDIGENOUS_SCHOOLS: [&str; 15] = [
    "23000291", "23244755", "23239174", "23564067", "23283610", "23215674", "23263423",
    "23061642", "23462353", "23062770", "23241462", "23235411", "23241454", "23215682",
    "23263555",
];

// ========================================
// Raw TOML
// ========================================

/// Configuration file as written on disk
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// HTTP server bind address
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub api: ApiSection,

    #[serde(default)]
    pub indicators: IndicatorSection,

    #[serde(default)]
    pub network: NetworkSection,

    #[serde(default)]
    pub session: SessionSection,

    /// Municipal users: entity code → password
    #[serde(default)]
    pub users: BTreeMap<String, String>,

    /// Schools: entity code → password
    #[serde(default)]
    pub schools: BTreeMap<String, String>,

    #[serde(default)]
    pub master: MasterSection,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` overrides it
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

/// `[api]` table
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiSection {
    pub url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub cache_ttl_secs: Option<u64>,
    pub client_version: Option<String>,
    pub assessment_year: Option<u16>,
    pub installation_id: Option<String>,
    pub session_token: Option<String>,
}

/// `[indicators]` table
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IndicatorSection {
    #[serde(default)]
    pub general: Vec<String>,
    #[serde(default)]
    pub skills: Vec<String>,
}

/// `[network]` table
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NetworkSection {
    pub indigenous_schools: Option<Vec<String>>,
    /// Network filter for codes that are neither municipal users nor indigenous schools
    pub unlisted_entities: Option<Network>,
}

/// `[session]` table
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionSection {
    /// Seconds without a request after which a login token stops working
    pub idle_timeout_secs: Option<u64>,
}

/// `[master]` table
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MasterSection {
    pub senha_mestra: Option<String>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Read and parse a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Replace secrets with environment values when those are set and non-empty
    ///
    /// Returns the names of the variables that were applied.
    pub fn apply_env_overrides(&mut self) -> Vec<&'static str> {
        let mut applied = Vec::new();
        if let Some(value) = non_empty_env(INSTALLATION_ID_ENV_VAR) {
            self.api.installation_id = Some(value);
            applied.push(INSTALLATION_ID_ENV_VAR);
        }
        if let Some(value) = non_empty_env(SESSION_TOKEN_ENV_VAR) {
            self.api.session_token = Some(value);
            applied.push(SESSION_TOKEN_ENV_VAR);
        }
        if let Some(value) = non_empty_env(MASTER_PASSWORD_ENV_VAR) {
            self.master.senha_mestra = Some(value);
            applied.push(MASTER_PASSWORD_ENV_VAR);
        }
        applied
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Locate the configuration file
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Result<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Ok(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Some(path) = non_empty_env(CONFIG_ENV_VAR) {
        return Ok(PathBuf::from(path));
    }

    // Priority 3: User config directory
    if let Some(path) = dirs::config_dir().map(|d| d.join("painel").join(CONFIG_FILE_NAME)) {
        if path.exists() {
            return Ok(path);
        }
    }

    // Priority 4: Working directory
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return Ok(local);
    }

    Err(Error::Config(format!(
        "No config file found. Pass --config, set {} or create {}",
        CONFIG_ENV_VAR, CONFIG_FILE_NAME
    )))
}

// ========================================
// Validated configuration
// ========================================

/// Upstream results API settings
#[derive(Clone)]
pub struct ApiSettings {
    pub url: String,
    pub timeout: Duration,
    pub cache_ttl: Duration,
    pub client_version: String,
    pub assessment_year: u16,
    /// Opaque value forwarded as `_InstallationId`
    pub installation_id: String,
    /// Opaque value forwarded as `_SessionToken`
    pub session_token: String,
}

impl fmt::Debug for ApiSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiSettings")
            .field("url", &self.url)
            .field("timeout", &self.timeout)
            .field("cache_ttl", &self.cache_ttl)
            .field("client_version", &self.client_version)
            .field("assessment_year", &self.assessment_year)
            .finish_non_exhaustive()
    }
}

/// Indicator codes requested for each query kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorLists {
    pub general: Vec<String>,
    pub skills: Vec<String>,
}

/// Rules mapping an entity code to its category and network filter
#[derive(Debug, Clone)]
pub struct NetworkPolicy {
    indigenous_schools: BTreeSet<String>,
    unlisted_entities: Network,
}

impl NetworkPolicy {
    pub fn new(indigenous_schools: BTreeSet<String>, unlisted_entities: Network) -> Self {
        Self {
            indigenous_schools,
            unlisted_entities,
        }
    }

    pub fn is_indigenous_school(&self, code: &str) -> bool {
        self.indigenous_schools.contains(code)
    }

    /// Category shown to the user
    pub fn classify(&self, code: &EntityCode, credentials: &CredentialStore) -> EntityKind {
        if credentials.is_municipal(code.as_str()) {
            EntityKind::Municipal
        } else if self.is_indigenous_school(code.as_str()) {
            EntityKind::IndigenousSchool
        } else {
            EntityKind::StateSchool
        }
    }

    /// Value of the `DADOS.VL_FILTRO_REDE` filter
    ///
    /// Municipal users query the municipal network and indigenous schools the
    /// state network. Any other code follows `unlisted_entities`.
    pub fn network_for(&self, code: &EntityCode, credentials: &CredentialStore) -> Network {
        match self.classify(code, credentials) {
            EntityKind::Municipal => Network::Municipal,
            EntityKind::IndigenousSchool => Network::Estadual,
            EntityKind::StateSchool => self.unlisted_entities,
        }
    }
}

impl Default for NetworkPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_INDIGENOUS_SCHOOLS.iter().map(|s| s.to_string()).collect(),
            Network::Estadual,
        )
    }
}

/// Login session settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub idle_timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(DEFAULT_SESSION_IDLE_SECS),
        }
    }
}

/// How the configuration was assembled
///
/// Loading happens before logging is initialised, so these facts are
/// returned to the caller to be logged afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub path: PathBuf,
    /// Environment variables that replaced file values
    pub env_overrides: Vec<&'static str>,
}

/// Fully validated application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub bind: String,
    pub logging: LoggingConfig,
    pub api: ApiSettings,
    pub indicators: IndicatorLists,
    pub network: NetworkPolicy,
    pub session: SessionSettings,
    pub credentials: CredentialStore,
}

impl AppConfig {
    /// Resolve, read, apply environment overrides and validate
    pub fn load(cli_arg: Option<&Path>) -> Result<(Self, LoadReport)> {
        let path = resolve_config_path(cli_arg)?;
        let mut raw = TomlConfig::load(&path)?;
        let env_overrides = raw.apply_env_overrides();
        let config = Self::from_toml(raw)?;
        Ok((config, LoadReport { path, env_overrides }))
    }

    /// Validate a parsed configuration file
    pub fn from_toml(raw: TomlConfig) -> Result<Self> {
        let url = raw.api.url.unwrap_or_else(|| DEFAULT_API_URL.to_string());
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::Config(format!("[api] url must be http(s): {}", url)));
        }

        let timeout_secs = raw.api.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(Error::Config("[api] timeout_secs must be positive".to_string()));
        }

        let cache_ttl_secs = raw.api.cache_ttl_secs.unwrap_or(DEFAULT_CACHE_TTL_SECS);
        if cache_ttl_secs == 0 {
            return Err(Error::Config("[api] cache_ttl_secs must be positive".to_string()));
        }

        let installation_id = required(raw.api.installation_id, "[api] installation_id")?;
        let session_token = required(raw.api.session_token, "[api] session_token")?;

        let api = ApiSettings {
            url,
            timeout: Duration::from_secs(timeout_secs),
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            client_version: raw
                .api
                .client_version
                .unwrap_or_else(|| DEFAULT_CLIENT_VERSION.to_string()),
            assessment_year: raw.api.assessment_year.unwrap_or(DEFAULT_ASSESSMENT_YEAR),
            installation_id,
            session_token,
        };

        let indicators = IndicatorLists {
            general: indicator_list(raw.indicators.general, "general")?,
            skills: indicator_list(raw.indicators.skills, "skills")?,
        };

        let indigenous_schools = match raw.network.indigenous_schools {
            Some(codes) => codes.into_iter().map(|c| c.trim().to_string()).collect(),
            None => DEFAULT_INDIGENOUS_SCHOOLS.iter().map(|s| s.to_string()).collect(),
        };
        let network = NetworkPolicy::new(
            indigenous_schools,
            raw.network.unlisted_entities.unwrap_or(Network::Estadual),
        );

        let idle_secs = raw
            .session
            .idle_timeout_secs
            .unwrap_or(DEFAULT_SESSION_IDLE_SECS);
        if idle_secs == 0 {
            return Err(Error::Config(
                "[session] idle_timeout_secs must be positive".to_string(),
            ));
        }
        let session = SessionSettings {
            idle_timeout: Duration::from_secs(idle_secs),
        };

        let credentials = CredentialStore::new(raw.users, raw.schools, raw.master.senha_mestra);
        if credentials.user_count() + credentials.school_count() == 0
            && !credentials.has_master_password()
        {
            return Err(Error::Config(
                "No credentials configured: add [users], [schools] or [master]".to_string(),
            ));
        }

        Ok(Self {
            port: raw.port,
            bind: raw.bind,
            logging: raw.logging,
            api,
            indicators,
            network,
            session,
            credentials,
        })
    }
}

fn required(value: Option<String>, name: &str) -> Result<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::Config(format!("{} is required", name)))
}

fn indicator_list(codes: Vec<String>, kind: &str) -> Result<Vec<String>> {
    let codes: Vec<String> = codes
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    if codes.is_empty() {
        return Err(Error::Config(format!(
            "[indicators] {} must list at least one indicator code",
            kind
        )));
    }
    Ok(codes)
}
