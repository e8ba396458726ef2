//! Worker configuration
//!
//! Settings come from a TOML file (`./settings.toml` by default) layered under
//! `LOGWARP_`-prefixed environment variables, with `__` separating sections:
//!
//! ```toml
//! [opensearch]
//! address = "https://localhost:9200"
//! username = "admin"
//! password = "admin"
//! verify_tls = false
//! bulk_size = 5000
//!
//! [nats]
//! address = "nats://127.0.0.1:4222"
//!
//! [logwarp]
//! log_folder = "/var/lib/logwarp/logs"
//! ```
//!
//! `LOGWARP_OPENSEARCH__BULK_SIZE=1000` overrides `opensearch.bulk_size`. Missing keys fall
//! back to the `DEFAULT_*` constants below. The legacy spellings `verifytls`, `bulksize` and
//! `logfolder` are still read, from the file and the environment alike, and are folded into
//! their canonical keys before extraction. A canonical key wins over its legacy spelling.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    value::{Dict, Value},
    Figment,
};
use logwarp_common::{LogwarpError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ============================================================================
// Configuration Constants
// ============================================================================

/// Default location of the settings file.
pub const DEFAULT_SETTINGS_PATH: &str = "./settings.toml";

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "LOGWARP_";

/// Default OpenSearch endpoint.
pub const DEFAULT_OPENSEARCH_ADDRESS: &str = "https://localhost:9200";

/// Default number of records per bulk request.
pub const DEFAULT_BULK_SIZE: usize = 5000;

/// Default timeout for a single bulk request in seconds.
pub const DEFAULT_OPENSEARCH_TIMEOUT_SECS: u64 = 60;

/// Default NATS server.
pub const DEFAULT_NATS_ADDRESS: &str = "nats://127.0.0.1:4222";

/// Subject the worker listens on for job commands.
pub const DEFAULT_COMMAND_SUBJECT: &str = "logwarp/commands";

/// Subject status and error events are published on.
pub const DEFAULT_OUTPUT_SUBJECT: &str = "logwarp/output";

/// Default root folder for log sources.
pub const DEFAULT_LOG_FOLDER: &str = "./logs";

/// Older key spellings as `(section, legacy, canonical)`.
const LEGACY_KEYS: [(&str, &str, &str); 3] = [
    ("opensearch", "verifytls", "verify_tls"),
    ("opensearch", "bulksize", "bulk_size"),
    ("logwarp", "logfolder", "log_folder"),
];

/// Top-level worker settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub opensearch: OpenSearchSettings,
    pub nats: NatsSettings,
    pub logwarp: WorkerSettings,
}

/// Document store connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenSearchSettings {
    pub address: String,
    pub username: String,
    pub password: String,
    /// Verify the server certificate; disable only for self-signed dev clusters
    pub verify_tls: bool,
    /// Records per bulk request
    pub bulk_size: usize,
    pub timeout_secs: u64,
}

/// Event bus connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NatsSettings {
    pub address: String,
    pub command_subject: String,
    pub output_subject: String,
}

/// Job execution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerSettings {
    /// Jobs may only name files directly inside this folder
    pub log_folder: PathBuf,
    /// Upper bound on concurrently running jobs; 0 means unbounded
    pub max_concurrent_jobs: usize,
}

impl Default for OpenSearchSettings {
    fn default() -> Self {
        Self {
            address: DEFAULT_OPENSEARCH_ADDRESS.to_string(),
            username: String::new(),
            password: String::new(),
            verify_tls: true,
            bulk_size: DEFAULT_BULK_SIZE,
            timeout_secs: DEFAULT_OPENSEARCH_TIMEOUT_SECS,
        }
    }
}

impl Default for NatsSettings {
    fn default() -> Self {
        Self {
            address: DEFAULT_NATS_ADDRESS.to_string(),
            command_subject: DEFAULT_COMMAND_SUBJECT.to_string(),
            output_subject: DEFAULT_OUTPUT_SUBJECT.to_string(),
        }
    }
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            log_folder: PathBuf::from(DEFAULT_LOG_FOLDER),
            max_concurrent_jobs: 0,
        }
    }
}

impl Settings {
    /// Load settings from `path`, `.env` and the environment, then validate them
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let figment = Self::normalized(Figment::from(Toml::file(path.as_ref())))?.merge(
            Env::prefixed(ENV_PREFIX)
                .split("__")
                .map(|key| canonical_key(key.as_str()).into()),
        );

        Self::from_figment(figment)
    }

    /// Rewrite legacy keys of a file layer to their canonical spelling
    pub fn normalized(file: Figment) -> Result<Figment> {
        let mut dict: Dict = file
            .extract()
            .map_err(|e| LogwarpError::Config(e.to_string()))?;

        rename_legacy_keys(&mut dict);
        Ok(Figment::from(Serialized::defaults(dict)))
    }

    /// Extract and validate settings from an already assembled figment
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let settings: Settings = figment
            .extract()
            .map_err(|e| LogwarpError::Config(e.to_string()))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Validate settings
    pub fn validate(&self) -> Result<()> {
        if self.opensearch.address.trim().is_empty() {
            return Err(LogwarpError::Config("opensearch.address cannot be empty".into()));
        }

        if self.opensearch.bulk_size == 0 {
            return Err(LogwarpError::Config(
                "opensearch.bulk_size must be greater than 0".into(),
            ));
        }

        if self.nats.address.trim().is_empty() {
            return Err(LogwarpError::Config("nats.address cannot be empty".into()));
        }

        if self.nats.command_subject.is_empty() || self.nats.output_subject.is_empty() {
            return Err(LogwarpError::Config("nats subjects cannot be empty".into()));
        }

        if self.logwarp.log_folder.as_os_str().is_empty() {
            return Err(LogwarpError::Config("logwarp.log_folder cannot be empty".into()));
        }

        if !self.opensearch.verify_tls {
            tracing::warn!("TLS certificate verification is disabled for OpenSearch");
        }

        Ok(())
    }

    /// Concurrency limit, if one is configured
    pub fn job_limit(&self) -> Option<usize> {
        (self.logwarp.max_concurrent_jobs > 0).then_some(self.logwarp.max_concurrent_jobs)
    }
}

fn rename_legacy_keys(dict: &mut Dict) {
    for (section, legacy, canonical) in LEGACY_KEYS {
        if let Some(Value::Dict(_, inner)) = dict.get_mut(section) {
            if let Some(value) = inner.remove(legacy) {
                inner.entry(canonical.to_string()).or_insert(value);
            }
        }
    }
}

/// Canonical dotted key for an environment key such as `opensearch.bulksize`
fn canonical_key(key: &str) -> String {
    let key = key.to_ascii_lowercase();
    let Some((section, name)) = key.split_once('.') else {
        return key;
    };

    LEGACY_KEYS
        .iter()
        .find(|(s, legacy, _)| *s == section && *legacy == name)
        .map(|(s, _, canonical)| format!("{s}.{canonical}"))
        .unwrap_or(key)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use figment::Jail;

    fn from_toml(toml: &str) -> Result<Settings> {
        Settings::from_figment(Settings::normalized(Figment::from(Toml::string(toml)))?)
    }

    #[test]
    fn test_defaults_are_valid() {
        let settings = from_toml("").unwrap();
        assert_eq!(settings.opensearch.bulk_size, DEFAULT_BULK_SIZE);
        assert_eq!(settings.nats.command_subject, DEFAULT_COMMAND_SUBJECT);
        assert_eq!(settings.nats.output_subject, DEFAULT_OUTPUT_SUBJECT);
        assert!(settings.opensearch.verify_tls);
        assert_eq!(settings.job_limit(), None);
    }

    #[test]
    fn test_partial_file_overrides_defaults() {
        let settings = from_toml(
            r#"
            [opensearch]
            address = "https://search.internal:9200"
            verifytls = false
            bulk_size = 250

            [logwarp]
            logfolder = "/srv/logs"
            max_concurrent_jobs = 4
            "#,
        )
        .unwrap();

        assert_eq!(settings.opensearch.address, "https://search.internal:9200");
        assert!(!settings.opensearch.verify_tls);
        assert_eq!(settings.opensearch.bulk_size, 250);
        assert_eq!(settings.opensearch.timeout_secs, DEFAULT_OPENSEARCH_TIMEOUT_SECS);
        assert_eq!(settings.logwarp.log_folder, PathBuf::from("/srv/logs"));
        assert_eq!(settings.job_limit(), Some(4));
        assert_eq!(settings.nats.address, DEFAULT_NATS_ADDRESS);
    }

    #[test]
    fn test_canonical_key_wins_over_legacy() {
        let settings = from_toml("[opensearch]\nbulksize = 10\nbulk_size = 30").unwrap();
        assert_eq!(settings.opensearch.bulk_size, 30);
    }

    #[test]
    fn test_canonical_key_maps_env_spellings() {
        assert_eq!(canonical_key("OPENSEARCH.BULKSIZE"), "opensearch.bulk_size");
        assert_eq!(canonical_key("logwarp.logfolder"), "logwarp.log_folder");
        assert_eq!(canonical_key("nats.address"), "nats.address");
        assert_eq!(canonical_key("bulksize"), "bulksize");
    }

    #[test]
    fn test_env_overrides_legacy_file_key() {
        Jail::expect_with(|jail| {
            jail.create_file("settings.toml", "[opensearch]\nbulksize = 10\n")?;
            jail.set_env("LOGWARP_OPENSEARCH__BULK_SIZE", "20");
            jail.set_env("LOGWARP_OPENSEARCH__VERIFYTLS", "false");

            let settings = Settings::load("settings.toml").map_err(|e| e.to_string())?;
            assert_eq!(settings.opensearch.bulk_size, 20);
            assert!(!settings.opensearch.verify_tls);
            Ok(())
        });
    }

    #[test]
    fn test_legacy_env_key_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("settings.toml", "[opensearch]\nbulk_size = 10\n")?;
            jail.set_env("LOGWARP_OPENSEARCH__BULKSIZE", "40");

            let settings = Settings::load("settings.toml").map_err(|e| e.to_string())?;
            assert_eq!(settings.opensearch.bulk_size, 40);
            Ok(())
        });
    }

    #[test]
    fn test_zero_bulk_size_rejected() {
        let err = from_toml("[opensearch]\nbulk_size = 0").unwrap_err();
        assert!(matches!(err, LogwarpError::Config(msg) if msg.contains("bulk_size")));
    }

    #[test]
    fn test_empty_address_rejected() {
        assert!(from_toml("[opensearch]\naddress = \"\"").is_err());
        assert!(from_toml("[nats]\naddress = \" \"").is_err());
    }

    #[test]
    fn test_wrong_type_is_config_error() {
        let err = from_toml("[opensearch]\nbulk_size = \"many\"").unwrap_err();
        assert!(matches!(err, LogwarpError::Config(_)));
    }
}
