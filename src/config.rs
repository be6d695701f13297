//! Configuration file loading
//!
//! `dashform.toml` holds one `[provider]` table and one table per resource
//! kind, with a sub-table per named instance:
//!
//! ```toml
//! [provider]
//! server_base_url = "https://superset.example.com"
//!
//! [role.analysts]
//! name = "Analysts"
//!
//! [user.alice]
//! username = "alice"
//! role_names = ["Analysts"]
//! timeouts = { create = "10m" }
//! ```
//!
//! Resource bodies stay as raw TOML here; each handler deserializes its own
//! attributes so unknown fields are reported against the right kind.

use anyhow::{Context, Result, bail};
use declarative::{Address, Operation, Timeouts};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use crate::resource::KINDS;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "dashform.toml";

/// Expand `~` in a user-supplied path
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

// ============================================================================
// Provider
// ============================================================================

/// Connection settings as written in `[provider]` or passed on the command line
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderSettings {
    pub server_base_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub page_size: Option<i64>,
}

/// Connection settings with every required value present
#[derive(Clone)]
pub struct ProviderConfig {
    pub server_base_url: String,
    pub username: String,
    pub password: String,
    /// 0 selects the client default
    pub page_size: usize,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("server_base_url", &self.server_base_url)
            .field("username", &self.username)
            .field("password", &"***")
            .field("page_size", &self.page_size)
            .finish()
    }
}

fn present(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty()).cloned()
}

impl ProviderSettings {
    /// Merge file settings with the fallbacks from flags and environment
    ///
    /// Every missing required key is reported in one error.
    pub fn resolve(&self, fallback: &Self) -> Result<ProviderConfig> {
        let server_base_url =
            present(self.server_base_url.as_ref()).or(present(fallback.server_base_url.as_ref()));
        let username = present(self.username.as_ref()).or(present(fallback.username.as_ref()));
        let password = present(self.password.as_ref()).or(present(fallback.password.as_ref()));

        let mut missing = Vec::new();
        if server_base_url.is_none() {
            missing.push("server_base_url (SUPERSET_SERVER_BASE_URL)");
        }
        if username.is_none() {
            missing.push("username (SUPERSET_USERNAME)");
        }
        if password.is_none() {
            missing.push("password (SUPERSET_PASSWORD)");
        }

        let (Some(server_base_url), Some(username), Some(password)) =
            (server_base_url, username, password)
        else {
            bail!("Missing provider configuration: {}", missing.join(", "));
        };

        let page_size = self.page_size.or(fallback.page_size).unwrap_or(0);
        if page_size < 0 {
            bail!("page_size must be zero or positive, got {page_size}");
        }

        Ok(ProviderConfig {
            server_base_url,
            username,
            password,
            page_size: page_size as usize,
        })
    }
}

// ============================================================================
// Resources
// ============================================================================

/// One `[kind.name]` table
#[derive(Debug, Clone)]
pub struct ResourceBlock {
    pub address: Address,
    pub timeouts: Timeouts,
    /// Attributes with `timeouts` removed
    pub body: toml::Value,
}

/// Parsed configuration file
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub provider: ProviderSettings,
    pub resources: Vec<ResourceBlock>,
}

impl Config {
    /// Load and parse a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        log::debug!(
            "Loaded {} resources from {}",
            config.resources.len(),
            path.display()
        );
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let table: toml::Table = toml::from_str(content).context("Invalid TOML")?;
        let mut config = Self::default();

        for (kind, value) in table {
            if kind == "provider" {
                config.provider = value
                    .try_into()
                    .context("Invalid [provider] table")?;
                continue;
            }
            if !KINDS.contains(&kind.as_str()) {
                bail!(
                    "Unknown resource kind '{kind}' (expected one of: {})",
                    KINDS.join(", ")
                );
            }
            let toml::Value::Table(instances) = value else {
                bail!("[{kind}] must be a table of named resources");
            };
            for (name, body) in instances {
                config.resources.push(parse_block(&kind, &name, body)?);
            }
        }

        Ok(config)
    }

    pub fn resource(&self, address: &Address) -> Option<&ResourceBlock> {
        self.resources.iter().find(|r| &r.address == address)
    }
}

fn parse_block(kind: &str, name: &str, body: toml::Value) -> Result<ResourceBlock> {
    let toml::Value::Table(mut attrs) = body else {
        bail!("[{kind}.{name}] must be a table");
    };
    let timeouts = match attrs.remove("timeouts") {
        Some(value) => {
            parse_timeouts(&value).with_context(|| format!("Invalid timeouts in [{kind}.{name}]"))?
        }
        None => Timeouts::default(),
    };
    Ok(ResourceBlock {
        address: Address::new(kind, name),
        timeouts,
        body: toml::Value::Table(attrs),
    })
}

// ============================================================================
// Timeouts
// ============================================================================

static DURATION_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^(?:(\d+)h)?(?:(\d+)m)?(?:(\d+)s)?$")
        .expect("DURATION_RE is a valid regex pattern")
});

/// Parse `"90s"`, `"10m"`, `"1h"` or a combination such as `"1m30s"`
pub fn parse_duration(input: &str) -> Result<Duration> {
    let input = input.trim();
    let caps = DURATION_RE
        .captures(input)
        .filter(|_| !input.is_empty())
        .with_context(|| format!("Invalid duration '{input}' (expected e.g. \"30s\", \"10m\", \"1h30m\")"))?;

    let mut secs = 0u64;
    for (group, unit) in [(1, 3600), (2, 60), (3, 1)] {
        if let Some(m) = caps.get(group) {
            let n: u64 = m
                .as_str()
                .parse()
                .with_context(|| format!("Duration out of range: '{input}'"))?;
            secs = n
                .checked_mul(unit)
                .and_then(|part| secs.checked_add(part))
                .with_context(|| format!("Duration out of range: '{input}'"))?;
        }
    }
    Ok(Duration::from_secs(secs))
}

/// Parse a `timeouts = { create = "10m", ... }` table
pub fn parse_timeouts(value: &toml::Value) -> Result<Timeouts> {
    let toml::Value::Table(table) = value else {
        bail!("timeouts must be a table");
    };
    let mut timeouts = Timeouts::default();
    for (key, value) in table {
        let operation = match key.as_str() {
            "create" => Operation::Create,
            "read" => Operation::Read,
            "update" => Operation::Update,
            "delete" => Operation::Delete,
            other => bail!("Unknown timeout '{other}' (expected create, read, update or delete)"),
        };
        let Some(text) = value.as_str() else {
            bail!("timeouts.{key} must be a duration string");
        };
        timeouts.set(operation, parse_duration(text)?);
    }
    Ok(timeouts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("10m").unwrap(), Duration::from_secs(600));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("1m30s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("2h5m").unwrap(), Duration::from_secs(7500));
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("5d").is_err());
        assert!(parse_duration("30s1m").is_err());
    }

    #[test]
    fn test_parse_duration_rejects_overflow() {
        assert!(parse_duration("18446744073709551615h").is_err());
        assert!(parse_duration("5124095576030431h1m").is_err());
        assert!(parse_duration("99999999999999999999999s").is_err());
        assert_eq!(
            parse_duration("18446744073709551615s").unwrap(),
            Duration::from_secs(u64::MAX)
        );
    }

    #[test]
    fn test_parse_resources_and_timeouts() {
        let config = Config::parse(
            r#"
            [provider]
            server_base_url = "http://localhost:8088"

            [role.analysts]
            name = "Analysts"

            [user.alice]
            username = "alice"
            timeouts = { create = "10m", delete = "1m30s" }
            "#,
        )
        .unwrap();

        assert_eq!(
            config.provider.server_base_url.as_deref(),
            Some("http://localhost:8088")
        );
        assert_eq!(config.resources.len(), 2);

        let alice = config.resource(&Address::new("user", "alice")).unwrap();
        assert_eq!(alice.timeouts.create, Duration::from_secs(600));
        assert_eq!(alice.timeouts.delete, Duration::from_secs(90));
        assert_eq!(alice.timeouts.read, declarative::DEFAULT_TIMEOUT);
        assert!(alice.body.get("timeouts").is_none());
        assert_eq!(alice.body.get("username").and_then(|v| v.as_str()), Some("alice"));
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let err = Config::parse("[dashboard.main]\ntitle = \"x\"\n").unwrap_err();
        assert!(err.to_string().contains("Unknown resource kind 'dashboard'"));
    }

    #[test]
    fn test_unknown_timeout_rejected() {
        let err = Config::parse("[tag.a]\nname = \"a\"\ntimeouts = { forever = \"1s\" }\n")
            .unwrap_err();
        assert!(format!("{err:#}").contains("Unknown timeout 'forever'"));
    }

    #[test]
    fn test_provider_reports_every_missing_key() {
        let err = ProviderSettings::default()
            .resolve(&ProviderSettings::default())
            .unwrap_err()
            .to_string();
        assert!(err.contains("server_base_url"));
        assert!(err.contains("username"));
        assert!(err.contains("password"));
    }

    #[test]
    fn test_provider_falls_back_to_environment_values() {
        let file = ProviderSettings {
            server_base_url: Some("http://file".into()),
            ..Default::default()
        };
        let fallback = ProviderSettings {
            server_base_url: Some("http://env".into()),
            username: Some("admin".into()),
            password: Some("secret".into()),
            page_size: Some(100),
        };
        let resolved = file.resolve(&fallback).unwrap();
        assert_eq!(resolved.server_base_url, "http://file");
        assert_eq!(resolved.username, "admin");
        assert_eq!(resolved.page_size, 100);
        assert!(!format!("{resolved:?}").contains("secret"));
    }

    #[test]
    fn test_negative_page_size_rejected() {
        let settings = ProviderSettings {
            server_base_url: Some("http://x".into()),
            username: Some("u".into()),
            password: Some("p".into()),
            page_size: Some(-1),
        };
        let err = settings.resolve(&ProviderSettings::default()).unwrap_err();
        assert!(err.to_string().contains("page_size"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[tag.finance]\nname = \"finance\"").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.resources[0].address, Address::new("tag", "finance"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
