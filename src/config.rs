use serde::Deserialize;
use std::{
    fmt,
    net::{Ipv6Addr, SocketAddrV6},
    path::{Path, PathBuf},
    str::FromStr,
};

use crate::extractors::{self, NamedOption1837Extractor};
use crate::server::socket::ListenerSpec;
use crate::Duid;

/// Server wide configuration.
pub struct Config {
    pub server_duid: Duid,
    /// Unicast and multicast listeners to bind (SPEC_FULL.md §6). Defaults
    /// to a single unicast listener on `bind_address` when the config file
    /// supplies no `listeners` array.
    pub listeners: Vec<ListenerSpec>,
    pub allow_rapid_commit: bool,
    pub rapid_commit_rejections: bool,
    pub option1837_extractors: Vec<NamedOption1837Extractor>,
    /// Extension names to register with the Extension Registry, in order.
    pub extensions: Vec<String>,
    pub log_level: tracing::Level,
    /// When set, unicast requests from links this address is reachable on
    /// are answered (RFC 8415 §18.3.1's "if the server has been configured
    /// to reply to a message with Unicast" carve-out), with Option 12
    /// advertising `self` back as the unicast address (SPEC_FULL.md §4.1
    /// step 6, §8 scenario 3). `None` means unicast is never permitted.
    pub server_unicast_address: Option<Ipv6Addr>,
}

/// One entry of the `listeners` array in `config.json`.
#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ListenerConfig {
    Unicast { address: SocketAddrV6 },
    Multicast { interface: String },
}

impl From<ListenerConfig> for ListenerSpec {
    fn from(value: ListenerConfig) -> Self {
        match value {
            ListenerConfig::Unicast { address } => ListenerSpec::Unicast(address),
            ListenerConfig::Multicast { interface } => ListenerSpec::Multicast { interface },
        }
    }
}

/// Server wide configuration, used to deserialize `config.json` before
/// transforming to `Config`.
#[derive(Deserialize)]
struct ServerConfig {
    bind_address: Option<SocketAddrV6>,
    #[serde(default)]
    listeners: Vec<ListenerConfig>,
    #[serde(default)]
    allow_rapid_commit: bool,
    #[serde(default)]
    rapid_commit_rejections: bool,
    #[serde(default)]
    option1837_extractors: Vec<String>,
    #[serde(default)]
    extensions: Vec<String>,
    log_level: Option<String>,
    #[serde(default)]
    server_unicast_address: Option<Ipv6Addr>,
}

/// Server DUID, stored in a separate file that may be auto-generated in the
/// future.
#[derive(Deserialize)]
struct ServerIds {
    v6: Duid,
}

#[derive(Debug)]
pub enum ConfigError {
    UnknownOption1837Extractor(String),
    Parsing {
        err: serde_json::Error,
        path: PathBuf,
    },
    Io {
        err: std::io::Error,
        path: PathBuf,
    },
    LogLevel(String),
}

trait PathContext<T> {
    fn context<P: AsRef<Path>>(self, path: P) -> Result<T, ConfigError>;
}

impl<T> PathContext<T> for serde_json::Result<T> {
    fn context<P: AsRef<Path>>(self, path: P) -> Result<T, ConfigError> {
        self.map_err(|e| ConfigError::Parsing {
            err: e,
            path: path.as_ref().to_path_buf(),
        })
    }
}

impl<T> PathContext<T> for std::io::Result<T> {
    fn context<P: AsRef<Path>>(self, path: P) -> Result<T, ConfigError> {
        self.map_err(|e| ConfigError::Io {
            err: e,
            path: path.as_ref().to_path_buf(),
        })
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnknownOption1837Extractor(ex) => {
                write!(f, "Unknown Option1837 extractor function `{ex}`")
            }
            ConfigError::Parsing { err, path } => {
                write!(f, "Parsing `{}`: {err}", path.to_string_lossy())
            }
            ConfigError::Io { err, path } => write!(f, "`{}`: {err}", path.to_string_lossy()),
            ConfigError::LogLevel(value) => write!(
                f,
                r#"Unexpected log level {value}. Expected one of [trace, debug, info, warn, error]"#
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Default for Config {
    fn default() -> Self {
        Config {
            server_duid: Duid::default(),
            listeners: vec![ListenerSpec::Unicast("[::]:547".parse().unwrap())],
            allow_rapid_commit: false,
            rapid_commit_rejections: false,
            option1837_extractors: vec![],
            extensions: vec![],
            log_level: tracing::Level::INFO,
            server_unicast_address: None,
        }
    }
}

impl Config {
    /// Load server config from `config.json` and `ids.json` in `config_dir`.
    pub fn load_from_files<P: AsRef<Path>>(config_dir: P) -> Result<Config, ConfigError> {
        let server_config_path = config_dir.as_ref().join("config.json");
        let server_config: ServerConfig = serde_json::from_reader(
            std::fs::File::open(&server_config_path).context(&server_config_path)?,
        )
        .context(&server_config_path)?;

        let server_ids_path = config_dir.as_ref().join("ids.json");
        let server_ids: ServerIds = serde_json::from_reader(
            std::fs::File::open(&server_ids_path).context(&server_ids_path)?,
        )
        .context(&server_ids_path)?;

        let option1837_extractors_map = extractors::get_all_extractors();
        let mut option1837_extractors =
            Vec::with_capacity(server_config.option1837_extractors.len());
        for extractor_str in server_config.option1837_extractors {
            match option1837_extractors_map.get_key_value(extractor_str.as_str()) {
                Some((&name, &extractor)) => option1837_extractors.push((name, extractor)),
                None => return Err(ConfigError::UnknownOption1837Extractor(extractor_str)),
            }
        }

        let log_level = match server_config.log_level {
            Some(s) if !s.is_empty() => {
                tracing::Level::from_str(&s).map_err(|_| ConfigError::LogLevel(s))?
            }
            _ => tracing::Level::INFO,
        };

        let listeners = if server_config.listeners.is_empty() {
            vec![ListenerSpec::Unicast(
                server_config
                    .bind_address
                    .unwrap_or_else(|| "[::]:547".parse().unwrap()),
            )]
        } else {
            server_config
                .listeners
                .into_iter()
                .map(ListenerSpec::from)
                .collect()
        };

        Ok(Config {
            server_duid: server_ids.v6,
            listeners,
            allow_rapid_commit: server_config.allow_rapid_commit,
            rapid_commit_rejections: server_config.rapid_commit_rejections,
            option1837_extractors,
            extensions: server_config.extensions,
            log_level,
            server_unicast_address: server_config.server_unicast_address,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tempdir() -> PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!(
            "dhcp6d-config-test-{:?}",
            std::thread::current().id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn loads_a_minimal_config_directory() {
        let dir = tempdir();
        std::fs::write(
            dir.join("config.json"),
            r#"{"bind_address": "[::1]:5470", "allow_rapid_commit": true}"#,
        )
        .unwrap();
        std::fs::write(dir.join("ids.json"), r#"{"v6": "00:01:02:03:04:05"}"#).unwrap();

        let config = Config::load_from_files(&dir).unwrap();
        assert!(config.allow_rapid_commit);
        assert!(!config.rapid_commit_rejections);
        assert_eq!(
            config.listeners,
            vec![ListenerSpec::Unicast("[::1]:5470".parse().unwrap())]
        );
        assert_eq!(config.server_unicast_address, None);
    }

    #[test]
    fn loads_a_configured_unicast_permission_address() {
        let dir = tempdir();
        std::fs::write(
            dir.join("config.json"),
            r#"{"server_unicast_address": "2001:db8::1"}"#,
        )
        .unwrap();
        std::fs::write(dir.join("ids.json"), r#"{"v6": "00:01:02:03:04:05"}"#).unwrap();

        let config = Config::load_from_files(&dir).unwrap();
        assert_eq!(
            config.server_unicast_address,
            Some("2001:db8::1".parse().unwrap())
        );
    }

    #[test]
    fn rejects_an_unknown_extractor_name() {
        let dir = tempdir();
        std::fs::write(
            dir.join("config.json"),
            r#"{"option1837_extractors": ["not_a_real_extractor"]}"#,
        )
        .unwrap();
        std::fs::write(dir.join("ids.json"), r#"{"v6": "00:01:02:03:04:05"}"#).unwrap();

        let err = Config::load_from_files(&dir).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownOption1837Extractor(_)));
    }
}
