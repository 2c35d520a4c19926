use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use socks5::CredentialsError;
use thiserror::Error;

use crate::outbound::{Outbound, Socks5, Socks5Option};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("proxy {name}: {source}")]
    Credentials {
        name: String,
        #[source]
        source: CredentialsError,
    },

    #[error("invalid tls server name {0:?}")]
    ServerName(String),

    #[error("tls config: {0}")]
    Tls(rustls::Error),

    #[error("duplicate proxy {0}")]
    DuplicateProxy(String),

    #[error("inbound {listen}: unknown proxy {proxy}")]
    UnknownProxy { listen: String, proxy: String },
}

#[derive(Debug, Deserialize)]
pub struct Inbound {
    pub listen: String,
    pub proxy: String,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub proxy: Vec<Socks5Option>,
    #[serde(default)]
    pub inbound: Vec<Inbound>,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        content.parse()
    }

    /// Builds every proxy and pairs each inbound listen address with its
    /// outbound.
    pub fn build(self) -> Result<Vec<(String, Arc<dyn Outbound>)>, ConfigError> {
        let mut proxies = HashMap::<String, Arc<dyn Outbound>>::new();
        for option in self.proxy {
            if proxies.contains_key(&option.name) {
                return Err(ConfigError::DuplicateProxy(option.name));
            }
            let name = option.name.clone();
            proxies.insert(name, Arc::new(Socks5::new(option)?));
        }

        self.inbound
            .into_iter()
            .map(|inbound| match proxies.get(&inbound.proxy) {
                Some(proxy) => Ok((inbound.listen, proxy.clone())),
                None => Err(ConfigError::UnknownProxy {
                    listen: inbound.listen,
                    proxy: inbound.proxy,
                }),
            })
            .collect()
    }
}

impl std::str::FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(s)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outbound::AdapterType;

    const CONFIG: &str = r#"
        [[proxy]]
        name = "upstream"
        server = "127.0.0.1"
        port = 1080
        username = "alice"
        password = "secret"

        [[proxy]]
        name = "tls"
        server = "proxy.example.com"
        port = 443
        tls = true
        skip-cert-verify = true

        [[inbound]]
        listen = "127.0.0.1:8080"
        proxy = "upstream"

        [[inbound]]
        listen = "127.0.0.1:8081"
        proxy = "tls"
    "#;

    #[test]
    fn parse_and_build() {
        let config: Config = CONFIG.parse().unwrap();
        assert_eq!(config.proxy.len(), 2);
        assert_eq!(config.proxy[0].username.as_deref(), Some("alice"));
        assert!(!config.proxy[0].tls);
        assert!(config.proxy[1].tls);
        assert!(config.proxy[1].skip_cert_verify);

        let inbounds = config.build().unwrap();
        assert_eq!(inbounds.len(), 2);
        assert_eq!(inbounds[0].0, "127.0.0.1:8080");
        assert_eq!(inbounds[0].1.name(), "upstream");
        assert_eq!(inbounds[1].1.name(), "tls");
        assert_eq!(inbounds[1].1.kind(), AdapterType::Socks5);
    }

    #[test]
    fn unknown_proxy() {
        let config: Config = r#"
            [[inbound]]
            listen = "127.0.0.1:8080"
            proxy = "missing"
        "#
        .parse()
        .unwrap();

        assert!(matches!(
            config.build(),
            Err(ConfigError::UnknownProxy { .. })
        ));
    }

    #[test]
    fn duplicate_proxy() {
        let config: Config = r#"
            [[proxy]]
            name = "a"
            server = "127.0.0.1"
            port = 1080

            [[proxy]]
            name = "a"
            server = "127.0.0.1"
            port = 1081
        "#
        .parse()
        .unwrap();

        assert!(matches!(config.build(), Err(ConfigError::DuplicateProxy(_))));
    }

    #[test]
    fn missing_port() {
        let err = r#"
            [[proxy]]
            name = "a"
            server = "127.0.0.1"
        "#
        .parse::<Config>()
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            Config::load("/nonexistent/socksout.toml"),
            Err(ConfigError::Read { .. })
        ));
    }
}
