use std::io::{Error, ErrorKind};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use socket2::{SockRef, TcpKeepalive};
use socks5::{Address, Credentials};
use tokio::net::TcpStream;

use super::tls::Tls;
use super::{AdapterType, Outbound, OutboundError, ProxyStream};
use crate::config::ConfigError;

const TCP_TIMEOUT: Duration = Duration::from_secs(5);
const TCP_KEEPALIVE: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Socks5Option {
    pub name: String,
    pub server: String,
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub tls: bool,
    #[serde(default)]
    pub skip_cert_verify: bool,
}

/// SOCKS5 upstream, optionally over TLS.
pub struct Socks5 {
    name: String,
    addr: String,
    credentials: Option<Credentials>,
    tls: Option<Tls>,
}

impl Socks5 {
    pub fn new(option: Socks5Option) -> Result<Self, ConfigError> {
        // An empty username selects no-auth.
        let credentials = match option.username.as_deref() {
            Some(username) if !username.is_empty() => {
                let password = option.password.clone().unwrap_or_default();
                let credentials = Credentials::new(username, password);
                credentials
                    .validate()
                    .map_err(|source| ConfigError::Credentials {
                        name: option.name.clone(),
                        source,
                    })?;
                Some(credentials)
            }
            _ => None,
        };

        let tls = if option.tls {
            Some(Tls::new(&option.server, option.skip_cert_verify)?)
        } else {
            None
        };

        Ok(Self {
            addr: join_host_port(&option.server, option.port),
            name: option.name,
            credentials,
            tls,
        })
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    async fn dial(&self) -> Result<TcpStream, OutboundError> {
        let connect_error = |source: Error| OutboundError::Connect {
            addr: self.addr.clone(),
            source,
        };

        let stream = tokio::time::timeout(TCP_TIMEOUT, TcpStream::connect(self.addr.as_str()))
            .await
            .map_err(|_| connect_error(Error::new(ErrorKind::TimedOut, "connect timed out")))?
            .map_err(connect_error)?;

        tcp_keepalive(&stream).map_err(connect_error)?;
        Ok(stream)
    }
}

#[async_trait]
impl Outbound for Socks5 {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> AdapterType {
        AdapterType::Socks5
    }

    async fn connect(&self, destination: &Address) -> Result<ProxyStream, OutboundError> {
        let target = destination.encode()?;

        debug!("{} dial {} for {}", self.name, self.addr, destination);
        let stream = self.dial().await?;

        let mut stream = match &self.tls {
            Some(tls) => {
                let stream = tls.connect(stream).await.map_err(|source| OutboundError::Tls {
                    addr: self.addr.clone(),
                    source,
                })?;
                ProxyStream::Tls(Box::new(stream))
            }
            None => ProxyStream::Tcp(stream),
        };

        if let Err(err) = socks5::handshake(&mut stream, self.credentials.as_ref(), &target).await
        {
            warn!("{} handshake for {} failed: {}", self.name, destination, err);
            return Err(err.into());
        }

        Ok(stream)
    }
}

/// Describes the adapter as `{ type = "Socks5" }`; credentials and the
/// server address are never serialized.
impl Serialize for Socks5 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("type", &self.kind())?;
        map.end()
    }
}

fn tcp_keepalive(stream: &TcpStream) -> std::io::Result<()> {
    let keepalive = TcpKeepalive::new().with_time(TCP_KEEPALIVE);
    SockRef::from(stream).set_tcp_keepalive(&keepalive)
}

fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}
