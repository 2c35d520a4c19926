mod socks;
mod stream;
mod tls;

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use socks5::{Address, AddressError, HandshakeError};
use thiserror::Error;

pub use socks::{Socks5, Socks5Option};
pub use stream::ProxyStream;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AdapterType {
    Socks5,
}

impl fmt::Display for AdapterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdapterType::Socks5 => f.write_str("Socks5"),
        }
    }
}

#[derive(Debug, Error)]
pub enum OutboundError {
    #[error("{addr} connect error: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{addr} tls handshake error: {source}")]
    Tls {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Handshake(#[from] HandshakeError),

    #[error(transparent)]
    Address(#[from] AddressError),
}

impl From<OutboundError> for std::io::Error {
    fn from(err: OutboundError) -> Self {
        use std::io::ErrorKind;

        let kind = match &err {
            OutboundError::Connect { source, .. } | OutboundError::Tls { source, .. } => {
                source.kind()
            }
            OutboundError::Handshake(HandshakeError::Io(source)) => source.kind(),
            OutboundError::Handshake(_) => ErrorKind::ConnectionRefused,
            OutboundError::Address(_) => ErrorKind::InvalidInput,
        };
        std::io::Error::new(kind, err)
    }
}

/// An upstream that can open relay-ready streams to a destination.
#[async_trait]
pub trait Outbound: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> AdapterType;

    async fn connect(&self, destination: &Address) -> Result<ProxyStream, OutboundError>;
}
