use thiserror::Error;

/// Failure of a single client handshake. Every variant is terminal for the
/// attempt; the stream should be dropped by the caller.
#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("socks5: io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("socks5: unexpected version {0:#04x}")]
    ProtocolVersionMismatch(u8),

    #[error("socks5: server selected unsupported method {0:#04x}")]
    AuthMethodRejected(u8),

    #[error("socks5: username/password rejected, status {0:#04x}")]
    AuthRejected(u8),
}

#[derive(Debug, Error)]
pub enum AddressError {
    #[error("socks5: domain name of {0} bytes exceeds 255")]
    DomainTooLong(usize),

    #[error("socks5: invalid address {0:?}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("socks5: {field} of {len} bytes exceeds 255")]
    TooLong { field: &'static str, len: usize },
}
