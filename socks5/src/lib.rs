//! Client side of the SOCKS5 CONNECT handshake (RFC 1928, with RFC 1929
//! username/password authentication).

mod client;
mod error;
mod proto;

pub use client::handshake;
pub use error::{AddressError, CredentialsError, HandshakeError};
pub use proto::{Address, Credentials};
