use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use crate::error::{AddressError, CredentialsError};

pub(crate) const VER: u8 = 5;
pub(crate) const NO_AUTH: u8 = 0;
pub(crate) const USERNAME_PASSWORD: u8 = 2;

// RFC 1929 sub-negotiation version
pub(crate) const AUTH_VER: u8 = 1;
pub(crate) const AUTH_SUCCESS: u8 = 0;

pub(crate) const CMD_CONNECT: u8 = 1;
pub(crate) const RSV: u8 = 0;

pub(crate) const ATYP_IPV4: u8 = 1;
pub(crate) const ATYP_DOMAIN: u8 = 3;
pub(crate) const ATYP_IPV6: u8 = 4;

/// Bytes consumed for the CONNECT reply. Assumes an IPv4 bind address.
pub(crate) const CONNECT_REPLY_LEN: usize = 10;

/// Destination the proxy is asked to connect to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Address {
    Host(String, u16),
    Ip(SocketAddr),
}

impl Address {
    /// Encodes the address as `ATYP | ADDR | PORT`.
    pub fn encode(&self) -> Result<Vec<u8>, AddressError> {
        let mut buf = Vec::with_capacity(22);

        match self {
            Address::Ip(SocketAddr::V4(addr)) => {
                buf.push(ATYP_IPV4);
                buf.extend_from_slice(&addr.ip().octets());
                buf.extend_from_slice(&addr.port().to_be_bytes());
            }
            Address::Ip(SocketAddr::V6(addr)) => {
                buf.push(ATYP_IPV6);
                buf.extend_from_slice(&addr.ip().octets());
                buf.extend_from_slice(&addr.port().to_be_bytes());
            }
            Address::Host(host, port) => {
                let len = u8::try_from(host.len())
                    .map_err(|_| AddressError::DomainTooLong(host.len()))?;
                buf.push(ATYP_DOMAIN);
                buf.push(len);
                buf.extend_from_slice(host.as_bytes());
                buf.extend_from_slice(&port.to_be_bytes());
            }
        }

        Ok(buf)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(addr) = s.parse::<SocketAddr>() {
            return Ok(Address::Ip(addr));
        }

        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| AddressError::Invalid(s.to_string()))?;
        let port = port
            .parse::<u16>()
            .map_err(|_| AddressError::Invalid(s.to_string()))?;

        let host = host.trim_start_matches('[').trim_end_matches(']');
        match host.parse::<IpAddr>() {
            Ok(ip) => Ok(Address::Ip(SocketAddr::new(ip, port))),
            Err(_) if host.is_empty() || host.contains(':') => {
                Err(AddressError::Invalid(s.to_string()))
            }
            Err(_) => Ok(Address::Host(host.to_string(), port)),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Host(host, port) => write!(f, "{}:{}", host, port),
            Address::Ip(addr) => write!(f, "{}", addr),
        }
    }
}

/// Username/password pair for RFC 1929 authentication.
///
/// Each field is sent behind a single length byte, so neither may exceed
/// 255 bytes. [`handshake`](crate::handshake) does not check this; call
/// [`Credentials::validate`] when the values come from untrusted config.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: Vec<u8>,
    password: Vec<u8>,
}

impl Credentials {
    pub fn new(username: impl Into<Vec<u8>>, password: impl Into<Vec<u8>>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &[u8] {
        &self.username
    }

    pub fn password(&self) -> &[u8] {
        &self.password
    }

    pub fn validate(&self) -> Result<(), CredentialsError> {
        if self.username.len() > u8::MAX as usize {
            return Err(CredentialsError::TooLong {
                field: "username",
                len: self.username.len(),
            });
        }
        if self.password.len() > u8::MAX as usize {
            return Err(CredentialsError::TooLong {
                field: "password",
                len: self.password.len(),
            });
        }
        Ok(())
    }

    /// `VER | ULEN | UNAME | PLEN | PASSWD`
    pub(crate) fn auth_request(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(3 + self.username.len() + self.password.len());
        buf.push(AUTH_VER);
        buf.push(self.username.len() as u8);
        buf.extend_from_slice(&self.username);
        buf.push(self.password.len() as u8);
        buf.extend_from_slice(&self.password);
        buf
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &String::from_utf8_lossy(&self.username))
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn encode_ipv4() {
        let addr = Address::Ip(SocketAddr::new(Ipv4Addr::new(10, 0, 0, 1).into(), 443));
        assert_eq!(
            addr.encode().unwrap(),
            vec![ATYP_IPV4, 10, 0, 0, 1, 0x01, 0xbb]
        );
    }

    #[test]
    fn encode_ipv6() {
        let addr = Address::Ip(SocketAddr::new(Ipv6Addr::LOCALHOST.into(), 80));
        let buf = addr.encode().unwrap();
        assert_eq!(buf.len(), 1 + 16 + 2);
        assert_eq!(buf[0], ATYP_IPV6);
        assert_eq!(buf[16], 1);
        assert_eq!(&buf[17..], &[0x00, 0x50]);
    }

    #[test]
    fn encode_domain() {
        let addr = Address::Host("example.com".to_string(), 80);
        let mut expected = vec![ATYP_DOMAIN, 11];
        expected.extend_from_slice(b"example.com");
        expected.extend_from_slice(&[0x00, 0x50]);
        assert_eq!(addr.encode().unwrap(), expected);
    }

    #[test]
    fn encode_domain_too_long() {
        let addr = Address::Host("a".repeat(256), 80);
        assert!(matches!(
            addr.encode(),
            Err(AddressError::DomainTooLong(256))
        ));
    }

    #[test]
    fn parse_address() {
        assert_eq!(
            "example.com:8080".parse::<Address>().unwrap(),
            Address::Host("example.com".to_string(), 8080)
        );
        assert_eq!(
            "127.0.0.1:1080".parse::<Address>().unwrap(),
            Address::Ip("127.0.0.1:1080".parse().unwrap())
        );
        assert_eq!(
            "[::1]:443".parse::<Address>().unwrap(),
            Address::Ip("[::1]:443".parse().unwrap())
        );
        assert!("example.com".parse::<Address>().is_err());
        assert!("example.com:http".parse::<Address>().is_err());
        assert!(":80".parse::<Address>().is_err());
        assert!("::1".parse::<Address>().is_err());
    }

    #[test]
    fn auth_request_layout() {
        let credentials = Credentials::new("alice", "secret");
        assert_eq!(
            credentials.auth_request(),
            b"\x01\x05alice\x06secret".to_vec()
        );
    }

    #[test]
    fn validate_credentials() {
        assert!(Credentials::new("alice", "secret").validate().is_ok());
        assert!(Credentials::new("a".repeat(255), "").validate().is_ok());
        assert!(matches!(
            Credentials::new("a".repeat(256), "secret").validate(),
            Err(CredentialsError::TooLong {
                field: "username",
                len: 256
            })
        ));
        assert!(matches!(
            Credentials::new("alice", vec![0u8; 300]).validate(),
            Err(CredentialsError::TooLong {
                field: "password",
                len: 300
            })
        ));
    }

    #[test]
    fn debug_redacts_password() {
        let credentials = Credentials::new("alice", "secret");
        let out = format!("{:?}", credentials);
        assert!(out.contains("alice"));
        assert!(!out.contains("secret"));
    }
}
