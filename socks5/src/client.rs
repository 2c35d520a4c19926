use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::HandshakeError;
use crate::proto::*;

/// Runs the client side of a SOCKS5 CONNECT handshake over `stream`.
///
/// Offers exactly one method: username/password when `credentials` is
/// given, no-auth otherwise. `target` must already be encoded as
/// `ATYP | ADDR | PORT` (see [`Address::encode`]) and is written verbatim.
///
/// On success the stream sits right after the 10 byte CONNECT reply and is
/// ready for relaying. The reply code is not inspected. On failure the
/// stream is left as is; dropping it is up to the caller.
pub async fn handshake<S>(
    stream: &mut S,
    credentials: Option<&Credentials>,
    target: &[u8],
) -> Result<(), HandshakeError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut connector = Connector {
        stream,
        credentials,
        target,
    };

    let mut state = State::Start;
    loop {
        state = match state {
            State::ConnectAcked => return Ok(()),
            state => connector.step(state).await?,
        };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    MethodSent { offered: u8 },
    MethodAcked { method: u8 },
    AuthSent,
    AuthAcked,
    ConnectSent,
    ConnectAcked,
}

struct Connector<'a, S> {
    stream: &'a mut S,
    credentials: Option<&'a Credentials>,
    target: &'a [u8],
}

impl<S> Connector<'_, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Performs the single I/O operation that leaves `state`.
    async fn step(&mut self, state: State) -> Result<State, HandshakeError> {
        match state {
            State::Start => self.send_greeting().await,
            State::MethodSent { offered } => self.recv_method(offered).await,
            State::MethodAcked {
                method: USERNAME_PASSWORD,
            } => match self.credentials {
                Some(credentials) => self.send_auth(credentials).await,
                None => Err(HandshakeError::AuthMethodRejected(USERNAME_PASSWORD)),
            },
            State::MethodAcked { method: NO_AUTH } | State::AuthAcked => {
                self.send_connect().await
            }
            State::MethodAcked { method } => Err(HandshakeError::AuthMethodRejected(method)),
            State::AuthSent => self.recv_auth().await,
            State::ConnectSent => self.recv_connect().await,
            State::ConnectAcked => Ok(State::ConnectAcked),
        }
    }

    async fn send_greeting(&mut self) -> Result<State, HandshakeError> {
        let offered = if self.credentials.is_some() {
            USERNAME_PASSWORD
        } else {
            NO_AUTH
        };

        self.write(&[VER, 1, offered]).await?;
        Ok(State::MethodSent { offered })
    }

    async fn recv_method(&mut self, offered: u8) -> Result<State, HandshakeError> {
        let mut response = [0u8; 2];
        self.stream.read_exact(&mut response).await?;

        let [ver, method] = response;
        if ver != VER {
            return Err(HandshakeError::ProtocolVersionMismatch(ver));
        }
        if method != offered {
            return Err(HandshakeError::AuthMethodRejected(method));
        }

        Ok(State::MethodAcked { method })
    }

    async fn send_auth(&mut self, credentials: &Credentials) -> Result<State, HandshakeError> {
        self.write(&credentials.auth_request()).await?;
        Ok(State::AuthSent)
    }

    async fn recv_auth(&mut self) -> Result<State, HandshakeError> {
        let mut response = [0u8; 2];
        self.stream.read_exact(&mut response).await?;

        // Some servers answer with the SOCKS version instead of RFC 1929's.
        let [ver, status] = response;
        if ver != AUTH_VER && ver != VER {
            return Err(HandshakeError::ProtocolVersionMismatch(ver));
        }
        if status != AUTH_SUCCESS {
            return Err(HandshakeError::AuthRejected(status));
        }

        Ok(State::AuthAcked)
    }

    async fn send_connect(&mut self) -> Result<State, HandshakeError> {
        let mut request = Vec::with_capacity(3 + self.target.len());
        request.extend_from_slice(&[VER, CMD_CONNECT, RSV]);
        request.extend_from_slice(self.target);

        self.write(&request).await?;
        Ok(State::ConnectSent)
    }

    async fn recv_connect(&mut self) -> Result<State, HandshakeError> {
        let mut response = [0u8; CONNECT_REPLY_LEN];
        self.stream.read_exact(&mut response).await?;
        Ok(State::ConnectAcked)
    }

    async fn write(&mut self, buf: &[u8]) -> Result<(), HandshakeError> {
        self.stream.write_all(buf).await?;
        self.stream.flush().await?;
        Ok(())
    }
}
