use std::io::{Error, ErrorKind};

use httparse::Status;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

const MAX_HEADER_LEN: usize = 1500;
const MAX_HEADERS: usize = 64;

#[derive(Debug, PartialEq, Eq)]
pub enum HttpAccept {
    /// `pending` holds bytes the client sent after the request head.
    Connect { host: String, pending: Vec<u8> },
    Request { host: String, request: Vec<u8> },
}

pub struct HttpProxy;

impl HttpProxy {
    pub async fn accept<S>(stream: &mut S) -> std::io::Result<HttpAccept>
    where
        S: AsyncRead + Unpin,
    {
        let mut buf = vec![0u8; MAX_HEADER_LEN];
        let mut len = 0;

        while len < buf.len() {
            let size = stream.read(&mut buf[len..]).await?;
            if size == 0 {
                return Err(Error::new(ErrorKind::ConnectionAborted, "client closed"));
            }
            len += size;

            let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
            let mut req = httparse::Request::new(&mut headers);

            let offset = match req.parse(&buf[0..len]) {
                Ok(Status::Complete(offset)) => offset,
                Ok(Status::Partial) => {
                    continue;
                }
                Err(httparse::Error::TooManyHeaders) => {
                    return Err(Error::new(ErrorKind::InvalidData, "too many http headers"));
                }
                Err(_) => {
                    return Err(Error::new(ErrorKind::InvalidData, "http error"));
                }
            };

            if req.method.is_some_and(|m| m.eq_ignore_ascii_case("CONNECT")) {
                return match req.path {
                    Some(path) if !path.is_empty() => Ok(HttpAccept::Connect {
                        host: path.to_string(),
                        pending: buf[offset..len].to_vec(),
                    }),
                    _ => Err(Error::new(ErrorKind::InvalidData, "CONNECT path empty")),
                };
            }

            let host = req
                .headers
                .iter()
                .find(|header| header.name.eq_ignore_ascii_case("HOST"))
                .and_then(|header| String::from_utf8(header.value.to_vec()).ok())
                .unwrap_or_default();

            if host.is_empty() {
                return Err(Error::new(ErrorKind::InvalidData, "Host empty"));
            }

            buf.truncate(len);
            return Ok(HttpAccept::Request { host, request: buf });
        }

        Err(Error::new(ErrorKind::InvalidData, "http header too large"))
    }

    pub async fn response_200<S>(stream: &mut S) -> std::io::Result<()>
    where
        S: AsyncWrite + Unpin,
    {
        const HTTP_200_OK: &str = "HTTP/1.1 200 OK\r\n\r\n";
        stream.write_all(HTTP_200_OK.as_bytes()).await
    }

    pub async fn response_502<S>(stream: &mut S) -> std::io::Result<()>
    where
        S: AsyncWrite + Unpin,
    {
        const HTTP_502: &str = "HTTP/1.1 502 Bad Gateway\r\nContent-Length: 0\r\n\r\n";
        stream.write_all(HTTP_502.as_bytes()).await
    }
}
