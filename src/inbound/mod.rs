mod http;

use std::io::{Error, ErrorKind};
use std::sync::Arc;

use futures::stream::StreamExt;
use log::{debug, info, warn};
use socks5::Address;
use tokio::io::{copy_bidirectional, AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;

use crate::outbound::{Outbound, ProxyStream};
use http::{HttpAccept, HttpProxy};

/// Accepts HTTP proxy clients on `listen` and tunnels each of them through
/// `outbound`.
pub async fn run_http_proxy(listen: &str, outbound: Arc<dyn Outbound>) -> std::io::Result<()> {
    let listener = TcpListener::bind(listen).await?;
    info!(
        "HTTP proxy on {} via {} {}",
        listener.local_addr()?,
        outbound.kind(),
        outbound.name()
    );

    let mut incoming = TcpListenerStream::new(listener);
    while let Some(stream) = incoming.next().await {
        match stream {
            Ok(stream) => {
                let outbound = outbound.clone();
                tokio::spawn(async move {
                    if let Err(err) = serve(stream, outbound.as_ref()).await {
                        debug!("connection closed: {}", err);
                    }
                });
            }
            Err(err) => warn!("accept error: {}", err),
        }
    }

    Ok(())
}

async fn serve<S>(mut stream: S, outbound: &dyn Outbound) -> std::io::Result<(u64, u64)>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match HttpProxy::accept(&mut stream).await? {
        HttpAccept::Connect { host, pending } => {
            let destination = parse_destination(&host, 443)?;
            let mut server = connect(&mut stream, outbound, &destination).await?;
            HttpProxy::response_200(&mut stream).await?;
            server.write_all(&pending).await?;
            copy_bidirectional(&mut stream, &mut server).await
        }
        HttpAccept::Request { host, request } => {
            let destination = parse_destination(&host, 80)?;
            let mut server = connect(&mut stream, outbound, &destination).await?;
            server.write_all(&request).await?;
            copy_bidirectional(&mut stream, &mut server).await
        }
    }
}

/// Opens the upstream, answering the client with a 502 when that fails.
async fn connect<S>(
    stream: &mut S,
    outbound: &dyn Outbound,
    destination: &Address,
) -> std::io::Result<ProxyStream>
where
    S: AsyncWrite + Unpin,
{
    info!("{} - {}", outbound.name(), destination);

    match outbound.connect(destination).await {
        Ok(server) => Ok(server),
        Err(err) => {
            let _ = HttpProxy::response_502(stream).await;
            Err(err.into())
        }
    }
}

fn parse_destination(host: &str, default_port: u16) -> std::io::Result<Address> {
    let host = if host.ends_with(']') || !host.contains(':') {
        format!("{}:{}", host, default_port)
    } else {
        host.to_string()
    };

    host.parse::<Address>()
        .map_err(|err| Error::new(ErrorKind::InvalidInput, err))
}
