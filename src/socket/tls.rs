//! rustls client session over a connected TCP socket.

use std::io;
use std::net::TcpStream;
use std::sync::Arc;

use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ClientConnection, RootCertStore, StreamOwned};

/// Wrap `stream` in a TLS session for `host`, verified against the webpki roots.
/// The TLS handshake itself runs lazily on first read/write.
pub(super) fn connect(
    host: &str,
    stream: TcpStream,
) -> io::Result<StreamOwned<ClientConnection, TcpStream>> {
    let root_store = RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let config = ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .map_err(io::Error::other)?
    .with_root_certificates(root_store)
    .with_no_client_auth();

    let server_name = ServerName::try_from(host.to_string()).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid hostname for TLS: {host}"),
        )
    })?;
    let conn = ClientConnection::new(Arc::new(config), server_name).map_err(io::Error::other)?;
    tracing::trace!(host, "tls session created");
    Ok(StreamOwned::new(conn, stream))
}
