//! Registering a callback port with the server.

use std::net::SocketAddr;

use ledtube_core::encode_registration_port;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::info;

use super::ClientError;

/// Connects to `server`, sends `callback_port`, and closes the write side.
///
/// The server sends no acknowledgement.
///
/// # Errors
///
/// Returns [`ClientError::ConnectFailed`] or [`ClientError::Io`].
pub async fn register(server: SocketAddr, callback_port: u16) -> Result<(), ClientError> {
    let mut stream = TcpStream::connect(server)
        .await
        .map_err(|source| ClientError::ConnectFailed {
            addr: server,
            source,
        })?;
    stream.write_all(&encode_registration_port(callback_port)).await?;
    stream.shutdown().await?;
    info!("registered callback port {callback_port} with {server}");
    Ok(())
}
