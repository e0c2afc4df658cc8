//! Remote display transport.

use crate::core::domain::{
    error::{VirtError, VirtResult},
    model::console::ConsoleEndpoint,
};
use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

/// Length of the RFB protocol banner, e.g. `RFB 003.008\n`.
pub const RFB_BANNER_LEN: usize = 12;

/// An established display connection.
#[async_trait]
pub trait DisplayConnection: Send {
    /// Protocol version announced by the display server.
    fn protocol_version(&self) -> &str;

    async fn send(&mut self, data: &[u8]) -> VirtResult<()>;

    /// Reads into `buf`. A closed peer is an error.
    async fn recv(&mut self, buf: &mut [u8]) -> VirtResult<usize>;

    /// Releases the underlying handle.
    async fn close(&mut self) -> VirtResult<()>;
}

/// Opens display connections to negotiated endpoints.
#[async_trait]
pub trait DisplayTransport: Send + Sync {
    async fn connect(&self, endpoint: &ConsoleEndpoint) -> VirtResult<Box<dyn DisplayConnection>>;
}

/// Parses `RFB xxx.yyy\n` and returns `xxx.yyy`.
pub fn parse_rfb_banner(banner: &[u8]) -> VirtResult<String> {
    let invalid = || {
        VirtError::ConsoleSession(format!(
            "unexpected display server banner: {:?}",
            String::from_utf8_lossy(banner)
        ))
    };

    if banner.len() != RFB_BANNER_LEN || !banner.starts_with(b"RFB ") || banner[11] != b'\n' {
        return Err(invalid());
    }
    let version = &banner[4..11];
    let well_formed = version[3] == b'.'
        && version[..3].iter().all(u8::is_ascii_digit)
        && version[4..].iter().all(u8::is_ascii_digit);
    if !well_formed {
        return Err(invalid());
    }
    Ok(String::from_utf8_lossy(version).into_owned())
}

/// Plain TCP transport to an RFB display server.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpDisplayTransport;

impl TcpDisplayTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DisplayTransport for TcpDisplayTransport {
    async fn connect(&self, endpoint: &ConsoleEndpoint) -> VirtResult<Box<dyn DisplayConnection>> {
        let mut stream = TcpStream::connect((endpoint.host.as_str(), endpoint.port))
            .await
            .map_err(|e| VirtError::ConsoleSession(format!("connect to {} failed: {}", endpoint, e)))?;

        let mut banner = [0u8; RFB_BANNER_LEN];
        stream.read_exact(&mut banner).await.map_err(|e| {
            VirtError::ConsoleSession(format!("no banner from {}: {}", endpoint, e))
        })?;
        let version = parse_rfb_banner(&banner)?;
        debug!(%endpoint, %version, "display server answered");

        Ok(Box::new(TcpDisplayConnection { stream, version }))
    }
}

struct TcpDisplayConnection {
    stream: TcpStream,
    version: String,
}

fn io_error(e: std::io::Error) -> VirtError {
    VirtError::ConsoleSession(e.to_string())
}

#[async_trait]
impl DisplayConnection for TcpDisplayConnection {
    fn protocol_version(&self) -> &str {
        &self.version
    }

    async fn send(&mut self, data: &[u8]) -> VirtResult<()> {
        self.stream.write_all(data).await.map_err(io_error)
    }

    async fn recv(&mut self, buf: &mut [u8]) -> VirtResult<usize> {
        match self.stream.read(buf).await.map_err(io_error)? {
            0 if !buf.is_empty() => Err(VirtError::ConsoleSession(
                "display server closed the connection".to_string(),
            )),
            n => Ok(n),
        }
    }

    async fn close(&mut self) -> VirtResult<()> {
        self.stream.shutdown().await.map_err(io_error)
    }
}
