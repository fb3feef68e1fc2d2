//! TCP client for the broker's command port

use std::io;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use courier_protocol::{Delivery, encode, encode_frame};

use crate::Result;

/// Connection to a broker
///
/// Protocol: 4-byte big-endian length prefix + command frame
pub struct Client {
    stream: TcpStream,
}

impl Client {
    /// Connect to a broker
    ///
    /// # Arguments
    ///
    /// * `addr` - Address to connect to (e.g., "127.0.0.1:7070")
    pub async fn connect(addr: &str) -> io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Self { stream })
    }

    /// Encode and send one command frame
    pub async fn send(&mut self, delivery: &Delivery) -> Result<()> {
        let frame = encode_frame(&encode(delivery)?)?;
        self.stream.write_all(&frame).await?;
        Ok(())
    }

    /// Send raw bytes with length prefix
    ///
    /// For testing malformed frames.
    pub async fn send_raw(&mut self, data: &[u8]) -> io::Result<()> {
        let len = data.len() as u32;
        self.stream.write_all(&len.to_be_bytes()).await?;
        self.stream.write_all(data).await?;
        Ok(())
    }

    /// Write bytes exactly as given, without a length prefix
    pub async fn write_unframed(&mut self, data: &[u8]) -> io::Result<()> {
        self.stream.write_all(data).await
    }

    /// Flush the stream
    pub async fn flush(&mut self) -> io::Result<()> {
        self.stream.flush().await
    }

    /// Close the connection gracefully
    pub async fn close(mut self) -> io::Result<()> {
        self.stream.shutdown().await
    }

    /// Get the local address
    pub fn local_addr(&self) -> io::Result<std::net::SocketAddr> {
        self.stream.local_addr()
    }
}
