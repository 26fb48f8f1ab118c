//! Serial port link to the arm's USB-to-serial bridge.

use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time;
use tokio_serial::{
    ClearBuffer, DataBits, FlowControl, Parity, SerialPort, SerialPortBuilderExt, SerialStream,
    StopBits,
};

use super::{find_device, Link};
use crate::error::{Error, Result};
use crate::tracing::prelude::*;

/// Line speed the arm firmware runs at. Framing is 8N1 without flow control.
pub const BAUD_RATE: u32 = 57600;

/// Read and write timeout: the bridge's 300 ms default plus two seconds.
pub const IO_TIMEOUT: Duration = Duration::from_millis(2300);

/// Largest reply read in one go. Anything beyond stays queued and is
/// discarded by the next purge.
pub const RX_CAPACITY: usize = 256;

/// Serial link to the arm.
pub struct SerialLink {
    stream: SerialStream,
    port_name: String,
}

impl SerialLink {
    /// Open the bridge with the given USB serial number.
    pub fn open(serial_number: &str) -> Result<Self> {
        let device = find_device(serial_number)?;
        debug!(
            serial = %serial_number,
            port = %device.port_name,
            "Found USB serial bridge {:04x}:{:04x}",
            device.vid,
            device.pid
        );
        Self::open_path(&device.port_name)
    }

    /// Open a serial port by path with the arm's line settings.
    pub fn open_path(path: &str) -> Result<Self> {
        let stream = tokio_serial::new(path, BAUD_RATE)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .parity(Parity::None)
            .flow_control(FlowControl::None)
            .timeout(IO_TIMEOUT)
            .open_native_async()?;

        // Start from empty queues in both directions
        stream.clear(ClearBuffer::All)?;

        info!(port = %path, baud = BAUD_RATE, "Opened robo arm");
        Ok(Self {
            stream,
            port_name: path.to_string(),
        })
    }

    /// Wrap an already-open stream, leaving its settings untouched.
    pub fn from_stream(stream: SerialStream) -> Self {
        let port_name = stream.name().unwrap_or_else(|| "<unnamed>".to_string());
        Self { stream, port_name }
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

#[async_trait]
impl Link for SerialLink {
    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        time::timeout(IO_TIMEOUT, async {
            self.stream.write_all(bytes).await?;
            self.stream.flush().await
        })
        .await
        .map_err(|_| Error::Timeout)??;
        Ok(())
    }

    async fn read_available(&mut self) -> Result<Vec<u8>> {
        let queued = self.queued()?;
        if queued > RX_CAPACITY {
            warn!(
                port = %self.port_name,
                queued,
                "Reply larger than receive buffer, reading first {} bytes",
                RX_CAPACITY
            );
        }
        self.read_queued(queued.min(RX_CAPACITY)).await
    }

    // Everything queued when the purge starts is read and dropped, in
    // receive-buffer sized pieces.
    async fn purge(&mut self) -> Result<()> {
        let queued = self.queued()?;
        let mut remaining = queued;
        while remaining > 0 {
            let chunk = self.read_queued(remaining.min(RX_CAPACITY)).await?;
            remaining -= chunk.len();
        }
        if queued > 0 {
            trace!(port = %self.port_name, discarded = queued, "Purged receive queue");
        }
        Ok(())
    }
}

impl SerialLink {
    fn queued(&self) -> Result<usize> {
        Ok(self.stream.bytes_to_read()? as usize)
    }

    // Read exactly `len` bytes the driver reported as queued.
    async fn read_queued(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        if len > 0 {
            time::timeout(IO_TIMEOUT, self.stream.read_exact(&mut buf))
                .await
                .map_err(|_| Error::Timeout)??;
        }
        Ok(buf)
    }
}

impl Drop for SerialLink {
    fn drop(&mut self) {
        info!(port = %self.port_name, "Closing robo arm");
    }
}
