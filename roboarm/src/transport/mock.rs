//! Scripted link for exercising the controller without hardware.
//!
//! Each write moves the next scripted reply into the receive queue, so a
//! test lists the device's answers in the order commands are sent.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::io;

use super::Link;
use crate::error::Result;

#[derive(Debug, Default)]
pub struct MockLink {
    replies: VecDeque<Vec<u8>>,
    queued: Vec<u8>,
    written: Vec<Vec<u8>>,
    discarded: Vec<u8>,
    fail_writes: bool,
}

impl MockLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the reply to the next command written.
    pub fn reply(mut self, bytes: impl AsRef<[u8]>) -> Self {
        self.push_reply(bytes);
        self
    }

    pub fn push_reply(&mut self, bytes: impl AsRef<[u8]>) {
        self.replies.push_back(bytes.as_ref().to_vec());
    }

    /// Put bytes in the receive queue as if the device had sent them
    /// unprompted.
    pub fn queue(&mut self, bytes: impl AsRef<[u8]>) {
        self.queued.extend_from_slice(bytes.as_ref());
    }

    /// Make every subsequent write fail with a broken pipe.
    pub fn fail_writes(&mut self) {
        self.fail_writes = true;
    }

    /// Every write so far, one entry per call.
    pub fn written(&self) -> &[Vec<u8>] {
        &self.written
    }

    /// Bytes thrown away by purges.
    pub fn discarded(&self) -> &[u8] {
        &self.discarded
    }

    /// Scripted replies not yet consumed.
    pub fn pending_replies(&self) -> usize {
        self.replies.len()
    }
}

#[async_trait]
impl Link for MockLink {
    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        if self.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock link write failure").into());
        }
        self.written.push(bytes.to_vec());
        if let Some(reply) = self.replies.pop_front() {
            self.queued.extend_from_slice(&reply);
        }
        Ok(())
    }

    async fn read_available(&mut self) -> Result<Vec<u8>> {
        Ok(std::mem::take(&mut self.queued))
    }

    async fn purge(&mut self) -> Result<()> {
        let stale = std::mem::take(&mut self.queued);
        self.discarded.extend_from_slice(&stale);
        Ok(())
    }
}
