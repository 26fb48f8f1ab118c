//! Robo arm controller.
//!
//! [`RoboArm`] owns the link to the arm and turns each high-level operation
//! into one command line, then checks the device's echo. Requests are
//! strictly sequential: every operation takes `&mut self`, writes its line,
//! waits a fixed settle delay and then reads whatever the device has queued.
//! There is no handshake beyond that delay and no retry.

use bytes::BytesMut;
use std::time::Duration;
use tokio::time;
use tokio_util::codec::Encoder;

use crate::config::Config;
use crate::error::Result;
use crate::protocol::{self, Angles, Command, CommandCodec, Direction};
use crate::tracing::prelude::*;
use crate::transport::{Link, SerialLink};

/// Size of the transmit buffer; every command line fits.
const TX_CAPACITY: usize = 64;

/// Controller for one arm over one link.
pub struct RoboArm<L: Link> {
    link: L,
    codec: CommandCodec,
    tx: BytesMut,
    settle_delay: Duration,
}

impl RoboArm<SerialLink> {
    /// Open the arm named by the configuration.
    ///
    /// Fails with [`crate::Error::DeviceNotFound`] when no bridge with the
    /// configured serial number is attached.
    pub fn connect(config: &Config) -> Result<Self> {
        let link = SerialLink::open(&config.device.serial_number)?;
        Ok(Self::new(link, config.device.settle_delay()))
    }
}

impl<L: Link> RoboArm<L> {
    pub fn new(link: L, settle_delay: Duration) -> Self {
        Self {
            link,
            codec: CommandCodec,
            tx: BytesMut::with_capacity(TX_CAPACITY),
            settle_delay,
        }
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn into_link(self) -> L {
        self.link
    }

    /// Send one command and return the raw reply.
    ///
    /// Arguments are validated before anything is written, so a rejected
    /// command leaves the device untouched.
    async fn transact(&mut self, command: Command) -> Result<Vec<u8>> {
        self.tx.clear();
        self.codec.encode(command, &mut self.tx)?;

        // Drop anything left over from an earlier exchange
        self.link.purge().await?;

        self.link.write(&self.tx).await?;
        debug!(
            command = command.name(),
            "Sent: {}",
            String::from_utf8_lossy(&self.tx).escape_debug()
        );

        time::sleep(self.settle_delay).await;

        let reply = self.link.read_available().await?;
        debug!(
            command = command.name(),
            "Received: {}",
            String::from_utf8_lossy(&reply).escape_debug()
        );
        Ok(reply)
    }

    async fn expect_ack(&mut self, command: Command) -> Result<()> {
        let reply = self.transact(command).await?;
        command.check_echo(&reply)
    }

    /// Probe the arm with a hardware query.
    ///
    /// A completed exchange counts as responding, whatever the arm answered.
    /// Transport failures and timeouts count as not responding.
    pub async fn is_responding(&mut self) -> bool {
        match self.expect_ack(Command::Hardware).await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "Robo arm is not responding");
                false
            }
        }
    }

    /// Read the step counter.
    pub async fn position(&mut self) -> Result<i32> {
        let reply = self.transact(Command::Counter).await?;
        protocol::decode_position(&reply)
    }

    /// Read both joint angles.
    pub async fn angles(&mut self) -> Result<Angles> {
        let reply = self.transact(Command::Angles).await?;
        protocol::decode_angles(&reply)
    }

    /// Move `steps` steps (1 to 100) in `direction`.
    pub async fn step(&mut self, direction: Direction, steps: i32) -> Result<()> {
        self.expect_ack(Command::Step { direction, steps }).await
    }

    /// Start cyclic movement at `speed` (1 to 100).
    pub async fn start_cyclic_movement(&mut self, speed: i32) -> Result<()> {
        self.expect_ack(Command::Start { speed }).await
    }

    pub async fn stop_cyclic_movement(&mut self) -> Result<()> {
        self.expect_ack(Command::Stop).await
    }

    /// Set both joint angles, each 0 to 90 degrees.
    pub async fn set_angles(&mut self, up: i32, down: i32) -> Result<()> {
        self.expect_ack(Command::SetAngles { up, down }).await
    }

    pub async fn calibrate(&mut self) -> Result<()> {
        self.expect_ack(Command::Calibration).await
    }

    /// Move `steps` steps in `direction` at `speed`. The arm acknowledges
    /// with `Wait...` and keeps moving after the call returns.
    pub async fn continuous_movement(
        &mut self,
        direction: Direction,
        speed: i32,
        steps: i32,
    ) -> Result<()> {
        self.expect_ack(Command::ContinuousMove {
            direction,
            speed,
            steps,
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockLink;

    const SETTLE: Duration = Duration::from_millis(500);

    fn arm(link: MockLink) -> RoboArm<MockLink> {
        RoboArm::new(link, SETTLE)
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_settle_delay_before_reading() {
        let mut arm = arm(MockLink::new().reply("STOP\r\rSTOP::ok\r"));
        let started = time::Instant::now();
        arm.stop_cyclic_movement().await.unwrap();
        assert!(started.elapsed() >= SETTLE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purges_stale_bytes_before_writing() {
        let mut link = MockLink::new().reply("CALIBRATION\r");
        link.queue("STEP::ok\r");
        let mut arm = arm(link);

        arm.calibrate().await.unwrap();

        let link = arm.into_link();
        assert_eq!(link.discarded(), b"STEP::ok\r");
        assert_eq!(link.written(), &[b"CALIBRATION\r".to_vec()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transmit_buffer_reused_between_commands() {
        let mut arm = arm(
            MockLink::new()
                .reply("SET+ANGLE=10,20\r\rANGLE::ok\r")
                .reply("STOP\r\rSTOP::ok\r"),
        );
        arm.set_angles(10, 20).await.unwrap();
        arm.stop_cyclic_movement().await.unwrap();
        assert_eq!(
            arm.link().written(),
            &[b"SET+ANGLE=10,20\r".to_vec(), b"STOP\r".to_vec()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_is_responding() {
        let mut arm = arm(MockLink::new().reply("HW?\r\rRoboArm\r"));
        assert!(arm.is_responding().await);
        // No scripted reply: the exchange completes with nothing queued.
        assert!(arm.is_responding().await);
        assert_eq!(arm.link().written().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_is_responding_on_write_failure() {
        let mut link = MockLink::new();
        link.fail_writes();
        let mut arm = arm(link);
        assert!(!arm.is_responding().await);
    }
}
