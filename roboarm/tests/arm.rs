//! Controller behavior against a scripted link.

use roboarm::transport::MockLink;
use roboarm::{Angles, Direction, Error, RoboArm};
use std::time::Duration;
use test_case::test_case;

fn arm(link: MockLink) -> RoboArm<MockLink> {
    RoboArm::new(link, Duration::from_millis(500))
}

fn sent(arm: &RoboArm<MockLink>) -> Vec<String> {
    arm.link()
        .written()
        .iter()
        .map(|line| String::from_utf8_lossy(line).into_owned())
        .collect()
}

#[tokio::test(start_paused = true)]
async fn session_of_commands() {
    let link = MockLink::new()
        .reply("HW?\r\rRoboArm controller\r")
        .reply("CALIBRATION\r")
        .reply("SET+ANGLE=45,10\r\rANGLE::ok\r")
        .reply("STEP=1,25\r\rSTEP::ok\r")
        .reply("COUNTER?\r\r25\r")
        .reply("ANGLES?\r\rAngle up = 45 Angle down = 10\r")
        .reply("START=60\r\rSTART::ok\r")
        .reply("STOP\r\rSTOP::ok\r")
        .reply("Wait...\r");
    let mut arm = arm(link);

    assert!(arm.is_responding().await);
    arm.calibrate().await.unwrap();
    arm.set_angles(45, 10).await.unwrap();
    arm.step(Direction::Up, 25).await.unwrap();
    assert_eq!(arm.position().await.unwrap(), 25);
    assert_eq!(arm.angles().await.unwrap(), Angles { up: 45, down: 10 });
    arm.start_cyclic_movement(60).await.unwrap();
    arm.stop_cyclic_movement().await.unwrap();
    arm.continuous_movement(Direction::Down, 30, 100).await.unwrap();

    assert_eq!(
        sent(&arm),
        [
            "HW?\r",
            "CALIBRATION\r",
            "SET+ANGLE=45,10\r",
            "STEP=1,25\r",
            "COUNTER?\r",
            "ANGLES?\r",
            "START=60\r",
            "STOP\r",
            "DoNsteps=0,30,100\r",
        ]
    );
    assert_eq!(arm.link().pending_replies(), 0);
}

#[tokio::test(start_paused = true)]
async fn mismatched_echo_is_an_error() {
    let mut arm = arm(MockLink::new().reply("STOP\r\rSTOP::busy\r"));
    match arm.stop_cyclic_movement().await {
        Err(Error::UnexpectedResponse { command, received }) => {
            assert_eq!(command, "Stop");
            assert_eq!(received, "STOP\r\rSTOP::busy\r");
        }
        other => panic!("expected UnexpectedResponse, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn silence_is_an_error() {
    let mut arm = arm(MockLink::new());
    assert!(matches!(
        arm.calibrate().await,
        Err(Error::UnexpectedResponse { .. })
    ));
    assert!(matches!(
        arm.position().await,
        Err(Error::UnexpectedResponse { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn write_failure_is_an_error() {
    let mut link = MockLink::new().reply("CALIBRATION\r");
    link.fail_writes();
    let mut arm = arm(link);
    assert!(matches!(arm.calibrate().await, Err(Error::Io(_))));
}

#[tokio::test(start_paused = true)]
async fn late_reply_is_discarded_before_next_command() {
    // The arm answers the stop only after the settle delay has passed; the
    // late echo must not be taken as the reply to the next command.
    let mut arm = arm(MockLink::new().reply("").reply("CALIBRATION\r"));
    assert!(arm.stop_cyclic_movement().await.is_err());

    arm.link_mut().queue("STOP\r\rSTOP::ok\r");
    arm.calibrate().await.unwrap();
    assert_eq!(arm.link().discarded(), b"STOP\r\rSTOP::ok\r");
}

enum Op {
    Step(i32),
    Start(i32),
    SetAngles(i32, i32),
    Move(i32, i32),
}

#[test_case(Op::Step(0) ; "step zero")]
#[test_case(Op::Step(101) ; "step too many")]
#[test_case(Op::Start(0) ; "start zero speed")]
#[test_case(Op::Start(101) ; "start too fast")]
#[test_case(Op::SetAngles(-1, 0) ; "negative up angle")]
#[test_case(Op::SetAngles(0, 91) ; "down angle too large")]
#[test_case(Op::Move(0, 50) ; "move zero speed")]
#[test_case(Op::Move(50, 101) ; "move too many steps")]
fn out_of_range_arguments_are_never_sent(op: Op) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .unwrap();

    runtime.block_on(async {
        let mut arm = arm(MockLink::new().reply("anything\r"));
        let result = match op {
            Op::Step(steps) => arm.step(Direction::Up, steps).await,
            Op::Start(speed) => arm.start_cyclic_movement(speed).await,
            Op::SetAngles(up, down) => arm.set_angles(up, down).await,
            Op::Move(speed, steps) => arm.continuous_movement(Direction::Up, speed, steps).await,
        };
        assert!(matches!(result, Err(Error::OutOfRange { .. })), "got {result:?}");
        assert!(arm.link().written().is_empty());
        assert_eq!(arm.link().pending_replies(), 1);
    });
}

#[test_case(1, 1 ; "lower bounds")]
#[test_case(100, 100 ; "upper bounds")]
fn boundary_arguments_are_accepted(speed: i32, steps: i32) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .unwrap();

    runtime.block_on(async {
        let mut arm = arm(MockLink::new().reply("Wait...\r"));
        arm.continuous_movement(Direction::Up, speed, steps)
            .await
            .unwrap();
        assert_eq!(
            sent(&arm),
            [format!("DoNsteps=1,{},{}\r", speed, steps)]
        );
    });
}
