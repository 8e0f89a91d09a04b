//! FSM unit tests

use tokio_test::{assert_err, assert_ok};

use fwfleet::deploy::fsm::{UpdateEvent, UpdateFsm, UpdateState};
use fwfleet::models::outcome::UpdateStage;

#[test]
fn test_fsm_initial_state() {
    let fsm = UpdateFsm::new();
    assert_eq!(fsm.state(), UpdateState::Idle);
    assert!(fsm.error().is_none());
    assert_eq!(fsm.attempts(), 0);
}

#[test]
fn test_fsm_retry_within_stage() {
    let mut fsm = UpdateFsm::new();
    fsm.process(UpdateEvent::Start).unwrap();

    fsm.process(UpdateEvent::AttemptFailed("timeout".to_string()))
        .unwrap();
    assert_eq!(fsm.state(), UpdateState::FirmwareUploading);
    assert_eq!(fsm.attempts(), 1);
    assert!(fsm.can_retry(3));

    fsm.process(UpdateEvent::AttemptFailed("refused".to_string()))
        .unwrap();
    assert_eq!(fsm.attempts(), 2);
    assert_eq!(fsm.error(), Some("refused"));
    assert!(fsm.can_retry(3));
    assert!(!fsm.can_retry(2));

    fsm.process(UpdateEvent::UploadAccepted).unwrap();
    assert_eq!(fsm.state(), UpdateState::FirmwareVerified);
    assert!(!fsm.can_retry(10));
}

#[test]
fn test_fsm_attempts_reset_per_stage() {
    let mut fsm = UpdateFsm::new();
    fsm.process(UpdateEvent::Start).unwrap();
    fsm.process(UpdateEvent::AttemptFailed("timeout".to_string()))
        .unwrap();
    fsm.process(UpdateEvent::UploadAccepted).unwrap();
    fsm.process(UpdateEvent::Settled).unwrap();

    assert_eq!(fsm.state(), UpdateState::WwwUploading);
    assert_eq!(fsm.attempts(), 0);
    assert!(fsm.error().is_none());
}

#[test]
fn test_fsm_failure_records_stage() {
    let cases = [
        (0, UpdateStage::FirmwareUpload),
        (1, UpdateStage::FirmwareSettle),
        (2, UpdateStage::WwwUpload),
    ];

    for (advance, expected) in cases {
        let mut fsm = UpdateFsm::new();
        fsm.process(UpdateEvent::Start).unwrap();
        if advance >= 1 {
            fsm.process(UpdateEvent::UploadAccepted).unwrap();
        }
        if advance >= 2 {
            fsm.process(UpdateEvent::Settled).unwrap();
        }

        assert_ok!(fsm.process(UpdateEvent::GiveUp("stop".to_string())));
        assert_eq!(fsm.state(), UpdateState::Failed(expected));
        assert!(fsm.state().is_terminal());
    }
}

#[test]
fn test_fsm_invalid_transitions() {
    let mut fsm = UpdateFsm::new();

    // Cannot upload before starting
    assert_err!(fsm.process(UpdateEvent::UploadAccepted));
    // Cannot settle before the firmware was accepted
    fsm.process(UpdateEvent::Start).unwrap();
    assert_err!(fsm.process(UpdateEvent::Settled));
    // Settling has no upload attempts
    fsm.process(UpdateEvent::UploadAccepted).unwrap();
    assert_err!(fsm.process(UpdateEvent::AttemptFailed("x".to_string())));

    fsm.process(UpdateEvent::Settled).unwrap();
    fsm.process(UpdateEvent::UploadAccepted).unwrap();
    assert_eq!(fsm.state(), UpdateState::WwwVerified);
    // Terminal success cannot be failed afterwards
    assert_err!(fsm.process(UpdateEvent::GiveUp("late".to_string())));
    assert_err!(fsm.process(UpdateEvent::Start));
}
