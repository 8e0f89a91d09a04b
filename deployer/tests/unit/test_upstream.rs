//! Upstream change detection against a marker file

use std::path::Path;

use mockito::Server;

use fwfleet::app::options::CheckOptions;
use fwfleet::app::run::check_upstream;
use fwfleet::errors::FleetError;
use fwfleet::storage::settings::UpstreamSettings;
use fwfleet::upstream::Trigger;

const REV_A: &str = "1f2e3d4c5b6a798897a6b5c4d3e2f1a0b9c8d7e6";
const REV_B: &str = "aa11bb22cc33dd44ee55ff6600778899aabbccdd";

fn options(marker: &Path, revision: Option<&str>, trigger: Trigger) -> CheckOptions {
    CheckOptions {
        revision: revision.map(str::to_string),
        trigger,
        upstream: UpstreamSettings {
            marker_file: marker.to_path_buf(),
            ..Default::default()
        },
        github_token: None,
    }
}

fn read_marker(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

#[tokio::test]
async fn test_first_run_is_changed() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join(".last_upstream_commit");

    let changed = check_upstream(&options(&marker, Some(REV_A), Trigger::Schedule))
        .await
        .unwrap();

    assert!(changed);
    assert_eq!(read_marker(&marker), REV_A);
}

#[tokio::test]
async fn test_same_revision_is_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join(".last_upstream_commit");
    std::fs::write(&marker, format!("{}\n", REV_A)).unwrap();

    let changed = check_upstream(&options(&marker, Some(REV_A), Trigger::Schedule))
        .await
        .unwrap();

    assert!(!changed);
    assert_eq!(read_marker(&marker), REV_A);
}

#[tokio::test]
async fn test_new_revision_is_changed_once() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join(".last_upstream_commit");
    std::fs::write(&marker, REV_A).unwrap();

    let opts = options(&marker, Some(REV_B), Trigger::Schedule);
    assert!(check_upstream(&opts).await.unwrap());
    assert_eq!(read_marker(&marker), REV_B);

    // The next scheduled run sees the stored revision
    assert!(!check_upstream(&opts).await.unwrap());
}

#[tokio::test]
async fn test_corrupt_marker_fails_open() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join(".last_upstream_commit");
    std::fs::write(&marker, "garbage with spaces\n").unwrap();

    let changed = check_upstream(&options(&marker, Some(REV_A), Trigger::Schedule))
        .await
        .unwrap();

    assert!(changed);
    assert_eq!(read_marker(&marker), REV_A);
}

#[tokio::test]
async fn test_push_trigger_bypasses_marker() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join(".last_upstream_commit");

    for trigger in [Trigger::Push, Trigger::Manual] {
        let changed = check_upstream(&options(&marker, None, trigger))
            .await
            .unwrap();
        assert!(changed);
    }
    assert!(!marker.exists());
}

#[tokio::test]
async fn test_fetches_head_revision() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/repos/skot/ESP-miner/commits/master")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(format!(r#"{{"sha":"{}","commit":{{}}}}"#, REV_B))
        .expect(1)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join(".last_upstream_commit");
    std::fs::write(&marker, REV_A).unwrap();
    let mut opts = options(&marker, None, Trigger::Schedule);
    opts.upstream.api_base = server.url();

    assert!(check_upstream(&opts).await.unwrap());
    assert_eq!(read_marker(&marker), REV_B);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_fetch_failure_keeps_marker() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/repos/skot/ESP-miner/commits/master")
        .with_status(403)
        .with_body(r#"{"message":"API rate limit exceeded"}"#)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join(".last_upstream_commit");
    std::fs::write(&marker, REV_A).unwrap();
    let mut opts = options(&marker, None, Trigger::Schedule);
    opts.upstream.api_base = server.url();

    assert!(check_upstream(&opts).await.is_err());
    assert_eq!(read_marker(&marker), REV_A);
}

#[tokio::test]
async fn test_blank_revision_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join(".last_upstream_commit");
    std::fs::write(&marker, REV_A).unwrap();

    // Repeated runs never announce a change nor clobber the stored revision
    for _ in 0..3 {
        let result = check_upstream(&options(&marker, Some("  "), Trigger::Schedule)).await;
        assert!(matches!(result, Err(FleetError::Configuration(_))));
        assert_eq!(read_marker(&marker), REV_A);
    }
}

#[tokio::test]
async fn test_blank_revision_leaves_first_run_unmarked() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join(".last_upstream_commit");

    assert!(check_upstream(&options(&marker, Some(""), Trigger::Schedule))
        .await
        .is_err());
    assert!(!marker.exists());
}
