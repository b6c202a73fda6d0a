//! Operator console driven by text input against the in-memory backend.

#![allow(clippy::unwrap_used)]

use chrono::Utc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};
use vybeme_api::{AttendeeRecord, OrganizerPlan, ScanTicketResponse, ScannedAttendee, ScannedPlan};
use vybeme_checkin::mocks::MockTicketing;
use vybeme_checkin::{
    CameraPermission, CheckInReducer, CheckInState, Console, EventContext, Flow, ScanStatus,
};
use vybeme_runtime::Store;

const SLOW: Duration = Duration::from_secs(30);

fn backend() -> MockTicketing {
    let mock = MockTicketing::new("op-1");
    mock.set_plans(vec![OrganizerPlan {
        plan_id: "evt_1".to_string(),
        title: "Launch party".to_string(),
        location_text: None,
        date: None,
        time: None,
        plan_type: Some("business".to_string()),
    }]);
    mock.set_roster(
        "evt_1",
        vec![AttendeeRecord {
            registration_id: "r1".to_string(),
            user_id: "user-r1".to_string(),
            name: "Asha".to_string(),
            ticket_number: Some("T-r1".to_string()),
            checked_in: false,
            checked_in_at: None,
            price_paid: 25.0,
            created_at: Utc::now(),
        }],
    );
    mock.set_ticket(
        "ABC123",
        Ok(ScanTicketResponse {
            plan: ScannedPlan {
                plan_id: "evt_1".to_string(),
                title: Some("Launch party".to_string()),
                location_text: None,
                date: None,
                time: None,
            },
            attendee: ScannedAttendee {
                user_id: "user-r1".to_string(),
                name: "Asha".to_string(),
                profile_image: None,
                registration_id: Some("r1".to_string()),
            },
            checked_in_count: 1,
            total: 1,
            already_checked_in: false,
        }),
    );
    mock
}

fn console(env: MockTicketing) -> Console<MockTicketing> {
    vybeme_testing::init_test_tracing();
    Console::new(Store::new(CheckInState::default(), CheckInReducer::new(), env))
}

fn launch() -> Option<EventContext> {
    Some(EventContext::new("evt_1", "Launch party"))
}

async fn until(console: &Console<MockTicketing>, predicate: impl Fn(&CheckInState) -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !console.store().state(&predicate).await {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
}

/// Console scanning for `evt_1` with the camera granted
async fn scanning(env: MockTicketing) -> Console<MockTicketing> {
    let console = console(env);
    let banner = console.open(launch()).await.unwrap();
    assert_eq!(
        banner,
        vec!["Scanning for Launch party. Enter codes, or :help for commands.".to_string()]
    );
    until(&console, |s| s.camera == CameraPermission::Granted).await;
    console
}

/// Feed `script` to the console with a pause after each line
async fn run_script(
    console: &mut Console<MockTicketing>,
    script: &[&str],
    pause: Duration,
) -> Vec<String> {
    let (mut operator, terminal): (DuplexStream, DuplexStream) = tokio::io::duplex(1024);
    let mut output = Vec::new();

    let typing = async move {
        for line in script {
            operator.write_all(format!("{line}\n").as_bytes()).await.unwrap();
            tokio::time::sleep(pause).await;
        }
    };

    let (result, ()) = tokio::join!(
        console.run(BufReader::new(terminal).lines(), |line| output.push(line)),
        typing
    );
    result.unwrap();
    output
}

#[tokio::test]
async fn operator_can_leave_while_a_verification_hangs() {
    let console = scanning(backend().with_latency(SLOW)).await;

    let (flow, output) =
        tokio::time::timeout(Duration::from_millis(500), console.handle_line("ABC123"))
            .await
            .unwrap()
            .unwrap();
    assert_eq!(flow, Flow::Continue);
    assert_eq!(output, vec!["Verifying...".to_string()]);
    assert_eq!(
        console.store().state(|s| s.scan.status()).await,
        ScanStatus::Submitting
    );

    let (_, output) = console.handle_line("XYZ999").await.unwrap();
    assert_eq!(
        output,
        vec!["Still verifying the previous ticket. :back or :quit to leave.".to_string()]
    );

    let (flow, _) = tokio::time::timeout(Duration::from_millis(500), console.handle_line(":back"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(flow, Flow::Continue);
    assert!(console.store().state(|s| s.active_event().is_none()).await);

    let (flow, _) = console.handle_line(":quit").await.unwrap();
    assert_eq!(flow, Flow::Quit);
}

#[tokio::test]
async fn run_returns_on_quit_with_a_verification_outstanding() {
    let mut console = scanning(backend().with_latency(SLOW)).await;
    let input = BufReader::new(&b"ABC123\n:quit\n"[..]).lines();
    let mut output = Vec::new();

    tokio::time::timeout(
        Duration::from_secs(1),
        console.run(input, |line| output.push(line)),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(output, vec!["Verifying...".to_string()]);
}

#[tokio::test]
async fn verdict_is_printed_when_it_arrives() {
    let mut console = scanning(backend()).await;

    let output = run_script(
        &mut console,
        &["ABC123", ":quit"],
        Duration::from_millis(200),
    )
    .await;

    assert!(output.contains(&"Verifying...".to_string()));
    assert!(output.contains(&"✓ Asha (user-r1)".to_string()));
    assert_eq!(output.iter().filter(|line| line.starts_with('✓')).count(), 1);
}

#[tokio::test]
async fn late_verdict_after_leaving_is_not_printed() {
    let mut console = scanning(backend().with_latency(Duration::from_millis(400))).await;

    // The verdict lands between `:back` and `:quit`
    let output = run_script(
        &mut console,
        &["ABC123", ":back", ":quit"],
        Duration::from_millis(300),
    )
    .await;

    assert!(output.contains(&"Back to event selection. Loading your events...".to_string()));
    assert!(output.iter().all(|line| !line.starts_with('✓')));
    assert_eq!(
        console.store().state(|s| s.scan.status()).await,
        ScanStatus::Idle
    );
}

#[tokio::test]
async fn events_are_listed_then_chosen_by_number() {
    let mut console = console(backend());
    let opened = console.open(None).await.unwrap();
    assert_eq!(opened, vec!["Loading your events...".to_string()]);

    let output = run_script(&mut console, &["", "1", ":quit"], Duration::from_millis(150)).await;

    assert!(output.contains(&"  1. Launch party (evt_1)".to_string()));
    assert!(output.iter().any(|line| line.starts_with("Scanning for Launch party.")));
    assert!(output.contains(&"Checked in: 0/1".to_string()));
}

#[tokio::test]
async fn camera_denial_is_reported_and_blocks_codes() {
    let console = console(backend().with_camera_denied());
    console.open(launch()).await.unwrap();
    until(&console, CheckInState::needs_camera_permission).await;

    let (_, output) = console.handle_line("ABC123").await.unwrap();

    assert_eq!(
        output,
        vec!["Camera access was denied. Grant access and reopen the scanner.".to_string()]
    );
    assert!(console.store().state(|s| s.scan.in_flight().is_none()).await);
}
