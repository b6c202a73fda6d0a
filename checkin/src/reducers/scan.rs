//! Scan/verify cycle.
//!
//! `Idle -> Submitting -> {Confirmed | WrongEvent | Rejected} -> Idle`.
//! One attempt is in flight at most; payloads arriving while submitting or
//! while a verdict is shown are ignored. Only `ScanAgain` returns to idle.

use super::{Effects, is_stale};
use crate::actions::CheckInAction;
use crate::environment::CheckInEnvironment;
use crate::state::{CheckInState, ScanPhase};
use crate::types::{
    AttendanceCounters, EventContext, GENERIC_REJECTION, Notice, ScanAttempt, ScanVerdict,
    VERIFICATION_TIMED_OUT,
};
use tracing::{debug, info, warn};
use vybeme_api::{ApiError, ScanTicketResponse};
use vybeme_core::{effect::Effect, smallvec};

/// Submit a decoded payload if the decoder is active
pub fn code_decoded<E: CheckInEnvironment>(
    state: &mut CheckInState,
    payload: &str,
    env: &E,
) -> Effects {
    let code = payload.trim();
    if code.is_empty() {
        return smallvec![Effect::None];
    }

    if !state.decoder_active() {
        debug!(status = ?state.scan.status(), "Decoder inactive, ignoring payload");
        return smallvec![Effect::None];
    }

    let attempt = ScanAttempt {
        attempt_id: state.scan.next_attempt_id,
        raw_code: code.to_string(),
        submitted_at: env.clock().now(),
    };
    state.scan.next_attempt_id += 1;
    state.notice = None;

    let epoch = state.epoch;
    let attempt_id = attempt.attempt_id;
    info!(attempt_id, "Submitting scanned code");
    crate::metrics::record_scan_submitted();

    let request = env.scan_ticket(attempt.raw_code.clone());
    state.scan.phase = ScanPhase::Submitting(attempt);

    let verify = Effect::future(async move {
        Some(CheckInAction::ScanVerified {
            epoch,
            attempt_id,
            result: request.await,
        })
    });

    match env.scan_timeout() {
        Some(duration) => smallvec![
            verify,
            Effect::Delay {
                duration,
                action: Box::new(CheckInAction::ScanTimedOut { epoch, attempt_id }),
            }
        ],
        None => smallvec![verify],
    }
}

/// Classify and apply a verification result
pub fn scan_verified(
    state: &mut CheckInState,
    epoch: u64,
    attempt_id: u64,
    result: Result<ScanTicketResponse, ApiError>,
) -> Effects {
    if is_stale(state, epoch, "scan") || !awaiting(state, attempt_id) {
        return smallvec![Effect::None];
    }

    let Some(active) = state.active_event() else {
        return smallvec![Effect::None];
    };

    let verdict = classify(active, result);
    apply_verdict(state, verdict);
    smallvec![Effect::None]
}

/// Reject the attempt if it is still waiting
pub fn scan_timed_out(state: &mut CheckInState, epoch: u64, attempt_id: u64) -> Effects {
    if is_stale(state, epoch, "scan timeout") || !awaiting(state, attempt_id) {
        return smallvec![Effect::None];
    }

    apply_verdict(
        state,
        ScanVerdict::Rejected {
            reason: VERIFICATION_TIMED_OUT.to_string(),
        },
    );
    smallvec![Effect::None]
}

/// Clear the verdict and reactivate the decoder
pub fn scan_again(state: &mut CheckInState) -> Effects {
    if state.scan.verdict().is_none() {
        debug!(status = ?state.scan.status(), "No verdict to clear");
        return smallvec![Effect::None];
    }

    state.scan.reset();
    if matches!(
        state.notice,
        Some(Notice::WrongEvent { .. } | Notice::ScanRejected { .. })
    ) {
        state.notice = None;
    }
    smallvec![Effect::None]
}

/// Turn a verification result into a verdict for `active`
///
/// A ticket for another plan is never confirmed.
#[must_use]
pub fn classify(
    active: &EventContext,
    result: Result<ScanTicketResponse, ApiError>,
) -> ScanVerdict {
    match result {
        Ok(response) if response.plan.plan_id != active.plan_id => ScanVerdict::WrongEvent {
            scanned_plan_id: response.plan.plan_id,
        },
        Ok(response) => ScanVerdict::Confirmed {
            counters: AttendanceCounters {
                checked_in: response.checked_in_count,
                total: response.total,
            },
            already_checked_in: response.already_checked_in,
            attendee: response.attendee.into(),
            plan: active.merged_with(response.plan),
        },
        Err(error) => ScanVerdict::Rejected {
            reason: error
                .operator_message()
                .unwrap_or(GENERIC_REJECTION)
                .to_string(),
        },
    }
}

fn awaiting(state: &CheckInState, attempt_id: u64) -> bool {
    let current = state.scan.in_flight().map(|attempt| attempt.attempt_id);
    if current == Some(attempt_id) {
        return true;
    }

    debug!(attempt_id, ?current, "Result for an attempt no longer in flight");
    false
}

fn apply_verdict(state: &mut CheckInState, verdict: ScanVerdict) {
    crate::metrics::record_verdict(&verdict);

    match &verdict {
        ScanVerdict::Confirmed {
            attendee,
            already_checked_in,
            counters,
            ..
        } => {
            info!(
                attendee = %attendee.name,
                already_checked_in,
                counters = %counters,
                "Ticket confirmed"
            );
            state.counters = Some(*counters);
            state.scan.attendee_checked_in = true;
        },
        ScanVerdict::WrongEvent { scanned_plan_id } => {
            warn!(scanned_plan_id, "Ticket belongs to a different event");
            state.notice = Some(Notice::WrongEvent {
                scanned_plan_id: scanned_plan_id.clone(),
            });
        },
        ScanVerdict::Rejected { reason } => {
            warn!(reason, "Ticket rejected");
            state.notice = Some(Notice::ScanRejected {
                reason: reason.clone(),
            });
        },
    }

    state.scan.phase = ScanPhase::Resolved(verdict);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::reducers::CheckInReducer;
    use crate::reducers::test_support::{env, launch, selected_state};
    use crate::state::ScanStatus;
    use crate::types::CameraPermission;
    use std::sync::Arc;
    use std::time::Duration;
    use vybeme_api::{ScannedAttendee, ScannedPlan};
    use vybeme_core::environment::Clock;
    use vybeme_core::reducer::Reducer;
    use vybeme_testing::{ReducerTest, reducer_test::assertions, test_clock};

    fn response(plan_id: &str, checked_in_count: u32, total: u32) -> ScanTicketResponse {
        ScanTicketResponse {
            plan: ScannedPlan {
                plan_id: plan_id.to_string(),
                title: None,
                location_text: None,
                date: None,
                time: None,
            },
            attendee: ScannedAttendee {
                user_id: "u1".to_string(),
                name: "Asha".to_string(),
                profile_image: None,
                registration_id: Some("r1".to_string()),
            },
            checked_in_count,
            total,
            already_checked_in: false,
        }
    }

    fn submitting_state() -> CheckInState {
        let mut state = selected_state();
        state.counters = Some(AttendanceCounters {
            checked_in: 4,
            total: 20,
        });
        state.scan.phase = ScanPhase::Submitting(ScanAttempt {
            attempt_id: 0,
            raw_code: "ABC123".to_string(),
            submitted_at: chrono::Utc::now(),
        });
        state.scan.next_attempt_id = 1;
        state
    }

    fn decoded(payload: &str) -> CheckInAction {
        CheckInAction::CodeDecoded {
            payload: payload.to_string(),
        }
    }

    #[test]
    fn decoded_code_is_submitted_once() {
        let clock = test_clock();
        let expected = clock.now();
        let env = env().with_clock(Arc::new(clock));

        ReducerTest::new(CheckInReducer::new())
            .with_env(env)
            .given_state(selected_state())
            .when_action(decoded("  ABC123\n"))
            .then_state(move |state| {
                let attempt = state.scan.in_flight().unwrap();
                assert_eq!(attempt.raw_code, "ABC123");
                assert_eq!(attempt.attempt_id, 0);
                assert_eq!(attempt.submitted_at, expected);
                assert!(!state.decoder_active());
            })
            .then_effects(|effects| assertions::assert_future_count(effects, 1))
            .run();
    }

    #[test]
    fn payloads_while_submitting_are_ignored() {
        let env = env();
        ReducerTest::new(CheckInReducer::new())
            .with_env(env.clone())
            .given_state(selected_state())
            .when_action(decoded("ABC123"))
            .when_action(decoded("ABC123"))
            .when_action(decoded("XYZ999"))
            .then_state(|state| {
                assert_eq!(state.scan.in_flight().unwrap().raw_code, "ABC123");
                assert_eq!(state.scan.next_attempt_id, 1);
            })
            .then_effects(assertions::assert_no_effects)
            .run();

        assert_eq!(env.requests().scans, vec!["ABC123".to_string()]);
    }

    #[test]
    fn blank_payload_keeps_decoder_idle() {
        ReducerTest::new(CheckInReducer::new())
            .with_env(env())
            .given_state(selected_state())
            .when_action(decoded("   \t"))
            .then_state(|state| {
                assert_eq!(state.scan.status(), ScanStatus::Idle);
                assert!(state.decoder_active());
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn nothing_is_submitted_without_event_or_camera() {
        let mut no_event = selected_state();
        no_event.selection.phase = crate::state::SelectionPhase::EventsLoaded;

        let mut no_camera = selected_state();
        no_camera.camera = CameraPermission::Undetermined;

        for state in [no_event, no_camera] {
            ReducerTest::new(CheckInReducer::new())
                .with_env(env())
                .given_state(state)
                .when_action(decoded("ABC123"))
                .then_state(|state| assert_eq!(state.scan.status(), ScanStatus::Idle))
                .then_effects(assertions::assert_no_effects)
                .run();
        }
    }

    #[test]
    fn configured_timeout_schedules_delay() {
        let env = env().with_scan_timeout(Duration::from_secs(15));

        ReducerTest::new(CheckInReducer::new())
            .with_env(env)
            .given_state(selected_state())
            .when_action(decoded("ABC123"))
            .then_effects(|effects| {
                assertions::assert_future_count(effects, 1);
                assertions::assert_has_delay(effects, |action| {
                    matches!(
                        action,
                        CheckInAction::ScanTimedOut {
                            epoch: 1,
                            attempt_id: 0
                        }
                    )
                });
            })
            .run();
    }

    #[test]
    fn matching_plan_confirms_with_server_counters() {
        ReducerTest::new(CheckInReducer::new())
            .with_env(env())
            .given_state(submitting_state())
            .when_action(CheckInAction::ScanVerified {
                epoch: 1,
                attempt_id: 0,
                result: Ok(response("evt_1", 5, 20)),
            })
            .then_state(|state| {
                assert_eq!(state.scan.status(), ScanStatus::Confirmed);
                assert_eq!(
                    state.counters,
                    Some(AttendanceCounters {
                        checked_in: 5,
                        total: 20
                    })
                );
                assert!(state.scan.attendee_checked_in);
                assert_eq!(state.scan.confirmed_registration(), Some("r1"));
                assert!(!state.decoder_active());
                assert!(matches!(
                    state.scan.verdict(),
                    Some(ScanVerdict::Confirmed { plan, attendee, .. })
                        if plan.title == launch().title && attendee.name == "Asha"
                ));
            })
            .run();
    }

    #[test]
    fn other_plan_is_wrong_event_and_keeps_counters() {
        ReducerTest::new(CheckInReducer::new())
            .with_env(env())
            .given_state(submitting_state())
            .when_action(CheckInAction::ScanVerified {
                epoch: 1,
                attempt_id: 0,
                result: Ok(response("evt_2", 9, 50)),
            })
            .then_state(|state| {
                assert_eq!(state.scan.status(), ScanStatus::WrongEvent);
                assert_eq!(
                    state.counters,
                    Some(AttendanceCounters {
                        checked_in: 4,
                        total: 20
                    })
                );
                assert_eq!(
                    state.notice,
                    Some(Notice::WrongEvent {
                        scanned_plan_id: "evt_2".to_string()
                    })
                );
                assert!(state.scan.confirmed_registration().is_none());
            })
            .run();
    }

    #[test]
    fn failure_uses_server_message_or_generic_text() {
        let with_message = classify(
            &launch(),
            Err(ApiError::Api {
                status: 400,
                message: "Ticket already used".to_string(),
            }),
        );
        assert_eq!(
            with_message,
            ScanVerdict::Rejected {
                reason: "Ticket already used".to_string()
            }
        );

        let transport = classify(&launch(), Err(ApiError::Transport("reset".to_string())));
        assert_eq!(
            transport,
            ScanVerdict::Rejected {
                reason: GENERIC_REJECTION.to_string()
            }
        );
    }

    #[test]
    fn late_and_foreign_verdicts_are_dropped() {
        let reducer = CheckInReducer::new();
        let env = env();
        let mut state = submitting_state();

        for (epoch, attempt_id) in [(0, 0), (1, 7)] {
            reducer.reduce(
                &mut state,
                CheckInAction::ScanVerified {
                    epoch,
                    attempt_id,
                    result: Ok(response("evt_1", 5, 20)),
                },
                &env,
            );
            assert_eq!(state.scan.status(), ScanStatus::Submitting);
        }
    }

    #[test]
    fn timeout_rejects_only_the_waiting_attempt() {
        ReducerTest::new(CheckInReducer::new())
            .with_env(env())
            .given_state(submitting_state())
            .when_action(CheckInAction::ScanTimedOut {
                epoch: 1,
                attempt_id: 0,
            })
            .when_action(CheckInAction::ScanVerified {
                epoch: 1,
                attempt_id: 0,
                result: Ok(response("evt_1", 5, 20)),
            })
            .then_state(|state| {
                assert_eq!(
                    state.scan.verdict(),
                    Some(&ScanVerdict::Rejected {
                        reason: VERIFICATION_TIMED_OUT.to_string()
                    })
                );
                assert_eq!(state.counters.unwrap().checked_in, 4);
            })
            .run();
    }

    #[test]
    fn scan_again_resumes_from_every_verdict() {
        let verdicts = [
            ScanVerdict::Confirmed {
                plan: launch(),
                attendee: response("evt_1", 1, 1).attendee.into(),
                already_checked_in: true,
                counters: AttendanceCounters::default(),
            },
            ScanVerdict::WrongEvent {
                scanned_plan_id: "evt_2".to_string(),
            },
            ScanVerdict::Rejected {
                reason: "Ticket expired".to_string(),
            },
        ];

        for verdict in verdicts {
            let mut state = selected_state();
            state.scan.phase = ScanPhase::Resolved(verdict);

            ReducerTest::new(CheckInReducer::new())
                .with_env(env())
                .given_state(state)
                .when_action(CheckInAction::ScanAgain)
                .then_state(|state| {
                    assert_eq!(state.scan.status(), ScanStatus::Idle);
                    assert!(state.scan.verdict().is_none());
                    assert!(state.decoder_active());
                    assert!(state.notice.is_none());
                })
                .then_effects(assertions::assert_no_effects)
                .run();
        }
    }

    #[test]
    fn scan_again_while_submitting_keeps_lock() {
        ReducerTest::new(CheckInReducer::new())
            .with_env(env())
            .given_state(submitting_state())
            .when_action(CheckInAction::ScanAgain)
            .when_action(decoded("XYZ999"))
            .then_state(|state| assert_eq!(state.scan.status(), ScanStatus::Submitting))
            .then_effects(assertions::assert_no_effects)
            .run();
    }
}
