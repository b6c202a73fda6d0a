//! Manual check-in/out toggle.
//!
//! The command is always the inverse of the displayed flag. Nothing is
//! flipped locally: a successful toggle refetches the roster and the flag
//! changes when the refreshed roster arrives.

use super::{Effects, is_stale, roster};
use crate::actions::CheckInAction;
use crate::environment::CheckInEnvironment;
use crate::state::{CheckInState, PendingToggle};
use crate::types::{GENERIC_TOGGLE_FAILURE, Notice};
use tracing::{debug, info, warn};
use vybeme_api::{ApiError, CheckInCommand};
use vybeme_core::{effect::Effect, smallvec};

/// Toggle a roster record
pub fn toggle_record<E: CheckInEnvironment>(
    state: &mut CheckInState,
    registration_id: String,
    env: &E,
) -> Effects {
    if !state.can_toggle() {
        debug!(registration_id, "Toggle unavailable, ignoring");
        return smallvec![Effect::None];
    }

    let Some(record) = state.roster.record(&registration_id) else {
        warn!(registration_id, "Toggle for a registration not on the roster");
        return smallvec![Effect::None];
    };

    let command = CheckInCommand::toggling(record.checked_in);
    smallvec![start(state, registration_id, command, env)]
}

/// Toggle the attendee on the confirmed card
pub fn toggle_confirmed<E: CheckInEnvironment>(state: &mut CheckInState, env: &E) -> Effects {
    if !state.can_toggle() {
        debug!("Toggle unavailable, ignoring");
        return smallvec![Effect::None];
    }

    let Some(registration_id) = state.scan.confirmed_registration().map(str::to_string) else {
        debug!("No confirmed attendee with a registration to toggle");
        return smallvec![Effect::None];
    };

    let command = CheckInCommand::toggling(state.scan.attendee_checked_in);
    smallvec![start(state, registration_id, command, env)]
}

/// Apply a toggle result
pub fn toggled<E: CheckInEnvironment>(
    state: &mut CheckInState,
    epoch: u64,
    registration_id: &str,
    command: CheckInCommand,
    result: Result<(), ApiError>,
    env: &E,
) -> Effects {
    if is_stale(state, epoch, "toggle") {
        return smallvec![Effect::None];
    }

    let outstanding = state
        .toggle
        .pending
        .as_ref()
        .is_some_and(|pending| pending.registration_id == registration_id);
    if !outstanding {
        debug!(registration_id, "Result for a toggle that is not outstanding");
        return smallvec![Effect::None];
    }

    state.toggle.pending = None;
    crate::metrics::record_toggle(command, result.is_ok());

    match result {
        Ok(()) => {
            info!(registration_id, %command, "Check-in updated, refreshing roster");
            smallvec![roster::request_refresh(state, env)]
        },
        Err(error) => {
            warn!(registration_id, %command, error = %error, "Check-in update failed");
            state.notice = Some(Notice::ToggleFailed {
                message: error
                    .operator_message()
                    .unwrap_or(GENERIC_TOGGLE_FAILURE)
                    .to_string(),
            });
            smallvec![Effect::None]
        },
    }
}

fn start<E: CheckInEnvironment>(
    state: &mut CheckInState,
    registration_id: String,
    command: CheckInCommand,
    env: &E,
) -> Effect<CheckInAction> {
    info!(registration_id, %command, "Sending check-in toggle");

    state.toggle.pending = Some(PendingToggle {
        registration_id: registration_id.clone(),
        command,
    });
    if matches!(state.notice, Some(Notice::ToggleFailed { .. })) {
        state.notice = None;
    }

    let epoch = state.epoch;
    let request = env.set_check_in_state(registration_id.clone(), command);

    Effect::future(async move {
        Some(CheckInAction::CheckInToggled {
            epoch,
            registration_id,
            command,
            result: request.await,
        })
    })
}
