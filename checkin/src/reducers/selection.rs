//! Screen lifecycle and event selection.
//!
//! `NoEventsLoaded -> EventsLoaded -> EventSelected`. The decoder stays
//! inactive until an event is selected.

use super::{Effects, fetch_events, fetch_roster, is_stale};
use crate::actions::CheckInAction;
use crate::environment::CheckInEnvironment;
use crate::state::{CheckInState, SelectionPhase, SelectionState};
use crate::types::{CameraPermission, EventContext, Notice};
use tracing::{debug, info, warn};
use vybeme_api::{ApiError, OrganizerPlan};
use vybeme_core::{effect::Effect, smallvec};

/// Start a screen session
pub fn open<E: CheckInEnvironment>(
    state: &mut CheckInState,
    preselected: Option<EventContext>,
    env: &E,
) -> Effects {
    state.invalidate_in_flight();
    state.screen_open = true;
    state.session += 1;
    state.camera = CameraPermission::Undetermined;

    let session = state.session;
    let permission = env.camera_permission();
    let camera = Effect::future(async move {
        Some(CheckInAction::CameraPermissionResolved {
            session,
            granted: permission.await,
        })
    });

    match preselected {
        Some(event) => {
            info!(plan_id = %event.plan_id, "Opening scanner for preselected event");
            state.selection.phase = SelectionPhase::EventSelected(event);
            let roster = fetch_roster(state, env);
            smallvec![camera, roster]
        },
        None => {
            info!("Opening scanner, loading events");
            state.selection.phase = state.selection.unselected_phase();
            let events = fetch_events(state, env);
            smallvec![camera, events]
        },
    }
}

/// Close the screen and discard all in-flight work
pub fn dismiss(state: &mut CheckInState) -> Effects {
    if !state.screen_open {
        return smallvec![Effect::None];
    }

    info!(epoch = state.epoch, "Closing scanner");
    state.invalidate_in_flight();
    state.screen_open = false;
    state.camera = CameraPermission::Undetermined;
    state.selection = SelectionState::default();
    smallvec![Effect::None]
}

/// Record the platform's camera answer; a denial sticks for the session
///
/// Answers requested by an earlier open are dropped. The session counter is
/// used instead of the epoch because returning to selection bumps the epoch
/// without asking for the camera again.
pub fn camera_resolved(state: &mut CheckInState, session: u64, granted: bool) -> Effects {
    if !state.is_current_session(session) {
        debug!(
            issued_session = session,
            current_session = state.session,
            "Discarding stale camera answer"
        );
        crate::metrics::record_stale_result();
        return smallvec![Effect::None];
    }

    if state.camera == CameraPermission::Denied {
        return smallvec![Effect::None];
    }

    state.camera = if granted {
        CameraPermission::Granted
    } else {
        warn!("Camera permission denied, scanning disabled for this session");
        CameraPermission::Denied
    };
    smallvec![Effect::None]
}

/// Manually retry the event list
pub fn refresh_events<E: CheckInEnvironment>(state: &mut CheckInState, env: &E) -> Effects {
    if !state.screen_open || state.active_event().is_some() || state.selection.loading {
        debug!(loading = state.selection.loading, "Ignoring event refresh");
        return smallvec![Effect::None];
    }

    smallvec![fetch_events(state, env)]
}

/// Apply an event list result
pub fn events_loaded(
    state: &mut CheckInState,
    epoch: u64,
    result: Result<Vec<OrganizerPlan>, ApiError>,
) -> Effects {
    if is_stale(state, epoch, "events") {
        return smallvec![Effect::None];
    }

    state.selection.loading = false;

    let listed = match result {
        Ok(plans) => {
            let total = plans.len();
            state.selection.events = plans
                .into_iter()
                .filter(OrganizerPlan::is_business_event)
                .map(EventContext::from)
                .collect();
            info!(
                listed = total,
                events = state.selection.events.len(),
                "Event list loaded"
            );
            true
        },
        Err(error) if error.is_not_found() => {
            debug!("Operator has no events");
            state.selection.events.clear();
            true
        },
        Err(error) => {
            warn!(error = %error, "Failed to load events");
            let message = error
                .operator_message()
                .map_or_else(|| error.to_string(), str::to_string);
            state.notice = Some(Notice::EventsUnavailable { message });
            false
        },
    };

    if listed && matches!(state.notice, Some(Notice::EventsUnavailable { .. })) {
        state.notice = None;
    }

    if state.active_event().is_none() {
        state.selection.phase = if listed {
            SelectionPhase::EventsLoaded
        } else {
            state.selection.unselected_phase()
        };
    }

    smallvec![Effect::None]
}

/// Choose a listed event and load its roster
pub fn select_event<E: CheckInEnvironment>(
    state: &mut CheckInState,
    plan_id: &str,
    env: &E,
) -> Effects {
    if !state.screen_open || state.selection.phase != SelectionPhase::EventsLoaded {
        warn!(plan_id, "Event selection is not available");
        return smallvec![Effect::None];
    }

    let Some(event) = state
        .selection
        .events
        .iter()
        .find(|event| event.plan_id == plan_id)
        .cloned()
    else {
        warn!(plan_id, "Selected event is not in the list");
        return smallvec![Effect::None];
    };

    info!(plan_id, title = %event.title, "Event selected");
    state.selection.phase = SelectionPhase::EventSelected(event);
    state.scan.reset();
    state.roster = crate::state::RosterState::default();
    state.counters = None;
    state.notice = None;

    smallvec![fetch_roster(state, env)]
}

/// Leave the selected event, keep the old list visible and refetch it
pub fn back_to_selection<E: CheckInEnvironment>(state: &mut CheckInState, env: &E) -> Effects {
    if !state.screen_open || state.active_event().is_none() {
        return smallvec![Effect::None];
    }

    info!("Returning to event selection");
    state.invalidate_in_flight();
    state.selection.phase = state.selection.unselected_phase();

    smallvec![fetch_events(state, env)]
}
