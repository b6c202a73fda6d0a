//! Roster of the selected event.
//!
//! Fetched on selection, after a successful toggle and on pull-to-refresh,
//! one request at a time. Filtering works on the last snapshot only.

use super::{Effects, fetch_roster, is_stale};
use crate::actions::CheckInAction;
use crate::environment::CheckInEnvironment;
use crate::state::CheckInState;
use crate::types::{AttendanceCounters, Notice};
use tracing::{debug, info, warn};
use vybeme_api::{ApiError, AttendeeList};
use vybeme_core::{effect::Effect, smallvec};

/// Pull-to-refresh
pub fn refresh<E: CheckInEnvironment>(state: &mut CheckInState, env: &E) -> Effects {
    if !state.screen_open || state.active_event().is_none() {
        return smallvec![Effect::None];
    }

    if state.roster.loading {
        debug!("Roster fetch already outstanding");
        return smallvec![Effect::None];
    }

    smallvec![fetch_roster(state, env)]
}

/// Fetch now, or right after the outstanding fetch lands
pub(crate) fn request_refresh<E: CheckInEnvironment>(
    state: &mut CheckInState,
    env: &E,
) -> Effect<CheckInAction> {
    if state.roster.loading {
        state.roster.refresh_queued = true;
        return Effect::None;
    }

    fetch_roster(state, env)
}

/// Apply a roster result
pub fn loaded<E: CheckInEnvironment>(
    state: &mut CheckInState,
    epoch: u64,
    plan_id: &str,
    result: Result<AttendeeList, ApiError>,
    env: &E,
) -> Effects {
    if is_stale(state, epoch, "roster") {
        return smallvec![Effect::None];
    }

    if state
        .active_event()
        .is_none_or(|event| event.plan_id != plan_id)
    {
        debug!(plan_id, "Roster for an event that is no longer selected");
        return smallvec![Effect::None];
    }

    state.roster.loading = false;

    match result {
        Ok(list) => apply(state, list),
        Err(error) if error.is_not_found() => {
            debug!(plan_id, "Event has no attendees yet");
            state.roster.records.clear();
            state.roster.statistics = None;
            clear_roster_notice(state);
        },
        Err(error) => {
            warn!(plan_id, error = %error, "Failed to load roster");
            let message = error
                .operator_message()
                .map_or_else(|| error.to_string(), str::to_string);
            state.notice = Some(Notice::RosterUnavailable { message });
        },
    }

    if state.roster.refresh_queued {
        state.roster.refresh_queued = false;
        return smallvec![fetch_roster(state, env)];
    }

    smallvec![Effect::None]
}

/// Set the client-side filter; never fetches
pub fn set_filter(state: &mut CheckInState, query: String) -> Effects {
    state.roster.filter = query;
    smallvec![Effect::None]
}

fn apply(state: &mut CheckInState, list: AttendeeList) {
    let card_flag = state.scan.confirmed_registration().and_then(|registration_id| {
        list.attendees
            .iter()
            .find(|record| record.registration_id == registration_id)
            .map(|record| record.checked_in)
    });
    if let Some(checked_in) = card_flag {
        state.scan.attendee_checked_in = checked_in;
    }

    let counters = AttendanceCounters {
        checked_in: list.statistics.checked_in,
        total: list.statistics.total,
    };
    info!(
        attendees = list.attendees.len(),
        counters = %counters,
        "Roster loaded"
    );

    state.counters = Some(counters);
    state.roster.statistics = Some(list.statistics);
    state.roster.records = list.attendees;
    clear_roster_notice(state);
}

fn clear_roster_notice(state: &mut CheckInState) {
    if matches!(state.notice, Some(Notice::RosterUnavailable { .. })) {
        state.notice = None;
    }
}
