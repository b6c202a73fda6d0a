//! Check-in reducer.
//!
//! [`CheckInReducer`] dispatches each action to the sub-reducer that owns
//! it: screen lifecycle and event selection, the scan/verify cycle, the
//! manual toggle, and the roster. Sub-reducers share the effect builders
//! below so every API result is tagged with the current epoch.

pub mod roster;
pub mod scan;
pub mod selection;
pub mod toggle;

use crate::actions::CheckInAction;
use crate::environment::CheckInEnvironment;
use crate::state::CheckInState;
use std::marker::PhantomData;
use vybeme_core::{SmallVec, effect::Effect, reducer::Reducer, smallvec};

/// Effects returned by the check-in sub-reducers
pub type Effects = SmallVec<[Effect<CheckInAction>; 4]>;

/// Reducer for the check-in controller
///
/// Generic over the environment so tests can inject an in-memory backend.
pub struct CheckInReducer<E> {
    _phantom: PhantomData<fn() -> E>,
}

impl<E> CheckInReducer<E> {
    /// Create a new check-in reducer
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<E> Default for CheckInReducer<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for CheckInReducer<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for CheckInReducer<E> {}

impl<E> std::fmt::Debug for CheckInReducer<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CheckInReducer")
    }
}

impl<E> Reducer for CheckInReducer<E>
where
    E: CheckInEnvironment,
{
    type State = CheckInState;
    type Action = CheckInAction;
    type Environment = E;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            CheckInAction::Open { preselected } => selection::open(state, preselected, env),
            CheckInAction::Dismiss => selection::dismiss(state),
            CheckInAction::CameraPermissionResolved { session, granted } => {
                selection::camera_resolved(state, session, granted)
            },
            CheckInAction::RefreshEvents => selection::refresh_events(state, env),
            CheckInAction::EventsLoaded { epoch, result } => {
                selection::events_loaded(state, epoch, result)
            },
            CheckInAction::SelectEvent { plan_id } => selection::select_event(state, &plan_id, env),
            CheckInAction::BackToSelection => selection::back_to_selection(state, env),

            CheckInAction::CodeDecoded { payload } => scan::code_decoded(state, &payload, env),
            CheckInAction::ScanVerified {
                epoch,
                attempt_id,
                result,
            } => scan::scan_verified(state, epoch, attempt_id, result),
            CheckInAction::ScanTimedOut { epoch, attempt_id } => {
                scan::scan_timed_out(state, epoch, attempt_id)
            },
            CheckInAction::ScanAgain => scan::scan_again(state),

            CheckInAction::ToggleCheckIn { registration_id } => {
                toggle::toggle_record(state, registration_id, env)
            },
            CheckInAction::ToggleConfirmedAttendee => toggle::toggle_confirmed(state, env),
            CheckInAction::CheckInToggled {
                epoch,
                registration_id,
                command,
                result,
            } => toggle::toggled(state, epoch, &registration_id, command, result, env),

            CheckInAction::RefreshRoster => roster::refresh(state, env),
            CheckInAction::RosterLoaded {
                epoch,
                plan_id,
                result,
            } => roster::loaded(state, epoch, &plan_id, result, env),
            CheckInAction::SetRosterFilter { query } => roster::set_filter(state, query),

            CheckInAction::DismissNotice => {
                state.notice = None;
                smallvec![Effect::None]
            },
        }
    }
}

/// Request the operator's event list under the current epoch
fn fetch_events<E: CheckInEnvironment>(state: &mut CheckInState, env: &E) -> Effect<CheckInAction> {
    state.selection.loading = true;
    let epoch = state.epoch;
    let request = env.list_organizer_plans();

    Effect::future(async move {
        Some(CheckInAction::EventsLoaded {
            epoch,
            result: request.await,
        })
    })
}

/// Request the active event's roster under the current epoch
fn fetch_roster<E: CheckInEnvironment>(state: &mut CheckInState, env: &E) -> Effect<CheckInAction> {
    let Some(plan_id) = state.active_event().map(|event| event.plan_id.clone()) else {
        return Effect::None;
    };

    state.roster.loading = true;
    crate::metrics::record_roster_fetch();

    let epoch = state.epoch;
    let request = env.list_attendees(plan_id.clone());

    Effect::future(async move {
        Some(CheckInAction::RosterLoaded {
            epoch,
            plan_id,
            result: request.await,
        })
    })
}

/// Drop a result whose session has ended
fn is_stale(state: &CheckInState, epoch: u64, result: &'static str) -> bool {
    if state.is_current(epoch) {
        return false;
    }

    tracing::debug!(
        result,
        issued_epoch = epoch,
        current_epoch = state.epoch,
        "Discarding stale result"
    );
    crate::metrics::record_stale_result();
    true
}
