//! State of the check-in controller.
//!
//! One value holds everything the screen renders. Each sub-state is an
//! explicit enum or a small struct, so combinations such as "decoder
//! active while a verdict is shown" cannot be represented.

use crate::types::{
    AttendanceCounters, CameraPermission, EventContext, Notice, ScanAttempt, ScanVerdict,
};
use serde::Serialize;
use vybeme_api::{AttendeeRecord, CheckInCommand, RosterStatistics};

/// Event selection phase
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub enum SelectionPhase {
    /// No list has arrived yet
    #[default]
    NoEventsLoaded,
    /// A list is shown and nothing is selected
    EventsLoaded,
    /// Scanning for this event
    EventSelected(EventContext),
}

/// Event list and the selected event
#[derive(Debug, Clone, Default, Serialize)]
pub struct SelectionState {
    /// Current phase
    pub phase: SelectionPhase,
    /// Business events from the last successful list fetch
    pub events: Vec<EventContext>,
    /// A list fetch is outstanding
    pub loading: bool,
}

impl SelectionState {
    /// The selected event, if any
    #[must_use]
    pub const fn active_event(&self) -> Option<&EventContext> {
        match &self.phase {
            SelectionPhase::EventSelected(event) => Some(event),
            SelectionPhase::NoEventsLoaded | SelectionPhase::EventsLoaded => None,
        }
    }

    /// Phase to show when nothing is selected
    #[must_use]
    pub fn unselected_phase(&self) -> SelectionPhase {
        if self.events.is_empty() {
            SelectionPhase::NoEventsLoaded
        } else {
            SelectionPhase::EventsLoaded
        }
    }
}

/// Scan/verify phase
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub enum ScanPhase {
    /// Listening for payloads
    #[default]
    Idle,
    /// Waiting for the verdict on this attempt
    Submitting(ScanAttempt),
    /// Verdict on display until the operator scans again
    Resolved(ScanVerdict),
}

/// Flat view of [`ScanPhase`] for display and assertions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScanStatus {
    /// Listening
    Idle,
    /// Waiting for a verdict
    Submitting,
    /// Valid ticket for this event
    Confirmed,
    /// Ticket for another event
    WrongEvent,
    /// Invalid or unverifiable code
    Rejected,
}

/// Scan cycle state
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanState {
    /// Current phase
    pub phase: ScanPhase,
    /// Id the next attempt will get
    pub next_attempt_id: u64,
    /// Live check-in flag of the confirmed attendee
    ///
    /// A successful scan checks the attendee in; toggles and roster
    /// refreshes update it afterwards.
    pub attendee_checked_in: bool,
}

impl ScanState {
    /// Flat status
    #[must_use]
    pub const fn status(&self) -> ScanStatus {
        match &self.phase {
            ScanPhase::Idle => ScanStatus::Idle,
            ScanPhase::Submitting(_) => ScanStatus::Submitting,
            ScanPhase::Resolved(ScanVerdict::Confirmed { .. }) => ScanStatus::Confirmed,
            ScanPhase::Resolved(ScanVerdict::WrongEvent { .. }) => ScanStatus::WrongEvent,
            ScanPhase::Resolved(ScanVerdict::Rejected { .. }) => ScanStatus::Rejected,
        }
    }

    /// Verdict on display
    #[must_use]
    pub const fn verdict(&self) -> Option<&ScanVerdict> {
        match &self.phase {
            ScanPhase::Resolved(verdict) => Some(verdict),
            ScanPhase::Idle | ScanPhase::Submitting(_) => None,
        }
    }

    /// Attempt awaiting its verdict
    #[must_use]
    pub const fn in_flight(&self) -> Option<&ScanAttempt> {
        match &self.phase {
            ScanPhase::Submitting(attempt) => Some(attempt),
            ScanPhase::Idle | ScanPhase::Resolved(_) => None,
        }
    }

    /// Registration id of the confirmed attendee, when the card can toggle
    #[must_use]
    pub fn confirmed_registration(&self) -> Option<&str> {
        match self.verdict() {
            Some(ScanVerdict::Confirmed { attendee, .. }) => attendee.registration_id.as_deref(),
            _ => None,
        }
    }

    /// Back to idle, keeping the attempt counter
    pub fn reset(&mut self) {
        self.phase = ScanPhase::Idle;
        self.attendee_checked_in = false;
    }
}

/// Outstanding check-in toggle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingToggle {
    /// Registration being toggled
    pub registration_id: String,
    /// Command sent
    pub command: CheckInCommand,
}

/// Manual toggle state
#[derive(Debug, Clone, Default, Serialize)]
pub struct ToggleState {
    /// The toggle in flight; toggle controls are disabled while set
    pub pending: Option<PendingToggle>,
}

/// Roster snapshot for the selected event
#[derive(Debug, Clone, Default, Serialize)]
pub struct RosterState {
    /// Last fetched registrations
    pub records: Vec<AttendeeRecord>,
    /// Last fetched aggregates
    pub statistics: Option<RosterStatistics>,
    /// Client-side filter
    pub filter: String,
    /// A roster fetch is outstanding
    pub loading: bool,
    /// Another fetch is owed once the outstanding one lands
    pub refresh_queued: bool,
}

impl RosterState {
    /// Record for a registration
    #[must_use]
    pub fn record(&self, registration_id: &str) -> Option<&AttendeeRecord> {
        self.records
            .iter()
            .find(|record| record.registration_id == registration_id)
    }

    /// Filtered view of the snapshot
    #[must_use]
    pub fn view(&self) -> RosterView<'_> {
        RosterView {
            records: &self.records,
            query: self.filter.trim().to_lowercase(),
        }
    }
}

/// Read-only filtered view over a roster snapshot
#[derive(Debug, Clone)]
pub struct RosterView<'a> {
    records: &'a [AttendeeRecord],
    query: String,
}

impl<'a> RosterView<'a> {
    /// Records matching the filter, in snapshot order
    ///
    /// Matching is a case-insensitive substring test over name and ticket
    /// number. An empty filter matches everything.
    pub fn visible(&self) -> impl Iterator<Item = &'a AttendeeRecord> + '_ {
        self.records
            .iter()
            .filter(move |record| matches_query(record, &self.query))
    }

    /// Counts over the visible records
    #[must_use]
    pub fn summary(&self) -> RosterSummary {
        self.visible().fold(RosterSummary::default(), |mut summary, record| {
            summary.shown += 1;
            if record.checked_in {
                summary.checked_in += 1;
            } else {
                summary.pending += 1;
            }
            summary
        })
    }
}

fn matches_query(record: &AttendeeRecord, query: &str) -> bool {
    query.is_empty()
        || record.name.to_lowercase().contains(query)
        || record
            .ticket_number
            .as_deref()
            .is_some_and(|ticket| ticket.to_lowercase().contains(query))
}

/// Counts shown above the roster
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RosterSummary {
    /// Records shown
    pub shown: usize,
    /// Shown records checked in
    pub checked_in: usize,
    /// Shown records not checked in
    pub pending: usize,
}

/// Complete controller state
#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckInState {
    /// The scanner screen is open
    pub screen_open: bool,
    /// Bumped whenever in-flight results must be discarded
    pub epoch: u64,
    /// Bumped on every open; tags the camera permission request
    pub session: u64,
    /// Camera access
    pub camera: CameraPermission,
    /// Event list and selection
    pub selection: SelectionState,
    /// Scan cycle
    pub scan: ScanState,
    /// Manual toggle
    pub toggle: ToggleState,
    /// Roster snapshot
    pub roster: RosterState,
    /// Counters from the latest server response
    pub counters: Option<AttendanceCounters>,
    /// Message for the operator
    pub notice: Option<Notice>,
}

impl CheckInState {
    /// The selected event, if any
    #[must_use]
    pub const fn active_event(&self) -> Option<&EventContext> {
        self.selection.active_event()
    }

    /// Whether decoder payloads are accepted
    ///
    /// Requires an open screen, camera access, a selected event and an idle
    /// scan cycle.
    #[must_use]
    pub fn decoder_active(&self) -> bool {
        self.screen_open
            && self.camera == CameraPermission::Granted
            && self.active_event().is_some()
            && self.scan.phase == ScanPhase::Idle
    }

    /// Whether the UI should offer to request camera access
    #[must_use]
    pub fn needs_camera_permission(&self) -> bool {
        self.screen_open && self.camera == CameraPermission::Denied
    }

    /// Whether toggle controls are enabled
    #[must_use]
    pub const fn can_toggle(&self) -> bool {
        self.screen_open && self.toggle.pending.is_none() && self.active_event().is_some()
    }

    /// Whether a result issued under `epoch` still applies
    #[must_use]
    pub const fn is_current(&self, epoch: u64) -> bool {
        self.screen_open && self.epoch == epoch
    }

    /// Whether a camera answer requested by `session` still applies
    #[must_use]
    pub const fn is_current_session(&self, session: u64) -> bool {
        self.screen_open && self.session == session
    }

    /// Start a new epoch, dropping everything tied to the old one
    pub(crate) fn invalidate_in_flight(&mut self) {
        self.epoch += 1;
        self.selection.loading = false;
        self.scan.reset();
        self.toggle.pending = None;
        self.roster = RosterState::default();
        self.counters = None;
        self.notice = None;
    }
}
