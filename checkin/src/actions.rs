//! Actions processed by the check-in reducer.
//!
//! Operator and decoder input arrive as plain commands. Results of API
//! calls come back tagged with the session epoch they were issued under,
//! so results that outlive a dismissal or a return to selection are
//! recognised and dropped.

use crate::types::EventContext;
use vybeme_api::{
    ApiError, AttendeeList, CheckInCommand, OrganizerPlan, ScanTicketResponse,
};

/// Check-in controller actions
#[derive(Debug, Clone)]
pub enum CheckInAction {
    // Screen lifecycle
    /// Open the scanner; a preselected event skips the list fetch
    Open {
        /// Event passed in by deep navigation
        preselected: Option<EventContext>,
    },
    /// Close the scanner and discard everything in flight
    Dismiss,
    /// Platform answered the camera permission request
    CameraPermissionResolved {
        /// Screen session that asked
        session: u64,
        /// Whether access was granted
        granted: bool,
    },

    // Event selection
    /// Re-request the operator's event list
    RefreshEvents,
    /// Event list request finished
    EventsLoaded {
        /// Epoch the request was issued under
        epoch: u64,
        /// Unfiltered plans, or the failure
        result: Result<Vec<OrganizerPlan>, ApiError>,
    },
    /// Choose the event to scan for
    SelectEvent {
        /// One of the listed plan ids
        plan_id: String,
    },
    /// Leave the selected event and return to the list
    BackToSelection,

    // Scan/verify cycle
    /// The decoder produced a payload
    CodeDecoded {
        /// Raw decoded text
        payload: String,
    },
    /// Verification request finished
    ScanVerified {
        /// Epoch the request was issued under
        epoch: u64,
        /// Attempt the result belongs to
        attempt_id: u64,
        /// Server response, or the failure
        result: Result<ScanTicketResponse, ApiError>,
    },
    /// The verification timeout for an attempt elapsed
    ScanTimedOut {
        /// Epoch the attempt was issued under
        epoch: u64,
        /// Attempt that timed out
        attempt_id: u64,
    },
    /// Clear the verdict and resume decoding
    ScanAgain,

    // Manual toggle
    /// Flip a roster record's check-in state
    ToggleCheckIn {
        /// Registration to toggle
        registration_id: String,
    },
    /// Flip the confirmed attendee's check-in state
    ToggleConfirmedAttendee,
    /// Toggle request finished
    CheckInToggled {
        /// Epoch the request was issued under
        epoch: u64,
        /// Registration that was toggled
        registration_id: String,
        /// Command that was sent
        command: CheckInCommand,
        /// Outcome
        result: Result<(), ApiError>,
    },

    // Roster
    /// Pull-to-refresh
    RefreshRoster,
    /// Roster request finished
    RosterLoaded {
        /// Epoch the request was issued under
        epoch: u64,
        /// Plan the roster belongs to
        plan_id: String,
        /// Roster, or the failure
        result: Result<AttendeeList, ApiError>,
    },
    /// Filter the roster snapshot
    SetRosterFilter {
        /// Substring matched against name and ticket number
        query: String,
    },

    /// Hide the current notice
    DismissNotice,
}

impl CheckInAction {
    /// Whether this action carries the result of asynchronous work
    #[must_use]
    pub const fn is_result(&self) -> bool {
        matches!(
            self,
            Self::CameraPermissionResolved { .. }
                | Self::EventsLoaded { .. }
                | Self::ScanVerified { .. }
                | Self::ScanTimedOut { .. }
                | Self::CheckInToggled { .. }
                | Self::RosterLoaded { .. }
        )
    }
}
