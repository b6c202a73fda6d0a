//! Domain types for the check-in controller.
//!
//! These are the values the UI shell renders. Wire shapes live in
//! `vybeme_api::types`; conversions from them are defined here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use vybeme_api::{OrganizerPlan, ScannedAttendee, ScannedPlan};

/// Reason shown when the server rejects a code without a usable message
pub const GENERIC_REJECTION: &str = "Invalid or already used ticket";

/// Reason shown when a verification outlives the configured timeout
pub const VERIFICATION_TIMED_OUT: &str = "Verification timed out";

/// Message shown when a toggle fails without a server message
pub const GENERIC_TOGGLE_FAILURE: &str = "Could not update check-in";

/// The event the operator is scanning for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventContext {
    /// Plan identifier
    pub plan_id: String,
    /// Display title
    pub title: String,
    /// Free-text location
    pub location_text: Option<String>,
    /// Event date
    pub date: Option<String>,
    /// Event time
    pub time: Option<String>,
}

impl EventContext {
    /// Context with only an id and a title
    #[must_use]
    pub fn new(plan_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            plan_id: plan_id.into(),
            title: title.into(),
            location_text: None,
            date: None,
            time: None,
        }
    }

    /// Fill details missing from a scan response with this context's values
    #[must_use]
    pub fn merged_with(&self, scanned: ScannedPlan) -> Self {
        Self {
            plan_id: scanned.plan_id,
            title: scanned.title.unwrap_or_else(|| self.title.clone()),
            location_text: scanned.location_text.or_else(|| self.location_text.clone()),
            date: scanned.date.or_else(|| self.date.clone()),
            time: scanned.time.or_else(|| self.time.clone()),
        }
    }
}

impl From<OrganizerPlan> for EventContext {
    fn from(plan: OrganizerPlan) -> Self {
        Self {
            plan_id: plan.plan_id,
            title: plan.title,
            location_text: plan.location_text,
            date: plan.date,
            time: plan.time,
        }
    }
}

/// Ticket holder shown on the confirmed card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendeeSummary {
    /// Attendee user id
    pub user_id: String,
    /// Display name
    pub name: String,
    /// Avatar URL
    pub avatar_url: Option<String>,
    /// Registration id, needed to toggle from the card
    pub registration_id: Option<String>,
}

impl From<ScannedAttendee> for AttendeeSummary {
    fn from(attendee: ScannedAttendee) -> Self {
        Self {
            user_id: attendee.user_id,
            name: attendee.name,
            avatar_url: attendee.profile_image,
            registration_id: attendee.registration_id,
        }
    }
}

/// Server-computed attendance aggregates
///
/// Only ever replaced by a server response, never adjusted locally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceCounters {
    /// Attendees checked in
    pub checked_in: u32,
    /// Total registrations
    pub total: u32,
}

impl fmt::Display for AttendanceCounters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.checked_in, self.total)
    }
}

/// A decoded code awaiting its verdict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanAttempt {
    /// Session-local id, increasing per submission
    pub attempt_id: u64,
    /// Trimmed payload sent to the server
    pub raw_code: String,
    /// When the code was submitted
    pub submitted_at: DateTime<Utc>,
}

/// Classified outcome of a scan attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanVerdict {
    /// Valid ticket for the active event
    Confirmed {
        /// Event the ticket belongs to
        plan: EventContext,
        /// Ticket holder
        attendee: AttendeeSummary,
        /// Whether the ticket had been used before
        already_checked_in: bool,
        /// Counters returned with the verdict
        counters: AttendanceCounters,
    },
    /// Valid ticket for a different event
    WrongEvent {
        /// Plan the ticket actually belongs to
        scanned_plan_id: String,
    },
    /// Invalid, expired, used, or unverifiable code
    Rejected {
        /// Message shown to the operator
        reason: String,
    },
}

impl ScanVerdict {
    /// Metric label for this verdict
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Confirmed { .. } => "confirmed",
            Self::WrongEvent { .. } => "wrong_event",
            Self::Rejected { .. } => "rejected",
        }
    }
}

/// Camera access as reported by the platform
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraPermission {
    /// Not asked yet
    #[default]
    Undetermined,
    /// Decoding may run
    Granted,
    /// Terminal for the session
    Denied,
}

/// The authenticated operator running the scanner
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorSession {
    /// Operator user id sent with every request
    pub operator_id: String,
    /// Bearer token
    pub access_token: Option<String>,
}

impl OperatorSession {
    /// Session without a token
    #[must_use]
    pub fn new(operator_id: impl Into<String>) -> Self {
        Self {
            operator_id: operator_id.into(),
            access_token: None,
        }
    }

    /// Authenticate requests with `token`
    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }
}

// Keep tokens out of logs
impl fmt::Debug for OperatorSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorSession")
            .field("operator_id", &self.operator_id)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Operator-facing message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notice {
    /// Scanned ticket belongs to another event
    WrongEvent {
        /// Plan the ticket belongs to
        scanned_plan_id: String,
    },
    /// Scan was rejected
    ScanRejected {
        /// Reason shown to the operator
        reason: String,
    },
    /// Check-in toggle failed; displayed state is unchanged
    ToggleFailed {
        /// Failure message
        message: String,
    },
    /// Event list could not be loaded
    EventsUnavailable {
        /// Failure message
        message: String,
    },
    /// Roster could not be loaded
    RosterUnavailable {
        /// Failure message
        message: String,
    },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongEvent { .. } => f.write_str("This ticket is for a different event"),
            Self::ScanRejected { reason } => f.write_str(reason),
            Self::ToggleFailed { message } => write!(f, "Check-in update failed: {message}"),
            Self::EventsUnavailable { message } => write!(f, "Could not load events: {message}"),
            Self::RosterUnavailable { message } => {
                write!(f, "Could not load attendees: {message}")
            },
        }
    }
}
