//! Wire types for the ticketing API
//!
//! Field names follow the backend's snake_case JSON. Unknown fields are
//! ignored so backend additions don't break the scanner.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Response envelope shared by every endpoint
///
/// `success` defaults to `true` when the backend omits it.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    /// Whether the backend accepted the request
    #[serde(default = "default_success")]
    pub success: bool,
    /// Human-readable message, mostly present on failures
    #[serde(default)]
    pub message: Option<String>,
    /// Payload
    pub data: Option<T>,
}

const fn default_success() -> bool {
    true
}

/// A plan listed for an organizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizerPlan {
    /// Plan identifier
    pub plan_id: String,
    /// Display title
    pub title: String,
    /// Free-text location
    #[serde(default)]
    pub location_text: Option<String>,
    /// Event date as sent by the backend
    #[serde(default)]
    pub date: Option<String>,
    /// Event time as sent by the backend
    #[serde(default)]
    pub time: Option<String>,
    /// Listing kind (`business` events vs. social posts)
    #[serde(default, alias = "type")]
    pub plan_type: Option<String>,
}

impl OrganizerPlan {
    /// Whether this listing is a ticketed business event
    #[must_use]
    pub fn is_business_event(&self) -> bool {
        self.plan_type
            .as_deref()
            .is_some_and(|kind| kind.trim().eq_ignore_ascii_case("business"))
    }
}

/// Body of `POST /tickets/scan`
#[derive(Debug, Clone, Serialize)]
pub struct ScanTicketRequest<'a> {
    /// Raw decoded payload
    pub code: &'a str,
    /// Operator performing the scan
    pub user_id: &'a str,
}

/// Plan a scanned ticket belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScannedPlan {
    /// Plan identifier
    pub plan_id: String,
    /// Display title
    #[serde(default)]
    pub title: Option<String>,
    /// Free-text location
    #[serde(default)]
    pub location_text: Option<String>,
    /// Event date
    #[serde(default)]
    pub date: Option<String>,
    /// Event time
    #[serde(default)]
    pub time: Option<String>,
}

/// Ticket holder returned by a scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScannedAttendee {
    /// Attendee user id
    pub user_id: String,
    /// Display name
    pub name: String,
    /// Avatar URL
    #[serde(default)]
    pub profile_image: Option<String>,
    /// Registration the ticket belongs to, when the backend includes it
    #[serde(default)]
    pub registration_id: Option<String>,
}

/// Data of a successful scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanTicketResponse {
    /// Plan the ticket belongs to
    pub plan: ScannedPlan,
    /// Ticket holder
    pub attendee: ScannedAttendee,
    /// Attendees checked in after this scan
    pub checked_in_count: u32,
    /// Total registrations
    pub total: u32,
    /// Whether the ticket had been used before this scan
    #[serde(default)]
    pub already_checked_in: bool,
}

/// Check-in toggle command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckInCommand {
    /// Mark the attendee present
    Checkin,
    /// Undo a check-in
    Checkout,
}

impl CheckInCommand {
    /// The command that flips the given checked-in flag
    #[must_use]
    pub const fn toggling(checked_in: bool) -> Self {
        if checked_in { Self::Checkout } else { Self::Checkin }
    }

    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Checkin => "checkin",
            Self::Checkout => "checkout",
        }
    }
}

impl std::fmt::Display for CheckInCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `POST /tickets/check-in`
#[derive(Debug, Clone, Serialize)]
pub struct SetCheckInRequest<'a> {
    /// Registration to update
    pub registration_id: &'a str,
    /// Operator issuing the command
    pub user_id: &'a str,
    /// Requested transition
    pub action: CheckInCommand,
}

/// One registration on an event roster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendeeRecord {
    /// Registration identifier (identity key)
    pub registration_id: String,
    /// Attendee user id
    pub user_id: String,
    /// Display name
    pub name: String,
    /// Printed ticket number
    #[serde(default)]
    pub ticket_number: Option<String>,
    /// Whether the attendee is currently checked in
    #[serde(default)]
    pub checked_in: bool,
    /// When the attendee was checked in
    #[serde(default)]
    pub checked_in_at: Option<DateTime<Utc>>,
    /// Amount paid; the backend sends numeric columns as strings
    #[serde(default, deserialize_with = "number_or_string")]
    pub price_paid: f64,
    /// Registration time
    pub created_at: DateTime<Utc>,
}

/// Aggregates computed by the backend for a roster
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterStatistics {
    /// Total registrations
    pub total: u32,
    /// Registrations checked in
    pub checked_in: u32,
    /// Registrations not yet checked in
    pub pending: u32,
}

/// Data of `GET /plans/{plan_id}/attendees`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttendeeList {
    /// Registrations
    #[serde(default)]
    pub attendees: Vec<AttendeeRecord>,
    /// Aggregates
    #[serde(default)]
    pub statistics: RosterStatistics,
}

fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
        Null,
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
        Raw::Null => Ok(0.0),
    }
}
