//! # Vybeme Ticketing API Client
//!
//! Async client for the ticketing endpoints the check-in scanner uses:
//! listing an organizer's plans, verifying a scanned ticket, toggling an
//! attendee's check-in state, and fetching an event roster.
//!
//! Every endpoint answers with an envelope `{ success, message?, data? }`.
//! Non-2xx statuses and `success: false` become [`ApiError`] values that
//! keep the server's message for the operator.
//!
//! ## Example
//!
//! ```no_run
//! use vybeme_api::TicketingClient;
//!
//! # async fn example() -> Result<(), vybeme_api::ApiError> {
//! let client = TicketingClient::new("https://api.vybeme.app/api")
//!     .with_access_token("session-token");
//!
//! let scan = client.scan_ticket("ABC123", "operator-1").await?;
//! println!("{} ({}/{})", scan.attendee.name, scan.checked_in_count, scan.total);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod types;

// Re-export main types for convenience
pub use client::TicketingClient;
pub use error::ApiError;
pub use types::{
    AttendeeList, AttendeeRecord, CheckInCommand, OrganizerPlan, RosterStatistics,
    ScanTicketResponse, ScannedAttendee, ScannedPlan,
};
