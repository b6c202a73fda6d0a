//! # Vybeme Check-in
//!
//! QR ticket check-in controller for event organizers.
//!
//! The controller coordinates choosing the event to scan for, submitting
//! decoded codes for verification, classifying verdicts, toggling an
//! attendee's check-in state and browsing the roster. It is a reducer
//! driven by a [`Store`](vybeme_runtime::Store): the UI shell (or the
//! `vybeme-scanner` terminal binary) sends [`CheckInAction`]s and renders
//! [`CheckInState`].
//!
//! ## Guarantees
//!
//! - No code is submitted until an event is selected and the camera is granted
//! - At most one verification is in flight; decoder output is ignored
//!   until the operator resumes with `ScanAgain`
//! - A ticket for a different event is never shown as confirmed
//! - Attendance counters are only ever copied from server responses
//! - Results that outlive a dismissal are discarded
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use vybeme_api::TicketingClient;
//! use vybeme_checkin::{
//!     CheckInAction, CheckInReducer, CheckInState, OperatorSession,
//!     ProductionCheckInEnvironment,
//! };
//! use vybeme_core::environment::SystemClock;
//! use vybeme_runtime::Store;
//!
//! # async fn example() -> Result<(), vybeme_runtime::StoreError> {
//! let env = ProductionCheckInEnvironment::new(
//!     TicketingClient::new("https://api.vybeme.app/api"),
//!     OperatorSession::new("operator-1"),
//!     Arc::new(SystemClock),
//! );
//! let store = Store::new(CheckInState::default(), CheckInReducer::new(), env);
//!
//! store.send(CheckInAction::Open { preselected: None }).await?;
//! # Ok(())
//! # }
//! ```

pub mod actions;
pub mod config;
pub mod console;
pub mod environment;
pub mod metrics;
pub mod mocks;
pub mod reducers;
pub mod state;
pub mod types;

pub use actions::CheckInAction;
pub use config::{Config, ConfigError};
pub use console::{CheckInStore, Console, ConsoleError, Flow};
pub use environment::{CheckInEnvironment, ProductionCheckInEnvironment};
pub use reducers::CheckInReducer;
pub use state::{
    CheckInState, RosterSummary, RosterView, ScanPhase, ScanStatus, SelectionPhase,
};
pub use types::{
    AttendanceCounters, AttendeeSummary, CameraPermission, EventContext, Notice,
    OperatorSession, ScanAttempt, ScanVerdict,
};
