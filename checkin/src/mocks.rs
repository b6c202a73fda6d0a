//! In-memory ticketing backend for tests and demos.
//!
//! [`MockTicketing`] implements [`CheckInEnvironment`] over a small
//! in-memory model: plans, scannable codes and per-plan rosters. Toggles
//! mutate the roster the way the real backend does, so a refetch after a
//! toggle observes the change. Requests are logged when issued, before
//! any simulated latency.

use crate::environment::CheckInEnvironment;
use crate::types::OperatorSession;
use futures::future::{BoxFuture, FutureExt};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use vybeme_api::{
    ApiError, AttendeeList, AttendeeRecord, CheckInCommand, OrganizerPlan, RosterStatistics,
    ScanTicketResponse,
};
use vybeme_core::environment::{Clock, SystemClock};

/// Requests observed by the mock backend
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestLog {
    /// Number of event list requests
    pub plan_lists: usize,
    /// Codes submitted for verification, in order
    pub scans: Vec<String>,
    /// Toggle commands, in order
    pub toggles: Vec<(String, CheckInCommand)>,
    /// Plans whose roster was requested, in order
    pub roster_fetches: Vec<String>,
}

#[derive(Debug)]
struct Backend {
    plans: Result<Vec<OrganizerPlan>, ApiError>,
    tickets: HashMap<String, Result<ScanTicketResponse, ApiError>>,
    rosters: HashMap<String, Vec<AttendeeRecord>>,
    toggle_failure: Option<ApiError>,
    log: RequestLog,
}

impl Default for Backend {
    fn default() -> Self {
        Self {
            plans: Ok(Vec::new()),
            tickets: HashMap::new(),
            rosters: HashMap::new(),
            toggle_failure: None,
            log: RequestLog::default(),
        }
    }
}

/// In-memory [`CheckInEnvironment`]
///
/// Clones share the same backend.
#[derive(Clone)]
pub struct MockTicketing {
    session: OperatorSession,
    clock: Arc<dyn Clock>,
    scan_timeout: Option<Duration>,
    camera_granted: bool,
    latency: Duration,
    backend: Arc<Mutex<Backend>>,
}

impl MockTicketing {
    /// Empty backend for `operator_id`, camera granted, no latency
    #[must_use]
    pub fn new(operator_id: impl Into<String>) -> Self {
        Self {
            session: OperatorSession::new(operator_id),
            clock: Arc::new(SystemClock),
            scan_timeout: None,
            camera_granted: true,
            latency: Duration::ZERO,
            backend: Arc::new(Mutex::new(Backend::default())),
        }
    }

    /// Use a specific clock
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Delay every response by `latency`
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Reject verifications slower than `timeout`
    #[must_use]
    pub const fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = Some(timeout);
        self
    }

    /// Report the camera as denied
    #[must_use]
    pub const fn with_camera_denied(mut self) -> Self {
        self.camera_granted = false;
        self
    }

    /// Set the plans returned by the event list
    pub fn set_plans(&self, plans: Vec<OrganizerPlan>) {
        self.backend().plans = Ok(plans);
    }

    /// Make the event list fail
    pub fn fail_plans(&self, error: ApiError) {
        self.backend().plans = Err(error);
    }

    /// Register the outcome of scanning `code`
    ///
    /// Unregistered codes are rejected as invalid.
    pub fn set_ticket(&self, code: impl Into<String>, outcome: Result<ScanTicketResponse, ApiError>) {
        self.backend().tickets.insert(code.into(), outcome);
    }

    /// Set the roster of a plan
    pub fn set_roster(&self, plan_id: impl Into<String>, records: Vec<AttendeeRecord>) {
        self.backend().rosters.insert(plan_id.into(), records);
    }

    /// Make toggles fail with `error` (or succeed again with `None`)
    pub fn fail_toggles(&self, error: Option<ApiError>) {
        self.backend().toggle_failure = error;
    }

    /// Snapshot of the requests seen so far
    #[must_use]
    pub fn requests(&self) -> RequestLog {
        self.backend().log.clone()
    }

    /// Current record of a registration
    #[must_use]
    pub fn record(&self, registration_id: &str) -> Option<AttendeeRecord> {
        self.backend()
            .rosters
            .values()
            .flatten()
            .find(|record| record.registration_id == registration_id)
            .cloned()
    }

    fn backend(&self) -> MutexGuard<'_, Backend> {
        self.backend.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn respond<T, F>(&self, handler: F) -> BoxFuture<'static, T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Backend) -> T + Send + 'static,
    {
        let backend = Arc::clone(&self.backend);
        let latency = self.latency;

        async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            let mut backend = backend.lock().unwrap_or_else(PoisonError::into_inner);
            handler(&mut backend)
        }
        .boxed()
    }
}

impl std::fmt::Debug for MockTicketing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTicketing")
            .field("session", &self.session)
            .field("scan_timeout", &self.scan_timeout)
            .field("latency", &self.latency)
            .finish_non_exhaustive()
    }
}

fn statistics(records: &[AttendeeRecord]) -> RosterStatistics {
    let total = u32::try_from(records.len()).unwrap_or(u32::MAX);
    let checked_in =
        u32::try_from(records.iter().filter(|record| record.checked_in).count()).unwrap_or(total);
    RosterStatistics {
        total,
        checked_in,
        pending: total.saturating_sub(checked_in),
    }
}

impl CheckInEnvironment for MockTicketing {
    fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    fn session(&self) -> &OperatorSession {
        &self.session
    }

    fn scan_timeout(&self) -> Option<Duration> {
        self.scan_timeout
    }

    fn camera_permission(&self) -> BoxFuture<'static, bool> {
        futures::future::ready(self.camera_granted).boxed()
    }

    fn list_organizer_plans(&self) -> BoxFuture<'static, Result<Vec<OrganizerPlan>, ApiError>> {
        {
            self.backend().log.plan_lists += 1;
        }
        self.respond(|backend| backend.plans.clone())
    }

    fn scan_ticket(&self, code: String) -> BoxFuture<'static, Result<ScanTicketResponse, ApiError>> {
        {
            self.backend().log.scans.push(code.clone());
        }
        self.respond(move |backend| {
            backend.tickets.get(&code).cloned().unwrap_or_else(|| {
                Err(ApiError::Api {
                    status: 400,
                    message: "Invalid ticket".to_string(),
                })
            })
        })
    }

    fn set_check_in_state(
        &self,
        registration_id: String,
        command: CheckInCommand,
    ) -> BoxFuture<'static, Result<(), ApiError>> {
        {
            self.backend()
                .log
                .toggles
                .push((registration_id.clone(), command));
        }
        self.respond(move |backend| {
            if let Some(error) = backend.toggle_failure.clone() {
                return Err(error);
            }

            let record = backend
                .rosters
                .values_mut()
                .flatten()
                .find(|record| record.registration_id == registration_id)
                .ok_or_else(|| ApiError::NotFound {
                    message: "Registration not found".to_string(),
                })?;
            record.checked_in = command == CheckInCommand::Checkin;
            Ok(())
        })
    }

    fn list_attendees(&self, plan_id: String) -> BoxFuture<'static, Result<AttendeeList, ApiError>> {
        {
            self.backend().log.roster_fetches.push(plan_id.clone());
        }
        self.respond(move |backend| {
            let attendees = backend
                .rosters
                .get(&plan_id)
                .cloned()
                .ok_or_else(|| ApiError::NotFound {
                    message: "No attendees found".to_string(),
                })?;
            Ok(AttendeeList {
                statistics: statistics(&attendees),
                attendees,
            })
        })
    }
}
