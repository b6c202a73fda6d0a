//! Environment for the check-in reducer.
//!
//! Every external capability the controller needs (ticketing API, camera
//! permission, time, the operator session) is reached through
//! [`CheckInEnvironment`]. API methods return boxed `'static` futures; the
//! reducer wraps them in effects and tags their results.

use crate::types::OperatorSession;
use futures::future::{self, BoxFuture, FutureExt};
use std::sync::Arc;
use std::time::Duration;
use vybeme_api::{
    ApiError, AttendeeList, CheckInCommand, OrganizerPlan, ScanTicketResponse, TicketingClient,
};
use vybeme_core::environment::Clock;

/// Dependencies of the check-in reducer
pub trait CheckInEnvironment: Send + Sync {
    /// Clock for attempt timestamps
    fn clock(&self) -> &dyn Clock;

    /// Operator running the scanner
    fn session(&self) -> &OperatorSession;

    /// How long a verification may take before it is rejected
    ///
    /// `None` waits for the server indefinitely.
    fn scan_timeout(&self) -> Option<Duration>;

    /// Resolve camera access for a new screen session
    fn camera_permission(&self) -> BoxFuture<'static, bool>;

    /// Plans the operator manages, unfiltered
    fn list_organizer_plans(&self) -> BoxFuture<'static, Result<Vec<OrganizerPlan>, ApiError>>;

    /// Verify a decoded payload
    fn scan_ticket(&self, code: String) -> BoxFuture<'static, Result<ScanTicketResponse, ApiError>>;

    /// Check a registration in or out
    fn set_check_in_state(
        &self,
        registration_id: String,
        command: CheckInCommand,
    ) -> BoxFuture<'static, Result<(), ApiError>>;

    /// Roster of a plan
    fn list_attendees(&self, plan_id: String) -> BoxFuture<'static, Result<AttendeeList, ApiError>>;
}

/// Production environment backed by the HTTP ticketing client
#[derive(Clone)]
pub struct ProductionCheckInEnvironment {
    client: Arc<TicketingClient>,
    session: OperatorSession,
    clock: Arc<dyn Clock>,
    scan_timeout: Option<Duration>,
    camera_granted: bool,
}

impl ProductionCheckInEnvironment {
    /// Create an environment for `session`
    ///
    /// The session's token, when present, authenticates every request.
    #[must_use]
    pub fn new(client: TicketingClient, session: OperatorSession, clock: Arc<dyn Clock>) -> Self {
        let client = match &session.access_token {
            Some(token) => client.with_access_token(token.clone()),
            None => client,
        };

        Self {
            client: Arc::new(client),
            session,
            clock,
            scan_timeout: None,
            camera_granted: true,
        }
    }

    /// Reject verifications that take longer than `timeout`
    #[must_use]
    pub const fn with_scan_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.scan_timeout = timeout;
        self
    }

    /// Report the camera as granted or denied
    #[must_use]
    pub const fn with_camera_granted(mut self, granted: bool) -> Self {
        self.camera_granted = granted;
        self
    }
}

impl std::fmt::Debug for ProductionCheckInEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProductionCheckInEnvironment")
            .field("base_url", &self.client.base_url())
            .field("session", &self.session)
            .field("scan_timeout", &self.scan_timeout)
            .finish_non_exhaustive()
    }
}

impl CheckInEnvironment for ProductionCheckInEnvironment {
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
        future::ready(self.camera_granted).boxed()
    }

    fn list_organizer_plans(&self) -> BoxFuture<'static, Result<Vec<OrganizerPlan>, ApiError>> {
        let client = Arc::clone(&self.client);
        let operator_id = self.session.operator_id.clone();
        async move { client.list_organizer_plans(&operator_id).await }.boxed()
    }

    fn scan_ticket(&self, code: String) -> BoxFuture<'static, Result<ScanTicketResponse, ApiError>> {
        let client = Arc::clone(&self.client);
        let operator_id = self.session.operator_id.clone();
        async move { client.scan_ticket(&code, &operator_id).await }.boxed()
    }

    fn set_check_in_state(
        &self,
        registration_id: String,
        command: CheckInCommand,
    ) -> BoxFuture<'static, Result<(), ApiError>> {
        let client = Arc::clone(&self.client);
        let operator_id = self.session.operator_id.clone();
        async move {
            client
                .set_check_in_state(&registration_id, &operator_id, command)
                .await
        }
        .boxed()
    }

    fn list_attendees(&self, plan_id: String) -> BoxFuture<'static, Result<AttendeeList, ApiError>> {
        let client = Arc::clone(&self.client);
        let operator_id = self.session.operator_id.clone();
        async move { client.list_attendees(&plan_id, &operator_id).await }.boxed()
    }
}
