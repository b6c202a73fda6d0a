//! Line-oriented operator console.
//!
//! [`Console`] drives a check-in store from text. Until an event is
//! selected a line picks one; afterwards each line is a decoded payload or
//! a `:command`. Input and API results are read side by side, so a
//! verification that never answers still lets the operator leave with
//! `:back` or `:quit`.

use crate::actions::CheckInAction;
use crate::environment::CheckInEnvironment;
use crate::reducers::CheckInReducer;
use crate::state::{CheckInState, ScanStatus};
use crate::types::{EventContext, ScanVerdict};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufRead, Lines};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};
use vybeme_runtime::{Store, StoreError};

const CAMERA_DENIED: &str = "Camera access was denied. Grant access and reopen the scanner.";

/// Store driven by the console
pub type CheckInStore<E> = Store<CheckInState, CheckInAction, E, CheckInReducer<E>>;

/// Console failures
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// Reading operator input failed
    #[error("Failed to read input: {0}")]
    Input(#[from] std::io::Error),

    /// The store refused an action
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What the console does after handling a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep reading
    Continue,
    /// Leave the scanner
    Quit,
}

/// Text front end for a check-in store
///
/// Handlers return the lines to show instead of printing them, so the
/// binary decides where output goes.
pub struct Console<E>
where
    E: CheckInEnvironment + Clone + 'static,
{
    store: CheckInStore<E>,
    results: broadcast::Receiver<CheckInAction>,
    reported_attempt: Option<u64>,
}

impl<E> Console<E>
where
    E: CheckInEnvironment + Clone + 'static,
{
    /// Attach to `store`; results are observed from this point on
    #[must_use]
    pub fn new(store: CheckInStore<E>) -> Self {
        let results = store.subscribe_actions();
        Self {
            store,
            results,
            reported_attempt: None,
        }
    }

    /// The underlying store
    #[must_use]
    pub const fn store(&self) -> &CheckInStore<E> {
        &self.store
    }

    /// Open the scanner, optionally straight into an event
    ///
    /// # Errors
    ///
    /// Returns an error if the store is shutting down.
    pub async fn open(
        &self,
        preselected: Option<EventContext>,
    ) -> Result<Vec<String>, ConsoleError> {
        self.store.send(CheckInAction::Open { preselected }).await?;

        Ok(self
            .store
            .state(|s| match s.active_event() {
                Some(event) => scanning_banner(event),
                None => vec!["Loading your events...".to_string()],
            })
            .await)
    }

    /// Close the scanner and drain outstanding work for up to `timeout`
    pub async fn close(&self, timeout: Duration) {
        if let Err(e) = self.store.send(CheckInAction::Dismiss).await {
            warn!(error = %e, "Failed to dismiss scanner");
        }
        if let Err(e) = self.store.shutdown(timeout).await {
            warn!(error = %e, "Store did not shut down cleanly");
        }
    }

    /// Read `input` until it ends or the operator quits
    ///
    /// Every line of output is handed to `emit` as soon as it is ready.
    ///
    /// # Errors
    ///
    /// Returns an error if reading input fails or the store is shutting down.
    pub async fn run<R>(
        &mut self,
        mut input: Lines<R>,
        mut emit: impl FnMut(String),
    ) -> Result<(), ConsoleError>
    where
        R: AsyncBufRead + Unpin,
    {
        loop {
            let (flow, output) = tokio::select! {
                line = input.next_line() => match line? {
                    Some(line) => self.handle_line(&line).await?,
                    None => (Flow::Quit, Vec::new()),
                },
                result = self.results.recv() => match result {
                    Ok(action) => (Flow::Continue, self.on_result(&action).await),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Console fell behind on results");
                        (Flow::Continue, Vec::new())
                    },
                    Err(RecvError::Closed) => (Flow::Quit, Vec::new()),
                },
            };

            output.into_iter().for_each(&mut emit);
            if flow == Flow::Quit {
                return Ok(());
            }
        }
    }

    /// Handle one line of operator input
    ///
    /// Only sends actions; results are reported by [`Console::on_result`]
    /// when they arrive.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is shutting down.
    pub async fn handle_line(&self, line: &str) -> Result<(Flow, Vec<String>), ConsoleError> {
        let line = line.trim();
        if line == ":quit" {
            return Ok((Flow::Quit, Vec::new()));
        }

        let output = if self.store.state(|s| s.active_event().is_none()).await {
            self.choose_event(line).await?
        } else {
            self.scan_command(line).await?
        };

        Ok((Flow::Continue, output))
    }

    /// Report an action published by the store
    ///
    /// Non-result actions and results that no longer apply produce nothing.
    pub async fn on_result(&mut self, action: &CheckInAction) -> Vec<String> {
        if !action.is_result() {
            return Vec::new();
        }

        match action {
            CheckInAction::CameraPermissionResolved { granted: false, .. } => {
                if self.store.state(CheckInState::needs_camera_permission).await {
                    vec![CAMERA_DENIED.to_string()]
                } else {
                    Vec::new()
                }
            },
            CheckInAction::EventsLoaded { epoch, .. } => {
                self.store
                    .state(|s| {
                        if s.is_current(*epoch) && s.active_event().is_none() {
                            event_lines(s)
                        } else {
                            Vec::new()
                        }
                    })
                    .await
            },
            CheckInAction::ScanVerified {
                epoch, attempt_id, ..
            }
            | CheckInAction::ScanTimedOut { epoch, attempt_id } => {
                self.report_verdict(*epoch, *attempt_id).await
            },
            CheckInAction::CheckInToggled { epoch, .. }
            | CheckInAction::RosterLoaded { epoch, .. } => {
                self.store
                    .state(|s| {
                        if s.is_current(*epoch) {
                            notice_and_counters(s)
                        } else {
                            Vec::new()
                        }
                    })
                    .await
            },
            _ => Vec::new(),
        }
    }

    /// Verdict lines for `attempt_id`, once per attempt
    async fn report_verdict(&mut self, epoch: u64, attempt_id: u64) -> Vec<String> {
        if self.reported_attempt == Some(attempt_id) {
            return Vec::new();
        }

        let shown = self
            .store
            .state(|s| {
                let latest = s.scan.next_attempt_id.checked_sub(1) == Some(attempt_id);
                let resolved = s.scan.verdict().is_some();
                (s.is_current(epoch) && latest && resolved).then(|| verdict_lines(s))
            })
            .await;

        match shown {
            Some(lines) => {
                self.reported_attempt = Some(attempt_id);
                lines
            },
            None => {
                debug!(attempt_id, "Not reporting a superseded verdict");
                Vec::new()
            },
        }
    }

    async fn choose_event(&self, line: &str) -> Result<Vec<String>, ConsoleError> {
        if line.is_empty() || line == ":refresh" {
            self.store.send(CheckInAction::RefreshEvents).await?;
            return Ok(vec!["Loading your events...".to_string()]);
        }

        let events = self.store.state(|s| s.selection.events.clone()).await;
        let plan_id = line
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|index| events.get(index))
            .map_or_else(|| line.to_string(), |event| event.plan_id.clone());

        self.store.send(CheckInAction::SelectEvent { plan_id }).await?;

        Ok(self
            .store
            .state(|s| match s.active_event() {
                Some(event) => scanning_banner(event),
                None => vec![format!("Unknown event: {line}")],
            })
            .await)
    }

    async fn scan_command(&self, line: &str) -> Result<Vec<String>, ConsoleError> {
        let (command, argument) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(command, rest)| (command, rest.trim()));

        let output = match command {
            "" => Vec::new(),
            ":help" => help_lines(),
            ":back" => {
                self.store.send(CheckInAction::BackToSelection).await?;
                vec!["Back to event selection. Loading your events...".to_string()]
            },
            ":again" => {
                self.store.send(CheckInAction::ScanAgain).await?;
                if self.store.state(CheckInState::decoder_active).await {
                    vec!["Ready for the next ticket.".to_string()]
                } else {
                    Vec::new()
                }
            },
            ":toggle" => {
                let action = if argument.is_empty() {
                    CheckInAction::ToggleConfirmedAttendee
                } else {
                    CheckInAction::ToggleCheckIn {
                        registration_id: argument.to_string(),
                    }
                };
                self.store.send(action).await?;
                Vec::new()
            },
            ":roster" => {
                self.store
                    .send(CheckInAction::SetRosterFilter {
                        query: argument.to_string(),
                    })
                    .await?;
                self.store.state(roster_lines).await
            },
            ":refresh" => {
                self.store.send(CheckInAction::RefreshRoster).await?;
                Vec::new()
            },
            _ if command.starts_with(':') => vec![format!("Unknown command {command}, try :help")],
            _ => self.submit(line).await?,
        };

        Ok(output)
    }

    async fn submit(&self, payload: &str) -> Result<Vec<String>, ConsoleError> {
        let (status, camera_denied) = self
            .store
            .state(|s| (s.scan.status(), s.needs_camera_permission()))
            .await;

        let refusal = match status {
            _ if camera_denied => CAMERA_DENIED,
            ScanStatus::Submitting => "Still verifying the previous ticket. :back or :quit to leave.",
            ScanStatus::Confirmed | ScanStatus::WrongEvent | ScanStatus::Rejected => {
                "Finish the current ticket first (:again)."
            },
            ScanStatus::Idle => {
                self.store
                    .send(CheckInAction::CodeDecoded {
                        payload: payload.to_string(),
                    })
                    .await?;
                return Ok(vec!["Verifying...".to_string()]);
            },
        };

        Ok(vec![refusal.to_string()])
    }
}

impl<E> std::fmt::Debug for Console<E>
where
    E: CheckInEnvironment + Clone + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console")
            .field("reported_attempt", &self.reported_attempt)
            .finish_non_exhaustive()
    }
}

fn scanning_banner(event: &EventContext) -> Vec<String> {
    vec![format!(
        "Scanning for {}. Enter codes, or :help for commands.",
        event.title
    )]
}

fn help_lines() -> Vec<String> {
    [
        "  <code>                 verify a ticket",
        "  :again                 scan another ticket",
        "  :toggle [registration] flip check-in",
        "  :roster [filter]       show attendees",
        "  :refresh               reload attendees",
        "  :back                  choose another event",
        "  :quit                  exit",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

fn notice_and_counters(state: &CheckInState) -> Vec<String> {
    let notice = state.notice.as_ref().map(|notice| format!("⚠️  {notice}"));
    let counters = state.counters.map(|counters| format!("Checked in: {counters}"));
    notice.into_iter().chain(counters).collect()
}

fn event_lines(state: &CheckInState) -> Vec<String> {
    let mut lines: Vec<String> = state
        .notice
        .as_ref()
        .map(|notice| format!("⚠️  {notice}"))
        .into_iter()
        .collect();

    let events = &state.selection.events;
    if events.is_empty() {
        lines.push("No events to scan for. Press enter to retry, or :quit.".to_string());
    } else {
        lines.push("Your events:".to_string());
        lines.extend(
            events
                .iter()
                .enumerate()
                .map(|(index, event)| format!("  {}. {} ({})", index + 1, event.title, event.plan_id)),
        );
        lines.push("Choose an event by number, :refresh to reload, or :quit.".to_string());
    }
    lines
}

fn verdict_lines(state: &CheckInState) -> Vec<String> {
    match state.scan.verdict() {
        Some(ScanVerdict::Confirmed {
            attendee,
            already_checked_in,
            counters,
            ..
        }) => {
            let mut lines = vec![format!("✓ {} ({})", attendee.name, attendee.user_id)];
            if *already_checked_in {
                lines.push("  Ticket was already used before this scan".to_string());
            }
            if attendee.registration_id.is_some() {
                let verb = if state.scan.attendee_checked_in {
                    "check out"
                } else {
                    "check in"
                };
                lines.push(format!("  :toggle to {verb}"));
            }
            lines.push(format!("Checked in: {counters}"));
            lines
        },
        Some(ScanVerdict::WrongEvent { scanned_plan_id }) => {
            vec![format!("✗ This ticket is for a different event ({scanned_plan_id})")]
        },
        Some(ScanVerdict::Rejected { reason }) => vec![format!("✗ {reason}")],
        None => Vec::new(),
    }
}

fn roster_lines(state: &CheckInState) -> Vec<String> {
    let view = state.roster.view();
    let summary = view.summary();

    view.visible()
        .map(|record| {
            format!(
                "  [{}] {} {} ({})",
                if record.checked_in { "x" } else { " " },
                record.name,
                record.ticket_number.as_deref().unwrap_or("-"),
                record.registration_id
            )
        })
        .chain(std::iter::once(format!(
            "{} shown, {} checked in, {} pending",
            summary.shown, summary.checked_in, summary.pending
        )))
        .collect()
}
