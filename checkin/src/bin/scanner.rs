//! Vybeme Scanner
//!
//! Terminal console for checking attendees in at the door. Each line read
//! from stdin is treated as a decoded QR payload, so a USB barcode reader
//! in keyboard mode works out of the box. Verdicts are printed when they
//! arrive; the prompt stays live while a ticket is being verified.
//!
//! # Usage
//!
//! ```bash
//! export VYBEME_API_URL=https://api.vybeme.app/api
//! export VYBEME_OPERATOR_ID=<your user id>
//! export VYBEME_ACCESS_TOKEN=<session token>
//!
//! cargo run --bin vybeme-scanner
//! ```
//!
//! # Commands
//!
//! - `:again` - scan another ticket
//! - `:toggle [registration]` - flip check-in for the confirmed attendee or a registration
//! - `:roster [filter]` - show the roster, optionally filtered
//! - `:refresh` - reload the roster
//! - `:back` - choose another event
//! - `:quit` - exit

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vybeme_api::TicketingClient;
use vybeme_checkin::{
    CheckInReducer, CheckInState, Config, Console, EventContext, OperatorSession,
    ProductionCheckInEnvironment,
};
use vybeme_core::environment::SystemClock;
use vybeme_runtime::Store;
use vybeme_runtime::metrics::MetricsServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,vybeme_checkin=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env();
    config.validate()?;

    if let Some(port) = config.server.metrics_port {
        MetricsServer::new(SocketAddr::from(([0, 0, 0, 0], port)))
            .start()
            .context("starting metrics exporter")?;
        vybeme_checkin::metrics::register_checkin_metrics();
    }

    let client =
        TicketingClient::with_connect_timeout(&config.api.base_url, config.connect_timeout())
            .context("building HTTP client")?;

    let session = OperatorSession {
        operator_id: config.operator.operator_id.clone(),
        access_token: config.operator.access_token.clone(),
    };
    let env = ProductionCheckInEnvironment::new(client, session, Arc::new(SystemClock))
        .with_scan_timeout(config.scan_timeout());
    let store = Store::new(CheckInState::default(), CheckInReducer::new(), env);
    let mut console = Console::new(store);

    println!("\n🎫 Vybeme Scanner");
    println!("   API: {}\n", config.api.base_url);

    let preselected = config
        .scanner
        .plan_id
        .clone()
        .map(|plan_id| EventContext::new(plan_id.clone(), plan_id));
    for line in console.open(preselected).await? {
        println!("{line}");
    }

    let input = BufReader::new(tokio::io::stdin()).lines();
    let result = console.run(input, |line| println!("{line}")).await;

    console.close(config.shutdown_timeout()).await;

    println!("Bye.");
    result.map_err(Into::into)
}
