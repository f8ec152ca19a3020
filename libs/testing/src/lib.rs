//! Test support for code built on the scheduler client.
//!
//! - `stubs`: recording [`QueryService`]/[`ReportService`] implementations
//!   whose outcomes can be scripted
//! - `fixtures`: ready-made payloads
//!
//! [`QueryService`]: plfm_scheduler_client::QueryService
//! [`ReportService`]: plfm_scheduler_client::ReportService

pub mod fixtures;
pub mod stubs;

pub use stubs::{QueryCall, ReportCall, StubQueryService, StubReportService};

use tracing_subscriber::EnvFilter;

/// Install a test-friendly subscriber. Safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}
