//! Stock valuation report.
//!
//! Usage: `stock-report [YYYY-MM-DD]`

use valuation_bot::{cli, ReportKind};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    cli::run(ReportKind::Stock).await;
}
