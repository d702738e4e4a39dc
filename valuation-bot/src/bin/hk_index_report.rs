//! Hong Kong index valuation report.
//!
//! Usage: `hk-index-report [YYYY-MM-DD]`

use valuation_bot::{cli, ReportKind};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    cli::run(ReportKind::HkIndex).await;
}
