//! # Secrets Safe
//!
//! Entry point for the Safe store. Initializes the runtime, runs the
//! bootstrap coordinator, and supervises the process until termination.

use anyhow::Result;
use secrets_safe::runtime;

#[tokio::main]
async fn main() -> Result<()> {
    let init = runtime::initialize().await?;
    runtime::run(init).await
}
