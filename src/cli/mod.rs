pub mod client;
pub mod graph;
pub mod report;
pub mod server;

use anyhow::Result;

// EVERYTHING ASYNC HERE IS ONE SOCKET AND ONE TIMER: A SINGLE THREAD IS ENOUGH
pub fn runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}
