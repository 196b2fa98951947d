//! Run the canned scheduler scenarios and print their reports as JSON.
//!
//! ```text
//! RUST_LOG=debug cargo run -p fleetlink-sim --bin relay-demo
//! ```

use anyhow::Result;

use fleetlink_sim::scenario::{congested_link, run, telemetry_burst};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(true)
        .compact()
        .init();

    let mut seed = 0xF1EE7;
    if let Some(arg) = std::env::args().nth(1) {
        seed = arg.parse()?;
    }

    for report in [run(telemetry_burst(seed))?, run(congested_link())?] {
        println!("{}", serde_json::to_string_pretty(&report.summary())?);
    }

    Ok(())
}
