//! Two-stage pipeline driven through the full component lifecycle.
//!
//! A producer emits readings, a consumer averages them. Both are wired with
//! a bounded in-memory stream, started, polled for health, then stopped and
//! cleaned up.
//!
//! ```text
//! cargo run -p harness-runtime --example pipeline
//! RUST_LOG=debug cargo run -p harness-runtime --example pipeline
//! ```
//!
//! `HARNESS_CONFIG` may point at a TOML file with `HarnessConfig` fields.

use async_trait::async_trait;
use harness_component::ComponentError;
use harness_runtime::{
    connect, ComponentIo, ConfigLoader, HarnessComponent, HarnessContext, Process,
};
use serde_json::json;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

struct Sensor {
    tick: u64,
}

#[async_trait]
impl Process for Sensor {
    async fn process(&mut self, io: &ComponentIo) -> Result<(), ComponentError> {
        self.tick += 1;
        let reading = 20.0 + (self.tick % 7) as f64 * 0.5;
        io.send("readings", json!({"tick": self.tick, "celsius": reading}))
            .await?;
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(())
    }
}

#[derive(Default)]
struct Averager {
    count: u64,
    total: f64,
}

#[async_trait]
impl Process for Averager {
    async fn process(&mut self, io: &ComponentIo) -> Result<(), ComponentError> {
        let Some(reading) = io.receive("readings", Some(Duration::from_secs(1))).await? else {
            tokio::time::sleep(Duration::from_millis(20)).await;
            return Ok(());
        };
        let celsius = reading["celsius"]
            .as_f64()
            .ok_or_else(|| ComponentError::execution("reading without celsius"))?;
        self.count += 1;
        self.total += celsius;
        Ok(())
    }

    async fn teardown(&mut self) -> Result<(), ComponentError> {
        if self.count > 0 {
            info!(
                readings = self.count,
                average = self.total / self.count as f64,
                "final average"
            );
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut loader = ConfigLoader::new();
    if let Ok(path) = std::env::var("HARNESS_CONFIG") {
        loader = loader.with_file(path);
    }
    let config = loader.load()?;

    let sensor = HarnessComponent::with_config("sensor", Sensor { tick: 0 }, config.clone());
    let averager = HarnessComponent::with_config("averager", Averager::default(), config);
    connect(&sensor, "readings", &averager, "readings", Some(16))?;

    let ctx = HarnessContext::new()
        .with_sibling("sensor")
        .with_sibling("averager")
        .with_global_config(json!({"units": "celsius"}));

    for component in [&averager, &sensor] {
        component.setup(&ctx).await?;
        component.start().await?;
    }

    for _ in 0..3 {
        tokio::time::sleep(Duration::from_millis(200)).await;
        let perf = averager.get_performance_metrics();
        info!(
            state = %perf.state,
            received = perf.messages_received,
            avg = ?perf.avg_processing_time,
            "averager"
        );
    }

    for component in [&sensor, &averager] {
        component.stop().await?;
        component.cleanup().await?;
    }

    println!("{}", serde_json::to_string_pretty(&sensor.health_check())?);
    Ok(())
}
