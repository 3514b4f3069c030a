use std::sync::Arc;

use tokio::signal;
use tracing::debug;
use whisker_config::Settings;
use whisker_core::{DEFAULT_TICK_PERIOD, EngineHandle, EngineSettings, HttpBackend};
use whisker_events::{EventBus, EventStream};
use whisker_telemetry::Metrics;

use crate::cli::OutputFormat;
use crate::client::{AppContext, CliError, CliResult};
use crate::output::render_event;

/// Run the status engine against the backend and stream its events until
/// interrupted.
pub(crate) async fn handle_watch(
    ctx: &AppContext,
    settings: &Settings,
    format: OutputFormat,
) -> CliResult<()> {
    let metrics = Metrics::new().map_err(CliError::failure)?;
    let bus = EventBus::new();
    let mut stream = bus.subscribe(None);

    let engine = EngineHandle::spawn(
        Arc::new(HttpBackend::new(ctx.client.clone())),
        bus,
        metrics.clone(),
        EngineSettings {
            initial_label: ctx.label.clone(),
            burst_threshold: settings.burst_threshold,
            burst_interval: settings.burst_interval,
            tick_period: DEFAULT_TICK_PERIOD,
        },
    );

    let result = tokio::select! {
        outcome = signal::ctrl_c() => {
            debug!("interrupt received, stopping the engine");
            outcome.map_err(CliError::failure)
        }
        outcome = pump_events(&mut stream, format) => outcome,
    };

    let _ = engine.shutdown().await;
    let totals = metrics.snapshot();
    debug!(
        bursts = totals.bursts_started_total,
        discards = totals.race_discards_total,
        "watch stopped"
    );
    result
}

/// Render events until the bus closes.
async fn pump_events(stream: &mut EventStream, format: OutputFormat) -> CliResult<()> {
    while let Some(envelope) = stream.next().await {
        render_event(&envelope, format)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use whisker_events::Event;

    #[tokio::test]
    async fn pump_drains_until_the_bus_closes() {
        let bus = EventBus::with_capacity(8);
        let mut stream = bus.subscribe(None);
        let _ = bus.publish(Event::SessionChanged {
            label: Some("alt".to_string()),
        });
        let _ = bus.publish(Event::CountdownTick {
            remaining_seconds: 42,
        });
        let _ = bus.publish(Event::BurstStopped);
        drop(bus);

        pump_events(&mut stream, OutputFormat::Table)
            .await
            .expect("pump should drain the backlog");
    }

    #[tokio::test]
    async fn pump_renders_json_envelopes() {
        let bus = EventBus::with_capacity(8);
        let mut stream = bus.subscribe(None);
        let _ = bus.publish(Event::SeedboxUpdateStarted);
        drop(bus);

        pump_events(&mut stream, OutputFormat::Json)
            .await
            .expect("pump should drain the backlog");
    }
}
