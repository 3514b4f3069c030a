//! Output renderers and formatting helpers for CLI commands.

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::Serialize;
use whisker_core::remaining_seconds;
use whisker_events::{Event, EventEnvelope};
use whisker_model::{CheckVerdict, StatusRecord};

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};

pub(crate) fn render_status(record: &StatusRecord, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(record),
        OutputFormat::Table => {
            println!("configured: {}", yes_no(record.configured));
            if let Some(error) = &record.error {
                println!("error: {error}");
            }
            if let Some(message) = &record.status_message {
                println!("status: {message}");
            }
            let verdict = record.check_verdict();
            if verdict != CheckVerdict::Unknown {
                println!("last check result: {}", verdict.as_str());
            }
            if let Some(points) = record.points {
                println!("points: {points}");
            }
            if let Some(cheese) = record.cheese {
                println!("cheese: {cheese}");
            }
            if let Some(session) = &record.mam_id {
                println!("session: {session}");
            }
            if let Some(ip) = &record.current_ip {
                println!(
                    "current ip: {}",
                    describe_address(ip, record.current_ip_asn.as_deref(), None)
                );
            }
            if let Some(ip) = &record.detected_public_ip {
                println!(
                    "detected ip: {}",
                    describe_address(
                        ip,
                        record.detected_public_ip_asn.as_deref(),
                        record.detected_public_ip_as.as_deref()
                    )
                );
            }
            if let Some(ip) = &record.proxied_public_ip {
                println!(
                    "proxied ip: {}",
                    describe_address(
                        ip,
                        record.proxied_public_ip_asn.as_deref(),
                        record.proxied_public_ip_as.as_deref()
                    )
                );
            }
            if let Some(time) = record.last_check_time {
                println!("last check: {}", format_time(time));
            }
            if let Some(time) = record.next_check_time {
                println!(
                    "next check: {} (in {})",
                    format_time(time),
                    format_countdown(remaining_seconds(Some(time), Utc::now()))
                );
            }
            if record.rate_limit_seconds > 0 {
                println!("rate limit: {}", format_countdown(record.rate_limit_seconds));
            }
            if record.check_frequency_minutes > 0 {
                println!(
                    "check frequency: every {}m",
                    record.check_frequency_minutes
                );
            }
            Ok(())
        }
    }
}

pub(crate) fn render_sessions(sessions: &[String], format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(sessions),
        OutputFormat::Table => {
            if sessions.is_empty() {
                println!("no sessions configured");
            } else {
                println!("LABEL");
                for label in sessions {
                    println!("{label}");
                }
            }
            Ok(())
        }
    }
}

pub(crate) fn render_event(envelope: &EventEnvelope, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(envelope),
        OutputFormat::Table => {
            let stamp = envelope.timestamp.format("%H:%M:%S");
            match &envelope.event {
                Event::StatusUpdated { record: None } => println!("[{stamp}] status cleared"),
                Event::StatusUpdated {
                    record: Some(record),
                } => println!("[{stamp}] {}", summarize_record(record)),
                Event::CountdownTick { remaining_seconds } => println!(
                    "[{stamp}] next check in {}",
                    format_countdown(*remaining_seconds)
                ),
                Event::SessionChanged { label } => println!(
                    "[{stamp}] session: {}",
                    label.as_deref().unwrap_or("<default>")
                ),
                Event::FetchFailed { message, transport } => {
                    let class = if *transport { "transport" } else { "backend" };
                    println!("[{stamp}] fetch failed ({class}): {message}");
                }
                Event::CheckCompleted { severity, message }
                | Event::SeedboxUpdateSettled { severity, message }
                | Event::Notice { severity, message } => {
                    println!("[{stamp}] [{}] {message}", severity.as_str());
                }
                Event::SeedboxUpdateStarted => println!("[{stamp}] seedbox update started"),
                Event::BurstStarted { deadline } => {
                    println!("[{stamp}] fast polling until {}", format_time(*deadline));
                }
                Event::BurstStopped => println!("[{stamp}] fast polling stopped"),
            }
            Ok(())
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
    println!("{text}");
    Ok(())
}

#[must_use]
fn describe_address(ip: &str, asn: Option<&str>, carrier: Option<&str>) -> String {
    match (asn, carrier) {
        (Some(asn), Some(carrier)) => format!("{ip} ({asn}, {carrier})"),
        (Some(asn), None) => format!("{ip} ({asn})"),
        (None, Some(carrier)) => format!("{ip} ({carrier})"),
        (None, None) => ip.to_string(),
    }
}

#[must_use]
fn summarize_record(record: &StatusRecord) -> String {
    if let Some(error) = &record.error {
        return format!("status error: {error}");
    }
    let mut line = record
        .status_message
        .clone()
        .unwrap_or_else(|| "status updated".to_string());
    if let Some(points) = record.points {
        line.push_str(&format!(", {points} points"));
    }
    line
}

#[must_use]
fn format_time(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

#[must_use]
pub(crate) fn format_countdown(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}h {minutes:02}m {secs:02}s")
    } else if minutes > 0 {
        format!("{minutes}m {secs:02}s")
    } else {
        format!("{secs}s")
    }
}

#[must_use]
const fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
