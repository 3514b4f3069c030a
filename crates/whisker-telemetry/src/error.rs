//! Error types for telemetry operations.

use std::error::Error;
use std::fmt::{self, Display, Formatter};

use prometheus::Error as PrometheusError;

/// Result alias for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Errors raised by telemetry helpers.
#[derive(Debug)]
pub enum TelemetryError {
    /// A global tracing subscriber was already in place.
    Install {
        /// Underlying tracing subscriber error.
        source: tracing_subscriber::util::TryInitError,
    },
    /// Building a Prometheus collector failed.
    Collector {
        /// Name of the collector that failed.
        name: &'static str,
        /// Underlying Prometheus error.
        source: PrometheusError,
    },
    /// Registering a Prometheus collector failed.
    Register {
        /// Name of the collector that failed.
        name: &'static str,
        /// Underlying Prometheus error.
        source: PrometheusError,
    },
    /// Encoding the text exposition failed.
    Exposition {
        /// Underlying Prometheus error.
        source: PrometheusError,
    },
    /// The encoded exposition was not valid UTF-8.
    ExpositionUtf8 {
        /// Underlying UTF-8 conversion error.
        source: std::string::FromUtf8Error,
    },
}

impl Display for TelemetryError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Install { .. } => {
                formatter.write_str("could not install the global tracing subscriber")
            }
            Self::Collector { name, .. } => {
                write!(formatter, "could not build the {name} collector")
            }
            Self::Register { name, .. } => {
                write!(formatter, "could not register the {name} collector")
            }
            Self::Exposition { .. } => {
                formatter.write_str("could not encode the metrics exposition")
            }
            Self::ExpositionUtf8 { .. } => {
                formatter.write_str("metrics exposition was not valid utf-8")
            }
        }
    }
}

impl Error for TelemetryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Install { source } => Some(source),
            Self::Collector { source, .. } | Self::Register { source, .. } => Some(source),
            Self::Exposition { source } => Some(source),
            Self::ExpositionUtf8 { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::util::SubscriberInitExt;

    fn prometheus_error() -> PrometheusError {
        PrometheusError::Msg("boom".to_string())
    }

    fn forced_init_error() -> tracing_subscriber::util::TryInitError {
        let _ = tracing_subscriber::registry().try_init();
        tracing_subscriber::registry()
            .try_init()
            .expect_err("second subscriber install must fail")
    }

    #[test]
    fn collector_errors_name_the_metric() {
        let build = TelemetryError::Collector {
            name: "countdown_seconds",
            source: prometheus_error(),
        };
        assert_eq!(
            build.to_string(),
            "could not build the countdown_seconds collector"
        );

        let register = TelemetryError::Register {
            name: "bursts_started_total",
            source: prometheus_error(),
        };
        assert_eq!(
            register.to_string(),
            "could not register the bursts_started_total collector"
        );
    }

    #[test]
    fn every_variant_keeps_its_source() {
        let utf8_error = String::from_utf8(vec![0, 159]).expect_err("bytes are not utf-8");
        let variants = vec![
            TelemetryError::Install {
                source: forced_init_error(),
            },
            TelemetryError::Collector {
                name: "metric",
                source: prometheus_error(),
            },
            TelemetryError::Register {
                name: "metric",
                source: prometheus_error(),
            },
            TelemetryError::Exposition {
                source: prometheus_error(),
            },
            TelemetryError::ExpositionUtf8 { source: utf8_error },
        ];

        for variant in variants {
            assert!(variant.source().is_some(), "{variant} lost its source");
        }
    }
}
