use std::path::PathBuf;

use thiserror::Error;

use crate::catalog::CommandKind;
use crate::config::SweepPoint;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{axis} range has a zero step")]
    ZeroStep { axis: &'static str },
    #[error("{axis} angles must be finite")]
    NonFiniteAngle { axis: &'static str },
    #[error("{axis} axis expands to more than {max} angles")]
    TooManyAngles { axis: &'static str, max: usize },
    #[error("turntable elevation limit must be non-negative, got {0}")]
    NegativeElevationLimit(f64),
    #[error("no frequencies configured")]
    NoFrequencies,
    #[error("unknown interface mode '{0}'")]
    UnknownInterfaceMode(String),
    #[error(transparent)]
    Template(#[from] TemplateError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("{kind} template is malformed at byte {offset}: {reason}")]
    Malformed {
        kind: CommandKind,
        offset: usize,
        reason: &'static str,
    },
    #[error("{kind} template uses unknown placeholder '{{{name}}}'")]
    UnknownPlaceholder { kind: CommandKind, name: String },
    #[error("catalog has no {0} template")]
    MissingTemplate(CommandKind),
    #[error("catalog has no code for band '{0}'")]
    MissingBandCode(String),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("cannot open {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },
    #[error("link failed after {sent} command(s): {source}")]
    Io {
        sent: usize,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum MeasurementError {
    #[error("cannot write measurement artifact: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot encode measurement record: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("instrument reported: {0}")]
    Instrument(String),
}

#[derive(Debug, Error)]
pub enum SweepError {
    #[error("transport unreachable, no command was sent")]
    Connectivity,
    #[error("orchestrator has already run")]
    NotIdle,
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// A run that terminated early, with the point it stopped at.
#[derive(Debug, Error)]
#[error("{}", describe_abort(.stopped_at.as_ref(), .completed_points, .source))]
pub struct RunError {
    pub stopped_at: Option<SweepPoint>,
    pub completed_points: usize,
    #[source]
    pub source: SweepError,
}

fn describe_abort(point: Option<&SweepPoint>, completed: &usize, source: &SweepError) -> String {
    match point {
        Some(point) => format!(
            "run aborted at {point} after {completed} completed point(s): {source}"
        ),
        None => format!("run aborted after {completed} completed point(s): {source}"),
    }
}
