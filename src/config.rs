use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Which physical control path drives the array for a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterfaceMode {
    /// Direct array control over the serial link.
    #[default]
    Local,
    /// Pose commands consumed by the on-board pointing generator.
    PointingGenerator,
    /// Per-frequency setup followed by forwarded array commands.
    MessageForwarding,
}

impl InterfaceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterfaceMode::Local => "local",
            InterfaceMode::PointingGenerator => "pointing_generator",
            InterfaceMode::MessageForwarding => "message_forwarding",
        }
    }
}

impl fmt::Display for InterfaceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InterfaceMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(InterfaceMode::Local),
            "pointing_generator" => Ok(InterfaceMode::PointingGenerator),
            "message_forwarding" => Ok(InterfaceMode::MessageForwarding),
            other => Err(ConfigError::UnknownInterfaceMode(other.to_string())),
        }
    }
}

/// How the angles of one sweep axis are chosen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AngleAxis {
    /// Half-open arithmetic range, `stop` excluded.
    Range { start: f64, stop: f64, step: f64 },
    /// Explicit list, visited in the given order.
    List { values: Vec<f64> },
    /// Ten uniformly drawn angles within the axis bounds.
    Random,
}

impl AngleAxis {
    /// Expands a deterministic axis. Returns `None` for `Random`.
    pub fn expand(&self) -> Option<Vec<f64>> {
        match self {
            AngleAxis::Range { start, stop, step } => {
                let count = range_len(*start, *stop, *step) as usize;
                Some((0..count).map(|i| start + i as f64 * step).collect())
            }
            AngleAxis::List { values } => Some(values.clone()),
            AngleAxis::Random => None,
        }
    }

    fn validate(&self, axis: &'static str) -> Result<(), ConfigError> {
        match self {
            AngleAxis::Range { start, stop, step } => {
                if ![start, stop, step].iter().all(|v| v.is_finite()) {
                    return Err(ConfigError::NonFiniteAngle { axis });
                }
                if *step == 0.0 {
                    return Err(ConfigError::ZeroStep { axis });
                }
                if range_len(*start, *stop, *step) > MAX_AXIS_POINTS as f64 {
                    return Err(ConfigError::TooManyAngles {
                        axis,
                        max: MAX_AXIS_POINTS,
                    });
                }
                Ok(())
            }
            AngleAxis::List { values } => {
                if values.iter().any(|v| !v.is_finite()) {
                    return Err(ConfigError::NonFiniteAngle { axis });
                }
                if values.len() > MAX_AXIS_POINTS {
                    return Err(ConfigError::TooManyAngles {
                        axis,
                        max: MAX_AXIS_POINTS,
                    });
                }
                Ok(())
            }
            AngleAxis::Random => Ok(()),
        }
    }
}

/// Upper bound on the angles one deterministic axis may expand to.
pub const MAX_AXIS_POINTS: usize = 10_000;

fn range_len(start: f64, stop: f64, step: f64) -> f64 {
    ((stop - start) / step).ceil().max(0.0)
}

/// Whether the azimuth sweep alternates direction between points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AzimuthPass {
    #[default]
    OneWay,
    /// Every other point sweeps the mirrored azimuth path.
    BothDirections,
}

/// Where the elevation target of a point comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElevationMode {
    /// The configured elevation start/finish.
    #[default]
    Configured,
    /// A single elevation `theta * sin(phi)`, clamped to the turntable limit.
    PhiCoupled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepStrategy {
    pub azimuth: AzimuthPass,
    pub elevation: ElevationMode,
}

/// Positioner start/finish defaults in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionerDefaults {
    pub az_start: f64,
    pub az_finish: f64,
    pub el_start: f64,
    pub el_finish: f64,
    pub pol_start: f64,
    pub pol_finish: f64,
    pub horn_start: f64,
    pub horn_finish: f64,
    pub turntable_elevation_limit: f64,
}

impl Default for PositionerDefaults {
    fn default() -> Self {
        Self {
            az_start: -35.0,
            az_finish: 35.0,
            el_start: 0.0,
            el_finish: 0.0,
            pol_start: 0.0,
            pol_finish: 0.0,
            horn_start: 90.0,
            horn_finish: 90.0,
            turntable_elevation_limit: 20.0,
        }
    }
}

/// Nominal levels fed through the attenuation codec for every point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttenuationLevels {
    pub subarray_power_db: f64,
    pub subarray_insertion_loss_db: f64,
    pub if_power_db: f64,
    pub if_insertion_loss_db: f64,
}

impl Default for AttenuationLevels {
    fn default() -> Self {
        Self {
            subarray_power_db: 0.0,
            subarray_insertion_loss_db: 1.6,
            if_power_db: 0.0,
            if_insertion_loss_db: 0.0,
        }
    }
}

/// Serial link and pacing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkSettings {
    pub port: String,
    pub baud: u32,
    pub pacing_ms: u64,
    pub ack_timeout_ms: u64,
    pub read_timeout_ms: u64,
    pub power_off_settle_ms: u64,
    pub power_on_settle_ms: u64,
}

impl LinkSettings {
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            port: "COM6".to_string(),
            baud: 115_200,
            pacing_ms: 100,
            ack_timeout_ms: 2_000,
            read_timeout_ms: 500,
            power_off_settle_ms: 1_000,
            power_on_settle_ms: 3_000,
        }
    }
}

/// Everything a run needs, loaded once and shared by reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfiguration {
    pub interface_mode: InterfaceMode,
    /// Free-form label of the system under test, used in artifact names.
    pub system_id: String,
    pub ku_frequencies_hz: Vec<u64>,
    /// Down-converted L-band/modem frequency.
    pub l_band_frequency_hz: u64,
    pub phi: AngleAxis,
    pub theta: AngleAxis,
    pub strategy: SweepStrategy,
    pub positioner: PositionerDefaults,
    /// Beam polarization in degrees; derived from the interface mode when unset.
    pub polarization_deg: Option<f64>,
    pub attenuation: AttenuationLevels,
    pub link: LinkSettings,
    pub save_path: PathBuf,
}

impl Default for SweepConfiguration {
    fn default() -> Self {
        Self {
            interface_mode: InterfaceMode::Local,
            system_id: String::new(),
            ku_frequencies_hz: vec![11_600_000_000],
            l_band_frequency_hz: 1_500_000_000,
            phi: AngleAxis::Range {
                start: 0.0,
                stop: 181.0,
                step: 180.0,
            },
            theta: AngleAxis::Range {
                start: 0.0,
                stop: 35.0,
                step: 5.0,
            },
            strategy: SweepStrategy::default(),
            positioner: PositionerDefaults::default(),
            polarization_deg: None,
            attenuation: AttenuationLevels::default(),
            link: LinkSettings::default(),
            save_path: PathBuf::from(r"C:\tests"),
        }
    }
}

impl SweepConfiguration {
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ku_frequencies_hz.is_empty() {
            return Err(ConfigError::NoFrequencies);
        }
        let limit = self.positioner.turntable_elevation_limit;
        if limit.is_nan() || limit < 0.0 {
            return Err(ConfigError::NegativeElevationLimit(limit));
        }
        self.phi.validate("phi")?;
        self.theta.validate("theta")?;
        Ok(())
    }

    /// Polarization sent with steering commands.
    pub fn polarization(&self) -> f64 {
        self.polarization_deg.unwrap_or(match self.interface_mode {
            InterfaceMode::Local => 0.0,
            _ => 90.0,
        })
    }

    pub fn log_summary(&self) {
        info!("Sweep Parameters:");
        info!(
            "Interface mode: {}, system: '{}'",
            self.interface_mode, self.system_id
        );
        info!(
            "Ku frequencies: {:?} Hz, L-band: {} Hz",
            self.ku_frequencies_hz, self.l_band_frequency_hz
        );
        info!("Phi: {:?}", self.phi);
        info!("Theta: {:?}", self.theta);
        info!(
            "Azimuth pass: {:?}, elevation: {:?} (limit {} deg)",
            self.strategy.azimuth, self.strategy.elevation, self.positioner.turntable_elevation_limit
        );
        info!(
            "Positioner az {}..{}, el {}..{}, pol {}..{}, horn {}..{}",
            self.positioner.az_start,
            self.positioner.az_finish,
            self.positioner.el_start,
            self.positioner.el_finish,
            self.positioner.pol_start,
            self.positioner.pol_finish,
            self.positioner.horn_start,
            self.positioner.horn_finish
        );
        info!("Polarization: {} deg", self.polarization());
        info!("Serial link: {} @ {} baud", self.link.port, self.link.baud);
        info!("Artifacts: {}", self.save_path.display());
    }
}

/// One (frequency, phi, theta) combination and the direction it is swept in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepPoint {
    pub ku_freq_hz: u64,
    pub l_band_freq_hz: u64,
    pub phi: f64,
    pub theta: f64,
    pub direction_forward: bool,
}

impl fmt::Display for SweepPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ku {} Hz, phi {}, theta {} ({})",
            self.ku_freq_hz,
            self.phi,
            self.theta,
            if self.direction_forward {
                "forward"
            } else {
                "reverse"
            }
        )
    }
}
