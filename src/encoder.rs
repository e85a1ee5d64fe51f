use crate::attenuation::attenuation_code;
use crate::catalog::{CommandCatalog, CommandKind, Value};
use crate::config::{InterfaceMode, SweepConfiguration, SweepPoint};
use crate::error::TemplateError;

/// Channel every array command is addressed to.
pub const CHANNEL: i64 = 0;
/// Beamformer attenuation paths configured before steering.
pub const ATTENUATION_PATHS: usize = 4;
/// Band the receive chain is configured for.
pub const RECEIVE_BAND: &str = "L";

const STEER_GAIN: i64 = 0;
// Boresight pointing used when a message-forwarding frequency is set up.
const SETUP_AZIMUTH_DEG: i64 = 0;
const SETUP_ELEVATION_DEG: i64 = 90;

/// Ordered hardware commands for one step of a run. Order is significant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSet(Vec<String>);

impl CommandSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: String) {
        self.0.push(command);
    }

    pub fn append(&mut self, mut other: CommandSet) {
        self.0.append(&mut other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a CommandSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<Vec<String>> for CommandSet {
    fn from(commands: Vec<String>) -> Self {
        Self(commands)
    }
}

/// Pitch handed to the pointing generator: angles beyond the forward
/// hemisphere take theta directly, the rest its complement.
pub fn pointing_pitch(phi: f64, theta: f64) -> f64 {
    if phi > 90.0 {
        theta
    } else {
        360.0 - theta
    }
}

/// Builds the command sequences for the interface mode of a run.
#[derive(Debug, Clone)]
pub struct CommandEncoder<'c> {
    catalog: &'c CommandCatalog,
    mode: InterfaceMode,
    l_band_freq_hz: u64,
    polarization: f64,
    subarray_atten_code: u32,
    if_atten_code: u32,
}

impl<'c> CommandEncoder<'c> {
    pub fn new(config: &SweepConfiguration, catalog: &'c CommandCatalog) -> Self {
        let levels = &config.attenuation;
        Self {
            catalog,
            mode: config.interface_mode,
            l_band_freq_hz: config.l_band_frequency_hz,
            polarization: config.polarization(),
            subarray_atten_code: attenuation_code(
                levels.subarray_power_db,
                levels.subarray_insertion_loss_db,
            ),
            if_atten_code: attenuation_code(levels.if_power_db, levels.if_insertion_loss_db),
        }
    }

    pub fn mode(&self) -> InterfaceMode {
        self.mode
    }

    pub fn power(&self, on: bool) -> Result<CommandSet, TemplateError> {
        let kind = if on {
            CommandKind::PowerOn
        } else {
            CommandKind::PowerOff
        };
        Ok(vec![self.catalog.render(kind, &[])?].into())
    }

    /// One-time setup issued when a message-forwarding run moves to a new
    /// frequency. Other modes have no setup phase.
    pub fn frequency_setup(&self, ku_freq_hz: u64) -> Result<Option<CommandSet>, TemplateError> {
        match self.mode {
            InterfaceMode::MessageForwarding => {
                let mut commands = self.receive_chain(ku_freq_hz)?;
                commands.append(self.boresight_pointing(ku_freq_hz)?);
                Ok(Some(commands))
            }
            InterfaceMode::Local | InterfaceMode::PointingGenerator => Ok(None),
        }
    }

    /// Commands that put the array into the state for one sweep point.
    pub fn point(&self, point: &SweepPoint) -> Result<CommandSet, TemplateError> {
        match self.mode {
            InterfaceMode::Local | InterfaceMode::MessageForwarding => {
                let mut commands = self.receive_chain(point.ku_freq_hz)?;
                commands.append(self.steering(point)?);
                Ok(commands)
            }
            InterfaceMode::PointingGenerator => self.pose(point.phi, point.theta),
        }
    }

    // band, channel, per-path attenuation, then the shared IF attenuation
    fn receive_chain(&self, ku_freq_hz: u64) -> Result<CommandSet, TemplateError> {
        let catalog = self.catalog;
        let mut commands = CommandSet::new();

        commands.push(catalog.render(
            CommandKind::BandConfig,
            &[
                ("channel", Value::Int(CHANNEL)),
                ("band_code", Value::Text(catalog.band_code(RECEIVE_BAND)?)),
            ],
        )?);
        commands.push(catalog.render(
            CommandKind::ChannelConfig,
            &[
                ("channel", Value::Int(CHANNEL)),
                ("freq_khz", Value::Int(khz(ku_freq_hz))),
                ("if_freq_khz", Value::Int(khz(self.l_band_freq_hz))),
            ],
        )?);
        for array in 0..ATTENUATION_PATHS {
            commands.push(catalog.render(
                CommandKind::SubarrayAttenuation,
                &[
                    ("channel", Value::Int(CHANNEL)),
                    ("array", Value::Int(array as i64)),
                    ("atten_code", Value::Int(i64::from(self.subarray_atten_code))),
                ],
            )?);
        }
        commands.push(catalog.render(
            CommandKind::IfAttenuation,
            &[
                ("channel", Value::Int(CHANNEL)),
                ("atten_code", Value::Int(i64::from(self.if_atten_code))),
            ],
        )?);
        Ok(commands)
    }

    // each sub-array is steered before its RF path is enabled
    fn steering(&self, point: &SweepPoint) -> Result<CommandSet, TemplateError> {
        let mut commands = CommandSet::new();
        for array in &self.catalog.subarrays {
            commands.push(self.catalog.render(
                CommandKind::BeamSteer,
                &[
                    ("phased_array", Value::Text(array)),
                    ("phi", Value::Float(point.phi)),
                    ("theta", Value::Float(point.theta)),
                    ("gain", Value::Int(STEER_GAIN)),
                    ("freq_hz", Value::Int(hz(point.ku_freq_hz))),
                    ("pol", Value::Float(self.polarization)),
                    ("enable", Value::Int(1)),
                ],
            )?);
            commands.push(self.catalog.render(
                CommandKind::RfEnable,
                &[("phased_array", Value::Text(array)), ("enable", Value::Int(1))],
            )?);
        }
        Ok(commands)
    }

    fn pose(&self, phi: f64, theta: f64) -> Result<CommandSet, TemplateError> {
        let pose = self.catalog.render(
            CommandKind::Pose,
            &[
                ("roll", Value::Int(0)),
                ("pitch", Value::Float(pointing_pitch(phi, theta))),
                ("yaw", Value::Int(0)),
                ("x", Value::Int(0)),
                ("y", Value::Int(0)),
            ],
        )?;
        let trigger = self.catalog.render(CommandKind::PointingTrigger, &[])?;
        Ok(vec![pose, trigger].into())
    }

    fn boresight_pointing(&self, ku_freq_hz: u64) -> Result<CommandSet, TemplateError> {
        let freq = Value::Int(hz(ku_freq_hz));
        let modem = self.catalog.render(
            CommandKind::ModemIf,
            &[("freq_hz", freq.clone()), ("enable", Value::Int(1))],
        )?;
        let beam = self.catalog.render(
            CommandKind::BeamInfo,
            &[
                ("az", Value::Int(SETUP_AZIMUTH_DEG)),
                ("el", Value::Int(SETUP_ELEVATION_DEG)),
                ("freq_hz", freq),
                ("pol", Value::Float(self.polarization)),
                ("enable", Value::Int(1)),
            ],
        )?;
        let trigger = self.catalog.render(CommandKind::PointingTrigger, &[])?;
        Ok(vec![modem, beam, trigger].into())
    }
}

fn hz(freq_hz: u64) -> i64 {
    i64::try_from(freq_hz).unwrap_or(i64::MAX)
}

fn khz(freq_hz: u64) -> i64 {
    hz(freq_hz / 1000)
}
