//! Command templates for one hardware generation.
//!
//! A catalog maps every [`CommandKind`] to a template string with `{name}`
//! placeholders. Literal braces are written `{{` and `}}`. Swapping the
//! catalog retargets the encoder without touching any sequencing logic.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, TemplateError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    PowerOn,
    PowerOff,
    BandConfig,
    ChannelConfig,
    SubarrayAttenuation,
    IfAttenuation,
    BeamSteer,
    RfEnable,
    Pose,
    PointingTrigger,
    ModemIf,
    BeamInfo,
}

impl CommandKind {
    pub const ALL: [CommandKind; 12] = [
        CommandKind::PowerOn,
        CommandKind::PowerOff,
        CommandKind::BandConfig,
        CommandKind::ChannelConfig,
        CommandKind::SubarrayAttenuation,
        CommandKind::IfAttenuation,
        CommandKind::BeamSteer,
        CommandKind::RfEnable,
        CommandKind::Pose,
        CommandKind::PointingTrigger,
        CommandKind::ModemIf,
        CommandKind::BeamInfo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::PowerOn => "power_on",
            CommandKind::PowerOff => "power_off",
            CommandKind::BandConfig => "band_config",
            CommandKind::ChannelConfig => "channel_config",
            CommandKind::SubarrayAttenuation => "subarray_attenuation",
            CommandKind::IfAttenuation => "if_attenuation",
            CommandKind::BeamSteer => "beam_steer",
            CommandKind::RfEnable => "rf_enable",
            CommandKind::Pose => "pose",
            CommandKind::PointingTrigger => "pointing_trigger",
            CommandKind::ModemIf => "modem_if",
            CommandKind::BeamInfo => "beam_info",
        }
    }

    /// Placeholders the encoder supplies for this kind.
    pub fn placeholders(&self) -> &'static [&'static str] {
        match self {
            CommandKind::PowerOn | CommandKind::PowerOff | CommandKind::PointingTrigger => &[],
            CommandKind::BandConfig => &["channel", "band_code"],
            CommandKind::ChannelConfig => &["channel", "freq_khz", "if_freq_khz"],
            CommandKind::SubarrayAttenuation => &["channel", "array", "atten_code"],
            CommandKind::IfAttenuation => &["channel", "atten_code"],
            CommandKind::BeamSteer => &[
                "phased_array",
                "phi",
                "theta",
                "gain",
                "freq_hz",
                "pol",
                "enable",
            ],
            CommandKind::RfEnable => &["phased_array", "enable"],
            CommandKind::Pose => &["roll", "pitch", "yaw", "x", "y"],
            CommandKind::ModemIf => &["freq_hz", "enable"],
            CommandKind::BeamInfo => &["az", "el", "freq_hz", "pol", "enable"],
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value substituted into a placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a> {
    Int(i64),
    Float(f64),
    Text(&'a str),
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(v) => f.write_str(v),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandCatalog {
    pub templates: BTreeMap<CommandKind, String>,
    /// Band name to the code the hardware expects.
    pub band_codes: BTreeMap<String, String>,
    /// Identifiers of the physical sub-arrays, in steering order.
    pub subarrays: Vec<String>,
}

impl Default for CommandCatalog {
    /// The placeholder catalog: every template empty, four unnamed sub-arrays.
    fn default() -> Self {
        Self {
            templates: CommandKind::ALL
                .iter()
                .map(|kind| (*kind, String::new()))
                .collect(),
            band_codes: BTreeMap::from([("L".to_string(), String::new())]),
            subarrays: vec![String::new(); 4],
        }
    }
}

impl CommandCatalog {
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        let catalog: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, path)
    }

    /// Checks every template parses and only uses placeholders of its kind.
    pub fn validate(&self) -> Result<(), TemplateError> {
        for (&kind, template) in &self.templates {
            for segment in parse(kind, template)? {
                if let Segment::Placeholder(name) = segment {
                    if !kind.placeholders().contains(&name) {
                        return Err(TemplateError::UnknownPlaceholder {
                            kind,
                            name: name.to_string(),
                        });
                    }
                }
            }
        }
        for kind in CommandKind::ALL {
            self.template(kind)?;
        }
        Ok(())
    }

    pub fn template(&self, kind: CommandKind) -> Result<&str, TemplateError> {
        self.templates
            .get(&kind)
            .map(String::as_str)
            .ok_or(TemplateError::MissingTemplate(kind))
    }

    pub fn band_code(&self, band: &str) -> Result<&str, TemplateError> {
        self.band_codes
            .get(band)
            .map(String::as_str)
            .ok_or_else(|| TemplateError::MissingBandCode(band.to_string()))
    }

    /// Renders the template of `kind` with the given placeholder values.
    pub fn render(&self, kind: CommandKind, values: &[(&str, Value<'_>)]) -> Result<String, TemplateError> {
        let template = self.template(kind)?;
        let mut out = String::with_capacity(template.len());
        for segment in parse(kind, template)? {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => {
                    let value = values
                        .iter()
                        .find(|(key, _)| *key == name)
                        .map(|(_, value)| value)
                        .ok_or_else(|| TemplateError::UnknownPlaceholder {
                            kind,
                            name: name.to_string(),
                        })?;
                    out.push_str(&value.to_string());
                }
            }
        }
        Ok(out)
    }
}

#[derive(Debug, PartialEq)]
enum Segment<'t> {
    Literal(&'t str),
    Placeholder(&'t str),
}

fn parse(kind: CommandKind, template: &str) -> Result<Vec<Segment<'_>>, TemplateError> {
    let malformed = |offset, reason| TemplateError::Malformed {
        kind,
        offset,
        reason,
    };
    let bytes = template.as_bytes();
    let mut segments = Vec::new();
    let mut literal_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' if bytes.get(i + 1) == Some(&b'{') => {
                segments.push(Segment::Literal(&template[literal_start..=i]));
                i += 2;
                literal_start = i;
            }
            b'}' if bytes.get(i + 1) == Some(&b'}') => {
                segments.push(Segment::Literal(&template[literal_start..=i]));
                i += 2;
                literal_start = i;
            }
            b'{' => {
                segments.push(Segment::Literal(&template[literal_start..i]));
                let close = template[i + 1..]
                    .find(['{', '}'])
                    .map(|rel| i + 1 + rel)
                    .filter(|&end| bytes[end] == b'}')
                    .ok_or_else(|| malformed(i, "unclosed placeholder"))?;
                let name = &template[i + 1..close];
                if name.is_empty() {
                    return Err(malformed(i, "empty placeholder"));
                }
                segments.push(Segment::Placeholder(name));
                i = close + 1;
                literal_start = i;
            }
            b'}' => return Err(malformed(i, "unmatched '}'")),
            _ => i += 1,
        }
    }
    segments.push(Segment::Literal(&template[literal_start..]));
    segments.retain(|segment| !matches!(segment, Segment::Literal("")));
    Ok(segments)
}
