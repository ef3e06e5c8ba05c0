//! Lighting properties extracted from a request and how they merge into a
//! [`LightState`]

use super::state::{ColorMode, LightState, Power, Rgb};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("found {0} ```json blocks, expected at most one")]
    TooManyBlocks(usize),
    #[error("not a lighting properties object: {0}")]
    InvalidJson(String),
}

/// Properties the model reports for one request. Every key is optional.
///
/// Values are read leniently: the model sometimes quotes numbers and
/// booleans. A key whose value can't be read is treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LightingProperties {
    #[serde(deserialize_with = "lenient_text")]
    pub on_or_off: Option<String>,
    #[serde(deserialize_with = "lenient_number")]
    pub brightness: Option<f64>,
    #[serde(deserialize_with = "lenient_color")]
    pub color: Option<[f64; 3]>,
    #[serde(deserialize_with = "lenient_bool")]
    pub default: Option<bool>,
}

fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim_end().parse().ok(),
        _ => None,
    }
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(number_of(&Value::deserialize(deserializer)?))
}

/// `[r, g, b]`, also as strings or a single "r, g, b" string
fn lenient_color<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<[f64; 3]>, D::Error> {
    let channels: Vec<Option<f64>> = match Value::deserialize(deserializer)? {
        Value::Array(items) => items.iter().map(number_of).collect(),
        Value::String(s) => s
            .trim_matches(|c: char| c == '[' || c == ']' || c == '(' || c == ')' || c.is_whitespace())
            .split(',')
            .map(|part| part.trim().parse().ok())
            .collect(),
        _ => return Ok(None),
    };
    Ok(match channels.as_slice() {
        [Some(r), Some(g), Some(b)] => Some([*r, *g, *b]),
        _ => None,
    })
}

fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => Some(b),
        Value::String(s) if s.trim().eq_ignore_ascii_case("true") => Some(true),
        Value::String(s) if s.trim().eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    })
}

impl LightingProperties {
    /// Parse the model's reply, which may wrap the object in a ```json fence
    pub fn parse(reply: &str) -> Result<Self, ExtractError> {
        let body = extract_json_block(reply)?;
        serde_json::from_str(body.trim()).map_err(|e| ExtractError::InvalidJson(e.to_string()))
    }

    fn power(&self) -> Option<Power> {
        match self.on_or_off.as_deref().map(str::trim) {
            Some(p) if p.eq_ignore_ascii_case("on") => Some(Power::On),
            Some(p) if p.eq_ignore_ascii_case("off") => Some(Power::Off),
            _ => None,
        }
    }

    /// "Turn the lights on" with nothing else means the usual lights
    fn is_bare_on(&self) -> bool {
        self.power() == Some(Power::On)
            && self.brightness.is_none()
            && self.color.is_none()
            && self.default.is_none()
    }

    fn brightness_percent(&self) -> Option<u8> {
        self.brightness.map(|b| clamp_channel(b, 100))
    }

    fn rgb(&self) -> Option<Rgb> {
        self.color
            .map(|[r, g, b]| Rgb::new(clamp_channel(r, 255), clamp_channel(g, 255), clamp_channel(b, 255)))
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_channel(value: f64, max: u8) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.clamp(0.0, f64::from(max)) as u8
}

/// Contents of the single ```json block in `text`, or the whole text when
/// there is none
pub fn extract_json_block(text: &str) -> Result<&str, ExtractError> {
    let segments: Vec<&str> = text.split(JSON_FENCE).collect();
    match segments.as_slice() {
        [whole] => Ok(whole),
        [_, block] => Ok(block.split(FENCE).next().unwrap_or_default()),
        _ => Err(ExtractError::TooManyBlocks(segments.len() - 1)),
    }
}

/// What a merge did, in precedence order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    TurnedOff,
    Usual,
    Adjusted,
    Unsure,
}

impl Adjustment {
    pub fn phrase(self) -> &'static str {
        match self {
            Adjustment::TurnedOff => "I have turned off the lights as you requested.",
            Adjustment::Usual => "I have turned on your usual lights.",
            Adjustment::Adjusted => "I have adjusted the lights as you requested.",
            Adjustment::Unsure => "I was unsure what to do with the lights.",
        }
    }
}

/// Merge `props` into `base`.
///
/// Precedence, lowest first: defaults, brightness, colour, off. An explicit
/// "off" always wins. Brightness scales the stored colour channels.
pub fn merge(base: LightState, props: &LightingProperties) -> (LightState, Adjustment) {
    let mut state = base;
    let mut adjustment = Adjustment::Unsure;

    if props.default == Some(true) || props.is_bare_on() {
        state.power = Power::On;
        state.color_mode = ColorMode::ColorTemperature;
        state.brightness = 100;
        state.color = Rgb::default();
        adjustment = Adjustment::Usual;
    }

    if let Some(brightness) = props.brightness_percent() {
        state.power = Power::On;
        state.brightness = brightness;
        state.color = state.color.scaled(brightness);
        adjustment = Adjustment::Adjusted;
    }

    if let Some(color) = props.rgb() {
        state.power = Power::On;
        state.color_mode = ColorMode::Rgb;
        state.color = color;
        adjustment = Adjustment::Adjusted;
    }

    if props.power() == Some(Power::Off) {
        state.power = Power::Off;
        adjustment = Adjustment::TurnedOff;
    }

    (state, adjustment)
}
