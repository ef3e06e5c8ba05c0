//! Light actuator interface and the `flux_led` command-line adapter

use super::state::{ColorMode, LightState, Power, Rgb};
use async_trait::async_trait;
use regex::Regex;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ActuatorError {
    #[error("failed to run light controller: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("light controller exited with {status:?}: {stderr}")]
    CommandFailed { status: Option<i32>, stderr: String },
    #[error("light controller did not answer in time")]
    Timeout,
    #[error("could not read light state: {0}")]
    Parse(String),
    #[error("invalid state pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Physical light the lighting tool drives
#[async_trait]
pub trait Actuator: Send + Sync {
    /// Current state reported by the device
    async fn query_state(&self) -> Result<LightState, ActuatorError>;

    /// Apply a full state
    async fn apply_state(&self, state: &LightState) -> Result<(), ActuatorError>;
}

/// Patterns for the `flux_led --info` report
struct InfoPatterns {
    power_on: Regex,
    brightness: Regex,
    color: Regex,
}

impl InfoPatterns {
    fn compile() -> Result<Self, regex::Error> {
        Ok(Self {
            power_on: Regex::new(r"\bON\b")?,
            brightness: Regex::new(r"Brightness:\s*(\d{1,3})\s*%")?,
            color: Regex::new(r"\[Color:\s*\(\s*(\d{1,3})\s*,\s*(\d{1,3})\s*,\s*(\d{1,3})\s*\)")?,
        })
    }

    fn parse(&self, report: &str) -> Result<LightState, ActuatorError> {
        if report.trim().is_empty() {
            return Err(ActuatorError::Parse("empty report".to_string()));
        }

        let power = if self.power_on.is_match(report) {
            Power::On
        } else {
            Power::Off
        };

        let color_mode = if report.contains("[CCT:") {
            ColorMode::ColorTemperature
        } else {
            ColorMode::Rgb
        };

        let brightness = match self.brightness.captures(report) {
            Some(caps) => parse_number(&caps[1], 100)?,
            None => 100,
        };

        let color = match self.color.captures(report) {
            Some(caps) => Rgb::new(
                parse_number(&caps[1], 255)?,
                parse_number(&caps[2], 255)?,
                parse_number(&caps[3], 255)?,
            ),
            None => Rgb::default(),
        };

        Ok(LightState {
            power,
            color_mode,
            brightness,
            color,
        })
    }
}

fn parse_number(text: &str, max: u8) -> Result<u8, ActuatorError> {
    let value: u16 = text
        .parse()
        .map_err(|e| ActuatorError::Parse(format!("{text}: {e}")))?;
    Ok(u8::try_from(value.min(u16::from(max))).unwrap_or(max))
}

/// Drives a Magic Home style controller through the `flux_led` program
pub struct FluxLedActuator {
    program: String,
    address: String,
    timeout: Duration,
    patterns: InfoPatterns,
}

impl FluxLedActuator {
    pub fn new(program: impl Into<String>, address: impl Into<String>) -> Result<Self, ActuatorError> {
        Ok(Self {
            program: program.into(),
            address: address.into(),
            timeout: DEFAULT_COMMAND_TIMEOUT,
            patterns: InfoPatterns::compile()?,
        })
    }

    fn info_args(&self) -> Vec<String> {
        vec!["--info".to_string(), self.address.clone()]
    }

    /// White mode sets brightness through the warm-white level, RGB mode
    /// through the colour channels themselves
    fn apply_args(&self, state: &LightState) -> Vec<String> {
        let mut args = vec![self.address.clone(), state.power.flag().to_string()];
        match state.color_mode {
            ColorMode::ColorTemperature => {
                args.push("-w".to_string());
                args.push(state.brightness.to_string());
            }
            ColorMode::Rgb => {
                args.push("-c".to_string());
                args.push(state.color.to_string());
            }
        }
        args
    }

    async fn run(&self, args: &[String]) -> Result<String, ActuatorError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(program = %self.program, args = ?args, "Running light controller");

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| ActuatorError::Timeout)??;

        if !output.status.success() {
            return Err(ActuatorError::CommandFailed {
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl Actuator for FluxLedActuator {
    async fn query_state(&self) -> Result<LightState, ActuatorError> {
        let report = self.run(&self.info_args()).await?;
        self.patterns.parse(&report)
    }

    async fn apply_state(&self, state: &LightState) -> Result<(), ActuatorError> {
        self.run(&self.apply_args(state)).await.map(|_| ())
    }
}
