//! Light state model

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Power {
    #[default]
    On,
    Off,
}

impl Power {
    /// Flag understood by `flux_led`
    pub fn flag(self) -> &'static str {
        match self {
            Power::On => "--on",
            Power::Off => "--off",
        }
    }
}

/// Which channel set drives the strip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    /// White channels at a colour temperature
    #[default]
    ColorTemperature,
    Rgb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Scale every channel by `percent` / 100, rounding down
    #[must_use]
    pub fn scaled(self, percent: u8) -> Self {
        let scale = |c: u8| {
            let value = u32::from(c) * u32::from(percent.min(100)) / 100;
            u8::try_from(value).unwrap_or(u8::MAX)
        };
        Self::new(scale(self.r), scale(self.g), scale(self.b))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.r, self.g, self.b)
    }
}

/// Last applied or desired configuration of the light
///
/// The default is the "usual lights": on, white, full brightness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightState {
    pub power: Power,
    pub color_mode: ColorMode,
    /// Percent, 0 to 100
    pub brightness: u8,
    pub color: Rgb,
}

impl Default for LightState {
    fn default() -> Self {
        Self {
            power: Power::On,
            color_mode: ColorMode::ColorTemperature,
            brightness: 100,
            color: Rgb::default(),
        }
    }
}

impl LightState {
    /// Shown while the assistant is capturing speech
    pub fn listening() -> Self {
        Self {
            power: Power::On,
            color_mode: ColorMode::Rgb,
            brightness: 0,
            color: Rgb::new(0, 255, 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaling_rounds_down() {
        assert_eq!(Rgb::new(200, 100, 50).scaled(50), Rgb::new(100, 50, 25));
        assert_eq!(Rgb::new(255, 1, 99).scaled(33), Rgb::new(84, 0, 32));
        assert_eq!(Rgb::new(255, 255, 255).scaled(100), Rgb::new(255, 255, 255));
        assert_eq!(Rgb::new(255, 255, 255).scaled(0), Rgb::new(0, 0, 0));
    }

    #[test]
    fn test_scaling_clamps_percent() {
        assert_eq!(Rgb::new(10, 20, 30).scaled(250), Rgb::new(10, 20, 30));
    }

    #[test]
    fn test_defaults() {
        let state = LightState::default();
        assert_eq!(state.power, Power::On);
        assert_eq!(state.color_mode, ColorMode::ColorTemperature);
        assert_eq!(state.brightness, 100);
        assert_eq!(Rgb::new(1, 2, 3).to_string(), "1,2,3");
    }
}
