//! Contract of the acquisition device as consumed by the recording core.

pub mod simulated;

pub use simulated::SimulatedHardware;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Hardware input channels, in the device's own numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Digital,
    Ead,
    Fid,
}

impl Channel {
    pub fn index(&self) -> usize {
        match self {
            Channel::Digital => 0,
            Channel::Ead => 1,
            Channel::Fid => 2,
        }
    }

    pub fn all() -> [Channel; 3] {
        [Channel::Digital, Channel::Ead, Channel::Fid]
    }
}

/// Connection lifecycle reported by the device driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareState {
    None,
    Searching,
    NotPresent,
    Present,
    Initializing,
    InitError,
    Ready,
    Sampling,
    Error,
}

impl HardwareState {
    /// States from which a manual connect attempt should run `setup`.
    pub fn needs_setup(&self) -> bool {
        matches!(
            self,
            HardwareState::None
                | HardwareState::Searching
                | HardwareState::NotPresent
                | HardwareState::Present
                | HardwareState::Initializing
                | HardwareState::InitError
        )
    }
}

impl fmt::Display for HardwareState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            HardwareState::None => "none",
            HardwareState::Searching => "searching",
            HardwareState::NotPresent => "not present",
            HardwareState::Present => "present",
            HardwareState::Initializing => "initializing",
            HardwareState::InitError => "init error",
            HardwareState::Ready => "ready",
            HardwareState::Sampling => "sampling",
            HardwareState::Error => "error",
        };
        f.write_str(label)
    }
}

/// One sample of every channel as delivered by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFrame {
    pub digital: i16,
    pub ead: i16,
    pub fid: i16,
}

/// Live calibration of one analog channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelCalibration {
    /// Amplifier gain multiplier (1, 4, 16, ...).
    pub gain: i32,
    /// Raw count reading that corresponds to 0 V.
    pub offset: i32,
    /// Input range at unity gain, in microvolts.
    pub input_range_uv: i32,
    /// Raw count at full input range.
    pub adc_full_scale: i32,
}

impl Default for ChannelCalibration {
    fn default() -> Self {
        Self {
            gain: 1,
            offset: 0,
            input_range_uv: 10_000_000,
            adc_full_scale: 32_768,
        }
    }
}

/// User-adjustable channel settings, stored per hardware model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSettings {
    pub hardware: String,
    pub channel: Channel,
    #[serde(default = "default_gain")]
    pub gain: i32,
    #[serde(default)]
    pub offset: i32,
}

fn default_gain() -> i32 {
    1
}

/// Acquisition device consumed by the session controller.
pub trait HardwareLink: Send {
    fn is_available(&self) -> bool;
    fn state(&self) -> HardwareState;
    /// Start (or restart) device discovery and initialisation.
    fn setup(&mut self);
    fn start_sampling(&mut self) -> anyhow::Result<()>;
    fn stop_sampling(&mut self);
    fn hardware_name(&self) -> String;
    /// Next frame if the device produced one since the last call.
    fn take_frame(&mut self) -> Option<RawFrame>;
    fn calibration(&self, channel: Channel) -> ChannelCalibration;
    fn load_channel_settings(&mut self, settings: &[ChannelSettings]);
    /// Current settings, in the form they are stored in the configuration.
    fn channel_settings(&self) -> Vec<ChannelSettings>;
}
