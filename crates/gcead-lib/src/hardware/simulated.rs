use super::{
    Channel, ChannelCalibration, ChannelSettings, HardwareLink, HardwareState, RawFrame,
};
use anyhow::{anyhow, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};

const NAME: &str = "Simulated IDAC";
/// Frames between valve openings.
const VALVE_PERIOD: u64 = 50;
/// Frames the valve stays open.
const VALVE_OPEN: u64 = 5;
/// Frames between FID peaks.
const PEAK_PERIOD: u64 = 35;

/// Deterministic stand-in for the acquisition device.
///
/// Produces one frame per poll: an EAD baseline that depolarises while the
/// valve (digital bit `0x02`) is open, and a train of FID peaks.
pub struct SimulatedHardware {
    state: HardwareState,
    sampling: bool,
    rng: StdRng,
    frame: u64,
    polls: u64,
    skip_every: Option<u64>,
    calibration: [ChannelCalibration; 3],
}

impl SimulatedHardware {
    pub fn new(seed: u64) -> Self {
        Self {
            state: HardwareState::Ready,
            sampling: false,
            rng: StdRng::seed_from_u64(seed),
            frame: 0,
            polls: 0,
            skip_every: None,
            calibration: [ChannelCalibration::default(); 3],
        }
    }

    /// A device that still has to be connected with `setup`.
    pub fn disconnected(seed: u64) -> Self {
        Self {
            state: HardwareState::NotPresent,
            ..Self::new(seed)
        }
    }

    /// Report no data on every `n`th poll.
    pub fn with_skip_every(mut self, n: u64) -> Self {
        self.skip_every = (n > 0).then_some(n);
        self
    }

    pub fn with_calibration(mut self, channel: Channel, calibration: ChannelCalibration) -> Self {
        self.calibration[channel.index()] = calibration;
        self
    }

    pub fn set_calibration(&mut self, channel: Channel, calibration: ChannelCalibration) {
        self.calibration[channel.index()] = calibration;
    }

    pub fn is_sampling(&self) -> bool {
        self.sampling
    }

    fn next_frame(&mut self) -> RawFrame {
        let t = self.frame;
        self.frame += 1;
        let valve_open = t % VALVE_PERIOD < VALVE_OPEN;
        let digital: i16 = if valve_open { 0x02 } else { 0x00 };

        let ead_noise: f64 = self.rng.gen_range(-15.0..=15.0);
        let response = if valve_open {
            -400.0 * ((t % VALVE_PERIOD) as f64 + 1.0) / VALVE_OPEN as f64
        } else {
            0.0
        };
        let ead = (ead_noise + response) as i16;

        let phase = (t % PEAK_PERIOD) as f64 - PEAK_PERIOD as f64 / 2.0;
        let peak = 2500.0 * (-(phase * phase) / 8.0).exp();
        let fid_noise: f64 = self.rng.gen_range(-5.0..=5.0);
        let fid = (100.0 + peak + fid_noise) as i16;

        RawFrame { digital, ead, fid }
    }
}

impl HardwareLink for SimulatedHardware {
    fn is_available(&self) -> bool {
        matches!(self.state, HardwareState::Ready | HardwareState::Sampling)
    }

    fn state(&self) -> HardwareState {
        self.state
    }

    fn setup(&mut self) {
        log::debug!("{NAME}: setup from state {}", self.state);
        self.state = HardwareState::Ready;
    }

    fn start_sampling(&mut self) -> Result<()> {
        if !self.is_available() {
            return Err(anyhow!("{NAME} is not available ({})", self.state));
        }
        self.sampling = true;
        self.state = HardwareState::Sampling;
        Ok(())
    }

    fn stop_sampling(&mut self) {
        if self.sampling {
            self.sampling = false;
            self.state = HardwareState::Ready;
        }
    }

    fn hardware_name(&self) -> String {
        NAME.to_string()
    }

    fn take_frame(&mut self) -> Option<RawFrame> {
        if !self.sampling {
            return None;
        }
        self.polls += 1;
        if let Some(n) = self.skip_every {
            if self.polls % n == 0 {
                return None;
            }
        }
        Some(self.next_frame())
    }

    fn calibration(&self, channel: Channel) -> ChannelCalibration {
        self.calibration[channel.index()]
    }

    fn load_channel_settings(&mut self, settings: &[ChannelSettings]) {
        for setting in settings.iter().filter(|s| s.hardware == NAME) {
            let calibration = &mut self.calibration[setting.channel.index()];
            calibration.gain = setting.gain;
            calibration.offset = setting.offset;
        }
    }

    fn channel_settings(&self) -> Vec<ChannelSettings> {
        [Channel::Ead, Channel::Fid]
            .into_iter()
            .map(|channel| {
                let calibration = self.calibration[channel.index()];
                ChannelSettings {
                    hardware: NAME.to_string(),
                    channel,
                    gain: calibration.gain,
                    offset: calibration.offset,
                }
            })
            .collect()
    }
}
