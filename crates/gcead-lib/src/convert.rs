use crate::hardware::{Channel, ChannelCalibration, HardwareLink};
use crate::wave::ConversionRatio;

/// Raw and display value of one analog sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub raw: i16,
    pub display: f64,
}

/// Everything produced by one successful poll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvertedFrame {
    pub digital: i16,
    pub ead: Sample,
    pub fid: Sample,
    pub ead_ratio: ConversionRatio,
    pub fid_ratio: ConversionRatio,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Poll {
    Data(ConvertedFrame),
    /// The device has nothing new this tick; not an error.
    NoData,
}

/// Millivolts per raw count, as an unreduced ratio of the calibration terms.
pub fn calibration_ratio(calibration: &ChannelCalibration) -> ConversionRatio {
    let numerator = i64::from(calibration.input_range_uv);
    let denominator =
        i64::from(calibration.adc_full_scale) * i64::from(calibration.gain) * 1000;
    ConversionRatio::new(numerator, denominator)
}

/// Turns raw device samples into display units with the live calibration.
#[derive(Debug, Clone, Default)]
pub struct SampleConverter {
    ratios: [ConversionRatio; 3],
    offsets: [i32; 3],
}

impl SampleConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-read the baseline factors for both analog channels.
    pub fn refresh(&mut self, hardware: &dyn HardwareLink) {
        for channel in [Channel::Ead, Channel::Fid] {
            self.compute_conversion_ratio(hardware, channel);
        }
    }

    /// Recompute and cache the ratio of `channel` from the device's current
    /// calibration. The ratio is stored exactly as derived, never reduced.
    pub fn compute_conversion_ratio(
        &mut self,
        hardware: &dyn HardwareLink,
        channel: Channel,
    ) -> ConversionRatio {
        if channel == Channel::Digital {
            return ConversionRatio::unity();
        }
        let calibration = hardware.calibration(channel);
        let ratio = calibration_ratio(&calibration);
        if ratio.denominator == 0 {
            log::warn!("{channel:?} calibration has a zero scale: {calibration:?}");
        }
        self.ratios[channel.index()] = ratio;
        self.offsets[channel.index()] = calibration.offset;
        ratio
    }

    pub fn ratio(&self, channel: Channel) -> ConversionRatio {
        self.ratios[channel.index()]
    }

    /// Apply the cached calibration of `channel` to a raw sample.
    pub fn convert(&self, raw: i16, channel: Channel) -> f64 {
        if channel == Channel::Digital {
            return f64::from(raw);
        }
        let centered = i64::from(raw) - i64::from(self.offsets[channel.index()]);
        centered as f64 * self.ratios[channel.index()].factor()
    }

    /// Query the device for the next frame and convert it.
    pub fn poll(&mut self, hardware: &mut dyn HardwareLink) -> Poll {
        if !hardware.is_available() {
            return Poll::NoData;
        }
        let Some(frame) = hardware.take_frame() else {
            return Poll::NoData;
        };
        let ead_ratio = self.compute_conversion_ratio(&*hardware, Channel::Ead);
        let fid_ratio = self.compute_conversion_ratio(&*hardware, Channel::Fid);
        Poll::Data(ConvertedFrame {
            digital: frame.digital,
            ead: Sample {
                raw: frame.ead,
                display: self.convert(frame.ead, Channel::Ead),
            },
            fid: Sample {
                raw: frame.fid,
                display: self.convert(frame.fid, Channel::Fid),
            },
            ead_ratio,
            fid_ratio,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::SimulatedHardware;

    #[test]
    fn ratio_is_not_reduced() {
        let ratio = calibration_ratio(&ChannelCalibration {
            gain: 4,
            offset: 0,
            input_range_uv: 10_000_000,
            adc_full_scale: 32_768,
        });
        assert_eq!(ratio, ConversionRatio::new(10_000_000, 131_072_000));
    }

    #[test]
    fn poll_without_sampling_is_no_data() {
        let mut hw = SimulatedHardware::new(0);
        let mut converter = SampleConverter::new();
        assert_eq!(converter.poll(&mut hw), Poll::NoData);
    }

    #[test]
    fn poll_tracks_calibration_changes_between_samples() {
        let mut hw = SimulatedHardware::new(0);
        hw.start_sampling().expect("start");
        let mut converter = SampleConverter::new();
        let Poll::Data(first) = converter.poll(&mut hw) else {
            panic!("expected data");
        };
        hw.set_calibration(
            Channel::Ead,
            ChannelCalibration {
                gain: 16,
                ..ChannelCalibration::default()
            },
        );
        let Poll::Data(second) = converter.poll(&mut hw) else {
            panic!("expected data");
        };
        assert_eq!(first.ead_ratio.denominator * 16, second.ead_ratio.denominator);
        assert_eq!(first.fid_ratio, second.fid_ratio);
        let expected = f64::from(second.ead.raw) * second.ead_ratio.factor();
        assert!((second.ead.display - expected).abs() < 1e-9);
    }

    #[test]
    fn convert_subtracts_offset() {
        let mut hw = SimulatedHardware::new(0);
        hw.set_calibration(
            Channel::Fid,
            ChannelCalibration {
                offset: 100,
                input_range_uv: 1000,
                adc_full_scale: 1,
                gain: 1,
            },
        );
        let mut converter = SampleConverter::new();
        converter.refresh(&hw);
        assert!((converter.convert(150, Channel::Fid) - 50.0).abs() < 1e-9);
        assert_eq!(converter.convert(2, Channel::Digital), 2.0);
    }

    #[test]
    fn extreme_offsets_do_not_overflow() {
        let mut hw = SimulatedHardware::new(0);
        for (channel, offset) in [(Channel::Ead, i32::MIN), (Channel::Fid, i32::MAX)] {
            hw.set_calibration(
                channel,
                ChannelCalibration {
                    offset,
                    input_range_uv: 1,
                    adc_full_scale: 1,
                    gain: 1,
                },
            );
        }
        let mut converter = SampleConverter::new();
        converter.refresh(&hw);
        let ead = converter.convert(1, Channel::Ead);
        let fid = converter.convert(i16::MIN, Channel::Fid);
        assert!((ead - 2_147_483_649.0 / 1000.0).abs() < 1e-3);
        assert!((fid - -2_147_516_415.0 / 1000.0).abs() < 1e-3);
        assert!(ead > 0.0 && fid < 0.0);
    }
}
