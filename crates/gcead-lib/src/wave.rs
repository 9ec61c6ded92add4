use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Which signal a wave buffer carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WaveKind {
    Ead,
    Fid,
    Digital,
}

impl WaveKind {
    pub fn label(&self) -> &'static str {
        match self {
            WaveKind::Ead => "EAD",
            WaveKind::Fid => "FID",
            WaveKind::Digital => "Digital",
        }
    }
}

/// Exact raw-to-voltage scale. The ratio is authoritative; the floating
/// factor is only ever derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRatio {
    pub numerator: i64,
    pub denominator: i64,
}

impl ConversionRatio {
    pub const fn new(numerator: i64, denominator: i64) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Identity scale used by the digital channel and by fresh buffers.
    pub const fn unity() -> Self {
        Self::new(1, 1)
    }

    /// Floating approximation of the ratio; a zero denominator yields 0.0.
    pub fn factor(&self) -> f64 {
        if self.denominator == 0 {
            return 0.0;
        }
        self.numerator as f64 / self.denominator as f64
    }
}

impl Default for ConversionRatio {
    fn default() -> Self {
        Self::unity()
    }
}

/// Append-only raw/display sample storage for one channel of a recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaveBuffer {
    kind: WaveKind,
    raw: Vec<i16>,
    display: Vec<f64>,
    ratio: ConversionRatio,
    /// Offset in samples applied when aligning this channel with the others.
    sample_shift: i32,
    #[serde(default)]
    comment: String,
}

impl WaveBuffer {
    pub fn new(kind: WaveKind) -> Self {
        Self {
            kind,
            raw: Vec::new(),
            display: Vec::new(),
            ratio: ConversionRatio::unity(),
            sample_shift: 0,
            comment: String::new(),
        }
    }

    pub fn kind(&self) -> WaveKind {
        self.kind
    }

    /// Append one sample to both sequences so they stay index aligned.
    pub fn push(&mut self, raw: i16, display: f64) {
        self.raw.push(raw);
        self.display.push(display);
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn raw(&self) -> &[i16] {
        &self.raw
    }

    pub fn display(&self) -> &[f64] {
        &self.display
    }

    pub fn conversion_ratio(&self) -> ConversionRatio {
        self.ratio
    }

    pub fn set_conversion_ratio(&mut self, ratio: ConversionRatio) {
        self.ratio = ratio;
    }

    pub fn conversion_factor(&self) -> f64 {
        self.ratio.factor()
    }

    pub fn sample_shift(&self) -> i32 {
        self.sample_shift
    }

    pub fn set_sample_shift(&mut self, shift: i32) {
        self.sample_shift = shift;
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.comment = comment.into();
    }
}

/// Identifier of a recording within its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecId(pub u32);

impl std::fmt::Display for RecId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One recording: the EAD, FID and digital buffers captured together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecInfo {
    id: RecId,
    time_of_recording: Option<DateTime<Local>>,
    ead: WaveBuffer,
    fid: WaveBuffer,
    digital: WaveBuffer,
}

impl RecInfo {
    pub fn new(id: RecId) -> Self {
        Self {
            id,
            time_of_recording: None,
            ead: WaveBuffer::new(WaveKind::Ead),
            fid: WaveBuffer::new(WaveKind::Fid),
            digital: WaveBuffer::new(WaveKind::Digital),
        }
    }

    pub fn id(&self) -> RecId {
        self.id
    }

    pub fn time_of_recording(&self) -> Option<DateTime<Local>> {
        self.time_of_recording
    }

    pub fn set_time_of_recording(&mut self, time: DateTime<Local>) {
        self.time_of_recording = Some(time);
    }

    pub fn ead(&self) -> &WaveBuffer {
        &self.ead
    }

    pub fn fid(&self) -> &WaveBuffer {
        &self.fid
    }

    pub fn digital(&self) -> &WaveBuffer {
        &self.digital
    }

    pub fn wave(&self, kind: WaveKind) -> &WaveBuffer {
        match kind {
            WaveKind::Ead => &self.ead,
            WaveKind::Fid => &self.fid,
            WaveKind::Digital => &self.digital,
        }
    }

    pub fn wave_mut(&mut self, kind: WaveKind) -> &mut WaveBuffer {
        match kind {
            WaveKind::Ead => &mut self.ead,
            WaveKind::Fid => &mut self.fid,
            WaveKind::Digital => &mut self.digital,
        }
    }

    /// Number of ticks captured, counted on the EAD channel.
    pub fn sample_count(&self) -> usize {
        self.ead.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_keeps_raw_and_display_aligned() {
        let mut wave = WaveBuffer::new(WaveKind::Ead);
        assert!(wave.is_empty());
        wave.push(120, 1.2);
        wave.push(-40, -0.4);
        assert_eq!(wave.raw().len(), wave.display().len());
        assert_eq!(wave.len(), 2);
        assert_eq!(wave.raw()[1], -40);
    }

    #[test]
    fn ratio_is_authoritative_over_factor() {
        let mut wave = WaveBuffer::new(WaveKind::Fid);
        wave.set_conversion_ratio(ConversionRatio::new(10_000_000, 32_768_000));
        assert_eq!(wave.conversion_ratio().numerator, 10_000_000);
        assert_eq!(wave.conversion_ratio().denominator, 32_768_000);
        assert!((wave.conversion_factor() - 0.30517578125).abs() < 1e-12);
    }

    #[test]
    fn zero_denominator_factor_is_zero() {
        assert_eq!(ConversionRatio::new(5, 0).factor(), 0.0);
    }

    #[test]
    fn new_recording_has_three_empty_waves() {
        let rec = RecInfo::new(RecId(3));
        assert_eq!(rec.id(), RecId(3));
        assert!(rec.ead().is_empty() && rec.fid().is_empty() && rec.digital().is_empty());
        assert_eq!(rec.wave(WaveKind::Digital).kind(), WaveKind::Digital);
        assert!(rec.time_of_recording().is_none());
    }
}
