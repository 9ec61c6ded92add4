use crate::config::RecordingSettings;
use crate::convert::{ConvertedFrame, Poll, SampleConverter};
use crate::document::{Document, ViewKind, WaveRef};
use crate::error::SessionError;
use crate::hardware::{Channel, HardwareLink};
use crate::wave::{RecId, RecInfo, WaveKind};
use chrono::{DateTime, Local};

/// Digital word bit that carries the stimulus valve state.
pub const VALVE_BIT: i16 = 0x02;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Starting,
    Active,
    Stopping,
}

/// Result of one tick of an active session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionTick {
    NoData,
    Appended { limit_reached: bool },
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    Committed(RecId),
    Discarded,
}

/// Shift applied to the FID wave to compensate the GC delay:
/// `-(delay_ms / (1000 / samples_per_second))`, all integer division.
/// Delays longer than `i32::MAX` samples saturate at `-i32::MAX`.
pub fn fid_sample_shift(gc_delay_ms: u32, samples_per_second: u32) -> i32 {
    let ms_per_sample = (1000 / samples_per_second.max(1)).max(1);
    let samples = gc_delay_ms / ms_per_sample;
    -i32::try_from(samples).unwrap_or(i32::MAX)
}

/// Whole minutes covered by `sample_count` samples, truncating at both steps.
pub fn elapsed_minutes(sample_count: usize, samples_per_second: u32) -> usize {
    let seconds = sample_count / samples_per_second.max(1) as usize;
    seconds / 60
}

/// True once a non-zero duration limit has been reached.
pub fn duration_limit_reached(
    sample_count: usize,
    samples_per_second: u32,
    limit_minutes: u32,
) -> bool {
    limit_minutes > 0 && elapsed_minutes(sample_count, samples_per_second) >= limit_minutes as usize
}

/// Two-level encoding of the digital channel: `(+1, 0.5)` when the valve
/// bit is set, `(-1, -0.5)` otherwise.
pub fn digital_sample(word: i16) -> (i16, f64) {
    if word & VALVE_BIT != 0 {
        (1, 0.5)
    } else {
        (-1, -0.5)
    }
}

/// State machine of the one recording that may be in progress.
///
/// The session owns the in-progress recording; committing hands it to the
/// document, discarding drops it.
#[derive(Debug)]
pub struct RecordingSession {
    state: SessionState,
    recording: Option<RecInfo>,
    converter: SampleConverter,
}

impl Default for RecordingSession {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            recording: None,
            converter: SampleConverter::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// The recording being captured, if any.
    pub fn recording(&self) -> Option<&RecInfo> {
        self.recording.as_ref()
    }

    pub fn converter(&self) -> &SampleConverter {
        &self.converter
    }

    pub fn start(
        &mut self,
        document: &mut Document,
        hardware: &mut dyn HardwareLink,
        settings: &RecordingSettings,
        now: DateTime<Local>,
    ) -> Result<RecId, SessionError> {
        if self.state != SessionState::Idle {
            return Err(SessionError::AlreadyRecording);
        }
        if !hardware.is_available() {
            return Err(SessionError::HardwareUnavailable);
        }
        self.state = SessionState::Starting;

        if let Err(err) = hardware.start_sampling() {
            self.state = SessionState::Idle;
            return Err(SessionError::Hardware(format!("{err:#}")));
        }

        let mut rec = document.create_new_recording();
        let id = rec.id();
        let view = document.view_mut(ViewKind::Recording);
        view.clear_waves();
        for kind in [WaveKind::Ead, WaveKind::Fid, WaveKind::Digital] {
            view.add_wave(WaveRef {
                recording: id,
                kind,
            });
        }

        rec.set_time_of_recording(now);
        let shift = fid_sample_shift(settings.gc_delay_ms, settings.samples_per_second);
        rec.wave_mut(WaveKind::Fid).set_sample_shift(shift);

        self.converter.refresh(&*hardware);
        rec.wave_mut(WaveKind::Ead)
            .set_conversion_ratio(self.converter.ratio(Channel::Ead));
        rec.wave_mut(WaveKind::Fid)
            .set_conversion_ratio(self.converter.ratio(Channel::Fid));

        log::info!(
            "recording {id} started on {} (FID shift {shift} samples)",
            hardware.hardware_name()
        );
        self.recording = Some(rec);
        self.state = SessionState::Active;
        Ok(id)
    }

    /// Poll the device once and append whatever it delivered.
    pub fn tick(
        &mut self,
        hardware: &mut dyn HardwareLink,
        settings: &RecordingSettings,
    ) -> Result<SessionTick, SessionError> {
        if self.state != SessionState::Active {
            return Err(SessionError::NotRecording);
        }
        let Some(rec) = self.recording.as_mut() else {
            return Err(SessionError::NotRecording);
        };
        let frame = match self.converter.poll(hardware) {
            Poll::NoData => return Ok(SessionTick::NoData),
            Poll::Data(frame) => frame,
        };
        append_frame(rec, &frame);

        let limit_reached = duration_limit_reached(
            rec.sample_count(),
            settings.samples_per_second,
            settings.duration_minutes,
        );
        Ok(SessionTick::Appended { limit_reached })
    }

    /// End the session, committing the recording into `document` or dropping it.
    pub fn stop(
        &mut self,
        document: &mut Document,
        hardware: &mut dyn HardwareLink,
        save: bool,
    ) -> Result<SessionEnd, SessionError> {
        if self.state != SessionState::Active {
            return Err(SessionError::NotRecording);
        }
        self.state = SessionState::Stopping;
        hardware.stop_sampling();
        let rec = self.recording.take();
        self.state = SessionState::Idle;

        let Some(rec) = rec else {
            document.view_mut(ViewKind::Recording).clear_waves();
            return Ok(SessionEnd::Discarded);
        };
        if save {
            let samples = rec.sample_count();
            let id = document.commit_recording(rec);
            log::info!("recording {id} committed with {samples} samples");
            Ok(SessionEnd::Committed(id))
        } else {
            document.view_mut(ViewKind::Recording).clear_waves();
            log::info!("recording {} discarded", rec.id());
            Ok(SessionEnd::Discarded)
        }
    }
}

/// Digital, then EAD, then FID; consumers rely on this order.
fn append_frame(rec: &mut RecInfo, frame: &ConvertedFrame) {
    let (raw, display) = digital_sample(frame.digital);
    rec.wave_mut(WaveKind::Digital).push(raw, display);

    let ead = rec.wave_mut(WaveKind::Ead);
    ead.push(frame.ead.raw, frame.ead.display);
    ead.set_conversion_ratio(frame.ead_ratio);

    let fid = rec.wave_mut(WaveKind::Fid);
    fid.push(frame.fid.raw, frame.fid.display);
    fid.set_conversion_ratio(frame.fid_ratio);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::{ChannelCalibration, SimulatedHardware};

    fn settings(duration_minutes: u32) -> RecordingSettings {
        RecordingSettings {
            duration_minutes,
            gc_delay_ms: 1500,
            samples_per_second: 100,
            ..RecordingSettings::default()
        }
    }

    fn started(duration_minutes: u32) -> (RecordingSession, Document, SimulatedHardware) {
        let mut session = RecordingSession::new();
        let mut doc = Document::new();
        let mut hw = SimulatedHardware::new(11);
        session
            .start(&mut doc, &mut hw, &settings(duration_minutes), Local::now())
            .expect("start");
        (session, doc, hw)
    }

    #[test]
    fn digital_encoding_uses_valve_bit() {
        assert_eq!(digital_sample(0x02), (1, 0.5));
        assert_eq!(digital_sample(0x03), (1, 0.5));
        assert_eq!(digital_sample(0x01), (-1, -0.5));
        assert_eq!(digital_sample(0x00), (-1, -0.5));
        assert_eq!(digital_sample(-1), (1, 0.5));
    }

    #[test]
    fn fid_shift_uses_integer_sample_period() {
        assert_eq!(fid_sample_shift(1500, 100), -150);
        assert_eq!(fid_sample_shift(1505, 100), -150);
        assert_eq!(fid_sample_shift(0, 100), 0);
        assert_eq!(fid_sample_shift(999, 300), -333);
    }

    #[test]
    fn huge_gc_delay_saturates_negative() {
        assert_eq!(fid_sample_shift(3_000_000_000, 1000), -i32::MAX);
        assert_eq!(fid_sample_shift(2_147_483_648, 1000), -i32::MAX);
        assert_eq!(fid_sample_shift(u32::MAX, 5000), -i32::MAX);
        assert_eq!(fid_sample_shift(2_147_483_647, 1000), -i32::MAX);
    }

    #[test]
    fn elapsed_minutes_truncates_twice() {
        assert_eq!(elapsed_minutes(5999, 100), 0);
        assert_eq!(elapsed_minutes(6000, 100), 1);
        assert_eq!(elapsed_minutes(30000, 100), 5);
        assert!(!duration_limit_reached(1_000_000, 100, 0));
        assert!(duration_limit_reached(6000, 100, 1));
        assert!(!duration_limit_reached(11_999, 100, 2));
    }

    #[test]
    fn start_prepares_recording_view_and_shift() {
        let (session, doc, hw) = started(0);
        assert!(session.is_active());
        assert!(hw.is_sampling());
        let rec = session.recording().expect("in progress");
        assert_eq!(rec.fid().sample_shift(), -150);
        assert!(rec.time_of_recording().is_some());
        assert_eq!(
            rec.ead().conversion_ratio(),
            crate::convert::calibration_ratio(&ChannelCalibration::default())
        );
        let view = doc.view(ViewKind::Recording);
        assert_eq!(view.len(), 3);
        assert!(view.waves().iter().all(|w| w.recording == rec.id()));
        assert_eq!(doc.recording_count(), 0);
    }

    #[test]
    fn second_start_is_refused_without_touching_buffers() {
        let (mut session, mut doc, mut hw) = started(0);
        for _ in 0..3 {
            session.tick(&mut hw, &settings(0)).unwrap();
        }
        let id = session.recording().unwrap().id();
        let err = session
            .start(&mut doc, &mut hw, &settings(0), Local::now())
            .unwrap_err();
        assert!(matches!(err, SessionError::AlreadyRecording));
        let rec = session.recording().unwrap();
        assert_eq!(rec.id(), id);
        assert_eq!(rec.ead().len(), 3);
    }

    #[test]
    fn unavailable_hardware_creates_nothing() {
        let mut session = RecordingSession::new();
        let mut doc = Document::new();
        let mut hw = SimulatedHardware::disconnected(0);
        let err = session
            .start(&mut doc, &mut hw, &settings(0), Local::now())
            .unwrap_err();
        assert!(matches!(err, SessionError::HardwareUnavailable));
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.recording().is_none());
        assert!(doc.view(ViewKind::Recording).is_empty());
    }

    #[test]
    fn ticks_keep_channels_aligned() {
        let (mut session, _doc, mut hw) = started(0);
        for _ in 0..25 {
            let tick = session.tick(&mut hw, &settings(0)).unwrap();
            assert_eq!(tick, SessionTick::Appended { limit_reached: false });
        }
        let rec = session.recording().unwrap();
        for wave in [rec.ead(), rec.fid(), rec.digital()] {
            assert_eq!(wave.len(), 25);
            assert_eq!(wave.raw().len(), wave.display().len());
        }
        for (raw, display) in rec.digital().raw().iter().zip(rec.digital().display()) {
            assert_eq!(f64::from(*raw) * 0.5, *display);
        }
    }

    #[test]
    fn no_data_tick_leaves_buffers_alone() {
        let mut session = RecordingSession::new();
        let mut doc = Document::new();
        let mut hw = SimulatedHardware::new(3).with_skip_every(2);
        session
            .start(&mut doc, &mut hw, &settings(0), Local::now())
            .unwrap();
        assert!(matches!(
            session.tick(&mut hw, &settings(0)).unwrap(),
            SessionTick::Appended { .. }
        ));
        assert_eq!(session.tick(&mut hw, &settings(0)).unwrap(), SessionTick::NoData);
        assert_eq!(session.recording().unwrap().ead().len(), 1);
    }

    #[test]
    fn limit_is_reported_on_the_exact_sample() {
        let (mut session, _doc, mut hw) = started(1);
        for _ in 0..5999 {
            let tick = session.tick(&mut hw, &settings(1)).unwrap();
            assert_eq!(tick, SessionTick::Appended { limit_reached: false });
        }
        let tick = session.tick(&mut hw, &settings(1)).unwrap();
        assert_eq!(tick, SessionTick::Appended { limit_reached: true });
    }

    #[test]
    fn discard_drops_recording_and_clears_view() {
        let (mut session, mut doc, mut hw) = started(0);
        session.tick(&mut hw, &settings(0)).unwrap();
        let end = session.stop(&mut doc, &mut hw, false).unwrap();
        assert_eq!(end, SessionEnd::Discarded);
        assert_eq!(doc.recording_count(), 0);
        assert!(doc.view(ViewKind::Recording).is_empty());
        assert!(session.recording().is_none());
        assert!(!hw.is_sampling());
    }

    #[test]
    fn commit_moves_recording_into_document() {
        let (mut session, mut doc, mut hw) = started(0);
        for _ in 0..4 {
            session.tick(&mut hw, &settings(0)).unwrap();
        }
        let SessionEnd::Committed(id) = session.stop(&mut doc, &mut hw, true).unwrap() else {
            panic!("expected commit");
        };
        assert_eq!(doc.recording_count(), 1);
        assert_eq!(doc.recording(id).unwrap().ead().len(), 4);

        let next = session
            .start(&mut doc, &mut hw, &settings(0), Local::now())
            .unwrap();
        assert_ne!(next, id);
        assert!(session.recording().unwrap().ead().is_empty());
    }

    #[test]
    fn committed_recording_stays_in_recording_view_until_next_start() {
        let (mut session, mut doc, mut hw) = started(0);
        session.tick(&mut hw, &settings(0)).unwrap();
        let SessionEnd::Committed(id) = session.stop(&mut doc, &mut hw, true).unwrap() else {
            panic!("expected commit");
        };
        let kept: Vec<_> = doc.view(ViewKind::Recording).waves().to_vec();
        assert_eq!(kept.len(), 3);
        assert!(kept.iter().all(|w| w.recording == id));
        assert!(kept.iter().all(|w| doc.wave(w).is_some()));

        let next = session
            .start(&mut doc, &mut hw, &settings(0), Local::now())
            .unwrap();
        let view = doc.view(ViewKind::Recording);
        assert_eq!(view.len(), 3);
        assert!(view.waves().iter().all(|w| w.recording == next));
    }

    #[test]
    fn stop_while_idle_is_refused() {
        let (mut session, mut doc, mut hw) = started(0);
        session.stop(&mut doc, &mut hw, true).unwrap();
        let err = session.stop(&mut doc, &mut hw, true).unwrap_err();
        assert!(matches!(err, SessionError::NotRecording));
        assert_eq!(doc.recording_count(), 1);
        assert!(matches!(
            session.tick(&mut hw, &settings(0)),
            Err(SessionError::NotRecording)
        ));
    }
}
