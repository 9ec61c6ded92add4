use crate::wave::{RecId, RecInfo, WaveBuffer, WaveKind};
use chrono::{Duration, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level activity of the application window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Task {
    Review,
    Publish,
}

/// Chart groupings a document can be viewed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViewKind {
    Averages,
    Eads,
    Fids,
    All,
    Recording,
}

impl ViewKind {
    pub fn all() -> [ViewKind; 5] {
        [
            ViewKind::Averages,
            ViewKind::Eads,
            ViewKind::Fids,
            ViewKind::All,
            ViewKind::Recording,
        ]
    }

    fn index(&self) -> usize {
        match self {
            ViewKind::Averages => 0,
            ViewKind::Eads => 1,
            ViewKind::Fids => 2,
            ViewKind::All => 3,
            ViewKind::Recording => 4,
        }
    }
}

/// Non-owning reference to one wave of a recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WaveRef {
    pub recording: RecId,
    pub kind: WaveKind,
}

/// Ordered wave references shown together in one chart.
#[derive(Debug, Clone)]
pub struct ViewInfo {
    kind: ViewKind,
    waves: Vec<WaveRef>,
}

impl ViewInfo {
    fn new(kind: ViewKind) -> Self {
        Self {
            kind,
            waves: Vec::new(),
        }
    }

    pub fn kind(&self) -> ViewKind {
        self.kind
    }

    pub fn waves(&self) -> &[WaveRef] {
        &self.waves
    }

    pub fn len(&self) -> usize {
        self.waves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waves.is_empty()
    }

    pub fn add_wave(&mut self, wave: WaveRef) {
        self.waves.push(wave);
    }

    pub fn clear_waves(&mut self) {
        self.waves.clear();
    }
}

/// Serialized form of a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectFile {
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub recordings: Vec<RecInfo>,
}

/// A project: committed recordings plus the view groupings over them.
#[derive(Debug, Clone)]
pub struct Document {
    filename: Option<PathBuf>,
    comment: String,
    dirty: bool,
    recordings: Vec<RecInfo>,
    views: [ViewInfo; 5],
    next_id: u32,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            filename: None,
            comment: String::new(),
            dirty: false,
            recordings: Vec::new(),
            views: ViewKind::all().map(ViewInfo::new),
            next_id: 1,
        }
    }

    pub fn from_project(project: ProjectFile, filename: Option<PathBuf>) -> Self {
        let next_id = project
            .recordings
            .iter()
            .map(|rec| rec.id().0 + 1)
            .max()
            .unwrap_or(1);
        let mut doc = Self {
            filename,
            comment: project.comment,
            dirty: false,
            recordings: project.recordings,
            views: ViewKind::all().map(ViewInfo::new),
            next_id,
        };
        doc.rebuild_views();
        doc
    }

    pub fn to_project(&self) -> ProjectFile {
        ProjectFile {
            comment: self.comment.clone(),
            recordings: self.recordings.clone(),
        }
    }

    /// A document with two synthetic recordings, for trying out the review views.
    pub fn sample_project() -> Self {
        let mut doc = Self::new();
        let start = Local::now();
        for n in 0..2u32 {
            let mut rec = doc.create_new_recording();
            rec.set_time_of_recording(start + Duration::minutes(i64::from(n) * 15));
            for i in 0..600u32 {
                let t = f64::from(i) / 100.0;
                let valve = (20..25).contains(&(i % 100));
                let ead = (-(t * 3.0 + f64::from(n)).sin() * 200.0) as i16;
                let fid = (2000.0 * (-((t - 3.0) * (t - 3.0)) * 4.0).exp()) as i16;
                rec.wave_mut(WaveKind::Digital)
                    .push(if valve { 1 } else { -1 }, if valve { 0.5 } else { -0.5 });
                rec.wave_mut(WaveKind::Ead)
                    .push(ead, f64::from(ead) * 0.305);
                rec.wave_mut(WaveKind::Fid)
                    .push(fid, f64::from(fid) * 0.305);
            }
            doc.commit_recording(rec);
        }
        doc.comment = "Sample project".into();
        doc.dirty = false;
        doc
    }

    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    pub fn set_filename(&mut self, filename: Option<PathBuf>) {
        self.filename = filename;
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.comment = comment.into();
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    pub fn recordings(&self) -> &[RecInfo] {
        &self.recordings
    }

    pub fn recording_count(&self) -> usize {
        self.recordings.len()
    }

    pub fn recording(&self, id: RecId) -> Option<&RecInfo> {
        self.recordings.iter().find(|rec| rec.id() == id)
    }

    /// Look up a committed wave.
    pub fn wave(&self, wave: &WaveRef) -> Option<&WaveBuffer> {
        self.recording(wave.recording).map(|rec| rec.wave(wave.kind))
    }

    pub fn view(&self, kind: ViewKind) -> &ViewInfo {
        &self.views[kind.index()]
    }

    pub fn view_mut(&mut self, kind: ViewKind) -> &mut ViewInfo {
        &mut self.views[kind.index()]
    }

    /// Allocate an empty recording with the next id. The caller owns it
    /// until it is handed back through `commit_recording`.
    pub fn create_new_recording(&mut self) -> RecInfo {
        let id = RecId(self.next_id);
        self.next_id += 1;
        RecInfo::new(id)
    }

    /// Take ownership of a finished recording.
    pub fn commit_recording(&mut self, rec: RecInfo) -> RecId {
        let id = rec.id();
        self.recordings.push(rec);
        self.dirty = true;
        self.rebuild_views();
        id
    }

    /// Repopulate the per-channel views from the committed recordings.
    fn rebuild_views(&mut self) {
        for kind in [ViewKind::Eads, ViewKind::Fids, ViewKind::All] {
            self.views[kind.index()].clear_waves();
        }
        for rec in &self.recordings {
            let id = rec.id();
            let ead = WaveRef {
                recording: id,
                kind: WaveKind::Ead,
            };
            let fid = WaveRef {
                recording: id,
                kind: WaveKind::Fid,
            };
            self.views[ViewKind::Eads.index()].add_wave(ead);
            self.views[ViewKind::Fids.index()].add_wave(fid);
            self.views[ViewKind::All.index()].add_wave(ead);
            self.views[ViewKind::All.index()].add_wave(fid);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_ids_are_unique() {
        let mut doc = Document::new();
        let a = doc.create_new_recording();
        let b = doc.create_new_recording();
        assert_ne!(a.id(), b.id());
        assert_eq!(doc.recording_count(), 0);
    }

    #[test]
    fn commit_adds_recording_and_marks_dirty() {
        let mut doc = Document::new();
        let rec = doc.create_new_recording();
        let id = doc.commit_recording(rec);
        assert_eq!(doc.recording_count(), 1);
        assert!(doc.is_dirty());
        assert!(doc.recording(id).is_some());
        assert_eq!(doc.view(ViewKind::Eads).len(), 1);
        assert_eq!(doc.view(ViewKind::All).len(), 2);
        assert!(doc.view(ViewKind::Recording).is_empty());
    }

    #[test]
    fn project_round_trip_restores_ids_and_views() {
        let doc = Document::sample_project();
        let restored = Document::from_project(doc.to_project(), None);
        assert_eq!(restored.recording_count(), 2);
        assert_eq!(restored.comment(), "Sample project");
        assert!(!restored.is_dirty());
        assert_eq!(restored.view(ViewKind::Fids).len(), 2);
        let mut restored = restored;
        let next = restored.create_new_recording();
        assert_eq!(next.id(), RecId(3));
    }

    #[test]
    fn wave_refs_resolve_against_committed_recordings() {
        let doc = Document::sample_project();
        let wave = doc.view(ViewKind::Eads).waves()[0];
        let buffer = doc.wave(&wave).expect("committed wave");
        assert_eq!(buffer.kind(), WaveKind::Ead);
        assert_eq!(buffer.len(), 600);
    }
}
