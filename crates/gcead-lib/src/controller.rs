use crate::config::AppConfig;
use crate::document::{Document, Task, ViewKind, WaveRef};
use crate::driver::PollTimer;
use crate::error::{Guard, SessionError};
use crate::events::{EventBus, Notification};
use crate::hardware::HardwareLink;
use crate::io::project::Persistence;
use crate::session::{RecordingSession, SessionEnd, SessionState, SessionTick};
use crate::ui::{UiGateway, UnsavedChoice};
use crate::wave::{RecId, WaveBuffer};
use chrono::Local;
use crossbeam_channel::Receiver;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

pub const APP_NAME: &str = "GcEad";
/// Extension appended to project files saved without one.
pub const PROJECT_EXTENSION: &str = "ead";

/// What one timer tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Appended,
    NoData,
    Stopped(StopOutcome),
}

/// How a recording session ended, as seen by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Committed {
        id: RecId,
        saved: bool,
        auto_stop: bool,
    },
    Discarded,
}

/// Message shown once a recording has been committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionMessage {
    Information(&'static str),
    Warning(&'static str),
}

pub fn completion_message(auto_stop: bool, saved: bool) -> CompletionMessage {
    match (auto_stop, saved) {
        (true, true) => CompletionMessage::Information(
            "The preset recording time has elapsed, and your data has been automatically saved.",
        ),
        (true, false) => CompletionMessage::Warning(
            "The preset recording time has elapsed, but your data has not yet been saved to disk!",
        ),
        (false, true) => CompletionMessage::Information("The new recording has been saved"),
        (false, false) => {
            CompletionMessage::Warning("WARNING: Your data has not yet been saved to disk!")
        }
    }
}

/// Which user actions are currently enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionState {
    pub file_new: bool,
    pub file_open: bool,
    pub file_save: bool,
    pub file_save_as: bool,
    pub file_export: bool,
    pub file_load_sample_project: bool,
    pub view_wave_comments: bool,
    pub view_recording: bool,
    pub record_record: bool,
    pub record_hardware_settings: bool,
    pub record_save: bool,
    pub record_discard: bool,
    pub record_hardware_connect: bool,
}

/// Wires the device, the recording session and the document together.
pub struct SessionController {
    config: AppConfig,
    document: Document,
    session: RecordingSession,
    hardware: Box<dyn HardwareLink>,
    ui: Box<dyn UiGateway>,
    persistence: Box<dyn Persistence>,
    events: EventBus,
    timer: PollTimer,
    task: Task,
    view: ViewKind,
    recording_view_enabled: bool,
    window_title: String,
    window_modified: bool,
}

impl SessionController {
    pub fn new(
        config: AppConfig,
        hardware: Box<dyn HardwareLink>,
        ui: Box<dyn UiGateway>,
        persistence: Box<dyn Persistence>,
    ) -> Self {
        let interval = Duration::from_millis(config.recording.poll_interval_ms.max(1));
        let mut controller = Self {
            config,
            document: Document::new(),
            session: RecordingSession::new(),
            hardware,
            ui,
            persistence,
            events: EventBus::new(),
            timer: PollTimer::new(interval),
            task: Task::Review,
            view: ViewKind::Averages,
            recording_view_enabled: false,
            window_title: String::new(),
            window_modified: false,
        };
        controller.update_window_title();
        controller
    }

    pub fn subscribe(&mut self) -> Receiver<Notification> {
        self.events.subscribe()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut AppConfig {
        &mut self.config
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn hardware(&self) -> &dyn HardwareLink {
        self.hardware.as_ref()
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    pub fn is_recording(&self) -> bool {
        self.session.is_active()
    }

    pub fn recording_in_progress(&self) -> Option<&crate::wave::RecInfo> {
        self.session.recording()
    }

    pub fn task(&self) -> Task {
        self.task
    }

    pub fn view(&self) -> ViewKind {
        self.view
    }

    pub fn window_title(&self) -> &str {
        &self.window_title
    }

    pub fn is_window_modified(&self) -> bool {
        self.window_modified
    }

    pub fn poll_interval(&self) -> Duration {
        self.timer.interval()
    }

    pub fn is_timer_armed(&self) -> bool {
        self.timer.is_armed()
    }

    /// Resolve a wave reference against the live recording, then the document.
    pub fn wave(&self, wave: &WaveRef) -> Option<&WaveBuffer> {
        if let Some(rec) = self.session.recording() {
            if rec.id() == wave.recording {
                return Some(rec.wave(wave.kind));
            }
        }
        self.document.wave(wave)
    }

    pub fn actions(&self) -> ActionState {
        let recording = self.is_recording();
        let have_data = self.document.recording_count() > 0;
        ActionState {
            file_new: !recording,
            file_open: !recording,
            // An empty, never-saved project may still be saved.
            file_save: self.document.is_dirty() || !have_data,
            file_save_as: true,
            file_export: have_data,
            file_load_sample_project: !recording,
            view_wave_comments: self.task == Task::Review,
            view_recording: self.recording_view_enabled,
            record_record: !recording,
            record_hardware_settings: !recording,
            record_save: recording,
            record_discard: recording,
            record_hardware_connect: !self.hardware.is_available(),
        }
    }

    /// Replace the open document.
    pub fn set_file(&mut self, document: Document) -> Guard {
        if self.is_recording() {
            log::warn!("refusing to replace the document while recording");
            return Guard::Refused;
        }
        self.document = document;
        self.events.emit(Notification::FileChanged);
        self.update_window_title();
        self.apply_task(Task::Review);
        self.apply_view(ViewKind::Averages);
        if let Some(path) = self.document.filename().map(Path::to_path_buf) {
            self.add_recent_file(path);
        }
        self.recording_view_enabled = false;
        Guard::Applied
    }

    pub fn set_task_type(&mut self, task: Task) -> Guard {
        if self.is_recording() {
            log::warn!("refusing to switch task while recording");
            return Guard::Refused;
        }
        self.apply_task(task)
    }

    pub fn set_view_type(&mut self, view: ViewKind) -> Guard {
        if self.is_recording() {
            log::warn!("refusing to switch view while recording");
            return Guard::Refused;
        }
        if view == ViewKind::Recording && !self.recording_view_enabled {
            return Guard::Refused;
        }
        self.apply_view(view)
    }

    fn apply_task(&mut self, task: Task) -> Guard {
        if task == self.task {
            return Guard::Unchanged;
        }
        self.task = task;
        self.events.emit(Notification::TaskTypeChanged(task));
        Guard::Applied
    }

    fn apply_view(&mut self, view: ViewKind) -> Guard {
        if view == self.view {
            return Guard::Unchanged;
        }
        self.view = view;
        self.events.emit(Notification::ViewTypeChanged(view));
        Guard::Applied
    }

    pub fn set_comment(&mut self, comment: &str) {
        if comment != self.document.comment() {
            self.document.set_comment(comment);
            self.events
                .emit(Notification::CommentChanged(comment.to_string()));
            self.update_window_title();
        }
    }

    pub fn edit_comment(&mut self) {
        if let Some(comment) = self.ui.edit_comment(self.document.comment()) {
            self.set_comment(&comment);
        }
    }

    pub fn new_file(&mut self) -> Guard {
        if self.is_recording() {
            return Guard::Refused;
        }
        if !self.check_save_and_continue() {
            return Guard::Unchanged;
        }
        self.set_file(Document::new())
    }

    pub fn load_sample_project(&mut self) -> Guard {
        if self.is_recording() {
            return Guard::Refused;
        }
        if !self.check_save_and_continue() {
            return Guard::Unchanged;
        }
        self.set_file(Document::sample_project())
    }

    /// Ask for a project file and open it.
    pub fn open_dialog(&mut self) -> bool {
        if self.is_recording() || !self.check_save_and_continue() {
            return false;
        }
        let Some(path) = self.ui.file_open_path(self.config.last_dir.as_deref()) else {
            return false;
        };
        self.config.last_dir = path.parent().map(Path::to_path_buf);
        self.open(&path)
    }

    pub fn open_recent(&mut self, index: usize) -> bool {
        let Some(path) = self.config.recent_files.get(index).cloned() else {
            log::warn!("no recent file at position {index}");
            return false;
        };
        if self.is_recording() || !self.check_save_and_continue() {
            return false;
        }
        self.open(&path)
    }

    /// Load `path`; on any failure the current document stays in place.
    pub fn open(&mut self, path: &Path) -> bool {
        if self.is_recording() {
            log::warn!("refusing to open {} while recording", path.display());
            return false;
        }
        if !path.exists() {
            self.ui.show_warning(&format!(
                "Project file could not be found:\n{}",
                path.display()
            ));
            self.ui.show_status_message("Project file not found");
            return false;
        }
        match self.persistence.load(path) {
            Ok(document) => {
                log::info!(
                    "opened {} with {} recordings",
                    path.display(),
                    document.recording_count()
                );
                self.set_file(document) == Guard::Applied
            }
            Err(err) => {
                log::warn!("{err}");
                self.ui.show_warning(&format!(
                    "Project file could not be properly loaded:\n{}",
                    path.display()
                ));
                self.ui.show_status_message("Error loading project");
                false
            }
        }
    }

    pub fn save(&mut self) -> bool {
        match self.document.filename().map(Path::to_path_buf) {
            Some(path) => self.save_to(&path),
            None => self.save_as(),
        }
    }

    pub fn save_as(&mut self) -> bool {
        let Some(path) = self.ui.file_save_as_path(self.config.last_dir.as_deref()) else {
            return false;
        };
        self.config.last_dir = path.parent().map(Path::to_path_buf);
        self.save_to(&with_project_extension(path))
    }

    fn save_to(&mut self, path: &Path) -> bool {
        let saved = self.persistence.save_as(&mut self.document, path);
        if saved {
            self.ui.show_status_message("Recordings saved");
            let recent = self
                .document
                .filename()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| path.to_path_buf());
            self.add_recent_file(recent);
        } else {
            log::warn!("saving {} failed", path.display());
            self.ui.show_error(
                "Error Saving File",
                "The recordings could not be saved to disk! Please try saving under a different filename or at a different location.",
            );
        }
        self.update_window_title();
        saved
    }

    /// Offer to save unsaved changes; false when the user cancels.
    pub fn check_save_and_continue(&mut self) -> bool {
        if !self.window_modified {
            return true;
        }
        match self.ui.warn_about_unsaved_changes() {
            UnsavedChoice::Save => self.save(),
            UnsavedChoice::Cancel => false,
            UnsavedChoice::Discard => true,
        }
    }

    pub fn check_hardware(&mut self) -> bool {
        self.hardware.is_available() || self.ui.wait_for_hardware(self.hardware.as_mut(), true)
    }

    /// React to the device appearing or disappearing.
    pub fn on_hardware_availability_changed(&mut self) {
        if self.hardware.is_available() {
            let name = self.hardware.hardware_name();
            let settings = self.config.channels_for(&name);
            log::info!(
                "{name} available; applying {} stored channel settings",
                settings.len()
            );
            self.hardware.load_channel_settings(&settings);
        } else {
            log::info!("hardware unavailable ({})", self.hardware.state());
        }
    }

    pub fn connect_hardware(&mut self) {
        let state = self.hardware.state();
        if !state.needs_setup() {
            log::debug!("connect ignored in state {state}");
            return;
        }
        self.hardware.setup();
        self.ui.wait_for_hardware(self.hardware.as_mut(), false);
        self.on_hardware_availability_changed();
    }

    /// Show the device options and remember the resulting channel settings.
    pub fn hardware_settings(&mut self) -> bool {
        if self.is_recording() || !self.check_hardware() {
            return false;
        }
        self.ui.show_record_options(self.hardware.as_mut());
        let name = self.hardware.hardware_name();
        let settings = self.hardware.channel_settings();
        self.config.store_channels(&name, settings);
        true
    }

    pub fn start_recording(&mut self) -> Result<RecId, SessionError> {
        if self.session.state() != SessionState::Idle {
            log::warn!("record requested while a session is {:?}", self.session.state());
            return Err(SessionError::AlreadyRecording);
        }
        if !self.check_hardware() {
            return Err(SessionError::HardwareUnavailable);
        }
        if !self.ui.show_record_preview(self.hardware.as_mut()) {
            return Err(SessionError::Cancelled);
        }
        let id = self.session.start(
            &mut self.document,
            self.hardware.as_mut(),
            &self.config.recording,
            Local::now(),
        )?;
        self.recording_view_enabled = true;
        self.apply_task(Task::Review);
        self.apply_view(ViewKind::Recording);
        self.set_is_recording(true);
        Ok(id)
    }

    /// Fire a tick if the polling timer is due.
    pub fn on_timer(&mut self, now: Instant) -> Option<TickOutcome> {
        if !self.timer.fire(now) {
            return None;
        }
        match self.tick() {
            Ok(outcome) => Some(outcome),
            Err(err) => {
                log::warn!("tick skipped: {err}");
                None
            }
        }
    }

    /// Poll the device once, append the samples and apply the duration limit.
    pub fn tick(&mut self) -> Result<TickOutcome, SessionError> {
        let tick = self
            .session
            .tick(self.hardware.as_mut(), &self.config.recording)?;
        match tick {
            SessionTick::NoData => Ok(TickOutcome::NoData),
            SessionTick::Appended { limit_reached } => {
                let outcome = if limit_reached {
                    log::info!(
                        "recording duration of {} min reached",
                        self.config.recording.duration_minutes
                    );
                    TickOutcome::Stopped(self.stop_recording(true, true)?)
                } else {
                    TickOutcome::Appended
                };
                self.events.emit(Notification::UpdateRecordings);
                Ok(outcome)
            }
        }
    }

    pub fn save_recording(&mut self) -> Result<StopOutcome, SessionError> {
        self.stop_recording(true, false)
    }

    /// Discard the live recording after confirmation; `None` if declined.
    pub fn discard_recording(&mut self) -> Result<Option<StopOutcome>, SessionError> {
        if !self.is_recording() {
            return Err(SessionError::NotRecording);
        }
        if !self.ui.confirm_discard() {
            return Ok(None);
        }
        self.stop_recording(false, false).map(Some)
    }

    pub fn stop_recording(
        &mut self,
        save: bool,
        auto_stop: bool,
    ) -> Result<StopOutcome, SessionError> {
        if !self.is_recording() {
            log::warn!("stop requested with no recording in progress");
            return Err(SessionError::NotRecording);
        }
        let end = self
            .session
            .stop(&mut self.document, self.hardware.as_mut(), save)?;
        self.set_is_recording(false);

        let outcome = match end {
            SessionEnd::Committed(id) => {
                self.apply_task(Task::Review);
                self.apply_view(ViewKind::Recording);
                self.events.emit(Notification::WaveListChanged);
                let saved = self.save();
                match completion_message(auto_stop, saved) {
                    CompletionMessage::Information(text) => {
                        self.ui.show_information("Recording Finished", text)
                    }
                    CompletionMessage::Warning(text) => self.ui.show_warning(text),
                }
                StopOutcome::Committed {
                    id,
                    saved,
                    auto_stop,
                }
            }
            SessionEnd::Discarded => {
                self.events.emit(Notification::WaveListChanged);
                self.events.emit(Notification::UpdateRecordings);
                StopOutcome::Discarded
            }
        };
        self.update_window_title();
        Ok(outcome)
    }

    fn set_is_recording(&mut self, recording: bool) {
        if recording {
            self.timer.start(Instant::now());
        } else {
            self.timer.stop();
        }
        self.events
            .emit(Notification::RecordingStateChanged(recording));
    }

    fn add_recent_file(&mut self, path: PathBuf) {
        let path = std::fs::canonicalize(&path).unwrap_or(path);
        self.config.add_recent_file(path);
        self.events.emit(Notification::RecentFilesChanged);
    }

    fn update_window_title(&mut self) {
        let project = match self.document.filename() {
            Some(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            None => "(New Project)".to_string(),
        };
        let title = format!("[*]{project} - {APP_NAME}");
        if title != self.window_title {
            self.window_title = title.clone();
            self.events.emit(Notification::WindowTitleChanged(title));
        }
        let modified = self.document.is_dirty();
        if modified != self.window_modified {
            self.window_modified = modified;
            self.events
                .emit(Notification::WindowModifiedChanged(modified));
        }
    }
}

fn with_project_extension(path: PathBuf) -> PathBuf {
    let has_extension = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case(PROJECT_EXTENSION))
        .unwrap_or(false);
    if has_extension {
        path
    } else {
        let mut name = path.into_os_string();
        name.push(".");
        name.push(PROJECT_EXTENSION);
        PathBuf::from(name)
    }
}
