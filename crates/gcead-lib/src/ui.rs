//! Presentation capabilities the controller relies on.

use crate::hardware::HardwareLink;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Answer to the "unsaved changes" prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsavedChoice {
    Save,
    Discard,
    Cancel,
}

pub trait UiGateway: Send {
    /// Show the live preview before recording; `true` to start recording.
    fn show_record_preview(&mut self, hardware: &mut dyn HardwareLink) -> bool;
    /// Block until the device is available or the user gives up.
    fn wait_for_hardware(&mut self, hardware: &mut dyn HardwareLink, for_recording: bool) -> bool;
    fn show_record_options(&mut self, hardware: &mut dyn HardwareLink);
    fn confirm_discard(&mut self) -> bool;
    fn warn_about_unsaved_changes(&mut self) -> UnsavedChoice;
    fn file_open_path(&mut self, last_dir: Option<&Path>) -> Option<PathBuf>;
    fn file_save_as_path(&mut self, last_dir: Option<&Path>) -> Option<PathBuf>;
    fn edit_comment(&mut self, current: &str) -> Option<String>;
    fn show_information(&mut self, title: &str, message: &str);
    fn show_warning(&mut self, message: &str);
    fn show_error(&mut self, title: &str, message: &str);
    fn show_status_message(&mut self, message: &str);
}

/// Non-interactive front end: accepts every prompt and logs messages.
#[derive(Debug, Default)]
pub struct HeadlessUi {
    save_path: Option<PathBuf>,
}

impl HeadlessUi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Path answered to "save as" prompts.
    pub fn with_save_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.save_path = Some(path.into());
        self
    }
}

impl UiGateway for HeadlessUi {
    fn show_record_preview(&mut self, _hardware: &mut dyn HardwareLink) -> bool {
        true
    }

    fn wait_for_hardware(&mut self, hardware: &mut dyn HardwareLink, _for_recording: bool) -> bool {
        if !hardware.is_available() {
            hardware.setup();
        }
        hardware.is_available()
    }

    fn show_record_options(&mut self, _hardware: &mut dyn HardwareLink) {}

    fn confirm_discard(&mut self) -> bool {
        true
    }

    fn warn_about_unsaved_changes(&mut self) -> UnsavedChoice {
        UnsavedChoice::Save
    }

    fn file_open_path(&mut self, _last_dir: Option<&Path>) -> Option<PathBuf> {
        None
    }

    fn file_save_as_path(&mut self, _last_dir: Option<&Path>) -> Option<PathBuf> {
        self.save_path.clone()
    }

    fn edit_comment(&mut self, _current: &str) -> Option<String> {
        None
    }

    fn show_information(&mut self, title: &str, message: &str) {
        log::info!("{title}: {message}");
    }

    fn show_warning(&mut self, message: &str) {
        log::warn!("{message}");
    }

    fn show_error(&mut self, title: &str, message: &str) {
        log::error!("{title}: {message}");
    }

    fn show_status_message(&mut self, message: &str) {
        log::info!("{message}");
    }
}

/// A message the controller displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiMessage {
    Information { title: String, message: String },
    Warning(String),
    Error { title: String, message: String },
    Status(String),
}

/// Test double with scripted answers and a shared transcript.
#[derive(Debug, Clone)]
pub struct ScriptedUi {
    pub accept_preview: bool,
    pub hardware_arrives: bool,
    pub confirm_discard: bool,
    pub unsaved_choice: UnsavedChoice,
    pub open_path: Option<PathBuf>,
    pub save_path: Option<PathBuf>,
    pub comment: Option<String>,
    pub(crate) transcript: Arc<Mutex<Vec<UiMessage>>>,
}

impl Default for ScriptedUi {
    fn default() -> Self {
        Self {
            accept_preview: true,
            hardware_arrives: true,
            confirm_discard: true,
            unsaved_choice: UnsavedChoice::Discard,
            open_path: None,
            save_path: None,
            comment: None,
            transcript: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl ScriptedUi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the messages shown so far; stays valid after the UI is moved.
    pub fn transcript(&self) -> Arc<Mutex<Vec<UiMessage>>> {
        Arc::clone(&self.transcript)
    }

    fn record(&self, message: UiMessage) {
        if let Ok(mut transcript) = self.transcript.lock() {
            transcript.push(message);
        }
    }
}

impl UiGateway for ScriptedUi {
    fn show_record_preview(&mut self, _hardware: &mut dyn HardwareLink) -> bool {
        self.accept_preview
    }

    fn wait_for_hardware(&mut self, hardware: &mut dyn HardwareLink, _for_recording: bool) -> bool {
        if self.hardware_arrives && !hardware.is_available() {
            hardware.setup();
        }
        hardware.is_available()
    }

    fn show_record_options(&mut self, _hardware: &mut dyn HardwareLink) {}

    fn confirm_discard(&mut self) -> bool {
        self.confirm_discard
    }

    fn warn_about_unsaved_changes(&mut self) -> UnsavedChoice {
        self.unsaved_choice
    }

    fn file_open_path(&mut self, _last_dir: Option<&Path>) -> Option<PathBuf> {
        self.open_path.clone()
    }

    fn file_save_as_path(&mut self, _last_dir: Option<&Path>) -> Option<PathBuf> {
        self.save_path.clone()
    }

    fn edit_comment(&mut self, _current: &str) -> Option<String> {
        self.comment.clone()
    }

    fn show_information(&mut self, title: &str, message: &str) {
        self.record(UiMessage::Information {
            title: title.into(),
            message: message.into(),
        });
    }

    fn show_warning(&mut self, message: &str) {
        self.record(UiMessage::Warning(message.into()));
    }

    fn show_error(&mut self, title: &str, message: &str) {
        self.record(UiMessage::Error {
            title: title.into(),
            message: message.into(),
        });
    }

    fn show_status_message(&mut self, message: &str) {
        self.record(UiMessage::Status(message.into()));
    }
}
