use crate::document::{Task, ViewKind};
use crossbeam_channel::{unbounded, Receiver, Sender};

/// State changes announced to the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    RecordingStateChanged(bool),
    WaveListChanged,
    /// Per-tick refresh of the live chart.
    UpdateRecordings,
    FileChanged,
    TaskTypeChanged(Task),
    ViewTypeChanged(ViewKind),
    WindowTitleChanged(String),
    WindowModifiedChanged(bool),
    CommentChanged(String),
    RecentFilesChanged,
}

/// Fan-out of notifications to any number of subscribers.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<Sender<Notification>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Receiver<Notification> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    pub fn emit(&mut self, notification: Notification) {
        log::trace!("notify {notification:?}");
        self.subscribers
            .retain(|tx| tx.send(notification.clone()).is_ok());
    }
}
