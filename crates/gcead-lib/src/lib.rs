pub mod config;
pub mod controller;
pub mod convert;
pub mod document;
pub mod driver;
pub mod error;
pub mod events;
pub mod hardware;
pub mod io;
pub mod session;
pub mod ui;
pub mod wave;

pub use config::AppConfig;
pub use controller::{SessionController, StopOutcome, TickOutcome};
pub use document::{Document, Task, ViewKind, WaveRef};
pub use error::{Guard, LoadError, SessionError};
pub use events::Notification;
pub use wave::{ConversionRatio, RecId, RecInfo, WaveBuffer, WaveKind};
