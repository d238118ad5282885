// lib.rs - Agroplus shared core

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod app;
pub mod capabilities;
pub mod config;
pub mod directory;
pub mod event;
pub mod locale;
pub mod model;
pub mod preferences;
pub mod storage;
pub mod view;
pub mod workflow;

use thiserror::Error;

pub use app::App;
pub use capabilities::{Capabilities, Effect};
pub use crux_core::{render::Render, App as CruxApp};
pub use event::Event;
pub use model::Model;
pub use view::ViewModel;

use crate::capabilities::{GeolocationError, KvError};
use crate::config::ConfigError;
use crate::directory::DirectoryError;
use crate::locale::TranslationTable;
use crate::preferences::{PersistenceError, PreferenceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    PersistenceFailure,
    DirectoryFetchFailure,
    GeolocationDenied,
    GeolocationUnavailable,
    InvalidLanguageCode,
    Configuration,
}

impl ErrorKind {
    /// Text for a transient notification, or `None` when the failure is only
    /// logged.
    pub fn user_message(self, strings: &'static TranslationTable) -> Option<&'static str> {
        match self {
            Self::DirectoryFetchFailure => Some(strings.common.no_data),
            Self::GeolocationDenied | Self::GeolocationUnavailable => {
                Some(strings.location.location_permission)
            }
            Self::PersistenceFailure | Self::InvalidLanguageCode | Self::Configuration => None,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind:?}: {message}")]
pub struct AppError {
    pub kind: ErrorKind,
    pub message: String,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }
}

impl From<PersistenceError> for AppError {
    fn from(e: PersistenceError) -> Self {
        Self::new(ErrorKind::PersistenceFailure, e.to_string())
    }
}

impl From<KvError> for AppError {
    fn from(e: KvError) -> Self {
        Self::new(ErrorKind::PersistenceFailure, e.to_string())
    }
}

impl From<DirectoryError> for AppError {
    fn from(e: DirectoryError) -> Self {
        let kind = match e {
            DirectoryError::NotConfigured => ErrorKind::Configuration,
            _ => ErrorKind::DirectoryFetchFailure,
        };
        Self::new(kind, e.to_string())
    }
}

impl From<GeolocationError> for AppError {
    fn from(e: GeolocationError) -> Self {
        let kind = match e {
            GeolocationError::PermissionDenied => ErrorKind::GeolocationDenied,
            GeolocationError::Unavailable => ErrorKind::GeolocationUnavailable,
        };
        Self::new(kind, e.to_string())
    }
}

impl From<PreferenceError> for AppError {
    fn from(e: PreferenceError) -> Self {
        Self::new(ErrorKind::InvalidLanguageCode, e.to_string())
    }
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        Self::new(ErrorKind::Configuration, e.to_string())
    }
}
