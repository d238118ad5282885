use serde::{Deserialize, Serialize};

use crate::capabilities::{GeolocationResult, KvError};
use crate::config::ShellConfig;
use crate::directory::{DirectoryError, FetchTicket, LocationNode, NodeId};
use crate::model::UserPatch;

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub enum Event {
    #[default]
    Noop,

    // --- lifecycle ---
    Configure(ShellConfig),
    AppStarted,

    // --- preferences ---
    LanguageSelected { code: String },
    OfflineChanged { offline: bool },
    UserUpdated(UserPatch),
    LocationCleared,

    // --- location picker ---
    OpenLocationPicker,
    CloseLocationPicker,
    LocationNodeChosen { id: NodeId },
    LocationFilterChanged { text: String },
    RetryDirectory,
    RestartLocationPicker,
    UseCurrentLocation,

    ToastDismissed,

    // --- shell responses ---
    SnapshotLoaded(Result<Option<Vec<u8>>, KvError>),
    SnapshotSaved(Result<(), KvError>),
    DirectoryLoaded {
        ticket: FetchTicket,
        result: Result<Vec<LocationNode>, DirectoryError>,
    },
    PositionResolved(GeolocationResult),
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Noop => "noop",
            Self::Configure(_) => "configure",
            Self::AppStarted => "app_started",
            Self::LanguageSelected { .. } => "language_selected",
            Self::OfflineChanged { .. } => "offline_changed",
            Self::UserUpdated(_) => "user_updated",
            Self::LocationCleared => "location_cleared",
            Self::OpenLocationPicker => "open_location_picker",
            Self::CloseLocationPicker => "close_location_picker",
            Self::LocationNodeChosen { .. } => "location_node_chosen",
            Self::LocationFilterChanged { .. } => "location_filter_changed",
            Self::RetryDirectory => "retry_directory",
            Self::RestartLocationPicker => "restart_location_picker",
            Self::UseCurrentLocation => "use_current_location",
            Self::ToastDismissed => "toast_dismissed",
            Self::SnapshotLoaded(_) => "snapshot_loaded",
            Self::SnapshotSaved(_) => "snapshot_saved",
            Self::DirectoryLoaded { .. } => "directory_loaded",
            Self::PositionResolved(_) => "position_resolved",
        }
    }

    /// Events that originate from a user gesture rather than a shell reply.
    pub fn is_user_initiated(&self) -> bool {
        matches!(
            self,
            Self::LanguageSelected { .. }
                | Self::OfflineChanged { .. }
                | Self::UserUpdated(_)
                | Self::LocationCleared
                | Self::OpenLocationPicker
                | Self::CloseLocationPicker
                | Self::LocationNodeChosen { .. }
                | Self::LocationFilterChanged { .. }
                | Self::RetryDirectory
                | Self::RestartLocationPicker
                | Self::UseCurrentLocation
                | Self::ToastDismissed
        )
    }
}
