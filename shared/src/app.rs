use tracing::{debug, info, warn};

use crate::capabilities::{self, Capabilities};
use crate::config::AppConfig;
use crate::directory::{DirectoryError, DirectoryQuery, FetchTicket, LocationNode};
use crate::event::Event;
use crate::model::{LocationPatch, Model, PendingChange, Route, ToastKind};
use crate::preferences::PersistRequest;
use crate::view::ViewModel;
use crate::workflow::{GeolocationOutcome, LocationWorkflow, Transition};
use crate::AppError;

#[derive(Default)]
pub struct App;

impl App {
    fn persist(request: Option<PersistRequest>, caps: &Capabilities) {
        if let Some(request) = request {
            capabilities::save_snapshot(&caps.kv, request);
        }
    }

    fn report(model: &mut Model, error: AppError) {
        let strings = model.preferences.state().translations;
        match error.kind.user_message(strings) {
            Some(message) => {
                warn!(kind = ?error.kind, error = %error.message, "surfaced to user");
                model.show_toast(message, ToastKind::Error);
            }
            None => warn!(kind = ?error.kind, error = %error.message, "handled silently"),
        }
    }

    /// Applies a persisted change, or queues it until the stored snapshot has
    /// been read so the write cannot clobber it.
    fn change_preferences(model: &mut Model, change: PendingChange, caps: &Capabilities) {
        if !model.rehydrated {
            debug!(?change, "deferred until preferences are rehydrated");
            model.pending.push(change);
            return;
        }
        match change {
            PendingChange::Language(code) => match model.preferences.set_language(&code) {
                Ok(request) => Self::persist(request, caps),
                Err(e) => Self::report(model, e.into()),
            },
            PendingChange::Location(patch) => Self::persist(model.preferences.set_location(patch), caps),
            PendingChange::User(patch) => Self::persist(model.preferences.set_user(patch), caps),
        }
    }

    fn fetch_level(model: &mut Model, query: DirectoryQuery, caps: &Capabilities) {
        let ticket = query.ticket;
        model.directory_generation = model.directory_generation.max(ticket.generation);
        let sent = match &model.config {
            Some(config) => capabilities::request_level(&caps.http, config, &query),
            None => Err(DirectoryError::NotConfigured),
        };
        if let Err(e) = sent {
            Self::apply_directory(model, ticket, Err(e));
        }
    }

    fn apply_directory(
        model: &mut Model,
        ticket: FetchTicket,
        result: Result<Vec<LocationNode>, DirectoryError>,
    ) {
        let Some(picker) = model.picker.as_mut() else {
            debug!(?ticket, "directory response with no picker open");
            return;
        };
        let failure = result.as_ref().err().cloned();
        if picker.apply_directory(ticket, result) {
            if let Some(e) = failure {
                Self::report(model, e.into());
            }
        }
    }

    fn commit_location(model: &mut Model, patch: LocationPatch, message: &'static str, caps: &Capabilities) {
        Self::change_preferences(model, PendingChange::Location(patch), caps);
        model.picker = None;
        model.route = Route::Home;
        model.show_toast(message, ToastKind::Success);
    }
}

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        debug!(event = event.name(), user = event.is_user_initiated(), "update");

        match event {
            Event::Noop => {}

            Event::Configure(shell) => {
                match AppConfig::from_shell(shell) {
                    Ok(config) => {
                        info!(?config, "configured");
                        model.config = Some(config);
                    }
                    Err(e) => Self::report(model, e.into()),
                }
                caps.render.render();
            }

            Event::AppStarted => {
                if model.rehydrated {
                    debug!("already rehydrated, not reloading preferences");
                    return;
                }
                capabilities::load_snapshot(&caps.kv, model.preferences.storage_key());
                caps.render.render();
            }

            Event::SnapshotLoaded(result) => {
                if model.rehydrated {
                    debug!("ignoring repeated snapshot load");
                    return;
                }
                let bytes = match result {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        Self::report(model, e.into());
                        None
                    }
                };
                model.preferences.rehydrate(bytes.as_deref());
                model.rehydrated = true;
                for change in std::mem::take(&mut model.pending) {
                    Self::change_preferences(model, change, caps);
                }
                caps.render.render();
            }

            Event::SnapshotSaved(result) => match result {
                Ok(()) => debug!("preferences persisted"),
                Err(e) => Self::report(model, e.into()),
            },

            Event::LanguageSelected { code } => {
                Self::change_preferences(model, PendingChange::Language(code), caps);
                caps.render.render();
            }

            Event::OfflineChanged { offline } => {
                model.preferences.set_offline(offline);
                caps.render.render();
            }

            Event::UserUpdated(patch) => {
                Self::change_preferences(model, PendingChange::User(patch), caps);
                caps.render.render();
            }

            Event::LocationCleared => {
                Self::change_preferences(model, PendingChange::Location(LocationPatch::clear()), caps);
                caps.render.render();
            }

            Event::OpenLocationPicker => {
                let (picker, query) = LocationWorkflow::start(model.directory_generation);
                model.picker = Some(picker);
                model.route = Route::LocationPicker;
                Self::fetch_level(model, query, caps);
                caps.render.render();
            }

            Event::CloseLocationPicker => {
                model.picker = None;
                model.route = Route::Home;
                caps.render.render();
            }

            Event::LocationNodeChosen { id } => {
                let language = model.preferences.state().language;
                let Some(picker) = model.picker.as_mut() else {
                    debug!(%id, "node chosen with no picker open");
                    return;
                };
                match picker.choose(&id, language) {
                    Ok(Transition::Fetch(query)) => Self::fetch_level(model, query, caps),
                    Ok(Transition::Commit(patch)) => {
                        let message = model.preferences.state().translations.common.select_location;
                        Self::commit_location(model, patch, message, caps);
                    }
                    Err(e) => warn!(error = %e, "ignoring node choice"),
                }
                caps.render.render();
            }

            Event::LocationFilterChanged { text } => {
                if let Some(picker) = model.picker.as_mut() {
                    picker.set_filter(text);
                    caps.render.render();
                }
            }

            Event::RetryDirectory => {
                if let Some(query) = model.picker.as_mut().and_then(LocationWorkflow::retry) {
                    model.clear_toast();
                    Self::fetch_level(model, query, caps);
                    caps.render.render();
                }
            }

            Event::RestartLocationPicker => {
                if let Some(picker) = model.picker.as_mut() {
                    let query = picker.restart();
                    Self::fetch_level(model, query, caps);
                    caps.render.render();
                }
            }

            Event::UseCurrentLocation => {
                let Some(picker) = model.picker.as_mut() else {
                    return;
                };
                match picker.begin_geolocation() {
                    Ok(()) => caps.geolocation.current_position(Event::PositionResolved),
                    Err(e) => warn!(error = %e, "current location not requested"),
                }
                caps.render.render();
            }

            Event::DirectoryLoaded { ticket, result } => {
                Self::apply_directory(model, ticket, result);
                caps.render.render();
            }

            Event::PositionResolved(result) => {
                let Some(picker) = model.picker.as_mut() else {
                    debug!("position arrived with no picker open");
                    return;
                };
                match picker.finish_geolocation(capabilities::validate_position(result)) {
                    GeolocationOutcome::Commit(patch) => {
                        let message = model.preferences.state().translations.location.location_detected;
                        Self::commit_location(model, patch, message, caps);
                    }
                    GeolocationOutcome::Failed(e) => Self::report(model, e.into()),
                    GeolocationOutcome::Ignored => {}
                }
                caps.render.render();
            }

            Event::ToastDismissed => {
                model.clear_toast();
                caps.render.render();
            }
        }
    }

    fn view(&self, model: &Model) -> ViewModel {
        ViewModel::build(model)
    }
}
