mod geolocation;
mod http;
mod kv;

pub use self::geolocation::{
    validate_position, Geolocation, GeolocationCapability, GeolocationError, GeolocationOperation,
    GeolocationResult,
};
pub use self::http::{request_level, HttpCapability};
pub use self::kv::{load_snapshot, save_snapshot, validate_key, KvCapability, KvError};

pub use crux_core::render::Render;
pub use crux_http::Http;
pub use crux_kv::KeyValue;

use crate::app::App;
use crate::event::Event;

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub http: Http<Event>,
    pub kv: KeyValue<Event>,
    pub render: Render<Event>,
    pub geolocation: Geolocation<Event>,
}
