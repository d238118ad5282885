use crux_http::Http;
use secrecy::ExposeSecret;
use tracing::debug;

use crate::config::AppConfig;
use crate::directory::{parse_nodes, DirectoryError, DirectoryQuery, LocationNode};
use crate::event::Event;

pub type HttpCapability = Http<Event>;

pub const MAX_RESPONSE_BODY_SIZE: usize = 8 * 1024 * 1024;

/// Sends the directory request for one level. The response comes back as
/// [`Event::DirectoryLoaded`] carrying the query's ticket.
pub fn request_level(
    http: &HttpCapability,
    config: &AppConfig,
    query: &DirectoryQuery,
) -> Result<(), DirectoryError> {
    let url = query.url(config.directory_url())?;
    let ticket = query.ticket;
    let key = config.anon_key().expose_secret();

    debug!(level = ?query.level, generation = ticket.generation, %url, "requesting directory level");
    http.get(url.as_str())
        .header("apikey", key.as_str())
        .header("Authorization", format!("Bearer {key}").as_str())
        .header("Accept", "application/json")
        .send(move |result| Event::DirectoryLoaded {
            ticket,
            result: decode_response(result),
        });
    Ok(())
}

fn decode_response(
    result: crux_http::Result<crux_http::Response<Vec<u8>>>,
) -> Result<Vec<LocationNode>, DirectoryError> {
    let mut response = result.map_err(|e| DirectoryError::Transport(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(DirectoryError::Status { status: status.into() });
    }
    let body = response.take_body().ok_or(DirectoryError::EmptyBody)?;
    if body.len() > MAX_RESPONSE_BODY_SIZE {
        return Err(DirectoryError::Decode(format!(
            "body of {} bytes exceeds {MAX_RESPONSE_BODY_SIZE}",
            body.len()
        )));
    }
    parse_nodes(&body)
}
