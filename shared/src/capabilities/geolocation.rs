use crux_core::capability::{CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event::Event;
use crate::model::Coordinates;

/// Asks the shell for the device's current position.
#[derive(crux_core::macros::Capability)]
pub struct Geolocation<Ev> {
    context: CapabilityContext<GeolocationOperation, Ev>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum GeolocationOperation {
    GetCurrentPosition,
}

#[derive(Debug, Clone, Copy, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum GeolocationError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("location unavailable on this device")]
    Unavailable,
}

pub type GeolocationResult = Result<Coordinates, GeolocationError>;

impl Operation for GeolocationOperation {
    type Output = GeolocationResult;
}

impl<Ev> Geolocation<Ev> {
    pub fn new(context: CapabilityContext<GeolocationOperation, Ev>) -> Self {
        Self { context }
    }
}

impl<Ev> Geolocation<Ev>
where
    Ev: Send + 'static,
{
    pub fn current_position<F>(&self, make_event: F)
    where
        F: FnOnce(GeolocationResult) -> Ev + Send + 'static,
    {
        let context = self.context.clone();
        self.context.spawn(async move {
            let result = context
                .request_from_shell(GeolocationOperation::GetCurrentPosition)
                .await;
            context.update_app(make_event(result));
        });
    }
}

pub type GeolocationCapability = Geolocation<Event>;

/// Re-checks a position reported by the shell.
pub fn validate_position(result: GeolocationResult) -> GeolocationResult {
    let reported = result?;
    Coordinates::new(reported.latitude, reported.longitude).ok_or(GeolocationError::Unavailable)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_position_is_unavailable() {
        let bogus = Coordinates { latitude: 200.0, longitude: 0.0 };
        assert_eq!(validate_position(Ok(bogus)), Err(GeolocationError::Unavailable));
    }

    #[test]
    fn errors_pass_through() {
        assert_eq!(
            validate_position(Err(GeolocationError::PermissionDenied)),
            Err(GeolocationError::PermissionDenied)
        );
        let ok = Coordinates::new(16.5, 74.5).unwrap();
        assert_eq!(validate_position(Ok(ok)), Ok(ok));
    }
}
