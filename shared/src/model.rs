use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::config::AppConfig;
use crate::preferences::PreferenceStore;
use crate::workflow::LocationWorkflow;

/// Validated lat/lon pair from the device.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return None;
        }
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return None;
        }
        Some(Self { latitude, longitude })
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// The user's chosen location. Named fields are empty or resolved display
/// names; coordinates come only from device geolocation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "LocationWire", into = "LocationWire")]
pub struct LocationRecord {
    pub state: String,
    pub district: String,
    pub taluka: String,
    pub village: String,
    pub coordinates: Option<Coordinates>,
}

// Wire shape keeps latitude/longitude as two nullable numbers.
#[derive(Serialize, Deserialize)]
struct LocationWire {
    #[serde(default)]
    state: String,
    #[serde(default)]
    district: String,
    #[serde(default)]
    taluka: String,
    #[serde(default)]
    village: String,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
}

impl From<LocationWire> for LocationRecord {
    fn from(wire: LocationWire) -> Self {
        let coordinates = match (wire.latitude, wire.longitude) {
            (Some(lat), Some(lon)) => Coordinates::new(lat, lon),
            _ => None,
        };
        Self {
            state: wire.state,
            district: wire.district,
            taluka: wire.taluka,
            village: wire.village,
            coordinates,
        }
    }
}

impl From<LocationRecord> for LocationWire {
    fn from(record: LocationRecord) -> Self {
        Self {
            state: record.state,
            district: record.district,
            taluka: record.taluka,
            village: record.village,
            latitude: record.coordinates.map(|c| c.latitude),
            longitude: record.coordinates.map(|c| c.longitude),
        }
    }
}

impl LocationRecord {
    pub fn has_named_location(&self) -> bool {
        [&self.state, &self.district, &self.taluka, &self.village]
            .iter()
            .any(|field| !field.is_empty())
    }

    /// Named fields win over coordinates when any of them is set.
    pub fn display_label(&self) -> Option<String> {
        if self.has_named_location() {
            let primary = join_non_empty(&[&self.village, &self.district]);
            if !primary.is_empty() {
                return Some(primary);
            }
            return Some(join_non_empty(&[&self.taluka, &self.state]));
        }
        self.coordinates.map(|c| c.to_string())
    }

    pub(crate) fn merge(&mut self, patch: LocationPatch) {
        let LocationPatch { state, district, taluka, village, coordinates } = patch;
        if let Some(state) = state {
            self.state = state;
        }
        if let Some(district) = district {
            self.district = district;
        }
        if let Some(taluka) = taluka {
            self.taluka = taluka;
        }
        if let Some(village) = village {
            self.village = village;
        }
        if let Some(coordinates) = coordinates {
            self.coordinates = coordinates;
        }
    }
}

fn join_non_empty(parts: &[&String]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Partial location update. Absent fields keep their current value. An empty
/// string clears a named field and `Some(None)` clears the coordinates.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taluka: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub village: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "double_option")]
    pub coordinates: Option<Option<Coordinates>>,
}

impl LocationPatch {
    pub fn named(
        state: impl Into<String>,
        district: impl Into<String>,
        taluka: impl Into<String>,
        village: impl Into<String>,
    ) -> Self {
        Self {
            state: Some(state.into()),
            district: Some(district.into()),
            taluka: Some(taluka.into()),
            village: Some(village.into()),
            coordinates: None,
        }
    }

    pub fn coordinates(coordinates: Coordinates) -> Self {
        Self { coordinates: Some(Some(coordinates)), ..Self::default() }
    }

    /// Blanks the four named fields and drops the coordinates.
    pub fn clear() -> Self {
        Self { coordinates: Some(None), ..Self::named("", "", "", "") }
    }

    pub fn state(mut self, value: impl Into<String>) -> Self {
        self.state = Some(value.into());
        self
    }

    pub fn district(mut self, value: impl Into<String>) -> Self {
        self.district = Some(value.into());
        self
    }

    pub fn taluka(mut self, value: impl Into<String>) -> Self {
        self.taluka = Some(value.into());
        self
    }

    pub fn village(mut self, value: impl Into<String>) -> Self {
        self.village = Some(value.into());
        self
    }
}

/// Minimal identity; all `None` means anonymous.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl UserRecord {
    pub fn is_anonymous(&self) -> bool {
        self.id.is_none() && self.name.is_none() && self.email.is_none()
    }

    pub(crate) fn merge(&mut self, patch: UserPatch) {
        let UserPatch { id, name, email } = patch;
        if let Some(id) = id {
            self.id = id;
        }
        if let Some(name) = name {
            self.name = name;
        }
        if let Some(email) = email {
            self.email = email;
        }
    }
}

/// Partial user update. `Some(None)` explicitly clears a field.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPatch {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "double_option")]
    pub id: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "double_option")]
    pub name: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "double_option")]
    pub email: Option<Option<String>>,
}

impl UserPatch {
    pub fn id(mut self, value: impl Into<String>) -> Self {
        self.id = Some(Some(value.into()));
        self
    }

    pub fn name(mut self, value: impl Into<String>) -> Self {
        self.name = Some(Some(value.into()));
        self
    }

    pub fn email(mut self, value: impl Into<String>) -> Self {
        self.email = Some(Some(value.into()));
        self
    }

    /// Resets every field to `None`.
    pub fn sign_out() -> Self {
        Self { id: Some(None), name: Some(None), email: Some(None) }
    }
}

// A present `null` must stay distinct from an absent field.
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Default, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Route {
    #[default]
    Home,
    LocationPicker,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ToastKind {
    Success,
    Error,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
}

impl Toast {
    pub fn new(message: impl Into<String>, kind: ToastKind) -> Self {
        Self { message: message.into(), kind }
    }
}

/// A persisted preference change that arrived before the stored snapshot was
/// read. It is replayed on top of the snapshot once that lands.
#[derive(Clone, Debug, PartialEq)]
pub enum PendingChange {
    Language(String),
    Location(LocationPatch),
    User(UserPatch),
}

#[derive(Default)]
pub struct Model {
    pub preferences: PreferenceStore,
    pub route: Route,
    pub picker: Option<LocationWorkflow>,
    /// Last directory generation handed out, across picker sessions.
    pub directory_generation: u64,
    pub config: Option<AppConfig>,
    pub toast: Option<Toast>,
    pub rehydrated: bool,
    pub pending: Vec<PendingChange>,
}

impl Model {
    pub fn show_toast(&mut self, message: impl Into<String>, kind: ToastKind) {
        self.toast = Some(Toast::new(message, kind));
    }

    pub fn clear_toast(&mut self) {
        self.toast = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_reject_out_of_range_and_non_finite() {
        assert!(Coordinates::new(16.5, 74.5).is_some());
        assert!(Coordinates::new(91.0, 0.0).is_none());
        assert!(Coordinates::new(0.0, -181.0).is_none());
        assert!(Coordinates::new(f64::NAN, 0.0).is_none());
    }

    #[test]
    fn location_wire_keeps_explicit_nulls() {
        let record = LocationRecord::default();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "state": "", "district": "", "taluka": "", "village": "",
                "latitude": null, "longitude": null
            })
        );
    }

    #[test]
    fn one_sided_coordinates_decode_as_absent() {
        let record: LocationRecord =
            serde_json::from_str(r#"{"state":"Karnataka","latitude":16.5,"longitude":null}"#)
                .unwrap();
        assert_eq!(record.state, "Karnataka");
        assert_eq!(record.coordinates, None);
    }

    #[test]
    fn display_prefers_named_fields() {
        let mut record = LocationRecord {
            coordinates: Coordinates::new(16.5, 74.5),
            ..LocationRecord::default()
        };
        assert_eq!(record.display_label().as_deref(), Some("16.5000, 74.5000"));

        record.district = "Belgaum".into();
        record.village = "Soundalga".into();
        assert_eq!(record.display_label().as_deref(), Some("Soundalga, Belgaum"));

        record.district.clear();
        record.village.clear();
        record.state = "Karnataka".into();
        assert_eq!(record.display_label().as_deref(), Some("Karnataka"));

        assert_eq!(LocationRecord::default().display_label(), None);
    }

    #[test]
    fn location_patch_can_drop_coordinates() {
        let mut record = LocationRecord::default();
        record.merge(LocationPatch::named("Karnataka", "Belgaum", "Chikodi", "Soundalga"));
        record.merge(LocationPatch::coordinates(Coordinates::new(16.5, 74.5).unwrap()));

        record.merge(LocationPatch::default().village("Nipani"));
        assert!(record.coordinates.is_some());

        let patch: LocationPatch = serde_json::from_str(r#"{"coordinates":null}"#).unwrap();
        assert_eq!(patch.coordinates, Some(None));
        record.merge(patch);
        assert_eq!(record.coordinates, None);
        assert_eq!(record.village, "Nipani");
    }

    #[test]
    fn clear_forgets_names_and_coordinates() {
        let mut record = LocationRecord::default();
        record.merge(LocationPatch::named("Karnataka", "Belgaum", "Chikodi", "Soundalga"));
        record.merge(LocationPatch::coordinates(Coordinates::new(16.5, 74.5).unwrap()));

        record.merge(LocationPatch::clear());
        assert_eq!(record, LocationRecord::default());
        assert_eq!(record.display_label(), None);
    }

    #[test]
    fn user_patch_distinguishes_null_from_absent() {
        let patch: UserPatch = serde_json::from_str(r#"{"email":null,"name":"Ravi"}"#).unwrap();
        assert_eq!(patch.id, None);
        assert_eq!(patch.name, Some(Some("Ravi".to_string())));
        assert_eq!(patch.email, Some(None));

        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json, serde_json::json!({"name": "Ravi", "email": null}));
    }

    #[test]
    fn user_merge_is_shallow() {
        let mut user = UserRecord::default();
        user.merge(UserPatch::default().id("u1").email("a@b.c"));
        user.merge(UserPatch::default().name("Ravi"));
        assert_eq!(user.id.as_deref(), Some("u1"));
        assert_eq!(user.name.as_deref(), Some("Ravi"));
        assert_eq!(user.email.as_deref(), Some("a@b.c"));

        user.merge(UserPatch::sign_out());
        assert!(user.is_anonymous());
    }
}
