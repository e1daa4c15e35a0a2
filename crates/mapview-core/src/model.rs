#![forbid(unsafe_code)]

//! Data contracts received from the host.
//!
//! Snapshots are replaced wholesale on every refresh. Selection changes are
//! modelled as a new snapshot too: [`select_member`] and [`select_location`]
//! return fresh vectors and never mutate the input.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::coordinate::{NormalizedCoordinate, normalize_opt};

/// Number of bundled default avatars per gender.
pub const DEFAULT_AVATAR_VARIANTS: u32 = 3;

/// Which marker family an item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerKind {
    Member,
    Location,
}

impl MarkerKind {
    /// Stable lowercase name used in logs and DOM attributes.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Location => "location",
        }
    }
}

/// Optional gender hint used only to pick a default avatar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenderHint {
    Male,
    Female,
}

/// One group member's live state as far as the map is concerned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberPosition {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub photo_ref: Option<String>,
    /// Latitude exactly as received (number, string, null, or absent).
    #[serde(default)]
    pub raw_lat: Value,
    /// Longitude exactly as received.
    #[serde(default)]
    pub raw_lng: Value,
    #[serde(default)]
    pub is_selected: bool,
    #[serde(default)]
    pub gender_hint: Option<GenderHint>,
    /// Position in the group list; only used for default avatar selection.
    #[serde(default)]
    pub ordinal_index: u32,
}

impl MemberPosition {
    /// Photo to render: the explicit reference, or a deterministic default.
    #[must_use]
    pub fn photo_url(&self) -> Cow<'_, str> {
        match self.photo_ref.as_deref() {
            Some(photo) if !photo.trim().is_empty() => Cow::Borrowed(photo),
            _ => Cow::Owned(default_photo_ref(self.gender_hint, self.ordinal_index)),
        }
    }
}

/// Default avatar path for a member without a photo.
#[must_use]
pub fn default_photo_ref(gender: Option<GenderHint>, ordinal_index: u32) -> String {
    let prefix = match gender {
        Some(GenderHint::Male) => "male",
        Some(GenderHint::Female) => "female",
        None => "neutral",
    };
    let variant = ordinal_index % DEFAULT_AVATAR_VARIANTS + 1;
    format!("/images/avatar/{prefix}-{variant}.png")
}

/// A named point of interest belonging to a member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedLocation {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub category: String,
    /// GeoJSON order: `[lng, lat]`. Elements may be numbers or strings.
    #[serde(default)]
    pub coordinates: Vec<Value>,
    #[serde(default)]
    pub notifications_enabled: bool,
    #[serde(default)]
    pub is_selected: bool,
}

impl SavedLocation {
    /// Raw longitude (`coordinates[0]`).
    #[must_use]
    pub fn raw_lng(&self) -> Option<&Value> {
        self.coordinates.first()
    }

    /// Raw latitude (`coordinates[1]`).
    #[must_use]
    pub fn raw_lat(&self) -> Option<&Value> {
        self.coordinates.get(1)
    }
}

/// Anything that can be drawn as a marker.
pub trait MapItem {
    /// Marker family for this item type.
    const KIND: MarkerKind;

    /// Stable owner identity.
    fn owner_id(&self) -> &str;

    /// Whether the item is the current selection.
    fn is_selected(&self) -> bool;

    /// Validated position, or `None` when the item must not be drawn.
    fn coordinate(&self) -> Option<NormalizedCoordinate>;
}

impl MapItem for MemberPosition {
    const KIND: MarkerKind = MarkerKind::Member;

    fn owner_id(&self) -> &str {
        &self.id
    }

    fn is_selected(&self) -> bool {
        self.is_selected
    }

    fn coordinate(&self) -> Option<NormalizedCoordinate> {
        NormalizedCoordinate::from_raw(&self.raw_lat, &self.raw_lng)
    }
}

impl MapItem for SavedLocation {
    const KIND: MarkerKind = MarkerKind::Location;

    fn owner_id(&self) -> &str {
        &self.id
    }

    fn is_selected(&self) -> bool {
        self.is_selected
    }

    fn coordinate(&self) -> Option<NormalizedCoordinate> {
        NormalizedCoordinate::new(normalize_opt(self.raw_lat())?, normalize_opt(self.raw_lng())?)
    }
}

/// Identity of the first selected item, if any.
///
/// Snapshots should carry at most one selected item; if a host sends more,
/// the first one wins everywhere in the engine.
#[must_use]
pub fn selected_id<T: MapItem>(items: &[T]) -> Option<&str> {
    items
        .iter()
        .find(|item| item.is_selected())
        .map(|item| item.owner_id())
}

/// New member snapshot with exactly `id` selected (or nothing, for `None`).
#[must_use]
pub fn select_member(members: &[MemberPosition], id: Option<&str>) -> Vec<MemberPosition> {
    members
        .iter()
        .map(|m| MemberPosition {
            is_selected: id == Some(m.id.as_str()),
            ..m.clone()
        })
        .collect()
}

/// New location snapshot with exactly `id` selected (or nothing, for `None`).
#[must_use]
pub fn select_location(locations: &[SavedLocation], id: Option<&str>) -> Vec<SavedLocation> {
    locations
        .iter()
        .map(|l| SavedLocation {
            is_selected: id == Some(l.id.as_str()),
            ..l.clone()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn member(id: &str, lat: Value, lng: Value) -> MemberPosition {
        MemberPosition {
            id: id.into(),
            display_name: id.to_uppercase(),
            photo_ref: None,
            raw_lat: lat,
            raw_lng: lng,
            is_selected: false,
            gender_hint: None,
            ordinal_index: 0,
        }
    }

    #[test]
    fn member_parses_from_host_json() {
        let parsed: MemberPosition = serde_json::from_value(json!({
            "id": "u1",
            "displayName": "Minji",
            "rawLat": "37.56",
            "rawLng": 127.0,
            "isSelected": true,
            "genderHint": "female",
            "ordinalIndex": 4
        }))
        .unwrap();
        assert_eq!(parsed.display_name, "Minji");
        assert_eq!(parsed.gender_hint, Some(GenderHint::Female));
        let c = parsed.coordinate().unwrap();
        assert_eq!((c.lat(), c.lng()), (37.56, 127.0));
    }

    #[test]
    fn member_with_missing_fields_has_no_coordinate() {
        let parsed: MemberPosition = serde_json::from_value(json!({"id": "u2"})).unwrap();
        assert_eq!(parsed.raw_lat, Value::Null);
        assert!(parsed.coordinate().is_none());
    }

    #[test]
    fn default_photo_is_deterministic() {
        assert_eq!(
            default_photo_ref(Some(GenderHint::Male), 0),
            "/images/avatar/male-1.png"
        );
        assert_eq!(
            default_photo_ref(Some(GenderHint::Female), 4),
            "/images/avatar/female-2.png"
        );
        assert_eq!(default_photo_ref(None, 2), "/images/avatar/neutral-3.png");
    }

    #[test]
    fn explicit_photo_wins_unless_blank() {
        let mut m = member("a", json!(1.0), json!(2.0));
        m.photo_ref = Some("https://cdn/a.png".into());
        assert_eq!(m.photo_url(), "https://cdn/a.png");
        m.photo_ref = Some("  ".into());
        assert_eq!(m.photo_url(), "/images/avatar/neutral-1.png");
    }

    #[test]
    fn location_coordinates_are_lng_lat() {
        let loc: SavedLocation = serde_json::from_value(json!({
            "id": "p1",
            "name": "Office",
            "coordinates": [127.03, 37.49]
        }))
        .unwrap();
        let c = loc.coordinate().unwrap();
        assert_eq!(c.lat(), 37.49);
        assert_eq!(c.lng(), 127.03);
    }

    #[test]
    fn short_location_coordinates_are_invalid() {
        let loc: SavedLocation =
            serde_json::from_value(json!({"id": "p2", "coordinates": [127.0]})).unwrap();
        assert!(loc.coordinate().is_none());
    }

    #[test]
    fn select_member_replaces_whole_set() {
        let mut members = vec![
            member("a", json!(1.0), json!(1.0)),
            member("b", json!(2.0), json!(2.0)),
        ];
        members[0].is_selected = true;
        let next = select_member(&members, Some("b"));
        assert!(members[0].is_selected, "input must not be mutated");
        assert_eq!(selected_id(&next), Some("b"));
        assert_eq!(next.iter().filter(|m| m.is_selected).count(), 1);

        let cleared = select_member(&next, None);
        assert_eq!(selected_id(&cleared), None);
    }

    #[test]
    fn first_selected_wins() {
        let mut members = vec![
            member("a", json!(1.0), json!(1.0)),
            member("b", json!(2.0), json!(2.0)),
        ];
        members[0].is_selected = true;
        members[1].is_selected = true;
        assert_eq!(selected_id(&members), Some("a"));
    }
}
