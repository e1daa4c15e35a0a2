#![forbid(unsafe_code)]

//! Marker lifecycle: diff incoming snapshots against live markers.
//!
//! [`MarkerLifecycleManager`] owns every marker the engine has drawn, the
//! callback tokens embedded in them, and the single open info window. Each
//! [`reconcile`](MarkerLifecycleManager::reconcile) call brings one marker
//! family in line with a snapshot using the fewest SDK calls:
//!
//! 1. Items with an invalid coordinate are logged and skipped.
//! 2. Markers whose owner is gone (or now invalid) are removed.
//! 3. The previously highlighted marker is un-highlighted first.
//! 4. Each valid item is created, restyled in place, or (when its coordinate
//!    moved) removed and recreated. Unchanged markers cost nothing.
//!
//! # Invariants
//!
//! - At most one highlighted marker per [`MarkerKind`].
//! - At most one open info window engine-wide; opening a second closes the
//!   first inside the same call.
//! - A failed creation skips that marker only.
//! - Clicks are reported through [`CallbackAction`]s; selection is never
//!   changed here.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};

use mapview_core::coordinate::NormalizedCoordinate;
use mapview_core::model::{MapItem, MarkerKind, MemberPosition, SavedLocation};
use mapview_runtime::config::MarkerPolicyConfig;

use crate::callbacks::{CallbackAction, CallbackRegistry};
use crate::provider::{
    InfoWindowHandle, InfoWindowOptions, MapHandle, MapProvider, MarkerRenderSpec, MarkerVisual,
    PixelPoint, PixelSize, ProviderMarkerId,
};

/// Maximum info window width in pixels.
const INFO_WINDOW_MAX_WIDTH: u32 = 260;

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// An item that knows how it is drawn.
pub trait MarkerSource: MapItem {
    /// Whether the selected item of this family opens an info window.
    const HAS_INFO_WINDOW: bool = false;

    /// Marker description for the current highlight state.
    fn render_spec(
        &self,
        policy: &MarkerPolicyConfig,
        highlighted: bool,
        click_token: &str,
    ) -> MarkerRenderSpec;

    /// Info window markup with a close button bound to `close_token`.
    fn info_window_content(&self, _close_token: &str) -> Option<String> {
        None
    }
}

fn z_index(base: i32, highlighted: bool, policy: &MarkerPolicyConfig) -> i32 {
    if highlighted {
        base.saturating_add(policy.highlight_z_boost)
    } else {
        base
    }
}

fn bottom_center(size: PixelSize) -> PixelPoint {
    PixelPoint {
        x: size.width / 2,
        y: size.height,
    }
}

impl MarkerSource for MemberPosition {
    fn render_spec(
        &self,
        policy: &MarkerPolicyConfig,
        highlighted: bool,
        click_token: &str,
    ) -> MarkerRenderSpec {
        let size = PixelSize::square(policy.member_size_px);
        let class = if highlighted {
            "mv-member-marker is-selected"
        } else {
            "mv-member-marker"
        };
        let content = format!(
            r#"<div class="{class}" data-mv-callback="{token}"><img class="mv-member-photo" src="{photo}" alt="" width="{edge}" height="{edge}"><span class="mv-member-name">{name}</span></div>"#,
            token = escape_html(click_token),
            photo = escape_html(&self.photo_url()),
            edge = size.width,
            name = escape_html(&self.display_name),
        );
        MarkerRenderSpec {
            visual: MarkerVisual::Html { content },
            size,
            anchor: bottom_center(size),
            z_index: z_index(policy.member_z_base, highlighted, policy),
            title: self.display_name.clone(),
            click_token: Some(click_token.to_owned()),
        }
    }
}

impl MarkerSource for SavedLocation {
    const HAS_INFO_WINDOW: bool = true;

    fn render_spec(
        &self,
        policy: &MarkerPolicyConfig,
        highlighted: bool,
        click_token: &str,
    ) -> MarkerRenderSpec {
        let size = PixelSize::square(policy.location_size_px);
        MarkerRenderSpec {
            visual: MarkerVisual::Icon {
                url: place_icon_url(&self.category, highlighted),
            },
            size,
            anchor: bottom_center(size),
            z_index: z_index(policy.location_z_base, highlighted, policy),
            title: self.name.clone(),
            click_token: Some(click_token.to_owned()),
        }
    }

    fn info_window_content(&self, close_token: &str) -> Option<String> {
        let (notify_class, notify_label) = if self.notifications_enabled {
            ("on", "Notifications on")
        } else {
            ("off", "Notifications off")
        };
        Some(format!(
            r#"<div class="mv-info-window"><div class="mv-info-header"><strong class="mv-info-title">{name}</strong><button type="button" class="mv-info-close" data-mv-callback="{token}" aria-label="Close">&times;</button></div><p class="mv-info-address">{address}</p><span class="mv-info-notify {notify_class}">{notify_label}</span></div>"#,
            name = escape_html(&self.name),
            token = escape_html(close_token),
            address = escape_html(&self.address),
        ))
    }
}

/// Icon for a place category; `-active` when highlighted.
#[must_use]
pub fn place_icon_url(category: &str, highlighted: bool) -> String {
    let slug: String = category
        .trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .map(|c| c.to_ascii_lowercase())
        .collect();
    let slug = if slug.is_empty() { "etc" } else { slug.as_str() };
    let suffix = if highlighted { "-active" } else { "" };
    format!("/images/place/{slug}{suffix}.png")
}

/// Escape text for inclusion in HTML content or a quoted attribute.
#[must_use]
pub fn escape_html(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

// ---------------------------------------------------------------------------
// Handles and reports
// ---------------------------------------------------------------------------

/// Identity of a live marker.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarkerKey {
    pub kind: MarkerKind,
    pub owner_id: String,
}

impl MarkerKey {
    pub fn new(kind: MarkerKind, owner_id: impl Into<String>) -> Self {
        Self {
            kind,
            owner_id: owner_id.into(),
        }
    }
}

/// A live marker.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerHandle {
    owner_id: String,
    kind: MarkerKind,
    provider_handle: ProviderMarkerId,
    z_index: i32,
    is_highlighted: bool,
    coordinate: NormalizedCoordinate,
    click_token: String,
    spec: MarkerRenderSpec,
}

impl MarkerHandle {
    #[must_use]
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    #[must_use]
    pub const fn kind(&self) -> MarkerKind {
        self.kind
    }

    #[must_use]
    pub const fn provider_handle(&self) -> ProviderMarkerId {
        self.provider_handle
    }

    #[must_use]
    pub const fn z_index(&self) -> i32 {
        self.z_index
    }

    #[must_use]
    pub const fn is_highlighted(&self) -> bool {
        self.is_highlighted
    }

    #[must_use]
    pub const fn coordinate(&self) -> NormalizedCoordinate {
        self.coordinate
    }

    /// Token the host reports when this marker is clicked.
    #[must_use]
    pub fn click_token(&self) -> &str {
        &self.click_token
    }
}

/// What one reconciliation did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub created: usize,
    pub restyled: usize,
    /// Removed and created again because the coordinate moved.
    pub recreated: usize,
    pub removed: usize,
    /// Owners skipped for an invalid coordinate.
    pub skipped_invalid: Vec<String>,
    /// Owners whose marker could not be created.
    pub failed: Vec<String>,
}

impl ReconcileReport {
    /// True when no marker was created, changed, or removed.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.created == 0 && self.restyled == 0 && self.recreated == 0 && self.removed == 0
    }
}

/// Camera move implied by a snapshot's selection.
#[derive(Debug, Clone, PartialEq)]
pub enum CameraPlan {
    /// Pan to the selected item at focus zoom.
    Focus(NormalizedCoordinate),
    /// Fit every valid coordinate.
    Fit(Vec<NormalizedCoordinate>),
}

/// Camera move for `items`: focus the selected item, or fit all valid
/// items when nothing is selected and there are at least two.
#[must_use]
pub fn camera_plan<T: MapItem>(items: &[T]) -> Option<CameraPlan> {
    if let Some(selected) = items.iter().find(|item| item.is_selected()) {
        return selected.coordinate().map(CameraPlan::Focus);
    }
    let coords: Vec<NormalizedCoordinate> =
        items.iter().filter_map(|item| item.coordinate()).collect();
    (coords.len() >= 2).then_some(CameraPlan::Fit(coords))
}

#[derive(Debug, Clone, PartialEq)]
struct OpenInfoWindow {
    key: MarkerKey,
    window: InfoWindowHandle,
    close_token: String,
}

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

/// Owner of all live markers and the open info window.
#[derive(Debug, Default)]
pub struct MarkerLifecycleManager {
    policy: MarkerPolicyConfig,
    markers: BTreeMap<MarkerKey, MarkerHandle>,
    callbacks: CallbackRegistry,
    info_window: Option<OpenInfoWindow>,
    /// Info window the user closed; not reopened until selection moves.
    dismissed: Option<MarkerKey>,
}

impl MarkerLifecycleManager {
    #[must_use]
    pub fn new(policy: MarkerPolicyConfig) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Bring the markers of `T::KIND` in line with `items`.
    pub fn reconcile<T, P>(&mut self, provider: &mut P, map: MapHandle, items: &[T]) -> ReconcileReport
    where
        T: MarkerSource,
        P: MapProvider,
    {
        let kind = T::KIND;
        let _span = tracing::debug_span!("reconcile", kind = kind.as_str(), items = items.len())
            .entered();
        let mut report = ReconcileReport::default();

        let mut desired: Vec<(&T, NormalizedCoordinate)> = Vec::with_capacity(items.len());
        let mut seen: HashSet<&str> = HashSet::with_capacity(items.len());
        for item in items {
            let owner_id = item.owner_id();
            match item.coordinate() {
                Some(coordinate) if seen.insert(owner_id) => desired.push((item, coordinate)),
                Some(_) => {
                    tracing::warn!(owner_id, kind = kind.as_str(), "duplicate owner id, ignored");
                }
                None => {
                    tracing::warn!(
                        owner_id,
                        kind = kind.as_str(),
                        "invalid coordinate, marker skipped"
                    );
                    report.skipped_invalid.push(owner_id.to_owned());
                }
            }
        }
        let highlight = desired
            .iter()
            .find(|(item, _)| item.is_selected())
            .map(|(item, _)| item.owner_id());

        let stale: Vec<MarkerKey> = self
            .markers
            .keys()
            .filter(|key| key.kind == kind && !seen.contains(key.owner_id.as_str()))
            .cloned()
            .collect();
        for key in stale {
            self.remove(provider, &key);
            report.removed += 1;
        }

        // Clear the old highlight before setting the new one.
        let previous = self
            .highlighted(kind)
            .map(|handle| handle.owner_id.clone())
            .filter(|owner| Some(owner.as_str()) != highlight);
        if let Some(previous) = previous
            && let Some((item, coordinate)) = desired
                .iter()
                .find(|(item, _)| item.owner_id() == previous)
        {
            self.upsert(provider, map, *item, *coordinate, false, &mut report);
        }

        for (item, coordinate) in &desired {
            let highlighted = Some(item.owner_id()) == highlight;
            self.upsert(provider, map, *item, *coordinate, highlighted, &mut report);
        }

        if T::HAS_INFO_WINDOW {
            let selected = highlight.and_then(|owner| {
                desired
                    .iter()
                    .find(|(item, _)| item.owner_id() == owner)
                    .map(|(item, _)| *item)
            });
            self.sync_info_window(provider, map, selected);
        }

        if !report.is_noop() || !report.failed.is_empty() {
            tracing::debug!(
                created = report.created,
                restyled = report.restyled,
                recreated = report.recreated,
                removed = report.removed,
                failed = report.failed.len(),
                "markers reconciled"
            );
        }
        report
    }

    fn upsert<T, P>(
        &mut self,
        provider: &mut P,
        map: MapHandle,
        item: &T,
        coordinate: NormalizedCoordinate,
        highlighted: bool,
        report: &mut ReconcileReport,
    ) where
        T: MarkerSource,
        P: MapProvider,
    {
        let key = MarkerKey::new(T::KIND, item.owner_id());
        let Some(existing) = self.markers.get(&key) else {
            if self.create(provider, map, key, item, coordinate, highlighted, None, report) {
                report.created += 1;
            }
            return;
        };

        if existing.coordinate != coordinate {
            let token = existing.click_token.clone();
            self.detach(provider, &key);
            if self.create(provider, map, key, item, coordinate, highlighted, Some(token), report) {
                report.recreated += 1;
            }
            return;
        }

        let spec = item.render_spec(&self.policy, highlighted, &existing.click_token);
        if spec == existing.spec {
            return;
        }
        let marker = existing.provider_handle;
        match provider.restyle_marker(marker, &spec) {
            Ok(()) => {
                if let Some(handle) = self.markers.get_mut(&key) {
                    handle.z_index = spec.z_index;
                    handle.is_highlighted = highlighted;
                    handle.spec = spec;
                }
                report.restyled += 1;
            }
            Err(err) => {
                tracing::warn!(
                    owner_id = %key.owner_id,
                    kind = key.kind.as_str(),
                    error = %err,
                    "restyle failed, recreating marker"
                );
                let token = existing.click_token.clone();
                self.detach(provider, &key);
                if self.create(provider, map, key, item, coordinate, highlighted, Some(token), report) {
                    report.recreated += 1;
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn create<T, P>(
        &mut self,
        provider: &mut P,
        map: MapHandle,
        key: MarkerKey,
        item: &T,
        coordinate: NormalizedCoordinate,
        highlighted: bool,
        token: Option<String>,
        report: &mut ReconcileReport,
    ) -> bool
    where
        T: MarkerSource,
        P: MapProvider,
    {
        let click_token = token.unwrap_or_else(|| {
            self.callbacks.register(CallbackAction::MarkerClick {
                kind: key.kind,
                owner_id: key.owner_id.clone(),
            })
        });
        let spec = item.render_spec(&self.policy, highlighted, &click_token);
        match provider.create_marker(map, coordinate, &spec) {
            Ok(provider_handle) => {
                let handle = MarkerHandle {
                    owner_id: key.owner_id.clone(),
                    kind: key.kind,
                    provider_handle,
                    z_index: spec.z_index,
                    is_highlighted: highlighted,
                    coordinate,
                    click_token,
                    spec,
                };
                self.markers.insert(key, handle);
                true
            }
            Err(err) => {
                tracing::warn!(
                    owner_id = %key.owner_id,
                    kind = key.kind.as_str(),
                    error = %err,
                    "marker creation failed, skipped"
                );
                self.callbacks.release(&click_token);
                report.failed.push(key.owner_id);
                false
            }
        }
    }

    /// Take a marker off the map but keep its callback token.
    fn detach<P: MapProvider>(&mut self, provider: &mut P, key: &MarkerKey) -> Option<MarkerHandle> {
        if self
            .info_window
            .as_ref()
            .is_some_and(|open| open.key == *key)
        {
            self.close_info_window(provider);
        }
        let handle = self.markers.remove(key)?;
        if let Err(err) = provider.remove_marker(handle.provider_handle) {
            tracing::warn!(
                owner_id = %handle.owner_id,
                kind = handle.kind.as_str(),
                error = %err,
                "marker removal failed"
            );
        }
        Some(handle)
    }

    fn remove<P: MapProvider>(&mut self, provider: &mut P, key: &MarkerKey) {
        if let Some(handle) = self.detach(provider, key) {
            self.callbacks.release(&handle.click_token);
        }
        if self.dismissed.as_ref() == Some(key) {
            self.dismissed = None;
        }
    }

    fn sync_info_window<T, P>(&mut self, provider: &mut P, map: MapHandle, selected: Option<&T>)
    where
        T: MarkerSource,
        P: MapProvider,
    {
        let Some(item) = selected else {
            if self
                .info_window
                .as_ref()
                .is_some_and(|open| open.key.kind == T::KIND)
            {
                self.close_info_window(provider);
            }
            if self.dismissed.as_ref().is_some_and(|key| key.kind == T::KIND) {
                self.dismissed = None;
            }
            return;
        };

        let key = MarkerKey::new(T::KIND, item.owner_id());
        if self.info_window.as_ref().is_some_and(|open| open.key == key)
            || self.dismissed.as_ref() == Some(&key)
        {
            return;
        }
        self.dismissed = None;
        self.open_info_window(provider, map, key, item);
    }

    fn open_info_window<T, P>(&mut self, provider: &mut P, map: MapHandle, key: MarkerKey, item: &T)
    where
        T: MarkerSource,
        P: MapProvider,
    {
        self.close_info_window(provider);
        let Some(anchor) = self.markers.get(&key).map(|handle| handle.provider_handle) else {
            return;
        };
        let close_token = self.callbacks.register(CallbackAction::CloseInfoWindow);
        let Some(content) = item.info_window_content(&close_token) else {
            self.callbacks.release(&close_token);
            return;
        };
        let options = InfoWindowOptions {
            max_width: Some(INFO_WINDOW_MAX_WIDTH),
            offset_y: self.marker_height(key.kind),
        };
        let opened = provider
            .create_info_window(&content, &options)
            .and_then(|window| match provider.open_info_window(window, map, anchor) {
                Ok(()) => Ok(window),
                Err(err) => {
                    let _ = provider.close_info_window(window);
                    Err(err)
                }
            });
        match opened {
            Ok(window) => {
                self.info_window = Some(OpenInfoWindow {
                    key,
                    window,
                    close_token,
                });
            }
            Err(err) => {
                tracing::warn!(owner_id = %key.owner_id, error = %err, "info window failed to open");
                self.callbacks.release(&close_token);
            }
        }
    }

    fn marker_height(&self, kind: MarkerKind) -> u32 {
        match kind {
            MarkerKind::Member => self.policy.member_size_px,
            MarkerKind::Location => self.policy.location_size_px,
        }
    }

    /// Close the open info window, if any. Returns whether one was open.
    pub fn close_info_window<P: MapProvider>(&mut self, provider: &mut P) -> bool {
        let Some(open) = self.info_window.take() else {
            return false;
        };
        if let Err(err) = provider.close_info_window(open.window) {
            tracing::warn!(owner_id = %open.key.owner_id, error = %err, "info window close failed");
        }
        self.callbacks.release(&open.close_token);
        true
    }

    /// Close the info window at the user's request. It stays closed until
    /// the selection moves to another item.
    pub fn dismiss_info_window<P: MapProvider>(&mut self, provider: &mut P) -> bool {
        let key = self.info_window.as_ref().map(|open| open.key.clone());
        let closed = self.close_info_window(provider);
        if closed {
            self.dismissed = key;
        }
        closed
    }

    /// Remove every marker and close the info window.
    pub fn clear<P: MapProvider>(&mut self, provider: &mut P) {
        self.close_info_window(provider);
        let keys: Vec<MarkerKey> = self.markers.keys().cloned().collect();
        for key in keys {
            self.remove(provider, &key);
        }
        self.callbacks.clear();
        self.dismissed = None;
    }

    /// Resolve a host-reported token.
    #[must_use]
    pub fn resolve(&self, token: &str) -> Option<&CallbackAction> {
        self.callbacks.resolve(token)
    }

    #[must_use]
    pub fn handle(&self, kind: MarkerKind, owner_id: &str) -> Option<&MarkerHandle> {
        self.markers.get(&MarkerKey::new(kind, owner_id))
    }

    /// Live markers of one family, ordered by owner id.
    pub fn handles(&self, kind: MarkerKind) -> impl Iterator<Item = &MarkerHandle> + '_ {
        self.markers.values().filter(move |handle| handle.kind == kind)
    }

    #[must_use]
    pub fn highlighted(&self, kind: MarkerKind) -> Option<&MarkerHandle> {
        self.handles(kind).find(|handle| handle.is_highlighted)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Owner of the open info window.
    #[must_use]
    pub fn open_info_window_owner(&self) -> Option<&MarkerKey> {
        self.info_window.as_ref().map(|open| &open.key)
    }

    #[must_use]
    pub fn callbacks(&self) -> &CallbackRegistry {
        &self.callbacks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{RecordingBridge, SdkCall};
    use crate::google::GoogleProvider;
    use crate::provider::MapOptions;
    use mapview_runtime::config::MapPolicyConfig;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    fn member(id: &str, lat: Value, lng: Value, selected: bool) -> MemberPosition {
        MemberPosition {
            id: id.into(),
            display_name: format!("Member {id}"),
            photo_ref: None,
            raw_lat: lat,
            raw_lng: lng,
            is_selected: selected,
            gender_hint: None,
            ordinal_index: 0,
        }
    }

    fn location(id: &str, lat: f64, lng: f64, selected: bool) -> SavedLocation {
        SavedLocation {
            id: id.into(),
            name: format!("Place {id}"),
            address: "Seoul".into(),
            category: "cafe".into(),
            coordinates: vec![json!(lng), json!(lat)],
            notifications_enabled: true,
            is_selected: selected,
        }
    }

    fn setup() -> (MarkerLifecycleManager, GoogleProvider<RecordingBridge>, MapHandle) {
        let mut provider = GoogleProvider::new(RecordingBridge::with_namespace("google.maps"));
        let options = MapOptions::from_policy(&MapPolicyConfig::default()).unwrap();
        let map = provider.create_map("map", &options).unwrap();
        (
            MarkerLifecycleManager::new(MarkerPolicyConfig::default()),
            provider,
            map,
        )
    }

    fn structural_calls(bridge: &RecordingBridge) -> usize {
        bridge
            .calls()
            .iter()
            .filter(|call| matches!(call, SdkCall::Construct { .. } | SdkCall::Release { .. }))
            .count()
    }

    #[test]
    fn invalid_members_are_skipped() {
        let (mut manager, mut provider, map) = setup();
        let members = vec![
            member("a", json!(37.56), json!(127.0), false),
            member("b", json!(0), json!(0), false),
            member("c", json!("oops"), json!(127.0), false),
        ];
        let report = manager.reconcile(&mut provider, map, &members);
        assert_eq!(report.created, 1);
        assert_eq!(report.skipped_invalid, vec!["b".to_owned(), "c".to_owned()]);
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn unchanged_snapshot_issues_no_structural_calls() {
        let (mut manager, mut provider, map) = setup();
        let members = vec![
            member("a", json!(37.56), json!(127.0), true),
            member("b", json!(37.57), json!(127.01), false),
        ];
        manager.reconcile(&mut provider, map, &members);
        let before = provider.bridge().calls().len();
        let report = manager.reconcile(&mut provider, map, &members);
        assert!(report.is_noop());
        assert_eq!(provider.bridge().calls().len(), before);
    }

    #[test]
    fn selection_change_restyles_in_place() {
        let (mut manager, mut provider, map) = setup();
        let first = vec![
            member("a", json!(37.56), json!(127.0), true),
            member("b", json!(37.57), json!(127.01), false),
        ];
        manager.reconcile(&mut provider, map, &first);
        let structural = structural_calls(provider.bridge());

        let second = mapview_core::model::select_member(&first, Some("b"));
        let report = manager.reconcile(&mut provider, map, &second);
        assert_eq!(report.restyled, 2);
        assert_eq!(report.created, 0);
        assert_eq!(structural_calls(provider.bridge()), structural);

        let highlighted = manager.highlighted(MarkerKind::Member).unwrap();
        assert_eq!(highlighted.owner_id(), "b");
        assert_eq!(highlighted.z_index(), 1100);
        assert_eq!(manager.handle(MarkerKind::Member, "a").unwrap().z_index(), 100);
    }

    #[test]
    fn previous_highlight_is_cleared_first() {
        let (mut manager, mut provider, map) = setup();
        let first = vec![
            member("b", json!(37.57), json!(127.01), false),
            member("z", json!(37.56), json!(127.0), true),
        ];
        manager.reconcile(&mut provider, map, &first);
        let z = manager.handle(MarkerKind::Member, "z").unwrap().provider_handle().object();
        let b = manager.handle(MarkerKind::Member, "b").unwrap().provider_handle().object();
        provider.bridge_mut().take_calls();

        let second = mapview_core::model::select_member(&first, Some("b"));
        manager.reconcile(&mut provider, map, &second);
        let targets: Vec<_> = provider
            .bridge()
            .calls()
            .iter()
            .filter_map(SdkCall::target)
            .collect();
        let first_z = targets.iter().position(|t| *t == z).unwrap();
        let first_b = targets.iter().position(|t| *t == b).unwrap();
        assert!(first_z < first_b, "old highlight must be cleared first");
    }

    #[test]
    fn moved_marker_is_recreated_with_same_token() {
        let (mut manager, mut provider, map) = setup();
        let first = vec![member("a", json!(37.56), json!(127.0), false)];
        manager.reconcile(&mut provider, map, &first);
        let token = manager
            .handle(MarkerKind::Member, "a")
            .unwrap()
            .click_token()
            .to_owned();

        let moved = vec![member("a", json!(37.58), json!(127.0), false)];
        let report = manager.reconcile(&mut provider, map, &moved);
        assert_eq!(report.recreated, 1);
        let handle = manager.handle(MarkerKind::Member, "a").unwrap();
        assert_eq!(handle.click_token(), token);
        assert_eq!(handle.coordinate().lat(), 37.58);
        assert_eq!(provider.live_marker_count(), 1);
    }

    #[test]
    fn creation_failure_skips_only_that_marker() {
        let (mut manager, mut provider, map) = setup();
        provider.bridge_mut().fail_when(|call| {
            matches!(call, SdkCall::Construct { args, .. }
                if args.first().and_then(|a| a.get("title")) == Some(&json!("Member b")))
        });
        let members = vec![
            member("a", json!(37.56), json!(127.0), false),
            member("b", json!(37.57), json!(127.01), false),
            member("c", json!(37.58), json!(127.02), false),
        ];
        let report = manager.reconcile(&mut provider, map, &members);
        assert_eq!(report.failed, vec!["b".to_owned()]);
        assert_eq!(report.created, 2);
        assert!(manager.handle(MarkerKind::Member, "a").is_some());
        assert!(manager.handle(MarkerKind::Member, "c").is_some());
        // Only the two live markers keep tokens.
        assert_eq!(manager.callbacks().len(), 2);
    }

    #[test]
    fn absent_owner_is_removed_and_token_released() {
        let (mut manager, mut provider, map) = setup();
        let members = vec![
            member("a", json!(37.56), json!(127.0), false),
            member("b", json!(37.57), json!(127.01), false),
        ];
        manager.reconcile(&mut provider, map, &members);
        let token = manager
            .handle(MarkerKind::Member, "b")
            .unwrap()
            .click_token()
            .to_owned();
        let report = manager.reconcile(&mut provider, map, &members[..1]);
        assert_eq!(report.removed, 1);
        assert!(manager.resolve(&token).is_none());
    }

    #[test]
    fn marker_click_resolves_to_owner() {
        let (mut manager, mut provider, map) = setup();
        let members = vec![member("a", json!(37.56), json!(127.0), false)];
        manager.reconcile(&mut provider, map, &members);
        let token = manager
            .handle(MarkerKind::Member, "a")
            .unwrap()
            .click_token()
            .to_owned();
        assert_eq!(
            manager.resolve(&token),
            Some(&CallbackAction::MarkerClick {
                kind: MarkerKind::Member,
                owner_id: "a".into(),
            })
        );
    }

    #[test]
    fn selected_location_opens_single_info_window() {
        let (mut manager, mut provider, map) = setup();
        let first = vec![
            location("home", 37.5, 127.0, true),
            location("work", 37.6, 127.1, false),
        ];
        manager.reconcile(&mut provider, map, &first);
        assert_eq!(
            manager.open_info_window_owner(),
            Some(&MarkerKey::new(MarkerKind::Location, "home"))
        );

        let second = mapview_core::model::select_location(&first, Some("work"));
        manager.reconcile(&mut provider, map, &second);
        assert_eq!(
            manager.open_info_window_owner(),
            Some(&MarkerKey::new(MarkerKind::Location, "work"))
        );
        assert_eq!(provider.bridge().live_count("google.maps.InfoWindow"), 1);

        let none = mapview_core::model::select_location(&first, None);
        manager.reconcile(&mut provider, map, &none);
        assert_eq!(manager.open_info_window_owner(), None);
        assert_eq!(provider.bridge().live_count("google.maps.InfoWindow"), 0);
    }

    #[test]
    fn dismissed_info_window_stays_closed_for_same_selection() {
        let (mut manager, mut provider, map) = setup();
        let locations = vec![location("home", 37.5, 127.0, true)];
        manager.reconcile(&mut provider, map, &locations);
        assert!(manager.dismiss_info_window(&mut provider));
        manager.reconcile(&mut provider, map, &locations);
        assert_eq!(manager.open_info_window_owner(), None);
    }

    #[test]
    fn info_window_content_is_escaped() {
        let mut place = location("x", 37.5, 127.0, true);
        place.name = "<script>alert(1)</script>".into();
        let html = place.info_window_content("mv-cb-1").unwrap();
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains(r#"data-mv-callback="mv-cb-1""#));
    }

    #[test]
    fn member_markup_carries_token_and_default_photo() {
        let m = member("a", json!(37.5), json!(127.0), true);
        let spec = m.render_spec(&MarkerPolicyConfig::default(), true, "mv-cb-4");
        let MarkerVisual::Html { content } = &spec.visual else {
            panic!("member markers are HTML");
        };
        assert!(content.contains(r#"data-mv-callback="mv-cb-4""#));
        assert!(content.contains("/images/avatar/neutral-1.png"));
        assert!(content.contains("is-selected"));
        assert_eq!(spec.anchor, PixelPoint { x: 24, y: 48 });
    }

    #[test]
    fn place_icons_fall_back_to_etc() {
        assert_eq!(place_icon_url("", false), "/images/place/etc.png");
        assert_eq!(place_icon_url("Cafe", true), "/images/place/cafe-active.png");
        assert_eq!(place_icon_url("../../x", false), "/images/place/x.png");
    }

    #[test]
    fn camera_plan_rules() {
        let one_selected = vec![
            member("a", json!(37.56), json!(127.0), true),
            member("b", json!(0), json!(0), false),
        ];
        assert_eq!(
            camera_plan(&one_selected),
            Some(CameraPlan::Focus(NormalizedCoordinate::new(37.56, 127.0).unwrap()))
        );

        let single = vec![member("a", json!(37.56), json!(127.0), false)];
        assert_eq!(camera_plan(&single), None);

        let three = vec![
            member("a", json!(37.56), json!(127.0), false),
            member("b", json!(37.57), json!(127.01), false),
            member("c", json!(37.58), json!(127.02), false),
        ];
        assert!(matches!(camera_plan(&three), Some(CameraPlan::Fit(c)) if c.len() == 3));

        let selected_invalid = vec![member("a", json!(null), json!(127.0), true)];
        assert_eq!(camera_plan(&selected_invalid), None);
    }

    #[test]
    fn clear_removes_everything() {
        let (mut manager, mut provider, map) = setup();
        manager.reconcile(
            &mut provider,
            map,
            &[member("a", json!(37.56), json!(127.0), false)],
        );
        manager.reconcile(&mut provider, map, &[location("home", 37.5, 127.0, true)]);
        manager.clear(&mut provider);
        assert!(manager.is_empty());
        assert!(manager.callbacks().is_empty());
        assert_eq!(provider.live_marker_count(), 0);
        assert_eq!(provider.bridge().live_count("google.maps.InfoWindow"), 0);
    }
}
