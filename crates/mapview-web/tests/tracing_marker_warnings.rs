#![forbid(unsafe_code)]

//! Structured-log assertions for marker reconciliation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use mapview_core::model::MemberPosition;
use mapview_runtime::config::{MapPolicyConfig, MarkerPolicyConfig};
use mapview_web::{GoogleProvider, MapOptions, MapProvider, MarkerLifecycleManager, RecordingBridge};
use serde_json::json;
use tracing_subscriber::layer::SubscriberExt;

#[derive(Debug, Clone)]
struct CapturedEvent {
    level: tracing::Level,
    fields: HashMap<String, String>,
}

#[derive(Clone, Default)]
struct EventCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

struct FieldVisitor(Vec<(String, String)>);

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{value:?}")));
    }
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for EventCapture {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = FieldVisitor(Vec::new());
        event.record(&mut visitor);
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            fields: visitor.0.into_iter().collect(),
        });
    }
}

fn with_captured_tracing(f: impl FnOnce()) -> Vec<CapturedEvent> {
    let capture = EventCapture::default();
    let subscriber = tracing_subscriber::registry().with(capture.clone());
    tracing::subscriber::with_default(subscriber, f);
    let events = capture.events.lock().unwrap().clone();
    events
}

fn member(id: &str, lat: serde_json::Value, lng: serde_json::Value) -> MemberPosition {
    MemberPosition {
        id: id.into(),
        display_name: id.into(),
        photo_ref: None,
        raw_lat: lat,
        raw_lng: lng,
        is_selected: false,
        gender_hint: None,
        ordinal_index: 0,
    }
}

#[test]
fn invalid_coordinate_warning_names_owner() {
    let events = with_captured_tracing(|| {
        let mut provider = GoogleProvider::new(RecordingBridge::with_namespace("google.maps"));
        let options = MapOptions::from_policy(&MapPolicyConfig::default()).unwrap();
        let map = provider.create_map("map", &options).unwrap();
        let mut manager = MarkerLifecycleManager::new(MarkerPolicyConfig::default());
        let report = manager.reconcile(
            &mut provider,
            map,
            &[
                member("kim", json!(37.56), json!(127.0)),
                member("lee", json!(0), json!(0)),
                member("park", json!("n/a"), json!(127.0)),
            ],
        );
        assert_eq!(report.skipped_invalid, vec!["lee".to_string(), "park".to_string()]);
    });

    let warned: Vec<&str> = events
        .iter()
        .filter(|event| event.level == tracing::Level::WARN)
        .filter(|event| {
            event.fields.get("message").map(String::as_str) == Some("invalid coordinate, marker skipped")
        })
        .filter_map(|event| event.fields.get("owner_id").map(String::as_str))
        .collect();
    assert_eq!(warned, vec!["lee", "park"]);
}

#[test]
fn unchanged_snapshot_logs_no_summary() {
    let members = [member("kim", json!(37.56), json!(127.0))];
    let mut provider = GoogleProvider::new(RecordingBridge::with_namespace("google.maps"));
    let options = MapOptions::from_policy(&MapPolicyConfig::default()).unwrap();
    let map = provider.create_map("map", &options).unwrap();
    let mut manager = MarkerLifecycleManager::new(MarkerPolicyConfig::default());

    let first = with_captured_tracing(|| {
        manager.reconcile(&mut provider, map, &members);
    });
    let second = with_captured_tracing(|| {
        manager.reconcile(&mut provider, map, &members);
    });
    let summaries = |events: &[CapturedEvent]| {
        events
            .iter()
            .filter(|event| {
                event.fields.get("message").map(String::as_str) == Some("markers reconciled")
            })
            .count()
    };
    assert_eq!(summaries(&first), 1);
    assert_eq!(summaries(&second), 0);
}
