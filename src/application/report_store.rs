// Report store - CRUD over the persisted report collection
use crate::application::clock::Clock;
use crate::domain::report::{duplicate_widget_id, Report, ReportPatch, TimeRange};
use crate::domain::widget::WidgetInstance;
use crate::infrastructure::storage::{load_namespace, save_namespace, KeyValueStorage, StorageError};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;

pub const REPORT_STORAGE_KEY: &str = "report-storage";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("widget id {0} is used more than once in the report")]
    DuplicateWidget(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Default, Deserialize)]
struct ReportState {
    #[serde(default)]
    reports: Vec<Report>,
}

/// Change notification sent to subscribers after a mutation is durable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEvent {
    Created(String),
    Updated(String),
    Deleted(String),
}

/// Owns every persisted report. Each mutation rewrites the whole
/// `report-storage` document before returning.
pub struct ReportStore {
    storage: Arc<dyn KeyValueStorage>,
    clock: Arc<dyn Clock>,
    reports: Vec<Report>,
    subscribers: Vec<mpsc::UnboundedSender<ReportEvent>>,
}

impl ReportStore {
    pub fn open(storage: Arc<dyn KeyValueStorage>, clock: Arc<dyn Clock>) -> Result<Self, StorageError> {
        let state: ReportState = load_namespace(storage.as_ref(), REPORT_STORAGE_KEY)?.unwrap_or_default();
        tracing::info!("Loaded {} reports from {}", state.reports.len(), REPORT_STORAGE_KEY);

        Ok(Self {
            storage,
            clock,
            reports: state.reports,
            subscribers: Vec::new(),
        })
    }

    pub fn create(
        &mut self,
        name: String,
        description: String,
        time_range: TimeRange,
        components: Vec<WidgetInstance>,
    ) -> Result<Report, StoreError> {
        check_widget_ids(&components)?;
        let now = self.clock.now();
        let report = Report {
            id: self.unique_id(now),
            name,
            description,
            time_range,
            components,
            created_at: now,
            updated_at: now,
        };

        self.reports.push(report.clone());
        if let Err(e) = self.persist() {
            self.reports.pop();
            return Err(e.into());
        }

        tracing::info!("Created report {} ({})", report.id, report.name);
        self.notify(ReportEvent::Created(report.id.clone()));
        Ok(report)
    }

    /// Merge `patch` into the report with `id`. Returns `false` when no report matched.
    pub fn update(&mut self, id: &str, patch: ReportPatch) -> Result<bool, StoreError> {
        let Some(idx) = self.reports.iter().position(|r| r.id == id) else {
            tracing::debug!("Ignoring update for unknown report {}", id);
            return Ok(false);
        };
        if let Some(components) = &patch.components {
            check_widget_ids(components)?;
        }

        let previous = self.reports[idx].clone();
        let updated_at = self.next_timestamp(previous.updated_at);
        let report = &mut self.reports[idx];
        patch.apply_to(report);
        report.updated_at = updated_at;

        if let Err(e) = self.persist() {
            self.reports[idx] = previous;
            return Err(e.into());
        }

        self.notify(ReportEvent::Updated(id.to_string()));
        Ok(true)
    }

    /// Remove the report with `id`. Returns `false` when no report matched.
    pub fn delete(&mut self, id: &str) -> Result<bool, StorageError> {
        let Some(idx) = self.reports.iter().position(|r| r.id == id) else {
            return Ok(false);
        };

        let removed = self.reports.remove(idx);
        if let Err(e) = self.persist() {
            self.reports.insert(idx, removed);
            return Err(e);
        }

        tracing::info!("Deleted report {}", id);
        self.notify(ReportEvent::Deleted(id.to_string()));
        Ok(true)
    }

    pub fn get(&self, id: &str) -> Option<&Report> {
        self.reports.iter().find(|r| r.id == id)
    }

    /// All reports in insertion order.
    pub fn list(&self) -> &[Report] {
        &self.reports
    }

    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<ReportEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    fn notify(&mut self, event: ReportEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn persist(&self) -> Result<(), StorageError> {
        let state = ReportStateRef { reports: &self.reports };
        save_namespace(self.storage.as_ref(), REPORT_STORAGE_KEY, &state)
    }

    fn unique_id(&self, now: DateTime<Utc>) -> String {
        let mut millis = now.timestamp_millis();
        loop {
            let id = format!("report-{}", millis);
            if self.get(&id).is_none() {
                return id;
            }
            millis += 1;
        }
    }

    /// Current time, but always strictly after `previous`.
    fn next_timestamp(&self, previous: DateTime<Utc>) -> DateTime<Utc> {
        let now = self.clock.now();
        if now > previous {
            now
        } else {
            previous + Duration::milliseconds(1)
        }
    }
}

#[derive(Serialize)]
struct ReportStateRef<'a> {
    reports: &'a [Report],
}

fn check_widget_ids(components: &[WidgetInstance]) -> Result<(), StoreError> {
    match duplicate_widget_id(components) {
        Some(i) => Err(StoreError::DuplicateWidget(i.to_string())),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::clock::ManualClock;
    use crate::domain::widget::{TextConfig, WidgetConfig};
    use crate::infrastructure::storage::{FileStorage, MemoryStorage};

    const T0: i64 = 1_710_072_000_000;

    fn store_with(storage: Arc<dyn KeyValueStorage>) -> (ReportStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::at_millis(T0));
        let store = ReportStore::open(storage, clock.clone()).unwrap();
        (store, clock)
    }

    fn weekly(store: &mut ReportStore) -> Report {
        store
            .create("Weekly".to_string(), String::new(), TimeRange::LastWeek, Vec::new())
            .unwrap()
    }

    fn text_widget(i: &str) -> WidgetInstance {
        WidgetInstance {
            i: i.to_string(),
            config: WidgetConfig::Text(TextConfig {
                title: "Notes".to_string(),
                content: "hello".to_string(),
                width: 4,
                height: 4,
            }),
            x: 0,
            y: 0,
            w: 4,
            h: 4,
        }
    }

    #[test]
    fn test_create_then_get() {
        let (mut store, _) = store_with(Arc::new(MemoryStorage::new()));

        let created = weekly(&mut store);

        assert_eq!(created.id, format!("report-{}", T0));
        let fetched = store.get(&created.id).unwrap();
        assert_eq!(fetched, &created);
        assert_eq!(fetched.name, "Weekly");
        assert_eq!(fetched.time_range, TimeRange::LastWeek);
        assert_eq!(fetched.created_at, fetched.updated_at);
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn test_ids_unique_within_same_millisecond() {
        let (mut store, _) = store_with(Arc::new(MemoryStorage::new()));

        let first = weekly(&mut store);
        let second = weekly(&mut store);

        assert_ne!(first.id, second.id);
        assert_eq!(second.id, format!("report-{}", T0 + 1));
    }

    #[test]
    fn test_update_refreshes_updated_at() {
        let (mut store, clock) = store_with(Arc::new(MemoryStorage::new()));
        let created = weekly(&mut store);

        // Same instant: the stamp still moves forward
        assert!(store.update(&created.id, ReportPatch::name("X")).unwrap());
        let updated = store.get(&created.id).unwrap().clone();
        assert_eq!(updated.name, "X");
        assert!(updated.updated_at > updated.created_at);

        clock.advance_millis(5_000);
        store
            .update(
                &created.id,
                ReportPatch {
                    components: Some(vec![text_widget("text-1")]),
                    ..ReportPatch::default()
                },
            )
            .unwrap();
        let later = store.get(&created.id).unwrap();
        assert_eq!(later.components.len(), 1);
        assert_eq!(later.name, "X");
        assert_eq!(later.updated_at, clock.now());
    }

    #[test]
    fn test_update_unknown_id_is_noop() {
        let (mut store, _) = store_with(Arc::new(MemoryStorage::new()));
        weekly(&mut store);

        assert!(!store.update("report-0", ReportPatch::name("X")).unwrap());
        assert_eq!(store.list()[0].name, "Weekly");
    }

    #[test]
    fn test_delete() {
        let (mut store, _) = store_with(Arc::new(MemoryStorage::new()));
        let created = weekly(&mut store);

        assert!(store.delete(&created.id).unwrap());
        assert!(store.get(&created.id).is_none());
        assert!(store.list().iter().all(|r| r.id != created.id));
        assert!(!store.delete(&created.id).unwrap());
    }

    #[test]
    fn test_reports_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let created = {
            let storage = Arc::new(FileStorage::open(dir.path()).unwrap());
            let (mut store, _) = store_with(storage);
            let report = weekly(&mut store);
            store
                .update(
                    &report.id,
                    ReportPatch {
                        components: Some(vec![text_widget("text-1")]),
                        ..ReportPatch::default()
                    },
                )
                .unwrap();
            store.get(&report.id).unwrap().clone()
        };

        let storage = Arc::new(FileStorage::open(dir.path()).unwrap());
        let (store, _) = store_with(storage);
        assert_eq!(store.list(), &[created]);
    }

    #[test]
    fn test_duplicate_widget_ids_rejected() {
        let storage = Arc::new(MemoryStorage::new());
        let (mut store, _) = store_with(storage.clone());

        let err = store
            .create(
                "Weekly".to_string(),
                String::new(),
                TimeRange::LastWeek,
                vec![text_widget("a"), text_widget("a")],
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateWidget(ref i) if i == "a"));
        assert!(store.list().is_empty());
        assert!(storage.get(REPORT_STORAGE_KEY).unwrap().is_none());

        let created = weekly(&mut store);
        let patch = ReportPatch {
            name: Some("X".to_string()),
            components: Some(vec![text_widget("b"), text_widget("c"), text_widget("b")]),
            ..ReportPatch::default()
        };
        let err = store.update(&created.id, patch).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateWidget(ref i) if i == "b"));
        assert_eq!(store.get(&created.id), Some(&created));
    }

    #[test]
    fn test_unknown_widget_type_survives_reload_and_save() {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .set(
                REPORT_STORAGE_KEY,
                r#"{"state":{"reports":[{
                    "id":"report-1","name":"Stations","timeRange":"7",
                    "components":[{"i":"map-1","type":"map","config":{"title":"Sites"},"x":0,"y":0,"w":6,"h":4}],
                    "createdAt":"2024-03-10T12:00:00Z","updatedAt":"2024-03-10T12:00:00Z"
                }]},"version":0}"#,
            )
            .unwrap();

        let (mut store, _) = store_with(storage.clone());
        assert_eq!(store.list().len(), 1);
        assert_eq!(store.list()[0].components[0].config.tag(), "map");

        weekly(&mut store);
        let raw = storage.get(REPORT_STORAGE_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["state"]["reports"][0]["id"], "report-1");
        assert_eq!(value["state"]["reports"][0]["components"][0]["type"], "map");
        assert_eq!(value["state"]["reports"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_undecodable_report_fails_open_and_keeps_document() {
        let storage = Arc::new(MemoryStorage::new());
        let stored = r#"{"state":{"reports":[{
            "id":"report-1","name":"Odd","timeRange":"2",
            "createdAt":"2024-03-10T12:00:00Z","updatedAt":"2024-03-10T12:00:00Z"
        }]},"version":0}"#;
        storage.set(REPORT_STORAGE_KEY, stored).unwrap();

        let clock = Arc::new(ManualClock::at_millis(T0));
        let result = ReportStore::open(storage.clone(), clock);

        assert!(matches!(result, Err(StorageError::Decode { .. })));
        assert_eq!(storage.get(REPORT_STORAGE_KEY).unwrap().as_deref(), Some(stored));
    }

    #[test]
    fn test_failed_write_leaves_store_unchanged() {
        let storage = Arc::new(MemoryStorage::new());
        let (mut store, _) = store_with(storage.clone());
        let created = weekly(&mut store);

        storage.set_fail_writes(true);

        assert!(store
            .create("Other".to_string(), String::new(), TimeRange::LastDay, Vec::new())
            .is_err());
        assert!(store.update(&created.id, ReportPatch::name("X")).is_err());
        assert!(store.delete(&created.id).is_err());

        assert_eq!(store.list(), &[created]);
    }

    #[test]
    fn test_persisted_layout() {
        let storage = Arc::new(MemoryStorage::new());
        let (mut store, _) = store_with(storage.clone());
        weekly(&mut store);

        let raw = storage.get(REPORT_STORAGE_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let report = &value["state"]["reports"][0];
        assert_eq!(report["name"], "Weekly");
        assert_eq!(report["timeRange"], "7");
        assert!(report["createdAt"].is_string());
    }

    #[test]
    fn test_subscribers_notified() {
        let (mut store, _) = store_with(Arc::new(MemoryStorage::new()));
        let mut rx = store.subscribe();
        let dropped = store.subscribe();
        drop(dropped);

        let created = weekly(&mut store);
        store.update(&created.id, ReportPatch::name("X")).unwrap();
        store.delete(&created.id).unwrap();

        assert_eq!(rx.try_recv().unwrap(), ReportEvent::Created(created.id.clone()));
        assert_eq!(rx.try_recv().unwrap(), ReportEvent::Updated(created.id.clone()));
        assert_eq!(rx.try_recv().unwrap(), ReportEvent::Deleted(created.id));
        assert_eq!(store.subscribers.len(), 1);
    }
}
