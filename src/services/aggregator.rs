//! Dashboard aggregator: three live subscriptions merged into one read model.
//!
//! One aggregator is attached per dashboard consumer. It owns a journeys, a
//! places, and a memories subscription for that user and folds their snapshot
//! events into a [`DashboardModel`], published through a `watch` channel on
//! every recompute. Events are handled by a single task, one at a time, so
//! recomputes never interleave. Detaching (or dropping) the aggregator stops
//! all three subscriptions; nothing delivered afterwards can reach the model.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::live::{self, ChangeHub, ListenError, SnapshotEvent};
use crate::models::journey::Journey;
use crate::models::memory::Memory;
use crate::models::place::Place;
use crate::models::user::{greeting_name, User};
use crate::services::stats::{self, DashboardStats, JourneyProgress};

/// Identity the aggregator is scoped to. Passed in explicitly — the
/// aggregator never reads ambient request state.
#[derive(Debug, Clone)]
pub struct DashboardUser {
    pub id: Uuid,
    pub display_name: Option<String>,
    pub email: Option<String>,
}

impl From<&User> for DashboardUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            display_name: user.display_name.clone(),
            email: Some(user.email.clone()),
        }
    }
}

/// Everything an aggregator needs to attach its subscriptions.
#[derive(Debug, Clone)]
pub struct AggregatorContext {
    pub pool: PgPool,
    pub hub: ChangeHub,
    pub user: DashboardUser,
}

/// Machine-readable dashboard error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DashboardErrorKind {
    PermissionDenied,
    IndexRequired,
    Unavailable,
}

/// Error state of the dashboard as a whole. Only the journeys subscription
/// produces one; it blocks stats rendering and requires a manual retry
/// (a fresh attach) — never an automatic one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardError {
    pub kind: DashboardErrorKind,
    pub message: String,
}

impl DashboardError {
    fn from_listen(err: &ListenError) -> Self {
        match err {
            ListenError::PermissionDenied(_) => Self {
                kind: DashboardErrorKind::PermissionDenied,
                message: "You do not have permission to view this dashboard.".to_string(),
            },
            ListenError::MissingIndex { index, .. } => Self {
                kind: DashboardErrorKind::IndexRequired,
                message: format!(
                    "The journeys query requires the {index} index. \
                     Apply the pending database migrations, then reload."
                ),
            },
            ListenError::Unavailable { .. } => Self {
                kind: DashboardErrorKind::Unavailable,
                message: "Failed to load your journeys. Please retry.".to_string(),
            },
        }
    }
}

/// The read model exposed to the rendering layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardModel {
    pub display_name: String,
    pub stats: DashboardStats,
    pub recent_journeys: Vec<Journey>,
    pub journey_progress: Vec<JourneyProgress>,
    /// True until the first journeys snapshot (or journeys error) arrives.
    /// Places and memories have no loading flag of their own: they display
    /// zero until their first snapshot lands.
    pub loading: bool,
    pub error: Option<DashboardError>,
}

impl DashboardModel {
    fn new(display_name: String) -> Self {
        Self {
            display_name,
            stats: DashboardStats::default(),
            recent_journeys: Vec::new(),
            journey_progress: Vec::new(),
            loading: true,
            error: None,
        }
    }
}

/// Synchronous event dispatcher behind the aggregator task.
///
/// Kept separate from the async driver so the cross-collection races and the
/// teardown contract are testable as plain function calls. Each `on_*`
/// handler returns whether the model changed.
pub struct AggregatorCore {
    model: DashboardModel,
    // retained latest snapshots; journey progress reads both
    journeys: Vec<Journey>,
    places: Vec<Place>,
    closed: bool,
}

impl AggregatorCore {
    pub fn new(display_name: String) -> Self {
        Self {
            model: DashboardModel::new(display_name),
            journeys: Vec::new(),
            places: Vec::new(),
            closed: false,
        }
    }

    pub fn model(&self) -> &DashboardModel {
        &self.model
    }

    /// Stop accepting events. Every `on_*` call afterwards is a no-op.
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn on_journeys(&mut self, event: SnapshotEvent<Journey>, now: DateTime<Utc>) -> bool {
        if self.closed {
            return false;
        }
        match event {
            Ok(snapshot) => {
                self.journeys = snapshot.docs;
                self.model.stats =
                    stats::apply_journeys_snapshot(self.model.stats.clone(), &self.journeys, now);
                self.model.recent_journeys = stats::recent_journeys(&self.journeys);
                self.model.journey_progress = stats::journey_progress(&self.journeys, &self.places);
                self.model.loading = false;
                true
            }
            Err(err) => {
                // Journeys drive the dashboard: surface as a blocking error.
                tracing::error!(kind = err.kind(), error = %err, "journeys subscription failed");
                self.model.error = Some(DashboardError::from_listen(&err));
                self.model.loading = false;
                true
            }
        }
    }

    pub fn on_places(&mut self, event: SnapshotEvent<Place>) -> bool {
        if self.closed {
            return false;
        }
        match event {
            Ok(snapshot) => {
                self.places = snapshot.docs;
                self.model.stats =
                    stats::apply_places_snapshot(self.model.stats.clone(), &self.places);
                self.model.journey_progress = stats::journey_progress(&self.journeys, &self.places);
                true
            }
            Err(err) => {
                // Non-blocking: freeze the last-known values.
                tracing::warn!(kind = err.kind(), error = %err, "places subscription failed");
                false
            }
        }
    }

    pub fn on_memories(&mut self, event: SnapshotEvent<Memory>) -> bool {
        if self.closed {
            return false;
        }
        match event {
            Ok(snapshot) => {
                self.model.stats =
                    stats::apply_memories_snapshot(self.model.stats.clone(), &snapshot.docs);
                true
            }
            Err(err) => {
                tracing::warn!(kind = err.kind(), error = %err, "memories subscription failed");
                false
            }
        }
    }
}

/// Handle to a running aggregator. Dropping it tears everything down.
#[derive(Debug)]
pub struct DashboardAggregator {
    rx: watch::Receiver<DashboardModel>,
    task: JoinHandle<()>,
}

impl DashboardAggregator {
    /// Attach the three subscriptions and start folding events.
    pub fn attach(ctx: AggregatorContext) -> Self {
        let display_name = greeting_name(
            ctx.user.display_name.as_deref(),
            ctx.user.email.as_deref(),
        );
        let core = AggregatorCore::new(display_name);
        let (tx, rx) = watch::channel(core.model().clone());
        let user_id = ctx.user.id;

        let task = tokio::spawn(async move {
            let mut core = core;
            let mut journeys = live::subscribe_journeys(ctx.pool.clone(), &ctx.hub, user_id);
            let mut places = live::subscribe_places(ctx.pool.clone(), &ctx.hub, user_id);
            let mut memories = live::subscribe_memories(ctx.pool, &ctx.hub, user_id);

            let mut journeys_open = true;
            let mut places_open = true;
            let mut memories_open = true;

            // One event at a time; each recompute runs to completion before
            // the next event (of any collection) is taken.
            loop {
                tokio::select! {
                    event = journeys.recv(), if journeys_open => match event {
                        Some(event) => {
                            if core.on_journeys(event, Utc::now()) {
                                let _ = tx.send(core.model().clone());
                            }
                        }
                        None => journeys_open = false,
                    },
                    event = places.recv(), if places_open => match event {
                        Some(event) => {
                            if core.on_places(event) {
                                let _ = tx.send(core.model().clone());
                            }
                        }
                        None => places_open = false,
                    },
                    event = memories.recv(), if memories_open => match event {
                        Some(event) => {
                            if core.on_memories(event) {
                                let _ = tx.send(core.model().clone());
                            }
                        }
                        None => memories_open = false,
                    },
                    else => break,
                }
            }
        });

        Self { rx, task }
    }

    /// Current read model.
    pub fn model(&self) -> DashboardModel {
        self.rx.borrow().clone()
    }

    /// A watch receiver for push-style consumers (SSE).
    pub fn watch(&self) -> watch::Receiver<DashboardModel> {
        self.rx.clone()
    }

    /// Wait until the journeys collection has resolved (first snapshot or
    /// error) and return the model at that point.
    pub async fn ready(&self) -> DashboardModel {
        let mut rx = self.rx.clone();
        loop {
            {
                let model = rx.borrow();
                if !model.loading {
                    return model.clone();
                }
            }
            if rx.changed().await.is_err() {
                return rx.borrow().clone();
            }
        }
    }

    /// Tear the aggregator down. Equivalent to dropping the handle: all three
    /// subscriptions stop and no in-flight event can mutate the model.
    pub fn detach(self) {}
}

impl Drop for DashboardAggregator {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::{Collection, Snapshot};

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn journey(id: Uuid, title: &str, created_at: DateTime<Utc>) -> Journey {
        Journey {
            id,
            user_id: Uuid::nil(),
            title: title.to_string(),
            description: None,
            cover_image: None,
            start_date: None,
            end_date: None,
            created_at,
            updated_at: created_at,
        }
    }

    fn place(journey_id: Uuid, country: Option<&str>) -> Place {
        Place {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            journey_id,
            name: "somewhere".to_string(),
            country: country.map(str::to_string),
            created_at: ts("2026-03-01T00:00:00Z"),
        }
    }

    fn memory(journey_id: Uuid) -> Memory {
        Memory {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            journey_id,
            title: "a moment".to_string(),
            created_at: ts("2026-03-01T00:00:00Z"),
        }
    }

    fn snap<T>(docs: Vec<T>) -> SnapshotEvent<T> {
        Ok(Snapshot { docs })
    }

    fn core() -> AggregatorCore {
        AggregatorCore::new("Traveller".to_string())
    }

    #[test]
    fn starts_loading_with_zero_stats() {
        let core = core();
        let model = core.model();
        assert!(model.loading);
        assert!(model.error.is_none());
        assert_eq!(model.stats, DashboardStats::default());
        assert!(model.recent_journeys.is_empty());
        assert!(model.journey_progress.is_empty());
    }

    #[test]
    fn empty_journeys_snapshot_clears_loading() {
        let mut core = core();
        let now = ts("2026-06-01T00:00:00Z");
        assert!(core.on_journeys(snap(vec![]), now));
        assert!(!core.model().loading);
        assert_eq!(core.model().stats.journeys, 0);
    }

    #[test]
    fn places_before_journeys_yields_empty_progress_then_recovers() {
        let mut core = core();
        let now = ts("2026-06-01T00:00:00Z");
        let j = Uuid::new_v4();

        // places arrive first: counts land, progress stays empty
        assert!(core.on_places(snap(vec![place(j, Some("Japan")), place(j, None)])));
        assert_eq!(core.model().stats.places, 2);
        assert!(core.model().journey_progress.is_empty());
        assert!(core.model().loading);

        // journeys arrive: progress is recomputed against the retained places
        assert!(core.on_journeys(snap(vec![journey(j, "Trip", now)]), now));
        assert_eq!(core.model().journey_progress.len(), 1);
        assert_eq!(core.model().journey_progress[0].places, 2);
        assert!(!core.model().loading);
    }

    #[test]
    fn interleavings_never_clobber_foreign_fields() {
        let mut core = core();
        let now = ts("2026-06-01T00:00:00Z");
        let j = Uuid::new_v4();

        core.on_journeys(snap(vec![journey(j, "Trip", now)]), now);
        core.on_memories(snap(vec![memory(j), memory(j), memory(j)]));
        core.on_places(snap(vec![place(j, Some("France"))]));
        // a journeys refresh must keep the places/memories counts
        core.on_journeys(snap(vec![journey(j, "Trip", now)]), now);

        let stats = &core.model().stats;
        assert_eq!(stats.journeys, 1);
        assert_eq!(stats.places, 1);
        assert_eq!(stats.memories, 3);
        assert_eq!(stats.countries, 1);
        assert_eq!(stats.avg_memories_per_journey, Some(3.0));
    }

    #[test]
    fn journeys_index_error_blocks_dashboard_but_not_other_reducers() {
        let mut core = core();
        let j = Uuid::new_v4();

        let err = ListenError::MissingIndex {
            collection: Collection::Journeys,
            index: live::JOURNEYS_USER_CREATED_INDEX.to_string(),
        };
        assert!(core.on_journeys(Err(err), ts("2026-06-01T00:00:00Z")));

        let model = core.model();
        assert!(!model.loading);
        let error = model.error.as_ref().unwrap();
        assert_eq!(error.kind, DashboardErrorKind::IndexRequired);
        assert!(error.message.contains(live::JOURNEYS_USER_CREATED_INDEX));

        // healthy places/memories subscriptions keep recomputing
        assert!(core.on_places(snap(vec![place(j, Some("Japan"))])));
        assert!(core.on_memories(snap(vec![memory(j)])));
        assert_eq!(core.model().stats.places, 1);
        assert_eq!(core.model().stats.memories, 1);
    }

    #[test]
    fn journeys_permission_error_is_terminal_kind() {
        let mut core = core();
        let err = ListenError::PermissionDenied(Collection::Journeys);
        core.on_journeys(Err(err), ts("2026-06-01T00:00:00Z"));
        assert_eq!(
            core.model().error.as_ref().unwrap().kind,
            DashboardErrorKind::PermissionDenied
        );
    }

    #[test]
    fn places_errors_are_swallowed_and_freeze_values() {
        let mut core = core();
        let j = Uuid::new_v4();
        core.on_places(snap(vec![place(j, Some("Japan")), place(j, Some("Peru"))]));

        let err = ListenError::Unavailable {
            collection: Collection::Places,
            message: "connection reset".to_string(),
        };
        assert!(!core.on_places(Err(err)));

        let model = core.model();
        assert!(model.error.is_none());
        assert_eq!(model.stats.places, 2);
        assert_eq!(model.stats.countries, 2);
    }

    #[test]
    fn events_after_close_are_noops() {
        let mut core = core();
        let now = ts("2026-06-01T00:00:00Z");
        let j = Uuid::new_v4();
        core.on_journeys(snap(vec![journey(j, "Trip", now)]), now);
        let before = core.model().clone();

        core.close();
        assert!(core.is_closed());
        assert!(!core.on_journeys(snap(vec![]), now));
        assert!(!core.on_places(snap(vec![place(j, Some("Japan"))])));
        assert!(!core.on_memories(snap(vec![memory(j)])));
        assert_eq!(core.model(), &before);
    }

    #[test]
    fn recent_journeys_and_progress_follow_snapshot_order() {
        let mut core = core();
        let now = ts("2026-06-10T00:00:00Z");
        let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        let journeys: Vec<Journey> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| journey(*id, &format!("j{i}"), now - chrono::Duration::days(i as i64)))
            .collect();

        core.on_journeys(snap(journeys), now);
        let model = core.model();
        assert_eq!(model.recent_journeys.len(), 3);
        assert_eq!(model.recent_journeys[0].title, "j0");
        assert_eq!(model.journey_progress.len(), 4);
        assert_eq!(model.stats.last_journey_date, Some(now));
    }

    #[test]
    fn greeting_name_flows_into_model() {
        let core = AggregatorCore::new(greeting_name(None, Some("mina@example.com")));
        assert_eq!(core.model().display_name, "mina");
    }
}
