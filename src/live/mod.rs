//! Live query layer: per-user snapshot subscriptions over the document tables.
//!
//! Semantics mirror a snapshot listener: attaching a subscription always
//! delivers an initial snapshot (an empty result set is a loaded state, not a
//! pending one), and every committed write to the collection re-runs the query
//! and delivers a complete fresh snapshot. A subscription that hits an error
//! reports it in-stream and stops; it never retries on its own — recovery is a
//! fresh subscription.

use std::fmt;
use std::future::Future;

use serde::Serialize;
use sqlx::PgPool;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::models::journey::Journey;
use crate::models::memory::Memory;
use crate::models::place::Place;

/// Composite index backing the ordered per-user journeys query.
///
/// The filter+sort combination (user_id ASC, created_at DESC) is only
/// serviceable with this index in place; `subscribe_journeys` verifies it
/// before attaching and reports `ListenError::MissingIndex` when absent.
pub const JOURNEYS_USER_CREATED_INDEX: &str = "idx_journeys_user_id_created_at";

/// Capacity of the change broadcast channel. A lagging subscriber refetches
/// its snapshot, so missed notifications lose nothing.
const CHANGE_BUFFER: usize = 256;

/// Collections observable through the live layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Journeys,
    Places,
    Memories,
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collection::Journeys => write!(f, "journeys"),
            Collection::Places => write!(f, "places"),
            Collection::Memories => write!(f, "memories"),
        }
    }
}

/// Change notification published after a committed write.
#[derive(Debug, Clone, Copy)]
pub struct Change {
    pub collection: Collection,
    pub user_id: Uuid,
}

/// In-process fan-out of write notifications to active subscriptions.
#[derive(Debug, Clone)]
pub struct ChangeHub {
    tx: broadcast::Sender<Change>,
}

impl ChangeHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANGE_BUFFER);
        Self { tx }
    }

    /// Notify active subscriptions that `collection` changed for `user_id`.
    /// A send with no live subscribers is a no-op.
    pub fn notify(&self, collection: Collection, user_id: Uuid) {
        let _ = self.tx.send(Change {
            collection,
            user_id,
        });
    }

    fn subscribe(&self) -> broadcast::Receiver<Change> {
        self.tx.subscribe()
    }
}

impl Default for ChangeHub {
    fn default() -> Self {
        Self::new()
    }
}

/// A complete current result set for a subscribed query.
#[derive(Debug, Clone)]
pub struct Snapshot<T> {
    pub docs: Vec<T>,
}

impl<T> Snapshot<T> {
    pub fn size(&self) -> usize {
        self.docs.len()
    }
}

/// Why a subscription stopped delivering snapshots.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ListenError {
    #[error("permission denied reading {0}")]
    PermissionDenied(Collection),

    #[error("missing composite index {index} on {collection}")]
    MissingIndex {
        collection: Collection,
        index: String,
    },

    #[error("{collection} subscription unavailable: {message}")]
    Unavailable {
        collection: Collection,
        message: String,
    },
}

impl ListenError {
    /// Machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ListenError::PermissionDenied(_) => "permission-denied",
            ListenError::MissingIndex { .. } => "failed-precondition",
            ListenError::Unavailable { .. } => "unavailable",
        }
    }

    pub fn collection(&self) -> Collection {
        match self {
            ListenError::PermissionDenied(c) => *c,
            ListenError::MissingIndex { collection, .. } => *collection,
            ListenError::Unavailable { collection, .. } => *collection,
        }
    }
}

/// One delivery from a subscription: a fresh snapshot or a terminal error.
pub type SnapshotEvent<T> = Result<Snapshot<T>, ListenError>;

/// Handle to an active subscription.
///
/// Dropping the handle (or calling [`Subscription::unsubscribe`]) aborts the
/// delivery task; no event can reach the receiver afterwards.
#[derive(Debug)]
pub struct Subscription<T> {
    rx: mpsc::UnboundedReceiver<SnapshotEvent<T>>,
    task: JoinHandle<()>,
}

impl<T> Subscription<T> {
    /// Receive the next snapshot event. Returns `None` once the subscription
    /// has terminated (after a terminal error, or hub shutdown).
    pub async fn recv(&mut self) -> Option<SnapshotEvent<T>> {
        self.rx.recv().await
    }

    /// Release the subscription. Equivalent to dropping the handle.
    pub fn unsubscribe(self) {}
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Map a query failure to a listen error kind. Postgres `42501`
/// (insufficient_privilege) is terminal permission denial; anything else is
/// reported as a generic unavailability.
fn classify(collection: Collection, err: &sqlx::Error) -> ListenError {
    if let sqlx::Error::Database(db) = err {
        if db.code().as_deref() == Some("42501") {
            return ListenError::PermissionDenied(collection);
        }
    }
    ListenError::Unavailable {
        collection,
        message: err.to_string(),
    }
}

/// Fetch-and-deliver loop shared by all subscriptions: initial snapshot, then
/// a fresh snapshot per matching change notification. Ends on terminal error,
/// receiver drop, or hub shutdown.
async fn deliver_loop<T, F, Fut>(
    collection: Collection,
    user_id: Uuid,
    tx: mpsc::UnboundedSender<SnapshotEvent<T>>,
    changes: &mut broadcast::Receiver<Change>,
    fetch: F,
) where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Vec<T>, sqlx::Error>>,
{
    match fetch().await {
        Ok(docs) => {
            if tx.send(Ok(Snapshot { docs })).is_err() {
                return;
            }
        }
        Err(e) => {
            let _ = tx.send(Err(classify(collection, &e)));
            return;
        }
    }

    loop {
        match changes.recv().await {
            Ok(change) if change.collection == collection && change.user_id == user_id => {
                match fetch().await {
                    Ok(docs) => {
                        if tx.send(Ok(Snapshot { docs })).is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(classify(collection, &e)));
                        return;
                    }
                }
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                // Missed notifications carry no payload; one refetch resyncs.
                tracing::warn!(
                    collection = %collection,
                    missed,
                    "change feed lagged; refreshing snapshot"
                );
                match fetch().await {
                    Ok(docs) => {
                        if tx.send(Ok(Snapshot { docs })).is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(classify(collection, &e)));
                        return;
                    }
                }
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}

async fn composite_index_exists(pool: &PgPool) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM pg_indexes WHERE tablename = 'journeys' AND indexname = $1)",
    )
    .bind(JOURNEYS_USER_CREATED_INDEX)
    .fetch_one(pool)
    .await
}

/// Subscribe to the user's journeys, ordered newest-first.
///
/// Verifies the composite (user_id, created_at DESC) index before attaching;
/// its absence is reported as a `failed-precondition` class error. The failed
/// listener does not recover once the index is created — attach a new
/// subscription instead.
pub fn subscribe_journeys(pool: PgPool, hub: &ChangeHub, user_id: Uuid) -> Subscription<Journey> {
    let (tx, rx) = mpsc::unbounded_channel();
    let mut changes = hub.subscribe();
    let task = tokio::spawn(async move {
        match composite_index_exists(&pool).await {
            Ok(true) => {}
            Ok(false) => {
                let _ = tx.send(Err(ListenError::MissingIndex {
                    collection: Collection::Journeys,
                    index: JOURNEYS_USER_CREATED_INDEX.to_string(),
                }));
                return;
            }
            Err(e) => {
                let _ = tx.send(Err(classify(Collection::Journeys, &e)));
                return;
            }
        }

        let fetch = || {
            let pool = pool.clone();
            async move {
                sqlx::query_as::<_, Journey>(
                    "SELECT * FROM journeys WHERE user_id = $1 ORDER BY created_at DESC",
                )
                .bind(user_id)
                .fetch_all(&pool)
                .await
            }
        };
        deliver_loop(Collection::Journeys, user_id, tx, &mut changes, fetch).await;
    });
    Subscription { rx, task }
}

/// Subscribe to the user's places (unordered).
pub fn subscribe_places(pool: PgPool, hub: &ChangeHub, user_id: Uuid) -> Subscription<Place> {
    let (tx, rx) = mpsc::unbounded_channel();
    let mut changes = hub.subscribe();
    let task = tokio::spawn(async move {
        let fetch = || {
            let pool = pool.clone();
            async move {
                sqlx::query_as::<_, Place>("SELECT * FROM places WHERE user_id = $1")
                    .bind(user_id)
                    .fetch_all(&pool)
                    .await
            }
        };
        deliver_loop(Collection::Places, user_id, tx, &mut changes, fetch).await;
    });
    Subscription { rx, task }
}

/// Subscribe to the user's memories (unordered).
pub fn subscribe_memories(pool: PgPool, hub: &ChangeHub, user_id: Uuid) -> Subscription<Memory> {
    let (tx, rx) = mpsc::unbounded_channel();
    let mut changes = hub.subscribe();
    let task = tokio::spawn(async move {
        let fetch = || {
            let pool = pool.clone();
            async move {
                sqlx::query_as::<_, Memory>("SELECT * FROM memories WHERE user_id = $1")
                    .bind(user_id)
                    .fetch_all(&pool)
                    .await
            }
        };
        deliver_loop(Collection::Memories, user_id, tx, &mut changes, fetch).await;
    });
    Subscription { rx, task }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listen_error_kinds() {
        let permission = ListenError::PermissionDenied(Collection::Journeys);
        assert_eq!(permission.kind(), "permission-denied");

        let index = ListenError::MissingIndex {
            collection: Collection::Journeys,
            index: JOURNEYS_USER_CREATED_INDEX.to_string(),
        };
        assert_eq!(index.kind(), "failed-precondition");
        assert_eq!(index.collection(), Collection::Journeys);

        let other = ListenError::Unavailable {
            collection: Collection::Places,
            message: "connection reset".to_string(),
        };
        assert_eq!(other.kind(), "unavailable");
        assert_eq!(other.collection(), Collection::Places);
    }

    #[test]
    fn classify_non_database_errors_as_unavailable() {
        let err = classify(Collection::Memories, &sqlx::Error::RowNotFound);
        assert_eq!(err.kind(), "unavailable");
        assert_eq!(err.collection(), Collection::Memories);
    }

    #[test]
    fn snapshot_size_counts_docs() {
        let snap = Snapshot {
            docs: vec!["a", "b", "c"],
        };
        assert_eq!(snap.size(), 3);
        let empty: Snapshot<&str> = Snapshot { docs: vec![] };
        assert_eq!(empty.size(), 0);
    }

    #[tokio::test]
    async fn change_hub_fans_out_to_subscribers() {
        let hub = ChangeHub::new();
        let mut rx = hub.subscribe();
        let user = Uuid::new_v4();

        hub.notify(Collection::Journeys, user);
        let change = rx.recv().await.unwrap();
        assert_eq!(change.collection, Collection::Journeys);
        assert_eq!(change.user_id, user);
    }

    #[tokio::test]
    async fn notify_without_subscribers_is_noop() {
        let hub = ChangeHub::new();
        hub.notify(Collection::Places, Uuid::new_v4());
    }
}
