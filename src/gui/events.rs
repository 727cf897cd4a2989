//! Change events and their fan-out to live listeners.
//!
//! Delivery is at-most-once: an event reaches the listeners registered when it
//! is broadcast and is never queued for later subscribers.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};

use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::storage::{DeletedTask, MoveOutcome};

/// Something on the board changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeEvent {
    /// Files changed on disk; the viewer should refetch the board.
    Reload { timestamp: DateTime<Utc> },
    TaskMoved {
        task_id: String,
        title: String,
        from: String,
        to: String,
        notify: bool,
        timestamp: DateTime<Utc>,
    },
    TaskDeleted {
        task_id: String,
        title: String,
        column: String,
        timestamp: DateTime<Utc>,
    },
}

impl ChangeEvent {
    pub fn reload() -> Self {
        Self::Reload {
            timestamp: Utc::now(),
        }
    }

    pub fn moved(outcome: &MoveOutcome) -> Self {
        Self::TaskMoved {
            task_id: outcome.id.clone(),
            title: outcome.title.clone(),
            from: outcome.from.clone(),
            to: outcome.to.clone(),
            notify: outcome.notify,
            timestamp: Utc::now(),
        }
    }

    pub fn deleted(task: &DeletedTask) -> Self {
        Self::TaskDeleted {
            task_id: task.id.clone(),
            title: task.title.clone(),
            column: task.column.clone(),
            timestamp: Utc::now(),
        }
    }

    /// Event name used on the SSE stream.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Reload { .. } => "reload",
            Self::TaskMoved { .. } => "task_moved",
            Self::TaskDeleted { .. } => "task_deleted",
        }
    }
}

/// Registry of listeners for one board.
///
/// Passed around explicitly (usually behind an `Arc`) so several boards can
/// be served from one process.
#[derive(Debug, Default)]
pub struct Notifier {
    listeners: Mutex<HashMap<u64, mpsc::UnboundedSender<ChangeEvent>>>,
    next_id: AtomicU64,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new listener. It is removed when the subscription drops.
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.register(tx);
        Subscription {
            id,
            rx: UnboundedReceiverStream::new(rx),
            notifier: Arc::clone(self),
        }
    }

    /// Add a raw sender and return its listener id.
    pub fn register(&self, sender: mpsc::UnboundedSender<ChangeEvent>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().insert(id, sender);
        tracing::debug!(listener = id, "listener subscribed");
        id
    }

    /// Remove a listener. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: u64) {
        if self.lock().remove(&id).is_some() {
            tracing::debug!(listener = id, "listener unsubscribed");
        }
    }

    /// Send `event` to every listener and return how many accepted it.
    ///
    /// A listener whose channel is closed is skipped silently. It stays
    /// registered until its own subscription is dropped.
    pub fn broadcast(&self, event: &ChangeEvent) -> usize {
        let listeners = self.lock();
        let delivered = listeners
            .values()
            .filter(|tx| tx.send(event.clone()).is_ok())
            .count();
        tracing::debug!(
            kind = event.kind(),
            delivered,
            listeners = listeners.len(),
            "broadcast change event"
        );
        delivered
    }

    pub fn listener_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u64, mpsc::UnboundedSender<ChangeEvent>>> {
        self.listeners.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A registered listener, readable as a [`Stream`] of events.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    rx: UnboundedReceiverStream<ChangeEvent>,
    notifier: Arc<Notifier>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the next event.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.rx.next().await
    }
}

impl Stream for Subscription {
    type Item = ChangeEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<ChangeEvent>> {
        Pin::new(&mut self.rx).poll_next(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.notifier.unsubscribe(self.id);
    }
}
