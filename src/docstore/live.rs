//! Push-based query subscriptions

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::document::DocumentSnapshot;
use super::error::Result;

/// Counts a listener as registered for as long as the value lives.
#[derive(Debug)]
pub struct ListenerRegistration {
    active: Arc<AtomicUsize>,
}

impl ListenerRegistration {
    pub fn register(active: Arc<AtomicUsize>) -> Self {
        active.fetch_add(1, Ordering::SeqCst);
        Self { active }
    }
}

impl Drop for ListenerRegistration {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Stream of full query results, one item per change to the collection.
///
/// The first item is the current result. An `Err` item ends the stream.
/// Dropping the stream stops the background task and releases the listener
/// registration immediately.
pub struct LiveQuery {
    rx: mpsc::Receiver<Result<Vec<DocumentSnapshot>>>,
    task: JoinHandle<()>,
    _registration: ListenerRegistration,
}

impl LiveQuery {
    pub fn new(
        rx: mpsc::Receiver<Result<Vec<DocumentSnapshot>>>,
        task: JoinHandle<()>,
        registration: ListenerRegistration,
    ) -> Self {
        Self {
            rx,
            task,
            _registration: registration,
        }
    }
}

impl Stream for LiveQuery {
    type Item = Result<Vec<DocumentSnapshot>>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for LiveQuery {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_counts() {
        let active = Arc::new(AtomicUsize::new(0));
        let a = ListenerRegistration::register(active.clone());
        let b = ListenerRegistration::register(active.clone());
        assert_eq!(active.load(Ordering::SeqCst), 2);

        drop(a);
        assert_eq!(active.load(Ordering::SeqCst), 1);
        drop(b);
        assert_eq!(active.load(Ordering::SeqCst), 0);
    }
}
