//! Headless view controllers
//!
//! Each controller owns its local state, its live subscription, and an
//! inline error string. Store calls run on the tokio runtime and report back
//! through the controller's [`Inbox`]; a controller applies them on
//! [`View::poll`] (the terminal loop) or [`next_update`](TodoListView::next_update)
//! (tests and other async callers).
//!
//! Unmounting closes the subscription and swaps in a fresh inbox, so results
//! of calls issued before the unmount are dropped. The calls themselves still
//! run to completion in the store.

mod completed;
mod todo_list;
mod welcome;

pub use completed::CompletedView;
pub use todo_list::{TaskForm, TodoListView};
pub use welcome::{format_long_date, WelcomeView};

use std::future::Future;

use tokio::sync::mpsc;

use crate::error::Result;
use crate::repository::TaskSubscription;
use crate::shell::Route;
use crate::task::Task;

/// Result of a store call issued by a view
#[derive(Debug)]
pub enum ViewEvent {
    Added(Result<String>),
    Toggled(Result<bool>),
    Removed(Result<()>),
    CompletedCount(Result<usize>),
}

/// Anything a mounted view can receive
#[derive(Debug)]
pub(crate) enum Update {
    Snapshot(Result<Vec<Task>>),
    Event(ViewEvent),
}

/// Mailbox for results of store calls spawned by one mount of a view
#[derive(Debug)]
pub struct Inbox {
    tx: mpsc::UnboundedSender<ViewEvent>,
    rx: mpsc::UnboundedReceiver<ViewEvent>,
}

impl Default for Inbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Inbox {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    /// Run `call` on the runtime and post its result here.
    pub fn spawn<F>(&self, call: F)
    where
        F: Future<Output = ViewEvent> + Send + 'static,
    {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(call.await);
        });
    }

    pub fn try_recv(&mut self) -> Option<ViewEvent> {
        self.rx.try_recv().ok()
    }

    pub async fn recv(&mut self) -> Option<ViewEvent> {
        self.rx.recv().await
    }
}

/// Common surface the shell drives
pub trait View {
    fn route(&self) -> Route;

    /// Open subscriptions and issue mount-time queries.
    fn mount(&mut self);

    /// Close subscriptions and drop pending results.
    fn unmount(&mut self);

    fn is_mounted(&self) -> bool;

    /// Apply everything that arrived since the last poll. Returns whether
    /// visible state changed.
    fn poll(&mut self) -> bool;

    /// Inline error message, if any
    fn error(&self) -> Option<&str>;
}

/// Drain a subscription and an inbox without waiting.
pub(crate) fn drain(subscription: Option<&mut TaskSubscription>, inbox: &mut Inbox) -> Vec<Update> {
    let mut updates = Vec::new();
    if let Some(subscription) = subscription {
        while let Some(snapshot) = subscription.try_next() {
            updates.push(Update::Snapshot(snapshot));
        }
    }
    while let Some(event) = inbox.try_recv() {
        updates.push(Update::Event(event));
    }
    updates
}

/// Wait for the next snapshot or call result.
pub(crate) async fn wait(
    subscription: Option<&mut TaskSubscription>,
    inbox: &mut Inbox,
) -> Option<Update> {
    match subscription {
        Some(subscription) => tokio::select! {
            snapshot = subscription.next() => snapshot.map(Update::Snapshot),
            event = inbox.recv() => event.map(Update::Event),
        },
        None => inbox.recv().await.map(Update::Event),
    }
}
