//! Component-scoped cancellation.
//!
//! Every task, pending future and event listener a component creates is
//! registered in its [`AsyncGroup`]. Clearing the group at teardown releases
//! all of them, so nothing outlives the owning instance.
//!
//! Entries may carry a `group` and a `label`. Registering an entry with a
//! `(group, label)` pair already in use cancels the previous entry first.

use std::future::Future;
use std::sync::{Arc, Weak};

use futures_util::future::{AbortHandle, Abortable};
use indexmap::IndexMap;
use parking_lot::Mutex;

use super::emitter::{EventSource, SubscribeOptions};
use super::subscriber::Listener;

/// Group and label of an async entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AsyncOptions {
    pub group: Option<String>,
    pub label: Option<String>,
}

impl AsyncOptions {
    pub fn group(group: impl Into<String>) -> Self {
        Self {
            group: Some(group.into()),
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Identifier of an entry in an [`AsyncGroup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(u64);

enum Cancel {
    Abort(AbortHandle),
    Listener(Box<dyn FnOnce() + Send>),
}

impl Cancel {
    fn run(self) {
        match self {
            Cancel::Abort(handle) => handle.abort(),
            Cancel::Listener(off) => off(),
        }
    }
}

struct Entry {
    options: AsyncOptions,
    cancel: Cancel,
}

#[derive(Default)]
struct State {
    next_id: u64,
    entries: IndexMap<u64, Entry>,
    cleared: bool,
}

/// Registry of everything a component has in flight.
#[derive(Clone, Default)]
pub struct AsyncGroup {
    state: Arc<Mutex<State>>,
}

impl AsyncGroup {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&self, options: AsyncOptions, cancel: Cancel) -> Option<EntryId> {
        let (id, replaced) = {
            let mut state = self.state.lock();
            if state.cleared {
                drop(state);
                cancel.run();
                return None;
            }

            let replaced = match options.label {
                Some(_) => {
                    let previous = state
                        .entries
                        .iter()
                        .find(|(_, e)| e.options == options)
                        .map(|(&id, _)| id);
                    previous.and_then(|id| state.entries.shift_remove(&id))
                }
                None => None,
            };

            let id = state.next_id;
            state.next_id += 1;
            state.entries.insert(id, Entry { options, cancel });
            (id, replaced)
        };

        if let Some(entry) = replaced {
            entry.cancel.run();
        }

        Some(EntryId(id))
    }

    fn forget(state: &Weak<Mutex<State>>, id: u64) {
        if let Some(state) = state.upgrade() {
            state.lock().entries.shift_remove(&id);
        }
    }

    /// Spawn a task on the current tokio runtime, cancelled on clear.
    ///
    /// Returns `None` if the group was already cleared or no runtime is
    /// available.
    pub fn spawn<F>(&self, task: F, options: AsyncOptions) -> Option<EntryId>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(event = "async:spawn", "no tokio runtime, task dropped");
            return None;
        };

        let (handle, registration) = AbortHandle::new_pair();
        let id = self.register(options, Cancel::Abort(handle))?;
        let state = Arc::downgrade(&self.state);

        runtime.spawn(async move {
            let _ = Abortable::new(task, registration).await;
            Self::forget(&state, id.0);
        });

        Some(id)
    }

    /// Await a future unless the group is cleared first.
    ///
    /// Resolves to `None` when the future was cancelled.
    pub async fn promise<F, T>(&self, future: F, options: AsyncOptions) -> Option<T>
    where
        F: Future<Output = T>,
    {
        let (handle, registration) = AbortHandle::new_pair();
        let id = self.register(options, Cancel::Abort(handle))?;
        let outcome = Abortable::new(future, registration).await;
        Self::forget(&Arc::downgrade(&self.state), id.0);
        outcome.ok()
    }

    /// Subscribe to an event source; the listener is removed on clear.
    pub fn on(
        &self,
        source: Arc<dyn EventSource>,
        event: &str,
        listener: Listener,
        subscribe: &SubscribeOptions,
        options: AsyncOptions,
    ) -> Option<EntryId> {
        let subscriber = source.subscribe(event, listener, subscribe);
        let event = event.to_string();

        self.register(
            options,
            Cancel::Listener(Box::new(move || {
                source.unsubscribe(&event, subscriber);
            })),
        )
    }

    /// Register a custom teardown callback.
    pub fn add_cleanup<F>(&self, cleanup: F, options: AsyncOptions) -> Option<EntryId>
    where
        F: FnOnce() + Send + 'static,
    {
        self.register(options, Cancel::Listener(Box::new(cleanup)))
    }

    /// Cancel one entry.
    pub fn cancel(&self, id: EntryId) -> bool {
        let entry = self.state.lock().entries.shift_remove(&id.0);
        match entry {
            Some(entry) => {
                entry.cancel.run();
                true
            }
            None => false,
        }
    }

    /// Cancel every entry of a group and return how many were cancelled.
    pub fn clear_group(&self, group: &str) -> usize {
        let removed: Vec<Entry> = {
            let mut state = self.state.lock();
            let ids: Vec<u64> = state
                .entries
                .iter()
                .filter(|(_, e)| e.options.group.as_deref() == Some(group))
                .map(|(&id, _)| id)
                .collect();

            ids.into_iter().filter_map(|id| state.entries.shift_remove(&id)).collect()
        };

        let count = removed.len();
        for entry in removed {
            entry.cancel.run();
        }
        count
    }

    /// Cancel everything and refuse later registrations.
    pub fn clear_all(&self) -> usize {
        let removed: Vec<Entry> = {
            let mut state = self.state.lock();
            state.cleared = true;
            state.entries.drain(..).map(|(_, e)| e).collect()
        };

        let count = removed.len();
        for entry in removed {
            entry.cancel.run();
        }

        tracing::trace!(event = "async:clear-all", count);
        count
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_cleared(&self) -> bool {
        self.state.lock().cleared
    }
}

impl std::fmt::Debug for AsyncGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("AsyncGroup")
            .field("entries", &state.entries.len())
            .field("cleared", &state.cleared)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::EventEmitter;
    use serde_json::Value;
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn spawned_task_runs_and_is_forgotten() {
        let group = AsyncGroup::new();
        let hits = Arc::new(AtomicI32::new(0));
        let hits_clone = hits.clone();

        group.spawn(
            async move {
                hits_clone.fetch_add(1, Ordering::SeqCst);
            },
            AsyncOptions::default(),
        );

        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(group.is_empty());
    }

    #[tokio::test]
    async fn same_label_replaces_previous_entry() {
        let group = AsyncGroup::new();
        let hits = Arc::new(AtomicI32::new(0));

        for _ in 0..3 {
            let hits = hits.clone();
            group.spawn(
                async move {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    hits.fetch_add(1, Ordering::SeqCst);
                },
                AsyncOptions::group("watchers").with_label("onChange"),
            );
        }

        assert_eq!(group.len(), 1);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn clear_all_cancels_everything() {
        let group = AsyncGroup::new();
        let emitter = Arc::new(EventEmitter::new());
        let hits = Arc::new(AtomicI32::new(0));

        let hits_clone = hits.clone();
        group.spawn(
            async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                hits_clone.fetch_add(1, Ordering::SeqCst);
            },
            AsyncOptions::default(),
        );

        let hits_clone = hits.clone();
        group.on(
            emitter.clone(),
            "change",
            Arc::new(move |_: &[Value]| {
                hits_clone.fetch_add(100, Ordering::SeqCst);
            }),
            &SubscribeOptions::default(),
            AsyncOptions::default(),
        );

        assert_eq!(group.clear_all(), 2);
        assert_eq!(emitter.listener_count("change"), 0);

        tokio::time::sleep(Duration::from_millis(40)).await;
        emitter.emit("change", &[]);
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        // Nothing can be registered after teardown.
        assert!(group.spawn(async {}, AsyncOptions::default()).is_none());
        assert!(group.is_cleared());
    }

    #[tokio::test]
    async fn promise_resolves_to_none_when_cleared() {
        let group = AsyncGroup::new();
        let group_clone = group.clone();

        let pending = tokio::spawn(async move {
            group_clone
                .promise(
                    tokio::time::sleep(Duration::from_secs(5)),
                    AsyncOptions::default(),
                )
                .await
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        group.clear_all();

        assert_eq!(pending.await.unwrap(), None);
        assert_eq!(group.promise(async { 1 }, AsyncOptions::default()).await, None);
    }

    #[tokio::test]
    async fn clear_group_leaves_other_groups() {
        let group = AsyncGroup::new();
        group.add_cleanup(|| {}, AsyncOptions::group("watchers"));
        group.add_cleanup(|| {}, AsyncOptions::group("watchers"));
        group.add_cleanup(|| {}, AsyncOptions::group("timers"));

        assert_eq!(group.clear_group("watchers"), 2);
        assert_eq!(group.len(), 1);
        assert!(!group.is_cleared());
    }
}
