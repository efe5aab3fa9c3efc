//! Single-slot, replay-last value holder.
//!
//! An [`Observable`] keeps the most recently published value and a list of
//! listeners. New listeners get the current value right away (if there is
//! one) and every later value after that, in registration order. Clones share
//! the same slot.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Slot<T> {
    value: Option<T>,
    listeners: Vec<(u64, Listener<T>)>,
    next_id: u64,
    /// Set while some thread is running callbacks; others only queue work.
    dispatching: bool,
    /// Newest value not yet broadcast. Older undelivered values are dropped.
    pending: Option<T>,
    /// Current value owed to a listener registered mid-dispatch.
    replays: VecDeque<(Listener<T>, T)>,
}

struct Shared<T> {
    slot: Mutex<Slot<T>>,
    tx: watch::Sender<Option<T>>,
}

enum Job<T> {
    Replay(Listener<T>, T),
    Broadcast(Vec<Listener<T>>, T),
}

fn lock<G>(m: &Mutex<G>) -> MutexGuard<'_, G> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears the dispatching flag when a callback panics. The normal exit path
/// clears it under the same lock that found the queues empty.
struct DispatchGuard<'a, T> {
    slot: &'a Mutex<Slot<T>>,
}

impl<T> Drop for DispatchGuard<'_, T> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            lock(self.slot).dispatching = false;
        }
    }
}

pub struct Observable<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync + 'static> Observable<T> {
    /// Empty holder; nothing is replayed until the first publish.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot {
                    value: None,
                    listeners: Vec::new(),
                    next_id: 0,
                    dispatching: false,
                    pending: None,
                    replays: VecDeque::new(),
                }),
                tx,
            }),
        }
    }

    pub fn get(&self) -> Option<T> {
        lock(&self.shared.slot).value.clone()
    }

    /// Register `callback`. It receives the current value (if any) before
    /// `subscribe` returns, then once per publish.
    ///
    /// Callbacks may publish, fetch or subscribe on the same holder. Work
    /// started from inside a callback is delivered after the current round of
    /// callbacks finishes, never nested inside it.
    pub fn subscribe<F>(&self, callback: F) -> Subscription<T>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let listener: Listener<T> = Arc::new(callback);
        let id = {
            let mut slot = lock(&self.shared.slot);
            let id = slot.next_id;
            slot.next_id += 1;
            slot.listeners.push((id, listener.clone()));
            // A queued broadcast will reach the new listener anyway.
            if slot.pending.is_none() {
                if let Some(value) = slot.value.clone() {
                    slot.replays.push_back((listener, value));
                }
            }
            id
        };
        self.drain();
        Subscription {
            id,
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Overwrite the slot and notify every listener in registration order.
    pub fn publish(&self, value: T) {
        self.publish_if(value, || true);
    }

    /// Publish only if `current` still holds, checked atomically with the
    /// slot update. Returns whether the value was published.
    pub fn publish_if(&self, value: T, current: impl FnOnce() -> bool) -> bool {
        {
            let mut slot = lock(&self.shared.slot);
            if !current() {
                return false;
            }
            slot.value = Some(value.clone());
            self.shared.tx.send_replace(Some(value.clone()));
            slot.pending = Some(value);
        }
        self.drain();
        true
    }

    /// Run queued callbacks unless another call is already doing so; that
    /// call picks up whatever was queued here.
    fn drain(&self) {
        {
            let mut slot = lock(&self.shared.slot);
            if slot.dispatching {
                return;
            }
            slot.dispatching = true;
        }
        let _guard = DispatchGuard {
            slot: &self.shared.slot,
        };

        loop {
            let job = {
                let mut slot = lock(&self.shared.slot);
                if let Some((listener, value)) = slot.replays.pop_front() {
                    Job::Replay(listener, value)
                } else if let Some(value) = slot.pending.take() {
                    let listeners = slot.listeners.iter().map(|(_, l)| l.clone()).collect();
                    Job::Broadcast(listeners, value)
                } else {
                    slot.dispatching = false;
                    break;
                }
            };
            match job {
                Job::Replay(listener, value) => listener(&value),
                Job::Broadcast(listeners, value) => {
                    for listener in listeners {
                        listener(&value);
                    }
                }
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.shared.slot).listeners.len()
    }

    /// Async view of the slot. The receiver starts at the current value.
    pub fn watch(&self) -> watch::Receiver<Option<T>> {
        self.shared.tx.subscribe()
    }

    pub fn stream(&self) -> WatchStream<Option<T>> {
        WatchStream::new(self.watch())
    }

    /// Wait until the slot holds a value matching `pred` (checked against the
    /// current value first).
    pub async fn wait_for(&self, mut pred: impl FnMut(&T) -> bool) -> Option<T> {
        let mut rx = self.watch();
        let value = rx
            .wait_for(|v| v.as_ref().is_some_and(&mut pred))
            .await
            .ok()?
            .clone();
        value
    }
}

/// Registration returned by [`Observable::subscribe`]. Dropping it leaves the
/// callback registered; call [`Subscription::unsubscribe`] to stop listening.
pub struct Subscription<T> {
    id: u64,
    shared: Weak<Shared<T>>,
}

impl<T> Subscription<T> {
    pub fn unsubscribe(self) {
        if let Some(shared) = self.shared.upgrade() {
            lock(&shared.slot).listeners.retain(|(id, _)| *id != self.id);
        }
    }
}
