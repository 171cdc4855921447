// SPDX-License-Identifier: MIT OR Apache-2.0
//! Reducer store with serialized dispatch and cancellable async actions.
//!
//! Every dispatch takes the same lock for reducer lookup and state
//! replacement. Readers get the current state as an `Arc` snapshot.
//!
//! Async actions are futures that may produce a follow-up action. At most
//! one is pending per store; it is polled once per [`Store::tick`] with a
//! noop waker and never wakes anything itself.

use futures::future::BoxFuture;
use futures::task::noop_waker_ref;
use parking_lot::Mutex;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No reducer handles the action type
    #[error("No reducer registered for {0}")]
    NoReducer(&'static str),

    /// The reducer rejected the action
    #[error("Action {action} failed: {message}")]
    Rejected {
        /// Action type name
        action: &'static str,
        /// Reducer error
        message: String,
    },

    /// A previous async action did not observe its cancellation
    #[error("An asynchronous operation is still pending")]
    OperationPending,
}

/// Token for cooperative cancellation of async actions.
///
/// Clone it into the action's future; the store cancels it when the action
/// is superseded.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new token
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been signaled
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Future completing once the token is cancelled.
    ///
    /// Only resolves when polled after [`cancel`](Self::cancel); the store
    /// polls pending actions every tick.
    pub fn cancelled(&self) -> impl Future<Output = ()> + Send + Unpin + 'static {
        let token = self.clone();
        futures::future::poll_fn(move |_| {
            if token.is_cancelled() {
                Poll::Ready(())
            } else {
                Poll::Pending
            }
        })
    }
}

/// A type-erased action, as produced by async actions
pub struct BoxedAction {
    type_id: TypeId,
    name: &'static str,
    payload: Box<dyn Any + Send>,
}

impl BoxedAction {
    /// Erase an action
    pub fn new<A: Send + 'static>(action: A) -> Self {
        Self {
            type_id: TypeId::of::<A>(),
            name: std::any::type_name::<A>(),
            payload: Box::new(action),
        }
    }

    /// Action type name
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl std::fmt::Debug for BoxedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("BoxedAction").field(&self.name).finish()
    }
}

/// Future of an async action
pub type AsyncAction = BoxFuture<'static, Option<BoxedAction>>;

/// What a tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStatus {
    /// Nothing was pending
    Idle,
    /// The pending action is still waiting
    Pending,
    /// The pending action finished and its follow-up was applied
    Applied,
    /// The pending action finished without a follow-up
    Finished,
}

type Reducer<S> = Box<dyn Fn(&S, Box<dyn Any + Send>) -> Result<S, String> + Send + Sync>;

struct Pending {
    token: CancellationToken,
    future: AsyncAction,
}

struct Inner<S> {
    state: Arc<S>,
    reducers: HashMap<TypeId, Reducer<S>>,
    pending: Option<Pending>,
    version: u64,
}

impl<S> Inner<S> {
    fn apply(&mut self, type_id: TypeId, name: &'static str, payload: Box<dyn Any + Send>) -> Result<(), StoreError> {
        let reducer = self.reducers.get(&type_id).ok_or(StoreError::NoReducer(name))?;
        match reducer(&self.state, payload) {
            Ok(next) => {
                self.state = Arc::new(next);
                self.version += 1;
                tracing::debug!(action = name, version = self.version, "Action applied");
                Ok(())
            }
            Err(message) => {
                tracing::warn!(action = name, "Action rejected: {message}");
                Err(StoreError::Rejected { action: name, message })
            }
        }
    }

    fn poll_pending(&mut self) -> Poll<Option<BoxedAction>> {
        let Some(pending) = self.pending.as_mut() else {
            return Poll::Ready(None);
        };
        let mut cx = Context::from_waker(noop_waker_ref());
        let poll = pending.future.as_mut().poll(&mut cx);
        if poll.is_ready() {
            self.pending = None;
        }
        poll
    }
}

/// Reducer store holding a state of type `S`
pub struct Store<S> {
    inner: Mutex<Inner<S>>,
}

impl<S: Send + Sync + 'static> Store<S> {
    /// Store with an initial state and no reducers
    pub fn new(state: S) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: Arc::new(state),
                reducers: HashMap::new(),
                pending: None,
                version: 0,
            }),
        }
    }

    /// Register the reducer for action type `A`.
    ///
    /// # Panics
    ///
    /// Panics if a reducer for `A` is already registered.
    pub fn register<A, F, E>(&self, reducer: F)
    where
        A: Send + 'static,
        F: Fn(&S, A) -> Result<S, E> + Send + Sync + 'static,
        E: std::fmt::Display,
    {
        let mut inner = self.inner.lock();
        let type_id = TypeId::of::<A>();
        assert!(
            !inner.reducers.contains_key(&type_id),
            "Reducer already registered for {}",
            std::any::type_name::<A>()
        );
        let erased: Reducer<S> = Box::new(move |state, payload| match payload.downcast::<A>() {
            Ok(action) => reducer(state, *action).map_err(|e| e.to_string()),
            Err(_) => Err(format!("Payload is not a {}", std::any::type_name::<A>())),
        });
        inner.reducers.insert(type_id, erased);
    }

    /// Current state snapshot
    pub fn state(&self) -> Arc<S> {
        Arc::clone(&self.inner.lock().state)
    }

    /// Number of applied actions
    pub fn version(&self) -> u64 {
        self.inner.lock().version
    }

    /// Apply an action through its reducer
    pub fn dispatch<A: Send + 'static>(&self, action: A) -> Result<(), StoreError> {
        self.dispatch_boxed(BoxedAction::new(action))
    }

    /// Apply a type-erased action
    pub fn dispatch_boxed(&self, action: BoxedAction) -> Result<(), StoreError> {
        self.inner.lock().apply(action.type_id, action.name, action.payload)
    }

    /// Start an async action, cancelling the pending one.
    ///
    /// The previous action gets one poll to observe its cancellation; if it
    /// is still pending afterwards it stays in place and this dispatch fails
    /// with [`StoreError::OperationPending`].
    pub fn dispatch_cancellable<F, Fut>(&self, start: F) -> Result<CancellationToken, StoreError>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Option<BoxedAction>> + Send + 'static,
    {
        let mut inner = self.inner.lock();
        if let Some(previous) = inner.pending.as_ref() {
            previous.token.cancel();
            if inner.poll_pending().is_pending() {
                tracing::warn!("Previous asynchronous action ignored its cancellation");
                return Err(StoreError::OperationPending);
            }
            tracing::debug!("Previous asynchronous action cancelled");
        }

        let token = CancellationToken::new();
        inner.pending = Some(Pending {
            token: token.clone(),
            future: Box::pin(start(token.clone())),
        });
        Ok(token)
    }

    /// Whether an async action is pending
    pub fn has_pending(&self) -> bool {
        self.inner.lock().pending.is_some()
    }

    /// Cancel the pending async action, if any; it finishes on a later tick
    pub fn cancel_pending(&self) {
        if let Some(pending) = self.inner.lock().pending.as_ref() {
            pending.token.cancel();
        }
    }

    /// Poll the pending async action once and apply its follow-up
    pub fn tick(&self) -> Result<TickStatus, StoreError> {
        let mut inner = self.inner.lock();
        if inner.pending.is_none() {
            return Ok(TickStatus::Idle);
        }
        match inner.poll_pending() {
            Poll::Pending => Ok(TickStatus::Pending),
            Poll::Ready(None) => Ok(TickStatus::Finished),
            Poll::Ready(Some(action)) => {
                inner.apply(action.type_id, action.name, action.payload)?;
                Ok(TickStatus::Applied)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Increment(i32);
    struct Fail;

    fn counter() -> Store<i32> {
        let store = Store::new(0);
        store.register(|state: &i32, Increment(by): Increment| Ok::<_, String>(state + by));
        store.register(|_: &i32, _: Fail| Err::<i32, _>("nope"));
        store
    }

    #[test]
    fn test_dispatch_replaces_state() {
        let store = counter();
        let before = store.state();
        store.dispatch(Increment(2)).unwrap();
        store.dispatch(Increment(3)).unwrap();
        assert_eq!(*store.state(), 5);
        assert_eq!(*before, 0);
        assert_eq!(store.version(), 2);
    }

    #[test]
    fn test_rejected_action_keeps_state() {
        let store = counter();
        store.dispatch(Increment(1)).unwrap();
        let err = store.dispatch(Fail).unwrap_err();
        assert!(matches!(err, StoreError::Rejected { .. }));
        assert_eq!(*store.state(), 1);
        assert!(matches!(store.dispatch("unknown"), Err(StoreError::NoReducer(_))));
    }

    #[test]
    #[should_panic(expected = "Reducer already registered")]
    fn test_duplicate_reducer_panics() {
        let store = counter();
        store.register(|state: &i32, Increment(by): Increment| Ok::<_, String>(state - by));
    }

    #[test]
    fn test_async_action_applies_on_tick() {
        let store = counter();
        let (tx, rx) = tokio::sync::oneshot::channel::<i32>();
        store
            .dispatch_cancellable(|_| async move { rx.await.ok().map(|by| BoxedAction::new(Increment(by))) })
            .unwrap();

        assert_eq!(store.tick().unwrap(), TickStatus::Pending);
        tx.send(4).unwrap();
        assert_eq!(*store.state(), 0);
        assert_eq!(store.tick().unwrap(), TickStatus::Applied);
        assert_eq!(*store.state(), 4);
        assert_eq!(store.tick().unwrap(), TickStatus::Idle);
    }

    #[test]
    fn test_new_async_action_cancels_previous() {
        let store = counter();
        let first = store
            .dispatch_cancellable(|token| async move {
                token.cancelled().await;
                None
            })
            .unwrap();
        assert_eq!(store.tick().unwrap(), TickStatus::Pending);

        store
            .dispatch_cancellable(|_| async { Some(BoxedAction::new(Increment(1))) })
            .unwrap();
        assert!(first.is_cancelled());
        assert_eq!(store.tick().unwrap(), TickStatus::Applied);
        assert_eq!(*store.state(), 1);
    }

    #[test]
    fn test_stubborn_action_blocks_dispatch() {
        let store = counter();
        store
            .dispatch_cancellable(|_| futures::future::pending::<Option<BoxedAction>>())
            .unwrap();
        let err = store
            .dispatch_cancellable(|_| async { None })
            .unwrap_err();
        assert!(matches!(err, StoreError::OperationPending));
        assert!(store.has_pending());
    }
}
