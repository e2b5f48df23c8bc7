//! Action handles and status lookup
//!
//! Every orchestrated action is assigned a strictly increasing sequence id
//! and returns an [`ActionHandle`]: a future of the eventual result,
//! tagged with that id. The id is readable before the action completes,
//! so in-flight actions can be observed through the status registry while
//! the handle is still pending.

use crate::error::StoreError;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

type BoxedResult<T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send>>;

/// A pending orchestrated action: sequence id plus result future
///
/// Await the handle for the action's result; use [`ActionHandle::id`] (or
/// pass the handle to a status lookup) to observe its lifecycle state in
/// the meantime. There is no cancellation: dropping the handle abandons
/// the result but the action's store writes may still have happened.
pub struct ActionHandle<T> {
    id: u64,
    future: BoxedResult<T>,
}

impl<T> ActionHandle<T> {
    pub(crate) fn new(id: u64, future: BoxedResult<T>) -> Self {
        Self { id, future }
    }

    /// The action's sequence id
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }
}

impl<T> Future for ActionHandle<T> {
    type Output = Result<T, StoreError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.get_mut().future.as_mut().poll(cx)
    }
}

impl<T> std::fmt::Debug for ActionHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionHandle").field("id", &self.id).finish()
    }
}

/// Anything a status lookup accepts: a raw sequence id or an action handle
pub trait AsActionId {
    /// The sequence id to look up
    fn action_id(&self) -> u64;
}

impl AsActionId for u64 {
    fn action_id(&self) -> u64 {
        *self
    }
}

impl<T> AsActionId for ActionHandle<T> {
    fn action_id(&self) -> u64 {
        self.id
    }
}

impl<T: AsActionId + ?Sized> AsActionId for &T {
    fn action_id(&self) -> u64 {
        (**self).action_id()
    }
}
