/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Coalescing of concurrent loads.
//!
//! A [`RefreshCell`] is either idle or refreshing. The first caller of [`RefreshCell::run`]
//! while idle starts the load; every caller that arrives while the load is in flight is queued
//! and receives a clone of the same result, in arrival order, once the load completes. The
//! queue is taken and the cell returned to idle before any result is delivered, so a caller that
//! immediately runs again starts a new load.
//!
//! If the caller that started a load is dropped before the load completes, the cell goes back
//! to idle and the queued callers start over; one of them becomes the new initiator.

use std::future::Future;
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tracing::trace;

enum State<T> {
    Idle,
    Refreshing(Vec<oneshot::Sender<T>>),
}

enum Role<T> {
    Initiator,
    Waiter(oneshot::Receiver<T>),
}

/// Runs at most one load at a time and shares its result with every concurrent caller.
pub struct RefreshCell<T> {
    state: Arc<Mutex<State<T>>>,
}

impl<T> Clone for RefreshCell<T> {
    fn clone(&self) -> Self {
        RefreshCell {
            state: self.state.clone(),
        }
    }
}

impl<T> Default for RefreshCell<T> {
    fn default() -> Self {
        RefreshCell {
            state: Arc::new(Mutex::new(State::Idle)),
        }
    }
}

impl<T> std::fmt::Debug for RefreshCell<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCell")
            .field("refreshing", &self.is_refreshing())
            .finish()
    }
}

impl<T: Clone> RefreshCell<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `load`, or waits for the load already in flight.
    pub async fn run<F, Fut>(&self, load: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        loop {
            let receiver = match self.join() {
                Role::Initiator => break,
                Role::Waiter(receiver) => receiver,
            };
            match receiver.await {
                Ok(result) => return result,
                Err(_) => trace!("in-flight load was cancelled; starting over"),
            }
        }
        let mut in_flight = InFlight {
            cell: self,
            completed: false,
        };
        let result = load().await;
        in_flight.complete(&result);
        result
    }

    /// Number of callers waiting on the load in flight.
    pub fn waiting(&self) -> usize {
        match &*self.state() {
            State::Idle => 0,
            State::Refreshing(waiters) => waiters.len(),
        }
    }
}

impl<T> RefreshCell<T> {
    pub fn is_refreshing(&self) -> bool {
        matches!(&*self.state(), State::Refreshing(_))
    }

    fn state(&self) -> MutexGuard<'_, State<T>> {
        // The lock is never held across user code, so a poisoned lock still holds a valid state.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn join(&self) -> Role<T> {
        let mut state = self.state();
        match &mut *state {
            State::Idle => {
                *state = State::Refreshing(Vec::new());
                Role::Initiator
            }
            State::Refreshing(waiters) => {
                let (sender, receiver) = oneshot::channel();
                waiters.push(sender);
                trace!(waiting = waiters.len(), "joined in-flight load");
                Role::Waiter(receiver)
            }
        }
    }

    fn take_waiters(&self) -> Vec<oneshot::Sender<T>> {
        match mem::replace(&mut *self.state(), State::Idle) {
            State::Refreshing(waiters) => waiters,
            State::Idle => Vec::new(),
        }
    }
}

struct InFlight<'a, T> {
    cell: &'a RefreshCell<T>,
    completed: bool,
}

impl<T: Clone> InFlight<'_, T> {
    fn complete(&mut self, result: &T) {
        self.completed = true;
        for waiter in self.cell.take_waiters() {
            // A waiter that went away no longer needs the result.
            let _ = waiter.send(result.clone());
        }
    }
}

impl<T> Drop for InFlight<'_, T> {
    fn drop(&mut self) {
        if !self.completed {
            // Dropping the senders wakes every waiter with a cancellation.
            drop(self.cell.take_waiters());
        }
    }
}
