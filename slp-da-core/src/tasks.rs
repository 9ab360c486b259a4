//
// Copyright (c) The SLP Directory Agent Contributors
//
// SPDX-License-Identifier: MIT
//

//! Cooperative periodic tasks: unsolicited DAAdvert, the expiry purger,
//! and boot/shutdown advert emission (§4.5).
//!
//! `Task`/`IntervalTask` are a generalization of the teacher's
//! supervised-task handles: a tokio task plus a control channel the
//! owner can use to cancel or re-time it. Periodic tasks never touch
//! the cache directly; they call back into closures supplied by
//! [`crate::lifecycle`] so this module stays free of any particular
//! transport.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use derive_new::new;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task;
use tokio::time::{self, Instant};
use tracing::{Instrument, debug_span};

/// A handle to a spawned task. Dropping it cancels the task unless
/// [`Task::detach`] was called.
#[derive(Debug)]
pub struct Task<T> {
    join_handle: task::JoinHandle<T>,
    detached: bool,
}

impl<T> Task<T> {
    pub fn spawn<Fut>(future: Fut) -> Task<T>
    where
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        Task {
            join_handle: task::spawn(future),
            detached: false,
        }
    }

    pub fn detach(&mut self) {
        self.detached = true;
    }
}

impl<T> Future for Task<T> {
    type Output = Result<T, task::JoinError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut std::task::Context<'_>) -> std::task::Poll<Self::Output> {
        Pin::new(&mut self.join_handle).poll(cx)
    }
}

impl<T> Drop for Task<T> {
    fn drop(&mut self) {
        if !self.detached {
            self.join_handle.abort();
        }
    }
}

#[derive(Debug)]
enum Message {
    Reset(Option<Duration>),
}

/// A handle to a running interval task (unsolicited advert, purger).
/// Dropping it cancels the interval.
#[derive(Debug)]
pub struct IntervalTask {
    inner: IntervalTaskInner,
}

#[derive(Debug, new)]
struct IntervalTaskInner {
    _task: Task<()>,
    control: UnboundedSender<Message>,
    next: Arc<Mutex<Instant>>,
}

impl IntervalTask {
    /// Spawns a task that invokes `cb` every `interval`, starting
    /// immediately if `tick_on_start`, or after the first interval
    /// otherwise.
    pub fn new<F, Fut>(interval: Duration, tick_on_start: bool, mut cb: F) -> IntervalTask
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let (control_tx, mut control_rx) = mpsc::unbounded_channel();

        let next = Instant::now() + interval;
        let next = Arc::new(Mutex::new(next));
        let next_child = next.clone();

        let task = Task::spawn(
            async move {
                let mut interval_fut = if tick_on_start {
                    time::interval(interval)
                } else {
                    time::interval_at(Instant::now() + interval, interval)
                };

                loop {
                    tokio::select! {
                        _ = interval_fut.tick() => {
                            let next = Instant::now() + interval;
                            (cb)().await;
                            *next_child.lock().unwrap() = next;
                        }
                        message = control_rx.recv() => {
                            match message {
                                Some(Message::Reset(None)) => {
                                    interval_fut = time::interval(interval);
                                    *next_child.lock().unwrap() = Instant::now() + interval;
                                }
                                Some(Message::Reset(Some(new_interval))) => {
                                    interval_fut = time::interval(new_interval);
                                    *next_child.lock().unwrap() = Instant::now() + new_interval;
                                }
                                None => break,
                            }
                        }
                    }
                }
            }
            .in_current_span(),
        );

        IntervalTask {
            inner: IntervalTaskInner::new(task, control_tx, next),
        }
    }

    /// Re-times the interval, reusing the previous period if `period`
    /// is `None`.
    pub fn reset(&mut self, period: Option<Duration>) {
        if self.inner.control.send(Message::Reset(period)).is_err() {
            tracing::error!("failed to reset interval task");
        }
    }

    pub fn remaining(&self) -> Duration {
        self.inner
            .next
            .lock()
            .unwrap()
            .saturating_duration_since(Instant::now())
    }
}

/// Spawns the unsolicited-DAAdvert interval (§4.5). Returns `None` if
/// `period` is zero, meaning the feature is disabled (§6
/// `advertisementPeriod`).
pub fn unsolicited_advert<F, Fut>(period: Duration, cb: F) -> Option<IntervalTask>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    if period.is_zero() {
        return None;
    }
    let span = debug_span!("unsolicited_advert");
    let _guard = span.enter();
    Some(IntervalTask::new(period, false, cb))
}

/// Spawns the expiry-purge interval (§4.5). Returns `None` if `period`
/// is zero (§6 `expiredServicesPurgePeriod`).
pub fn purger<F, Fut>(period: Duration, cb: F) -> Option<IntervalTask>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    if period.is_zero() {
        return None;
    }
    let span = debug_span!("purger");
    let _guard = span.enter();
    Some(IntervalTask::new(period, false, cb))
}
