//! Background task ownership
//!
//! Timers started by the client (presence polling, event countdowns) must
//! never outlive the component that started them. [`TaskGuard`] owns the
//! `JoinHandle` and aborts the task when dropped, so every exit path
//! (early return, error, panic unwinding) releases it.

use std::future::Future;

use tokio::task::JoinHandle;

/// Aborts the wrapped task on drop
#[derive(Debug)]
pub struct TaskGuard {
    name: &'static str,
    handle: JoinHandle<()>,
}

impl TaskGuard {
    /// Spawn `future` on the current runtime and tie its lifetime to the guard
    pub fn spawn<F>(name: &'static str, future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::debug!("Starting {} task", name);
        Self {
            name,
            handle: tokio::spawn(future),
        }
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        if !self.handle.is_finished() {
            tracing::debug!("Stopping {} task", self.name);
        }
        self.handle.abort();
    }
}
