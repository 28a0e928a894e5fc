// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Background execution of passes.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::SyncError;
use crate::local::LocalCollection;
use crate::manager::SyncManager;
use crate::remote::RemoteCollection;
use crate::report::SyncReport;

/// Runs passes on tokio tasks.
///
/// Passes for the same collection URL wait for each other; passes for
/// different collections run concurrently.
#[derive(Debug, Clone, Default)]
pub struct SyncWorker {
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl SyncWorker {
    /// Creates a worker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a pass in the background.
    ///
    /// Must be called within a tokio runtime.
    pub fn spawn<L, R>(&self, manager: Arc<SyncManager<L, R>>) -> SyncHandle
    where
        L: LocalCollection + 'static,
        R: RemoteCollection + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let locks = Arc::clone(&self.locks);
        let key = manager.local().url().unwrap_or_default();

        let task = tokio::spawn(async move {
            let lock = {
                let mut locks = locks.lock().await;
                Arc::clone(locks.entry(key.clone()).or_default())
            };

            let _guard = tokio::select! {
                biased;
                () = token.cancelled() => return Err(SyncError::Cancelled),
                guard = lock.lock_owned() => guard,
            };

            tracing::debug!(url = key, "starting synchronization");
            manager.synchronize(&token).await
        });

        SyncHandle { task, cancel }
    }
}

/// A running pass. Await it for the result.
#[derive(Debug)]
pub struct SyncHandle {
    task: JoinHandle<Result<SyncReport, SyncError>>,
    cancel: CancellationToken,
}

impl SyncHandle {
    /// Requests cooperative cancellation. The pass stops at the next phase or
    /// item boundary, dropping any request in flight, and stores nothing.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A token cancelling this pass, e.g. to hand to a signal handler.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Whether the pass has ended.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Future for SyncHandle {
    type Output = Result<SyncReport, SyncError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.task).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(e)) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Poll::Ready(Err(_)) => Poll::Ready(Err(SyncError::Cancelled)),
        }
    }
}
