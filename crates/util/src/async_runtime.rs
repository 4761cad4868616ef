//! Async runtime helpers for blocking callers.
//!
//! The schema store is synchronous, while registry and plugin I/O is async.
//! These helpers drive futures to completion from synchronous code paths,
//! reusing the current Tokio runtime when that is safe to do.

use std::future::Future;
use std::io;
use std::panic;

use tokio::runtime::{Builder, Handle, Runtime, RuntimeFlavor};
use tokio::task;

/// Execute an async future from synchronous code.
///
/// # Notes
/// - Reuses the current runtime when it is a multi-thread runtime.
/// - Inside a current-thread runtime, the future runs on a scoped helper
///   thread with its own runtime so the caller's runtime is never blocked re-entrantly.
/// - Falls back to a single-threaded runtime for call sites outside Tokio.
pub fn block_on_future<F, T, E>(future: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>> + Send,
    T: Send,
    E: From<io::Error> + Send,
{
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            task::block_in_place(|| handle.block_on(future))
        }
        Ok(_) => on_helper_thread(|| run_on_fresh_runtime(future)),
        Err(_) => run_on_fresh_runtime(future),
    }
}

fn run_on_fresh_runtime<F, T, E>(future: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<io::Error>,
{
    Builder::new_current_thread().enable_all().build()?.block_on(future)
}

fn on_helper_thread<R: Send>(work: impl FnOnce() -> R + Send) -> R {
    std::thread::scope(|scope| match scope.spawn(work).join() {
        Ok(value) => value,
        Err(payload) => panic::resume_unwind(payload),
    })
}

/// A dedicated runtime owned by one long-lived connection.
///
/// Plugin connections keep their child process, stderr forwarder and gRPC
/// channel alive across calls, so they need a runtime that outlives any single
/// `block_on`. Dropping the runtime (or calling [`OwnedRuntime::shutdown`])
/// stops every task spawned on it without waiting.
#[derive(Debug)]
pub struct OwnedRuntime {
    runtime: Option<Runtime>,
}

impl OwnedRuntime {
    /// Build a multi-thread runtime with a single worker.
    pub fn new(thread_name: &str) -> io::Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name(thread_name)
            .enable_all()
            .build()?;
        Ok(Self { runtime: Some(runtime) })
    }

    /// Handle for spawning background tasks; `None` after shutdown.
    pub fn handle(&self) -> Option<Handle> {
        self.runtime.as_ref().map(|runtime| runtime.handle().clone())
    }

    pub fn is_running(&self) -> bool {
        self.runtime.is_some()
    }

    /// Drive `future` to completion on this runtime.
    ///
    /// Returns an error when the runtime has already been shut down.
    pub fn block_on<F>(&self, future: F) -> io::Result<F::Output>
    where
        F: Future + Send,
        F::Output: Send,
    {
        let Some(runtime) = self.runtime.as_ref() else {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "runtime has been shut down"));
        };
        let output = match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                task::block_in_place(|| runtime.block_on(future))
            }
            Ok(_) => on_helper_thread(|| runtime.block_on(future)),
            Err(_) => runtime.block_on(future),
        };
        Ok(output)
    }

    /// Stop the runtime without waiting for spawned tasks. Idempotent.
    pub fn shutdown(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

impl Drop for OwnedRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}
