//! Bridge from the synchronous provider traits to async HTTP calls.

use std::future::Future;

use tokio::runtime::{Builder, Handle, Runtime, RuntimeFlavor};

/// Owned single-threaded Tokio runtime reused across provider calls.
///
/// When called from outside any Tokio runtime, futures run on the stored
/// runtime. When called from within a multi-threaded runtime (detected via
/// [`Handle::try_current`] and [`RuntimeFlavor::MultiThread`]), the caller's
/// runtime drives the future inside [`tokio::task::block_in_place`] so no
/// nested runtime is entered.
///
/// Inside a `current_thread` runtime the stored runtime is used instead. This
/// blocks the caller's runtime for the duration of the request and may
/// deadlock if that runtime drives IO the request depends on.
pub(crate) struct BlockingRuntime {
    runtime: Runtime,
}

impl std::fmt::Debug for BlockingRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingRuntime")
            .field("runtime", &"<tokio::runtime::Runtime>")
            .finish()
    }
}

impl BlockingRuntime {
    pub(crate) fn new() -> std::io::Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self { runtime })
    }

    /// Run `future` to completion on whichever runtime can safely block.
    pub(crate) fn block_on<F: Future>(&self, future: F) -> F::Output {
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| handle.block_on(future))
            }
            _ => self.runtime.block_on(future),
        }
    }
}
