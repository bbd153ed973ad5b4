// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Cross-platform named counting semaphore.
// Delegates to platform::PlatformSemaphore (POSIX sem_t or Win32 semaphore).

use std::io;

use crate::platform::PlatformSemaphore;

/// A named, inter-process counting semaphore.
///
/// On POSIX this is a `sem_t` stored in shared memory with
/// `pshared = 1`. On Windows this is a kernel named semaphore via
/// `CreateSemaphoreW`.
///
/// Binary-compatible with `ipc::sync::semaphore` from the C++ libipc library.
pub struct IpcSemaphore {
    inner: PlatformSemaphore,
}

impl IpcSemaphore {
    /// Open (or create) a named semaphore with the given initial count.
    pub fn open(name: &str, initial_count: u32) -> io::Result<Self> {
        let inner = PlatformSemaphore::open(name, initial_count)?;
        Ok(Self { inner })
    }

    /// Wait (decrement). If `timeout_ms` is `None`, blocks indefinitely.
    /// Returns `Ok(true)` if acquired, `Ok(false)` on timeout.
    pub fn wait(&self, timeout_ms: Option<u64>) -> io::Result<bool> {
        self.inner.wait(timeout_ms)
    }

    /// Post (increment) the semaphore `n` times.
    pub fn post(&self, n: u32) -> io::Result<()> {
        self.inner.post(n)
    }

    /// Remove the backing storage for a named semaphore (static helper).
    pub fn clear_storage(name: &str) {
        PlatformSemaphore::clear_storage(name);
    }
}
