// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Pure Rust implementation of cpp-ipc shared memory primitives, plus a
// reader-writer semaphore arbitration server built on top of them.
// Binary-compatible with the C++ libipc library — same memory layout, same
// naming conventions, same POSIX/Win32 syscalls.

pub mod shm_name;

mod platform;

mod shm;
pub use shm::{ShmHandle, ShmOpenMode};

mod mutex;
pub use mutex::IpcMutex;

mod semaphore;
pub use semaphore::IpcSemaphore;

mod condition;
pub use condition::IpcCondition;

mod scoped_access;
pub use scoped_access::ScopedAccess;

mod spin_lock;
pub use spin_lock::SpinLock;

pub mod buffer;
pub use buffer::IpcBuffer;

pub mod circ;

mod chunk_storage;

pub mod channel;
pub use channel::{Channel, Mode, Route};

mod waiter;
pub use waiter::Waiter;

pub mod mem;
#[cfg(feature = "bump_alloc")]
pub use mem::BumpArena;
#[cfg(feature = "slab_pool")]
pub use mem::SlabPool;

pub mod proto;

pub mod rwsem;
pub use rwsem::{Endpoint, Key, RwSemError, RwSemServer, StatusCode, Transport, CAPACITY};
