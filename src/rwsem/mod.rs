// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Reader-writer semaphore service: a fixed-capacity table of named RW locks
// arbitrated by a single-threaded, cooperatively dispatched state machine.
// See proto::rwsem_service for the wiring onto the shared-memory transport.

mod error;
mod server;
mod table;

pub use error::{RwSemError, RwSemResult, StatusCode};
pub use server::{RwSemServer, Transport};
pub use table::{Endpoint, Key, SlotState, CAPACITY};
