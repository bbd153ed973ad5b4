// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Error taxonomy for the RW semaphore service.

use thiserror::Error;

/// Status codes exchanged between the RW semaphore service and its callers.
///
/// These map directly onto the one-word reply messages sent over the
/// transport (§6/§7 of the service contract): every handler either returns
/// one of these or sends one to a woken client, never both.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RwSemError {
    /// The slot table is full; no free slot for a new key.
    #[error("rwsem table exhausted")]
    EAgain,
    /// The id does not name a live slot.
    #[error("unknown or freed semaphore id")]
    ENoEnt,
    /// Unlock attempted while the corresponding count was already zero.
    #[error("unlock without a matching lock held")]
    EPerm,
    /// The semaphore was deleted while the caller was queued or is closed.
    #[error("semaphore deleted")]
    EIntr,
    /// Wait-queue node allocation failed.
    #[error("out of memory enqueueing waiter")]
    ENoMem,
    /// Client-wrapper boundary error: the IPC server could not be located.
    /// Never produced by the core itself.
    #[error("rwsem service not available")]
    ENoSys,
}

impl RwSemError {
    /// The symbolic code name, as sent over the wire and as used in logs.
    pub fn code_name(self) -> &'static str {
        match self {
            RwSemError::EAgain => "EAGAIN",
            RwSemError::ENoEnt => "ENOENT",
            RwSemError::EPerm => "EPERM",
            RwSemError::EIntr => "EINTR",
            RwSemError::ENoMem => "ENOMEM",
            RwSemError::ENoSys => "ENOSYS",
        }
    }
}

/// A one-word reply, `OK` or one of [`RwSemError`]'s codes.
pub type RwSemResult<T> = Result<T, RwSemError>;

/// The wire-level status a handler returns or sends: success carries no
/// payload other than `OK`, failure carries the specific error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok,
    Err(RwSemError),
}

impl StatusCode {
    pub fn code_name(self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Err(e) => e.code_name(),
        }
    }
}

impl From<RwSemResult<()>> for StatusCode {
    fn from(r: RwSemResult<()>) -> Self {
        match r {
            Ok(()) => StatusCode::Ok,
            Err(e) => StatusCode::Err(e),
        }
    }
}
