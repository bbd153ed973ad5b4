// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// RW semaphore state machine: get/delete/read_lock/write_lock/read_unlock/
// write_unlock, and the deletion drain procedure.
//
// The server is single-threaded and cooperatively dispatched: each handler
// runs to completion with no internal locking, and "blocking" a caller is
// realized by withholding its reply rather than by any language-level
// suspension (see design note on withheld-reply blocking). `get`, `delete`,
// `read_unlock` and `write_unlock` reply synchronously through their return
// value; `read_lock` and `write_lock` never do — they always deliver the
// caller's eventual status through `Transport::send`, immediately or later
// from some other client's unlock/delete.

use log::{debug, warn};

use super::error::{RwSemError, RwSemResult, StatusCode};
use super::table::{Endpoint, Key, SemTable, SlotState};

/// Delivers a one-word status message to a target endpoint.
///
/// Sends are best-effort: the core does not require delivery to succeed,
/// since the lock is considered granted or denied at the moment the state
/// table is updated, not at the moment the message is received.
pub trait Transport {
    fn send(&mut self, target: Endpoint, status: StatusCode);
}

/// The RW semaphore arbitration server.
///
/// Owns the slot table as an ordinary value — per design note, this must
/// not be modeled as a true global, so independent instances can be
/// constructed in tests.
pub struct RwSemServer {
    table: SemTable,
}

impl RwSemServer {
    pub fn new() -> Self {
        Self {
            table: SemTable::new(),
        }
    }

    pub fn live_count(&self) -> usize {
        self.table.live_count()
    }

    /// `RWSEMGET key -> id`. Never blocks, never sends unsolicited messages.
    pub fn get(&mut self, key: Key) -> RwSemResult<usize> {
        if let Some(id) = self.table.find_by_key(key) {
            debug!("rwsem get: key={key} hit existing id={id}");
            return Ok(id);
        }
        match self.table.allocate(key) {
            Ok(id) => {
                debug!("rwsem get: key={key} allocated id={id}");
                Ok(id)
            }
            Err(e) => {
                warn!("rwsem get: key={key} failed: {}", e.code_name());
                Err(e)
            }
        }
    }

    /// `RWSEMDEL id -> OK | error`.
    pub fn delete(&mut self, id: usize, transport: &mut dyn Transport) -> RwSemResult<()> {
        let Some(slot) = self.table.get_mut(id) else {
            return Err(RwSemError::ENoEnt);
        };
        if slot.state == SlotState::Closed {
            return Err(RwSemError::EIntr);
        }
        slot.state = SlotState::Closed;
        if self.table.get(id).unwrap().no_holders() {
            self.drain(id, transport);
        }
        Ok(())
    }

    /// `READ_LOCK id`. Always replies (or defers) via `transport`, never via
    /// a synchronous return value — see design note on withheld replies.
    pub fn read_lock(&mut self, caller: Endpoint, id: usize, transport: &mut dyn Transport) {
        let Some(slot) = self.table.get_mut(id) else {
            transport.send(caller, StatusCode::Err(RwSemError::ENoEnt));
            return;
        };
        if slot.state == SlotState::Closed {
            transport.send(caller, StatusCode::Err(RwSemError::EIntr));
            return;
        }
        // Writer-preference: a new reader may not jump a queued writer.
        if slot.writers_in == 0 && slot.writers_waiting.is_empty() {
            slot.readers_in += 1;
            transport.send(caller, StatusCode::Ok);
        } else if slot.readers_waiting.try_reserve(1).is_ok() {
            slot.readers_waiting.push_back(caller);
        } else {
            transport.send(caller, StatusCode::Err(RwSemError::ENoMem));
        }
    }

    /// `WRITE_LOCK id`. Always replies (or defers) via `transport`.
    pub fn write_lock(&mut self, caller: Endpoint, id: usize, transport: &mut dyn Transport) {
        let Some(slot) = self.table.get_mut(id) else {
            transport.send(caller, StatusCode::Err(RwSemError::ENoEnt));
            return;
        };
        if slot.state == SlotState::Closed {
            transport.send(caller, StatusCode::Err(RwSemError::EIntr));
            return;
        }
        if slot.no_holders() {
            slot.writers_in = 1;
            transport.send(caller, StatusCode::Ok);
        } else if slot.writers_waiting.try_reserve(1).is_ok() {
            slot.writers_waiting.push_back(caller);
        } else {
            transport.send(caller, StatusCode::Err(RwSemError::ENoMem));
        }
    }

    /// `READ_UNLOCK id -> OK | ENOENT | EPERM`.
    pub fn read_unlock(&mut self, id: usize, transport: &mut dyn Transport) -> RwSemResult<()> {
        let Some(slot) = self.table.get_mut(id) else {
            return Err(RwSemError::ENoEnt);
        };
        if slot.readers_in == 0 {
            return Err(RwSemError::EPerm);
        }
        slot.readers_in -= 1;

        if slot.state == SlotState::Closed {
            if self.table.get(id).unwrap().no_holders() {
                self.drain(id, transport);
            }
            return Ok(());
        }

        let slot = self.table.get_mut(id).unwrap();
        if slot.readers_in == 0 {
            if let Some(writer) = slot.writers_waiting.pop_front() {
                slot.writers_in = 1;
                transport.send(writer, StatusCode::Ok);
            }
        }
        Ok(())
    }

    /// `WRITE_UNLOCK id -> OK | ENOENT | EPERM`.
    pub fn write_unlock(&mut self, id: usize, transport: &mut dyn Transport) -> RwSemResult<()> {
        let Some(slot) = self.table.get_mut(id) else {
            return Err(RwSemError::ENoEnt);
        };
        if slot.writers_in == 0 {
            return Err(RwSemError::EPerm);
        }
        slot.writers_in = 0;

        if slot.state == SlotState::Closed {
            if self.table.get(id).unwrap().no_holders() {
                self.drain(id, transport);
            }
            return Ok(());
        }

        let slot = self.table.get_mut(id).unwrap();
        if !slot.readers_waiting.is_empty() {
            // Reader batch release: every reader queued at this instant is
            // granted, even if writers are also queued behind them.
            while let Some(reader) = slot.readers_waiting.pop_front() {
                slot.readers_in += 1;
                transport.send(reader, StatusCode::Ok);
            }
        } else if let Some(writer) = slot.writers_waiting.pop_front() {
            slot.writers_in = 1;
            transport.send(writer, StatusCode::Ok);
        }
        Ok(())
    }

    /// Precondition: slot `id` is `Closed` and holds no readers or writers.
    /// Wakes every queued endpoint with `EINTR` and returns the slot to `Free`.
    fn drain(&mut self, id: usize, transport: &mut dyn Transport) {
        let slot = self.table.get_mut(id).expect("drain: id must be valid");
        debug_assert_eq!(slot.state, SlotState::Closed);
        debug_assert!(slot.no_holders());

        while let Some(ep) = slot.readers_waiting.pop_front() {
            transport.send(ep, StatusCode::Err(RwSemError::EIntr));
        }
        while let Some(ep) = slot.writers_waiting.pop_front() {
            transport.send(ep, StatusCode::Err(RwSemError::EIntr));
        }
        self.table.reclaim(id);
        debug!("rwsem drain: id={id} reclaimed");
    }
}

impl Default for RwSemServer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rwsem::table::CAPACITY;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Vec<(Endpoint, StatusCode)>,
    }

    impl Transport for RecordingTransport {
        fn send(&mut self, target: Endpoint, status: StatusCode) {
            self.sent.push((target, status));
        }
    }

    #[test]
    fn basic_get_del_id_reuse() {
        let mut s = RwSemServer::new();
        let mut t = RecordingTransport::default();

        let id1 = s.get(7).unwrap();
        let id2 = s.get(7).unwrap();
        assert_eq!(id1, id2);

        s.delete(id1, &mut t).unwrap();
        assert_eq!(s.live_count(), 0);

        let id3 = s.get(7).unwrap();
        assert_eq!(id3, id1);
    }

    #[test]
    fn reader_writer_handoff() {
        let mut s = RwSemServer::new();
        let mut t = RecordingTransport::default();

        let id = s.get(1).unwrap();
        s.read_lock(100, id, &mut t); // R1 granted
        s.read_lock(101, id, &mut t); // R2 granted
        s.write_lock(200, id, &mut t); // W1 queued
        s.read_lock(102, id, &mut t); // R3 queued (writer preference)

        t.sent.clear();
        s.read_unlock(id, &mut t).unwrap(); // R1 out, readers_in still 1
        assert!(t.sent.is_empty());

        s.read_unlock(id, &mut t).unwrap(); // R2 out, readers_in reaches 0 -> W1 woken
        assert_eq!(t.sent, vec![(200, StatusCode::Ok)]);

        t.sent.clear();
        s.write_unlock(id, &mut t).unwrap(); // W1 out -> R3 woken
        assert_eq!(t.sent, vec![(102, StatusCode::Ok)]);
    }

    #[test]
    fn batch_reader_wake_on_write_unlock() {
        let mut s = RwSemServer::new();
        let mut t = RecordingTransport::default();

        let id = s.get(2).unwrap();
        s.write_lock(1, id, &mut t); // W1 holds
        s.read_lock(10, id, &mut t); // queued
        s.read_lock(11, id, &mut t); // queued
        s.read_lock(12, id, &mut t); // queued
        s.write_lock(2, id, &mut t); // W2 queued after readers

        t.sent.clear();
        s.write_unlock(id, &mut t).unwrap();
        assert_eq!(
            t.sent,
            vec![
                (10, StatusCode::Ok),
                (11, StatusCode::Ok),
                (12, StatusCode::Ok),
            ]
        );

        t.sent.clear();
        s.read_unlock(id, &mut t).unwrap();
        s.read_unlock(id, &mut t).unwrap();
        assert!(t.sent.is_empty());
        s.read_unlock(id, &mut t).unwrap();
        assert_eq!(t.sent, vec![(2, StatusCode::Ok)]);
    }

    #[test]
    fn delete_wakes_waiters_with_eintr() {
        let mut s = RwSemServer::new();
        let mut t = RecordingTransport::default();

        let id = s.get(3).unwrap();
        s.write_lock(1, id, &mut t); // W1 holds
        s.read_lock(10, id, &mut t); // queued
        s.write_lock(2, id, &mut t); // queued

        s.delete(id, &mut t).unwrap(); // stays CLOSED, W1 still holds

        t.sent.clear();
        s.write_unlock(id, &mut t).unwrap(); // drains queues, reclaims slot
        assert_eq!(
            t.sent,
            vec![
                (10, StatusCode::Err(RwSemError::EIntr)),
                (2, StatusCode::Err(RwSemError::EIntr)),
            ]
        );
        assert_eq!(s.live_count(), 0);
    }

    #[test]
    fn unlock_without_hold_is_eperm() {
        let mut s = RwSemServer::new();
        let mut t = RecordingTransport::default();

        let id = s.get(4).unwrap();
        assert_eq!(s.read_unlock(id, &mut t), Err(RwSemError::EPerm));
        assert_eq!(s.write_unlock(id, &mut t), Err(RwSemError::EPerm));
    }

    #[test]
    fn capacity_exhaustion_and_recovery() {
        let mut s = RwSemServer::new();
        let mut t = RecordingTransport::default();

        let mut ids = Vec::new();
        for k in 0..CAPACITY as Key {
            ids.push(s.get(k).unwrap());
        }
        assert_eq!(s.get(CAPACITY as Key), Err(RwSemError::EAgain));

        s.delete(ids[0], &mut t).unwrap();
        assert!(s.get(CAPACITY as Key).is_ok());
    }
}
