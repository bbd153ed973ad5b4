// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Fixed-capacity slot table for the RW semaphore service.
//
// Structurally this mirrors proto::service_registry's RegistryData: a
// bounded array scanned linearly by key, with stale/closed slots reclaimed
// back to the free pool. Unlike the registry there is no shared-memory
// backing here — the table is private, in-process state owned by the
// single-threaded dispatch loop (see design note on global mutable state).

use std::collections::VecDeque;

use super::error::RwSemError;

/// Opaque client-process identifier, supplied by the transport and not
/// otherwise interpreted here.
pub type Endpoint = u64;

/// Caller-supplied integer naming a semaphore across processes.
pub type Key = i64;

/// Number of semaphores that may exist simultaneously.
pub const CAPACITY: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Free,
    Active,
    Closed,
}

/// One semaphore slot. See invariants 1-7 in the data model.
#[derive(Debug, Clone)]
pub struct SemRecord {
    pub state: SlotState,
    pub key: Key,
    pub id: usize,
    pub readers_in: u32,
    pub writers_in: u32,
    pub readers_waiting: VecDeque<Endpoint>,
    pub writers_waiting: VecDeque<Endpoint>,
}

impl SemRecord {
    fn free(id: usize) -> Self {
        Self {
            state: SlotState::Free,
            key: 0,
            id,
            readers_in: 0,
            writers_in: 0,
            readers_waiting: VecDeque::new(),
            writers_waiting: VecDeque::new(),
        }
    }

    /// `true` once neither a reader nor a writer still holds the lock.
    pub fn no_holders(&self) -> bool {
        self.readers_in == 0 && self.writers_in == 0
    }
}

/// The slot table: key -> slot lookup and free-slot allocation.
///
/// Allocation uses a rotating cursor (`next_slot`) rather than always
/// scanning from index 0, so that id reuse is spread across the table —
/// preserved per design note, not required for correctness.
pub struct SemTable {
    slots: Vec<SemRecord>,
    next_slot: usize,
    live_count: usize,
}

impl SemTable {
    pub fn new() -> Self {
        let slots = (0..CAPACITY).map(SemRecord::free).collect();
        Self {
            slots,
            next_slot: 0,
            live_count: 0,
        }
    }

    pub fn live_count(&self) -> usize {
        self.live_count
    }

    /// Slot for `id`, if the id is in range and the slot is not `Free`.
    pub fn get(&self, id: usize) -> Option<&SemRecord> {
        self.slots
            .get(id)
            .filter(|s| s.state != SlotState::Free)
    }

    pub fn get_mut(&mut self, id: usize) -> Option<&mut SemRecord> {
        self.slots
            .get_mut(id)
            .filter(|s| s.state != SlotState::Free)
    }

    /// Find a non-`Free` slot registered under `key`.
    pub fn find_by_key(&self, key: Key) -> Option<usize> {
        self.slots
            .iter()
            .find(|s| s.state != SlotState::Free && s.key == key)
            .map(|s| s.id)
    }

    /// Allocate a fresh slot for `key` via the rotating cursor.
    /// Fails with `EAgain` if the table is already at capacity.
    pub fn allocate(&mut self, key: Key) -> Result<usize, RwSemError> {
        if self.live_count >= CAPACITY {
            return Err(RwSemError::EAgain);
        }
        let start = self.next_slot;
        loop {
            let idx = self.next_slot;
            self.next_slot = (self.next_slot + 1) % CAPACITY;
            if self.slots[idx].state == SlotState::Free {
                let slot = &mut self.slots[idx];
                slot.state = SlotState::Active;
                slot.key = key;
                slot.readers_in = 0;
                slot.writers_in = 0;
                debug_assert!(slot.readers_waiting.is_empty());
                debug_assert!(slot.writers_waiting.is_empty());
                self.live_count += 1;
                return Ok(idx);
            }
            // live_count < CAPACITY guarantees this terminates before a
            // full revolution; this assert catches a live_count bug early.
            debug_assert_ne!(self.next_slot, start, "no free slot despite live_count < CAPACITY");
        }
    }

    /// Reclaim a `Closed`, now-empty slot back to `Free`.
    pub fn reclaim(&mut self, id: usize) {
        let slot = &mut self.slots[id];
        debug_assert_eq!(slot.state, SlotState::Closed);
        debug_assert!(slot.no_holders());
        debug_assert!(slot.readers_waiting.is_empty());
        debug_assert!(slot.writers_waiting.is_empty());
        *slot = SemRecord::free(id);
        self.live_count -= 1;
    }
}

impl Default for SemTable {
    fn default() -> Self {
        Self::new()
    }
}
