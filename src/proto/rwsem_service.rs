// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Wires `rwsem::RwSemServer` onto the shared-memory channel transport.
//
// This module is the interface edge the core state machine is specified
// against but does not itself implement: a dispatch loop that receives one
// request per turn, and a per-endpoint reply path used both for synchronous
// replies (GET/DEL/UNLOCK) and for the asynchronous "granted"/"EINTR"
// messages the core sends on its own initiative (LOCK calls, and any wakeup
// triggered by someone else's unlock or delete).

use std::collections::HashMap;
use std::io;

use log::{trace, warn};

use crate::channel::{Channel, Mode};
use crate::rwsem::{Endpoint, Key, RwSemError, RwSemServer, StatusCode, Transport};

/// Call codes from the request/response contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallCode {
    RwsemGet,
    RwsemDel,
    ReadLock,
    ReadUnlock,
    WriteLock,
    WriteUnlock,
}

impl CallCode {
    fn from_u8(b: u8) -> Option<Self> {
        match b {
            0 => Some(CallCode::RwsemGet),
            1 => Some(CallCode::RwsemDel),
            2 => Some(CallCode::ReadLock),
            3 => Some(CallCode::ReadUnlock),
            4 => Some(CallCode::WriteLock),
            5 => Some(CallCode::WriteUnlock),
            _ => None,
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            CallCode::RwsemGet => 0,
            CallCode::RwsemDel => 1,
            CallCode::ReadLock => 2,
            CallCode::ReadUnlock => 3,
            CallCode::WriteLock => 4,
            CallCode::WriteUnlock => 5,
        }
    }
}

/// One inbound request: a call code, the caller's endpoint, and a single
/// integer argument (a `key` for GET, an `id` for everything else).
#[derive(Debug, Clone, Copy)]
pub struct RequestWire {
    pub call: CallCode,
    pub endpoint: Endpoint,
    pub arg: i64,
}

const REQUEST_LEN: usize = 1 + 8 + 8;

impl RequestWire {
    pub fn encode(&self) -> [u8; REQUEST_LEN] {
        let mut out = [0u8; REQUEST_LEN];
        out[0] = self.call.to_u8();
        out[1..9].copy_from_slice(&self.endpoint.to_le_bytes());
        out[9..17].copy_from_slice(&self.arg.to_le_bytes());
        out
    }

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < REQUEST_LEN {
            return None;
        }
        let call = CallCode::from_u8(bytes[0])?;
        let endpoint = Endpoint::from_le_bytes(bytes[1..9].try_into().ok()?);
        let arg = i64::from_le_bytes(bytes[9..17].try_into().ok()?);
        Some(Self { call, endpoint, arg })
    }
}

/// One reply: success carries an optional payload (the slot id on a
/// successful GET); failure carries the error code.
#[derive(Debug, Clone, Copy)]
pub struct ReplyWire {
    pub status: StatusCode,
    pub payload: i64,
}

const REPLY_LEN: usize = 1 + 1 + 8;

impl ReplyWire {
    fn status_byte(status: StatusCode) -> u8 {
        match status {
            StatusCode::Ok => 0,
            StatusCode::Err(RwSemError::EAgain) => 1,
            StatusCode::Err(RwSemError::ENoEnt) => 2,
            StatusCode::Err(RwSemError::EPerm) => 3,
            StatusCode::Err(RwSemError::EIntr) => 4,
            StatusCode::Err(RwSemError::ENoMem) => 5,
            StatusCode::Err(RwSemError::ENoSys) => 6,
        }
    }

    pub fn encode(&self) -> [u8; REPLY_LEN] {
        let mut out = [0u8; REPLY_LEN];
        out[0] = 1;
        out[1] = Self::status_byte(self.status);
        out[2..10].copy_from_slice(&self.payload.to_le_bytes());
        out
    }
}

/// Per-endpoint reply channels, opened lazily on first send.
///
/// Implements [`rwsem::Transport`]: sends triggered by the core itself
/// (lock grants, drain's `EINTR` sweep) go out the same way as the
/// dispatch loop's own synchronous replies.
struct ChannelTransport {
    prefix: String,
    replies: HashMap<Endpoint, Channel>,
}

impl ChannelTransport {
    fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            replies: HashMap::new(),
        }
    }

    fn reply_channel(&mut self, target: Endpoint) -> io::Result<&mut Channel> {
        if !self.replies.contains_key(&target) {
            let name = format!("{}rwsem_reply_{target}", self.prefix);
            let chan = Channel::connect(&name, Mode::Sender)?;
            self.replies.insert(target, chan);
        }
        Ok(self.replies.get_mut(&target).unwrap())
    }

    fn send_wire(&mut self, target: Endpoint, wire: ReplyWire) {
        match self.reply_channel(target) {
            Ok(chan) => match chan.try_send(&wire.encode()) {
                Ok(true) => {}
                Ok(false) => trace!("rwsem reply to endpoint {target} dropped (not receiving)"),
                Err(e) => warn!("rwsem reply to endpoint {target} failed: {e}"),
            },
            Err(e) => warn!("rwsem reply channel for endpoint {target} unavailable: {e}"),
        }
    }
}

impl Transport for ChannelTransport {
    fn send(&mut self, target: Endpoint, status: StatusCode) {
        trace!("rwsem send: target={target} status={}", status.code_name());
        self.send_wire(target, ReplyWire { status, payload: 0 });
    }
}

/// The dispatch loop: one `RwSemServer` plus the channel it listens for
/// requests on.
pub struct RwSemService {
    server: RwSemServer,
    requests: Channel,
    transport: ChannelTransport,
}

impl RwSemService {
    /// Open the request channel `name` as a receiver and start a fresh,
    /// empty slot table.
    pub fn open(name: &str) -> io::Result<Self> {
        let requests = Channel::connect(name, Mode::Receiver)?;
        Ok(Self {
            server: RwSemServer::new(),
            requests,
            transport: ChannelTransport::new(""),
        })
    }

    /// Receive and dispatch one request. Blocks up to `timeout_ms`
    /// (`None` = forever). Returns `Ok(false)` on timeout with no message.
    pub fn run_once(&mut self, timeout_ms: Option<u64>) -> io::Result<bool> {
        let buf = self.requests.recv(timeout_ms)?;
        if buf.is_empty() {
            return Ok(false);
        }
        let Some(req) = RequestWire::decode(buf.data()) else {
            warn!("rwsem: dropped malformed request ({} bytes)", buf.len());
            return Ok(true);
        };
        self.dispatch(req);
        Ok(true)
    }

    fn dispatch(&mut self, req: RequestWire) {
        match req.call {
            CallCode::RwsemGet => {
                let result = self.server.get(req.arg as Key);
                self.reply_get(req.endpoint, result);
            }
            CallCode::RwsemDel => {
                let result = self.server.delete(req.arg as usize, &mut self.transport);
                self.reply_status(req.endpoint, result);
            }
            CallCode::ReadLock => {
                self.server
                    .read_lock(req.endpoint, req.arg as usize, &mut self.transport);
            }
            CallCode::WriteLock => {
                self.server
                    .write_lock(req.endpoint, req.arg as usize, &mut self.transport);
            }
            CallCode::ReadUnlock => {
                let result = self.server.read_unlock(req.arg as usize, &mut self.transport);
                self.reply_status(req.endpoint, result);
            }
            CallCode::WriteUnlock => {
                let result = self.server.write_unlock(req.arg as usize, &mut self.transport);
                self.reply_status(req.endpoint, result);
            }
        }
    }

    fn reply_get(&mut self, endpoint: Endpoint, result: Result<usize, RwSemError>) {
        let wire = match result {
            Ok(id) => ReplyWire {
                status: StatusCode::Ok,
                payload: id as i64,
            },
            Err(e) => ReplyWire {
                status: StatusCode::Err(e),
                payload: 0,
            },
        };
        self.transport.send_wire(endpoint, wire);
    }

    fn reply_status(&mut self, endpoint: Endpoint, result: Result<(), RwSemError>) {
        let status = match result {
            Ok(()) => StatusCode::Ok,
            Err(e) => StatusCode::Err(e),
        };
        self.transport.send_wire(endpoint, ReplyWire { status, payload: 0 });
    }
}
