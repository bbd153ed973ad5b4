// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Reader-writer semaphore arbitration daemon.
//
// Usage: rwsem_serverd [channel-name]
//
// Listens for RWSEMGET/RWSEMDEL/READ_LOCK/READ_UNLOCK/WRITE_LOCK/WRITE_UNLOCK
// requests on a named channel and dispatches them to an in-process
// `RwSemServer`. Each client's synchronous and asynchronous replies are
// delivered on a per-endpoint reply channel (see proto::rwsem_service).

use rwsem_ipc::proto::RwSemService;

const DEFAULT_CHANNEL: &str = "rwsem-requests";

fn main() {
    env_logger::init();

    let channel_name = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CHANNEL.to_string());

    let mut service = RwSemService::open(&channel_name).unwrap_or_else(|e| {
        eprintln!("rwsem_serverd: failed to open request channel {channel_name:?}: {e}");
        std::process::exit(1);
    });

    log::info!("rwsem_serverd listening on channel {channel_name:?}");

    loop {
        match service.run_once(None) {
            Ok(_) => {}
            Err(e) => {
                log::error!("rwsem_serverd: request loop error: {e}");
                break;
            }
        }
    }
}
