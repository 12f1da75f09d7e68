// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! cp-storage: durable outbox and job cache

mod backup;
mod durable;
#[cfg(any(test, feature = "test-support"))]
mod memory;
mod snapshot;
mod spool;
mod state;
mod store;
mod wal;

pub use durable::{DurableStore, StoreConfig, SNAPSHOT_FILE, WAL_FILE};
#[cfg(any(test, feature = "test-support"))]
pub use memory::MemoryStore;
pub use snapshot::{Snapshot, SnapshotError, CURRENT_SNAPSHOT_VERSION};
pub use spool::{PhotoSpool, SPOOL_DIR};
pub use state::{MaterializedState, MAX_REJECTED};
pub use store::{JobStore, OutboxService, StoreError};
pub use wal::{Wal, WalEntry, WalError};
