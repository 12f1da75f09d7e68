// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

pub mod job;
pub mod outbox;
pub mod step;
pub mod sync;
