// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

mod completion;
mod durability;
mod location;
mod ordering;
mod rollback;
