// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod approvals;
pub mod authorization;
pub mod rate_limit;
pub mod session;
pub mod verifier;
