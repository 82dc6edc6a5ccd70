// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod memory;

pub use memory::{
    InMemoryApprovalRepository, InMemoryAuditRepository, InMemoryCredentialRepository,
    InMemoryPolicyBindingRepository, InMemoryPolicyRepository,
};
