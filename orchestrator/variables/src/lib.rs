// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Deployment variable resolution and versioning engine.
//!
//! Resolves `((name))` placeholders in deployment manifests against a remote
//! config server, pins resolved ids per deploy generation, generates
//! declared secrets and shares values across linked deployments.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Crate root, re-exports the domain layer

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
