// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain Layer
//!
//! Value objects, aggregates, error types and the trait seams implemented
//! by `crate::infrastructure`.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Declares the domain modules

pub mod variable_name;
pub mod variable;
pub mod declaration;
pub mod variable_set;
pub mod repository;
pub mod config_server;
pub mod events;
pub mod variables_config;
