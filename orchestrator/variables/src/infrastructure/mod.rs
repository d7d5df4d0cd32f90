// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod config_server;
pub mod db;
pub mod event_bus;
pub mod link_addresses;
pub mod repositories;

pub use event_bus::EventBus;
