// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod variable_set_store;
pub mod manifest_tree;
mod resolution;
pub mod interpolator;
pub mod link_resolver;
pub mod generator;

// Re-export services for convenience
pub use generator::{GeneratedVariable, GenerationError, GenerationFlags, Generator};
pub use interpolator::{InterpolationError, InterpolationOptions, Interpolator};
pub use link_resolver::LinkResolver;
pub use manifest_tree::{SubtreePath, SubtreeSegment};
pub use variable_set_store::VariableSetStore;
