// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Resource identity and container helpers shared by every operation path.

pub mod resource;

pub use resource::{
    describe, describe_all, flatten, is_list_kind, kind_of, list_items, with_items, ResourceKey,
};
