// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Caller-facing operations: immutable configuration plus the lifecycle verbs.

pub mod config;
pub mod list;
pub mod single;

pub use config::{OperationConfig, RetryBackoff};
pub use list::ListOperation;
pub use single::Operation;
