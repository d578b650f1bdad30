// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
pub mod apply;
pub mod config;
pub mod constants;
pub mod error;
pub mod handlers;
pub mod kubernetes;
pub mod manifest;
pub mod operation;
pub mod pipeline;
pub mod readiness;
pub mod registry;
pub mod types;
pub mod wait;

#[cfg(test)]
pub mod test_utils;

pub use error::{LifecycleError, Result};
pub use handlers::{DeleteOptions, Predicate, ResourceHandler, WatchOptions, WatchStream};
pub use operation::{ListOperation, Operation, OperationConfig, RetryBackoff};
pub use pipeline::{MutationPipeline, ResourceBuilder, Visitor};
pub use registry::HandlerRegistry;
pub use types::{describe, ResourceKey};
pub use wait::{BatchWaiter, WaitOutcome, WaitReport};
