// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Namespace used by the binary when DEFAULT_NAMESPACE is not set
pub const DEFAULT_NAMESPACE: &str = "default";

/// Container kind whose items are operated on individually
pub const LIST_KIND: &str = "List";

/// apiVersion of the generic container kind
pub const LIST_API_VERSION: &str = "v1";

/// Retry backoff used by waits while reconnecting or polling
pub mod backoff {
    /// Initial delay in milliseconds before the first retry
    pub const INITIAL_MILLIS: u64 = 5;
    /// Factor applied to the delay after every retry
    pub const MULTIPLIER: f64 = 2.0;
    /// Maximum delay in seconds between two retries (exponential backoff cap)
    pub const MAX_INTERVAL_SECS: u64 = 60;
}
