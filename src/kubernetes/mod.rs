// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes API backed handlers, discovery, and client creation.

pub mod client;
pub mod discovery;
pub mod handler;

pub use client::{create_client, create_client_from_kubeconfig};
pub use handler::DynamicHandler;
