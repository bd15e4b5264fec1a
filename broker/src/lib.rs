// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! # Credential Broker
//!
//! A short-lived HTTP service that releases a single decrypted database
//! password to callers holding a one-time bearer token, then shuts itself
//! down.
//!
//! ## Architecture
//!
//! ```text
//! secrets.yaml.encrypted --(secret-vault)--> password (memory only)
//!                                                  |
//! Client -> HTTP API (this crate) -> TokenStore ---+-> {"password": ...}
//!                                        ^
//!                     LifecycleMonitor --+--> process exit
//! ```
//!
//! At startup the broker decrypts its secrets document, writes one token per
//! role to the token directory, and starts the [`lifecycle::LifecycleMonitor`].
//! Each token can be exchanged for the password exactly once. The process
//! exits once every token is consumed or the lifetime elapses, whichever
//! comes first.
//!
//! ## Modules
//!
//! - [`application`]: HTTP server setup with Axum, body limits and timeouts
//! - [`configuration`]: CLI argument parsing with clap
//! - [`constants`]: Configuration constants for the application
//! - [`endpoint`]: Token-for-secret release rules
//! - [`errors`]: Application error types with HTTP response mapping
//! - [`lifecycle`]: Shutdown on token consumption or lifetime expiry
//! - [`models`]: Response types and the in-memory secret wrapper
//! - [`routes`]: HTTP route handlers (health, database password)
//! - [`settings`]: YAML settings and encrypted secrets documents
//! - [`tokens`]: File-backed one-time tokens
//!
//! ## Usage
//!
//! ```bash
//! credential-broker --config-file config.yaml --secrets-file secrets.yaml.encrypted --token-dir /app/tokens
//! ```
//!
//! ## Security Considerations
//!
//! - The password is decrypted only in memory and zeroized on drop
//! - Token files are created with mode `0600` and compared in constant time
//! - A token is consumed atomically, at most once, on successful release
//! - Neither tokens nor secrets are ever logged

pub mod application;
pub mod configuration;
pub mod constants;
pub mod endpoint;
pub mod errors;
pub mod lifecycle;
pub mod models;
pub mod routes;
pub mod settings;
pub mod tokens;
