// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::time::Duration;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_CONFIG_FILE: &str = "/app/config/config.yaml";
pub const DEFAULT_SECRETS_FILE: &str = "/app/config/secrets.yaml.encrypted";
pub const DEFAULT_TOKEN_DIR: &str = "/app/tokens";

/// How long the broker serves before shutting itself down
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(300); // 5 minutes
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Random bytes per token (encoded as 43 base64url characters)
pub const TOKEN_BYTES: usize = 32;

pub const BEARER_PREFIX: &str = "Bearer ";
pub const LEGACY_TOKEN_HEADER: &str = "x-auth-token";

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const MAX_REQUEST_BODY_SIZE: usize = 1024 * 1024; // 1 MB
