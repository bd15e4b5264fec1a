// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};

use crate::constants;
use crate::settings::ServerSection;

#[derive(Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct BrokerOptions {
    /// Overrides `server.host` from the config file
    #[arg(long, env("BROKER_HTTP_HOST"))]
    pub host: Option<String>,
    /// Overrides `server.port` from the config file
    #[arg(long, env("BROKER_HTTP_PORT"))]
    pub port: Option<u16>,
    #[arg(long, default_value = constants::DEFAULT_CONFIG_FILE, env("BROKER_CONFIG_FILE"))]
    pub config_file: PathBuf,
    #[arg(long, default_value = constants::DEFAULT_SECRETS_FILE, env("BROKER_SECRETS_FILE"))]
    pub secrets_file: PathBuf,
    #[arg(long, default_value = constants::DEFAULT_TOKEN_DIR, env("TOKEN_DIR"))]
    pub token_dir: PathBuf,
    /// Overrides `secret_key` from the config file
    #[arg(long, env("BROKER_SECRET_KEY"), hide_env_values = true)]
    pub secret_key: Option<String>,
    #[arg(long, default_value = "300", env("BROKER_TTL_SECS"))]
    pub ttl_secs: u64,
    #[arg(long, default_value = "5", env("BROKER_POLL_INTERVAL_SECS"))]
    pub poll_interval_secs: u64,
    #[arg(long, default_value = "false", env("BROKER_SKIP_TOKEN_GENERATION"), action = ArgAction::SetTrue)]
    pub skip_token_generation: bool,
}

impl BrokerOptions {
    /// Address to bind: the flag, then `server.host`, then [`constants::DEFAULT_HOST`].
    pub fn bind_host(&self, server: &ServerSection) -> String {
        self.host
            .clone()
            .or_else(|| server.host.clone())
            .unwrap_or_else(|| constants::DEFAULT_HOST.to_string())
    }

    /// Port to bind: the flag, then `server.port`, then [`constants::DEFAULT_PORT`].
    pub fn bind_port(&self, server: &ServerSection) -> u16 {
        self.port.or(server.port).unwrap_or(constants::DEFAULT_PORT)
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

// Custom Debug implementation to keep the passphrase out of the startup log
impl fmt::Debug for BrokerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerOptions")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("config_file", &self.config_file)
            .field("secrets_file", &self.secrets_file)
            .field("token_dir", &self.token_dir)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "[REDACTED]"))
            .field("ttl_secs", &self.ttl_secs)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("skip_token_generation", &self.skip_token_generation)
            .finish()
    }
}

impl Default for BrokerOptions {
    fn default() -> Self {
        BrokerOptions {
            host: None,
            port: None,
            config_file: PathBuf::from(constants::DEFAULT_CONFIG_FILE),
            secrets_file: PathBuf::from(constants::DEFAULT_SECRETS_FILE),
            token_dir: PathBuf::from(constants::DEFAULT_TOKEN_DIR),
            secret_key: None,
            ttl_secs: constants::DEFAULT_TOKEN_TTL.as_secs(),
            poll_interval_secs: constants::DEFAULT_POLL_INTERVAL.as_secs(),
            skip_token_generation: false,
        }
    }
}
