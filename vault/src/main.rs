// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::io::Read;

use anyhow::{Result, anyhow, bail};
use clap::{Parser, Subcommand};
use secret_vault::{Decryption, SecretVault, envelope};
use zeroize::Zeroize;

/// Seal and unseal values for the credential broker's secrets document.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct VaultOptions {
    /// Passphrase the vault key is derived from (`secret_key` in config.yaml)
    #[arg(long, env("VAULT_SECRET_KEY"), hide_env_values = true)]
    secret_key: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print `encrypted:<ciphertext>` for a plaintext value
    Encrypt {
        /// Value to encrypt; read from stdin when omitted
        #[arg(long)]
        value: Option<String>,
    },
    /// Print the plaintext of an `encrypted:<ciphertext>` value
    Decrypt {
        /// Value to decrypt; read from stdin when omitted
        #[arg(long)]
        value: Option<String>,
    },
}

fn read_value(value: Option<String>) -> Result<String> {
    match value {
        Some(value) => Ok(value),
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|err| anyhow!("failed to read value from stdin: {err:?}"))?;
            let value = buffer.trim_end_matches(['\r', '\n']).to_string();
            buffer.zeroize();
            Ok(value)
        }
    }
}

fn main() -> Result<()> {
    let options = VaultOptions::parse();
    if options.secret_key.is_empty() {
        bail!("secret key must not be empty");
    }

    let vault = SecretVault::new(&options.secret_key);

    match options.command {
        Command::Encrypt { value } => {
            let mut plaintext = read_value(value)?;
            let sealed = vault
                .seal(&plaintext)
                .map_err(|err| anyhow!("failed to encrypt value: {err}"))?;
            plaintext.zeroize();
            println!("{sealed}");
        }
        Command::Decrypt { value } => {
            let value = read_value(value)?;
            let ciphertext = envelope::extract_ciphertext(&value)
                .map_err(|err| anyhow!("failed to decrypt value: {err}"))?;
            match vault.decrypt(ciphertext) {
                Decryption::Decrypted(mut plaintext) => {
                    println!("{plaintext}");
                    plaintext.zeroize();
                }
                Decryption::Passthrough(_) => bail!("value could not be decrypted with this key"),
            }
        }
    }

    Ok(())
}
