//! # Keygen
//!
//! Operator tooling for root key material.
//!
//! ## Usage
//!
//! ```bash
//! # Generate a fresh root key triplet (private key, public key, AES seed)
//! keygen generate
//!
//! # Decrypt one base64-encoded secret value with an explicit triplet
//! keygen decrypt --keys /opt/safe/keys.txt --value "aGVsbG8..." --algorithm sealed
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use secrets_safe::crypto::{root_key, Algorithm, EnvelopeCipher, KeyStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "keygen", about = "Root key tooling for the Secrets Safe")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a fresh root key triplet and print it
    Generate,
    /// Decrypt a base64-encoded secret value with an explicit root key triplet
    Decrypt {
        /// File holding the serialized triplet (private\npublic\naes)
        #[arg(long)]
        keys: PathBuf,
        /// The base64-encoded ciphertext
        #[arg(long)]
        value: String,
        /// Algorithm the value was encrypted with: "aes" or "sealed"
        #[arg(long, default_value = "sealed")]
        algorithm: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate => {
            let collection =
                root_key::generate_collection().context("Failed to generate root key material")?;
            println!("{}", collection.combine());
            Ok(())
        }
        Commands::Decrypt {
            keys,
            value,
            algorithm,
        } => {
            let serialized = std::fs::read_to_string(&keys)
                .with_context(|| format!("Failed to read key file {}", keys.display()))?;

            let store = Arc::new(KeyStore::new());
            store
                .set(serialized.trim_end())
                .context("Key file does not hold a valid triplet")?;

            let algorithm: Algorithm = algorithm
                .parse()
                .context("Algorithm must be \"aes\" or \"sealed\"")?;

            let cipher = EnvelopeCipher::new(store, false, Duration::ZERO);
            let plaintext = cipher
                .decrypt(value.as_bytes(), algorithm)
                .context("Failed to decrypt value")?;
            println!("{plaintext}");
            Ok(())
        }
    }
}
