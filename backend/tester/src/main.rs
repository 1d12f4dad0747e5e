//! Helpers for poking a running server by hand.
//!
//! ```sh
//! tester token user-123 --secret-file ./secrets/POLLS_TOKEN_SECRET
//! tester fingerprint --user-agent "curl/8.5.0" --language en-US --timezone UTC --platform Linux
//! ```
use std::fs;

use anyhow::{Context, bail};
use ballot::{TokenSigner, fingerprint};
use clap::{Parser, Subcommand};
use secrecy::SecretString;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mint an owner bearer token
    Token {
        user_id: String,

        #[arg(long, default_value = "/run/secrets/POLLS_TOKEN_SECRET")]
        secret_file: String,
    },

    /// Derive the fingerprint a browser with these traits would send
    Fingerprint {
        #[arg(long)]
        user_agent: String,

        #[arg(long, default_value = "en-US")]
        language: String,

        #[arg(long, default_value = "UTC")]
        timezone: String,

        #[arg(long, default_value = "")]
        platform: String,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.command {
        Command::Token {
            user_id,
            secret_file,
        } => {
            if user_id.trim().is_empty() {
                bail!("user id must not be empty");
            }

            let secret = fs::read_to_string(&secret_file)
                .with_context(|| format!("reading secret from {secret_file}"))?;
            let signer = TokenSigner::new(SecretString::from(secret.trim().to_string()));

            println!("{}", signer.sign(&user_id));
        }
        Command::Fingerprint {
            user_agent,
            language,
            timezone,
            platform,
        } => {
            println!(
                "{}",
                fingerprint::derive(&user_agent, &language, &timezone, &platform)
            );
        }
    }

    Ok(())
}
