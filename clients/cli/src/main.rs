//! P2PChat CLI Client
//!
//! Key management, message sealing and opening, and relay request signing.
//! The CLI produces artefacts; any HTTP client can carry them to a relay.

use anyhow::Context;
use clap::{Parser, Subcommand};
use console::{style, Emoji};
use dialoguer::{Input, Password};
use p2pchat_core::{parse_username, Envelope, Message, Verifier};
use p2pchat_crypto::keys::mnemonic_from_words;
use p2pchat_crypto::{CipherMode, KeyPair, OsEntropy, PayloadCipher, PrivateKey, PublicKey};
use p2pchat_relay::{RequestParts, RequestSigner};
use std::path::{Path, PathBuf};
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;
use zeroize::Zeroizing;

mod config;

use config::CliConfig;

static KEY: Emoji<'_, '_> = Emoji("🔑 ", "[KEY] ");
static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK] ");
static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR] ");
static RECV: Emoji<'_, '_> = Emoji("📥 ", "[RECV] ");

/// P2PChat CLI - relayed end-to-end encrypted messaging
#[derive(Parser)]
#[command(name = "p2pchat")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new identity
    Keygen {
        /// Random key instead of a mnemonic-derived one
        #[arg(short, long)]
        random: bool,
    },

    /// Recover an identity from its mnemonic
    Recover {
        /// Mnemonic words (prompted if omitted)
        #[arg(short, long)]
        words: Option<String>,
    },

    /// Print the public key of a private key
    Pubkey {
        /// Private key (hex)
        #[arg(short, long)]
        private_key: Option<String>,
    },

    /// Encrypt and sign a message, printing its JSON
    Seal {
        /// Sender private key (hex)
        #[arg(short, long)]
        private_key: Option<String>,

        /// Recipient public key (hex)
        #[arg(short, long)]
        to: String,

        /// Message content
        #[arg(short, long)]
        message: String,

        /// Id of the message this replies to
        #[arg(long)]
        parent: Option<String>,

        /// Payload cipher
        #[arg(long)]
        mode: Option<CipherMode>,
    },

    /// Decrypt and verify messages from a JSON file
    Open {
        /// Private key (hex)
        #[arg(short, long)]
        private_key: Option<String>,

        /// File with a message or an array of messages
        #[arg(short, long)]
        file: PathBuf,

        /// Payload cipher
        #[arg(long)]
        mode: Option<CipherMode>,
    },

    /// Print authentication headers for a relay request
    SignRequest {
        /// Private key (hex)
        #[arg(short, long)]
        private_key: Option<String>,

        /// HTTP method
        #[arg(short, long, default_value = "GET")]
        method: String,

        /// Request path
        #[arg(long)]
        path: String,

        /// Raw query string, without `?`
        #[arg(short, long, default_value = "")]
        query: String,

        /// Raw request body
        #[arg(short, long, default_value = "")]
        body: String,
    },

    /// Print the well-known URL for user@domain
    Resolve {
        /// Username
        username: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = cli.config.unwrap_or_else(CliConfig::default_path);
    let config = CliConfig::load_or_default(&config_path)?;
    debug!(path = %config_path.display(), "Loaded config");

    match cli.command {
        Commands::Keygen { random } => keygen(random),
        Commands::Recover { words } => recover(words),
        Commands::Pubkey { private_key } => {
            let private = load_private_key(private_key, &config)?;
            println!("{}", private.public_key());
            Ok(())
        }
        Commands::Seal {
            private_key,
            to,
            message,
            parent,
            mode,
        } => {
            let private = load_private_key(private_key, &config)?;
            let sealed = seal(
                &private,
                &to,
                &message,
                parent.as_deref(),
                mode.unwrap_or(config.mode),
            )?;
            println!("{}", serde_json::to_string_pretty(&sealed)?);
            Ok(())
        }
        Commands::Open {
            private_key,
            file,
            mode,
        } => {
            let private = load_private_key(private_key, &config)?;
            open(&private, &file, mode.unwrap_or(config.mode))
        }
        Commands::SignRequest {
            private_key,
            method,
            path,
            query,
            body,
        } => {
            let private = load_private_key(private_key, &config)?;
            let signer = RequestSigner::new(private);
            let request = RequestParts::new(&method, &path, &query, body.as_bytes());
            for (name, value) in signer.sign(&request)?.pairs() {
                println!("{}: {}", name, value);
            }
            Ok(())
        }
        Commands::Resolve { username } => {
            let name = parse_username(&username)?;
            println!("{}", name.well_known_url());
            Ok(())
        }
    }
}

/// Private key from the flag, the configured key file, or a prompt
fn load_private_key(flag: Option<String>, config: &CliConfig) -> anyhow::Result<PrivateKey> {
    let hex = match (flag, &config.key_file) {
        (Some(hex), _) => Zeroizing::new(hex),
        (None, Some(path)) => Zeroizing::new(
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read key file {}", path.display()))?,
        ),
        (None, None) => Zeroizing::new(
            Password::new()
                .with_prompt("Private key (hex)")
                .interact()?,
        ),
    };
    Ok(PrivateKey::from_hex(hex.trim())?)
}

fn print_identity(pair: &KeyPair) {
    println!(
        "  {} Private key: {}",
        KEY,
        style(pair.private_key().to_hex().as_str()).red()
    );
    println!("  {} Public key:  {}", KEY, style(pair.public_key()).cyan());
}

fn keygen(random: bool) -> anyhow::Result<()> {
    if random {
        let pair = KeyPair::generate_random(&OsEntropy)?;
        println!("{} Random identity created", CHECK);
        print_identity(&pair);
        return Ok(());
    }

    let (mnemonic, pair) = KeyPair::generate(&OsEntropy)?;
    println!("{} Identity created", CHECK);
    println!();
    println!("  {}", style(mnemonic.to_string()).yellow());
    println!();
    print_identity(&pair);
    println!();
    println!(
        "{}",
        style("Write the words down: they are the only way to recover this identity.").dim()
    );
    Ok(())
}

fn recover(words: Option<String>) -> anyhow::Result<()> {
    let words = match words {
        Some(words) => Zeroizing::new(words),
        None => Zeroizing::new(Input::<String>::new().with_prompt("Mnemonic").interact_text()?),
    };

    let mnemonic = mnemonic_from_words(words.trim())?;
    let pair = KeyPair::from_mnemonic(&mnemonic)?;
    println!("{} Identity recovered", CHECK);
    print_identity(&pair);
    Ok(())
}

fn seal(
    private: &PrivateKey,
    to: &str,
    text: &str,
    parent: Option<&str>,
    mode: CipherMode,
) -> anyhow::Result<Message> {
    let recipient = PublicKey::from_hex(to).context("Invalid recipient key")?;
    let envelope = Envelope::new(PayloadCipher::with_mode(mode));
    Ok(envelope.build(private, &private.public_key(), &recipient, text, parent)?)
}

/// Messages from a file holding either one message or an array
fn read_messages(path: &Path) -> anyhow::Result<Vec<Message>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    if content.trim_start().starts_with('[') {
        Ok(serde_json::from_str(&content)?)
    } else {
        Ok(vec![Message::from_json(&content)?])
    }
}

fn open(private: &PrivateKey, path: &Path, mode: CipherMode) -> anyhow::Result<()> {
    let messages = read_messages(path)?;
    let verifier = Verifier::new(PayloadCipher::with_mode(mode));

    let mut failed = 0;
    for message in &messages {
        let from = message
            .sender_username
            .clone()
            .unwrap_or_else(|| message.sender.clone());
        match verifier.open(private, message) {
            Ok(text) => println!("{} {} {}: {}", RECV, message.timestamp, style(from).cyan(), text),
            Err(e) => {
                failed += 1;
                println!("{} {} {}: {}", CROSS, message.timestamp, style(from).cyan(), style(e).red());
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} messages failed to open", failed, messages.len());
    }
    Ok(())
}
