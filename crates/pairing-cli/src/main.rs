//! Pairing core CLI
//!
//! Thin command-line front end over the pairing core: mints keys, registers
//! topics, signs relay tokens and seals or opens envelopes using the same
//! vault and storage a client on this machine would use.

use clap::{Parser, Subcommand, ValueEnum};
use directories::ProjectDirs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use pairing_core::{
    CoreContext, DecodeOptions, EncodeOptions, Encoding, EncryptedFileVault, EnvelopeCodec,
    EnvelopeType, FileStorage, KeychainVault, MemoryVault, SecretVault, SettingsManager, SymKey,
};

/// Pairing core CLI - keys, topics, tokens and envelopes
#[derive(Parser, Debug)]
#[command(name = "pairing-cli")]
#[command(author = "Symbia Labs")]
#[command(version)]
#[command(about = "Key management and envelope tooling for wallet pairing clients")]
struct Args {
    /// Directory holding settings, storage and the file vault
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Secret vault backend
    #[arg(long, global = true, value_enum, default_value = "keychain")]
    vault: VaultKind,

    /// Password for the encrypted file vault
    #[arg(long, global = true, env = "PAIRING_VAULT_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum VaultKind {
    /// OS keychain, falling back to the encrypted file vault
    Keychain,
    /// Password-protected encrypted file
    File,
    /// Process memory; nothing survives the command
    Memory,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EncodingArg {
    Base64,
    Base64url,
    Base16,
}

impl From<EncodingArg> for Encoding {
    fn from(arg: EncodingArg) -> Self {
        match arg {
            EncodingArg::Base64 => Encoding::Base64,
            EncodingArg::Base64url => Encoding::Base64Url,
            EncodingArg::Base16 => Encoding::Base16,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EnvelopeArg {
    #[value(name = "0")]
    Type0,
    #[value(name = "1")]
    Type1,
    #[value(name = "2")]
    Type2,
}

impl From<EnvelopeArg> for EnvelopeType {
    fn from(arg: EnvelopeArg) -> Self {
        match arg {
            EnvelopeArg::Type0 => EnvelopeType::Type0,
            EnvelopeArg::Type1 => EnvelopeType::Type1,
            EnvelopeArg::Type2 => EnvelopeType::Type2,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the client id (did:key)
    ClientId,

    /// Generate a key pair and print its public key
    Keygen,

    /// Derive the shared key between a local key pair and a peer
    SharedKey {
        /// Local public key (hex)
        #[arg(long = "self")]
        self_public_key: String,
        /// Peer public key (hex)
        #[arg(long)]
        peer: String,
        /// Register under this topic instead of the key hash
        #[arg(long)]
        topic: Option<String>,
    },

    /// Register a symmetric key, generating one when none is given
    SymKey {
        /// Symmetric key (hex)
        #[arg(long)]
        key: Option<String>,
        /// Register under this topic instead of the key hash
        #[arg(long)]
        topic: Option<String>,
    },

    /// Sign a relay authentication token
    Token {
        /// Token audience, usually the relay URL
        #[arg(long)]
        aud: String,
        /// Lifetime in seconds
        #[arg(long, default_value = "86400")]
        ttl: u64,
    },

    /// Seal a JSON payload into an envelope
    Encode {
        #[arg(long, default_value = "")]
        topic: String,
        /// JSON payload
        #[arg(long)]
        payload: String,
        #[arg(long = "type", value_enum)]
        envelope_type: Option<EnvelopeArg>,
        /// Sender public key (type 1)
        #[arg(long)]
        sender: Option<String>,
        /// Receiver public key (type 1)
        #[arg(long)]
        receiver: Option<String>,
        #[arg(long, value_enum, default_value = "base64")]
        encoding: EncodingArg,
    },

    /// Open an envelope and print its JSON payload
    Decode {
        #[arg(long, default_value = "")]
        topic: String,
        /// Encoded envelope
        #[arg(long)]
        message: String,
        /// Local public key a type 1 envelope was sent to
        #[arg(long)]
        receiver: Option<String>,
        #[arg(long, value_enum, default_value = "base64")]
        encoding: EncodingArg,
    },

    /// Print the type and sender of an envelope without opening it
    Inspect {
        #[arg(long)]
        message: String,
        #[arg(long, value_enum, default_value = "base64")]
        encoding: EncodingArg,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // inspect needs no keys
    if let Command::Inspect { message, encoding } = &args.command {
        return inspect(message, (*encoding).into());
    }

    let data_dir = match &args.data_dir {
        Some(dir) => dir.clone(),
        None => ProjectDirs::from("com", "symbia-labs", "pairing-core")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or("Could not determine data directory")?,
    };
    std::fs::create_dir_all(&data_dir)?;

    let settings = SettingsManager::new(&data_dir).get().clone();
    let vault = open_vault(&args, &data_dir).await?;
    let storage = Arc::new(FileStorage::open(data_dir.join("storage.json")).await?);

    let ctx = CoreContext::with_http_telemetry(settings, vault, storage)?;
    ctx.init().await?;

    let result = run(&ctx, args.command).await;
    ctx.shutdown().await;
    result
}

async fn run(ctx: &CoreContext, command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::ClientId => {
            println!("{}", ctx.keys.get_client_id().await?);
        }
        Command::Keygen => {
            println!("{}", ctx.keys.generate_key_pair().await?);
        }
        Command::SharedKey {
            self_public_key,
            peer,
            topic,
        } => {
            let topic = ctx
                .keys
                .generate_shared_key(&self_public_key, &peer, topic.as_deref())
                .await?;
            println!("{}", topic);
        }
        Command::SymKey { key, topic } => {
            let (sym_key, generated) = match key {
                Some(hex_key) => (SymKey::from_hex(&hex_key)?, false),
                None => (SymKey::generate(), true),
            };
            let topic = ctx.keys.set_sym_key(&sym_key, topic.as_deref()).await?;
            println!("topic: {}", topic);
            if generated {
                println!("key: {}", sym_key.to_hex());
            }
        }
        Command::Token { aud, ttl } => {
            println!("{}", ctx.keys.sign_token(&aud, Duration::from_secs(ttl)).await?);
        }
        Command::Encode {
            topic,
            payload,
            envelope_type,
            sender,
            receiver,
            encoding,
        } => {
            let payload: serde_json::Value = serde_json::from_str(&payload)?;
            let opts = EncodeOptions {
                envelope_type: envelope_type.map(EnvelopeType::from),
                sender_public_key: sender,
                receiver_public_key: receiver,
                encoding: encoding.into(),
            };
            println!("{}", ctx.codec.encode(&topic, &payload, &opts).await?);
        }
        Command::Decode {
            topic,
            message,
            receiver,
            encoding,
        } => {
            let opts = DecodeOptions {
                receiver_public_key: receiver,
                encoding: encoding.into(),
            };
            let payload: serde_json::Value = ctx.codec.decode(&topic, &message, &opts).await?;
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        Command::Inspect { message, encoding } => inspect(&message, encoding.into())?,
    }

    Ok(())
}

fn inspect(message: &str, encoding: Encoding) -> Result<(), Box<dyn std::error::Error>> {
    let envelope_type = EnvelopeCodec::get_payload_type(message, encoding)?;
    println!("type: {}", envelope_type.as_byte());
    if let Some(sender) = EnvelopeCodec::get_payload_sender_public_key(message, encoding)? {
        println!("sender: {}", sender);
    }
    Ok(())
}

async fn open_vault(
    args: &Args,
    data_dir: &std::path::Path,
) -> Result<Arc<dyn SecretVault>, Box<dyn std::error::Error>> {
    match args.vault {
        VaultKind::Memory => Ok(Arc::new(MemoryVault::new())),
        VaultKind::Keychain if KeychainVault::probe() => {
            info!("Using OS keychain vault");
            Ok(Arc::new(KeychainVault::new(None)))
        }
        VaultKind::Keychain | VaultKind::File => {
            if args.vault == VaultKind::Keychain {
                warn!("OS keychain unavailable, falling back to encrypted file vault");
            }

            let vault = EncryptedFileVault::with_dir(data_dir.join("vault"))?;
            let password = match &args.password {
                Some(password) => password.clone(),
                None if vault.is_provisioned() => rpassword::prompt_password("Vault password: ")?,
                None => rpassword::prompt_password("New vault password: ")?,
            };
            vault.unlock(&password).await?;
            Ok(Arc::new(vault))
        }
    }
}
