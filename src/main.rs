use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;

use custody_core::provisioning::ProvisioningOutcome;
use custody_core::wallet::mnemonic;
use custody_core::{
    restore_keypairs, CustodyConfig, DerivedKeypair, InMemoryWalletStore, PublicKeyInfo, WalletProvisioner,
};

#[derive(Parser)]
#[command(name = "custody-core", version, about = "HD wallet derivation and key custody")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a mnemonic and print the addresses it controls
    Generate {
        #[arg(long)]
        words: Option<usize>,
        #[arg(long)]
        json: bool,
    },
    /// Re-derive addresses from an existing mnemonic
    Restore {
        #[arg(long)]
        mnemonic: String,
        #[arg(long, default_value = "")]
        passphrase: String,
        #[arg(long)]
        json: bool,
    },
    /// Provision an identity against an in-memory store
    Provision {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = CustodyConfig::from_env().context("loading configuration")?;
    config.apply_logging();

    match cli.command {
        Command::Generate { words, json } => {
            let word_count = words.unwrap_or(config.mnemonic_words);
            let phrase = mnemonic::generate_with_words(word_count)?;
            let keypairs = restore_keypairs(&phrase, "", &config.chains, config.network)?;
            print_keypairs(Some(phrase.as_str()), &keypairs, json)?;
        }
        Command::Restore {
            mnemonic,
            passphrase,
            json,
        } => {
            let keypairs = restore_keypairs(&mnemonic, &passphrase, &config.chains, config.network)?;
            print_keypairs(None, &keypairs, json)?;
        }
        Command::Provision { owner, json } => {
            let provisioner = WalletProvisioner::new(config, InMemoryWalletStore::new())?;
            let outcome = provisioner.provision(&owner)?;
            print_outcome(&outcome, json)?;
        }
    }

    Ok(())
}

fn print_keypairs(phrase: Option<&str>, keypairs: &[DerivedKeypair], as_json: bool) -> anyhow::Result<()> {
    let wallets: Vec<PublicKeyInfo> = keypairs.iter().map(PublicKeyInfo::from).collect();

    if as_json {
        let mut body = json!({ "wallets": wallets });
        if let Some(phrase) = phrase {
            body["mnemonic"] = json!(phrase);
            body["word_count"] = json!(mnemonic::word_count(phrase));
        }
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    if let Some(phrase) = phrase {
        println!("Mnemonic: {}", phrase);
        println!();
    }
    for wallet in &wallets {
        println!(
            "{:<18} {:<64} {}",
            format!("{}:{}", wallet.chain, wallet.variant),
            wallet.address,
            wallet.derivation_path
        );
    }
    Ok(())
}

fn print_outcome(outcome: &ProvisioningOutcome, as_json: bool) -> anyhow::Result<()> {
    if as_json {
        let wallets: Vec<_> = outcome
            .wallets
            .iter()
            .map(|w| {
                json!({
                    "chain": w.chain,
                    "variant": w.wallet_variant,
                    "currency_symbol": w.currency_symbol,
                    "address": w.address,
                    "derivation_path": w.derivation_path,
                    "public_key_hex": w.public_key_hex,
                })
            })
            .collect();
        let body = json!({
            "owner_id": outcome.owner_id,
            "status": outcome.status,
            "wallets": wallets,
            "failures": outcome.failures,
            "mnemonic": outcome.mnemonic.as_ref().map(|m| m.as_str()),
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    println!("Owner: {} ({:?})", outcome.owner_id, outcome.status);
    if let Some(phrase) = &outcome.mnemonic {
        println!("Mnemonic (shown once): {}", phrase.as_str());
    }
    for wallet in &outcome.wallets {
        println!("{:<18} {}", wallet.slot().to_string(), wallet.address);
    }
    for failure in &outcome.failures {
        println!("FAILED {:<11} {}", failure.slot.to_string(), failure.message);
    }
    Ok(())
}
