//! Evmos Ledger Signer CLI Example
//!
//! This example drives a Ledger through the same signer a keyring uses, over
//! the native USB HID transport on macOS, Linux and Windows.
//!
//! # Prerequisites
//!
//! - A Ledger Nano S, S Plus or X, unlocked
//! - The Ethereum app open on the device, version 1.5.0 or newer for signing
//! - On Linux, udev rules granting access to vendor `2c97`
//!
//! # Quick Start
//!
//! ```bash
//! cargo run --example ledger-cli -p evmos-ledger-core --features hid -- list
//! cargo run --example ledger-cli -p evmos-ledger-core --features hid -- address
//! cargo run --example ledger-cli -p evmos-ledger-core --features hid -- sign tx.json
//! ```
//!
//! Set `RUST_LOG=evmos_ledger_core=debug` to see device traffic decisions.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `list` | List attached Ledger devices |
//! | `address [index] [hrp]` | Show the bech32 address at `m/44'/60'/0'/0/index` |
//! | `pubkey [index]` | Show the uncompressed public key |
//! | `hashes <file>` | Print the EIP-712 hashes of a typed-data file, no device needed |
//! | `sign <file> [index]` | Sign a typed-data file on the device |
//!
//! # Security Notes
//!
//! - Compare the printed domain and message hashes with the device screen
//!   before approving
//! - Private keys never leave the Ledger

#![expect(unused_crate_dependencies, reason = "needed for CLI example")]

use std::env;
use std::fs;
use std::sync::Arc;

use evmos_ledger_core::console::StdoutConsole;
use evmos_ledger_core::device::{Hub, LedgerHub};
use evmos_ledger_core::hashes::render_signing_hashes;
use evmos_ledger_core::{
    DerivationPath, Secp256k1, SignerConfig, TypedData, ledger_derivation,
};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_help();
        return;
    }

    match args[1].as_str() {
        "list" => cmd_list(),
        "address" => cmd_address(&args[2..]),
        "pubkey" => cmd_pubkey(&args[2..]),
        "hashes" => cmd_hashes(&args[2..]),
        "sign" => cmd_sign(&args[2..]),
        "--help" | "-h" | "help" => print_help(),
        _ => {
            eprintln!("Unknown command: {}", args[1]);
            print_help();
        }
    }
}

fn print_help() {
    println!(
        r#"Evmos Ledger Signer CLI

USAGE:
    ledger-cli <COMMAND>

COMMANDS:
    list                    List attached Ledger devices
    address [index] [hrp]   Show the bech32 address (default index 0, hrp evmos)
    pubkey [index]          Show the uncompressed public key
    hashes <file>           Print the EIP-712 hashes of a typed-data JSON file
    sign <file> [index]     Sign a typed-data JSON file on the device
    help                    Show this help message

ENVIRONMENT:
    LEDGER_SIGNER_CONFIG    Path to a JSON signer configuration
    RUST_LOG                Log filter, e.g. evmos_ledger_core=debug

EXAMPLES:
    cargo run --example ledger-cli --features hid -- address 1 cosmos
    cargo run --example ledger-cli --features hid -- sign tx.json
"#
    );
}

fn load_config() -> Option<SignerConfig> {
    let Ok(path) = env::var("LEDGER_SIGNER_CONFIG") else {
        return Some(SignerConfig::default());
    };

    let json = match fs::read_to_string(&path) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Failed to read {path}: {e}");
            return None;
        }
    };

    match SignerConfig::from_json(&json) {
        Ok(config) => Some(config),
        Err(e) => {
            eprintln!("Invalid configuration in {path}: {e}");
            None
        }
    }
}

fn parse_path(arg: Option<&String>, config: &SignerConfig) -> Option<DerivationPath> {
    let Some(arg) = arg else {
        return Some(config.hd_path.clone());
    };

    match arg.parse::<u32>() {
        Ok(index) => Some(DerivationPath::ethereum(index)),
        Err(_) => match arg.parse::<DerivationPath>() {
            Ok(path) => Some(path),
            Err(e) => {
                eprintln!("Invalid account index or path '{arg}': {e}");
                None
            }
        },
    }
}

fn connect(config: SignerConfig) -> Option<Arc<dyn Secp256k1>> {
    println!("Connecting to Ledger...\n");

    let factory = Arc::new(ledger_derivation(config));
    match factory.derivation_fn()() {
        Ok(signer) => Some(signer),
        Err(e) => {
            eprintln!("Failed to connect: {e}");
            eprintln!();
            eprintln!("Make sure:");
            eprintln!("  - Your Ledger is plugged in and unlocked");
            eprintln!("  - The Ethereum app is open");
            None
        }
    }
}

fn cmd_list() {
    println!("Searching for Ledger devices...\n");

    let config = SignerConfig::default();
    match LedgerHub::discover(&config.hid) {
        Ok(hub) => {
            let wallets = hub.wallets();
            if wallets.is_empty() {
                println!("No Ledger devices found.");
                println!("\nMake sure:");
                println!("  - Your Ledger is plugged in and unlocked");
                println!("  - On Linux, udev rules allow access to vendor 2c97");
            } else {
                println!("Found {} Ledger device(s):\n", wallets.len());
                for (i, wallet) in wallets.iter().enumerate() {
                    println!("  [{}] {}", i + 1, wallet.label());
                }
            }
        }
        Err(e) => {
            eprintln!("Error listing devices: {e}");
        }
    }
}

fn cmd_address(args: &[String]) {
    let Some(config) = load_config() else {
        return;
    };
    let Some(path) = parse_path(args.first(), &config) else {
        return;
    };
    let hrp = args.get(1).cloned().unwrap_or_else(|| config.hrp.clone());

    let Some(signer) = connect(config) else {
        return;
    };

    match signer.address_and_public_key(&path, &hrp) {
        Ok((public_key, address)) => {
            println!("Path:");
            println!("  {path}");
            println!();
            println!("Public Key (uncompressed):");
            println!("  {}", hex::encode(public_key));
            println!();
            println!("Address:");
            println!("  {address}");
        }
        Err(e) => eprintln!("{e}"),
    }

    if let Err(e) = signer.close() {
        eprintln!("Failed to close Ledger: {e}");
    }
}

fn cmd_pubkey(args: &[String]) {
    let Some(config) = load_config() else {
        return;
    };
    let Some(path) = parse_path(args.first(), &config) else {
        return;
    };
    let Some(signer) = connect(config) else {
        return;
    };

    match signer.public_key(&path) {
        Ok(public_key) => println!("{}", hex::encode(public_key)),
        Err(e) => eprintln!("{e}"),
    }

    if let Err(e) = signer.close() {
        eprintln!("Failed to close Ledger: {e}");
    }
}

fn read_typed_data(args: &[String]) -> Option<Vec<u8>> {
    let Some(file) = args.first() else {
        eprintln!("Usage: <command> <typed-data.json>");
        return None;
    };

    match fs::read(file) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            eprintln!("Failed to read {file}: {e}");
            None
        }
    }
}

fn cmd_hashes(args: &[String]) {
    let Some(bytes) = read_typed_data(args) else {
        return;
    };

    let typed_data = match TypedData::from_slice(&bytes) {
        Ok(typed_data) => typed_data,
        Err(e) => {
            eprintln!("Invalid typed data: {e}");
            return;
        }
    };

    match render_signing_hashes(&typed_data, &StdoutConsole) {
        Ok(hashes) => {
            println!();
            println!("Digest:");
            println!("  0x{}", hex::encode(hashes.digest()));
        }
        Err(e) => eprintln!("{e}"),
    }
}

fn cmd_sign(args: &[String]) {
    let Some(bytes) = read_typed_data(args) else {
        return;
    };
    let Some(config) = load_config() else {
        return;
    };
    let Some(path) = parse_path(args.get(1), &config) else {
        return;
    };
    let Some(signer) = connect(config) else {
        return;
    };

    match signer.sign(&path, &bytes) {
        Ok(signature) => {
            println!();
            println!("Signature (r || s || v):");
            println!("  0x{}", hex::encode(signature));
        }
        Err(e) => eprintln!("{e}"),
    }

    if let Err(e) = signer.close() {
        eprintln!("Failed to close Ledger: {e}");
    }
}
