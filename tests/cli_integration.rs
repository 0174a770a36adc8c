use serde_json::Value;
use std::process::{Command, Output};

const ABANDON: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
const SECRET_HEX: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

fn cli(args: &[&str], master_secret: Option<&str>) -> Output {
    let binary_path = assert_cmd::cargo::cargo_bin!("custody-core");
    let mut command = Command::new(binary_path);
    command
        .args(args)
        .env_remove("CUSTODY_CONFIG")
        .env_remove("CUSTODY_NETWORK")
        .env("CUSTODY_LOG", "error");
    match master_secret {
        Some(secret) => command.env("CUSTODY_MASTER_SECRET", secret),
        None => command.env_remove("CUSTODY_MASTER_SECRET"),
    };
    command.output().expect("cli runs")
}

fn json_stdout(output: &Output) -> Value {
    assert!(output.status.success(), "cli exited unsuccessfully: {:?}", output);
    let stdout = String::from_utf8(output.stdout.clone()).expect("stdout is utf8");
    serde_json::from_str(&stdout).expect("stdout is valid json")
}

fn addresses(body: &Value) -> Vec<String> {
    body["wallets"]
        .as_array()
        .expect("wallets array")
        .iter()
        .map(|w| w["address"].as_str().expect("address").to_string())
        .collect()
}

#[test]
fn restore_reproduces_reference_addresses() {
    let body = json_stdout(&cli(&["restore", "--mnemonic", ABANDON, "--json"], None));
    let wallets = body["wallets"].as_array().expect("wallets array");

    assert_eq!(wallets.len(), 4);
    assert_eq!(wallets[0]["address"], "0x9858EfFD232B4033E47d90003D41EC34EcaEda94");
    assert_eq!(wallets[0]["derivation_path"], "m/44'/60'/0'/0/0");
    assert_eq!(wallets[1]["chain"], "solana");
    assert_eq!(wallets[2]["address"], "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu");
    assert_eq!(wallets[2]["variant"], "segwit");
    assert_eq!(
        wallets[3]["address"],
        "bc1p5cyxnuxmeuwuvkwfem96lqzszd02n6xdcjrs20cac6yqjjwudpxqkedrcr"
    );
    assert!(body.get("mnemonic").is_none());

    let stdout = String::from_utf8_lossy(&cli(&["restore", "--mnemonic", ABANDON, "--json"], None).stdout).to_string();
    assert!(!stdout.contains("private"));
}

#[test]
fn generate_then_restore_matches() {
    let generated = json_stdout(&cli(&["generate", "--words", "24", "--json"], None));
    let phrase = generated["mnemonic"].as_str().expect("mnemonic");
    assert_eq!(phrase.split_whitespace().count(), 24);
    assert_eq!(generated["word_count"], 24);

    let restored = json_stdout(&cli(&["restore", "--mnemonic", phrase, "--json"], None));
    assert_eq!(addresses(&generated), addresses(&restored));
}

#[test]
fn restore_rejects_invalid_mnemonic() {
    let output = cli(&["restore", "--mnemonic", "abandon abandon abandon", "--json"], None);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("InvalidMnemonic"), "stderr: {}", stderr);
}

#[test]
fn provision_requires_master_secret() {
    let output = cli(&["provision", "--owner", "user-1"], None);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ConfigError"), "stderr: {}", stderr);
}

#[test]
fn provision_emits_mnemonic_once_with_recoverable_wallets() {
    let body = json_stdout(&cli(&["provision", "--owner", "user-1", "--json"], Some(SECRET_HEX)));

    assert_eq!(body["owner_id"], "user-1");
    assert_eq!(body["status"], "created");
    assert_eq!(body["failures"].as_array().expect("failures").len(), 0);

    let phrase = body["mnemonic"].as_str().expect("mnemonic shown on creation");
    let restored = json_stdout(&cli(&["restore", "--mnemonic", phrase, "--json"], None));
    assert_eq!(addresses(&body), addresses(&restored));

    for wallet in body["wallets"].as_array().expect("wallets") {
        assert!(wallet.get("encrypted_key").is_none());
    }
}
