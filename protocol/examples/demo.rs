//! Terminal walkthrough of the DocAuth lifecycle.
//!
//! Generates a holder, runs the challenge-response handshake (including a
//! replay and a forged key), then registers a document twice and looks it
//! up. Uses a temporary sled store so the persistence path runs too.
//!
//! Run with:
//!   cargo run --example demo --release

use std::time::Instant;

use docauth_protocol::anchor::{Anchor, MemoryAnchor};
use docauth_protocol::auth::{sign_assertion, Authenticator};
use docauth_protocol::config::AuthConfig;
use docauth_protocol::crypto::keys::IdentityKeypair;
use docauth_protocol::identity::GeneratedIdentity;
use docauth_protocol::ledger::DocumentLedger;
use docauth_protocol::storage::LedgerDb;

// ---------------------------------------------------------------------------
// ANSI color constants
// ---------------------------------------------------------------------------

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const MAGENTA: &str = "\x1b[35m";
const CYAN: &str = "\x1b[36m";
const WHITE: &str = "\x1b[37m";

// ---------------------------------------------------------------------------
// Display helpers
// ---------------------------------------------------------------------------

fn section(num: u32, title: &str) {
    println!();
    println!("{BOLD}{CYAN}===[{YELLOW} Step {num} {CYAN}]======================================{RESET}");
    println!("{BOLD}{WHITE}  {title}{RESET}");
}

fn success(text: &str) {
    println!("{GREEN}  [OK] {text}{RESET}");
}

fn rejected(text: &str) {
    println!("{RED}  [REJECTED] {text}{RESET}");
}

fn info(label: &str, value: &str) {
    println!("{WHITE}  {BOLD}{label}:{RESET} {YELLOW}{value}{RESET}");
}

fn timing(label: &str, elapsed: std::time::Duration) {
    let ms = elapsed.as_secs_f64() * 1000.0;
    println!("{DIM}{MAGENTA}  [{label}: {ms:.3} ms]{RESET}");
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("{BOLD}DocAuth protocol demo{RESET}  {DIM}Ed25519 + SHA-256{RESET}");

    let auth = Authenticator::new(AuthConfig::default());
    let ledger = DocumentLedger::with_store(LedgerDb::open_temporary()?)?;
    let anchor = MemoryAnchor::new();

    section(1, "Generate a holder");
    let holder = GeneratedIdentity::new();
    info("identity", holder.identity.as_str());
    info("public key", &holder.keypair.public_key().to_hex());

    section(2, "Challenge-response handshake");
    let challenge = auth.issue_challenge(holder.identity.as_str())?;
    info("challenge", &challenge.to_hex());

    let assertion = sign_assertion(&holder.keypair, &holder.identity, &challenge);
    let start = Instant::now();
    let who = auth.verify_assertion(&assertion)?;
    timing("verify", start.elapsed());
    success(&format!("authenticated as {who}"));

    match auth.verify_assertion(&assertion) {
        Ok(_) => println!("  replay unexpectedly accepted"),
        Err(e) => rejected(&format!("replayed assertion: {e}")),
    }

    let challenge = auth.issue_challenge(holder.identity.as_str())?;
    let mut forged = sign_assertion(&holder.keypair, &holder.identity, &challenge);
    forged.public_key = Some(IdentityKeypair::generate().public_key().to_hex());
    match auth.verify_assertion(&forged) {
        Ok(_) => println!("  forgery unexpectedly accepted"),
        Err(e) => rejected(&format!("mismatched key: {e}")),
    }
    info("pending challenges", &auth.pending_count().to_string());

    section(3, "Register a document");
    let content = b"hello-doc";
    for _ in 0..2 {
        let record = ledger.register_document(content, who.as_str())?;
        let ack = anchor.anchor(&record).await?;
        success(&format!(
            "{} v{} anchored ({})",
            record.digest, record.version, ack.receipt
        ));
    }

    section(4, "Look it up");
    match ledger.lookup_latest(content) {
        Some(record) => info("latest version", &record.version.to_string()),
        None => println!("  not found"),
    }
    info(
        "unknown content",
        if ledger.lookup_latest(b"other-doc").is_some() {
            "found"
        } else {
            "not found"
        },
    );
    info("records", &ledger.record_count().to_string());

    println!();
    Ok(())
}
