// Challenge-response benchmarks for DocAuth.
//
// Covers challenge issuance, raw Ed25519 sign/verify, and the full
// issue -> sign -> verify handshake through the authenticator.

use criterion::{criterion_group, criterion_main, Criterion};

use docauth_protocol::auth::{sign_assertion, Authenticator, Challenge};
use docauth_protocol::config::AuthConfig;
use docauth_protocol::crypto::keys::IdentityKeypair;
use docauth_protocol::crypto::signatures::{sign, verify};
use docauth_protocol::identity::Identity;

fn bench_keypair_generation(c: &mut Criterion) {
    c.bench_function("ed25519/keypair_generate", |b| {
        b.iter(IdentityKeypair::generate);
    });
}

fn bench_sign_verify(c: &mut Criterion) {
    let keypair = IdentityKeypair::generate();
    let message = b"docauth/assertion/v1 did:example:abc";
    let signature = sign(&keypair, message);
    let public_key = keypair.public_key();

    c.bench_function("ed25519/sign_message", |b| {
        b.iter(|| sign(&keypair, message));
    });
    c.bench_function("ed25519/verify_signature", |b| {
        b.iter(|| verify(&public_key, message, &signature));
    });
}

fn bench_issue_challenge(c: &mut Criterion) {
    let auth = Authenticator::new(AuthConfig::default());

    c.bench_function("auth/issue_challenge", |b| {
        b.iter(|| auth.issue_challenge("did:example:abc"));
    });
}

fn bench_full_handshake(c: &mut Criterion) {
    let auth = Authenticator::new(AuthConfig::default());
    let keypair = IdentityKeypair::generate();
    let identity = Identity::new("did:example:abc").unwrap();

    c.bench_function("auth/issue_sign_verify", |b| {
        b.iter(|| {
            let challenge = auth.issue_challenge(identity.as_str()).unwrap();
            let assertion = sign_assertion(&keypair, &identity, &challenge);
            auth.verify_assertion(&assertion).unwrap()
        });
    });
}

fn bench_rejected_assertion(c: &mut Criterion) {
    let auth = Authenticator::new(AuthConfig::default());
    let keypair = IdentityKeypair::generate();
    let identity = Identity::new("did:example:abc").unwrap();
    auth.issue_challenge(identity.as_str()).unwrap();
    let mismatched = sign_assertion(&keypair, &identity, &Challenge::generate());

    // Mismatch is rejected before signature verification.
    c.bench_function("auth/reject_mismatch", |b| {
        b.iter(|| auth.verify_assertion(&mismatched));
    });
}

criterion_group!(
    benches,
    bench_keypair_generation,
    bench_sign_verify,
    bench_issue_challenge,
    bench_full_handshake,
    bench_rejected_assertion,
);
criterion_main!(benches);
