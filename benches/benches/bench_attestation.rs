use criterion::{criterion_group, criterion_main, Criterion};
use ed25519_dalek::SigningKey;
use inos_events::PeerId;
use inos_mesh::attestation::{respond, verify, AttestationChallenge, AttestationDataSource, Window};
use rand::rngs::{OsRng, StdRng};
use rand::SeedableRng;

struct FakeRegion(Vec<u8>);

impl AttestationDataSource for FakeRegion {
    fn read(&self, window: Window) -> Vec<u8> {
        let start = window.offset as usize;
        let end = (start + window.len as usize).min(self.0.len());
        self.0[start..end].to_vec()
    }
}

fn bench_challenge_generate(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(1);
    c.bench_function("attestation_generate", |b| {
        b.iter(|| AttestationChallenge::generate(PeerId(1), PeerId(2), 1_700_000_000_000, 1 << 20, &mut rng));
    });
}

fn bench_respond(c: &mut Criterion) {
    let signing_key = SigningKey::generate(&mut OsRng);
    let region = FakeRegion(vec![9u8; 1 << 20]);
    let mut rng = StdRng::seed_from_u64(2);
    let challenge = AttestationChallenge::generate(PeerId(1), PeerId(2), 1_700_000_000_000, region.0.len() as u64, &mut rng);

    c.bench_function("attestation_respond", |b| {
        b.iter(|| respond(&signing_key, &challenge, &region));
    });
}

fn bench_verify(c: &mut Criterion) {
    let signing_key = SigningKey::generate(&mut OsRng);
    let verifying_key = signing_key.verifying_key();
    let region = FakeRegion(vec![9u8; 1 << 20]);
    let mut rng = StdRng::seed_from_u64(3);
    let challenge = AttestationChallenge::generate(PeerId(1), PeerId(2), 1_700_000_000_000, region.0.len() as u64, &mut rng);
    let response = respond(&signing_key, &challenge, &region);
    // Reuse the responder's own digest as the expected digest: `hash_windows`
    // isn't exposed outside the mesh crate, and this is exactly what a
    // requester with a matching local copy would compute.
    let expected_digest = response.digest;

    c.bench_function("attestation_verify", |b| {
        b.iter(|| verify(&response, &challenge, &verifying_key, &expected_digest));
    });
}

criterion_group!(
    benches,
    bench_challenge_generate,
    bench_respond,
    bench_verify
);
criterion_main!(benches);
