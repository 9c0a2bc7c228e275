// SPDX short identifier: Unlicense

use criterion::{
    criterion_group,
    criterion_main,
    Criterion,
    BenchmarkId
};
use rand::{thread_rng, Rng};

const RING_SIZES: [usize; 8] = [2, 4, 8, 16, 32, 64, 100, 128];

use ringvrm::{
    common::*,
    signature::{
        RingSignature,
        generate_ring_proof,
        parse_ring_proof
    }
};

fn random_ring(x: usize) -> (Vec<SigningKey>, Ring) {
    let keys: Vec<SigningKey> = (0..x).map(|_| SigningKey::generate()).collect();
    let mut ring: Ring = Ring::new();
    for (i, key) in keys.iter().enumerate() {
        ring.push(key.to_member(format!("member-{i}")));
    }
    return (keys, ring)
}

fn lsag_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("LSAG");
    group.sample_size(20);

    //prove
    for x in RING_SIZES {
        let (keys, ring) = random_ring(x);
        let index = thread_rng().gen::<usize>() % x;

        let params = (ring, keys, index);
        group.bench_with_input(BenchmarkId::new("sign", format!("Ring size: {x}")), &params,
            |b, (ring, keys, index)| b.iter(|| {
                RingSignature::generate(b"abcdef", &keys[*index], ring, *index).unwrap()
            }));
    }

    //verify
    for x in RING_SIZES {
        let (keys, ring) = random_ring(x);
        let index = thread_rng().gen::<usize>() % x;
        let sig = RingSignature::generate(b"abcdef", &keys[index], &ring, index).unwrap();

        group.bench_with_input(BenchmarkId::new("verify", format!("Ring size: {x}")), &sig,
            |b, sig| b.iter(|| {
                assert!(sig.verify(b"abcdef"))
            }));
    }

    //ring proofs
    for x in [8, 100] {
        let (keys, ring) = random_ring(x);
        let sig = RingSignature::generate(b"abcdef", &keys[0], &ring, 0).unwrap();
        let proof = generate_ring_proof(&sig).unwrap();

        group.bench_with_input(BenchmarkId::new("encode proof", format!("Ring size: {x}")), &sig,
            |b, sig| b.iter(|| {
                generate_ring_proof(sig).unwrap()
            }));
        group.bench_with_input(BenchmarkId::new("parse proof", format!("Ring size: {x}")), &proof,
            |b, proof| b.iter(|| {
                parse_ring_proof(proof).unwrap()
            }));
    }
}


criterion_group!(signature_ringvrm, lsag_benchmark);
criterion_main!(signature_ringvrm);
