// SPDX short identifier: Unlicense

use criterion::{
    black_box,
    criterion_group,
    criterion_main,
    Criterion,
    BenchmarkId
};
use rand::thread_rng;
use std::time::Duration;
use ringvrm::{
    bls::*,
    common::*,
    hashes::*
};

fn ristretto_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("Ristretto");
    group.sample_size(40);
    group.measurement_time(Duration::from_secs(3));


    let params = (*random_scalar().as_bytes(), *random_scalar().as_bytes());
    group.bench_with_input(BenchmarkId::new("Scalar", "deterministic"), &params,
    |b, (p1, p2) | b.iter(|| {
        black_box(Transcript::new(b"bench").append(p1).append(p2).to_scalar());
    }));
    group.bench_with_input(BenchmarkId::new("Scalar", "random"), &(),
    |b, () | b.iter(|| {
        black_box(random_scalar());
    }));
    group.bench_with_input(BenchmarkId::new("Point", "hashed"), b"abcdef",
    |b, p | b.iter(|| {
        black_box(domain_h_point(p, domains::SIGNATURE_KEY_IMAGE));
    }));


    let params = random_point();
    group.bench_with_input(BenchmarkId::new("Encode", "Regular/1"), &params,
    |b, p | b.iter(|| {
        black_box(encode_point(p));
    }));
    let params = encode_point(&random_point());
    group.bench_with_input(BenchmarkId::new("Decode", "Regular/1"), &params,
    |b, p | b.iter(|| {
        black_box(decode_point(p).unwrap());
    }));


    let params = (random_scalar(), random_point());
    group.bench_with_input(BenchmarkId::new("Multiply", "RistrettoPoint"), &params,
    |b, (s, p) | b.iter(|| {
        black_box(s * p);
    }));
    let params = random_scalar();
    group.bench_with_input(BenchmarkId::new("Multiply", "RistrettoBasepointTable"), &params,
    |b, s | b.iter(|| {
        black_box(s * G);
    }));


    let params = (random_scalar(), random_scalar(), random_point(), random_point());
    group.bench_with_input(BenchmarkId::new("MultiscalarMultiply", "2"), &params,
    |b, (s1, s2, p1, p2) | b.iter(|| {
        black_box(RistrettoPoint::multiscalar_mul(vec!(s1, s2), vec!(p1, p2)));
    }));
    let params = (random_scalar(), random_scalar(), random_point(), random_point());
    group.bench_with_input(BenchmarkId::new("MultiscalarMultiply", "2-Vartime"), &params,
    |b, (s1, s2, p1, p2) | b.iter(|| {
        black_box(RistrettoPoint::vartime_multiscalar_mul(vec!(s1, s2), vec!(p1, p2)));
    }));
    let params = (random_scalar(), random_scalar(), random_point(), VartimeRistrettoPrecomputation::new(vec!(random_point())));
    group.bench_with_input(BenchmarkId::new("MultiscalarMultiplyPrecomputed", "1/1-Vartime"), &params,
    |b, (s1, s2, p1, p2) | b.iter(|| {
        black_box(p2.vartime_mixed_multiscalar_mul(vec!(s1), vec!(s2), vec!(p1)));
    }));
}

fn bls_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("BLS12-381 G1");
    group.sample_size(20);
    group.measurement_time(Duration::from_secs(3));


    group.bench_with_input(BenchmarkId::new("Scalar", "random"), &(),
    |b, () | b.iter(|| {
        black_box(random_fr(&mut thread_rng()));
    }));

    let params = (random_fr(&mut thread_rng()), g1_generator());
    group.bench_with_input(BenchmarkId::new("Multiply", "G1"), &params,
    |b, (s, p) | b.iter(|| {
        black_box((*p * s).into_affine());
    }));

    let params = (g1_generator() * random_fr(&mut thread_rng())).into_affine();
    group.bench_with_input(BenchmarkId::new("Encode", "G1"), &params,
    |b, p | b.iter(|| {
        black_box(encode_g1(p));
    }));
    let params = encode_g1(&params);
    group.bench_with_input(BenchmarkId::new("Decode", "G1"), &params,
    |b, p | b.iter(|| {
        black_box(decode_g1(p).unwrap());
    }));
}

criterion_group!(curves, ristretto_benchmark, bls_benchmark);
criterion_main!(curves);
