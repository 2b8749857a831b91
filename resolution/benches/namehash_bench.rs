// Namehash and ABI codec benchmarks.
//
// Covers both namehash families over domains of increasing depth, the
// incremental childhash, and encoding/decoding of a typical getData round
// trip.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use resolution::abi::{decode, encode, ParamType, Token};
use resolution::crypto::{eth_namehash, zns_namehash, NamehashFamily};
use resolution::Address;

fn domain_of_depth(depth: usize) -> String {
    let mut labels: Vec<String> = (0..depth.saturating_sub(1)).map(|i| format!("label{}", i)).collect();
    labels.push("crypto".to_string());
    labels.join(".")
}

fn bench_namehash(c: &mut Criterion) {
    let mut group = c.benchmark_group("namehash");
    for depth in [1usize, 2, 4, 8] {
        let domain = domain_of_depth(depth);
        group.bench_with_input(BenchmarkId::new("keccak", depth), &domain, |b, d| {
            b.iter(|| eth_namehash(black_box(d)));
        });
        group.bench_with_input(BenchmarkId::new("sha256", depth), &domain, |b, d| {
            b.iter(|| zns_namehash(black_box(d)));
        });
    }
    group.finish();
}

fn bench_childhash(c: &mut Criterion) {
    let parent = eth_namehash("crypto");
    c.bench_function("namehash/childhash", |b| {
        b.iter(|| NamehashFamily::Ethereum.childhash(black_box(&parent), black_box("brad")));
    });
}

fn bench_get_data_codec(c: &mut Criterion) {
    let keys: Vec<String> = (0..16).map(|i| format!("crypto.TOKEN{}.address", i)).collect();
    let args = [
        Token::string_array(&keys),
        Token::from(eth_namehash("brad.crypto")),
    ];
    let input_types = [ParamType::parse("string[]").unwrap(), ParamType::Uint(256)];

    c.bench_function("abi/encode_get_data", |b| {
        b.iter(|| encode(black_box(&input_types), black_box(&args)).unwrap());
    });

    let output_types = [
        ParamType::Address,
        ParamType::Address,
        ParamType::parse("string[]").unwrap(),
    ];
    let reply = encode(
        &output_types,
        &[
            Token::Address(Address([0x95; 20])),
            Token::Address(Address([0x49; 20])),
            Token::string_array(&keys),
        ],
    )
    .unwrap();
    c.bench_function("abi/decode_get_data", |b| {
        b.iter(|| decode(black_box(&output_types), black_box(&reply)).unwrap());
    });
}

criterion_group!(benches, bench_namehash, bench_childhash, bench_get_data_codec);
criterion_main!(benches);
