//! Protocol encoding/decoding benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use textrpc_protocol::{Decoder, Encoder, Request, Response};

fn create_test_request(arg_size: usize) -> Request {
    Request::new("rot13").with_arg("x".repeat(arg_size))
}

fn bench_request_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_encode");

    for size in [16, 256, 2048] {
        let request = create_test_request(size);

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(size), &request, |b, request| {
            b.iter(|| black_box(Encoder::encode_request(request).unwrap()));
        });
    }

    group.finish();
}

fn bench_request_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_decode");

    for size in [16, 256, 2048] {
        let encoded = Encoder::encode_request(&create_test_request(size)).unwrap();

        group.throughput(Throughput::Bytes(encoded.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &encoded, |b, encoded| {
            b.iter(|| black_box(Decoder::decode_request(encoded).unwrap()));
        });
    }

    group.finish();
}

fn bench_response_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("response_encode");

    for size in [16, 1024, 8000] {
        let response = Response::new("y".repeat(size));

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &response, |b, response| {
            b.iter(|| black_box(Encoder::encode_response(response)));
        });
    }

    group.finish();
}

fn bench_malformed_decode(c: &mut Criterion) {
    c.bench_function("request_decode_malformed", |b| {
        b.iter(|| black_box(Decoder::decode_request(br#"{"function": "rot13", "args": [1]}"#)));
    });
}

criterion_group!(
    benches,
    bench_request_encode,
    bench_request_decode,
    bench_response_encode,
    bench_malformed_decode
);
criterion_main!(benches);
