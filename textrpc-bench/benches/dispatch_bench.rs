//! Dispatcher benchmarks: lookup, counting, and handler cost without I/O.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use textrpc_core::{builtin_registry, LsCommand};
use textrpc_protocol::Request;
use textrpc_server::Dispatcher;

fn dispatcher() -> Dispatcher {
    Dispatcher::new(builtin_registry(LsCommand::default()).unwrap())
}

fn bench_dispatch(c: &mut Criterion) {
    let dispatcher = dispatcher();
    let mut group = c.benchmark_group("dispatch");

    let rot13 = Request::new("rot13").with_arg("The quick brown fox");
    group.bench_function("rot13", |b| {
        b.iter(|| black_box(dispatcher.dispatch(&rot13)));
    });

    let max_even = Request::new("max_even").with_args(["17", "0x2a", "-8", "0b110", "1_000"]);
    group.bench_function("max_even", |b| {
        b.iter(|| black_box(dispatcher.dispatch(&max_even)));
    });

    let help = Request::new("help");
    group.bench_function("help", |b| {
        b.iter(|| black_box(dispatcher.dispatch(&help)));
    });

    let unknown = Request::new("no_such_function");
    group.bench_function("unknown", |b| {
        b.iter(|| black_box(dispatcher.dispatch(&unknown)));
    });

    group.finish();
}

criterion_group!(benches, bench_dispatch);
criterion_main!(benches);
