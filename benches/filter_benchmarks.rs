use std::net::SocketAddr;
use std::sync::Arc;

use adaptive_timesync::filter::{FilterBank, FilterConfig, Sample};
use adaptive_timesync::server::{ClientRegistry, Dispatcher, Telemetry};
use adaptive_timesync::{CorrectionPacket, ProbePacket, Scheme};
use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};

fn samples(n: u64) -> Vec<Sample> {
    (0..n)
        .map(|i| Sample {
            raw_offset_us: 1_000.0 + ((i * 37) % 101) as f64,
            received_at_us: i * 10_000,
        })
        .collect()
}

fn benchmark_filters(c: &mut Criterion) {
    let config = FilterConfig::default();
    let input = samples(1024);

    for scheme in [Scheme::Ewma, Scheme::Kalman, Scheme::Pid] {
        c.bench_function(&format!("filter_{scheme}_1024"), |b| {
            b.iter_batched(
                FilterBank::new,
                |mut bank| {
                    for s in &input {
                        black_box(bank.apply(scheme, &config, *s).ok());
                    }
                    bank
                },
                BatchSize::SmallInput,
            );
        });
    }
}

fn benchmark_codec(c: &mut Criterion) {
    let probe = ProbePacket::new(Scheme::Kalman, 42, 1_700_000_000_000_000).encode();
    c.bench_function("probe_decode", |b| {
        b.iter(|| ProbePacket::decode(black_box(&probe)));
    });

    let reply = CorrectionPacket::raw(42, -1234);
    c.bench_function("correction_encode_raw", |b| {
        b.iter(|| black_box(&reply).encode());
    });
}

fn benchmark_dispatch(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let dispatcher = Dispatcher::new(
        Arc::new(ClientRegistry::new(16)),
        FilterConfig::default(),
        Telemetry::new(16),
    );
    let probe = ProbePacket::new(Scheme::Ewma, 1, 1_000).encode();
    let origins: Vec<SocketAddr> = (0..64u16)
        .map(|p| SocketAddr::from(([10, 0, 0, 1], 6000 + p)))
        .collect();

    let (dispatcher, origins, probe) = (&dispatcher, &origins, &probe);
    c.bench_function("dispatch_64_clients", |b| {
        b.to_async(&rt).iter(|| async move {
            for origin in origins {
                black_box(dispatcher.handle(probe, *origin, 2_000).await);
            }
        });
    });
}

criterion_group!(benches, benchmark_filters, benchmark_codec, benchmark_dispatch);
criterion_main!(benches);
