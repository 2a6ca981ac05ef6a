use std::time::Duration;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use mandel_core::Size;
use mandel_render::{Renderer, RendererConfig};

criterion_main!(benches);
criterion_group!(benches, bench_multithread);

/// Formats quick enough to run a full frame per sample.
const FORMATS: &[&str] = &["f64", "f32", "complex128", "decimal128", "FixedDecimal<10>"];

/// Benchmark several formats in the base window, across threads.
pub fn bench_multithread(c: &mut Criterion) {
    let mut group = c.benchmark_group("multithreading-base");

    let size = Size::new(256, 192);
    // Count pixels:
    group.throughput(criterion::Throughput::Elements(size.pixels() as u64));
    // Don't spend too long preparing:
    group.warm_up_time(Duration::from_secs(1));
    group.sample_size(10);

    // Count up powers of two:
    let thread_range = (0..).map(|x| 1 << x).take_while({
        let x = num_cpus::get().next_power_of_two();
        move |y| (*y <= x)
    });
    for threads in thread_range {
        for &numeric in FORMATS {
            let mut renderer = Renderer::new(RendererConfig {
                size,
                ..RendererConfig::default()
            })
            .unwrap();
            renderer.set_backend_by_name(numeric).unwrap();

            group.bench_with_input(BenchmarkId::new(numeric, threads), &threads, |b, &threads| {
                b.iter(|| {
                    renderer.render(16, threads).unwrap();
                    renderer.wait();
                })
            });
        }
    }

    group.finish();
}
