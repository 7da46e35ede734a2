//! Lottery engine benchmarks
//!
//! Measures draw cost as the waiting list grows, for a small and a
//! pool-sized capacity, plus a full join-and-draw command cycle.
//!
//! Run with: `cargo bench -p event-lottery-core`

#![allow(missing_docs)] // Benchmarks don't need extensive docs
#![allow(clippy::expect_used)] // Benchmarks can use expect for setup

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use event_lottery_core::lottery::{SeededRandom, select_winners};
use event_lottery_core::types::{Capacity, EntrantId, EventId};
use event_lottery_core::{EntrantSet, EventCommand, EventRecord};

fn pool(size: usize) -> EntrantSet {
    (0..size).map(|i| EntrantId::new(format!("entrant-{i:06}"))).collect()
}

fn bench_select_winners(c: &mut Criterion) {
    let mut group = c.benchmark_group("select_winners");
    let rng = SeededRandom::new(7);
    let none = EntrantSet::new();

    for size in [100usize, 1_000, 10_000] {
        let waiting = pool(size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("capacity_50", size), &waiting, |b, waiting| {
            b.iter(|| select_winners(black_box(waiting), Capacity::new(50), &none, &rng));
        });

        let all = Capacity::new(u32::try_from(size).expect("benchmark sizes fit in u32"));
        group.bench_with_input(BenchmarkId::new("capacity_all", size), &waiting, |b, waiting| {
            b.iter(|| select_winners(black_box(waiting), all, &none, &rng));
        });
    }

    group.finish();
}

fn bench_command_cycle(c: &mut Criterion) {
    let rng = SeededRandom::new(11);

    c.bench_function("join_1000_then_draw_100", |b| {
        b.iter(|| {
            let mut event =
                EventRecord::new(EventId::new("bench"), "Bench", Some(Capacity::new(100)));
            for entrant in pool(1_000) {
                EventCommand::Join { entrant }
                    .apply(&mut event, &rng)
                    .expect("fresh entrants join");
            }
            EventCommand::RunLottery
                .apply(&mut event, &rng)
                .expect("draw succeeds");
            black_box(event)
        });
    });
}

criterion_group!(benches, bench_select_winners, bench_command_cycle);
criterion_main!(benches);
