//! Reynard benchmark suite.
//!
//! Targets on a release build:
//!   memory_store_single .............. < 10μs
//!   memory_retrieve_top5_from_200 .... < 100μs
//!   knowledge_transfer ............... < 20μs
//!   world_tick_50_agents ............. < 2ms (the default tick budget)

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};

use reynard_bench::populated_world;
use reynard_core::memory::{Memory, MemoryComponent, MemoryType};
use reynard_core::types::SimTime;

fn bench_memory_store(c: &mut Criterion) {
    let mut component = MemoryComponent::new(1_000);
    let mut i = 0u64;
    c.bench_function("memory_store_single", |b| {
        b.iter(|| {
            i += 1;
            let memory = Memory::new(MemoryType::Episodic, "a fox crossed the road", 0.5, 0.1, SimTime::at(i as f64));
            black_box(component.store(black_box(memory)));
        });
    });
}

fn bench_memory_retrieve(c: &mut Criterion) {
    let mut component = MemoryComponent::new(1_000);
    for i in 0..200 {
        let memory_type = MemoryType::ALL[i % MemoryType::ALL.len()];
        component.store(Memory::new(memory_type, format!("event {i}"), 0.5, 0.1, SimTime::at(i as f64)));
    }
    let now = SimTime::at(1_000.0);
    c.bench_function("memory_retrieve_top5_from_200", |b| {
        b.iter(|| black_box(component.retrieve(black_box(None), 5, now)));
    });
}

fn bench_knowledge_transfer(c: &mut Criterion) {
    c.bench_function("knowledge_transfer", |b| {
        b.iter_batched(
            || populated_world(2, 0),
            |(mut world, ids)| {
                black_box(world.transfer_knowledge_by_title(&ids[0], &ids[1], "skill 0"));
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_world_tick(c: &mut Criterion) {
    let (mut world, _) = populated_world(50, 40);
    c.bench_function("world_tick_50_agents", |b| {
        b.iter(|| black_box(world.tick(black_box(0.1))));
    });
}

criterion_group!(
    benches,
    bench_memory_store,
    bench_memory_retrieve,
    bench_knowledge_transfer,
    bench_world_tick,
);
criterion_main!(benches);
