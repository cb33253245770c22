use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use fishtank_core::{Aquarium, AquariumConfig, FishDescriptor, FishId, RarityTier};

const FRAME_DT: f32 = 1.0 / 60.0;
const STEPS: usize = 240;

fn roster(count: usize) -> Vec<FishDescriptor> {
    (0..count)
        .map(|index| FishDescriptor {
            id: FishId(index as u64),
            x: 5.0 + (index as f32 * 13.7) % 90.0,
            y: 5.0 + (index as f32 * 7.3) % 90.0,
            tier: match index % 5 {
                0 => RarityTier::Common,
                1 => RarityTier::Uncommon,
                2 => RarityTier::Rare,
                3 => RarityTier::Epic,
                _ => RarityTier::Legendary,
            },
        })
        .collect()
}

fn bench_frame_steps(c: &mut Criterion) {
    let mut group = c.benchmark_group("aquarium_step");
    for &count in &[8usize, 64, 256] {
        group.bench_function(format!("steps{STEPS}_fish{count}"), |b| {
            let roster = roster(count);
            b.iter_batched(
                || {
                    let config = AquariumConfig {
                        rng_seed: Some(0xBEEF),
                        summary_interval: 0,
                        ..AquariumConfig::default()
                    };
                    Aquarium::new(config).expect("aquarium")
                },
                |mut aquarium| {
                    for frame in 0..STEPS {
                        if frame % 20 == 0 {
                            aquarium.spawn_food(400.0, 300.0);
                        }
                        if frame % 120 == 0 {
                            aquarium.sweep_expired();
                        }
                        aquarium.step(&roster, FRAME_DT);
                    }
                    aquarium
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_frame_steps);
criterion_main!(benches);
