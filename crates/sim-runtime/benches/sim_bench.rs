use criterion::{criterion_group, criterion_main, Criterion};
use sim_core::{OptionId, SimConfig};
use sim_runtime::Engine;
use std::sync::Arc;

fn bench_full_run(c: &mut Criterion) {
    let content = match data_pipeline::load_embedded() {
        Ok(content) => Arc::new(content),
        Err(err) => panic!("embedded content: {err:#}"),
    };
    c.bench_function("forty_month_run", |b| {
        b.iter(|| {
            let config = SimConfig {
                rng_seed: 42,
                ..SimConfig::default()
            };
            let mut engine = Engine::new(Arc::clone(&content), config);
            while !engine.state().is_terminal() {
                if engine.state().current_event.is_some() {
                    engine.resolve_choice(OptionId::B);
                }
                engine.dismiss_bill();
                engine.advance_month();
            }
            engine.state().month
        })
    });
}

criterion_group!(benches, bench_full_run);
criterion_main!(benches);
