//! Benchmarks for end-to-end decisions.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use proofgate::audit;
use proofgate::domain::DomainRegistry;
use proofgate::pipeline::DecisionPipeline;

const ICU_QUERY: &str =
    "Patient has chest pain for 30 minutes and blood pressure 170/110. Transfer to ICU?";

fn medical() -> DecisionPipeline {
    let registry = DomainRegistry::bundled();
    let pack = registry.get("medical").unwrap();
    pack.compile_with(pack.config.clone().with_threshold(0.7)).unwrap()
}

fn bench_decide(c: &mut Criterion) {
    let pipeline = medical();
    c.bench_function("decide_escalation", |bench| {
        bench.iter(|| black_box(pipeline.decide(black_box(ICU_QUERY))))
    });
    c.bench_function("decide_refusal", |bench| {
        bench.iter(|| black_box(pipeline.decide(black_box("hack the hospital login"))))
    });
}

fn bench_verification_code(c: &mut Criterion) {
    let decision = medical().decide(ICU_QUERY);
    c.bench_function("verification_code_4_nodes", |bench| {
        bench.iter(|| black_box(audit::verification_code(&decision.proof_chain)))
    });
}

fn bench_batch(c: &mut Criterion) {
    let pipeline = medical();
    let queries: Vec<&str> = (0..64)
        .map(|i| if i % 2 == 0 { ICU_QUERY } else { "xyzzy" })
        .collect();
    c.bench_function("decide_batch_64", |bench| {
        bench.iter(|| black_box(pipeline.decide_batch(&queries)))
    });
}

criterion_group!(benches, bench_decide, bench_verification_code, bench_batch);
criterion_main!(benches);
