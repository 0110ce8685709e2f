use criterion::{black_box, criterion_group, criterion_main, Criterion};

use panelscore_core::catalog::Dimension;
use panelscore_core::extract::{extract, scanner};

fn payload() -> String {
    let scores: Vec<String> = Dimension::ALL
        .iter()
        .enumerate()
        .map(|(i, d)| {
            format!(
                "\"{}\": {{\"score\": {}, \"comment\": \"note {{{i}}} with \\\"quotes\\\"\"}}",
                d.key(),
                50 + i
            )
        })
        .collect();
    format!(
        "{{\"scores\": {{{}}}, \"overall_comment\": \"fine\", \"strengths\": [\"a\", \"b\"], \"suggestions\": \"practice\"}}",
        scores.join(", ")
    )
}

fn bench_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract");

    let bare = payload();
    let envelope = serde_json::json!({
        "choices": [{"message": {"content": bare.clone(), "reasoning_content": ""}}]
    })
    .to_string();
    let reasoning_only = serde_json::json!({
        "choices": [{"message": {"content": "", "reasoning_content": format!("Let me think.\n{bare}")}}]
    })
    .to_string();
    let commentary = format!("Here is my evaluation:\n```json\n{bare}\n```\nHope this helps.");
    let truncated = bare[..bare.len() / 2].to_string();

    group.bench_function("bare", |b| b.iter(|| extract(black_box(&bare))));
    group.bench_function("envelope", |b| b.iter(|| extract(black_box(&envelope))));
    group.bench_function("reasoning_only", |b| {
        b.iter(|| extract(black_box(&reasoning_only)))
    });
    group.bench_function("commentary", |b| b.iter(|| extract(black_box(&commentary))));
    group.bench_function("truncated", |b| b.iter(|| extract(black_box(&truncated))));

    group.finish();
}

fn bench_scanner(c: &mut Criterion) {
    let mut group = c.benchmark_group("scanner");

    let nested = {
        let mut s = String::new();
        for _ in 0..200 {
            s.push_str("{\"k\": [");
        }
        s.push('1');
        for _ in 0..200 {
            s.push_str("]}");
        }
        s
    };
    let bare = payload();

    group.bench_function("match_delimiter_nested", |b| {
        b.iter(|| scanner::match_delimiter(black_box(&nested), 0))
    });
    group.bench_function("object_members", |b| {
        b.iter(|| scanner::object_members(black_box(&bare)))
    });

    group.finish();
}

criterion_group!(benches, bench_extract, bench_scanner);
criterion_main!(benches);
