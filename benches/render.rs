use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use crueltycheck::{Alternative, EvaluationResult, MemoryReport, render, render_markdown};

fn negative_result(items: usize) -> EvaluationResult {
    EvaluationResult {
        cruelty_free: false,
        company_name: "Acme Cosmetics".to_string(),
        parent_company: Some("MegaCorp Holdings".to_string()),
        offenses: (0..items)
            .map(|i| format!("offense #{i}: sells in markets that require animal testing"))
            .collect(),
        alternatives: (0..items)
            .map(|i| {
                if i % 2 == 0 {
                    Alternative::Name(format!("Alternative {i}"))
                } else {
                    Alternative::Company {
                        company_name: format!("Alternative Co {i}"),
                    }
                }
            })
            .collect(),
        parent_company_cruelty_free: Some(false),
        sells_products_tested_on_animals: Some(true),
    }
}

fn bench_render_html(c: &mut Criterion) {
    for &items in &[0usize, 5, 50] {
        let result = negative_result(items);
        c.bench_with_input(BenchmarkId::new("render_html", items), &result, |b, result| {
            b.iter(|| black_box(render(result)));
        });
    }
}

fn bench_render_markdown(c: &mut Criterion) {
    let result = negative_result(5);
    c.bench_function("render_markdown", |b| {
        b.iter(|| black_box(render_markdown(&result)));
    });
}

fn bench_apply(c: &mut Criterion) {
    let rendered = render(&negative_result(5));
    c.bench_function("apply_to_container", |b| {
        b.iter(|| {
            let mut container = MemoryReport::default();
            rendered.apply(&mut container);
            black_box(container.class_attr());
        });
    });
}

criterion_group!(benches, bench_render_html, bench_render_markdown, bench_apply);
criterion_main!(benches);
