// Benchmark tree-sitter extraction against the regex fallback.

use std::path::Path;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use tessera_graphs::languages::fallback::extract_fallback;
use tessera_graphs::{LanguageRegistry, MAX_SOURCE_BYTES, content_hash, extract_with_fallback};

fn generate_ts_source(functions: usize) -> String {
    use std::fmt::Write;
    let mut src = String::from("import { helper } from './helper';\n\n");
    for i in 0..functions {
        let _ = write!(
            src,
            "export function func_{i}(x: number): number {{\n    return helper(x + {i});\n}}\n\n"
        );
    }
    src
}

fn generate_python_source(functions: usize) -> String {
    use std::fmt::Write;
    let mut src = String::from("from .helper import helper\n\n");
    for i in 0..functions {
        let _ = write!(src, "def func_{i}(x):\n    return helper(x + {i})\n\n");
    }
    src
}

fn bench_tree_sitter(c: &mut Criterion) {
    let registry = LanguageRegistry::new();
    let mut group = c.benchmark_group("tree_sitter_extract");

    for (lang_id, path, generate) in [
        ("typescript", "bench.ts", generate_ts_source as fn(usize) -> String),
        ("python", "bench.py", generate_python_source),
    ] {
        let lang = registry.get(lang_id).unwrap();
        for func_count in [10, 50, 200] {
            let source = generate(func_count);
            group.bench_with_input(
                BenchmarkId::new(lang_id, func_count),
                &source,
                |b, src| {
                    b.iter(|| {
                        extract_with_fallback(lang.as_ref(), Path::new(path), Some(src), MAX_SOURCE_BYTES)
                    });
                },
            );
        }
    }
    group.finish();
}

fn bench_fallback(c: &mut Criterion) {
    let mut group = c.benchmark_group("regex_fallback");
    for func_count in [10, 50, 200] {
        let source = generate_ts_source(func_count);
        let hash = content_hash(&source);
        group.bench_with_input(
            BenchmarkId::new("typescript", func_count),
            &source,
            |b, src| {
                b.iter(|| extract_fallback("typescript", src, hash.clone()));
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_tree_sitter, bench_fallback);
criterion_main!(benches);
