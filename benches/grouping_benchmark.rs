//! Benchmarks for line reconstruction and content walking.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use pdf2json::parser::{walk_content, ContentOp, PdfValue};
use pdf2json::{assemble_document, group_fragments_into_lines, sniff_header, TextFragment};

/// Fragments of a statement-like page: `rows` baselines 14pt apart, each
/// with a few columns drawn out of order and jittered around the baseline.
fn synthetic_fragments(rows: usize) -> Vec<TextFragment> {
    let mut fragments = Vec::with_capacity(rows * 4);
    for col in 0..4 {
        for row in 0..rows {
            let jitter = ((row * 7 + col * 3) % 5) as f32 * 0.15;
            let y = 760.0 - row as f32 * 14.0 + jitter;
            if let Some(fragment) = TextFragment::new(format!("r{}c{}", row, col), y) {
                fragments.push(fragment);
            }
        }
    }
    fragments
}

fn synthetic_ops(rows: usize) -> Vec<ContentOp> {
    let mut ops = vec![
        ContentOp::new("BT", vec![]),
        ContentOp::new("TL", vec![PdfValue::Integer(14)]),
        ContentOp::new("Td", vec![PdfValue::Integer(72), PdfValue::Integer(760)]),
    ];
    for row in 0..rows {
        ops.push(ContentOp::new(
            "TJ",
            vec![PdfValue::Array(vec![
                PdfValue::Str(format!("Item {}", row).into_bytes()),
                PdfValue::Integer(-3000),
                PdfValue::Str(b"12.50".to_vec()),
            ])],
        ));
        ops.push(ContentOp::new("T*", vec![]));
    }
    ops.push(ContentOp::new("ET", vec![]));
    ops
}

fn bench_header_sniff(c: &mut Criterion) {
    let pdf = b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n1 0 obj\n<< /Type /Catalog >>\nendobj\n";
    let not_pdf = b"Not a PDF file at all, just random text content";

    c.bench_function("sniff_valid_pdf", |b| {
        b.iter(|| sniff_header(black_box(pdf)).is_ok());
    });

    c.bench_function("sniff_non_pdf", |b| {
        b.iter(|| sniff_header(black_box(not_pdf)).is_err());
    });
}

fn bench_grouping(c: &mut Criterion) {
    let mut group = c.benchmark_group("group_fragments_into_lines");

    for rows in [10, 50, 200].iter() {
        let fragments = synthetic_fragments(*rows);
        group.bench_with_input(BenchmarkId::from_parameter(rows), &fragments, |b, f| {
            b.iter(|| group_fragments_into_lines(black_box(f.clone()), 1.0));
        });
    }

    group.finish();
}

fn bench_walk_content(c: &mut Criterion) {
    let ops = synthetic_ops(200);

    c.bench_function("walk_content_200_rows", |b| {
        b.iter(|| {
            walk_content(black_box(&ops), |_, bytes| {
                String::from_utf8_lossy(bytes).into_owned()
            })
        });
    });
}

fn bench_assembly(c: &mut Criterion) {
    let pages: Vec<_> = (0..20)
        .map(|_| group_fragments_into_lines(synthetic_fragments(50), 1.0))
        .collect();

    c.bench_function("assemble_20_pages", |b| {
        b.iter(|| assemble_document(black_box(&pages)));
    });
}

criterion_group!(
    benches,
    bench_header_sniff,
    bench_grouping,
    bench_walk_content,
    bench_assembly,
);
criterion_main!(benches);
