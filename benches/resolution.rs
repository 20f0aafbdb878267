//! Resolution Benchmarks
//!
//! Cached document lookup, object resolution and content stream parsing.
//!
//! Run with: `cargo bench --bench resolution`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use lopdf::{dictionary, Document, Object, Stream};
use tempfile::TempDir;

use pdf_inspector_server::document::{dispatch, DocumentCache, Resolver, Subview};
use pdf_inspector_server::pdf::content;

const DOCUMENT_NAME: &str = "bench.pdf";

/// A content stream of `lines` positioned text runs
fn text_content(lines: usize) -> Vec<u8> {
    let mut content = String::from("BT /F1 10 Tf 12 TL 72 760 Td\n");
    for line in 0..lines {
        content.push_str(&format!("[(Line) -120 ({line})] TJ T*\n"));
    }
    content.push_str("ET\n");
    content.into_bytes()
}

/// Single-page PDF whose page carries `lines` lines of text
fn create_pdf(lines: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "FirstChar" => 32,
        "Widths" => vec![Object::Integer(278); 95],
    });
    let content_id = doc.add_object(Stream::new(dictionary! {}, text_content(lines)));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
    });
    doc.objects.insert(
        pages_id,
        dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }
        .into(),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).expect("Failed to serialize PDF");
    buffer
}

/// Benchmark resolution against an already cached document
fn bench_cached_resolution(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("Failed to build runtime");
    let dir = TempDir::new().expect("Failed to create temp dir");
    std::fs::write(dir.path().join(DOCUMENT_NAME), create_pdf(100)).expect("Failed to write PDF");

    let resolver = Resolver::new(DocumentCache::new(dir.path()));
    runtime
        .block_on(resolver.document(DOCUMENT_NAME))
        .expect("Failed to warm cache");

    let mut group = c.benchmark_group("cached_resolution");

    group.bench_function("document", |b| {
        b.iter(|| {
            let context = runtime
                .block_on(resolver.document(black_box(DOCUMENT_NAME)))
                .expect("Failed to resolve document");
            black_box(context)
        })
    });

    group.bench_function("page", |b| {
        b.iter(|| {
            let context = runtime
                .block_on(resolver.document(DOCUMENT_NAME))
                .expect("Failed to resolve document");
            let page = resolver.page(&context, black_box(1)).expect("Failed to resolve page");
            black_box(page)
        })
    });

    group.bench_function("object_view", |b| {
        b.iter(|| {
            let context = runtime
                .block_on(resolver.document(DOCUMENT_NAME))
                .expect("Failed to resolve document");
            let object = resolver
                .object(&context, black_box(2), None)
                .expect("Failed to resolve object");
            let view = dispatch::decode(
                &context.document,
                object.id,
                dispatch::classify(object.object),
                Subview::Object,
            );
            black_box(view)
        })
    });

    group.finish();
}

/// Benchmark strict content stream parsing at different sizes
fn bench_content_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("content_parsing");

    for lines in [10, 100, 1000] {
        let data = text_content(lines);
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::new("text_lines", lines), &data, |b, data| {
            b.iter(|| {
                let operations = content::parse(black_box(data)).expect("Failed to parse content");
                black_box(operations)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_cached_resolution, bench_content_parsing);
criterion_main!(benches);
