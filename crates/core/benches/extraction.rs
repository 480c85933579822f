use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use stash_core::{
    Document, ExtractConfig, Extractor, PreprocessConfig, excerpt, extract_content, html_to_text, preprocess_html,
    word_count,
};

fn synthetic_article(paragraphs: usize) -> String {
    let sentence = "Tide pools hold anemones, snails, and crabs that adapt to constant change. ";
    let body: String = (0..paragraphs)
        .map(|i| {
            format!(
                r#"<div class="block-{i}"><p>{}</p><a href="/related/{i}">Related story {i}</a></div>"#,
                sentence.repeat(6)
            )
        })
        .collect();

    format!(
        r#"<html><head><title>Bench</title><script>var x = 1;</script></head>
        <body><nav><a href="/">Home</a></nav><article class="post">{body}</article>
        <div id="comments"><p>Nice post.</p></div><footer>Footer</footer></body></html>"#
    )
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    for paragraphs in [10, 100, 1000] {
        let html = synthetic_article(paragraphs);
        group.bench_with_input(BenchmarkId::new("paragraphs", paragraphs), &html, |b, html| {
            b.iter(|| Document::parse(black_box(html)))
        });
    }

    group.finish();
}

fn bench_full_extraction(c: &mut Criterion) {
    let html = synthetic_article(100);
    let extractor = Extractor::new();

    c.bench_function("full_extraction", |b| b.iter(|| extractor.extract(black_box(&html), None)));
}

fn bench_preprocess(c: &mut Criterion) {
    let html = synthetic_article(100);
    let config = PreprocessConfig::default();

    c.bench_function("preprocess", |b| b.iter(|| preprocess_html(black_box(&html), &config)));
}

fn bench_scoring(c: &mut Criterion) {
    let preprocessed = preprocess_html(&synthetic_article(100), &PreprocessConfig::default());
    let doc = Document::parse(&preprocessed);
    let config = ExtractConfig::default();

    c.bench_function("scoring_and_selection", |b| {
        b.iter(|| extract_content(black_box(&doc), black_box(&config)))
    });
}

fn bench_derive(c: &mut Criterion) {
    let extracted = extract_content(
        &Document::parse(&preprocess_html(&synthetic_article(100), &PreprocessConfig::default())),
        &ExtractConfig::default(),
    )
    .map(|content| html_to_text(&content.content))
    .unwrap_or_default();

    c.bench_function("derive_fields", |b| {
        b.iter(|| {
            let words = word_count(Some(black_box(&extracted)));
            let preview = excerpt(Some(black_box(&extracted)), 300);
            (words, preview)
        })
    });
}

criterion_group!(
    benches,
    bench_parse,
    bench_full_extraction,
    bench_preprocess,
    bench_scoring,
    bench_derive
);
criterion_main!(benches);
