//! Mixed-stage end-to-end benchmark: archive decode through hybrid search,
//! the same path `webindex::open` drives, with a deterministic stub engine
//! standing in for the ONNX model so the numbers reflect this crate's own
//! code rather than model load time.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use orchestrator::{CancelToken, Orchestrator, OrchestratorConfig};
use retriever::SearchMode;
use semantic::StubEmbeddingEngine;
use tokenizer::{ChunkerConfig, Vocabulary};

const WORDS: &[&str] = &[
    "alpha", "bravo", "charlie", "delta", "echo", "foxtrot", "golf", "hotel", "india", "juliet",
    "kilo", "lima", "mike", "november", "oscar", "papa", "quebec", "romeo", "sierra", "tango",
];

fn vocab() -> Vocabulary {
    let mut tokens: Vec<String> = vec!["[UNK]", "[CLS]", "[SEP]"]
        .into_iter()
        .map(str::to_string)
        .collect();
    tokens.extend(WORDS.iter().map(|w| w.to_string()));
    Vocabulary::from_tokens(tokens).unwrap()
}

fn body(word_count: usize) -> String {
    (0..word_count).map(|i| WORDS[i % WORDS.len()]).collect::<Vec<_>>().join(" ")
}

fn archive_bytes(word_count: usize) -> Vec<u8> {
    format!(
        "Content-Type: multipart/related; boundary=\"B\"\r\n\r\n\
         --B\r\n\
         Content-Type: text/html; charset=utf-8\r\n\r\n\
         <html><body><article><p>{}</p></article></body></html>\r\n\
         --B--\r\n",
        body(word_count)
    )
    .into_bytes()
}

fn bench_ingest(c: &mut Criterion) {
    let mut group = c.benchmark_group("ingest");

    for page_count in [10usize, 100].iter() {
        group.throughput(Throughput::Elements(*page_count as u64));
        group.bench_function(format!("pages_{page_count}"), |b| {
            b.iter(|| {
                let dir = tempfile::tempdir().unwrap();
                let orch = Orchestrator::open(
                    dir.path(),
                    vocab(),
                    ChunkerConfig::new(64, 8),
                    StubEmbeddingEngine::new(64),
                    OrchestratorConfig::default(),
                    index::BM25Config::default(),
                )
                .unwrap();

                let rt = tokio::runtime::Runtime::new().unwrap();
                rt.block_on(async {
                    for i in 0..*page_count {
                        orch.ingest(
                            black_box(&archive_bytes(120)),
                            &format!("https://example.com/{i}"),
                            None,
                            i as u64,
                            &CancelToken::new(),
                        )
                        .await
                        .unwrap();
                    }
                });
            });
        });
    }

    group.finish();
}

fn bench_hybrid_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("hybrid_search");
    let dir = tempfile::tempdir().unwrap();
    let orch = Orchestrator::open(
        dir.path(),
        vocab(),
        ChunkerConfig::new(64, 8),
        StubEmbeddingEngine::new(64),
        OrchestratorConfig::default(),
        index::BM25Config::default(),
    )
    .unwrap();

    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async {
        for i in 0..500usize {
            orch.ingest(&archive_bytes(120), &format!("https://example.com/{i}"), None, i as u64, &CancelToken::new())
                .await
                .unwrap();
        }
    });

    group.bench_function("top10_over_500_pages", |b| {
        b.iter(|| {
            let hits = rt.block_on(orch.search(black_box("alpha bravo charlie"), black_box(10), SearchMode::Hybrid));
            black_box(hits.unwrap());
        });
    });

    group.finish();
}

criterion_group!(end_to_end_benches, bench_ingest, bench_hybrid_search);
criterion_main!(end_to_end_benches);
