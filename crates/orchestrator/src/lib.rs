//! Public ingest and search entrypoints: lifecycle, concurrency, idempotence.
//!
//! [`Orchestrator`] owns every long-lived singleton the pipeline needs
//! (vocabulary, chunker, embedding engine, inverted index, vector store,
//! storage handle) and composes the per-stage crates into the two
//! operations callers actually want: `ingest` and `search`. It is generic
//! over [`EmbeddingEngine`] so tests can inject
//! [`semantic::StubEmbeddingEngine`] instead of loading a real ONNX model.

mod config;
mod error;

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, RwLock, Semaphore};
use uuid::Uuid;

use index::{BM25Config, InvertedIndex, PageVectors, VectorStore};
use semantic::EmbeddingEngine;
use storage::{PageRecord, PersistedPassage, Store};
use tokenizer::{Chunker, ChunkerConfig, Vocabulary};

pub use config::OrchestratorConfig;
pub use error::OrchestratorError;

/// Namespace UUID this crate derives page ids from. Fixed and arbitrary; it
/// only needs to be stable across runs, not registered anywhere.
const PAGE_ID_NAMESPACE: Uuid = Uuid::from_u128(0x7c6f_9b6a_3f3a_4e9a_9e2f_5a6b7c8d9e0f);

/// Cooperative cancellation handle for an in-flight [`Orchestrator::ingest`]
/// call. Checked at every suspension point named in the concurrency model
/// (before chunking, before each passage's embedding call, before each
/// storage write); does not interrupt work already in flight.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), OrchestratorError> {
        if self.is_cancelled() {
            Err(OrchestratorError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// One ranked passage result from [`Orchestrator::search`].
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredHit {
    pub page_id: String,
    pub page_title: String,
    pub page_url: String,
    pub chunk_id: String,
    pub chunk_text: String,
    pub score: f32,
    pub timestamp: u64,
}

/// Aggregate counters for [`Orchestrator::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub page_count: usize,
    pub passage_count: usize,
    pub bytes_on_disk: u64,
    pub model_ready: bool,
}

/// Backup-oriented view returned by [`Orchestrator::export`]. Vectors are
/// deliberately excluded by default (spec's export contract): they are large
/// and fully reproducible from the chunks file plus the model.
#[derive(Debug, Clone, PartialEq)]
pub struct StateSnapshot {
    pub pages: Vec<PageRecord>,
    pub settings: OrchestratorConfig,
}

/// Tracks how far a single `ingest` call got, so a failure mid-pipeline rolls
/// back exactly the state that was actually written and no more.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IngestStage {
    BlobsWritten,
    IndexUpdatedInMemory,
    IndexPersisted,
}

/// The ingest/search engine. `E` is the embedding backend; production code
/// uses `semantic::OnnxEmbeddingEngine`, tests use `semantic::StubEmbeddingEngine`.
pub struct Orchestrator<E: EmbeddingEngine> {
    store: Store,
    vocab: Vocabulary,
    chunker: Chunker,
    embedding: E,
    /// Serializes calls into the embedding engine, matching the "single-owner
    /// resource" rule in the concurrency model -- true for the stub engine as
    /// much as a real model session, since the stub has no internal lock of
    /// its own.
    embed_lock: Mutex<()>,
    pages_meta: RwLock<storage::PagesMetaFile>,
    inverted_index: RwLock<InvertedIndex>,
    vectors: RwLock<VectorStore>,
    /// One lock per page id, held for the duration of an ingest or delete
    /// touching that page. Grounded on the teacher's `DashMap`-keyed lock
    /// idiom (`server::state::ServerState::rate_limiter`), adapted from a
    /// rate-limit key to a page id.
    page_locks: DashMap<String, Arc<Mutex<()>>>,
    ingest_slots: Semaphore,
    config: OrchestratorConfig,
    bm25_config: BM25Config,
}

impl<E: EmbeddingEngine> Orchestrator<E> {
    /// Opens a data root, reaping any orphaned blobs and pruning any index
    /// postings left behind by a crash, per the storage layer's startup
    /// discipline (spec §4.9/§7).
    pub fn open(
        root: impl Into<std::path::PathBuf>,
        vocab: Vocabulary,
        chunker_config: ChunkerConfig,
        embedding: E,
        config: OrchestratorConfig,
        bm25_config: BM25Config,
    ) -> Result<Self, OrchestratorError> {
        let store = Store::open(root)?;
        let pages_meta = store.load_pages_meta()?;

        let reap_report = store.reap_orphans(&pages_meta)?;
        if !reap_report.is_empty() {
            tracing::warn!(
                orphaned_chunks = reap_report.orphaned_chunks.len(),
                orphaned_vectors = reap_report.orphaned_vectors.len(),
                "reaped orphaned blobs from a prior crash"
            );
        }

        let valid_pages: HashSet<String> = pages_meta.pages.keys().cloned().collect();
        let mut inverted_index = match store.load_inverted_index() {
            Ok(Some(file)) => match InvertedIndex::from_file(file, bm25_config) {
                Ok(idx) => idx,
                Err(err) => {
                    tracing::warn!(error = %err, "inverted index corrupt at startup, rebuilding from persisted passages");
                    rebuild_index_from_passages(&store, &pages_meta, bm25_config)?
                }
            },
            Ok(None) => InvertedIndex::new(bm25_config),
            Err(err) => {
                tracing::warn!(error = %err, "inverted index unreadable at startup, rebuilding from persisted passages");
                rebuild_index_from_passages(&store, &pages_meta, bm25_config)?
            }
        };
        inverted_index.prune_missing_pages(&valid_pages);

        let mut vectors = VectorStore::default();
        for page_id in pages_meta.pages.keys() {
            match store.load_vectors(page_id) {
                Ok(page_vectors) => vectors.upsert_page(page_id.clone(), page_vectors),
                Err(err) => {
                    tracing::warn!(page_id = %page_id, error = %err, "failed to load vectors at startup");
                }
            }
        }

        let chunker = Chunker::new(chunker_config);
        let ingest_slots = Semaphore::new(config.max_concurrent_ingests.max(1));

        Ok(Self {
            store,
            vocab,
            chunker,
            embedding,
            embed_lock: Mutex::new(()),
            pages_meta: RwLock::new(pages_meta),
            inverted_index: RwLock::new(inverted_index),
            vectors: RwLock::new(vectors),
            page_locks: DashMap::new(),
            ingest_slots,
            config,
            bm25_config,
        })
    }

    fn page_lock(&self, page_id: &str) -> Arc<Mutex<()>> {
        self.page_locks
            .entry(page_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Runs the full ingest pipeline for one archive. `captured_at` is a
    /// caller-supplied unix-millisecond timestamp (the orchestrator has no
    /// wall clock of its own; the page-capture mechanism supplies it, per
    /// spec's "out of scope" boundary). Ingesting a URL already present in
    /// the URL index is an idempotent no-op returning the existing record.
    pub async fn ingest(
        &self,
        archive_bytes: &[u8],
        url: &str,
        title: Option<&str>,
        captured_at: u64,
        cancel: &CancelToken,
    ) -> Result<PageRecord, OrchestratorError> {
        let _permit = self
            .ingest_slots
            .try_acquire()
            .map_err(|_| OrchestratorError::Overloaded)?;

        // Locked by URL, not by the page id derived below: two concurrent
        // first-time ingests of the same URL with different `captured_at`
        // would otherwise both pass the duplicate check and each derive a
        // distinct page id, violating the URL-idempotence invariant.
        let lock = self.page_lock(url);
        let _guard = lock.lock().await;

        let page_id = Uuid::new_v5(&PAGE_ID_NAMESPACE, format!("{url}|{captured_at}").as_bytes())
            .to_string();

        let existing = {
            let meta = self.pages_meta.read().await;
            meta.page_id_for_url(url)
                .and_then(|id| meta.pages.get(id).map(|record| (id.to_string(), record.clone())))
        };
        if let Some((existing_id, record)) = existing {
            tracing::info!(url = %url, page_id = %existing_id, "ingest: duplicate URL, returning existing page");
            return Ok(record);
        }

        cancel.check()?;
        let decoded = archive::decode(archive_bytes)?;
        let extracted = extract::extract(&decoded.html)?;
        let page_title = title
            .map(str::to_string)
            .or(extracted.title)
            .unwrap_or_default();

        cancel.check()?;
        let passages = self.chunker.chunk(&extracted.text, &self.vocab)?;

        let mut persisted = Vec::with_capacity(passages.len());
        let mut embedded = Vec::with_capacity(passages.len());
        for passage in &passages {
            cancel.check()?;
            let vector = {
                let _embed_guard = self.embed_lock.lock().await;
                self.embedding.embed_tokens(&passage.token_ids)?
            };
            embedded.push(vector);
            persisted.push(PersistedPassage::from(passage));
        }

        let mut stage: Option<IngestStage> = None;
        let result = self
            .commit_ingest(
                &page_id,
                url,
                &page_title,
                captured_at,
                &passages,
                &persisted,
                embedded,
                &mut stage,
            )
            .await;

        match result {
            Ok(record) => Ok(record),
            Err(err) => {
                self.rollback_ingest(&page_id, stage).await;
                Err(err)
            }
        }
    }

    /// Writes blobs, updates the in-memory index, persists the index, then
    /// persists `pages.meta` last -- the exact ordering spec §4.9 mandates so
    /// a crash between any two steps leaves only data the next startup's
    /// reap/prune pass can clean up.
    #[allow(clippy::too_many_arguments)]
    async fn commit_ingest(
        &self,
        page_id: &str,
        url: &str,
        title: &str,
        captured_at: u64,
        passages: &[tokenizer::ChunkedPassage],
        persisted: &[PersistedPassage],
        embedded: Vec<Vec<f32>>,
        stage: &mut Option<IngestStage>,
    ) -> Result<PageRecord, OrchestratorError> {
        let embedding_dim = self.embedding.embedding_dim();

        self.store.write_chunks(page_id, persisted)?;
        let page_vectors = PageVectors::new(embedding_dim as u32, embedded);
        self.store.write_vectors(page_id, &page_vectors)?;
        *stage = Some(IngestStage::BlobsWritten);

        {
            let mut index = self.inverted_index.write().await;
            for passage in passages {
                index.insert_passage(page_id, passage.chunk_index, &passage.text);
            }
        }
        {
            let mut vectors = self.vectors.write().await;
            vectors.upsert_page(page_id.to_string(), page_vectors);
        }
        *stage = Some(IngestStage::IndexUpdatedInMemory);

        let snapshot = self.inverted_index.read().await.snapshot();
        self.store.write_inverted_index(&snapshot)?;
        *stage = Some(IngestStage::IndexPersisted);

        let record = PageRecord {
            schema_version: storage::PAGE_SCHEMA_VERSION,
            url: url.to_string(),
            title: title.to_string(),
            timestamp: captured_at,
            chunk_count: passages.len(),
            dimensions: embedding_dim,
        };
        {
            let mut meta = self.pages_meta.write().await;
            meta.insert(page_id.to_string(), record.clone());
            self.store.write_pages_meta(&meta)?;
        }

        Ok(record)
    }

    /// Undoes whatever `commit_ingest` managed to do before failing. Stages
    /// already durable on disk when a later step fails are left for the
    /// startup orphan-reap/index-prune pass to reconcile on next restart;
    /// in-memory state is reverted here so the running process stays
    /// consistent with what `pages.meta` (the source of truth) says exists.
    async fn rollback_ingest(&self, page_id: &str, stage: Option<IngestStage>) {
        let Some(stage) = stage else { return };

        self.inverted_index.write().await.delete_page(page_id);
        self.vectors.write().await.remove_page(page_id);

        if let Err(err) = self.store.delete_page_blobs(page_id) {
            tracing::warn!(page_id = %page_id, error = %err, "rollback: failed to delete partial blobs");
        }

        if matches!(stage, IngestStage::IndexPersisted) {
            let snapshot = self.inverted_index.read().await.snapshot();
            if let Err(err) = self.store.write_inverted_index(&snapshot) {
                tracing::warn!(page_id = %page_id, error = %err, "rollback: failed to persist pruned index");
            }
        }

        tracing::warn!(page_id = %page_id, ?stage, "ingest rolled back");
    }

    /// Dispatches to the configured search mode, fusing BM25 and dense
    /// rankings with Reciprocal Rank Fusion when mode is `Hybrid`.
    pub async fn search(
        &self,
        query: &str,
        limit: usize,
        mode: retriever::SearchMode,
    ) -> Result<Vec<ScoredHit>, OrchestratorError> {
        let candidates = self.config.per_mode_candidates;

        let bm25_hits = if matches!(mode, retriever::SearchMode::Bm25 | retriever::SearchMode::Hybrid) {
            self.inverted_index.read().await.search(query, candidates)
        } else {
            Vec::new()
        };

        let dense_hits = if matches!(mode, retriever::SearchMode::Dense | retriever::SearchMode::Hybrid) {
            let query_vector = {
                let _embed_guard = self.embed_lock.lock().await;
                self.embedding.embed_text(query, &self.vocab)?
            };
            self.vectors.read().await.dense_search(&query_vector, candidates)
        } else {
            Vec::new()
        };

        let fused = match mode {
            retriever::SearchMode::Bm25 => bm25_hits,
            retriever::SearchMode::Dense => dense_hits,
            retriever::SearchMode::Hybrid => retriever::reciprocal_rank_fusion(
                &bm25_hits,
                &dense_hits,
                self.config.rrf_constant,
                candidates,
            ),
        };

        let meta = self.pages_meta.read().await;
        let mut hits = Vec::with_capacity(fused.len().min(limit));
        for ((page_id, chunk_index), score) in fused.into_iter().take(limit) {
            let Some(record) = meta.pages.get(&page_id) else {
                continue;
            };
            let chunk_text = self
                .store
                .load_chunks(&page_id)
                .ok()
                .and_then(|chunks| chunks.into_iter().find(|c| c.id == format!("chunk_{chunk_index}")))
                .map(|c| c.text)
                .unwrap_or_default();

            hits.push(ScoredHit {
                page_id: page_id.clone(),
                page_title: record.title.clone(),
                page_url: record.url.clone(),
                chunk_id: format!("chunk_{chunk_index}"),
                chunk_text,
                score,
                timestamp: record.timestamp,
            });
        }

        Ok(hits)
    }

    /// Removes a page's metadata, chunks, vectors, and every posting
    /// touching it, persisting the pruned index.
    pub async fn delete_page(&self, page_id: &str) -> Result<(), OrchestratorError> {
        let lock = self.page_lock(page_id);
        let _guard = lock.lock().await;

        let removed = {
            let mut meta = self.pages_meta.write().await;
            let removed = meta.remove(page_id);
            if removed.is_some() {
                self.store.write_pages_meta(&meta)?;
            }
            removed
        };
        let Some(_) = removed else {
            return Err(OrchestratorError::PageNotFound(page_id.to_string()));
        };

        self.store.delete_page_blobs(page_id)?;
        self.vectors.write().await.remove_page(page_id);

        {
            let mut index = self.inverted_index.write().await;
            index.delete_page(page_id);
            let snapshot = index.snapshot();
            self.store.write_inverted_index(&snapshot)?;
        }

        self.page_locks.remove(page_id);
        Ok(())
    }

    /// Reconstructs the inverted index from persisted passages, without
    /// touching embeddings (vectors are the model's only ground truth and
    /// are never regenerated here).
    pub async fn rebuild_lexical_index(&self) -> Result<(), OrchestratorError> {
        let meta = self.pages_meta.read().await;
        let rebuilt = rebuild_index_from_passages(&self.store, &meta, self.bm25_config)?;
        drop(meta);

        let mut index = self.inverted_index.write().await;
        *index = rebuilt;
        let snapshot = index.snapshot();
        self.store.write_inverted_index(&snapshot)?;
        Ok(())
    }

    pub async fn stats(&self) -> Result<Stats, OrchestratorError> {
        let meta = self.pages_meta.read().await;
        let passage_count = meta.pages.values().map(|r| r.chunk_count).sum();
        Ok(Stats {
            page_count: meta.pages.len(),
            passage_count,
            bytes_on_disk: self.store.bytes_on_disk()?,
            model_ready: self.embedding.is_ready(),
        })
    }

    /// Aggregated page metadata and settings for backup. Vectors are
    /// excluded by default per spec's export contract.
    pub async fn export(&self) -> StateSnapshot {
        let meta = self.pages_meta.read().await;
        StateSnapshot {
            pages: meta.pages.values().cloned().collect(),
            settings: self.config.clone(),
        }
    }
}

/// Rebuilds an `InvertedIndex` purely from each page's persisted `chunks`
/// file, in `pages.meta` order.
fn rebuild_index_from_passages(
    store: &Store,
    meta: &storage::PagesMetaFile,
    bm25_config: BM25Config,
) -> Result<InvertedIndex, OrchestratorError> {
    let mut index = InvertedIndex::new(bm25_config);
    for page_id in meta.pages.keys() {
        let chunks = match store.load_chunks(page_id) {
            Ok(chunks) => chunks,
            Err(err) => {
                tracing::warn!(page_id = %page_id, error = %err, "rebuild: failed to load chunks, skipping page");
                continue;
            }
        };
        for chunk in chunks {
            let Some(idx_str) = chunk.id.strip_prefix("chunk_") else {
                continue;
            };
            let Ok(chunk_index) = idx_str.parse::<usize>() else {
                continue;
            };
            index.insert_passage(page_id, chunk_index, &chunk.text);
        }
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use semantic::StubEmbeddingEngine;

    fn toy_vocab() -> Vocabulary {
        Vocabulary::from_tokens(
            vec!["[UNK]", "[CLS]", "[SEP]", "hello", "world", "brown", "fox", "dog", "quick", "the"]
                .into_iter()
                .map(str::to_string)
                .collect(),
        )
        .unwrap()
    }

    fn archive_with_text(html_body: &str) -> Vec<u8> {
        format!(
            "Content-Type: multipart/related; boundary=\"B\"\r\n\r\n\
             --B\r\n\
             Content-Type: text/html; charset=utf-8\r\n\r\n\
             <html><body><article><p>{html_body}</p></article></body></html>\r\n\
             --B--\r\n"
        )
        .into_bytes()
    }

    async fn orchestrator(dir: &std::path::Path) -> Orchestrator<StubEmbeddingEngine> {
        Orchestrator::open(
            dir,
            toy_vocab(),
            ChunkerConfig::default(),
            StubEmbeddingEngine::new(16),
            OrchestratorConfig::default(),
            BM25Config::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn s1_ingest_idempotence() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(dir.path()).await;
        let bytes = archive_with_text("hello world");

        let first = orch
            .ingest(&bytes, "https://ex/a", None, 1, &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(first.timestamp, 1);
        assert_eq!(first.chunk_count, 1);

        let second = orch
            .ingest(&bytes, "https://ex/a", None, 2, &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(second.timestamp, 1, "second ingest must return the original record");

        let stats = orch.stats().await.unwrap();
        assert_eq!(stats.page_count, 1);
        assert_eq!(stats.passage_count, 1);
    }

    #[tokio::test]
    async fn s3_bm25_ranking_through_the_orchestrator() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(dir.path()).await;
        orch.ingest(&archive_with_text("the quick brown fox"), "https://ex/p1", None, 1, &CancelToken::new())
            .await
            .unwrap();
        orch.ingest(&archive_with_text("the brown dog"), "https://ex/p2", None, 2, &CancelToken::new())
            .await
            .unwrap();

        let hits = orch.search("brown fox", 10, retriever::SearchMode::Bm25).await.unwrap();
        assert_eq!(hits[0].page_url, "https://ex/p1");
    }

    #[tokio::test]
    async fn s5_deletion_cleans_up_everything() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(dir.path()).await;
        let p1 = orch.ingest(&archive_with_text("hello world"), "https://ex/1", None, 1, &CancelToken::new()).await.unwrap();
        let p2 = orch.ingest(&archive_with_text("brown fox"), "https://ex/2", None, 2, &CancelToken::new()).await.unwrap();
        orch.ingest(&archive_with_text("quick dog"), "https://ex/3", None, 3, &CancelToken::new()).await.unwrap();

        let page2_id = orch.pages_meta.read().await.page_id_for_url("https://ex/2").unwrap().to_string();
        orch.delete_page(&page2_id).await.unwrap();

        let stats = orch.stats().await.unwrap();
        assert_eq!(stats.page_count, 2);
        assert!(!dir.path().join(format!("chunks/{page2_id}.json")).exists());
        assert!(!dir.path().join(format!("vectors/{page2_id}.bin")).exists());

        let hits = orch.search("brown fox", 10, retriever::SearchMode::Bm25).await.unwrap();
        assert!(hits.iter().all(|h| h.page_id != page2_id));

        // p1 and p3 should be untouched.
        assert_eq!(p1.chunk_count, 1);
        let _ = p2;
    }

    #[tokio::test]
    async fn duplicate_url_at_a_different_captured_at_is_still_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(dir.path()).await;
        let bytes = archive_with_text("hello world");
        orch.ingest(&bytes, "https://ex/a", None, 1, &CancelToken::new()).await.unwrap();
        let stats_before = orch.stats().await.unwrap();
        orch.ingest(&bytes, "https://ex/a", None, 99, &CancelToken::new()).await.unwrap();
        let stats_after = orch.stats().await.unwrap();
        assert_eq!(stats_before, stats_after);
    }

    #[tokio::test]
    async fn cancelled_ingest_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(dir.path()).await;
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = orch
            .ingest(&archive_with_text("hello world"), "https://ex/a", None, 1, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::Cancelled));

        let stats = orch.stats().await.unwrap();
        assert_eq!(stats.page_count, 0);
    }

    #[tokio::test]
    async fn rebuild_lexical_index_restores_search_without_reembedding() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(dir.path()).await;
        orch.ingest(&archive_with_text("the quick brown fox"), "https://ex/p1", None, 1, &CancelToken::new())
            .await
            .unwrap();

        *orch.inverted_index.write().await = InvertedIndex::new(BM25Config::default());
        assert!(orch.search("brown fox", 10, retriever::SearchMode::Bm25).await.unwrap().is_empty());

        orch.rebuild_lexical_index().await.unwrap();

        let hits = orch.search("brown fox", 10, retriever::SearchMode::Bm25).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn overloaded_when_concurrency_bound_is_exhausted() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = OrchestratorConfig::default();
        config.max_concurrent_ingests = 1;
        let orch = Orchestrator::open(
            dir.path(),
            toy_vocab(),
            ChunkerConfig::default(),
            StubEmbeddingEngine::new(16),
            config,
            BM25Config::default(),
        )
        .unwrap();

        let _permit = orch.ingest_slots.try_acquire().unwrap();
        let err = orch
            .ingest(&archive_with_text("hello world"), "https://ex/a", None, 1, &CancelToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::Overloaded));
    }
}
