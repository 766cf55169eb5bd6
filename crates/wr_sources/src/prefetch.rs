use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use futures::FutureExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use wr_core::{Article, ArticleSource, Config, Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefetchConfig {
    pub max_slides: usize,
    pub batch_workers: usize,
    pub look_ahead: usize,
    pub fetch_timeout: Duration,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for PrefetchConfig {
    fn from(config: &Config) -> Self {
        Self {
            max_slides: config.max_slides,
            batch_workers: config.batch_workers,
            look_ahead: config.look_ahead,
            fetch_timeout: config.fetch_timeout(),
        }
    }
}

/// What one batch did to the slide queue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub requested: usize,
    pub appended: usize,
    pub failed: usize,
    pub without_image: usize,
    pub evicted: usize,
    pub cancelled: bool,
}

#[derive(Debug)]
struct CompletedBatch {
    requested: usize,
    articles: Vec<Article>,
    failed: usize,
    without_image: usize,
    cancelled: bool,
}

impl CompletedBatch {
    fn new(requested: usize) -> Self {
        Self {
            requested,
            articles: Vec::with_capacity(requested),
            failed: 0,
            without_image: 0,
            cancelled: false,
        }
    }

    fn cancelled(requested: usize) -> Self {
        Self { cancelled: true, ..Self::new(requested) }
    }
}

/// True when `current_index` is within `look_ahead` slides of the end.
pub fn near_end(current_index: usize, total: usize, look_ahead: usize) -> bool {
    current_index + look_ahead >= total
}

/// Fetches one article, giving up after `timeout`.
pub async fn fetch_with_timeout(source: &dyn ArticleSource, timeout: Duration) -> Result<Article> {
    tokio::time::timeout(timeout, source.fetch_random_article())
        .await
        .map_err(|_| Error::Timeout(timeout))?
}

/// Bounded queue of ready-to-show articles, refilled in concurrent batches.
///
/// Batches run on spawned tokio tasks; their results come back through a
/// channel and only touch the queue when the owner calls [`next_batch`] or
/// [`try_next_batch`]. At most one batch is in flight at a time.
///
/// [`next_batch`]: PrefetchBuffer::next_batch
/// [`try_next_batch`]: PrefetchBuffer::try_next_batch
pub struct PrefetchBuffer {
    source: Arc<dyn ArticleSource>,
    config: PrefetchConfig,
    slides: VecDeque<Article>,
    loading: Arc<AtomicBool>,
    completed_tx: mpsc::UnboundedSender<CompletedBatch>,
    completed_rx: mpsc::UnboundedReceiver<CompletedBatch>,
    cancel: CancellationToken,
}

impl PrefetchBuffer {
    pub fn new(source: Arc<dyn ArticleSource>, config: PrefetchConfig) -> Self {
        let (completed_tx, completed_rx) = mpsc::unbounded_channel();
        Self {
            source,
            slides: VecDeque::with_capacity(config.max_slides + 1),
            config,
            loading: Arc::new(AtomicBool::new(false)),
            completed_tx,
            completed_rx,
            cancel: CancellationToken::new(),
        }
    }

    /// Starts a batch of `count` fetches in the background. Returns false,
    /// and changes nothing, if a batch is already in flight or `count` is 0.
    ///
    /// Must be called from within a tokio runtime.
    pub fn request_more(&self, count: usize) -> bool {
        if count == 0 {
            return false;
        }
        if self
            .loading
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(
                "⏳ Batch already in flight, ignoring request for {} more",
                count
            );
            return false;
        }

        info!("🔄 Prefetching {} articles from {}", count, self.source.name());
        let source = self.source.clone();
        let workers = self.config.batch_workers.max(1);
        let timeout = self.config.fetch_timeout;
        let cancel = self.cancel.child_token();
        let completed_tx = self.completed_tx.clone();

        tokio::spawn(async move {
            let run =
                AssertUnwindSafe(run_batch(source, count, workers, timeout)).catch_unwind();
            let batch = tokio::select! {
                _ = cancel.cancelled() => CompletedBatch::cancelled(count),
                outcome = run => outcome.unwrap_or_else(|_| {
                    error!("💥 Prefetch batch panicked");
                    CompletedBatch { failed: count, ..CompletedBatch::new(count) }
                }),
            };
            // The buffer may already be gone.
            let _ = completed_tx.send(batch);
        });
        true
    }

    /// Waits for the in-flight batch and applies it. Returns `None` right
    /// away when nothing is in flight.
    pub async fn next_batch(&mut self) -> Option<BatchReport> {
        if !self.is_loading() {
            return None;
        }
        let batch = self.completed_rx.recv().await?;
        Some(self.apply(batch))
    }

    /// Applies a finished batch if there is one, without waiting.
    pub fn try_next_batch(&mut self) -> Option<BatchReport> {
        let batch = self.completed_rx.try_recv().ok()?;
        Some(self.apply(batch))
    }

    /// Requests `count` articles and waits for them to land.
    pub async fn load(&mut self, count: usize) -> Option<BatchReport> {
        if !self.request_more(count) {
            return None;
        }
        self.next_batch().await
    }

    fn apply(&mut self, batch: CompletedBatch) -> BatchReport {
        let appended = batch.articles.len();
        self.slides.extend(batch.articles);

        let mut evicted = 0;
        while self.slides.len() > self.config.max_slides {
            self.slides.pop_front();
            evicted += 1;
        }
        self.loading.store(false, Ordering::Release);

        let report = BatchReport {
            requested: batch.requested,
            appended,
            failed: batch.failed,
            without_image: batch.without_image,
            evicted,
            cancelled: batch.cancelled,
        };
        if report.cancelled {
            info!("🛑 Prefetch batch cancelled");
        } else {
            info!(
                "✨ Batch done: {}/{} appended, {} failed, {} without image, {} evicted",
                report.appended,
                report.requested,
                report.failed,
                report.without_image,
                report.evicted
            );
        }
        report
    }

    pub fn near_end(&self, current_index: usize, total: usize) -> bool {
        near_end(current_index, total, self.config.look_ahead)
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    pub fn slides(&self) -> impl Iterator<Item = &Article> {
        self.slides.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Article> {
        self.slides.get(index)
    }

    pub fn len(&self) -> usize {
        self.slides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    /// Abandons the in-flight batch. Later batches are cancelled at once.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl Drop for PrefetchBuffer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_batch(
    source: Arc<dyn ArticleSource>,
    count: usize,
    workers: usize,
    timeout: Duration,
) -> CompletedBatch {
    let mut batch = CompletedBatch::new(count);
    let mut fetches = stream::iter(0..count)
        .map(|_| {
            let source = source.clone();
            // A panicking fetch counts as one failure; its siblings still land.
            AssertUnwindSafe(async move { fetch_with_timeout(source.as_ref(), timeout).await })
                .catch_unwind()
        })
        .buffer_unordered(workers);

    while let Some(outcome) = fetches.next().await {
        match outcome {
            Ok(Ok(article)) if article.has_image() => batch.articles.push(article),
            Ok(Ok(article)) => {
                debug!("🖼️ Skipping {} (no usable image)", article.title);
                batch.without_image += 1;
            }
            Ok(Err(e)) => {
                warn!("⚠️ Fetch failed ({:?}): {}", e.kind(), e);
                batch.failed += 1;
            }
            Err(_) => {
                error!("💥 Fetch panicked");
                batch.failed += 1;
            }
        }
    }
    batch
}
