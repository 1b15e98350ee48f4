use crate::article::Article;
use crate::cancel::CancelSignal;
use crate::content::{AnalyzeError, ArticleAnalyzer};
use crate::feed::{FeedSource, FetchError};
use crate::pipeline::events::PipelineEvent;
use std::collections::VecDeque;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};

/// Placeholder handed out for out-of-range selections.
static NO_SELECTION: Article = Article {
    title: String::new(),
    link: String::new(),
    comment_link: String::new(),
    preview: String::new(),
    magnet_links: Vec::new(),
    creator: String::new(),
    pub_date: None,
    categories: Vec::new(),
    comment_count: 0,
};

/// How a pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    Completed,
    Cancelled,
    Failed,
}

enum PassError {
    Cancelled,
    Failed(String),
}

impl From<FetchError> for PassError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::Cancelled => PassError::Cancelled,
            other => PassError::Failed(other.to_string()),
        }
    }
}

/// Fetch, analyze and accumulate, one article at a time.
///
/// Owns the unanalyzed cache and the accumulated list. Only one pass may
/// run at a time, which `run(&mut self)` enforces; see
/// [`FetchController`](crate::pipeline::FetchController) for running passes
/// in the background.
///
/// # Events
///
/// Progress events respect channel back-pressure until the pass is
/// cancelled; after that they are dropped rather than waited on. The
/// closing events (`FetchCancelled`/`FetchFailed`, then `FetchCompleted`)
/// are never dropped: when the channel is full they are handed to a
/// detached task that delivers them in order.
pub struct Pipeline<F, A> {
    fetcher: F,
    analyzer: A,
    cache: VecDeque<Article>,
    articles: Vec<Article>,
    events: mpsc::Sender<PipelineEvent>,
    published: watch::Sender<Vec<Article>>,
}

impl<F, A> Pipeline<F, A>
where
    F: FeedSource,
    A: ArticleAnalyzer,
{
    pub fn new(fetcher: F, analyzer: A, events: mpsc::Sender<PipelineEvent>) -> Self {
        let (published, _) = watch::channel(Vec::new());
        Self {
            fetcher,
            analyzer,
            cache: VecDeque::new(),
            articles: Vec::new(),
            events,
            published,
        }
    }

    /// Accumulated articles, in analysis order.
    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    /// Articles fetched but not analyzed yet.
    pub fn cached(&self) -> impl Iterator<Item = &Article> {
        self.cache.iter()
    }

    pub fn has_cached_articles(&self) -> bool {
        !self.cache.is_empty()
    }

    /// Live view of the accumulated list, updated on every append.
    pub fn subscribe_articles(&self) -> watch::Receiver<Vec<Article>> {
        self.published.subscribe()
    }

    pub fn event_sender(&self) -> mpsc::Sender<PipelineEvent> {
        self.events.clone()
    }

    /// The article at `index`, or an all-default placeholder when out of range.
    pub fn select(&self, index: usize) -> &Article {
        self.articles.get(index).unwrap_or(&NO_SELECTION)
    }

    /// Appends already-known articles to the accumulated list.
    pub fn add_articles(&mut self, articles: impl IntoIterator<Item = Article>) {
        let start = self.articles.len();
        self.articles.extend(articles);
        let added = &self.articles[start..];
        self.published
            .send_modify(|list| list.extend(added.iter().cloned()));
    }

    /// Runs one pass: refill the cache if it is empty, then analyze every
    /// cached article in order.
    ///
    /// Always emits `FetchStarted` first and `FetchCompleted` last.
    pub async fn run(&mut self, cancel: &CancelSignal) -> PassOutcome {
        emit(&self.events, PipelineEvent::FetchStarted, cancel).await;

        let (outcome, closing) = match self.fetch_and_analyze(cancel).await {
            Ok(()) => (PassOutcome::Completed, None),
            Err(PassError::Cancelled) => {
                tracing::info!(remaining = self.cache.len(), "Fetch cancelled");
                (PassOutcome::Cancelled, Some(PipelineEvent::FetchCancelled))
            }
            Err(PassError::Failed(error)) => {
                tracing::warn!(error = %error, "Fetch failed");
                (PassOutcome::Failed, Some(PipelineEvent::FetchFailed { error }))
            }
        };

        let closing = closing.into_iter().chain([PipelineEvent::FetchCompleted]);
        deliver_closing(&self.events, closing.collect());
        outcome
    }

    async fn fetch_and_analyze(&mut self, cancel: &CancelSignal) -> Result<(), PassError> {
        if self.cache.is_empty() {
            let fetched = self.fetcher.fetch_next(cancel).await?;
            self.enqueue_distinct(fetched);
        }

        let total = self.cache.len();
        emit(&self.events, PipelineEvent::FeedFetched { total }, cancel).await;

        let mut processed = 0;
        while let Some(article) = self.cache.front().cloned() {
            if cancel.is_cancelled() {
                return Err(PassError::Cancelled);
            }

            let analyzed = match self.analyzer.analyze(article.clone(), cancel).await {
                Ok(analyzed) => analyzed,
                Err(AnalyzeError::InvalidArticle(link)) => {
                    tracing::warn!(link = %link, title = %article.title, "Skipping analysis of article without a usable link");
                    article
                }
                Err(AnalyzeError::Cancelled) => return Err(PassError::Cancelled),
                Err(e) => return Err(PassError::Failed(e.to_string())),
            };

            self.cache.pop_front();
            self.push_article(analyzed);
            emit(
                &self.events,
                PipelineEvent::ArticleListChanged {
                    len: self.articles.len(),
                },
                cancel,
            )
            .await;

            processed += 1;
            emit(
                &self.events,
                PipelineEvent::ArticleAnalyzed {
                    progress: processed,
                    total,
                },
                cancel,
            )
            .await;
        }

        Ok(())
    }

    /// Queues fetched articles whose link is not already accumulated.
    ///
    /// Only the accumulated list is consulted, not the cache.
    fn enqueue_distinct(&mut self, fetched: Vec<Article>) {
        let before = self.cache.len();
        let fetched_count = fetched.len();
        for article in fetched {
            if self.articles.iter().any(|known| known.same_page(&article)) {
                tracing::debug!(link = %article.link, "Dropping duplicate article");
                continue;
            }
            self.cache.push_back(article);
        }
        tracing::debug!(
            fetched = fetched_count,
            queued = self.cache.len() - before,
            "Queued fetched articles"
        );
    }

    fn push_article(&mut self, article: Article) {
        self.published.send_modify(|list| list.push(article.clone()));
        self.articles.push(article);
    }
}

/// Sends a progress event, giving up on it once `cancel` is raised.
async fn emit(events: &mpsc::Sender<PipelineEvent>, event: PipelineEvent, cancel: &CancelSignal) {
    let permit = tokio::select! {
        biased;
        permit = events.reserve() => permit,
        _ = cancel.cancelled() => {
            tracing::trace!(?event, "Dropping progress event after cancellation");
            return;
        }
    };
    match permit {
        Ok(permit) => permit.send(event),
        Err(_) => tracing::trace!("Pipeline event receiver dropped"),
    }
}

/// Queues the closing events of a pass without blocking on a full channel.
fn deliver_closing(events: &mpsc::Sender<PipelineEvent>, closing: Vec<PipelineEvent>) {
    let mut pending = closing.into_iter();
    while let Some(event) = pending.next() {
        match events.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Closed(_)) => {
                tracing::trace!("Pipeline event receiver dropped");
                return;
            }
            Err(TrySendError::Full(event)) => {
                let events = events.clone();
                let rest: Vec<_> = std::iter::once(event).chain(pending).collect();
                tokio::spawn(async move {
                    for event in rest {
                        if events.send(event).await.is_err() {
                            break;
                        }
                    }
                });
                return;
            }
        }
    }
}
