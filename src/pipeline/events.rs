use crate::article::Article;

/// State transitions of a fetch pass, delivered over an mpsc channel.
///
/// Receivers may live on any thread. The pipeline waits on channel
/// back-pressure only until the pass is cancelled.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// A pass began; progress is indeterminate until the feed page arrives.
    FetchStarted,
    /// The unanalyzed cache now holds `total` articles.
    FeedFetched { total: usize },
    /// `progress` of `total` cached articles have been analyzed.
    ArticleAnalyzed { progress: usize, total: usize },
    /// The accumulated list grew to `len` articles. Read it through
    /// [`Pipeline::subscribe_articles`](crate::pipeline::Pipeline::subscribe_articles).
    ArticleListChanged { len: usize },
    /// The pass stopped early on request. Unprocessed articles stay cached.
    FetchCancelled,
    /// The pass stopped on a transport failure.
    FetchFailed { error: String },
    /// Always the last event of a pass, whatever its outcome.
    FetchCompleted,
    /// Result of a selection by index; a default article means "no selection".
    ArticleSelected(Article),
}
