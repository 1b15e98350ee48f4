use crate::article::Article;
use crate::cancel::{cancel_pair, CancelHandle};
use crate::content::ArticleAnalyzer;
use crate::feed::FeedSource;
use crate::pipeline::events::PipelineEvent;
use crate::pipeline::orchestrator::{PassOutcome, Pipeline};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("A fetch is already running")]
    AlreadyRunning,
    #[error("Fetch task panicked: {0}")]
    TaskPanicked(String),
    /// A previous pass panicked and took the pipeline with it.
    #[error("Pipeline lost after a panicked fetch")]
    Poisoned,
}

enum State<F, A> {
    Idle(Pipeline<F, A>),
    Running {
        handle: JoinHandle<(Pipeline<F, A>, PassOutcome)>,
        cancel: CancelHandle,
    },
    Poisoned,
}

/// Runs pipeline passes on a background task, one at a time.
///
/// The pipeline moves into the task for the length of a pass and comes back
/// when the task is joined. `cancel` raises the signal and then waits for
/// the task to unwind, so a new pass cannot overlap the old one.
pub struct FetchController<F, A> {
    state: State<F, A>,
    articles: watch::Receiver<Vec<Article>>,
    events: mpsc::Sender<PipelineEvent>,
}

impl<F, A> FetchController<F, A>
where
    F: FeedSource + 'static,
    A: ArticleAnalyzer + 'static,
{
    pub fn new(pipeline: Pipeline<F, A>) -> Self {
        Self {
            articles: pipeline.subscribe_articles(),
            events: pipeline.event_sender(),
            state: State::Idle(pipeline),
        }
    }

    pub fn is_running(&self) -> bool {
        match &self.state {
            State::Running { handle, .. } => !handle.is_finished(),
            _ => false,
        }
    }

    /// The pipeline, when no pass holds it.
    pub fn pipeline(&self) -> Option<&Pipeline<F, A>> {
        match &self.state {
            State::Idle(pipeline) => Some(pipeline),
            _ => None,
        }
    }

    /// Spawns a pass. Fails if one is still in flight or not yet joined.
    pub fn start(&mut self) -> Result<(), ControllerError> {
        match std::mem::replace(&mut self.state, State::Poisoned) {
            State::Idle(mut pipeline) => {
                let (cancel, signal) = cancel_pair();
                let handle = tokio::spawn(async move {
                    let outcome = pipeline.run(&signal).await;
                    (pipeline, outcome)
                });
                self.state = State::Running { handle, cancel };
                Ok(())
            }
            running @ State::Running { .. } => {
                self.state = running;
                Err(ControllerError::AlreadyRunning)
            }
            State::Poisoned => Err(ControllerError::Poisoned),
        }
    }

    /// Raises the cancellation signal and waits for the pass to unwind.
    ///
    /// Returns `None` if nothing was running.
    pub async fn cancel(&mut self) -> Result<Option<PassOutcome>, ControllerError> {
        if let State::Running { cancel, .. } = &self.state {
            cancel.cancel();
        }
        self.wait().await
    }

    /// Waits for the running pass, if any, and takes the pipeline back.
    ///
    /// Cancel-safe: dropping the future leaves the pass running and joinable.
    pub async fn wait(&mut self) -> Result<Option<PassOutcome>, ControllerError> {
        let joined = match &mut self.state {
            State::Running { handle, .. } => handle.await,
            State::Idle(_) => return Ok(None),
            State::Poisoned => return Err(ControllerError::Poisoned),
        };

        self.state = State::Poisoned;
        match joined {
            Ok((pipeline, outcome)) => {
                self.state = State::Idle(pipeline);
                Ok(Some(outcome))
            }
            Err(e) => {
                tracing::error!(error = %e, "Fetch task panicked");
                Err(ControllerError::TaskPanicked(e.to_string()))
            }
        }
    }

    /// Copy of the accumulated list; usable during a pass.
    pub fn articles(&self) -> Vec<Article> {
        self.articles.borrow().clone()
    }

    /// Number of accumulated articles, without copying the list.
    pub fn article_count(&self) -> usize {
        self.articles.borrow().len()
    }

    /// Looks up an article by index and announces it as selected.
    ///
    /// Out-of-range indices give the all-default placeholder.
    pub fn select(&self, index: usize) -> Article {
        let selected = self
            .articles
            .borrow()
            .get(index)
            .cloned()
            .unwrap_or_default();
        if let Err(e) = self
            .events
            .try_send(PipelineEvent::ArticleSelected(selected.clone()))
        {
            tracing::debug!(error = %e, "Could not deliver selection event");
        }
        selected
    }
}
