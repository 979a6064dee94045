//! Chat session state and the submission lifecycle
//!
//! A [`ChatSession`] owns the draft, the message history and the pending
//! flag. Submitting is split in two so the network call can live anywhere
//! (a spawned task in the TUI, an inline `.await` in the CLI):
//!
//! 1. [`ChatSession::begin_submit`] validates the draft, appends the user
//!    message, raises `pending` and hands back a [`Submission`] ticket.
//! 2. [`ChatSession::resolve`] consumes the ticket with the request's result,
//!    appends at most one bot message and always lowers `pending`.
//!
//! Every request gets a child of the session's root cancellation token.
//! Clearing the history cancels the in-flight request and bumps an epoch, so
//! a late answer never lands in a history it doesn't belong to.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::analysis::{AnalysisClient, AnalysisResponse};
use crate::error::AnalysisError;
use crate::state::{Message, Role};

/// Prefix for structured failures reported by the backend.
pub const ERROR_PREFIX: &str = "❌ Error: ";

/// Prefix for failures to reach the backend or read its answer.
pub const CONNECTION_ERROR_PREFIX: &str = "❌ Error connecting to backend: ";

/// Ticket for one in-flight request.
#[must_use = "a submission must be resolved to release the pending flag"]
#[derive(Debug)]
pub struct Submission {
    query: String,
    epoch: u64,
    cancel: CancellationToken,
}

impl Submission {
    /// The text sent as the request body's `query`.
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

#[derive(Debug)]
pub struct ChatSession {
    draft: String,
    history: Vec<Message>,
    pending: bool,
    send_trimmed: bool,
    epoch: u64,
    root: CancellationToken,
    in_flight: Option<CancellationToken>,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            draft: String::new(),
            history: Vec::new(),
            pending: false,
            send_trimmed: false,
            epoch: 0,
            root: CancellationToken::new(),
            in_flight: None,
        }
    }

    /// Send the trimmed draft instead of the raw text.
    pub fn with_send_trimmed(mut self, send_trimmed: bool) -> Self {
        self.send_trimmed = send_trimmed;
        self
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Draft edits are allowed even while a request is pending.
    pub fn draft_mut(&mut self) -> &mut String {
        &mut self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Start a submission from the current draft.
    ///
    /// Returns `None` without touching any state when the draft is blank,
    /// a request is already pending, or the session has been shut down.
    pub fn begin_submit(&mut self) -> Option<Submission> {
        let trimmed = self.draft.trim();
        if trimmed.is_empty() || self.pending || self.root.is_cancelled() {
            return None;
        }

        let display = trimmed.to_string();
        let query = if self.send_trimmed {
            display.clone()
        } else {
            std::mem::take(&mut self.draft)
        };
        self.draft.clear();

        self.history.push(Message::user(display));
        self.pending = true;

        let cancel = self.root.child_token();
        self.in_flight = Some(cancel.clone());

        info!(epoch = self.epoch, history_len = self.history.len(), "query submitted");

        Some(Submission {
            query,
            epoch: self.epoch,
            cancel,
        })
    }

    /// Settle a submission.
    ///
    /// `pending` is released on every path. The returned message is the bot
    /// message that was appended, if any: nothing is appended when the
    /// request was cancelled or the history was cleared after it started.
    pub fn resolve(
        &mut self,
        submission: Submission,
        result: Result<AnalysisResponse, AnalysisError>,
    ) -> Option<&Message> {
        self.pending = false;
        self.in_flight = None;

        if submission.epoch != self.epoch || submission.cancel.is_cancelled() {
            debug!(
                submitted_epoch = submission.epoch,
                current_epoch = self.epoch,
                "dropping stale settlement"
            );
            return None;
        }

        let message = match result {
            Ok(AnalysisResponse::Success(report)) => {
                info!(
                    has_chart = report.chart_data.is_some(),
                    table_rows = report.table_data.as_ref().map_or(0, Vec::len),
                    "analysis answered"
                );
                Message {
                    role: Role::Bot,
                    text: report.summary,
                    chart_data: report.chart_data,
                    table_data: report.table_data,
                }
            }
            Ok(AnalysisResponse::Failure { error }) => {
                info!(%error, "analysis rejected query");
                Message::bot(format!("{}{}", ERROR_PREFIX, error))
            }
            Err(AnalysisError::Cancelled) => {
                debug!("request cancelled");
                return None;
            }
            Err(err) => {
                warn!(error = %err, "analysis request failed");
                Message::bot(format!("{}{}", CONNECTION_ERROR_PREFIX, err))
            }
        };

        self.history.push(message);
        self.history.last()
    }

    /// Full round trip: begin, await the backend, resolve.
    pub async fn submit(&mut self, client: &AnalysisClient) -> Option<&Message> {
        let submission = self.begin_submit()?;
        let cancel = submission.cancel_token();
        let result = client
            .analyze_until_cancelled(submission.query(), &cancel)
            .await;
        self.resolve(submission, result)
    }

    /// Empty the history. The draft and the pending flag are left alone; an
    /// in-flight request is cancelled and will settle without a message.
    pub fn clear(&mut self) {
        self.history.clear();
        self.epoch += 1;
        if let Some(cancel) = self.in_flight.take() {
            cancel.cancel();
        }
        debug!(epoch = self.epoch, pending = self.pending, "history cleared");
    }

    /// Cancel the in-flight request, if there is one.
    pub fn cancel_pending(&mut self) -> bool {
        match self.in_flight.take() {
            Some(cancel) => {
                cancel.cancel();
                info!("in-flight request cancelled");
                true
            }
            None => false,
        }
    }

    /// Cancel everything this session started; no new submissions afterwards.
    pub fn shutdown(&mut self) {
        self.root.cancel();
    }
}
