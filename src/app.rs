use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::analysis::{AnalysisClient, AnalysisResponse};
use crate::config::Settings;
use crate::error::AnalysisError;
use crate::session::{ChatSession, Submission};
use crate::state::Message;

/// The request currently running in the background. The ticket stays here,
/// not in the task, so it can be resolved even if the task dies.
struct InFlight {
    submission: Submission,
    task: JoinHandle<Result<AnalysisResponse, AnalysisError>>,
}

pub struct App {
    pub should_quit: bool,
    pub session: ChatSession,
    client: AnalysisClient,
    in_flight: Option<InFlight>,

    // Welcome panel
    pub example_queries: Vec<String>,
    pub example_state: ListState,

    // Input box; cursor is a char index into the draft
    pub input_cursor: usize,

    // Chat transcript scrolling, sizes are refreshed on every render
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_total_lines: u16,
    pub follow_bottom: bool,
    pub chat_area: Option<Rect>,

    /// History index of the bot message whose chart and table are shown.
    pub data_focus: Option<usize>,

    // 0-2 for the typing indicator dots
    pub animation_frame: u8,
}

impl App {
    pub fn new(client: AnalysisClient, settings: &Settings) -> Self {
        let mut example_state = ListState::default();
        if !settings.example_queries.is_empty() {
            example_state.select(Some(0));
        }

        Self {
            should_quit: false,
            session: ChatSession::new().with_send_trimmed(settings.send_trimmed_query),
            client,
            in_flight: None,

            example_queries: settings.example_queries.clone(),
            example_state,

            input_cursor: 0,

            chat_scroll: 0,
            chat_height: 0,
            chat_total_lines: 0,
            follow_bottom: true,
            chat_area: None,

            data_focus: None,
            animation_frame: 0,
        }
    }

    pub fn endpoint(&self) -> &str {
        self.client.endpoint()
    }

    pub fn is_pending(&self) -> bool {
        self.session.is_pending()
    }

    /// Submit the draft and run the request on a background task.
    pub fn submit(&mut self) {
        let Some(submission) = self.session.begin_submit() else {
            return;
        };
        self.input_cursor = 0;
        self.follow_bottom = true;

        let client = self.client.clone();
        let query = submission.query().to_string();
        let cancel = submission.cancel_token();
        let task = tokio::spawn(async move { client.analyze_until_cancelled(&query, &cancel).await });

        self.in_flight = Some(InFlight { submission, task });
    }

    /// Resolve the background request if it has finished.
    pub async fn poll_in_flight(&mut self) {
        let finished = self
            .in_flight
            .as_ref()
            .is_some_and(|f| f.task.is_finished());
        if !finished {
            return;
        }
        if let Some(in_flight) = self.in_flight.take() {
            self.settle(in_flight).await;
        }
    }

    /// Wait for the background request, however long it takes.
    pub async fn wait_for_in_flight(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            self.settle(in_flight).await;
        }
    }

    async fn settle(&mut self, in_flight: InFlight) {
        let InFlight { submission, task } = in_flight;
        let result = match task.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(AnalysisError::Cancelled),
            Err(e) => Err(AnalysisError::Task(e.to_string())),
        };

        let appended_data = self
            .session
            .resolve(submission, result)
            .map(Message::has_data);

        if let Some(has_data) = appended_data {
            self.follow_bottom = true;
            if has_data {
                self.data_focus = Some(self.session.history().len() - 1);
            }
        }
    }

    pub fn cancel_request(&mut self) -> bool {
        self.session.cancel_pending()
    }

    pub fn clear_chat(&mut self) {
        self.session.clear();
        self.data_focus = None;
        self.chat_scroll = 0;
        self.follow_bottom = true;
        if !self.example_queries.is_empty() {
            self.example_state.select(Some(0));
        }
    }

    pub fn quit(&mut self) {
        self.session.shutdown();
        if let Some(in_flight) = &self.in_flight {
            in_flight.task.abort();
        }
        self.should_quit = true;
    }

    // Welcome panel examples
    pub fn example_nav_down(&mut self) {
        let len = self.example_queries.len();
        if len > 0 {
            let i = self.example_state.selected().unwrap_or(0);
            self.example_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn example_nav_up(&mut self) {
        let i = self.example_state.selected().unwrap_or(0);
        self.example_state.select(Some(i.saturating_sub(1)));
    }

    /// Put the selected example into the draft. Does not submit.
    pub fn use_selected_example(&mut self) {
        let selected = self
            .example_state
            .selected()
            .and_then(|i| self.example_queries.get(i))
            .cloned();
        if let Some(example) = selected {
            debug!(%example, "example query selected");
            self.input_cursor = example.chars().count();
            self.session.set_draft(example);
        }
    }

    // Chart/table focus
    pub fn focused_data_message(&self) -> Option<&Message> {
        self.data_focus
            .and_then(|i| self.session.history().get(i))
            .filter(|m| m.has_data())
    }

    pub fn focus_prev_data(&mut self) {
        let before = self.data_focus.unwrap_or(self.session.history().len());
        let prev = self.session.history()[..before.min(self.session.history().len())]
            .iter()
            .rposition(Message::has_data);
        if prev.is_some() {
            self.data_focus = prev;
        }
    }

    pub fn focus_next_data(&mut self) {
        let Some(current) = self.data_focus else {
            return;
        };
        let next = self
            .session
            .history()
            .iter()
            .enumerate()
            .skip(current + 1)
            .find(|(_, m)| m.has_data())
            .map(|(i, _)| i);
        if next.is_some() {
            self.data_focus = next;
        }
    }

    // Transcript scrolling
    fn max_scroll(&self) -> u16 {
        self.chat_total_lines.saturating_sub(self.chat_height)
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = (self.chat_scroll.saturating_add(lines)).min(self.max_scroll());
        self.follow_bottom = self.chat_scroll >= self.max_scroll();
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
        self.follow_bottom = false;
    }

    pub fn scroll_half_page_down(&mut self) {
        self.scroll_down((self.chat_height / 2).max(1));
    }

    pub fn scroll_half_page_up(&mut self) {
        self.scroll_up((self.chat_height / 2).max(1));
    }

    /// Called by the renderer once the transcript height is known.
    pub fn update_transcript_size(&mut self, total_lines: u16, visible_height: u16) {
        self.chat_total_lines = total_lines;
        self.chat_height = visible_height;
        if self.follow_bottom {
            self.chat_scroll = self.max_scroll();
        } else {
            self.chat_scroll = self.chat_scroll.min(self.max_scroll());
        }
    }

    pub fn tick_animation(&mut self) {
        if self.is_pending() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }
}
