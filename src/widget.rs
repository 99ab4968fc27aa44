use crate::chat_api::{ChatClient, ChatCompletionsRequest, ChatConfig};
use crate::error::ChatError;
use crate::notify::{NotificationId, Notifier};
use crate::prompt::PromptProfile;
use crate::transcript::{ChatMessage, Transcript};
use tracing::{debug, info, warn};

pub const MIN_HEIGHT: u32 = 200;
pub const MAX_HEIGHT: u32 = 600;
pub const DEFAULT_HEIGHT: u32 = 400;

pub fn resized_height(start_height: u32, start_y: f32, current_y: f32) -> u32 {
    let height = start_height as f32 + (start_y - current_y);
    height.round().clamp(MIN_HEIGHT as f32, MAX_HEIGHT as f32) as u32
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct ResizeDrag {
    start_y: f32,
    start_height: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PanelState {
    expanded: bool,
    height: u32,
    drag: Option<ResizeDrag>,
}

impl Default for PanelState {
    fn default() -> Self {
        Self {
            expanded: false,
            height: DEFAULT_HEIGHT,
            drag: None,
        }
    }
}

impl PanelState {
    pub fn expanded(&self) -> bool {
        self.expanded
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_resizing(&self) -> bool {
        self.drag.is_some()
    }

    pub fn begin_resize(&mut self, pointer_y: f32) {
        self.drag = Some(ResizeDrag {
            start_y: pointer_y,
            start_height: self.height,
        });
    }

    pub fn drag_resize(&mut self, pointer_y: f32) {
        if let Some(drag) = self.drag {
            self.height = resized_height(drag.start_height, drag.start_y, pointer_y);
        }
    }

    pub fn end_resize(&mut self) {
        self.drag = None;
    }

    /// Pointer cancel or capture loss; the last computed height is kept.
    pub fn cancel_resize(&mut self) {
        if self.drag.take().is_some() {
            debug!(height = self.height, "resize cancelled");
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestPhase {
    Idle,
    Submitting,
}

type VisibilityCallback = Box<dyn FnMut(bool)>;

pub struct ChatWidget {
    source_text: String,
    config: ChatConfig,
    profile: PromptProfile,
    panel: PanelState,
    visible: bool,
    on_visibility_change: VisibilityCallback,
    transcript: Transcript,
    input: String,
    processing: bool,
    loading_toast: Option<NotificationId>,
}

impl ChatWidget {
    pub fn new(
        source_text: impl Into<String>,
        config: ChatConfig,
        profile: PromptProfile,
        on_visibility_change: impl FnMut(bool) + 'static,
    ) -> Self {
        Self {
            source_text: source_text.into(),
            config,
            profile,
            panel: PanelState::default(),
            visible: false,
            on_visibility_change: Box::new(on_visibility_change),
            transcript: Transcript::new(),
            input: String::new(),
            processing: false,
            loading_toast: None,
        }
    }

    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    pub fn profile(&self) -> PromptProfile {
        self.profile
    }

    pub fn panel(&self) -> &PanelState {
        &self.panel
    }

    pub fn panel_mut(&mut self) -> &mut PanelState {
        &mut self.panel
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut String {
        &mut self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    pub fn phase(&self) -> RequestPhase {
        if self.processing {
            RequestPhase::Submitting
        } else {
            RequestPhase::Idle
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Mirrors the host's visibility flag. A hidden to shown transition expands the panel once.
    pub fn set_visible(&mut self, visible: bool) {
        if visible && !self.visible {
            self.panel.expanded = true;
            debug!("widget shown, panel expanded");
        }
        if !visible {
            self.panel.cancel_resize();
        }
        self.visible = visible;
    }

    pub fn minimize(&mut self) {
        self.panel.expanded = false;
        self.panel.cancel_resize();
    }

    pub fn expand(&mut self) {
        self.panel.expanded = true;
    }

    pub fn toggle_expanded(&mut self) {
        if self.panel.expanded {
            self.minimize();
        } else {
            self.expand();
        }
    }

    pub fn close(&mut self) {
        self.set_visible(false);
        (self.on_visibility_change)(false);
    }

    /// Runs the entry guard and, when it passes, records the submission and
    /// returns the request body to send.
    pub fn begin_submit(&mut self, notifier: &mut dyn Notifier) -> Option<ChatCompletionsRequest> {
        let question = self.input.trim().to_string();
        if question.is_empty() {
            return None;
        }
        if self.processing {
            debug!("submission ignored, request already in flight");
            return None;
        }
        if !self.config.has_credential() {
            warn!("submission blocked, API key missing");
            notifier.error(&ChatError::MissingCredential.to_string());
            return None;
        }

        self.input.clear();
        self.transcript.push(ChatMessage::user(question.clone()));
        self.transcript.push(ChatMessage::placeholder());
        self.loading_toast = Some(notifier.loading("Asking the assistant..."));
        self.processing = true;

        info!(
            question_len = question.len(),
            source_len = self.source_text.len(),
            profile = self.profile.label(),
            "submission started"
        );

        Some(ChatCompletionsRequest::new(
            &self.config.model,
            self.profile,
            &self.source_text,
            &question,
        ))
    }

    pub fn settle(&mut self, result: Result<String, ChatError>, notifier: &mut dyn Notifier) {
        if !self.processing {
            warn!("settlement received with no request in flight");
            return;
        }

        self.transcript.remove_placeholders();
        if let Some(id) = self.loading_toast.take() {
            notifier.dismiss(id);
        }

        match result {
            Ok(reply) => {
                self.transcript.push(ChatMessage::assistant(reply));
                notifier.success("Response received");
                info!("submission succeeded");
            }
            Err(err) => {
                self.transcript.push(ChatMessage::assistant(err.transcript_text()));
                notifier.error(&err.to_string());
                warn!(error = ?err, "submission failed");
            }
        }

        self.processing = false;
    }

    pub async fn submit(&mut self, client: &ChatClient, notifier: &mut dyn Notifier) -> bool {
        let Some(req) = self.begin_submit(notifier) else {
            return false;
        };
        let result = client.complete(&req).await;
        self.settle(result, notifier);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Toasts;
    use crate::transcript::{ChatRole, PLACEHOLDER_TEXT};
    use std::cell::Cell;
    use std::rc::Rc;

    fn widget_with_key(api_key: Option<&str>) -> ChatWidget {
        let config = ChatConfig {
            api_key: api_key.map(str::to_string),
            ..ChatConfig::default()
        };
        ChatWidget::new("OCR text", config, PromptProfile::Balanced, |_| {})
    }

    #[test]
    fn resized_height_follows_drag_direction_and_clamps() {
        assert_eq!(resized_height(400, 500.0, 450.0), 450);
        assert_eq!(resized_height(400, 500.0, 550.0), 350);
        assert_eq!(resized_height(400, 500.0, -1000.0), MAX_HEIGHT);
        assert_eq!(resized_height(400, 500.0, 5000.0), MIN_HEIGHT);
    }

    #[test]
    fn resize_clamps_for_any_distance() {
        for start in [MIN_HEIGHT, DEFAULT_HEIGHT, MAX_HEIGHT] {
            for d in [0u32, 1, 50, 199, 200, 400, 10_000] {
                let mut up = PanelState {
                    height: start,
                    ..PanelState::default()
                };
                up.begin_resize(1000.0);
                up.drag_resize(1000.0 - d as f32);
                assert_eq!(up.height(), (start + d).min(MAX_HEIGHT));

                let mut down = PanelState {
                    height: start,
                    ..PanelState::default()
                };
                down.begin_resize(0.0);
                down.drag_resize(d as f32);
                assert_eq!(down.height(), start.saturating_sub(d).max(MIN_HEIGHT));
            }
        }
    }

    #[test]
    fn move_without_drag_is_ignored() {
        let mut panel = PanelState::default();
        panel.drag_resize(-300.0);

        assert_eq!(panel.height(), DEFAULT_HEIGHT);
        assert!(!panel.is_resizing());
    }

    #[test]
    fn cancel_ends_drag_and_keeps_height() {
        let mut panel = PanelState::default();
        panel.begin_resize(300.0);
        panel.drag_resize(250.0);
        panel.cancel_resize();
        panel.drag_resize(0.0);

        assert!(!panel.is_resizing());
        assert_eq!(panel.height(), 450);
    }

    #[test]
    fn becoming_visible_expands_once() {
        let mut widget = widget_with_key(Some("k"));
        assert!(!widget.panel().expanded());

        widget.set_visible(true);
        assert!(widget.panel().expanded());

        widget.minimize();
        widget.set_visible(true);
        assert!(!widget.panel().expanded());
        assert!(widget.is_visible());

        widget.set_visible(false);
        widget.set_visible(true);
        assert!(widget.panel().expanded());
    }

    #[test]
    fn close_reports_hidden_to_host() {
        let host_visible = Rc::new(Cell::new(true));
        let flag = Rc::clone(&host_visible);
        let mut widget = ChatWidget::new(
            "text",
            ChatConfig::default(),
            PromptProfile::default(),
            move |visible| flag.set(visible),
        );
        widget.set_visible(true);

        widget.minimize();
        assert!(host_visible.get());

        widget.close();
        assert!(!host_visible.get());
        assert!(!widget.is_visible());
    }

    #[test]
    fn begin_submit_appends_user_and_placeholder() {
        let mut widget = widget_with_key(Some("k"));
        let mut toasts = Toasts::new();
        widget.set_input("  What is the total?  ");

        let req = widget.begin_submit(&mut toasts).expect("request");

        assert!(widget.is_processing());
        assert_eq!(widget.phase(), RequestPhase::Submitting);
        assert!(widget.input().is_empty());
        let messages = widget.transcript().messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1], ChatMessage::user("What is the total?"));
        assert!(messages[2].is_placeholder());
        assert_eq!(messages[2].content, PLACEHOLDER_TEXT);
        assert_eq!(req.messages[1].content, "What is the total?");
        assert!(req.messages[0].content.contains("OCR text"));
        assert_eq!(toasts.items().len(), 1);
    }

    #[test]
    fn guard_rejects_blank_and_in_flight_submissions() {
        let mut widget = widget_with_key(Some("k"));
        let mut toasts = Toasts::new();

        widget.set_input(" \n\t ");
        assert!(widget.begin_submit(&mut toasts).is_none());
        assert_eq!(widget.transcript().len(), 1);
        assert!(!widget.is_processing());

        widget.set_input("first");
        assert!(widget.begin_submit(&mut toasts).is_some());
        widget.set_input("second");
        assert!(widget.begin_submit(&mut toasts).is_none());
        assert_eq!(widget.transcript().len(), 3);
        assert_eq!(widget.input(), "second");
    }

    #[test]
    fn guard_reports_missing_credential() {
        let mut widget = widget_with_key(None);
        let mut toasts = Toasts::new();
        widget.set_input("question");

        assert!(widget.begin_submit(&mut toasts).is_none());
        assert_eq!(widget.transcript().len(), 1);
        assert_eq!(widget.input(), "question");
        assert!(!widget.is_processing());
        assert_eq!(
            toasts.items()[0].text,
            ChatError::MissingCredential.to_string()
        );
    }

    #[test]
    fn settle_replaces_placeholder_with_reply() {
        let mut widget = widget_with_key(Some("k"));
        let mut toasts = Toasts::new();
        widget.set_input("q");
        widget.begin_submit(&mut toasts);

        widget.settle(Ok(PLACEHOLDER_TEXT.to_string()), &mut toasts);

        assert!(!widget.is_processing());
        assert!(!widget.transcript().has_placeholder());
        let last = widget.transcript().last().unwrap();
        assert_eq!(last.role, ChatRole::Assistant);
        assert_eq!(last.content, PLACEHOLDER_TEXT);
        assert_eq!(widget.transcript().len(), 3);
    }

    #[test]
    fn settle_failure_appends_classified_text() {
        let mut widget = widget_with_key(Some("k"));
        let mut toasts = Toasts::new();
        widget.set_input("q");
        widget.begin_submit(&mut toasts);

        widget.settle(Err(ChatError::NotFound), &mut toasts);

        assert!(!widget.is_processing());
        assert_eq!(
            widget.transcript().last().unwrap().content,
            ChatError::NotFound.transcript_text()
        );
        assert_eq!(widget.transcript().messages()[0].role, ChatRole::Assistant);
    }

    #[test]
    fn settle_without_request_is_ignored() {
        let mut widget = widget_with_key(Some("k"));
        let mut toasts = Toasts::new();

        widget.settle(Ok("stray".to_string()), &mut toasts);

        assert_eq!(widget.transcript().len(), 1);
        assert!(toasts.items().is_empty());
    }
}
