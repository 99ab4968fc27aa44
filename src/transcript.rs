use crate::render::Renderer;

pub const GREETING: &str = "Hello! I can answer questions about the text extracted from your \
document. What would you like to know?";
pub const PLACEHOLDER_TEXT: &str = "Thinking...";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_api_value(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    Normal,
    Placeholder,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pub kind: MessageKind,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            kind: MessageKind::Normal,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            kind: MessageKind::Normal,
        }
    }

    pub fn placeholder() -> Self {
        Self {
            role: ChatRole::Assistant,
            content: PLACEHOLDER_TEXT.to_string(),
            kind: MessageKind::Placeholder,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.kind == MessageKind::Placeholder
    }
}

#[derive(Clone, Debug)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcript {
    pub fn new() -> Self {
        Self {
            messages: vec![ChatMessage::assistant(GREETING)],
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn has_placeholder(&self) -> bool {
        self.messages.iter().any(ChatMessage::is_placeholder)
    }

    pub fn remove_placeholders(&mut self) -> usize {
        let before = self.messages.len();
        self.messages.retain(|message| !message.is_placeholder());
        before - self.messages.len()
    }

    pub fn to_html(&self, renderer: &Renderer) -> String {
        let mut out = String::from("<div class=\"transcript\">\n");
        for message in self.messages.iter().filter(|m| !m.is_placeholder()) {
            let body = match message.role {
                ChatRole::User => renderer.user_html(&message.content),
                ChatRole::Assistant => renderer.assistant_html(&message.content),
            };
            out.push_str(&format!(
                "<div class=\"message {}\">{}</div>\n",
                message.role.as_api_value(),
                body.trim_end()
            ));
        }
        out.push_str("</div>\n");
        out
    }
}
