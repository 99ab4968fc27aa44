use std::time::{Duration, Instant};

pub const TOAST_LIFETIME: Duration = Duration::from_secs(4);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NotificationId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastLevel {
    Loading,
    Success,
    Error,
}

pub trait Notifier {
    fn loading(&mut self, text: &str) -> NotificationId;
    fn dismiss(&mut self, id: NotificationId);
    fn success(&mut self, text: &str);
    fn error(&mut self, text: &str);
}

#[derive(Clone, Debug)]
pub struct Toast {
    pub id: NotificationId,
    pub level: ToastLevel,
    pub text: String,
    created: Instant,
}

#[derive(Default)]
pub struct Toasts {
    next_id: u64,
    items: Vec<Toast>,
}

impl Toasts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[Toast] {
        &self.items
    }

    /// Loading toasts stay until dismissed; the others expire after [`TOAST_LIFETIME`].
    pub fn expire(&mut self, now: Instant) {
        self.items.retain(|toast| {
            toast.level == ToastLevel::Loading
                || now.saturating_duration_since(toast.created) < TOAST_LIFETIME
        });
    }

    fn push(&mut self, level: ToastLevel, text: &str) -> NotificationId {
        let id = NotificationId(self.next_id);
        self.next_id += 1;
        self.items.push(Toast {
            id,
            level,
            text: text.to_string(),
            created: Instant::now(),
        });
        id
    }
}

impl Notifier for Toasts {
    fn loading(&mut self, text: &str) -> NotificationId {
        self.push(ToastLevel::Loading, text)
    }

    fn dismiss(&mut self, id: NotificationId) {
        self.items.retain(|toast| toast.id != id);
    }

    fn success(&mut self, text: &str) {
        self.push(ToastLevel::Success, text);
    }

    fn error(&mut self, text: &str) {
        self.push(ToastLevel::Error, text);
    }
}
