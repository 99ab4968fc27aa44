pub mod chat_api;
pub mod error;
pub mod gui;
pub mod notify;
pub mod prompt;
pub mod render;
pub mod transcript;
pub mod widget;
