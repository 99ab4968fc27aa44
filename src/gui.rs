use crate::chat_api::{ChatClient, ChatCompletionsRequest, ChatConfig};
use crate::error::ChatError;
use crate::notify::{Notifier, ToastLevel, Toasts};
use crate::prompt::PromptProfile;
use crate::render::{markdown_options, Renderer};
use crate::transcript::{ChatMessage, ChatRole};
use crate::widget::ChatWidget;
use anyhow::{anyhow, Result};
use eframe::egui::{
    self, text::LayoutJob, Align, Align2, Button, Color32, Frame, Layout, RichText, ScrollArea,
    Sense, Stroke, TextFormat,
};
use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};
use std::cell::Cell;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error};

const PANEL_WIDTH: f32 = 380.0;
const EDGE_MARGIN: f32 = 16.0;
const LAUNCHER_CLEARANCE: f32 = 64.0;
const HANDLE_HEIGHT: f32 = 6.0;

const PAGE_BG: Color32 = Color32::from_rgb(244, 245, 247);
const PANEL_BG: Color32 = Color32::from_rgb(255, 255, 255);
const PANEL_BORDER: Color32 = Color32::from_rgb(208, 213, 221);
const ACCENT: Color32 = Color32::from_rgb(37, 99, 235);
const USER_BUBBLE: Color32 = Color32::from_rgb(219, 234, 254);
const ASSISTANT_BUBBLE: Color32 = Color32::from_rgb(243, 244, 246);
const ERROR_TOAST: Color32 = Color32::from_rgb(254, 226, 226);
const SUCCESS_TOAST: Color32 = Color32::from_rgb(220, 252, 231);

enum WorkerEvent {
    Settled(Result<String, ChatError>),
}

pub fn run_gui(
    config: ChatConfig,
    profile: PromptProfile,
    source_text: String,
    source_label: String,
) -> Result<()> {
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1000.0, 760.0])
            .with_min_inner_size([520.0, 720.0])
            .with_title("OCR Chat"),
        ..Default::default()
    };

    eframe::run_native(
        "OCR Chat",
        native_options,
        Box::new(move |cc| {
            configure_theme(&cc.egui_ctx);
            Ok(Box::new(DocumentChatApp::new(
                config,
                profile,
                source_text,
                source_label,
            )))
        }),
    )
    .map_err(|err| anyhow!("Unable to start the graphical interface: {err}"))
}

fn configure_theme(ctx: &egui::Context) {
    let mut style = (*ctx.style()).clone();
    style.visuals = egui::Visuals::light();
    style.visuals.panel_fill = PAGE_BG;
    style.visuals.window_fill = PANEL_BG;
    style.visuals.selection.bg_fill = ACCENT;
    style.visuals.hyperlink_color = ACCENT;
    style.spacing.item_spacing = egui::vec2(8.0, 6.0);
    style.spacing.button_padding = egui::vec2(10.0, 5.0);
    style
        .text_styles
        .insert(egui::TextStyle::Heading, egui::FontId::proportional(18.0));
    style
        .text_styles
        .insert(egui::TextStyle::Body, egui::FontId::proportional(14.0));
    style
        .text_styles
        .insert(egui::TextStyle::Monospace, egui::FontId::monospace(13.0));
    ctx.set_style(style);
}

pub struct DocumentChatApp {
    config: ChatConfig,
    source_label: String,
    widget_visible: Rc<Cell<bool>>,
    widget: ChatWidget,
    toasts: Toasts,
    renderer: Renderer,
    worker_rx: Option<Receiver<WorkerEvent>>,
}

impl DocumentChatApp {
    pub fn new(
        config: ChatConfig,
        profile: PromptProfile,
        source_text: String,
        source_label: String,
    ) -> Self {
        let widget_visible = Rc::new(Cell::new(false));
        let host_flag = Rc::clone(&widget_visible);
        let widget = ChatWidget::new(source_text, config.clone(), profile, move |visible| {
            host_flag.set(visible)
        });

        Self {
            config,
            source_label,
            widget_visible,
            widget,
            toasts: Toasts::new(),
            renderer: Renderer::default(),
            worker_rx: None,
        }
    }

    fn has_source(&self) -> bool {
        !self.widget.source_text().trim().is_empty()
    }

    fn submit(&mut self) {
        let Some(req) = self.widget.begin_submit(&mut self.toasts) else {
            return;
        };
        self.worker_rx = Some(spawn_request(self.config.clone(), req));
    }

    fn drain_worker_events(&mut self) {
        let event = match self.worker_rx.as_ref() {
            Some(rx) => rx.try_recv(),
            None => return,
        };

        match event {
            Ok(WorkerEvent::Settled(result)) => {
                self.worker_rx = None;
                self.widget.settle(result, &mut self.toasts);
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                error!("request worker exited without reporting a result");
                self.worker_rx = None;
                self.widget.settle(
                    Err(ChatError::Network("request worker stopped".to_string())),
                    &mut self.toasts,
                );
            }
        }
    }

    pub fn show(&mut self, ctx: &egui::Context) {
        self.drain_worker_events();
        self.toasts.expire(Instant::now());

        let visible = self.has_source() && self.widget_visible.get();
        self.widget.set_visible(visible);

        self.show_document(ctx);
        if self.has_source() {
            self.show_launcher(ctx);
        }
        if self.widget.is_visible() {
            if self.widget.panel().expanded() {
                self.show_panel(ctx);
            } else {
                self.show_collapsed(ctx);
            }
        }
        self.show_toasts(ctx);
    }

    fn show_document(&self, ctx: &egui::Context) {
        egui::CentralPanel::default()
            .frame(Frame::default().fill(PAGE_BG).inner_margin(egui::Margin::same(16)))
            .show(ctx, |ui| {
                ui.heading(self.source_label.as_str());
                ui.add_space(8.0);
                if !self.has_source() {
                    ui.label(
                        RichText::new("No OCR text available for this document.").italics(),
                    );
                    return;
                }
                ScrollArea::vertical()
                    .id_salt("source_text_scroll")
                    .auto_shrink([false, false])
                    .show(ui, |ui| {
                        ui.add(
                            egui::Label::new(
                                RichText::new(self.widget.source_text()).monospace(),
                            )
                            .wrap(),
                        );
                    });
            });
    }

    fn show_launcher(&mut self, ctx: &egui::Context) {
        egui::Area::new(egui::Id::new("chat_launcher"))
            .anchor(Align2::RIGHT_BOTTOM, egui::vec2(-EDGE_MARGIN, -EDGE_MARGIN))
            .show(ctx, |ui| {
                let label = if self.widget_visible.get() {
                    "Hide assistant"
                } else {
                    "Ask about this document"
                };
                let button = Button::new(RichText::new(label).color(Color32::WHITE).strong())
                    .fill(ACCENT)
                    .min_size(egui::vec2(48.0, 40.0));
                if ui.add(button).clicked() {
                    self.widget_visible.set(!self.widget_visible.get());
                }
            });
    }

    fn show_collapsed(&mut self, ctx: &egui::Context) {
        egui::Area::new(egui::Id::new("chat_collapsed"))
            .anchor(
                Align2::RIGHT_BOTTOM,
                egui::vec2(-EDGE_MARGIN, -(EDGE_MARGIN + LAUNCHER_CLEARANCE)),
            )
            .show(ctx, |ui| {
                let button = Button::new(RichText::new("Chat").strong())
                    .fill(PANEL_BG)
                    .stroke(Stroke::new(1.0, PANEL_BORDER))
                    .min_size(egui::vec2(56.0, 40.0));
                if ui.add(button).on_hover_text("Expand chat").clicked() {
                    self.widget.expand();
                }
            });
    }

    fn show_panel(&mut self, ctx: &egui::Context) {
        let height = self.widget.panel().height() as f32;

        egui::Area::new(egui::Id::new("chat_panel"))
            .anchor(
                Align2::RIGHT_BOTTOM,
                egui::vec2(-EDGE_MARGIN, -(EDGE_MARGIN + LAUNCHER_CLEARANCE)),
            )
            .show(ctx, |ui| {
                Frame::default()
                    .fill(PANEL_BG)
                    .stroke(Stroke::new(1.0, PANEL_BORDER))
                    .inner_margin(egui::Margin::same(8))
                    .show(ui, |ui| {
                        ui.set_width(PANEL_WIDTH);
                        ui.set_height(height);
                        self.resize_handle(ui);
                        self.panel_header(ui);
                        ui.separator();

                        let input_height = 36.0;
                        let list_height = (ui.available_height() - input_height).max(80.0);
                        ScrollArea::vertical()
                            .id_salt("chat_transcript_scroll")
                            .max_height(list_height)
                            .stick_to_bottom(true)
                            .auto_shrink([false, false])
                            .show(ui, |ui| {
                                for message in self.widget.transcript().messages() {
                                    render_message(ui, message);
                                    ui.add_space(4.0);
                                }
                            });

                        ui.separator();
                        self.input_row(ui);
                    });
            });
    }

    fn resize_handle(&mut self, ui: &mut egui::Ui) {
        let (rect, response) =
            ui.allocate_exact_size(egui::vec2(ui.available_width(), HANDLE_HEIGHT), Sense::drag());
        let response = response.on_hover_cursor(egui::CursorIcon::ResizeVertical);
        ui.painter().hline(
            rect.center().x - 20.0..=rect.center().x + 20.0,
            rect.center().y,
            Stroke::new(2.0, PANEL_BORDER),
        );

        let pointer_y = ui.input(|i| i.pointer.interact_pos()).map(|pos| pos.y);
        let panel = self.widget.panel_mut();
        if response.drag_started() {
            if let Some(y) = pointer_y {
                panel.begin_resize(y);
            }
        } else if response.dragged() {
            if let Some(y) = pointer_y {
                panel.drag_resize(y);
            }
        }
        if response.drag_stopped() {
            panel.end_resize();
        } else if panel.is_resizing() && !ui.input(|i| i.pointer.any_down()) {
            panel.cancel_resize();
        }
    }

    fn panel_header(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label(RichText::new("Document assistant").strong());
            ui.label(RichText::new(self.widget.profile().label()).small().weak());
            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                if ui.small_button("x").on_hover_text("Close").clicked() {
                    debug!("chat closed from header");
                    self.widget.close();
                }
                if ui.small_button("_").on_hover_text("Minimize").clicked() {
                    self.widget.minimize();
                }
                if ui
                    .small_button("Copy as HTML")
                    .on_hover_text("Copy the conversation as sanitized HTML")
                    .clicked()
                {
                    let html = self.widget.transcript().to_html(&self.renderer);
                    ui.ctx().copy_text(html);
                    self.toasts.success("Transcript copied as HTML");
                }
            });
        });
    }

    fn input_row(&mut self, ui: &mut egui::Ui) {
        let enabled = !self.widget.is_processing();
        let mut submit = false;

        ui.horizontal(|ui| {
            let send_width = 64.0;
            let input_width = (ui.available_width() - send_width - 8.0).max(120.0);
            let response = ui
                .add_enabled_ui(enabled, |ui| {
                    ui.add_sized(
                        [input_width, 26.0],
                        egui::TextEdit::singleline(self.widget.input_mut())
                            .hint_text("Ask a question about the document..."),
                    )
                })
                .inner;
            let enter_pressed =
                response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));

            let send = Button::new(RichText::new("Send").color(Color32::WHITE))
                .fill(ACCENT)
                .min_size(egui::vec2(send_width, 26.0));
            if ui.add_enabled(enabled, send).clicked() || enter_pressed {
                submit = true;
            }
        });

        if submit {
            self.submit();
        }
    }

    fn show_toasts(&self, ctx: &egui::Context) {
        if self.toasts.items().is_empty() {
            return;
        }
        egui::Area::new(egui::Id::new("chat_toasts"))
            .anchor(Align2::RIGHT_TOP, egui::vec2(-EDGE_MARGIN, EDGE_MARGIN))
            .show(ctx, |ui| {
                for toast in self.toasts.items() {
                    let fill = match toast.level {
                        ToastLevel::Loading => ASSISTANT_BUBBLE,
                        ToastLevel::Success => SUCCESS_TOAST,
                        ToastLevel::Error => ERROR_TOAST,
                    };
                    Frame::default()
                        .fill(fill)
                        .stroke(Stroke::new(1.0, PANEL_BORDER))
                        .inner_margin(egui::Margin::symmetric(10, 6))
                        .show(ui, |ui| {
                            ui.set_max_width(300.0);
                            ui.label(toast.text.as_str());
                        });
                }
            });
    }
}

impl eframe::App for DocumentChatApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.show(ctx);
        ctx.request_repaint_after(Duration::from_millis(16));
    }
}

fn spawn_request(config: ChatConfig, req: ChatCompletionsRequest) -> Receiver<WorkerEvent> {
    let (tx, rx) = mpsc::channel::<WorkerEvent>();

    thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build();

        let result = match runtime {
            Ok(rt) => rt.block_on(async {
                let client = ChatClient::new(config)
                    .map_err(|err| ChatError::Network(format!("{err:#}")))?;
                client.complete(&req).await
            }),
            Err(err) => Err(ChatError::Network(format!(
                "unable to create the async runtime: {err}"
            ))),
        };

        let _ = tx.send(WorkerEvent::Settled(result));
    });

    rx
}

fn render_message(ui: &mut egui::Ui, message: &ChatMessage) {
    let is_user = message.role == ChatRole::User;
    let fill = if is_user { USER_BUBBLE } else { ASSISTANT_BUBBLE };
    let row_layout = if is_user {
        Layout::right_to_left(Align::TOP)
    } else {
        Layout::left_to_right(Align::TOP)
    };
    let max_bubble_width = (ui.available_width() * 0.85).max(160.0);

    ui.with_layout(row_layout, |ui| {
        ui.scope(|ui| {
            ui.set_max_width(max_bubble_width);
            Frame::default()
                .fill(fill)
                .inner_margin(egui::Margin::same(8))
                .show(ui, |ui| {
                    if message.is_placeholder() {
                        ui.label(RichText::new(message.content.as_str()).italics().weak());
                    } else if is_user {
                        ui.add(egui::Label::new(message.content.as_str()).wrap());
                    } else {
                        let job = markdown_layout_job(&message.content, ui.style());
                        ui.add(egui::Label::new(job).wrap());
                    }
                });
        });
    });
}

#[derive(Default)]
struct InlineStyle {
    strong: usize,
    emphasis: usize,
    strikethrough: usize,
    code_block: bool,
    heading: Option<HeadingLevel>,
}

fn markdown_layout_job(markdown: &str, style: &egui::Style) -> LayoutJob {
    let body = egui::TextStyle::Body.resolve(style);
    let mono = egui::TextStyle::Monospace.resolve(style);
    let text_color = style.visuals.text_color();
    let strong_color = style.visuals.strong_text_color();
    let code_bg = style.visuals.code_bg_color;

    let mut job = LayoutJob::default();
    let mut state = InlineStyle::default();
    let mut list_depth: usize = 0;
    let mut ordered_counters: Vec<Option<u64>> = Vec::new();

    let format_for = |state: &InlineStyle, code: bool| -> TextFormat {
        let mut format = TextFormat {
            font_id: body.clone(),
            color: text_color,
            ..Default::default()
        };
        if code || state.code_block {
            format.font_id = mono.clone();
            format.background = code_bg;
        }
        if let Some(level) = state.heading {
            let size = match level {
                HeadingLevel::H1 => body.size + 6.0,
                HeadingLevel::H2 => body.size + 4.0,
                _ => body.size + 2.0,
            };
            format.font_id = egui::FontId::proportional(size);
            format.color = strong_color;
        }
        if state.strong > 0 {
            format.color = strong_color;
        }
        format.italics = state.emphasis > 0;
        if state.strikethrough > 0 {
            format.strikethrough = Stroke::new(1.0, text_color);
        }
        format
    };

    let push_break = |job: &mut LayoutJob| {
        if !job.text.is_empty() && !job.text.ends_with("\n\n") {
            let newline = if job.text.ends_with('\n') { "\n" } else { "\n\n" };
            job.append(newline, 0.0, TextFormat::default());
        }
    };

    for event in Parser::new_ext(markdown, markdown_options()) {
        match event {
            Event::Start(Tag::Paragraph) => {
                if list_depth == 0 {
                    push_break(&mut job);
                }
            }
            Event::Start(Tag::Heading { level, .. }) => {
                push_break(&mut job);
                state.heading = Some(level);
            }
            Event::End(TagEnd::Heading(_)) => {
                state.heading = None;
                job.append("\n", 0.0, TextFormat::default());
            }
            Event::Start(Tag::CodeBlock(_)) => {
                push_break(&mut job);
                state.code_block = true;
            }
            Event::End(TagEnd::CodeBlock) => state.code_block = false,
            Event::Start(Tag::List(start)) => {
                if list_depth == 0 {
                    push_break(&mut job);
                }
                list_depth += 1;
                ordered_counters.push(start);
            }
            Event::End(TagEnd::List(_)) => {
                list_depth = list_depth.saturating_sub(1);
                ordered_counters.pop();
            }
            Event::Start(Tag::Item) => {
                if !job.text.is_empty() && !job.text.ends_with('\n') {
                    job.append("\n", 0.0, TextFormat::default());
                }
                let indent = "    ".repeat(list_depth.saturating_sub(1));
                let marker = match ordered_counters.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{indent}{n}. ");
                        *n += 1;
                        marker
                    }
                    _ => format!("{indent}• "),
                };
                job.append(&marker, 0.0, format_for(&state, false));
            }
            Event::Start(Tag::Strong) => state.strong += 1,
            Event::End(TagEnd::Strong) => state.strong = state.strong.saturating_sub(1),
            Event::Start(Tag::Emphasis) => state.emphasis += 1,
            Event::End(TagEnd::Emphasis) => state.emphasis = state.emphasis.saturating_sub(1),
            Event::Start(Tag::Strikethrough) => state.strikethrough += 1,
            Event::End(TagEnd::Strikethrough) => {
                state.strikethrough = state.strikethrough.saturating_sub(1)
            }
            Event::Text(text) => job.append(&text, 0.0, format_for(&state, false)),
            Event::Code(code) => job.append(&code, 0.0, format_for(&state, true)),
            // Raw HTML from the model is shown literally, never interpreted.
            Event::Html(raw) | Event::InlineHtml(raw) => {
                job.append(&raw, 0.0, format_for(&state, true))
            }
            Event::SoftBreak => job.append(" ", 0.0, format_for(&state, false)),
            Event::HardBreak => job.append("\n", 0.0, format_for(&state, false)),
            Event::Rule => {
                push_break(&mut job);
                job.append("――――――――\n", 0.0, format_for(&state, false));
            }
            Event::End(TagEnd::TableCell) => job.append("\t", 0.0, format_for(&state, false)),
            Event::End(TagEnd::TableRow) | Event::End(TagEnd::TableHead) => {
                job.append("\n", 0.0, format_for(&state, false))
            }
            _ => {}
        }
    }

    while job.text.ends_with('\n') {
        job.text.pop();
        if let Some(section) = job.sections.last_mut() {
            if section.byte_range.end > job.text.len() {
                section.byte_range.end = job.text.len();
            }
        }
        job.sections.retain(|section| !section.byte_range.is_empty());
    }

    job
}
