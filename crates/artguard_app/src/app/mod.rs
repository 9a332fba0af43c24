//! Desktop shell around [`UploadFlow`].

mod settings;

use anyhow::{Context, Result};
use artguard_core::config::CONFIG_FILE_NAME;
use artguard_core::flow::SUPPORTED_EXTENSIONS;
use artguard_core::{
    ClassificationResult, Classifier, ClassifierConfig, ClassifierError, FlowState, Notice,
    NoticeKind, TensorLayout, UploadFlow,
};
use eframe::{App, Frame, egui};
use rfd::FileDialog;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use tokio::runtime::Runtime;

const PREVIEW_SIZE: u32 = 384;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Panel {
    Main,
    Settings,
}

/// A classification running on the worker runtime.
struct Pending {
    generation: u64,
    rx: Receiver<Result<ClassificationResult, ClassifierError>>,
}

pub struct UiApp {
    runtime: Runtime,
    config: ClassifierConfig,
    config_path: Option<PathBuf>,
    classifier: Arc<Classifier>,
    flow: UploadFlow,
    pending: Option<Pending>,
    notice: Option<Notice>,
    preview: Option<egui::TextureHandle>,
    panel: Panel,
    pending_source: String,
    pending_input_size: u32,
    pending_layout: TensorLayout,
    app_version: &'static str,
}

impl UiApp {
    pub fn new() -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("artguard-worker")
            .build()
            .context("cannot start worker runtime")?;

        let config_path = config_path();
        let mut notice = None;
        let config = match &config_path {
            Some(path) => ClassifierConfig::load_or_default(path).unwrap_or_else(|e| {
                tracing::warn!("ignoring config {}: {e}", path.display());
                notice = Some(Notice::error(format!("Config ignored: {e}")));
                ClassifierConfig::default()
            }),
            None => ClassifierConfig::default(),
        };
        let classifier = Arc::new(Classifier::from_config(&config.clone().with_env_overrides()));
        if !classifier.is_configured() {
            tracing::warn!("no model source configured; classification will fail until one is set");
        }

        Ok(Self {
            runtime,
            pending_source: config.model_source.clone().unwrap_or_default(),
            pending_input_size: config.input_size,
            pending_layout: config.layout,
            config,
            config_path,
            classifier,
            flow: UploadFlow::new(),
            pending: None,
            notice,
            preview: None,
            panel: Panel::Main,
            app_version: env!("ARTGUARD_VERSION"),
        })
    }

    fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    fn pick_image(&mut self, ctx: &egui::Context) {
        let Some(path) = FileDialog::new()
            .add_filter("Images", &SUPPORTED_EXTENSIONS)
            .pick_file()
        else {
            return;
        };
        let outcome = self.flow.select_path(&path);
        self.after_selection(ctx, outcome);
    }

    fn take_dropped_file(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.first().cloned());
        let Some(file) = dropped else {
            return;
        };
        let outcome = if let Some(bytes) = &file.bytes {
            self.flow.select_image(file.name.clone(), bytes)
        } else if let Some(path) = &file.path {
            self.flow.select_path(path)
        } else {
            return;
        };
        self.after_selection(ctx, outcome);
    }

    fn after_selection(&mut self, ctx: &egui::Context, outcome: Result<(), ClassifierError>) {
        match outcome {
            Ok(()) => {
                self.notice = None;
                self.refresh_preview(ctx);
            }
            Err(e) => {
                tracing::warn!("upload rejected: {e}");
                self.notice = Some(Notice::error(artguard_core::flow::MSG_DECODE_FAILED));
            }
        }
    }

    fn refresh_preview(&mut self, ctx: &egui::Context) {
        self.preview = self.flow.selected().map(|selected| {
            let thumb = image::imageops::thumbnail(&*selected.image, PREVIEW_SIZE, PREVIEW_SIZE);
            let (w, h) = thumb.dimensions();
            let color = egui::ColorImage::from_rgba_unmultiplied(
                [w as usize, h as usize],
                thumb.as_raw(),
            );
            ctx.load_texture(
                format!("preview:{}", selected.name),
                color,
                egui::TextureOptions::LINEAR,
            )
        });
    }

    fn clear(&mut self) {
        self.flow.clear();
        self.preview = None;
        self.notice = None;
    }

    fn start_classification(&mut self, ctx: &egui::Context) {
        if self.is_busy() {
            return;
        }
        let ticket = match self.flow.begin_classification() {
            Ok(t) => t,
            Err(e) => {
                tracing::debug!("classification not started: {e}");
                return;
            }
        };
        let (tx, rx) = mpsc::channel();
        let classifier = Arc::clone(&self.classifier);
        let repaint = ctx.clone();
        let image = ticket.image;
        self.runtime.spawn(async move {
            let outcome = classifier.classify_shared(image).await;
            let _ = tx.send(outcome);
            repaint.request_repaint();
        });
        self.notice = None;
        self.pending = Some(Pending {
            generation: ticket.generation,
            rx,
        });
    }

    fn poll_pending(&mut self) {
        let Some(pending) = &self.pending else {
            return;
        };
        let outcome = match pending.rx.try_recv() {
            Ok(outcome) => outcome,
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Disconnected) => Err(ClassifierError::inference(
                "classification task ended without a result",
            )),
        };
        let generation = pending.generation;
        self.pending = None;
        if let Some(notice) = self.flow.finish_classification(generation, outcome) {
            self.notice = Some(notice);
        }
    }

    fn render_notice(&self, ui: &mut egui::Ui) {
        if let Some(notice) = &self.notice {
            let color = match notice.kind {
                NoticeKind::Success => egui::Color32::from_rgb(60, 160, 90),
                NoticeKind::Error => egui::Color32::from_rgb(200, 70, 70),
            };
            ui.colored_label(color, &notice.message);
        }
    }

    fn render_instructions(&self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.add_space(24.0);
            ui.heading("How it works");
            ui.add_space(8.0);
            for (step, title, body) in [
                ("1", "Upload Image", "Select or drag & drop any image file"),
                ("2", "AI Analysis", "Our model analyzes the image patterns"),
                ("3", "Get Results", "See classification with confidence score"),
            ] {
                ui.label(egui::RichText::new(format!("{step}. {title}")).strong());
                ui.label(body);
                ui.add_space(6.0);
            }
            ui.add_space(12.0);
            ui.label("Supports JPG, PNG, WebP, and GIF");
        });
    }

    fn render_preview(&self, ui: &mut egui::Ui) {
        let Some(selected) = self.flow.selected() else {
            return;
        };
        ui.vertical_centered(|ui| {
            if let Some(tex) = &self.preview {
                let [w, h] = tex.size();
                let (resp, painter) = ui.allocate_painter(
                    egui::Vec2::new(w as f32, h as f32),
                    egui::Sense::hover(),
                );
                let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
                painter.image(tex.id(), resp.rect, uv, egui::Color32::WHITE);
            }
            ui.label(&selected.name);
        });
    }

    fn render_result(&self, ui: &mut egui::Ui, result: &ClassificationResult) {
        let accent = if result.label.is_human_made() {
            egui::Color32::from_rgb(70, 130, 200)
        } else {
            egui::Color32::from_rgb(170, 90, 200)
        };
        ui.vertical_centered(|ui| {
            ui.add_space(12.0);
            ui.label(
                egui::RichText::new(result.label.badge())
                    .size(18.0)
                    .color(accent),
            );
            ui.label(
                egui::RichText::new(result.label.headline())
                    .size(24.0)
                    .strong(),
            );
            ui.add_space(8.0);
            let pct = result.percentage();
            ui.add(
                egui::ProgressBar::new(pct as f32 / 100.0)
                    .fill(accent)
                    .text(format!("Confidence {pct}%")),
            );
            ui.add_space(8.0);
            ui.label(result.label.description());
        });
    }

    fn render_main_panel(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        match self.flow.state().clone() {
            FlowState::Idle => self.render_instructions(ui),
            FlowState::ImageSelected => {
                self.render_preview(ui);
                ui.vertical_centered(|ui| {
                    ui.add_space(12.0);
                    let can_start = self.flow.can_classify() && !self.is_busy();
                    if ui
                        .add_enabled(can_start, egui::Button::new("Analyze Artwork"))
                        .clicked()
                    {
                        self.start_classification(ctx);
                    }
                });
            }
            FlowState::Classifying => {
                self.render_preview(ui);
                ui.vertical_centered(|ui| {
                    ui.add_space(12.0);
                    ui.spinner();
                    ui.label("Analyzing artwork...");
                });
            }
            FlowState::Resulted(result) => {
                self.render_preview(ui);
                self.render_result(ui, &result);
            }
            FlowState::Failed(message) => {
                self.render_preview(ui);
                ui.vertical_centered(|ui| {
                    ui.add_space(12.0);
                    ui.colored_label(egui::Color32::from_rgb(200, 70, 70), message);
                    ui.horizontal(|ui| {
                        if ui
                            .add_enabled(!self.is_busy(), egui::Button::new("Try again"))
                            .clicked()
                        {
                            self.start_classification(ctx);
                        }
                        if ui.button("Dismiss").clicked() {
                            self.flow.dismiss_error();
                            self.notice = None;
                        }
                    });
                });
            }
        }
    }
}

impl App for UiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        self.poll_pending();
        self.take_dropped_file(ctx);

        egui::TopBottomPanel::top("top").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("Choose image...").clicked() {
                    self.pick_image(ctx);
                }
                let has_image = self.flow.selected().is_some();
                if ui
                    .add_enabled(has_image, egui::Button::new("Clear"))
                    .clicked()
                {
                    self.clear();
                }
                let settings_label = match self.panel {
                    Panel::Main => "Settings",
                    Panel::Settings => "Back",
                };
                if ui.button(settings_label).clicked() {
                    self.panel = match self.panel {
                        Panel::Main => Panel::Settings,
                        Panel::Settings => Panel::Main,
                    };
                }
                self.render_notice(ui);
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| match self.panel {
            Panel::Main => {
                ui.vertical_centered(|ui| {
                    ui.heading("ArtGuardian");
                    ui.label(
                        "Discover the authenticity behind every image: human-created artwork or AI-generated.",
                    );
                });
                ui.separator();
                egui::ScrollArea::vertical()
                    .auto_shrink([false; 2])
                    .show(ui, |ui| self.render_main_panel(ui, ctx));
            }
            Panel::Settings => self.render_settings_panel(ui),
        });
    }
}

fn config_path() -> Option<PathBuf> {
    directories_next::ProjectDirs::from("org", "ArtGuardian", "ArtGuardian")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}
