//! Settings panel for the model source and input geometry.

use super::UiApp;
use artguard_core::config::{MAX_INPUT_SIZE, MODEL_SOURCE_ENV};
use artguard_core::{Classifier, ClassifierConfig, Notice, TensorLayout};
use eframe::egui;
use std::sync::Arc;

impl UiApp {
    /// Renders the settings screen and saves edits to the config file.
    pub(super) fn render_settings_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Settings");
        ui.add_space(8.0);
        ui.horizontal(|ui| {
            ui.label("Model source (path or URL)");
            ui.text_edit_singleline(&mut self.pending_source);
        });
        ui.label("A folder or a URL ending in '/' loads model.onnx from that location.");
        if std::env::var_os(MODEL_SOURCE_ENV).is_some() {
            ui.label(format!(
                "{MODEL_SOURCE_ENV} is set and overrides the model source above."
            ));
        }

        ui.add_space(12.0);
        ui.horizontal(|ui| {
            ui.label("Input size");
            ui.add(
                egui::DragValue::new(&mut self.pending_input_size)
                    .range(1..=MAX_INPUT_SIZE)
                    .speed(1),
            );
        });

        ui.add_space(12.0);
        ui.horizontal(|ui| {
            ui.label("Tensor layout");
            let layout_label = |layout: TensorLayout| match layout {
                TensorLayout::Nhwc => "NHWC (Keras / Teachable Machine)",
                TensorLayout::Nchw => "NCHW (PyTorch)",
            };
            egui::ComboBox::from_id_salt("layout-select")
                .selected_text(layout_label(self.pending_layout))
                .show_ui(ui, |ui| {
                    ui.selectable_value(
                        &mut self.pending_layout,
                        TensorLayout::Nhwc,
                        layout_label(TensorLayout::Nhwc),
                    );
                    ui.selectable_value(
                        &mut self.pending_layout,
                        TensorLayout::Nchw,
                        layout_label(TensorLayout::Nchw),
                    );
                });
        });

        ui.add_space(12.0);
        if ui
            .add_enabled(!self.is_busy(), egui::Button::new("Save"))
            .clicked()
        {
            self.apply_settings();
        }

        ui.add_space(16.0);
        ui.separator();
        ui.add_space(6.0);
        ui.heading("Versions");
        ui.label(format!("App version: {}", self.app_version));
        ui.label(format!("Inference backend: {}", self.classifier.backend_name()));
        ui.label(format!(
            "Model: {}",
            if self.classifier.is_loaded() {
                "loaded"
            } else if self.classifier.is_configured() {
                "loads on first analysis"
            } else {
                "not configured"
            }
        ));
        if let Some(path) = &self.config_path {
            ui.label(format!("Config file: {}", path.display()));
        }
    }

    /// Persist the edited settings and swap in a classifier built from them.
    fn apply_settings(&mut self) {
        let source = self.pending_source.trim();
        let updated = ClassifierConfig {
            model_source: (!source.is_empty()).then(|| source.to_string()),
            input_size: self.pending_input_size,
            layout: self.pending_layout,
        };
        if updated == self.config {
            self.notice = Some(Notice::success("Settings unchanged."));
            return;
        }

        if let Some(path) = &self.config_path {
            if let Err(e) = updated.save(path) {
                tracing::warn!("saving settings failed: {e}");
                self.notice = Some(Notice::error(format!("Saving settings failed: {e}")));
                return;
            }
            tracing::info!("settings saved to {}", path.display());
        }

        self.classifier = Arc::new(Classifier::from_config(
            &updated.clone().with_env_overrides(),
        ));
        self.config = updated;
        self.notice = Some(Notice::success("Settings saved."));
    }
}
