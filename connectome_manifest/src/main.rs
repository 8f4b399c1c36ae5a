//! Desktop editor for the data-loading manifest.
//!
//! Builds the group → modality → file hierarchy interactively and persists
//! it under the `data_loading` key of a JSON configuration file. The two
//! left panels drive the selection; every destructive action runs through a
//! confirm dialog, and context violations (no group selected, no
//! configuration loaded) surface as warnings instead of panics.

use eframe::{egui, egui::ViewportBuilder};
use rfd::FileDialog;

mod manifest;

use manifest::{ConfigurationFile, ManifestTree, Selection};

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let native_options = eframe::NativeOptions {
        viewport: ViewportBuilder::default().with_inner_size([960.0, 640.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Data Loading",
        native_options,
        Box::new(|_cc| Ok(Box::<ManifestApp>::default())),
    )
}

/// What kind of name the input dialog is collecting.
#[derive(Copy, Clone, PartialEq)]
enum NameKind {
    Group,
    Modality,
}

impl NameKind {
    fn title(&self) -> &'static str {
        match self {
            NameKind::Group => "Add group",
            NameKind::Modality => "Add modality",
        }
    }

    fn placeholder(&self) -> &'static str {
        match self {
            NameKind::Group => "group_",
            NameKind::Modality => "modality_",
        }
    }
}

/// A pending removal awaiting confirmation.
#[derive(Clone, PartialEq)]
enum RemoveTarget {
    Group(String),
    Modality { group: String, modality: String },
    File { group: String, modality: String, path: String },
}

impl RemoveTarget {
    fn question(&self) -> String {
        match self {
            RemoveTarget::Group(name) => format!("Remove this group: {name}?"),
            RemoveTarget::Modality { group, modality } => {
                format!("Remove this modality: {modality} for {group}?")
            }
            RemoveTarget::File { path, .. } => format!("Remove this file: {path}?"),
        }
    }
}

/// The single modal dialog the app can show at a time.
enum Dialog {
    Warning(String),
    NameInput { kind: NameKind, buffer: String },
    ConfirmRemove(RemoveTarget),
    ConfirmClose,
}

#[derive(Default)]
struct ManifestApp {
    tree: ManifestTree,
    selection: Selection,
    configuration: Option<ConfigurationFile>,
    dialog: Option<Dialog>,
    close_confirmed: bool,
}

impl ManifestApp {
    fn warn(&mut self, message: impl Into<String>) {
        self.dialog = Some(Dialog::Warning(message.into()));
    }

    // ── configuration actions ────────────────────────────────────────────

    fn load_configuration(&mut self) {
        if let Some(config) = &self.configuration {
            let message = format!("Configuration was given!: {}", config.path().display());
            self.warn(message);
            return;
        }

        let Some(path) = FileDialog::new()
            .add_filter("JSON", &["json"])
            .add_filter("All files", &["*"])
            .pick_file()
        else {
            self.warn("Configuration file was not selected");
            return;
        };

        match ConfigurationFile::load(&path) {
            Ok(config) => match config.manifest() {
                Ok(tree) => {
                    tracing::info!(path = %config.path().display(), "loaded configuration");
                    self.tree = tree;
                    self.selection.clear();
                    self.configuration = Some(config);
                }
                Err(err) => {
                    // Path stays discarded; the user holds no configuration.
                    self.warn(format!("Configuration could not be read: {err}"));
                }
            },
            Err(manifest::ManifestError::InvalidJson(_)) | Err(manifest::ManifestError::NotAnObject) => {
                self.warn("Configuration in configuration file is not valid JSON");
            }
            Err(err) => {
                self.warn(format!("Configuration could not be loaded: {err}"));
            }
        }
    }

    fn save_configuration(&mut self) {
        match &mut self.configuration {
            Some(config) => {
                if let Err(err) = config.save(&self.tree) {
                    let message = format!("Saving configuration failed: {err}");
                    self.warn(message);
                } else {
                    tracing::info!(path = %config.path().display(), "saved configuration");
                }
            }
            None => {
                self.warn("Please choose a configuration file first (File menu)!");
            }
        }
    }

    // ── add / remove / clear actions ─────────────────────────────────────

    fn add_group_dialog(&mut self) {
        self.dialog = Some(Dialog::NameInput {
            kind: NameKind::Group,
            buffer: NameKind::Group.placeholder().to_string(),
        });
    }

    fn add_modality_dialog(&mut self) {
        if self.selection.group.is_none() {
            self.warn("Please choose group first!");
            return;
        }
        self.dialog = Some(Dialog::NameInput {
            kind: NameKind::Modality,
            buffer: NameKind::Modality.placeholder().to_string(),
        });
    }

    fn submit_name(&mut self, kind: NameKind, name: &str) {
        let name = name.trim();
        if name.is_empty() {
            return;
        }
        match kind {
            NameKind::Group => {
                self.tree.add_group(name);
            }
            NameKind::Modality => {
                let Some(group) = self.selection.group.clone() else {
                    return;
                };
                if let Err(err) = self.tree.add_modality(&group, name) {
                    self.warn(err.to_string());
                }
            }
        }
    }

    fn add_files(&mut self) {
        let (Some(group), Some(modality)) = (
            self.selection.group.clone(),
            self.selection.modality.clone(),
        ) else {
            self.warn("Please select group and modality first!");
            return;
        };

        let Some(paths) = FileDialog::new().pick_files() else {
            return;
        };

        let paths = paths
            .into_iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>();
        if let Err(err) = self.tree.add_files(&group, &modality, paths) {
            self.warn(err.to_string());
        }
    }

    fn request_remove_group(&mut self) {
        match self.selection.group.clone() {
            Some(group) if self.tree.group(&group).is_some() => {
                self.dialog = Some(Dialog::ConfirmRemove(RemoveTarget::Group(group)));
            }
            _ => self.warn("No group selected!"),
        }
    }

    fn request_remove_modality(&mut self) {
        match (self.selection.group.clone(), self.selection.modality.clone()) {
            (Some(group), Some(modality)) => {
                self.dialog = Some(Dialog::ConfirmRemove(RemoveTarget::Modality {
                    group,
                    modality,
                }));
            }
            _ => self.warn("No group or modality selected!"),
        }
    }

    fn request_remove_file(&mut self) {
        match (
            self.selection.group.clone(),
            self.selection.modality.clone(),
            self.selection.file.clone(),
        ) {
            (Some(group), Some(modality), Some(path)) => {
                self.dialog = Some(Dialog::ConfirmRemove(RemoveTarget::File {
                    group,
                    modality,
                    path,
                }));
            }
            _ => self.warn("No file selected!"),
        }
    }

    fn perform_remove(&mut self, target: RemoveTarget) {
        match target {
            RemoveTarget::Group(name) => {
                self.tree.remove_group(&name);
                self.selection.on_group_removed(&name);
            }
            RemoveTarget::Modality { group, modality } => {
                if let Err(err) = self.tree.remove_modality(&group, &modality) {
                    self.warn(err.to_string());
                    return;
                }
                self.selection.on_modality_removed(&group, &modality);
            }
            RemoveTarget::File {
                group,
                modality,
                path,
            } => {
                if let Err(err) = self.tree.remove_file(&group, &modality, &path) {
                    self.warn(err.to_string());
                    return;
                }
                self.selection.on_file_removed(&path);
            }
        }
    }

    fn clear_groups(&mut self) {
        self.tree.clear_groups();
        self.selection.clear();
    }

    fn clear_modalities(&mut self) {
        let Some(group) = self.selection.group.clone() else {
            self.warn("No group selected!");
            return;
        };
        if self.tree.clear_modalities(&group).is_ok() {
            self.selection.modality = None;
            self.selection.file = None;
        }
    }

    fn clear_files(&mut self) {
        let (Some(group), Some(modality)) = (
            self.selection.group.clone(),
            self.selection.modality.clone(),
        ) else {
            self.warn("Please select group and modality first!");
            return;
        };
        if self.tree.clear_files(&group, &modality).is_ok() {
            self.selection.file = None;
        }
    }

    // ── panels ───────────────────────────────────────────────────────────

    fn show_group_column(&mut self, ui: &mut egui::Ui) {
        ui.heading("Groups");
        egui::ScrollArea::vertical()
            .id_salt("groups")
            .max_height(ui.available_height() - 40.0)
            .show(ui, |ui| {
                let names: Vec<String> =
                    self.tree.groups().iter().map(|g| g.name.clone()).collect();
                for name in names {
                    let selected = self.selection.group.as_deref() == Some(&name);
                    let response = ui.selectable_label(selected, &name);
                    if response.double_clicked() {
                        self.selection.select_group(&name);
                        self.request_remove_group();
                    } else if response.clicked() {
                        self.selection.select_group(&name);
                    }
                }
            });

        ui.horizontal(|ui| {
            if ui.button("Add").clicked() {
                self.add_group_dialog();
            }
            if ui.button("Remove").clicked() {
                self.request_remove_group();
            }
            if ui.button("Clear").clicked() {
                self.clear_groups();
            }
        });
    }

    fn show_modality_column(&mut self, ui: &mut egui::Ui) {
        ui.heading("Modalities");
        egui::ScrollArea::vertical()
            .id_salt("modalities")
            .max_height(ui.available_height() - 40.0)
            .show(ui, |ui| {
                let names: Vec<String> = self
                    .selection
                    .group
                    .as_deref()
                    .and_then(|g| self.tree.group(g))
                    .map(|g| g.modalities.iter().map(|m| m.name.clone()).collect())
                    .unwrap_or_default();
                for name in names {
                    let selected = self.selection.modality.as_deref() == Some(&name);
                    let response = ui.selectable_label(selected, &name);
                    if response.double_clicked() {
                        self.selection.select_modality(&name);
                        self.request_remove_modality();
                    } else if response.clicked() {
                        self.selection.select_modality(&name);
                    }
                }
            });

        ui.horizontal(|ui| {
            if ui.button("Add").clicked() {
                self.add_modality_dialog();
            }
            if ui.button("Remove").clicked() {
                self.request_remove_modality();
            }
            if ui.button("Clear").clicked() {
                self.clear_modalities();
            }
        });
    }

    fn show_file_column(&mut self, ui: &mut egui::Ui) {
        ui.heading("Files");
        egui::ScrollArea::vertical()
            .id_salt("files")
            .max_height(ui.available_height() - 40.0)
            .show(ui, |ui| {
                let files: Vec<String> = match (
                    self.selection.group.as_deref(),
                    self.selection.modality.as_deref(),
                ) {
                    (Some(group), Some(modality)) => self
                        .tree
                        .files(group, modality)
                        .map(|f| f.to_vec())
                        .unwrap_or_default(),
                    _ => Vec::new(),
                };
                for path in files {
                    let selected = self.selection.file.as_deref() == Some(&path);
                    let response = ui.selectable_label(selected, &path);
                    if response.double_clicked() {
                        self.selection.select_file(&path);
                        self.request_remove_file();
                    } else if response.clicked() {
                        self.selection.select_file(&path);
                    }
                }
            });

        ui.horizontal(|ui| {
            if ui.button("Add").clicked() {
                self.add_files();
            }
            if ui.button("Remove").clicked() {
                self.request_remove_file();
            }
            if ui.button("Clear").clicked() {
                self.clear_files();
            }
        });
    }

    // ── dialogs ──────────────────────────────────────────────────────────

    fn show_dialog(&mut self, ctx: &egui::Context) {
        let Some(dialog) = self.dialog.take() else {
            return;
        };

        match dialog {
            Dialog::Warning(message) => {
                let mut open = true;
                egui::Window::new("Warning")
                    .collapsible(false)
                    .resizable(false)
                    .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                    .show(ctx, |ui| {
                        ui.label(message.as_str());
                        if ui.button("OK").clicked() {
                            open = false;
                        }
                    });
                if open {
                    self.dialog = Some(Dialog::Warning(message));
                }
            }
            Dialog::NameInput { kind, mut buffer } => {
                let mut submitted = false;
                let mut cancelled = false;
                egui::Window::new(kind.title())
                    .collapsible(false)
                    .resizable(false)
                    .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                    .show(ctx, |ui| {
                        let edit = ui.text_edit_singleline(&mut buffer);
                        if edit.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                            submitted = true;
                        }
                        ui.horizontal(|ui| {
                            if ui.button("OK").clicked() {
                                submitted = true;
                            }
                            if ui.button("Cancel").clicked() {
                                cancelled = true;
                            }
                        });
                    });

                if submitted {
                    let name = buffer.clone();
                    self.submit_name(kind, &name);
                } else if !cancelled {
                    self.dialog = Some(Dialog::NameInput { kind, buffer });
                }
            }
            Dialog::ConfirmRemove(target) => {
                let mut confirmed = false;
                let mut cancelled = false;
                egui::Window::new("Confirm")
                    .collapsible(false)
                    .resizable(false)
                    .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                    .show(ctx, |ui| {
                        ui.label(target.question());
                        ui.horizontal(|ui| {
                            if ui.button("Yes").clicked() {
                                confirmed = true;
                            }
                            if ui.button("No").clicked() {
                                cancelled = true;
                            }
                        });
                    });

                if confirmed {
                    self.perform_remove(target);
                } else if !cancelled {
                    self.dialog = Some(Dialog::ConfirmRemove(target));
                }
            }
            Dialog::ConfirmClose => {
                let mut quit = false;
                let mut stay = false;
                egui::Window::new("Quit")
                    .collapsible(false)
                    .resizable(false)
                    .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                    .show(ctx, |ui| {
                        ui.label("Are you sure to quit?");
                        ui.horizontal(|ui| {
                            if ui.button("Yes").clicked() {
                                quit = true;
                            }
                            if ui.button("No").clicked() {
                                stay = true;
                            }
                        });
                    });

                if quit {
                    self.close_confirmed = true;
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                } else if !stay {
                    self.dialog = Some(Dialog::ConfirmClose);
                }
            }
        }
    }
}

impl eframe::App for ManifestApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // The close button first routes through the confirm dialog.
        if ctx.input(|i| i.viewport().close_requested()) && !self.close_confirmed {
            ctx.send_viewport_cmd(egui::ViewportCommand::CancelClose);
            self.dialog = Some(Dialog::ConfirmClose);
        }

        egui::TopBottomPanel::top("menu").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Load configuration…").clicked() {
                        self.load_configuration();
                        ui.close_menu();
                    }
                    if ui.button("Save configuration").clicked() {
                        self.save_configuration();
                        ui.close_menu();
                    }
                });
                if let Some(config) = &self.configuration {
                    ui.separator();
                    ui.label(config.path().display().to_string());
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.columns(3, |columns| {
                self.show_group_column(&mut columns[0]);
                self.show_modality_column(&mut columns[1]);
                self.show_file_column(&mut columns[2]);
            });
        });

        self.show_dialog(ctx);
    }
}
