use super::startup::summary_status;
use super::worker::spawn_run;
use super::*;

impl RunnerUiApp {
    pub(super) fn new(settings: RunSettings) -> Self {
        Self {
            source: DEFAULT_SOURCE.to_owned(),
            output: Vec::new(),
            status_line: "Ready".to_owned(),
            settings,
            next_run_id: 1,
            active_run: None,
        }
    }

    fn is_running(&self) -> bool {
        self.active_run.is_some()
    }

    fn start_run(&mut self) {
        if self.is_running() {
            return;
        }

        let run_id = self.next_run_id;
        self.next_run_id = self.next_run_id.saturating_add(1);
        self.output.clear();

        let (sender, receiver) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        match spawn_run(
            run_id,
            self.source.clone(),
            self.settings.clone(),
            sender,
            Arc::clone(&stop),
        ) {
            Ok(()) => {
                self.status_line = "Running...".to_owned();
                self.active_run = Some(ActiveRun {
                    id: run_id,
                    receiver,
                    stop,
                });
            }
            Err(error) => {
                warn!(%error, "failed to spawn run worker");
                self.status_line = format!("Failed to start run: {error}");
            }
        }
    }

    fn stop_run(&mut self) {
        if let Some(run) = &self.active_run {
            run.stop.store(true, Ordering::Relaxed);
            self.status_line = "Stopping...".to_owned();
        }
    }

    fn poll_run(&mut self) {
        loop {
            let message = self
                .active_run
                .as_ref()
                .and_then(|run| run.receiver.try_recv().ok().map(|message| (run.id, message)));

            let Some((active_id, message)) = message else {
                break;
            };
            if message.run_id != active_id {
                continue;
            }

            match message.event {
                RunEvent::Line(line) => self.push_output(line),
                RunEvent::Finished(summary) => {
                    info!(run_id = active_id, status = %summary_status(&summary), "run finished");
                    self.status_line = summary_status(&summary);
                    self.active_run = None;
                }
            }
        }
    }

    fn push_output(&mut self, line: ConsoleLine) {
        if self.output.len() >= MAX_OUTPUT_LINES {
            self.output.remove(0);
        }
        self.output.push(line);
    }
}

fn level_color(level: ConsoleLevel) -> egui::Color32 {
    match level {
        ConsoleLevel::Log => egui::Color32::GRAY,
        ConsoleLevel::Info => egui::Color32::LIGHT_BLUE,
        ConsoleLevel::Warn => egui::Color32::YELLOW,
        ConsoleLevel::Error => egui::Color32::LIGHT_RED,
    }
}

impl eframe::App for RunnerUiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_run();
        if self.is_running() {
            ctx.request_repaint_after(ACTIVE_REPAINT_INTERVAL);
        }
        if ctx.input(|input| input.modifiers.command && input.key_pressed(egui::Key::Enter)) {
            self.start_run();
        }

        egui::TopBottomPanel::top("toolbar_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui
                    .add_enabled(!self.is_running(), egui::Button::new("Run"))
                    .clicked()
                {
                    self.start_run();
                }
                if ui
                    .add_enabled(self.is_running(), egui::Button::new("Stop"))
                    .clicked()
                {
                    self.stop_run();
                }
                if ui.button("Clear output").clicked() {
                    self.output.clear();
                }

                ui.separator();
                ui.add_enabled_ui(!self.is_running(), |ui| {
                    ui.checkbox(&mut self.settings.host.enable_fetch, "fetch");
                });

                ui.separator();
                if self.is_running() {
                    ui.spinner();
                }
                ui.label(&self.status_line);
            });
        });

        egui::TopBottomPanel::bottom("output_panel")
            .resizable(true)
            .default_height(240.0)
            .show(ctx, |ui| {
                ui.heading("Output");
                egui::ScrollArea::vertical()
                    .auto_shrink([false, false])
                    .stick_to_bottom(true)
                    .show(ui, |ui| {
                        for line in &self.output {
                            ui.label(
                                egui::RichText::new(&line.message)
                                    .monospace()
                                    .color(level_color(line.level)),
                            );
                        }
                    });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    ui.add_sized(
                        ui.available_size(),
                        egui::TextEdit::multiline(&mut self.source)
                            .code_editor()
                            .hint_text("Type JavaScript, then press Run (Ctrl+Enter)"),
                    );
                });
        });
    }
}
