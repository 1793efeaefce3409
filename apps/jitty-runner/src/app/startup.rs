use super::cli::Cli;
use super::worker::build_fetcher;
use super::*;

pub(crate) fn run() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.trace || std::env::var_os("RUST_LOG").is_some());

    let settings = cli.settings();
    match cli.headless_source() {
        Ok(Some(source)) => run_headless(&settings, &source),
        Ok(None) => run_window(settings),
        Err(error) => {
            eprintln!("{APP_TITLE} startup error: {error}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(enable: bool) {
    if !enable {
        return;
    }

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if let Err(error) = builder.try_init() {
        eprintln!("failed to install tracing subscriber: {error}");
    }
}

fn run_headless(settings: &RunSettings, source: &str) -> ExitCode {
    let fetcher = match build_fetcher(settings) {
        Ok(fetcher) => fetcher,
        Err(error) => {
            eprintln!("{APP_TITLE} startup error: {error}");
            return ExitCode::FAILURE;
        }
    };

    let console: Rc<dyn ConsoleSink> = Rc::new(StdoutConsole);
    let summary = Runner::new(settings.host.clone(), console, fetcher).run(source);
    info!(status = %summary_status(&summary), "headless run finished");
    if let Some(error) = &summary.setup_error {
        eprintln!("{APP_TITLE} startup error: {error}");
    }
    exit_code_for(&summary)
}

fn run_window(settings: RunSettings) -> ExitCode {
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(APP_TITLE)
            .with_inner_size([960.0, 720.0])
            .with_min_inner_size([480.0, 360.0]),
        ..Default::default()
    };

    let result = eframe::run_native(
        APP_TITLE,
        native_options,
        Box::new(move |_cc| Ok(Box::new(RunnerUiApp::new(settings)))),
    );
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{APP_TITLE} window error: {error}");
            ExitCode::FAILURE
        }
    }
}

pub(super) fn exit_code_for(summary: &RunSummary) -> ExitCode {
    if summary.setup_error.is_some() || summary.had_exception {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// One-line description of how a run ended.
pub(super) fn summary_status(summary: &RunSummary) -> String {
    if let Some(error) = &summary.setup_error {
        return format!("Setup failed: {error}");
    }
    let outcome = match summary.stop_reason {
        Some(StopReason::Stopped) => "Stopped",
        Some(StopReason::BudgetExhausted) => "Event loop budget exhausted",
        Some(StopReason::Idle) | None if summary.had_exception => "Finished with errors",
        Some(StopReason::Idle) | None => "Finished",
    };
    let plural = if summary.timers_fired == 1 { "" } else { "s" };
    format!("{outcome} ({} timer{plural} fired)", summary.timers_fired)
}
