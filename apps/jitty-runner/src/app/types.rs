/// Configuration shared by headless and windowed runs.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RunSettings {
    host: HostConfig,
    fetch: FetchConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum RunEvent {
    Line(ConsoleLine),
    Finished(RunSummary),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RunMessage {
    run_id: u64,
    event: RunEvent,
}

struct ActiveRun {
    id: u64,
    receiver: mpsc::Receiver<RunMessage>,
    stop: Arc<AtomicBool>,
}

struct RunnerUiApp {
    source: String,
    output: Vec<ConsoleLine>,
    status_line: String,
    settings: RunSettings,
    next_run_id: u64,
    active_run: Option<ActiveRun>,
}

/// Console sink living on the run thread; lines travel to the window.
struct ChannelConsole {
    run_id: u64,
    sender: mpsc::Sender<RunMessage>,
}

impl ConsoleSink for ChannelConsole {
    fn write(&self, level: ConsoleLevel, message: &str) {
        let _ = self.sender.send(RunMessage {
            run_id: self.run_id,
            event: RunEvent::Line(ConsoleLine {
                level,
                message: message.to_owned(),
            }),
        });
    }
}

/// Stands in for the network when `fetch` is not installed.
struct OfflineFetcher;

impl Fetcher for OfflineFetcher {
    fn fetch(&self, url: &FetchUrl) -> RunnerResult<FetchedResponse> {
        Err(RunnerError::new(
            "js.fetch.disabled",
            format!("fetch is disabled; refusing `{}`", url.as_str()),
        ))
    }
}
