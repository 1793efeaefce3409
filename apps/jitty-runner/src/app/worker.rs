use super::*;

/// Network access for one run; a stub when `fetch` is not installed.
pub(super) fn build_fetcher(settings: &RunSettings) -> RunnerResult<Arc<dyn Fetcher>> {
    if !settings.host.enable_fetch {
        return Ok(Arc::new(OfflineFetcher));
    }
    let fetcher = HttpFetcher::new(settings.fetch.clone())?;
    Ok(Arc::new(fetcher))
}

/// Runs `source` on its own thread; the host context never leaves it.
pub(super) fn spawn_run(
    run_id: u64,
    source: String,
    settings: RunSettings,
    sender: mpsc::Sender<RunMessage>,
    stop: Arc<AtomicBool>,
) -> std::io::Result<()> {
    let job = move || {
        let summary = execute_run(run_id, &source, settings, &sender, stop);
        let _ = sender.send(RunMessage {
            run_id,
            event: RunEvent::Finished(summary),
        });
    };

    thread::Builder::new()
        .name(RUN_THREAD_NAME.to_owned())
        .stack_size(RUN_THREAD_STACK_SIZE)
        .spawn(job)
        .map(|_| ())
}

fn execute_run(
    run_id: u64,
    source: &str,
    settings: RunSettings,
    sender: &mpsc::Sender<RunMessage>,
    stop: Arc<AtomicBool>,
) -> RunSummary {
    let fetcher = match build_fetcher(&settings) {
        Ok(fetcher) => fetcher,
        Err(error) => {
            return RunSummary {
                setup_error: Some(error),
                ..RunSummary::default()
            };
        }
    };
    let console: Rc<dyn ConsoleSink> = Rc::new(ChannelConsole {
        run_id,
        sender: sender.clone(),
    });

    info!(run_id, "run started");
    Runner::new(settings.host, console, fetcher)
        .with_stop_flag(stop)
        .run(source)
}
