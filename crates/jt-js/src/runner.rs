//! Runner: source text in, printed output and a summary out.

use crate::config::HostConfig;
use crate::console::ConsoleLevel;
use crate::console::ConsoleSink;
use crate::context::HostContext;
use crate::context::StopReason;
use jt_core::RunnerError;
use jt_net::Fetcher;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tracing::error;

/// Replaces curly double quotes from rich-text editors with `"`.
pub fn normalize_quotes(source: &str) -> String {
    source.replace(['\u{201C}', '\u{201D}'], "\"")
}

/// What one run produced, beyond the lines written to the console.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Stringified completion value, when it was not `undefined`.
    pub result: Option<String>,
    pub had_exception: bool,
    pub timers_fired: usize,
    /// `None` when the context could not be created.
    pub stop_reason: Option<StopReason>,
    pub setup_error: Option<RunnerError>,
}

pub struct Runner {
    config: HostConfig,
    console: Rc<dyn ConsoleSink>,
    fetcher: Arc<dyn Fetcher>,
    stop: Option<Arc<AtomicBool>>,
}

impl Runner {
    pub fn new(config: HostConfig, console: Rc<dyn ConsoleSink>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            config,
            console,
            fetcher,
            stop: None,
        }
    }

    /// Raising `flag` ends the event loop at its next turn.
    pub fn with_stop_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop = Some(flag);
        self
    }

    /// Runs `source_text` in a fresh context and drives its event loop.
    pub fn run(&self, source_text: &str) -> RunSummary {
        let source = normalize_quotes(source_text);

        let mut host = match HostContext::create(
            self.config.clone(),
            Rc::clone(&self.console),
            Arc::clone(&self.fetcher),
        ) {
            Ok(host) => host,
            Err(setup_error) => {
                error!(%setup_error, "failed to create host context");
                return RunSummary {
                    setup_error: Some(setup_error),
                    ..RunSummary::default()
                };
            }
        };

        let result = host
            .eval(&source)
            .filter(|value| !value.is_undefined())
            .map(|value| host.display(&value));
        if let Some(text) = &result {
            self.console.write(ConsoleLevel::Log, text);
        }

        let outcome = host.run_event_loop(self.stop.as_deref());
        RunSummary {
            result,
            had_exception: host.exceptions() > 0,
            timers_fired: outcome.timers_fired,
            stop_reason: Some(outcome.reason),
            setup_error: None,
        }
    }
}
