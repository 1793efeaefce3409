use super::*;

#[derive(Debug, Parser)]
#[command(
    name = "jitty-runner",
    version,
    about = "Run JavaScript snippets with timers, promises and fetch"
)]
pub(super) struct Cli {
    /// Script file to run headless; omit both this and --eval to open the editor.
    #[arg(long, value_name = "PATH", conflicts_with = "eval")]
    pub(super) script: Option<PathBuf>,

    /// Source text to run headless.
    #[arg(long, value_name = "SOURCE")]
    pub(super) eval: Option<String>,

    /// Leave `fetch` and `Promise` uninstalled.
    #[arg(long)]
    pub(super) no_fetch: bool,

    /// Delay before a fetch starts or a promise settles.
    #[arg(long, value_name = "MS", default_value_t = 1000)]
    pub(super) warm_up_ms: u64,

    /// Wall-clock budget for timers and fetches after the script returns.
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub(super) max_loop_secs: u64,

    /// Trust OS root certificates in addition to the bundled WebPKI roots.
    #[arg(long)]
    pub(super) os_roots: bool,

    /// Print tracing events to stderr (`RUST_LOG` also enables them).
    #[arg(long)]
    pub(super) trace: bool,
}

impl Cli {
    pub(super) fn settings(&self) -> RunSettings {
        let host = HostConfig {
            warm_up: Duration::from_millis(self.warm_up_ms),
            enable_fetch: !self.no_fetch,
            max_event_loop: Duration::from_secs(self.max_loop_secs),
            ..HostConfig::default()
        };

        let mut fetch = FetchConfig::default();
        if self.os_roots {
            fetch.tls = fetch.tls.with_trust_store_mode(TrustStoreMode::WebPkiAndOs);
        }

        RunSettings { host, fetch }
    }

    /// Source for a headless run, or `None` when the editor should open.
    pub(super) fn headless_source(&self) -> Result<Option<String>, String> {
        if let Some(source) = &self.eval {
            return Ok(Some(source.clone()));
        }
        let Some(path) = &self.script else {
            return Ok(None);
        };
        std::fs::read_to_string(path)
            .map(Some)
            .map_err(|error| format!("failed to read `{}`: {error}", path.display()))
    }
}
