//! Fetch bridge plumbing: requests run on transport threads and report back
//! over a channel the event loop drains.

use crate::promise::NodeId;
use jt_core::RunnerError;
use jt_core::RunnerResult;
use jt_net::FetchUrl;
use jt_net::Fetcher;
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread;
use tracing::debug;

const FETCH_THREAD_NAME: &str = "jitty-fetch";

/// Outcome of one request, addressed to the node it settles.
#[derive(Debug)]
pub(crate) struct FetchCompletion {
    pub node: NodeId,
    pub outcome: RunnerResult<String>,
}

pub(crate) struct FetchBridge {
    fetcher: Arc<dyn Fetcher>,
    sender: Sender<FetchCompletion>,
}

impl FetchBridge {
    pub fn new(fetcher: Arc<dyn Fetcher>, sender: Sender<FetchCompletion>) -> Self {
        Self { fetcher, sender }
    }

    /// Validates `raw_url` and issues the request on its own thread.
    ///
    /// An `Err` means nothing was started and the caller settles the node
    /// itself; `Ok` means exactly one completion will arrive for `node`.
    pub fn start(&self, node: NodeId, raw_url: &str) -> RunnerResult<()> {
        let url = FetchUrl::parse(raw_url)?;
        let fetcher = Arc::clone(&self.fetcher);
        let sender = self.sender.clone();

        let job = move || {
            let outcome = fetch_text(fetcher.as_ref(), &url);
            debug!(url = url.as_str(), ok = outcome.is_ok(), "fetch finished");
            let _ = sender.send(FetchCompletion { node, outcome });
        };

        thread::Builder::new()
            .name(FETCH_THREAD_NAME.to_owned())
            .spawn(job)
            .map(|_| ())
            .map_err(|error| {
                RunnerError::new(
                    "js.fetch.spawn_failed",
                    format!("failed to start fetch for `{raw_url}`: {error}"),
                )
            })
    }
}

fn fetch_text(fetcher: &dyn Fetcher, url: &FetchUrl) -> RunnerResult<String> {
    fetcher.fetch(url)?.text()
}
