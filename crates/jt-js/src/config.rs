use std::time::Duration;

/// Per-run knobs for a host context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    /// Delay before a fetch starts or a `Promise` executor's settlement lands.
    /// Attaching `then`/`catch` to the node holding that timer pushes it out
    /// to one more interval from the moment of attachment.
    pub warm_up: Duration,
    /// When false, `fetch` and `Promise` are not installed (timer-only variant).
    pub enable_fetch: bool,
    /// Wall-clock budget for the event loop after the script returns.
    pub max_event_loop: Duration,
    pub recursion_limit: usize,
    pub stack_size_limit: usize,
    pub loop_iteration_limit: u64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            warm_up: Duration::from_secs(1),
            enable_fetch: true,
            max_event_loop: Duration::from_secs(30),
            recursion_limit: 512,
            stack_size_limit: 10 * 1024,
            loop_iteration_limit: 10_000_000,
        }
    }
}

impl HostConfig {
    /// Timer-only configuration: console and timers, no `fetch`/`Promise`.
    pub fn timers_only() -> Self {
        Self {
            enable_fetch: false,
            ..Self::default()
        }
    }
}
