//! Host-runtime bridge: runs script snippets in an isolated engine context
//! with console, timers, `fetch` and a minimal `Promise` provided by the host.

pub mod config;
pub mod console;
pub mod context;
mod fetch;
pub mod promise;
pub mod runner;
pub mod timers;

pub use config::HostConfig;
pub use console::ConsoleLevel;
pub use console::ConsoleLine;
pub use console::ConsoleSink;
pub use console::MemoryConsole;
pub use console::StdoutConsole;
pub use context::EXCEPTION_PREFIX;
pub use context::HostContext;
pub use context::LoopOutcome;
pub use context::StopReason;
pub use runner::RunSummary;
pub use runner::Runner;
pub use runner::normalize_quotes;
