use clap::Parser;
use eframe::egui;
use jt_core::RunnerError;
use jt_core::RunnerResult;
use jt_js::ConsoleLevel;
use jt_js::ConsoleLine;
use jt_js::ConsoleSink;
use jt_js::HostConfig;
use jt_js::RunSummary;
use jt_js::Runner;
use jt_js::StdoutConsole;
use jt_js::StopReason;
use jt_net::FetchConfig;
use jt_net::FetchUrl;
use jt_net::FetchedResponse;
use jt_net::Fetcher;
use jt_net::HttpFetcher;
use jt_net::TrustStoreMode;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use tracing::info;
use tracing::warn;

include!("constants.rs");
include!("types.rs");

mod cli;
mod startup;
mod ui;
mod worker;


pub(crate) use startup::run;
