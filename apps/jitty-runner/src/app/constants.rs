const APP_TITLE: &str = "JittyRunner";
const RUN_THREAD_NAME: &str = "jitty-run";
const RUN_THREAD_STACK_SIZE: usize = 16 * 1024 * 1024;
const ACTIVE_REPAINT_INTERVAL: Duration = Duration::from_millis(50);
const MAX_OUTPUT_LINES: usize = 5_000;
const DEFAULT_SOURCE: &str = r#"console.log("Hello from JittyRunner");

const id = setInterval(() => console.log("tick"), 250);
setTimeout(() => clearInterval(id), 1000);

fetch("https://example.com/")
  .then(body => body.length)
  .then(length => console.log("example.com sent", length, "characters"))
  .catch(error => console.error(error));
"#;
