//! Host context factory and the serial event loop.
//!
//! Every native binding shares one [`HostState`] through an `Rc`. Natives only
//! touch that state for short, non-reentrant updates; timer arming and
//! cancellation are queued as [`HostTask`]s and applied by the loop, which is
//! also the only place script callbacks are invoked from.

use crate::config::HostConfig;
use crate::console::ConsoleLevel;
use crate::console::ConsoleSink;
use crate::console::console_object;
use crate::fetch::FetchBridge;
use crate::fetch::FetchCompletion;
use crate::promise::NodeId;
use crate::promise::PromiseChain;
use crate::promise::Settlement;
use crate::promise::propagate;
use crate::timers::TimerRegistry;
use crate::timers::delay_from_millis;
use crate::timers::new_timer_id;
use boa_engine::Context;
use boa_engine::JsArgs;
use boa_engine::JsError;
use boa_engine::JsNativeError;
use boa_engine::JsObject;
use boa_engine::JsResult;
use boa_engine::JsString;
use boa_engine::JsValue;
use boa_engine::NativeFunction;
use boa_engine::Source;
use boa_engine::js_string;
use boa_engine::object::FunctionObjectBuilder;
use boa_engine::object::ObjectInitializer;
use boa_engine::property::Attribute;
use boa_gc::Finalize;
use boa_gc::Trace;
use jt_core::RunnerError;
use jt_core::RunnerResult;
use jt_net::Fetcher;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::mpsc;
use std::sync::mpsc::Receiver;
use std::thread;
use std::time::Duration;
use std::time::Instant;
use tracing::debug;
use tracing::warn;

/// Tags every native error instance so continuations can flag failures.
const ERROR_MARKER_BOOTSTRAP: &str = "Error.prototype.isError = () => { return true };";

/// Script-visible timer functions delegating to `timerJS`.
const TIMER_OVERRIDES: &str = r#"
function setTimeout(callback, ms) {
  return timerJS.setTimeout(callback, ms);
}
function clearTimeout(identifier) {
  timerJS.clearTimeout(identifier);
}
function setInterval(callback, ms) {
  return timerJS.setInterval(callback, ms);
}
function clearInterval(identifier) {
  timerJS.clearTimeout(identifier);
}
"#;

pub const EXCEPTION_PREFIX: &str = "JS Error: ";

/// Upper bound on a single idle wait so the stop flag stays responsive.
const IDLE_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
enum TimerCallback {
    Script(JsObject),
    /// String callback, evaluated as source when the timer fires.
    Source(String),
    StartFetch {
        node: NodeId,
        url: String,
    },
    Settle {
        node: NodeId,
        settlement: Settlement<JsValue>,
    },
}

#[derive(Debug)]
enum HostTask {
    Arm {
        id: String,
        delay: Duration,
        repeats: bool,
        callback: TimerCallback,
        requested: Instant,
    },
    Clear(String),
    Postpone {
        id: String,
        until: Instant,
    },
}

struct HostState {
    timers: TimerRegistry<TimerCallback>,
    chain: PromiseChain<JsObject>,
    tasks: VecDeque<HostTask>,
    fetch: Option<FetchBridge>,
    in_flight: usize,
    warm_up: Duration,
}

impl HostState {
    fn is_idle(&self) -> bool {
        self.timers.is_empty() && self.tasks.is_empty() && self.in_flight == 0
    }

    /// Arms the warm-up timer that delivers `callback` and hands it to the
    /// tail of `node`'s chain. Does nothing when `node` already settled or
    /// has a settlement queued.
    fn queue_warm_up(&mut self, node: NodeId, callback: TimerCallback) {
        if !self.chain.begin_settlement(node) {
            debug!(?node, "extra settlement ignored");
            return;
        }
        let id = new_timer_id();
        self.chain.hold_warm_up(node, id.clone());
        self.tasks.push_back(HostTask::Arm {
            id,
            delay: self.warm_up,
            repeats: false,
            callback,
            requested: Instant::now(),
        });
    }
}

type SharedState = Rc<RefCell<HostState>>;

#[derive(Trace, Finalize)]
struct HostCapture {
    #[unsafe_ignore_trace]
    state: SharedState,
}

#[derive(Trace, Finalize)]
struct NodeCapture {
    #[unsafe_ignore_trace]
    state: SharedState,
    #[unsafe_ignore_trace]
    node: NodeId,
    success: bool,
}

#[derive(Trace, Finalize)]
struct ShorthandCapture {
    #[unsafe_ignore_trace]
    state: SharedState,
    success: bool,
}

/// Why [`HostContext::run_event_loop`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// No timers, queued tasks or in-flight fetches remain.
    Idle,
    BudgetExhausted,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopOutcome {
    pub reason: StopReason,
    /// Script timers (function or string callbacks) fired during this call.
    pub timers_fired: usize,
}

/// One isolated script environment with all bridges installed.
pub struct HostContext {
    context: Context,
    state: SharedState,
    console: Rc<dyn ConsoleSink>,
    completions: Receiver<FetchCompletion>,
    config: HostConfig,
    exceptions: usize,
}

impl HostContext {
    /// Builds a fresh context. No user script runs before every binding and
    /// polyfill is in place.
    pub fn create(
        config: HostConfig,
        console: Rc<dyn ConsoleSink>,
        fetcher: Arc<dyn Fetcher>,
    ) -> RunnerResult<Self> {
        let mut context = Context::builder().build().map_err(|error| {
            RunnerError::new(
                "js.context.allocation_failed",
                format!("failed to allocate script context: {error}"),
            )
        })?;
        context
            .runtime_limits_mut()
            .set_recursion_limit(config.recursion_limit);
        context
            .runtime_limits_mut()
            .set_stack_size_limit(config.stack_size_limit);
        context
            .runtime_limits_mut()
            .set_loop_iteration_limit(config.loop_iteration_limit);

        context
            .eval(Source::from_bytes(ERROR_MARKER_BOOTSTRAP.as_bytes()))
            .map_err(|error| {
                RunnerError::new(
                    "js.context.bootstrap_failed",
                    format!("error marker bootstrap failed: {error}"),
                )
            })?;

        let (sender, completions) = mpsc::channel();
        let state = Rc::new(RefCell::new(HostState {
            timers: TimerRegistry::default(),
            chain: PromiseChain::default(),
            tasks: VecDeque::new(),
            fetch: config
                .enable_fetch
                .then(|| FetchBridge::new(fetcher, sender)),
            in_flight: 0,
            warm_up: config.warm_up,
        }));

        install_bindings(&mut context, &state, &console, config.enable_fetch).map_err(|error| {
            RunnerError::new(
                "js.context.binding_failed",
                format!("failed to install host bindings: {error}"),
            )
        })?;

        context
            .eval(Source::from_bytes(TIMER_OVERRIDES.as_bytes()))
            .map_err(|error| {
                RunnerError::new(
                    "js.context.polyfill_failed",
                    format!("timer override script failed: {error}"),
                )
            })?;

        debug!(fetch = config.enable_fetch, warm_up = ?config.warm_up, "host context ready");
        Ok(Self {
            context,
            state,
            console,
            completions,
            config,
            exceptions: 0,
        })
    }

    /// Evaluates `source`; uncaught exceptions go to the exception handler
    /// and yield `None`.
    pub fn eval(&mut self, source: &str) -> Option<JsValue> {
        let result = self.context.eval(Source::from_bytes(source.as_bytes()));
        self.context.run_jobs();
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                self.report_exception(&error);
                None
            }
        }
    }

    /// String conversion used for printed results.
    pub fn display(&mut self, value: &JsValue) -> String {
        match value.to_string(&mut self.context) {
            Ok(text) => text.to_std_string_escaped(),
            Err(_) => value.display().to_string(),
        }
    }

    pub fn exceptions(&self) -> usize {
        self.exceptions
    }

    pub fn pending_timers(&self) -> usize {
        self.state.borrow().timers.len()
    }

    pub fn in_flight_fetches(&self) -> usize {
        self.state.borrow().in_flight
    }

    /// Runs queued tasks, due timers and fetch completions until nothing is
    /// pending, the configured budget runs out, or `stop` is raised.
    pub fn run_event_loop(&mut self, stop: Option<&AtomicBool>) -> LoopOutcome {
        let budget_end = Instant::now().checked_add(self.config.max_event_loop);
        let mut timers_fired = 0;

        let reason = loop {
            self.drain_tasks();
            while let Ok(completion) = self.completions.try_recv() {
                self.complete_fetch(completion);
                self.drain_tasks();
            }

            if stop.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                break StopReason::Stopped;
            }

            let now = Instant::now();
            if budget_end.is_some_and(|end| now >= end) && !self.state.borrow().is_idle() {
                warn!(
                    budget = ?self.config.max_event_loop,
                    pending_timers = self.pending_timers(),
                    in_flight = self.in_flight_fetches(),
                    live_promises = self.state.borrow().chain.len(),
                    "event loop budget exhausted"
                );
                break StopReason::BudgetExhausted;
            }

            let due = self.state.borrow_mut().timers.take_due(now);
            if let Some((id, callback)) = due {
                debug!(%id, "timer fired");
                if matches!(callback, TimerCallback::Script(_) | TimerCallback::Source(_)) {
                    timers_fired += 1;
                }
                self.fire(callback);
                continue;
            }

            let (idle, next_deadline, in_flight) = {
                let state = self.state.borrow();
                (state.is_idle(), state.timers.next_deadline(), state.in_flight)
            };
            if idle {
                break StopReason::Idle;
            }

            let mut wake = now + IDLE_POLL;
            if let Some(next) = next_deadline {
                wake = wake.min(next);
            }
            if let Some(end) = budget_end {
                wake = wake.min(end);
            }
            let wait = wake.saturating_duration_since(now);
            if in_flight > 0 {
                if let Ok(completion) = self.completions.recv_timeout(wait) {
                    self.complete_fetch(completion);
                }
            } else {
                thread::sleep(wait);
            }
        };

        LoopOutcome {
            reason,
            timers_fired,
        }
    }

    fn drain_tasks(&mut self) {
        let mut state = self.state.borrow_mut();
        let state = &mut *state;
        while let Some(task) = state.tasks.pop_front() {
            match task {
                HostTask::Arm {
                    id,
                    delay,
                    repeats,
                    callback,
                    requested,
                } => {
                    debug!(%id, ?delay, repeats, "timer armed");
                    state.timers.arm(id, delay, repeats, callback, requested);
                }
                HostTask::Clear(id) => {
                    let removed = state.timers.clear(&id);
                    debug!(%id, removed, "timer cleared");
                }
                HostTask::Postpone { id, until } => {
                    state.timers.postpone(&id, until);
                }
            }
        }
    }

    fn fire(&mut self, callback: TimerCallback) {
        match callback {
            TimerCallback::Script(function) => {
                if let Err(error) = function.call(&JsValue::undefined(), &[], &mut self.context) {
                    self.report_exception(&error);
                }
            }
            TimerCallback::Source(source) => {
                if let Err(error) = self.context.eval(Source::from_bytes(source.as_bytes())) {
                    self.report_exception(&error);
                }
            }
            TimerCallback::StartFetch { node, url } => self.start_fetch(node, &url),
            TimerCallback::Settle { node, settlement } => self.settle(node, settlement),
        }
        self.context.run_jobs();
    }

    fn start_fetch(&mut self, node: NodeId, url: &str) {
        let started = match &self.state.borrow().fetch {
            Some(bridge) => bridge.start(node, url),
            None => Err(RunnerError::new("js.fetch.disabled", "fetch is disabled")),
        };
        match started {
            Ok(()) => {
                debug!(url, "fetch started");
                self.state.borrow_mut().in_flight += 1;
            }
            Err(error) => {
                debug!(url, %error, "fetch rejected before start");
                let reason = host_error(&mut self.context, &error.message);
                self.settle(node, Settlement::Failure(reason));
            }
        }
    }

    fn complete_fetch(&mut self, completion: FetchCompletion) {
        {
            let mut state = self.state.borrow_mut();
            state.in_flight = state.in_flight.saturating_sub(1);
        }
        let settlement = match completion.outcome {
            Ok(body) => Settlement::Success(JsValue::from(JsString::from(body.as_str()))),
            Err(error) => Settlement::Failure(host_error(&mut self.context, &error.message)),
        };
        self.settle(completion.node, settlement);
        self.context.run_jobs();
    }

    fn settle(&mut self, node: NodeId, settlement: Settlement<JsValue>) {
        let state = Rc::clone(&self.state);
        let context = &mut self.context;
        let console = &self.console;
        let mut exceptions = 0;

        let leftover = propagate(
            node,
            settlement,
            |node, success| state.borrow_mut().chain.settle(node, success),
            |continuation, settlement| {
                run_continuation(context, console.as_ref(), &mut exceptions, &continuation, settlement)
            },
        );
        self.exceptions += exceptions;

        if let Some(Settlement::Failure(reason)) = leftover {
            let reason = self.display(&reason);
            debug!(%reason, "unobserved promise failure dropped");
        }
    }

    fn report_exception(&mut self, error: &JsError) {
        self.exceptions += 1;
        report_exception(&mut self.context, self.console.as_ref(), error);
    }
}

impl Drop for HostContext {
    fn drop(&mut self) {
        // Stored callbacks reference script closures that capture this
        // state; clearing breaks the cycle.
        if let Ok(mut state) = self.state.try_borrow_mut() {
            state.timers.clear_all();
            state.chain.clear();
            state.tasks.clear();
            state.fetch = None;
        }
    }
}

fn install_bindings(
    context: &mut Context,
    state: &SharedState,
    console: &Rc<dyn ConsoleSink>,
    enable_fetch: bool,
) -> JsResult<()> {
    let console_binding = console_object(context, console);
    context.register_global_property(js_string!("console"), console_binding, Attribute::all())?;

    let timer = ObjectInitializer::new(context)
        .function(
            NativeFunction::from_copy_closure_with_captures(set_timeout, host_capture(state)),
            js_string!("setTimeout"),
            2,
        )
        .function(
            NativeFunction::from_copy_closure_with_captures(set_interval, host_capture(state)),
            js_string!("setInterval"),
            2,
        )
        .function(
            NativeFunction::from_copy_closure_with_captures(clear_timeout, host_capture(state)),
            js_string!("clearTimeout"),
            1,
        )
        .build();
    context.register_global_property(js_string!("timerJS"), timer, Attribute::all())?;

    if !enable_fetch {
        return Ok(());
    }

    let fetch_function = FunctionObjectBuilder::new(
        context.realm(),
        NativeFunction::from_copy_closure_with_captures(fetch, host_capture(state)),
    )
    .name(js_string!("fetch"))
    .length(1)
    .constructor(false)
    .build();
    context.register_global_property(js_string!("fetch"), fetch_function, Attribute::all())?;

    let promise = FunctionObjectBuilder::new(
        context.realm(),
        NativeFunction::from_copy_closure_with_captures(promise_constructor, host_capture(state)),
    )
    .name(js_string!("Promise"))
    .length(1)
    .constructor(true)
    .build();
    for (name, success) in [("resolve", true), ("reject", false)] {
        let shorthand = FunctionObjectBuilder::new(
            context.realm(),
            NativeFunction::from_copy_closure_with_captures(
                promise_settled,
                ShorthandCapture {
                    state: Rc::clone(state),
                    success,
                },
            ),
        )
        .name(JsString::from(name))
        .length(1)
        .constructor(false)
        .build();
        promise.set(JsString::from(name), shorthand, false, context)?;
    }
    context.register_global_property(js_string!("Promise"), promise, Attribute::all())?;
    Ok(())
}

fn host_capture(state: &SharedState) -> HostCapture {
    HostCapture {
        state: Rc::clone(state),
    }
}

fn set_timeout(
    _this: &JsValue,
    args: &[JsValue],
    capture: &HostCapture,
    context: &mut Context,
) -> JsResult<JsValue> {
    queue_timer(args, capture, context, false)
}

fn set_interval(
    _this: &JsValue,
    args: &[JsValue],
    capture: &HostCapture,
    context: &mut Context,
) -> JsResult<JsValue> {
    queue_timer(args, capture, context, true)
}

/// Returns the new id immediately; the registry only sees the timer once the
/// loop drains the task queue.
fn queue_timer(
    args: &[JsValue],
    capture: &HostCapture,
    context: &mut Context,
    repeats: bool,
) -> JsResult<JsValue> {
    let callback = match args.get_or_undefined(0).as_callable() {
        Some(function) => TimerCallback::Script(function.clone()),
        None => TimerCallback::Source(
            args.get_or_undefined(0)
                .to_string(context)?
                .to_std_string_escaped(),
        ),
    };
    let delay = match args.get_or_undefined(1) {
        value if value.is_undefined() => delay_from_millis(None),
        value => delay_from_millis(Some(value.to_number(context)?)),
    };

    let id = new_timer_id();
    capture.state.borrow_mut().tasks.push_back(HostTask::Arm {
        id: id.clone(),
        delay,
        repeats,
        callback,
        requested: Instant::now(),
    });
    Ok(JsValue::from(JsString::from(id.as_str())))
}

fn clear_timeout(
    _this: &JsValue,
    args: &[JsValue],
    capture: &HostCapture,
    context: &mut Context,
) -> JsResult<JsValue> {
    let id = args.get_or_undefined(0);
    if !id.is_null_or_undefined() {
        let id = id.to_string(context)?.to_std_string_escaped();
        capture
            .state
            .borrow_mut()
            .tasks
            .push_back(HostTask::Clear(id));
    }
    Ok(JsValue::undefined())
}

fn fetch(
    _this: &JsValue,
    args: &[JsValue],
    capture: &HostCapture,
    context: &mut Context,
) -> JsResult<JsValue> {
    let url = args
        .get_or_undefined(0)
        .to_string(context)?
        .to_std_string_escaped();
    let node = {
        let mut state = capture.state.borrow_mut();
        let node = state.chain.create();
        state.queue_warm_up(node, TimerCallback::StartFetch { node, url });
        node
    };
    Ok(promise_object(context, &capture.state, node).into())
}

fn promise_constructor(
    _this: &JsValue,
    args: &[JsValue],
    capture: &HostCapture,
    context: &mut Context,
) -> JsResult<JsValue> {
    let Some(executor) = args.get_or_undefined(0).as_callable().cloned() else {
        return Err(JsNativeError::typ()
            .with_message("Promise executor must be a function")
            .into());
    };

    let node = capture.state.borrow_mut().chain.create();
    let resolve = settle_function(context, &capture.state, node, true);
    let reject = settle_function(context, &capture.state, node, false);
    if let Err(error) = executor.call(&JsValue::undefined(), &[resolve.into(), reject.into()], context) {
        let reason = thrown_value(context, &error);
        capture
            .state
            .borrow_mut()
            .queue_warm_up(node, TimerCallback::Settle {
                node,
                settlement: Settlement::Failure(reason),
            });
    }
    Ok(promise_object(context, &capture.state, node).into())
}

fn settle_function(
    context: &mut Context,
    state: &SharedState,
    node: NodeId,
    success: bool,
) -> JsObject {
    let name = if success {
        js_string!("resolve")
    } else {
        js_string!("reject")
    };
    FunctionObjectBuilder::new(
        context.realm(),
        NativeFunction::from_copy_closure_with_captures(
            promise_settle,
            NodeCapture {
                state: Rc::clone(state),
                node,
                success,
            },
        ),
    )
    .name(name)
    .length(1)
    .constructor(false)
    .build()
    .into()
}

/// `resolve`/`reject` handed to an executor.
fn promise_settle(
    _this: &JsValue,
    args: &[JsValue],
    capture: &NodeCapture,
    _context: &mut Context,
) -> JsResult<JsValue> {
    let value = args.get_or_undefined(0).clone();
    let settlement = if capture.success {
        Settlement::Success(value)
    } else {
        Settlement::Failure(value)
    };
    capture.state.borrow_mut().queue_warm_up(
        capture.node,
        TimerCallback::Settle {
            node: capture.node,
            settlement,
        },
    );
    Ok(JsValue::undefined())
}

/// `Promise.resolve`/`Promise.reject`: a fresh node settled after the warm-up.
fn promise_settled(
    _this: &JsValue,
    args: &[JsValue],
    capture: &ShorthandCapture,
    context: &mut Context,
) -> JsResult<JsValue> {
    let value = args.get_or_undefined(0).clone();
    let node = {
        let mut state = capture.state.borrow_mut();
        let node = state.chain.create();
        let settlement = if capture.success {
            Settlement::Success(value)
        } else {
            Settlement::Failure(value)
        };
        state.queue_warm_up(node, TimerCallback::Settle { node, settlement });
        node
    };
    Ok(promise_object(context, &capture.state, node).into())
}

/// Script-side handle for one chain node.
fn promise_object(context: &mut Context, state: &SharedState, node: NodeId) -> JsObject {
    let capture = || NodeCapture {
        state: Rc::clone(state),
        node,
        success: true,
    };
    ObjectInitializer::new(context)
        .function(
            NativeFunction::from_copy_closure_with_captures(promise_then, capture()),
            js_string!("then"),
            2,
        )
        .function(
            NativeFunction::from_copy_closure_with_captures(promise_catch, capture()),
            js_string!("catch"),
            1,
        )
        .build()
}

fn promise_then(
    _this: &JsValue,
    args: &[JsValue],
    capture: &NodeCapture,
    context: &mut Context,
) -> JsResult<JsValue> {
    let on_success = args.get_or_undefined(0).as_callable().cloned();
    let on_failure = args.get_or_undefined(1).as_callable().cloned();
    attach_continuations(capture, on_success, on_failure, context)
}

fn promise_catch(
    _this: &JsValue,
    args: &[JsValue],
    capture: &NodeCapture,
    context: &mut Context,
) -> JsResult<JsValue> {
    let on_failure = args.get_or_undefined(0).as_callable().cloned();
    attach_continuations(capture, None, on_failure, context)
}

fn attach_continuations(
    capture: &NodeCapture,
    on_success: Option<JsObject>,
    on_failure: Option<JsObject>,
    context: &mut Context,
) -> JsResult<JsValue> {
    let next = {
        let mut state = capture.state.borrow_mut();
        let state = &mut *state;
        match state.chain.attach(capture.node, on_success, on_failure) {
            Some(attached) => {
                if let Some(id) = attached.warm_up {
                    state.tasks.push_back(HostTask::Postpone {
                        id,
                        until: Instant::now() + state.warm_up,
                    });
                }
                attached.next
            }
            // Already settled: the continuations never run and further
            // chaining on the returned handle is a no-op too.
            None => capture.node,
        }
    };
    Ok(promise_object(context, &capture.state, next).into())
}

/// Calls one continuation and classifies its outcome for the next node.
fn run_continuation(
    context: &mut Context,
    console: &dyn ConsoleSink,
    exceptions: &mut usize,
    continuation: &JsObject,
    settlement: Settlement<JsValue>,
) -> Settlement<JsValue> {
    let success = settlement.is_success();
    let value = settlement.into_value();
    let args = if success && value.is_undefined() {
        Vec::new()
    } else {
        vec![value]
    };

    match continuation.call(&JsValue::undefined(), &args, context) {
        Ok(result) if is_error_marked(&result, context) => Settlement::Failure(result),
        Ok(result) => Settlement::Success(result),
        Err(error) => {
            *exceptions += 1;
            report_exception(context, console, &error);
            Settlement::Failure(thrown_value(context, &error))
        }
    }
}

/// True when `value.isError()` exists and returns a truthy value.
fn is_error_marked(value: &JsValue, context: &mut Context) -> bool {
    let Some(object) = value.as_object() else {
        return false;
    };
    let Ok(marker) = object.get(js_string!("isError"), context) else {
        return false;
    };
    let Some(marker) = marker.as_callable() else {
        return false;
    };
    marker
        .call(value, &[], context)
        .is_ok_and(|flag| flag.to_boolean())
}

fn report_exception(context: &mut Context, console: &dyn ConsoleSink, error: &JsError) {
    let description = describe_error(context, error);
    debug!(%description, "uncaught script exception");
    console.write(ConsoleLevel::Error, &format!("{EXCEPTION_PREFIX}{description}"));
}

fn describe_error(context: &mut Context, error: &JsError) -> String {
    match error.as_opaque() {
        Some(value) => match value.to_string(context) {
            Ok(text) => text.to_std_string_escaped(),
            Err(_) => value.display().to_string(),
        },
        None => error.to_string(),
    }
}

/// Script-visible value for a thrown error. Engine-internal errors become a
/// plain `Error` carrying their description.
fn thrown_value(context: &mut Context, error: &JsError) -> JsValue {
    match error.as_opaque() {
        Some(value) => value.clone(),
        None => host_error(context, &error.to_string()),
    }
}

/// An `Error` instance (so it carries the `isError` marker) for host failures.
fn host_error(context: &mut Context, message: &str) -> JsValue {
    JsNativeError::error()
        .with_message(message.to_owned())
        .to_opaque(context)
        .into()
}
