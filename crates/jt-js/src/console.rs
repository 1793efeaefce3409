//! Console bridge: `console.log` and friends forward to a host sink.

use boa_engine::Context;
use boa_engine::JsObject;
use boa_engine::JsResult;
use boa_engine::JsString;
use boa_engine::JsValue;
use boa_engine::NativeFunction;
use boa_engine::object::ObjectInitializer;
use boa_gc::Finalize;
use boa_gc::Trace;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleLevel {
    Log,
    Info,
    Warn,
    Error,
}

impl ConsoleLevel {
    pub const ALL: [Self; 4] = [Self::Log, Self::Info, Self::Warn, Self::Error];

    /// Script-visible method name.
    pub fn method(self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ConsoleLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method())
    }
}

/// Where console output and uncaught exceptions end up.
pub trait ConsoleSink {
    fn write(&self, level: ConsoleLevel, message: &str);
}

/// Writes `log`/`info` to stdout and `warn`/`error` to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutConsole;

impl ConsoleSink for StdoutConsole {
    fn write(&self, level: ConsoleLevel, message: &str) {
        match level {
            ConsoleLevel::Log | ConsoleLevel::Info => println!("{message}"),
            ConsoleLevel::Warn | ConsoleLevel::Error => eprintln!("{message}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleLine {
    pub level: ConsoleLevel,
    pub message: String,
}

/// Keeps every line in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryConsole {
    lines: Rc<RefCell<Vec<ConsoleLine>>>,
}

impl MemoryConsole {
    pub fn lines(&self) -> Vec<ConsoleLine> {
        self.lines.borrow().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.lines
            .borrow()
            .iter()
            .map(|line| line.message.clone())
            .collect()
    }
}

impl ConsoleSink for MemoryConsole {
    fn write(&self, level: ConsoleLevel, message: &str) {
        self.lines.borrow_mut().push(ConsoleLine {
            level,
            message: message.to_owned(),
        });
    }
}

#[derive(Trace, Finalize)]
struct ConsoleCapture {
    #[unsafe_ignore_trace]
    sink: Rc<dyn ConsoleSink>,
    #[unsafe_ignore_trace]
    level: ConsoleLevel,
}

/// Builds the script-side `console` object.
pub(crate) fn console_object(context: &mut Context, sink: &Rc<dyn ConsoleSink>) -> JsObject {
    let mut console = ObjectInitializer::new(context);
    for level in ConsoleLevel::ALL {
        let method = NativeFunction::from_copy_closure_with_captures(
            |_this, args, capture: &ConsoleCapture, ctx| {
                let message = join_display(args, ctx)?;
                capture.sink.write(capture.level, &message);
                Ok(JsValue::undefined())
            },
            ConsoleCapture {
                sink: Rc::clone(sink),
                level,
            },
        );
        console.function(method, JsString::from(level.method()), 1);
    }
    console.build()
}

/// String conversion of each argument, joined with single spaces.
pub(crate) fn join_display(args: &[JsValue], context: &mut Context) -> JsResult<String> {
    let mut parts = Vec::with_capacity(args.len());
    for arg in args {
        parts.push(arg.to_string(context)?.to_std_string_escaped());
    }
    Ok(parts.join(" "))
}

#[cfg(test)]
mod tests {
    use super::ConsoleLevel;
    use super::ConsoleSink;
    use super::MemoryConsole;
    use super::console_object;
    use boa_engine::Context;
    use boa_engine::Source;
    use boa_engine::js_string;
    use boa_engine::property::Attribute;
    use std::rc::Rc;

    fn run_with_console(source: &str) -> MemoryConsole {
        let memory = MemoryConsole::default();
        let sink: Rc<dyn ConsoleSink> = Rc::new(memory.clone());
        let mut context = Context::default();
        let console = console_object(&mut context, &sink);
        if let Err(error) =
            context.register_global_property(js_string!("console"), console, Attribute::all())
        {
            panic!("{error}");
        }
        if let Err(error) = context.eval(Source::from_bytes(source.as_bytes())) {
            panic!("{error}");
        }
        memory
    }

    #[test]
    fn joins_arguments_with_spaces() {
        let memory = run_with_console("console.log('total', 3, true, null);");
        assert_eq!(memory.messages(), vec!["total 3 true null"]);
    }

    #[test]
    fn records_levels_per_method() {
        let memory = run_with_console(
            "console.log('a'); console.info('b'); console.warn('c'); console.error('d');",
        );
        let levels: Vec<ConsoleLevel> = memory.lines().iter().map(|line| line.level).collect();
        assert_eq!(levels, ConsoleLevel::ALL.to_vec());
    }

    #[test]
    fn errors_print_name_and_message() {
        let memory = run_with_console("console.log(new TypeError('bad input'));");
        assert_eq!(memory.messages(), vec!["TypeError: bad input"]);
    }

    #[test]
    fn log_returns_undefined() {
        let memory = run_with_console("console.log(String(console.log('x')));");
        assert_eq!(memory.messages(), vec!["x", "undefined"]);
    }
}
