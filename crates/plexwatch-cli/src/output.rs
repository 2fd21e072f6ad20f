use clap::ValueEnum;
use owo_colors::OwoColorize;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
    #[value(name = "json-pretty")]
    JsonPretty,
}

#[derive(Debug, Clone, Copy)]
enum Kind {
    Success,
    Info,
    Warning,
    Error,
}

impl Kind {
    fn as_str(self) -> &'static str {
        match self {
            Kind::Success => "success",
            Kind::Info => "info",
            Kind::Warning => "warning",
            Kind::Error => "error",
        }
    }
}

/// User-facing output. Logs go through tracing; this is for results.
pub struct Output {
    format: OutputFormat,
    quiet: bool,
}

impl Output {
    pub fn new(format: OutputFormat, quiet: bool) -> Self {
        Self { format, quiet }
    }

    pub fn is_human(&self) -> bool {
        self.format == OutputFormat::Human
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    pub fn success(&self, msg: impl AsRef<str>) {
        self.emit(Kind::Success, msg.as_ref());
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        self.emit(Kind::Info, msg.as_ref());
    }

    pub fn warn(&self, msg: impl AsRef<str>) {
        self.emit(Kind::Warning, msg.as_ref());
    }

    /// Shown even in quiet mode
    pub fn error(&self, msg: impl AsRef<str>) {
        self.emit(Kind::Error, msg.as_ref());
    }

    /// Plain line in human mode; nothing in JSON mode
    pub fn println(&self, msg: impl AsRef<str>) {
        if !self.quiet && self.is_human() {
            println!("{}", msg.as_ref());
        }
    }

    pub fn json(&self, data: &Value) {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string(data).unwrap_or_default()),
            OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(data).unwrap_or_default()),
            OutputFormat::Human => println!("{}", data),
        }
    }

    fn emit(&self, kind: Kind, msg: &str) {
        if self.quiet && !matches!(kind, Kind::Error) {
            return;
        }
        match self.format {
            OutputFormat::Human => match kind {
                Kind::Success => println!("{} {}", "✓".green(), msg),
                Kind::Info => println!("{}", msg),
                Kind::Warning => println!("{} {}", "⚠".yellow(), msg),
                Kind::Error => eprintln!("{} {}", "✗".red(), msg),
            },
            OutputFormat::Json | OutputFormat::JsonPretty => {
                self.json(&json!({ "type": kind.as_str(), "message": msg }));
            }
        }
    }
}
