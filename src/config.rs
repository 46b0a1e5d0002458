use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

/// Configuration structure that can be loaded from JSON5
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub input: Option<PathBuf>,
    #[serde(default)]
    pub passes: Option<String>,
    #[serde(default)]
    pub options: Option<String>,
    #[serde(default)]
    pub output: Option<PathBuf>,
    #[serde(default)]
    pub print: bool,
    #[serde(default)]
    pub watchdog_ms: Option<u64>,
    #[serde(default = "Config::default_log_level")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: None,
            passes: None,
            options: None,
            output: None,
            print: false,
            watchdog_ms: None,
            log_level: Self::default_log_level(),
        }
    }
}

impl Config {
    // Keep defaults in sync with CLI defaults
    fn default_log_level() -> String {
        "warn".to_string()
    }

    /// Load configuration from JSON5 file
    pub fn from_file(path: &PathBuf) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        json5::from_str(&content).map_err(|e| format!("Failed to parse JSON5 config: {}", e))
    }

    /// Create Config from command line arguments
    pub fn from_args(args: &Args) -> Self {
        let mut config = Self::default();
        config.override_with_args(args);
        config
    }

    /// Override config values with command line arguments
    pub fn override_with_args(&mut self, args: &Args) {
        // Only override flags and options if they were given
        if args.input.is_some() {
            self.input = args.input.clone();
        }
        if args.passes.is_some() {
            self.passes = args.passes.clone();
        }
        if args.options.is_some() {
            self.options = args.options.clone();
        }
        if args.output.is_some() {
            self.output = args.output.clone();
        }
        if args.print {
            self.print = true;
        }
        if args.watchdog_ms.is_some() {
            self.watchdog_ms = args.watchdog_ms;
        }
        if let Some(level) = &args.log_level {
            self.log_level = level.clone();
        }
    }

    /// Pipeline text, plain `buggy` if none was configured
    pub fn pipeline_text(&self) -> &str {
        self.passes.as_deref().unwrap_or("buggy")
    }
}

/// Command-line arguments of the `buggy-opt` driver.
///
/// Loads a module description, runs a pipeline of `buggy` / `buggy-attr` passes
/// over it and reports or writes the result.
#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Module description (JSON5)
    pub input: Option<PathBuf>,

    /// Load configuration from JSON5 file
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Pass pipeline:
    ///   --passes 'buggy-attr,buggy<crash-on-buggy-attr;no-crash-on-vector>'
    ///     Plain `buggy` takes its options from --options or BUGGY_OPTIONS
    #[arg(short, long, verbatim_doc_comment)]
    pub passes: Option<String>,

    /// Options for plain `buggy` elements, overrides BUGGY_OPTIONS
    #[arg(long)]
    pub options: Option<String>,

    /// Write the resulting module as JSON
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the resulting module in textual form
    #[arg(long, default_value_t = false)]
    pub print: bool,

    /// Give up waiting for the pipeline after this many milliseconds (exit status 124)
    #[arg(short, long)]
    pub watchdog_ms: Option<u64>,

    /// List all option names of the `buggy` pass
    #[arg(long, default_value_t = false)]
    pub list_options: bool,

    /// Log level: "off", "error", "warn", "info", "debug", "trace"
    #[arg(long)]
    pub log_level: Option<String>,
}
