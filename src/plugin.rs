//! # Plugin Registration
//!
//! Exposes the `buggy` and `buggy-attr` passes to a host pipeline: textual
//! pipeline parsing (`buggy-attr,buggy<crash-on-vector;no-crash-on-i1-select>`),
//! the `BUGGY_OPTIONS` environment default and the extension point callbacks.

use crate::fault::FaultHandler;
use crate::ir::Module;
use crate::options::{BuggyOptions, ParseError};
use crate::passes::{BuggyAttrPass, BuggyPass, PassType};
use itertools::Itertools;
use log::{debug, info};
use regex::Regex;
use std::fmt;
use std::sync::{Arc, OnceLock};
use thiserror::Error;

/// Environment variable holding the options of a plain `buggy` pipeline element
pub const BUGGY_OPTIONS_ENV: &str = "BUGGY_OPTIONS";

/// Errors while registering passes from pipeline text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("unknown pass name '{0}'")]
    UnknownPass(String),

    #[error("invalid options for pass '{pass}': {source}")]
    InvalidOptions {
        pass: String,
        #[source]
        source: ParseError,
    },

    #[error("pass '{0}' takes no parameters")]
    UnexpectedParameters(String),

    #[error("malformed pipeline element '{0}'")]
    Malformed(String),
}

/// Static description of the plugin
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PluginInfo {
    pub name: &'static str,
    pub version: &'static str,
}

pub const PLUGIN_INFO: PluginInfo = PluginInfo {
    name: "BuggyPlugin",
    version: env!("CARGO_PKG_VERSION"),
};

/// Points of the host's default pipeline where plugins may add passes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExtensionPoint {
    PipelineStart,
    VectorizerStart,
    OptimizerLast,
}

/// Ordered list of passes run over a module
#[derive(Clone, Debug, Default)]
pub struct PassPipeline {
    passes: Vec<PassType>,
}

impl PassPipeline {
    pub fn new(passes: Vec<PassType>) -> Self {
        Self { passes }
    }

    pub fn passes(&self) -> &[PassType] {
        &self.passes
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Run every pass in order. Returns whether any pass reported a change.
    pub fn run(&self, module: &mut Module, handler: &dyn FaultHandler) -> bool {
        let mut changed = false;
        for pass in &self.passes {
            let pass_changed = pass.run(module, handler);
            debug!("Pass {} changed: {}", pass.name(), pass_changed);
            changed |= pass_changed;
        }
        changed
    }
}

impl fmt::Display for PassPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.passes.iter().map(|pass| pass.name()).join(","))
    }
}

/// The plugin with its registration time defaults
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuggyPlugin {
    /// Options used for plain `buggy` elements and extension point registration
    pub default_options: BuggyOptions,
}

impl BuggyPlugin {
    pub fn new(default_options: BuggyOptions) -> Self {
        Self { default_options }
    }

    /// Create the plugin with defaults from [`BUGGY_OPTIONS_ENV`]. Unset means all disabled.
    pub fn from_env() -> Result<Self, PipelineError> {
        let raw = std::env::var(BUGGY_OPTIONS_ENV).unwrap_or_default();
        let default_options =
            BuggyOptions::parse(&raw).map_err(|source| PipelineError::InvalidOptions {
                pass: "buggy".to_string(),
                source,
            })?;
        info!("Plugin defaults from {}: '{}'", BUGGY_OPTIONS_ENV, default_options);
        Ok(Self { default_options })
    }

    /// Resolve one pipeline element.
    ///
    /// # Arguments
    ///
    /// * `name` - Pass name without parameters.
    /// * `params` - Text between `<` and `>`, if present.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(PassType))` - The element names one of this plugin's passes.
    /// * `Ok(None)` - The name belongs to some other pass provider.
    /// * `Err(PipelineError)` - Known name with unusable parameters.
    pub fn parse_pipeline_element(
        &self,
        name: &str,
        params: Option<&str>,
    ) -> Result<Option<PassType>, PipelineError> {
        match (name, params) {
            ("buggy", None) => Ok(Some(Arc::new(BuggyPass::new(self.default_options)) as PassType)),
            ("buggy", Some(params)) => {
                let options =
                    BuggyOptions::parse(params).map_err(|source| PipelineError::InvalidOptions {
                        pass: name.to_string(),
                        source,
                    })?;
                Ok(Some(Arc::new(BuggyPass::new(options)) as PassType))
            }
            ("buggy-attr", None) => Ok(Some(Arc::new(BuggyAttrPass) as PassType)),
            ("buggy-attr", Some(_)) => Err(PipelineError::UnexpectedParameters(name.to_string())),
            _ => Ok(None),
        }
    }

    /// Parse a comma separated pipeline of this plugin's passes.
    pub fn parse_pipeline(&self, text: &str) -> Result<PassPipeline, PipelineError> {
        let mut passes = Vec::new();
        if text.trim().is_empty() {
            return Ok(PassPipeline::new(passes));
        }
        for element in text.split(',') {
            let captures = element_regex()
                .captures(element)
                .ok_or_else(|| PipelineError::Malformed(element.to_string()))?;
            let name = &captures[1];
            let params = captures.get(2).map(|params| params.as_str());
            let pass = self
                .parse_pipeline_element(name, params)?
                .ok_or_else(|| PipelineError::UnknownPass(name.to_string()))?;
            passes.push(pass);
        }
        Ok(PassPipeline::new(passes))
    }

    /// Passes this plugin adds at `point` of the host's default pipeline
    pub fn passes_at(&self, point: ExtensionPoint) -> Vec<PassType> {
        match point {
            ExtensionPoint::VectorizerStart => {
                let pass: PassType = Arc::new(BuggyPass::new(self.default_options));
                vec![pass]
            }
            ExtensionPoint::PipelineStart | ExtensionPoint::OptimizerLast => Vec::new(),
        }
    }
}

/// `name` or `name<params>`, surrounding whitespace allowed
fn element_regex() -> &'static Regex {
    static ELEMENT: OnceLock<Regex> = OnceLock::new();
    ELEMENT.get_or_init(|| {
        Regex::new(r"^\s*([A-Za-z0-9_.-]+)(?:<([^<>]*)>)?\s*$").expect("valid pipeline regex")
    })
}
