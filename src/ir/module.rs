use super::function::Function;
use super::instruction::Constant;
use super::types::{Linkage, Type};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Errors while loading a module description from disk
#[derive(Error, Debug)]
pub enum ModuleLoadError {
    #[error("Failed to read module file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON5 module: {0}")]
    Parse(#[from] json5::Error),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GlobalVariable {
    pub name: String,
    #[serde(default)]
    pub linkage: Linkage,
    pub ty: Type,
    #[serde(default)]
    pub initializer: Option<Constant>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GlobalAlias {
    pub name: String,
    #[serde(default)]
    pub linkage: Linkage,
    pub aliasee: Constant,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GlobalValueKind {
    Function,
    Variable,
    Alias,
}

/// Borrowed view of one module level global value
#[derive(Clone, Copy, Debug)]
pub struct GlobalValueRef<'a> {
    pub name: &'a str,
    pub linkage: Linkage,
    pub kind: GlobalValueKind,
}

/// Top level container of the host program
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    #[serde(default)]
    pub globals: Vec<GlobalVariable>,
    #[serde(default)]
    pub aliases: Vec<GlobalAlias>,
    #[serde(default)]
    pub functions: Vec<Function>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Load a module description from a JSON5 file
    pub fn from_file(path: &Path) -> Result<Self, ModuleLoadError> {
        let content = std::fs::read_to_string(path)?;
        Ok(json5::from_str(&content)?)
    }

    /// Every function, global variable and alias of the module
    pub fn global_values(&self) -> impl Iterator<Item = GlobalValueRef<'_>> {
        let functions = self.functions.iter().map(|function| GlobalValueRef {
            name: &function.name,
            linkage: function.linkage,
            kind: GlobalValueKind::Function,
        });
        let variables = self.globals.iter().map(|global| GlobalValueRef {
            name: &global.name,
            linkage: global.linkage,
            kind: GlobalValueKind::Variable,
        });
        let aliases = self.aliases.iter().map(|alias| GlobalValueRef {
            name: &alias.name,
            linkage: alias.linkage,
            kind: GlobalValueKind::Alias,
        });
        functions.chain(variables).chain(aliases)
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|function| function.name == name)
    }

    pub fn function_index(&self, name: &str) -> Option<usize> {
        self.functions
            .iter()
            .position(|function| function.name == name)
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; ModuleID = '{}'", self.name)?;
        for global in &self.globals {
            write!(f, "@{} = {} global {}", global.name, global.linkage, global.ty)?;
            if let Some(init) = &global.initializer {
                write!(f, " {init}")?;
            }
            writeln!(f)?;
        }
        for alias in &self.aliases {
            writeln!(f, "@{} = {} alias {}", alias.name, alias.linkage, alias.aliasee)?;
        }
        for function in &self.functions {
            writeln!(f)?;
            write!(f, "{function}")?;
        }
        Ok(())
    }
}
