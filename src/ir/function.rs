use super::instruction::{BlockId, InstKind, Instruction, ValueId};
use super::types::{Linkage, Type};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Function attribute, either a bare key (`buggy`) or a key/value pair
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Attribute {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "\"{}\"=\"{}\"", self.key, value),
            None => write!(f, "\"{}\"", self.key),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub id: ValueId,
    pub ty: Type,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BasicBlock {
    pub id: BlockId,
    #[serde(default)]
    pub instructions: Vec<Instruction>,
}

impl BasicBlock {
    pub fn new(id: BlockId) -> Self {
        Self {
            id,
            instructions: Vec::new(),
        }
    }

    /// Index of the first instruction after the leading phi nodes
    pub fn first_insertion_point(&self) -> usize {
        self.instructions
            .iter()
            .position(|inst| !inst.is_phi())
            .unwrap_or(self.instructions.len())
    }
}

/// A function of the host program. Functions without blocks are declarations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    #[serde(default)]
    pub linkage: Linkage,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    pub return_type: Type,
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default)]
    pub blocks: Vec<BasicBlock>,
}

impl Function {
    /// Create a body-less function
    pub fn declaration(name: impl Into<String>, return_type: Type) -> Self {
        Self {
            name: name.into(),
            linkage: Linkage::External,
            attributes: Vec::new(),
            return_type,
            params: Vec::new(),
            blocks: Vec::new(),
        }
    }

    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Total number of instructions over all blocks
    pub fn instruction_count(&self) -> usize {
        self.blocks.iter().map(|block| block.instructions.len()).sum()
    }

    /// All instructions in program order
    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.blocks.iter().flat_map(|block| block.instructions.iter())
    }

    pub fn has_attribute(&self, key: &str) -> bool {
        self.attributes.iter().any(|attribute| attribute.key == key)
    }

    /// Add a bare attribute. Returns `false` if the function already carries it.
    pub fn add_attribute(&mut self, key: &str) -> bool {
        if self.has_attribute(key) {
            return false;
        }
        self.attributes.push(Attribute::new(key));
        true
    }

    /// Next unused SSA value number, `None` once `u32::MAX` is taken
    pub fn next_value_id(&self) -> Option<ValueId> {
        let params = self.params.iter().map(|param| param.id.0);
        let insts = self.instructions().map(|inst| inst.id.0);
        match params.chain(insts).max() {
            Some(max) => max.checked_add(1).map(ValueId),
            None => Some(ValueId(0)),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyword = if self.is_declaration() {
            "declare"
        } else {
            "define"
        };
        write!(
            f,
            "{keyword} {} {} @{}({})",
            self.linkage,
            self.return_type,
            self.name,
            self.params
                .iter()
                .map(|param| format!("{} {}", param.ty, param.id))
                .join(", ")
        )?;
        if !self.attributes.is_empty() {
            write!(f, " {}", self.attributes.iter().join(" "))?;
        }
        if self.is_declaration() {
            return writeln!(f);
        }
        writeln!(f, " {{")?;
        for block in &self.blocks {
            writeln!(f, "{}:", block.id)?;
            for inst in &block.instructions {
                writeln!(f, "  {inst}")?;
            }
        }
        writeln!(f, "}}")
    }
}

/// Location of every instruction result of a function, by SSA value number.
///
/// Holds indices only, so a traversal may keep it while mutating instructions in place.
#[derive(Debug, Default)]
pub struct DefinitionIndex {
    locations: HashMap<ValueId, (usize, usize)>,
}

impl DefinitionIndex {
    pub fn build(function: &Function) -> Self {
        let locations = function
            .blocks
            .iter()
            .enumerate()
            .flat_map(|(block_index, block)| {
                block
                    .instructions
                    .iter()
                    .enumerate()
                    .map(move |(inst_index, inst)| (inst.id, (block_index, inst_index)))
            })
            .collect();
        Self { locations }
    }

    /// Instruction defining `id`, `None` for arguments and unknown values
    pub fn lookup<'f>(&self, function: &'f Function, id: ValueId) -> Option<&'f Instruction> {
        let (block_index, inst_index) = *self.locations.get(&id)?;
        function
            .blocks
            .get(block_index)?
            .instructions
            .get(inst_index)
    }
}

/// Incremental construction of function bodies.
///
/// ```
/// use buggy_pass::ir::{FunctionBuilder, InstKind, Type};
///
/// let mut builder = FunctionBuilder::new("f", Type::Void);
/// builder.block();
/// builder.push(Type::Void, InstKind::Ret { value: None });
/// assert_eq!(1, builder.build().instruction_count());
/// ```
pub struct FunctionBuilder {
    function: Function,
    next_id: u32,
    current: Option<usize>,
}

impl FunctionBuilder {
    pub fn new(name: impl Into<String>, return_type: Type) -> Self {
        Self {
            function: Function::declaration(name, return_type),
            next_id: 0,
            current: None,
        }
    }

    pub fn linkage(&mut self, linkage: Linkage) -> &mut Self {
        self.function.linkage = linkage;
        self
    }

    pub fn attribute(&mut self, key: &str) -> &mut Self {
        self.function.add_attribute(key);
        self
    }

    pub fn param(&mut self, ty: Type) -> ValueId {
        let id = self.fresh_id();
        self.function.params.push(Param { id, ty });
        id
    }

    /// Append a new block and make it the insertion block
    pub fn block(&mut self) -> BlockId {
        let id = BlockId(self.function.blocks.len() as u32);
        self.function.blocks.push(BasicBlock::new(id));
        self.current = Some(self.function.blocks.len() - 1);
        id
    }

    pub fn switch_to(&mut self, block: BlockId) {
        self.current = self
            .function
            .blocks
            .iter()
            .position(|candidate| candidate.id == block);
    }

    /// Append an instruction to the insertion block, creating an entry block if there is none
    pub fn push(&mut self, ty: Type, kind: InstKind) -> ValueId {
        let id = self.fresh_id();
        let index = match self.current {
            Some(index) => index,
            None => {
                self.block();
                self.function.blocks.len() - 1
            }
        };
        self.function.blocks[index]
            .instructions
            .push(Instruction::new(id, ty, kind));
        id
    }

    /// Value number the next pushed instruction or param will get
    pub fn peek_id(&self) -> ValueId {
        ValueId(self.next_id)
    }

    pub fn build(self) -> Function {
        self.function
    }

    fn fresh_id(&mut self) -> ValueId {
        let id = ValueId(self.next_id);
        self.next_id += 1;
        id
    }
}
