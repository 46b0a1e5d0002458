use super::types::Type;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;

/// SSA value number of a function argument or instruction result
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueId(pub u32);

/// Label of a basic block inside its function
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(pub u32);

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

/// Opcodes which may appear inside a folded constant expression
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstantExprOp {
    GetElementPtr,
    BitCast,
    IntToPtr,
    PtrToInt,
    Add,
    Sub,
}

impl fmt::Display for ConstantExprOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConstantExprOp::GetElementPtr => "getelementptr",
            ConstantExprOp::BitCast => "bitcast",
            ConstantExprOp::IntToPtr => "inttoptr",
            ConstantExprOp::PtrToInt => "ptrtoint",
            ConstantExprOp::Add => "add",
            ConstantExprOp::Sub => "sub",
        };
        f.write_str(name)
    }
}

/// Compile-time folded expression over constants
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConstantExpr {
    pub op: ConstantExprOp,
    pub ty: Type,
    pub operands: Vec<Constant>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constant {
    Int { ty: Type, value: i64 },
    Null,
    Undef(Type),
    /// Direct reference to a module level global value
    Global(String),
    Expr(ConstantExpr),
}

impl Constant {
    pub fn is_constant_expr(&self) -> bool {
        matches!(self, Constant::Expr(_))
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Int { ty, value } => write!(f, "{ty} {value}"),
            Constant::Null => write!(f, "null"),
            Constant::Undef(ty) => write!(f, "{ty} undef"),
            Constant::Global(name) => write!(f, "@{name}"),
            Constant::Expr(expr) => write!(
                f,
                "{} ({}) to {}",
                expr.op,
                expr.operands.iter().join(", "),
                expr.ty
            ),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    Value(ValueId),
    Const(Constant),
}

impl Operand {
    pub fn as_value(&self) -> Option<ValueId> {
        match self {
            Operand::Value(id) => Some(*id),
            Operand::Const(_) => None,
        }
    }

    pub fn as_constant(&self) -> Option<&Constant> {
        match self {
            Operand::Const(constant) => Some(constant),
            Operand::Value(_) => None,
        }
    }
}

impl From<ValueId> for Operand {
    fn from(id: ValueId) -> Self {
        Operand::Value(id)
    }
}

impl From<Constant> for Operand {
    fn from(constant: Constant) -> Self {
        Operand::Const(constant)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Value(id) => write!(f, "{id}"),
            Operand::Const(constant) => write!(f, "{constant}"),
        }
    }
}

/// Inline assembly snippet used as a call target
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InlineAsm {
    pub asm: String,
    pub constraints: String,
    pub side_effects: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Callee {
    /// Statically known target function
    Direct(String),
    /// Target computed at runtime
    Indirect(Operand),
    Asm(InlineAsm),
}

/// Integer comparison predicates
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntPredicate {
    Eq,
    Ne,
    Ugt,
    Uge,
    Ult,
    Ule,
    Sgt,
    Sge,
    Slt,
    Sle,
}

impl fmt::Display for IntPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IntPredicate::Eq => "eq",
            IntPredicate::Ne => "ne",
            IntPredicate::Ugt => "ugt",
            IntPredicate::Uge => "uge",
            IntPredicate::Ult => "ult",
            IntPredicate::Ule => "ule",
            IntPredicate::Sgt => "sgt",
            IntPredicate::Sge => "sge",
            IntPredicate::Slt => "slt",
            IntPredicate::Sle => "sle",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    SDiv,
    UDiv,
    And,
    Or,
    Xor,
    Shl,
    LShr,
    AShr,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CastOp {
    Trunc,
    ZExt,
    SExt,
    BitCast,
    IntToPtr,
    PtrToInt,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhiIncoming {
    pub value: Operand,
    pub block: BlockId,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SwitchCase {
    pub value: i64,
    pub dest: BlockId,
}

/// Instruction kinds of the host representation.
///
/// The set is closed: every structural query of the fault engine is answered by
/// matching on one of these variants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum InstKind {
    Binary {
        binop: BinaryOp,
        lhs: Operand,
        rhs: Operand,
    },
    ICmp {
        predicate: IntPredicate,
        lhs: Operand,
        rhs: Operand,
    },
    Select {
        condition: Operand,
        true_value: Operand,
        false_value: Operand,
    },
    Phi {
        incoming: Vec<PhiIncoming>,
    },
    Switch {
        condition: Operand,
        default: BlockId,
        cases: Vec<SwitchCase>,
    },
    Br {
        dest: BlockId,
    },
    CondBr {
        condition: Operand,
        if_true: BlockId,
        if_false: BlockId,
    },
    Ret {
        value: Option<Operand>,
    },
    Unreachable,
    Load {
        ptr: Operand,
    },
    Store {
        value: Operand,
        ptr: Operand,
    },
    Call {
        callee: Callee,
        args: Vec<Operand>,
    },
    ShuffleVector {
        lhs: Operand,
        rhs: Operand,
        mask: Vec<i32>,
    },
    ExtractElement {
        vector: Operand,
        index: Operand,
    },
    InsertElement {
        vector: Operand,
        element: Operand,
        index: Operand,
    },
    Cast {
        cast: CastOp,
        value: Operand,
    },
    Alloca {
        allocated: Type,
    },
    GetElementPtr {
        base: Operand,
        indices: Vec<Operand>,
    },
}

impl InstKind {
    pub fn opcode_name(&self) -> &'static str {
        match self {
            InstKind::Binary { .. } => "binop",
            InstKind::ICmp { .. } => "icmp",
            InstKind::Select { .. } => "select",
            InstKind::Phi { .. } => "phi",
            InstKind::Switch { .. } => "switch",
            InstKind::Br { .. } | InstKind::CondBr { .. } => "br",
            InstKind::Ret { .. } => "ret",
            InstKind::Unreachable => "unreachable",
            InstKind::Load { .. } => "load",
            InstKind::Store { .. } => "store",
            InstKind::Call { .. } => "call",
            InstKind::ShuffleVector { .. } => "shufflevector",
            InstKind::ExtractElement { .. } => "extractelement",
            InstKind::InsertElement { .. } => "insertelement",
            InstKind::Cast { .. } => "cast",
            InstKind::Alloca { .. } => "alloca",
            InstKind::GetElementPtr { .. } => "getelementptr",
        }
    }
}

/// One instruction: SSA number, result type and kind
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub id: ValueId,
    pub ty: Type,
    pub kind: InstKind,
}

impl Instruction {
    pub fn new(id: ValueId, ty: Type, kind: InstKind) -> Self {
        Self { id, ty, kind }
    }

    pub fn is_phi(&self) -> bool {
        matches!(self.kind, InstKind::Phi { .. })
    }

    pub fn is_terminator(&self) -> bool {
        matches!(
            self.kind,
            InstKind::Br { .. }
                | InstKind::CondBr { .. }
                | InstKind::Switch { .. }
                | InstKind::Ret { .. }
                | InstKind::Unreachable
        )
    }

    /// Incoming edges if this is a phi node
    pub fn phi_incoming(&self) -> Option<&[PhiIncoming]> {
        match &self.kind {
            InstKind::Phi { incoming } => Some(incoming),
            _ => None,
        }
    }

    /// Number of cases (default excluded) if this is a switch
    pub fn case_count(&self) -> Option<usize> {
        match &self.kind {
            InstKind::Switch { cases, .. } => Some(cases.len()),
            _ => None,
        }
    }

    pub fn is_call(&self) -> bool {
        matches!(self.kind, InstKind::Call { .. })
    }

    /// Statically known target function of a call. `None` for indirect and inline asm calls.
    pub fn called_function(&self) -> Option<&str> {
        match &self.kind {
            InstKind::Call {
                callee: Callee::Direct(name),
                ..
            } => Some(name),
            _ => None,
        }
    }

    /// Address operand of a load or store
    pub fn pointer_operand(&self) -> Option<&Operand> {
        match &self.kind {
            InstKind::Load { ptr } | InstKind::Store { ptr, .. } => Some(ptr),
            _ => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.ty.is_void() {
            write!(f, "{} = ", self.id)?;
        }
        match &self.kind {
            InstKind::Binary { binop, lhs, rhs } => {
                write!(f, "{} {lhs}, {rhs}", format!("{binop:?}").to_lowercase())?
            }
            InstKind::ICmp {
                predicate,
                lhs,
                rhs,
            } => write!(f, "icmp {predicate} {lhs}, {rhs}")?,
            InstKind::Select {
                condition,
                true_value,
                false_value,
            } => write!(f, "select {condition}, {true_value}, {false_value}")?,
            InstKind::Phi { incoming } => write!(
                f,
                "phi {}",
                incoming
                    .iter()
                    .map(|edge| format!("[ {}, {} ]", edge.value, edge.block))
                    .join(", ")
            )?,
            InstKind::Switch {
                condition,
                default,
                cases,
            } => write!(
                f,
                "switch {condition}, label {default} [{}]",
                cases
                    .iter()
                    .map(|case| format!("{} -> {}", case.value, case.dest))
                    .join(", ")
            )?,
            InstKind::Br { dest } => write!(f, "br label {dest}")?,
            InstKind::CondBr {
                condition,
                if_true,
                if_false,
            } => write!(f, "br {condition}, label {if_true}, label {if_false}")?,
            InstKind::Ret { value: Some(value) } => write!(f, "ret {value}")?,
            InstKind::Ret { value: None } => write!(f, "ret void")?,
            InstKind::Unreachable => write!(f, "unreachable")?,
            InstKind::Load { ptr } => write!(f, "load {ptr}")?,
            InstKind::Store { value, ptr } => write!(f, "store {value}, {ptr}")?,
            InstKind::Call { callee, args } => {
                let args = args.iter().join(", ");
                match callee {
                    Callee::Direct(name) => write!(f, "call @{name}({args})")?,
                    Callee::Indirect(target) => write!(f, "call {target}({args})")?,
                    Callee::Asm(asm) => write!(
                        f,
                        "call asm {}\"{}\", \"{}\"({args})",
                        if asm.side_effects { "sideeffect " } else { "" },
                        asm.asm,
                        asm.constraints
                    )?,
                }
            }
            InstKind::ShuffleVector { lhs, rhs, mask } => {
                write!(f, "shufflevector {lhs}, {rhs}, <{}>", mask.iter().join(", "))?
            }
            InstKind::ExtractElement { vector, index } => {
                write!(f, "extractelement {vector}, {index}")?
            }
            InstKind::InsertElement {
                vector,
                element,
                index,
            } => write!(f, "insertelement {vector}, {element}, {index}")?,
            InstKind::Cast { cast, value } => {
                write!(f, "{} {value}", format!("{cast:?}").to_lowercase())?
            }
            InstKind::Alloca { allocated } => write!(f, "alloca {allocated}")?,
            InstKind::GetElementPtr { base, indices } => {
                write!(f, "getelementptr {base}, {}", indices.iter().join(", "))?
            }
        }
        if !self.ty.is_void() {
            write!(f, " : {}", self.ty)?;
        }
        Ok(())
    }
}
