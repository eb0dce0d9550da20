//! Instruction vocabulary of the stack machine
//!
//! An [`Instruction`] is an [`Opcode`] paired with an [`Operand`]. Each opcode fixes which kind
//! of operand it carries (see [`Opcode::operand_kind`]), so the pairing can be checked with
//! [`Instruction::is_well_formed`]. Branch operands are [`Label`]s of other instructions in the
//! same [`InstructionStream`](super::InstructionStream), never raw indices.

use super::{Label, MethodRef, TypeSig};
use std::fmt;

/// Which kind of operand an opcode expects
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OperandKind {
    None,
    Int,
    Local,
    Arg,
    Branch,
    Type,
    Method,
}

macro_rules! opcodes {
    ($($variant:ident = $code:literal, $mnemonic:literal, $kind:ident;)*) => {
        /// Opcodes of the stack machine
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
        pub enum Opcode {
            $($variant,)*
        }

        impl Opcode {
            /// Byte used for the opcode in module images
            pub fn code(self) -> u8 {
                match self {
                    $(Opcode::$variant => $code,)*
                }
            }

            /// Decode an opcode byte
            pub fn from_code(code: u8) -> Option<Opcode> {
                match code {
                    $($code => Some(Opcode::$variant),)*
                    _ => None,
                }
            }

            pub fn mnemonic(self) -> &'static str {
                match self {
                    $(Opcode::$variant => $mnemonic,)*
                }
            }

            pub fn operand_kind(self) -> OperandKind {
                match self {
                    $(Opcode::$variant => OperandKind::$kind,)*
                }
            }
        }
    };
}

opcodes! {
    Nop = 0x00, "nop", None;
    LdArg = 0x02, "ldarg", Arg;
    StArg = 0x03, "starg", Arg;
    LdLoc = 0x06, "ldloc", Local;
    StLoc = 0x0a, "stloc", Local;
    LdNull = 0x14, "ldnull", None;
    LdcI4 = 0x20, "ldc.i4", Int;
    Dup = 0x25, "dup", None;
    Pop = 0x26, "pop", None;
    Call = 0x28, "call", Method;
    Ret = 0x2a, "ret", None;
    Br = 0x38, "br", Branch;
    BrFalse = 0x39, "brfalse", Branch;
    BrTrue = 0x3a, "brtrue", Branch;
    Add = 0x58, "add", None;
    Sub = 0x59, "sub", None;
    Mul = 0x5a, "mul", None;
    Div = 0x5b, "div", None;
    CallVirt = 0x6f, "callvirt", Method;
    LdObj = 0x71, "ldobj", Type;
    CastClass = 0x74, "castclass", Type;
    Box = 0x8c, "box", Type;
    NewArr = 0x8d, "newarr", Type;
    LdElemRef = 0x9a, "ldelem.ref", None;
    StElemRef = 0xa2, "stelem.ref", None;
    UnboxAny = 0xa5, "unbox.any", Type;
    Ceq = 0xc1, "ceq", None;
    Cgt = 0xc2, "cgt", None;
    Clt = 0xc4, "clt", None;
}

impl Opcode {
    /// Does this opcode transfer control to its branch operand?
    pub fn is_branch(self) -> bool {
        self.operand_kind() == OperandKind::Branch
    }
}

/// Instruction operand
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Operand {
    None,
    Int(i32),
    Local(u16),

    /// Argument slot (for instance methods, slot 0 is the instance)
    Arg(u16),

    /// Instruction in the same stream
    Branch(Label),

    Type(TypeSig),
    Method(MethodRef),
}

impl Operand {
    pub fn kind(&self) -> OperandKind {
        match self {
            Operand::None => OperandKind::None,
            Operand::Int(_) => OperandKind::Int,
            Operand::Local(_) => OperandKind::Local,
            Operand::Arg(_) => OperandKind::Arg,
            Operand::Branch(_) => OperandKind::Branch,
            Operand::Type(_) => OperandKind::Type,
            Operand::Method(_) => OperandKind::Method,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operand: Operand,
}

impl Instruction {
    pub fn new(opcode: Opcode, operand: Operand) -> Instruction {
        Instruction { opcode, operand }
    }

    /// Instruction without an operand
    pub fn simple(opcode: Opcode) -> Instruction {
        Instruction::new(opcode, Operand::None)
    }

    pub fn ldarg(slot: u16) -> Instruction {
        Instruction::new(Opcode::LdArg, Operand::Arg(slot))
    }

    pub fn ldloc(local: u16) -> Instruction {
        Instruction::new(Opcode::LdLoc, Operand::Local(local))
    }

    pub fn stloc(local: u16) -> Instruction {
        Instruction::new(Opcode::StLoc, Operand::Local(local))
    }

    pub fn ldc_i4(value: i32) -> Instruction {
        Instruction::new(Opcode::LdcI4, Operand::Int(value))
    }

    pub fn call(method: MethodRef) -> Instruction {
        Instruction::new(Opcode::Call, Operand::Method(method))
    }

    pub fn with_type(opcode: Opcode, ty: TypeSig) -> Instruction {
        Instruction::new(opcode, Operand::Type(ty))
    }

    pub fn branch(opcode: Opcode, target: Label) -> Instruction {
        Instruction::new(opcode, Operand::Branch(target))
    }

    /// Check that the operand is of the kind the opcode expects
    pub fn is_well_formed(&self) -> bool {
        self.opcode.operand_kind() == self.operand.kind()
    }

    /// Branch target, if this is a branch
    pub fn branch_target(&self) -> Option<Label> {
        match self.operand {
            Operand::Branch(label) => Some(label),
            _ => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.opcode.mnemonic())?;
        match &self.operand {
            Operand::None => Ok(()),
            Operand::Int(value) => write!(f, " {}", value),
            Operand::Local(local) => write!(f, " V_{}", local),
            Operand::Arg(slot) => write!(f, " {}", slot),
            Operand::Branch(label) => write!(f, " {:?}", label),
            Operand::Type(ty) => write!(f, " {}", ty),
            Operand::Method(method) => write!(f, " {}", method),
        }
    }
}
