//! The machine description built by the DSL facade: a [`Computer`] holding
//! an ordered list of [`Instruction`]s, each an ordered list of
//! register-transfer moves.

use std::str::FromStr;
use ucode_utils::{Error, GetName, Id};

/// Datapath registers addressable as move targets and sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reg {
    /// Program counter.
    Pc,
    /// Instruction register.
    Ir,
    /// Accumulator.
    A,
    /// Memory data register.
    Md,
    /// Memory address register.
    Ma,
    /// ALU first input.
    AluA,
    /// ALU second input.
    AluB,
}

impl Reg {
    /// Every datapath register, in documentation order.
    pub const ALL: [Reg; 7] = [
        Reg::Pc,
        Reg::Ir,
        Reg::A,
        Reg::Md,
        Reg::Ma,
        Reg::AluA,
        Reg::AluB,
    ];

    /// The control signal that makes this register drive the system bus.
    pub fn rd_signal(self) -> Id {
        Id::new(format!("rd_{}", self))
    }

    /// The control signal that makes this register latch the system bus.
    pub fn wr_signal(self) -> Id {
        Id::new(format!("wr_{}", self))
    }
}

impl std::fmt::Display for Reg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Reg::Pc => "pc",
            Reg::Ir => "IR",
            Reg::A => "A",
            Reg::Md => "MD",
            Reg::Ma => "MA",
            Reg::AluA => "alu_a",
            Reg::AluB => "alu_b",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Reg {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Reg::ALL
            .into_iter()
            .find(|reg| reg.to_string() == s)
            .ok_or_else(|| Error::undefined(Id::new(s), "register"))
    }
}

/// The operations the ALU implements, with their fixed 3-bit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Complement,
    Add,
    Subtract,
}

impl AluOp {
    /// The operation code the ALU decodes on its `operation` port.
    pub fn code(self) -> &'static str {
        match self {
            AluOp::Complement => "101",
            AluOp::Add => "010",
            AluOp::Subtract => "110",
        }
    }

    pub fn operand_count(self) -> usize {
        match self {
            AluOp::Complement => 1,
            AluOp::Add | AluOp::Subtract => 2,
        }
    }
}

/// An ALU operand: an 8-bit constant or a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Constant(u64),
    Reg(Reg),
}

impl From<u64> for Operand {
    fn from(value: u64) -> Self {
        Operand::Constant(value)
    }
}

impl From<Reg> for Operand {
    fn from(reg: Reg) -> Self {
        Operand::Reg(reg)
    }
}

/// An ALU computation usable as a move source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AluOperation {
    pub op: AluOp,
    pub a: Operand,
    pub b: Option<Operand>,
}

/// `a + b`.
pub fn add<A, B>(a: A, b: B) -> AluOperation
where
    A: Into<Operand>,
    B: Into<Operand>,
{
    AluOperation {
        op: AluOp::Add,
        a: a.into(),
        b: Some(b.into()),
    }
}

/// `a - b`.
pub fn subtract<A, B>(a: A, b: B) -> AluOperation
where
    A: Into<Operand>,
    B: Into<Operand>,
{
    AluOperation {
        op: AluOp::Subtract,
        a: a.into(),
        b: Some(b.into()),
    }
}

/// Bitwise complement of `a`.
pub fn complement<A: Into<Operand>>(a: A) -> AluOperation {
    AluOperation {
        op: AluOp::Complement,
        a: a.into(),
        b: None,
    }
}

/// The source side of a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Constant(u64),
    Reg(Reg),
    Alu(AluOperation),
}

impl From<u64> for Source {
    fn from(value: u64) -> Self {
        Source::Constant(value)
    }
}

impl From<Reg> for Source {
    fn from(reg: Reg) -> Self {
        Source::Reg(reg)
    }
}

impl From<AluOperation> for Source {
    fn from(alu: AluOperation) -> Self {
        Source::Alu(alu)
    }
}

/// One register-transfer step: `target <- source`, interpreted as one or
/// more micro-cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtlMove {
    pub target: Reg,
    pub source: Source,
}

/// A named instruction: an ordered list of moves.
#[derive(Debug, Clone)]
pub struct Instruction {
    name: Id,
    moves: Vec<RtlMove>,
}

impl Instruction {
    pub fn new<S: Into<Id>>(name: S) -> Self {
        Self {
            name: name.into(),
            moves: Vec::new(),
        }
    }

    /// Append a move. `mov` rather than `move` because the latter is a
    /// Rust keyword.
    pub fn mov<S: Into<Source>>(
        &mut self,
        target: Reg,
        source: S,
    ) -> &mut Self {
        self.moves.push(RtlMove {
            target,
            source: source.into(),
        });
        self
    }

    pub fn moves(&self) -> &[RtlMove] {
        &self.moves
    }
}

impl GetName for Instruction {
    fn name(&self) -> Id {
        self.name
    }
}

/// A complete machine description. The name doubles as the output
/// directory for the generated files.
#[derive(Debug, Clone)]
pub struct Computer {
    name: Id,
    address_width: u64,
    instructions: Vec<Instruction>,
}

impl Computer {
    pub fn new<S: Into<Id>>(name: S) -> Self {
        Self {
            name: name.into(),
            address_width: 5,
            instructions: Vec::new(),
        }
    }

    /// Set the RAM address width in bits. Defaults to 5.
    pub fn address_width(&mut self, width: u64) -> &mut Self {
        self.address_width = width;
        self
    }

    /// Declare an instruction and populate it through the closure.
    pub fn instruction<S, F>(&mut self, name: S, build: F) -> &mut Self
    where
        S: Into<Id>,
        F: FnOnce(&mut Instruction),
    {
        let mut instruction = Instruction::new(name);
        build(&mut instruction);
        self.instructions.push(instruction);
        self
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn get_address_width(&self) -> u64 {
        self.address_width
    }
}

impl GetName for Computer {
    fn name(&self) -> Id {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_names_round_trip() {
        for reg in Reg::ALL {
            assert_eq!(Reg::from_str(&reg.to_string()).unwrap(), reg);
        }
        assert!(Reg::from_str("accumulator").is_err());
    }

    #[test]
    fn control_signal_names() {
        assert_eq!(Reg::Pc.rd_signal(), "rd_pc");
        assert_eq!(Reg::Ma.wr_signal(), "wr_MA");
        assert_eq!(Reg::AluA.wr_signal(), "wr_alu_a");
    }

    #[test]
    fn alu_codes_are_fixed() {
        assert_eq!(AluOp::Complement.code(), "101");
        assert_eq!(AluOp::Add.code(), "010");
        assert_eq!(AluOp::Subtract.code(), "110");
    }

    #[test]
    fn alu_constructors_match_operand_counts() {
        assert_eq!(AluOp::Complement.operand_count(), 1);
        assert_eq!(AluOp::Add.operand_count(), 2);
        assert_eq!(AluOp::Subtract.operand_count(), 2);
        assert!(complement(Reg::A).b.is_none());
        assert!(add(Reg::A, Reg::Md).b.is_some());
        assert!(subtract(Reg::A, 1u64).b.is_some());
    }

    #[test]
    fn builder_accumulates_in_order() {
        let mut c = Computer::new("demo");
        c.instruction("first", |i| {
            i.mov(Reg::A, 1).mov(Reg::Md, Reg::A);
        });
        c.instruction("second", |_| {});
        let names: Vec<_> = c
            .instructions()
            .iter()
            .map(|i| i.name().to_string())
            .collect();
        assert_eq!(names, ["first", "second"]);
        assert_eq!(c.instructions()[0].moves().len(), 2);
    }
}
