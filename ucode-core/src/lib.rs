//! The ucode generator core: from a machine description expressed as
//! register-transfer moves down to two VHDL design files.
//!
//! A [`Computer`] is built through the builder facade, then `generate`
//! runs the pipeline in one pass: each instruction's moves are lowered to
//! microcode states, the fixed fetch/decode states are merged in, opcodes
//! are assigned, and the resulting control FSM plus the structural top
//! entity are rendered as VHDL.
//!
//! ```no_run
//! use ucode_core::{add, Computer, Reg};
//!
//! let mut c = Computer::new("simple");
//! c.instruction("load_seven", |i| {
//!     i.mov(Reg::A, 7);
//! });
//! c.instruction("add_pc", |i| {
//!     i.mov(Reg::A, add(Reg::A, Reg::Pc));
//! });
//! c.generate().unwrap();
//! ```
mod assemble;
mod ast;
mod fsm;
mod microcode;

pub use assemble::{Assembly, ALU_OP_WIDTH, BUS_WIDTH};
pub use ast::{
    add, complement, subtract, AluOp, AluOperation, Computer, Instruction,
    Operand, Reg, RtlMove, Source,
};
pub use fsm::{
    ConstantDef, Fsm, FsmState, Guard, Latch, Slice, Transition, Value,
};
pub use microcode::{lower_move, MicrocodeState};

pub use ucode_utils::{Error, GetName, Id, UcodeResult};
