//! Generator for micro-coded accumulator computers.
//!
//! Declare a machine's instruction set as register-transfer moves through
//! the [`Computer`] builder and generate synthesizable VHDL for its
//! micro-coded control unit and structural top entity. The heavy lifting
//! lives in [`ucode_core`]; this crate re-exports the public surface and
//! ships the `ucodec` driver binary.
pub mod cmdline;
pub mod driver;

pub use ucode_core::{
    add, complement, subtract, AluOp, AluOperation, Computer, Error,
    Instruction, Reg, Source, UcodeResult,
};
pub use ucode_vhdl as vhdl;
