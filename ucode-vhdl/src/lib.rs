//! In-memory representation of VHDL design units and a deterministic
//! emitter producing synthesizable VHDL-93.
//!
//! The IR is deliberately small: it covers exactly the subset of VHDL that
//! a generated control unit and structural top need. Consumers build a
//! [`Design`] through the builder methods and render it with [`Printer`].
mod ast;
mod printer;

pub use ast::{
    Case, CaseBranch, Component, Concurrent, Decl, Design, Dir, Expr,
    Instance, Port, Process, Sequential, SequentialIfElse, Ty,
};
pub use printer::Printer;
