//! Lowering from register-transfer moves to microcode states. Each state
//! describes one cycle of the control FSM: the control signals to assert,
//! the ALU operation code, and the value driven onto the system bus.

use crate::ast::{AluOp, AluOperation, Operand, RtlMove, Source};
use ucode_utils::Id;

/// One cycle of the control FSM.
///
/// Signals absent from `signals` are implicitly deasserted. At most one of
/// `constant` and the implicit high-impedance value drives the bus. `next`
/// is filled in during assembly for every state except the terminal
/// `decode` state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MicrocodeState {
    pub signals: Vec<Id>,
    pub alu_op: Option<AluOp>,
    pub constant: Option<u64>,
    pub next: Option<Id>,
}

impl MicrocodeState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assert a control signal in this state.
    pub fn assert<S: Into<Id>>(&mut self, signal: S) -> &mut Self {
        let signal = signal.into();
        if !self.signals.contains(&signal) {
            self.signals.push(signal);
        }
        self
    }

    pub fn asserts<S: Into<Id>>(&self, signal: S) -> bool {
        self.signals.contains(&signal.into())
    }
}

/// Expand one move into its micro-cycles. This is a pure function: state
/// naming and `next` chaining happen later, during assembly.
pub fn lower_move(mv: &RtlMove) -> Vec<MicrocodeState> {
    match &mv.source {
        Source::Constant(value) => {
            let mut state = MicrocodeState::new();
            state.assert(mv.target.wr_signal());
            state.constant = Some(*value);
            vec![state]
        }
        Source::Reg(source) => {
            let mut state = MicrocodeState::new();
            state.assert(mv.target.wr_signal());
            state.assert(source.rd_signal());
            vec![state]
        }
        Source::Alu(alu) => lower_alu(mv, alu),
    }
}

/// An ALU source takes two or three cycles: load the A input, load the B
/// input for two-operand operations, then read the result back into the
/// target. Constant operands drive the bus directly; no read signal is
/// asserted for them.
fn lower_alu(mv: &RtlMove, alu: &AluOperation) -> Vec<MicrocodeState> {
    debug_assert_eq!(
        alu.op.operand_count() == 2,
        alu.b.is_some(),
        "{:?} takes {} operand(s)",
        alu.op,
        alu.op.operand_count()
    );

    let mut states = Vec::with_capacity(3);

    let mut load_a = operand_load(&alu.a, "wr_alu_a");
    load_a.alu_op = Some(alu.op);
    states.push(load_a);

    if let Some(b) = &alu.b {
        states.push(operand_load(b, "wr_alu_b"));
    }

    let mut latch = MicrocodeState::new();
    latch.assert("rd_alu");
    latch.assert(mv.target.wr_signal());
    latch.alu_op = Some(alu.op);
    states.push(latch);

    states
}

/// A cycle that moves `operand` into one of the ALU input registers.
fn operand_load(operand: &Operand, wr_signal: &str) -> MicrocodeState {
    let mut state = MicrocodeState::new();
    match operand {
        Operand::Reg(reg) => {
            state.assert(reg.rd_signal());
            state.assert(wr_signal);
        }
        Operand::Constant(value) => {
            state.assert(wr_signal);
            state.constant = Some(*value);
        }
    }
    state
}
