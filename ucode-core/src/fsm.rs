//! The control-FSM intermediate representation and its lowering to VHDL.
//!
//! The FSM is a hybrid machine: outputs depend only on the current state
//! (one `case` block), transitions fire on the rising clock edge, and a
//! state may additionally latch a value on the falling edge. Reset is
//! asynchronous and jumps to a designated target state.

use linked_hash_map::LinkedHashMap;
use ucode_utils::{binary_str, Error, GetName, Id, UcodeResult};
use ucode_vhdl::{
    Case, CaseBranch, Decl, Design, Expr, Process, Sequential,
    SequentialIfElse, Ty,
};

/// A value assigned to a signal in a state or in the reset block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// `'0'` or `'1'`.
    Bit(bool),
    /// A bit-string literal such as `"000"` or `"ZZZZZZZZ"`.
    Bits(String),
    /// A named constant.
    Ref(Id),
}

impl Value {
    fn expr(&self) -> Expr {
        match self {
            Value::Bit(bit) => Expr::new_bit(*bit),
            Value::Bits(bits) => Expr::new_bits(bits),
            Value::Ref(name) => Expr::new_ref(*name),
        }
    }
}

/// A bit range of a signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slice {
    pub signal: Id,
    pub msb: u64,
    pub lsb: u64,
}

impl Slice {
    pub fn new<S: Into<Id>>(signal: S, msb: u64, lsb: u64) -> Self {
        Self {
            signal: signal.into(),
            msb,
            lsb,
        }
    }

    fn expr(&self) -> Expr {
        Expr::new_slice(self.signal, self.msb, self.lsb)
    }
}

/// An assignment performed on the falling clock edge while the FSM sits in
/// a particular state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Latch {
    pub dst: Slice,
    pub src: Slice,
}

/// Everything a single state drives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FsmState {
    /// Output assignments, in output declaration order.
    pub assigns: Vec<(Id, Value)>,
    /// Falling-edge latches.
    pub latches: Vec<Latch>,
}

/// An `opcode = "01"`-style equality guard on a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guard {
    pub signal: Id,
    pub value: String,
}

impl Guard {
    pub fn equal<S: Into<Id>, V: ToString>(signal: S, value: V) -> Self {
        Self {
            signal: signal.into(),
            value: value.to_string(),
        }
    }

    fn expr(&self) -> Expr {
        Expr::new_eq(Expr::new_ref(self.signal), Expr::new_bits(&self.value))
    }
}

/// A directed edge of the state graph. Transitions out of a state are
/// tried in declaration order; the first satisfied guard (or the
/// unconditional edge) fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: Id,
    pub to: Id,
    pub guard: Option<Guard>,
}

/// A named 8-bit constant driven onto the bus by some state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantDef {
    pub name: Id,
    pub value: u64,
    pub width: u64,
}

/// The control FSM. `clock` and `reset` input ports are implicit; the
/// machine is clocked by construction.
#[derive(Debug, Clone)]
pub struct Fsm {
    name: Id,
    /// Output ports, in declaration order. Width 1 becomes `std_logic`.
    pub outputs: Vec<(Id, u64)>,
    /// Bidirectional ports (the system bus).
    pub inouts: Vec<(Id, u64)>,
    /// Internal signals, always emitted as vectors so they can be sliced.
    pub signals: Vec<(Id, u64)>,
    pub constants: Vec<ConstantDef>,
    /// State definitions in insertion order; emission order follows it.
    pub states: LinkedHashMap<Id, FsmState>,
    pub reset_target: Id,
    pub reset_assigns: Vec<(Id, Value)>,
    pub transitions: Vec<Transition>,
}

impl Fsm {
    pub fn new<S: Into<Id>>(name: S) -> Self {
        Self {
            name: name.into(),
            outputs: Vec::new(),
            inouts: Vec::new(),
            signals: Vec::new(),
            constants: Vec::new(),
            states: LinkedHashMap::new(),
            reset_target: Id::default(),
            reset_assigns: Vec::new(),
            transitions: Vec::new(),
        }
    }

    pub fn add_output<S: Into<Id>>(&mut self, name: S, width: u64) {
        self.outputs.push((name.into(), width));
    }

    pub fn add_inout<S: Into<Id>>(&mut self, name: S, width: u64) {
        self.inouts.push((name.into(), width));
    }

    pub fn add_signal<S: Into<Id>>(&mut self, name: S, width: u64) {
        self.signals.push((name.into(), width));
    }

    pub fn add_constant<S: Into<Id>>(
        &mut self,
        name: S,
        value: u64,
        width: u64,
    ) {
        self.constants.push(ConstantDef {
            name: name.into(),
            value,
            width,
        });
    }

    pub fn add_state<S: Into<Id>>(&mut self, name: S, state: FsmState) {
        self.states.insert(name.into(), state);
    }

    pub fn set_reset<S: Into<Id>>(
        &mut self,
        target: S,
        assigns: Vec<(Id, Value)>,
    ) {
        self.reset_target = target.into();
        self.reset_assigns = assigns;
    }

    pub fn add_transition<F, T>(&mut self, from: F, to: T)
    where
        F: Into<Id>,
        T: Into<Id>,
    {
        self.transitions.push(Transition {
            from: from.into(),
            to: to.into(),
            guard: None,
        });
    }

    pub fn add_guarded_transition<F, T>(
        &mut self,
        from: F,
        to: T,
        guard: Guard,
    ) where
        F: Into<Id>,
        T: Into<Id>,
    {
        self.transitions.push(Transition {
            from: from.into(),
            to: to.into(),
            guard: Some(guard),
        });
    }

    /// Check that the machine is structurally sound: the reset target and
    /// every transition endpoint name a defined state, and (in debug
    /// builds) every state is reachable in the transition graph.
    pub fn validate(&self) -> UcodeResult<()> {
        if !self.states.contains_key(&self.reset_target) {
            return Err(Error::malformed_structure(format!(
                "reset target `{}` is not a state",
                self.reset_target
            )));
        }
        for transition in &self.transitions {
            for endpoint in [transition.from, transition.to] {
                if !self.states.contains_key(&endpoint) {
                    return Err(Error::malformed_structure(format!(
                        "transition endpoint `{}` is not a state",
                        endpoint
                    )));
                }
            }
        }

        #[cfg(debug_assertions)]
        {
            use petgraph::graph::DiGraph;

            let index_of: std::collections::HashMap<Id, u32> = self
                .states
                .keys()
                .enumerate()
                .map(|(idx, name)| (*name, idx as u32))
                .collect();
            let graph = DiGraph::<(), u32>::from_edges(
                self.transitions
                    .iter()
                    .map(|t| (index_of[&t.from], index_of[&t.to])),
            );
            debug_assert!(
                petgraph::algo::connected_components(&graph) <= 1,
                "state transition graph has unreachable states"
            );
        }

        Ok(())
    }

    /// Lower the machine into a VHDL design: the state enumeration, a
    /// clocked state-register process, and the per-state output block.
    pub fn emit(&self) -> Design {
        let mut design = Design::new(self.name);
        design.add_input("clock", Ty::StdLogic);
        design.add_input("reset", Ty::StdLogic);
        for (name, width) in &self.inouts {
            design.add_inout(*name, ty_for(*width));
        }
        for (name, width) in &self.outputs {
            design.add_output(*name, ty_for(*width));
        }

        design.add_decl(Decl::new_type(
            "state_type",
            self.states.keys().copied().collect(),
        ));
        design.add_decl(Decl::new_signal(
            "current_state",
            Ty::Named("state_type".into()),
        ));
        for (name, width) in &self.signals {
            design.add_decl(Decl::new_signal(*name, Ty::vector(*width)));
        }
        for constant in &self.constants {
            design.add_decl(Decl::new_constant(
                constant.name,
                Ty::vector(constant.width),
                Expr::new_bits(binary_str(constant.value, constant.width)),
            ));
        }

        design.add_stmt(self.clocked_process());
        design.add_stmt(self.output_process());
        design
    }

    /// The process holding the state register: asynchronous reset, rising
    /// edge transitions, falling edge latches.
    fn clocked_process(&self) -> Process {
        let mut process =
            Process::new(vec!["clock".into(), "reset".into()]);

        let mut ifelse =
            SequentialIfElse::new(Expr::new_eq("reset", Expr::new_bit(true)));
        for (dst, value) in &self.reset_assigns {
            ifelse.add_seq(Sequential::new_assign(
                Expr::new_ref(*dst),
                value.expr(),
            ));
        }
        ifelse.add_seq(Sequential::new_assign(
            "current_state",
            Expr::new_ref(self.reset_target),
        ));

        let mut case = Case::new("current_state");
        for name in self.states.keys() {
            let mut branch = CaseBranch::new(*name);
            if let Some(stmt) = self.transition_stmt(*name) {
                branch.add_seq(stmt);
            }
            case.add_branch(branch);
        }
        ifelse.add_elif(
            Expr::new_call("rising_edge", vec!["clock".into()]),
            vec![case.into()],
        );

        let latched: Vec<_> = self
            .states
            .iter()
            .filter(|(_, state)| !state.latches.is_empty())
            .collect();
        if !latched.is_empty() {
            let mut body = Vec::new();
            for (name, state) in latched {
                let mut guard = SequentialIfElse::new(Expr::new_eq(
                    Expr::new_ref("current_state"),
                    Expr::new_ref(*name),
                ));
                for latch in &state.latches {
                    guard.add_seq(Sequential::Assign(
                        latch.dst.expr(),
                        latch.src.expr(),
                    ));
                }
                body.push(guard.into());
            }
            ifelse.add_elif(
                Expr::new_eq("clock", Expr::new_bit(false)),
                body,
            );
        }

        process.add_seq(ifelse);
        process
    }

    /// The statement deciding the successor of `from`: guarded edges form
    /// an `if`/`elsif` chain in declaration order, with the unconditional
    /// edge (if any) as the final `else`.
    fn transition_stmt(&self, from: Id) -> Option<Sequential> {
        let outgoing: Vec<_> = self
            .transitions
            .iter()
            .filter(|t| t.from == from)
            .collect();
        let unconditional = outgoing
            .iter()
            .find(|t| t.guard.is_none())
            .map(|t| Sequential::new_assign("current_state", Expr::new_ref(t.to)));
        let guarded: Vec<_> =
            outgoing.iter().filter(|t| t.guard.is_some()).collect();

        if guarded.is_empty() {
            return unconditional;
        }

        let mut iter = guarded.into_iter();
        let first = iter.next().unwrap();
        let mut ifelse =
            SequentialIfElse::new(first.guard.as_ref().unwrap().expr());
        ifelse.add_seq(Sequential::new_assign(
            "current_state",
            Expr::new_ref(first.to),
        ));
        for transition in iter {
            ifelse.add_elif(
                transition.guard.as_ref().unwrap().expr(),
                vec![Sequential::new_assign(
                    "current_state",
                    Expr::new_ref(transition.to),
                )],
            );
        }
        if let Some(fallback) = unconditional {
            ifelse.set_else(vec![fallback]);
        }
        Some(ifelse.into())
    }

    /// The state-selected output block: one case branch per state,
    /// assigning every declared output.
    fn output_process(&self) -> Process {
        let mut process = Process::new(vec!["current_state".into()]);
        let mut case = Case::new("current_state");
        for (name, state) in &self.states {
            let mut branch = CaseBranch::new(*name);
            for (dst, value) in &state.assigns {
                branch.add_seq(Sequential::new_assign(
                    Expr::new_ref(*dst),
                    value.expr(),
                ));
            }
            case.add_branch(branch);
        }
        process.add_seq(case);
        process
    }
}

impl GetName for Fsm {
    fn name(&self) -> Id {
        self.name
    }
}

fn ty_for(width: u64) -> Ty {
    if width == 1 {
        Ty::StdLogic
    } else {
        Ty::vector(width)
    }
}
