//! Assembly of a [`Computer`] into its two VHDL artifacts: the microcode
//! chains of every instruction are merged with the fixed fetch/decode
//! states, opcodes are assigned, and the control FSM plus the structural
//! top entity are built and written out.

use crate::ast::{Computer, Operand, Source};
use crate::fsm::{Fsm, FsmState, Guard, Latch, Slice, Value};
use crate::microcode::{lower_move, MicrocodeState};
use linked_hash_map::LinkedHashMap;
use std::io;
use std::path::Path;
use std::time::Instant;
use ucode_utils::{
    binary_str, bits_needed_for, Error, GetName, Id, OutputFile, UcodeResult,
};
use ucode_vhdl::{
    Component, Decl, Design, Dir, Expr, Instance, Printer, Ty,
};

/// Width of the tri-stated system bus.
pub const BUS_WIDTH: u64 = 8;
/// Width of the ALU operation code.
pub const ALU_OP_WIDTH: u64 = 3;

const HIGH_Z: &str = "ZZZZZZZZ";
const FETCH: &str = "fetch";
const STORE_INSTRUCTION: &str = "store_instruction";
const DECODE: &str = "decode";

/// Control signals consumed by the fixed datapath instances. Signals the
/// machine never asserts are still declared in the top entity so the
/// port maps elaborate; they are simply never driven.
const DATAPATH_SIGNALS: [&str; 13] = [
    "wr_pc", "rd_pc", "inc_pc", "wr_IR", "rd_IR", "wr_A", "rd_A", "wr_MD",
    "wr_MA", "rd_MD", "wr_alu_a", "wr_alu_b", "rd_alu",
];

/// The frozen result of running the front half of the pipeline: every
/// microcode state in emission order, the opcode table, and the derived
/// control-signal alphabet.
pub struct Assembly {
    name: Id,
    address_width: u64,
    opcode_width: u64,
    /// All states in emission order: the three fixed states, then each
    /// instruction's chain in declaration order.
    states: LinkedHashMap<Id, MicrocodeState>,
    /// Per instruction: name, opcode bits, entry state.
    opcodes: Vec<(Id, String, Id)>,
    /// Control signals in order of first mention across the state set.
    alphabet: Vec<Id>,
    /// Distinct bus constants in order of first mention.
    constants: Vec<u64>,
}

impl Assembly {
    /// Run lowering and assembly for a machine description. No files are
    /// touched; errors here are DSL errors and leave nothing behind.
    pub fn new(computer: &Computer) -> UcodeResult<Self> {
        validate(computer)?;

        let mut states = LinkedHashMap::new();

        let mut fetch = MicrocodeState::new();
        fetch.assert("rd_pc");
        fetch.assert("wr_MA");
        fetch.next = Some(STORE_INSTRUCTION.into());
        states.insert(Id::from(FETCH), fetch);

        let mut store = MicrocodeState::new();
        store.assert("rd_MD");
        store.assert("wr_IR");
        store.assert("inc_pc");
        store.next = Some(DECODE.into());
        states.insert(Id::from(STORE_INSTRUCTION), store);

        states.insert(Id::from(DECODE), MicrocodeState::new());

        let opcode_width = bits_needed_for(computer.instructions().len() as u64);
        let mut opcodes = Vec::new();

        for (index, instruction) in computer.instructions().iter().enumerate()
        {
            let mut chain: Vec<MicrocodeState> = instruction
                .moves()
                .iter()
                .flat_map(|mv| lower_move(mv))
                .collect();
            if chain.is_empty() {
                // An instruction with no moves still occupies one cycle so
                // that decode has somewhere to dispatch to.
                chain.push(MicrocodeState::new());
            }

            let len = chain.len();
            for (step, mut state) in chain.into_iter().enumerate() {
                let name = Id::new(format!("{}_{}", instruction.name(), step));
                state.next = Some(if step + 1 == len {
                    FETCH.into()
                } else {
                    Id::new(format!("{}_{}", instruction.name(), step + 1))
                });
                if states.insert(name, state).is_some() {
                    return Err(Error::malformed_structure(format!(
                        "state `{}` generated twice",
                        name
                    )));
                }
            }

            opcodes.push((
                instruction.name(),
                binary_str(index as u64, opcode_width),
                Id::new(format!("{}_0", instruction.name())),
            ));
        }

        let mut alphabet: Vec<Id> = Vec::new();
        let mut constants: Vec<u64> = Vec::new();
        for state in states.values() {
            for signal in &state.signals {
                if !alphabet.contains(signal) {
                    alphabet.push(*signal);
                }
            }
            if let Some(value) = state.constant {
                if !constants.contains(&value) {
                    constants.push(value);
                }
            }
        }
        if alphabet.is_empty() {
            return Err(Error::malformed_structure(
                "no control signals derived from any state",
            ));
        }

        Ok(Self {
            name: computer.name(),
            address_width: computer.get_address_width(),
            opcode_width,
            states,
            opcodes,
            alphabet,
            constants,
        })
    }

    pub fn opcode_width(&self) -> u64 {
        self.opcode_width
    }

    pub fn states(&self) -> &LinkedHashMap<Id, MicrocodeState> {
        &self.states
    }

    pub fn opcodes(&self) -> &[(Id, String, Id)] {
        &self.opcodes
    }

    pub fn alphabet(&self) -> &[Id] {
        &self.alphabet
    }

    /// Build the control-unit FSM.
    pub fn control_fsm(&self) -> Fsm {
        let mut fsm = Fsm::new("control_unit");
        fsm.add_inout("system_bus", BUS_WIDTH);
        fsm.add_output("alu_operation", ALU_OP_WIDTH);
        for signal in &self.alphabet {
            fsm.add_output(*signal, 1);
        }
        fsm.add_signal("opcode", self.opcode_width);
        for value in &self.constants {
            fsm.add_constant(constant_name(*value), *value, BUS_WIDTH);
        }

        for (name, micro) in &self.states {
            let mut assigns = Vec::with_capacity(self.alphabet.len() + 2);
            for signal in &self.alphabet {
                assigns
                    .push((*signal, Value::Bit(micro.asserts(*signal))));
            }
            assigns.push((
                Id::from("alu_operation"),
                Value::Bits(
                    micro
                        .alu_op
                        .map(|op| op.code().to_string())
                        .unwrap_or_else(|| "000".to_string()),
                ),
            ));
            assigns.push((
                Id::from("system_bus"),
                match micro.constant {
                    Some(value) => Value::Ref(constant_name(value)),
                    None => Value::Bits(HIGH_Z.to_string()),
                },
            ));

            let mut latches = Vec::new();
            if *name == STORE_INSTRUCTION {
                // Capture the opcode field from the instruction word while
                // it sits on the bus.
                latches.push(Latch {
                    dst: Slice::new("opcode", self.opcode_width - 1, 0),
                    src: Slice::new(
                        "system_bus",
                        BUS_WIDTH - 1,
                        BUS_WIDTH - self.opcode_width,
                    ),
                });
            }

            fsm.add_state(*name, FsmState { assigns, latches });
        }

        let mut reset_assigns: Vec<(Id, Value)> = self
            .alphabet
            .iter()
            .map(|signal| (*signal, Value::Bit(false)))
            .collect();
        reset_assigns
            .push((Id::from("alu_operation"), Value::Bits("000".into())));
        reset_assigns
            .push((Id::from("system_bus"), Value::Bits(HIGH_Z.into())));
        fsm.set_reset(FETCH, reset_assigns);

        for (name, micro) in &self.states {
            if let Some(next) = micro.next {
                fsm.add_transition(*name, next);
            }
            if *name == DECODE {
                for (_, bits, entry) in &self.opcodes {
                    fsm.add_guarded_transition(
                        DECODE,
                        *entry,
                        Guard::equal("opcode", bits),
                    );
                }
            }
        }

        fsm
    }

    /// Build the structural top entity wiring the control unit to the
    /// fixed datapath components over the system bus.
    pub fn top_design(&self) -> Design {
        let mut design = Design::new("main");
        design.add_input("clock", Ty::StdLogic);
        design.add_input("reset", Ty::StdLogic);
        design.add_output("bus_inspection", Ty::vector(BUS_WIDTH));

        design.add_decl(Decl::new_signal(
            "system_bus",
            Ty::vector(BUS_WIDTH),
        ));
        design.add_decl(Decl::new_signal(
            "alu_operation",
            Ty::vector(ALU_OP_WIDTH),
        ));
        for signal in self.top_signals() {
            design.add_decl(Decl::new_signal(signal, Ty::StdLogic));
        }

        for component in self.components() {
            design.add_decl(component);
        }

        let bus = || Expr::new_ref("system_bus");

        let mut pc = Instance::new("pc", "program_counter");
        pc.connect("clock");
        pc.connect(bus());
        pc.connect(bus());
        pc.connect("wr_pc");
        pc.connect("rd_pc");
        pc.connect("inc_pc");
        design.add_stmt(pc);

        let mut ir = Instance::new("ir", "reg");
        ir.connect("clock");
        ir.connect(bus());
        ir.connect(bus());
        ir.connect("wr_IR");
        ir.connect("rd_IR");
        design.add_stmt(ir);

        let mut acc = Instance::new("A", "reg");
        acc.connect("clock");
        acc.connect(bus());
        acc.connect(bus());
        acc.connect("wr_A");
        acc.connect("rd_A");
        design.add_stmt(acc);

        let mut memory = Instance::new("main_memory", "ram");
        memory.connect("clock");
        memory.connect(bus());
        memory.connect(bus());
        memory.connect(Expr::new_slice(
            "system_bus",
            self.address_width - 1,
            0,
        ));
        memory.connect("wr_MD");
        memory.connect("wr_MA");
        memory.connect("rd_MD");
        design.add_stmt(memory);

        let mut alu = Instance::new("alu0", "alu");
        alu.connect("clock");
        alu.connect(bus());
        alu.connect(bus());
        alu.connect("alu_operation");
        alu.connect("wr_alu_a");
        alu.connect("wr_alu_b");
        alu.connect("rd_alu");
        design.add_stmt(alu);

        let mut control = Instance::new("control0", "control_unit");
        control.connect("clock");
        control.connect("reset");
        control.connect(bus());
        control.connect("alu_operation");
        for signal in &self.alphabet {
            control.connect(Expr::new_ref(*signal));
        }
        design.add_stmt(control);

        design.add_assign("bus_inspection", bus());
        design
    }

    /// Control signals declared in the top entity: the derived alphabet
    /// first, then any remaining datapath enables.
    fn top_signals(&self) -> Vec<Id> {
        let mut signals = self.alphabet.clone();
        for signal in DATAPATH_SIGNALS {
            let signal = Id::from(signal);
            if !signals.contains(&signal) {
                signals.push(signal);
            }
        }
        signals
    }

    /// Fixed component shapes for the datapath primitives, plus the
    /// just-generated control unit.
    fn components(&self) -> Vec<Component> {
        let bus_ty = || Ty::vector(BUS_WIDTH);

        let mut reg = Component::new("reg");
        reg.add_port("clock", Dir::In, Ty::StdLogic);
        reg.add_port("data_in", Dir::In, bus_ty());
        reg.add_port("data_out", Dir::Out, bus_ty());
        reg.add_port("wr", Dir::In, Ty::StdLogic);
        reg.add_port("rd", Dir::In, Ty::StdLogic);

        let mut pc = Component::new("program_counter");
        pc.add_port("clock", Dir::In, Ty::StdLogic);
        pc.add_port("data_in", Dir::In, bus_ty());
        pc.add_port("data_out", Dir::Out, bus_ty());
        pc.add_port("wr", Dir::In, Ty::StdLogic);
        pc.add_port("rd", Dir::In, Ty::StdLogic);
        pc.add_port("inc", Dir::In, Ty::StdLogic);

        let mut ram = Component::new("ram");
        ram.add_port("clock", Dir::In, Ty::StdLogic);
        ram.add_port("data_in", Dir::In, bus_ty());
        ram.add_port("data_out", Dir::Out, bus_ty());
        ram.add_port("address", Dir::In, Ty::vector(self.address_width));
        ram.add_port("wr_data", Dir::In, Ty::StdLogic);
        ram.add_port("wr_address", Dir::In, Ty::StdLogic);
        ram.add_port("rd", Dir::In, Ty::StdLogic);

        let mut alu = Component::new("alu");
        alu.add_port("clock", Dir::In, Ty::StdLogic);
        alu.add_port("data_in", Dir::In, bus_ty());
        alu.add_port("data_out", Dir::Out, bus_ty());
        alu.add_port("operation", Dir::In, Ty::vector(ALU_OP_WIDTH));
        alu.add_port("wr_a", Dir::In, Ty::StdLogic);
        alu.add_port("wr_b", Dir::In, Ty::StdLogic);
        alu.add_port("rd", Dir::In, Ty::StdLogic);

        let mut control = Component::new("control_unit");
        control.add_port("clock", Dir::In, Ty::StdLogic);
        control.add_port("reset", Dir::In, Ty::StdLogic);
        control.add_port("system_bus", Dir::Inout, bus_ty());
        control.add_port(
            "alu_operation",
            Dir::Out,
            Ty::vector(ALU_OP_WIDTH),
        );
        for signal in &self.alphabet {
            control.add_port(*signal, Dir::Out, Ty::StdLogic);
        }

        vec![reg, pc, ram, alu, control]
    }

    /// Render the control unit.
    pub fn write_control<F: io::Write>(&self, f: &mut F) -> UcodeResult<()> {
        let fsm = self.control_fsm();
        fsm.validate()?;
        let start = Instant::now();
        Printer::write_design(&fsm.emit(), f)?;
        log::info!(
            "generated control unit for `{}` in {:?}",
            self.name,
            start.elapsed()
        );
        Ok(())
    }

    /// Render the structural top.
    pub fn write_top<F: io::Write>(&self, f: &mut F) -> UcodeResult<()> {
        let start = Instant::now();
        Printer::write_design(&self.top_design(), f)?;
        log::info!(
            "generated top entity for `{}` in {:?}",
            self.name,
            start.elapsed()
        );
        Ok(())
    }
}

fn constant_name(value: u64) -> Id {
    Id::new(format!("CONSTANT_{}", value))
}

/// Well-formedness of the machine description. Runs before any output is
/// created so a failing description leaves no partial files.
fn validate(computer: &Computer) -> UcodeResult<()> {
    if computer.instructions().is_empty() {
        return Err(Error::misc(
            "a computer needs at least one instruction",
        ));
    }

    let mut seen = std::collections::HashSet::new();
    for instruction in computer.instructions() {
        let name = instruction.name();
        if !is_vhdl_identifier(name.as_ref()) {
            return Err(Error::InvalidIdentifier(name));
        }
        if !seen.insert(name) {
            return Err(Error::already_bound(name, "instruction"));
        }
        for mv in instruction.moves() {
            check_move_constants(&mv.source)?;
        }
    }
    Ok(())
}

fn check_move_constants(source: &Source) -> UcodeResult<()> {
    let check = |value: u64| {
        if value > 255 {
            Err(Error::invalid_constant(value))
        } else {
            Ok(())
        }
    };
    match source {
        Source::Constant(value) => check(*value),
        Source::Reg(_) => Ok(()),
        Source::Alu(alu) => {
            for operand in [Some(alu.a), alu.b].into_iter().flatten() {
                if let Operand::Constant(value) = operand {
                    check(value)?;
                }
            }
            Ok(())
        }
    }
}

/// VHDL-93 basic identifiers: a letter followed by letters, digits, or
/// single underscores, not ending in an underscore.
fn is_vhdl_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.ends_with('_')
        && !name.contains("__")
}

impl Computer {
    /// Generate `control.vhdl` and `main.vhdl` under `./<name>/`.
    pub fn generate(&self) -> UcodeResult<()> {
        self.generate_in(Path::new("."))
    }

    /// Generate the two artifacts under `<parent>/<name>/`. The directory
    /// is created if missing; any other creation failure is fatal.
    pub fn generate_in(&self, parent: &Path) -> UcodeResult<()> {
        let assembly = Assembly::new(self)?;
        let dir = parent.join(self.name().as_ref());
        match std::fs::create_dir(&dir) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {}
            Err(err) => {
                return Err(Error::write_error(format!(
                    "cannot create `{}`: {}",
                    dir.display(),
                    err
                )))
            }
        }

        let control = OutputFile::file(dir.join("control.vhdl"));
        log::info!("writing control unit to {}", control.as_path_string());
        assembly.write_control(&mut control.get_write()?)?;

        let top = OutputFile::file(dir.join("main.vhdl"));
        log::info!("writing top entity to {}", top.as_path_string());
        assembly.write_top(&mut top.get_write()?)?;
        Ok(())
    }

    /// Render the control unit to any writer without touching the
    /// filesystem.
    pub fn emit_control<F: io::Write>(&self, f: &mut F) -> UcodeResult<()> {
        Assembly::new(self)?.write_control(f)
    }

    /// Render the structural top to any writer.
    pub fn emit_top<F: io::Write>(&self, f: &mut F) -> UcodeResult<()> {
        Assembly::new(self)?.write_top(f)
    }
}
