//! End-to-end tests: build small machines through the facade, assemble
//! them, and check the structure and text of what comes out.

use ucode_core::{
    add, complement, Assembly, Computer, Id, Reg, Value,
};
use ucode_vhdl::{Concurrent, Printer};

fn assemble(computer: &Computer) -> Assembly {
    Assembly::new(computer).expect("assembly should succeed")
}

fn control_text(computer: &Computer) -> String {
    let mut buf = Vec::new();
    computer.emit_control(&mut buf).unwrap();
    String::from_utf8(buf).unwrap()
}

fn top_text(computer: &Computer) -> String {
    let mut buf = Vec::new();
    computer.emit_top(&mut buf).unwrap();
    String::from_utf8(buf).unwrap()
}

/// An instruction with no moves still becomes a dispatchable one-cycle
/// state.
#[test]
fn zero_move_instruction_synthesizes_an_idle_state() {
    let mut c = Computer::new("s1");
    c.instruction("nop", |_| {});
    let assembly = assemble(&c);

    assert_eq!(assembly.opcode_width(), 1);
    let nop = assembly
        .states()
        .get(&Id::from("nop_0"))
        .expect("idle state exists");
    assert!(nop.signals.is_empty());
    assert_eq!(nop.next, Some("fetch".into()));

    let fsm = assembly.control_fsm();
    assert!(fsm
        .transitions
        .iter()
        .any(|t| t.from == "decode" && t.to == "nop_0"));
}

#[test]
fn constant_load_declares_and_drives_a_constant() {
    let mut c = Computer::new("s2");
    c.instruction("load_seven", |i| {
        i.mov(Reg::A, 7);
    });
    let assembly = assemble(&c);

    let state = assembly.states().get(&Id::from("load_seven_0")).unwrap();
    assert_eq!(state.signals, ["wr_A"]);
    assert_eq!(state.constant, Some(7));

    let out = control_text(&c);
    assert!(out.contains(
        "constant CONSTANT_7 : std_logic_vector(7 downto 0) := \"00000111\";"
    ));
    assert!(out.contains("system_bus <= CONSTANT_7;"));
}

#[test]
fn register_move_leaves_the_bus_to_the_source() {
    let mut c = Computer::new("s3");
    c.instruction("mov_a_pc", |i| {
        i.mov(Reg::A, Reg::Pc);
    });
    let assembly = assemble(&c);

    let state = assembly.states().get(&Id::from("mov_a_pc_0")).unwrap();
    assert_eq!(state.signals, ["wr_A", "rd_pc"]);
    assert_eq!(state.constant, None);

    let fsm = assembly.control_fsm();
    let (_, def) = fsm
        .states
        .iter()
        .find(|(name, _)| **name == "mov_a_pc_0")
        .unwrap();
    assert!(def.assigns.iter().any(|(dst, value)| *dst == "system_bus"
        && *value == Value::Bits("ZZZZZZZZ".to_string())));
}

#[test]
fn alu_instruction_chains_through_both_inputs() {
    let mut c = Computer::new("s4");
    c.instruction("add_md", |i| {
        i.mov(Reg::A, add(Reg::A, Reg::Md));
    });
    let assembly = assemble(&c);

    let states = assembly.states();
    assert_eq!(
        states.get(&Id::from("add_md_0")).unwrap().signals,
        ["rd_A", "wr_alu_a"]
    );
    assert_eq!(
        states.get(&Id::from("add_md_1")).unwrap().signals,
        ["rd_MD", "wr_alu_b"]
    );
    assert_eq!(
        states.get(&Id::from("add_md_2")).unwrap().signals,
        ["rd_alu", "wr_A"]
    );

    let out = control_text(&c);
    assert!(out.contains("alu_operation <= \"010\";"));
}

#[test]
fn decode_dispatches_one_guard_per_instruction() {
    let mut c = Computer::new("s5");
    c.instruction("inst_a", |i| {
        i.mov(Reg::A, 1);
    });
    c.instruction("inst_b", |i| {
        i.mov(Reg::A, 2);
    });
    let fsm = assemble(&c).control_fsm();

    let decode_edges: Vec<_> = fsm
        .transitions
        .iter()
        .filter(|t| t.from == "decode")
        .collect();
    assert_eq!(decode_edges.len(), 2);
    assert_eq!(decode_edges[0].to, "inst_a_0");
    assert_eq!(
        decode_edges[0].guard.as_ref().unwrap().value,
        "0"
    );
    assert_eq!(decode_edges[1].to, "inst_b_0");
    assert_eq!(
        decode_edges[1].guard.as_ref().unwrap().value,
        "1"
    );

    let out = control_text(&c);
    assert!(out.contains("if opcode = \"0\" then"));
    assert!(out.contains("current_state <= inst_a_0;"));
    assert!(out.contains("elsif opcode = \"1\" then"));
}

/// The opcode field is captured from the high bits of the bus on the
/// falling edge of the clock during `store_instruction`.
#[test]
fn store_instruction_latches_the_opcode() {
    let mut c = Computer::new("s6");
    for name in ["i0", "i1", "i2"] {
        c.instruction(name, |i| {
            i.mov(Reg::A, 1);
        });
    }
    let assembly = assemble(&c);
    assert_eq!(assembly.opcode_width(), 2);

    let out = control_text(&c);
    assert!(out.contains("elsif clock = '0' then"));
    assert!(out.contains("if current_state = store_instruction then"));
    assert!(out.contains("opcode(1 downto 0) <= system_bus(7 downto 6);"));
}

#[test]
fn opcodes_are_distinct_and_wide_enough() {
    for count in [1usize, 2, 3, 4, 5, 9] {
        let mut c = Computer::new("widths");
        for index in 0..count {
            c.instruction(format!("inst{}", index), |i| {
                i.mov(Reg::A, 1);
            });
        }
        let assembly = assemble(&c);
        let expected_width =
            (count as f64).log2().ceil().max(1.0) as u64;
        assert_eq!(assembly.opcode_width(), expected_width);

        let mut seen = std::collections::HashSet::new();
        for (_, bits, _) in assembly.opcodes() {
            assert_eq!(bits.len() as u64, expected_width);
            assert!(seen.insert(bits.clone()), "duplicate opcode {}", bits);
        }
    }
}

/// The asserted-signal union equals the FSM's control outputs, and every
/// state assigns every one of them.
#[test]
fn alphabet_agrees_with_fsm_outputs() {
    let mut c = Computer::new("props");
    c.instruction("load", |i| {
        i.mov(Reg::Ma, Reg::Ir).mov(Reg::A, Reg::Md);
    });
    c.instruction("com", |i| {
        i.mov(Reg::A, complement(Reg::A));
    });
    let assembly = assemble(&c);
    let fsm = assembly.control_fsm();

    let control_outputs: Vec<_> = fsm
        .outputs
        .iter()
        .filter(|(name, _)| *name != "alu_operation")
        .map(|(name, _)| *name)
        .collect();
    assert_eq!(control_outputs, assembly.alphabet());

    for (name, state) in &fsm.states {
        for (signal, _) in &fsm.outputs {
            let count = state
                .assigns
                .iter()
                .filter(|(dst, _)| dst == signal)
                .count();
            assert_eq!(
                count, 1,
                "state `{}` assigns `{}` {} times",
                name, signal, count
            );
        }
    }
}

#[test]
fn reset_drives_everything_inactive() {
    let mut c = Computer::new("reset");
    c.instruction("nop", |_| {});
    let fsm = assemble(&c).control_fsm();

    assert_eq!(fsm.reset_target, "fetch");
    for (dst, value) in &fsm.reset_assigns {
        if *dst == "alu_operation" {
            assert_eq!(*value, Value::Bits("000".to_string()));
        } else if *dst == "system_bus" {
            assert_eq!(*value, Value::Bits("ZZZZZZZZ".to_string()));
        } else {
            assert_eq!(*value, Value::Bit(false), "signal `{}`", dst);
        }
    }
}

/// Exactly one control unit, receiving the control signals in FSM
/// declaration order.
#[test]
fn top_wires_the_control_unit_in_declaration_order() {
    let mut c = Computer::new("top");
    c.instruction("load", |i| {
        i.mov(Reg::Ma, Reg::Ir).mov(Reg::A, Reg::Md);
    });
    let assembly = assemble(&c);
    let design = assembly.top_design();

    let controls: Vec<_> = design
        .stmts
        .iter()
        .filter_map(|stmt| match stmt {
            Concurrent::Instance(instance)
                if instance.component == "control_unit" =>
            {
                Some(instance)
            }
            _ => None,
        })
        .collect();
    assert_eq!(controls.len(), 1);

    let tail: Vec<String> = controls[0].port_map[4..]
        .iter()
        .map(|expr| expr.to_string())
        .collect();
    let expected: Vec<String> = assembly
        .alphabet()
        .iter()
        .map(|signal| signal.to_string())
        .collect();
    assert_eq!(tail, expected);

    let out = top_text(&c);
    assert!(out.contains("bus_inspection <= system_bus;"));
    assert!(out.contains(
        "main_memory : ram port map (clock, system_bus, system_bus, \
         system_bus(4 downto 0), wr_MD, wr_MA, rd_MD);"
    ));
}

#[test]
fn address_width_feeds_the_memory_slice() {
    let mut c = Computer::new("wide");
    c.address_width(8);
    c.instruction("nop", |_| {});
    let out = top_text(&c);
    assert!(out.contains("system_bus(7 downto 0), wr_MD, wr_MA, rd_MD"));
    assert!(out.contains("address : in std_logic_vector(7 downto 0)"));
}

#[test]
fn generate_writes_both_files() {
    let dir = tempfile::tempdir().unwrap();
    let mut c = Computer::new("machine");
    c.instruction("load_seven", |i| {
        i.mov(Reg::A, 7);
    });
    c.generate_in(dir.path()).unwrap();

    let control =
        std::fs::read_to_string(dir.path().join("machine/control.vhdl"))
            .unwrap();
    let top = std::fs::read_to_string(dir.path().join("machine/main.vhdl"))
        .unwrap();
    assert!(control.starts_with("library ieee;"));
    assert!(control.contains("entity control_unit is"));
    assert!(top.contains("entity main is"));

    // Regenerating into the same directory overwrites cleanly.
    c.generate_in(dir.path()).unwrap();
}

#[test]
fn generate_fails_without_a_parent_directory() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("not/there");
    let mut c = Computer::new("machine");
    c.instruction("nop", |_| {});
    assert!(c.generate_in(&missing).is_err());
}

/// The two artifacts stay consistent: every control output declared on
/// the generated entity shows up as a declared signal in the top.
#[test]
fn artifacts_agree_on_the_signal_set() {
    let mut c = Computer::new("pair");
    c.instruction("load", |i| {
        i.mov(Reg::Ma, Reg::Ir).mov(Reg::A, Reg::Md);
    });
    let assembly = assemble(&c);
    let control = Printer::design_str(&assembly.control_fsm().emit());
    let top = Printer::design_str(&assembly.top_design());
    for signal in assembly.alphabet() {
        assert!(control.contains(&format!("{} : out std_logic", signal)));
        assert!(top.contains(&format!("signal {} : std_logic;", signal)));
    }
}
