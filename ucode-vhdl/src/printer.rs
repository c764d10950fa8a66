//! Writes a [`Design`] out as VHDL-93 text. Formatting is deterministic:
//! two-space indentation, ports and declarations in insertion order.

use crate::ast::{Concurrent, Decl, Design, Port, Process, Sequential};
use itertools::Itertools;
use std::io;

/// Printer for the VHDL IR.
pub struct Printer;

impl Printer {
    /// Write a complete design file: library prelude, entity declaration,
    /// and the `behavior` architecture.
    pub fn write_design<F: io::Write>(
        design: &Design,
        f: &mut F,
    ) -> io::Result<()> {
        writeln!(f, "library ieee;")?;
        writeln!(f, "use ieee.std_logic_1164.all;")?;
        writeln!(f)?;
        Self::write_entity(design, f)?;
        writeln!(f)?;
        Self::write_architecture(design, f)
    }

    fn write_entity<F: io::Write>(
        design: &Design,
        f: &mut F,
    ) -> io::Result<()> {
        writeln!(f, "entity {} is", design.name)?;
        Self::write_port_clause(&design.ports, 2, f)?;
        writeln!(f, "end {};", design.name)
    }

    /// The `port ( .. );` clause shared by entities and component
    /// declarations. Ports are separated by semicolons, with none after
    /// the final port.
    fn write_port_clause<F: io::Write>(
        ports: &[Port],
        indent_level: usize,
        f: &mut F,
    ) -> io::Result<()> {
        let pad = " ".repeat(indent_level);
        writeln!(f, "{}port (", pad)?;
        for (idx, port) in ports.iter().enumerate() {
            write!(f, "{}  {} : {} {}", pad, port.name, port.dir, port.ty)?;
            if idx + 1 == ports.len() {
                writeln!(f)?;
            } else {
                writeln!(f, ";")?;
            }
        }
        writeln!(f, "{});", pad)
    }

    fn write_architecture<F: io::Write>(
        design: &Design,
        f: &mut F,
    ) -> io::Result<()> {
        writeln!(f, "architecture behavior of {} is", design.name)?;
        for decl in &design.decls {
            Self::write_decl(decl, 2, f)?;
        }
        writeln!(f, "begin")?;
        for stmt in &design.stmts {
            Self::write_concurrent(stmt, 2, f)?;
        }
        writeln!(f, "end behavior;")
    }

    pub fn write_decl<F: io::Write>(
        decl: &Decl,
        indent_level: usize,
        f: &mut F,
    ) -> io::Result<()> {
        let pad = " ".repeat(indent_level);
        match decl {
            Decl::Type { name, variants } => {
                writeln!(
                    f,
                    "{}type {} is ({});",
                    pad,
                    name,
                    variants.iter().join(", ")
                )
            }
            Decl::Signal { name, ty } => {
                writeln!(f, "{}signal {} : {};", pad, name, ty)
            }
            Decl::Constant { name, ty, value } => {
                writeln!(f, "{}constant {} : {} := {};", pad, name, ty, value)
            }
            Decl::Component(component) => {
                writeln!(f, "{}component {}", pad, component.name)?;
                Self::write_port_clause(
                    &component.ports,
                    indent_level + 2,
                    f,
                )?;
                writeln!(f, "{}end component;", pad)
            }
        }
    }

    pub fn write_concurrent<F: io::Write>(
        stmt: &Concurrent,
        indent_level: usize,
        f: &mut F,
    ) -> io::Result<()> {
        let pad = " ".repeat(indent_level);
        match stmt {
            Concurrent::Assign(dst, src) => {
                writeln!(f, "{}{} <= {};", pad, dst, src)
            }
            Concurrent::Instance(instance) => {
                writeln!(
                    f,
                    "{}{} : {} port map ({});",
                    pad,
                    instance.label,
                    instance.component,
                    instance.port_map.iter().join(", ")
                )
            }
            Concurrent::Process(process) => {
                Self::write_process(process, indent_level, f)
            }
        }
    }

    fn write_process<F: io::Write>(
        process: &Process,
        indent_level: usize,
        f: &mut F,
    ) -> io::Result<()> {
        let pad = " ".repeat(indent_level);
        writeln!(
            f,
            "{}process ({})",
            pad,
            process.sensitivity.iter().join(", ")
        )?;
        writeln!(f, "{}begin", pad)?;
        Self::write_seq_body(&process.body, indent_level + 2, f)?;
        writeln!(f, "{}end process;", pad)
    }

    /// A sequence of statements. VHDL requires at least one statement, so
    /// an empty body becomes `null;`.
    fn write_seq_body<F: io::Write>(
        body: &[Sequential],
        indent_level: usize,
        f: &mut F,
    ) -> io::Result<()> {
        if body.is_empty() {
            return writeln!(f, "{}null;", " ".repeat(indent_level));
        }
        for stmt in body {
            Self::write_sequential(stmt, indent_level, f)?;
        }
        Ok(())
    }

    pub fn write_sequential<F: io::Write>(
        stmt: &Sequential,
        indent_level: usize,
        f: &mut F,
    ) -> io::Result<()> {
        let pad = " ".repeat(indent_level);
        match stmt {
            Sequential::Assign(dst, src) => {
                writeln!(f, "{}{} <= {};", pad, dst, src)
            }
            Sequential::If(ifelse) => {
                writeln!(f, "{}if {} then", pad, ifelse.cond)?;
                Self::write_seq_body(&ifelse.then, indent_level + 2, f)?;
                for (cond, body) in &ifelse.elifs {
                    writeln!(f, "{}elsif {} then", pad, cond)?;
                    Self::write_seq_body(body, indent_level + 2, f)?;
                }
                if !ifelse.else_branch.is_empty() {
                    writeln!(f, "{}else", pad)?;
                    Self::write_seq_body(
                        &ifelse.else_branch,
                        indent_level + 2,
                        f,
                    )?;
                }
                writeln!(f, "{}end if;", pad)
            }
            Sequential::Case(case) => {
                writeln!(f, "{}case {} is", pad, case.discriminant)?;
                for branch in &case.branches {
                    writeln!(f, "{}  when {} =>", pad, branch.choice)?;
                    Self::write_seq_body(&branch.body, indent_level + 4, f)?;
                }
                writeln!(f, "{}end case;", pad)
            }
        }
    }

    /// Render a design to a string. Handy for tests and logging.
    pub fn design_str(design: &Design) -> String {
        let mut buf = Vec::new();
        Self::write_design(design, &mut buf)
            .expect("writing to a Vec cannot fail");
        String::from_utf8(buf).expect("emitted VHDL is valid UTF-8")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{
        Case, CaseBranch, Component, Dir, Expr, Instance, Process,
        SequentialIfElse, Ty,
    };

    #[test]
    fn expr_literals() {
        assert_eq!(Expr::new_bit(true).to_string(), "'1'");
        assert_eq!(Expr::new_bit(false).to_string(), "'0'");
        assert_eq!(Expr::new_bits("ZZZZZZZZ").to_string(), "\"ZZZZZZZZ\"");
        assert_eq!(
            Expr::new_slice("system_bus", 7, 6).to_string(),
            "system_bus(7 downto 6)"
        );
        assert_eq!(
            Expr::new_eq("opcode", Expr::new_bits("01")).to_string(),
            "opcode = \"01\""
        );
        assert_eq!(
            Expr::new_call("rising_edge", vec!["clock".into()]).to_string(),
            "rising_edge(clock)"
        );
    }

    #[test]
    fn ty_display() {
        assert_eq!(Ty::StdLogic.to_string(), "std_logic");
        assert_eq!(
            Ty::vector(8).to_string(),
            "std_logic_vector(7 downto 0)"
        );
    }

    #[test]
    fn entity_with_ports() {
        let mut design = Design::new("widget");
        design.add_input("clock", Ty::StdLogic);
        design.add_inout("system_bus", Ty::vector(8));
        design.add_output("done", Ty::StdLogic);
        let out = Printer::design_str(&design);
        assert_eq!(
            out,
            "library ieee;\n\
             use ieee.std_logic_1164.all;\n\
             \n\
             entity widget is\n\
             \x20 port (\n\
             \x20   clock : in std_logic;\n\
             \x20   system_bus : inout std_logic_vector(7 downto 0);\n\
             \x20   done : out std_logic\n\
             \x20 );\n\
             end widget;\n\
             \n\
             architecture behavior of widget is\n\
             begin\n\
             end behavior;\n"
        );
    }

    #[test]
    fn component_and_instance() {
        let mut design = Design::new("top");
        design.add_input("clock", Ty::StdLogic);
        let mut reg = Component::new("reg");
        reg.add_port("clock", Dir::In, Ty::StdLogic);
        reg.add_port("wr", Dir::In, Ty::StdLogic);
        design.add_decl(reg);
        let mut instance = Instance::new("ir", "reg");
        instance.connect("clock");
        instance.connect("wr_IR");
        design.add_stmt(instance);
        let out = Printer::design_str(&design);
        assert!(out.contains("  component reg\n"));
        assert!(out.contains("      clock : in std_logic;\n"));
        assert!(out.contains("  ir : reg port map (clock, wr_IR);\n"));
    }

    #[test]
    fn process_with_if_and_case() {
        let mut process = Process::new(vec!["clock".into(), "reset".into()]);
        let mut ifelse =
            SequentialIfElse::new(Expr::new_eq("reset", Expr::new_bit(true)));
        ifelse.add_seq(Sequential::new_assign("rd_pc", Expr::new_bit(false)));
        let mut case = Case::new("current_state");
        let mut branch = CaseBranch::new("fetch");
        branch.add_seq(Sequential::new_assign(
            "current_state",
            "store_instruction",
        ));
        case.add_branch(branch);
        case.add_branch(CaseBranch::new("decode"));
        ifelse.add_elif(
            Expr::new_call("rising_edge", vec!["clock".into()]),
            vec![case.into()],
        );
        process.add_seq(ifelse);

        let mut buf = Vec::new();
        Printer::write_concurrent(&process.into(), 2, &mut buf).unwrap();
        let out = String::from_utf8(buf).unwrap();
        assert_eq!(
            out,
            "  process (clock, reset)\n\
             \x20 begin\n\
             \x20   if reset = '1' then\n\
             \x20     rd_pc <= '0';\n\
             \x20   elsif rising_edge(clock) then\n\
             \x20     case current_state is\n\
             \x20       when fetch =>\n\
             \x20         current_state <= store_instruction;\n\
             \x20       when decode =>\n\
             \x20         null;\n\
             \x20     end case;\n\
             \x20   end if;\n\
             \x20 end process;\n"
        );
    }
}
