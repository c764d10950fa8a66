//! Driver for the `ucodec` binary: builds the reference machine and runs
//! the generator over it.
use crate::cmdline::{Artifact, Opts};
use ucode_core::{add, complement, subtract, Computer, Reg, UcodeResult};

/// Run the generator from the command line.
pub fn run() -> UcodeResult<()> {
    let opts: Opts = argh::from_env();

    env_logger::Builder::new()
        .format_timestamp(None)
        .filter_level(opts.log_level)
        .target(env_logger::Target::Stderr)
        .init();

    let computer = reference_machine(&opts.name, opts.address_width);
    match opts.emit {
        Some(Artifact::Control) => {
            computer.emit_control(&mut opts.output.get_write()?)
        }
        Some(Artifact::Main) => {
            computer.emit_top(&mut opts.output.get_write()?)
        }
        None => computer.generate_in(&opts.out_dir),
    }
}

/// The built-in reference machine: a classic single-address accumulator
/// computer whose memory operands are addressed through the instruction
/// register.
pub fn reference_machine(name: &str, address_width: u64) -> Computer {
    let mut computer = Computer::new(name);
    computer.address_width(address_width);
    computer.instruction("load", |i| {
        i.mov(Reg::Ma, Reg::Ir).mov(Reg::A, Reg::Md);
    });
    computer.instruction("store", |i| {
        i.mov(Reg::Ma, Reg::Ir).mov(Reg::Md, Reg::A);
    });
    computer.instruction("add", |i| {
        i.mov(Reg::Ma, Reg::Ir).mov(Reg::A, add(Reg::A, Reg::Md));
    });
    computer.instruction("subtract", |i| {
        i.mov(Reg::Ma, Reg::Ir).mov(Reg::A, subtract(Reg::A, Reg::Md));
    });
    computer.instruction("complement", |i| {
        i.mov(Reg::A, complement(Reg::A));
    });
    computer.instruction("jump", |i| {
        i.mov(Reg::Pc, Reg::Ir);
    });
    computer.instruction("clear", |i| {
        i.mov(Reg::A, 0);
    });
    computer
}

#[cfg(test)]
mod tests {
    use super::*;
    use ucode_core::Assembly;

    #[test]
    fn reference_machine_assembles() {
        let computer = reference_machine("simple", 5);
        let assembly = Assembly::new(&computer).unwrap();
        // Seven instructions need a three-bit opcode.
        assert_eq!(assembly.opcode_width(), 3);
        assert_eq!(assembly.opcodes().len(), 7);
    }
}
