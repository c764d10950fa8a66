//! Command-line parsing for the `ucodec` driver.
use argh::FromArgs;
use std::path::PathBuf;
use std::str::FromStr;
use ucode_utils::OutputFile;

#[derive(FromArgs)]
/// Generate the built-in reference accumulator machine as VHDL.
pub struct Opts {
    /// name of the generated computer and of its output directory
    #[argh(option, short = 'n', default = "String::from(\"simple\")")]
    pub name: String,

    /// RAM address width in bits
    #[argh(option, short = 'a', default = "5")]
    pub address_width: u64,

    /// directory the output directory is created under
    #[argh(option, short = 'o', default = "PathBuf::from(\".\")")]
    pub out_dir: PathBuf,

    /// emit a single artifact to --output instead of writing both files
    #[argh(option, short = 'e')]
    pub emit: Option<Artifact>,

    /// output stream for --emit; `-` is stdout
    #[argh(option, default = "OutputFile::Stdout")]
    pub output: OutputFile,

    /// logging level
    #[argh(option, long = "log", default = "log::LevelFilter::Warn")]
    pub log_level: log::LevelFilter,
}

/// The two artifacts the generator produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    /// The control-unit FSM (`control.vhdl`).
    Control,
    /// The structural top entity (`main.vhdl`).
    Main,
}

impl FromStr for Artifact {
    type Err = String;
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input {
            "control" => Ok(Artifact::Control),
            "main" => Ok(Artifact::Main),
            s => Err(format!(
                "`{}` is not a generated artifact. Valid artifacts: control, main",
                s
            )),
        }
    }
}
