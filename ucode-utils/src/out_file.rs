use std::{
    io::{self, BufWriter},
    path::PathBuf,
    str::FromStr,
};

/// Possible choices for output streams. Used by the `-o` option of the
/// driver: `-` is treated as stdout, everything else as a file path.
#[derive(Debug, Clone)]
pub enum OutputFile {
    Stdout,
    File(PathBuf),
}

impl OutputFile {
    pub fn file(path: PathBuf) -> Self {
        OutputFile::File(path)
    }

    pub fn as_path_string(&self) -> String {
        match self {
            OutputFile::Stdout => "<stdout>".to_string(),
            OutputFile::File(path) => path.to_string_lossy().to_string(),
        }
    }

    pub fn get_write(&self) -> io::Result<Box<dyn io::Write>> {
        match self {
            OutputFile::Stdout => {
                Ok(Box::new(BufWriter::new(std::io::stdout())))
            }
            OutputFile::File(path) => {
                let file = std::fs::File::create(path)?;
                Ok(Box::new(BufWriter::new(file)))
            }
        }
    }
}

impl FromStr for OutputFile {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "-" | "<out>" => Ok(OutputFile::Stdout),
            _ => Ok(OutputFile::file(PathBuf::from(s))),
        }
    }
}
