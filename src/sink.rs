use std::fs::File;
use std::io::{self, Write};
use std::process::Stdio;

/// Destination for one stream of a single command invocation.
///
/// The standard streams are borrowed from the process and never closed here.
/// A redirection target is owned by the invocation and closed when the sink is
/// dropped, whichever way the invocation ends.
#[derive(Debug)]
pub enum OutputSink {
    Stdout,
    Stderr,
    File(File),
}

impl OutputSink {
    pub fn is_redirected(&self) -> bool {
        matches!(self, Self::File(_))
    }

    /// Handle for connecting a child process to this sink.
    pub fn stdio(&self) -> io::Result<Stdio> {
        match self {
            Self::Stdout | Self::Stderr => Ok(Stdio::inherit()),
            Self::File(file) => Ok(Stdio::from(file.try_clone()?)),
        }
    }
}

impl Write for OutputSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Stdout => io::stdout().write(buf),
            Self::Stderr => io::stderr().write(buf),
            Self::File(file) => file.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Stdout => io::stdout().flush(),
            Self::Stderr => io::stderr().flush(),
            Self::File(file) => file.flush(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_sink_writes_and_reports_redirected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sink.txt");
        let mut sink = OutputSink::File(File::create(&path).unwrap());
        assert!(sink.is_redirected());
        writeln!(sink, "hello").unwrap();
        drop(sink);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello\n");
        assert!(!OutputSink::Stdout.is_redirected());
    }
}
