//! Line-based prompting over any reader/writer pair.

use std::fmt::Display;
use std::io::{self, BufRead, StdinLock, Stdout, Write};

pub struct Console<R, W> {
    input: R,
    output: W,
}

pub type Stdio = Console<StdinLock<'static>, Stdout>;

pub fn stdio() -> Stdio {
    Console::new(io::stdin().lock(), io::stdout())
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Console { input, output }
    }

    pub fn line(&mut self, msg: impl Display) -> io::Result<()> {
        writeln!(self.output, "{}", msg)
    }

    /// Prints without a newline and flushes, for `step... OK` style output.
    pub fn print(&mut self, msg: impl Display) -> io::Result<()> {
        write!(self.output, "{}", msg)?;
        self.output.flush()
    }

    /// Prints `msg` and reads one trimmed line. `None` on end of input.
    pub fn prompt(&mut self, msg: &str) -> io::Result<Option<String>> {
        write!(self.output, "{}", msg)?;
        self.output.flush()?;
        let mut input = String::new();
        if self.input.read_line(&mut input)? == 0 {
            return Ok(None);
        }
        Ok(Some(input.trim().to_string()))
    }

    pub fn prompt_yn(&mut self, msg: &str, default: bool) -> io::Result<bool> {
        let suffix = if default { " [Y/n]: " } else { " [y/N]: " };
        let answer = self.prompt(&format!("{}{}", msg, suffix))?;
        Ok(match answer.map(|s| s.to_lowercase()).as_deref() {
            Some("y") | Some("yes") => true,
            Some("n") | Some("no") => false,
            _ => default,
        })
    }

    #[cfg(test)]
    pub fn into_output(self) -> W {
        self.output
    }
}
