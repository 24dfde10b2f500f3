use std::io::{self, BufRead, Stderr, StdinLock, Write};

/// Source of answers for values missing from the connection config
pub trait Prompter {
    /// Ask for `label`. Returns `None` for a blank answer or closed input.
    fn prompt(&mut self, label: &str) -> io::Result<Option<String>>;
}

/// Line-based prompter over a reader and writer
///
/// Prompts go to the writer without a trailing newline; each answer is one
/// line of input with surrounding whitespace removed.
pub struct StdioPrompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> StdioPrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

impl StdioPrompter<StdinLock<'static>, Stderr> {
    /// Prompt on standard error, read answers from standard input
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> Prompter for StdioPrompter<R, W> {
    fn prompt(&mut self, label: &str) -> io::Result<Option<String>> {
        write!(self.output, "{}: ", label)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let answer = line.trim();
        Ok((!answer.is_empty()).then(|| answer.to_string()))
    }
}
