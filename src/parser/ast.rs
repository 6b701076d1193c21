use std::fmt;
use std::path::PathBuf;

/// Where a command's standard output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Stdout,
    File(PathBuf),
}

/// Where a command's standard input comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    Stdin,
    PreviousCommand,
}

/// One program launch, built fresh for every statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub args: Vec<String>,
    pub input: InputSource,
    pub output: OutputTarget,
}

impl Command {
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            args,
            input: InputSource::Stdin,
            output: OutputTarget::Stdout,
        }
    }

    pub fn with_input(mut self, input: InputSource) -> Self {
        self.input = input;
        self
    }

    pub fn with_output(mut self, output: OutputTarget) -> Self {
        self.output = output;
        self
    }

    /// `argv` as the child sees it: the name as typed, then the arguments.
    pub fn argv(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.args.iter().map(String::as_str))
    }
}

/// Exactly two commands joined by one pipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub producer: Command,
    pub consumer: Command,
}

impl Pipeline {
    pub fn new(producer: Command, consumer: Command) -> Self {
        Self {
            producer,
            consumer: consumer.with_input(InputSource::PreviousCommand),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// `cmd args...`
    Exec(Command),
    /// `NAME = cmd args...`
    Assign { name: String, command: Command },
    /// `cmd args... | cmd args...`
    Pipe(Pipeline),
    /// `cmd args... > file`
    Redirect(Command),
    /// `cmd args... | cmd args... > file`
    PipeRedirect(Pipeline),
    /// `NAME = cmd args... | cmd args...`
    PipeAssign { name: String, pipeline: Pipeline },
}

/// The execution shape a statement was classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Direct,
    Assign,
    Pipe,
    Redirect,
    PipeRedirect,
    PipeAssign,
}

impl Statement {
    pub fn strategy(&self) -> Strategy {
        match self {
            Statement::Exec(_) => Strategy::Direct,
            Statement::Assign { .. } => Strategy::Assign,
            Statement::Pipe(_) => Strategy::Pipe,
            Statement::Redirect(_) => Strategy::Redirect,
            Statement::PipeRedirect(_) => Strategy::PipeRedirect,
            Statement::PipeAssign { .. } => Strategy::PipeAssign,
        }
    }

    /// Commands in launch order.
    pub fn commands(&self) -> Vec<&Command> {
        match self {
            Statement::Exec(cmd) | Statement::Redirect(cmd) => vec![cmd],
            Statement::Assign { command, .. } => vec![command],
            Statement::Pipe(p) | Statement::PipeRedirect(p) => vec![&p.producer, &p.consumer],
            Statement::PipeAssign { pipeline, .. } => vec![&pipeline.producer, &pipeline.consumer],
        }
    }
}

fn write_word(f: &mut fmt::Formatter<'_>, word: &str) -> fmt::Result {
    if word.is_empty() || word.contains(char::is_whitespace) {
        write!(f, "\"{}\"", word)
    } else {
        f.write_str(word)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, word) in self.argv().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write_word(f, word)?;
        }
        if let OutputTarget::File(path) = &self.output {
            write!(f, " > {}", path.display())?;
        }
        Ok(())
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | {}", self.producer, self.consumer)
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Exec(cmd) | Statement::Redirect(cmd) => write!(f, "{}", cmd),
            Statement::Assign { name, command } => write!(f, "{} = {}", name, command),
            Statement::Pipe(p) | Statement::PipeRedirect(p) => write!(f, "{}", p),
            Statement::PipeAssign { name, pipeline } => write!(f, "{} = {}", name, pipeline),
        }
    }
}
