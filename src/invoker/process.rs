use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::Command;

/// Fully resolved external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Working directory; inherited when `None`
    pub dir: Option<PathBuf>,
}

impl CommandLine {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            dir: None,
        }
    }

    pub fn arg(&mut self, arg: impl Into<String>) -> &mut Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Value following `flag`, e.g. `value_of("-classpath")`
    pub fn value_of(&self, flag: &str) -> Option<&str> {
        let index = self.args.iter().position(|a| a == flag)?;
        self.args.get(index + 1).map(String::as_str)
    }

    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }
}

fn quote(arg: &str) -> String {
    if !arg.is_empty() && !arg.chars().any(|c| c.is_whitespace() || c == '\'' || c == '"') {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(dir) = &self.dir {
            write!(f, "cd {} && ", quote(&dir.to_string_lossy()))?;
        }
        write!(f, "{}", quote(&self.program.to_string_lossy()))?;
        for arg in &self.args {
            write!(f, " {}", quote(arg))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessStatus {
    pub success: bool,
    /// `None` when the process was terminated by a signal
    pub code: Option<i32>,
}

impl ProcessStatus {
    pub fn from_code(code: i32) -> Self {
        Self {
            success: code == 0,
            code: Some(code),
        }
    }

    pub fn ok() -> Self {
        Self::from_code(0)
    }
}

/// Executes command lines
pub trait ProcessRunner: Send + Sync {
    fn run(&self, command: &CommandLine) -> io::Result<ProcessStatus>;
}

/// Runs commands as child processes with inherited stdio
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&self, command: &CommandLine) -> io::Result<ProcessStatus> {
        let mut child = Command::new(&command.program);
        child.args(&command.args);
        if let Some(dir) = &command.dir {
            child.current_dir(dir);
        }
        let status = child.status()?;
        Ok(ProcessStatus {
            success: status.success(),
            code: status.code(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_quotes_arguments_with_spaces() {
        let mut command = CommandLine::new("/jdk/bin/java");
        command.args(["-classpath", "/tmp/my dir/a.jar", "Main"]);
        assert_eq!(
            command.to_string(),
            "/jdk/bin/java -classpath '/tmp/my dir/a.jar' Main"
        );
    }

    #[test]
    fn test_display_includes_working_directory() {
        let mut command = CommandLine::new("java");
        command.dir = Some(PathBuf::from("/work"));
        command.arg("-version");
        assert_eq!(command.to_string(), "cd /work && java -version");
    }

    #[test]
    fn test_value_of() {
        let mut command = CommandLine::new("javac");
        command.args(["-d", "out", "-g"]);
        assert_eq!(command.value_of("-d"), Some("out"));
        assert_eq!(command.value_of("-g"), None);
        assert!(command.has_arg("-g"));
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_reports_exit_code() {
        let runner = SystemRunner;
        let mut command = CommandLine::new("sh");
        command.args(["-c", "exit 3"]);
        let status = runner.run(&command).unwrap();
        assert_eq!(status, ProcessStatus::from_code(3));
        assert!(!status.success);
    }
}
