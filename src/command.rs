//! Structured command line assembly and shell rendering

use crate::{SentieonError, SentieonResult};
use std::borrow::Cow;
use std::fmt::Write as _;
use std::path::Path;

/// Separator chaining an export statement to the command that follows
pub const COMMAND_SEPARATOR: &str = " && ";

/// An external command: environment exports, a program and its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    exports: Vec<(String, String)>,
    program: String,
    args: Vec<String>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            exports: Vec::new(),
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn export(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.exports.push((name.into(), value.into()));
        self
    }

    pub fn exports<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.exports
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy())
    }

    /// Append `flag value`
    pub fn flag(self, flag: &str, value: impl Into<String>) -> Self {
        self.arg(flag).arg(value)
    }

    /// Append `flag path` when `path` is present
    pub fn opt_path(self, flag: &str, path: Option<&Path>) -> Self {
        match path {
            Some(p) => self.flag(flag, p.to_string_lossy()),
            None => self,
        }
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Value following the first occurrence of `flag`
    pub fn flag_value(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.args.iter().any(|a| a == flag)
    }

    /// Render as a single shell command string
    pub fn render(&self) -> SentieonResult<String> {
        let mut out = render_exports(&self.exports)?;
        out.push_str(&shell_word(&self.program)?);
        for arg in &self.args {
            out.push(' ');
            out.push_str(&shell_word(arg)?);
        }
        Ok(out)
    }
}

/// Render `export NAME=value && ` for every pair, in order
pub fn render_exports(exports: &[(String, String)]) -> SentieonResult<String> {
    let mut out = String::new();
    for (name, value) in exports {
        if !is_env_name(name) {
            return Err(SentieonError::InvalidArgument(format!(
                "Invalid environment variable name: {}",
                name
            )));
        }
        // Writing into a String cannot fail
        let _ = write!(out, "export {}={}{}", name, shell_word(value)?, COMMAND_SEPARATOR);
    }
    Ok(out)
}

fn is_env_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_plain_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '@' | '%' | '+' | '=' | ':' | ',' | '.' | '/' | '-' | '_')
}

/// Quote `word` for a POSIX shell unless it is made of plain characters only
pub fn shell_word(word: &str) -> SentieonResult<Cow<'_, str>> {
    if !word.is_empty() && word.chars().all(is_plain_char) {
        return Ok(Cow::Borrowed(word));
    }
    shlex::try_quote(word)
        .map_err(|e| SentieonError::InvalidArgument(format!("Cannot quote {:?}: {}", word, e)))
}
