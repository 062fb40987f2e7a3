//! External command collaborators.
//!
//! Template and Sass compilation are delegated to external programs that
//! read the source on stdin and print the result on stdout:
//!
//! ```toml
//! [markup]
//! command = ["pug", "--path", "$KILN_SOURCE"]
//! ```
//!
//! `$KILN_SOURCE`, `$KILN_SOURCE_DIR` and `$KILN_ROOT` are substituted in
//! every argument before the program is spawned.

use std::{
    ffi::{OsStr, OsString},
    io::Write,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use rustc_hash::FxHashMap;

use super::{Output, Transform, TransformError};

// ============================================================================
// Builder API
// ============================================================================

/// Command builder for external process execution.
#[derive(Default)]
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
    stdin_data: Option<Vec<u8>>,
}

impl Cmd {
    /// Create from a command array (e.g., `["sass", "--stdin"]`).
    pub fn from_slice<S: AsRef<OsStr>>(cmd: &[S]) -> Self {
        let mut iter = cmd.iter();
        let program = iter
            .next()
            .map(|s| s.as_ref().to_owned())
            .unwrap_or_default();
        let args: Vec<_> = iter.map(|s| s.as_ref().to_owned()).collect();
        Self {
            program,
            args,
            ..Default::default()
        }
    }

    /// Set working directory.
    pub fn cwd<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.cwd = Some(dir.as_ref().to_owned());
        self
    }

    /// Set stdin data to pipe to the process.
    pub fn stdin<D: AsRef<[u8]>>(mut self, data: D) -> Self {
        self.stdin_data = Some(data.as_ref().to_vec());
        self
    }

    fn program_name(&self) -> String {
        self.program.to_string_lossy().to_string()
    }

    /// Execute the command and return its stdout.
    ///
    /// A non-zero exit status is an error carrying the trimmed stderr.
    pub fn run(self) -> Result<Vec<u8>, TransformError> {
        let name = self.program_name();
        if name.is_empty() {
            return Err(TransformError::new("empty command"));
        }

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| TransformError::new(format!("failed to spawn `{name}`: {e}")))?;

        // Feed stdin from a separate thread so a chatty child can't fill its
        // stdout pipe while we are still writing.
        let stdin_data = self.stdin_data.unwrap_or_default();
        let writer = child.stdin.take().map(|mut stdin| {
            std::thread::spawn(move || {
                let _ = stdin.write_all(&stdin_data);
            })
        });

        let output = child
            .wait_with_output()
            .map_err(|e| TransformError::new(format!("failed to wait for `{name}`: {e}")))?;

        if let Some(writer) = writer {
            let _ = writer.join();
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr.trim();
            return Err(TransformError::new(if detail.is_empty() {
                format!("`{name}` exited with {}", output.status)
            } else {
                format!("`{name}` failed:\n{detail}")
            }));
        }

        Ok(output.stdout)
    }
}

// ============================================================================
// Variable substitution
// ============================================================================

/// Build `$KILN_*` variables for one source file.
pub fn build_kiln_vars(root: &Path, source: &Path) -> FxHashMap<String, String> {
    let mut vars = FxHashMap::default();
    vars.insert("KILN_ROOT".into(), root.display().to_string());
    vars.insert("KILN_SOURCE".into(), source.display().to_string());
    vars.insert(
        "KILN_SOURCE_DIR".into(),
        source
            .parent()
            .unwrap_or(root)
            .display()
            .to_string(),
    );
    vars
}

/// Resolve `$KILN_*` variables in command arguments.
///
/// Longer names are substituted first so `$KILN_SOURCE_DIR` is not
/// clobbered by `$KILN_SOURCE`.
pub fn resolve_args(args: &[String], vars: &FxHashMap<String, String>) -> Vec<String> {
    let mut keys: Vec<_> = vars.keys().collect();
    keys.sort_by_key(|k| std::cmp::Reverse(k.len()));

    args.iter()
        .map(|arg| {
            let mut result = arg.clone();
            for key in &keys {
                result = result.replace(&format!("${key}"), &vars[*key]);
            }
            result
        })
        .collect()
}

// ============================================================================
// Transform
// ============================================================================

/// Pipe a source file through an external program.
pub struct CommandTransform {
    label: &'static str,
    command: Vec<String>,
    root: PathBuf,
}

impl CommandTransform {
    pub fn new(label: &'static str, command: Vec<String>, root: PathBuf) -> Self {
        Self {
            label,
            command,
            root,
        }
    }
}

impl Transform for CommandTransform {
    fn transform(&self, source: &[u8], path: &Path) -> Result<Output, TransformError> {
        if self.command.is_empty() {
            return Err(TransformError::new(format!(
                "no {} command configured",
                self.label
            )));
        }

        let vars = build_kiln_vars(&self.root, path);
        let command = resolve_args(&self.command, &vars);
        crate::debug!(self.label; "{}", command.join(" "));

        Cmd::from_slice(&command)
            .cwd(&self.root)
            .stdin(source)
            .run()
            .map(Output::new)
    }
}
