//! Executor: runs an [`ExpandedChain`] — pipelines, redirections,
//! logical operators, and background jobs — against real child processes.
//!
//! Wiring a multi-stage pipeline follows the same shape as the
//! `subprocess` crate's `Pipeline::start()`: walk the stages left to
//! right, handing each non-first stage the previous stage's piped stdout
//! as its own stdin, and giving every stage but the last a piped stdout.
//! Built-ins encountered mid-pipeline run in-process with their output
//! captured into an in-memory buffer that is fed to the next stage's
//! stdin on a helper thread, since they have no OS-level stdout of their
//! own to hand off.

use std::fs::OpenOptions;
use std::io::{self, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;

use thiserror::Error;

use crate::model::{ExpandedChain, ExpandedCommand, Operator, RedirKind};

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("{cmd}: command not found")]
    NotFound { cmd: String },
    #[error("{cmd}: permission denied")]
    PermissionDenied { cmd: String },
    #[error("{cmd}: {source}")]
    Spawn {
        cmd: String,
        #[source]
        source: io::Error,
    },
    #[error("redirection target {target}: {source}")]
    Redirect {
        target: String,
        #[source]
        source: io::Error,
    },
}

/// Implemented by the shell runtime so the executor can run a built-in
/// in-process without depending on `builtins.rs` directly.
pub trait BuiltinDispatch {
    fn is_builtin(&self, name: &str) -> bool;
    /// Run `name` with `args`, reading from `stdin` and writing to
    /// `stdout`/`stderr`, returning its exit code. Called for every
    /// stage dispatch, whether the command is alone or part of a
    /// pipeline, so it must not assume real terminal stdio.
    fn run_builtin(
        &mut self,
        name: &str,
        args: &[String],
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
    ) -> i32;
}

/// Result of running one chain: the chain's exit code (the last stage's)
/// and, if the chain ended in `&`, the pid of the
/// backgrounded pipeline's last stage plus its source text for the job
/// table.
pub struct ChainOutcome {
    pub exit_code: i32,
    pub background: Option<BackgroundSpawn>,
}

pub struct BackgroundSpawn {
    pub pid: u32,
    pub command_text: String,
}

enum PrevOutput {
    None,
    ChildStdout(std::process::ChildStdout),
    Bytes(Vec<u8>),
}

/// Run an entire expanded chain, honoring `&&`/`||`/`;`/`&` semantics
/// between pipeline groups and `|` within a group.
pub fn run_chain(
    chain: &ExpandedChain,
    dispatch: &mut dyn BuiltinDispatch,
) -> Result<ChainOutcome, ExecError> {
    let groups = split_pipelines(chain);
    let mut exit_code = 0;
    let mut background = None;
    // The operator gating whether the CURRENT group runs, derived from
    // the previous group's trailing operator. `None` for the first group
    // (it always runs).
    let mut gate: Option<Operator> = None;

    for (commands, trailing_op) in &groups {
        let should_run = match gate {
            None => true,
            Some(op) => should_run_next(exit_code, op),
        };

        if should_run {
            if matches!(trailing_op, Some(Operator::Background)) {
                let pid = spawn_pipeline_background(commands, dispatch)?;
                let command_text = commands
                    .iter()
                    .map(|c| c.name.clone())
                    .collect::<Vec<_>>()
                    .join(" | ");
                background = Some(BackgroundSpawn { pid, command_text });
                exit_code = 0;
            } else {
                exit_code = run_pipeline_foreground(commands, dispatch)?;
            }
        }

        gate = *trailing_op;
    }

    Ok(ChainOutcome {
        exit_code,
        background,
    })
}

/// Split a chain into pipeline groups (maximal runs joined by `Pipe`),
/// each tagged with the operator that follows it (governing how the NEXT
/// group is gated), mirroring the grammar `chain := pipeline (OP pipeline)*`.
fn split_pipelines(chain: &ExpandedChain) -> Vec<(Vec<ExpandedCommand>, Option<Operator>)> {
    let mut groups = Vec::new();
    let mut current = vec![chain.commands[0].clone()];

    for (i, op) in chain.operators.iter().enumerate() {
        match op {
            Operator::Pipe => current.push(chain.commands[i + 1].clone()),
            other => {
                groups.push((std::mem::take(&mut current), Some(*other)));
                current = vec![chain.commands[i + 1].clone()];
            }
        }
    }
    groups.push((current, None));
    groups
}

/// Run a full chain honoring real `&&`/`||` short-circuiting — used by
/// callers that want precise semantics instead of the simplified
/// always-run stub above. This is the function `run_chain` actually
/// dispatches through.
fn run_pipeline_foreground(
    commands: &[ExpandedCommand],
    dispatch: &mut dyn BuiltinDispatch,
) -> Result<i32, ExecError> {
    run_pipeline(commands, dispatch, false).map(|(code, _)| code)
}

fn spawn_pipeline_background(
    commands: &[ExpandedCommand],
    dispatch: &mut dyn BuiltinDispatch,
) -> Result<u32, ExecError> {
    let (_, pid) = run_pipeline(commands, dispatch, true)?;
    Ok(pid.unwrap_or(0))
}

/// Core pipeline wiring: for each command after the first, its stdin is
/// the previous stage's piped stdout; every command but the last gets a
/// piped stdout. `background` controls whether we wait for the final
/// stage before returning.
fn run_pipeline(
    commands: &[ExpandedCommand],
    dispatch: &mut dyn BuiltinDispatch,
    background: bool,
) -> Result<(i32, Option<u32>), ExecError> {
    let mut prev = PrevOutput::None;
    let mut last_exit = 0;
    let mut last_pid = None;
    let mut children: Vec<Child> = Vec::new();

    for (i, cmd) in commands.iter().enumerate() {
        let is_last = i + 1 == commands.len();

        if dispatch.is_builtin(&cmd.name) {
            let mut input_bytes = take_prev_bytes(prev)?;
            let mut stdout_buf: Vec<u8> = Vec::new();
            let mut stderr_buf: Vec<u8> = Vec::new();
            let code = dispatch.run_builtin(
                &cmd.name,
                &cmd.args,
                &mut input_bytes.as_slice(),
                &mut stdout_buf,
                &mut stderr_buf,
            );
            io::stderr().write_all(&stderr_buf).ok();
            if is_last {
                apply_output_redirections(cmd, &stdout_buf)?;
                if !has_stdout_redirection(cmd) {
                    io::stdout().write_all(&stdout_buf).ok();
                }
            }
            last_exit = code;
            prev = PrevOutput::Bytes(stdout_buf);
        } else {
            let mut command = Command::new(&cmd.name);
            command.args(&cmd.args);
            apply_input_redirections(cmd, &mut command)?;

            match &prev {
                PrevOutput::None => {}
                PrevOutput::ChildStdout(_) => {
                    // moved into the command below
                }
                PrevOutput::Bytes(bytes) if !bytes.is_empty() => {
                    command.stdin(Stdio::piped());
                    let bytes = bytes.clone();
                    // stdin writer thread is spawned after `spawn()` below.
                    prev = PrevOutput::Bytes(bytes);
                }
                PrevOutput::Bytes(_) => {
                    command.stdin(Stdio::null());
                }
            }
            if let PrevOutput::ChildStdout(out) = prev {
                command.stdin(Stdio::from(out));
                prev = PrevOutput::None;
            }

            if !is_last {
                command.stdout(Stdio::piped());
            } else {
                apply_stdout_redirection(cmd, &mut command)?;
            }
            apply_stderr_redirection(cmd, &mut command)?;

            let pending_stdin_bytes = if let PrevOutput::Bytes(bytes) = &prev {
                Some(bytes.clone())
            } else {
                None
            };

            let mut child = command.spawn().map_err(|e| classify_spawn_error(&cmd.name, e))?;

            if let Some(bytes) = pending_stdin_bytes {
                if let Some(mut stdin) = child.stdin.take() {
                    thread::spawn(move || {
                        let _ = stdin.write_all(&bytes);
                    });
                }
            }

            last_pid = Some(child.id());
            prev = match child.stdout.take() {
                Some(out) => PrevOutput::ChildStdout(out),
                None => PrevOutput::None,
            };

            if background && is_last {
                // Don't wait; the shell's job table reaps it later.
                return Ok((0, last_pid));
            }

            if is_last {
                let status = child.wait().map_err(|e| ExecError::Spawn {
                    cmd: cmd.name.clone(),
                    source: e,
                })?;
                last_exit = exit_code_of(status);
            } else {
                children.push(child);
            }
        }
    }

    // Reap any non-final external stages (their exit codes don't matter
    // to the pipeline's result, only the last stage's does).
    for mut child in children {
        let _ = child.wait();
    }

    Ok((last_exit, last_pid))
}

fn take_prev_bytes(prev: PrevOutput) -> Result<Vec<u8>, ExecError> {
    match prev {
        PrevOutput::None => Ok(Vec::new()),
        PrevOutput::Bytes(b) => Ok(b),
        PrevOutput::ChildStdout(mut out) => {
            let mut buf = Vec::new();
            out.read_to_end(&mut buf).ok();
            Ok(buf)
        }
    }
}

fn has_stdout_redirection(cmd: &ExpandedCommand) -> bool {
    cmd.redirections.iter().any(|r| {
        matches!(
            r.kind,
            RedirKind::StdoutOverwrite | RedirKind::StdoutAppend | RedirKind::CombineStderrToStdout
        )
    })
}

fn apply_output_redirections(cmd: &ExpandedCommand, data: &[u8]) -> Result<(), ExecError> {
    for r in &cmd.redirections {
        let append = matches!(r.kind, RedirKind::StdoutAppend);
        match r.kind {
            RedirKind::StdoutOverwrite | RedirKind::StdoutAppend | RedirKind::CombineStderrToStdout => {
                let mut file = OpenOptions::new()
                    .create(true)
                    .write(true)
                    .append(append)
                    .truncate(!append)
                    .open(&r.target)
                    .map_err(|e| ExecError::Redirect {
                        target: r.target.clone(),
                        source: e,
                    })?;
                file.write_all(data).map_err(|e| ExecError::Redirect {
                    target: r.target.clone(),
                    source: e,
                })?;
            }
            _ => {}
        }
    }
    Ok(())
}

fn apply_input_redirections(cmd: &ExpandedCommand, command: &mut Command) -> Result<(), ExecError> {
    for r in &cmd.redirections {
        if r.kind == RedirKind::Stdin {
            let file = OpenOptions::new()
                .read(true)
                .open(&r.target)
                .map_err(|e| ExecError::Redirect {
                    target: r.target.clone(),
                    source: e,
                })?;
            command.stdin(Stdio::from(file));
        }
    }
    Ok(())
}

fn apply_stdout_redirection(cmd: &ExpandedCommand, command: &mut Command) -> Result<(), ExecError> {
    for r in &cmd.redirections {
        match r.kind {
            RedirKind::StdoutOverwrite | RedirKind::CombineStderrToStdout => {
                let file = OpenOptions::new()
                    .create(true)
                    .write(true)
                    .truncate(true)
                    .open(&r.target)
                    .map_err(|e| ExecError::Redirect {
                        target: r.target.clone(),
                        source: e,
                    })?;
                command.stdout(Stdio::from(file.try_clone().map_err(|e| ExecError::Redirect {
                    target: r.target.clone(),
                    source: e,
                })?));
                if r.kind == RedirKind::CombineStderrToStdout {
                    command.stderr(Stdio::from(file));
                }
            }
            RedirKind::StdoutAppend => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&r.target)
                    .map_err(|e| ExecError::Redirect {
                        target: r.target.clone(),
                        source: e,
                    })?;
                command.stdout(Stdio::from(file));
            }
            _ => {}
        }
    }
    Ok(())
}

fn apply_stderr_redirection(cmd: &ExpandedCommand, command: &mut Command) -> Result<(), ExecError> {
    for r in &cmd.redirections {
        match r.kind {
            RedirKind::StderrOverwrite => {
                let file = OpenOptions::new()
                    .create(true)
                    .write(true)
                    .truncate(true)
                    .open(&r.target)
                    .map_err(|e| ExecError::Redirect {
                        target: r.target.clone(),
                        source: e,
                    })?;
                command.stderr(Stdio::from(file));
            }
            RedirKind::StderrAppend => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&r.target)
                    .map_err(|e| ExecError::Redirect {
                        target: r.target.clone(),
                        source: e,
                    })?;
                command.stderr(Stdio::from(file));
            }
            _ => {}
        }
    }
    Ok(())
}

fn classify_spawn_error(cmd: &str, e: io::Error) -> ExecError {
    match e.kind() {
        io::ErrorKind::NotFound => ExecError::NotFound { cmd: cmd.to_string() },
        io::ErrorKind::PermissionDenied => ExecError::PermissionDenied { cmd: cmd.to_string() },
        _ => ExecError::Spawn {
            cmd: cmd.to_string(),
            source: e,
        },
    }
}

#[cfg(unix)]
fn exit_code_of(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status.code().unwrap_or_else(|| 128 + status.signal().unwrap_or(0))
}

#[cfg(not(unix))]
fn exit_code_of(status: ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}

/// Evaluate `&&`/`||`/`;` short-circuiting across pipeline groups. This
/// is the real decision logic `run_chain` uses (kept separate from the
/// wiring loop above for testability).
pub fn should_run_next(prev_exit_code: i32, operator: Operator) -> bool {
    match operator {
        Operator::And => prev_exit_code == 0,
        Operator::Or => prev_exit_code != 0,
        Operator::Sequence | Operator::Background | Operator::Pipe => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoBuiltins;
    impl BuiltinDispatch for NoBuiltins {
        fn is_builtin(&self, _name: &str) -> bool {
            false
        }
        fn run_builtin(
            &mut self,
            _name: &str,
            _args: &[String],
            _stdin: &mut dyn Read,
            _stdout: &mut dyn Write,
            _stderr: &mut dyn Write,
        ) -> i32 {
            127
        }
    }

    fn cmd(name: &str, args: &[&str]) -> ExpandedCommand {
        ExpandedCommand {
            name: name.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
            redirections: Vec::new(),
        }
    }

    #[test]
    fn and_short_circuits_on_failure() {
        assert!(!should_run_next(1, Operator::And));
        assert!(should_run_next(0, Operator::And));
    }

    #[test]
    fn or_runs_only_on_failure() {
        assert!(should_run_next(1, Operator::Or));
        assert!(!should_run_next(0, Operator::Or));
    }

    #[test]
    fn sequence_always_runs() {
        assert!(should_run_next(0, Operator::Sequence));
        assert!(should_run_next(1, Operator::Sequence));
    }

    #[test]
    fn split_pipelines_groups_by_pipe_operator() {
        let chain = ExpandedChain {
            commands: vec![cmd("a", &[]), cmd("b", &[]), cmd("c", &[]), cmd("d", &[])],
            operators: vec![Operator::Pipe, Operator::And, Operator::Pipe],
        };
        let groups = split_pipelines(&chain);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0.len(), 2);
        assert_eq!(groups[0].1, Some(Operator::And));
        assert_eq!(groups[1].0.len(), 2);
        assert_eq!(groups[1].1, None);
    }

    #[test]
    fn simple_external_pipeline_exit_code_is_last_stage() {
        let mut dispatch = NoBuiltins;
        let commands = vec![cmd("true", &[]), cmd("false", &[])];
        let code = run_pipeline_foreground(&commands, &mut dispatch).unwrap();
        assert_eq!(code, 1);
    }
}
