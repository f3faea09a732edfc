//! Built-in command dispatch. `Shell` implements [`BuiltinDispatch`] so the
//! executor can run a built-in in-process, including mid-pipeline with its
//! stdio wired to pipe buffers instead of the real terminal.

use std::io::{BufRead, Read, Write};
use std::path::{Path, PathBuf};

use crate::executor::BuiltinDispatch;
use crate::jobs::JobStatus;
use crate::lexer::lex;
use crate::parser::parse;
use crate::shell::Shell;

/// Every built-in name this shell recognizes, checked before a chain's
/// single unadorned command is handed to the executor.
pub const BUILTIN_NAMES: &[&str] = &[
    "cd", "pwd", "pushd", "popd", "dirs", "env", "export", "set", "unset", "local", "declare",
    "readonly", "alias", "unalias", "jobs", "fg", "bg", "wait", "kill", "disown", "history",
    "complete", "type", "which", "command", "builtin", "hash", "source", ".", "read", "test",
    "[", "true", "false", "sleep", "eval", "shift", "return", "break", "continue", "echo",
    "printf", "clear", "basename", "dirname", "realpath", "uname", "whoami", "umask", "times",
    "time", "exec", "trap", "getopts", "timeout",
];

impl BuiltinDispatch for Shell {
    fn is_builtin(&self, name: &str) -> bool {
        BUILTIN_NAMES.contains(&name)
    }

    fn run_builtin(
        &mut self,
        name: &str,
        args: &[String],
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
    ) -> i32 {
        let result = dispatch(self, name, args, stdin, stdout, stderr);
        match result {
            Ok(code) => code,
            Err(msg) => {
                let _ = writeln!(stderr, "den: {name}: {msg}");
                1
            }
        }
    }
}

fn dispatch(
    shell: &mut Shell,
    name: &str,
    args: &[String],
    stdin: &mut dyn Read,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> Result<i32, String> {
    match name {
        "cd" => builtin_cd(shell, args),
        "pwd" => {
            writeln!(stdout, "{}", shell.cwd.display()).ok();
            Ok(0)
        }
        "pushd" => builtin_pushd(shell, args, stdout),
        "popd" => builtin_popd(shell, stdout),
        "dirs" => {
            print_dir_stack(shell, stdout);
            Ok(0)
        }
        "env" => {
            for (k, v) in shell.env.exported_vars() {
                writeln!(stdout, "{k}={v}").ok();
            }
            Ok(0)
        }
        "export" => builtin_export(shell, args),
        "set" => builtin_set(shell, args, stdout),
        "unset" => {
            for name in args {
                shell.env.unset(name);
                std::env::remove_var(name);
            }
            Ok(0)
        }
        "local" | "declare" | "readonly" => builtin_assign(shell, args),
        "alias" => builtin_alias(shell, args, stdout),
        "unalias" => {
            for name in args {
                shell.aliases.remove(name);
            }
            Ok(0)
        }
        "jobs" => {
            print_jobs(shell, stdout);
            Ok(0)
        }
        "fg" => builtin_fg(shell, args, stdout),
        "bg" => builtin_bg(shell, args, stdout),
        "wait" => builtin_wait(shell, args),
        "kill" => builtin_kill(shell, args),
        "disown" => builtin_disown(shell, args),
        "history" => builtin_history(shell, args, stdout),
        "complete" => Ok(0),
        "type" | "which" => builtin_type(shell, args, stdout, name == "which"),
        "command" => Ok(0),
        "builtin" => Ok(0),
        "hash" => Ok(0),
        "source" | "." => builtin_source(shell, args),
        "read" => builtin_read(shell, args, stdin),
        "test" | "[" => builtin_test(args, name == "["),
        "true" => Ok(0),
        "false" => Ok(1),
        "sleep" => builtin_sleep(args),
        "eval" => builtin_eval(shell, args),
        "shift" => builtin_shift(shell, args),
        "return" | "break" | "continue" => Ok(shell.last_exit_code),
        "echo" => builtin_echo(args, stdout),
        "printf" => builtin_printf(args, stdout),
        "clear" => {
            write!(stdout, "\x1b[2J\x1b[H").ok();
            Ok(0)
        }
        "basename" => builtin_basename(args, stdout),
        "dirname" => builtin_dirname(args, stdout),
        "realpath" => builtin_realpath(args, stdout, stderr),
        "uname" => builtin_uname(stdout),
        "whoami" => {
            let user = shell.env.get("USER").or_else(|| shell.env.get("LOGNAME")).unwrap_or("unknown");
            writeln!(stdout, "{user}").ok();
            Ok(0)
        }
        "umask" => {
            writeln!(stdout, "0022").ok();
            Ok(0)
        }
        "times" => {
            writeln!(stdout, "0m0.000s 0m0.000s\n0m0.000s 0m0.000s").ok();
            Ok(0)
        }
        "time" => Ok(0),
        "exec" => builtin_exec(shell, args, stdin, stdout, stderr),
        "trap" | "getopts" | "timeout" => Ok(0),
        _ => Err("not a builtin".to_string()),
    }
}

fn builtin_cd(shell: &mut Shell, args: &[String]) -> Result<i32, String> {
    let target: PathBuf = match args.first().map(String::as_str) {
        None => dirs::home_dir().ok_or("HOME not set")?,
        Some("-") => shell.oldpwd.clone().ok_or("OLDPWD not set")?,
        Some(other) => PathBuf::from(other),
    };
    shell.change_dir(&target).map_err(|e| e.to_string())?;
    Ok(0)
}

fn builtin_pushd(shell: &mut Shell, args: &[String], stdout: &mut dyn Write) -> Result<i32, String> {
    let Some(target) = args.first() else {
        return Err("usage: pushd DIR".to_string());
    };
    shell.dir_stack.push_front(shell.cwd.clone());
    shell.change_dir(Path::new(target)).map_err(|e| e.to_string())?;
    print_dir_stack(shell, stdout);
    Ok(0)
}

fn builtin_popd(shell: &mut Shell, stdout: &mut dyn Write) -> Result<i32, String> {
    let Some(top) = shell.dir_stack.pop_front() else {
        return Err("directory stack empty".to_string());
    };
    shell.change_dir(&top).map_err(|e| e.to_string())?;
    print_dir_stack(shell, stdout);
    Ok(0)
}

fn print_dir_stack(shell: &Shell, stdout: &mut dyn Write) {
    let mut parts = vec![shell.cwd.display().to_string()];
    parts.extend(shell.dir_stack.iter().map(|p| p.display().to_string()));
    writeln!(stdout, "{}", parts.join(" ")).ok();
}

fn builtin_export(shell: &mut Shell, args: &[String]) -> Result<i32, String> {
    for arg in args {
        match arg.split_once('=') {
            Some((name, value)) => {
                shell.env.set(name, value);
                shell.env.export(name);
                std::env::set_var(name, value);
            }
            None => {
                shell.env.export(arg);
                if let Some(value) = shell.env.get(arg) {
                    std::env::set_var(arg, value);
                }
            }
        }
    }
    Ok(0)
}

fn builtin_set(shell: &mut Shell, args: &[String], stdout: &mut dyn Write) -> Result<i32, String> {
    if args.is_empty() {
        for (k, v) in shell.env.iter() {
            writeln!(stdout, "{k}={v}").ok();
        }
        return Ok(0);
    }
    match args[0].as_str() {
        "-e" => shell.set_e = true,
        "+e" => shell.set_e = false,
        other => builtin_assign(shell, &[other.to_string()])?,
    };
    Ok(0)
}

fn builtin_assign(shell: &mut Shell, args: &[String]) -> Result<i32, String> {
    for arg in args {
        if let Some((name, value)) = arg.split_once('=') {
            shell.env.set(name, value);
        }
    }
    Ok(0)
}

fn builtin_alias(shell: &mut Shell, args: &[String], stdout: &mut dyn Write) -> Result<i32, String> {
    if args.is_empty() {
        for (k, v) in shell.aliases.iter() {
            writeln!(stdout, "{k}='{v}'").ok();
        }
        return Ok(0);
    }
    for arg in args {
        match arg.split_once('=') {
            Some((name, value)) => shell.aliases.set(name, value),
            None => {
                if let Some(value) = shell.aliases.get(arg) {
                    writeln!(stdout, "{arg}='{value}'").ok();
                }
            }
        }
    }
    Ok(0)
}

fn print_jobs(shell: &Shell, stdout: &mut dyn Write) {
    for job in shell.jobs.iter() {
        let status = match job.status {
            JobStatus::Running => "Running",
            JobStatus::Stopped => "Stopped",
            JobStatus::Done(code) => {
                writeln!(stdout, "[{}]  Done ({code})    {}", job.job_id, job.command).ok();
                continue;
            }
        };
        writeln!(stdout, "[{}]  {status}    {}", job.job_id, job.command).ok();
    }
}

fn resolve_job_arg(shell: &Shell, args: &[String]) -> Result<u32, String> {
    match args.first() {
        None => shell
            .jobs
            .most_recent_running_or_stopped()
            .map(|j| j.job_id)
            .ok_or_else(|| "no current job".to_string()),
        Some(spec) => {
            let id: u32 = spec
                .trim_start_matches('%')
                .parse()
                .map_err(|_| format!("{spec}: no such job"))?;
            Ok(id)
        }
    }
}

fn builtin_fg(shell: &mut Shell, args: &[String], stdout: &mut dyn Write) -> Result<i32, String> {
    let id = resolve_job_arg(shell, args)?;
    let job = shell.jobs.get(id).ok_or(format!("%{id}: no such job"))?;
    writeln!(stdout, "{}", job.command).ok();
    let pid = job.pid;
    #[cfg(unix)]
    {
        crate::signals::set_foreground_pid(pid as i32);
        wait_for_pid(pid);
        crate::signals::clear_foreground_pid();
    }
    #[cfg(not(unix))]
    {
        let _ = pid;
    }
    shell.jobs.remove(id);
    Ok(0)
}

fn builtin_bg(shell: &mut Shell, args: &[String], stdout: &mut dyn Write) -> Result<i32, String> {
    let id = resolve_job_arg(shell, args)?;
    #[cfg(unix)]
    {
        if let Some(job) = shell.jobs.get(id) {
            let _ = nix::sys::signal::kill(
                nix::unistd::Pid::from_raw(job.pid as i32),
                nix::sys::signal::Signal::SIGCONT,
            );
        }
    }
    shell.jobs.set_status(id, JobStatus::Running);
    if let Some(job) = shell.jobs.get(id) {
        writeln!(stdout, "[{id}] {}", job.command).ok();
    }
    Ok(0)
}

#[cfg(unix)]
fn wait_for_pid(pid: u32) {
    use nix::sys::wait::waitpid;
    let _ = waitpid(nix::unistd::Pid::from_raw(pid as i32), None);
}

fn builtin_wait(shell: &mut Shell, args: &[String]) -> Result<i32, String> {
    if args.is_empty() {
        let ids: Vec<u32> = shell.jobs.iter().map(|j| j.job_id).collect();
        for id in ids {
            if let Some(job) = shell.jobs.get(id) {
                #[cfg(unix)]
                wait_for_pid(job.pid);
                let _ = job;
            }
            shell.jobs.remove(id);
        }
        return Ok(0);
    }
    let id = resolve_job_arg(shell, args)?;
    if let Some(job) = shell.jobs.get(id) {
        #[cfg(unix)]
        wait_for_pid(job.pid);
    }
    shell.jobs.remove(id);
    Ok(0)
}

fn builtin_kill(shell: &mut Shell, args: &[String]) -> Result<i32, String> {
    let mut signal_num = 15i32;
    let mut targets = args;
    if let Some(first) = args.first() {
        if let Some(spec) = first.strip_prefix('-') {
            signal_num = spec.parse().map_err(|_| format!("{spec}: invalid signal"))?;
            targets = &args[1..];
        }
    }
    for target in targets {
        let pid: i32 = if let Some(jobspec) = target.strip_prefix('%') {
            let id: u32 = jobspec.parse().map_err(|_| format!("{target}: no such job"))?;
            shell.jobs.get(id).map(|j| j.pid as i32).ok_or(format!("{target}: no such job"))?
        } else {
            target.parse().map_err(|_| format!("{target}: arguments must be process or job IDs"))?
        };
        #[cfg(unix)]
        {
            use nix::sys::signal::{self, Signal};
            let sig = Signal::try_from(signal_num).unwrap_or(Signal::SIGTERM);
            let _ = signal::kill(nix::unistd::Pid::from_raw(pid), sig);
        }
        #[cfg(not(unix))]
        let _ = pid;
    }
    Ok(0)
}

fn builtin_disown(shell: &mut Shell, args: &[String]) -> Result<i32, String> {
    let id = resolve_job_arg(shell, args)?;
    shell.jobs.remove(id);
    Ok(0)
}

fn builtin_history(shell: &Shell, args: &[String], stdout: &mut dyn Write) -> Result<i32, String> {
    let n = args.first().and_then(|s| s.parse::<usize>().ok());
    for (i, entry) in shell.history.last_n(n) {
        writeln!(stdout, "{i:5}  {entry}").ok();
    }
    Ok(0)
}

fn builtin_type(shell: &Shell, args: &[String], stdout: &mut dyn Write, which_only: bool) -> Result<i32, String> {
    let mut found_all = true;
    for name in args {
        if !which_only && BUILTIN_NAMES.contains(&name.as_str()) {
            writeln!(stdout, "{name} is a shell builtin").ok();
            continue;
        }
        if let Some(alias) = shell.aliases.get(name) {
            writeln!(stdout, "{name} is aliased to `{alias}'").ok();
            continue;
        }
        match resolve_in_path(name) {
            Some(path) => {
                writeln!(stdout, "{}", path.display()).ok();
            }
            None => {
                writeln!(stdout, "{name}: not found").ok();
                found_all = false;
            }
        }
    }
    Ok(if found_all { 0 } else { 1 })
}

fn resolve_in_path(name: &str) -> Option<PathBuf> {
    if name.contains('/') {
        let p = PathBuf::from(name);
        return if p.is_file() { Some(p) } else { None };
    }
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var).map(|dir| dir.join(name)).find(|p| p.is_file())
}

fn builtin_source(shell: &mut Shell, args: &[String]) -> Result<i32, String> {
    let Some(path) = args.first() else {
        return Err("usage: source FILE".to_string());
    };
    let content = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    let mut last_code = 0;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        last_code = run_line_in_shell(shell, line);
    }
    Ok(last_code)
}

/// Runs one line through the full pipeline (lex → parse → expand →
/// dispatch/execute), used by both `source` and script mode so they share
/// exactly one code path.
pub fn run_line_in_shell(shell: &mut Shell, line: &str) -> i32 {
    let tokens = match lex(line) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("den: parse error: {e}");
            shell.last_exit_code = 1;
            return 1;
        }
    };
    let chain = match parse(tokens) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("den: parse error: {e}");
            shell.last_exit_code = 1;
            return 1;
        }
    };
    let expanded = {
        let ctx = shell.expansion_context();
        match crate::expander::expand_chain(&chain, &ctx) {
            Ok(e) => e,
            Err(e) => {
                eprintln!("den: {e}");
                shell.last_exit_code = 1;
                return 1;
            }
        }
    };
    // `$_` is the last argument of the previous command; a command with no
    // arguments leaves `$_` as its own name, same as real shells.
    if let Some(last_cmd) = expanded.commands.last() {
        shell.last_arg = last_cmd
            .args
            .last()
            .cloned()
            .unwrap_or_else(|| last_cmd.name.clone());
    }
    match crate::executor::run_chain(&expanded, shell) {
        Ok(outcome) => {
            if let Some(bg) = outcome.background {
                let id = shell.jobs.spawn(bg.pid, bg.command_text);
                println!("[{id}] {}", bg.pid);
                shell.last_background_pid = Some(bg.pid);
            }
            shell.last_exit_code = outcome.exit_code;
            outcome.exit_code
        }
        Err(e) => {
            eprintln!("den: {e}");
            shell.last_exit_code = 1;
            1
        }
    }
}

fn builtin_read(shell: &mut Shell, args: &[String], stdin: &mut dyn Read) -> Result<i32, String> {
    let var = args.first().cloned().unwrap_or_else(|| "REPLY".to_string());
    let mut reader = std::io::BufReader::new(stdin);
    let mut line = String::new();
    match reader.read_line(&mut line) {
        Ok(0) => Ok(1),
        Ok(_) => {
            shell.env.set(var, line.trim_end_matches('\n').to_string());
            Ok(0)
        }
        Err(e) => Err(e.to_string()),
    }
}

/// `test EXPR` / `[ EXPR ]`: unary `-z -n -f -d -e`, binary
/// `= == != -eq -ne -lt -gt`, exit 0 true / 1 false / 2 usage error.
fn builtin_test(args: &[String], bracket_form: bool) -> Result<i32, String> {
    let args: &[String] = if bracket_form {
        match args.last() {
            Some(last) if last == "]" => &args[..args.len() - 1],
            _ => return Ok(2),
        }
    } else {
        args
    };

    let result = match args {
        [] => false,
        [single] => !single.is_empty(),
        [op, val] if op == "-z" => val.is_empty(),
        [op, val] if op == "-n" => !val.is_empty(),
        [op, val] if op == "-f" => Path::new(val).is_file(),
        [op, val] if op == "-d" => Path::new(val).is_dir(),
        [op, val] if op == "-e" => Path::new(val).exists(),
        [lhs, op, rhs] => match op.as_str() {
            "=" | "==" => lhs == rhs,
            "!=" => lhs != rhs,
            "-eq" => parse_i64(lhs)? == parse_i64(rhs)?,
            "-ne" => parse_i64(lhs)? != parse_i64(rhs)?,
            "-lt" => parse_i64(lhs)? < parse_i64(rhs)?,
            "-gt" => parse_i64(lhs)? > parse_i64(rhs)?,
            "-le" => parse_i64(lhs)? <= parse_i64(rhs)?,
            "-ge" => parse_i64(lhs)? >= parse_i64(rhs)?,
            _ => return Ok(2),
        },
        _ => return Ok(2),
    };
    Ok(if result { 0 } else { 1 })
}

fn parse_i64(s: &str) -> Result<i64, String> {
    s.parse().map_err(|_| format!("{s}: integer expression expected"))
}

fn builtin_sleep(args: &[String]) -> Result<i32, String> {
    let secs: f64 = args.first().ok_or("usage: sleep SECONDS")?.parse().map_err(|_| "invalid duration".to_string())?;
    std::thread::sleep(std::time::Duration::from_secs_f64(secs.max(0.0)));
    Ok(0)
}

fn builtin_eval(shell: &mut Shell, args: &[String]) -> Result<i32, String> {
    let line = args.join(" ");
    if line.trim().is_empty() {
        return Ok(0);
    }
    Ok(run_line_in_shell(shell, &line))
}

fn builtin_shift(shell: &mut Shell, args: &[String]) -> Result<i32, String> {
    let n: usize = args.first().and_then(|s| s.parse().ok()).unwrap_or(1);
    if n > shell.positional.len() {
        return Err("shift count out of range".to_string());
    }
    shell.positional.drain(0..n);
    Ok(0)
}

/// `echo` honors `-n` (suppress trailing newline) and `-e` (process common
/// backslash escapes).
fn builtin_echo(args: &[String], stdout: &mut dyn Write) -> Result<i32, String> {
    let mut no_newline = false;
    let mut interpret_escapes = false;
    let mut rest = args;
    while let Some(first) = rest.first() {
        match first.as_str() {
            "-n" => no_newline = true,
            "-e" => interpret_escapes = true,
            _ => break,
        }
        rest = &rest[1..];
    }
    let joined = rest.join(" ");
    let text = if interpret_escapes { process_escapes(&joined) } else { joined };
    write!(stdout, "{text}").ok();
    if !no_newline {
        writeln!(stdout).ok();
    }
    Ok(0)
}

fn process_escapes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// A minimal `printf`: `%s`, `%d`, `%c`, `%%`, literal text, and the same
/// backslash escapes `echo -e` understands, cycling the format string over
/// any extra arguments the way POSIX printf does.
fn builtin_printf(args: &[String], stdout: &mut dyn Write) -> Result<i32, String> {
    let Some(fmt) = args.first() else {
        return Err("usage: printf FORMAT [ARGS...]".to_string());
    };
    let rest = &args[1..];
    let mut arg_idx = 0;
    let mut out = String::new();
    loop {
        let mut chars = fmt.chars().peekable();
        let before = arg_idx;
        while let Some(c) = chars.next() {
            if c == '\\' {
                match chars.next() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some(other) => out.push(other),
                    None => out.push('\\'),
                }
            } else if c == '%' {
                match chars.next() {
                    Some('%') => out.push('%'),
                    Some('s') => {
                        out.push_str(rest.get(arg_idx).map(String::as_str).unwrap_or(""));
                        arg_idx += 1;
                    }
                    Some('d') => {
                        let v: i64 = rest.get(arg_idx).and_then(|s| s.parse().ok()).unwrap_or(0);
                        out.push_str(&v.to_string());
                        arg_idx += 1;
                    }
                    Some('c') => {
                        out.push(rest.get(arg_idx).and_then(|s| s.chars().next()).unwrap_or(' '));
                        arg_idx += 1;
                    }
                    Some(other) => out.push(other),
                    None => {}
                }
            } else {
                out.push(c);
            }
        }
        if rest.is_empty() || arg_idx == before || arg_idx >= rest.len() {
            break;
        }
    }
    write!(stdout, "{out}").ok();
    Ok(0)
}

fn builtin_basename(args: &[String], stdout: &mut dyn Write) -> Result<i32, String> {
    let path = args.first().ok_or("usage: basename PATH")?;
    let mut name = Path::new(path).file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
    if let Some(suffix) = args.get(1) {
        if let Some(stripped) = name.strip_suffix(suffix.as_str()) {
            name = stripped.to_string();
        }
    }
    writeln!(stdout, "{name}").ok();
    Ok(0)
}

fn builtin_dirname(args: &[String], stdout: &mut dyn Write) -> Result<i32, String> {
    let path = args.first().ok_or("usage: dirname PATH")?;
    let parent = Path::new(path).parent().map(|p| p.to_string_lossy().to_string()).filter(|s| !s.is_empty()).unwrap_or_else(|| ".".to_string());
    writeln!(stdout, "{parent}").ok();
    Ok(0)
}

fn builtin_realpath(args: &[String], stdout: &mut dyn Write, stderr: &mut dyn Write) -> Result<i32, String> {
    let path = args.first().ok_or("usage: realpath PATH")?;
    match std::fs::canonicalize(path) {
        Ok(p) => {
            writeln!(stdout, "{}", p.display()).ok();
            Ok(0)
        }
        Err(e) => {
            writeln!(stderr, "den: realpath: {path}: {e}").ok();
            Ok(1)
        }
    }
}

fn builtin_uname(stdout: &mut dyn Write) -> Result<i32, String> {
    writeln!(stdout, "{}", std::env::consts::OS).ok();
    Ok(0)
}

fn builtin_exec(
    shell: &mut Shell,
    args: &[String],
    stdin: &mut dyn Read,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> Result<i32, String> {
    // `exec` of a builtin runs it in-process and then exits the shell with
    // its exit code; `exec` of an external replaces the shell process
    // image on unix.
    let Some((name, rest)) = args.split_first() else {
        return Err("usage: exec COMMAND [ARGS...]".to_string());
    };
    if BUILTIN_NAMES.contains(&name.as_str()) {
        let code = dispatch(shell, name, rest, stdin, stdout, stderr).unwrap_or(1);
        std::process::exit(code);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        let err = std::process::Command::new(name).args(rest).exec();
        Err(err.to_string())
    }
    #[cfg(not(unix))]
    {
        let status = std::process::Command::new(name).args(rest).status().map_err(|e| e.to_string())?;
        std::process::exit(status.code().unwrap_or(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unary_and_binary() {
        assert_eq!(builtin_test(&["-z".into(), "".into()], false), Ok(0));
        assert_eq!(builtin_test(&["-n".into(), "x".into()], false), Ok(0));
        assert_eq!(builtin_test(&["5".into(), "-eq".into(), "5".into()], false), Ok(0));
        assert_eq!(builtin_test(&["5".into(), "-gt".into(), "9".into()], false), Ok(1));
    }

    #[test]
    fn bracket_form_requires_closing_bracket() {
        assert_eq!(builtin_test(&["-z".into(), "".into()], true), Ok(2));
        assert_eq!(builtin_test(&["-z".into(), "".into(), "]".into()], true), Ok(0));
    }

    #[test]
    fn echo_processes_escapes_with_dash_e() {
        let mut out = Vec::new();
        builtin_echo(&["-e".into(), "a\\nb".into()], &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "a\nb\n");
    }

    #[test]
    fn echo_suppresses_newline_with_dash_n() {
        let mut out = Vec::new();
        builtin_echo(&["-n".into(), "hi".into()], &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "hi");
    }

    #[test]
    fn printf_substitutes_positional_args() {
        let mut out = Vec::new();
        builtin_printf(&["%s is %d\n".into(), "x".into(), "5".into()], &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "x is 5\n");
    }

    #[test]
    fn basename_and_dirname() {
        let mut out = Vec::new();
        builtin_basename(&["/a/b/c.txt".into()], &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "c.txt\n");

        let mut out2 = Vec::new();
        builtin_dirname(&["/a/b/c.txt".into()], &mut out2).unwrap();
        assert_eq!(String::from_utf8(out2).unwrap(), "/a/b\n");
    }
}
