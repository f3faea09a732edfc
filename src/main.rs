//! den - an interactive command-line shell
//!
//! Usage:
//!   den                  Start the interactive REPL
//!   den script [args...] Execute a script file, with $0=script, $1..=args

use std::fs;
use std::process::ExitCode;

use den::builtins::run_line_in_shell;
use den::completion::CompositeCompleter;
use den::editor::LineEditor;
use den::highlight::{BasicHighlighter, Highlighter};
use den::prompt::{DefaultPromptRenderer, PromptContext, PromptRenderer};
use den::rcfile::load_denrc;
use den::shell::Shell;
use den::{builtins, signals};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Parsed command-line arguments, grounded on the teacher's `cli.rs`
/// flag-parsing style: a small hand-rolled scan rather than a clap-style
/// derive, since the teacher's own CLI surface is this small.
struct CliArgs {
    command: Option<String>,
    script: Option<String>,
    script_args: Vec<String>,
    help: bool,
    version: bool,
    norc: bool,
}

fn parse_args(args: &[String]) -> CliArgs {
    let mut cli = CliArgs {
        command: None,
        script: None,
        script_args: Vec::new(),
        help: false,
        version: false,
        norc: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--norc" => cli.norc = true,
            "-c" => {
                if i + 1 < args.len() {
                    cli.command = Some(args[i + 1..].join(" "));
                }
                return cli;
            }
            "--help" | "-h" => cli.help = true,
            "--version" | "-V" => cli.version = true,
            path => {
                cli.script = Some(path.to_string());
                cli.script_args = args[i + 1..].to_vec();
                return cli;
            }
        }
        i += 1;
    }

    cli
}

fn print_help() {
    println!(
        r#"den {VERSION} - an interactive command-line shell

USAGE:
    den                     Start the interactive REPL
    den <script> [args...]  Execute a script file
    den -c <command>        Execute a single command and exit
    den --norc              Skip sourcing ~/.denrc on startup
    den --help              Show this help message
    den --version           Show version
"#
    );
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let cli = parse_args(&args);

    if cli.help {
        print_help();
        return ExitCode::SUCCESS;
    }
    if cli.version {
        println!("den {VERSION}");
        return ExitCode::SUCCESS;
    }
    if let Some(command) = &cli.command {
        return run_command(command);
    }
    if let Some(script) = &cli.script {
        return run_script(script, cli.script_args.clone());
    }
    run_repl(cli.norc)
}

fn run_command(command: &str) -> ExitCode {
    let mut shell = match Shell::new("den", vec![]) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("den: {e}");
            return ExitCode::FAILURE;
        }
    };
    let code = run_line_in_shell(&mut shell, command);
    exit_code_for(code)
}

fn run_script(script: &str, script_args: Vec<String>) -> ExitCode {
    let content = match fs::read_to_string(script) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("den: {script}: {e}");
            return ExitCode::from(127);
        }
    };

    let mut shell = match Shell::new(script.to_string(), script_args) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("den: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut last_code = 0;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        last_code = run_line_in_shell(&mut shell, line);
        if shell.set_e && last_code != 0 {
            break;
        }
    }
    exit_code_for(last_code)
}

fn run_repl(norc: bool) -> ExitCode {
    let mut shell = match Shell::new("den", vec![]) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("den: {e}");
            return ExitCode::FAILURE;
        }
    };

    signals::setup_signal_handlers();

    if !norc {
        load_denrc(&mut shell);
    }

    let mut editor = LineEditor::new();
    let completer = CompositeCompleter::new();
    let highlighter = BasicHighlighter::new(builtins::BUILTIN_NAMES.to_vec());
    let mut prompt_renderer = DefaultPromptRenderer::new(&shell.config.prompt.clone());

    loop {
        if signals::check_sigterm() {
            break;
        }

        signals::reap_jobs(&mut shell.jobs);
        for job in shell.jobs.drain_done() {
            if let den::jobs::JobStatus::Done(code) = job.status {
                println!("[{}]  Done ({code})    {}", job.job_id, job.command);
            }
        }

        let ctx = PromptContext {
            cwd: &shell.cwd,
            last_exit_code: shell.last_exit_code,
            job_count: shell.jobs.len(),
            shell_name: &shell.shell_name,
        };
        let prompt = prompt_renderer.render_left(&ctx);
        let right_prompt = prompt_renderer.render_right(&ctx);

        match editor.read_line_with_right_prompt(
            &prompt,
            right_prompt.as_deref(),
            &shell.history,
            &completer,
            &highlighter as &dyn Highlighter,
        ) {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = shell.record_history(&line);
                let code = run_line_in_shell(&mut shell, &line);
                if shell.set_e && code != 0 {
                    break;
                }
            }
            Ok(None) => break,
            Err(_) => {
                shell.last_exit_code = 130;
                continue;
            }
        }
    }

    signals::shutdown_jobs(&shell.jobs, std::time::Duration::from_secs(2));
    exit_code_for(shell.last_exit_code)
}

fn exit_code_for(code: i32) -> ExitCode {
    ExitCode::from((code & 0xff) as u8)
}
