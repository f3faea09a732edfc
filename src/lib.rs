//! den - an interactive command-line shell
//!
//! # Overview
//!
//! `den` reads a line, tokenizes and parses it into a pipeline of commands
//! joined by `|`, `&&`, `||`, and `;`, expands variables/braces/globs in
//! each argument, then either dispatches a built-in in-process or spawns an
//! external process. Interactive use is backed by a line editor with
//! history search, tab completion, a kill ring, undo, and Vi/Emacs key
//! bindings; non-interactive use sources a script file one line at a time.
//!
//! # Example
//!
//! ```rust
//! use den::lexer::lex;
//! use den::parser::parse;
//!
//! let tokens = lex("echo hello | grep hello").unwrap();
//! let chain = parse(tokens).unwrap();
//! assert_eq!(chain.commands.len(), 2);
//! ```

pub mod builtins;
pub mod completion;
pub mod config;
pub mod editor;
pub mod env;
pub mod executor;
pub mod expander;
pub mod fuzzy;
pub mod highlight;
pub mod history;
pub mod jobs;
pub mod killring;
pub mod lexer;
pub mod model;
pub mod parser;
pub mod prompt;
pub mod rcfile;
pub mod shell;
pub mod signals;
pub mod terminal;
pub mod undo;

pub use builtins::run_line_in_shell;
pub use editor::LineEditor;
pub use env::{AliasTable, ArrayTable, Environment};
pub use executor::{run_chain, BuiltinDispatch, ChainOutcome, ExecError};
pub use expander::{expand_chain, ExpandError, ExpansionContext};
pub use history::{History, HistoryError};
pub use jobs::JobTable;
pub use lexer::{lex, LexError};
pub use parser::{parse, ParseError};
pub use shell::{Shell, ShellError};
