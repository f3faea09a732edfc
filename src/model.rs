//! Shared data types for the tokenizer, parser, expander, and executor.

use std::fmt;

/// A single lexical unit produced by the tokenizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A word, with quoting metadata so the expander knows which spans
    /// were literal (single-quoted), escape-aware (double-quoted), or
    /// bare (unquoted, eligible for glob/brace expansion).
    Word(Vec<WordSegment>),
    Pipe,
    And,
    Or,
    Semicolon,
    Background,
    RedirIn,
    RedirOut,
    RedirAppend,
    RedirErr,
    RedirErrAppend,
    RedirBoth,
}

/// One contiguous run of a word, tagged with how it was quoted.
/// The expander treats `Bare` runs as eligible for brace/glob expansion
/// and `Single`/`Double` runs as literal (glob/brace excluded); `Double`
/// runs still undergo variable expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WordSegment {
    Bare(String),
    Single(String),
    Double(String),
}

impl Token {
    /// Render a Word token back to its raw (unexpanded) text, concatenating
    /// all segments without their quote markers. Used for alias lookup on
    /// a command name and for diagnostics.
    pub fn word_text(&self) -> Option<String> {
        match self {
            Token::Word(segs) => Some(
                segs.iter()
                    .map(|s| match s {
                        WordSegment::Bare(t) | WordSegment::Single(t) | WordSegment::Double(t) => {
                            t.as_str()
                        }
                    })
                    .collect(),
            ),
            _ => None,
        }
    }
}

/// Logical/sequencing operator joining pipeline stages or whole pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Pipe,
    And,
    Or,
    Sequence,
    Background,
}

/// A single redirection attached to a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirection {
    pub kind: RedirKind,
    pub target: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirKind {
    Stdin,
    StdoutOverwrite,
    StdoutAppend,
    StderrOverwrite,
    StderrAppend,
    CombineStderrToStdout,
}

/// A fully parsed (but not yet expanded) command: a name, its arguments,
/// and any redirections, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub name: Token,
    pub args: Vec<Token>,
    pub redirections: Vec<(RedirKind, Token)>,
}

impl ParsedCommand {
    pub fn new(name: Token) -> Self {
        ParsedCommand {
            name,
            args: Vec::new(),
            redirections: Vec::new(),
        }
    }
}

/// A sequence of commands joined by operators: `commands.len() == operators.len() + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandChain {
    pub commands: Vec<ParsedCommand>,
    pub operators: Vec<Operator>,
}

impl CommandChain {
    pub fn single(cmd: ParsedCommand) -> Self {
        CommandChain {
            commands: vec![cmd],
            operators: Vec::new(),
        }
    }

    /// Invariant check: commands.len == operators.len + 1.
    pub fn is_well_formed(&self) -> bool {
        self.commands.len() == self.operators.len() + 1
    }

    /// True if the terminal operator is Background; that operator applies
    /// to the whole preceding pipeline, not just the last command.
    pub fn is_background(&self) -> bool {
        matches!(self.operators.last(), Some(Operator::Background))
    }
}

/// An expanded command ready for dispatch: name/args are plain strings,
/// redirection targets are plain strings. Produced by the expander from a
/// `ParsedCommand`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExpandedCommand {
    pub name: String,
    pub args: Vec<String>,
    pub redirections: Vec<Redirection>,
}

/// A chain of expanded commands, mirroring `CommandChain` but post-expansion.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExpandedChain {
    pub commands: Vec<ExpandedCommand>,
    pub operators: Vec<Operator>,
}

impl ExpandedChain {
    pub fn is_background(&self) -> bool {
        matches!(self.operators.last(), Some(Operator::Background))
    }
}

/// A parse-time source position, used in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub byte_offset: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "offset {}", self.byte_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_well_formed_single() {
        let chain = CommandChain::single(ParsedCommand::new(Token::Word(vec![WordSegment::Bare(
            "echo".into(),
        )])));
        assert!(chain.is_well_formed());
        assert!(!chain.is_background());
    }

    #[test]
    fn chain_well_formed_multi() {
        let cmd = |n: &str| ParsedCommand::new(Token::Word(vec![WordSegment::Bare(n.into())]));
        let chain = CommandChain {
            commands: vec![cmd("a"), cmd("b"), cmd("c")],
            operators: vec![Operator::Pipe, Operator::And],
        };
        assert!(chain.is_well_formed());
    }

    #[test]
    fn chain_background_applies_to_whole_chain() {
        let cmd = |n: &str| ParsedCommand::new(Token::Word(vec![WordSegment::Bare(n.into())]));
        let chain = CommandChain {
            commands: vec![cmd("sleep"), cmd("1")],
            operators: vec![Operator::Background],
        };
        assert!(chain.is_background());
    }

    #[test]
    fn word_text_concatenates_segments() {
        let tok = Token::Word(vec![
            WordSegment::Bare("hello".into()),
            WordSegment::Double(" world".into()),
        ]);
        assert_eq!(tok.word_text().unwrap(), "hello world");
    }
}
