//! Parser: converts a token stream into a [`CommandChain`].
//!
//! Grammar:
//! ```text
//! chain       := pipeline (LOGICAL_OP pipeline)*
//! pipeline    := command (PIPE command)*
//! command     := WORD (WORD | redirection)*
//! redirection := REDIR_OP WORD
//! ```

use thiserror::Error;

use crate::lexer::lex;
use crate::model::{CommandChain, Operator, ParsedCommand, RedirKind, Token};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("unexpected token: {0:?}")]
    UnexpectedToken(Token),
    #[error("missing redirection target")]
    MissingRedirectionTarget,
    #[error("empty command")]
    EmptyCommand,
    #[error("empty input")]
    EmptyInput,
    #[error("operator at start of input")]
    OperatorAtStart,
    #[error("operator at end of input")]
    OperatorAtEnd,
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn parse_chain(&mut self) -> Result<CommandChain, ParseError> {
        if self.is_at_end() {
            return Err(ParseError::EmptyInput);
        }
        if matches!(
            self.peek(),
            Some(Token::Pipe | Token::And | Token::Or | Token::Semicolon | Token::Background)
        ) {
            return Err(ParseError::OperatorAtStart);
        }

        let mut commands = vec![self.parse_pipeline_first()?];
        let mut operators = Vec::new();

        loop {
            match self.peek() {
                Some(Token::And) => {
                    self.advance();
                    operators.push(Operator::And);
                }
                Some(Token::Or) => {
                    self.advance();
                    operators.push(Operator::Or);
                }
                Some(Token::Semicolon) => {
                    self.advance();
                    operators.push(Operator::Sequence);
                }
                Some(Token::Background) => {
                    self.advance();
                    operators.push(Operator::Background);
                    if self.is_at_end() {
                        break;
                    }
                    // `&` may also separate two pipelines, e.g. `a & b`.
                }
                Some(Token::Pipe) => {
                    self.advance();
                    operators.push(Operator::Pipe);
                }
                None => break,
                Some(other) => return Err(ParseError::UnexpectedToken(other.clone())),
            }

            if self.is_at_end() {
                if matches!(operators.last(), Some(Operator::Background)) {
                    break;
                }
                return Err(ParseError::OperatorAtEnd);
            }
            let cmd = self.parse_command()?;
            commands.push(cmd);
        }

        Ok(CommandChain {
            commands,
            operators,
        })
    }

    fn parse_pipeline_first(&mut self) -> Result<ParsedCommand, ParseError> {
        self.parse_command()
    }

    fn parse_command(&mut self) -> Result<ParsedCommand, ParseError> {
        let name = match self.peek() {
            Some(Token::Word(_)) => self.advance().unwrap(),
            Some(other) => return Err(ParseError::UnexpectedToken(other.clone())),
            None => return Err(ParseError::UnexpectedEof),
        };

        let mut cmd = ParsedCommand::new(name);
        if matches!(&cmd.name, Token::Word(segs) if segs.is_empty()) {
            return Err(ParseError::EmptyCommand);
        }

        loop {
            match self.peek() {
                Some(Token::Word(_)) => {
                    cmd.args.push(self.advance().unwrap());
                }
                Some(Token::RedirIn) => {
                    self.advance();
                    cmd.redirections
                        .push((RedirKind::Stdin, self.expect_redirect_target()?));
                }
                Some(Token::RedirOut) => {
                    self.advance();
                    cmd.redirections
                        .push((RedirKind::StdoutOverwrite, self.expect_redirect_target()?));
                }
                Some(Token::RedirAppend) => {
                    self.advance();
                    cmd.redirections
                        .push((RedirKind::StdoutAppend, self.expect_redirect_target()?));
                }
                Some(Token::RedirErr) => {
                    self.advance();
                    cmd.redirections
                        .push((RedirKind::StderrOverwrite, self.expect_redirect_target()?));
                }
                Some(Token::RedirErrAppend) => {
                    self.advance();
                    cmd.redirections
                        .push((RedirKind::StderrAppend, self.expect_redirect_target()?));
                }
                Some(Token::RedirBoth) => {
                    self.advance();
                    cmd.redirections.push((
                        RedirKind::CombineStderrToStdout,
                        self.expect_redirect_target()?,
                    ));
                }
                _ => break,
            }
        }

        Ok(cmd)
    }

    fn expect_redirect_target(&mut self) -> Result<Token, ParseError> {
        match self.peek() {
            Some(Token::Word(segs)) if !segs.is_empty() => Ok(self.advance().unwrap()),
            Some(_) | None => Err(ParseError::MissingRedirectionTarget),
        }
    }
}

/// Parse a token stream into a [`CommandChain`].
pub fn parse(tokens: Vec<Token>) -> Result<CommandChain, ParseError> {
    Parser::new(tokens).parse_chain()
}

/// Convenience: lex then parse, mapping lex errors through a unified
/// string so callers that only care about "something went wrong with
/// this raw line" don't need two error types. Structured callers should
/// call `lex`/`parse` directly to keep `LexError` distinct from `ParseError`.
pub fn lex_and_parse(input: &str) -> Result<CommandChain, String> {
    let tokens = lex(input).map_err(|e| e.to_string())?;
    parse(tokens).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::WordSegment;

    fn w(s: &str) -> Token {
        Token::Word(vec![WordSegment::Bare(s.to_string())])
    }

    #[test]
    fn parse_simple_command() {
        let chain = parse(lex("echo hello world").unwrap()).unwrap();
        assert_eq!(chain.commands.len(), 1);
        assert_eq!(chain.commands[0].name, w("echo"));
        assert_eq!(chain.commands[0].args, vec![w("hello"), w("world")]);
        assert!(chain.is_well_formed());
    }

    #[test]
    fn parse_pipeline() {
        let chain = parse(lex("ls -la | grep foo | wc -l").unwrap()).unwrap();
        assert_eq!(chain.commands.len(), 3);
        assert_eq!(chain.operators, vec![Operator::Pipe, Operator::Pipe]);
        assert!(chain.is_well_formed());
    }

    #[test]
    fn parse_logical_chain() {
        let chain = parse(lex("false && echo yes ; echo done").unwrap()).unwrap();
        assert_eq!(chain.commands.len(), 3);
        assert_eq!(
            chain.operators,
            vec![Operator::And, Operator::Sequence]
        );
    }

    #[test]
    fn parse_redirections() {
        let chain = parse(lex("printf x | head -n 2 > out.txt").unwrap()).unwrap();
        assert_eq!(chain.commands[1].redirections.len(), 1);
        assert_eq!(chain.commands[1].redirections[0].0, RedirKind::StdoutOverwrite);
        assert_eq!(chain.commands[1].redirections[0].1, w("out.txt"));
    }

    #[test]
    fn parse_background() {
        let chain = parse(lex("sleep 1 &").unwrap()).unwrap();
        assert!(chain.is_background());
        assert_eq!(chain.commands.len(), 1);
    }

    #[test]
    fn parse_missing_redirect_target_errors() {
        let err = parse(lex("echo hi >").unwrap()).unwrap_err();
        assert_eq!(err, ParseError::MissingRedirectionTarget);
    }

    #[test]
    fn parse_operator_at_start_errors() {
        let err = parse(lex("| echo hi").unwrap()).unwrap_err();
        assert_eq!(err, ParseError::OperatorAtStart);
    }

    #[test]
    fn parse_operator_at_end_errors() {
        let err = parse(lex("echo hi |").unwrap()).unwrap_err();
        assert_eq!(err, ParseError::OperatorAtEnd);
    }

    #[test]
    fn parse_empty_input_errors() {
        let err = parse(lex("").unwrap()).unwrap_err();
        assert_eq!(err, ParseError::EmptyInput);
    }

    #[test]
    fn commands_len_equals_operators_len_plus_one() {
        let chain = parse(lex("a | b && c ; d || e").unwrap()).unwrap();
        assert_eq!(chain.commands.len(), chain.operators.len() + 1);
    }
}
