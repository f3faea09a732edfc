//! Tokenizer: turns one logical line into a stream of [`Token`]s.
//!
//! Structured as `nom` combinators, one per token shape, combined with
//! `alt` — multi-char operators and quoted strings are tried before
//! single-char operators, which are tried before bare words, so that e.g.
//! `&&` is never split into two `&` tokens.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::char as nom_char,
    combinator::{map, recognize},
    multi::many0,
    IResult,
};
use thiserror::Error;

use crate::model::{Token, WordSegment};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LexError {
    #[error("unterminated single-quoted string")]
    UnterminatedSingleQuote,
    #[error("unterminated double-quoted string")]
    UnterminatedDoubleQuote,
    #[error("unexpected character: {0:?}")]
    UnexpectedChar(char),
    #[error("trailing backslash with nothing to escape")]
    DanglingBackslash,
}

fn is_meta(c: char) -> bool {
    matches!(c, '|' | '&' | ';' | '<' | '>' | ' ' | '\t' | '\n')
}

fn single_quoted(input: &str) -> IResult<&str, WordSegment> {
    let (rest, _) = nom_char('\'')(input)?;
    match rest.find('\'') {
        Some(end) => {
            let content = &rest[..end];
            Ok((&rest[end + 1..], WordSegment::Single(content.to_string())))
        }
        None => Err(nom::Err::Failure(nom::error::Error::new(
            rest,
            nom::error::ErrorKind::Char,
        ))),
    }
}

/// Double-quoted string. Honors backslash escapes for `\`, `"`, `$`, and
/// backtick; any other escaped char keeps both the backslash and the char
/// (bash-compatible behavior).
fn double_quoted(input: &str) -> IResult<&str, WordSegment> {
    let (mut rest, _) = nom_char('"')(input)?;
    let mut out = String::new();
    loop {
        match rest.chars().next() {
            None => {
                return Err(nom::Err::Failure(nom::error::Error::new(
                    rest,
                    nom::error::ErrorKind::Char,
                )))
            }
            Some('"') => {
                rest = &rest[1..];
                break;
            }
            Some('\\') => {
                let after = &rest[1..];
                match after.chars().next() {
                    Some(c @ ('\\' | '"' | '$' | '`')) => {
                        out.push(c);
                        rest = &after[c.len_utf8()..];
                    }
                    Some(c) => {
                        out.push('\\');
                        out.push(c);
                        rest = &after[c.len_utf8()..];
                    }
                    None => {
                        return Err(nom::Err::Failure(nom::error::Error::new(
                            rest,
                            nom::error::ErrorKind::Char,
                        )))
                    }
                }
            }
            Some(c) => {
                out.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }
    Ok((rest, WordSegment::Double(out)))
}

/// An unquoted run of non-whitespace, non-metachar bytes. A backslash
/// outside quotes escapes the very next char (including whitespace/metachars).
fn bare_run(input: &str) -> IResult<&str, WordSegment> {
    let mut rest = input;
    let mut out = String::new();
    let mut consumed_any = false;
    loop {
        match rest.chars().next() {
            Some('\\') => {
                let after = &rest[1..];
                match after.chars().next() {
                    Some(c) => {
                        out.push(c);
                        rest = &after[c.len_utf8()..];
                        consumed_any = true;
                    }
                    None => break,
                }
            }
            Some(c) if !is_meta(c) && c != '\'' && c != '"' => {
                out.push(c);
                rest = &rest[c.len_utf8()..];
                consumed_any = true;
            }
            _ => break,
        }
    }
    if consumed_any {
        Ok((rest, WordSegment::Bare(out)))
    } else {
        Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::TakeWhile1,
        )))
    }
}

fn word_segment(input: &str) -> IResult<&str, WordSegment> {
    alt((single_quoted, double_quoted, bare_run))(input)
}

fn word(input: &str) -> IResult<&str, Token> {
    map(many0(word_segment), Token::Word)(input)
}

fn operator(input: &str) -> IResult<&str, Token> {
    alt((
        map(tag("&&"), |_| Token::And),
        map(tag("||"), |_| Token::Or),
        map(tag(">>"), |_| Token::RedirAppend),
        map(tag("2>>"), |_| Token::RedirErrAppend),
        map(tag("2>"), |_| Token::RedirErr),
        map(tag("&>"), |_| Token::RedirBoth),
        map(nom_char('|'), |_| Token::Pipe),
        map(nom_char('&'), |_| Token::Background),
        map(nom_char(';'), |_| Token::Semicolon),
        map(nom_char('<'), |_| Token::RedirIn),
        map(nom_char('>'), |_| Token::RedirOut),
    ))(input)
}

fn whitespace(input: &str) -> IResult<&str, &str> {
    recognize(take_while1(|c: char| c == ' ' || c == '\t' || c == '\n'))(input)
}

fn token(input: &str) -> IResult<&str, Token> {
    // Multi-char / single-char operators are tried before bare words so
    // that e.g. `2>>` is not swallowed as part of a word.
    alt((operator, word))(input)
}

/// Lex one logical line (which may contain embedded `\n` from multi-line
/// accumulation) into a flat token stream.
pub fn lex(input: &str) -> Result<Vec<Token>, LexError> {
    let mut tokens = Vec::new();
    let mut rest = input;

    loop {
        if rest.is_empty() {
            break;
        }
        if let Ok((r, _)) = whitespace(rest) {
            rest = r;
            continue;
        }
        // Detect an opened-but-unterminated quote up front so we can
        // report a precise error instead of nom's generic failure.
        if let Some(stripped) = rest.strip_prefix('\'') {
            if !stripped.contains('\'') {
                return Err(LexError::UnterminatedSingleQuote);
            }
        }
        if rest.starts_with('"') && has_unterminated_double_quote(rest) {
            return Err(LexError::UnterminatedDoubleQuote);
        }
        match token(rest) {
            Ok((r, tok)) => {
                if r.len() == rest.len() {
                    // no progress made; avoid infinite loop
                    return Err(LexError::UnexpectedChar(rest.chars().next().unwrap()));
                }
                tokens.push(tok);
                rest = r;
            }
            Err(_) => {
                if rest.ends_with('\\') && !rest.ends_with("\\\\") {
                    return Err(LexError::DanglingBackslash);
                }
                return Err(LexError::UnexpectedChar(rest.chars().next().unwrap()));
            }
        }
    }

    Ok(tokens)
}

fn has_unterminated_double_quote(input: &str) -> bool {
    let chars = input.chars().skip(1);
    let mut escaped = false;
    for c in chars {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' => return false,
            _ => {}
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lex_simple_command() {
        let tokens = lex("echo hello").unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].word_text().unwrap(), "echo");
        assert_eq!(tokens[1].word_text().unwrap(), "hello");
    }

    #[test]
    fn lex_pipe() {
        let tokens = lex("ls | grep foo").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Word(vec![WordSegment::Bare("ls".into())]),
                Token::Pipe,
                Token::Word(vec![WordSegment::Bare("grep".into())]),
                Token::Word(vec![WordSegment::Bare("foo".into())]),
            ]
        );
    }

    #[test]
    fn lex_and_or_sequence() {
        let tokens = lex("a && b || c ; d").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Word(vec![WordSegment::Bare("a".into())]),
                Token::And,
                Token::Word(vec![WordSegment::Bare("b".into())]),
                Token::Or,
                Token::Word(vec![WordSegment::Bare("c".into())]),
                Token::Semicolon,
                Token::Word(vec![WordSegment::Bare("d".into())]),
            ]
        );
    }

    #[test]
    fn lex_redirections() {
        let tokens = lex("cmd < in > out 2>> err &> both").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Word(vec![WordSegment::Bare("cmd".into())]),
                Token::RedirIn,
                Token::Word(vec![WordSegment::Bare("in".into())]),
                Token::RedirOut,
                Token::Word(vec![WordSegment::Bare("out".into())]),
                Token::RedirErrAppend,
                Token::Word(vec![WordSegment::Bare("err".into())]),
                Token::RedirBoth,
                Token::Word(vec![WordSegment::Bare("both".into())]),
            ]
        );
    }

    #[test]
    fn lex_background() {
        let tokens = lex("sleep 1 &").unwrap();
        assert_eq!(tokens.last(), Some(&Token::Background));
    }

    #[test]
    fn lex_quoted_strings() {
        let tokens = lex("echo \"hello $NAME\" 'literal $X'").unwrap();
        assert_eq!(
            tokens[1],
            Token::Word(vec![WordSegment::Double("hello $NAME".into())])
        );
        assert_eq!(
            tokens[2],
            Token::Word(vec![WordSegment::Single("literal $X".into())])
        );
    }

    #[test]
    fn lex_double_quote_escapes() {
        let tokens = lex(r#"echo "a \"b\" c\$d""#).unwrap();
        assert_eq!(
            tokens[1],
            Token::Word(vec![WordSegment::Double("a \"b\" c$d".into())])
        );
    }

    #[test]
    fn lex_unterminated_single_quote_errors() {
        let err = lex("echo 'unterminated").unwrap_err();
        assert_eq!(err, LexError::UnterminatedSingleQuote);
    }

    #[test]
    fn lex_unterminated_double_quote_errors() {
        let err = lex("echo \"unterminated").unwrap_err();
        assert_eq!(err, LexError::UnterminatedDoubleQuote);
    }

    #[test]
    fn lex_mixed_word_segments() {
        let tokens = lex(r#"echo foo"bar"'baz'"#).unwrap();
        assert_eq!(
            tokens[1],
            Token::Word(vec![
                WordSegment::Bare("foo".into()),
                WordSegment::Double("bar".into()),
                WordSegment::Single("baz".into()),
            ])
        );
    }

    #[test]
    fn lex_glob_and_brace_survive_as_bare() {
        let tokens = lex("ls *.txt a{b,c}").unwrap();
        assert_eq!(tokens[1].word_text().unwrap(), "*.txt");
        assert_eq!(tokens[2].word_text().unwrap(), "a{b,c}");
    }

    #[test]
    fn lex_and_not_misparsed_as_two_backgrounds() {
        let tokens = lex("a && b").unwrap();
        assert_eq!(tokens[1], Token::And);
    }
}
