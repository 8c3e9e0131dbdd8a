// SPDX-License-Identifier: SEE LICENSE IN LICENSE.md
// SPDX-FileCopyrightText: 2023 CYBERTEC PostgreSQL International GmbH
// <office@cybertec.at>

//! Turns SQL source text into a vector of [`Lexeme`]s (spec.md §4.1).
//!
//! The scanner is hand-rolled rather than built on a regex-DFA generator:
//! dollar-quoted strings carry a caller-chosen tag (`$tag$ ... $tag$`) and
//! block comments nest, neither of which a fixed-regex lexer generator can
//! express directly. See DESIGN.md for the (rejected) alternative.

mod token;

pub use token::{CommentPosition, Lexeme, LexemeKind, PositionedComments};

use crate::error::LexicalError;
use crate::keywords;
use text_size::TextRange;

const OPERATORS_3: &[&str] = &["->>", "#>>"];
const OPERATORS_2: &[&str] = &["<=", ">=", "<>", "!=", "||", "::", "->", "#>"];

fn is_operator_char(c: char) -> bool {
    matches!(
        c,
        '+' | '-' | '*' | '/' | '%' | '=' | '<' | '>' | '!' | '~' | '|' | '&' | '#' | '^'
    )
}

struct Scanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn clone_at_pos(&self) -> Scanner<'a> {
        Scanner {
            input: self.input,
            pos: self.pos,
        }
    }
}

/// Tokenizes `input` into the full lexeme vector (spec.md §5 notes the
/// reference core materializes this up front, for parser backtracking).
pub fn tokenize(input: &str) -> Result<Vec<Lexeme>, LexicalError> {
    let mut s = Scanner::new(input);
    let mut lexemes = Vec::new();

    loop {
        let comments = scan_trivia(&mut s)?;

        if s.is_eof() {
            let mut eof = Lexeme::eof(s.pos as u32);
            eof.comments = comments;
            lexemes.push(eof);
            break;
        }

        let start = s.pos;
        let ch = s.peek().unwrap();

        let (kind, text) = if (ch == 'e' || ch == 'E') && s.peek_at(1) == Some('\'') {
            s.bump();
            let body = scan_quoted(&mut s, '\'')?;
            (LexemeKind::Literal, format!("E{body}"))
        } else if (ch == 'u' || ch == 'U') && s.peek_at(1) == Some('&') && s.peek_at(2) == Some('\'')
        {
            s.bump();
            s.bump();
            let body = scan_quoted(&mut s, '\'')?;
            (LexemeKind::Literal, format!("U&{body}"))
        } else if ch == '\'' {
            (LexemeKind::Literal, scan_quoted(&mut s, '\'')?)
        } else if ch == '"' {
            (LexemeKind::Identifier, scan_quoted(&mut s, '"')?)
        } else if ch == '`' {
            (LexemeKind::Identifier, scan_quoted(&mut s, '`')?)
        } else if ch == '[' {
            (LexemeKind::Identifier, scan_bracketed(&mut s)?)
        } else if ch.is_ascii_digit() || (ch == '.' && s.peek_at(1).map_or(false, |c| c.is_ascii_digit()))
        {
            scan_number(&mut s)
        } else if ch == ':' {
            scan_colon(&mut s)
        } else if ch == '@' && s.peek_at(1).map_or(false, |c| c.is_alphabetic() || c == '_') {
            scan_sigil_parameter(&mut s, '@')
        } else if ch == '$' {
            scan_dollar(&mut s)?
        } else if ch == '?' {
            s.bump();
            (LexemeKind::Parameter, "?".to_string())
        } else if ch == '(' {
            s.bump();
            (LexemeKind::OpenParen, "(".to_string())
        } else if ch == ')' {
            s.bump();
            (LexemeKind::CloseParen, ")".to_string())
        } else if ch == ',' {
            s.bump();
            (LexemeKind::Comma, ",".to_string())
        } else if ch == ';' {
            s.bump();
            (LexemeKind::SemiColon, ";".to_string())
        } else if ch == '.' {
            s.bump();
            (LexemeKind::Dot, ".".to_string())
        } else if is_operator_char(ch) {
            scan_operator(&mut s)
        } else if ch.is_alphabetic() || ch == '_' {
            scan_word_or_phrase(&mut s)
        } else {
            return Err(LexicalError::InvalidCharacter(start, ch));
        };

        lexemes.push(Lexeme {
            kind,
            text,
            comments,
            span: TextRange::new((start as u32).into(), (s.pos as u32).into()),
        });
    }

    Ok(lexemes)
}

fn scan_trivia(s: &mut Scanner) -> Result<Vec<String>, LexicalError> {
    let mut comments = Vec::new();

    loop {
        match s.peek() {
            Some(c) if c.is_whitespace() => {
                s.bump();
            }
            Some('-') if s.peek_at(1) == Some('-') => {
                s.bump();
                s.bump();
                let body_start = s.pos;
                while let Some(c) = s.peek() {
                    if c == '\n' {
                        break;
                    }
                    s.bump();
                }
                comments.push(s.input[body_start..s.pos].trim().to_string());
            }
            Some('/') if s.peek_at(1) == Some('*') => {
                let comment_start = s.pos;
                s.bump();
                s.bump();
                let body_start = s.pos;
                let mut depth = 1u32;
                loop {
                    match (s.peek(), s.peek_at(1)) {
                        (None, _) => return Err(LexicalError::UnterminatedComment(comment_start)),
                        (Some('/'), Some('*')) => {
                            s.bump();
                            s.bump();
                            depth += 1;
                        }
                        (Some('*'), Some('/')) => {
                            let body_end = s.pos;
                            s.bump();
                            s.bump();
                            depth -= 1;
                            if depth == 0 {
                                comments.push(s.input[body_start..body_end].trim().to_string());
                                break;
                            }
                        }
                        _ => {
                            s.bump();
                        }
                    }
                }
            }
            _ => break,
        }
    }

    Ok(comments)
}

/// Scans a `quote ... quote` run, treating a doubled quote as an escaped
/// literal quote. Returns the full lexeme text including both delimiters.
fn scan_quoted(s: &mut Scanner, quote: char) -> Result<String, LexicalError> {
    let start = s.pos;
    s.bump();

    loop {
        match s.peek() {
            None => return Err(LexicalError::UnterminatedString(start)),
            Some(c) if c == quote => {
                s.bump();
                if s.peek() == Some(quote) {
                    s.bump();
                    continue;
                }
                break;
            }
            Some(_) => {
                s.bump();
            }
        }
    }

    Ok(s.input[start..s.pos].to_string())
}

fn scan_bracketed(s: &mut Scanner) -> Result<String, LexicalError> {
    let start = s.pos;
    s.bump();

    loop {
        match s.peek() {
            None => return Err(LexicalError::UnterminatedString(start)),
            Some(']') => {
                s.bump();
                if s.peek() == Some(']') {
                    s.bump();
                    continue;
                }
                break;
            }
            Some(_) => {
                s.bump();
            }
        }
    }

    Ok(s.input[start..s.pos].to_string())
}

fn scan_number(s: &mut Scanner) -> (LexemeKind, String) {
    let start = s.pos;

    while let Some(c) = s.peek() {
        if c.is_ascii_digit() {
            s.bump();
        } else {
            break;
        }
    }

    if s.peek() == Some('.') {
        s.bump();
        while let Some(c) = s.peek() {
            if c.is_ascii_digit() {
                s.bump();
            } else {
                break;
            }
        }
    }

    if matches!(s.peek(), Some('e') | Some('E')) {
        let checkpoint = s.pos;
        s.bump();
        if matches!(s.peek(), Some('+') | Some('-')) {
            s.bump();
        }
        if s.peek().map_or(false, |c| c.is_ascii_digit()) {
            while let Some(c) = s.peek() {
                if c.is_ascii_digit() {
                    s.bump();
                } else {
                    break;
                }
            }
        } else {
            s.pos = checkpoint;
        }
    }

    (LexemeKind::Literal, s.input[start..s.pos].to_string())
}

/// `:name` named parameter vs. `::` cast operator vs. a bare `:`.
fn scan_colon(s: &mut Scanner) -> (LexemeKind, String) {
    if s.peek_at(1) == Some(':') {
        s.bump();
        s.bump();
        return (LexemeKind::Operator, "::".to_string());
    }

    if s.peek_at(1).map_or(false, |c| c.is_alphabetic() || c == '_') {
        return scan_sigil_parameter(s, ':');
    }

    s.bump();
    (LexemeKind::Operator, ":".to_string())
}

fn scan_sigil_parameter(s: &mut Scanner, sigil: char) -> (LexemeKind, String) {
    s.bump();
    let start = s.pos;
    while let Some(c) = s.peek() {
        if c.is_alphanumeric() || c == '_' {
            s.bump();
        } else {
            break;
        }
    }
    (LexemeKind::Parameter, format!("{sigil}{}", &s.input[start..s.pos]))
}

/// `$1` positional parameter or `$tag$ ... $tag$` dollar-quoted string.
fn scan_dollar(s: &mut Scanner) -> Result<(LexemeKind, String), LexicalError> {
    let start = s.pos;
    s.bump();

    if s.peek().map_or(false, |c| c.is_ascii_digit()) {
        while let Some(c) = s.peek() {
            if c.is_ascii_digit() {
                s.bump();
            } else {
                break;
            }
        }
        return Ok((LexemeKind::Parameter, s.input[start..s.pos].to_string()));
    }

    let tag_start = s.pos;
    while let Some(c) = s.peek() {
        if c.is_alphanumeric() || c == '_' {
            s.bump();
        } else {
            break;
        }
    }

    if s.peek() != Some('$') {
        return Err(LexicalError::MalformedDollarTag(start));
    }
    let tag = s.input[tag_start..s.pos].to_string();
    s.bump();

    let closing = format!("${tag}$");
    match s.input[s.pos..].find(closing.as_str()) {
        Some(rel) => {
            let body_end = s.pos + rel;
            let full_end = body_end + closing.len();
            let text = s.input[start..full_end].to_string();
            s.pos = full_end;
            Ok((LexemeKind::Literal, text))
        }
        None => Err(LexicalError::UnterminatedString(start)),
    }
}

fn scan_operator(s: &mut Scanner) -> (LexemeKind, String) {
    let rest = &s.input[s.pos..];

    for op in OPERATORS_3 {
        if rest.starts_with(op) {
            for _ in 0..op.chars().count() {
                s.bump();
            }
            return (LexemeKind::Operator, (*op).to_string());
        }
    }
    for op in OPERATORS_2 {
        if rest.starts_with(op) {
            for _ in 0..op.chars().count() {
                s.bump();
            }
            return (LexemeKind::Operator, (*op).to_string());
        }
    }

    let c = s.bump().unwrap();
    (LexemeKind::Operator, c.to_string())
}

/// Peeks up to `max` whitespace-separated bare words starting at the
/// scanner's current position, without mutating it.
fn peek_words(s: &Scanner, max: usize) -> Vec<(String, usize, usize)> {
    let mut probe = s.clone_at_pos();
    let mut words = Vec::new();

    for _ in 0..max {
        while matches!(probe.peek(), Some(c) if c.is_whitespace()) {
            probe.bump();
        }
        let start = probe.pos;
        if !matches!(probe.peek(), Some(c) if c.is_alphabetic() || c == '_') {
            break;
        }
        while let Some(c) = probe.peek() {
            if c.is_alphanumeric() || c == '_' {
                probe.bump();
            } else {
                break;
            }
        }
        words.push((probe.input[start..probe.pos].to_string(), start, probe.pos));
    }

    words
}

fn scan_word_or_phrase(s: &mut Scanner) -> (LexemeKind, String) {
    let words = peek_words(s, 4);
    let word_strs: Vec<String> = words.iter().map(|(w, _, _)| w.clone()).collect();

    if let Some((phrase, count)) = keywords::match_longest_phrase(&word_strs, &keywords::JOIN_PHRASES) {
        s.pos = words[count - 1].2;
        return (LexemeKind::Command, phrase);
    }
    if let Some((phrase, count)) = keywords::match_longest_phrase(&word_strs, &keywords::COMMAND_PHRASES) {
        s.pos = words[count - 1].2;
        return (LexemeKind::Command, phrase);
    }

    let start = s.pos;
    while let Some(c) = s.peek() {
        if c.is_alphanumeric() || c == '_' || c == '$' {
            s.bump();
        } else {
            break;
        }
    }
    let word = s.input[start..s.pos].to_string();
    let lower = word.to_lowercase();

    if keywords::is_command_word(&word) {
        (LexemeKind::Command, lower)
    } else if keywords::is_type_word(&word) {
        (LexemeKind::Type, lower)
    } else if s.peek() == Some('(') {
        (LexemeKind::Function, word)
    } else {
        (LexemeKind::Identifier, word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<LexemeKind> {
        tokenize(input).unwrap().into_iter().map(|l| l.kind).collect()
    }

    #[test]
    fn simple_select() {
        let lexemes = tokenize("select id, name from users where id = :id").unwrap();
        assert_eq!(lexemes[0].kind, LexemeKind::Command);
        assert_eq!(lexemes[0].text, "select");
        assert_eq!(lexemes.last().unwrap().kind, LexemeKind::Eof);
        let param = lexemes.iter().find(|l| l.kind == LexemeKind::Parameter).unwrap();
        assert_eq!(param.text, ":id");
    }

    #[test]
    fn recognizes_group_by_as_one_command_lexeme() {
        let lexemes = tokenize("group by a, b").unwrap();
        assert_eq!(lexemes[0].kind, LexemeKind::Command);
        assert_eq!(lexemes[0].text, "group by");
    }

    #[test]
    fn recognizes_join_variants() {
        let lexemes = tokenize("left outer join t on true").unwrap();
        assert_eq!(lexemes[0].text, "left outer join");
    }

    #[test]
    fn dollar_quoted_string() {
        let lexemes = tokenize("select $tag$it's fine$tag$").unwrap();
        let literal = lexemes.iter().find(|l| l.kind == LexemeKind::Literal).unwrap();
        assert_eq!(literal.text, "$tag$it's fine$tag$");
    }

    #[test]
    fn line_comment_attaches_to_next_lexeme() {
        let lexemes = tokenize("-- hello\nselect 1").unwrap();
        assert_eq!(lexemes[0].comments, vec!["hello".to_string()]);
    }

    #[test]
    fn nested_block_comments() {
        let lexemes = tokenize("/* outer /* inner */ still outer */ select 1").unwrap();
        assert_eq!(kinds("select 1"), vec![LexemeKind::Command, LexemeKind::Literal, LexemeKind::Eof]);
        assert!(lexemes[0].comments[0].contains("outer"));
    }

    #[test]
    fn unterminated_string_is_an_error() {
        assert!(matches!(
            tokenize("select 'abc"),
            Err(LexicalError::UnterminatedString(_))
        ));
    }

    #[test]
    fn function_vs_identifier() {
        let lexemes = tokenize("count(*) x").unwrap();
        assert_eq!(lexemes[0].kind, LexemeKind::Function);
        assert_eq!(lexemes.iter().filter(|l| l.kind == LexemeKind::Identifier).count(), 1);
    }

    #[test]
    fn cast_operator() {
        let lexemes = tokenize("a::int").unwrap();
        assert!(lexemes.iter().any(|l| l.kind == LexemeKind::Operator && l.text == "::"));
    }
}
