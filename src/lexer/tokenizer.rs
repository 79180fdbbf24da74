use std::collections::{HashSet, VecDeque};

use crate::error::{Error, Result};

/// A configurable tokenizer with line tracking
///
/// The input is broken into tokens according to four configuration sets:
/// *whitespace characters* are skipped between tokens; *delimiter strings*
/// are always tokens of their own, no matter what surrounds them;
/// *reserved words* (like delimiters) cause an error when read where an
/// ordinary token is expected; and an optional *raw region* delimiter pair
/// marks stretches of input that become single verbatim tokens.
///
/// `'\n'` is always treated as a delimiter so that line numbers can be
/// tracked. If `'\n'` is also listed as whitespace, newline tokens are
/// silently skipped by the read operations but still advance the line
/// counter. When one delimiter is a prefix of another, the longest match
/// wins (`[[` is preferred over `[`).
#[derive(Debug)]
pub struct Tokenizer {
    /// Remaining tokens, front of the queue first
    tokens: VecDeque<String>,
    /// Current line number within the input (1-indexed)
    line_number: usize,
    /// Delimiter strings, always individual tokens
    delimiters: HashSet<String>,
    /// Reserved words, rejected by `consume_token`
    reserved_words: HashSet<String>,
    /// Whether `'\n'` should be skipped like whitespace
    newline_is_whitespace: bool,
}

impl Tokenizer {
    /// Creates a tokenizer over `input` with the given configuration sets
    pub fn new(
        input: &str,
        whitespace: &[char],
        delimiters: &[&str],
        reserved_words: &[&str],
    ) -> Self {
        let (space, delimiter_set) = Self::configure(whitespace, delimiters);

        let mut tokens = VecDeque::new();
        Self::tokenize(input, &space, &delimiter_set, &mut tokens);

        Self::from_parts(tokens, delimiter_set, reserved_words, whitespace)
    }

    /// Creates a tokenizer that additionally treats everything between the
    /// `raw` delimiter pair as a single verbatim token
    ///
    /// The left and right delimiters are emitted as tokens of their own
    /// around the raw payload. A left delimiter with no matching right
    /// delimiter is an error.
    pub fn with_raw_region(
        input: &str,
        whitespace: &[char],
        delimiters: &[&str],
        reserved_words: &[&str],
        raw: (&str, &str),
    ) -> Result<Self> {
        let (space, mut delimiter_set) = Self::configure(whitespace, delimiters);

        // The raw delimiters are also regular delimiters.
        let (left, right) = raw;
        delimiter_set.insert(left.to_string());
        delimiter_set.insert(right.to_string());

        // Break the input into raw and non-raw pieces; raw pieces become
        // tokens verbatim, non-raw pieces are tokenized normally.
        let mut tokens = VecDeque::new();
        let mut end = 0;
        while let Some(pos) = input[end..].find(left) {
            let start = end + pos;
            Self::tokenize(&input[end..start], &space, &delimiter_set, &mut tokens);
            tokens.push_back(left.to_string());

            let payload_start = start + left.len();
            let rpos = input[payload_start..].find(right).ok_or_else(|| {
                Error::Parse("Left raw delimiter unmatched by right raw delimiter".to_string())
            })?;
            tokens.push_back(input[payload_start..payload_start + rpos].to_string());
            tokens.push_back(right.to_string());

            end = payload_start + rpos + right.len();
        }
        Self::tokenize(&input[end..], &space, &delimiter_set, &mut tokens);

        Ok(Self::from_parts(
            tokens,
            delimiter_set,
            reserved_words,
            whitespace,
        ))
    }

    /// Builds the whitespace-split set and the delimiter set
    ///
    /// `'\n'` is always a delimiter and is excluded from the whitespace
    /// split so newline tokens survive for line counting.
    fn configure(whitespace: &[char], delimiters: &[&str]) -> (Vec<char>, HashSet<String>) {
        let space: Vec<char> = whitespace.iter().copied().filter(|c| *c != '\n').collect();

        let mut delimiter_set: HashSet<String> =
            delimiters.iter().map(|s| s.to_string()).collect();
        delimiter_set.insert("\n".to_string());

        (space, delimiter_set)
    }

    fn from_parts(
        tokens: VecDeque<String>,
        delimiters: HashSet<String>,
        reserved_words: &[&str],
        whitespace: &[char],
    ) -> Self {
        Tokenizer {
            tokens,
            line_number: 1,
            delimiters,
            reserved_words: reserved_words.iter().map(|s| s.to_string()).collect(),
            newline_is_whitespace: whitespace.contains(&'\n'),
        }
    }

    /// Splits `input` on whitespace, then splits each piece on delimiters
    fn tokenize(
        input: &str,
        space: &[char],
        delimiters: &HashSet<String>,
        tokens: &mut VecDeque<String>,
    ) {
        for piece in input.split(|c| space.contains(&c)) {
            if !piece.is_empty() {
                Self::split_on_delimiters(piece, delimiters, tokens);
            }
        }
    }

    /// Separates `piece` so that every embedded delimiter becomes its own
    /// token, preferring the longest delimiter at any position
    fn split_on_delimiters(piece: &str, delimiters: &HashSet<String>, tokens: &mut VecDeque<String>) {
        let find_first = |s: &str| -> Option<(usize, usize)> {
            let mut best: Option<(usize, usize)> = None;
            for delimiter in delimiters {
                if let Some(pos) = s.find(delimiter.as_str()) {
                    let better = match best {
                        None => true,
                        Some((best_pos, best_len)) => {
                            pos < best_pos || (pos == best_pos && delimiter.len() > best_len)
                        }
                    };
                    if better {
                        best = Some((pos, delimiter.len()));
                    }
                }
            }
            best
        };

        let mut rest = piece;
        while let Some((pos, len)) = find_first(rest) {
            if pos != 0 {
                tokens.push_back(rest[..pos].to_string());
            }
            tokens.push_back(rest[pos..pos + len].to_string());
            rest = &rest[pos + len..];
        }
        if !rest.is_empty() {
            tokens.push_back(rest.to_string());
        }
    }

    /// Requires the next token to equal `expected` and consumes it
    pub fn consume(&mut self, expected: &str) -> Result<()> {
        let token = self.consume_next()?;
        if token != expected {
            return Err(self.syntax_error(format!("unexpected token {token}")));
        }
        Ok(())
    }

    /// Consumes the next token if it equals `expected`; returns whether it did
    pub fn try_consume(&mut self, expected: &str) -> bool {
        if self.peek(expected) {
            // Cannot fail: peek just saw the token.
            let _ = self.consume_next();
            true
        } else {
            false
        }
    }

    /// Returns whether the next token equals `expected`, without consuming it
    pub fn peek(&mut self, expected: &str) -> bool {
        self.skip_whitespace_newlines();
        self.tokens.front().is_some_and(|t| t == expected)
    }

    /// Consumes and returns the next token, rejecting delimiters and
    /// reserved words
    pub fn consume_token(&mut self) -> Result<String> {
        let token = self.consume_next()?;
        if self.delimiters.contains(&token) || self.reserved_words.contains(&token) {
            return Err(self.syntax_error(format!("read delimiter or reserved word: {token}")));
        }
        Ok(token)
    }

    /// Consumes and returns the next token with no delimiter or reserved-word
    /// check
    ///
    /// This is the only correct way to extract a raw-region payload: the
    /// payload is taken verbatim and any newlines inside it still advance
    /// the line counter.
    pub fn consume_raw(&mut self) -> Result<String> {
        let Some(token) = self.tokens.pop_front() else {
            return Err(self.syntax_error("unexpected end of input".to_string()));
        };
        self.line_number += token.matches('\n').count();
        Ok(token)
    }

    /// Consumes and returns a single character, splitting the current token
    /// if it is longer than one character
    pub fn consume_char(&mut self) -> Result<char> {
        self.skip_whitespace_newlines();
        let Some(token) = self.tokens.front() else {
            return Err(self.syntax_error("unexpected end of input".to_string()));
        };
        let Some(ch) = token.chars().next() else {
            return Err(self.syntax_error("unexpected end of input".to_string()));
        };

        if self.delimiters.contains(&ch.to_string())
            || self.reserved_words.contains(&ch.to_string())
        {
            let token = token.clone();
            return Err(self.syntax_error(format!("read delimiter or reserved word: {token}")));
        }

        let rest = token[ch.len_utf8()..].to_string();
        self.tokens.pop_front();
        if !rest.is_empty() {
            self.tokens.push_front(rest);
        }

        Ok(ch)
    }

    /// Returns whether the next token is a delimiter or reserved word
    pub fn is_next_reserved(&self) -> bool {
        let token = self.peek_ahead(0);
        self.delimiters.contains(&token) || self.reserved_words.contains(&token)
    }

    /// Puts a token onto the stream; it will be the next token read
    pub fn put_back(&mut self, token: impl Into<String>) {
        self.tokens.push_front(token.into());
    }

    /// Returns the token `ahead` positions from the front of the stream
    /// (starting at 0), or the empty string past the end
    ///
    /// Newline tokens are skipped when `'\n'` is whitespace.
    pub fn peek_ahead(&self, ahead: usize) -> String {
        let mut remaining = ahead;
        for token in &self.tokens {
            if self.newline_is_whitespace && token == "\n" {
                continue;
            }
            if remaining == 0 {
                return token.clone();
            }
            remaining -= 1;
        }
        String::new()
    }

    /// Returns whether the end of the input has been reached
    pub fn end_of_input(&self) -> bool {
        self.peek_ahead(0).is_empty()
    }

    /// The current line number within the input (1-indexed)
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Builds a syntax error at the current line
    pub fn syntax_error(&self, message: String) -> Error {
        Error::Syntax {
            line: self.line_number,
            message,
        }
    }

    /// Pops leading newline tokens when newlines are whitespace, counting
    /// lines as they go
    fn skip_whitespace_newlines(&mut self) {
        if !self.newline_is_whitespace {
            return;
        }
        while self.tokens.front().is_some_and(|t| t == "\n") {
            self.tokens.pop_front();
            self.line_number += 1;
        }
    }

    /// Consumes and returns the next token; fails at end of input
    fn consume_next(&mut self) -> Result<String> {
        self.skip_whitespace_newlines();
        let Some(token) = self.tokens.pop_front() else {
            return Err(self.syntax_error("unexpected end of input".to_string()));
        };
        if token == "\n" {
            self.line_number += 1;
        }
        Ok(token)
    }
}
