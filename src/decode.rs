//! Chromosome decoding.
//!
//! Decoding turns a gene sequence into an expression in two passes:
//!
//! 1. **Tokenize**: genes map to symbols through the gene table. Unknown
//!    genes are skipped. Consecutive digits form one number token; every
//!    operator is its own token.
//! 2. **Validate**: number tokens lose leading zeros and digits past the
//!    term limit; operator tokens are kept only where they make sense (a
//!    sign before a number, or between two numbers).
//!
//! Every gene gets a [`Validity`] mark, so the result can show which genes
//! contributed to the expression. The accepted tokens are then evaluated.
//!
//! All scratch buffers live in a [`DecodeState`], which the simulation
//! pools so repeated decodes reuse their allocations.

use crate::error::EvalError;
use crate::eval::{Evaluator, Term};
use crate::float::BigFloat;
use crate::genes::{self, Gene};
use crate::pool::Reset;

/// How a gene contributed to the decoded expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Validity {
    /// Included in the expression.
    Valid = b'+',
    /// Decoded to a symbol that was dropped.
    Invalid = b'-',
    /// Decoded to no symbol.
    Unknown = b'?',
}

impl Validity {
    pub fn as_char(self) -> char {
        self as u8 as char
    }
}

/// The decoded form of a chromosome.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeResult {
    /// One symbol per known gene, including dropped ones.
    pub raw_expression: String,
    /// The accepted symbols only.
    pub expression: String,
    /// One [`Validity`] mark per gene.
    pub validity: String,
    value: Result<BigFloat, EvalError>,
}

impl DecodeResult {
    /// The value of [`expression`](Self::expression).
    pub fn evaluate(&self) -> Result<&BigFloat, EvalError> {
        self.value.as_ref().map_err(|err| *err)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Number,
    Operator,
}

impl TokenKind {
    fn of(symbol: u8) -> Self {
        if symbol.is_ascii_digit() {
            TokenKind::Number
        } else {
            TokenKind::Operator
        }
    }
}

/// A run of symbols in `DecodeState::chars`, with the source gene of each
/// symbol at the same offset in `DecodeState::indices`.
#[derive(Debug, Clone, Copy)]
struct Token {
    kind: TokenKind,
    start: usize,
    len: usize,
}

impl Token {
    fn range(&self) -> std::ops::Range<usize> {
        self.start..self.start + self.len
    }
}

/// Reusable scratch space for decoding.
#[derive(Debug, Default)]
pub struct DecodeState {
    validity: Vec<u8>,
    raw: Vec<u8>,
    expression: Vec<u8>,
    chars: Vec<u8>,
    indices: Vec<usize>,
    tokens: Vec<Token>,
    accepted: Vec<usize>,
    evaluator: Evaluator,
}

impl DecodeState {
    /// Creates a state sized for chromosomes of `genes` genes.
    pub fn with_capacity(genes: usize) -> Self {
        Self {
            validity: Vec::with_capacity(genes),
            raw: Vec::with_capacity(genes),
            expression: Vec::with_capacity(genes),
            chars: Vec::with_capacity(genes),
            indices: Vec::with_capacity(genes),
            tokens: Vec::with_capacity(genes),
            accepted: Vec::with_capacity(genes),
            evaluator: Evaluator::new(),
        }
    }

    /// Decodes and evaluates `genes`.
    ///
    /// `term_max_digits ≤ 0` allows numbers of any length. Evaluation uses
    /// `precision`-bit floats.
    pub fn decode(&mut self, genes: &[Gene], term_max_digits: i32, precision: u32) -> DecodeResult {
        self.reset();
        self.tokenize(genes);
        self.validate(usize::try_from(term_max_digits).unwrap_or(0));

        let Self {
            chars,
            tokens,
            accepted,
            evaluator,
            ..
        } = self;
        let (chars, tokens): (&[u8], &[Token]) = (chars, tokens);
        let terms = accepted.iter().map(move |&t| {
            let token = tokens[t];
            match token.kind {
                TokenKind::Number => Term::Number(&chars[token.range()]),
                TokenKind::Operator => Term::Operator(chars[token.start]),
            }
        });
        let value = evaluator.evaluate(precision, terms);

        DecodeResult {
            raw_expression: ascii(&self.raw),
            expression: ascii(&self.expression),
            validity: ascii(&self.validity),
            value,
        }
    }

    fn tokenize(&mut self, genes: &[Gene]) {
        for (i, &gene) in genes.iter().enumerate() {
            let Some(symbol) = genes::symbol_of(gene) else {
                self.validity.push(Validity::Unknown as u8);
                continue;
            };

            // Provisional; validation may demote it.
            self.validity.push(Validity::Valid as u8);
            self.raw.push(symbol);

            let kind = TokenKind::of(symbol);
            let extends = kind == TokenKind::Number
                && self.tokens.last().is_some_and(|t| t.kind == TokenKind::Number);
            if !extends {
                self.tokens.push(Token {
                    kind,
                    start: self.chars.len(),
                    len: 0,
                });
            }

            self.chars.push(symbol);
            self.indices.push(i);
            if let Some(token) = self.tokens.last_mut() {
                token.len += 1;
            }
        }
    }

    fn validate(&mut self, max_digits: usize) {
        for i in 0..self.tokens.len() {
            let next_is_number = self
                .tokens
                .get(i + 1)
                .is_some_and(|t| t.kind == TokenKind::Number);
            let after_number = self
                .accepted
                .last()
                .is_some_and(|&t| self.tokens[t].kind == TokenKind::Number);

            let token = &mut self.tokens[i];
            match token.kind {
                TokenKind::Number => {
                    while token.len > 1 && self.chars[token.start] == b'0' {
                        self.validity[self.indices[token.start]] = Validity::Invalid as u8;
                        token.start += 1;
                        token.len -= 1;
                    }

                    if max_digits > 0 && token.len > max_digits {
                        for k in token.start + max_digits..token.start + token.len {
                            self.validity[self.indices[k]] = Validity::Invalid as u8;
                        }
                        token.len = max_digits;
                    }

                    self.expression.extend_from_slice(&self.chars[token.range()]);
                    self.accepted.push(i);
                }
                TokenKind::Operator => {
                    let op = self.chars[token.start];
                    let sign = matches!(op, b'+' | b'-') && next_is_number;
                    let binary = after_number && next_is_number;

                    if sign || binary {
                        self.expression.push(op);
                        self.accepted.push(i);
                    } else {
                        self.validity[self.indices[token.start]] = Validity::Invalid as u8;
                    }
                }
            }
        }
    }
}

impl Reset for DecodeState {
    fn reset(&mut self) {
        self.validity.clear();
        self.raw.clear();
        self.expression.clear();
        self.chars.clear();
        self.indices.clear();
        self.tokens.clear();
        self.accepted.clear();
        self.evaluator.clear();
    }
}

fn ascii(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}
