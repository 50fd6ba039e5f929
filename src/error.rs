use thiserror::Error;

use crate::symbol::SymbolId;

/// Errors raised while defining, rewriting or executing a grammar.
///
/// All of these are mistakes in the grammar definition rather than transient
/// conditions, so callers should abort the current generation pass.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GrammarError {
    #[error("symbol `{symbol}` has expansion rules but their total weight is zero")]
    InvalidRuleSet { symbol: String },
    #[error("symbol `{symbol}` has an invalid rule weight {weight}")]
    InvalidWeight { symbol: String, weight: f64 },
    #[error("unknown symbol id {0}")]
    UnknownSymbol(SymbolId),
    #[error("symbol `{0}` is already defined")]
    DuplicateSymbol(String),
    #[error("symbol `{symbol}` has no rule at index {index}")]
    RuleIndexOutOfRange { symbol: String, index: usize },
    #[error("alphabet is full")]
    AlphabetFull,
    #[error("turtle stack underflow: pop without matching push")]
    StackUnderflow,
    #[error("turtle stack exceeded its limit of {limit} saved states")]
    StackOverflow { limit: usize },
    #[error("axis index {0} is outside 0..=2")]
    InvalidAxis(usize),
    #[error("subdivision produced {count} pieces")]
    DegenerateSubdivision { count: u32 },
}
