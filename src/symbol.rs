//! Grammar alphabet: symbols, weighted productions and the registry that owns them.
//!
//! Sentences and rule replacements refer to symbols by [`SymbolId`], so a
//! symbol can appear in its own productions and be shared across a sentence
//! without reference cycles.

use std::fmt;

use symbios::SymbolTable;

use crate::error::GrammarError;
use crate::lsystem::ExecContext;

/// Index of a symbol inside its [`Alphabet`].
pub type SymbolId = u16;

/// Behaviour run when a symbol is executed.
pub type Action = Box<dyn Fn(&mut ExecContext<'_>) -> Result<(), GrammarError>>;

/// Weighted replacement of one symbol by a sequence of symbols.
#[derive(Clone, Debug, PartialEq)]
pub struct ExpansionRule {
    pub weight: f64,
    pub replacement: Vec<SymbolId>,
}

impl ExpansionRule {
    pub fn new(weight: f64, replacement: impl Into<Vec<SymbolId>>) -> Self {
        Self {
            weight,
            replacement: replacement.into(),
        }
    }
}

/// Normalized cumulative distribution over a rule list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WeightTable {
    cumulative: Vec<f64>,
}

impl WeightTable {
    /// Builds the table, or `None` when the weights sum to zero.
    pub fn from_rules(rules: &[ExpansionRule]) -> Option<Self> {
        let total: f64 = rules.iter().map(|r| r.weight).sum();
        if total <= 0.0 {
            return None;
        }
        let mut running = 0.0;
        let cumulative = rules
            .iter()
            .map(|r| {
                running += r.weight;
                running / total
            })
            .collect();
        Some(Self { cumulative })
    }

    /// Smallest index whose cumulative weight exceeds `u`; the last index
    /// absorbs rounding at `u ≈ 1`.
    pub fn select(&self, u: f64) -> Option<usize> {
        let last = self.cumulative.len().checked_sub(1)?;
        Some(self.cumulative.iter().position(|&c| u < c).unwrap_or(last))
    }

    pub fn cumulative(&self) -> &[f64] {
        &self.cumulative
    }

    pub fn is_empty(&self) -> bool {
        self.cumulative.is_empty()
    }
}

/// A grammar alphabet entry.
pub struct Symbol {
    name: String,
    action: Action,
    rules: Vec<ExpansionRule>,
    weights: WeightTable,
    terminal: bool,
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Symbol")
            .field("name", &self.name)
            .field("rules", &self.rules)
            .field("terminal", &self.terminal)
            .finish_non_exhaustive()
    }
}

impl Symbol {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rules(&self) -> &[ExpansionRule] {
        &self.rules
    }

    pub fn weights(&self) -> &WeightTable {
        &self.weights
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// True iff the symbol has productions and is not flagged terminal.
    pub fn can_expand(&self) -> bool {
        !self.terminal && !self.rules.is_empty()
    }

    /// Recomputes the cumulative table from the current weights.
    pub fn update_weights(&mut self) -> Result<(), GrammarError> {
        if self.rules.is_empty() {
            self.weights = WeightTable::default();
            return Ok(());
        }
        match WeightTable::from_rules(&self.rules) {
            Some(table) => {
                self.weights = table;
                Ok(())
            }
            None => {
                self.weights = WeightTable::default();
                Err(self.invalid_rule_set())
            }
        }
    }

    /// Replacement chosen by the draw `u`.
    pub fn choose(&self, u: f64) -> Result<&[SymbolId], GrammarError> {
        let index = self
            .weights
            .select(u)
            .ok_or_else(|| self.invalid_rule_set())?;
        Ok(&self.rules[index].replacement)
    }

    pub(crate) fn run(&self, ctx: &mut ExecContext<'_>) -> Result<(), GrammarError> {
        (self.action)(ctx)
    }

    fn invalid_rule_set(&self) -> GrammarError {
        GrammarError::InvalidRuleSet {
            symbol: self.name.clone(),
        }
    }
}

/// Owns every symbol of a grammar.
///
/// Names are interned through a [`symbios::SymbolTable`]; the id it hands out
/// indexes the symbol's slot here.
pub struct Alphabet {
    interner: SymbolTable,
    symbols: Vec<Option<Symbol>>,
    len: usize,
}

impl fmt::Debug for Alphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.symbols.iter().flatten())
            .finish()
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        Self {
            interner: SymbolTable::new(),
            symbols: Vec::new(),
            len: 0,
        }
    }
}

impl Alphabet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a symbol with no productions.
    pub fn define<F>(
        &mut self,
        name: impl Into<String>,
        action: F,
    ) -> Result<SymbolId, GrammarError>
    where
        F: Fn(&mut ExecContext<'_>) -> Result<(), GrammarError> + 'static,
    {
        let name = name.into();
        if self.resolve(&name).is_some() {
            return Err(GrammarError::DuplicateSymbol(name));
        }
        let id = self
            .interner
            .intern(&name)
            .map_err(|_| GrammarError::AlphabetFull)?;
        let slot = id as usize;
        if self.symbols.len() <= slot {
            self.symbols.resize_with(slot + 1, || None);
        }
        self.symbols[slot] = Some(Symbol {
            name,
            action: Box::new(action),
            rules: Vec::new(),
            weights: WeightTable::default(),
            terminal: false,
        });
        self.len += 1;
        Ok(id)
    }

    /// Registers a symbol whose action does nothing (a pure rewriting seed).
    pub fn define_inert(&mut self, name: impl Into<String>) -> Result<SymbolId, GrammarError> {
        self.define(name, |_| Ok(()))
    }

    /// Registers the conventional `[` (push) and `]` (pop) symbols.
    pub fn define_branching(&mut self) -> Result<(SymbolId, SymbolId), GrammarError> {
        let push = self.define("[", |ctx| ctx.push_turtle())?;
        let pop = self.define("]", |ctx| ctx.pop_turtle())?;
        Ok((push, pop))
    }

    /// Replaces the productions of `id` and recomputes its weight table.
    pub fn set_rules(
        &mut self,
        id: SymbolId,
        rules: Vec<ExpansionRule>,
    ) -> Result<(), GrammarError> {
        for rule in &rules {
            self.check_weight(id, rule.weight)?;
            self.check_ids(&rule.replacement)?;
        }
        let symbol = self.get_mut(id)?;
        symbol.rules = rules;
        symbol.update_weights()
    }

    /// Changes one rule's weight. The table is stale until
    /// [`update_weights`](Self::update_weights) is called.
    pub fn set_rule_weight(
        &mut self,
        id: SymbolId,
        index: usize,
        weight: f64,
    ) -> Result<(), GrammarError> {
        self.check_weight(id, weight)?;
        let symbol = self.get_mut(id)?;
        let name = symbol.name.clone();
        let rule = symbol
            .rules
            .get_mut(index)
            .ok_or(GrammarError::RuleIndexOutOfRange {
                symbol: name,
                index,
            })?;
        rule.weight = weight;
        Ok(())
    }

    pub fn rule_weight(&self, id: SymbolId, index: usize) -> Result<f64, GrammarError> {
        let symbol = self.get(id)?;
        symbol
            .rules
            .get(index)
            .map(|r| r.weight)
            .ok_or_else(|| GrammarError::RuleIndexOutOfRange {
                symbol: symbol.name.clone(),
                index,
            })
    }

    pub fn update_weights(&mut self, id: SymbolId) -> Result<(), GrammarError> {
        self.get_mut(id)?.update_weights()
    }

    /// Flags a symbol so the rewriter keeps it as-is even if it has rules.
    pub fn mark_terminal(&mut self, id: SymbolId, terminal: bool) -> Result<(), GrammarError> {
        self.get_mut(id)?.terminal = terminal;
        Ok(())
    }

    pub fn get(&self, id: SymbolId) -> Result<&Symbol, GrammarError> {
        self.symbols
            .get(id as usize)
            .and_then(Option::as_ref)
            .ok_or(GrammarError::UnknownSymbol(id))
    }

    fn get_mut(&mut self, id: SymbolId) -> Result<&mut Symbol, GrammarError> {
        self.symbols
            .get_mut(id as usize)
            .and_then(Option::as_mut)
            .ok_or(GrammarError::UnknownSymbol(id))
    }

    pub fn resolve(&self, name: &str) -> Option<SymbolId> {
        self.interner
            .resolve_id(name)
            .filter(|&id| self.get(id).is_ok())
    }

    /// Symbol names in definition order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.symbols.iter().flatten().map(|s| s.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn check_ids(&self, ids: &[SymbolId]) -> Result<(), GrammarError> {
        match ids.iter().find(|&&id| self.get(id).is_err()) {
            Some(&id) => Err(GrammarError::UnknownSymbol(id)),
            None => Ok(()),
        }
    }

    fn check_weight(&self, id: SymbolId, weight: f64) -> Result<(), GrammarError> {
        if weight.is_finite() && weight >= 0.0 {
            return Ok(());
        }
        Err(GrammarError::InvalidWeight {
            symbol: self.get(id)?.name.clone(),
            weight,
        })
    }
}
