//! LALR(1) parse table construction.
//!
//! [`GrammarBuilder`] collects symbols and productions and computes the parse
//! table once, when a language is first requested. Conflicts that precedence
//! and associativity do not resolve are kept in the table as multiple actions
//! and explored at parse time by the GLR driver.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use thiserror::Error;
use tracing::debug;

use super::{
    Action, Language, LexMode, ParseTable, Production, ProductionId, Scanner, StateId, Symbol,
    SymbolMetadata, SymbolSet,
};

/// Associativity of a production, consulted when its precedence ties with a
/// competing shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Assoc {
    /// Keep both actions.
    #[default]
    None,
    /// Prefer reducing.
    Left,
    /// Prefer shifting.
    Right,
}

/// Grammar construction errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GrammarError {
    /// `start` was never called.
    #[error("grammar `{0}` declares no start symbol")]
    NoStart(SmolStr),
    /// The start symbol is a token or a hidden rule.
    #[error("start symbol `{0}` must be a visible rule")]
    InvalidStart(SmolStr),
    /// A rule has no productions.
    #[error("rule `{0}` has no productions")]
    EmptyRule(SmolStr),
    /// A token was given productions.
    #[error("`{0}` is a token and cannot have productions")]
    TokenProduction(SmolStr),
    /// An extra appears on a right-hand side.
    #[error("extra `{0}` cannot appear in a production")]
    ExtraInProduction(SmolStr),
    /// A symbol from another grammar was used.
    #[error("production for `{0}` refers to an undeclared symbol")]
    UnknownSymbol(SmolStr),
    /// A rule derives itself without consuming input.
    #[error("rule `{0}` can derive itself without consuming input")]
    DerivationCycle(SmolStr),
    /// Symbol ids are exhausted.
    #[error("grammar declares too many symbols")]
    TooManySymbols,
    /// Production ids are exhausted.
    #[error("grammar declares too many productions")]
    TooManyProductions,
    /// State ids are exhausted.
    #[error("parse table exceeds {} states", u16::MAX)]
    TooManyStates,
}

#[derive(Debug, Clone)]
struct ProductionDef {
    lhs: Symbol,
    rhs: Vec<Symbol>,
    precedence: i32,
    assoc: Assoc,
    dynamic_precedence: i16,
}

/// Collects a grammar and builds its [`Language`].
///
/// ```
/// use grove_syntax::language::{GrammarBuilder, LexContext, Lexeme, Scanner};
/// use grove_syntax::language::Symbol;
/// use text_size::TextSize;
///
/// struct Digits(Symbol);
///
/// impl Scanner for Digits {
///     fn scan(&self, text: &str, _: &LexContext<'_>) -> Option<Lexeme> {
///         let len = text.bytes().take_while(u8::is_ascii_digit).count();
///         (len > 0).then(|| Lexeme::new(self.0, TextSize::new(len as u32), 1))
///     }
/// }
///
/// let mut grammar = GrammarBuilder::new("digits");
/// let number = grammar.named_token("number");
/// let program = grammar.rule("program");
/// grammar.production(program, [number]);
/// grammar.start(program);
/// let language = grammar.build(Digits(number)).unwrap();
/// assert_eq!(language.symbol_name(program), "program");
/// ```
pub struct GrammarBuilder {
    name: SmolStr,
    symbols: Vec<SymbolMetadata>,
    productions: Vec<ProductionDef>,
    start: Option<Symbol>,
    overflow: bool,
}

/// Attributes of a freshly declared production.
pub struct ProductionBuilder<'g> {
    def: &'g mut ProductionDef,
}

impl ProductionBuilder<'_> {
    /// Sets a static precedence without associativity.
    pub fn prec(self, level: i32) -> Self {
        self.def.precedence = level;
        self.def.assoc = Assoc::None;
        self
    }

    /// Sets a static precedence and left associativity.
    pub fn prec_left(self, level: i32) -> Self {
        self.def.precedence = level;
        self.def.assoc = Assoc::Left;
        self
    }

    /// Sets a static precedence and right associativity.
    pub fn prec_right(self, level: i32) -> Self {
        self.def.precedence = level;
        self.def.assoc = Assoc::Right;
        self
    }

    /// Sets the dynamic precedence used to rank ambiguous parses.
    pub fn dynamic(self, level: i16) -> Self {
        self.def.dynamic_precedence = level;
        self
    }
}

impl GrammarBuilder {
    /// Starts a grammar. Symbol 0 is reserved for the end of input.
    #[must_use]
    pub fn new(name: impl Into<SmolStr>) -> Self {
        let mut builder = Self {
            name: name.into(),
            symbols: Vec::new(),
            productions: Vec::new(),
            start: None,
            overflow: false,
        };
        builder.push_symbol(SymbolMetadata {
            name: SmolStr::new_inline("end"),
            terminal: true,
            named: false,
            visible: true,
            extra: false,
            contextual: false,
            missing_cost: 0,
        });
        builder
    }

    fn push_symbol(&mut self, metadata: SymbolMetadata) -> Symbol {
        match u16::try_from(self.symbols.len()) {
            // The last two ids are taken by the augmented start and ERROR.
            Ok(id) if id < u16::MAX - 1 => {
                self.symbols.push(metadata);
                Symbol::new(id)
            }
            _ => {
                self.overflow = true;
                Symbol::ERROR
            }
        }
    }

    fn terminal(&mut self, name: SmolStr, named: bool, extra: bool) -> Symbol {
        self.push_symbol(SymbolMetadata {
            name,
            terminal: true,
            named,
            visible: true,
            extra,
            contextual: false,
            missing_cost: 1,
        })
    }

    /// Declares an anonymous token, such as punctuation.
    pub fn token(&mut self, name: impl Into<SmolStr>) -> Symbol {
        self.terminal(name.into(), false, false)
    }

    /// Declares a named token, such as an identifier.
    ///
    /// Several tokens may share a name; nodes of each report the same kind.
    pub fn named_token(&mut self, name: impl Into<SmolStr>) -> Symbol {
        self.terminal(name.into(), true, false)
    }

    /// Declares an extra: a token that may appear between any two tokens.
    pub fn extra(&mut self, name: impl Into<SmolStr>, named: bool) -> Symbol {
        self.terminal(name.into(), named, true)
    }

    /// Declares a visible, named rule.
    pub fn rule(&mut self, name: impl Into<SmolStr>) -> Symbol {
        self.push_symbol(SymbolMetadata {
            name: name.into(),
            terminal: false,
            named: true,
            visible: true,
            extra: false,
            contextual: false,
            missing_cost: 0,
        })
    }

    /// Declares a hidden rule. Its children are spliced into its parent.
    pub fn hidden_rule(&mut self, name: impl Into<SmolStr>) -> Symbol {
        self.push_symbol(SymbolMetadata {
            name: name.into(),
            terminal: false,
            named: false,
            visible: false,
            extra: false,
            contextual: false,
            missing_cost: 0,
        })
    }

    /// Marks a token as contextual: scanners only produce it in states that
    /// expect it.
    pub fn contextual(&mut self, token: Symbol) -> &mut Self {
        if let Some(metadata) = self.symbols.get_mut(token.index()) {
            metadata.contextual = true;
        }
        self
    }

    /// Sets the error-recovery cost of inserting `token`.
    pub fn missing_cost(&mut self, token: Symbol, cost: u32) -> &mut Self {
        if let Some(metadata) = self.symbols.get_mut(token.index()) {
            metadata.missing_cost = cost;
        }
        self
    }

    /// Declares `lhs -> rhs`.
    pub fn production(
        &mut self,
        lhs: Symbol,
        rhs: impl IntoIterator<Item = Symbol>,
    ) -> ProductionBuilder<'_> {
        self.productions.push(ProductionDef {
            lhs,
            rhs: rhs.into_iter().collect(),
            precedence: 0,
            assoc: Assoc::None,
            dynamic_precedence: 0,
        });
        let index = self.productions.len() - 1;
        ProductionBuilder {
            def: &mut self.productions[index],
        }
    }

    /// Declares a hidden rule matching zero or more `item`s.
    pub fn repeat(&mut self, name: impl Into<SmolStr>, item: Symbol) -> Symbol {
        let rule = self.hidden_rule(name);
        self.production(rule, []);
        self.production(rule, [rule, item]);
        rule
    }

    /// Declares a hidden rule matching zero or more `separator item` pairs.
    pub fn repeat_separated(
        &mut self,
        name: impl Into<SmolStr>,
        separator: Symbol,
        item: Symbol,
    ) -> Symbol {
        let rule = self.hidden_rule(name);
        self.production(rule, []);
        self.production(rule, [rule, separator, item]);
        rule
    }

    /// Sets the start symbol.
    pub fn start(&mut self, symbol: Symbol) -> &mut Self {
        self.start = Some(symbol);
        self
    }

    /// Validates the grammar and computes its parse table.
    ///
    /// # Errors
    ///
    /// Returns a [`GrammarError`] when the grammar is malformed or exceeds the
    /// table limits.
    pub fn build(self, scanner: impl Scanner + 'static) -> Result<Language, GrammarError> {
        if self.overflow {
            return Err(GrammarError::TooManySymbols);
        }
        let start = self
            .start
            .ok_or_else(|| GrammarError::NoStart(self.name.clone()))?;
        let start_meta = self
            .symbols
            .get(start.index())
            .ok_or_else(|| GrammarError::NoStart(self.name.clone()))?;
        if start_meta.terminal || !start_meta.visible {
            return Err(GrammarError::InvalidStart(start_meta.name.clone()));
        }
        if self.productions.len() >= usize::from(u16::MAX) {
            return Err(GrammarError::TooManyProductions);
        }
        self.validate()?;

        let generator = TableGenerator::new(&self.symbols, &self.productions, start);
        if let Some(symbol) = generator.find_cycle() {
            return Err(GrammarError::DerivationCycle(
                self.symbols[symbol.index()].name.clone(),
            ));
        }
        let table = generator.generate()?;
        debug!(
            language = %self.name,
            symbols = self.symbols.len(),
            states = table.state_count(),
            lex_modes = table.lex_mode_count(),
            conflicts = table.conflict_count(),
            "built parse table"
        );

        Ok(Language {
            name: self.name,
            symbols: self.symbols,
            error: SymbolMetadata {
                name: SmolStr::new_inline("ERROR"),
                terminal: false,
                named: true,
                visible: true,
                extra: false,
                contextual: false,
                missing_cost: 0,
            },
            start,
            table,
            scanner: Box::new(scanner),
        })
    }

    fn validate(&self) -> Result<(), GrammarError> {
        let mut has_productions = vec![false; self.symbols.len()];
        for def in &self.productions {
            let lhs = self
                .symbols
                .get(def.lhs.index())
                .ok_or_else(|| GrammarError::UnknownSymbol(SmolStr::new_inline("?")))?;
            if lhs.terminal {
                return Err(GrammarError::TokenProduction(lhs.name.clone()));
            }
            has_productions[def.lhs.index()] = true;
            for symbol in &def.rhs {
                let Some(meta) = self.symbols.get(symbol.index()) else {
                    return Err(GrammarError::UnknownSymbol(lhs.name.clone()));
                };
                if meta.extra {
                    return Err(GrammarError::ExtraInProduction(meta.name.clone()));
                }
                if *symbol == Symbol::END {
                    return Err(GrammarError::UnknownSymbol(lhs.name.clone()));
                }
            }
        }
        for (meta, has) in self.symbols.iter().zip(has_productions) {
            if !meta.terminal && !has {
                return Err(GrammarError::EmptyRule(meta.name.clone()));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct Item {
    production: u32,
    dot: u32,
}

struct StateDef {
    kernel: Vec<Item>,
    lookaheads: Vec<SymbolSet>,
    transitions: BTreeMap<Symbol, usize>,
}

struct TableGenerator<'g> {
    symbols: &'g [SymbolMetadata],
    defs: Vec<ProductionDef>,
    by_lhs: Vec<Vec<usize>>,
    nullable: Vec<bool>,
    first: Vec<SymbolSet>,
    augmented: usize,
}

impl<'g> TableGenerator<'g> {
    fn new(symbols: &'g [SymbolMetadata], productions: &[ProductionDef], start: Symbol) -> Self {
        let count = symbols.len() + 1;
        let augmented_symbol = Symbol::new(u16::try_from(symbols.len()).unwrap_or(u16::MAX - 1));
        let mut defs = productions.to_vec();
        defs.push(ProductionDef {
            lhs: augmented_symbol,
            rhs: vec![start],
            precedence: 0,
            assoc: Assoc::None,
            dynamic_precedence: 0,
        });
        let mut by_lhs = vec![Vec::new(); count];
        for (index, def) in defs.iter().enumerate() {
            by_lhs[def.lhs.index()].push(index);
        }
        let mut generator = Self {
            symbols,
            augmented: defs.len() - 1,
            defs,
            by_lhs,
            nullable: vec![false; count],
            first: vec![SymbolSet::with_capacity(count); count],
        };
        generator.compute_first_sets();
        generator
    }

    fn is_terminal(&self, symbol: Symbol) -> bool {
        self.symbols
            .get(symbol.index())
            .is_some_and(|meta| meta.terminal)
    }

    fn compute_first_sets(&mut self) {
        for (index, meta) in self.symbols.iter().enumerate() {
            if meta.terminal {
                if let Ok(id) = u16::try_from(index) {
                    self.first[index].insert(Symbol::new(id));
                }
            }
        }
        loop {
            let mut changed = false;
            for def in &self.defs {
                let lhs = def.lhs.index();
                let mut all_nullable = true;
                for symbol in &def.rhs {
                    let first = self.first[symbol.index()].clone();
                    changed |= self.first[lhs].union_with(&first);
                    if !self.nullable[symbol.index()] {
                        all_nullable = false;
                        break;
                    }
                }
                if all_nullable && !self.nullable[lhs] {
                    self.nullable[lhs] = true;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
    }

    /// Finds a rule that derives itself through nullable context.
    fn find_cycle(&self) -> Option<Symbol> {
        let mut edges: Vec<Vec<usize>> = vec![Vec::new(); self.first.len()];
        for def in &self.defs {
            for (index, symbol) in def.rhs.iter().enumerate() {
                if self.is_terminal(*symbol) {
                    continue;
                }
                let others_nullable = def
                    .rhs
                    .iter()
                    .enumerate()
                    .all(|(other, s)| other == index || self.nullable[s.index()]);
                if others_nullable {
                    edges[def.lhs.index()].push(symbol.index());
                }
            }
        }

        // 0 = unvisited, 1 = on the current path, 2 = done
        let mut color = vec![0u8; edges.len()];
        for root in 0..edges.len() {
            if color[root] != 0 {
                continue;
            }
            let mut path = vec![(root, 0usize)];
            color[root] = 1;
            while let Some((node, next)) = path.last_mut() {
                let node = *node;
                if let Some(&target) = edges[node].get(*next) {
                    *next += 1;
                    match color[target] {
                        0 => {
                            color[target] = 1;
                            path.push((target, 0));
                        }
                        1 => return u16::try_from(target).ok().map(Symbol::new),
                        _ => {}
                    }
                } else {
                    color[node] = 2;
                    path.pop();
                }
            }
        }
        None
    }

    fn closure(&self, kernel: &[(Item, SymbolSet)]) -> Vec<(Item, SymbolSet)> {
        let mut items = kernel.to_vec();
        let mut index: FxHashMap<Item, usize> = items
            .iter()
            .enumerate()
            .map(|(position, (item, _))| (*item, position))
            .collect();
        let mut work: Vec<usize> = (0..items.len()).collect();

        while let Some(position) = work.pop() {
            let item = items[position].0;
            let rhs = &self.defs[item.production as usize].rhs;
            let dot = item.dot as usize;
            let Some(&next) = rhs.get(dot) else {
                continue;
            };
            if self.is_terminal(next) {
                continue;
            }

            let mut follow = SymbolSet::default();
            let mut rest_nullable = true;
            for symbol in &rhs[dot + 1..] {
                follow.union_with(&self.first[symbol.index()]);
                if !self.nullable[symbol.index()] {
                    rest_nullable = false;
                    break;
                }
            }
            if rest_nullable {
                let lookahead = items[position].1.clone();
                follow.union_with(&lookahead);
            }

            for &production in &self.by_lhs[next.index()] {
                let candidate = Item {
                    production: production as u32,
                    dot: 0,
                };
                if let Some(&existing) = index.get(&candidate) {
                    if items[existing].1.union_with(&follow) {
                        work.push(existing);
                    }
                } else {
                    index.insert(candidate, items.len());
                    work.push(items.len());
                    items.push((candidate, follow.clone()));
                }
            }
        }
        items
    }

    fn kernel_of(state: &StateDef) -> Vec<(Item, SymbolSet)> {
        state
            .kernel
            .iter()
            .copied()
            .zip(state.lookaheads.iter().cloned())
            .collect()
    }

    /// Builds the LALR(1) state machine by merging LR(1) states that share a
    /// core and propagating lookaheads until nothing changes.
    fn build_states(&self) -> Result<Vec<StateDef>, GrammarError> {
        let initial = vec![Item {
            production: self.augmented as u32,
            dot: 0,
        }];
        let mut states = vec![StateDef {
            kernel: initial.clone(),
            lookaheads: vec![[Symbol::END].into_iter().collect()],
            transitions: BTreeMap::new(),
        }];
        let mut by_core: FxHashMap<Vec<Item>, usize> = FxHashMap::default();
        by_core.insert(initial, 0);
        let mut queue = VecDeque::from([0usize]);
        let mut queued = vec![true];

        while let Some(state) = queue.pop_front() {
            queued[state] = false;
            let closure = self.closure(&Self::kernel_of(&states[state]));

            let mut successors: BTreeMap<Symbol, Vec<(Item, SymbolSet)>> = BTreeMap::new();
            for (item, lookahead) in closure {
                let rhs = &self.defs[item.production as usize].rhs;
                if let Some(&next) = rhs.get(item.dot as usize) {
                    successors.entry(next).or_default().push((
                        Item {
                            production: item.production,
                            dot: item.dot + 1,
                        },
                        lookahead,
                    ));
                }
            }

            for (symbol, mut items) in successors {
                items.sort_by_key(|(item, _)| *item);
                let core: Vec<Item> = items.iter().map(|(item, _)| *item).collect();
                let target = if let Some(&target) = by_core.get(&core) {
                    let mut changed = false;
                    for (slot, (_, lookahead)) in states[target].lookaheads.iter_mut().zip(&items) {
                        changed |= slot.union_with(lookahead);
                    }
                    if changed && !queued[target] {
                        queued[target] = true;
                        queue.push_back(target);
                    }
                    target
                } else {
                    let target = states.len();
                    if target >= usize::from(u16::MAX) {
                        return Err(GrammarError::TooManyStates);
                    }
                    by_core.insert(core.clone(), target);
                    states.push(StateDef {
                        kernel: core,
                        lookaheads: items.into_iter().map(|(_, lookahead)| lookahead).collect(),
                        transitions: BTreeMap::new(),
                    });
                    queued.push(true);
                    queue.push_back(target);
                    target
                };
                states[state].transitions.insert(symbol, target);
            }
        }
        Ok(states)
    }

    fn generate(&self) -> Result<ParseTable, GrammarError> {
        let states = self.build_states()?;
        let state_id = |index: usize| {
            u16::try_from(index)
                .map(StateId::new)
                .map_err(|_| GrammarError::TooManyStates)
        };

        let mut actions = Vec::with_capacity(states.len());
        let mut gotos = Vec::with_capacity(states.len());
        let mut lex_modes = Vec::with_capacity(states.len());
        let mut modes: FxHashMap<SymbolSet, LexMode> = FxHashMap::default();
        let mut mode_tokens = Vec::new();

        for state in &states {
            let mut shifts: BTreeMap<Symbol, (StateId, i32)> = BTreeMap::new();
            let mut reduces: BTreeMap<Symbol, Vec<usize>> = BTreeMap::new();
            let mut accept = false;

            for (item, lookahead) in self.closure(&Self::kernel_of(state)) {
                let def = &self.defs[item.production as usize];
                match def.rhs.get(item.dot as usize) {
                    Some(&next) if self.is_terminal(next) => {
                        let Some(&target) = state.transitions.get(&next) else {
                            continue;
                        };
                        let entry = shifts
                            .entry(next)
                            .or_insert((state_id(target)?, def.precedence));
                        entry.1 = entry.1.max(def.precedence);
                    }
                    Some(_) => {}
                    None if item.production as usize == self.augmented => accept = true,
                    None => {
                        for symbol in lookahead.iter() {
                            reduces
                                .entry(symbol)
                                .or_default()
                                .push(item.production as usize);
                        }
                    }
                }
            }

            let mut lookaheads: BTreeSet<Symbol> = shifts.keys().copied().collect();
            lookaheads.extend(reduces.keys().copied());
            if accept {
                lookaheads.insert(Symbol::END);
            }

            let mut row = FxHashMap::default();
            for symbol in lookaheads {
                let cell = self.resolve(
                    symbol,
                    accept && symbol == Symbol::END,
                    shifts.get(&symbol).copied(),
                    reduces.remove(&symbol).unwrap_or_default(),
                );
                if !cell.is_empty() {
                    row.insert(symbol, cell.into_boxed_slice());
                }
            }

            let contextual: SymbolSet = row
                .keys()
                .copied()
                .filter(|symbol: &Symbol| self.symbols[symbol.index()].contextual)
                .collect();
            let next_mode = LexMode::new(u16::try_from(mode_tokens.len()).unwrap_or(u16::MAX));
            let mode = *modes.entry(contextual.clone()).or_insert_with(|| {
                mode_tokens.push(contextual);
                next_mode
            });
            lex_modes.push(mode);

            let mut goto_row = FxHashMap::default();
            for (symbol, target) in &state.transitions {
                if !self.is_terminal(*symbol) {
                    goto_row.insert(*symbol, state_id(*target)?);
                }
            }

            actions.push(row);
            gotos.push(goto_row);
        }

        let productions = self
            .defs
            .iter()
            .map(|def| Production {
                lhs: def.lhs,
                len: u16::try_from(def.rhs.len()).unwrap_or(u16::MAX),
                dynamic_precedence: def.dynamic_precedence,
            })
            .collect();

        Ok(ParseTable {
            actions,
            gotos,
            lex_modes,
            mode_tokens,
            productions,
        })
    }

    /// Orders one table cell: accept, then shift, then reductions in
    /// declaration order. Precedence removes the losing actions.
    fn resolve(
        &self,
        symbol: Symbol,
        accept: bool,
        shift: Option<(StateId, i32)>,
        mut reduces: Vec<usize>,
    ) -> Vec<Action> {
        reduces.sort_unstable();
        reduces.dedup();

        if reduces.len() > 1 {
            if let Some(best) = reduces.iter().map(|&p| self.defs[p].precedence).max() {
                reduces.retain(|&p| self.defs[p].precedence == best);
            }
        }

        let mut keep_shift = shift.is_some();
        if let Some((_, shift_precedence)) = shift {
            reduces.retain(|&p| {
                let def = &self.defs[p];
                match def.precedence.cmp(&shift_precedence) {
                    Ordering::Greater => {
                        keep_shift = false;
                        true
                    }
                    Ordering::Less => false,
                    Ordering::Equal => match def.assoc {
                        Assoc::Left => {
                            keep_shift = false;
                            true
                        }
                        Assoc::Right => false,
                        Assoc::None => true,
                    },
                }
            });
        }

        let mut cell = Vec::with_capacity(reduces.len() + 1);
        if accept {
            cell.push(Action::Accept);
        }
        if let Some((target, _)) = shift.filter(|_| keep_shift) {
            cell.push(Action::Shift(target));
        }
        for production in reduces {
            if let Ok(id) = u16::try_from(production) {
                cell.push(Action::Reduce(ProductionId::new(id)));
            }
        }
        if cell.len() > 1 {
            tracing::trace!(symbol = symbol.id(), actions = cell.len(), "unresolved conflict");
        }
        cell
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::{LexContext, Lexeme};

    struct NoScanner;

    impl Scanner for NoScanner {
        fn scan(&self, _: &str, _: &LexContext<'_>) -> Option<Lexeme> {
            None
        }
    }

    fn arithmetic(assoc: Assoc) -> (Language, Symbol, Symbol) {
        let mut g = GrammarBuilder::new("arith");
        let num = g.named_token("num");
        let plus = g.token("+");
        let expr = g.rule("expr");
        g.production(expr, [num]);
        let sum = g.production(expr, [expr, plus, expr]);
        match assoc {
            Assoc::Left => {
                sum.prec_left(1);
            }
            Assoc::Right => {
                sum.prec_right(1);
            }
            Assoc::None => {}
        }
        g.start(expr);
        (g.build(NoScanner).unwrap(), plus, expr)
    }

    /// Finds the state reached after `expr + expr`.
    fn state_after_sum(language: &Language, plus: Symbol, expr: Symbol) -> StateId {
        let table = language.table();
        let after_expr = table.goto(StateId::START, expr).unwrap();
        let Action::Shift(after_plus) = table.actions(after_expr, plus)[0] else {
            panic!("expected shift on `+`");
        };
        table.goto(after_plus, expr).unwrap()
    }

    #[test]
    fn test_left_assoc_reduces() {
        let (language, plus, expr) = arithmetic(Assoc::Left);
        let state = state_after_sum(&language, plus, expr);
        let actions = language.table().actions(state, plus);
        assert_eq!(actions.len(), 1);
        assert!(matches!(actions[0], Action::Reduce(_)));
        assert_eq!(language.table().conflict_count(), 0);
    }

    #[test]
    fn test_right_assoc_shifts() {
        let (language, plus, expr) = arithmetic(Assoc::Right);
        let state = state_after_sum(&language, plus, expr);
        let actions = language.table().actions(state, plus);
        assert_eq!(actions.len(), 1);
        assert!(matches!(actions[0], Action::Shift(_)));
    }

    #[test]
    fn test_unresolved_conflict_keeps_both_actions() {
        let (language, plus, expr) = arithmetic(Assoc::None);
        let state = state_after_sum(&language, plus, expr);
        let actions = language.table().actions(state, plus);
        assert_eq!(actions.len(), 2);
        assert!(matches!(actions[0], Action::Shift(_)));
        assert!(matches!(actions[1], Action::Reduce(_)));
        assert_eq!(language.table().conflict_count(), 1);
    }

    #[test]
    fn test_accept_on_end() {
        let (language, _, expr) = arithmetic(Assoc::Left);
        let table = language.table();
        let after_expr = table.goto(StateId::START, expr).unwrap();
        assert_eq!(table.actions(after_expr, Symbol::END), &[Action::Accept]);
    }

    #[test]
    fn test_contextual_tokens_split_lex_modes() {
        let mut g = GrammarBuilder::new("keywords");
        let ident = g.named_token("identifier");
        let kw_let = g.token("let");
        let eq = g.token("=");
        g.contextual(kw_let);
        let binding = g.rule("binding");
        g.production(binding, [kw_let, ident, eq, ident]);
        g.start(binding);
        let language = g.build(NoScanner).unwrap();
        let table = language.table();

        let start_mode = table.lex_mode(StateId::START);
        assert!(table.mode_tokens(start_mode).unwrap().contains(kw_let));
        let Action::Shift(after_let) = table.actions(StateId::START, kw_let)[0] else {
            panic!("expected shift on `let`");
        };
        let ident_mode = table.lex_mode(after_let);
        assert_ne!(start_mode, ident_mode);
        assert!(!table.mode_tokens(ident_mode).unwrap().contains(kw_let));
    }

    #[test]
    fn test_rejects_malformed_grammars() {
        let mut g = GrammarBuilder::new("empty");
        let rule = g.rule("rule");
        g.start(rule);
        assert_eq!(
            g.build(NoScanner).unwrap_err(),
            GrammarError::EmptyRule("rule".into())
        );

        let mut g = GrammarBuilder::new("cycle");
        let a = g.rule("a");
        let b = g.hidden_rule("_b");
        g.production(a, [b]);
        g.production(b, [a]);
        g.start(a);
        assert!(matches!(
            g.build(NoScanner).unwrap_err(),
            GrammarError::DerivationCycle(_)
        ));

        let mut g = GrammarBuilder::new("hidden");
        let x = g.token("x");
        let hidden = g.hidden_rule("_start");
        g.production(hidden, [x]);
        g.start(hidden);
        assert_eq!(
            g.build(NoScanner).unwrap_err(),
            GrammarError::InvalidStart("_start".into())
        );

        let mut g = GrammarBuilder::new("none");
        g.token("x");
        assert!(matches!(
            g.build(NoScanner).unwrap_err(),
            GrammarError::NoStart(_)
        ));
    }

    #[test]
    fn test_repeat_builds_left_recursion() {
        let mut g = GrammarBuilder::new("list");
        let item = g.named_token("item");
        let list = g.rule("list");
        let items = g.repeat("_items", item);
        g.production(list, [items]);
        g.start(list);
        let language = g.build(NoScanner).unwrap();
        assert_eq!(language.table().conflict_count(), 0);
        assert!(!language.is_visible(items));
    }
}
