//! The GLR parse loop.
//!
//! A parse is a set of stack versions. Each step advances the active version
//! that is furthest behind by one action; conflicts fork it, and versions that
//! reach the same state at the same position are merged. A version with no
//! action for its lookahead pauses, and when no version is active the cheapest
//! paused one is repaired by [`recovery`](super::recovery).

use std::sync::Arc;
use std::time::Instant;

use rustc_hash::FxHashMap;
use text_size::{TextRange, TextSize};
use tracing::{debug, trace};

use super::builder::TreeBuilder;
use super::reuse::ReusableNode;
use super::stack::Stack;
use super::{ParseStats, ParserOptions};
use crate::error::{ParseError, PartialTree};
use crate::language::{Action, Language, LexContext, LexMode, StateId, Symbol};
use crate::text::{Length, Text};
use crate::tree::green::{Follow, GreenNode, Subtree};

const TOKEN_CACHE_LIMIT: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Status {
    Active,
    Paused,
    Accepted,
}

/// The next input of a version: a token, or a whole subtree of the old tree.
#[derive(Clone)]
pub(super) struct Lookahead {
    pub(super) subtree: Subtree,
}

impl Lookahead {
    pub(super) fn new(subtree: Subtree) -> Self {
        Self { subtree }
    }

    /// Symbol the parse table is consulted with.
    pub(super) fn symbol(&self) -> Symbol {
        self.subtree.first_leaf.unwrap_or(self.subtree.symbol)
    }

    pub(super) fn mode(&self) -> LexMode {
        self.subtree.lex_mode
    }
}

#[derive(Clone)]
pub(super) struct Version {
    pub(super) stack: Stack,
    pub(super) lookahead: Option<Lookahead>,
    pub(super) status: Status,
}

impl Version {
    fn cost(&self) -> u32 {
        self.stack.error_cost()
    }

    /// Cheaper wins, then higher dynamic precedence.
    fn is_better_than(&self, other: &Version) -> bool {
        (self.cost(), -self.stack.dynamic_precedence())
            < (other.cost(), -other.stack.dynamic_precedence())
    }
}

/// Everything a parse needs besides its versions.
pub(super) struct Context<'a> {
    pub(super) language: &'a Language,
    pub(super) text: &'a Text,
    pub(super) options: &'a ParserOptions,
    pub(super) stats: ParseStats,
    tokens: FxHashMap<(TextSize, LexMode), Subtree>,
    reusable: Option<ReusableNode>,
    deadline: Option<Instant>,
    steps: usize,
}

impl<'a> Context<'a> {
    pub(super) fn builder(&self) -> TreeBuilder<'a> {
        TreeBuilder::new(self.language)
    }

    /// The token at `position` scanned in `mode`, memoised.
    pub(super) fn lex(&mut self, position: Length, mode: LexMode) -> Subtree {
        let key = (position.bytes, mode);
        if let Some(token) = self.tokens.get(&key) {
            return Arc::clone(token);
        }
        let token = Arc::new(self.scan(position, mode));
        self.tokens.insert(key, Arc::clone(&token));
        token
    }

    /// The next token that is not an extra, and the extras before it.
    pub(super) fn lex_significant(
        &mut self,
        mut position: Length,
        mode: LexMode,
    ) -> (Vec<Subtree>, Subtree) {
        let mut extras = Vec::new();
        loop {
            let token = self.lex(position, mode);
            if token.is_extra && token.symbol != Symbol::END {
                position += token.len;
                extras.push(token);
                continue;
            }
            return (extras, token);
        }
    }

    fn scan(&mut self, position: Length, mode: LexMode) -> GreenNode {
        self.stats.tokens_lexed += 1;
        let offset = position.bytes;
        if offset >= self.text.len() {
            return GreenNode::leaf(Symbol::END, Length::ZERO, 1, mode, false);
        }

        let language = self.language;
        let context = LexContext::new(mode, language.table().mode_tokens(mode));
        let scanned = self.text.str_at(offset).and_then(|rest| {
            let lexeme = language.scanner().scan(rest, &context)?;
            let valid = lexeme.symbol != Symbol::END && language.is_terminal(lexeme.symbol);
            let text = rest.get(..usize::from(lexeme.len)).filter(|text| !text.is_empty());
            match text {
                Some(text) if valid => Some((lexeme, Length::of_str(text))),
                _ => None,
            }
        });

        match scanned {
            Some((lexeme, len)) => GreenNode::leaf(
                lexeme.symbol,
                len,
                lexeme.lookahead,
                mode,
                language.is_extra(lexeme.symbol),
            ),
            None => {
                let len = self.text.measure(TextRange::at(offset, TextSize::new(1)));
                // The error token depends on everything the scanner refused.
                let rest = u32::from(self.text.len() - offset);
                trace!(offset = u32::from(offset), "no token matched");
                GreenNode::leaf(Symbol::ERROR, len, rest, mode, false)
            }
        }
    }

    fn prune_tokens(&mut self, before: TextSize) {
        if self.tokens.len() > TOKEN_CACHE_LIMIT {
            self.tokens.retain(|(offset, _), _| *offset >= before);
        }
    }

    /// Fetches the next lookahead for a version whose stack is `stack`.
    fn next_lookahead(&mut self, stack: &Stack, single: bool) -> Lookahead {
        let position = stack.position();
        let mode = stack.next_mode();
        if single {
            if let Some(node) = self.reusable_node(position, mode) {
                if node.is_leaf() {
                    if let Some(reusable) = self.reusable.as_mut() {
                        reusable.advance();
                    }
                    self.stats.reused_leaves += 1;
                }
                return Lookahead::new(node);
            }
        }
        Lookahead::new(self.lex(position, mode))
    }

    /// The old subtree starting at `position` that may stand in for fresh
    /// tokens, descending through nodes that cannot.
    fn reusable_node(&mut self, position: Length, mode: LexMode) -> Option<Subtree> {
        let language = self.language;
        let reusable = self.reusable.as_mut()?;
        loop {
            let (node, start) = reusable.current()?;
            let end = start + node.len;
            if start.bytes > position.bytes {
                return None;
            }
            if start.bytes < position.bytes || node.len.is_empty() {
                if end.bytes <= position.bytes || !reusable.descend() {
                    reusable.advance();
                }
                continue;
            }
            if node.lex_mode != mode {
                return None;
            }
            let leading_extra = node.first_leaf.is_some_and(|symbol| language.is_extra(symbol));
            let unusable = node.has_changes
                || node.has_error
                || node.is_missing
                || (!node.is_leaf() && (node.fragile || leading_extra));
            if !unusable {
                return Some(node);
            }
            if node.is_leaf() || !reusable.descend() {
                return None;
            }
        }
    }

    /// Whether the token after `node`, placed at `start`, is still the one
    /// that triggered its reduction.
    fn follow_matches(&mut self, node: &Subtree, start: Length) -> bool {
        let Some(Follow { symbol, mode }) = node.follow else {
            return false;
        };
        let (_, token) = self.lex_significant(start + node.len, mode);
        token.symbol == symbol
    }

    /// Applies one action to `version`. `single` means no other version is
    /// live, which is the only time old subtrees are reused.
    fn apply(
        &mut self,
        version: &mut Version,
        action: Action,
        fragile: bool,
        single: bool,
    ) -> Result<(), ParseError> {
        let builder = self.builder();
        let Some(lookahead) = version.lookahead.clone() else {
            return Ok(());
        };
        match action {
            Action::Accept => {
                version.status = Status::Accepted;
            }
            Action::Reduce(production) => {
                let follow = Follow {
                    symbol: lookahead.symbol(),
                    mode: lookahead.mode(),
                };
                builder.reduce(&mut version.stack, production, follow, fragile)?;
            }
            Action::Shift(state) => {
                let subtree = lookahead.subtree;
                if subtree.is_leaf() {
                    version.lookahead = None;
                    builder.shift(&mut version.stack, state, subtree);
                } else {
                    version.lookahead = self.shift_subtree(version, subtree, single);
                }
            }
        }
        Ok(())
    }

    /// Shifts a whole old subtree if its context is unchanged, otherwise
    /// breaks it down. Returns the lookahead left over.
    fn shift_subtree(
        &mut self,
        version: &mut Version,
        subtree: Subtree,
        single: bool,
    ) -> Option<Lookahead> {
        let state = version.stack.state();
        let position = version.stack.position();
        if single && subtree.parse_state == state && self.follow_matches(&subtree, position) {
            let target = self.language.table().goto(state, subtree.symbol);
            if let (Some(target), Some(follow)) = (target, subtree.follow) {
                if let Some(reusable) = self.reusable.as_mut() {
                    reusable.advance();
                }
                self.stats.reused_subtrees += 1;
                self.stats.reused_bytes += u64::from(u32::from(subtree.len.bytes));
                trace!(
                    kind = self.language.symbol_name(subtree.symbol),
                    start = u32::from(position.bytes),
                    "reused subtree"
                );
                version.stack.push(target, subtree, follow.mode);
                return None;
            }
        }
        if let Some(reusable) = self.reusable.as_mut().filter(|_| single) {
            let positioned = reusable
                .current()
                .is_some_and(|(node, _)| Arc::ptr_eq(&node, &subtree));
            if positioned && reusable.descend() {
                return None;
            }
        }
        subtree.first_token().map(Lookahead::new)
    }
}

pub(super) struct Driver<'a> {
    pub(super) versions: Vec<Version>,
    pub(super) ctx: Context<'a>,
    language: Arc<Language>,
}

impl<'a> Driver<'a> {
    pub(super) fn new(
        language: &'a Arc<Language>,
        text: &'a Text,
        options: &'a ParserOptions,
        old_root: Option<Subtree>,
    ) -> Self {
        let mode = language.table().lex_mode(StateId::START);
        let reusable = old_root
            .filter(|_| options.reuse)
            .map(ReusableNode::new);
        Self {
            versions: vec![Version {
                stack: Stack::new(StateId::START, mode),
                lookahead: None,
                status: Status::Active,
            }],
            ctx: Context {
                language,
                text,
                options,
                stats: ParseStats::default(),
                tokens: FxHashMap::default(),
                reusable,
                deadline: options.timeout.map(|timeout| Instant::now() + timeout),
                steps: 0,
            },
            language: Arc::clone(language),
        }
    }

    pub(super) fn run(mut self) -> Result<(Subtree, ParseStats), ParseError> {
        loop {
            self.check_cancelled()?;
            if let Some(index) = self.next_active() {
                self.advance(index)?;
                self.condense();
                continue;
            }
            if let Some(index) = self.best(Status::Accepted) {
                let mut version = self.versions.swap_remove(index);
                let root = self.ctx.builder().finish(&mut version.stack)?;
                return Ok((root, self.ctx.stats));
            }
            let Some(index) = self.best(Status::Paused) else {
                return Err(ParseError::IncompleteParse { remaining: 0 });
            };
            if let Some(root) = self.recover(index)? {
                return Ok((root, self.ctx.stats));
            }
        }
    }

    /// The active version with the smallest position. Versions about to
    /// shift wait for the others at their position, so that versions
    /// reducing to the same state can be merged first.
    fn next_active(&self) -> Option<usize> {
        let table = self.ctx.language.table();
        self.versions
            .iter()
            .enumerate()
            .filter(|(_, version)| version.status == Status::Active)
            .min_by_key(|(index, version)| {
                let shifting = version.lookahead.as_ref().is_some_and(|lookahead| {
                    matches!(
                        table.actions(version.stack.state(), lookahead.symbol()).first(),
                        Some(Action::Shift(_))
                    )
                });
                (version.stack.position().bytes, shifting, *index)
            })
            .map(|(index, _)| index)
    }

    /// The best version with `status`; ties go to the earliest.
    pub(super) fn best(&self, status: Status) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (index, version) in self.versions.iter().enumerate() {
            if version.status != status {
                continue;
            }
            match best {
                Some(current) if !version.is_better_than(&self.versions[current]) => {}
                _ => best = Some(index),
            }
        }
        best
    }

    fn advance(&mut self, index: usize) -> Result<(), ParseError> {
        let single = self.versions.len() == 1;
        let lookahead = match &self.versions[index].lookahead {
            Some(lookahead) => lookahead.clone(),
            None => {
                let lookahead = self.ctx.next_lookahead(&self.versions[index].stack, single);
                self.versions[index].lookahead = Some(lookahead.clone());
                lookahead
            }
        };

        if lookahead.subtree.is_leaf() && lookahead.subtree.is_extra {
            let version = &mut self.versions[index];
            version.lookahead = None;
            self.ctx
                .builder()
                .push_uncounted(&mut version.stack, lookahead.subtree);
            return Ok(());
        }

        let language = self.ctx.language;
        let state = self.versions[index].stack.state();
        let actions = language.table().actions(state, lookahead.symbol());
        let Some((&first, rest)) = actions.split_first() else {
            trace!(
                state = %state,
                symbol = language.symbol_name(lookahead.symbol()),
                "version paused"
            );
            self.versions[index].status = Status::Paused;
            return Ok(());
        };

        let fragile = !rest.is_empty() || !single;
        let mut forks = Vec::with_capacity(rest.len());
        for &action in rest {
            let mut fork = self.versions[index].clone();
            self.ctx.apply(&mut fork, action, fragile, false)?;
            forks.push(fork);
        }
        self.ctx.apply(
            &mut self.versions[index],
            first,
            fragile,
            single && rest.is_empty(),
        )?;
        self.versions.extend(forks);
        self.ctx.stats.max_versions = self.ctx.stats.max_versions.max(self.versions.len());
        Ok(())
    }

    /// Drops and merges versions so that at most `max_versions` stay active.
    pub(super) fn condense(&mut self) {
        if self
            .versions
            .iter()
            .any(|version| version.status != Status::Paused)
        {
            self.versions.retain(|version| version.status != Status::Paused);
        }

        let accepted_cost = self
            .versions
            .iter()
            .filter(|version| version.status == Status::Accepted)
            .map(Version::cost)
            .min();
        if let Some(limit) = accepted_cost {
            self.versions
                .retain(|version| version.status != Status::Active || version.cost() <= limit);
        }

        let mut kept: Vec<Version> = Vec::with_capacity(self.versions.len());
        for version in self.versions.drain(..) {
            if version.status == Status::Active {
                let same = kept.iter_mut().find(|other| {
                    other.status == Status::Active
                        && other.stack.state() == version.stack.state()
                        && other.stack.position().bytes == version.stack.position().bytes
                        && other.stack.next_mode() == version.stack.next_mode()
                });
                if let Some(other) = same {
                    if version.is_better_than(other) {
                        *other = version;
                    }
                    continue;
                }
            }
            kept.push(version);
        }
        self.versions = kept;

        let max = self.ctx.options.max_versions.max(1);
        let active = self
            .versions
            .iter()
            .filter(|version| version.status == Status::Active)
            .count();
        if active > max {
            let mut ranked: Vec<usize> = (0..self.versions.len())
                .filter(|&index| self.versions[index].status == Status::Active)
                .collect();
            ranked.sort_by_key(|&index| {
                let version = &self.versions[index];
                (version.cost(), -version.stack.dynamic_precedence(), index)
            });
            let dropped: Vec<usize> = ranked.split_off(max);
            debug!(dropped = dropped.len(), "too many stack versions");
            let mut index = 0;
            self.versions.retain(|_| {
                let keep = !dropped.contains(&index);
                index += 1;
                keep
            });
        }

        if let Some(oldest) = self
            .versions
            .iter()
            .map(|version| version.stack.position().bytes)
            .min()
        {
            self.ctx.prune_tokens(oldest);
        }
    }

    /// Returns a cancellation error every `check_interval` steps if asked to
    /// stop.
    fn check_cancelled(&mut self) -> Result<(), ParseError> {
        let interval = self.ctx.options.check_interval.max(1);
        let step = self.ctx.steps;
        self.ctx.steps += 1;
        if step % interval != 0 {
            return Ok(());
        }
        let flagged = self
            .ctx
            .options
            .cancellation
            .as_ref()
            .is_some_and(|flag| flag.is_cancelled());
        let expired = self
            .ctx
            .deadline
            .is_some_and(|deadline| Instant::now() >= deadline);
        if !flagged && !expired {
            return Ok(());
        }

        let best = self
            .versions
            .iter()
            .max_by_key(|version| version.stack.position().bytes);
        let fragments = best.map(|version| version.stack.subtrees()).unwrap_or_default();
        let partial = PartialTree::new(Arc::clone(&self.language), fragments);
        debug!(
            parsed = u32::from(partial.parsed_len()),
            timeout = expired,
            "parse cancelled"
        );
        Err(ParseError::Cancelled(Box::new(partial)))
    }
}
