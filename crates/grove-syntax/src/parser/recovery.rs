//! Error recovery.
//!
//! When every version is stuck, the cheapest paused one is repaired by the
//! first strategy that works:
//!
//! 1. delete up to `max_skipped_tokens` tokens in front of the lookahead,
//! 2. insert missing tokens so that the lookahead can be shifted,
//! 3. wrap skipped tokens and popped stack entries in an error node, trying
//!    fewer skipped tokens first and then fewer popped entries.
//!
//! Should nothing make progress before the end of input, the whole document
//! becomes a single error root.

use std::sync::Arc;

use tracing::debug;

use super::builder::TreeBuilder;
use super::driver::{Driver, Lookahead, Status, Version};
use super::stack::Stack;
use crate::error::ParseError;
use crate::language::{Action, ParseTable, StateId, Symbol};
use crate::text::Length;
use crate::tree::green::{Follow, Subtree};

/// Insertion sequences kept per search depth.
const INSERTION_FRONTIER: usize = 64;

impl Driver<'_> {
    /// Repairs the paused version at `index`. Returns a root when the input
    /// could only be wrapped whole.
    pub(super) fn recover(&mut self, index: usize) -> Result<Option<Subtree>, ParseError> {
        let mut version = self.versions.swap_remove(index);
        self.versions.clear();
        self.ctx.stats.recoveries += 1;
        version.status = Status::Active;

        let lookahead = match version.lookahead.take() {
            Some(lookahead) if lookahead.subtree.is_leaf() => lookahead,
            Some(lookahead) => match lookahead.subtree.first_token() {
                Some(token) => Lookahead::new(token),
                None => Lookahead::new(
                    self.ctx
                        .lex(version.stack.position(), version.stack.next_mode()),
                ),
            },
            None => Lookahead::new(
                self.ctx
                    .lex(version.stack.position(), version.stack.next_mode()),
            ),
        };
        version.lookahead = Some(lookahead.clone());

        if self.try_delete(&mut version, &lookahead) {
            self.versions.push(version);
            return Ok(None);
        }
        if self.try_insert(&mut version, &lookahead)? {
            self.versions.push(version);
            return Ok(None);
        }
        self.skip_to_viable(version, lookahead)
    }

    /// Skips a few tokens if the one after them fits.
    fn try_delete(&mut self, version: &mut Version, lookahead: &Lookahead) -> bool {
        if lookahead.subtree.symbol == Symbol::END {
            return false;
        }
        let builder = self.ctx.builder();
        let table = self.ctx.language.table();
        let states = version.stack.counted_states();
        let mode = version.stack.next_mode();

        let mut region = builder.error_region();
        region.push(Arc::clone(&lookahead.subtree));
        let mut position = version.stack.position() + lookahead.subtree.len;
        for _ in 0..self.ctx.options.max_skipped_tokens {
            let (extras, token) = self.ctx.lex_significant(position, mode);
            if is_viable(table, &states, token.symbol) {
                let start = u32::from(version.stack.position().bytes);
                let error = region.complete(&builder, version.stack.state());
                debug!(start, len = u32::from(error.len.bytes), "deleted tokens");
                builder.push_uncounted(&mut version.stack, error);
                for extra in extras {
                    builder.push_uncounted(&mut version.stack, extra);
                }
                version.lookahead = Some(Lookahead::new(token));
                return true;
            }
            if token.symbol == Symbol::END {
                break;
            }
            for extra in &extras {
                position += extra.len;
            }
            position += token.len;
            region.extend(extras);
            region.push(token);
        }
        region.abandon();
        false
    }

    /// Inserts the cheapest sequence of missing tokens after which the
    /// lookahead fits. Sequences longer than one token are only tried at the
    /// end of input.
    fn try_insert(
        &mut self,
        version: &mut Version,
        lookahead: &Lookahead,
    ) -> Result<bool, ParseError> {
        let language = self.ctx.language;
        let table = language.table();
        let position = version.stack.position();
        let depth = if lookahead.subtree.symbol == Symbol::END {
            self.ctx.options.max_insertions.max(1)
        } else {
            1
        };
        let candidates: Vec<Symbol> = language.insertable_terminals().collect();

        let mut frontier = vec![(Vec::new(), version.stack.counted_states(), 0u32)];
        let mut found: Option<(u32, Vec<Symbol>, Subtree)> = None;
        for _ in 0..depth {
            let mut next = Vec::new();
            for (sequence, states, cost) in &frontier {
                for &candidate in &candidates {
                    let Some(after) = simulate(table, states.clone(), candidate) else {
                        continue;
                    };
                    let cost = cost.saturating_add(language.missing_cost(candidate));
                    let mut sequence = sequence.clone();
                    sequence.push(candidate);
                    let token = self.relex(position, &after, &lookahead.subtree);
                    if is_viable(table, &after, token.symbol) {
                        if found.as_ref().map_or(true, |(best, _, _)| cost < *best) {
                            found = Some((cost, sequence, token));
                        }
                    } else {
                        next.push((sequence, after, cost));
                    }
                }
            }
            if found.is_some() || next.is_empty() {
                break;
            }
            next.sort_by_key(|(_, _, cost)| *cost);
            next.truncate(INSERTION_FRONTIER);
            frontier = next;
        }

        let Some((_, sequence, token)) = found else {
            return Ok(false);
        };
        let builder = self.ctx.builder();
        for symbol in sequence {
            debug!(
                kind = language.symbol_name(symbol),
                at = u32::from(version.stack.position().bytes),
                "inserted missing token"
            );
            let missing = builder.missing(symbol, &version.stack);
            feed(&builder, table, &mut version.stack, missing)?;
        }
        version.lookahead = Some(Lookahead::new(token));
        Ok(true)
    }

    /// Finds the fewest skipped tokens, then the fewest popped entries, after
    /// which some token fits, and wraps everything in between in an error
    /// node.
    fn skip_to_viable(
        &mut self,
        mut version: Version,
        lookahead: Lookahead,
    ) -> Result<Option<Subtree>, ParseError> {
        let table = self.ctx.language.table();
        let states = version.stack.counted_states();
        let mode = version.stack.next_mode();
        let mut skipped: Vec<Subtree> = Vec::new();
        let mut start = version.stack.position();
        let mut candidate = lookahead.subtree;

        loop {
            let first = usize::from(skipped.is_empty());
            for popped in first..states.len() {
                let remaining = &states[..states.len() - popped];
                let token = self.relex(start, remaining, &candidate);
                if is_viable(table, remaining, token.symbol) {
                    self.wrap_error(&mut version, popped, skipped, token);
                    self.versions.push(version);
                    return Ok(None);
                }
            }
            if candidate.symbol == Symbol::END {
                break;
            }
            let mut position = start + candidate.len;
            skipped.push(candidate);
            let (extras, token) = self.ctx.lex_significant(position, mode);
            for extra in &extras {
                position += extra.len;
            }
            skipped.extend(extras);
            start = position;
            candidate = token;
        }

        debug!("no recovery found, wrapping the document in an error");
        let builder = self.ctx.builder();
        let mut region = builder.error_region();
        region.extend(version.stack.pop_all());
        region.extend(skipped);
        Ok(Some(region.complete(&builder, StateId::START)))
    }

    /// `token`, found at `start`, scanned again for the state on top of
    /// `states`. Contextual tokens rejected where the token was first scanned
    /// may be accepted there.
    fn relex(&mut self, start: Length, states: &[StateId], token: &Subtree) -> Subtree {
        let language = self.ctx.language;
        let mode = states
            .last()
            .map_or(token.lex_mode, |state| language.table().lex_mode(*state));
        if mode == token.lex_mode || token.symbol == Symbol::END {
            Arc::clone(token)
        } else {
            self.ctx.lex(start, mode)
        }
    }

    fn wrap_error(
        &mut self,
        version: &mut Version,
        popped: usize,
        mut skipped: Vec<Subtree>,
        candidate: Subtree,
    ) {
        let builder = self.ctx.builder();
        let mut region = builder.error_region();
        if let Some(entries) = version.stack.pop_counted(popped) {
            region.extend(entries);
        }
        let split = skipped
            .iter()
            .rposition(|subtree| !subtree.is_extra)
            .map_or(0, |last| last + 1);
        let trailing = skipped.split_off(split);
        region.extend(skipped);
        if region.is_empty() {
            region.abandon();
        } else {
            let error = region.complete(&builder, version.stack.state());
            debug!(
                popped,
                len = u32::from(error.len.bytes),
                "wrapped input in an error node"
            );
            builder.push_uncounted(&mut version.stack, error);
        }
        for extra in trailing {
            builder.push_uncounted(&mut version.stack, extra);
        }
        version.lookahead = Some(Lookahead::new(candidate));
    }
}

/// Runs the reductions `symbol` triggers over `states` and shifts it.
/// Returns the resulting states, or `None` if `symbol` is rejected. Accepting
/// leaves the states as they are.
fn simulate(table: &ParseTable, mut states: Vec<StateId>, symbol: Symbol) -> Option<Vec<StateId>> {
    let limit = states.len() + 256;
    for _ in 0..limit {
        let top = *states.last()?;
        let actions = table.actions(top, symbol);
        if let Some(state) = actions.iter().find_map(|action| match action {
            Action::Shift(state) => Some(*state),
            _ => None,
        }) {
            states.push(state);
            return Some(states);
        }
        match actions.first()? {
            Action::Accept => return Some(states),
            Action::Shift(_) => return None,
            Action::Reduce(id) => {
                let production = table.production(*id)?;
                let len = usize::from(production.len);
                if states.len() <= len {
                    return None;
                }
                states.truncate(states.len() - len);
                let next = table.goto(*states.last()?, production.lhs)?;
                states.push(next);
            }
        }
    }
    None
}

fn is_viable(table: &ParseTable, states: &[StateId], symbol: Symbol) -> bool {
    simulate(table, states.to_vec(), symbol).is_some()
}

/// Drives a missing token through the reductions it triggers and shifts it.
fn feed(
    builder: &TreeBuilder<'_>,
    table: &ParseTable,
    stack: &mut Stack,
    token: Subtree,
) -> Result<(), ParseError> {
    let follow = Follow {
        symbol: token.symbol,
        mode: token.lex_mode,
    };
    loop {
        let actions = table.actions(stack.state(), token.symbol);
        if let Some(state) = actions.iter().find_map(|action| match action {
            Action::Shift(state) => Some(*state),
            _ => None,
        }) {
            builder.shift(stack, state, token);
            return Ok(());
        }
        match actions.first() {
            Some(Action::Reduce(id)) => builder.reduce(stack, *id, follow, false)?,
            _ => return Ok(()),
        }
    }
}
