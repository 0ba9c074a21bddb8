use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::opendota::StatsSource;
use crate::pagination::{CursorOrder, cap_matches, next_cursor, sort_page};
use crate::records::{self, SlotMap};
use crate::store::Store;

pub const DEFAULT_MAX_PLAYER_MATCHES: i64 = 100;
const MAX_RECORDED_ERRORS: usize = 100;

/// Rows built for one match. Counts what was handed to the store, not what
/// the store accepted; rejected writes show up in
/// [`IngestSummary::suppressed_writes`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchOutcome {
    pub players: usize,
    pub details: usize,
    pub chat: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestSummary {
    pub started_at: String,
    pub finished_at: Option<String>,
    pub rounds_total: usize,
    pub rounds_failed: usize,
    pub matches_attempted: usize,
    pub matches_added: usize,
    pub matches_failed: usize,
    pub suppressed_writes: usize,
    pub errors: Vec<String>,
}

impl Default for IngestSummary {
    fn default() -> Self {
        Self {
            started_at: Utc::now().to_rfc3339(),
            finished_at: None,
            rounds_total: 0,
            rounds_failed: 0,
            matches_attempted: 0,
            matches_added: 0,
            matches_failed: 0,
            suppressed_writes: 0,
            errors: Vec::new(),
        }
    }
}

impl IngestSummary {
    fn record_error(&mut self, msg: String) {
        if self.errors.len() < MAX_RECORDED_ERRORS {
            self.errors.push(msg);
        }
    }
}

/// Drives fetches from a [`StatsSource`] into a [`Store`], one request and
/// one match at a time.
pub struct Ingestor<'a, S: StatsSource> {
    source: &'a S,
    store: &'a mut Store,
    summary: IngestSummary,
}

impl<'a, S: StatsSource> Ingestor<'a, S> {
    pub fn new(source: &'a S, store: &'a mut Store) -> Self {
        Self {
            source,
            store,
            summary: IngestSummary::default(),
        }
    }

    pub fn finish(mut self) -> IngestSummary {
        self.summary.finished_at = Some(Utc::now().to_rfc3339());
        self.summary
    }

    /// Fetches one match and stages its match, player, participation and chat
    /// rows. The match row goes in before any participant work, so a later
    /// failure (a player profile fetch, say) leaves it staged.
    pub fn process_match(&mut self, match_id: i64, is_pro: bool) -> Result<MatchOutcome> {
        let v = self.source.fetch_match(match_id)?;
        let match_row = records::match_row(match_id, &v, is_pro)?;
        let write = self.store.insert_match(&match_row);
        self.absorb(write);

        let participants = records::participants(&v);
        for participant in &participants {
            let profile = self.source.fetch_player(participant.account_id)?;
            let player = records::player_row(participant.account_id, &profile, is_pro);
            let write = self.store.insert_player(&player);
            self.absorb(write);
        }

        let slots = SlotMap::from_participants(&participants);
        let details = records::participation_rows(match_id, &participants);
        let write = self.store.insert_match_details(&details);
        self.absorb(write);

        let mut chat_count = 0;
        if records::has_chat(&v) {
            let chat = records::chat_rows(match_id, &v, &slots);
            chat_count = chat.len();
            let write = self.store.insert_chat(&chat);
            self.absorb(write);
        }

        Ok(MatchOutcome {
            players: participants.len(),
            details: details.len(),
            chat: chat_count,
        })
    }

    /// Walks the pro match feed backwards for exactly `rounds` pages. The
    /// cursor stays put when a page fails or comes back empty.
    pub fn process_pro_matches(&mut self, rounds: usize, order: CursorOrder) {
        let mut cursor: Option<String> = None;

        for round in 0..rounds {
            self.summary.rounds_total += 1;
            let page = match self.source.fetch_pro_matches(cursor.as_deref()) {
                Ok(v) => records::match_ids(&v),
                Err(err) => {
                    warn!(round, error = %format!("{err:#}"), "pro match page failed");
                    self.summary.rounds_failed += 1;
                    self.summary
                        .record_error(format!("round {round}: {err:#}"));
                    continue;
                }
            };

            let unreadable = page.iter().filter(|id| id.is_none()).count();
            if unreadable > 0 {
                self.skip_unreadable(unreadable, &format!("round {round}"));
            }

            let ids = page.iter().flatten().map(|id| id.to_string()).collect();
            let sorted = sort_page(ids, order);
            let Some(next) = next_cursor(&sorted) else {
                warn!(round, cursor = ?cursor, "pro match page was empty");
                self.summary.rounds_failed += 1;
                self.summary
                    .record_error(format!("round {round}: no readable matches"));
                continue;
            };
            info!(
                round,
                matches = sorted.len(),
                cursor = %next,
                "fetched pro match page"
            );
            cursor = Some(next);

            for id in &sorted {
                self.run_match(id, true);
            }
        }
    }

    /// Processes the leading `max_matches` entries of a player's history;
    /// zero or a negative cap processes all of them.
    pub fn process_player(&mut self, account_id: i64, max_matches: i64) -> Result<()> {
        let v = self
            .source
            .fetch_player_matches(account_id)
            .with_context(|| format!("load match history of player {account_id}"))?;
        let entries = cap_matches(records::match_ids(&v), max_matches);
        info!(
            account_id,
            matches = entries.len(),
            "fetched player match history"
        );

        for entry in entries {
            match entry {
                Some(id) => self.run_match(&id.to_string(), false),
                None => self.skip_unreadable(1, &format!("player {account_id}")),
            }
        }
        Ok(())
    }

    fn run_match(&mut self, raw_id: &str, is_pro: bool) {
        self.summary.matches_attempted += 1;
        let result = raw_id
            .parse::<i64>()
            .with_context(|| format!("invalid match id {raw_id:?}"))
            .and_then(|match_id| self.process_match(match_id, is_pro));
        match result {
            Ok(outcome) => {
                debug!(
                    match_id = raw_id,
                    players = outcome.players,
                    chat = outcome.chat,
                    "match processed"
                );
                self.summary.matches_added += 1;
            }
            Err(err) => {
                warn!(match_id = raw_id, error = %format!("{err:#}"), "match skipped");
                self.summary.matches_failed += 1;
                self.summary
                    .record_error(format!("match {raw_id}: {err:#}"));
            }
        }
    }

    /// Feed entries without a match id count as attempted and failed.
    fn skip_unreadable(&mut self, count: usize, scope: &str) {
        warn!(scope, count, "feed entries without a match_id");
        self.summary.matches_attempted += count;
        self.summary.matches_failed += count;
        self.summary
            .record_error(format!("{scope}: {count} feed entries without a match_id"));
    }

    fn absorb(&mut self, write: Result<usize>) {
        if let Err(err) = write {
            debug!(error = %format!("{err:#}"), "write suppressed");
            self.summary.suppressed_writes += 1;
        }
    }
}
