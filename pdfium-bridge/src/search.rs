//! Incremental text search over a text page.
//!
//! A session is bound to one text page and one query when it starts. It has
//! no current match until the first successful `find_next`/`find_prev`.
//!
//! # Example
//!
//! ```ignore
//! let search = bridge.find_start(text, "keyword", PdfSearchOptions::default(), 0)?;
//! while let Some(m) = bridge.find_next_match(search)? {
//!     println!("Found match at char {} (length {})", m.start_index, m.length);
//! }
//! bridge.find_close(search)?;
//! ```

use crate::bridge::Bridge;
use crate::engine::Engine;
use crate::error::{check, PdfError, Result};
use crate::handle::{SearchHandle, TextPageHandle};
use crate::registry::SearchEntry;
use crate::strings::WideString;

/// Search option flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PdfSearchOptions {
    /// Case-sensitive matching.
    pub match_case: bool,
    /// Match whole words only.
    pub match_whole_word: bool,
    /// Find consecutive matches (no gap between matches).
    pub consecutive: bool,
}

impl PdfSearchOptions {
    pub const MATCH_CASE: u32 = 0x0001;
    pub const MATCH_WHOLE_WORD: u32 = 0x0002;
    pub const CONSECUTIVE: u32 = 0x0004;

    /// Create new search options with all flags disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable case-sensitive matching.
    pub fn case_sensitive(mut self) -> Self {
        self.match_case = true;
        self
    }

    /// Enable whole word matching.
    pub fn whole_word(mut self) -> Self {
        self.match_whole_word = true;
        self
    }

    /// Enable consecutive matching.
    pub fn consecutive(mut self) -> Self {
        self.consecutive = true;
        self
    }

    /// Decode a host flag bitmask. Unknown bits are ignored.
    pub fn from_flags(flags: u32) -> Self {
        Self {
            match_case: flags & Self::MATCH_CASE != 0,
            match_whole_word: flags & Self::MATCH_WHOLE_WORD != 0,
            consecutive: flags & Self::CONSECUTIVE != 0,
        }
    }

    /// Convert to engine flags.
    pub fn to_flags(self) -> u32 {
        let mut flags = 0u32;
        if self.match_case {
            flags |= Self::MATCH_CASE;
        }
        if self.match_whole_word {
            flags |= Self::MATCH_WHOLE_WORD;
        }
        if self.consecutive {
            flags |= Self::CONSECUTIVE;
        }
        flags
    }
}

/// Where a session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    /// Started, not yet advanced.
    Created,
    /// The last step found a match; it is the current one.
    Matched,
    /// The last step ran off either end of the page.
    Exhausted,
}

/// A match: character offset and length within the text page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchMatch {
    pub start_index: i32,
    pub length: i32,
}

impl<E: Engine> Bridge<E> {
    /// Start a search for `query` on a text page.
    ///
    /// `start_index` is the character to start from; -1 starts at the end
    /// of the page (for backward searches).
    pub fn find_start(
        &self,
        text: TextPageHandle,
        query: &str,
        options: PdfSearchOptions,
        start_index: i32,
    ) -> Result<SearchHandle> {
        let wide = WideString::new(query);
        let mut registry = self.lock();
        let engine = self.engine();

        let raw = {
            let entry = registry.text(text)?;
            let raw = engine.find_start(&entry.raw, &wide, options.to_flags(), start_index);
            if let Err(err) = check(engine) {
                if let Some(raw) = raw {
                    engine.find_close(raw);
                }
                return Err(err);
            }
            raw.ok_or_else(|| {
                tracing::error!(query, start_index, "Engine did not start a search");
                PdfError::SearchFailed
            })?
        };

        Ok(registry.searches.insert(SearchEntry {
            raw,
            text,
            query: query.to_string(),
            state: SearchState::Created,
        }))
    }

    /// Advance to the next match. Returns whether one was found.
    pub fn find_next(&self, search: SearchHandle) -> Result<bool> {
        self.step(search, |engine, raw| engine.find_next(raw))
    }

    /// Step back to the previous match. Returns whether one was found.
    pub fn find_prev(&self, search: SearchHandle) -> Result<bool> {
        self.step(search, |engine, raw| engine.find_prev(raw))
    }

    /// Advance and return the new current match, if any.
    pub fn find_next_match(&self, search: SearchHandle) -> Result<Option<SearchMatch>> {
        if !self.find_next(search)? {
            return Ok(None);
        }
        self.current_match(search).map(Some)
    }

    /// Step back and return the new current match, if any.
    pub fn find_prev_match(&self, search: SearchHandle) -> Result<Option<SearchMatch>> {
        if !self.find_prev(search)? {
            return Ok(None);
        }
        self.current_match(search).map(Some)
    }

    /// Character index where the current match starts.
    pub fn search_result_index(&self, search: SearchHandle) -> Result<i32> {
        let registry = self.lock();
        let entry = current(registry.search(search)?)?;
        let engine = self.engine();
        let index = engine.search_result_index(&entry.raw);
        check(engine)?;
        Ok(index)
    }

    /// Number of characters in the current match.
    pub fn search_count(&self, search: SearchHandle) -> Result<i32> {
        let registry = self.lock();
        let entry = current(registry.search(search)?)?;
        let engine = self.engine();
        let count = engine.search_count(&entry.raw);
        check(engine)?;
        Ok(count)
    }

    /// Offset and length of the current match.
    pub fn current_match(&self, search: SearchHandle) -> Result<SearchMatch> {
        let registry = self.lock();
        let entry = current(registry.search(search)?)?;
        let engine = self.engine();
        let start_index = engine.search_result_index(&entry.raw);
        check(engine)?;
        let length = engine.search_count(&entry.raw);
        check(engine)?;
        Ok(SearchMatch {
            start_index,
            length,
        })
    }

    pub fn search_state(&self, search: SearchHandle) -> Result<SearchState> {
        Ok(self.lock().search(search)?.state)
    }

    /// The query a session was started with.
    pub fn search_query(&self, search: SearchHandle) -> Result<String> {
        Ok(self.lock().search(search)?.query.clone())
    }

    /// End a search session.
    pub fn find_close(&self, search: SearchHandle) -> Result<()> {
        let mut registry = self.lock();
        if registry.orphans.searches.remove(&search) {
            tracing::warn!(?search, "Search closed after its text page");
            return Err(PdfError::InvalidHandle { kind: "text page" });
        }
        let entry = registry
            .searches
            .remove(search)
            .ok_or(PdfError::InvalidHandle { kind: "search" })?;

        let engine = self.engine();
        engine.find_close(entry.raw);
        check(engine)
    }

    fn step(
        &self,
        search: SearchHandle,
        advance: impl FnOnce(&E, &mut E::Search) -> bool,
    ) -> Result<bool> {
        let mut registry = self.lock();
        let entry = registry.search_mut(search)?;
        let engine = self.engine();
        let found = advance(engine, &mut entry.raw);
        check(engine)?;
        entry.state = if found {
            SearchState::Matched
        } else {
            SearchState::Exhausted
        };
        Ok(found)
    }
}

fn current<E: Engine>(entry: &SearchEntry<E>) -> Result<&SearchEntry<E>> {
    match entry.state {
        SearchState::Matched => Ok(entry),
        SearchState::Created | SearchState::Exhausted => Err(PdfError::NoCurrentMatch),
    }
}
