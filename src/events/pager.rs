//! Filtering, ordering and pagination of the event board.

use std::collections::HashMap;

use super::timer::EventTimer;
use crate::model::{EventCategory, LauncherEvent};

/// One page of the board
#[derive(Debug)]
pub struct BoardPage<'a> {
    pub items: Vec<(&'a LauncherEvent, Option<&'a EventTimer>)>,
    /// 1-based
    pub page: usize,
    pub page_count: usize,
    /// Events matching the filter across all pages
    pub total: usize,
}

/// Category filter and page cursor
#[derive(Debug, Clone)]
pub struct EventBoard {
    category: Option<EventCategory>,
    page: usize,
    page_size: usize,
}

impl EventBoard {
    pub fn new(page_size: usize) -> Self {
        Self {
            category: None,
            page: 1,
            page_size: page_size.max(1),
        }
    }

    pub fn category(&self) -> Option<EventCategory> {
        self.category
    }

    /// Switch the filter (`None` shows every category). Always returns to
    /// the first page.
    pub fn set_category(&mut self, category: Option<EventCategory>) {
        self.category = category;
        self.page = 1;
    }

    pub fn page(&self) -> usize {
        self.page
    }

    /// Jump to a page, clamped to the available range
    pub fn go_to(&mut self, page: usize, total: usize) {
        self.page = page.clamp(1, self.page_count(total));
    }

    pub fn next_page(&mut self, total: usize) {
        self.go_to(self.page + 1, total);
    }

    pub fn prev_page(&mut self, total: usize) {
        self.go_to(self.page.saturating_sub(1), total);
    }

    pub fn page_count(&self, total: usize) -> usize {
        total.div_ceil(self.page_size).max(1)
    }

    /// Events matching the current filter, soonest first. Events without a
    /// timer sort last; ties keep their list order.
    pub fn filtered<'a>(
        &self,
        events: &'a [LauncherEvent],
        timers: &'a HashMap<String, EventTimer>,
    ) -> Vec<(&'a LauncherEvent, Option<&'a EventTimer>)> {
        let mut rows: Vec<_> = events
            .iter()
            .filter(|e| self.category.is_none_or(|c| e.category == c))
            .map(|e| (e, timers.get(&e.id)))
            .collect();

        rows.sort_by_key(|(_, timer)| match timer {
            Some(t) => (false, t.remaining_ms),
            None => (true, 0),
        });
        rows
    }

    pub fn view<'a>(
        &self,
        events: &'a [LauncherEvent],
        timers: &'a HashMap<String, EventTimer>,
    ) -> BoardPage<'a> {
        let rows = self.filtered(events, timers);
        let total = rows.len();
        let page_count = self.page_count(total);
        let page = self.page.min(page_count);

        let items = rows
            .into_iter()
            .skip((page - 1) * self.page_size)
            .take(self.page_size)
            .collect();

        BoardPage {
            items,
            page,
            page_count,
            total,
        }
    }
}
