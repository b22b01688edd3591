use std::collections::{HashMap, HashSet, VecDeque};

use tracing::trace;

use super::dedup::{dedupe_by_name, filter_chains, normalize_name};
use super::models::{Poi, FOOD, SIGHT};

pub const INTEREST_KEEP_AT_LEAST: usize = 10;
pub const SIGHTS_POOL_LIMIT: usize = 60;

/// Per-run candidate queues: one per interest plus the generic sights queue.
///
/// Queues only shrink from the front. Every POI handed to a day is recorded
/// by dedup key, so a place that sits in more than one queue (a museum that is
/// both "history" and "art") is never scheduled twice in a run.
#[derive(Debug, Default)]
pub struct CandidatePools {
    by_interest: HashMap<String, VecDeque<Poi>>,
    sights: VecDeque<Poi>,
    assigned: HashSet<String>,
}

impl CandidatePools {
    pub fn new(by_interest: HashMap<String, Vec<Poi>>, sights: Vec<Poi>) -> Self {
        Self {
            by_interest: by_interest
                .into_iter()
                .map(|(interest, items)| (interest, items.into()))
                .collect(),
            sights: sights.into(),
            assigned: HashSet::new(),
        }
    }

    /// Builds pools from raw provider results: interest pools are deduplicated
    /// and chain-filtered, the sights pool drops food entries and is capped.
    pub fn from_sources(by_interest: HashMap<String, Vec<Poi>>, sights: &[Poi]) -> Self {
        let by_interest = by_interest
            .into_iter()
            .map(|(interest, items)| {
                let deduped = dedupe_by_name(&items);
                (interest, filter_chains(&deduped, INTEREST_KEEP_AT_LEAST))
            })
            .collect();
        let non_food: Vec<Poi> = sights
            .iter()
            .filter(|poi| poi.category_key() != FOOD)
            .cloned()
            .collect();
        let mut sights = dedupe_by_name(&non_food);
        sights.truncate(SIGHTS_POOL_LIMIT);
        Self::new(by_interest, sights)
    }

    /// Pops the next unassigned POI for `interest`. The `sight` interest reads
    /// the sights queue when no dedicated interest queue exists.
    pub fn pop_interest(&mut self, interest: &str) -> Option<Poi> {
        let Self {
            by_interest,
            sights,
            assigned,
        } = self;
        let queue = match by_interest.get_mut(interest) {
            Some(queue) => queue,
            None if interest == SIGHT => sights,
            None => return None,
        };
        pop_unassigned(queue, assigned)
    }

    pub fn pop_sight(&mut self) -> Option<Poi> {
        pop_unassigned(&mut self.sights, &mut self.assigned)
    }

    pub fn has_interest(&self, interest: &str) -> bool {
        match self.by_interest.get(interest) {
            Some(queue) => self.any_unassigned(queue),
            None if interest == SIGHT => self.has_sight(),
            None => false,
        }
    }

    pub fn has_sight(&self) -> bool {
        self.any_unassigned(&self.sights)
    }

    /// Up to `limit` unassigned POIs from the front of an interest queue, without consuming.
    pub fn peek_interest(&self, interest: &str, limit: usize) -> Vec<Poi> {
        match self.by_interest.get(interest) {
            Some(queue) => self.peek(queue, limit),
            None if interest == SIGHT => self.peek_sights(limit),
            None => Vec::new(),
        }
    }

    pub fn peek_sights(&self, limit: usize) -> Vec<Poi> {
        self.peek(&self.sights, limit)
    }

    /// Records a POI placed on a day by someone other than the pools (the planner).
    pub fn mark_assigned(&mut self, poi: &Poi) {
        let key = normalize_name(&poi.name);
        if !key.is_empty() {
            self.assigned.insert(key);
        }
    }

    pub fn is_assigned(&self, poi: &Poi) -> bool {
        self.assigned.contains(&normalize_name(&poi.name))
    }

    fn peek(&self, queue: &VecDeque<Poi>, limit: usize) -> Vec<Poi> {
        queue
            .iter()
            .filter(|poi| !self.is_assigned(poi))
            .take(limit)
            .cloned()
            .collect()
    }

    fn any_unassigned(&self, queue: &VecDeque<Poi>) -> bool {
        queue.iter().any(|poi| !self.is_assigned(poi))
    }
}

fn pop_unassigned(queue: &mut VecDeque<Poi>, assigned: &mut HashSet<String>) -> Option<Poi> {
    while let Some(poi) = queue.pop_front() {
        let key = normalize_name(&poi.name);
        if assigned.insert(key) {
            return Some(poi);
        }
        trace!(name = %poi.name, "discarding already scheduled candidate");
    }
    None
}
