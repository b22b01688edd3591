use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::assembler::{enforce_daily_mix, fill_blurbs, variety_slot};
use super::coverage::enforce_global_coverage;
use super::dedup::dedupe_by_name;
use super::models::{
    Day, DayOrigin, DayPlan, PartialTotals, Plan, PlanMode, PlanOutcome, Poi, RunContext, Totals,
    AFTERNOON, LATE_AFTERNOON, MAX_ITEMS_PER_DAY, TIME_SLOTS,
};
use super::planner::{DayPlanner, MAX_CANDIDATES};
use super::pool::CandidatePools;
use super::retry::Sleeper;
use super::scoring::score_day;
use crate::providers::Summarizer;

pub const DEFAULT_DAY_PACING: Duration = Duration::from_millis(1800);
const CANDIDATES_PER_INTEREST: usize = 6;
const CANDIDATE_SIGHTS: usize = 10;
const FALLBACK_INTERESTS: usize = 2;
const SEQUENTIAL_FALLBACK_POIS: usize = 16;
const SEQUENTIAL_FALLBACK_BLURB: &str = "(fallback) Popular spot";

pub struct Orchestrator {
    planner: Arc<dyn DayPlanner>,
    summarizer: Arc<dyn Summarizer>,
    sleeper: Arc<dyn Sleeper>,
    pacing: Duration,
}

impl Orchestrator {
    pub fn new(
        planner: Arc<dyn DayPlanner>,
        summarizer: Arc<dyn Summarizer>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            planner,
            summarizer,
            sleeper,
            pacing: DEFAULT_DAY_PACING,
        }
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub async fn plan(&self, ctx: &mut RunContext, mode: PlanMode) -> PlanOutcome {
        match mode {
            PlanMode::PerDay => self.build_plan(ctx).await,
            PlanMode::WholeTrip => self.build_whole_trip(ctx).await,
        }
    }

    /// One planner call per date, each repaired or replaced by a fallback day,
    /// followed by the coverage pass and totals.
    pub async fn build_plan(&self, ctx: &mut RunContext) -> PlanOutcome {
        let run_id = Uuid::new_v4();
        info!(%run_id, destination = %ctx.destination, days = ctx.dates.len(), "building itinerary");

        let mut days = Vec::with_capacity(ctx.dates.len());
        let mut origins = Vec::with_capacity(ctx.dates.len());
        let mut planner_errors = Vec::new();

        for (index, date) in ctx.dates.iter().enumerate() {
            if index > 0 {
                self.sleeper.sleep(self.pacing).await;
            }

            let candidates = candidate_slice(&ctx.interests, &ctx.pools);
            debug!(%run_id, %date, candidates = candidates.len(), "planning day");

            match self
                .planner
                .plan_day(&ctx.destination, date, &ctx.interests, &candidates)
                .await
            {
                Ok(planned) => {
                    // The requested date is authoritative; planners sometimes echo a different one.
                    let planned = DayPlan {
                        date: date.clone(),
                        items: planned.items,
                    };
                    let day = enforce_daily_mix(
                        planned,
                        &ctx.interests,
                        &mut ctx.pools,
                        self.summarizer.as_ref(),
                    )
                    .await;
                    days.push(day);
                    origins.push(DayOrigin::Planner);
                }
                Err(e) => {
                    warn!(%run_id, %date, "planner failed, assembling fallback day: {}", e);
                    planner_errors.push(format!("Planner error for {}: {}", date, e));
                    let day = fallback_day(
                        date,
                        &ctx.interests,
                        &mut ctx.pools,
                        self.summarizer.as_ref(),
                    )
                    .await;
                    days.push(day);
                    origins.push(DayOrigin::Fallback);
                }
            }
        }

        let unresolved = enforce_global_coverage(
            &mut days,
            &ctx.interests,
            &mut ctx.pools,
            self.summarizer.as_ref(),
        )
        .await;
        if !unresolved.is_empty() {
            debug!(%run_id, ?unresolved, "interests left uncovered");
        }

        let plan = finalize(days, Totals::for_days(ctx.dates.len()));
        info!(%run_id, fallback_days = origins.iter().filter(|o| **o == DayOrigin::Fallback).count(), "itinerary ready");
        PlanOutcome {
            plan,
            origins,
            planner_errors,
        }
    }

    /// Single strict-schema request for the whole trip; on failure the
    /// candidates are laid out in order, four per day.
    pub async fn build_whole_trip(&self, ctx: &mut RunContext) -> PlanOutcome {
        let run_id = Uuid::new_v4();
        info!(%run_id, destination = %ctx.destination, days = ctx.dates.len(), "building whole-trip itinerary");

        let pois = candidate_slice(&ctx.interests, &ctx.pools);
        let (planned, totals, origin, planner_errors) = match self
            .planner
            .plan_itinerary(&ctx.destination, &ctx.dates, &ctx.interests, &pois)
            .await
        {
            Ok(plan) => (plan.days, plan.totals, DayOrigin::Planner, Vec::new()),
            Err(e) => {
                warn!(%run_id, "whole-trip planner failed, using sequential fallback: {}", e);
                let take = pois.len().min(SEQUENTIAL_FALLBACK_POIS);
                (
                    sequential_fallback(&ctx.dates, &pois[..take]),
                    PartialTotals::default(),
                    DayOrigin::Fallback,
                    vec![format!("Planner error for trip: {}", e)],
                )
            }
        };

        let days: Vec<Day> = planned
            .into_iter()
            .map(|day| {
                let mut items = dedupe_by_name(&day.items);
                items.truncate(MAX_ITEMS_PER_DAY);
                for item in &items {
                    ctx.pools.mark_assigned(item);
                }
                Day::new(day.date, items)
            })
            .collect();

        let origins = vec![origin; days.len()];
        let totals = totals.or_defaults(days.len());
        PlanOutcome {
            plan: finalize(days, totals),
            origins,
            planner_errors,
        }
    }
}

/// Up to 6 per interest plus up to 10 sights, deduplicated, at most 18.
pub fn candidate_slice(interests: &[String], pools: &CandidatePools) -> Vec<Poi> {
    let mut candidates: Vec<Poi> = Vec::new();
    for interest in interests {
        candidates.extend(pools.peek_interest(interest, CANDIDATES_PER_INTEREST));
    }
    candidates.extend(pools.peek_sights(CANDIDATE_SIGHTS));
    let mut candidates = dedupe_by_name(&candidates);
    candidates.truncate(MAX_CANDIDATES);
    candidates
}

/// Deterministic day: the first two interests, then afternoon sights.
pub async fn fallback_day(
    date: &str,
    interests: &[String],
    pools: &mut CandidatePools,
    summarizer: &dyn Summarizer,
) -> Day {
    let mut items = Vec::new();
    for interest in interests.iter().take(FALLBACK_INTERESTS) {
        if let Some(poi) = pools.pop_interest(interest) {
            items.push(poi.with_slot(variety_slot(interest)));
        }
    }
    for slot in [AFTERNOON, LATE_AFTERNOON] {
        if items.len() >= MAX_ITEMS_PER_DAY {
            break;
        }
        if let Some(sight) = pools.pop_sight() {
            items.push(sight.with_slot(slot));
        }
    }
    fill_blurbs(&mut items, summarizer).await;
    Day::new(date, items)
}

/// Four candidates per date in order, one per time slot.
pub fn sequential_fallback(dates: &[String], pois: &[Poi]) -> Vec<DayPlan> {
    let mut remaining = pois.iter();
    dates
        .iter()
        .map(|date| {
            let items = TIME_SLOTS
                .iter()
                .zip(remaining.by_ref())
                .map(|(slot, poi)| {
                    let mut item = poi.clone().with_slot(*slot);
                    item.blurb = Some(SEQUENTIAL_FALLBACK_BLURB.to_string());
                    item
                })
                .collect();
            DayPlan {
                date: date.clone(),
                items,
            }
        })
        .collect()
}

fn finalize(mut days: Vec<Day>, totals: Totals) -> Plan {
    for day in &mut days {
        day.score = Some(score_day(&day.items));
    }
    Plan { days, totals }
}
