//! In-memory fakes shared by the itinerary tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::error::{PlanningError, PlanningResult};
use super::models::{DayPlan, ItineraryPlan, Poi};
use super::planner::DayPlanner;
use super::pool::CandidatePools;
use super::retry::Sleeper;
use crate::providers::Summarizer;

/// Returns immediately and remembers every requested wait.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    waits: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn waits(&self) -> Vec<Duration> {
        self.waits
            .lock()
            .map(|waits| waits.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        if let Ok(mut waits) = self.waits.lock() {
            waits.push(duration);
        }
    }
}

#[derive(Default)]
pub struct FakeSummarizer {
    titles: Mutex<Vec<String>>,
}

impl FakeSummarizer {
    pub fn titles(&self) -> Vec<String> {
        self.titles.lock().unwrap().clone()
    }
}

#[async_trait]
impl Summarizer for FakeSummarizer {
    async fn summarize(&self, title: &str) -> String {
        self.titles.lock().unwrap().push(title.to_string());
        format!("About {title}.")
    }
}

/// Replays scripted day results; `None` entries fail like an exhausted retry loop.
pub struct ScriptedPlanner {
    days: Mutex<VecDeque<Option<DayPlan>>>,
    itinerary: Mutex<Option<ItineraryPlan>>,
    pub calls: Mutex<Vec<(String, usize)>>,
}

impl ScriptedPlanner {
    pub fn days(days: Vec<Option<DayPlan>>) -> Self {
        Self {
            days: Mutex::new(days.into()),
            itinerary: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn always_failing() -> Self {
        Self::days(Vec::new())
    }

    pub fn itinerary(plan: ItineraryPlan) -> Self {
        let planner = Self::always_failing();
        *planner.itinerary.lock().unwrap() = Some(plan);
        planner
    }
}

fn exhausted() -> PlanningError {
    PlanningError::Transient {
        status: 429,
        attempts: 5,
        body: "rate limited".to_string(),
    }
}

#[async_trait]
impl DayPlanner for ScriptedPlanner {
    async fn plan_day(
        &self,
        _city: &str,
        date: &str,
        _interests: &[String],
        candidates: &[Poi],
    ) -> PlanningResult<DayPlan> {
        self.calls
            .lock()
            .unwrap()
            .push((date.to_string(), candidates.len()));
        match self.days.lock().unwrap().pop_front() {
            Some(Some(day)) => Ok(day),
            _ => Err(exhausted()),
        }
    }

    async fn plan_itinerary(
        &self,
        _city: &str,
        _dates: &[String],
        _interests: &[String],
        _pois: &[Poi],
    ) -> PlanningResult<ItineraryPlan> {
        self.itinerary.lock().unwrap().take().ok_or_else(exhausted)
    }
}

pub fn poi(name: &str, category: &str) -> Poi {
    Poi::new(name, 41.0 + name.len() as f64 * 0.001, 29.0, category)
}

pub fn numbered(prefix: &str, category: &str, count: usize) -> Vec<Poi> {
    (0..count)
        .map(|i| poi(&format!("{prefix} {i}"), category))
        .collect()
}

pub fn pools(interests: &[(&str, usize)], sights: usize) -> CandidatePools {
    let by_interest: HashMap<String, Vec<Poi>> = interests
        .iter()
        .map(|(interest, count)| {
            let prefix = format!("{interest} spot");
            (interest.to_string(), numbered(&prefix, interest, *count))
        })
        .collect();
    CandidatePools::new(by_interest, numbered("Sight", "sight", sights))
}

pub fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
