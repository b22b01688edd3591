use serde::{Deserialize, Serialize};

use super::pool::CandidatePools;

pub const SIGHT: &str = "sight";
pub const FOOD: &str = "food";
pub const MAX_ITEMS_PER_DAY: usize = 4;

pub const COST_LOW_PER_DAY: f64 = 50.0;
pub const COST_HIGH_PER_DAY: f64 = 120.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSlot {
    pub start: &'static str,
    pub end: &'static str,
}

pub const MORNING: TimeSlot = TimeSlot {
    start: "09:00",
    end: "11:00",
};
pub const LUNCH: TimeSlot = TimeSlot {
    start: "11:00",
    end: "13:00",
};
pub const AFTERNOON: TimeSlot = TimeSlot {
    start: "14:00",
    end: "16:00",
};
pub const LATE_AFTERNOON: TimeSlot = TimeSlot {
    start: "16:00",
    end: "18:00",
};

pub const TIME_SLOTS: [TimeSlot; 4] = [MORNING, LUNCH, AFTERNOON, LATE_AFTERNOON];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poi {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blurb: Option<String>,
}

impl Poi {
    pub fn new(name: impl Into<String>, lat: f64, lon: f64, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lat,
            lon,
            category: category.into(),
            start: None,
            end: None,
            blurb: None,
        }
    }

    /// Lowercased category, `sight` when blank.
    pub fn category_key(&self) -> String {
        let category = self.category.trim();
        if category.is_empty() {
            SIGHT.to_string()
        } else {
            category.to_lowercase()
        }
    }

    pub fn is_food(&self) -> bool {
        self.category_key() == FOOD
    }

    pub fn set_slot(&mut self, slot: TimeSlot) {
        self.start = Some(slot.start.to_string());
        self.end = Some(slot.end.to_string());
    }

    pub fn with_slot(mut self, slot: TimeSlot) -> Self {
        self.set_slot(slot);
        self
    }

    pub fn needs_blurb(&self) -> bool {
        self.blurb
            .as_deref()
            .map(|b| b.trim().is_empty())
            .unwrap_or(true)
    }
}

fn default_category() -> String {
    SIGHT.to_string()
}

/// A day as returned by the planner, before any repair. `items` is required:
/// an object without it is not a day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DayPlan {
    #[serde(default)]
    pub date: String,
    pub items: Vec<Poi>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Day {
    pub date: String,
    pub items: Vec<Poi>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl Day {
    pub fn new(date: impl Into<String>, items: Vec<Poi>) -> Self {
        Self {
            date: date.into(),
            items,
            score: None,
        }
    }

    pub fn has_capacity(&self) -> bool {
        self.items.len() < MAX_ITEMS_PER_DAY
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub cost_low: f64,
    pub cost_high: f64,
}

impl Totals {
    pub fn for_days(num_days: usize) -> Self {
        Self {
            cost_low: COST_LOW_PER_DAY * num_days as f64,
            cost_high: COST_HIGH_PER_DAY * num_days as f64,
        }
    }
}

/// Totals as the whole-trip planner may report them; either figure can be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialTotals {
    #[serde(default)]
    pub cost_low: Option<f64>,
    #[serde(default)]
    pub cost_high: Option<f64>,
}

impl PartialTotals {
    pub fn or_defaults(self, num_days: usize) -> Totals {
        let defaults = Totals::for_days(num_days);
        Totals {
            cost_low: self.cost_low.unwrap_or(defaults.cost_low),
            cost_high: self.cost_high.unwrap_or(defaults.cost_high),
        }
    }
}

/// Output of the whole-trip planning request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItineraryPlan {
    #[serde(default)]
    pub days: Vec<DayPlan>,
    #[serde(default)]
    pub totals: PartialTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub days: Vec<Day>,
    pub totals: Totals,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayOrigin {
    Planner,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanMode {
    #[default]
    PerDay,
    WholeTrip,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanOutcome {
    #[serde(flatten)]
    pub plan: Plan,
    #[serde(skip)]
    pub origins: Vec<DayOrigin>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub planner_errors: Vec<String>,
}

/// Everything one planning run owns; dropped when the run ends.
#[derive(Debug)]
pub struct RunContext {
    pub destination: String,
    pub dates: Vec<String>,
    pub interests: Vec<String>,
    pub pools: CandidatePools,
}

impl RunContext {
    pub fn new(
        destination: impl Into<String>,
        dates: Vec<String>,
        interests: Vec<String>,
        pools: CandidatePools,
    ) -> Self {
        Self {
            destination: destination.into(),
            dates,
            interests,
            pools,
        }
    }
}

/// Trims, lowercases and dedupes interest tags, keeping request order.
pub fn normalize_interests<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in raw {
        let interest = value.as_ref().trim().to_lowercase();
        if !interest.is_empty() && !out.contains(&interest) {
            out.push(interest);
        }
    }
    out
}
