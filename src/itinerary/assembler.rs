use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::dedup::{dedupe_by_name, normalize_name};
use super::models::{
    Day, DayPlan, Poi, TimeSlot, AFTERNOON, FOOD, LUNCH, MAX_ITEMS_PER_DAY, MORNING, SIGHT,
};
use super::pool::CandidatePools;
use crate::providers::Summarizer;

pub const MIN_CATEGORIES: usize = 2;

/// Slot for an item pulled in to add variety.
pub fn variety_slot(interest: &str) -> TimeSlot {
    if interest == FOOD {
        LUNCH
    } else {
        MORNING
    }
}

/// Repairs one day: variety, a single lunch-time food stop, the item cap and blurbs.
///
/// Each step is best effort. When the pool it needs is empty the step does nothing.
/// Items pulled in by a repair step are never dropped by a later step or by the cap.
pub async fn enforce_daily_mix(
    day: DayPlan,
    interests: &[String],
    pools: &mut CandidatePools,
    summarizer: &dyn Summarizer,
) -> Day {
    let mut items = dedupe_by_name(&day.items);
    for item in &items {
        pools.mark_assigned(item);
    }

    let mut pulled: HashSet<String> = HashSet::new();
    let mut categories = category_set(&items);
    if categories.len() < MIN_CATEGORIES {
        for interest in interests {
            if categories.len() >= MIN_CATEGORIES {
                break;
            }
            if categories.contains(interest) {
                continue;
            }
            if let Some(poi) = pools.pop_interest(interest) {
                debug!(date = %day.date, name = %poi.name, interest = %interest, "adding item for variety");
                add_repair_item(&mut items, &mut pulled, poi.with_slot(variety_slot(interest)));
                categories = category_set(&items);
            }
        }
        if categories.len() < MIN_CATEGORIES && !categories.contains(SIGHT) {
            if let Some(sight) = pools.pop_sight() {
                debug!(date = %day.date, name = %sight.name, "adding sight for variety");
                add_repair_item(&mut items, &mut pulled, sight.with_slot(AFTERNOON));
            }
        }
    }

    if interests.iter().any(|interest| interest == FOOD) {
        enforce_single_food(&mut items, &mut pulled, pools);
    }

    cap_items(&mut items, &pulled);
    fill_blurbs(&mut items, summarizer).await;

    Day::new(day.date, items)
}

fn category_set(items: &[Poi]) -> HashSet<String> {
    items.iter().map(Poi::category_key).collect()
}

fn add_repair_item(items: &mut Vec<Poi>, pulled: &mut HashSet<String>, poi: Poi) {
    make_room(items, pulled);
    pulled.insert(normalize_name(&poi.name));
    items.push(poi);
}

/// Drops planner items until one more fits, taking the latest item of the
/// most repeated category each time.
fn make_room(items: &mut Vec<Poi>, pulled: &HashSet<String>) {
    while items.len() >= MAX_ITEMS_PER_DAY {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for item in items.iter() {
            *counts.entry(item.category_key()).or_default() += 1;
        }
        let victim = items
            .iter()
            .enumerate()
            .filter(|(_, item)| !pulled.contains(&normalize_name(&item.name)))
            .max_by_key(|(index, item)| (counts.get(&item.category_key()).copied().unwrap_or(0), *index))
            .map(|(index, _)| index);
        let Some(index) = victim else {
            break;
        };
        let dropped = items.remove(index);
        debug!(name = %dropped.name, "dropping planner item to make room");
    }
}

/// Trims to the daily cap from the end, skipping items the repair steps added.
fn cap_items(items: &mut Vec<Poi>, pulled: &HashSet<String>) {
    while items.len() > MAX_ITEMS_PER_DAY {
        match items
            .iter()
            .rposition(|item| !pulled.contains(&normalize_name(&item.name)))
        {
            Some(index) => {
                items.remove(index);
            }
            None => {
                items.truncate(MAX_ITEMS_PER_DAY);
            }
        }
    }
}

fn enforce_single_food(items: &mut Vec<Poi>, pulled: &mut HashSet<String>, pools: &mut CandidatePools) {
    let food_count = items.iter().filter(|item| item.is_food()).count();
    if food_count == 0 {
        if let Some(food) = pools.pop_interest(FOOD) {
            add_repair_item(items, pulled, food.with_slot(LUNCH));
        }
    } else if food_count > 1 {
        let mut kept = false;
        items.retain(|item| {
            if !item.is_food() {
                return true;
            }
            !std::mem::replace(&mut kept, true)
        });
    }

    for item in items.iter_mut().filter(|item| item.is_food()) {
        if item.start.as_deref() == Some(MORNING.start) {
            item.set_slot(LUNCH);
        } else {
            item.start.get_or_insert_with(|| LUNCH.start.to_string());
            item.end.get_or_insert_with(|| LUNCH.end.to_string());
        }
    }
}

/// One lookup per missing blurb, in item order.
pub async fn fill_blurbs(items: &mut [Poi], summarizer: &dyn Summarizer) {
    for item in items.iter_mut().filter(|item| item.needs_blurb()) {
        item.blurb = Some(summarizer.summarize(&item.name).await);
    }
}
