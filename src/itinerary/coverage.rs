use std::collections::HashSet;

use tracing::{debug, info};

use super::models::{Day, Poi, AFTERNOON, FOOD, LUNCH};
use super::pool::CandidatePools;
use crate::providers::Summarizer;

/// Makes every requested interest show up at least once across the trip,
/// placing one item per missing interest on the earliest day with room.
///
/// Returns the interests that could not be placed.
pub async fn enforce_global_coverage(
    days: &mut [Day],
    interests: &[String],
    pools: &mut CandidatePools,
    summarizer: &dyn Summarizer,
) -> Vec<String> {
    let covered: HashSet<String> = days
        .iter()
        .flat_map(|day| day.items.iter().map(Poi::category_key))
        .collect();

    let mut unresolved = Vec::new();
    for interest in interests.iter().filter(|i| !covered.contains(*i)) {
        if !pools.has_interest(interest) {
            debug!(interest = %interest, "no candidates left to cover interest");
            unresolved.push(interest.clone());
            continue;
        }
        let Some(day) = days.iter_mut().find(|day| day.has_capacity()) else {
            debug!(interest = %interest, "no day has room to cover interest");
            unresolved.push(interest.clone());
            continue;
        };
        let Some(mut item) = pools.pop_interest(interest) else {
            unresolved.push(interest.clone());
            continue;
        };

        item.set_slot(if interest == FOOD { LUNCH } else { AFTERNOON });
        item.blurb = Some(summarizer.summarize(&item.name).await);
        info!(interest = %interest, date = %day.date, name = %item.name, "added item to cover interest");
        day.items.push(item);
    }
    unresolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::itinerary::testing::{poi, pools, strings, FakeSummarizer};

    fn full_day(date: &str, prefix: &str) -> Day {
        Day::new(
            date,
            (0..4)
                .map(|i| poi(&format!("{prefix} {i}"), "history"))
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_missing_interest_lands_on_first_day_with_room() {
        let mut days = vec![
            full_day("2025-09-01", "Temple"),
            Day::new("2025-09-02", vec![poi("Senso-ji", "history")]),
            Day::new("2025-09-03", vec![]),
        ];
        let mut pools = pools(&[("nature", 2), ("food", 1)], 0);
        let summarizer = FakeSummarizer::default();

        let unresolved = enforce_global_coverage(
            &mut days,
            &strings(&["history", "nature", "food"]),
            &mut pools,
            &summarizer,
        )
        .await;

        assert!(unresolved.is_empty());
        assert_eq!(days[0].items.len(), 4);
        assert_eq!(days[1].items.len(), 3);
        let nature = &days[1].items[1];
        assert_eq!(nature.category, "nature");
        assert_eq!(nature.start.as_deref(), Some("14:00"));
        let food = &days[1].items[2];
        assert_eq!(food.start.as_deref(), Some("11:00"));
        assert_eq!(food.blurb.as_deref(), Some("About food spot 0."));
        assert!(days[2].items.is_empty());
    }

    #[tokio::test]
    async fn test_gap_left_when_no_capacity_or_pool() {
        let mut days = vec![full_day("2025-09-01", "Temple")];
        let mut pools = pools(&[("nature", 2)], 0);
        let summarizer = FakeSummarizer::default();

        let unresolved = enforce_global_coverage(
            &mut days,
            &strings(&["history", "nature", "art"]),
            &mut pools,
            &summarizer,
        )
        .await;

        assert_eq!(unresolved, vec!["nature", "art"]);
        assert_eq!(days[0].items.len(), 4);
        assert!(pools.has_interest("nature"));
    }
}
