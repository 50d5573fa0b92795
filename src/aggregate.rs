use std::collections::HashSet;

use crate::distribution;
use crate::types::{AggregatedStats, Distribution, EventRow};

/// Combine the selected rows into one set of totals. An empty `selected_ids`
/// means "all rows" (the dashboard's select-all default). Pure: malformed
/// cells degrade to empty distributions inside the parser, so this never
/// fails and never touches shared state.
pub fn aggregate(rows: &[EventRow], selected_ids: &HashSet<String>) -> AggregatedStats {
    let mut stats = AggregatedStats::default();
    for row in rows {
        if !selected_ids.is_empty() && !selected_ids.contains(&row.id) {
            continue;
        }
        stats.registrations = stats.registrations.saturating_add(row.registrations);
        stats.submissions = stats.submissions.saturating_add(row.submissions);
        stats.teams = stats.teams.saturating_add(row.teams);
        stats.page_visits = stats.page_visits.saturating_add(row.page_visits);

        merge_into(&mut stats.gender, distribution::parse_logged("gender", &row.gender));
        merge_into(
            &mut stats.daily_registrations,
            distribution::parse_logged("daily_registrations", &row.daily_registrations),
        );
        merge_into(&mut stats.country, distribution::parse_logged("country", &row.country));
        merge_into(&mut stats.state, distribution::parse_logged("state", &row.state));
        merge_into(&mut stats.city, distribution::parse_logged("city", &row.city));
        merge_into(
            &mut stats.occupation,
            distribution::parse_logged("occupation", &row.occupation),
        );
    }
    stats
}

/// Sum `from` into `into` per category. Categories missing on either side
/// keep their partial sums; nothing is dropped or zero-filled.
fn merge_into(into: &mut Distribution, from: Distribution) {
    for (key, count) in from {
        let slot = into.entry(key).or_insert(0);
        *slot = slot.saturating_add(count);
    }
}
