use chrono::NaiveDate;

use crate::models::MatchSummary;
use crate::utils::date::format_date_label;

#[derive(Debug, Clone, PartialEq)]
pub struct DateGroup {
    pub label: String,
    pub matches: Vec<MatchSummary>,
}

/// Partitions a flat ordered list into calendar-day groups, preserving the
/// order in which each label is first seen. Meaningful under chronological
/// ordering; the caller decides whether to group.
pub fn group_by_date_label(matches: &[MatchSummary], today: NaiveDate) -> Vec<DateGroup> {
    let mut groups: Vec<DateGroup> = Vec::new();

    for summary in matches {
        let label = format_date_label(summary.kickoff.date_naive(), today);

        match groups.iter_mut().find(|group| group.label == label) {
            Some(group) => group.matches.push(summary.clone()),
            None => groups.push(DateGroup {
                label,
                matches: vec![summary.clone()],
            }),
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::models::MatchSummary;

    fn match_on(id: &str, days_before_today: i64) -> MatchSummary {
        let kickoff = Utc.with_ymd_and_hms(2026, 8, 6, 16, 0, 0).unwrap()
            - Duration::days(days_before_today);

        MatchSummary {
            match_id: id.to_string(),
            kickoff,
            home_team: "Flamengo".to_string(),
            home_score: 1,
            away_team: "Vasco".to_string(),
            away_score: 0,
            league: "BSA".to_string(),
            avg_rating: 4.0,
            ratings_num: 2,
            rating_proportions: Default::default(),
            status: "finished".to_string(),
        }
    }

    #[test]
    fn groups_preserve_first_seen_label_order() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();
        let matches = vec![match_on("a", 0), match_on("b", 1), match_on("c", 0)];

        let groups = group_by_date_label(&matches, today);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].label, "Hoje");
        assert_eq!(
            groups[0]
                .matches
                .iter()
                .map(|m| m.match_id.as_str())
                .collect::<Vec<_>>(),
            ["a", "c"]
        );
        assert_eq!(groups[1].label, "Ontem");
        assert_eq!(groups[1].matches[0].match_id, "b");
    }

    #[test]
    fn empty_input_yields_no_groups() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();
        assert!(group_by_date_label(&[], today).is_empty());
    }
}
