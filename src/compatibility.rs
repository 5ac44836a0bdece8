// Rate compatibility for multi-room bookings
//
// All three operations are pure: the caller owns the selection and the
// catalog, passes them in, and gets new collections back.

use std::collections::HashSet;

use crate::model::{Recommendation, Room, SelectionValidation};

/// Checks whether the selected rates can still be booked together.
///
/// Returns the first recommendation (in input order) whose bundle contains
/// every selected rate. An empty selection or an empty recommendation set is
/// never valid.
pub fn validate_selection(
    selected_rate_ids: &[String],
    recommendations: &[Recommendation],
) -> SelectionValidation {
    if selected_rate_ids.is_empty() || recommendations.is_empty() {
        return SelectionValidation::invalid();
    }

    recommendations
        .iter()
        .find(|rec| rec.covers(selected_rate_ids))
        .map_or_else(SelectionValidation::invalid, |rec| {
            SelectionValidation::matched(rec.recommendation_id.clone())
        })
}

/// Narrows the room catalog to the rates that can still join the selection.
///
/// Already selected rates are not offered again, and rooms with nothing left
/// to offer are dropped. Room order and rate order are preserved.
pub fn compatible_rates(
    selected_rate_ids: &[String],
    rooms: &[Room],
    recommendations: &[Recommendation],
) -> Vec<Room> {
    if selected_rate_ids.is_empty() || rooms.is_empty() || recommendations.is_empty() {
        return Vec::new();
    }

    let selected: HashSet<&str> = selected_rate_ids.iter().map(String::as_str).collect();
    let candidates: HashSet<&str> = recommendations
        .iter()
        .filter(|rec| rec.covers(selected_rate_ids))
        .flat_map(|rec| rec.rate_ids.iter().map(String::as_str))
        .filter(|rate_id| !selected.contains(rate_id))
        .collect();

    if candidates.is_empty() {
        return Vec::new();
    }

    filter_rooms(rooms, &candidates)
}

/// Recommendations still reachable from the current selection, in input order.
pub fn possible_recommendations(
    selected_rate_ids: &[String],
    recommendations: &[Recommendation],
) -> Vec<Recommendation> {
    if selected_rate_ids.is_empty() {
        return recommendations.to_vec();
    }

    recommendations
        .iter()
        .filter(|rec| rec.covers(selected_rate_ids))
        .cloned()
        .collect()
}

// Rooms restricted to the candidate rate IDs; empty rooms disappear
pub(crate) fn filter_rooms(rooms: &[Room], candidates: &HashSet<&str>) -> Vec<Room> {
    rooms
        .iter()
        .filter_map(|room| {
            let rates: Vec<_> = room
                .rates
                .iter()
                .filter(|rate| candidates.contains(rate.rate_id.as_str()))
                .cloned()
                .collect();

            if rates.is_empty() {
                None
            } else {
                Some(Room {
                    room_id: room.room_id.clone(),
                    name: room.name.clone(),
                    rates,
                })
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Rate;
    use test_case::test_case;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn recommendations() -> Vec<Recommendation> {
        vec![
            Recommendation::new("A", ["r1", "r2"]),
            Recommendation::new("B", ["r1", "r3"]),
        ]
    }

    fn rooms() -> Vec<Room> {
        vec![
            Room::new("DBL", vec![Rate::new("r1"), Rate::new("r2")]),
            Room::new("TWN", vec![Rate::new("r3"), Rate::new("r9")]),
            Room::new("STE", vec![Rate::new("r9")]),
        ]
    }

    fn rate_ids(rooms: &[Room]) -> Vec<Vec<&str>> {
        rooms
            .iter()
            .map(|room| room.rates.iter().map(|r| r.rate_id.as_str()).collect())
            .collect()
    }

    #[test_case(&[], true, false, None; "#1 Empty selection")]
    #[test_case(&["r1"], false, false, None; "#2 Empty recommendations")]
    #[test_case(&["r1"], true, true, Some("A"); "#3 First match wins")]
    #[test_case(&["r1", "r3"], true, true, Some("B"); "#4 Second bundle")]
    #[test_case(&["r1", "r2"], true, true, Some("A"); "#5 Full bundle")]
    #[test_case(&["r1", "r4"], true, false, None; "#6 Unknown rate")]
    #[test_case(&["r2", "r3"], true, false, None; "#7 Rates from different bundles")]
    fn test_validate_selection(
        selected: &[&str],
        with_recommendations: bool,
        expected_valid: bool,
        expected_id: Option<&str>,
    ) {
        let recs = if with_recommendations {
            recommendations()
        } else {
            Vec::new()
        };

        let result = validate_selection(&ids(selected), &recs);
        assert_eq!(result.valid, expected_valid);
        assert_eq!(result.recommendation_id.as_deref(), expected_id);
    }

    #[test]
    fn test_validate_selection_tie_break_is_input_order() {
        let recs = vec![
            Recommendation::new("wide", ["r1", "r2", "r3", "r4"]),
            Recommendation::new("exact", ["r1"]),
        ];

        let result = validate_selection(&ids(&["r1"]), &recs);
        assert_eq!(result, SelectionValidation::matched("wide"));
    }

    #[test]
    fn test_compatible_rates_excludes_selected() {
        let result = compatible_rates(&ids(&["r1"]), &rooms(), &recommendations());

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].room_id, "DBL");
        assert_eq!(result[1].room_id, "TWN");
        assert_eq!(rate_ids(&result), vec![vec!["r2"], vec!["r3"]]);
    }

    #[test]
    fn test_compatible_rates_drops_emptied_rooms() {
        let result = compatible_rates(&ids(&["r1", "r2"]), &rooms(), &recommendations());

        // Bundle A is fully chosen; nothing is left to offer
        assert!(result.is_empty());

        let recs = vec![Recommendation::new("C", ["r1", "r3"])];
        let result = compatible_rates(&ids(&["r1"]), &rooms(), &recs);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].room_id, "TWN");
        assert!(result.iter().all(|room| !room.rates.is_empty()));
    }

    #[test]
    fn test_compatible_rates_preserves_rate_order_and_fields() {
        let mut priced = Rate::new("r3");
        priced.price = Some(99.0);
        let rooms = vec![Room {
            room_id: "FAM".to_string(),
            name: Some("Family Room".to_string()),
            rates: vec![priced.clone(), Rate::new("r5"), Rate::new("r2")],
        }];
        let recs = vec![Recommendation::new("A", ["r1", "r2", "r3"])];

        let result = compatible_rates(&ids(&["r1"]), &rooms, &recs);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].name.as_deref(), Some("Family Room"));
        assert_eq!(result[0].rates, vec![priced, Rate::new("r2")]);
    }

    #[test_case(&[], true, true; "#1 Empty selection")]
    #[test_case(&["r1"], false, true; "#2 Empty rooms")]
    #[test_case(&["r1"], true, false; "#3 Empty recommendations")]
    #[test_case(&["r1", "r4"], true, true; "#4 No compatible recommendation")]
    fn test_compatible_rates_degenerate_inputs(
        selected: &[&str],
        with_rooms: bool,
        with_recommendations: bool,
    ) {
        let rooms = if with_rooms { rooms() } else { Vec::new() };
        let recs = if with_recommendations {
            recommendations()
        } else {
            Vec::new()
        };

        assert!(compatible_rates(&ids(selected), &rooms, &recs).is_empty());
    }

    #[test]
    fn test_compatible_rates_is_idempotent() {
        let selected = ids(&["r1"]);
        let rooms = rooms();
        let recs = recommendations();

        let first = compatible_rates(&selected, &rooms, &recs);
        let second = compatible_rates(&selected, &rooms, &recs);
        assert_eq!(first, second);
        // Inputs are untouched
        assert_eq!(rooms[0].rates.len(), 2);
    }

    #[test]
    fn test_possible_recommendations_narrowing() {
        let recs = recommendations();

        let all = possible_recommendations(&[], &recs);
        assert_eq!(all, recs);

        let both = possible_recommendations(&ids(&["r1"]), &recs);
        assert_eq!(both.len(), 2);

        let only_a = possible_recommendations(&ids(&["r1", "r2"]), &recs);
        assert_eq!(only_a, vec![recs[0].clone()]);

        assert!(possible_recommendations(&ids(&["r1", "r4"]), &recs).is_empty());
    }

    #[test]
    fn test_possible_recommendations_with_empty_set() {
        assert!(possible_recommendations(&ids(&["r1"]), &[]).is_empty());
        assert!(possible_recommendations(&[], &[]).is_empty());
    }

    #[test]
    fn test_recommendation_without_rates_only_matches_empty_selection() {
        let recs = vec![Recommendation::new("empty", Vec::<String>::new())];

        assert!(!validate_selection(&ids(&["r1"]), &recs).valid);
        assert_eq!(possible_recommendations(&[], &recs).len(), 1);
        assert!(possible_recommendations(&ids(&["r1"]), &recs).is_empty());
    }
}
