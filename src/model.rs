// Typed records shared by the engine, the selection flow and the ingestion layer

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

// Backends send `null` as often as they omit a field; both mean "empty"
pub(crate) fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// A bundle of rate IDs that can be booked together, one per room of the stay.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Recommendation {
    pub recommendation_id: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub rate_ids: Vec<String>,
}

impl Recommendation {
    pub fn new<I, S>(recommendation_id: impl Into<String>, rate_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            recommendation_id: recommendation_id.into(),
            rate_ids: rate_ids.into_iter().map(Into::into).collect(),
        }
    }

    /// True when every selected rate ID is part of this bundle.
    pub fn covers(&self, selected_rate_ids: &[String]) -> bool {
        selected_rate_ids
            .iter()
            .all(|selected| self.contains_rate(selected))
    }

    pub fn contains_rate(&self, rate_id: &str) -> bool {
        self.rate_ids.iter().any(|id| id == rate_id)
    }
}

/// A priced, policy-bound offer for one room.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Rate {
    pub rate_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub board_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refundable: Option<bool>,
    // Anything else the backend attaches to a rate travels through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Rate {
    pub fn new(rate_id: impl Into<String>) -> Self {
        Self {
            rate_id: rate_id.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Room {
    pub room_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(deserialize_with = "null_as_empty")]
    pub rates: Vec<Rate>,
}

impl Room {
    pub fn new(room_id: impl Into<String>, rates: Vec<Rate>) -> Self {
        Self {
            room_id: room_id.into(),
            name: None,
            rates,
        }
    }

    pub fn rate(&self, rate_id: &str) -> Option<&Rate> {
        self.rates.iter().find(|rate| rate.rate_id == rate_id)
    }
}

/// Outcome of checking a selection against the recommendation set.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionValidation {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation_id: Option<String>,
}

impl SelectionValidation {
    pub fn invalid() -> Self {
        Self::default()
    }

    pub fn matched(recommendation_id: impl Into<String>) -> Self {
        Self {
            valid: true,
            recommendation_id: Some(recommendation_id.into()),
        }
    }
}

/// Everything one availability search returned for a single hotel.
///
/// Held read-only while the guest selects rates; a new search produces a
/// new catalog rather than mutating this one.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchCatalog {
    pub search_id: String,
    pub hotel_id: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub currency: String,
    pub rooms: Vec<Room>,
    pub recommendations: Vec<Recommendation>,
    pub fetched_at: DateTime<Utc>,
}

impl SearchCatalog {
    /// Finds the room offering the given rate.
    pub fn room_of_rate(&self, rate_id: &str) -> Option<&Room> {
        self.rooms.iter().find(|room| room.rate(rate_id).is_some())
    }

    pub fn rate(&self, rate_id: &str) -> Option<&Rate> {
        self.rooms.iter().find_map(|room| room.rate(rate_id))
    }

    pub fn recommendation(&self, recommendation_id: &str) -> Option<&Recommendation> {
        self.recommendations
            .iter()
            .find(|rec| rec.recommendation_id == recommendation_id)
    }

    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recommendation_covers_subset_only() {
        let rec = Recommendation::new("A", ["r1", "r2"]);

        assert!(rec.covers(&[]));
        assert!(rec.covers(&["r1".to_string()]));
        assert!(rec.covers(&["r2".to_string(), "r1".to_string()]));
        assert!(!rec.covers(&["r1".to_string(), "r3".to_string()]));
    }

    #[test]
    fn test_null_and_missing_collections_decode_as_empty() {
        let json = r#"[
            {"recommendationId": "A", "rateIds": null},
            {"recommendationId": "B"}
        ]"#;
        let recs: Vec<Recommendation> = serde_json::from_str(json).unwrap();
        assert!(recs.iter().all(|rec| rec.rate_ids.is_empty()));

        let room: Room = serde_json::from_str(r#"{"roomId": "DBL", "rates": null}"#).unwrap();
        assert_eq!(room.room_id, "DBL");
        assert!(room.rates.is_empty());
    }

    #[test]
    fn test_rate_keeps_unknown_fields() {
        let json = r#"{
            "rateId": "R1",
            "boardType": "BB",
            "price": 120.5,
            "bookingCode": "TESTCODE"
        }"#;
        let rate: Rate = serde_json::from_str(json).unwrap();

        assert_eq!(rate.rate_id, "R1");
        assert_eq!(rate.board_type.as_deref(), Some("BB"));
        assert_eq!(rate.price, Some(120.5));
        assert_eq!(
            rate.extra.get("bookingCode"),
            Some(&Value::String("TESTCODE".to_string()))
        );

        let back = serde_json::to_value(&rate).unwrap();
        assert_eq!(back["bookingCode"], "TESTCODE");
        assert!(back.get("currency").is_none());
    }

    #[test]
    fn test_validation_serializes_without_missing_id() {
        let invalid = serde_json::to_string(&SelectionValidation::invalid()).unwrap();
        assert_eq!(invalid, r#"{"valid":false}"#);

        let matched = serde_json::to_string(&SelectionValidation::matched("A")).unwrap();
        assert_eq!(matched, r#"{"valid":true,"recommendationId":"A"}"#);
    }
}
