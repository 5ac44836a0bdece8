use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{null_as_empty, Recommendation, Room, SearchCatalog};

// Availability payload returned by the booking backend for one hotel
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierCatalogResponse {
    pub search_id: String,
    pub hotel_id: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub rooms: Vec<Room>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub recommendations: Vec<Recommendation>,
}

impl From<SupplierCatalogResponse> for SearchCatalog {
    fn from(item: SupplierCatalogResponse) -> Self {
        SearchCatalog {
            search_id: item.search_id,
            hotel_id: item.hotel_id,
            check_in: item.check_in,
            check_out: item.check_out,
            currency: item.currency,
            rooms: item.rooms,
            recommendations: item.recommendations,
            fetched_at: item.timestamp.unwrap_or_else(Utc::now),
        }
    }
}
