// Supplier XML availability feed (AvailRS)
//
// Every <Option> is a jointly bookable bundle, so it maps onto one
// recommendation; every <Room> inside it is one rate of that bundle.

use std::collections::HashSet;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::catalog::SearchContext;
use crate::model::{Rate, Recommendation, Room, SearchCatalog};

pub const RECOMMENDATION_ID_PARAMETER: &str = "recommendation_id";

#[derive(Debug, PartialEq, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
#[serde(rename = "AvailRS")]
pub struct XmlAvailResponse {
    pub hotels: XmlHotels,
}

#[derive(Debug, PartialEq, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct XmlHotels {
    #[serde(rename = "Hotel")]
    pub hotels: Vec<XmlHotel>,
}

#[derive(Debug, PartialEq, Default, Deserialize, Clone, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct XmlHotel {
    #[serde(rename = "@code")]
    pub hotel_id: String,
    #[serde(rename = "@name")]
    pub hotel_name: String,
    pub meal_plans: XmlMealPlans,
}

#[derive(Debug, PartialEq, Default, Deserialize, Clone, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct XmlMealPlans {
    #[serde(rename = "MealPlan")]
    pub meal_plans: Vec<XmlMealPlan>,
}

#[derive(Debug, PartialEq, Default, Deserialize, Clone, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct XmlMealPlan {
    #[serde(rename = "@code")]
    pub code: String,
    pub options: XmlOptions,
}

#[derive(Debug, PartialEq, Default, Deserialize, Clone, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct XmlOptions {
    #[serde(rename = "Option")]
    pub options: Vec<XmlOption>,
}

#[derive(Debug, PartialEq, Default, Deserialize, Clone, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct XmlOption {
    #[serde(rename = "@status")]
    pub status: String,
    pub price: XmlPrice,
    pub rooms: XmlRooms,
    pub parameters: XmlParameters,
}

#[derive(Debug, PartialEq, Default, Deserialize, Clone, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct XmlPrice {
    #[serde(rename = "@currency")]
    pub currency: String,
    #[serde(rename = "@amount")]
    pub amount: String,
}

#[derive(Debug, PartialEq, Default, Deserialize, Clone, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct XmlRooms {
    #[serde(rename = "Room")]
    pub rooms: Vec<XmlRoom>,
}

#[derive(Debug, PartialEq, Default, Deserialize, Clone, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct XmlRoom {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@rateKey")]
    pub rate_key: String,
    #[serde(rename = "@code")]
    pub code: String,
    #[serde(rename = "@description")]
    pub description: String,
    #[serde(rename = "@nonRefundable")]
    pub non_refundable: String,
    pub price: XmlPrice,
}

#[derive(Debug, PartialEq, Default, Deserialize, Clone, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct XmlParameters {
    #[serde(rename = "Parameter")]
    pub parameters: Vec<XmlParameter>,
}

#[derive(Debug, PartialEq, Default, Deserialize, Clone, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct XmlParameter {
    #[serde(rename = "@key")]
    pub key: String,
    #[serde(rename = "@value")]
    pub value: String,
}

impl XmlParameters {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|p| p.key == key)
            .map(|p| p.value.as_str())
    }
}

impl XmlRoom {
    // Only an explicit flag says anything about the cancellation policy
    pub fn refundable(&self) -> Option<bool> {
        match self.non_refundable.trim() {
            flag if flag.eq_ignore_ascii_case("true") => Some(false),
            flag if flag.eq_ignore_ascii_case("false") => Some(true),
            _ => None,
        }
    }
}

impl XmlAvailResponse {
    /// One catalog per hotel in the feed.
    pub fn into_catalogs(self, context: &SearchContext) -> Vec<SearchCatalog> {
        self.hotels
            .hotels
            .into_iter()
            .map(|hotel| hotel.into_catalog(context))
            .collect()
    }
}

impl XmlHotel {
    pub fn into_catalog(self, context: &SearchContext) -> SearchCatalog {
        let mut rooms: Vec<Room> = Vec::new();
        let mut recommendations = Vec::new();
        let mut seen_ids = HashSet::new();

        for meal_plan in self.meal_plans.meal_plans {
            for (index, option) in meal_plan.options.options.into_iter().enumerate() {
                let recommendation_id = option
                    .parameters
                    .get(RECOMMENDATION_ID_PARAMETER)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("{}-{}-{}", self.hotel_id, meal_plan.code, index));

                if !seen_ids.insert(recommendation_id.clone()) {
                    warn!(
                        hotel_id = %self.hotel_id,
                        recommendation_id = %recommendation_id,
                        "Recommendation id repeated within hotel, derived rate ids will merge"
                    );
                }

                let mut rate_ids = Vec::with_capacity(option.rooms.rooms.len());
                for xml_room in option.rooms.rooms {
                    let rate_id = if xml_room.rate_key.is_empty() {
                        format!("{}:{}", recommendation_id, xml_room.id)
                    } else {
                        xml_room.rate_key.clone()
                    };

                    let currency = if xml_room.price.currency.is_empty() {
                        context.currency.clone()
                    } else {
                        xml_room.price.currency.clone()
                    };

                    let rate = Rate {
                        rate_id: rate_id.clone(),
                        board_type: Some(meal_plan.code.clone()),
                        price: xml_room.price.amount.parse().ok(),
                        currency: Some(currency),
                        refundable: xml_room.refundable(),
                        ..Rate::default()
                    };

                    match rooms.iter_mut().find(|room| room.room_id == xml_room.code) {
                        Some(room) => {
                            if room.rate(&rate_id).is_none() {
                                room.rates.push(rate);
                            }
                        }
                        None => rooms.push(Room {
                            room_id: xml_room.code.clone(),
                            name: Some(xml_room.description.clone()).filter(|d| !d.is_empty()),
                            rates: vec![rate],
                        }),
                    }

                    if !rate_ids.contains(&rate_id) {
                        rate_ids.push(rate_id);
                    }
                }

                recommendations.push(Recommendation {
                    recommendation_id,
                    rate_ids,
                });
            }
        }

        SearchCatalog {
            search_id: context.search_id.clone(),
            hotel_id: self.hotel_id,
            check_in: context.check_in,
            check_out: context.check_out,
            currency: context.currency.clone(),
            rooms,
            recommendations,
            fetched_at: Utc::now(),
        }
    }
}
