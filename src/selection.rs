// Room-by-room rate selection on top of the compatibility engine

use std::collections::HashSet;

use thiserror::Error;
use tracing::{debug, info};

use crate::compatibility::{
    compatible_rates, filter_rooms, possible_recommendations, validate_selection,
};
use crate::model::{Recommendation, Room, SearchCatalog, SelectionValidation};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SelectionError {
    #[error("Unknown rate: {0}")]
    UnknownRate(String),

    #[error("Rate already selected: {0}")]
    DuplicateRate(String),

    #[error("Rate {0} cannot be combined with the current selection")]
    IncompatibleRate(String),
}

/// The rates a guest has picked so far, in the order they were picked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateSelection {
    rate_ids: Vec<String>,
}

impl RateSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores a selection, e.g. from a saved session. Rate IDs must be unique.
    pub fn from_rate_ids(rate_ids: Vec<String>) -> Result<Self, SelectionError> {
        let mut seen = HashSet::new();
        for rate_id in &rate_ids {
            if !seen.insert(rate_id.as_str()) {
                return Err(SelectionError::DuplicateRate(rate_id.clone()));
            }
        }
        Ok(Self { rate_ids })
    }

    pub fn rate_ids(&self) -> &[String] {
        &self.rate_ids
    }

    pub fn len(&self) -> usize {
        self.rate_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rate_ids.is_empty()
    }

    pub fn contains(&self, rate_id: &str) -> bool {
        self.rate_ids.iter().any(|id| id == rate_id)
    }

    pub fn validate(&self, recommendations: &[Recommendation]) -> SelectionValidation {
        validate_selection(&self.rate_ids, recommendations)
    }

    /// Rooms and rates the guest may pick next.
    ///
    /// Before anything is selected every rate that belongs to some
    /// recommendation is on offer.
    pub fn choices(&self, catalog: &SearchCatalog) -> Vec<Room> {
        if self.rate_ids.is_empty() {
            let bookable: HashSet<&str> = catalog
                .recommendations
                .iter()
                .flat_map(|rec| rec.rate_ids.iter().map(String::as_str))
                .collect();
            return filter_rooms(&catalog.rooms, &bookable);
        }

        compatible_rates(&self.rate_ids, &catalog.rooms, &catalog.recommendations)
    }

    pub fn possible_recommendations(&self, catalog: &SearchCatalog) -> Vec<Recommendation> {
        possible_recommendations(&self.rate_ids, &catalog.recommendations)
    }

    /// The recommendation that would be booked for the current selection.
    pub fn recommendation<'a>(&self, catalog: &'a SearchCatalog) -> Option<&'a Recommendation> {
        self.validate(&catalog.recommendations)
            .recommendation_id
            .and_then(|id| catalog.recommendation(&id))
    }

    /// Adds a rate for the next room. The selection is left untouched on error.
    pub fn select(
        &mut self,
        rate_id: &str,
        catalog: &SearchCatalog,
    ) -> Result<SelectionValidation, SelectionError> {
        if self.contains(rate_id) {
            return Err(SelectionError::DuplicateRate(rate_id.to_string()));
        }

        if catalog.rate(rate_id).is_none() {
            return Err(SelectionError::UnknownRate(rate_id.to_string()));
        }

        let mut candidate = self.rate_ids.clone();
        candidate.push(rate_id.to_string());

        let validation = validate_selection(&candidate, &catalog.recommendations);
        if !validation.valid {
            debug!(
                search_id = %catalog.search_id,
                rate_id,
                "Rejected incompatible rate"
            );
            return Err(SelectionError::IncompatibleRate(rate_id.to_string()));
        }

        self.rate_ids = candidate;
        debug!(
            search_id = %catalog.search_id,
            rate_id,
            selected = self.rate_ids.len(),
            recommendation_id = ?validation.recommendation_id,
            "Selected rate"
        );
        Ok(validation)
    }

    /// Drops a previously selected rate. Returns false if it was not selected.
    pub fn deselect(&mut self, rate_id: &str) -> bool {
        let before = self.rate_ids.len();
        self.rate_ids.retain(|id| id != rate_id);
        self.rate_ids.len() != before
    }

    pub fn reset(&mut self) {
        if !self.rate_ids.is_empty() {
            info!(cleared = self.rate_ids.len(), "Resetting rate selection");
        }
        self.rate_ids.clear();
    }
}
