// Rate compatibility for multi-room hotel bookings

pub mod catalog;
pub mod client;
pub mod compatibility;
pub mod model;
pub mod selection;
pub mod store;
pub mod supplier;
pub mod xml_response;

// Re-export key types for convenience
pub use catalog::{CatalogProcessor, ProcessingError, SearchContext};
pub use client::{
    fetch_catalogs, load_catalog, ApiError, CatalogClient, CatalogRequest, ClientConfig,
    ClientError, HttpCatalogClient, RetryConfig,
};
pub use compatibility::{compatible_rates, possible_recommendations, validate_selection};
pub use model::{Rate, Recommendation, Room, SearchCatalog, SelectionValidation};
pub use selection::{RateSelection, SelectionError};
pub use store::{CatalogStore, StoreConfig, StoreStatsReport};
