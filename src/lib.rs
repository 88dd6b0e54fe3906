// Flight search core: offer model, filtering, sorting, price display and
// the booking session built on top of them

pub mod api;
pub mod config;
pub mod duration;
pub mod filter;
pub mod offer;
pub mod pipeline;
pub mod price;
pub mod search;
pub mod session;
pub mod sort;

#[cfg(test)]
mod fixtures;

// Re-export key types for convenience
pub use api::{AmadeusClient, ApiError, Airport, City, FlightSearchProvider, Resource};
pub use config::{ClientConfig, ClientError};
pub use filter::{
    filter_offers, matches, BandRole, FilterCriteria, OfferFilter, PriceRange, StopsFilter,
    TimeBand, TimeBandTable,
};
pub use offer::{parse_offers, CarrierDirectory, FlightOffer, OfferSearchResults, SchemaError};
pub use pipeline::{project, OfferRow, ResultPipeline, ResultView};
pub use price::{normalize, ConversionTable, DisplayPrice, FractionDigits};
pub use search::{SearchForm, SearchFormErrors, SearchParams, TravelClass, TripType};
pub use session::{
    BookingConfirmation, BookingSession, CheckoutDetails, SearchStatus, SessionError, TripReview,
};
pub use sort::{sort_offers, SortMode};
