// Booking flow state: search, result list, trip review and checkout

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::api::{ApiError, FlightSearchProvider, Resource};
use crate::duration::date_strip;
use crate::filter::{FilterCriteria, PriceRange};
use crate::offer::{FlightOffer, OfferSearchResults};
use crate::pipeline::{OfferRow, ResultPipeline, ResultView};
use crate::price::{DisplayPrice, FractionDigits};
use crate::search::{SearchForm, SearchFormErrors, SearchParams};
use crate::sort::SortMode;

// Days shown either side of the travel date
pub const DATE_STRIP_RADIUS: i64 = 3;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No search has been run yet")]
    NoSearch,

    #[error("No flights found for this search")]
    NoResults,

    #[error("Unknown flight offer: {0}")]
    UnknownOffer(String),

    #[error("No flight details found. Please select a flight first.")]
    NoSelection,

    #[error("Invalid checkout details: {}", .0.join("; "))]
    InvalidCheckout(Vec<String>),

    #[error(transparent)]
    InvalidSearch(#[from] SearchFormErrors),

    #[error("{message}")]
    SearchFailed {
        message: &'static str,
        #[source]
        source: ApiError,
    },
}

// Identifies one search request. Only the most recent ticket may land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchTicket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStatus {
    Loaded { offers: usize, rejected: usize },
    Stale,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FareBreakdown {
    pub base: String,
    pub fees: String,
    pub total: String,
    pub total_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AmenityLine {
    pub description: String,
    pub chargeable: bool,
}

// Everything the review step shows for the selected offer.
#[derive(Debug, Clone, Serialize)]
pub struct TripReview {
    pub flight: OfferRow,
    pub round_trip: bool,
    pub fare: FareBreakdown,
    pub amenities: Vec<AmenityLine>,
}

#[derive(Debug, Clone, Default)]
pub struct BillingAddress {
    pub line1: String,
    pub line2: String,
    pub city: String,
    pub postal_code: String,
    pub pan: String,
}

#[derive(Clone, Default)]
pub struct CheckoutDetails {
    pub title: String,
    pub surname: String,
    pub given_name: String,
    pub email: String,
    pub phone_number: String,
    pub date_of_birth: String,
    pub card_type: String,
    pub name_on_card: String,
    pub card_number: String,
    pub expiry_date: String,
    pub security_code: String,
    pub billing_address: BillingAddress,
}

impl std::fmt::Debug for CheckoutDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutDetails")
            .field("surname", &self.surname)
            .field("given_name", &self.given_name)
            .field("email", &self.email)
            .field("card_number", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl CheckoutDetails {
    pub fn passenger_name(&self) -> String {
        [self.title.trim(), self.given_name.trim(), self.surname.trim()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        let mut problems = Vec::new();

        if self.surname.trim().is_empty() {
            problems.push("surname is required".to_string());
        }
        if self.given_name.trim().is_empty() {
            problems.push("given name is required".to_string());
        }
        let email = self.email.trim();
        if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
            problems.push("email address is invalid".to_string());
        }
        if self.name_on_card.trim().is_empty() {
            problems.push("name on card is required".to_string());
        }
        let card_digits: String = self
            .card_number
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .collect();
        if !(12..=19).contains(&card_digits.len()) || !card_digits.chars().all(|c| c.is_ascii_digit())
        {
            problems.push("card number is invalid".to_string());
        }
        let code = self.security_code.trim();
        if !(3..=4).contains(&code.len()) || !code.chars().all(|c| c.is_ascii_digit()) {
            problems.push("security code is invalid".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(SessionError::InvalidCheckout(problems))
        }
    }
}

// Mock booking result. Nothing is sent to the provider.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingConfirmation {
    pub reference: String,
    pub offer_id: String,
    pub passenger: String,
    pub total: String,
}

// One traveller's trip through the booking steps.
#[derive(Debug, Default)]
pub struct BookingSession {
    pipeline: ResultPipeline,
    params: Option<SearchParams>,
    results: Option<ResultView>,
    criteria: FilterCriteria,
    sort_mode: SortMode,
    selected: Option<String>,
    last_ticket: u64,
    pending: Option<SearchTicket>,
    last_error: Option<&'static str>,
    bookings: u32,
}

impl BookingSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pipeline(pipeline: ResultPipeline) -> Self {
        Self {
            pipeline,
            ..Default::default()
        }
    }

    pub fn params(&self) -> Option<&SearchParams> {
        self.params.as_ref()
    }

    pub fn results(&self) -> Option<&ResultView> {
        self.results.as_ref()
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn sort_mode(&self) -> SortMode {
        self.sort_mode
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn last_error(&self) -> Option<&'static str> {
        self.last_error
    }

    // Records a new search as the one whose response should be shown.
    // Any response still outstanding for an older ticket will be dropped.
    pub fn begin_search(&mut self, params: SearchParams) -> SearchTicket {
        self.last_ticket += 1;
        let ticket = SearchTicket(self.last_ticket);
        info!(ticket = ticket.0, search = %params, "Searching flights");
        self.params = Some(params);
        self.pending = Some(ticket);
        self.last_error = None;
        ticket
    }

    pub fn finish_search(
        &mut self,
        ticket: SearchTicket,
        outcome: Result<OfferSearchResults, ApiError>,
    ) -> Result<SearchStatus, SessionError> {
        if self.pending != Some(ticket) {
            debug!(ticket = ticket.0, "Discarding stale search response");
            return Ok(SearchStatus::Stale);
        }
        self.pending = None;

        match outcome {
            Ok(results) => {
                let status = SearchStatus::Loaded {
                    offers: results.offers.len(),
                    rejected: results.rejected,
                };
                let pipeline = &self.pipeline;
                self.results
                    .get_or_insert_with(|| {
                        ResultView::with_pipeline(OfferSearchResults::default(), pipeline.clone())
                    })
                    .replace(results);
                self.criteria = FilterCriteria::default();
                self.sort_mode = SortMode::default();
                self.selected = None;
                Ok(status)
            }
            Err(source) => {
                let message = source.user_message(Resource::Flights);
                error!(error = %source, "Flight search failed");
                self.results = None;
                self.selected = None;
                self.last_error = Some(message);
                Err(SessionError::SearchFailed { message, source })
            }
        }
    }

    pub async fn search(
        &mut self,
        provider: &dyn FlightSearchProvider,
        params: SearchParams,
    ) -> Result<SearchStatus, SessionError> {
        let ticket = self.begin_search(params.clone());
        let outcome = provider.search_offers(&params).await;
        self.finish_search(ticket, outcome)
    }

    pub async fn submit(
        &mut self,
        provider: &dyn FlightSearchProvider,
        form: &SearchForm,
    ) -> Result<SearchStatus, SessionError> {
        let params = form.submit()?;
        self.search(provider, params).await
    }

    // Reruns the current search for another departure date.
    pub async fn change_departure_date(
        &mut self,
        provider: &dyn FlightSearchProvider,
        date: NaiveDate,
    ) -> Result<SearchStatus, SessionError> {
        let params = self
            .params
            .as_ref()
            .ok_or(SessionError::NoSearch)?
            .with_departure_date(date);
        self.search(provider, params).await
    }

    pub fn date_strip(&self) -> Result<Vec<NaiveDate>, SessionError> {
        let params = self.params.as_ref().ok_or(SessionError::NoSearch)?;
        Ok(date_strip(params.departure_date, DATE_STRIP_RADIUS))
    }

    pub fn set_criteria(&mut self, criteria: FilterCriteria) {
        self.criteria = criteria;
    }

    pub fn update_criteria(&mut self, update: impl FnOnce(&mut FilterCriteria)) {
        update(&mut self.criteria);
    }

    pub fn clear_criteria(&mut self) {
        self.criteria = FilterCriteria::default();
    }

    pub fn set_sort(&mut self, mode: SortMode) {
        self.sort_mode = mode;
    }

    pub fn visible_offers(&mut self) -> Result<Vec<&FlightOffer>, SessionError> {
        let view = self.results.as_mut().ok_or(SessionError::NoSearch)?;
        Ok(view.view(&self.criteria, self.sort_mode))
    }

    pub fn visible_rows(&mut self) -> Result<Vec<OfferRow>, SessionError> {
        let view = self.results.as_mut().ok_or(SessionError::NoSearch)?;
        Ok(view.rows(&self.criteria, self.sort_mode))
    }

    pub fn airline_options(&self) -> Result<Vec<(String, String)>, SessionError> {
        let view = self.results.as_ref().ok_or(SessionError::NoSearch)?;
        Ok(view.airline_options())
    }

    pub fn price_bounds(&self) -> Result<Option<PriceRange>, SessionError> {
        let view = self.results.as_ref().ok_or(SessionError::NoSearch)?;
        Ok(view.price_bounds())
    }

    pub fn select_offer(&mut self, offer_id: &str) -> Result<&FlightOffer, SessionError> {
        let view = self.results.as_ref().ok_or(SessionError::NoSearch)?;
        if view.is_empty() {
            return Err(SessionError::NoResults);
        }
        if view.find(offer_id).is_none() {
            return Err(SessionError::UnknownOffer(offer_id.to_string()));
        }
        debug!(offer_id, "Offer selected");
        self.selected = Some(offer_id.to_string());
        self.selected_offer()
    }

    pub fn selected_offer(&self) -> Result<&FlightOffer, SessionError> {
        let id = self.selected.as_deref().ok_or(SessionError::NoSelection)?;
        self.results
            .as_ref()
            .and_then(|view| view.find(id))
            .ok_or(SessionError::NoSelection)
    }

    pub fn review(&self) -> Result<TripReview, SessionError> {
        let offer = self.selected_offer()?;
        let view = self.results.as_ref().ok_or(SessionError::NoSearch)?;
        let prices = view.pipeline().prices();
        let currency = &offer.price.currency;
        let amount = |value: f64| -> DisplayPrice {
            prices.normalize(value, currency, FractionDigits::Two)
        };
        let total = amount(offer.price.total);

        Ok(TripReview {
            flight: view.pipeline().row(offer, view.carriers()),
            round_trip: offer.is_round_trip(),
            fare: FareBreakdown {
                base: amount(offer.price.base).to_string(),
                fees: amount(offer.fees_total()).to_string(),
                total: total.to_string(),
                total_amount: total.amount(),
            },
            amenities: offer
                .amenities()
                .iter()
                .map(|a| AmenityLine {
                    description: a.description.clone(),
                    chargeable: a.is_chargeable,
                })
                .collect(),
        })
    }

    // Confirms the selected offer. This is a mock step: the details are
    // checked locally and no booking reaches the provider.
    pub fn checkout(&mut self, details: &CheckoutDetails) -> Result<BookingConfirmation, SessionError> {
        let review = self.review()?;
        details.validate()?;

        self.bookings += 1;
        let confirmation = BookingConfirmation {
            reference: format!("FS-{}-{:04}", review.flight.id, self.bookings),
            offer_id: review.flight.id,
            passenger: details.passenger_name(),
            total: review.fare.total,
        };
        info!(reference = %confirmation.reference, "Booking confirmed");
        self.selected = None;
        Ok(confirmation)
    }
}
