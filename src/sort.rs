// Sort orders for the result list

use crate::duration::{duration_minutes, parse_instant};
use crate::offer::FlightOffer;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Unknown sort mode: {0}")]
pub struct ParseSortModeError(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortMode {
    // Provider order, untouched.
    #[default]
    Recommended,
    #[serde(alias = "PRICE_LOW_TO_HIGH")]
    PriceAsc,
    #[serde(alias = "PRICE_HIGH_TO_LOW")]
    PriceDesc,
    #[serde(alias = "DURATION_SHORT_TO_LONG")]
    DurationAsc,
    #[serde(alias = "DURATION_LONG_TO_SHORT")]
    DurationDesc,
    DepartureAsc,
    DepartureDesc,
    ArrivalAsc,
    ArrivalDesc,
}

impl SortMode {
    pub const ALL: [SortMode; 9] = [
        SortMode::Recommended,
        SortMode::PriceAsc,
        SortMode::PriceDesc,
        SortMode::DurationAsc,
        SortMode::DurationDesc,
        SortMode::DepartureAsc,
        SortMode::DepartureDesc,
        SortMode::ArrivalAsc,
        SortMode::ArrivalDesc,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SortMode::Recommended => "RECOMMENDED",
            SortMode::PriceAsc => "PRICE_ASC",
            SortMode::PriceDesc => "PRICE_DESC",
            SortMode::DurationAsc => "DURATION_ASC",
            SortMode::DurationDesc => "DURATION_DESC",
            SortMode::DepartureAsc => "DEPARTURE_ASC",
            SortMode::DepartureDesc => "DEPARTURE_DESC",
            SortMode::ArrivalAsc => "ARRIVAL_ASC",
            SortMode::ArrivalDesc => "ARRIVAL_DESC",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortMode::Recommended => "Recommended",
            SortMode::PriceAsc => "Price (low to high)",
            SortMode::PriceDesc => "Price (high to low)",
            SortMode::DurationAsc => "Duration (short to long)",
            SortMode::DurationDesc => "Duration (long to short)",
            SortMode::DepartureAsc => "Departure (earliest first)",
            SortMode::DepartureDesc => "Departure (latest first)",
            SortMode::ArrivalAsc => "Arrival (earliest first)",
            SortMode::ArrivalDesc => "Arrival (latest first)",
        }
    }

    // Ordering of two offers under this mode. Offers whose key is missing
    // (NaN price, unparsable timestamp, no itinerary) go last in either
    // direction and keep their relative order among themselves.
    pub fn compare(self, a: &FlightOffer, b: &FlightOffer) -> Ordering {
        match self {
            SortMode::Recommended => Ordering::Equal,
            SortMode::PriceAsc => compare_keys(price_key(a), price_key(b), false),
            SortMode::PriceDesc => compare_keys(price_key(a), price_key(b), true),
            SortMode::DurationAsc => compare_keys(duration_key(a), duration_key(b), false),
            SortMode::DurationDesc => compare_keys(duration_key(a), duration_key(b), true),
            SortMode::DepartureAsc => compare_keys(departure_key(a), departure_key(b), false),
            SortMode::DepartureDesc => compare_keys(departure_key(a), departure_key(b), true),
            SortMode::ArrivalAsc => compare_keys(arrival_key(a), arrival_key(b), false),
            SortMode::ArrivalDesc => compare_keys(arrival_key(a), arrival_key(b), true),
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SortMode {
    type Err = ParseSortModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mode = match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "RECOMMENDED" => SortMode::Recommended,
            "PRICE_ASC" | "PRICE_LOW_TO_HIGH" => SortMode::PriceAsc,
            "PRICE_DESC" | "PRICE_HIGH_TO_LOW" => SortMode::PriceDesc,
            "DURATION_ASC" | "DURATION_SHORT_TO_LONG" => SortMode::DurationAsc,
            "DURATION_DESC" | "DURATION_LONG_TO_SHORT" => SortMode::DurationDesc,
            "DEPARTURE_ASC" => SortMode::DepartureAsc,
            "DEPARTURE_DESC" => SortMode::DepartureDesc,
            "ARRIVAL_ASC" => SortMode::ArrivalAsc,
            "ARRIVAL_DESC" => SortMode::ArrivalDesc,
            _ => return Err(ParseSortModeError(s.to_string())),
        };
        Ok(mode)
    }
}

// Keys must be totally ordered when present; missing keys sort last
fn compare_keys<T: PartialOrd>(a: Option<T>, b: Option<T>, descending: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => {
            let ord = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
            if descending {
                ord.reverse()
            } else {
                ord
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn price_key(offer: &FlightOffer) -> Option<f64> {
    Some(offer.price.total).filter(|total| !total.is_nan())
}

fn duration_key(offer: &FlightOffer) -> Option<i64> {
    let outbound = offer.outbound()?;
    duration_minutes(outbound.departure_at()?, outbound.arrival_at()?)
}

fn departure_key(offer: &FlightOffer) -> Option<chrono::NaiveDateTime> {
    offer.outbound()?.departure_at().and_then(parse_instant)
}

fn arrival_key(offer: &FlightOffer) -> Option<chrono::NaiveDateTime> {
    offer.outbound()?.arrival_at().and_then(parse_instant)
}

// Sorted positions into `offers`. The sort is stable.
pub fn sorted_indices(offers: &[FlightOffer], indices: &mut [usize], mode: SortMode) {
    if mode == SortMode::Recommended {
        return;
    }
    indices.sort_by(|&a, &b| mode.compare(&offers[a], &offers[b]));
}

// Returns the offers in `mode` order as a new list; the input is untouched.
pub fn sort_offers(offers: &[FlightOffer], mode: SortMode) -> Vec<&FlightOffer> {
    let mut indices: Vec<usize> = (0..offers.len()).collect();
    sorted_indices(offers, &mut indices, mode);
    indices.into_iter().map(|i| &offers[i]).collect()
}
