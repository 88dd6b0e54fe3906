// Offer filtering for the result list

use crate::duration::hour_of_day;
use crate::offer::FlightOffer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Unknown {kind} value: {value}")]
pub struct ParseFilterError {
    kind: &'static str,
    value: String,
}

// Stop count of the outbound leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StopsFilter {
    #[serde(rename = "0")]
    NonStop,
    #[serde(rename = "1")]
    OneStop,
    #[serde(rename = "2+")]
    TwoOrMore,
}

impl StopsFilter {
    pub fn accepts(self, stops: usize) -> bool {
        match self {
            StopsFilter::NonStop => stops == 0,
            StopsFilter::OneStop => stops == 1,
            StopsFilter::TwoOrMore => stops >= 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StopsFilter::NonStop => "Non-stop",
            StopsFilter::OneStop => "1 stop",
            StopsFilter::TwoOrMore => "2+ stops",
        }
    }
}

impl FromStr for StopsFilter {
    type Err = ParseFilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "0" => Ok(StopsFilter::NonStop),
            "1" => Ok(StopsFilter::OneStop),
            "2+" => Ok(StopsFilter::TwoOrMore),
            other => Err(ParseFilterError {
                kind: "stops",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimeBand {
    EarlyMorning,
    Morning,
    Afternoon,
    Evening,
}

impl TimeBand {
    // Half-open hour-of-day range.
    pub fn hours(self) -> Range<u32> {
        match self {
            TimeBand::EarlyMorning => 0..5,
            TimeBand::Morning => 5..12,
            TimeBand::Afternoon => 12..18,
            TimeBand::Evening => 18..24,
        }
    }

    pub fn contains(self, hour: u32) -> bool {
        self.hours().contains(&hour)
    }

    pub fn label(self) -> &'static str {
        match self {
            TimeBand::EarlyMorning => "Early morning (00:00 - 04:59)",
            TimeBand::Morning => "Morning (05:00 - 11:59)",
            TimeBand::Afternoon => "Afternoon (12:00 - 17:59)",
            TimeBand::Evening => "Evening (18:00 - 23:59)",
        }
    }
}

impl fmt::Display for TimeBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = match self {
            TimeBand::EarlyMorning => "early-morning",
            TimeBand::Morning => "morning",
            TimeBand::Afternoon => "afternoon",
            TimeBand::Evening => "evening",
        };
        f.write_str(id)
    }
}

impl FromStr for TimeBand {
    type Err = ParseFilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "early-morning" => Ok(TimeBand::EarlyMorning),
            "morning" => Ok(TimeBand::Morning),
            "afternoon" => Ok(TimeBand::Afternoon),
            "evening" => Ok(TimeBand::Evening),
            other => Err(ParseFilterError {
                kind: "time band",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandRole {
    Departure,
    Arrival,
}

// Which time bands each role offers. Departure has no early-morning band;
// a departure criterion naming it matches nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeBandTable {
    departure: Vec<TimeBand>,
    arrival: Vec<TimeBand>,
}

impl Default for TimeBandTable {
    fn default() -> Self {
        Self {
            departure: vec![TimeBand::Morning, TimeBand::Afternoon, TimeBand::Evening],
            arrival: vec![
                TimeBand::EarlyMorning,
                TimeBand::Morning,
                TimeBand::Afternoon,
                TimeBand::Evening,
            ],
        }
    }
}

impl TimeBandTable {
    pub fn new(departure: Vec<TimeBand>, arrival: Vec<TimeBand>) -> Self {
        Self { departure, arrival }
    }

    pub fn bands(&self, role: BandRole) -> &[TimeBand] {
        match role {
            BandRole::Departure => &self.departure,
            BandRole::Arrival => &self.arrival,
        }
    }

    pub fn allows(&self, role: BandRole, band: TimeBand, hour: u32) -> bool {
        self.bands(role).contains(&band) && band.contains(hour)
    }
}

// Inclusive price bounds on `price.total`, in the offer's own currency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, amount: f64) -> bool {
        amount >= self.min && amount <= self.max
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterCriteria {
    pub stops: Option<StopsFilter>,
    pub airline: Option<String>,
    pub baggage: Option<bool>,
    pub departure_time_band: Option<TimeBand>,
    pub arrival_time_band: Option<TimeBand>,
    pub price_range: Option<PriceRange>,
}

impl FilterCriteria {
    pub fn is_empty(&self) -> bool {
        *self == FilterCriteria::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OfferFilter {
    bands: TimeBandTable,
}

impl OfferFilter {
    pub fn new(bands: TimeBandTable) -> Self {
        Self { bands }
    }

    pub fn bands(&self) -> &TimeBandTable {
        &self.bands
    }

    // Offers without an outbound itinerary never match.
    pub fn matches(&self, offer: &FlightOffer, criteria: &FilterCriteria) -> bool {
        let Some(outbound) = offer.outbound() else {
            return false;
        };

        if !criteria
            .stops
            .map_or(true, |stops| stops.accepts(outbound.stops()))
        {
            return false;
        }

        if !criteria
            .airline
            .as_ref()
            .map_or(true, |code| offer.validating_airline_codes.contains(code))
        {
            return false;
        }

        if criteria.baggage == Some(true) && !offer.has_checked_bags() {
            return false;
        }

        if let Some(band) = criteria.departure_time_band {
            let hour = outbound.departure_at().and_then(hour_of_day);
            if !hour.map_or(false, |h| self.bands.allows(BandRole::Departure, band, h)) {
                return false;
            }
        }

        if let Some(band) = criteria.arrival_time_band {
            let hour = outbound.arrival_at().and_then(hour_of_day);
            if !hour.map_or(false, |h| self.bands.allows(BandRole::Arrival, band, h)) {
                return false;
            }
        }

        criteria
            .price_range
            .map_or(true, |range| range.contains(offer.price.total))
    }

    // Positions of the matching offers, in input order.
    pub fn matching_indices(&self, offers: &[FlightOffer], criteria: &FilterCriteria) -> Vec<usize> {
        offers
            .iter()
            .enumerate()
            .filter(|(_, offer)| self.matches(offer, criteria))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn filter<'a>(
        &self,
        offers: &'a [FlightOffer],
        criteria: &FilterCriteria,
    ) -> Vec<&'a FlightOffer> {
        offers
            .iter()
            .filter(|offer| self.matches(offer, criteria))
            .collect()
    }
}

pub fn matches(offer: &FlightOffer, criteria: &FilterCriteria) -> bool {
    OfferFilter::default().matches(offer, criteria)
}

pub fn filter_offers<'a>(
    offers: &'a [FlightOffer],
    criteria: &FilterCriteria,
) -> Vec<&'a FlightOffer> {
    OfferFilter::default().filter(offers, criteria)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{ids, offer};
    use test_case::test_case;

    fn sample_offers() -> Vec<FlightOffer> {
        vec![
            offer("direct-morning")
                .total(4000.0)
                .outbound(&[("2025-03-01T06:00:00", "2025-03-01T08:10:00")])
                .checked_bags(&[&[1]])
                .build(),
            offer("one-stop-afternoon")
                .total(6000.0)
                .airlines(&["6E"])
                .outbound(&[
                    ("2025-03-01T12:00:00", "2025-03-01T13:30:00"),
                    ("2025-03-01T15:00:00", "2025-03-01T17:59:00"),
                ])
                .build(),
            offer("two-stop-evening")
                .total(5000.0)
                .airlines(&["UK", "AI"])
                .outbound(&[
                    ("2025-03-01T18:00:00", "2025-03-01T19:00:00"),
                    ("2025-03-01T20:00:00", "2025-03-01T21:00:00"),
                    ("2025-03-01T22:00:00", "2025-03-02T04:00:00"),
                ])
                .legacy_baggage()
                .build(),
        ]
    }

    #[test_case(FilterCriteria::default(),
        vec!["direct-morning", "one-stop-afternoon", "two-stop-evening"]; "#1 No criteria")]
    #[test_case(FilterCriteria {stops: Some(StopsFilter::NonStop), ..Default::default()},
        vec!["direct-morning"]; "#2 Non-stop only")]
    #[test_case(FilterCriteria {stops: Some(StopsFilter::TwoOrMore), ..Default::default()},
        vec!["two-stop-evening"]; "#3 Two or more stops")]
    #[test_case(FilterCriteria {airline: Some("AI".to_string()), ..Default::default()},
        vec!["direct-morning", "two-stop-evening"]; "#4 Validating airline")]
    #[test_case(FilterCriteria {baggage: Some(true), ..Default::default()},
        vec!["direct-morning", "two-stop-evening"]; "#5 Checked baggage")]
    #[test_case(FilterCriteria {baggage: Some(false), ..Default::default()},
        vec!["direct-morning", "one-stop-afternoon", "two-stop-evening"]; "#6 Unchecked baggage box")]
    #[test_case(FilterCriteria {departure_time_band: Some(TimeBand::Afternoon), ..Default::default()},
        vec!["one-stop-afternoon"]; "#7 Afternoon departure")]
    #[test_case(FilterCriteria {arrival_time_band: Some(TimeBand::EarlyMorning), ..Default::default()},
        vec!["two-stop-evening"]; "#8 Early morning arrival")]
    #[test_case(FilterCriteria {price_range: Some(PriceRange::new(4500.0, 10000.0)), ..Default::default()},
        vec!["one-stop-afternoon", "two-stop-evening"]; "#9 Price range")]
    #[test_case(FilterCriteria {airline: Some("AI".to_string()), price_range: Some(PriceRange::new(0.0, 4500.0)), baggage: Some(true), ..Default::default()},
        vec!["direct-morning"]; "#10 Combined filters")]
    fn test_criteria_filter_offers(criteria: FilterCriteria, expected_ids: Vec<&str>) {
        let offers = sample_offers();
        let results = filter_offers(&offers, &criteria);
        assert_eq!(ids(results), expected_ids);
    }

    #[test]
    fn test_stops_use_outbound_leg_only() {
        let round_trip = offer("rt")
            .outbound(&[
                ("2025-03-01T06:00:00", "2025-03-01T08:00:00"),
                ("2025-03-01T09:00:00", "2025-03-01T11:00:00"),
            ])
            .inbound(&[("2025-03-08T06:00:00", "2025-03-08T08:00:00")])
            .build();

        let one = FilterCriteria {
            stops: Some(StopsFilter::OneStop),
            ..Default::default()
        };
        let zero = FilterCriteria {
            stops: Some(StopsFilter::NonStop),
            ..Default::default()
        };
        assert!(matches(&round_trip, &one));
        assert!(!matches(&round_trip, &zero));
    }

    #[test]
    fn test_price_range_is_inclusive() {
        let fare = offer("p").total(50000.0).build();

        let upper = FilterCriteria {
            price_range: Some(PriceRange::new(0.0, 50000.0)),
            ..Default::default()
        };
        let lower = FilterCriteria {
            price_range: Some(PriceRange::new(50000.0, 100000.0)),
            ..Default::default()
        };
        assert!(matches(&fare, &upper));
        assert!(matches(&fare, &lower));
    }

    #[test]
    fn test_nan_price_never_in_range() {
        let fare = offer("nan").total(f64::NAN).build();
        let criteria = FilterCriteria {
            price_range: Some(PriceRange::new(0.0, f64::MAX)),
            ..Default::default()
        };
        assert!(!matches(&fare, &criteria));
    }

    #[test]
    fn test_time_band_boundaries() {
        let noon_arrival = offer("noon")
            .outbound(&[("2025-03-01T09:00:00", "2025-03-01T12:00:00")])
            .build();
        let afternoon = FilterCriteria {
            arrival_time_band: Some(TimeBand::Afternoon),
            ..Default::default()
        };
        let morning = FilterCriteria {
            arrival_time_band: Some(TimeBand::Morning),
            ..Default::default()
        };
        assert!(matches(&noon_arrival, &afternoon));
        assert!(!matches(&noon_arrival, &morning));

        let four_am = offer("four")
            .outbound(&[("2025-03-01T04:00:00", "2025-03-01T04:50:00")])
            .build();
        let early_arrival = FilterCriteria {
            arrival_time_band: Some(TimeBand::EarlyMorning),
            ..Default::default()
        };
        let early_departure = FilterCriteria {
            departure_time_band: Some(TimeBand::EarlyMorning),
            ..Default::default()
        };
        assert!(matches(&four_am, &early_arrival));
        assert!(!matches(&four_am, &early_departure));
    }

    #[test]
    fn test_departure_at_two_matches_no_departure_band() {
        let red_eye = offer("red-eye")
            .outbound(&[("2025-03-01T02:00:00", "2025-03-01T04:00:00")])
            .build();

        for band in [
            TimeBand::EarlyMorning,
            TimeBand::Morning,
            TimeBand::Afternoon,
            TimeBand::Evening,
        ] {
            let criteria = FilterCriteria {
                departure_time_band: Some(band),
                ..Default::default()
            };
            assert!(!matches(&red_eye, &criteria), "band {} matched", band);
        }

        // Only excluded once a departure band is chosen
        assert!(matches(&red_eye, &FilterCriteria::default()));
    }

    #[test]
    fn test_custom_band_table() {
        let filter = OfferFilter::new(TimeBandTable::new(
            vec![TimeBand::EarlyMorning],
            vec![TimeBand::Evening],
        ));
        let red_eye = offer("red-eye")
            .outbound(&[("2025-03-01T02:00:00", "2025-03-01T04:00:00")])
            .build();
        let criteria = FilterCriteria {
            departure_time_band: Some(TimeBand::EarlyMorning),
            ..Default::default()
        };
        assert!(filter.matches(&red_eye, &criteria));
    }

    #[test]
    fn test_baggage_any_traveler_any_segment() {
        let mixed = offer("mixed").checked_bags(&[&[0, 0], &[0, 2]]).build();
        let none = offer("none").checked_bags(&[&[0], &[0]]).build();
        let criteria = FilterCriteria {
            baggage: Some(true),
            ..Default::default()
        };
        assert!(matches(&mixed, &criteria));
        assert!(!matches(&none, &criteria));
    }

    #[test]
    fn test_missing_itinerary_is_excluded() {
        let broken = offer("broken").no_itineraries().build();
        assert!(!matches(&broken, &FilterCriteria::default()));
    }

    #[test]
    fn test_filter_preserves_relative_order() {
        let offers = sample_offers();
        let criteria = FilterCriteria {
            price_range: Some(PriceRange::new(0.0, 5500.0)),
            ..Default::default()
        };
        let filter = OfferFilter::default();
        assert_eq!(filter.matching_indices(&offers, &criteria), vec![0, 2]);
    }

    #[test]
    fn test_parse_filter_values() {
        assert_eq!("2+".parse::<StopsFilter>(), Ok(StopsFilter::TwoOrMore));
        assert_eq!("early-morning".parse::<TimeBand>(), Ok(TimeBand::EarlyMorning));
        assert!("night".parse::<TimeBand>().is_err());
        assert!("3".parse::<StopsFilter>().is_err());
    }

    #[test]
    fn test_filter_labels() {
        assert_eq!(StopsFilter::NonStop.label(), "Non-stop");
        assert_eq!(StopsFilter::TwoOrMore.label(), "2+ stops");
        assert_eq!(TimeBand::Morning.label(), "Morning (05:00 - 11:59)");
        assert!(TimeBand::EarlyMorning.label().starts_with("Early morning"));
    }

    #[test]
    fn test_criteria_from_json() {
        let criteria: FilterCriteria = serde_json::from_str(
            r#"{"stops": "1", "departureTimeBand": "morning", "priceRange": {"min": 0, "max": 9000}}"#,
        )
        .unwrap();

        assert_eq!(criteria.stops, Some(StopsFilter::OneStop));
        assert_eq!(criteria.departure_time_band, Some(TimeBand::Morning));
        assert_eq!(criteria.price_range, Some(PriceRange::new(0.0, 9000.0)));
        assert!(criteria.airline.is_none());
        assert!(!criteria.is_empty());
    }
}
