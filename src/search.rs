// Search form state and the parameters sent to the provider

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub const DEFAULT_MAX_RESULTS: u32 = 250;
// Seated travellers the provider accepts in one search
pub const MAX_TRAVELLERS: u32 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TripType {
    #[serde(rename = "oneway")]
    OneWay,
    #[default]
    Return,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TravelClass {
    #[default]
    Economy,
    PremiumEconomy,
    Business,
    First,
}

impl TravelClass {
    pub fn code(self) -> &'static str {
        match self {
            TravelClass::Economy => "ECONOMY",
            TravelClass::PremiumEconomy => "PREMIUM_ECONOMY",
            TravelClass::Business => "BUSINESS",
            TravelClass::First => "FIRST",
        }
    }
}

// What the traveller has typed into the search form so far.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchForm {
    pub origin: String,
    pub destination: String,
    pub departure_date: Option<NaiveDate>,
    pub return_date: Option<NaiveDate>,
    pub adults: u32,
    pub children: u32,
    pub trip_type: TripType,
    pub travel_class: TravelClass,
    pub non_stop: bool,
}

impl Default for SearchForm {
    fn default() -> Self {
        Self {
            origin: String::new(),
            destination: String::new(),
            departure_date: None,
            return_date: None,
            adults: 1,
            children: 0,
            trip_type: TripType::Return,
            travel_class: TravelClass::Economy,
            non_stop: false,
        }
    }
}

#[derive(Error, Debug, Clone, Default, PartialEq)]
#[error("Invalid search: {}", self.messages().join("; "))]
pub struct SearchFormErrors {
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub departure_date: Option<String>,
    pub return_date: Option<String>,
    pub travellers: Option<String>,
    pub general: Vec<String>,
}

impl SearchFormErrors {
    pub fn is_empty(&self) -> bool {
        *self == SearchFormErrors::default()
    }

    pub fn messages(&self) -> Vec<&str> {
        [
            &self.origin,
            &self.destination,
            &self.departure_date,
            &self.return_date,
            &self.travellers,
        ]
        .into_iter()
        .flatten()
        .map(String::as_str)
        .chain(self.general.iter().map(String::as_str))
        .collect()
    }
}

impl SearchForm {
    pub fn validate(&self) -> Result<(), SearchFormErrors> {
        let mut errors = SearchFormErrors::default();
        let origin = self.origin.trim();
        let destination = self.destination.trim();

        if origin.is_empty() {
            errors.origin = Some("Please select where you're leaving from".to_string());
        }
        if destination.is_empty() {
            errors.destination = Some("Please select where you're going to".to_string());
        }
        if self.departure_date.is_none() {
            errors.departure_date = Some("Please select a departure date".to_string());
        }
        if self.trip_type == TripType::Return {
            match (self.departure_date, self.return_date) {
                (_, None) => {
                    errors.return_date = Some("Please select a return date".to_string());
                }
                (Some(departure), Some(ret)) if ret < departure => {
                    errors.return_date =
                        Some("Return date cannot be before the departure date".to_string());
                }
                _ => {}
            }
        }
        if self.adults == 0 {
            errors.travellers = Some("At least one adult must travel".to_string());
        } else if self.adults.saturating_add(self.children) > MAX_TRAVELLERS {
            errors.travellers = Some(format!(
                "No more than {} travellers per booking",
                MAX_TRAVELLERS
            ));
        }
        if !origin.is_empty() && origin.eq_ignore_ascii_case(destination) {
            errors
                .general
                .push("Origin and destination cannot be the same".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn submit(&self) -> Result<SearchParams, SearchFormErrors> {
        self.validate()?;
        let departure_date = self.departure_date.ok_or_else(SearchFormErrors::default)?;

        Ok(SearchParams {
            origin_location_code: self.origin.trim().to_ascii_uppercase(),
            destination_location_code: self.destination.trim().to_ascii_uppercase(),
            departure_date,
            return_date: match self.trip_type {
                TripType::Return => self.return_date,
                TripType::OneWay => None,
            },
            adults: self.adults,
            children: self.children,
            non_stop: self.non_stop,
            max: DEFAULT_MAX_RESULTS,
            trip_type: self.trip_type,
            travel_class: self.travel_class,
        })
    }
}

// A validated search, as sent to the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub origin_location_code: String,
    pub destination_location_code: String,
    pub departure_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub adults: u32,
    pub children: u32,
    pub non_stop: bool,
    pub max: u32,
    pub trip_type: TripType,
    pub travel_class: TravelClass,
}

impl SearchParams {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("originLocationCode", self.origin_location_code.clone()),
            ("destinationLocationCode", self.destination_location_code.clone()),
            ("departureDate", self.departure_date.format("%Y-%m-%d").to_string()),
        ];
        if let Some(return_date) = self.return_date {
            pairs.push(("returnDate", return_date.format("%Y-%m-%d").to_string()));
        }
        pairs.extend([
            ("adults", self.adults.to_string()),
            ("children", self.children.to_string()),
            ("travelClass", self.travel_class.code().to_string()),
            ("nonStop", self.non_stop.to_string()),
            ("max", self.max.to_string()),
        ]);
        pairs
    }

    // Same search on another day. The return leg keeps its distance from
    // the outbound date.
    pub fn with_departure_date(&self, date: NaiveDate) -> Self {
        let return_date = self
            .return_date
            .map(|ret| date + (ret - self.departure_date));
        Self {
            departure_date: date,
            return_date,
            ..self.clone()
        }
    }
}

impl fmt::Display for SearchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} → {} on {}",
            self.origin_location_code, self.destination_location_code, self.departure_date
        )?;
        if let Some(return_date) = self.return_date {
            write!(f, ", returning {}", return_date)?;
        }
        write!(
            f,
            " ({} adult(s), {} child(ren))",
            self.adults, self.children
        )
    }
}
