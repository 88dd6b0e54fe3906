// Flight offer model and the validation step at the provider boundary

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::warn;

// Validation failures for a single offer in a search response
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Offer {offer_id} has no itineraries")]
    NoItineraries { offer_id: String },

    #[error("Offer {offer_id} itinerary {index} has no segments")]
    EmptyItinerary { offer_id: String, index: usize },

    #[error("Offer {offer_id} has an invalid {field}: {value}")]
    InvalidDecimal {
        offer_id: String,
        field: &'static str,
        value: String,
    },

    #[error("Offer {offer_id} does not match the offer schema: {message}")]
    Malformed { offer_id: String, message: String },
}

// Data structures for the provider's flight-offers payload.
// Offers stay untyped here so one bad entry cannot sink the whole envelope.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct OffersEnvelope {
    #[serde(default)]
    pub data: Vec<serde_json::Value>,
    #[serde(default)]
    pub dictionaries: Dictionaries,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Dictionaries {
    #[serde(default)]
    pub carriers: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFlightOffer {
    pub id: String,
    pub price: RawPrice,
    #[serde(default)]
    pub itineraries: Vec<Itinerary>,
    #[serde(default)]
    pub traveler_pricings: Vec<TravelerPricing>,
    #[serde(default)]
    pub validating_airline_codes: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RawPrice {
    pub total: Decimal,
    #[serde(default)]
    pub base: Option<Decimal>,
    pub currency: String,
    #[serde(default)]
    pub fees: Vec<RawFee>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RawFee {
    pub amount: Decimal,
    #[serde(rename = "type", default)]
    pub fee_type: String,
}

// Amounts arrive either as JSON numbers or as decimal strings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Decimal {
    Number(f64),
    Text(String),
}

impl Decimal {
    fn parse(&self, offer_id: &str, field: &'static str) -> Result<f64, SchemaError> {
        match self {
            Decimal::Number(value) => Ok(*value),
            Decimal::Text(text) => {
                text.trim()
                    .parse::<f64>()
                    .map_err(|_| SchemaError::InvalidDecimal {
                        offer_id: offer_id.to_string(),
                        field,
                        value: text.clone(),
                    })
            }
        }
    }
}

// One priced flight option, validated so that every itinerary has at least
// one segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightOffer {
    pub id: String,
    pub price: Price,
    pub itineraries: Vec<Itinerary>,
    pub traveler_pricings: Vec<TravelerPricing>,
    pub validating_airline_codes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Price {
    pub total: f64,
    pub base: f64,
    pub currency: String,
    pub fees: Vec<Fee>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fee {
    pub amount: f64,
    pub fee_type: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct Itinerary {
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub departure: Endpoint,
    pub arrival: Endpoint,
    #[serde(default)]
    pub carrier_code: Option<String>,
    #[serde(default)]
    pub number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub iata_code: String,
    #[serde(default)]
    pub terminal: Option<String>,
    pub at: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelerPricing {
    #[serde(default)]
    pub fare_details_by_segment: Vec<FareDetail>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FareDetail {
    #[serde(default)]
    pub cabin: Option<String>,
    #[serde(default)]
    pub included_checked_bags: Option<CheckedBags>,
    #[serde(default)]
    pub baggage_allowance: Option<Vec<BaggageAllowance>>,
    #[serde(default)]
    pub amenities: Vec<Amenity>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct CheckedBags {
    #[serde(default)]
    pub quantity: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BaggageAllowance {
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Amenity {
    pub description: String,
    #[serde(default)]
    pub amenity_type: Option<String>,
    #[serde(default)]
    pub is_chargeable: bool,
}

impl TryFrom<RawFlightOffer> for FlightOffer {
    type Error = SchemaError;

    fn try_from(raw: RawFlightOffer) -> Result<Self, Self::Error> {
        if raw.itineraries.is_empty() {
            return Err(SchemaError::NoItineraries { offer_id: raw.id });
        }
        if let Some(index) = raw.itineraries.iter().position(|it| it.segments.is_empty()) {
            return Err(SchemaError::EmptyItinerary {
                offer_id: raw.id,
                index,
            });
        }

        let total = raw.price.total.parse(&raw.id, "price.total")?;
        let base = match &raw.price.base {
            Some(base) => base.parse(&raw.id, "price.base")?,
            None => total,
        };
        let fees = raw
            .price
            .fees
            .iter()
            .map(|fee| {
                Ok(Fee {
                    amount: fee.amount.parse(&raw.id, "price.fees.amount")?,
                    fee_type: fee.fee_type.clone(),
                })
            })
            .collect::<Result<Vec<_>, SchemaError>>()?;

        Ok(FlightOffer {
            price: Price {
                total,
                base,
                currency: raw.price.currency,
                fees,
            },
            id: raw.id,
            itineraries: raw.itineraries,
            traveler_pricings: raw.traveler_pricings,
            validating_airline_codes: raw.validating_airline_codes,
        })
    }
}

impl FlightOffer {
    // Typed decoding plus validation of one entry of the `data` array
    pub fn from_value(value: serde_json::Value) -> Result<Self, SchemaError> {
        let offer_id = value
            .get("id")
            .and_then(|id| id.as_str())
            .unwrap_or("<unknown>")
            .to_string();
        let raw: RawFlightOffer =
            serde_json::from_value(value).map_err(|e| SchemaError::Malformed {
                offer_id,
                message: e.to_string(),
            })?;
        Self::try_from(raw)
    }

    // The outbound leg. Filtering and sorting look at this itinerary only.
    pub fn outbound(&self) -> Option<&Itinerary> {
        self.itineraries.first()
    }

    pub fn is_round_trip(&self) -> bool {
        self.itineraries.len() > 1
    }

    // Any traveler on any segment with checked baggage qualifies the offer
    pub fn has_checked_bags(&self) -> bool {
        self.traveler_pricings.iter().any(|tp| {
            tp.fare_details_by_segment.iter().any(|fd| {
                let included = fd
                    .included_checked_bags
                    .as_ref()
                    .and_then(|bags| bags.quantity)
                    .map_or(false, |quantity| quantity > 0);
                let legacy = fd
                    .baggage_allowance
                    .as_ref()
                    .map_or(false, |allowance| !allowance.is_empty());
                included || legacy
            })
        })
    }

    pub fn fees_total(&self) -> f64 {
        self.price.fees.iter().map(|fee| fee.amount).sum()
    }

    pub fn amenities(&self) -> &[Amenity] {
        self.traveler_pricings
            .first()
            .and_then(|tp| tp.fare_details_by_segment.first())
            .map(|fd| fd.amenities.as_slice())
            .unwrap_or_default()
    }
}

impl Itinerary {
    pub fn first_segment(&self) -> Option<&Segment> {
        self.segments.first()
    }

    pub fn last_segment(&self) -> Option<&Segment> {
        self.segments.last()
    }

    pub fn stops(&self) -> usize {
        self.segments.len().saturating_sub(1)
    }

    pub fn departure_at(&self) -> Option<&str> {
        self.first_segment().map(|s| s.departure.at.as_str())
    }

    pub fn arrival_at(&self) -> Option<&str> {
        self.last_segment().map(|s| s.arrival.at.as_str())
    }
}

// Carrier code to display name lookup supplied with a search response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CarrierDirectory {
    names: HashMap<String, String>,
}

impl CarrierDirectory {
    pub fn new(names: HashMap<String, String>) -> Self {
        Self { names }
    }

    pub fn name<'a>(&'a self, code: &'a str) -> &'a str {
        self.names.get(code).map_or(code, String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.names.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    // Display label for a list of validating carriers
    pub fn label(&self, codes: &[String]) -> String {
        if codes.is_empty() {
            return "N/A".to_string();
        }
        codes
            .iter()
            .map(|code| self.name(code))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl From<HashMap<String, String>> for CarrierDirectory {
    fn from(names: HashMap<String, String>) -> Self {
        Self::new(names)
    }
}

// Validated search response.
#[derive(Debug, Clone, Default)]
pub struct OfferSearchResults {
    pub offers: Vec<FlightOffer>,
    pub carriers: CarrierDirectory,
    pub rejected: usize,
}

impl From<OffersEnvelope> for OfferSearchResults {
    fn from(envelope: OffersEnvelope) -> Self {
        let mut offers = Vec::with_capacity(envelope.data.len());
        let mut rejected = 0;

        for value in envelope.data {
            match FlightOffer::from_value(value) {
                Ok(offer) => offers.push(offer),
                Err(e) => {
                    warn!(error = %e, "Dropping malformed flight offer");
                    rejected += 1;
                }
            }
        }

        Self {
            offers,
            carriers: envelope.dictionaries.carriers.into(),
            rejected,
        }
    }
}

// Parses a flight-offers response body. The envelope must be valid JSON of
// the expected shape; offers that fail validation are dropped.
pub fn parse_offers(body: &str) -> Result<OfferSearchResults, serde_json::Error> {
    let envelope: OffersEnvelope = serde_json::from_str(body)?;
    Ok(envelope.into())
}
