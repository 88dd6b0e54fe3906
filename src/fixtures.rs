// Offer builders shared by the unit tests

use crate::offer::{
    BaggageAllowance, CheckedBags, Endpoint, FareDetail, FlightOffer, Itinerary, Price, Segment,
    TravelerPricing,
};

pub fn segment(departure_at: &str, arrival_at: &str) -> Segment {
    Segment {
        departure: Endpoint {
            iata_code: "DEL".to_string(),
            terminal: Some("3".to_string()),
            at: departure_at.to_string(),
        },
        arrival: Endpoint {
            iata_code: "BOM".to_string(),
            terminal: None,
            at: arrival_at.to_string(),
        },
        carrier_code: Some("AI".to_string()),
        number: Some("101".to_string()),
    }
}

pub fn itinerary(legs: &[(&str, &str)]) -> Itinerary {
    Itinerary {
        duration: None,
        segments: legs.iter().map(|(dep, arr)| segment(dep, arr)).collect(),
    }
}

pub struct OfferBuilder {
    offer: FlightOffer,
}

pub fn offer(id: &str) -> OfferBuilder {
    OfferBuilder {
        offer: FlightOffer {
            id: id.to_string(),
            price: Price {
                total: 5000.0,
                base: 4500.0,
                currency: "INR".to_string(),
                fees: vec![],
            },
            itineraries: vec![itinerary(&[("2025-03-01T06:00:00", "2025-03-01T08:00:00")])],
            traveler_pricings: vec![],
            validating_airline_codes: vec!["AI".to_string()],
        },
    }
}

impl OfferBuilder {
    pub fn total(mut self, total: f64) -> Self {
        self.offer.price.total = total;
        self
    }

    pub fn currency(mut self, currency: &str) -> Self {
        self.offer.price.currency = currency.to_string();
        self
    }

    pub fn outbound(mut self, legs: &[(&str, &str)]) -> Self {
        self.offer.itineraries[0] = itinerary(legs);
        self
    }

    pub fn inbound(mut self, legs: &[(&str, &str)]) -> Self {
        self.offer.itineraries.truncate(1);
        self.offer.itineraries.push(itinerary(legs));
        self
    }

    pub fn no_itineraries(mut self) -> Self {
        self.offer.itineraries.clear();
        self
    }

    pub fn airlines(mut self, codes: &[&str]) -> Self {
        self.offer.validating_airline_codes = codes.iter().map(|c| c.to_string()).collect();
        self
    }

    // One traveler per entry, one fare detail per bag count
    pub fn checked_bags(mut self, travelers: &[&[u32]]) -> Self {
        self.offer.traveler_pricings = travelers
            .iter()
            .map(|bags| TravelerPricing {
                fare_details_by_segment: bags
                    .iter()
                    .map(|quantity| FareDetail {
                        included_checked_bags: Some(CheckedBags {
                            quantity: Some(*quantity),
                        }),
                        ..Default::default()
                    })
                    .collect(),
            })
            .collect();
        self
    }

    pub fn legacy_baggage(mut self) -> Self {
        self.offer.traveler_pricings = vec![TravelerPricing {
            fare_details_by_segment: vec![FareDetail {
                baggage_allowance: Some(vec![BaggageAllowance {
                    weight: Some(15.0),
                    unit: Some("KG".to_string()),
                }]),
                ..Default::default()
            }],
        }];
        self
    }

    pub fn build(self) -> FlightOffer {
        self.offer
    }
}

pub fn ids<'a>(offers: impl IntoIterator<Item = &'a FlightOffer>) -> Vec<&'a str> {
    offers.into_iter().map(|o| o.id.as_str()).collect()
}
