// Result pipeline: filter, then sort, then project into list rows

use crate::duration::{duration_minutes, format_duration, format_time, parse_iso_duration};
use crate::filter::{FilterCriteria, OfferFilter, PriceRange};
use crate::offer::{CarrierDirectory, Endpoint, FlightOffer, OfferSearchResults};
use crate::price::{ConversionTable, FractionDigits};
use crate::sort::{sorted_indices, SortMode};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct ResultPipeline {
    filter: OfferFilter,
    prices: ConversionTable,
}

impl ResultPipeline {
    pub fn new(filter: OfferFilter, prices: ConversionTable) -> Self {
        Self { filter, prices }
    }

    pub fn filter(&self) -> &OfferFilter {
        &self.filter
    }

    pub fn prices(&self) -> &ConversionTable {
        &self.prices
    }

    // Positions into `raw` of the surviving offers, in display order.
    // Filtering runs first so only the survivors are sorted.
    pub fn project_indices(
        &self,
        raw: &[FlightOffer],
        criteria: &FilterCriteria,
        mode: SortMode,
    ) -> Vec<usize> {
        let mut order = self.filter.matching_indices(raw, criteria);
        sorted_indices(raw, &mut order, mode);
        debug!(
            total = raw.len(),
            kept = order.len(),
            mode = %mode,
            "Projected flight offers"
        );
        order
    }

    pub fn project<'a>(
        &self,
        raw: &'a [FlightOffer],
        criteria: &FilterCriteria,
        mode: SortMode,
    ) -> Vec<&'a FlightOffer> {
        self.project_indices(raw, criteria, mode)
            .into_iter()
            .map(|i| &raw[i])
            .collect()
    }

    // List-view projection of one offer. Prices are rounded to whole rupees.
    pub fn row(&self, offer: &FlightOffer, carriers: &CarrierDirectory) -> OfferRow {
        let outbound = offer.outbound();
        let first = outbound.and_then(|it| it.first_segment());
        let last = outbound.and_then(|it| it.last_segment());

        let duration = outbound.and_then(|it| {
            it.duration
                .as_deref()
                .and_then(parse_iso_duration)
                .or_else(|| duration_minutes(it.departure_at()?, it.arrival_at()?))
        });
        let stops = outbound.map_or(0, |it| it.stops());
        let price = self.prices.normalize(
            offer.price.total,
            &offer.price.currency,
            FractionDigits::Zero,
        );

        OfferRow {
            id: offer.id.clone(),
            origin: first.map_or_else(String::new, |s| s.departure.iata_code.clone()),
            destination: last.map_or_else(String::new, |s| s.arrival.iata_code.clone()),
            departure: first.map_or_else(|| "N/A".to_string(), |s| endpoint_label(&s.departure)),
            arrival: last.map_or_else(|| "N/A".to_string(), |s| endpoint_label(&s.arrival)),
            airlines: carriers.label(&offer.validating_airline_codes),
            stops,
            stops_label: stops_label(stops),
            duration: duration.map_or_else(|| "N/A".to_string(), format_duration),
            price: price.to_string(),
            price_amount: price.amount(),
        }
    }
}

fn endpoint_label(endpoint: &Endpoint) -> String {
    let time = format_time(&endpoint.at).unwrap_or_else(|| endpoint.at.clone());
    format!(
        "{} (Terminal: {})",
        time,
        endpoint.terminal.as_deref().unwrap_or("N/A")
    )
}

fn stops_label(stops: usize) -> String {
    match stops {
        0 => "Non-stop".to_string(),
        1 => "1 stop".to_string(),
        n => format!("{} stops", n),
    }
}

pub fn project<'a>(
    raw: &'a [FlightOffer],
    criteria: &FilterCriteria,
    mode: SortMode,
) -> Vec<&'a FlightOffer> {
    ResultPipeline::default().project(raw, criteria, mode)
}

// One line of the result list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OfferRow {
    pub id: String,
    pub origin: String,
    pub destination: String,
    pub departure: String,
    pub arrival: String,
    pub airlines: String,
    pub stops: usize,
    pub stops_label: String,
    pub duration: String,
    pub price: String,
    pub price_amount: f64,
}

#[derive(Debug, Clone)]
struct Projection {
    criteria: FilterCriteria,
    mode: SortMode,
    order: Vec<usize>,
}

// The offers of one search response plus the last projection over them.
// Changing the criteria or the mode reruns the pipeline over the full raw
// list; asking again with the same inputs reuses the previous order.
#[derive(Debug, Clone, Default)]
pub struct ResultView {
    raw: Vec<FlightOffer>,
    carriers: CarrierDirectory,
    pipeline: ResultPipeline,
    projection: Option<Projection>,
    runs: usize,
}

impl ResultView {
    pub fn new(results: OfferSearchResults) -> Self {
        Self::with_pipeline(results, ResultPipeline::default())
    }

    pub fn with_pipeline(results: OfferSearchResults, pipeline: ResultPipeline) -> Self {
        Self {
            raw: results.offers,
            carriers: results.carriers,
            pipeline,
            projection: None,
            runs: 0,
        }
    }

    // Swaps in a new search response.
    pub fn replace(&mut self, results: OfferSearchResults) {
        self.raw = results.offers;
        self.carriers = results.carriers;
        self.projection = None;
    }

    pub fn raw(&self) -> &[FlightOffer] {
        &self.raw
    }

    pub fn carriers(&self) -> &CarrierDirectory {
        &self.carriers
    }

    pub fn pipeline(&self) -> &ResultPipeline {
        &self.pipeline
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    // How many times the pipeline has actually run.
    pub fn runs(&self) -> usize {
        self.runs
    }

    pub fn find(&self, id: &str) -> Option<&FlightOffer> {
        self.raw.iter().find(|offer| offer.id == id)
    }

    fn refresh(&mut self, criteria: &FilterCriteria, mode: SortMode) {
        let fresh = self
            .projection
            .as_ref()
            .map_or(false, |p| p.mode == mode && p.criteria == *criteria);
        if fresh {
            return;
        }

        let order = self.pipeline.project_indices(&self.raw, criteria, mode);
        self.runs += 1;
        self.projection = Some(Projection {
            criteria: criteria.clone(),
            mode,
            order,
        });
    }

    pub fn view(&mut self, criteria: &FilterCriteria, mode: SortMode) -> Vec<&FlightOffer> {
        self.refresh(criteria, mode);
        match &self.projection {
            Some(projection) => projection.order.iter().map(|&i| &self.raw[i]).collect(),
            None => Vec::new(),
        }
    }

    pub fn rows(&mut self, criteria: &FilterCriteria, mode: SortMode) -> Vec<OfferRow> {
        self.refresh(criteria, mode);
        match &self.projection {
            Some(projection) => projection
                .order
                .iter()
                .map(|&i| self.pipeline.row(&self.raw[i], &self.carriers))
                .collect(),
            None => Vec::new(),
        }
    }

    // Carriers present in the response, for the airline filter, by name.
    pub fn airline_options(&self) -> Vec<(String, String)> {
        let mut options: Vec<(String, String)> = self
            .carriers
            .iter()
            .map(|(code, name)| (code.to_string(), name.to_string()))
            .collect();
        options.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        options
    }

    // Lowest and highest `price.total` in the response, ignoring NaN.
    pub fn price_bounds(&self) -> Option<PriceRange> {
        self.raw
            .iter()
            .map(|offer| offer.price.total)
            .filter(|total| !total.is_nan())
            .fold(None, |bounds: Option<PriceRange>, total| match bounds {
                None => Some(PriceRange::new(total, total)),
                Some(range) => Some(PriceRange::new(range.min.min(total), range.max.max(total))),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::StopsFilter;
    use crate::fixtures::{ids, offer};
    use std::collections::HashMap;

    fn scenario() -> Vec<FlightOffer> {
        vec![
            offer("4000").total(4000.0).build(),
            offer("6000").total(6000.0).build(),
            offer("5000").total(5000.0).build(),
        ]
    }

    fn results(offers: Vec<FlightOffer>) -> OfferSearchResults {
        let mut names = HashMap::new();
        names.insert("AI".to_string(), "AIR INDIA".to_string());
        names.insert("6E".to_string(), "INDIGO".to_string());
        OfferSearchResults {
            offers,
            carriers: names.into(),
            rejected: 0,
        }
    }

    #[test]
    fn test_end_to_end_scenario() {
        let offers = scenario();
        let criteria = FilterCriteria {
            price_range: Some(PriceRange::new(4500.0, 10000.0)),
            ..Default::default()
        };

        assert_eq!(
            ids(project(&offers, &FilterCriteria::default(), SortMode::Recommended)),
            vec!["4000", "6000", "5000"]
        );
        assert_eq!(
            ids(project(&offers, &criteria, SortMode::PriceAsc)),
            vec!["5000", "6000"]
        );
    }

    #[test]
    fn test_project_filters_before_sorting() {
        let offers = vec![
            offer("two-stop")
                .total(100.0)
                .outbound(&[
                    ("2025-03-01T06:00:00", "2025-03-01T07:00:00"),
                    ("2025-03-01T08:00:00", "2025-03-01T09:00:00"),
                    ("2025-03-01T10:00:00", "2025-03-01T11:00:00"),
                ])
                .build(),
            offer("direct-dear").total(900.0).build(),
            offer("direct-cheap").total(300.0).build(),
        ];
        let criteria = FilterCriteria {
            stops: Some(StopsFilter::NonStop),
            ..Default::default()
        };

        assert_eq!(
            ids(project(&offers, &criteria, SortMode::PriceAsc)),
            vec!["direct-cheap", "direct-dear"]
        );
    }

    #[test]
    fn test_view_reuses_projection_until_inputs_change() {
        let mut view = ResultView::new(results(scenario()));
        let criteria = FilterCriteria::default();

        assert_eq!(ids(view.view(&criteria, SortMode::PriceAsc)), vec!["4000", "5000", "6000"]);
        assert_eq!(ids(view.view(&criteria, SortMode::PriceAsc)), vec!["4000", "5000", "6000"]);
        assert_eq!(view.runs(), 1);

        assert_eq!(ids(view.view(&criteria, SortMode::PriceDesc)), vec!["6000", "5000", "4000"]);
        assert_eq!(view.runs(), 2);

        let narrowed = FilterCriteria {
            price_range: Some(PriceRange::new(0.0, 5000.0)),
            ..Default::default()
        };
        assert_eq!(ids(view.view(&narrowed, SortMode::PriceDesc)), vec!["5000", "4000"]);
        assert_eq!(view.runs(), 3);
    }

    #[test]
    fn test_replace_invalidates_projection() {
        let mut view = ResultView::new(results(scenario()));
        let criteria = FilterCriteria::default();
        view.view(&criteria, SortMode::Recommended);

        view.replace(results(vec![offer("fresh").build()]));
        assert_eq!(ids(view.view(&criteria, SortMode::Recommended)), vec!["fresh"]);
        assert_eq!(view.runs(), 2);
    }

    #[test]
    fn test_rows_resolve_carriers_and_prices() {
        let offers = vec![
            offer("usd")
                .total(100.0)
                .currency("USD")
                .airlines(&["AI", "ZZ"])
                .outbound(&[
                    ("2025-03-01T06:00:00", "2025-03-01T08:00:00"),
                    ("2025-03-01T09:00:00", "2025-03-01T11:35:00"),
                ])
                .build(),
        ];
        let mut view = ResultView::new(results(offers));
        let rows = view.rows(&FilterCriteria::default(), SortMode::Recommended);

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.id, "usd");
        assert_eq!(row.origin, "DEL");
        assert_eq!(row.destination, "BOM");
        assert_eq!(row.departure, "Sat, 06:00 am (Terminal: 3)");
        assert_eq!(row.arrival, "Sat, 11:35 am (Terminal: N/A)");
        assert_eq!(row.airlines, "AIR INDIA, ZZ");
        assert_eq!(row.stops, 1);
        assert_eq!(row.stops_label, "1 stop");
        assert_eq!(row.duration, "5h 35m");
        assert_eq!(row.price, "₹8,300");
        assert_eq!(row.price_amount, 8300.0);
    }

    #[test]
    fn test_row_prefers_provider_duration() {
        let mut fare = offer("d").build();
        fare.itineraries[0].duration = Some("PT2H10M".to_string());
        let row = ResultPipeline::default().row(&fare, &CarrierDirectory::default());

        assert_eq!(row.duration, "2h 10m");
        assert_eq!(row.airlines, "AI");
    }

    #[test]
    fn test_airline_options_sorted_by_name() {
        let view = ResultView::new(results(scenario()));
        assert_eq!(
            view.airline_options(),
            vec![
                ("AI".to_string(), "AIR INDIA".to_string()),
                ("6E".to_string(), "INDIGO".to_string()),
            ]
        );
    }

    #[test]
    fn test_price_bounds() {
        let view = ResultView::new(results(scenario()));
        assert_eq!(view.price_bounds(), Some(PriceRange::new(4000.0, 6000.0)));
        assert_eq!(ResultView::default().price_bounds(), None);
    }
}
