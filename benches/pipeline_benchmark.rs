use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use flight_search::offer::{Endpoint, Itinerary, Price, Segment};
use flight_search::{
    FilterCriteria, FlightOffer, OfferSearchResults, PriceRange, ResultPipeline, ResultView,
    SortMode, StopsFilter, TimeBand,
};
use rand::{seq::SliceRandom, thread_rng, Rng};

const AIRLINES: [&str; 5] = ["AI", "6E", "UK", "SG", "QP"];
const CURRENCIES: [&str; 4] = ["INR", "USD", "EUR", "GBP"];

fn segment(departure_at: String, arrival_at: String) -> Segment {
    Segment {
        departure: Endpoint {
            iata_code: "DEL".to_string(),
            terminal: Some("3".to_string()),
            at: departure_at,
        },
        arrival: Endpoint {
            iata_code: "BOM".to_string(),
            terminal: None,
            at: arrival_at,
        },
        carrier_code: Some("AI".to_string()),
        number: Some("101".to_string()),
    }
}

fn random_offers(count: usize) -> Vec<FlightOffer> {
    let mut rng = thread_rng();
    (0..count)
        .map(|i| {
            let stops = rng.gen_range(0..3);
            let departure_hour = rng.gen_range(0..24);
            let segments = (0..=stops)
                .map(|leg| {
                    let hour = (departure_hour + leg * 3) % 24;
                    segment(
                        format!("2025-03-01T{:02}:{:02}:00", hour, rng.gen_range(0..60)),
                        format!("2025-03-02T{:02}:{:02}:00", (hour + 2) % 24, rng.gen_range(0..60)),
                    )
                })
                .collect();
            let airline = AIRLINES.choose(&mut rng).unwrap_or(&"AI");
            let total = rng.gen_range(1_500.0..60_000.0);

            FlightOffer {
                id: i.to_string(),
                price: Price {
                    total,
                    base: total * 0.9,
                    currency: CURRENCIES.choose(&mut rng).unwrap_or(&"INR").to_string(),
                    fees: vec![],
                },
                itineraries: vec![Itinerary {
                    duration: None,
                    segments,
                }],
                traveler_pricings: vec![],
                validating_airline_codes: vec![airline.to_string()],
            }
        })
        .collect()
}

fn busy_criteria() -> FilterCriteria {
    FilterCriteria {
        stops: Some(StopsFilter::OneStop),
        airline: Some("AI".to_string()),
        departure_time_band: Some(TimeBand::Morning),
        price_range: Some(PriceRange::new(3_000.0, 40_000.0)),
        ..Default::default()
    }
}

pub fn pipeline_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("result_pipeline");
    let pipeline = ResultPipeline::default();

    // Up to the provider's page size and beyond
    for size in [50, 250, 1000].iter() {
        let offers = random_offers(*size);

        group.bench_with_input(BenchmarkId::new("price_asc", size), &offers, |b, offers| {
            b.iter(|| {
                black_box(pipeline.project(offers, &FilterCriteria::default(), SortMode::PriceAsc))
            });
        });

        group.bench_with_input(
            BenchmarkId::new("filtered_departure_desc", size),
            &offers,
            |b, offers| {
                let criteria = busy_criteria();
                b.iter(|| black_box(pipeline.project(offers, &criteria, SortMode::DepartureDesc)));
            },
        );

        group.bench_with_input(BenchmarkId::new("rows", size), &offers, |b, offers| {
            let mut view = ResultView::new(OfferSearchResults {
                offers: offers.clone(),
                ..Default::default()
            });
            let modes = [SortMode::PriceAsc, SortMode::DurationAsc];
            let mut turn = 0;
            b.iter(|| {
                // alternate modes so every iteration reruns the pipeline
                turn += 1;
                black_box(view.rows(&FilterCriteria::default(), modes[turn % 2]))
            });
        });
    }

    group.finish();
}

criterion_group!(benches, pipeline_benchmark);
criterion_main!(benches);
