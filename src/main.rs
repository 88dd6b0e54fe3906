use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use flight_search::{
    AmadeusClient, BookingSession, ClientConfig, FilterCriteria, PriceRange, SearchForm,
    SearchStatus, SortMode, StopsFilter, TimeBand, TravelClass, TripType,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(about = "Search flight offers and list them filtered and sorted")]
struct Args {
    /// Origin airport or city IATA code
    #[arg(long)]
    from: String,

    /// Destination airport or city IATA code
    #[arg(long)]
    to: String,

    /// Departure date (YYYY-MM-DD)
    #[arg(long)]
    date: NaiveDate,

    /// Return date for a round trip (YYYY-MM-DD)
    #[arg(long = "return", value_name = "DATE")]
    return_date: Option<NaiveDate>,

    #[arg(long, default_value_t = 1)]
    adults: u32,

    #[arg(long, default_value_t = 0)]
    children: u32,

    #[arg(long, value_enum, default_value = "economy")]
    class: CabinArg,

    /// Ask the provider for non-stop flights only
    #[arg(long)]
    non_stop: bool,

    /// RECOMMENDED, PRICE_ASC, DURATION_DESC, DEPARTURE_ASC, ...
    #[arg(long, default_value = "RECOMMENDED")]
    sort: SortMode,

    /// 0, 1 or 2+
    #[arg(long)]
    stops: Option<StopsFilter>,

    /// Validating airline code
    #[arg(long)]
    airline: Option<String>,

    /// Only offers with checked baggage
    #[arg(long)]
    baggage: bool,

    /// early-morning, morning, afternoon or evening
    #[arg(long, value_name = "BAND")]
    departure_band: Option<TimeBand>,

    #[arg(long, value_name = "BAND")]
    arrival_band: Option<TimeBand>,

    #[arg(long, requires = "max_price")]
    min_price: Option<f64>,

    #[arg(long)]
    max_price: Option<f64>,

    /// Print the trip review for this offer id after the list
    #[arg(long, value_name = "OFFER_ID")]
    review: Option<String>,

    /// Emit JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum CabinArg {
    Economy,
    PremiumEconomy,
    Business,
    First,
}

impl From<CabinArg> for TravelClass {
    fn from(cabin: CabinArg) -> Self {
        match cabin {
            CabinArg::Economy => TravelClass::Economy,
            CabinArg::PremiumEconomy => TravelClass::PremiumEconomy,
            CabinArg::Business => TravelClass::Business,
            CabinArg::First => TravelClass::First,
        }
    }
}

impl Args {
    fn form(&self) -> SearchForm {
        SearchForm {
            origin: self.from.clone(),
            destination: self.to.clone(),
            departure_date: Some(self.date),
            return_date: self.return_date,
            adults: self.adults,
            children: self.children,
            trip_type: if self.return_date.is_some() {
                TripType::Return
            } else {
                TripType::OneWay
            },
            travel_class: self.class.into(),
            non_stop: self.non_stop,
        }
    }

    fn criteria(&self) -> FilterCriteria {
        FilterCriteria {
            stops: self.stops,
            airline: self.airline.clone(),
            baggage: self.baggage.then_some(true),
            departure_time_band: self.departure_band,
            arrival_time_band: self.arrival_band,
            price_range: self
                .max_price
                .map(|max| PriceRange::new(self.min_price.unwrap_or(0.0), max)),
        }
    }

    fn summary(&self) -> String {
        let mut parts = vec![format!("Sorted by {}", self.sort.label())];
        if let Some(stops) = self.stops {
            parts.push(stops.label().to_string());
        }
        if let Some(band) = self.departure_band {
            parts.push(format!("departing {}", band.label()));
        }
        if let Some(band) = self.arrival_band {
            parts.push(format!("arriving {}", band.label()));
        }
        parts.join(" | ")
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flight_search=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = ClientConfig::from_env().context("Failed to load provider configuration")?;
    let client = AmadeusClient::new(config)?;
    let mut session = BookingSession::new();

    if let SearchStatus::Loaded { offers, rejected } = session.submit(&client, &args.form()).await? {
        tracing::info!(offers, rejected, "Search complete");
    }
    session.set_criteria(args.criteria());
    session.set_sort(args.sort);

    let rows = session.visible_rows()?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else if rows.is_empty() {
        println!("{}", args.summary());
        println!("No flights match the selected filters.");
    } else {
        println!("{}", args.summary());
        for row in &rows {
            println!(
                "{:>6}  {:>10}  {} {} → {} {}  {}  {}  {}",
                row.id,
                row.price,
                row.origin,
                row.departure,
                row.destination,
                row.arrival,
                row.duration,
                row.stops_label,
                row.airlines
            );
        }
        println!("{} of {} offers shown", rows.len(), session.results().map_or(0, |r| r.len()));
    }

    if let Some(offer_id) = args.review.as_deref() {
        session.select_offer(offer_id)?;
        let review = session.review()?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&review)?);
        } else {
            println!();
            println!("Flight {}: {} → {}", review.flight.id, review.flight.departure, review.flight.arrival);
            println!("Base fare: {}", review.fare.base);
            println!("Fees:      {}", review.fare.fees);
            println!("Total:     {}", review.fare.total);
            if review.amenities.is_empty() {
                println!("No amenities listed.");
            }
            for amenity in &review.amenities {
                let note = if amenity.chargeable { " (Chargeable)" } else { "" };
                println!("  - {}{}", amenity.description, note);
            }
        }
    }

    Ok(())
}
