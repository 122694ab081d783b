use anyhow::anyhow;
use clap::{Parser, Subcommand};
use skycast_core::geolocate::EnvGeolocation;
use skycast_core::{Config, SearchResult, WeatherGateway, WeatherSnapshot};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "skycast", version, about = "Weather dashboard CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key.
    Configure,

    /// Show current conditions and the 5-day forecast for a coordinate.
    Show {
        lat: f64,
        lon: f64,
    },

    /// Re-fetch a coordinate, bypassing the cache.
    Refresh {
        lat: f64,
        lon: f64,
    },

    /// Search for a place by name and pick one to show.
    Search {
        query: String,
    },

    /// Weather for this device's location, falling back to the configured
    /// default location.
    Here,

    /// List recently selected places.
    Recent,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        if let Command::Configure = self.command {
            return configure();
        }

        let config = Config::load()?;
        let gateway = WeatherGateway::from_config(&config)
            .map_err(|err| anyhow!(err.user_message()))?
            .with_geolocator(Box::new(EnvGeolocation));

        match self.command {
            Command::Configure => unreachable!("handled above"),
            Command::Show { lat, lon } => {
                let snapshot = run(gateway.weather(lat, lon).await)?;
                print_snapshot(&snapshot);
            }
            Command::Refresh { lat, lon } => {
                let snapshot = run(gateway.refresh(lat, lon).await)?;
                print_snapshot(&snapshot);
            }
            Command::Search { query } => {
                let results = run(gateway.search(&query).await)?;
                let Some(chosen) = pick_result(results)? else {
                    println!("No places found for that query.");
                    return Ok(());
                };

                gateway.record_search(chosen.clone());
                let snapshot = run(gateway.weather(chosen.lat, chosen.lon).await)?;
                print_snapshot(&snapshot);
            }
            Command::Here => {
                if let Some(snapshot) = run(gateway.weather_for_current_device().await)? {
                    print_snapshot(&snapshot);
                    return Ok(());
                }

                // No device position; fall back to the configured default.
                match (config.default_lat, config.default_lon) {
                    (Some(lat), Some(lon)) => {
                        println!("No device location available, using default location.\n");
                        let snapshot = run(gateway.weather(lat, lon).await)?;
                        print_snapshot(&snapshot);
                    }
                    _ => {
                        println!(
                            "No device location available and no default configured.\n\
                             Hint: set SKYCAST_LAT/SKYCAST_LON, or search manually with \
                             `skycast search <place>`."
                        );
                    }
                }
            }
            Command::Recent => {
                let recent = gateway.recent_searches();
                if recent.is_empty() {
                    println!("No recent searches.");
                } else {
                    for (i, result) in recent.iter().enumerate() {
                        println!("{}. {}  ({}, {})", i + 1, result.label(), result.lat, result.lon);
                    }
                }
            }
        }

        Ok(())
    }
}

/// Map core failures to their user-facing message at the binary boundary.
fn run<T>(result: skycast_core::Result<T>) -> anyhow::Result<T> {
    result.map_err(|err| {
        tracing::debug!(%err, "pipeline error");
        anyhow!(err.user_message())
    })
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let key = inquire::Password::new("OpenWeather API key:")
        .without_confirmation()
        .prompt()?;

    config.api_key = Some(key.trim().to_string());
    config.save()?;

    println!("Saved to {}", Config::config_file_path()?.display());
    Ok(())
}

/// Let the user disambiguate between geocoding matches.
fn pick_result(results: Vec<SearchResult>) -> anyhow::Result<Option<SearchResult>> {
    if results.is_empty() {
        return Ok(None);
    }
    if results.len() == 1 {
        return Ok(results.into_iter().next());
    }

    let labels: Vec<String> = results.iter().map(SearchResult::label).collect();
    let choice = inquire::Select::new("Which place?", labels).raw_prompt()?;

    Ok(results.into_iter().nth(choice.index))
}

fn print_snapshot(snapshot: &WeatherSnapshot) {
    let loc = &snapshot.location;
    let cur = &snapshot.current;

    println!("{}, {}  ({}, {})", loc.name, loc.country, loc.lat, loc.lon);
    println!("  {}, {:.1}°C (feels like {:.1}°C)", cur.description, cur.temperature, cur.feels_like);
    print!(
        "  Humidity {}% · Wind {} km/h · Visibility {} km · Pressure {:.0} hPa",
        cur.humidity_pct, cur.wind_speed_kmh, cur.visibility_km, cur.pressure_hpa
    );
    match cur.uv_index {
        Some(uv) => println!(" · UV {uv:.1}"),
        None => println!(),
    }
    let updated_local = snapshot.last_updated.with_timezone(&chrono::Local);
    println!("  Updated {}", updated_local.format("%Y-%m-%d %H:%M"));

    if snapshot.forecast.is_empty() {
        return;
    }

    println!();
    println!("  Forecast:");
    for day in &snapshot.forecast {
        println!(
            "    {}  {:>3}° / {:<3}°  {}  (precip {}%, wind {} km/h)",
            day.date, day.min_temp, day.max_temp, day.description, day.precipitation_pct,
            day.wind_speed_kmh
        );
    }
}
