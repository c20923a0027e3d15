//! Operator CLI: query a running safepath server.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use reqwest::blocking::Client;
use serde_json::Value;

use safepath_core::FindRouteRequest;

#[derive(Parser)]
#[command(name = "safepath", about = "Query the safepath route server")]
struct Cli {
    /// Server base URL
    #[arg(long, default_value = "http://localhost:3000", global = true)]
    server: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Find the best route between two coordinates
    Route {
        /// Start coordinate as "lat,lng"
        #[arg(long)]
        from: String,
        /// End coordinate as "lat,lng"
        #[arg(long)]
        to: String,
        /// 0.0 = fastest, 1.0 = safest
        #[arg(long, default_value_t = 0.7)]
        safety_weight: f64,
        #[arg(long, default_value_t = 2.0)]
        max_distance_factor: f64,
        /// Also print the per-strategy comparison
        #[arg(long)]
        all: bool,
    },
    /// Probe the safety score at one coordinate
    Score {
        /// Coordinate as "lat,lng"
        #[arg(long)]
        at: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = Client::new();

    match cli.command {
        Command::Route {
            from,
            to,
            safety_weight,
            max_distance_factor,
            all,
        } => {
            let start = parse_coord(&from)?;
            let end = parse_coord(&to)?;
            let request = FindRouteRequest::new(start, end)
                .with_safety_weight(safety_weight)
                .with_max_distance_factor(max_distance_factor);

            let body: Value = client
                .post(format!("{}/v1/route", cli.server))
                .json(&request)
                .send()
                .context("request failed; is the server running?")?
                .error_for_status()?
                .json()?;

            print_route(&body);

            if all {
                let url = format!(
                    "{}/v1/route/compare?start_lat={}&start_lng={}&end_lat={}&end_lng={}&safety_weight={}&max_distance_factor={}",
                    cli.server, start.0, start.1, end.0, end.1, safety_weight, max_distance_factor
                );
                let compare: Value = client.get(url).send()?.error_for_status()?.json()?;
                print_comparison(&compare);
            }
        }
        Command::Score { at } => {
            let (lat, lng) = parse_coord(&at)?;
            let body: Value = client
                .get(format!(
                    "{}/v1/safety/score?lat={lat}&lng={lng}",
                    cli.server
                ))
                .send()
                .context("request failed; is the server running?")?
                .error_for_status()?
                .json()?;

            println!(
                "({lat:.4}, {lng:.4})  score {:.1}  grade {}  nearby incidents {}",
                body["safety_score"].as_f64().unwrap_or(0.0),
                body["grade"].as_str().unwrap_or("?"),
                body["nearby_incidents"].as_u64().unwrap_or(0),
            );
        }
    }

    Ok(())
}

fn parse_coord(raw: &str) -> Result<(f64, f64)> {
    let Some((lat, lng)) = raw.split_once(',') else {
        bail!("expected \"lat,lng\", got {raw:?}");
    };
    Ok((
        lat.trim().parse().context("invalid latitude")?,
        lng.trim().parse().context("invalid longitude")?,
    ))
}

fn print_route(body: &Value) {
    let Some(route) = body.get("best_route").filter(|r| r.is_object()) else {
        println!("no route returned: {}", body["error"].as_str().unwrap_or("unknown error"));
        return;
    };

    println!(
        "{} route via {} ({} points)",
        route["safety_grade"].as_str().unwrap_or("?"),
        route["strategy"].as_str().unwrap_or("?"),
        route["points"].as_array().map(Vec::len).unwrap_or(0),
    );
    println!(
        "  distance  {:.0} m",
        route["total_distance_m"].as_f64().unwrap_or(0.0)
    );
    println!(
        "  safety    {:.1} / 100",
        route["avg_safety_score"].as_f64().unwrap_or(0.0)
    );
    println!(
        "  incidents {}",
        route["total_incidents"].as_u64().unwrap_or(0)
    );
    println!(
        "  method    {}",
        body["routing_method"].as_str().unwrap_or("?")
    );
    if route["exceeds_distance_cap"].as_bool() == Some(true) {
        println!("  note: route exceeds the requested distance cap");
    }
}

fn print_comparison(body: &Value) {
    let Some(options) = body["options"].as_array() else {
        return;
    };

    println!("\nstrategy    distance    safety  grade  incidents");
    for option in options {
        println!(
            "{}{:<10}  {:>7.0} m  {:>6.1}  {:>5}  {:>9}",
            if option["selected"] == Value::Bool(true) { "*" } else { " " },
            option["strategy"].as_str().unwrap_or("?"),
            option["total_distance_m"].as_f64().unwrap_or(0.0),
            option["avg_safety_score"].as_f64().unwrap_or(0.0),
            option["safety_grade"].as_str().unwrap_or("?"),
            option["total_incidents"].as_u64().unwrap_or(0),
        );
    }
}
