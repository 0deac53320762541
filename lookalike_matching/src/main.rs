// src/main.rs
use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use serde_json::{Map, Value as JsonValue};
use std::path::PathBuf;
use std::time::Instant;

use lookalike_lib::cache::create_shared_cache;
use lookalike_lib::matching::{request_from_json, LookalikeEngine};
use lookalike_lib::models::LookalikeRequest;
use lookalike_lib::sources::{CachingSpecialtyExpander, PostgresOrganizationSource, StaticSpecialtyExpander};
use lookalike_lib::utils::config::EngineConfig;
use lookalike_lib::utils::db_connect::{connect, get_pool_status};
use lookalike_lib::utils::env::{load_env, load_env_from_file};

#[derive(Parser)]
#[command(author, version, about = "Find organizations that look like a target", long_about = None)]
struct LookalikeArgs {
    /// Full request as a JSON object; replaces the individual request flags
    #[arg(
        long,
        conflicts_with_all = [
            "state", "city", "specialty", "company_data", "threshold", "max_results",
            "no_contacts", "page", "page_size", "no_cache",
        ]
    )]
    request: Option<String>,

    /// Target state code (required unless present in --company-data)
    #[arg(long)]
    state: Option<String>,

    /// Target city
    #[arg(long)]
    city: Option<String>,

    /// Target specialty; separate several with ';'
    #[arg(long)]
    specialty: Option<String>,

    /// Raw CRM company/deal properties as a JSON object
    #[arg(long)]
    company_data: Option<String>,

    /// Nominal similarity threshold reported with the results (0-100)
    #[arg(long, default_value_t = 85, value_parser = clap::value_parser!(u8).range(0..=100))]
    threshold: u8,

    /// Cap on the full result set before pagination
    #[arg(long)]
    max_results: Option<usize>,

    /// Skip physician and executive contacts
    #[arg(long)]
    no_contacts: bool,

    #[arg(long, default_value_t = 1)]
    page: usize,

    #[arg(long, default_value_t = 10)]
    page_size: usize,

    /// Bypass the result cache
    #[arg(long)]
    no_cache: bool,

    /// JSON file mapping a specialty to related specialties
    #[arg(long)]
    expansion_map: Option<PathBuf>,

    /// Drop expansions that do not appear in the reference data
    #[arg(long)]
    validate_expansions: bool,

    /// Load environment variables from this file instead of .env
    #[arg(long)]
    env_file: Option<String>,
}

impl LookalikeArgs {
    fn company_data(&self) -> Result<Map<String, JsonValue>> {
        let mut data = match &self.company_data {
            Some(raw) => match serde_json::from_str::<JsonValue>(raw)
                .context("--company-data is not valid JSON")?
            {
                JsonValue::Object(map) => map,
                _ => anyhow::bail!("--company-data must be a JSON object"),
            },
            None => Map::new(),
        };
        for (field, value) in [
            ("state", &self.state),
            ("city", &self.city),
            ("specialty", &self.specialty),
        ] {
            if let Some(value) = value {
                data.insert(field.to_string(), JsonValue::String(value.clone()));
            }
        }
        Ok(data)
    }

    fn request(&self) -> Result<LookalikeRequest> {
        if let Some(raw) = &self.request {
            let value: JsonValue = serde_json::from_str(raw).context("--request is not valid JSON")?;
            return request_from_json(value).context("--request is not a valid lookalike request");
        }
        Ok(LookalikeRequest::new(self.company_data()?)
            .with_threshold(self.threshold)
            .with_max_results(self.max_results)
            .with_contacts(!self.no_contacts)
            .with_page(self.page, self.page_size)
            .with_cache(!self.no_cache))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = LookalikeArgs::parse();
    match &args.env_file {
        Some(path) => load_env_from_file(path),
        None => load_env(),
    }
    let start_time = Instant::now();
    info!("Starting lookalike search");

    let config = EngineConfig::from_env();
    let request = args.request()?;

    let pool = connect().await.context("Failed to connect to database")?;
    let source = PostgresOrganizationSource::new(pool.clone());

    let static_expander = match &args.expansion_map {
        Some(path) => StaticSpecialtyExpander::from_json_file(path)?,
        None => StaticSpecialtyExpander::default(),
    };
    let mut expander = CachingSpecialtyExpander::new(static_expander, &config);
    if args.validate_expansions {
        let vocabulary = source
            .distinct_specialties()
            .await
            .context("Failed to load specialty vocabulary")?;
        expander = expander.with_vocabulary(vocabulary);
    }

    let engine = LookalikeEngine::new(source, expander, create_shared_cache(&config), &config);
    let outcome = engine.find_lookalikes(&request).await;

    let (connections, idle) = get_pool_status(&pool);
    info!(
        "Lookalike search finished in {:.2?} (pool: {} connections, {} idle)",
        start_time.elapsed(),
        connections,
        idle
    );

    match outcome {
        Ok(response) => {
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Err(e) => {
            println!("{}", serde_json::to_string_pretty(&e)?);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> std::result::Result<LookalikeArgs, clap::Error> {
        LookalikeArgs::try_parse_from(std::iter::once("lookalikes").chain(args.iter().copied()))
    }

    #[test]
    fn test_flags_build_request() {
        let args = parse(&["--state", "tx", "--city", "Austin", "--threshold", "70", "--no-cache"]).unwrap();
        let request = args.request().unwrap();
        assert_eq!(request.company_data["state"], "tx");
        assert_eq!(request.company_data["city"], "Austin");
        assert_eq!(request.similarity_threshold, 70);
        assert!(!request.use_cache);
    }

    #[test]
    fn test_threshold_flag_is_bounded() {
        assert!(parse(&["--state", "TX", "--threshold", "100"]).is_ok());
        assert!(parse(&["--state", "TX", "--threshold", "150"]).is_err());
    }

    #[test]
    fn test_request_flag_reads_full_request() {
        let args = parse(&[
            "--request",
            r#"{"company_data": {"billing_state": "WA"}, "page": 3, "include_contacts": false}"#,
        ])
        .unwrap();
        let request = args.request().unwrap();
        assert_eq!(request.company_data["billing_state"], "WA");
        assert_eq!(request.page, 3);
        assert!(!request.include_contacts);
        assert_eq!(request.similarity_threshold, 85);
    }

    #[test]
    fn test_request_flag_rejects_out_of_range_threshold() {
        let args = parse(&["--request", r#"{"company_data": {}, "similarity_threshold": 101}"#]).unwrap();
        assert!(args.request().is_err());
    }

    #[test]
    fn test_request_flag_conflicts_with_target_flags() {
        assert!(parse(&["--request", "{}", "--state", "TX"]).is_err());
    }
}
