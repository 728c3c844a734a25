//! Prediction CLI command
//!
//! Flags mirror the property form: same ranges and defaults. Values outside
//! a range are rejected by clap before anything is sent.

use anyhow::Result;
use clap::{value_parser, Args};
use serde::Serialize;

use crate::client::{ApiClient, SessionView};
use crate::commands::session::print_session;
use crate::output::OutputFormat;

/// Raw property attributes submitted for one prediction
#[derive(Debug, Clone, Args, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyArgs {
    /// Living area in square meters
    #[arg(long, default_value_t = 50, value_parser = value_parser!(i64).range(50..=99_999))]
    pub square_meters: i64,

    #[arg(long, default_value_t = 3, value_parser = value_parser!(i64).range(1..=100))]
    pub number_of_rooms: i64,

    #[arg(long)]
    pub has_yard: bool,

    #[arg(long)]
    pub has_pool: bool,

    #[arg(long, default_value_t = 1, value_parser = value_parser!(i64).range(1..=100))]
    pub floors: i64,

    /// Postal-style city code
    #[arg(long, default_value_t = 75_000, value_parser = value_parser!(i64).range(1000..=99_999))]
    pub city_code: i64,

    /// City part bucket, 1 (cheapest) to 10
    #[arg(long, default_value_t = 5, value_parser = value_parser!(i64).range(1..=10))]
    pub city_part_range: i64,

    #[arg(long, default_value_t = 1, value_parser = value_parser!(i64).range(0..=10))]
    pub num_prev_owners: i64,

    /// Construction year
    #[arg(long, default_value_t = 2000, value_parser = value_parser!(i64).range(1990..=2026))]
    pub made: i64,

    #[arg(long)]
    pub is_new_built: bool,

    #[arg(long)]
    pub has_storm_protector: bool,

    /// Basement area in square meters
    #[arg(long, default_value_t = 0, value_parser = value_parser!(i64).range(0..=10_000))]
    pub basement: i64,

    /// Attic area in square meters
    #[arg(long, default_value_t = 0, value_parser = value_parser!(i64).range(0..=10_000))]
    pub attic: i64,

    /// Garage area in square meters
    #[arg(long, default_value_t = 0, value_parser = value_parser!(i64).range(0..=1000))]
    pub garage: i64,

    #[arg(long)]
    pub has_storage_room: bool,

    #[arg(long)]
    pub has_guest_room: bool,
}

/// Submit the property to a session and show the resulting prediction
pub async fn predict(
    client: &ApiClient,
    id: &str,
    property: &PropertyArgs,
    format: OutputFormat,
) -> Result<()> {
    let view: SessionView = client
        .post(&format!("api/v1/sessions/{}/predict", id), property)
        .await?;
    print_session(&view, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        property: PropertyArgs,
    }

    #[test]
    fn test_defaults_match_form() {
        let cli = TestCli::try_parse_from(["hpp"]).unwrap();
        let body = serde_json::to_value(&cli.property).unwrap();

        assert_eq!(body.as_object().unwrap().len(), 16);
        assert_eq!(body["squareMeters"], 50);
        assert_eq!(body["cityCode"], 75_000);
        assert_eq!(body["made"], 2000);
        assert_eq!(body["hasYard"], false);
    }

    #[test]
    fn test_flags_serialize_with_form_names() {
        let cli = TestCli::try_parse_from([
            "hpp",
            "--square-meters",
            "100",
            "--has-yard",
            "--city-part-range",
            "9",
        ])
        .unwrap();
        let body = serde_json::to_value(&cli.property).unwrap();

        assert_eq!(body["squareMeters"], 100);
        assert_eq!(body["hasYard"], true);
        assert_eq!(body["cityPartRange"], 9);
        assert!(body.get("hasStorageRoom").is_some());
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(TestCli::try_parse_from(["hpp", "--city-part-range", "11"]).is_err());
        assert!(TestCli::try_parse_from(["hpp", "--square-meters", "10"]).is_err());
        assert!(TestCli::try_parse_from(["hpp", "--made", "1989"]).is_err());
    }
}
