//! Service status CLI commands

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use tabled::Tabled;

use crate::client::{ApiClient, FieldDomain};
use crate::output::{color_status, format_timestamp, print_json, print_table, OutputFormat};

/// Row for components table
#[derive(Tabled, Serialize)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
    #[tabled(rename = "Checked")]
    checked: String,
}

/// Row for the field domain table
#[derive(Tabled, Serialize)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Range")]
    range: String,
    #[tabled(rename = "Step")]
    step: i64,
    #[tabled(rename = "Default")]
    default: String,
}

/// Show service health
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health = client.health().await?;

    if let OutputFormat::Json = format {
        return print_json(&health);
    }

    println!("Service: {}", color_status(&health.status).bold());
    println!();

    let rows: Vec<ComponentRow> = health
        .components
        .iter()
        .map(|(name, component)| ComponentRow {
            name: name.clone(),
            status: color_status(&component.status),
            message: component.message.clone().unwrap_or_else(|| "-".to_string()),
            checked: format_timestamp(component.last_check_timestamp),
        })
        .collect();

    print_table(&rows, format)
}

/// List accepted input fields with their ranges and defaults
pub async fn show_fields(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let fields: Vec<FieldDomain> = client.get("api/v1/fields").await?;

    if let OutputFormat::Json = format {
        return print_json(&fields);
    }

    let rows: Vec<FieldRow> = fields.iter().map(field_row).collect();
    print_table(&rows, format)
}

fn field_row(domain: &FieldDomain) -> FieldRow {
    let boolean = domain.kind == "boolean";
    FieldRow {
        field: domain.field.clone(),
        kind: domain.kind.clone(),
        range: if boolean {
            "true/false".to_string()
        } else {
            format!("{}..={}", domain.min, domain.max)
        },
        step: domain.step,
        default: if boolean {
            (domain.default != 0).to_string()
        } else {
            domain.default.to_string()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domain(field: &str, kind: &str, min: i64, max: i64, default: i64) -> FieldDomain {
        FieldDomain {
            field: field.to_string(),
            kind: kind.to_string(),
            min,
            max,
            step: 1,
            default,
        }
    }

    #[test]
    fn test_field_row_rendering() {
        let row = field_row(&domain("made", "integer", 1990, 2026, 2000));
        assert_eq!(row.range, "1990..=2026");
        assert_eq!(row.default, "2000");

        let row = field_row(&domain("hasYard", "boolean", 0, 1, 0));
        assert_eq!(row.range, "true/false");
        assert_eq!(row.default, "false");
    }
}
