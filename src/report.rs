//! HTML report of the stored readings.

use askama::Template;
use chrono::Utc;

use crate::reading::Reading;

/// Placeholder for values that are absent.
const MISSING: &str = "-";

/// One table row, pre-formatted for display.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub message_id: String,
    pub from_address: String,
    pub observed_at: String,
    pub temperature: String,
    pub humidity: String,
    pub weight: String,
    pub primary_tag_id: String,
    pub secondary_tag_ids: String,
}

impl From<&Reading> for ReportRow {
    fn from(reading: &Reading) -> Self {
        Self {
            message_id: reading.message_id.clone(),
            from_address: reading.from_address.clone(),
            observed_at: reading
                .observed_at()
                .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| MISSING.to_string()),
            temperature: format_number(reading.temperature_c),
            humidity: format_number(reading.humidity_percent),
            weight: format_number(reading.weight_grams),
            primary_tag_id: reading.primary_tag_id.clone(),
            secondary_tag_ids: reading.secondary_tag_ids.join(", "),
        }
    }
}

fn format_number(value: Option<f64>) -> String {
    value.map_or_else(|| MISSING.to_string(), |v| v.to_string())
}

/// Full report page.
#[derive(Template)]
#[template(path = "report.html")]
pub struct ReportTemplate {
    pub rows: Vec<ReportRow>,
    pub generated_at: String,
}

impl ReportTemplate {
    pub fn new(readings: &[Reading]) -> Self {
        Self {
            rows: readings.iter().map(ReportRow::from).collect(),
            generated_at: Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        }
    }
}

/// Render the report for `readings`, in the order given.
pub fn render(readings: &[Reading]) -> Result<String, askama::Error> {
    ReportTemplate::new(readings).render()
}
