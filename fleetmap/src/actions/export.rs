//! CSV and JSON export of selected equipment.

use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::store::EquipmentRecord;

use super::ActionError;

/// CSV header row.
pub const CSV_HEADERS: [&str; 14] = [
    "ID",
    "Plate",
    "Code",
    "Model",
    "Brand",
    "Status",
    "Type",
    "Region",
    "Warehouse",
    "Longitude",
    "Latitude",
    "Client",
    "City",
    "Province",
];

/// Export output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

impl FromStr for ExportFormat {
    type Err = std::convert::Infallible;

    /// `csv` (any case) selects CSV; everything else is JSON.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(if s.eq_ignore_ascii_case("csv") {
            ExportFormat::Csv
        } else {
            ExportFormat::Json
        })
    }
}

/// Attachment file name, stamped with the current time in milliseconds.
pub fn export_filename(now: DateTime<Utc>) -> String {
    format!("equipment-export-{}.csv", now.timestamp_millis())
}

fn coordinate(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn row(record: &EquipmentRecord) -> [String; 14] {
    let text = |v: &Option<String>| v.clone().unwrap_or_default();
    let client = record.client.clone().unwrap_or_default();

    [
        record.id.clone(),
        record.plate.clone(),
        record.code.clone(),
        text(&record.model),
        text(&record.brand),
        text(&record.status),
        text(&record.kind),
        text(&record.region),
        text(&record.warehouse),
        coordinate(record.longitude),
        coordinate(record.latitude),
        text(&client.name),
        text(&client.city),
        text(&client.province),
    ]
}

/// Header plus one fully quoted row per record, `\n`-terminated.
pub fn to_csv(records: &[EquipmentRecord]) -> Result<String, ActionError> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    let export_error = |e: csv::Error| ActionError::Export(e.to_string());

    writer.write_record(CSV_HEADERS).map_err(export_error)?;
    for record in records {
        writer.write_record(row(record)).map_err(export_error)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ActionError::Export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ActionError::Export(e.to_string()))
}
