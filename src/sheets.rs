use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;

use crate::error::FetchError;
use crate::types::EventRow;

// Expected sheet header names.
const COL_NAME: &str = "Initiative Name";
const COL_REGISTRATIONS: &str = "Registration Count";
const COL_SUBMISSIONS: &str = "Submission Count";
const COL_TEAMS: &str = "Teams Count";
const COL_PAGE_VISITS: &str = "Page Visits";
const COL_GENDER: &str = "Gender Distribution";
const COL_DAILY_REG: &str = "Daily Registrations";
const COL_COUNTRY: &str = "Country";
const COL_STATE: &str = "State";
const COL_CITY: &str = "City";
const COL_OCCUPATION: &str = "Occupation";

static SHEET_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/d/([A-Za-z0-9_-]+)").expect("valid sheet id regex"));

/// Accept either a bare sheet id or a full pasted URL like
/// `https://docs.google.com/spreadsheets/d/SHEET_ID/edit?gid=0`.
pub fn extract_sheet_id(input: &str) -> Option<String> {
    let s = input.trim();
    if let Some(caps) = SHEET_ID_RE.captures(s) {
        return Some(caps[1].to_string());
    }
    if !s.is_empty() && !s.contains(' ') && !s.contains("://") {
        return Some(s.to_string());
    }
    None
}

/// Row-fetch collaborator: reads a spreadsheet through the Sheets v4 values
/// endpoint and maps it to `EventRow`s. The rest of the system treats this as
/// an opaque `fetch(source_id) -> rows` operation behind the cache.
#[derive(Clone)]
pub struct SheetsClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl SheetsClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub async fn fetch_rows(&self, source_id: &str) -> Result<Vec<EventRow>, FetchError> {
        let url = format!(
            "{}/v4/spreadsheets/{}/values/A:Z",
            self.base_url, source_id
        );
        tracing::info!(source_id = %source_id, "fetching sheet rows");

        let response = self
            .http
            .get(&url)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        let payload: ValueRange = response.json().await?;
        let rows = rows_from_values(payload.values)?;
        tracing::info!(source_id = %source_id, rows = rows.len(), "sheet loaded");
        Ok(rows)
    }
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// Map raw sheet values (header row + data rows) onto `EventRow`s. Column
/// order is taken from the header row; missing columns and unparseable
/// numerics coerce to their defaults rather than failing the whole sheet.
fn rows_from_values(values: Vec<Vec<serde_json::Value>>) -> Result<Vec<EventRow>, FetchError> {
    let mut iter = values.into_iter();
    let header = match iter.next() {
        Some(h) => h,
        None => return Ok(Vec::new()), // empty sheet, no data rows
    };

    let columns: HashMap<String, usize> = header
        .iter()
        .enumerate()
        .map(|(i, cell)| (cell_text(Some(cell)).trim().to_string(), i))
        .collect();
    if !columns.contains_key(COL_NAME) {
        return Err(FetchError::Malformed(format!(
            "header row has no {COL_NAME:?} column"
        )));
    }

    let text = |row: &[serde_json::Value], col: &str| -> String {
        cell_text(columns.get(col).and_then(|&i| row.get(i)))
    };
    let number = |row: &[serde_json::Value], col: &str| -> u64 {
        cell_number(columns.get(col).and_then(|&i| row.get(i)))
    };

    let mut rows = Vec::new();
    for row in iter {
        let id = text(&row, COL_NAME).trim().to_string();
        if id.is_empty() {
            tracing::warn!("skipping sheet row with empty initiative name");
            continue;
        }
        rows.push(EventRow {
            id,
            registrations: number(&row, COL_REGISTRATIONS),
            submissions: number(&row, COL_SUBMISSIONS),
            teams: number(&row, COL_TEAMS),
            page_visits: number(&row, COL_PAGE_VISITS),
            gender: text(&row, COL_GENDER),
            daily_registrations: text(&row, COL_DAILY_REG),
            country: text(&row, COL_COUNTRY),
            state: text(&row, COL_STATE),
            city: text(&row, COL_CITY),
            occupation: text(&row, COL_OCCUPATION),
        });
    }
    Ok(rows)
}

fn cell_text(cell: Option<&serde_json::Value>) -> String {
    match cell {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Coerce a cell to a non-negative integer; anything unparseable counts as 0.
fn cell_number(cell: Option<&serde_json::Value>) -> u64 {
    match cell {
        Some(serde_json::Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().map(|f| if f > 0.0 { f as u64 } else { 0 }))
            .unwrap_or(0),
        Some(serde_json::Value::String(s)) => match s.trim().parse::<f64>() {
            Ok(f) if f > 0.0 => f as u64,
            _ => 0,
        },
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_sheet_id_from_url() {
        let url = "https://docs.google.com/spreadsheets/d/1LDJWBy2g1gtQK_u1vw/edit?gid=19#gid=19";
        assert_eq!(extract_sheet_id(url).as_deref(), Some("1LDJWBy2g1gtQK_u1vw"));
    }

    #[test]
    fn test_extract_sheet_id_bare_id() {
        assert_eq!(extract_sheet_id(" abc_DEF-123 ").as_deref(), Some("abc_DEF-123"));
    }

    #[test]
    fn test_extract_sheet_id_rejects_junk() {
        assert_eq!(extract_sheet_id(""), None);
        assert_eq!(extract_sheet_id("not an id"), None);
        assert_eq!(extract_sheet_id("https://example.com/nothing"), None);
    }

    fn sample_values() -> Vec<Vec<serde_json::Value>> {
        vec![
            vec![
                json!("Initiative Name"),
                json!("Registration Count"),
                json!("Submission Count"),
                json!("Teams Count"),
                json!("Page Visits"),
                json!("Gender Distribution"),
                json!("Daily Registrations"),
                json!("Country"),
                json!("State"),
                json!("City"),
                json!("Occupation"),
            ],
            vec![
                json!("Hack 2026"),
                json!(120),
                json!("45"),
                json!(""),
                json!(900.7),
                json!(r#"{"M": 80, "F": 40}"#),
                json!(r#"{"2026-03-01": 120}"#),
                json!(r#"{"IN": 100, "US": 20}"#),
                json!("{}"),
                json!(""),
                json!(r#"{"Student": 110}"#),
            ],
        ]
    }

    #[test]
    fn test_rows_from_values_maps_columns() {
        let rows = rows_from_values(sample_values()).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.id, "Hack 2026");
        assert_eq!(row.registrations, 120);
        assert_eq!(row.submissions, 45); // string numeric coerced
        assert_eq!(row.teams, 0); // blank coerces to 0
        assert_eq!(row.page_visits, 900); // float truncates
        assert_eq!(row.gender, r#"{"M": 80, "F": 40}"#);
        assert_eq!(row.country, r#"{"IN": 100, "US": 20}"#);
    }

    #[test]
    fn test_rows_skip_unnamed_rows() {
        let mut values = sample_values();
        values.push(vec![json!("  "), json!(5)]);
        let rows = rows_from_values(values).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_short_rows_default_missing_cells() {
        let mut values = sample_values();
        values.push(vec![json!("Tiny Event")]);
        let rows = rows_from_values(values).unwrap();
        assert_eq!(rows[1].id, "Tiny Event");
        assert_eq!(rows[1].registrations, 0);
        assert_eq!(rows[1].gender, "");
    }

    #[test]
    fn test_empty_sheet_yields_no_rows() {
        assert!(rows_from_values(Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn test_missing_name_column_is_malformed() {
        let values = vec![vec![json!("Wrong Header")], vec![json!("x")]];
        assert!(matches!(
            rows_from_values(values),
            Err(FetchError::Malformed(_))
        ));
    }

    #[test]
    fn test_negative_numbers_clamp_to_zero() {
        assert_eq!(cell_number(Some(&json!(-5))), 0);
        assert_eq!(cell_number(Some(&json!("-12"))), 0);
        assert_eq!(cell_number(Some(&json!(7.9))), 7);
    }
}
