//! Request bodies and query strings.
//!
//! Responses reuse the domain types directly; they already serialize money
//! as decimal strings and timestamps as RFC 3339.

use serde::Deserialize;

use dinein_core::validation::{parse_date, parse_date_or_instant, DateOrInstant};
use dinein_core::{CoreError, MenuItemId, PaymentMethod, ValidationError};

use crate::error::{ApiError, ApiResult};

/// `POST /orders/{id}/items`
#[derive(Debug, Deserialize)]
pub struct AddLineRequest {
    pub item_id: MenuItemId,
    pub quantity: i64,
    #[serde(default)]
    pub notes: Option<String>,
}

/// `POST /orders/{id}/payment`
#[derive(Debug, Deserialize)]
pub struct SettleRequest {
    pub method: String,
    #[serde(default)]
    pub reference: Option<String>,
}

impl SettleRequest {
    pub fn method(&self) -> ApiResult<PaymentMethod> {
        self.method
            .trim()
            .parse()
            .map_err(|e: CoreError| ApiError::validation(e.to_string()))
    }
}

/// `PATCH /orders/{id}`
#[derive(Debug, Deserialize)]
pub struct SetNotesRequest {
    #[serde(default)]
    pub notes: Option<String>,
}

/// `?date=YYYY-MM-DD`
#[derive(Debug, Deserialize)]
pub struct DateQuery {
    pub date: Option<String>,
}

impl DateQuery {
    pub fn date(&self) -> ApiResult<chrono::NaiveDate> {
        Ok(parse_date("date", required("date", &self.date)?)?)
    }
}

/// `?year=2025&month=1`
#[derive(Debug, Deserialize)]
pub struct MonthQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

impl MonthQuery {
    pub fn year_month(&self) -> ApiResult<(i32, u32)> {
        let year = self.year.ok_or_else(|| missing("year"))?;
        let month = self.month.ok_or_else(|| missing("month"))?;
        Ok((year, month))
    }
}

/// `?from=…&to=…[&limit=…]`; bounds are dates or RFC 3339 instants.
#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub limit: Option<i64>,
}

impl RangeQuery {
    pub fn bounds(&self) -> ApiResult<(DateOrInstant, DateOrInstant)> {
        let from = parse_date_or_instant("from", required("from", &self.from)?)?;
        let to = parse_date_or_instant("to", required("to", &self.to)?)?;
        Ok((from, to))
    }
}

fn missing(field: &str) -> ValidationError {
    ValidationError::Required {
        field: field.to_string(),
    }
}

fn required<'a>(field: &str, value: &'a Option<String>) -> Result<&'a str, ValidationError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(missing(field)),
    }
}
