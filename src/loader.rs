use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use ulid::Ulid;

use crate::defaults;
use crate::inventory::Inventory;
use crate::model::*;
use crate::rules::Rules;
use crate::tariff::TariffTable;

/// Why a data source could not be used. Logged, then replaced by defaults.
#[derive(Debug)]
pub enum DataLoadError {
    Io(io::Error),
    Timeout(Duration),
    Malformed(String),
}

impl std::fmt::Display for DataLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataLoadError::Io(e) => write!(f, "read failed: {e}"),
            DataLoadError::Timeout(d) => write!(f, "timed out after {}ms", d.as_millis()),
            DataLoadError::Malformed(msg) => write!(f, "malformed: {msg}"),
        }
    }
}

impl std::error::Error for DataLoadError {}

impl From<io::Error> for DataLoadError {
    fn from(e: io::Error) -> Self {
        DataLoadError::Io(e)
    }
}

/// Everything one booking session needs.
#[derive(Debug, Clone)]
pub struct SessionData {
    pub inventory: Inventory,
    pub tariff: TariffTable,
    pub rules: Rules,
    pub periods: Vec<RestrictedPeriod>,
    /// Bookings imported from an external list; seeded into the ledger.
    pub bookings: Vec<Booking>,
}

impl SessionData {
    /// The built-in data set, with no imported bookings.
    pub fn defaults() -> Self {
        Self {
            inventory: defaults::inventory(),
            tariff: defaults::tariff(),
            rules: defaults::rules(),
            periods: defaults::restricted_periods(),
            bookings: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DataSources {
    pub rooms: PathBuf,
    pub tariff: PathBuf,
    pub rules: PathBuf,
    pub periods: PathBuf,
    pub bookings: Option<PathBuf>,
    pub timeout: Duration,
}

impl DataSources {
    /// Conventional file names under `dir`. A `rooms.csv` wins over `rooms.json`.
    pub fn in_dir(dir: &Path, timeout: Duration) -> Self {
        let csv = dir.join("rooms.csv");
        let rooms = if csv.exists() { csv } else { dir.join("rooms.json") };
        let bookings = dir.join("bookings.json");
        Self {
            rooms,
            tariff: dir.join("tariff.json"),
            rules: dir.join("rules.json"),
            periods: dir.join("restricted_periods.json"),
            bookings: bookings.exists().then_some(bookings),
            timeout,
        }
    }
}

async fn read_source(path: &Path, timeout: Duration) -> Result<String, DataLoadError> {
    match tokio::time::timeout(timeout, tokio::fs::read_to_string(path)).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(DataLoadError::Timeout(timeout)),
    }
}

/// Read and parse one source, substituting `fallback` on any failure.
async fn load_or_default<T>(
    source: &'static str,
    path: &Path,
    timeout: Duration,
    parse: impl FnOnce(&str) -> Result<T, DataLoadError>,
    fallback: impl FnOnce() -> T,
) -> T {
    match read_source(path, timeout).await.and_then(|text| parse(&text)) {
        Ok(value) => {
            info!(source, path = %path.display(), "loaded");
            value
        }
        Err(e) => {
            warn!(source, path = %path.display(), "{e}; using built-in defaults");
            metrics::counter!(crate::observability::DATA_LOAD_FALLBACKS_TOTAL, "source" => source)
                .increment(1);
            fallback()
        }
    }
}

fn parse_rooms(path: &Path) -> impl FnOnce(&str) -> Result<Inventory, DataLoadError> + '_ {
    move |text: &str| {
        let delimited = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| matches!(e.to_ascii_lowercase().as_str(), "csv" | "tsv" | "txt"));
        if delimited {
            Inventory::from_delimited(text)
        } else {
            Inventory::from_json(text)
        }
    }
}

fn parse_periods(text: &str) -> Result<Vec<RestrictedPeriod>, DataLoadError> {
    serde_json::from_str(text).map_err(|e| DataLoadError::Malformed(e.to_string()))
}

/// Load every source concurrently. Never fails: each source falls back on its own.
pub async fn load_session(sources: &DataSources) -> SessionData {
    let t = sources.timeout;
    let imported_at = chrono::Local::now().naive_local();
    let (inventory, tariff, rules, periods, bookings) = tokio::join!(
        load_or_default("rooms", &sources.rooms, t, parse_rooms(&sources.rooms), defaults::inventory),
        load_or_default("tariff", &sources.tariff, t, TariffTable::from_json, defaults::tariff),
        load_or_default("rules", &sources.rules, t, Rules::from_json, defaults::rules),
        load_or_default("periods", &sources.periods, t, parse_periods, defaults::restricted_periods),
        async {
            match &sources.bookings {
                Some(path) => {
                    load_or_default(
                        "bookings",
                        path,
                        t,
                        |text| parse_bookings(text, imported_at),
                        Vec::new,
                    )
                    .await
                }
                None => Vec::new(),
            }
        },
    );
    SessionData {
        inventory,
        tariff,
        rules,
        periods,
        bookings,
    }
}

/// One room of an externally kept booking.
#[derive(Debug, Deserialize)]
struct BookingRow {
    #[serde(default)]
    id: Option<Value>,
    #[serde(alias = "checkIn", alias = "ci")]
    check_in: String,
    #[serde(alias = "checkOut", alias = "co")]
    check_out: String,
    block: String,
    #[serde(alias = "room_no", alias = "room")]
    room_id: Value,
    #[serde(default)]
    status: Option<String>,
    #[serde(default, alias = "memberId")]
    member_id: Option<String>,
}

fn parse_day(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    // Accept full timestamps by keeping only the date part.
    NaiveDate::parse_from_str(s.get(..10).unwrap_or(s), "%Y-%m-%d").ok()
}

fn value_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse an imported booking list: one row per room, rows sharing an id merge.
pub fn parse_bookings(text: &str, imported_at: NaiveDateTime) -> Result<Vec<Booking>, DataLoadError> {
    let rows: Vec<Value> =
        serde_json::from_str(text).map_err(|e| DataLoadError::Malformed(e.to_string()))?;

    // (source id, booking) in first-seen order.
    let mut merged: Vec<(Option<String>, Booking)> = Vec::new();
    for (n, raw) in rows.into_iter().enumerate() {
        let row: BookingRow = match serde_json::from_value(raw) {
            Ok(row) => row,
            Err(e) => {
                debug!(row = n, "dropping booking row: {e}");
                continue;
            }
        };
        let (Some(start), Some(end)) = (parse_day(&row.check_in), parse_day(&row.check_out)) else {
            debug!(row = n, check_in = %row.check_in, check_out = %row.check_out, "dropping booking row with bad dates");
            continue;
        };
        let range = DateRange::new(start, end);
        if range.nights() < 1 {
            debug!(row = n, "dropping booking row with no nights");
            continue;
        }
        let Some(room_id) = value_text(&row.room_id) else {
            debug!(row = n, "dropping booking row without a room");
            continue;
        };
        let room = RoomRef::new(row.block.trim(), room_id);
        let source_id = row.id.as_ref().and_then(value_text);

        if let Some(sid) = &source_id
            && let Some((_, existing)) = merged
                .iter_mut()
                .find(|(id, b)| id.as_deref() == Some(sid) && b.range == range)
        {
            existing.rooms.insert(room);
            continue;
        }

        let id = source_id
            .as_deref()
            .and_then(|s| Ulid::from_string(s).ok())
            .filter(|id| !merged.iter().any(|(_, b)| b.id == *id))
            .unwrap_or_else(Ulid::new);
        let cancelled = row
            .status
            .as_deref()
            .is_some_and(|s| matches!(s.trim().to_ascii_lowercase().as_str(), "cancelled" | "canceled"));
        let booking = Booking {
            id,
            member_id: row.member_id.unwrap_or_default(),
            range,
            rooms: [room].into_iter().collect(),
            occupants: OccupantBreakdown::default(),
            ac: false,
            group: false,
            total_price: Decimal::ZERO,
            status: if cancelled {
                BookingStatus::Cancelled
            } else {
                BookingStatus::Confirmed
            },
            created_at: imported_at,
            cancelled_at: cancelled.then_some(imported_at),
        };
        merged.push((source_id, booking));
    }
    Ok(merged.into_iter().map(|(_, b)| b).collect())
}
