// Loading and cleaning.
//
// The header row is validated once up front; after that, every problem is
// row-level and handled by exclusion plus a counter in `CleanReport`.
use crate::error::{DashboardError, Result};
use crate::types::{PropertyRecord, RawRow, REQUIRED_COLUMNS};
use crate::util::{non_blank, normalize_label, parse_f64_safe, parse_u32_safe};
use csv::{ReaderBuilder, Trim};
use serde::Serialize;
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

/// Label given to rows with no `property_type`.
pub const UNSPECIFIED_TYPE: &str = "Unspecified";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanReport {
    pub total_rows: usize,
    pub kept_rows: usize,
    /// `city`, `price` or `size_sqft` was blank.
    pub missing_required: usize,
    /// A value was present but unparsable, negative, or a non-positive price.
    /// Rows the CSV reader itself rejected are counted here too.
    pub invalid_values: usize,
    pub duplicates: usize,
}

impl CleanReport {
    pub fn dropped_rows(&self) -> usize {
        self.total_rows - self.kept_rows
    }
}

/// Why a single row was excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Malformed {
    MissingRequired,
    InvalidValue,
}

/// Check the header row against [`REQUIRED_COLUMNS`]. Extra columns and any
/// column order are accepted.
pub fn validate_headers(headers: &csv::StringRecord) -> Result<()> {
    let present: HashSet<&str> = headers.iter().map(str::trim).collect();
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !present.contains(**c))
        .map(|c| c.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(DashboardError::Schema { missing })
    }
}

/// Read raw rows from any reader. Rows the CSV layer cannot decode are
/// returned as a count rather than an error.
pub fn read_raw<R: Read>(reader: R) -> Result<(Vec<RawRow>, usize)> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::Headers)
        .from_reader(reader);
    validate_headers(rdr.headers()?)?;

    let mut rows = Vec::new();
    let mut unreadable = 0usize;
    for result in rdr.deserialize::<RawRow>() {
        match result {
            Ok(r) => rows.push(r),
            Err(e) => {
                debug!(error = %e, "skipping unreadable row");
                unreadable += 1;
            }
        }
    }
    Ok((rows, unreadable))
}

fn clean_row(row: &RawRow) -> std::result::Result<PropertyRecord, Malformed> {
    let city = non_blank(row.city.as_deref()).ok_or(Malformed::MissingRequired)?;
    let price_raw = non_blank(row.price.as_deref()).ok_or(Malformed::MissingRequired)?;
    let size_raw = non_blank(row.size_sqft.as_deref()).ok_or(Malformed::MissingRequired)?;

    let price = match parse_f64_safe(Some(price_raw)) {
        Some(v) if v > 0.0 => v,
        _ => return Err(Malformed::InvalidValue),
    };
    // A zero size is kept here; the feature stage excludes it.
    let size_sqft = match parse_f64_safe(Some(size_raw)) {
        Some(v) if v >= 0.0 => v + 0.0,
        _ => return Err(Malformed::InvalidValue),
    };

    let bhk = optional_u32(row.bhk.as_deref())?;
    let amenities_count = optional_u32(row.amenities_count.as_deref())?;
    let age_years = match non_blank(row.age_years.as_deref()) {
        None => 0.0,
        Some(s) => match parse_f64_safe(Some(s)) {
            Some(v) if v >= 0.0 => v + 0.0,
            _ => return Err(Malformed::InvalidValue),
        },
    };

    let property_type = non_blank(row.property_type.as_deref())
        .map(normalize_label)
        .unwrap_or_else(|| UNSPECIFIED_TYPE.to_string());

    Ok(PropertyRecord {
        city: normalize_label(city),
        property_type,
        bhk,
        size_sqft,
        price,
        age_years,
        amenities_count,
    })
}

/// Blank means 0; anything else must parse as a non-negative integer.
fn optional_u32(s: Option<&str>) -> std::result::Result<u32, Malformed> {
    match non_blank(s) {
        None => Ok(0),
        Some(v) => parse_u32_safe(Some(v)).ok_or(Malformed::InvalidValue),
    }
}

type DedupKey = (String, String, u32, u64, u64, u64, u32);

fn dedup_key(r: &PropertyRecord) -> DedupKey {
    (
        r.city.clone(),
        r.property_type.clone(),
        r.bhk,
        r.size_sqft.to_bits(),
        r.price.to_bits(),
        r.age_years.to_bits(),
        r.amenities_count,
    )
}

/// The Cleaner: normalize, drop malformed rows, drop exact duplicates
/// (compared after normalization), keeping first occurrences in order.
pub fn clean(rows: &[RawRow]) -> (Vec<PropertyRecord>, CleanReport) {
    let mut report = CleanReport {
        total_rows: rows.len(),
        ..CleanReport::default()
    };
    let mut seen: HashSet<DedupKey> = HashSet::with_capacity(rows.len());
    let mut out = Vec::with_capacity(rows.len());

    for row in rows {
        match clean_row(row) {
            Ok(rec) => {
                if seen.insert(dedup_key(&rec)) {
                    out.push(rec);
                } else {
                    report.duplicates += 1;
                }
            }
            Err(Malformed::MissingRequired) => report.missing_required += 1,
            Err(Malformed::InvalidValue) => report.invalid_values += 1,
        }
    }
    report.kept_rows = out.len();
    (out, report)
}

pub fn load_and_clean_from<R: Read>(reader: R) -> Result<(Vec<PropertyRecord>, CleanReport)> {
    let (rows, unreadable) = read_raw(reader)?;
    let (records, mut report) = clean(&rows);
    report.total_rows += unreadable;
    report.invalid_values += unreadable;
    if report.dropped_rows() > 0 {
        warn!(
            dropped = report.dropped_rows(),
            missing = report.missing_required,
            invalid = report.invalid_values,
            duplicates = report.duplicates,
            "rows excluded during cleaning"
        );
    }
    Ok((records, report))
}

pub fn load_and_clean(path: impl AsRef<Path>) -> Result<(Vec<PropertyRecord>, CleanReport)> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let (records, report) = load_and_clean_from(file)?;
    info!(path = %path.display(), rows = report.total_rows, kept = report.kept_rows, "dataset loaded");
    Ok((records, report))
}
