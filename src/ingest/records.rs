use chrono::NaiveDateTime;
use crate::error::{IngestError, Result};

/// Timestamp layout of column 0, e.g. `17102026 06:30:00`
pub const LOG_DATETIME_FORMAT: &str = "%d%m%Y %H:%M:%S";

/// Leading columns that must hold text in the summary row (datetime..NG mark)
const SUMMARY_REQUIRED: usize = 7;
/// Columns the summary row must at least reach (datetime..unacc)
const SUMMARY_MIN_COLUMNS: usize = 8;
/// Leading columns that must hold text in a breakdown row (datetime..actual)
const BREAKDOWN_REQUIRED: usize = 6;
/// Columns a breakdown row must at least reach (datetime..op number)
const BREAKDOWN_MIN_COLUMNS: usize = 7;

/// Per-file aggregate counts of one production run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub log_datetime: NaiveDateTime,
    /// Reserved; always empty
    pub order_no: String,
    pub item_code: String,
    pub batch_no: String,
    pub sublot_no: String,
    pub blocks_count: i32,
    pub actual_count: i32,
    pub ng_mark: i32,
    pub unacc: i32,
    pub reason: String,
    pub high_unacc_reason: String,
    pub parts_counter_no: i32,
}

/// Per-pallet counts belonging to a [`Summary`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breakdown {
    pub log_datetime: NaiveDateTime,
    /// Reserved; always empty
    pub order_no: String,
    pub item_code: String,
    pub batch_no: String,
    pub sublot_no: String,
    pub pallet_no: i32,
    pub actual_count: i32,
    pub op_number: String,
    pub parts_counter_no: i32,
    /// Id of the owning summary row; 0 until that row is stored
    pub summary_id: i64,
}

/// Build a [`Summary`] from the cells of sheet row 2.
///
/// Columns 0..=6 must be non-blank and column 7 must exist. Counts in
/// columns 4..=7 that do not parse as integers are stored as 0.
pub fn parse_summary(cells: &[String], parts_counter_no: i32) -> Result<Summary> {
    require_columns(cells, SUMMARY_REQUIRED, SUMMARY_MIN_COLUMNS)?;

    Ok(Summary {
        log_datetime: parse_log_datetime(&cells[0])?,
        order_no: String::new(),
        item_code: cells[1].clone(),
        batch_no: cells[2].clone(),
        sublot_no: cells[3].clone(),
        blocks_count: lenient_int(&cells[4]),
        actual_count: lenient_int(&cells[5]),
        ng_mark: lenient_int(&cells[6]),
        unacc: lenient_int(&cells[7]),
        reason: cells.get(8).cloned().unwrap_or_default(),
        high_unacc_reason: cells.get(9).cloned().unwrap_or_default(),
        parts_counter_no,
    })
}

/// Build a [`Breakdown`] from the cells of one sheet row at or below row 4.
///
/// Columns 0..=5 must be non-blank; the op number in column 6 must exist
/// but may be blank.
pub fn parse_breakdown(cells: &[String], parts_counter_no: i32) -> Result<Breakdown> {
    require_columns(cells, BREAKDOWN_REQUIRED, BREAKDOWN_MIN_COLUMNS)?;

    Ok(Breakdown {
        log_datetime: parse_log_datetime(&cells[0])?,
        order_no: String::new(),
        item_code: cells[1].clone(),
        batch_no: cells[2].clone(),
        sublot_no: cells[3].clone(),
        pallet_no: lenient_int(&cells[4]),
        actual_count: lenient_int(&cells[5]),
        op_number: cells[6].clone(),
        parts_counter_no,
        summary_id: 0,
    })
}

fn require_columns(cells: &[String], non_blank: usize, present: usize) -> Result<()> {
    for i in 0..non_blank {
        match cells.get(i) {
            Some(text) if !text.trim().is_empty() => {}
            _ => {
                return Err(IngestError::Validation(format!(
                    "Column index {} cannot be empty.",
                    i
                )))
            }
        }
    }
    if cells.len() < present {
        return Err(IngestError::Validation(format!(
            "Expected at least {} columns, found {}.",
            present,
            cells.len()
        )));
    }
    Ok(())
}

/// Strict `ddMMyyyy HH:mm:ss`: every field zero-padded, one space, no
/// surrounding whitespace.
pub fn parse_log_datetime(text: &str) -> Result<NaiveDateTime> {
    let invalid = |reason: String| {
        IngestError::Format(format!(
            "'{}' is not a valid ddMMyyyy HH:mm:ss timestamp: {}",
            text, reason
        ))
    };

    let parsed = NaiveDateTime::parse_from_str(text, LOG_DATETIME_FORMAT)
        .map_err(|e| invalid(e.to_string()))?;
    // round trip rejects short fields and stray whitespace
    if parsed.format(LOG_DATETIME_FORMAT).to_string() != text {
        return Err(invalid("fields must be exactly 2/2/4 2:2:2 digits".to_string()));
    }
    Ok(parsed)
}

/// Integer value of a count cell, or 0 when the text is not an integer.
fn lenient_int(text: &str) -> i32 {
    text.trim().parse::<i32>().unwrap_or(0)
}
