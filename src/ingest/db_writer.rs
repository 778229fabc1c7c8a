use rusqlite::named_params;
use crate::error::{Result, IngestError};
use crate::db::Db;
use super::records::{Breakdown, Summary};

/// Write side of the production-log store
pub trait LogStore {
    /// Insert one summary row and return its generated id
    fn save_summary(&self, summary: &Summary) -> Result<i64>;

    /// Insert every breakdown row under `summary_id`
    fn save_breakdowns(&self, breakdowns: &[Breakdown], summary_id: i64) -> Result<usize>;
}

/// SQLite-backed [`LogStore`]; one connection per call
pub struct SqliteStore {
    db: Db,
}

impl SqliteStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Db {
        &self.db
    }
}

impl LogStore for SqliteStore {
    fn save_summary(&self, summary: &Summary) -> Result<i64> {
        self.db.with_connection(|conn| {
            conn.execute(
                r#"
                INSERT INTO summary_logs (
                    log_datetime, log_order_no, log_item_code, log_batch_no,
                    log_sublot_no, log_blocks_count, log_actual_count, log_ng_mark,
                    log_unacc, log_reason, log_high_unacc_reason, log_part_counter_no
                ) VALUES (
                    :p_log_datetime, :p_log_order_no, :p_log_item_code, :p_log_batch_no,
                    :p_log_sublot_no, :p_log_blocks_count, :p_log_actual_count, :p_log_ng_mark,
                    :p_log_unacc, :p_log_reason, :p_log_high_unacc_reason, :p_log_part_counter_no
                )
                "#,
                named_params! {
                    ":p_log_datetime": summary.log_datetime,
                    // the summary table never stores an empty order number
                    ":p_log_order_no": if summary.order_no.is_empty() { " " } else { summary.order_no.as_str() },
                    ":p_log_item_code": summary.item_code,
                    ":p_log_batch_no": summary.batch_no,
                    ":p_log_sublot_no": summary.sublot_no,
                    ":p_log_blocks_count": summary.blocks_count,
                    ":p_log_actual_count": summary.actual_count,
                    ":p_log_ng_mark": summary.ng_mark,
                    ":p_log_unacc": summary.unacc,
                    ":p_log_reason": summary.reason,
                    ":p_log_high_unacc_reason": summary.high_unacc_reason,
                    ":p_log_part_counter_no": summary.parts_counter_no,
                },
            )?;

            Ok::<i64, IngestError>(conn.last_insert_rowid())
        })
    }

    /// Rows are inserted one statement at a time outside a transaction, so
    /// rows written before a failing insert remain stored.
    fn save_breakdowns(&self, breakdowns: &[Breakdown], summary_id: i64) -> Result<usize> {
        if breakdowns.is_empty() {
            return Ok(0);
        }

        self.db.with_connection(|conn| {
            let mut stmt = conn.prepare(
                r#"
                INSERT INTO breakdown_logs (
                    log_datetime, log_order_no, log_item_code, log_batch_no,
                    log_sublot_no, log_pallet_no, log_actual_count, log_op_number,
                    log_parts_counter_no, summary_id
                ) VALUES (
                    :p_log_datetime, :p_log_order_no, :p_log_item_code, :p_log_batch_no,
                    :p_log_sublot_no, :p_log_pallet_no, :p_log_actual_count, :p_log_op_number,
                    :p_log_parts_counter_no, :p_summaryID
                )
                "#
            )?;

            let mut count = 0;
            for breakdown in breakdowns {
                stmt.execute(named_params! {
                    ":p_log_datetime": breakdown.log_datetime,
                    ":p_log_order_no": breakdown.order_no,
                    ":p_log_item_code": breakdown.item_code,
                    ":p_log_batch_no": breakdown.batch_no,
                    ":p_log_sublot_no": breakdown.sublot_no,
                    ":p_log_pallet_no": breakdown.pallet_no,
                    ":p_log_actual_count": breakdown.actual_count,
                    ":p_log_op_number": breakdown.op_number,
                    ":p_log_parts_counter_no": breakdown.parts_counter_no,
                    ":p_summaryID": summary_id,
                })?;
                count += 1;
            }

            Ok::<usize, IngestError>(count)
        })
    }
}
