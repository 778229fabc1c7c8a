pub mod walker;
pub mod grid;
pub mod records;
pub mod machine_id;
pub mod db_writer;
pub mod router;
pub mod pipeline;

pub use walker::{LogFile, discover_log_files};
pub use grid::{CalamineGridReader, Grid, GridReader};
pub use records::{Breakdown, Summary, parse_breakdown, parse_summary};
pub use machine_id::resolve_parts_counter_no;
pub use db_writer::{LogStore, SqliteStore};
pub use router::{FileRouter, Outcome, dated_folder, move_file};
pub use pipeline::{BatchReport, Pipeline, StoredFile};
