use std::path::Path;
use crate::error::{IngestError, Result};

const XLSX_SUFFIX: &str = ".xlsx";

/// Derive the parts-counter (machine) number from a log file name.
///
/// The number is the digits found between the first underscore and the
/// `.xlsx` extension (matched case-insensitively):
///
/// ```text
/// "run_12.xlsx"      → 12
/// "batch_007.XLSX"   → 7
/// "line_pc-3a.xlsx"  → 3
/// "batch.xlsx"       → error (no underscore)
/// "batch_abc.xlsx"   → error (no digits)
/// ```
///
/// Any directory part of `file_name` is ignored. A digit run too long for
/// an `i32` is reported as an error rather than truncated.
pub fn resolve_parts_counter_no(file_name: &str) -> Result<i32> {
    let name = Path::new(file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(file_name);

    let invalid = || {
        IngestError::Resolver(format!(
            "PartsCounterNo is missing or invalid in file name: {}",
            name
        ))
    };

    let underscore = name.find('_').ok_or_else(invalid)?;
    // ASCII lowercasing keeps byte offsets aligned with `name`
    let extension = name
        .to_ascii_lowercase()
        .rfind(XLSX_SUFFIX)
        .ok_or_else(invalid)?;
    if underscore >= extension {
        return Err(invalid());
    }

    let digits: String = name[underscore + 1..extension]
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        return Err(invalid());
    }

    digits.parse::<i32>().map_err(|e| {
        IngestError::Resolver(format!(
            "PartsCounterNo '{}' in file name {} does not fit: {}",
            digits, name, e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_basic() {
        assert_eq!(resolve_parts_counter_no("batch_007.xlsx").unwrap(), 7);
        assert_eq!(resolve_parts_counter_no("batch_1.xlsx").unwrap(), 1);
        assert_eq!(resolve_parts_counter_no("run_12.xlsx").unwrap(), 12);
    }

    #[test]
    fn test_resolve_extension_case_insensitive() {
        assert_eq!(resolve_parts_counter_no("RUN_5.XLSX").unwrap(), 5);
    }

    #[test]
    fn test_resolve_strips_non_digits() {
        assert_eq!(resolve_parts_counter_no("line_pc-3a.xlsx").unwrap(), 3);
        // first underscore wins, digits after later underscores still count
        assert_eq!(resolve_parts_counter_no("line_a_12.xlsx").unwrap(), 12);
    }

    #[test]
    fn test_resolve_ignores_directories() {
        assert_eq!(resolve_parts_counter_no("/data/in_box/run_4.xlsx").unwrap(), 4);
    }

    #[test]
    fn test_resolve_failures() {
        assert!(matches!(
            resolve_parts_counter_no("batch.xlsx"),
            Err(IngestError::Resolver(_))
        ));
        assert!(matches!(
            resolve_parts_counter_no("batch_abc.xlsx"),
            Err(IngestError::Resolver(_))
        ));
        assert!(resolve_parts_counter_no("batch_12.csv").is_err());
        assert!(resolve_parts_counter_no(".xlsx_12").is_err());
    }

    #[test]
    fn test_resolve_overflow_is_error() {
        let err = resolve_parts_counter_no("run_99999999999.xlsx").unwrap_err();
        assert!(matches!(err, IngestError::Resolver(_)));
        assert!(err.to_string().contains("does not fit"));
    }
}
