//! Module for data validation logic.

use crate::data_models::LinkyMetrics;
use crate::errors::ValidationError;

/// Validates a completed frame.
///
/// Checks that every required code holds a non-empty value. Unknown codes and
/// optional tariff indices are never looked at.
pub fn validate_record(record: &LinkyMetrics) -> Result<(), ValidationError> {
    let codes = record.missing_required();
    if codes.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::MissingRequired { codes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_models::REQUIRED_CODES;

    fn complete_record() -> LinkyMetrics {
        let mut record = LinkyMetrics::new();
        for code in REQUIRED_CODES {
            record.set(code, "1");
        }
        record
    }

    #[test]
    fn complete_record_passes() {
        assert_eq!(validate_record(&complete_record()), Ok(()));
    }

    #[test]
    fn reports_every_missing_code_in_schema_order() {
        let mut record = complete_record();
        record.papp = None;
        record.isousc = None;
        assert_eq!(
            validate_record(&record),
            Err(ValidationError::MissingRequired {
                codes: vec!["ISOUSC", "PAPP"]
            })
        );
    }

    #[test]
    fn extras_do_not_satisfy_required_codes() {
        let mut record = LinkyMetrics::new();
        record.set("XYZCODE", "7");
        let Err(ValidationError::MissingRequired { codes }) = validate_record(&record) else {
            panic!("expected missing fields");
        };
        assert_eq!(codes.len(), REQUIRED_CODES.len());
    }
}
