use crate::models::{RecordError, ScheduleEntry};

pub const MIN_FREQUENCY: i32 = 1;
pub const MAX_FREQUENCY: i32 = 6;

/// Normalizes a medication schedule to exactly `frequency` rows.
///
/// Existing rows are reused positionally: raising the frequency pads with
/// empty rows at the end, lowering it drops the trailing rows. Clients may
/// submit more rows than the frequency allows while the form is in flight;
/// the extra rows are discarded here, on write.
pub fn build_schedule_rows(
    frequency: i32,
    existing: &[ScheduleEntry],
) -> Result<Vec<ScheduleEntry>, RecordError> {
    if !(MIN_FREQUENCY..=MAX_FREQUENCY).contains(&frequency) {
        return Err(RecordError::Validation(format!(
            "Frequency must be between {} and {} intakes per day",
            MIN_FREQUENCY, MAX_FREQUENCY
        )));
    }

    let mut rows: Vec<ScheduleEntry> = existing
        .iter()
        .take(frequency as usize)
        .cloned()
        .collect();
    rows.resize_with(frequency as usize, ScheduleEntry::default);

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MealRelation;
    use assert_matches::assert_matches;
    use chrono::NaiveTime;

    fn filled_entry(hour: u32) -> ScheduleEntry {
        ScheduleEntry {
            time: NaiveTime::from_hms_opt(hour, 0, 0),
            meal_relation: Some(MealRelation::WithBreakfast),
            quantity: Some("1 tablet".to_string()),
        }
    }

    #[test]
    fn test_returns_exactly_frequency_rows() {
        for frequency in MIN_FREQUENCY..=MAX_FREQUENCY {
            let rows = build_schedule_rows(frequency, &[]).unwrap();
            assert_eq!(rows.len(), frequency as usize);
            assert!(rows.iter().all(|row| row.is_empty()));
        }
    }

    #[test]
    fn test_raising_frequency_pads_with_empty_rows() {
        let existing = vec![filled_entry(8), filled_entry(20)];

        let rows = build_schedule_rows(4, &existing).unwrap();

        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0], existing[0]);
        assert_eq!(rows[1], existing[1]);
        assert!(rows[2].is_empty());
        assert!(rows[3].is_empty());
    }

    #[test]
    fn test_lowering_frequency_drops_trailing_rows() {
        let existing = vec![filled_entry(8), filled_entry(14), filled_entry(20)];

        let rows = build_schedule_rows(1, &existing).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0], existing[0]);
    }

    #[test]
    fn test_rederiving_is_idempotent() {
        let existing = vec![filled_entry(8), filled_entry(20)];

        let once = build_schedule_rows(3, &existing).unwrap();
        let twice = build_schedule_rows(3, &once).unwrap();

        assert_eq!(once, twice);
    }

    #[test]
    fn test_rejects_frequency_out_of_range() {
        assert_matches!(build_schedule_rows(0, &[]), Err(RecordError::Validation(_)));
        assert_matches!(build_schedule_rows(7, &[]), Err(RecordError::Validation(_)));
        assert_matches!(build_schedule_rows(-1, &[]), Err(RecordError::Validation(_)));
    }
}
