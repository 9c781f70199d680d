use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use errp_core::TrialRecord;

use crate::session::SessionInfo;

/// Column order is fixed: downstream analysis scripts index by it.
pub const COLUMNS: [&str; 18] = [
    "subject_id",
    "session_date",
    "session_num",
    "block_num",
    "trial_num",
    "trial_type",
    "error_type",
    "target_position",
    "cursor_start",
    "cursor_end",
    "movement_direction",
    "trial_start_time",
    "target_onset_time",
    "movement_onset_time",
    "movement_end_time",
    "trial_end_time",
    "response_key",
    "response_time",
];

/// Receives the full ordered record list plus session metadata and persists
/// it. The orchestrator calls `flush` exactly once per session.
pub trait RecordSink {
    fn flush(&mut self, info: &SessionInfo, records: &[TrialRecord]) -> io::Result<()>;
}

/// Writes one CSV file under the output directory, named
/// `sub-<id>_date-<date>_preset-<preset>_task-observation_errp.csv`.
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(output_dir: impl AsRef<Path>, info: &SessionInfo) -> Self {
        let filename = format!(
            "sub-{}_date-{}_preset-{}_task-observation_errp.csv",
            info.subject_id, info.session_date, info.preset_key
        );
        Self {
            path: output_dir.as_ref().join(filename),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSink for CsvSink {
    fn flush(&mut self, _info: &SessionInfo, records: &[TrialRecord]) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = BufWriter::new(File::create(&self.path)?);

        writeln!(out, "{}", COLUMNS.join(","))?;
        for record in records {
            writeln!(out, "{}", format_row(record))?;
        }
        out.flush()?;

        info!(path = %self.path.display(), records = records.len(), "data saved");
        Ok(())
    }
}

fn format_row(record: &TrialRecord) -> String {
    let fields: [String; 18] = [
        record.subject_id.clone(),
        record.session_date.clone(),
        record.session_num.to_string(),
        record.block_num.to_string(),
        record.trial_num.to_string(),
        record.trial_type.as_str().to_string(),
        record.error_kind.as_str().to_string(),
        coordinate(record.target_x),
        coordinate(record.start_x),
        coordinate(record.end_x),
        record.direction.as_str().to_string(),
        timestamp(record.times.trial_start),
        timestamp(record.times.target_onset),
        timestamp(record.times.movement_onset),
        timestamp(record.times.movement_end),
        timestamp(record.times.trial_end),
        record.response_key.clone().unwrap_or_else(|| "none".into()),
        record
            .response_time
            .map(timestamp)
            .unwrap_or_default(),
    ];
    fields
        .iter()
        .map(|f| escape(f))
        .collect::<Vec<_>>()
        .join(",")
}

/// `(x, 0)` tuple form kept from the original output for downstream parsers.
fn coordinate(x: f32) -> String {
    format!("({x}, 0)")
}

fn timestamp(t: f64) -> String {
    format!("{t:.6}")
}

fn escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use errp_core::{Direction, ErrorKind, PhaseTimes, TrialType};
    use std::process;

    fn sample_record() -> TrialRecord {
        TrialRecord {
            subject_id: "S01".into(),
            session_date: "2026-01-01".into(),
            session_num: 1,
            block_num: 1,
            trial_num: 4,
            trial_type: TrialType::Error,
            error_kind: ErrorKind::Opposite,
            start_idx: 10,
            target_idx: 15,
            end_idx: 9,
            start_x: 0.0,
            target_x: 452.6,
            end_x: -90.5,
            direction: Direction::Left,
            times: PhaseTimes {
                trial_start: 1.0,
                target_onset: 2.5,
                movement_onset: 3.0,
                movement_end: 3.5,
                trial_end: 4.0,
            },
            response_key: None,
            response_time: None,
        }
    }

    #[test]
    fn header_matches_required_column_order() {
        assert_eq!(
            COLUMNS.join(","),
            "subject_id,session_date,session_num,block_num,trial_num,trial_type,\
             error_type,target_position,cursor_start,cursor_end,movement_direction,\
             trial_start_time,target_onset_time,movement_onset_time,movement_end_time,\
             trial_end_time,response_key,response_time"
        );
    }

    #[test]
    fn row_fields_and_quoting() {
        let row = format_row(&sample_record());
        assert!(row.starts_with("S01,2026-01-01,1,1,4,error,opposite,"));
        // Coordinate tuples contain a comma and must be quoted.
        assert!(row.contains("\"(452.6, 0)\""));
        assert!(row.contains("\"(-90.5, 0)\""));
        assert!(row.contains(",left,"));
        assert!(row.contains(",1.000000,2.500000,3.000000,3.500000,4.000000,none,"));
        assert!(row.ends_with("none,"));
    }

    #[test]
    fn writes_header_and_one_line_per_record() {
        let info = SessionInfo::test_info("debug");
        let dir = std::env::temp_dir().join(format!("errp-sink-test-{}", process::id()));
        let mut sink = CsvSink::new(&dir, &info);
        let records = vec![sample_record(), sample_record(), sample_record()];

        sink.flush(&info, &records).unwrap();

        let contents = std::fs::read_to_string(sink.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], COLUMNS.join(","));
        assert_eq!(
            sink.path().file_name().unwrap().to_str().unwrap(),
            "sub-S01_date-2026-01-01_preset-debug_task-observation_errp.csv"
        );

        std::fs::remove_dir_all(&dir).ok();
    }
}
