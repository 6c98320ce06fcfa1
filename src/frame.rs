//! Output frame and sinks.
//!
//! A `TruckDayFrame` holds the 1440 rows of one truck-day in the fixed
//! 230-column schema: 5 metadata columns, 221 features in canonical order,
//! 4 labels. Column names, order and types change only via an explicit
//! schema version bump. The `FrameSink` trait is the seam any columnar
//! writer can plug into; the built-in CSV sink writes atomically
//! (temp file + rename) so partial files never exist.

use crate::error::{FleetError, Result, SchemaError};
use crate::features::{FEATURE_COLUMNS, FEATURE_COUNT};
use crate::labels::RowLabels;
use lazy_static::lazy_static;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Schema version of the output contract.
pub const SCHEMA_VERSION: u32 = 1;

/// Metadata column names, in order.
pub const METADATA_COLUMNS: [&str; 5] =
    ["timestamp", "truck_id", "engine_type", "day_index", "episode_id"];

/// Label column names, in order.
pub const LABEL_COLUMNS: [&str; 4] =
    ["fault_mode", "fault_severity", "rul_hours", "path_a_label"];

/// Total column count of the output schema.
pub const COLUMN_COUNT: usize = 230;

lazy_static! {
    /// The full ordered column list of the output schema.
    pub static ref ALL_COLUMNS: Vec<String> = {
        let mut cols: Vec<String> = METADATA_COLUMNS.iter().map(|s| s.to_string()).collect();
        cols.extend(FEATURE_COLUMNS.iter().cloned());
        cols.extend(LABEL_COLUMNS.iter().map(|s| s.to_string()));
        assert_eq!(cols.len(), COLUMN_COUNT, "output schema drifted from 230 columns");
        cols
    };
}

/// One output row.
#[derive(Debug, Clone)]
pub struct TruckDayRow {
    /// Window start, unix seconds.
    pub timestamp: i64,
    pub truck_id: i32,
    pub engine_type: &'static str,
    pub day_index: i32,
    pub episode_id: i32,
    /// The 221 features in canonical order.
    pub features: Vec<f64>,
    pub labels: RowLabels,
}

/// All rows of one truck-day.
#[derive(Debug, Clone)]
pub struct TruckDayFrame {
    pub truck_id: u32,
    pub day_index: u32,
    rows: Vec<TruckDayRow>,
}

impl TruckDayFrame {
    /// Create an empty frame.
    pub fn new(truck_id: u32, day_index: u32) -> Self {
        Self {
            truck_id,
            day_index,
            rows: Vec::new(),
        }
    }

    /// Append a row, enforcing the feature-length contract.
    pub fn push_row(&mut self, row: TruckDayRow) -> std::result::Result<(), SchemaError> {
        if row.features.len() != FEATURE_COUNT {
            return Err(SchemaError::FeatureCount {
                expected: FEATURE_COUNT,
                actual: row.features.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn rows(&self) -> &[TruckDayRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write the frame as CSV to `path`.
    pub fn to_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        let mut header = String::new();
        for (i, col) in ALL_COLUMNS.iter().enumerate() {
            if i > 0 {
                header.push(',');
            }
            header.push_str(col);
        }
        writeln!(writer, "{}", header)?;

        for row in &self.rows {
            write!(
                writer,
                "{},{},{},{},{}",
                row.timestamp, row.truck_id, row.engine_type, row.day_index, row.episode_id
            )?;
            for value in &row.features {
                write!(writer, ",{:.6}", value)?;
            }
            writeln!(
                writer,
                ",{},{},{:.1},{}",
                row.labels.fault_mode,
                row.labels.fault_severity,
                row.labels.rul_hours,
                row.labels.path_a_label.as_str()
            )?;
        }

        writer.flush()?;
        Ok(())
    }
}

/// Destination for generated frames. The work-unit scheduler only ever asks
/// whether a unit's output exists and writes completed frames.
pub trait FrameSink: Sync {
    /// Write a completed frame; must be atomic (no partial files).
    fn write(&self, frame: &TruckDayFrame) -> Result<PathBuf>;

    /// Whether the output for a work unit already exists.
    fn exists(&self, truck_id: u32, day_index: u32) -> bool;
}

/// CSV files under `root/truck_<id>/day_<d>.csv`, written atomically.
#[derive(Debug, Clone)]
pub struct CsvSink {
    root: PathBuf,
}

impl CsvSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Final path of a truck-day file.
    pub fn path_for(&self, truck_id: u32, day_index: u32) -> PathBuf {
        self.root
            .join(format!("truck_{:03}", truck_id))
            .join(format!("day_{:03}.csv", day_index))
    }
}

impl FrameSink for CsvSink {
    fn write(&self, frame: &TruckDayFrame) -> Result<PathBuf> {
        let path = self.path_for(frame.truck_id, frame.day_index);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("csv.tmp");

        // One retry on a transient write failure, then give up on the unit.
        if let Err(first) = frame.to_csv(&tmp) {
            let _ = fs::remove_file(&tmp);
            if let Err(second) = frame.to_csv(&tmp) {
                let _ = fs::remove_file(&tmp);
                tracing::warn!(?first, "frame write failed twice");
                return Err(second);
            }
        }
        fs::rename(&tmp, &path).map_err(FleetError::from)?;
        Ok(path)
    }

    fn exists(&self, truck_id: u32, day_index: u32) -> bool {
        self.path_for(truck_id, day_index).exists()
    }
}
