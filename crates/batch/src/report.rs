//! Batch results as a plain-text log and a nested YAML mapping.

use std::{
    fmt::Write as _,
    fs::{self, OpenOptions},
    io::Write as _,
    path::Path,
    time::Duration,
};

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::BatchError;

/// The outcome of checking one property on one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub model_key: String,
    pub model_name: String,
    pub property_key: String,
    pub property_name: String,
    pub flag: Option<bool>,
    pub duration_seconds: f64,
    pub message: String,
}

/// The entry stored under `model key → property key` in the mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingEntry {
    pub property_name: String,
    pub flag: Option<bool>,
    pub message: String,
    pub duration_seconds: f64,
}

/// All records of one batch run.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    started: Timestamp,
    records: Vec<Record>,
    elapsed: Duration,
}

impl Report {
    #[must_use]
    pub fn new(started: Timestamp, records: Vec<Record>, elapsed: Duration) -> Self {
        Self {
            started,
            records,
            elapsed,
        }
    }

    #[must_use]
    pub fn started(&self) -> Timestamp {
        self.started
    }

    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Wall-clock time of the whole run.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// The line-oriented report.
    ///
    /// ```text
    /// Results (2026-01-01T00:00:00Z)
    /// pendulum, Damped pendulum, I7178, true, 0.012, local strong access
    ///
    /// total time: 0.01 minutes
    /// ```
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut text = format!("Results ({})\n", self.started);
        for r in &self.records {
            let flag = r.flag.map_or_else(|| "null".to_owned(), |f| f.to_string());
            let _ = writeln!(
                text,
                "{}, {}, {}, {}, {:.3}, {}",
                r.model_key, r.model_name, r.property_key, flag, r.duration_seconds, r.message
            );
        }
        let _ = writeln!(text, "\ntotal time: {:.2} minutes", self.elapsed.as_secs_f64() / 60.0);
        text
    }

    /// Appends [`Report::to_text`] to the log at `path`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::Io`] if the file cannot be opened or written.
    pub fn append_to_log(&self, path: &Path) -> Result<(), BatchError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| BatchError::io(path, e))?;
        writeln!(file, "{}", self.to_text()).map_err(|e| BatchError::io(path, e))
    }

    /// Records as `model key → property key → entry`.
    #[must_use]
    pub fn results_mapping(&self) -> Mapping {
        let mut mapping = Mapping::new();
        for r in &self.records {
            let entry = MappingEntry {
                property_name: r.property_name.clone(),
                flag: r.flag,
                message: r.message.clone(),
                duration_seconds: r.duration_seconds,
            };
            let model = mapping
                .entry(Value::from(r.model_key.clone()))
                .or_insert_with(|| Value::Mapping(Mapping::new()));
            if let Value::Mapping(properties) = model {
                properties.insert(
                    Value::from(r.property_key.clone()),
                    serde_yaml::to_value(entry).unwrap_or(Value::Null),
                );
            }
        }
        mapping
    }

    /// Merges [`Report::results_mapping`] into the YAML file at `path`.
    ///
    /// Existing keys outside this run's records are kept; entries for the
    /// same model and property are replaced.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or written, or if it
    /// exists but does not hold a YAML mapping.
    pub fn write_mapping(&self, path: &Path) -> Result<(), BatchError> {
        let mut merged = if path.exists() {
            let text = fs::read_to_string(path).map_err(|e| BatchError::io(path, e))?;
            match serde_yaml::from_str::<Value>(&text)? {
                Value::Mapping(existing) => existing,
                Value::Null => Mapping::new(),
                _ => return Err(BatchError::NotAMapping(path.to_owned())),
            }
        } else {
            Mapping::new()
        };

        merge(&mut merged, self.results_mapping());

        let text = serde_yaml::to_string(&Value::Mapping(merged))?;
        fs::write(path, text).map_err(|e| BatchError::io(path, e))
    }
}

/// Merges `update` into `base`, recursing into mappings present in both.
fn merge(base: &mut Mapping, update: Mapping) {
    for (key, value) in update {
        match value {
            Value::Mapping(incoming) => match base.get_mut(&key) {
                Some(Value::Mapping(existing)) => merge(existing, incoming),
                _ => {
                    base.insert(key, Value::Mapping(incoming));
                }
            },
            value => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(model: &str, property: &str, flag: Option<bool>, message: &str) -> Record {
        Record {
            model_key: model.to_owned(),
            model_name: model.to_uppercase(),
            property_key: property.to_owned(),
            property_name: format!("property {property}"),
            flag,
            duration_seconds: 0.25,
            message: message.to_owned(),
        }
    }

    fn report(records: Vec<Record>) -> Report {
        Report::new(Timestamp::UNIX_EPOCH, records, Duration::from_secs(90))
    }

    #[test]
    fn text_report_lists_records_and_total_time() {
        let text = report(vec![
            record("pendulum", "I7178", Some(true), "local strong access"),
            record("lorenz", "I7178", None, "model has no input"),
        ])
        .to_text();

        let lines: Vec<_> = text.lines().collect();
        assert!(lines[0].starts_with("Results"));
        assert_eq!(lines[1], "pendulum, PENDULUM, I7178, true, 0.250, local strong access");
        assert_eq!(lines[2], "lorenz, LORENZ, I7178, null, 0.250, model has no input");
        assert_eq!(lines.last(), Some(&"total time: 1.50 minutes"));
    }

    #[test]
    fn mapping_nests_by_model_then_property() {
        let mapping = report(vec![
            record("pendulum", "I7178", Some(true), "a"),
            record("pendulum", "I5358", Some(false), "b"),
        ])
        .results_mapping();

        let pendulum = mapping.get("pendulum").and_then(Value::as_mapping).unwrap();
        assert_eq!(pendulum.len(), 2);
        let entry: MappingEntry = serde_yaml::from_value(pendulum["I5358"].clone()).unwrap();
        assert_eq!(entry.flag, Some(false));
        assert_eq!(entry.message, "b");
    }

    #[test]
    fn mapping_merges_into_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.yaml");
        fs::write(
            &path,
            "pendulum:\n  I7178:\n    flag: false\n  other: kept\nunrelated: 1\n",
        )
        .unwrap();

        report(vec![record("pendulum", "I7178", Some(true), "local strong access")])
            .write_mapping(&path)
            .unwrap();

        let merged: Value = serde_yaml::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(merged["pendulum"]["I7178"]["flag"], Value::Bool(true));
        assert_eq!(merged["pendulum"]["other"], Value::from("kept"));
        assert_eq!(merged["unrelated"], Value::from(1));
    }

    #[test]
    fn refuses_to_merge_into_a_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.yaml");
        fs::write(&path, "- a\n- b\n").unwrap();

        let result = report(Vec::new()).write_mapping(&path);

        assert!(matches!(result, Err(BatchError::NotAMapping(_))));
    }

    #[test]
    fn log_is_appended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");

        let r = report(vec![record("pendulum", "I7178", Some(true), "x")]);
        r.append_to_log(&path).unwrap();
        r.append_to_log(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.matches("total time:").count(), 2);
    }
}
