use anyhow::{Context, Result, bail};
use std::path::Path;

use super::types::{Comparator, Measurement};
use crate::config::types::NodeSpec;

/// In-memory shard for one node. Loads every CSV file under the date
/// directories that fall inside the node's bounds, in lexicographic
/// directory/file order, so load order is stable across restarts.
pub struct DataStore {
    node_id: String,
    records: Vec<Measurement>,
    files_loaded: usize,
}

impl DataStore {
    /// Loads the shard declared by `spec.date_bounds`. Callers must only
    /// construct a store for nodes that own data; the configuration loader
    /// guarantees the bounds lie inside the team's range.
    pub fn load(spec: &NodeSpec, dataset_root: &Path) -> Result<Self> {
        let [lower, upper] = spec
            .date_bounds
            .clone()
            .with_context(|| format!("process '{}' owns no shard", spec.id))?;

        if !dataset_root.exists() {
            bail!("dataset root missing: {}", dataset_root.display());
        }

        let mut store = Self {
            node_id: spec.id.to_string(),
            records: Vec::new(),
            files_loaded: 0,
        };

        let mut date_dirs: Vec<_> = std::fs::read_dir(dataset_root)
            .with_context(|| format!("cannot list dataset root {}", dataset_root.display()))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .collect();
        date_dirs.sort_by_key(|entry| entry.file_name());

        for dir in date_dirs {
            let date = dir.file_name().to_string_lossy().into_owned();
            if date.as_str() < lower.as_str() || date.as_str() > upper.as_str() {
                continue;
            }
            store.load_date_dir(&dir.path(), &date);
        }

        tracing::info!(
            "[DataStore] {} loaded {} rows from {} files",
            store.node_id,
            store.records.len(),
            store.files_loaded
        );
        Ok(store)
    }

    fn load_date_dir(&mut self, dir: &Path, date: &str) {
        let mut files: Vec<_> = match std::fs::read_dir(dir) {
            Ok(entries) => entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| path.extension().is_some_and(|ext| ext == "csv"))
                .collect(),
            Err(e) => {
                tracing::warn!("[DataStore] cannot list {}: {}", dir.display(), e);
                return;
            }
        };
        files.sort();

        for file in files {
            match std::fs::read_to_string(&file) {
                Ok(content) => {
                    for line in content.lines() {
                        if let Some(record) = parse_row(line, date) {
                            self.records.push(record);
                        }
                    }
                    self.files_loaded += 1;
                }
                Err(e) => {
                    // A bad file degrades the shard, it never aborts startup.
                    tracing::warn!("[DataStore] failed to load {}: {}", file.display(), e);
                }
            }
        }
    }

    pub fn records_loaded(&self) -> usize {
        self.records.len()
    }

    pub fn files_loaded(&self) -> usize {
        self.files_loaded
    }

    /// Single linear pass: rows whose `parameter` equals `field` (ASCII
    /// case-insensitive) and whose `value` satisfies the comparator, first
    /// `limit` matches in load order.
    pub fn scan(
        &self,
        field: &str,
        comparator: Comparator,
        threshold: f64,
        limit: usize,
    ) -> Vec<Measurement> {
        if limit == 0 {
            return Vec::new();
        }
        let mut matches = Vec::new();
        for record in &self.records {
            if record.parameter.eq_ignore_ascii_case(field)
                && comparator.matches(record.value, threshold)
            {
                matches.push(record.clone());
                if matches.len() >= limit {
                    break;
                }
            }
        }
        matches
    }

    /// Test-only constructor with pre-built rows.
    #[cfg(test)]
    pub fn with_records(node_id: &str, records: Vec<Measurement>) -> Self {
        Self {
            node_id: node_id.to_string(),
            files_loaded: 0,
            records,
        }
    }
}

/// Parses one CSV line in the dataset's column order:
/// latitude, longitude, timestamp, parameter, value, unit, _, aqi, _, site.
/// Header lines and malformed rows yield `None` and are skipped.
fn parse_row(line: &str, date: &str) -> Option<Measurement> {
    let fields = split_csv_line(line);
    if fields.is_empty() {
        return None;
    }
    if fields[0].eq_ignore_ascii_case("latitude") {
        return None;
    }
    if fields.len() < 6 {
        return None;
    }

    let value = if fields[4].is_empty() {
        0.0
    } else {
        fields[4].parse().ok()?
    };

    Some(Measurement {
        latitude: fields[0].parse().ok()?,
        longitude: fields[1].parse().ok()?,
        timestamp: fields[2].clone(),
        parameter: fields[3].clone(),
        value,
        unit: fields[5].clone(),
        aqi: fields
            .get(7)
            .filter(|f| !f.is_empty())
            .and_then(|f| f.parse().ok())
            .unwrap_or(0),
        site_name: fields.get(9).cloned().unwrap_or_default(),
        date: date.to_string(),
    })
}

/// Minimal CSV field splitter: commas separate fields, double quotes group a
/// field (site names contain commas). Quotes are stripped from the output.
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    if !current.is_empty() || !fields.is_empty() {
        fields.push(current);
    }
    fields
}
