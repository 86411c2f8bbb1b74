use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context};
use chrono::NaiveDate;

/// One sheet row as a loose header-to-cell mapping. Empty cells are kept as
/// explicit `None` entries rather than being dropped.
#[derive(Debug, Clone)]
pub struct SheetRow {
    cells: HashMap<String, Option<String>>,
}

impl SheetRow {
    pub fn text(&self, key: &str) -> Option<String> {
        self.cells.get(key).and_then(|cell| cell.clone())
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        coerce(self.text(key).as_deref())
    }

    pub fn integer(&self, key: &str) -> Option<i32> {
        self.number(key).map(|v| v.round() as i32)
    }

    pub fn date(&self, key: &str) -> Option<NaiveDate> {
        self.text(key)
            .and_then(|v| NaiveDate::parse_from_str(&v, "%Y-%m-%d").ok())
    }

    #[cfg(test)]
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        let cells = pairs
            .iter()
            .map(|(key, value)| {
                let cell = (!value.trim().is_empty()).then(|| value.trim().to_string());
                (key.to_string(), cell)
            })
            .collect();
        SheetRow { cells }
    }
}

/// Coerce a raw cell into a finite number. Anything non-numeric or
/// non-finite maps to `None`; callers substitute their own fallback.
pub fn coerce(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Load a named dataset (`<name>.csv` in the data directory) into an ordered
/// sequence of loose rows. A missing file or a headerless sheet is fatal;
/// ingestion cannot proceed with partial sources.
pub fn read_dataset(dir: &Path, name: &str) -> anyhow::Result<Vec<SheetRow>> {
    let path = dir.join(format!("{name}.csv"));
    let mut reader = csv::Reader::from_path(&path)
        .with_context(|| format!("tabular source {} is missing", path.display()))?;

    let headers: Vec<String> = reader
        .headers()
        .with_context(|| format!("tabular source {} is unreadable", path.display()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        bail!("tabular source {} has no readable sheet", path.display());
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record =
            record.with_context(|| format!("tabular source {} is unreadable", path.display()))?;
        let cells = headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                let cell = record
                    .get(i)
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(String::from);
                (header.clone(), cell)
            })
            .collect();
        rows.push(SheetRow { cells });
    }

    Ok(rows)
}
