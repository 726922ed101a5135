//! Append-only log of parameter generations.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use circuit_cipher_core::{CipherParameters, CircuitSummary};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRecord {
    /// Seconds since the Unix epoch.
    pub timestamp: u64,
    pub cards_count: usize,
    pub complexity: usize,
    pub parameters_fingerprint: String,
    pub matrix_size: usize,
    pub key_rounds: usize,
    pub permutation_rounds: usize,
}

impl GenerationRecord {
    pub fn new(summary: &CircuitSummary, params: &CipherParameters) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default();
        Self {
            timestamp,
            cards_count: summary.num_cards,
            complexity: summary.complexity_score,
            parameters_fingerprint: params.fingerprint(),
            matrix_size: params.matrix_size(),
            key_rounds: params.key_rounds(),
            permutation_rounds: params.permutation_rounds(),
        }
    }
}

pub trait GenerationLog {
    fn append(&mut self, record: &GenerationRecord) -> Result<()>;
    fn records(&self) -> Result<Vec<GenerationRecord>>;
}

/// One JSON object per line, oldest first.
pub struct JsonlHistory {
    path: PathBuf,
}

impl JsonlHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl GenerationLog for JsonlHistory {
    fn append(&mut self, record: &GenerationRecord) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening history {}", self.path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    fn records(&self) -> Result<Vec<GenerationRecord>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(err).with_context(|| format!("opening history {}", self.path.display()));
            }
        };
        let mut records = Vec::new();
        for (number, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(line.trim()).with_context(|| {
                format!("parsing {} line {}", self.path.display(), number + 1)
            })?;
            records.push(record);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use circuit_cipher_core::{CardPreset, analyze_circuit, derive_parameters, stack_from_presets};
    use tempfile::tempdir;

    fn record_for(presets: &[CardPreset]) -> GenerationRecord {
        let doc = stack_from_presets(presets);
        let analysis = analyze_circuit(&doc);
        let params = derive_parameters(&analysis);
        GenerationRecord::new(&analysis.summary, &params)
    }

    #[test]
    fn missing_file_is_empty_history() {
        let dir = tempdir().unwrap();
        let history = JsonlHistory::new(dir.path().join("none.jsonl"));
        assert!(history.records().unwrap().is_empty());
    }

    #[test]
    fn appends_in_order() {
        let dir = tempdir().unwrap();
        let mut history = JsonlHistory::new(dir.path().join("nested").join("history.jsonl"));
        let first = record_for(&[CardPreset::AndGate]);
        let second = record_for(&CardPreset::ALL);
        history.append(&first).unwrap();
        history.append(&second).unwrap();

        let records = history.records().unwrap();
        assert_eq!(records, vec![first.clone(), second.clone()]);
        assert_eq!(records[1].cards_count, 4);
        assert_eq!(records[1].key_rounds, 6);
        assert_ne!(first.parameters_fingerprint, second.parameters_fingerprint);

        let raw = std::fs::read_to_string(history.path()).unwrap();
        assert_eq!(raw.lines().count(), 2);
    }

    #[test]
    fn corrupt_line_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.jsonl");
        std::fs::write(&path, "{\"timestamp\": 1}\n").unwrap();
        let err = JsonlHistory::new(&path).records().unwrap_err();
        assert!(format!("{err:#}").contains("line 1"));
    }
}
