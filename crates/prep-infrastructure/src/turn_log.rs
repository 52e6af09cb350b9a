//! Persisted turn log.
//!
//! One JSON record per completed turn, appended to a line-delimited file.
//! This is the durable trace of a practice session: the question asked,
//! the user's answer, and everything the coach produced for it.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use prep_core::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything produced by one completed turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRecord {
    pub job_role: String,
    pub difficulty: String,
    pub question: String,
    pub user_answer: String,
    pub model_feedback: String,
    pub mood_feedback: String,
    pub mood_explanation: String,
    /// Metric name → score (0 when unparseable).
    pub scores: BTreeMap<String, u8>,
    pub ideal_answer: String,
    pub improved_user_answer: String,
}

/// Append-only JSON Lines store for completed turns.
pub struct TurnLog {
    path: PathBuf,
}

impl TurnLog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Appends one turn record, creating the file (and parent directory)
    /// when missing.
    pub fn append(&self, record: &TurnRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    /// Reads all persisted turns, oldest first. Unparseable lines are
    /// skipped rather than failing the whole read.
    pub fn read_all(&self) -> Result<Vec<TurnRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)?;
        Ok(content
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect())
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_record() -> TurnRecord {
        TurnRecord {
            job_role: "Technical Project Manager".to_string(),
            difficulty: "Medium".to_string(),
            question: "Tell me about a conflict you resolved.".to_string(),
            user_answer: "I talked to both sides and found a compromise.".to_string(),
            model_feedback: "Concise, but add a measurable outcome.".to_string(),
            mood_feedback: "Supportive 👍".to_string(),
            mood_explanation: "The interviewer acknowledges the effort.".to_string(),
            scores: BTreeMap::from([
                ("Relevance".to_string(), 4),
                ("Clarity".to_string(), 5),
                ("Technical Accuracy".to_string(), 3),
                ("Depth".to_string(), 3),
                ("Communication".to_string(), 4),
            ]),
            ideal_answer: "In my last role...".to_string(),
            improved_user_answer: "When two leads disagreed...".to_string(),
        }
    }

    #[test]
    fn test_append_and_read_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let log = TurnLog::new(temp_dir.path().join("turns.jsonl"));

        log.append(&sample_record()).unwrap();
        log.append(&sample_record()).unwrap();

        let records = log.read_all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], sample_record());
    }

    #[test]
    fn test_read_missing_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let log = TurnLog::new(temp_dir.path().join("turns.jsonl"));
        assert!(log.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_garbage_lines_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("turns.jsonl");
        let log = TurnLog::new(&path);

        log.append(&sample_record()).unwrap();
        fs::write(
            &path,
            format!("{}not json\n", fs::read_to_string(&path).unwrap()),
        )
        .unwrap();

        assert_eq!(log.read_all().unwrap().len(), 1);
    }
}
