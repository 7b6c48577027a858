//! Pre-fetched bibliometric record served as a source
//!
//! The scholar profile has no public API; a record exported elsewhere is
//! loaded from JSON and served as-is for any person.

use super::BibliometricSource;
use crate::types::{BibliometricRecord, FetchOutcome, PersonIdentity, SourceName};
use async_trait::async_trait;
use rtwin_common::Result;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone)]
pub struct SnapshotBibliometrics {
    source: SourceName,
    record: BibliometricRecord,
}

impl SnapshotBibliometrics {
    pub fn new(source: SourceName, mut record: BibliometricRecord) -> Self {
        if !record.sources.contains(&source) {
            record.sources.push(source);
        }
        Self { source, record }
    }

    pub fn from_file(source: SourceName, path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let record: BibliometricRecord = serde_json::from_str(&content)?;
        info!(
            path = %path.display(),
            papers = record.top_papers.len(),
            "Loaded {} snapshot", source
        );
        Ok(Self::new(source, record))
    }
}

#[async_trait]
impl BibliometricSource for SnapshotBibliometrics {
    fn source(&self) -> SourceName {
        self.source
    }

    async fn bibliometrics(&self, _person: &PersonIdentity) -> FetchOutcome<BibliometricRecord> {
        FetchOutcome::Fetched(self.record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_snapshot_from_file_tags_source() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"name": "M. Frasch", "citation_count": 1200, "h_index": 20, "i10_index": 35}}"#
        )
        .unwrap();

        let snapshot = SnapshotBibliometrics::from_file(SourceName::GoogleScholar, file.path()).unwrap();
        let record = snapshot
            .bibliometrics(&PersonIdentity::new("Martin Frasch"))
            .await
            .fetched()
            .unwrap();

        assert_eq!(record.i10_index, 35);
        assert_eq!(record.sources, vec![SourceName::GoogleScholar]);
    }

    #[test]
    fn test_snapshot_malformed_file_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(SnapshotBibliometrics::from_file(SourceName::GoogleScholar, file.path()).is_err());
    }
}
