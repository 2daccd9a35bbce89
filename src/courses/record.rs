use std::collections::HashMap;

use serde_json::{json, Value};
use sha2::{Digest, Sha256};

/// One row of the course catalogue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseRecord {
    pub course_code: String,
    pub term: String,
    pub course_name: String,
    pub description: String,
}

/// Text plus metadata, the unit that gets embedded and stored.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseDocument {
    pub id: String,
    pub text: String,
    pub metadata: Value,
}

impl CourseRecord {
    pub fn to_document(&self) -> CourseDocument {
        CourseDocument {
            id: self.fingerprint(),
            text: self.description.clone(),
            metadata: json!({
                "course_code": self.course_code,
                "term": self.term,
                "course_name": self.course_name,
            }),
        }
    }

    /// Stable id over every field, so the same row always lands on the same id.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for part in [
            &self.course_code,
            &self.term,
            &self.course_name,
            &self.description,
        ] {
            hasher.update(part.as_bytes());
            hasher.update([0x1f]);
        }
        hex::encode(hasher.finalize())
    }
}

/// One document per record, in input order.
///
/// Identical rows share a fingerprint, so repeats get the occurrence number
/// appended (`<fingerprint>-1`, `-2`, ...). Every row keeps its own id and
/// re-reading the same file yields the same ids.
pub fn to_documents(records: &[CourseRecord]) -> Vec<CourseDocument> {
    let mut occurrences: HashMap<String, usize> = HashMap::new();
    records
        .iter()
        .map(|record| {
            let mut doc = record.to_document();
            let seen = occurrences.entry(doc.id.clone()).or_insert(0);
            if *seen > 0 {
                doc.id = format!("{}-{}", doc.id, seen);
            }
            *seen += 1;
            doc
        })
        .collect()
}
