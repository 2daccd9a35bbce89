use std::fs;
use std::path::Path;

use crate::core::config::ColumnSettings;
use crate::core::errors::ApiError;

use super::record::CourseRecord;

/// Reads the course catalogue CSV.
///
/// The file is decoded as UTF-8, falling back to Latin-1 for exports that
/// were saved with a legacy code page.
pub fn load_courses(path: &Path, columns: &ColumnSettings) -> Result<Vec<CourseRecord>, ApiError> {
    let bytes = fs::read(path).map_err(|e| {
        ApiError::NotFound(format!("Failed to read {}: {}", path.display(), e))
    })?;

    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => {
            tracing::warn!(
                "{} is not valid UTF-8 ({}); reading it as Latin-1",
                path.display(),
                err.utf8_error()
            );
            decode_latin1(err.as_bytes())
        }
    };

    parse_courses(&text, columns)
}

pub fn parse_courses(text: &str, columns: &ColumnSettings) -> Result<Vec<CourseRecord>, ApiError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| ApiError::BadRequest(format!("Malformed CSV header: {}", e)))?
        .clone();
    let column_index = |name: &str| {
        headers
            .iter()
            .position(|header| header.trim() == name)
            .ok_or_else(|| ApiError::BadRequest(format!("Missing column '{}' in input", name)))
    };

    let description_idx = column_index(&columns.description)?;
    let code_idx = column_index(&columns.course_code)?;
    let term_idx = column_index(&columns.term)?;
    let name_idx = column_index(&columns.course_name)?;

    let mut records = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let row_number = row + 1;
        let record = result.map_err(|e| {
            ApiError::BadRequest(format!("Malformed CSV at data row {}: {}", row_number, e))
        })?;
        let field = |idx: usize| record.get(idx).unwrap_or("");

        let description = field(description_idx);
        if description.trim().is_empty() {
            return Err(ApiError::BadRequest(format!(
                "Data row {} has an empty '{}' value",
                row_number, columns.description
            )));
        }

        records.push(CourseRecord {
            course_code: field(code_idx).trim().to_string(),
            term: field(term_idx).trim().to_string(),
            course_name: field(name_idx).trim().to_string(),
            description: description.to_string(),
        });
    }

    Ok(records)
}

/// Latin-1 maps every byte to the code point of the same value.
fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}
