//! Course catalogue records and the CSV reader that produces them.

mod loader;
mod record;

pub use loader::{load_courses, parse_courses};
pub use record::{to_documents, CourseDocument, CourseRecord};
