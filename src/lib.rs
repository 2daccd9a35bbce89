pub mod core;
pub mod courses;
pub mod embedding;
pub mod llm;
pub mod rag;
pub mod server;
pub mod state;
