pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;

pub const DEFAULT_COLLECTION: &str = "course_texts";

pub const DEFAULT_EMBEDDING_MODEL: &str = "intfloat/multilingual-e5-large";
pub const DEFAULT_EMBEDDING_BATCH_SIZE: usize = 10;

pub const DEFAULT_LLM_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_LLM_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_LLM_TEMPERATURE: f64 = 0.1;
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";

pub const DEFAULT_SIMILARITY_TOP_K: usize = 7;
pub const DEFAULT_MAX_CONTEXT_CHARS: usize = 12_000;

pub const DEFAULT_INPUT_FILE: &str = "courses.csv";

pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are a RAG assistant that analyses the university's courses. \
Your only task and expertise is answering the user's questions using solely the course contents \
and metadata provided to you. If the user asks something unrelated to the course contents \
(for example 'how are you', 'what is the weather', 'tell me a joke'), reply with: \
'I can only help with the university's courses and their contents. Please ask questions about the courses.'";

pub fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost".to_string(),
        "http://localhost:3000".to_string(),
        "http://localhost:5173".to_string(),
        "http://localhost:8000".to_string(),
        "http://127.0.0.1".to_string(),
        "http://127.0.0.1:3000".to_string(),
        "http://127.0.0.1:5173".to_string(),
        "http://127.0.0.1:8000".to_string(),
    ]
}
