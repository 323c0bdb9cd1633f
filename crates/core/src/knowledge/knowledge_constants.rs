/// File extensions accepted for upload, lowercase and without the dot.
pub const ALLOWED_EXTENSIONS: [&str; 5] = ["pdf", "docx", "doc", "txt", "md"];

/// Largest accepted upload, in bytes (10 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Chunk length in Unicode code points.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Default number of files ingested concurrently.
pub const DEFAULT_INGEST_WORKERS: usize = 4;

/// Default capacity of the ingestion queue.
pub const DEFAULT_INGEST_QUEUE_CAPACITY: usize = 256;
