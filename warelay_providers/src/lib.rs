pub mod gemini;
pub mod keypool;
pub mod retry;

pub use gemini::{GeminiProvider, GenerationConfig};
pub use keypool::KeyPool;
pub use retry::{RetryPolicy, retry_transient};
