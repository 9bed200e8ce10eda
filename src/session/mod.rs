pub mod flusher;

pub use flusher::{FlushOutcome, SessionFlusher};
