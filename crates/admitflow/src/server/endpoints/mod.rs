pub mod decisions;
pub mod progress;
