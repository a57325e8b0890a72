pub mod walk;

pub use walk::{CandidateWalker, IMAGE_EXTENSION};
