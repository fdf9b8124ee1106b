pub mod rubric_loader;

pub use rubric_loader::{load_rubric, load_rubric_or_embedded};
