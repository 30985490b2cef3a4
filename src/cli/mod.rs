pub mod commands;
pub mod ui;
pub mod util;

pub use ui::Output;
pub use util::{parse_batch_spec, read_rubric_file};
