pub mod toml_loader;

pub use toml_loader::{
    load_attempt_scripts, load_author_scripts, load_grade_scripts, load_seed_file,
};
