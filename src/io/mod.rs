//! Input files and result reports.

pub mod config;
pub mod report;

pub use config::{
    read_interaction, read_run_config, read_slater_det, read_yaml, validate_slater_det, write_yaml,
};
pub use report::{
    backup, calc_report, matrix_element_report, min_file_path, minimization_report, unix_time,
    write_text, ResultKind, MIN_DIR,
};
