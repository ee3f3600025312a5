pub mod form;

pub use form::{apply_metric_edit, VitalsForm};
