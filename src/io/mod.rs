//! Export of estimation results

pub mod results;

pub use results::{save_results, to_json_string};
