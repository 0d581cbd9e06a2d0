use crate::types::{EstimationResult, SarResult};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Pretty-printed JSON form of a result
pub fn to_json_string(result: &EstimationResult) -> SarResult<String> {
    Ok(serde_json::to_string_pretty(result)?)
}

/// Write `result` as pretty JSON to `path`, replacing any existing file.
pub fn save_results<P: AsRef<Path>>(result: &EstimationResult, path: P) -> SarResult<()> {
    let path = path.as_ref();
    log::info!("Saving {} ship results to {}", result.ships.len(), path.display());

    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, result)?;
    writer.flush()?;
    Ok(())
}
