use serde::Serialize;

use crate::error::ExportError;

pub(crate) fn export_to_json_impl<T: Serialize>(
    rows: &[T],
    file: std::fs::File,
) -> Result<(), ExportError> {
    serde_json::to_writer_pretty(std::io::BufWriter::new(file), rows)?;
    Ok(())
}
