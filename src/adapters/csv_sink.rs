use crate::adapters::storage::LocalStorage;
use crate::domain::model::{Column, OutputRow};
use crate::domain::ports::{RowSink, Storage};
use crate::utils::error::{EtlError, Result};

/// Renders rows as CSV with a header of column labels and stores the file.
#[derive(Debug, Clone)]
pub struct CsvRowSink<S: Storage> {
    storage: S,
    file_name: String,
    location: String,
}

impl<S: Storage> CsvRowSink<S> {
    pub fn new(storage: S, file_name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            storage,
            file_name: file_name.into(),
            location: location.into(),
        }
    }
}

impl CsvRowSink<LocalStorage> {
    /// A sink writing `file_name` below the storage's base directory.
    pub fn local(storage: LocalStorage, file_name: impl Into<String>) -> Self {
        let file_name = file_name.into();
        let location = storage.resolve(&file_name).display().to_string();
        Self::new(storage, file_name, location)
    }
}

pub fn render_csv(columns: &[Column], rows: &[OutputRow]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record(columns.iter().map(|c| c.label))?;
    for row in rows {
        // 每一列都補齊到欄位數
        writer.write_record((0..columns.len()).map(|i| row.cell(i)))?;
    }

    writer.into_inner().map_err(|e| EtlError::ProcessingError {
        message: format!("Failed to flush CSV buffer: {}", e),
    })
}

impl<S: Storage> RowSink for CsvRowSink<S> {
    async fn write_rows(&self, columns: &[Column], rows: &[OutputRow]) -> Result<String> {
        let data = render_csv(columns, rows)?;
        tracing::debug!("Writing {} rows ({} bytes) as CSV", rows.len(), data.len());
        self.storage.write_file(&self.file_name, &data).await?;
        Ok(self.location.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const COLUMNS: &[Column] = &[
        Column { key: "name", label: "Name" },
        Column { key: "address", label: "Address" },
        Column { key: "in_liquidation", label: "InLiquidation" },
    ];

    #[test]
    fn test_render_quotes_and_pads() {
        let rows = vec![
            OutputRow {
                cells: vec![
                    "Reklame AS".to_string(),
                    "Storgata 1, 0155 OSLO".to_string(),
                    "False".to_string(),
                ],
            },
            OutputRow {
                cells: vec!["Kort".to_string()],
            },
        ];

        let csv = String::from_utf8(render_csv(COLUMNS, &rows).unwrap()).unwrap();
        assert_eq!(
            csv,
            "Name,Address,InLiquidation\nReklame AS,\"Storgata 1, 0155 OSLO\",False\nKort,,\n"
        );
    }

    #[tokio::test]
    async fn test_zero_rows_write_header_only() {
        let temp_dir = TempDir::new().unwrap();
        let sink = CsvRowSink::local(LocalStorage::new(temp_dir.path()), "73_11_selskaper.csv");

        let location = sink.write_rows(COLUMNS, &[]).await.unwrap();

        assert!(location.ends_with("73_11_selskaper.csv"));
        let written = std::fs::read_to_string(temp_dir.path().join("73_11_selskaper.csv")).unwrap();
        assert_eq!(written, "Name,Address,InLiquidation\n");
    }
}
