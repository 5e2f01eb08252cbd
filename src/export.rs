//! Download surface: one shared column projection rendered to CSV or XLSX
//! bytes. Both formats are fed the identical projected frame, so the only
//! difference between them is the container.

use polars::prelude::*;
use rust_xlsxwriter::Workbook;

use crate::error::DatakitError;
use crate::schema::tx;

/// Columns exposed to downloads, in display order.
pub const OPERATION_COLUMNS: [&str; 7] = [
    tx::IATI_IDENTIFIER,
    tx::TRANSACTION_DATE,
    tx::COUNTRY_NAME,
    tx::SOURCE,
    tx::SECTOR_CODE,
    tx::SECTOR_NAME,
    tx::VALUE_USD,
];

/// Project a frame down to the export columns, skipping any the frame lacks.
pub fn operation_view(df: &DataFrame) -> Result<DataFrame, DatakitError> {
    let present: Vec<&str> = OPERATION_COLUMNS
        .iter()
        .copied()
        .filter(|c| df.schema().contains(c))
        .collect();
    Ok(df.select(present)?)
}

pub fn to_csv_bytes(df: &DataFrame) -> Result<Vec<u8>, DatakitError> {
    let mut view = operation_view(df)?;
    let mut buffer: Vec<u8> = Vec::new();
    CsvWriter::new(&mut buffer).finish(&mut view)?;
    Ok(buffer)
}

pub fn to_xlsx_bytes(df: &DataFrame) -> Result<Vec<u8>, DatakitError> {
    let view = operation_view(df)?;
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (col, name) in view.get_column_names().iter().enumerate() {
        worksheet.write_string(0, col as u16, name.as_str())?;
    }
    for (col, column) in view.get_columns().iter().enumerate() {
        for row in 0..view.height() {
            let xl_row = (row + 1) as u32;
            match column.get(row)? {
                AnyValue::Null => {}
                AnyValue::Float64(v) => {
                    worksheet.write_number(xl_row, col as u16, v)?;
                }
                AnyValue::Int64(v) => {
                    worksheet.write_number(xl_row, col as u16, v as f64)?;
                }
                AnyValue::Int32(v) => {
                    worksheet.write_number(xl_row, col as u16, v as f64)?;
                }
                AnyValue::String(s) => {
                    worksheet.write_string(xl_row, col as u16, s)?;
                }
                AnyValue::StringOwned(s) => {
                    worksheet.write_string(xl_row, col as u16, s.as_str())?;
                }
                other => {
                    worksheet.write_string(xl_row, col as u16, format!("{other}"))?;
                }
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataFrame {
        let ids = vec!["XM-1".to_string(), "XM-2".to_string()];
        let dates = vec!["2021-03-05".to_string(), "2022-07-19".to_string()];
        let countries = vec!["Peru".to_string(), "Brazil".to_string()];
        let sources = vec!["IDB".to_string(), "CAF".to_string()];
        let codes = vec![Some(121i64), None];
        let sectors = vec!["Health".to_string(), "Rail transport".to_string()];
        DataFrame::new(vec![
            Column::new(tx::IATI_IDENTIFIER.into(), &ids),
            Column::new(tx::TRANSACTION_DATE.into(), &dates),
            Column::new(tx::COUNTRY_NAME.into(), &countries),
            Column::new(tx::SOURCE.into(), &sources),
            Column::new(tx::SECTOR_CODE.into(), &codes),
            Column::new(tx::SECTOR_NAME.into(), &sectors),
            Column::new(tx::VALUE_USD.into(), &[1000.0, 2500.0]),
            Column::new("internal".into(), &[1i64, 2]),
        ])
        .unwrap()
    }

    #[test]
    fn projection_keeps_export_columns_in_order() {
        let view = operation_view(&sample()).unwrap();
        let names: Vec<&str> = view.get_column_names_str();
        assert_eq!(names, OPERATION_COLUMNS.to_vec());
    }

    #[test]
    fn projection_skips_missing_columns() {
        let df = sample().drop(tx::SECTOR_CODE).unwrap();
        let view = operation_view(&df).unwrap();
        assert_eq!(view.width(), OPERATION_COLUMNS.len() - 1);
    }

    #[test]
    fn csv_bytes_carry_header_and_rows() {
        let bytes = to_csv_bytes(&sample()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let mut lines = text.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with(tx::IATI_IDENTIFIER));
        assert!(!header.contains("internal"));
        assert_eq!(lines.count(), 2);
    }

    #[test]
    fn xlsx_bytes_form_a_zip_container() {
        let bytes = to_xlsx_bytes(&sample()).unwrap();
        // XLSX is a zip archive: PK magic.
        assert_eq!(&bytes[..2], b"PK");
    }
}
