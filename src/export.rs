// src/export.rs
use thiserror::Error;
use tracing::info;

use crate::meal_voucher::MealVoucherMonth;

const CSV_HEADER: [&str; 4] = ["Annee", "Mois", "Matricule", "Nb jours"];

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),
    #[error("CSV buffer error: {0}")]
    Buffer(String),
    #[error("CSV output is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

fn csv_writer(buffer: Vec<u8>) -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .delimiter(b';')
        .from_writer(buffer)
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>, ExportError> {
    writer
        .into_inner()
        .map_err(|e| ExportError::Buffer(e.error().to_string()))
}

/// Meal-voucher order file for the voucher provider:
///
/// ```text
/// Annee;Mois;Matricule;Nb jours
///
/// 2025;01;0001;16
/// ```
///
/// Collaborators without a matricule are left out.
pub fn rights_to_csv(month: &MealVoucherMonth) -> Result<String, ExportError> {
    let mut writer = csv_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;
    let mut buffer = finish(writer)?;
    // The provider template has an empty line after the header.
    buffer.push(b'\n');

    let mut writer = csv_writer(buffer);
    let mut rows = 0;
    for employee in &month.employees {
        let Some(matricule) = employee.matricule.as_deref() else {
            continue;
        };
        writer.write_record([
            month.year.to_string(),
            format!("{:02}", month.month),
            matricule.to_string(),
            employee.rights.to_string(),
        ])?;
        rows += 1;
    }
    let buffer = finish(writer)?;
    info!(
        "Exported {} meal-voucher rows for {}-{:02}",
        rows, month.year, month.month
    );
    Ok(String::from_utf8(buffer)?)
}
