//! Guest spreadsheet import and export
//!
//! Both directions use the same header row:
//! `Nombre, Numero, Confirmacion, +1, Restricciones alimenticias`.

use std::path::{Path, PathBuf};

use calamine::{Data, Reader, open_workbook_auto};
use rust_xlsxwriter::{Format, Workbook};
use tracing::info;

use crate::error::{Error, Result};
use crate::models::{Guest, NewGuest, Rsvp, normalize_number};
use crate::store::RsvpStore;

pub const COL_NAME: &str = "Nombre";
pub const COL_NUMBER: &str = "Numero";
pub const COL_CONFIRMATION: &str = "Confirmacion";
pub const COL_COMPANION: &str = "+1";
pub const COL_RESTRICTIONS: &str = "Restricciones alimenticias";

const HEADERS: [&str; 5] = [COL_NAME, COL_NUMBER, COL_CONFIRMATION, COL_COMPANION, COL_RESTRICTIONS];
const REQUIRED: [&str; 2] = [COL_NAME, COL_NUMBER];

/// Default export file name for an event
pub fn export_file_name(event_id: i64) -> String {
    format!("evento_{}.xlsx", event_id)
}

/// User-facing summary of a successful import
pub fn import_success_message(count: usize) -> String {
    format!(
        "Excel importado con éxito. {} invitados registrados para su evento.",
        count
    )
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        // Phone numbers typed into a sheet usually arrive as floats
        Data::Float(f) if f.fract() == 0.0 => format!("{:.0}", f),
        other => other.to_string().trim().to_string(),
    }
}

/// Column positions resolved from the header row
struct Columns {
    name: usize,
    number: usize,
    confirmation: Option<usize>,
    companion: Option<usize>,
    restrictions: Option<usize>,
}

impl Columns {
    fn resolve(header: &[Data]) -> Result<Self> {
        let names: Vec<String> = header.iter().map(cell_text).collect();
        let find = |column: &str| names.iter().position(|n| n == column);

        let missing: Vec<&str> = REQUIRED.iter().copied().filter(|c| find(c).is_none()).collect();
        match (find(COL_NAME), find(COL_NUMBER)) {
            (Some(name), Some(number)) => Ok(Self {
                name,
                number,
                confirmation: find(COL_CONFIRMATION),
                companion: find(COL_COMPANION),
                restrictions: find(COL_RESTRICTIONS),
            }),
            _ => Err(Error::Validation(format!(
                "El Excel debe contener las columnas obligatorias: {}",
                missing.join(", ")
            ))),
        }
    }
}

fn optional_text(row: &[Data], column: Option<usize>) -> Option<String> {
    column
        .and_then(|c| row.get(c))
        .map(cell_text)
        .filter(|text| !text.is_empty())
}

/// Read guest rows for `event_id` from the first sheet of `path`.
///
/// Rows with a blank name or number are skipped. An empty result is
/// returned as is; callers decide whether that is an error.
pub fn read_guests(path: &Path, event_id: i64) -> Result<Vec<NewGuest>> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| Error::Spreadsheet("El archivo no contiene hojas".to_string()))??;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Err(Error::Validation(format!(
            "El Excel debe contener las columnas obligatorias: {}",
            REQUIRED.join(", ")
        )));
    };
    let columns = Columns::resolve(header)?;

    let guests = rows
        .filter_map(|row| {
            let name = row.get(columns.name).map(cell_text).unwrap_or_default();
            let number = row
                .get(columns.number)
                .map(|cell| normalize_number(&cell_text(cell)))
                .unwrap_or_default();
            if name.is_empty() || number.is_empty() {
                return None;
            }

            Some(NewGuest {
                event_id,
                name,
                number,
                confirmation: optional_text(row, columns.confirmation).as_deref().and_then(Rsvp::parse),
                companion: optional_text(row, columns.companion).as_deref().and_then(Rsvp::parse),
                dietary_restrictions: optional_text(row, columns.restrictions),
            })
        })
        .collect();

    Ok(guests)
}

/// Import a spreadsheet into an event, replacing its guest list.
///
/// Returns the number of guests imported.
pub async fn import_guests(store: &dyn RsvpStore, path: &Path, event_id: i64) -> Result<usize> {
    let guests = read_guests(path, event_id)?;
    if guests.is_empty() {
        return Err(Error::Validation(
            "No se encontraron datos válidos para importar".to_string(),
        ));
    }

    let count = store.replace_guests(event_id, guests).await?;
    info!("Excel imported successfully: {} guests for event {}", count, event_id);
    Ok(count)
}

/// Write `guests` to `path`. Fails when there is nothing to write.
pub fn write_guests(guests: &[Guest], path: &Path) -> Result<()> {
    if guests.is_empty() {
        return Err(Error::Validation("No hay datos para exportar".to_string()));
    }

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    let bold = Format::new().set_bold();

    for (col, header) in HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &bold)?;
    }

    for (index, guest) in guests.iter().enumerate() {
        let row = index as u32 + 1;
        worksheet.write_string(row, 0, &guest.name)?;
        worksheet.write_string(row, 1, &guest.number)?;
        worksheet.write_string(row, 2, guest.confirmation.map(|c| c.as_str()).unwrap_or(""))?;
        worksheet.write_string(row, 3, guest.companion.map(|c| c.as_str()).unwrap_or(""))?;
        worksheet.write_string(row, 4, guest.dietary_restrictions.as_deref().unwrap_or(""))?;
    }

    workbook.save(path)?;
    Ok(())
}

/// Export an event's guests to `path`, returning the written path
pub async fn export_event(store: &dyn RsvpStore, event_id: i64, path: &Path) -> Result<PathBuf> {
    let guests = store.guests_by_event(event_id).await?;
    write_guests(&guests, path)?;
    info!("Excel exported successfully to {}", path.display());
    Ok(path.to_path_buf())
}
