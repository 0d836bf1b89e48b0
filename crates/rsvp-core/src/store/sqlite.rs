//! Embedded SQLite backend

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::models::{
    Event, Guest, GuestMembership, GuestResponseUpdate, NewEvent, NewGuest, Organizer, Rsvp,
    parse_timestamp,
};

use super::RsvpStore;

const EVENT_COLUMNS: &str = "e.id, e.organizador_id, e.nombre, e.descripcion, e.fecha, e.fecha_creacion";
const GUEST_COLUMNS: &str =
    "i.id, i.evento_id, i.nombre, i.numero, i.confirmacion, i.acompanante, i.restricciones_alimenticias";

/// SQLite-backed store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_tables()?;
        info!("SQLite store opened at {}", path);
        Ok(store)
    }

    /// Create an in-memory store (for testing and the local simulator)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_tables()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Storage("SQLite connection lock poisoned".to_string()))
    }

    fn init_tables(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS organizadores (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                numero TEXT NOT NULL UNIQUE,
                nombre TEXT,
                fecha_registro TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS eventos (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                organizador_id INTEGER NOT NULL,
                nombre TEXT NOT NULL,
                descripcion TEXT,
                fecha TEXT,
                fecha_creacion TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS invitados (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                evento_id INTEGER NOT NULL,
                nombre TEXT NOT NULL,
                numero TEXT NOT NULL,
                confirmacion TEXT,
                acompanante TEXT,
                restricciones_alimenticias TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_eventos_organizador ON eventos(organizador_id);
            CREATE INDEX IF NOT EXISTS idx_invitados_evento ON invitados(evento_id);
            CREATE INDEX IF NOT EXISTS idx_invitados_numero ON invitados(numero);",
        )?;
        Ok(())
    }
}

fn organizer_from_row(row: &Row<'_>) -> rusqlite::Result<Organizer> {
    let registered: Option<String> = row.get(3)?;
    Ok(Organizer {
        id: row.get(0)?,
        number: row.get(1)?,
        name: row.get(2)?,
        registered_at: registered.as_deref().and_then(parse_timestamp),
    })
}

/// Maps an event starting at column `offset`
fn event_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Event> {
    let created: Option<String> = row.get(offset + 5)?;
    Ok(Event {
        id: row.get(offset)?,
        organizer_id: row.get(offset + 1)?,
        name: row.get(offset + 2)?,
        description: row.get(offset + 3)?,
        date: row.get(offset + 4)?,
        created_at: created.as_deref().and_then(parse_timestamp),
    })
}

fn guest_from_row(row: &Row<'_>) -> rusqlite::Result<Guest> {
    let confirmation: Option<String> = row.get(4)?;
    let companion: Option<String> = row.get(5)?;
    Ok(Guest {
        id: row.get(0)?,
        event_id: row.get(1)?,
        name: row.get(2)?,
        number: row.get(3)?,
        confirmation: confirmation.as_deref().and_then(Rsvp::parse),
        companion: companion.as_deref().and_then(Rsvp::parse),
        dietary_restrictions: row.get(6)?,
    })
}

/// Fixed-width timestamps so text ordering matches time ordering
fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn rsvp_column(value: Option<Rsvp>) -> Option<&'static str> {
    value.map(|v| v.as_str())
}

#[async_trait]
impl RsvpStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn find_organizer_by_number(&self, number: &str) -> Result<Option<Organizer>> {
        let conn = self.conn()?;
        let organizer = conn
            .query_row(
                "SELECT id, numero, nombre, fecha_registro FROM organizadores WHERE numero = ?1",
                params![number],
                organizer_from_row,
            )
            .optional()?;
        Ok(organizer)
    }

    async fn organizer_by_id(&self, id: i64) -> Result<Option<Organizer>> {
        let conn = self.conn()?;
        let organizer = conn
            .query_row(
                "SELECT id, numero, nombre, fecha_registro FROM organizadores WHERE id = ?1",
                params![id],
                organizer_from_row,
            )
            .optional()?;
        Ok(organizer)
    }

    async fn register_organizer(&self, number: &str, name: &str) -> Result<Organizer> {
        if let Some(existing) = self.find_organizer_by_number(number).await? {
            return Ok(existing);
        }

        let conn = self.conn()?;
        let now = Utc::now();
        conn.execute(
            "INSERT INTO organizadores (numero, nombre, fecha_registro) VALUES (?1, ?2, ?3)",
            params![number, name, timestamp(&now)],
        )?;
        let id = conn.last_insert_rowid();
        info!("Organizer registered: {} (id {})", number, id);

        Ok(Organizer {
            id,
            number: number.to_string(),
            name: Some(name.to_string()),
            registered_at: Some(now),
        })
    }

    async fn delete_organizer(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM organizadores WHERE id = ?1", params![id])?;
        Ok(())
    }

    async fn create_event(&self, event: NewEvent) -> Result<Event> {
        let conn = self.conn()?;
        let now = Utc::now();
        conn.execute(
            "INSERT INTO eventos (organizador_id, nombre, descripcion, fecha, fecha_creacion)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                event.organizer_id,
                event.name,
                event.description,
                event.date,
                timestamp(&now),
            ],
        )?;
        let id = conn.last_insert_rowid();
        debug!("Event {} created for organizer {}", id, event.organizer_id);

        Ok(Event {
            id,
            organizer_id: event.organizer_id,
            name: event.name,
            description: Some(event.description),
            date: event.date,
            created_at: Some(now),
        })
    }

    async fn events_by_organizer(&self, organizer_id: i64) -> Result<Vec<Event>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {EVENT_COLUMNS} FROM eventos e WHERE e.organizador_id = ?1
             ORDER BY e.fecha_creacion ASC, e.id ASC"
        ))?;
        let events = stmt
            .query_map(params![organizer_id], |row| event_from_row(row, 0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(events)
    }

    async fn latest_event(&self, organizer_id: i64) -> Result<Option<Event>> {
        let conn = self.conn()?;
        let event = conn
            .query_row(
                &format!(
                    "SELECT {EVENT_COLUMNS} FROM eventos e WHERE e.organizador_id = ?1
                     ORDER BY e.fecha_creacion DESC, e.id DESC LIMIT 1"
                ),
                params![organizer_id],
                |row| event_from_row(row, 0),
            )
            .optional()?;
        Ok(event)
    }

    async fn event_by_id(&self, id: i64) -> Result<Option<Event>> {
        let conn = self.conn()?;
        let event = conn
            .query_row(
                &format!("SELECT {EVENT_COLUMNS} FROM eventos e WHERE e.id = ?1"),
                params![id],
                |row| event_from_row(row, 0),
            )
            .optional()?;
        Ok(event)
    }

    async fn delete_event(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM invitados WHERE evento_id = ?1", params![id])?;
        conn.execute("DELETE FROM eventos WHERE id = ?1", params![id])?;
        info!("Event {} deleted with its guests", id);
        Ok(())
    }

    async fn guests_by_event(&self, event_id: i64) -> Result<Vec<Guest>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {GUEST_COLUMNS} FROM invitados i WHERE i.evento_id = ?1 ORDER BY i.id"
        ))?;
        let guests = stmt
            .query_map(params![event_id], guest_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(guests)
    }

    async fn guest_memberships(&self, number: &str) -> Result<Vec<GuestMembership>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {GUEST_COLUMNS}, {EVENT_COLUMNS}
             FROM invitados i JOIN eventos e ON e.id = i.evento_id
             WHERE i.numero = ?1 ORDER BY i.evento_id ASC, i.id ASC"
        ))?;
        let memberships = stmt
            .query_map(params![number], |row| {
                Ok(GuestMembership {
                    guest: guest_from_row(row)?,
                    event: event_from_row(row, 7)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(memberships)
    }

    async fn update_guest_response(&self, guest_id: i64, update: &GuestResponseUpdate) -> Result<()> {
        if update.is_empty() {
            debug!("No changes to update for guest {}", guest_id);
            return Ok(());
        }

        let conn = self.conn()?;
        conn.execute(
            "UPDATE invitados SET
                confirmacion = COALESCE(?1, confirmacion),
                acompanante = COALESCE(?2, acompanante),
                restricciones_alimenticias = COALESCE(?3, restricciones_alimenticias)
             WHERE id = ?4",
            params![
                rsvp_column(update.confirmation),
                rsvp_column(update.companion),
                update.dietary_restrictions,
                guest_id,
            ],
        )?;
        Ok(())
    }

    async fn replace_guests(&self, event_id: i64, guests: Vec<NewGuest>) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM invitados WHERE evento_id = ?1", params![event_id])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO invitados
                    (evento_id, nombre, numero, confirmacion, acompanante, restricciones_alimenticias)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for guest in &guests {
                insert.execute(params![
                    event_id,
                    guest.name,
                    guest.number,
                    rsvp_column(guest.confirmation),
                    rsvp_column(guest.companion),
                    guest.dietary_restrictions,
                ])?;
            }
        }
        tx.commit()?;
        info!("Imported {} guests into event {}", guests.len(), event_id);
        Ok(guests.len())
    }

    async fn table_exists(&self, table: &str) -> Result<bool> {
        let conn = self.conn()?;
        let found = conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![table],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(found.is_some())
    }
}
