//! Persistence for organizers, events and guests
//!
//! Two backends share the [`RsvpStore`] contract: a Supabase (PostgREST)
//! client and an embedded SQLite database. Lookups that find nothing return
//! `Ok(None)` or an empty list; only backend failures are errors.

mod sqlite;
mod supabase;

pub use sqlite::SqliteStore;
pub use supabase::SupabaseStore;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::{StorageBackend, StorageConfig};
use crate::error::Result;
use crate::models::{Event, Guest, GuestMembership, GuestResponseUpdate, NewEvent, NewGuest, Organizer};

/// Table names, shared by both backends
pub const ORGANIZERS_TABLE: &str = "organizadores";
pub const EVENTS_TABLE: &str = "eventos";
pub const GUESTS_TABLE: &str = "invitados";

/// Storage contract used by the bot
#[async_trait]
pub trait RsvpStore: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &str;

    async fn find_organizer_by_number(&self, number: &str) -> Result<Option<Organizer>>;

    async fn organizer_by_id(&self, id: i64) -> Result<Option<Organizer>>;

    /// Insert an organizer, or return the existing row for `number`
    async fn register_organizer(&self, number: &str, name: &str) -> Result<Organizer>;

    async fn delete_organizer(&self, id: i64) -> Result<()>;

    async fn create_event(&self, event: NewEvent) -> Result<Event>;

    /// Events of an organizer, oldest first
    async fn events_by_organizer(&self, organizer_id: i64) -> Result<Vec<Event>>;

    /// Most recently created event of an organizer
    async fn latest_event(&self, organizer_id: i64) -> Result<Option<Event>>;

    async fn event_by_id(&self, id: i64) -> Result<Option<Event>>;

    /// Delete the event's guests, then the event itself.
    ///
    /// The two deletes are independent calls; a failure between them leaves
    /// the event without guests.
    async fn delete_event(&self, id: i64) -> Result<()>;

    async fn guests_by_event(&self, event_id: i64) -> Result<Vec<Guest>>;

    /// Every guest row registered under `number`, joined with its event
    async fn guest_memberships(&self, number: &str) -> Result<Vec<GuestMembership>>;

    /// Write only the populated fields of `update`
    async fn update_guest_response(&self, guest_id: i64, update: &GuestResponseUpdate) -> Result<()>;

    /// Replace an event's guest list (delete, then insert). Returns the
    /// number of rows inserted.
    async fn replace_guests(&self, event_id: i64, guests: Vec<NewGuest>) -> Result<usize>;

    /// Whether `table` is reachable
    async fn table_exists(&self, table: &str) -> Result<bool>;
}

/// Probe the three tables and log the ones that are missing.
///
/// Returns `true` when all of them respond.
pub async fn check_tables(store: &dyn RsvpStore) -> bool {
    let mut all_present = true;
    for table in [GUESTS_TABLE, ORGANIZERS_TABLE, EVENTS_TABLE] {
        match store.table_exists(table).await {
            Ok(true) => info!("Table '{}' exists in {}", table, store.name()),
            Ok(false) => {
                warn!("Table '{}' needs to be created", table);
                all_present = false;
            }
            Err(e) => {
                warn!("Table '{}' could not be checked: {}", table, e);
                all_present = false;
            }
        }
    }
    if !all_present {
        warn!("Some tables are missing. Please create them before using the bot.");
    }
    all_present
}

/// Build the configured storage backend
pub fn from_config(config: &StorageConfig) -> Result<Arc<dyn RsvpStore>> {
    match config.backend {
        StorageBackend::Supabase => {
            let store = SupabaseStore::new(&config.supabase_url, &config.supabase_key)?;
            Ok(Arc::new(store))
        }
        StorageBackend::Sqlite => {
            let store = SqliteStore::open(&config.sqlite_path)?;
            Ok(Arc::new(store))
        }
    }
}
