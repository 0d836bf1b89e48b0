//! Supabase backend over the PostgREST HTTP API

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::error::{Error, Result};
use crate::models::{Event, Guest, GuestMembership, GuestResponseUpdate, NewEvent, NewGuest, Organizer};

use super::{EVENTS_TABLE, GUESTS_TABLE, ORGANIZERS_TABLE, RsvpStore};

type Query = [(&'static str, String)];

/// Guest row with its embedded `eventos` resource
#[derive(Deserialize)]
struct GuestWithEvent {
    #[serde(flatten)]
    guest: Guest,
    #[serde(rename = "eventos", default)]
    event: Option<Event>,
}

#[derive(Serialize)]
struct NewOrganizer<'a> {
    numero: &'a str,
    nombre: &'a str,
}

/// PostgREST client authenticated with the project API key
#[derive(Clone)]
pub struct SupabaseStore {
    client: Client,
    rest_url: String,
    api_key: String,
}

impl SupabaseStore {
    pub fn new(url: &str, api_key: &str) -> Result<Self> {
        if url.is_empty() || api_key.is_empty() {
            return Err(Error::Config(
                "SUPABASE_URL and SUPABASE_KEY are required for the supabase backend".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            rest_url: format!("{}/rest/v1", url.trim_end_matches('/')),
            api_key: api_key.to_string(),
        })
    }

    fn request(&self, method: reqwest::Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/{}", self.rest_url, table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn check(response: Response, context: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        error!("{} failed: {} - {}", context, status, body);
        Err(Error::Storage(format!("{}: {} - {}", context, status, body)))
    }

    async fn select<T: DeserializeOwned>(&self, table: &str, query: &Query) -> Result<Vec<T>> {
        let response = self
            .request(reqwest::Method::GET, table)
            .query(query)
            .send()
            .await?;
        let rows = Self::check(response, &format!("select from {}", table))
            .await?
            .json()
            .await?;
        Ok(rows)
    }

    async fn insert<T: DeserializeOwned, B: Serialize + ?Sized>(&self, table: &str, body: &B) -> Result<Vec<T>> {
        let response = self
            .request(reqwest::Method::POST, table)
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;
        let rows = Self::check(response, &format!("insert into {}", table))
            .await?
            .json()
            .await?;
        Ok(rows)
    }

    async fn delete(&self, table: &str, query: &Query) -> Result<()> {
        let response = self
            .request(reqwest::Method::DELETE, table)
            .query(query)
            .send()
            .await?;
        Self::check(response, &format!("delete from {}", table)).await?;
        Ok(())
    }

    async fn first<T: DeserializeOwned>(&self, table: &str, query: &Query) -> Result<Option<T>> {
        Ok(self.select(table, query).await?.into_iter().next())
    }
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{}", value)
}

#[async_trait]
impl RsvpStore for SupabaseStore {
    fn name(&self) -> &str {
        "supabase"
    }

    async fn find_organizer_by_number(&self, number: &str) -> Result<Option<Organizer>> {
        self.first(ORGANIZERS_TABLE, &[("select", "*".into()), ("numero", eq(number))])
            .await
    }

    async fn organizer_by_id(&self, id: i64) -> Result<Option<Organizer>> {
        self.first(ORGANIZERS_TABLE, &[("select", "*".into()), ("id", eq(id))])
            .await
    }

    async fn register_organizer(&self, number: &str, name: &str) -> Result<Organizer> {
        if let Some(existing) = self.find_organizer_by_number(number).await? {
            return Ok(existing);
        }

        let rows: Vec<Organizer> = self
            .insert(ORGANIZERS_TABLE, &NewOrganizer { numero: number, nombre: name })
            .await?;
        let organizer = rows
            .into_iter()
            .next()
            .ok_or_else(|| Error::Storage("Error registering organizer".to_string()))?;
        info!("Organizer registered: {} (id {})", number, organizer.id);
        Ok(organizer)
    }

    async fn delete_organizer(&self, id: i64) -> Result<()> {
        self.delete(ORGANIZERS_TABLE, &[("id", eq(id))]).await
    }

    async fn create_event(&self, event: NewEvent) -> Result<Event> {
        let rows: Vec<Event> = self.insert(EVENTS_TABLE, &event).await?;
        let created = rows
            .into_iter()
            .next()
            .ok_or_else(|| Error::Storage("Error creating event".to_string()))?;
        debug!("Event {} created for organizer {}", created.id, created.organizer_id);
        Ok(created)
    }

    async fn events_by_organizer(&self, organizer_id: i64) -> Result<Vec<Event>> {
        self.select(
            EVENTS_TABLE,
            &[
                ("select", "*".into()),
                ("organizador_id", eq(organizer_id)),
                ("order", "fecha_creacion.asc".into()),
            ],
        )
        .await
    }

    async fn latest_event(&self, organizer_id: i64) -> Result<Option<Event>> {
        self.first(
            EVENTS_TABLE,
            &[
                ("select", "*".into()),
                ("organizador_id", eq(organizer_id)),
                ("order", "fecha_creacion.desc".into()),
                ("limit", "1".into()),
            ],
        )
        .await
    }

    async fn event_by_id(&self, id: i64) -> Result<Option<Event>> {
        self.first(EVENTS_TABLE, &[("select", "*".into()), ("id", eq(id))])
            .await
    }

    async fn delete_event(&self, id: i64) -> Result<()> {
        self.delete(GUESTS_TABLE, &[("evento_id", eq(id))]).await?;
        self.delete(EVENTS_TABLE, &[("id", eq(id))]).await?;
        info!("Event {} deleted with its guests", id);
        Ok(())
    }

    async fn guests_by_event(&self, event_id: i64) -> Result<Vec<Guest>> {
        self.select(
            GUESTS_TABLE,
            &[
                ("select", "*".into()),
                ("evento_id", eq(event_id)),
                ("order", "id.asc".into()),
            ],
        )
        .await
    }

    async fn guest_memberships(&self, number: &str) -> Result<Vec<GuestMembership>> {
        let rows: Vec<GuestWithEvent> = self
            .select(
                GUESTS_TABLE,
                &[
                    ("select", "*,eventos(*)".into()),
                    ("numero", eq(number)),
                    ("order", "evento_id.asc,id.asc".into()),
                ],
            )
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                row.event.map(|event| GuestMembership {
                    guest: row.guest,
                    event,
                })
            })
            .collect())
    }

    async fn update_guest_response(&self, guest_id: i64, update: &GuestResponseUpdate) -> Result<()> {
        if update.is_empty() {
            debug!("No changes to update for guest {}", guest_id);
            return Ok(());
        }

        let response = self
            .request(reqwest::Method::PATCH, GUESTS_TABLE)
            .query(&[("id", eq(guest_id))])
            .json(update)
            .send()
            .await?;
        Self::check(response, "update guest response").await?;
        Ok(())
    }

    async fn replace_guests(&self, event_id: i64, guests: Vec<NewGuest>) -> Result<usize> {
        self.delete(GUESTS_TABLE, &[("evento_id", eq(event_id))]).await?;
        if guests.is_empty() {
            return Ok(0);
        }

        let rows: Vec<NewGuest> = guests
            .into_iter()
            .map(|guest| NewGuest { event_id, ..guest })
            .collect();
        let inserted: Vec<Guest> = self.insert(GUESTS_TABLE, &rows).await?;
        info!("Imported {} guests into event {}", inserted.len(), event_id);
        Ok(inserted.len())
    }

    async fn table_exists(&self, table: &str) -> Result<bool> {
        let response = self
            .request(reqwest::Method::GET, table)
            .query(&[("select", "*"), ("limit", "1")])
            .send()
            .await?;
        Ok(response.status().is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Rsvp;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn event_json(id: i64, name: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id, "organizador_id": 1, "nombre": name, "descripcion": "",
            "fecha": null, "fecha_creacion": "2024-05-01T18:30:00+00:00"
        })
    }

    #[tokio::test]
    async fn test_find_organizer_sends_api_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/organizadores"))
            .and(query_param("numero", "eq.5551"))
            .and(header("apikey", "secret"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": 4, "numero": "5551", "nombre": "Organizador", "fecha_registro": null}
            ])))
            .mount(&server)
            .await;

        let store = SupabaseStore::new(&server.uri(), "secret").unwrap();
        let organizer = store.find_organizer_by_number("5551").await.unwrap().unwrap();
        assert_eq!(organizer.id, 4);
    }

    #[tokio::test]
    async fn test_missing_organizer_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/organizadores"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let store = SupabaseStore::new(&server.uri(), "secret").unwrap();
        assert!(store.find_organizer_by_number("5551").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_guest_memberships_embed_event() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/invitados"))
            .and(query_param("select", "*,eventos(*)"))
            .and(query_param("order", "evento_id.asc,id.asc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
                "id": 9, "evento_id": 2, "nombre": "Ana", "numero": "5551",
                "confirmacion": "Sí", "acompanante": null, "restricciones_alimenticias": null,
                "eventos": event_json(2, "Boda")
            }])))
            .mount(&server)
            .await;

        let store = SupabaseStore::new(&server.uri(), "secret").unwrap();
        let memberships = store.guest_memberships("5551").await.unwrap();
        assert_eq!(memberships.len(), 1);
        assert_eq!(memberships[0].guest.confirmation, Some(Rsvp::Yes));
        assert_eq!(memberships[0].event.name, "Boda");
    }

    #[tokio::test]
    async fn test_update_sends_only_populated_fields() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/invitados"))
            .and(query_param("id", "eq.9"))
            .and(body_json(serde_json::json!({"confirmacion": "No"})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let store = SupabaseStore::new(&server.uri(), "secret").unwrap();
        let update = GuestResponseUpdate {
            confirmation: Some(Rsvp::No),
            ..Default::default()
        };
        store.update_guest_response(9, &update).await.unwrap();
    }

    #[tokio::test]
    async fn test_create_event_returns_representation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/eventos"))
            .and(header("prefer", "return=representation"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!([event_json(5, "Boda")])))
            .mount(&server)
            .await;

        let store = SupabaseStore::new(&server.uri(), "secret").unwrap();
        let event = store
            .create_event(NewEvent {
                organizer_id: 1,
                name: "Boda".to_string(),
                description: String::new(),
                date: None,
            })
            .await
            .unwrap();
        assert_eq!(event.id, 5);
    }

    #[tokio::test]
    async fn test_error_status_is_storage_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/eventos"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let store = SupabaseStore::new(&server.uri(), "secret").unwrap();
        let err = store.event_by_id(1).await.unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
    }

    #[test]
    fn test_requires_credentials() {
        assert!(matches!(SupabaseStore::new("", ""), Err(Error::Config(_))));
    }
}
