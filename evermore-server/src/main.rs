use std::env;
use std::fs::remove_dir_all;
use std::net::SocketAddr;

use anyhow::Context;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Json};
use chrono::Utc;
use serde_json::Value;
use sled::Db;
use tracing::info;

use evermore_common::{RsvpForm, RsvpRecord};

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug)]
pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Something went wrong: {}", self.0),
        )
            .into_response()
    }
}

// Lets handlers use `?` on anything anyhow can absorb.
impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[derive(Clone)]
pub struct State {
    db: Db,
}
impl State {
    pub fn new(port: u16) -> Self {
        let sled_path = String::from("sheet") + &port.to_string();
        let _ = remove_dir_all(&sled_path);
        Self {
            db: sled::open(sled_path).unwrap(),
        }
    }
    /// Appends one row. Keys are the monotonic sled id in big-endian, so
    /// iteration order is insertion order.
    pub fn append(&self, record: &RsvpRecord) -> Result<()> {
        let id = self.db.generate_id()?;
        self.db.insert(id.to_be_bytes(), serde_json::to_vec(record)?)?;
        Ok(())
    }
    pub fn all(&self) -> Result<Vec<RsvpRecord>> {
        let mut records = Vec::new();
        for entry in self.db.iter() {
            let (_key, value) = entry?;
            records.push(serde_json::from_slice(&value)?);
        }
        Ok(records)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let mut port = 8000;
    if let Some(p) = env::args().nth(1) {
        port = p.parse().with_context(|| "port must be a number")?;
    }
    let state = State::new(port);
    let app = axum::Router::new()
        .route("/", get(list_rsvps).post(append_rsvp))
        .layer(Extension(state));
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!("sheet stand-in listening on {addr}");
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}

/// Same contract as the hosted sheet script: accept `{name, attendance,
/// message}`, stamp it, append it. Clients submit response-opaque, so the
/// body of the reply does not matter.
async fn append_rsvp(
    Extension(state): Extension<State>,
    Json(payload): Json<Value>,
) -> Result<impl IntoResponse> {
    let form: RsvpForm = serde_json::from_value(payload)?;
    info!("rsvp from {:?} ({})", form.name, form.attendance);
    let record = RsvpRecord {
        name: form.name,
        attendance: form.attendance,
        message: Some(form.message),
        timestamp: Some(Utc::now()),
    };
    state.append(&record)?;
    Ok(())
}

async fn list_rsvps(Extension(state): Extension<State>) -> Result<impl IntoResponse> {
    Ok(serde_json::to_string(&state.all()?)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_state() -> State {
        State {
            db: sled::Config::new().temporary(true).open().unwrap(),
        }
    }

    fn record(name: &str) -> RsvpRecord {
        RsvpRecord {
            name: name.to_string(),
            attendance: String::from("yes"),
            message: Some(String::from("hello")),
            timestamp: Some(Utc::now()),
        }
    }

    #[test]
    fn records_come_back_in_insertion_order() {
        let state = temp_state();
        for name in ["first", "second", "third"] {
            state.append(&record(name)).unwrap();
        }
        let names: Vec<_> = state.all().unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, ["first", "second", "third"]);
    }

    #[test]
    fn stored_rows_round_trip_through_json() {
        let state = temp_state();
        state.append(&record("Alice")).unwrap();
        let rows = state.all().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Alice");
        assert_eq!(rows[0].wall_message(), Some("hello"));
        assert!(rows[0].timestamp.is_some());
    }
}
