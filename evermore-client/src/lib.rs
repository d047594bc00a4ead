use std::process::{Child, Command};
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// The two ways the round trip can fail. Submission only ever sees
/// `Transport`; the wall fetch can see both.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected response shape: {0}")]
    Parse(#[from] serde_json::Error),
}

pub mod client {
    use crate::ClientError;
    use evermore_common::{RsvpForm, RsvpRecord, SheetUrl};
    use reqwest::Client;

    /// Fire-and-forget delivery. The spreadsheet endpoint answers with
    /// redirects the client cannot follow usefully, so the response is
    /// never inspected: success is assumed once the request goes out, and
    /// only a transport failure is ever reported.
    pub async fn submit_rsvp(
        client: &Client,
        sheet: &SheetUrl,
        rsvp: &RsvpForm,
    ) -> Result<(), ClientError> {
        client
            .post(sheet.0.as_str())
            .json(rsvp)
            .send()
            .await?;
        Ok(())
    }

    /// Pulls the whole record set. The body is read as text first so a
    /// network failure and a malformed body stay distinguishable.
    pub async fn fetch_rsvps(
        client: &Client,
        sheet: &SheetUrl,
    ) -> Result<Vec<RsvpRecord>, ClientError> {
        let body = client
            .get(sheet.0.as_str())
            .send()
            .await?
            .text()
            .await?;
        Ok(serde_json::from_str(&body)?)
    }
}

pub mod wall {
    use evermore_common::{escape_markup, RsvpRecord};
    use rand::seq::SliceRandom;
    use rand::Rng;

    /// One prepared wall entry; `name` and `message` are already
    /// markup-escaped.
    #[derive(Clone, Debug, PartialEq)]
    pub struct Bubble {
        pub name: String,
        pub message: String,
        /// Slight tilt for the handwritten-note look.
        pub rotation_deg: f32,
    }

    /// Keeps only records with a non-blank message, escapes their text,
    /// hands each a small random tilt, and shuffles the display order.
    /// Always returns a fresh set, so repainting can never accumulate
    /// stale bubbles.
    pub fn build_wall(records: Vec<RsvpRecord>) -> Vec<Bubble> {
        build_wall_with(records, &mut rand::thread_rng())
    }

    pub fn build_wall_with(records: Vec<RsvpRecord>, rng: &mut impl Rng) -> Vec<Bubble> {
        let mut bubbles: Vec<Bubble> = records
            .iter()
            .filter_map(|record| {
                let message = record.wall_message()?;
                Some(Bubble {
                    name: escape_markup(&record.name),
                    message: escape_markup(message),
                    rotation_deg: rng.gen_range(-2.0..=2.0),
                })
            })
            .collect();
        bubbles.shuffle(rng);
        bubbles
    }
}

#[cfg(test)]
mod tests {
    use crate::wall;
    use crate::ClientError;
    use evermore_common::RsvpRecord;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn record(name: &str, message: Option<&str>) -> RsvpRecord {
        RsvpRecord {
            name: name.to_string(),
            attendance: String::from("yes"),
            message: message.map(str::to_string),
            timestamp: None,
        }
    }

    #[test]
    fn wall_keeps_only_nonblank_messages() {
        let records = vec![
            record("Alice", Some("Can't wait!")),
            record("Bob", Some("   ")),
            record("Carol", None),
            record("Dan", Some("congrats")),
        ];
        let mut rng = StdRng::seed_from_u64(7);
        let bubbles = wall::build_wall_with(records, &mut rng);
        let mut names: Vec<_> = bubbles.iter().map(|b| b.name.as_str()).collect();
        names.sort_unstable();
        assert_eq!(names, ["Alice", "Dan"]);
    }

    #[test]
    fn wall_escapes_remote_text() {
        let records = vec![record("<b>Bob</b>", Some("hi <script>"))];
        let mut rng = StdRng::seed_from_u64(0);
        let bubbles = wall::build_wall_with(records, &mut rng);
        assert_eq!(bubbles.len(), 1);
        assert_eq!(bubbles[0].name, "&lt;b&gt;Bob&lt;/b&gt;");
        assert_eq!(bubbles[0].message, "hi &lt;script&gt;");
        assert!(!bubbles[0].name.contains('<') && !bubbles[0].name.contains('>'));
        assert!(!bubbles[0].message.contains('<') && !bubbles[0].message.contains('>'));
    }

    #[test]
    fn rotations_stay_within_two_degrees() {
        let records: Vec<_> = (0..200)
            .map(|i| record(&format!("guest{i}"), Some("hello")))
            .collect();
        let mut rng = StdRng::seed_from_u64(42);
        let bubbles = wall::build_wall_with(records, &mut rng);
        assert!(bubbles.iter().all(|b| (-2.0..=2.0).contains(&b.rotation_deg)));
    }

    #[test]
    fn shuffle_preserves_the_record_set() {
        let records: Vec<_> = (0..50)
            .map(|i| record(&format!("guest{i}"), Some("hello")))
            .collect();
        let mut rng = StdRng::seed_from_u64(3);
        let bubbles = wall::build_wall_with(records, &mut rng);
        assert_eq!(bubbles.len(), 50);
        let mut names: Vec<_> = bubbles.into_iter().map(|b| b.name).collect();
        names.sort_unstable();
        let mut expected: Vec<_> = (0..50).map(|i| format!("guest{i}")).collect();
        expected.sort_unstable();
        assert_eq!(names, expected);
    }

    #[test]
    fn empty_wall_when_no_message_survives() {
        let records = vec![record("Alice", Some("  ")), record("Bob", None)];
        let mut rng = StdRng::seed_from_u64(1);
        assert!(wall::build_wall_with(records, &mut rng).is_empty());
        assert!(wall::build_wall(Vec::new()).is_empty());
    }

    #[test]
    fn rebuilding_starts_from_scratch() {
        let records = vec![record("Alice", Some("hi")), record("Bob", Some("yo"))];
        let first = wall::build_wall(records.clone());
        let second = wall::build_wall(records);
        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 2);
    }

    #[test]
    fn non_array_body_is_a_parse_error() {
        let err = serde_json::from_str::<Vec<RsvpRecord>>(r#"{"status":"ok"}"#).unwrap_err();
        assert!(matches!(ClientError::from(err), ClientError::Parse(_)));
    }
}

/// Kills the spawned stand-in server once a test is done with it.
pub struct ServerRunner(Vec<Child>);
impl ServerRunner {
    pub fn new(servers: Vec<Child>) -> Self {
        Self(servers)
    }
}
impl Drop for ServerRunner {
    fn drop(&mut self) {
        for server in &mut self.0 {
            let _ = server.kill();
        }
    }
}

#[test]
fn sheet_round_trip() {
    let server = Command::new("cargo")
        .arg("run")
        .arg("-p")
        .arg("evermore-server")
        .arg("--")
        .arg("8077")
        .spawn()
        .unwrap();
    thread::sleep(Duration::from_secs(5));
    tokio::runtime::Runtime::new()
        .unwrap()
        .block_on(wrapper(ServerRunner::new(vec![server])));
}

#[cfg(test)]
async fn wrapper(_server_runner: ServerRunner) {
    actual_test().await.unwrap();
}

#[cfg(test)]
async fn actual_test() -> anyhow::Result<()> {
    use crate::client::{fetch_rsvps, submit_rsvp};
    use evermore_common::{RsvpForm, SheetUrl};
    use reqwest::Client;

    let client = Client::new();
    let sheet = SheetUrl(String::from("http://localhost:8077/"));

    assert_eq!(fetch_rsvps(&client, &sheet).await?.len(), 0);

    submit_rsvp(
        &client,
        &sheet,
        &RsvpForm {
            name: String::from("Alice"),
            attendance: String::from("yes"),
            message: String::from("Can't wait!"),
        },
    )
    .await?;
    submit_rsvp(
        &client,
        &sheet,
        &RsvpForm {
            name: String::from("Bob"),
            attendance: String::from("no"),
            message: String::from("   "),
        },
    )
    .await?;
    submit_rsvp(
        &client,
        &sheet,
        &RsvpForm {
            name: String::from("<b>Mallory</b>"),
            attendance: String::from("yes"),
            message: String::from("hi <script>"),
        },
    )
    .await?;

    let records = fetch_rsvps(&client, &sheet).await?;
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].name, "Alice");
    assert_eq!(records[1].name, "Bob");
    assert!(records.iter().all(|r| r.timestamp.is_some()));

    let bubbles = wall::build_wall(records);
    assert_eq!(bubbles.len(), 2);
    assert!(bubbles
        .iter()
        .all(|b| !b.name.contains('<') && !b.name.contains('>')));
    assert!(bubbles
        .iter()
        .all(|b| !b.message.contains('<') && !b.message.contains('>')));

    // Nothing listens on this port; the failure must come back as Transport.
    let unreachable = SheetUrl(String::from("http://localhost:8078/"));
    match fetch_rsvps(&client, &unreachable).await {
        Err(ClientError::Transport(_)) => {}
        other => panic!("expected a transport error, got {other:?}"),
    }

    Ok(())
}
