use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use serde::{
    Deserialize,
    Serialize,
    de::DeserializeOwned,
};
use std::fmt;

/// Identifier accepted by the get/start/accelerate endpoints.
///
/// The race server hands out 1-indexed ids when a race is created but
/// addresses races 0-indexed everywhere else, so the id from the creation
/// response is shifted down by one before it is stored.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct RaceId(u32);

impl RaceId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn from_created(created_id: u32) -> Option<Self> {
        created_id.checked_sub(1).map(Self)
    }
}

impl fmt::Display for RaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Track {
    pub id: u32,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Racer {
    pub id: u32,
    pub driver_name: String,
    pub top_speed: f64,
    pub acceleration: f64,
    pub handling: f64,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct CreatedRace {
    #[serde(rename = "ID")]
    pub id: u32,
    #[serde(rename = "Track")]
    pub track: Track,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RaceStatus {
    Unstarted,
    InProgress,
    Finished,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct PositionRecord {
    pub id: u32,
    pub driver_name: String,
    pub segment: f64,
    #[serde(default)]
    pub final_position: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct RaceSnapshot {
    pub status: RaceStatus,
    #[serde(default)]
    pub positions: Vec<PositionRecord>,
    #[serde(default)]
    pub track: Option<Track>,
}

#[derive(Debug, Serialize)]
struct CreateRaceRequest {
    player_id: u32,
    track_id: u32,
}

/// Operations the client needs from the race server.
pub trait RaceApi {
    fn tracks(&self) -> impl Future<Output = Result<Vec<Track>>>;

    fn racers(&self) -> impl Future<Output = Result<Vec<Racer>>>;

    fn create_race(
        &self,
        player_id: u32,
        track_id: u32,
    ) -> impl Future<Output = Result<CreatedRace>>;

    fn race(&self, id: RaceId) -> impl Future<Output = Result<RaceSnapshot>>;

    fn start_race(&self, id: RaceId) -> impl Future<Output = Result<()>>;

    fn accelerate(&self, id: RaceId) -> impl Future<Output = Result<()>>;
}

#[derive(Clone)]
pub struct HttpRaceApi {
    base_url: String,
    http: reqwest::Client,
}

impl HttpRaceApi {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .build()
            .wrap_err("failed to build HTTP client for race server")?;
        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let res = self
            .http
            .get(url)
            .send()
            .await
            .wrap_err_with(|| format!("race server request failed: GET {path}"))?;
        Self::read_json(res, path).await
    }

    async fn post_command(&self, path: &str) -> Result<()> {
        let url = format!("{}{}", self.base_url, path);
        let res = self
            .http
            .post(url)
            .send()
            .await
            .wrap_err_with(|| format!("race server request failed: POST {path}"))?;
        let status = res.status();
        if !status.is_success() {
            let body = res
                .text()
                .await
                .unwrap_or_else(|_| "<unavailable body>".to_string());
            return Err(eyre!(
                "race server responded with {status} to POST {path}: {body}"
            ));
        }
        Ok(())
    }

    async fn read_json<T: DeserializeOwned>(
        res: reqwest::Response,
        path: &str,
    ) -> Result<T> {
        let status = res.status();
        let bytes = res
            .bytes()
            .await
            .wrap_err("failed to read race server response body")?;
        if !status.is_success() {
            let body = String::from_utf8_lossy(&bytes);
            return Err(eyre!(
                "race server responded with {status} for {path}: {body}"
            ));
        }
        serde_json::from_slice(&bytes)
            .wrap_err_with(|| format!("invalid race server payload from {path}"))
    }
}

impl RaceApi for HttpRaceApi {
    async fn tracks(&self) -> Result<Vec<Track>> {
        self.get_json("/api/tracks").await
    }

    async fn racers(&self) -> Result<Vec<Racer>> {
        self.get_json("/api/cars").await
    }

    async fn create_race(&self, player_id: u32, track_id: u32) -> Result<CreatedRace> {
        let path = "/api/races";
        let url = format!("{}{}", self.base_url, path);
        let res = self
            .http
            .post(url)
            .json(&CreateRaceRequest {
                player_id,
                track_id,
            })
            .send()
            .await
            .wrap_err("race server request failed: POST /api/races")?;
        Self::read_json(res, path).await
    }

    async fn race(&self, id: RaceId) -> Result<RaceSnapshot> {
        self.get_json(&format!("/api/races/{id}")).await
    }

    async fn start_race(&self, id: RaceId) -> Result<()> {
        self.post_command(&format!("/api/races/{id}/start")).await
    }

    async fn accelerate(&self, id: RaceId) -> Result<()> {
        self.post_command(&format!("/api/races/{id}/accelerate")).await
    }
}
