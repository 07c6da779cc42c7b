use crate::{
    api::{
        CreatedRace,
        PositionRecord,
        RaceApi,
        RaceId,
        RaceSnapshot,
        RaceStatus,
        Racer,
        Track,
    },
    render::{
        Region,
        Renderer,
        View,
    },
};
use color_eyre::eyre::{
    Result,
    eyre,
};
use std::{
    cell::{
        Cell,
        RefCell,
    },
    collections::VecDeque,
    time::Duration,
};
use tokio::time::Instant;

pub struct RecordingRenderer {
    views: RefCell<Vec<(Region, View, Instant)>>,
    attempts: Cell<usize>,
    fail: bool,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self {
            views: RefCell::new(Vec::new()),
            attempts: Cell::new(0),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn views(&self) -> Vec<(Region, View)> {
        self.views
            .borrow()
            .iter()
            .map(|(region, view, _)| (*region, view.clone()))
            .collect()
    }

    pub fn timed_views(&self) -> Vec<(Region, View, Instant)> {
        self.views.borrow().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.get()
    }

    pub fn count(&self, pred: impl Fn(&Region, &View) -> bool) -> usize {
        self.views
            .borrow()
            .iter()
            .filter(|(region, view, _)| pred(region, view))
            .count()
    }
}

impl Renderer for RecordingRenderer {
    fn render_at(&self, region: Region, view: View) -> Result<()> {
        self.attempts.set(self.attempts.get() + 1);
        if self.fail {
            return Err(eyre!("renderer unavailable"));
        }
        self.views.borrow_mut().push((region, view, Instant::now()));
        Ok(())
    }
}

/// Scripted race server. Each call to `race` pops the next scripted reply.
pub struct FakeRaceApi {
    pub tracks: Vec<Track>,
    pub racers: Vec<Racer>,
    pub created_id: u32,
    pub fail_create: bool,
    pub fail_start: bool,
    pub fail_accelerate: bool,
    pub latency: Duration,
    race_replies: RefCell<VecDeque<Result<RaceSnapshot>>>,
    create_calls: RefCell<Vec<(u32, u32)>>,
    race_calls: RefCell<Vec<RaceId>>,
    start_calls: RefCell<Vec<RaceId>>,
    accelerate_calls: RefCell<Vec<RaceId>>,
    in_flight: Cell<usize>,
    max_in_flight: Cell<usize>,
}

impl FakeRaceApi {
    pub fn new() -> Self {
        Self {
            tracks: vec![track(1), track(2)],
            racers: vec![racer(1), racer(2), racer(3)],
            created_id: 1,
            fail_create: false,
            fail_start: false,
            fail_accelerate: false,
            latency: Duration::ZERO,
            race_replies: RefCell::new(VecDeque::new()),
            create_calls: RefCell::new(Vec::new()),
            race_calls: RefCell::new(Vec::new()),
            start_calls: RefCell::new(Vec::new()),
            accelerate_calls: RefCell::new(Vec::new()),
            in_flight: Cell::new(0),
            max_in_flight: Cell::new(0),
        }
    }

    pub fn with_replies(replies: Vec<Result<RaceSnapshot>>) -> Self {
        let api = Self::new();
        api.race_replies.borrow_mut().extend(replies);
        api
    }

    pub fn create_calls(&self) -> Vec<(u32, u32)> {
        self.create_calls.borrow().clone()
    }

    pub fn race_calls(&self) -> Vec<RaceId> {
        self.race_calls.borrow().clone()
    }

    pub fn start_calls(&self) -> Vec<RaceId> {
        self.start_calls.borrow().clone()
    }

    pub fn accelerate_calls(&self) -> Vec<RaceId> {
        self.accelerate_calls.borrow().clone()
    }

    pub fn network_calls(&self) -> usize {
        self.create_calls.borrow().len()
            + self.race_calls.borrow().len()
            + self.start_calls.borrow().len()
            + self.accelerate_calls.borrow().len()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.get()
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

impl RaceApi for FakeRaceApi {
    async fn tracks(&self) -> Result<Vec<Track>> {
        Ok(self.tracks.clone())
    }

    async fn racers(&self) -> Result<Vec<Racer>> {
        Ok(self.racers.clone())
    }

    async fn create_race(&self, player_id: u32, track_id: u32) -> Result<CreatedRace> {
        self.create_calls.borrow_mut().push((player_id, track_id));
        if self.fail_create {
            return Err(eyre!("connection refused"));
        }
        Ok(CreatedRace {
            id: self.created_id,
            track: track(track_id),
        })
    }

    async fn race(&self, id: RaceId) -> Result<RaceSnapshot> {
        self.race_calls.borrow_mut().push(id);
        self.in_flight.set(self.in_flight.get() + 1);
        self.max_in_flight
            .set(self.max_in_flight.get().max(self.in_flight.get()));
        self.simulate_latency().await;
        self.in_flight.set(self.in_flight.get() - 1);
        self.race_replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(eyre!("no scripted race reply")))
    }

    async fn start_race(&self, id: RaceId) -> Result<()> {
        self.start_calls.borrow_mut().push(id);
        if self.fail_start {
            return Err(eyre!("start rejected"));
        }
        Ok(())
    }

    async fn accelerate(&self, id: RaceId) -> Result<()> {
        self.accelerate_calls.borrow_mut().push(id);
        if self.fail_accelerate {
            return Err(eyre!("accelerate rejected"));
        }
        Ok(())
    }
}

pub fn track(id: u32) -> Track {
    Track {
        id,
        name: format!("Track {id}"),
    }
}

pub fn racer(id: u32) -> Racer {
    Racer {
        id,
        driver_name: format!("Racer {id}"),
        top_speed: 500.0,
        acceleration: 10.0,
        handling: 10.0,
    }
}

pub fn position(id: u32, segment: f64, final_position: Option<u32>) -> PositionRecord {
    PositionRecord {
        id,
        driver_name: format!("Racer {id}"),
        segment,
        final_position,
    }
}

pub fn snapshot(status: RaceStatus, positions: Vec<PositionRecord>) -> RaceSnapshot {
    RaceSnapshot {
        status,
        positions,
        track: None,
    }
}

pub fn in_progress() -> RaceSnapshot {
    snapshot(
        RaceStatus::InProgress,
        vec![position(1, 5.0, None), position(2, 9.0, None), position(3, 2.0, None)],
    )
}

pub fn finished() -> RaceSnapshot {
    snapshot(
        RaceStatus::Finished,
        vec![
            position(1, 201.0, Some(3)),
            position(2, 201.0, Some(1)),
            position(3, 201.0, Some(2)),
        ],
    )
}
