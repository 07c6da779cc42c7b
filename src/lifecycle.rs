use crate::{
    api::{
        PositionRecord,
        RaceApi,
        RaceId,
    },
    config::{
        ClientConfig,
        CountdownConfig,
    },
    countdown,
    poller::{
        self,
        PollFailure,
    },
    render::{
        NEW_RACE_PROMPT,
        Region,
        Renderer,
        View,
    },
    selection::SelectionState,
};
use color_eyre::eyre::{
    Report,
    eyre,
};
use std::{
    cell::RefCell,
    time::Duration,
};
use tracing::{
    debug,
    error,
    info,
    warn,
};

/// Where the single race of this client currently is.
#[derive(Clone, Debug, PartialEq)]
pub enum LifecycleState {
    Idle,
    Creating,
    CountingDown {
        race_id: RaceId,
    },
    Starting {
        race_id: RaceId,
    },
    Polling {
        race_id: RaceId,
    },
    Finished {
        race_id: RaceId,
        positions: Vec<PositionRecord>,
    },
    Failed {
        reason: String,
    },
}

impl LifecycleState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LifecycleState::Finished { .. } | LifecycleState::Failed { .. }
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            LifecycleState::Idle => "Idle",
            LifecycleState::Creating => "Creating race",
            LifecycleState::CountingDown { .. } => "Counting down",
            LifecycleState::Starting { .. } => "Starting",
            LifecycleState::Polling { .. } => "Racing",
            LifecycleState::Finished { .. } => "Finished",
            LifecycleState::Failed { .. } => "Failed",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RaceError {
    #[error("Please select a track and a racer before starting a race!")]
    MissingSelection,
    #[error("A race is already running")]
    AlreadyActive,
    #[error("Press n to start a new race")]
    NotReset,
    #[error("No race is in progress")]
    NotRacing,
    #[error("race creation failed: {0:#}")]
    Creation(Report),
    #[error("start command failed: {0:#}")]
    Start(Report),
    #[error(transparent)]
    Poll(#[from] PollFailure),
}

/// Drives one race at a time from creation to a terminal outcome.
///
/// Owns the selection and the lifecycle state. Both live in `RefCell`s that
/// are never borrowed across an `.await`, so the running lifecycle future and
/// key handlers can share `&self` on one thread.
pub struct RaceOrchestrator<A, R> {
    api: A,
    renderer: R,
    poll_interval: Duration,
    countdown: CountdownConfig,
    selection: RefCell<SelectionState>,
    state: RefCell<LifecycleState>,
}

impl<A: RaceApi, R: Renderer> RaceOrchestrator<A, R> {
    pub fn new(api: A, renderer: R, config: &ClientConfig) -> Self {
        Self {
            api,
            renderer,
            poll_interval: config.poll_interval(),
            countdown: config.countdown.clone(),
            selection: RefCell::new(SelectionState::new()),
            state: RefCell::new(LifecycleState::Idle),
        }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn state(&self) -> LifecycleState {
        self.state.borrow().clone()
    }

    pub fn selection(&self) -> SelectionState {
        self.selection.borrow().clone()
    }

    pub fn select_track(&self, id: u32) {
        self.selection.borrow_mut().set_track(id);
    }

    pub fn select_racer(&self, id: u32) {
        self.selection.borrow_mut().set_racer(id);
    }

    pub fn can_start_race(&self) -> bool {
        self.selection.borrow().can_start_race()
    }

    /// Fetches tracks and racers and renders them as selectable cards.
    pub async fn load_catalog(&self) {
        match self.api.tracks().await {
            Ok(tracks) => self.render(Region::Tracks, View::Tracks(tracks)),
            Err(err) => warn!(?err, "failed to load tracks"),
        }
        match self.api.racers().await {
            Ok(racers) => self.render(Region::Racers, View::Racers(racers)),
            Err(err) => warn!(?err, "failed to load racers"),
        }
    }

    /// Accepts a start request and returns the future that runs the race.
    ///
    /// Rejections happen before any request is made and leave all state as
    /// it was.
    pub fn start_race(
        &self,
    ) -> Result<impl Future<Output = Result<Vec<PositionRecord>, RaceError>> + '_, RaceError>
    {
        match *self.state.borrow() {
            LifecycleState::Idle => {}
            LifecycleState::Finished { .. } | LifecycleState::Failed { .. } => {
                return Err(RaceError::NotReset);
            }
            _ => return Err(RaceError::AlreadyActive),
        }
        let (track_id, racer_id) = self
            .selection
            .borrow()
            .race_request()
            .ok_or(RaceError::MissingSelection)?;
        self.set_state(LifecycleState::Creating);
        Ok(self.run_lifecycle(track_id, racer_id))
    }

    /// Clears a finished or failed race so another one can be started.
    pub fn new_race(&self) -> bool {
        if !self.state.borrow().is_terminal() {
            return false;
        }
        self.set_state(LifecycleState::Idle);
        true
    }

    /// Sends an accelerate command for the race being polled.
    ///
    /// Transport failures are logged and otherwise ignored.
    pub async fn accelerate(&self) -> Result<(), RaceError> {
        let race_id = self.polling_race().ok_or(RaceError::NotRacing)?;
        if let Err(err) = self.api.accelerate(race_id).await {
            warn!(?err, %race_id, "accelerate command failed");
        }
        Ok(())
    }

    fn polling_race(&self) -> Option<RaceId> {
        match *self.state.borrow() {
            LifecycleState::Polling { race_id } => Some(race_id),
            _ => None,
        }
    }

    async fn run_lifecycle(
        &self,
        track_id: u32,
        racer_id: u32,
    ) -> Result<Vec<PositionRecord>, RaceError> {
        info!(track_id, racer_id, "creating race");
        match self.drive(track_id, racer_id).await {
            Ok((race_id, positions)) => {
                info!(%race_id, "race finished");
                self.set_state(LifecycleState::Finished {
                    race_id,
                    positions: positions.clone(),
                });
                Ok(positions)
            }
            Err(err) => {
                error!(%err, "race failed");
                if matches!(err, RaceError::Creation(_) | RaceError::Start(_)) {
                    self.render(
                        Region::Accelerate,
                        View::Error(NEW_RACE_PROMPT.to_string()),
                    );
                }
                self.set_state(LifecycleState::Failed {
                    reason: err.to_string(),
                });
                Err(err)
            }
        }
    }

    async fn drive(
        &self,
        track_id: u32,
        racer_id: u32,
    ) -> Result<(RaceId, Vec<PositionRecord>), RaceError> {
        let created = self
            .api
            .create_race(racer_id, track_id)
            .await
            .map_err(RaceError::Creation)?;
        let race_id = RaceId::from_created(created.id).ok_or_else(|| {
            RaceError::Creation(eyre!("server returned unusable race id {}", created.id))
        })?;
        self.selection.borrow_mut().set_race(race_id);
        self.set_state(LifecycleState::CountingDown { race_id });
        self.render(
            Region::Race,
            View::RaceStart {
                track: created.track,
                countdown: self.countdown.start_from,
            },
        );

        countdown::run_countdown(&self.renderer, &self.countdown).await;

        self.set_state(LifecycleState::Starting { race_id });
        self.api
            .start_race(race_id)
            .await
            .map_err(RaceError::Start)?;

        self.set_state(LifecycleState::Polling { race_id });
        let positions = poller::poll_race(
            &self.api,
            &self.renderer,
            race_id,
            Some(racer_id),
            self.poll_interval,
        )
        .await?;
        Ok((race_id, positions))
    }

    fn set_state(&self, next: LifecycleState) {
        let mut state = self.state.borrow_mut();
        debug!(from = state.label(), to = next.label(), "lifecycle transition");
        *state = next;
    }

    fn render(&self, region: Region, view: View) {
        if let Err(err) = self.renderer.render_at(region, view) {
            warn!(?err, ?region, "render failed");
        }
    }
}
