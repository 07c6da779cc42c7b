use crate::{
    api::{
        PositionRecord,
        RaceApi,
        RaceId,
        RaceStatus,
    },
    render::{
        self,
        NEW_RACE_PROMPT,
        Region,
        Renderer,
        View,
    },
};
use color_eyre::eyre::Report;
use std::time::Duration;
use tokio::time::{
    self,
    Instant,
    MissedTickBehavior,
};
use tracing::{
    debug,
    warn,
};

#[derive(Debug, thiserror::Error)]
pub enum PollFailure {
    #[error("race not started")]
    NotStarted,
    #[error("race status request failed: {0:#}")]
    Transport(Report),
}

/// Polls `race_id` every `period` until the server reports a terminal status.
///
/// The first request goes out one period after the call. Each tick waits for
/// its request to complete; ticks that come due meanwhile are skipped, so only
/// one status request is ever in flight. Returns the final positions ordered by
/// finishing rank.
pub async fn poll_race<A: RaceApi, R: Renderer>(
    api: &A,
    renderer: &R,
    race_id: RaceId,
    player_id: Option<u32>,
    period: Duration,
) -> Result<Vec<PositionRecord>, PollFailure> {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let snapshot = match api.race(race_id).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(?err, %race_id, "race status request failed");
                show_error(renderer);
                return Err(PollFailure::Transport(err));
            }
        };
        match snapshot.status {
            RaceStatus::InProgress => {
                let rows = render::leaderboard(&snapshot.positions, player_id);
                if let Err(err) =
                    renderer.render_at(Region::LeaderBoard, View::Leaderboard(rows))
                {
                    warn!(?err, "leaderboard render failed");
                }
            }
            RaceStatus::Finished => {
                let mut positions = snapshot.positions;
                render::order_by_final_position(&mut positions);
                let rows = render::results(&positions, player_id);
                if let Err(err) = renderer.render_at(Region::Race, View::Results(rows)) {
                    warn!(?err, "results render failed");
                }
                debug!(%race_id, "race finished");
                return Ok(positions);
            }
            RaceStatus::Unstarted => {
                warn!(%race_id, "race reported unstarted while polling");
                show_error(renderer);
                return Err(PollFailure::NotStarted);
            }
        }
    }
}

fn show_error<R: Renderer>(renderer: &R) {
    if let Err(err) =
        renderer.render_at(Region::Accelerate, View::Error(NEW_RACE_PROMPT.to_string()))
    {
        warn!(?err, "error view render failed");
    }
}
