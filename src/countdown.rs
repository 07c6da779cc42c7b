use crate::{
    config::CountdownConfig,
    render::{
        Region,
        Renderer,
        View,
    },
};
use tokio::time::{
    self,
    Instant,
};
use tracing::warn;

/// Counts down from `config.start_from` once the race view has settled.
///
/// The race start view already shows the starting number, so the first
/// emitted value is one below it. Returns right after zero is shown. A
/// render failure abandons the countdown without failing the race.
pub async fn run_countdown<R: Renderer>(renderer: &R, config: &CountdownConfig) {
    time::sleep(config.settle_delay()).await;

    let mut remaining = config.start_from;
    let period = config.tick();
    let mut ticker = time::interval_at(Instant::now() + period, period);
    while remaining > 0 {
        ticker.tick().await;
        remaining -= 1;
        if let Err(err) =
            renderer.render_at(Region::LeaderBoard, View::Countdown(remaining))
        {
            warn!(?err, remaining, "countdown render failed, abandoning countdown");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::test_helpers::RecordingRenderer;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn run_countdown__default_config__emits_two_one_zero_a_second_apart() {
        // given
        let renderer = RecordingRenderer::new();
        let config = CountdownConfig::default();
        let started = Instant::now();

        // when
        run_countdown(&renderer, &config).await;

        // then
        let emitted: Vec<(u8, Duration)> = renderer
            .timed_views()
            .into_iter()
            .filter_map(|(region, view, at)| match (region, view) {
                (Region::LeaderBoard, View::Countdown(n)) => Some((n, at - started)),
                _ => None,
            })
            .collect();
        let values: Vec<u8> = emitted.iter().map(|(n, _)| *n).collect();
        assert_eq!(values, vec![2, 1, 0]);
        for ((_, at), expected_ms) in emitted.iter().zip([2000u64, 3000, 4000]) {
            let expected = Duration::from_millis(expected_ms);
            assert!(
                *at >= expected && *at < expected + Duration::from_millis(10),
                "tick at {at:?}, expected about {expected:?}"
            );
        }
        assert!(started.elapsed() < Duration::from_millis(4010));
    }

    #[tokio::test(start_paused = true)]
    async fn run_countdown__render_failure__abandons_after_first_tick() {
        // given
        let renderer = RecordingRenderer::failing();
        let config = CountdownConfig::default();
        let started = Instant::now();

        // when
        run_countdown(&renderer, &config).await;

        // then
        assert_eq!(renderer.attempts(), 1);
        assert!(started.elapsed() < Duration::from_millis(2010));
    }

    #[tokio::test(start_paused = true)]
    async fn run_countdown__start_from_zero__only_waits_for_settle() {
        // given
        let renderer = RecordingRenderer::new();
        let config = CountdownConfig {
            start_from: 0,
            ..CountdownConfig::default()
        };

        // when
        run_countdown(&renderer, &config).await;

        // then
        assert!(renderer.views().is_empty());
    }
}
