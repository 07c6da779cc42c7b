use crate::ui;
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use futures::{
    StreamExt,
    future::OptionFuture,
    stream::FuturesUnordered,
};
use pod_racer::{
    api::{
        HttpRaceApi,
        PositionRecord,
        RaceApi,
    },
    config::ClientConfig,
    lifecycle::{
        RaceError,
        RaceOrchestrator,
    },
};
use std::{
    pin::Pin,
    time::Duration,
};
use tokio::time;
use tracing::{
    debug,
    info,
    warn,
};

const FRAME_INTERVAL: Duration = Duration::from_millis(50);

type RaceRun<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<PositionRecord>, RaceError>> + 'a>>;
type AccelerateCall<'a> = Pin<Box<dyn Future<Output = Result<(), RaceError>> + 'a>>;

type Orchestrator<A> = RaceOrchestrator<A, ui::SharedScreen>;

pub async fn run_app(config: ClientConfig) -> Result<()> {
    let api = HttpRaceApi::new(&config.server_url)?;
    info!(server = api.base_url(), "connecting to race server");
    let screen = ui::SharedScreen::default();
    let orchestrator = RaceOrchestrator::new(api, screen, &config);
    let mut ui_state = ui::UiState::default();
    let mut input_events = ui::input_event_stream();

    info!("Starting UI");
    ui::terminal_enter(&mut ui_state)?;
    let res = run_loop(&orchestrator, &mut ui_state, &mut input_events).await;
    ui::terminal_exit()?;
    res
}

fn redraw<A: RaceApi>(orch: &Orchestrator<A>, ui_state: &mut ui::UiState) -> Result<()> {
    let screen = orch.renderer().borrow();
    ui::draw(ui_state, &screen, &orch.state(), &orch.selection())
}

async fn run_loop<A: RaceApi>(
    orch: &Orchestrator<A>,
    ui_state: &mut ui::UiState,
    input_events: &mut ui::InputEventReceiver,
) -> Result<()> {
    info!("Running app loop");
    let catalog = orch.load_catalog();
    tokio::pin!(catalog);
    let mut catalog_loaded = false;
    let mut race: Option<RaceRun<'_>> = None;
    let mut accelerations: FuturesUnordered<AccelerateCall<'_>> = FuturesUnordered::new();
    let mut frames = time::interval(FRAME_INTERVAL);

    redraw(orch, ui_state).wrap_err("initial draw failed")?;

    loop {
        tokio::select! {
            _ = &mut catalog, if !catalog_loaded => {
                catalog_loaded = true;
            }
            Some(outcome) = OptionFuture::from(race.as_mut()), if race.is_some() => {
                race = None;
                match outcome {
                    Ok(positions) => info!(racers = positions.len(), "race complete"),
                    Err(err) => {
                        warn!(%err, "race ended without results");
                        ui_state.set_notice(err.to_string());
                    }
                }
                redraw(orch, ui_state).wrap_err("draw after race end failed")?;
            }
            Some(res) = accelerations.next(), if !accelerations.is_empty() => {
                if let Err(err) = res {
                    debug!(%err, "accelerate ignored");
                }
            }
            _ = frames.tick() => {
                if orch.renderer().take_dirty() {
                    redraw(orch, ui_state).wrap_err("frame draw failed")?;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
            raw_ev = ui::next_raw_event(input_events) => {
                let event = raw_ev?;
                let ev = {
                    let screen = orch.renderer().borrow();
                    ui::interpret_event(ui_state, &screen, event)
                };
                let Some(ev) = ev else {
                    continue;
                };
                match ev {
                    ui::UserEvent::Quit => break,
                    ui::UserEvent::Redraw => {}
                    ui::UserEvent::SelectTrack(id) => {
                        orch.select_track(id);
                        ui_state.clear_notice();
                    }
                    ui::UserEvent::SelectRacer(id) => {
                        orch.select_racer(id);
                        ui_state.clear_notice();
                    }
                    ui::UserEvent::StartRace => match orch.start_race() {
                        Ok(run) => {
                            ui_state.clear_notice();
                            race = Some(Box::pin(run));
                        }
                        Err(err) => ui_state.set_notice(err.to_string()),
                    },
                    ui::UserEvent::Accelerate => {
                        accelerations.push(Box::pin(orch.accelerate()));
                    }
                    ui::UserEvent::NewRace => {
                        if orch.new_race() {
                            orch.renderer().clear_race();
                            ui_state.clear_notice();
                        }
                    }
                }
                redraw(orch, ui_state).wrap_err("draw after input failed")?;
            }
        }
    }
    Ok(())
}
