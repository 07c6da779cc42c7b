use crate::api::{
    PositionRecord,
    Racer,
    Track,
};
use color_eyre::eyre::Result;
use std::cmp::Ordering;

pub const PLAYER_MARKER: &str = " (you)";
pub const NEW_RACE_PROMPT: &str = "Ups! Please start a new race.";

/// Screen areas a view can be rendered into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Region {
    Tracks,
    Racers,
    Race,
    LeaderBoard,
    Accelerate,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LeaderboardRow {
    pub rank: usize,
    pub racer_id: u32,
    pub driver_name: String,
    pub segment: f64,
    pub is_player: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum View {
    Tracks(Vec<Track>),
    Racers(Vec<Racer>),
    RaceStart { track: Track, countdown: u8 },
    Countdown(u8),
    Leaderboard(Vec<LeaderboardRow>),
    Results(Vec<LeaderboardRow>),
    Error(String),
}

/// Replaces the contents of a screen region.
pub trait Renderer {
    fn render_at(&self, region: Region, view: View) -> Result<()>;
}

/// Live standings: furthest segment first, ties keep server order.
pub fn leaderboard(
    positions: &[PositionRecord],
    player_id: Option<u32>,
) -> Vec<LeaderboardRow> {
    let mut ordered: Vec<&PositionRecord> = positions.iter().collect();
    ordered.sort_by(|a, b| {
        b.segment.partial_cmp(&a.segment).unwrap_or(Ordering::Equal)
    });
    rows(ordered, player_id)
}

/// Final standings: ascending finishing rank, unranked records last.
pub fn results(
    positions: &[PositionRecord],
    player_id: Option<u32>,
) -> Vec<LeaderboardRow> {
    let mut ordered: Vec<&PositionRecord> = positions.iter().collect();
    ordered.sort_by_key(|p| final_position_key(p));
    rows(ordered, player_id)
}

pub fn order_by_final_position(positions: &mut [PositionRecord]) {
    positions.sort_by_key(final_position_key);
}

fn final_position_key(p: &PositionRecord) -> (bool, Option<u32>) {
    (p.final_position.is_none(), p.final_position)
}

fn rows(ordered: Vec<&PositionRecord>, player_id: Option<u32>) -> Vec<LeaderboardRow> {
    ordered
        .into_iter()
        .enumerate()
        .map(|(idx, p)| {
            let is_player = player_id == Some(p.id);
            let driver_name = if is_player {
                format!("{}{}", p.driver_name, PLAYER_MARKER)
            } else {
                p.driver_name.clone()
            };
            LeaderboardRow {
                rank: idx + 1,
                racer_id: p.id,
                driver_name,
                segment: p.segment,
                is_player,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    fn position(id: u32, segment: f64, final_position: Option<u32>) -> PositionRecord {
        PositionRecord {
            id,
            driver_name: format!("Racer {id}"),
            segment,
            final_position,
        }
    }

    #[test]
    fn leaderboard__segments__orders_descending_and_marks_player() {
        // given
        let positions = vec![
            position(1, 5.0, None),
            position(2, 9.0, None),
            position(3, 2.0, None),
        ];

        // when
        let rows = leaderboard(&positions, Some(3));

        // then
        let order: Vec<(usize, u32)> = rows.iter().map(|r| (r.rank, r.racer_id)).collect();
        assert_eq!(order, vec![(1, 2), (2, 1), (3, 3)]);
        assert_eq!(rows[2].driver_name, "Racer 3 (you)");
        assert!(rows[2].is_player);
        assert_eq!(rows[0].driver_name, "Racer 2");
    }

    #[test]
    fn leaderboard__tied_segments__keeps_server_order() {
        // given
        let positions = vec![
            position(7, 4.0, None),
            position(8, 6.0, None),
            position(9, 4.0, None),
        ];

        // when
        let rows = leaderboard(&positions, None);

        // then
        let ids: Vec<u32> = rows.iter().map(|r| r.racer_id).collect();
        assert_eq!(ids, vec![8, 7, 9]);
        assert!(rows.iter().all(|r| !r.is_player));
    }

    #[test]
    fn results__final_positions__orders_ascending() {
        // given
        let positions = vec![
            position(1, 201.0, Some(3)),
            position(2, 201.0, Some(1)),
            position(3, 201.0, Some(2)),
        ];

        // when
        let rows = results(&positions, Some(1));

        // then
        let ids: Vec<u32> = rows.iter().map(|r| r.racer_id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
        assert_eq!(rows[2].rank, 3);
        assert_eq!(rows[2].driver_name, "Racer 1 (you)");
    }

    #[test]
    fn results__missing_final_position__sorts_last() {
        // given
        let positions = vec![position(1, 50.0, None), position(2, 201.0, Some(1))];

        // when
        let rows = results(&positions, None);

        // then
        let ids: Vec<u32> = rows.iter().map(|r| r.racer_id).collect();
        assert_eq!(ids, vec![2, 1]);
    }
}
