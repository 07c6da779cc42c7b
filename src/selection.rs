use crate::api::RaceId;

/// The user's current choices plus the race they started.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionState {
    track_id: Option<u32>,
    racer_id: Option<u32>,
    race_id: Option<RaceId>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_track(&mut self, id: u32) {
        self.track_id = Some(id);
    }

    pub fn set_racer(&mut self, id: u32) {
        self.racer_id = Some(id);
    }

    pub fn set_race(&mut self, id: RaceId) {
        self.race_id = Some(id);
    }

    pub fn track_id(&self) -> Option<u32> {
        self.track_id
    }

    pub fn racer_id(&self) -> Option<u32> {
        self.racer_id
    }

    pub fn race_id(&self) -> Option<RaceId> {
        self.race_id
    }

    pub fn can_start_race(&self) -> bool {
        self.track_id.is_some() && self.racer_id.is_some()
    }

    /// Track and racer, if both have been chosen.
    pub fn race_request(&self) -> Option<(u32, u32)> {
        Some((self.track_id?, self.racer_id?))
    }
}
