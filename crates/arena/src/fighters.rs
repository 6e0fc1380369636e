//! Server-side fighter placement for `start_game`.

use arena_protocol::{Collider, FighterAssignment, SessionId, Vec2};

/// Where and how fighters spawn when a match starts.
///
/// Participant `i` (in join order) spawns at
/// `first_spawn + (i * spacing, 0)`. With the defaults two players land
/// on the classic rectangles at (100, 300) and (500, 300).
#[derive(Debug, Clone, PartialEq)]
pub struct FighterLayout {
    pub character_name: String,
    pub initial_state: String,
    pub first_spawn: Vec2,
    pub spacing: f64,
    pub size: Vec2,
}

impl Default for FighterLayout {
    fn default() -> Self {
        Self {
            character_name: "warrior".to_string(),
            initial_state: "idle".to_string(),
            first_spawn: Vec2::new(100.0, 300.0),
            spacing: 400.0,
            size: Vec2::new(60.0, 40.0),
        }
    }
}

impl FighterLayout {
    /// One assignment per participant, in the given order.
    pub fn assign(&self, participants: &[SessionId]) -> Vec<FighterAssignment> {
        participants
            .iter()
            .enumerate()
            .map(|(slot, &id)| FighterAssignment {
                id,
                character_name: self.character_name.clone(),
                collider: Collider {
                    pos: Vec2::new(
                        self.first_spawn.x + slot as f64 * self.spacing,
                        self.first_spawn.y,
                    ),
                    size: self.size,
                },
                state: self.initial_state.clone(),
            })
            .collect()
    }
}
