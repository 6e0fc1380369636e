//! Room capacity limits and registry configuration.

use arena_protocol::{RoomSettings, RoomStatus};

use crate::RoomError;

// ---------------------------------------------------------------------------
// RoomLimits
// ---------------------------------------------------------------------------

/// Validated capacity settings for one room.
///
/// Built from the client's [`RoomSettings`] with `TryFrom`, which is the
/// only place the raw integers are checked:
///
/// - `max_players > 0`
/// - `need_players > 0`
/// - `need_players <= max_players` (otherwise the room could never start)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomLimits {
    /// Hard cap on members.
    pub max_players: usize,
    /// Members required before the room becomes `Ready`.
    pub need_players: usize,
}

impl RoomLimits {
    /// The status a room with `members` players has outside a match.
    pub fn status_for(&self, members: usize) -> RoomStatus {
        if members >= self.need_players {
            RoomStatus::Ready
        } else {
            RoomStatus::Waiting
        }
    }
}

impl TryFrom<RoomSettings> for RoomLimits {
    type Error = RoomError;

    fn try_from(settings: RoomSettings) -> Result<Self, Self::Error> {
        let max_players = usize::try_from(settings.max_players)
            .ok()
            .filter(|&n| n > 0)
            .ok_or(RoomError::InvalidSettings("invalid max players count"))?;
        let need_players = usize::try_from(settings.need_players)
            .ok()
            .filter(|&n| n > 0)
            .ok_or(RoomError::InvalidSettings("invalid needed players count"))?;
        if need_players > max_players {
            return Err(RoomError::InvalidSettings(
                "needed players exceeds max players",
            ));
        }
        Ok(Self {
            max_players,
            need_players,
        })
    }
}

// ---------------------------------------------------------------------------
// RegistryConfig
// ---------------------------------------------------------------------------

/// How the registry generates room codes.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Number of decimal digits in a room code.
    ///
    /// Default: 6.
    pub code_len: usize,

    /// How many random codes to try before giving up with
    /// [`RoomError::CodeSpaceExhausted`].
    ///
    /// Default: 100.
    pub code_attempts: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            code_len: 6,
            code_attempts: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(max_players: i64, need_players: i64) -> RoomSettings {
        RoomSettings {
            max_players,
            need_players,
        }
    }

    #[test]
    fn test_room_limits_valid_settings_converts() {
        let limits = RoomLimits::try_from(settings(4, 2)).unwrap();
        assert_eq!(limits.max_players, 4);
        assert_eq!(limits.need_players, 2);
    }

    #[test]
    fn test_room_limits_zero_or_negative_max_is_invalid() {
        for max in [0, -1, -100] {
            let err = RoomLimits::try_from(settings(max, 1)).unwrap_err();
            assert_eq!(err, RoomError::InvalidSettings("invalid max players count"));
        }
    }

    #[test]
    fn test_room_limits_zero_need_is_invalid() {
        let err = RoomLimits::try_from(settings(2, 0)).unwrap_err();
        assert!(matches!(err, RoomError::InvalidSettings(_)));
    }

    #[test]
    fn test_room_limits_need_above_max_is_invalid() {
        let err = RoomLimits::try_from(settings(2, 3)).unwrap_err();
        assert_eq!(
            err,
            RoomError::InvalidSettings("needed players exceeds max players")
        );
    }

    #[test]
    fn test_status_for_follows_need_players() {
        let limits = RoomLimits::try_from(settings(4, 2)).unwrap();
        assert_eq!(limits.status_for(0), RoomStatus::Waiting);
        assert_eq!(limits.status_for(1), RoomStatus::Waiting);
        assert_eq!(limits.status_for(2), RoomStatus::Ready);
        assert_eq!(limits.status_for(4), RoomStatus::Ready);
    }

    #[test]
    fn test_registry_config_default() {
        let config = RegistryConfig::default();
        assert_eq!(config.code_len, 6);
        assert_eq!(config.code_attempts, 100);
    }
}
