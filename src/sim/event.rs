/// Events emitted during a simulation step.
/// The presentation layer consumes these for sound and status text;
/// tests use them to observe what a tick did.

use serde::Serialize;

use crate::domain::cell::ShapeKind;

/// Why a runner left the match.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub enum EliminationCause {
    /// The descending block landed on its head or cut into its body.
    Crushed,
    /// A sideways block pushed it into a wall or grid cell.
    PushedIntoSolid,
    /// Still inside the block's footprint when the block solidified.
    Buried,
    /// Jumped head-first into a live block cell.
    HeadStrike,
    /// Dropped below the playfield.
    FellOut,
}

/// How a match ended. Evaluated in this order each tick; first match wins.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub enum Outcome {
    LineQuotaReached,
    AllRunnersEliminated,
    BlockEscaped,
    TimeExpired,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub enum Side {
    Controller,
    Runners,
}

impl Outcome {
    pub fn winner(self) -> Side {
        match self {
            Outcome::LineQuotaReached | Outcome::AllRunnersEliminated => Side::Controller,
            Outcome::BlockEscaped | Outcome::TimeExpired => Side::Runners,
        }
    }
}

#[derive(Clone, PartialEq, Debug, Serialize)]
pub enum GameEvent {
    CountdownFinished,
    BlockSpawned { kind: ShapeKind },
    BlockRotated,
    BlockSolidified { kind: ShapeKind },
    /// The block tried to solidify with a cell outside the grid.
    BlockEscaped,
    /// Every cell of the block was shot away.
    BlockDestroyed,
    LinesCleared { count: usize, remaining: u32 },
    RunnerEliminated { runner: usize, cause: EliminationCause },
    RunnerPushed { runner: usize, from: i32, to: i32 },
    /// A sideways push met a wall but the runner sat in a gap of the block.
    RunnerSheltered { runner: usize },
    RunnerClimbed { runner: usize, col: i32 },
    RunnerJumped { runner: usize },
    ShotFired { runner: usize, shots_left: u32 },
    BlockCellShot { runner: usize, row: i32, col: i32 },
    GridCellShot { runner: usize, row: i32, col: i32 },
    ShotsRecharged { runner: usize, shots: u32 },
    SpeedIncreased { drop_interval_ms: u32 },
    Paused,
    Resumed,
    MatchEnded { outcome: Outcome },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn winners_by_outcome() {
        assert_eq!(Outcome::LineQuotaReached.winner(), Side::Controller);
        assert_eq!(Outcome::AllRunnersEliminated.winner(), Side::Controller);
        assert_eq!(Outcome::BlockEscaped.winner(), Side::Runners);
        assert_eq!(Outcome::TimeExpired.winner(), Side::Runners);
    }

    #[test]
    fn events_serialise_with_their_fields() {
        let e = GameEvent::RunnerEliminated { runner: 2, cause: EliminationCause::FellOut };
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["RunnerEliminated"]["runner"], 2);
        assert_eq!(json["RunnerEliminated"]["cause"], "FellOut");
        assert_eq!(serde_json::to_value(GameEvent::Paused).unwrap(), "Paused");
    }
}
