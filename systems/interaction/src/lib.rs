#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure interaction system that translates player intents into world commands.
//!
//! The system never inspects the world directly. Callers capture an
//! [`InteractionView`] describing the cursor, the selected tower and the
//! current placement legality, and the system decides which commands follow
//! from an [`Intent`] under the active [`InteractionMode`].

use lane_defence_core::{
    CellCoord, Command, InteractionMode, MatchState, PlacementError, TowerKind, MAX_GAME_SPEED,
    MIN_GAME_SPEED,
};
use tracing::debug;

/// Abstract player input, already decoded from whatever device produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intent {
    /// Moves the cursor by the provided deltas.
    MoveCursor {
        /// Horizontal offset in cells.
        column_delta: i32,
        /// Vertical offset in cells.
        row_delta: i32,
    },
    /// Confirms the action associated with the current mode.
    Confirm,
    /// Switches between normal and build mode.
    ToggleBuild,
    /// Abandons the current mode.
    Cancel,
    /// Links the selected tower to the n-th linkable tower.
    LinkWall(usize),
    /// Removes the n-th wall attached to the selected tower.
    RemoveWall(usize),
    /// Sells the selected tower.
    Sell,
    /// Pauses or resumes the running wave.
    TogglePause,
    /// Doubles the game speed.
    SpeedUp,
    /// Halves the game speed.
    SpeedDown,
    /// Restarts the match from scratch. Handled by the session, not this system.
    Restart,
}

/// Snapshot of everything the interaction system needs to interpret an intent.
#[derive(Clone, Copy, Debug)]
pub struct InteractionView<'a> {
    /// Current match state.
    pub state: MatchState,
    /// Current interaction mode.
    pub mode: InteractionMode,
    /// Cell under the cursor.
    pub cursor: CellCoord,
    /// Tower selected in select mode.
    pub selected: Option<CellCoord>,
    /// Whether a tower stands on the cursor cell.
    pub tower_at_cursor: bool,
    /// Result of checking a basic tower placement on the cursor cell.
    pub placement: Result<(), PlacementError>,
    /// Towers the selected tower may be linked to, in stable order.
    pub linkable: &'a [CellCoord],
    /// Towers already linked to the selected tower, in stable order.
    pub walls: &'a [CellCoord],
    /// Current game speed multiplier.
    pub game_speed: f32,
}

/// Interaction mode system turning intents into commands.
#[derive(Debug, Default)]
pub struct Interaction;

impl Interaction {
    /// Creates a new interaction system.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Emits the commands implied by `intent` for the provided view.
    ///
    /// Pause and speed intents are honoured in every state; everything else is
    /// ignored unless the match accepts construction.
    pub fn handle(&mut self, intent: Intent, view: &InteractionView<'_>, out: &mut Vec<Command>) {
        match intent {
            Intent::TogglePause => {
                out.push(Command::TogglePause);
                return;
            }
            Intent::SpeedUp => {
                out.push(Command::SetGameSpeed {
                    speed: (view.game_speed * 2.0).min(MAX_GAME_SPEED),
                });
                return;
            }
            Intent::SpeedDown => {
                out.push(Command::SetGameSpeed {
                    speed: (view.game_speed / 2.0).max(MIN_GAME_SPEED),
                });
                return;
            }
            Intent::Restart => return,
            _ => {}
        }

        if !view.state.accepts_construction() {
            debug!(?intent, state = ?view.state, "intent ignored outside active play");
            return;
        }

        if let Intent::MoveCursor {
            column_delta,
            row_delta,
        } = intent
        {
            out.push(Command::MoveCursor {
                column_delta,
                row_delta,
            });
            return;
        }

        match view.mode {
            InteractionMode::Normal => handle_normal(intent, view, out),
            InteractionMode::Build => handle_build(intent, view, out),
            InteractionMode::Select => handle_select(intent, view, out),
        }
    }
}

fn handle_normal(intent: Intent, view: &InteractionView<'_>, out: &mut Vec<Command>) {
    match intent {
        Intent::Confirm if view.tower_at_cursor => {
            out.push(Command::SelectTower { cell: view.cursor });
        }
        Intent::Confirm | Intent::ToggleBuild => out.push(Command::SetInteractionMode {
            mode: InteractionMode::Build,
        }),
        _ => {}
    }
}

fn handle_build(intent: Intent, view: &InteractionView<'_>, out: &mut Vec<Command>) {
    match intent {
        Intent::Confirm => {
            out.push(Command::PlaceTower {
                kind: TowerKind::Basic,
                cell: view.cursor,
            });
            if view.placement.is_ok() {
                out.push(Command::SetInteractionMode {
                    mode: InteractionMode::Normal,
                });
            }
        }
        Intent::ToggleBuild | Intent::Cancel => out.push(Command::SetInteractionMode {
            mode: InteractionMode::Normal,
        }),
        _ => {}
    }
}

fn handle_select(intent: Intent, view: &InteractionView<'_>, out: &mut Vec<Command>) {
    let Some(selected) = view.selected else {
        out.push(Command::SetInteractionMode {
            mode: InteractionMode::Normal,
        });
        return;
    };

    match intent {
        Intent::Confirm | Intent::Cancel => out.push(Command::SetInteractionMode {
            mode: InteractionMode::Normal,
        }),
        Intent::LinkWall(index) => {
            if let Some(&other) = view.linkable.get(index) {
                out.push(Command::AddWall {
                    a: selected,
                    b: other,
                });
            }
        }
        Intent::RemoveWall(index) => {
            if let Some(&other) = view.walls.get(index) {
                out.push(Command::RemoveWall {
                    a: selected,
                    b: other,
                });
            }
        }
        Intent::Sell => out.push(Command::SellTower { cell: selected }),
        _ => {}
    }
}
