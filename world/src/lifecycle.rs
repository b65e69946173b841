//! Match state machine, economy and difficulty bookkeeping.

use std::time::Duration;

use lane_defence_core::{
    CellCoord, Difficulty, Event, InteractionMode, MatchRules, MatchState, MAX_GAME_SPEED,
    MIN_GAME_SPEED, WAVE_CLEAR_BONUS,
};
use tracing::info;

/// Match-wide counters and phase tracking owned by the world.
#[derive(Clone, Debug)]
pub(crate) struct MatchRecord {
    pub(crate) rules: MatchRules,
    pub(crate) state: MatchState,
    pub(crate) mode: InteractionMode,
    pub(crate) cursor: CellCoord,
    pub(crate) selected: Option<CellCoord>,
    pub(crate) waves_completed: u32,
    pub(crate) total_waves: u32,
    pub(crate) countdown: Duration,
    pub(crate) run_time: Duration,
    pub(crate) money: u32,
    pub(crate) score: u32,
    pub(crate) waves_cleared: u32,
    pub(crate) difficulty: Difficulty,
    pub(crate) game_speed: f32,
    pub(crate) base_hp: u32,
}

impl MatchRecord {
    pub(crate) fn new(rules: MatchRules, total_waves: u32, base_hp: u32, cursor: CellCoord) -> Self {
        Self {
            rules,
            state: MatchState::Menu,
            mode: InteractionMode::Normal,
            cursor,
            selected: None,
            waves_completed: 0,
            total_waves,
            countdown: rules.first_countdown,
            run_time: Duration::ZERO,
            money: rules.starting_money,
            score: 0,
            waves_cleared: 0,
            difficulty: Difficulty::default(),
            game_speed: clamp_speed(rules.game_speed),
            base_hp,
        }
    }

    /// Leaves the menu and begins the first countdown.
    pub(crate) fn start(&mut self, out_events: &mut Vec<Event>) {
        if self.state != MatchState::Menu {
            return;
        }

        self.countdown = self.rules.first_countdown;
        self.transition(MatchState::PreWave, out_events);
    }

    /// Advances countdowns and run time according to the current state.
    pub(crate) fn advance(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        match self.state {
            MatchState::PreWave => {
                self.countdown = self.countdown.saturating_sub(dt);
                if self.countdown.is_zero() {
                    self.begin_next_wave(out_events);
                }
            }
            MatchState::InWave => {
                self.run_time = self.run_time.saturating_add(dt);
            }
            MatchState::Menu | MatchState::Paused | MatchState::Won | MatchState::Lost => {}
        }
    }

    fn begin_next_wave(&mut self, out_events: &mut Vec<Event>) {
        if self.waves_completed >= self.total_waves {
            self.transition(MatchState::Won, out_events);
            return;
        }

        self.transition(MatchState::InWave, out_events);
        info!(
            wave = self.waves_completed + 1,
            total = self.total_waves,
            "wave started"
        );
        out_events.push(Event::WaveStarted {
            wave: self.waves_completed,
            difficulty: self.difficulty,
        });
    }

    /// Finalises the active wave, awarding the clear bonus and escalating difficulty.
    pub(crate) fn complete_wave(&mut self, out_events: &mut Vec<Event>) {
        if self.state != MatchState::InWave {
            return;
        }

        let wave = self.waves_completed;
        self.waves_completed += 1;
        self.waves_cleared += 1;
        self.score = self.score.saturating_add(WAVE_CLEAR_BONUS);
        self.difficulty = self.difficulty.escalated();
        info!(wave = wave + 1, score = self.score, "wave cleared");
        out_events.push(Event::WaveCompleted { wave });

        if self.waves_completed >= self.total_waves {
            self.transition(MatchState::Won, out_events);
        } else {
            self.countdown = self.rules.inter_wave_delay;
            self.transition(MatchState::PreWave, out_events);
        }
    }

    pub(crate) fn toggle_pause(&mut self, out_events: &mut Vec<Event>) {
        match self.state {
            MatchState::InWave => self.transition(MatchState::Paused, out_events),
            MatchState::Paused => self.transition(MatchState::InWave, out_events),
            _ => {}
        }
    }

    /// Removes one base hit point, losing the match when none remain.
    pub(crate) fn damage_base(&mut self, out_events: &mut Vec<Event>) {
        self.base_hp = self.base_hp.saturating_sub(1);
        if self.base_hp == 0 && self.state != MatchState::Lost {
            out_events.push(Event::BaseDestroyed);
            self.transition(MatchState::Lost, out_events);
        }
    }

    pub(crate) fn credit_kill(&mut self, reward: u32) {
        self.money = self.money.saturating_add(reward);
        self.score = self.score.saturating_add(reward);
    }

    pub(crate) fn set_game_speed(&mut self, speed: f32, out_events: &mut Vec<Event>) {
        let speed = clamp_speed(speed);
        if (speed - self.game_speed).abs() > f32::EPSILON {
            self.game_speed = speed;
            out_events.push(Event::GameSpeedChanged { speed });
        }
    }

    pub(crate) fn set_mode(&mut self, mode: InteractionMode, out_events: &mut Vec<Event>) {
        if mode != InteractionMode::Select {
            self.selected = None;
        }
        if self.mode != mode {
            self.mode = mode;
            out_events.push(Event::InteractionModeChanged { mode });
        }
    }

    fn transition(&mut self, to: MatchState, out_events: &mut Vec<Event>) {
        let from = self.state;
        if from == to {
            return;
        }

        self.state = to;
        if to.is_finished() {
            info!(?to, score = self.score, "match finished");
        }
        out_events.push(Event::MatchStateChanged { from, to });
    }
}

fn clamp_speed(speed: f32) -> f32 {
    if speed.is_finite() {
        speed.clamp(MIN_GAME_SPEED, MAX_GAME_SPEED)
    } else {
        1.0
    }
}
