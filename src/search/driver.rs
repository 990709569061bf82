//! Horizon search: encode and solve increasing horizons until one is SAT

use super::plan::Plan;
use crate::board::BoardModel;
use crate::config::{SearchConfig, SearchStrategy, Settings};
use crate::error::EncodingError;
use crate::sat::{Attempt, CadicalOracle, SatEncoder, SatOracle, SolveOutcome};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Stride of the binary strategy below `STRIDE_SWITCH`
const SHORT_STRIDE: usize = 10;
/// Stride from `STRIDE_SWITCH` upwards
const LONG_STRIDE: usize = 8;
const STRIDE_SWITCH: usize = 30;

/// How a horizon search ended
#[derive(Debug, Clone)]
pub enum SearchOutcome {
    /// A plan of minimal horizon within the searched range
    Solved {
        plan: Plan,
        horizon: usize,
        attempts: usize,
        elapsed: Duration,
    },
    /// Every horizon up to the limit is UNSAT, or the board can never be solved
    Exhausted {
        max_horizon: usize,
        attempts: usize,
        elapsed: Duration,
        reason: Option<String>,
    },
    /// The wall-clock budget ran out between two attempts
    TimedOut {
        last_horizon: Option<usize>,
        attempts: usize,
        elapsed: Duration,
    },
}

impl SearchOutcome {
    pub fn plan(&self) -> Option<&Plan> {
        match self {
            SearchOutcome::Solved { plan, .. } => Some(plan),
            _ => None,
        }
    }

    pub fn is_solved(&self) -> bool {
        matches!(self, SearchOutcome::Solved { .. })
    }

    pub fn attempts(&self) -> usize {
        match self {
            SearchOutcome::Solved { attempts, .. }
            | SearchOutcome::Exhausted { attempts, .. }
            | SearchOutcome::TimedOut { attempts, .. } => *attempts,
        }
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            SearchOutcome::Solved { elapsed, .. }
            | SearchOutcome::Exhausted { elapsed, .. }
            | SearchOutcome::TimedOut { elapsed, .. } => *elapsed,
        }
    }
}

/// Bookkeeping shared by both strategies
struct SearchState {
    start: Instant,
    timeout: Duration,
    attempts: usize,
    last_horizon: Option<usize>,
}

impl SearchState {
    fn new(timeout: Duration) -> Self {
        Self {
            start: Instant::now(),
            timeout,
            attempts: 0,
            last_horizon: None,
        }
    }

    fn out_of_time(&self) -> bool {
        self.start.elapsed() >= self.timeout
    }

    fn timed_out(&self) -> SearchOutcome {
        let elapsed = self.start.elapsed();
        warn!(
            attempts = self.attempts,
            last_horizon = ?self.last_horizon,
            elapsed_s = elapsed.as_secs_f64(),
            "horizon search timed out"
        );
        SearchOutcome::TimedOut {
            last_horizon: self.last_horizon,
            attempts: self.attempts,
            elapsed,
        }
    }

    fn solved(&self, mut plan: Plan) -> SearchOutcome {
        let elapsed = self.start.elapsed();
        plan.solve_time = elapsed;
        info!(horizon = plan.horizon, attempts = self.attempts, elapsed_s = elapsed.as_secs_f64(), "plan found");
        SearchOutcome::Solved {
            horizon: plan.horizon,
            plan,
            attempts: self.attempts,
            elapsed,
        }
    }

    fn exhausted(&self, max_horizon: usize, reason: Option<String>) -> SearchOutcome {
        let elapsed = self.start.elapsed();
        info!(max_horizon, attempts = self.attempts, "no plan within the horizon limit");
        SearchOutcome::Exhausted {
            max_horizon,
            attempts: self.attempts,
            elapsed,
            reason,
        }
    }
}

/// Runs one encoder across horizons according to the configured strategy
pub struct SearchDriver {
    encoder: SatEncoder,
    strategy: SearchStrategy,
    min_horizon: usize,
    max_horizon: usize,
    timeout: Duration,
}

impl SearchDriver {
    pub fn new(encoder: SatEncoder, config: &SearchConfig) -> Self {
        Self {
            encoder,
            strategy: config.strategy,
            min_horizon: config.min_horizon,
            max_horizon: config.max_horizon,
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }

    pub fn from_settings(board: BoardModel, settings: &Settings) -> Self {
        Self::new(SatEncoder::from_settings(board, settings), &settings.search)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn encoder(&self) -> &SatEncoder {
        &self.encoder
    }

    /// Search with a fresh CaDiCaL instance per horizon
    pub fn solve(&self) -> Result<SearchOutcome, EncodingError> {
        self.run(CadicalOracle::new)
    }

    /// Search with oracles built by `make_oracle`, one per attempt
    pub fn run<O, F>(&self, mut make_oracle: F) -> Result<SearchOutcome, EncodingError>
    where
        O: SatOracle,
        F: FnMut() -> O,
    {
        let mut state = SearchState::new(self.timeout);

        if let Some(reason) = self.encoder.structural_obstacle() {
            info!(%reason, "board cannot be solved at any horizon");
            return Ok(state.exhausted(self.max_horizon, Some(reason)));
        }

        info!(
            strategy = %self.strategy,
            mode = %self.encoder.options().mode,
            min_horizon = self.min_horizon,
            max_horizon = self.max_horizon,
            "starting horizon search"
        );

        match self.strategy {
            SearchStrategy::Linear => self.run_linear(&mut state, &mut make_oracle),
            SearchStrategy::Binary => self.run_binary(&mut state, &mut make_oracle),
        }
    }

    fn run_linear<O, F>(&self, state: &mut SearchState, make_oracle: &mut F) -> Result<SearchOutcome, EncodingError>
    where
        O: SatOracle,
        F: FnMut() -> O,
    {
        for horizon in self.min_horizon..=self.max_horizon {
            if state.out_of_time() {
                return Ok(state.timed_out());
            }
            if let Some(plan) = self.try_horizon(state, horizon, make_oracle)? {
                return Ok(state.solved(plan));
            }
        }
        Ok(state.exhausted(self.max_horizon, None))
    }

    /// Stride upwards until a SAT horizon, then bisect below it
    fn run_binary<O, F>(&self, state: &mut SearchState, make_oracle: &mut F) -> Result<SearchOutcome, EncodingError>
    where
        O: SatOracle,
        F: FnMut() -> O,
    {
        let mut lower = self.min_horizon;
        let mut horizon = self.min_horizon;

        let (mut upper, mut best) = loop {
            if state.out_of_time() {
                return Ok(state.timed_out());
            }
            if let Some(plan) = self.try_horizon(state, horizon, make_oracle)? {
                break (horizon, plan);
            }

            lower = horizon + 1;
            if horizon >= self.max_horizon {
                return Ok(state.exhausted(self.max_horizon, None));
            }
            let stride = if horizon < STRIDE_SWITCH { SHORT_STRIDE } else { LONG_STRIDE };
            horizon = (horizon + stride).min(self.max_horizon);
        };

        while lower < upper {
            if state.out_of_time() {
                return Ok(state.timed_out());
            }
            let middle = lower + (upper - lower) / 2;
            match self.try_horizon(state, middle, make_oracle)? {
                Some(plan) => {
                    upper = middle;
                    best = plan;
                }
                None => lower = middle + 1,
            }
        }

        Ok(state.solved(best))
    }

    /// One attempt on a fresh oracle; `Some` only on SAT
    fn try_horizon<O, F>(&self, state: &mut SearchState, horizon: usize, make_oracle: &mut F) -> Result<Option<Plan>, EncodingError>
    where
        O: SatOracle,
        F: FnMut() -> O,
    {
        let attempt_start = Instant::now();
        let mut oracle = make_oracle();
        let Attempt {
            outcome,
            plan,
            statistics,
            ..
        } = self.encoder.attempt(horizon, &mut oracle)?;

        state.attempts += 1;
        state.last_horizon = Some(horizon);
        info!(
            horizon,
            outcome = ?outcome,
            clauses = statistics.total_clauses,
            variables = statistics.total_variables,
            elapsed_ms = attempt_start.elapsed().as_millis() as u64,
            "horizon attempt"
        );

        if outcome == SolveOutcome::Unknown {
            warn!(horizon, "oracle returned no answer, treating horizon as unsolved");
        }
        Ok(plan)
    }
}
