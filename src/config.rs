use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Point table for cleared groups
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    pub three_cells: u32,
    pub four_cells: u32,
    pub five_cells: u32,
    /// Added per cell beyond five
    pub bonus_per_extra_cell: u32,
    pub bomb_multiplier: u32,
    /// Upper bound on cascade passes after the initial clear
    pub max_cascade_passes: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            three_cells: 30,
            four_cells: 60,
            five_cells: 100,
            bonus_per_extra_cell: 20,
            bomb_multiplier: 2,
            max_cascade_passes: 64,
        }
    }
}

/// Which seat opens each round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOpener {
    /// Seat one opens odd rounds, seat two opens even rounds
    Alternate,
    /// Seat one opens every round
    SeatOne,
}

/// How cleared cells are replaced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillPolicy {
    /// Random colors from a generator seeded per session
    Random,
    /// Cleared cells stay empty
    LeaveEmpty,
}

#[derive(Debug, Clone)]
pub struct RulesConfig {
    pub total_rounds: u32,
    pub moves_per_turn: u32,
    pub round_opener: RoundOpener,
    /// A pop clearing at least this many cells earns a bomb
    pub bomb_award_group_size: usize,
    pub fill_policy: FillPolicy,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            total_rounds: 5,
            moves_per_turn: 2,
            round_opener: RoundOpener::Alternate,
            bomb_award_group_size: 5,
            fill_policy: FillPolicy::Random,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RewardConfig {
    pub win_trophies: i32,
    pub loss_trophies: i32,
    /// Share of the final score paid out as coins
    pub coin_percent: u32,
    /// Winning margin needed for three stars
    pub three_star_margin: i64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            win_trophies: 50,
            loss_trophies: -50,
            coin_percent: 10,
            three_star_margin: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TimingConfig {
    /// `None` disables the turn clock
    pub turn_timeout: Option<Duration>,
    /// How long a seat may stay absent before the session is abandoned
    pub disconnect_timeout: Duration,
    /// How long terminal sessions stay readable before eviction
    pub eviction_grace: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            turn_timeout: Some(Duration::from_secs(30)),
            disconnect_timeout: Duration::from_secs(30),
            eviction_grace: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BroadcastConfig {
    /// Events buffered per subscriber before it is dropped as lagging
    pub subscriber_buffer: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            subscriber_buffer: 256,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GameConfig {
    pub scoring: ScoringConfig,
    pub rules: RulesConfig,
    pub rewards: RewardConfig,
    pub timing: TimingConfig,
    pub broadcast: BroadcastConfig,
}

impl GameConfig {
    /// Defaults overridden by `HEXPOP_*` environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(rounds) = env_value("HEXPOP_TOTAL_ROUNDS") {
            config.rules.total_rounds = rounds;
        }
        if let Some(moves) = env_value("HEXPOP_MOVES_PER_TURN") {
            config.rules.moves_per_turn = moves;
        }
        if let Some(bonus) = env_value("HEXPOP_BONUS_PER_EXTRA_CELL") {
            config.scoring.bonus_per_extra_cell = bonus;
        }
        if let Some(seconds) = env_value::<u64>("HEXPOP_TURN_SECONDS") {
            config.timing.turn_timeout = (seconds > 0).then(|| Duration::from_secs(seconds));
        }
        if let Some(seconds) = env_value("HEXPOP_DISCONNECT_SECONDS") {
            config.timing.disconnect_timeout = Duration::from_secs(seconds);
        }
        if let Some(seconds) = env_value("HEXPOP_EVICTION_SECONDS") {
            config.timing.eviction_grace = Duration::from_secs(seconds);
        }

        config
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Unknown player ids get a profile on first contact
    pub auto_register: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            auto_register: true,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(addr) = std::env::var("HEXPOP_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(auto_register) = env_value("HEXPOP_AUTO_REGISTER") {
            config.auto_register = auto_register;
        }
        config
    }
}

fn env_value<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key = %key, value = %raw, "Ignoring unparsable configuration value");
            None
        }
    }
}
