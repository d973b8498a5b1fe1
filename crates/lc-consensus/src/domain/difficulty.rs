//! Epoch-based difficulty adjustment
//!
//! Difficulty is a decimal multiplier on top of the maximum target:
//! `target = maximum_target / difficulty`. Below the first full epoch the
//! difficulty is 1. At every epoch boundary the previous epoch's difficulty
//! is scaled by `goal * epoch_length / elapsed`, so the value at any height
//! is the product of all multipliers since genesis.
//!
//! **Higher difficulty = lower target = harder.**

use super::error::DifficultyError;
use parking_lot::Mutex;
use primitive_types::{U256, U512};
use shared_types::Chain;
use std::collections::HashMap;
use std::fmt;
use std::ops::Mul;
use std::str::FromStr;
use tracing::{debug, info};

/// Products keep at most this many significant digits.
const MAX_SIGNIFICANT_DIGITS: usize = 38;

/// Exact decimal `mantissa * 10^exponent`.
///
/// Always normalised: the mantissa carries no trailing zeros (zero is
/// `0E0`), so derived equality is value equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Difficulty {
    mantissa: U256,
    exponent: i32,
}

impl Difficulty {
    pub fn new(mantissa: U256, exponent: i32) -> Self {
        Self { mantissa, exponent }.normalised()
    }

    pub fn one() -> Self {
        Self {
            mantissa: U256::one(),
            exponent: 0,
        }
    }

    pub fn from_integer(value: u64) -> Self {
        Self::new(U256::from(value), 0)
    }

    pub fn mantissa(&self) -> U256 {
        self.mantissa
    }

    pub fn exponent(&self) -> i32 {
        self.exponent
    }

    /// Convert a binary64 value by scaling with powers of ten until the
    /// scaled value has no fractional part.
    ///
    /// `150.0 / 90.0` becomes `16666666666666668E-16`.
    pub fn from_f64(value: f64) -> Result<Self, DifficultyError> {
        if !value.is_finite() || value < 0.0 {
            return Err(DifficultyError::InvalidDifficulty(value.to_string()));
        }

        let mut exponent = 0i32;
        let mut scale = 1.0f64;
        let mut mantissa = value.trunc();
        while (value * scale - mantissa).abs() > 0.0 {
            exponent -= 1;
            scale *= 10.0;
            mantissa = (value * scale).trunc();
            if !mantissa.is_finite() {
                return Err(DifficultyError::InvalidDifficulty(value.to_string()));
            }
        }

        if mantissa >= u128::MAX as f64 {
            return Err(DifficultyError::InvalidDifficulty(value.to_string()));
        }
        Ok(Self::new(U256::from(mantissa as u128), exponent))
    }

    /// True iff the value is at least 1.
    pub fn is_at_least_one(&self) -> bool {
        if self.mantissa.is_zero() {
            return false;
        }
        // m has d digits, so 10^(d-1) <= m < 10^d
        decimal_digits(self.mantissa) as i64 + self.exponent as i64 >= 1
    }

    /// `maximum_target / self`, floored.
    ///
    /// # Errors
    /// `InvalidDifficulty` when the difficulty is below 1.
    pub fn target(&self, maximum_target: U256) -> Result<U256, DifficultyError> {
        if !self.is_at_least_one() {
            return Err(DifficultyError::InvalidDifficulty(self.to_string()));
        }

        let max = u256_to_u512(maximum_target);
        let mantissa = u256_to_u512(self.mantissa);
        let quotient = if self.exponent >= 0 {
            // Anything past 10^77 exceeds every U256 target.
            if self.exponent > 77 {
                return Ok(U256::zero());
            }
            max / (mantissa * pow10(self.exponent as u32))
        } else {
            (max * pow10(self.exponent.unsigned_abs())) / mantissa
        };
        Ok(u512_to_u256(quotient))
    }

    fn normalised(mut self) -> Self {
        if self.mantissa.is_zero() {
            self.exponent = 0;
            return self;
        }
        let ten = U256::from(10u8);
        while decimal_digits(self.mantissa) > MAX_SIGNIFICANT_DIGITS {
            self.mantissa /= ten;
            self.exponent += 1;
        }
        while (self.mantissa % ten).is_zero() {
            self.mantissa /= ten;
            self.exponent += 1;
        }
        self
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Self::one()
    }
}

impl Mul for Difficulty {
    type Output = Difficulty;

    fn mul(self, rhs: Difficulty) -> Difficulty {
        // Both mantissas are below 10^38, the product fits in U256.
        Difficulty::new(
            self.mantissa.saturating_mul(rhs.mantissa),
            self.exponent + rhs.exponent,
        )
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}E{}", self.mantissa, self.exponent)
    }
}

impl FromStr for Difficulty {
    type Err = DifficultyError;

    /// Accepts `"{mantissa}E{exponent}"` or a plain integer.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DifficultyError::InvalidDifficulty(s.to_string());
        let (mantissa, exponent) = match s.split_once(['E', 'e']) {
            Some((m, e)) => (m, e.parse::<i32>().map_err(|_| invalid())?),
            None => (s, 0),
        };
        let mantissa = U256::from_dec_str(mantissa).map_err(|_| invalid())?;
        Ok(Self::new(mantissa, exponent))
    }
}

fn decimal_digits(value: U256) -> usize {
    value.to_string().len()
}

fn pow10(exponent: u32) -> U512 {
    U512::from(10u8).pow(U512::from(exponent))
}

fn u256_to_u512(value: U256) -> U512 {
    let mut bytes = [0u8; 64];
    value.to_big_endian(&mut bytes[32..]);
    U512::from_big_endian(&bytes)
}

/// Saturates at `U256::MAX`.
fn u512_to_u256(value: U512) -> U256 {
    let mut bytes = [0u8; 64];
    value.to_big_endian(&mut bytes);
    if bytes[..32].iter().any(|b| *b != 0) {
        return U256::MAX;
    }
    U256::from_big_endian(&bytes[32..])
}

/// The epoch that produced the difficulty at some height.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDifficultyUpdate {
    pub magic_number: String,
    pub begin_height: u64,
    pub end_height: u64,
    /// Seconds between the first and last block of the epoch, at least 1.
    pub total_seconds: i64,
}

/// Memoised difficulty calculator.
///
/// Cached values are keyed by the hash of the last block of the epoch that
/// produced them, so a replaced tip never serves a stale value.
pub struct DifficultyCalculator {
    seconds_per_block_goal: u64,
    epoch_length: u64,
    cache: Mutex<HashMap<(String, u64, u64), Difficulty>>,
}

impl DifficultyCalculator {
    pub fn new(seconds_per_block_goal: u64, epoch_length: u64) -> Self {
        Self {
            seconds_per_block_goal,
            epoch_length,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Difficulty for the chain's current height with the configured goal
    /// and epoch length. An empty chain has difficulty 1.
    pub fn current_difficulty(&self, chain: &Chain) -> Result<Difficulty, DifficultyError> {
        match u64::try_from(chain.current_height()) {
            Ok(height) => {
                self.difficulty(chain, height, self.seconds_per_block_goal, self.epoch_length)
            }
            Err(_) => Ok(Difficulty::one()),
        }
    }

    /// Difficulty a block built on `previous_hash` has to meet: the value
    /// at the parent's height, so siblings face the same target whatever
    /// else arrived first. A missing or unknown parent falls back to the
    /// current tip.
    ///
    /// Never below 1. After an epoch slower than the goal the maximum
    /// target stays in force.
    pub fn block_difficulty(
        &self,
        chain: &Chain,
        previous_hash: Option<&str>,
    ) -> Result<Difficulty, DifficultyError> {
        let raw = match previous_hash.and_then(|hash| chain.height_of(hash)) {
            Some(height) => {
                self.difficulty(chain, height, self.seconds_per_block_goal, self.epoch_length)?
            }
            None => self.current_difficulty(chain)?,
        };
        if raw.is_at_least_one() {
            return Ok(raw);
        }
        debug!(difficulty = %raw, "Difficulty below 1, using the maximum target");
        Ok(Difficulty::one())
    }

    pub fn difficulty(
        &self,
        chain: &Chain,
        height: u64,
        seconds_per_block_goal: u64,
        epoch_length: u64,
    ) -> Result<Difficulty, DifficultyError> {
        if epoch_length == 0 {
            return Err(DifficultyError::InvalidDifficulty(
                "epoch length must be positive".into(),
            ));
        }
        if height < epoch_length {
            return Ok(Difficulty::one());
        }

        let update = Self::previous_difficulty_update_info(height, chain, epoch_length)?;
        let key = chain
            .block_at(update.end_height)
            .map(|b| b.hash())
            .filter(|hash| !hash.is_empty())
            .map(|hash| (hash.to_string(), seconds_per_block_goal, epoch_length));

        if let Some(key) = &key {
            if let Some(cached) = self.cache.lock().get(key) {
                return Ok(*cached);
            }
        }

        let previous =
            self.difficulty(chain, update.begin_height, seconds_per_block_goal, epoch_length)?;
        let expected_seconds = seconds_per_block_goal.saturating_mul(epoch_length);
        let multiplier = expected_seconds as f64 / update.total_seconds as f64;
        let result = previous * Difficulty::from_f64(multiplier)?;

        debug!(
            begin = update.begin_height,
            end = update.end_height,
            elapsed = update.total_seconds,
            multiplier,
            "Difficulty epoch evaluated"
        );
        info!(height, difficulty = %result, "Difficulty adjusted");

        if let Some(key) = key {
            self.cache.lock().insert(key, result);
        }
        Ok(result)
    }

    /// Locate the epoch whose timing decides the difficulty at `height`.
    ///
    /// # Errors
    /// `InsufficientHistory` if the epoch boundary is below `epoch_length`
    /// or a block of the epoch is missing.
    pub fn previous_difficulty_update_info(
        height: u64,
        chain: &Chain,
        epoch_length: u64,
    ) -> Result<BlockDifficultyUpdate, DifficultyError> {
        let insufficient = DifficultyError::InsufficientHistory {
            height,
            epoch_length,
        };
        if epoch_length == 0 {
            return Err(insufficient);
        }
        let epoch_end = height - height % epoch_length;
        if epoch_end < epoch_length {
            return Err(insufficient);
        }

        let begin_height = epoch_end - epoch_length;
        let end_height = epoch_end - 1;
        let first = chain.block_at(begin_height).ok_or(insufficient.clone())?;
        let last = chain.block_at(end_height).ok_or(insufficient)?;

        let elapsed = last.header.timestamp - first.header.timestamp;
        Ok(BlockDifficultyUpdate {
            magic_number: chain.magic_number().to_string(),
            begin_height,
            end_height,
            total_seconds: elapsed.max(1),
        })
    }

    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }
}

impl fmt::Debug for DifficultyCalculator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DifficultyCalculator")
            .field("seconds_per_block_goal", &self.seconds_per_block_goal)
            .field("epoch_length", &self.epoch_length)
            .field("cached", &self.cache.lock().len())
            .finish()
    }
}
