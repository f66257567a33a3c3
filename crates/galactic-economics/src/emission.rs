// crates/galactic-economics/src/emission.rs
//
// Reward-token emission schedule with split-based halving.
//
// The base schedule emits `yearly_emission` wei per year, linearly per
// second from genesis. The owner applies "splits" at arbitrary times; after
// k splits the rate is base / (k + 1):
// - 0 splits: full rate
// - 1 split:  1/2
// - 2 splits: 1/3
// - 3 splits: 1/4
//
// Emission is divided between three allocations in fixed shares
// (defaults out of 1500): treasury 100, non-DeFi 980, farming pools 420.
//
// All quantities are integrals of the rate over time. The scheduler keeps
// one segment per split with the cumulative emission at its start, so any
// window [a, b] straddling any number of splits is charged at the right
// rate for each part.

use serde::{Deserialize, Serialize};

use galactic_core::error::GalacticError;
use galactic_core::math::mul_div;
use galactic_core::token::{tokens, Amount, Timestamp};

/// Seconds in a (365-day) year; the base rate is `yearly_emission / SECONDS_PER_YEAR`.
pub const SECONDS_PER_YEAR: u64 = 31_536_000;

/// Base yearly emission: 1.5 billion tokens.
pub const DEFAULT_YEARLY_EMISSION: Amount = tokens(1_500_000_000);

/// Treasury share of emission (100 / 1500).
pub const DEFAULT_TREASURY_SHARE: u32 = 100;

/// Non-DeFi reserve share of emission (980 / 1500).
pub const DEFAULT_NON_DEFI_SHARE: u32 = 980;

/// Farming-pool share of emission (420 / 1500).
pub const DEFAULT_POOL_SHARE: u32 = 420;

/// Destination class of a slice of emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Allocation {
    Treasury,
    NonDefi,
    Pools,
}

/// Fixed parameters of the emission schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmissionParams {
    /// Wei emitted per year before any split.
    pub yearly_emission: Amount,
    pub treasury_share: u32,
    pub non_defi_share: u32,
    pub pool_share: u32,
}

impl Default for EmissionParams {
    fn default() -> Self {
        Self {
            yearly_emission: DEFAULT_YEARLY_EMISSION,
            treasury_share: DEFAULT_TREASURY_SHARE,
            non_defi_share: DEFAULT_NON_DEFI_SHARE,
            pool_share: DEFAULT_POOL_SHARE,
        }
    }
}

impl EmissionParams {
    /// Sum of the three allocation shares.
    pub fn total_shares(&self) -> u128 {
        self.treasury_share as u128 + self.non_defi_share as u128 + self.pool_share as u128
    }

    /// Share assigned to `allocation`.
    pub fn share_of(&self, allocation: Allocation) -> u128 {
        match allocation {
            Allocation::Treasury => self.treasury_share as u128,
            Allocation::NonDefi => self.non_defi_share as u128,
            Allocation::Pools => self.pool_share as u128,
        }
    }

    /// # Errors
    /// `InvalidConfig` if the shares sum to zero.
    pub fn validate(&self) -> Result<(), GalacticError> {
        if self.total_shares() == 0 {
            return Err(GalacticError::InvalidConfig(
                "emission shares must not all be zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// One constant-rate stretch of the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitSegment {
    /// First second charged at this segment's rate.
    pub start: Timestamp,
    /// Rate divisor: `split_count + 1` at the time the segment opened.
    pub divisor: u64,
    /// Cumulative emission from genesis up to `start`.
    pub emitted_before: Amount,
}

/// Integrates the split-adjusted emission rate over time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmissionScheduler {
    params: EmissionParams,
    genesis: Timestamp,
    /// Never empty; `segments[0]` starts at genesis with divisor 1.
    segments: Vec<SplitSegment>,
}

impl EmissionScheduler {
    /// Create a schedule that starts emitting at `genesis`.
    ///
    /// # Errors
    /// `InvalidConfig` if `params` are invalid.
    pub fn new(genesis: Timestamp, params: EmissionParams) -> Result<Self, GalacticError> {
        params.validate()?;
        Ok(Self {
            params,
            genesis,
            segments: vec![SplitSegment {
                start: genesis,
                divisor: 1,
                emitted_before: 0,
            }],
        })
    }

    pub fn params(&self) -> &EmissionParams {
        &self.params
    }

    pub fn genesis(&self) -> Timestamp {
        self.genesis
    }

    /// Number of splits applied so far.
    pub fn split_count(&self) -> u32 {
        (self.segments.len() - 1) as u32
    }

    pub fn segments(&self) -> &[SplitSegment] {
        &self.segments
    }

    /// Time of the most recent split (genesis if none).
    pub fn last_split_time(&self) -> Timestamp {
        self.current_segment().start
    }

    fn current_segment(&self) -> &SplitSegment {
        // segments is never empty
        &self.segments[self.segments.len() - 1]
    }

    /// The segment in force at `t`. Several segments may share a start time
    /// when splits are applied in the same second; the latest one wins.
    fn segment_at(&self, t: Timestamp) -> &SplitSegment {
        self.segments
            .iter()
            .rev()
            .find(|s| s.start <= t)
            .unwrap_or(&self.segments[0])
    }

    fn year_divisor(divisor: u64) -> Result<Amount, GalacticError> {
        (SECONDS_PER_YEAR as u128)
            .checked_mul(divisor as u128)
            .ok_or_else(|| GalacticError::overflow("emission divisor"))
    }

    /// Total emission (all allocations) from genesis to `t`.
    ///
    /// # Errors
    /// `Arithmetic` if the cumulative figure does not fit in 128 bits.
    pub fn cumulative_emission(&self, t: Timestamp) -> Result<Amount, GalacticError> {
        if t <= self.genesis {
            return Ok(0);
        }
        let seg = self.segment_at(t);
        let elapsed = (t - seg.start) as u128;
        let in_segment = mul_div(elapsed, self.params.yearly_emission, Self::year_divisor(seg.divisor)?)
            .ok_or_else(|| GalacticError::overflow("segment emission"))?;
        seg.emitted_before
            .checked_add(in_segment)
            .ok_or_else(|| GalacticError::overflow("cumulative emission"))
    }

    /// Total emission over `[from, to]`; zero for an empty or reversed window.
    pub fn emitted_between(&self, from: Timestamp, to: Timestamp) -> Result<Amount, GalacticError> {
        if to <= from {
            return Ok(0);
        }
        let end = self.cumulative_emission(to)?;
        let start = self.cumulative_emission(from)?;
        end.checked_sub(start)
            .ok_or_else(|| GalacticError::InvalidState("emission went backwards".to_string()))
    }

    /// Cumulative emission attributed to `allocation` from genesis to `t`.
    pub fn cumulative_allocation(&self, t: Timestamp, allocation: Allocation) -> Result<Amount, GalacticError> {
        let total = self.cumulative_emission(t)?;
        mul_div(total, self.params.share_of(allocation), self.params.total_shares())
            .ok_or_else(|| GalacticError::overflow("allocation"))
    }

    /// Emission attributed to `allocation` over `[from, to]`.
    ///
    /// Computed as a difference of floored cumulative allocations, so
    /// consecutive windows always add up to the allocation over their union
    /// and no wei is lost to per-window rounding.
    pub fn allocation_between(
        &self,
        from: Timestamp,
        to: Timestamp,
        allocation: Allocation,
    ) -> Result<Amount, GalacticError> {
        if to <= from {
            return Ok(0);
        }
        let end = self.cumulative_allocation(to, allocation)?;
        let start = self.cumulative_allocation(from, allocation)?;
        end.checked_sub(start)
            .ok_or_else(|| GalacticError::InvalidState("allocation went backwards".to_string()))
    }

    /// Total emission rate (wei per second, floored) at `now`.
    pub fn current_emission_rate(&self, now: Timestamp) -> Result<Amount, GalacticError> {
        let seg = self.segment_at(now);
        Ok(self.params.yearly_emission / Self::year_divisor(seg.divisor)?)
    }

    /// Rate (wei per second, floored) of one allocation at `now`.
    pub fn allocation_rate(&self, now: Timestamp, allocation: Allocation) -> Result<Amount, GalacticError> {
        let seg = self.segment_at(now);
        let denominator = Self::year_divisor(seg.divisor)?
            .checked_mul(self.params.total_shares())
            .ok_or_else(|| GalacticError::overflow("allocation rate"))?;
        mul_div(self.params.yearly_emission, self.params.share_of(allocation), denominator)
            .ok_or_else(|| GalacticError::overflow("allocation rate"))
    }

    /// Rate of a single pool with `weight` out of `total_weight`.
    /// Zero when either weight is zero.
    pub fn pool_rate(&self, now: Timestamp, weight: u64, total_weight: u64) -> Result<Amount, GalacticError> {
        if weight == 0 || total_weight == 0 {
            return Ok(0);
        }
        let pools = self.allocation_rate(now, Allocation::Pools)?;
        mul_div(pools, weight as u128, total_weight as u128)
            .ok_or_else(|| GalacticError::overflow("pool rate"))
    }

    /// Apply one split at `now`: every later second is charged at
    /// base / (split_count + 1). Returns the new split count.
    ///
    /// Emission already accrued before `now` is untouched; callers only need
    /// to have settled whatever they mint on a per-call basis.
    ///
    /// # Errors
    /// `InvalidState` if `now` precedes the previous split (or genesis).
    pub fn apply_split(&mut self, now: Timestamp) -> Result<u32, GalacticError> {
        let last = *self.current_segment();
        if now < last.start {
            return Err(GalacticError::InvalidState(format!(
                "split at {} precedes previous split at {}",
                now, last.start
            )));
        }
        let emitted_before = self.cumulative_emission(now)?;
        let divisor = last
            .divisor
            .checked_add(1)
            .ok_or_else(|| GalacticError::overflow("split count"))?;
        self.segments.push(SplitSegment {
            start: now,
            divisor,
            emitted_before,
        });
        tracing::info!(
            "Emission split #{} at {}: rate divisor now {}",
            self.split_count(),
            now,
            divisor
        );
        Ok(self.split_count())
    }
}
