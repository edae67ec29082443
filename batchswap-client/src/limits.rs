//! Conversion of simulated asset deltas into slippage bounded limits.
//!
//! Limits follow the Vault's sign convention: a positive limit is the most the caller is willing
//! to send, a negative limit is the least (in magnitude) the caller accepts to receive. Every
//! involved asset is adjusted by `delta + ceil(|delta| * slippage)`, which rounds input limits up
//! and output limit magnitudes down. Rounding therefore never tightens a bound past the
//! simulated amount.
use std::{collections::HashSet, fmt, str::FromStr};

use batchswap_common::{
    models::{Limits, SwapKind, SwapsError},
    Address, I256, U256,
};
use tracing::trace;

/// Fixed point scale of [`Slippage`]. `WAD` represents 100%.
pub const WAD: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

const WAD_DECIMALS: usize = 18;
const BPS_SCALE: u64 = 100_000_000_000_000;

/// Fractional slippage tolerance held as a WAD scaled integer in `[0, 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Slippage(U256);

impl Slippage {
    pub const ZERO: Slippage = Slippage(U256::ZERO);

    pub fn from_wad(wad: U256) -> Result<Self, SwapsError> {
        if wad >= WAD {
            return Err(SwapsError::InvalidSlippage(format!(
                "{wad} is not below 100% ({WAD})"
            )));
        }
        Ok(Self(wad))
    }

    /// Slippage in basis points, `100` is 1%.
    pub fn from_bps(bps: u32) -> Result<Self, SwapsError> {
        Self::from_wad(U256::from(bps) * U256::from(BPS_SCALE))
    }

    pub fn wad(&self) -> U256 {
        self.0
    }

    /// `ceil(amount * self)`, or `None` on overflow.
    fn scale_up(&self, amount: U256) -> Option<U256> {
        let whole = (amount / WAD).checked_mul(self.0)?;
        // remainder and slippage are both below WAD, so their product fits
        let fraction = ((amount % WAD) * self.0 + WAD - U256::from(1)) / WAD;
        whole.checked_add(fraction)
    }
}

/// Parses a decimal fraction such as `"0.01"` (1%). Up to 18 fractional digits are accepted.
impl FromStr for Slippage {
    type Err = SwapsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let invalid = |reason: &str| SwapsError::InvalidSlippage(format!("'{s}' {reason}"));
        if raw.starts_with('-') {
            return Err(invalid("is negative"));
        }
        let (int_part, frac_part) = raw
            .split_once('.')
            .unwrap_or((raw, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid("is not a decimal number"));
        }
        if !int_part
            .chars()
            .chain(frac_part.chars())
            .all(|c| c.is_ascii_digit())
        {
            return Err(invalid("is not a decimal number"));
        }
        if frac_part.len() > WAD_DECIMALS {
            return Err(invalid("has more than 18 decimals"));
        }
        let digits = format!("{int_part}{frac_part:0<WAD_DECIMALS$}");
        let wad = U256::from_str_radix(&digits, 10).map_err(|_| invalid("is out of range"))?;
        Self::from_wad(wad).map_err(|_| invalid("must be below 1"))
    }
}

impl fmt::Display for Slippage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let frac = format!("{:0>WAD_DECIMALS$}", self.0.to_string());
        let frac = frac.trim_end_matches('0');
        if frac.is_empty() {
            write!(f, "0")
        } else {
            write!(f, "0.{frac}")
        }
    }
}

/// Computes the limit for every asset of a simulated batch swap.
///
/// Assets listed in `tokens_in` or `tokens_out` get `delta + ceil(|delta| * slippage)`, all other
/// assets get `0`. `swap_type` does not change the bounds: the Vault enforces limits the same way
/// for both kinds.
pub fn compute_limits(
    tokens_in: &[Address],
    tokens_out: &[Address],
    swap_type: SwapKind,
    deltas: &[I256],
    assets: &[Address],
    slippage: Slippage,
) -> Result<Limits, SwapsError> {
    if deltas.len() != assets.len() {
        return Err(SwapsError::InvalidInput(format!(
            "got {} deltas for {} assets",
            deltas.len(),
            assets.len()
        )));
    }
    trace!(%swap_type, %slippage, "Computing limits");

    let involved: HashSet<&Address> = tokens_in
        .iter()
        .chain(tokens_out)
        .collect();

    assets
        .iter()
        .zip(deltas)
        .map(|(asset, delta)| {
            if !involved.contains(asset) {
                return Ok(I256::ZERO);
            }
            let overflow = || {
                SwapsError::InvalidInput(format!("limit for {asset} overflows (delta {delta})"))
            };
            let adjustment = slippage
                .scale_up(delta.unsigned_abs())
                .ok_or_else(overflow)?;
            let adjustment = I256::try_from(adjustment).map_err(|_| overflow())?;
            delta
                .checked_add(adjustment)
                .ok_or_else(overflow)
        })
        .collect()
}
