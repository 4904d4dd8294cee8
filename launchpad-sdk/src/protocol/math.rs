use alloy_primitives::{utils::format_units, U256};

use crate::core::{
    constants::{BPS_DENOMINATOR, COMMON_SLIPPAGE_VALUES, MAX_SLIPPAGE_BPS, MIGRATION_TARGET_WEI, TOKEN_DECIMALS},
    SdkError, SdkResult,
};

/// Clamp a slippage tolerance into `[0, MAX_SLIPPAGE_BPS]`
pub fn clamp_slippage_bps(slippage_bps: i64) -> u16 {
    slippage_bps.clamp(0, MAX_SLIPPAGE_BPS as i64) as u16
}

/// Parse a slippage percentage typed by the user ("0.5" means 0.5%).
///
/// Non-numeric and negative input falls back to 0, anything above 25%
/// is capped at 25%.
pub fn parse_slippage_percent(input: &str) -> u16 {
    match input.trim().parse::<f64>() {
        Ok(percent) if percent.is_finite() => clamp_slippage_bps((percent * 100.0).round() as i64),
        Ok(percent) if percent == f64::INFINITY => MAX_SLIPPAGE_BPS,
        _ => 0,
    }
}

/// Render basis points back as the percentage string shown in the panel
pub fn slippage_bps_to_percent(slippage_bps: u16) -> String {
    let whole = slippage_bps / 100;
    let frac = slippage_bps % 100;
    if frac == 0 {
        whole.to_string()
    } else if frac % 10 == 0 {
        format!("{}.{}", whole, frac / 10)
    } else {
        format!("{}.{:02}", whole, frac)
    }
}

/// Whether `slippage_bps` is one of the quick-pick values
pub fn is_common_slippage(slippage_bps: u16) -> bool {
    COMMON_SLIPPAGE_VALUES
        .iter()
        .any(|preset| parse_slippage_percent(preset) == slippage_bps)
}

/// Minimum acceptable output for a quote under the given slippage.
///
/// Computes `floor(quoted * (10000 - bps) / 10000)` without overflowing for
/// quotes close to `U256::MAX`.
pub fn min_return(quoted: U256, slippage_bps: u16) -> U256 {
    let bps = clamp_slippage_bps(slippage_bps as i64) as u64;
    let denominator = U256::from(BPS_DENOMINATOR);
    let factor = U256::from(BPS_DENOMINATOR - bps);

    let whole = quoted / denominator;
    let rem = quoted % denominator;
    whole * factor + rem * factor / denominator
}

/// Fraction of the migration target already in the pool, in percent
pub fn bonding_progress_percent(native_reserve: U256) -> SdkResult<f64> {
    let reserve = wei_to_f64(native_reserve)?;
    let target = wei_to_f64(U256::from(MIGRATION_TARGET_WEI))?;
    Ok((reserve / target * 100.0).min(100.0))
}

/// Lossy conversion of an 18-decimal amount into a float for display
pub fn wei_to_f64(amount: U256) -> SdkResult<f64> {
    format_units(amount, TOKEN_DECIMALS)
        .map_err(|e| SdkError::Decode(e.to_string()))?
        .parse::<f64>()
        .map_err(|e| SdkError::Decode(e.to_string()))
}
