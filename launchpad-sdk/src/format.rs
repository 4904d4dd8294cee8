//! Display helpers for amounts, times and addresses

use alloy_primitives::{Address, U256};
use chrono::{DateTime, Utc};

use crate::{
    api::{Candle, UsdPricePoint},
    protocol::wei_to_f64,
};

const SUFFIXES: [(f64, &str); 4] = [(1e12, "T"), (1e9, "B"), (1e6, "M"), (1e3, "k")];

/// 18-decimal amount as a float. Unit conversion cannot fail at 18 decimals.
fn to_units(amount: U256) -> f64 {
    wei_to_f64(amount).unwrap_or(0.0)
}

fn with_suffix(value: f64, render: impl Fn(f64, usize) -> String, decimals: [usize; 4]) -> Option<String> {
    SUFFIXES
        .iter()
        .zip(decimals)
        .find(|((threshold, _), _)| value >= *threshold)
        .map(|((threshold, suffix), d)| format!("{}{}", render(value / threshold, d), suffix))
}

fn fixed(value: f64, decimals: usize) -> String {
    format!("{:.*}", decimals, value)
}

/// Round to `decimals` places and drop trailing zeros
fn trimmed(value: f64, decimals: usize) -> String {
    let text = fixed(value, decimals);
    if !text.contains('.') {
        return text;
    }
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

/// Four decimals with a k/M/B/T suffix, eight decimals below one thousand
pub fn format_amount(amount: U256) -> String {
    let value = to_units(amount);
    with_suffix(value, fixed, [4; 4]).unwrap_or_else(|| fixed(value, 8))
}

/// Short form for cards and tables
pub fn format_amount_compact(amount: U256) -> String {
    let value = to_units(amount);
    with_suffix(value, fixed, [1, 2, 2, 2]).unwrap_or_else(|| fixed(value, 3))
}

/// Two decimals without trailing zeros. Values below one keep enough
/// precision to show three significant digits, up to six decimals.
pub fn format_amount_trimmed(amount: U256) -> String {
    let value = to_units(amount);
    if let Some(text) = with_suffix(value, trimmed, [2; 4]) {
        return text;
    }
    if value >= 1.0 {
        return trimmed(value, 2);
    }
    let decimals = if value > 0.0 {
        (3 - value.log10().floor() as i64).clamp(2, 6) as usize
    } else {
        6
    };
    trimmed(value, decimals)
}

/// "N seconds/minutes/hours/days ago"
pub fn format_relative_time(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - at).num_seconds().max(0);
    match seconds {
        s if s < 60 => format!("{} seconds ago", s),
        s if s < 3_600 => format!("{} minutes ago", s / 60),
        s if s < 86_400 => format!("{} hours ago", s / 3_600),
        s => format!("{} days ago", s / 86_400),
    }
}

/// First six hex digits, without the `0x` prefix
pub fn shorten_address(address: Address) -> String {
    format!("{:#x}", address)[2..8].to_string()
}

/// Last six hex digits
pub fn address_tail(address: Address) -> String {
    let hex = format!("{:#x}", address);
    hex[hex.len() - 6..].to_string()
}

/// Chart candles from consecutive price points. Each candle opens at the
/// previous point's price; the first opens at its own.
pub fn candles(points: &[UsdPricePoint]) -> Vec<Candle> {
    points
        .iter()
        .enumerate()
        .map(|(i, point)| {
            let open = if i == 0 {
                point.token_price_usd
            } else {
                points[i - 1].token_price_usd
            };
            let close = point.token_price_usd;
            Candle {
                time: point.timestamp.timestamp(),
                open,
                high: open.max(close),
                low: open.min(close),
                close,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::utils::parse_ether;
    use chrono::{Duration, TimeZone};

    fn ether(value: &str) -> U256 {
        parse_ether(value).unwrap()
    }

    #[test]
    fn test_format_amount_suffixes() {
        assert_eq!(format_amount(ether("1500")), "1.5000k");
        assert_eq!(format_amount(ether("2500000")), "2.5000M");
        assert_eq!(format_amount(ether("3000000000000")), "3.0000T");
        assert_eq!(format_amount(ether("0.5")), "0.50000000");
    }

    #[test]
    fn test_compact_and_trimmed() {
        assert_eq!(format_amount_compact(ether("1260000000000")), "1.3T");
        assert_eq!(format_amount_compact(ether("12.3456")), "12.346");
        assert_eq!(format_amount_trimmed(ether("1500")), "1.5k");
        assert_eq!(format_amount_trimmed(ether("2")), "2");
        assert_eq!(format_amount_trimmed(ether("0.0123456")), "0.01235");
        assert_eq!(format_amount_trimmed(ether("0.5")), "0.5");
        assert_eq!(format_amount_trimmed(U256::ZERO), "0");
    }

    #[test]
    fn test_relative_time() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        assert_eq!(format_relative_time(now - Duration::seconds(42), now), "42 seconds ago");
        assert_eq!(format_relative_time(now - Duration::minutes(5), now), "5 minutes ago");
        assert_eq!(format_relative_time(now - Duration::hours(23), now), "23 hours ago");
        assert_eq!(format_relative_time(now - Duration::days(3), now), "3 days ago");
        assert_eq!(format_relative_time(now + Duration::seconds(5), now), "0 seconds ago");
    }

    #[test]
    fn test_address_helpers() {
        let address: Address = "0x2a0B34a43b477fA9355AC2c8e54Da3c57067DDF4".parse().unwrap();
        assert_eq!(shorten_address(address), "2a0b34");
        assert_eq!(address_tail(address), "67ddf4");
    }

    #[test]
    fn test_candles_open_at_previous_close() {
        let at = |s| Utc.timestamp_opt(s, 0).unwrap();
        let points = vec![
            UsdPricePoint {
                token_price_usd: 1.0,
                timestamp: at(100),
            },
            UsdPricePoint {
                token_price_usd: 3.0,
                timestamp: at(200),
            },
            UsdPricePoint {
                token_price_usd: 2.0,
                timestamp: at(300),
            },
        ];

        let candles = candles(&points);
        assert_eq!(
            candles[0],
            Candle {
                time: 100,
                open: 1.0,
                high: 1.0,
                low: 1.0,
                close: 1.0
            }
        );
        assert_eq!((candles[1].open, candles[1].high, candles[1].low), (1.0, 3.0, 1.0));
        assert_eq!((candles[2].open, candles[2].high, candles[2].low), (3.0, 3.0, 2.0));
    }
}
