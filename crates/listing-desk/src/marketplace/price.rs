//! Display-price parsing for strings such as "3.5 tỷ" or "20 triệu".

const BILLION_TOKENS: [&str; 2] = ["tỷ", "tỉ"];
const MILLION_TOKENS: [&str; 1] = ["triệu"];

/// Share of the range width granted on either side of a preference range.
pub const RANGE_TOLERANCE: f64 = 0.10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scale {
    Billion,
    Million,
    Unit,
}

impl Scale {
    fn detect(lowered: &str) -> Self {
        if BILLION_TOKENS.iter().any(|token| lowered.contains(token)) {
            Self::Billion
        } else if MILLION_TOKENS.iter().any(|token| lowered.contains(token)) {
            Self::Million
        } else {
            Self::Unit
        }
    }

    fn multiplier(self) -> f64 {
        match self {
            Self::Billion => 1e9,
            Self::Million => 1e6,
            Self::Unit => 1.0,
        }
    }
}

/// Parses a display price into VND. Unparsable input yields `0.0`.
pub fn parse_price(raw: &str) -> f64 {
    let lowered = raw.trim().to_lowercase();
    let scale = Scale::detect(&lowered);
    leading_number(&lowered, scale)
        .map(|value| value * scale.multiplier())
        .unwrap_or(0.0)
}

/// Reads the leading numeric literal.
///
/// A repeated separator groups thousands ("15.000.000"); with both kinds present the last
/// one is the decimal point ("1.250.000,5"). A lone separator is a decimal point, except
/// in a bare VND amount where it is followed by exactly three digits ("750.000").
fn leading_number(text: &str, scale: Scale) -> Option<f64> {
    let literal: String = text
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    let literal = literal.trim_end_matches(['.', ',']);

    let separators: Vec<(usize, char)> = literal
        .char_indices()
        .filter(|(_, c)| !c.is_ascii_digit())
        .collect();
    let decimal_at = match separators.as_slice() {
        [] => None,
        [(at, _)] => {
            let grouping = scale == Scale::Unit && literal.len() - at - 1 == 3;
            (!grouping).then_some(*at)
        }
        [(_, first), .., (last_at, last)] if first != last => Some(*last_at),
        _ => None,
    };

    let normalized: String = literal
        .char_indices()
        .filter_map(|(at, c)| match c {
            _ if Some(at) == decimal_at => Some('.'),
            '.' | ',' => None,
            digit => Some(digit),
        })
        .collect();

    let value = normalized.parse::<f64>().ok()?;
    value.is_finite().then_some(value)
}

/// Inclusive price bounds parsed from a "min-max" preference string.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    /// A minimum without its own scale word borrows the maximum's, so "1-5 tỷ" reads as
    /// 1 tỷ to 5 tỷ.
    pub fn parse(raw: &str) -> Option<Self> {
        let lowered = raw.trim().to_lowercase();
        let (low, high) = lowered.split_once('-')?;
        let (low, high) = (low.trim(), high.trim());

        let low_scale = Scale::detect(low);
        let high_scale = Scale::detect(high);
        let min = if low_scale == Scale::Unit {
            leading_number(low, high_scale)? * high_scale.multiplier()
        } else {
            parse_price(low)
        };
        let max = parse_price(high);

        if max <= 0.0 || min > max {
            return None;
        }

        Some(Self { min, max })
    }

    fn tolerance(&self) -> f64 {
        (self.max - self.min) * RANGE_TOLERANCE
    }

    /// Inclusive fit with the tolerance band applied to both bounds.
    pub fn fits(&self, price: f64) -> bool {
        if price <= 0.0 {
            return false;
        }
        let band = self.tolerance();
        price >= self.min - band && price <= self.max + band
    }
}
