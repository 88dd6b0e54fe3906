// Price normalization into the single display currency (INR)

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

pub const DISPLAY_CURRENCY: &str = "INR";
pub const DISPLAY_SYMBOL: char = '₹';

// Static rates into INR; codes missing here pass through unconverted
const DEFAULT_RATES: [(&str, f64); 3] = [("USD", 83.0), ("EUR", 90.0), ("GBP", 103.0)];

// Fraction digits for display. Review and checkout show paise, the result
// list rounds to whole rupees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FractionDigits {
    Zero,
    #[default]
    Two,
}

impl FractionDigits {
    pub fn count(self) -> usize {
        match self {
            FractionDigits::Zero => 0,
            FractionDigits::Two => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConversionTable {
    target: String,
    symbol: char,
    rates: HashMap<String, f64>,
}

impl Default for ConversionTable {
    fn default() -> Self {
        let mut table = Self::new(DISPLAY_CURRENCY, DISPLAY_SYMBOL);
        for (code, rate) in DEFAULT_RATES {
            table = table.with_rate(code, rate);
        }
        table
    }
}

impl ConversionTable {
    pub fn new(target: &str, symbol: char) -> Self {
        Self {
            target: target.to_string(),
            symbol,
            rates: HashMap::new(),
        }
    }

    pub fn with_rate(mut self, code: &str, rate: f64) -> Self {
        self.rates.insert(code.to_string(), rate);
        self
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn rate(&self, currency_code: &str) -> f64 {
        if currency_code == self.target {
            return 1.0;
        }
        self.rates.get(currency_code).copied().unwrap_or(1.0)
    }

    pub fn normalize(
        &self,
        amount: f64,
        currency_code: &str,
        fraction_digits: FractionDigits,
    ) -> DisplayPrice {
        DisplayPrice {
            amount: amount * self.rate(currency_code),
            fraction_digits,
            symbol: self.symbol,
        }
    }
}

fn default_table() -> &'static ConversionTable {
    static TABLE: OnceLock<ConversionTable> = OnceLock::new();
    TABLE.get_or_init(ConversionTable::default)
}

// Converts an amount into the display currency using the default rate table.
pub fn normalize(amount: f64, currency_code: &str, fraction_digits: FractionDigits) -> DisplayPrice {
    default_table().normalize(amount, currency_code, fraction_digits)
}

// An amount already in the display currency. `Display` renders it with the
// currency symbol and en-IN digit grouping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayPrice {
    amount: f64,
    fraction_digits: FractionDigits,
    symbol: char,
}

impl DisplayPrice {
    pub fn new(amount: f64, fraction_digits: FractionDigits) -> Self {
        Self {
            amount,
            fraction_digits,
            symbol: DISPLAY_SYMBOL,
        }
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn fraction_digits(&self) -> FractionDigits {
        self.fraction_digits
    }

    pub fn with_fraction_digits(self, fraction_digits: FractionDigits) -> Self {
        Self {
            fraction_digits,
            ..self
        }
    }
}

impl fmt::Display for DisplayPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.amount.is_nan() {
            return write!(f, "{}NaN", self.symbol);
        }
        if self.amount.is_infinite() {
            let sign = if self.amount < 0.0 { "-" } else { "" };
            return write!(f, "{}{}∞", sign, self.symbol);
        }

        let digits = self.fraction_digits.count();
        let scale = 10f64.powi(digits as i32);
        // half away from zero, as the browser formatter rounds
        let rounded = (self.amount.abs() * scale).round() / scale;
        let text = format!("{:.*}", digits, rounded);
        let (int_part, frac_part) = match text.split_once('.') {
            Some((int_part, frac_part)) => (int_part, Some(frac_part)),
            None => (text.as_str(), None),
        };

        let sign = if self.amount < 0.0 && rounded != 0.0 { "-" } else { "" };
        write!(f, "{}{}{}", sign, self.symbol, group_indian(int_part))?;
        if let Some(frac_part) = frac_part {
            write!(f, ".{}", frac_part)?;
        }
        Ok(())
    }
}

// 1234567 -> 12,34,567: the last three digits, then groups of two
fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }

    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 2);
    for (i, c) in head.chars().enumerate() {
        if i > 0 && (head.len() - i) % 2 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped.push(',');
    grouped.push_str(tail);
    grouped
}
