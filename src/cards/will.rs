//! Will costs and will pools.
//!
//! ## Payment
//!
//! Colored requirements are paid from matching will first. The generic part
//! of a cost is paid from void will, then from the remaining colors in
//! canonical order. [`WillPool::pay`] is all-or-nothing: on failure the pool
//! is untouched.
//!
//! A cost with X is paid with a chosen X added to the generic part
//! ([`WillPool::pay_with_x`]).
//!
//! ```
//! use chase_rules::cards::{Attribute, WillCost, WillPool};
//!
//! let mut pool = WillPool::default();
//! pool.add(Attribute::Fire, 2);
//!
//! let cost = WillCost::parse("{R}{1}").unwrap();
//! assert!(pool.can_pay(&cost));
//! pool.pay(&cost).unwrap();
//! assert_eq!(pool.total(), 0);
//! ```

use serde::{Deserialize, Serialize};

use super::attributes::Attribute;
use crate::core::{RulesError, RulesResult};

/// A will cost: colored requirements plus a generic amount.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WillCost {
    /// Required will per colored attribute, indexed by [`Attribute::index`].
    /// The void slot is unused; generic will lives in `generic`.
    pub colored: [u8; 5],

    /// Will of any color.
    pub generic: u8,

    /// The cost includes X.
    pub has_x: bool,
}

impl WillCost {
    /// A free cost.
    pub const FREE: WillCost = WillCost {
        colored: [0; 5],
        generic: 0,
        has_x: false,
    };

    /// Generic-only cost.
    #[must_use]
    pub const fn generic(amount: u8) -> Self {
        Self {
            colored: [0; 5],
            generic: amount,
            has_x: false,
        }
    }

    /// Add colored requirements.
    #[must_use]
    pub fn with_color(mut self, attribute: Attribute, amount: u8) -> Self {
        match attribute {
            Attribute::Void => self.generic += amount,
            colored => self.colored[colored.index()] += amount,
        }
        self
    }

    /// Parse a cost string such as `"{R}{R}{1}"` or `"WW2"`.
    ///
    /// Unknown symbols are ignored. A generic amount above 255 is an error.
    pub fn parse(text: &str) -> RulesResult<Self> {
        let mut cost = Self::FREE;
        let mut digits = String::new();
        for ch in text.chars().filter(|c| !matches!(c, '{' | '}' | ' ')) {
            if ch.is_ascii_digit() {
                digits.push(ch);
                continue;
            }
            cost.flush_generic(&mut digits, text)?;
            match ch.to_ascii_uppercase() {
                'W' | 'L' => cost = cost.with_color(Attribute::Light, 1),
                'R' | 'F' => cost = cost.with_color(Attribute::Fire, 1),
                'U' => cost = cost.with_color(Attribute::Water, 1),
                'G' => cost = cost.with_color(Attribute::Wind, 1),
                'B' | 'D' => cost = cost.with_color(Attribute::Darkness, 1),
                'X' => cost.has_x = true,
                _ => {}
            }
        }
        cost.flush_generic(&mut digits, text)?;
        Ok(cost)
    }

    fn flush_generic(&mut self, digits: &mut String, text: &str) -> RulesResult<()> {
        if !digits.is_empty() {
            let total = digits
                .parse::<u32>()
                .ok()
                .and_then(|amount| amount.checked_add(u32::from(self.generic)))
                .and_then(|total| u8::try_from(total).ok())
                .ok_or_else(|| RulesError::illegal(format!("will cost `{}` is too large", text)))?;
            self.generic = total;
        }
        digits.clear();
        Ok(())
    }

    /// Required will of one colored attribute.
    #[must_use]
    pub fn colored_amount(&self, attribute: Attribute) -> u8 {
        match attribute {
            Attribute::Void => 0,
            colored => self.colored[colored.index()],
        }
    }

    /// Total will required (X counts as 0).
    #[must_use]
    pub fn total(&self) -> u32 {
        self.colored.iter().map(|&n| u32::from(n)).sum::<u32>() + u32::from(self.generic)
    }

    /// Check for a zero cost.
    #[must_use]
    pub fn is_free(&self) -> bool {
        self.total() == 0
    }
}

impl std::fmt::Display for WillCost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_free() && !self.has_x {
            return f.write_str("{0}");
        }
        if self.has_x {
            f.write_str("{X}")?;
        }
        if self.generic > 0 {
            write!(f, "{{{}}}", self.generic)?;
        }
        const SYMBOLS: [char; 5] = ['W', 'R', 'U', 'G', 'B'];
        for (symbol, &count) in SYMBOLS.iter().zip(self.colored.iter()) {
            for _ in 0..count {
                write!(f, "{{{}}}", symbol)?;
            }
        }
        Ok(())
    }
}

/// A player's available will.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WillPool {
    amounts: [u32; 6],
}

impl WillPool {
    /// Add will of one attribute.
    pub fn add(&mut self, attribute: Attribute, amount: u32) {
        self.amounts[attribute.index()] += amount;
    }

    /// Will of one attribute.
    #[must_use]
    pub fn amount(&self, attribute: Attribute) -> u32 {
        self.amounts[attribute.index()]
    }

    /// Total will.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.amounts.iter().sum()
    }

    /// Empty the pool.
    pub fn clear(&mut self) {
        self.amounts = [0; 6];
    }

    /// Check whether `cost` can be paid, with X as zero.
    #[must_use]
    pub fn can_pay(&self, cost: &WillCost) -> bool {
        self.can_pay_with_x(cost, 0)
    }

    /// Largest X affordable on top of `cost`.
    #[must_use]
    pub fn max_x(&self, cost: &WillCost) -> u32 {
        if self.can_pay(cost) {
            self.total() - cost.total()
        } else {
            0
        }
    }

    /// Check whether `cost` can be paid with `x` more generic will.
    #[must_use]
    pub fn can_pay_with_x(&self, cost: &WillCost, x: u32) -> bool {
        let mut remaining = 0;
        for attribute in Attribute::ALL {
            let have = self.amount(attribute);
            let need = u32::from(cost.colored_amount(attribute));
            if have < need {
                return false;
            }
            remaining += have - need;
        }
        remaining >= u32::from(cost.generic) + x
    }

    /// Pay `cost`, or fail without touching the pool.
    pub fn pay(&mut self, cost: &WillCost) -> RulesResult<()> {
        self.pay_with_x(cost, 0)
    }

    /// Pay `cost` with `x` more generic will, or fail without touching the
    /// pool.
    pub fn pay_with_x(&mut self, cost: &WillCost, x: u32) -> RulesResult<()> {
        if x > 0 && !cost.has_x {
            return Err(RulesError::illegal(format!("{} has no X", cost)));
        }
        if !self.can_pay_with_x(cost, x) {
            return Err(RulesError::insufficient(format!(
                "cannot pay {} with X={} from {} will",
                cost,
                x,
                self.total()
            )));
        }
        for attribute in Attribute::ALL {
            self.amounts[attribute.index()] -= u32::from(cost.colored_amount(attribute));
        }
        let mut generic = u32::from(cost.generic) + x;
        let order = std::iter::once(Attribute::Void).chain(Attribute::ALL.into_iter().take(5));
        for attribute in order {
            let slot = &mut self.amounts[attribute.index()];
            let paid = generic.min(*slot);
            *slot -= paid;
            generic -= paid;
            if generic == 0 {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // === Cost parsing ===

    #[test]
    fn test_parse_braced() {
        let cost = WillCost::parse("{R}{R}{2}").unwrap();
        assert_eq!(cost.colored_amount(Attribute::Fire), 2);
        assert_eq!(cost.generic, 2);
        assert_eq!(cost.total(), 4);
    }

    #[test]
    fn test_parse_compact_and_x() {
        let cost = WillCost::parse("XW12").unwrap();
        assert!(cost.has_x);
        assert_eq!(cost.colored_amount(Attribute::Light), 1);
        assert_eq!(cost.generic, 12);
    }

    #[test]
    fn test_parse_rejects_oversized_generic() {
        assert_eq!(WillCost::parse("{255}").unwrap().generic, 255);
        assert!(matches!(WillCost::parse("{256}"), Err(RulesError::IllegalAction { .. })));
        assert!(WillCost::parse("{200}{100}").is_err());
        assert!(WillCost::parse("99999999999").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(WillCost::parse("{1}{G}").unwrap().to_string(), "{1}{G}");
        assert_eq!(WillCost::FREE.to_string(), "{0}");
    }

    // === Payment ===

    #[test]
    fn test_pay_prefers_void_for_generic() {
        let mut pool = WillPool::default();
        pool.add(Attribute::Water, 1);
        pool.add(Attribute::Void, 1);

        pool.pay(&WillCost::generic(1)).unwrap();
        assert_eq!(pool.amount(Attribute::Water), 1);
        assert_eq!(pool.amount(Attribute::Void), 0);
    }

    #[test]
    fn test_pay_failure_leaves_pool() {
        let mut pool = WillPool::default();
        pool.add(Attribute::Fire, 3);

        let cost = WillCost::parse("{U}").unwrap();
        let err = pool.pay(&cost).unwrap_err();
        assert!(matches!(err, RulesError::InsufficientResource { .. }));
        assert_eq!(pool.amount(Attribute::Fire), 3);
    }

    #[test]
    fn test_colored_cannot_cover_other_color() {
        let mut pool = WillPool::default();
        pool.add(Attribute::Fire, 1);
        assert!(!pool.can_pay(&WillCost::parse("{G}").unwrap()));
        assert!(pool.can_pay(&WillCost::parse("{1}").unwrap()));
    }

    #[test]
    fn test_x_is_charged_as_generic() {
        let mut pool = WillPool::default();
        pool.add(Attribute::Fire, 4);
        let cost = WillCost::parse("{X}{R}").unwrap();

        assert_eq!(pool.max_x(&cost), 3);
        assert!(pool.can_pay_with_x(&cost, 3));
        assert!(!pool.can_pay_with_x(&cost, 4));
        assert!(pool.pay_with_x(&cost, 4).is_err());
        assert_eq!(pool.total(), 4);

        pool.pay_with_x(&cost, 2).unwrap();
        assert_eq!(pool.total(), 1);
    }

    #[test]
    fn test_x_needs_an_x_cost() {
        let mut pool = WillPool::default();
        pool.add(Attribute::Fire, 4);
        let err = pool.pay_with_x(&WillCost::generic(1), 1).unwrap_err();
        assert!(matches!(err, RulesError::IllegalAction { .. }));
        assert_eq!(pool.total(), 4);
    }
}
