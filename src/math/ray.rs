//! Compounding index values, precise to 27 digits.

use {
    crate::{
        error::CoreError,
        math::common::{mul_div, ray, Rounding, TryAdd, RAY_SCALE},
    },
    alloc::format,
    alloc::string::ToString,
    core::fmt,
    odra::casper_types::U256,
};

/// Interest index, `one()` meaning no interest has accrued
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Eq, Ord)]
pub struct Ray(pub U256);

impl Default for Ray {
    fn default() -> Self {
        Self::one()
    }
}

impl Ray {
    /// One
    pub fn one() -> Self {
        Self(ray())
    }

    /// Create a ray from its raw scaled value
    pub fn from_scaled_val(scaled_val: U256) -> Self {
        Self(scaled_val)
    }

    /// Return raw scaled value
    #[allow(clippy::wrong_self_convention)]
    pub fn to_scaled_val(&self) -> U256 {
        self.0
    }

    /// `amount * self`, the actual value of a scaled amount.
    pub fn scale_up(&self, scaled: U256, rounding: Rounding) -> Result<U256, CoreError> {
        mul_div(scaled, self.0, ray(), rounding)
    }

    /// `amount / self`, the scaled value of an actual amount.
    pub fn scale_down(&self, amount: U256, rounding: Rounding) -> Result<U256, CoreError> {
        mul_div(amount, ray(), self.0, rounding)
    }
}

impl fmt::Display for Ray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut scaled_val = self.0.to_string();
        if scaled_val.len() <= RAY_SCALE {
            let padding = "0".repeat(RAY_SCALE - scaled_val.len());
            scaled_val = format!("0.{}{}", padding, scaled_val);
        } else {
            scaled_val.insert(scaled_val.len() - RAY_SCALE, '.');
        }
        f.write_str(&scaled_val)
    }
}

impl TryAdd for Ray {
    fn try_add(self, rhs: Self) -> Result<Self, CoreError> {
        Ok(Self(self.0.try_add(rhs.0)?))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Ray::one()), "1.000000000000000000000000000");
    }

    #[test]
    fn test_scaling_rounds_as_asked() {
        let index = Ray(ray() + ray() / 3); // 1.333..
        let scaled = index.scale_down(U256::from(100u8), Rounding::Up).unwrap();
        assert_eq!(scaled, U256::from(76u8));
        assert_eq!(index.scale_down(U256::from(100u8), Rounding::Down), Ok(U256::from(75u8)));
        assert!(index.scale_up(scaled, Rounding::Up).unwrap() >= U256::from(100u8));
    }

    #[test]
    fn test_identity() {
        let amount = U256::from(5_000_000u64);
        assert_eq!(Ray::one().scale_up(amount, Rounding::Up), Ok(amount));
        assert_eq!(Ray::one().scale_down(amount, Rounding::Down), Ok(amount));
        assert_eq!(Ray::one().try_add(Ray::one()), Ok(Ray(ray() * U256::from(2u8))));
    }
}
