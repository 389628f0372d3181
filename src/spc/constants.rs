//! Control chart factors A2, D3, D4 and d2.
//!
//! The standard table covers subgroup sizes n = 1..=5. The n = 1 row repeats
//! the n = 2 factors because an individuals chart estimates dispersion from
//! the two-point moving range. Larger subgroups can be supported by
//! extending a [`ConstantsTable`] explicitly.
//!
//! # References
//!
//! - Montgomery, D.C. (2019). *Introduction to Statistical Quality Control*, 8th ed.,
//!   Appendix Table VI.
//! - ASTM E2587 — Standard Practice for Use of Control Charts

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpcError};

/// Factors for one subgroup size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlConstants {
    /// X-bar limit factor: UCL/LCL = X-double-bar +/- A2 * R-bar.
    pub a2: f64,
    /// Range chart lower factor: LCL_R = D3 * R-bar.
    pub d3: f64,
    /// Range chart upper factor: UCL_R = D4 * R-bar.
    pub d4: f64,
    /// Mean of the relative range: sigma-hat = R-bar / d2.
    pub d2: f64,
}

impl ControlConstants {
    fn validate(&self, size: usize) -> Result<()> {
        let finite = [self.a2, self.d3, self.d4, self.d2]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0);
        if !finite || self.d2 == 0.0 || self.d4 < self.d3 {
            return Err(SpcError::config(
                "control constants",
                format!("factors for subgroup size {size} must be finite, non-negative, d2 > 0 and D4 >= D3"),
            ));
        }
        Ok(())
    }
}

/// Standard factors, index 0 corresponds to n = 1.
#[rustfmt::skip]
const STANDARD: [ControlConstants; 5] = [
    ControlConstants { a2: 1.880, d3: 0.0, d4: 3.267, d2: 1.128 },
    ControlConstants { a2: 1.880, d3: 0.0, d4: 3.267, d2: 1.128 },
    ControlConstants { a2: 1.023, d3: 0.0, d4: 2.574, d2: 1.693 },
    ControlConstants { a2: 0.729, d3: 0.0, d4: 2.282, d2: 2.059 },
    ControlConstants { a2: 0.577, d3: 0.0, d4: 2.114, d2: 2.326 },
];

/// Largest subgroup size in the standard table.
pub const MAX_STANDARD_SUBGROUP: usize = STANDARD.len();

/// Looks up the standard factors for subgroup size `n`.
///
/// # Errors
///
/// [`SpcError::UnsupportedSubgroupSize`] for `n == 0` or `n > 5`.
///
/// # Examples
///
/// ```
/// use spc_engine::spc::standard_constants;
///
/// let c = standard_constants(1).unwrap();
/// assert_eq!(c, standard_constants(2).unwrap());
/// assert!((c.d2 - 1.128).abs() < 1e-12);
/// assert!(standard_constants(6).is_err());
/// ```
pub fn standard_constants(n: usize) -> Result<ControlConstants> {
    n.checked_sub(1)
        .and_then(|idx| STANDARD.get(idx))
        .copied()
        .ok_or(SpcError::UnsupportedSubgroupSize { size: n })
}

/// Factor table keyed by subgroup size.
///
/// Starts from the standard rows; sizes beyond the standard table can be
/// added with [`ConstantsTable::extend`]. Standard rows cannot be replaced,
/// so the individuals-chart sigma stays identical across engines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstantsTable {
    entries: BTreeMap<usize, ControlConstants>,
}

impl ConstantsTable {
    /// The standard n = 1..=5 table.
    pub fn standard() -> Self {
        let entries = STANDARD
            .iter()
            .enumerate()
            .map(|(idx, c)| (idx + 1, *c))
            .collect();
        Self { entries }
    }

    /// Adds factors for a subgroup size the standard table does not cover.
    pub fn extend(&mut self, size: usize, constants: ControlConstants) -> Result<()> {
        if size <= MAX_STANDARD_SUBGROUP {
            return Err(SpcError::config(
                "control constants",
                format!("subgroup size {size} is already tabulated"),
            ));
        }
        constants.validate(size)?;
        self.entries.insert(size, constants);
        Ok(())
    }

    /// Builds the standard table plus `extra` rows.
    pub fn with_extensions(extra: &BTreeMap<usize, ControlConstants>) -> Result<Self> {
        let mut table = Self::standard();
        for (&size, &constants) in extra {
            table.extend(size, constants)?;
        }
        Ok(table)
    }

    /// Factors for subgroup size `n`.
    pub fn get(&self, n: usize) -> Result<ControlConstants> {
        self.entries
            .get(&n)
            .copied()
            .ok_or(SpcError::UnsupportedSubgroupSize { size: n })
    }

    /// Tabulated sizes in ascending order.
    pub fn sizes(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.keys().copied()
    }
}

impl Default for ConstantsTable {
    fn default() -> Self {
        Self::standard()
    }
}
