//! # spc-engine
//!
//! Statistical process control core: control limits, process capability,
//! sequential shift detection, Western Electric pattern rules and Pareto
//! loss attribution.
//!
//! Every engine is a pure function of an [`ObservationSeries`] and an
//! explicit configuration value. Results are plain, serializable data;
//! rendering, file I/O and data loading belong to the caller.
//!
//! ## Modules
//!
//! - [`spc`] — Individuals/moving-range and X̄-R charts, control constants,
//!   pattern rules
//! - [`capability`] — Cp, Cpk, Cpm, Pp, Ppk, PPM estimates, sigma level,
//!   improvement targets
//! - [`detection`] — EWMA and CUSUM charts
//! - [`pareto`] — Pareto ranking with vital-few bands and priorities
//! - [`monitor`] — Running several analyses per variable and combining their status
//! - [`config`] — JSON-loadable configuration for all engines
//! - [`stats`] — Descriptive statistics used by the engines
//!
//! ## Example
//!
//! ```
//! use spc_engine::ObservationSeries;
//! use spc_engine::capability::{analyze_capability, SpecLimits};
//! use spc_engine::spc::{individuals_chart, evaluate_rules, RuleConfig};
//!
//! let series = ObservationSeries::new(vec![10.0, 12.0, 11.0, 13.0, 50.0]).unwrap();
//!
//! let chart = individuals_chart(&series).unwrap();
//! assert!(chart.primary.upper_limit > chart.primary.center_line);
//!
//! let rules = evaluate_rules(&series, &RuleConfig::default()).unwrap();
//! assert!(!rules.is_in_control());
//!
//! let capability = analyze_capability(&series, &SpecLimits::new(20.0, 5.0).unwrap()).unwrap();
//! assert!(capability.ppm.expected_above_usl > 0.0);
//! ```
//!
//! ## Logging
//!
//! Engines emit `tracing` events (`debug` per computation, `trace` per
//! alarm). No subscriber is installed by the library.

pub mod capability;
pub mod config;
pub mod detection;
pub mod error;
pub mod monitor;
pub mod pareto;
pub mod series;
pub mod spc;
pub mod special;
pub mod stats;

pub use error::{ErrorKind, Result, SpcError};
pub use series::{GroupedSeries, ObservationSeries};
