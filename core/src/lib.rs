//! Rule-based compliance core for banking data products.
//!
//! Every check is a pure, synchronous pass over in-memory data. Policy is
//! loaded once (see [`config::PolicyConfig`]) and handed to each component
//! at construction.

pub mod compliance;
pub mod config;
pub mod error;
pub mod mapper;
pub mod pii;
pub mod product;
pub mod quality;
pub mod risk;
pub mod sql_guard;
pub mod table;
pub mod types;

pub use compliance::{ComplianceChecker, ValidationResult};
pub use config::PolicyConfig;
pub use error::{ComplianceError, ComplianceResult};
pub use pii::PiiExposureChecker;
pub use risk::{RiskDetector, RiskReport};
pub use sql_guard::SqlSafetyChecker;
pub use table::Table;
