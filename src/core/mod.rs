mod catalog;
mod controller;
mod engine;
mod input;
mod types;

pub use catalog::{Catalog, CatalogError, Listing};
pub use controller::{BreakdownObserver, DerivedStateController};
pub use engine::{compute, derive_payment, derive_tax, effective_tax_rate, round_half_up};
pub use input::{coerce_str, coerce_value, normalize_unit, unit_from_query};
pub use types::{
    CalculatorConfig, DEFAULT_FALLBACK_TAX_RATE, DEFAULT_UNIT_PRICE, DerivedBreakdown,
    LoanParameters, TaxSource, Unit,
};
