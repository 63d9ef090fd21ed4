use serde::{Deserialize, Serialize};

pub const DEFAULT_FALLBACK_TAX_RATE: f64 = 0.0125;
pub const DEFAULT_UNIT_PRICE: f64 = 700_000.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_rate: Option<f64>,
    #[serde(default)]
    pub unit_id: String,
    #[serde(default)]
    pub plan: String,
}

impl Unit {
    pub fn priced(price: f64) -> Self {
        Self {
            price,
            tax_rate: None,
            unit_id: String::new(),
            plan: String::new(),
        }
    }

    pub fn is_usable(&self) -> bool {
        self.price.is_finite() && self.price > 0.0
    }

    /// Non-empty of `unit_id` and `plan`, joined with a bullet.
    pub fn label(&self) -> String {
        [self.unit_id.as_str(), self.plan.as_str()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" \u{2022} ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoanParameters {
    pub down_payment_percent: f64,
    pub interest_rate_percent: f64,
    pub loan_term_years: f64,
    pub insurance_yearly: f64,
}

impl Default for LoanParameters {
    fn default() -> Self {
        Self {
            down_payment_percent: 20.0,
            interest_rate_percent: 7.5,
            loan_term_years: 30.0,
            insurance_yearly: 1_200.0,
        }
    }
}

/// Where the yearly property tax comes from.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind", content = "value")]
pub enum TaxSource {
    /// The unit's own rate, or the configured fallback when the unit has none.
    #[default]
    UnitRate,
    Rate(f64),
    YearlyAmount(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedBreakdown {
    pub down_payment_amount: f64,
    pub yearly_property_tax: f64,
    pub monthly_principal_interest: f64,
    pub monthly_tax: f64,
    pub monthly_insurance: f64,
    pub monthly_total: f64,
    pub is_valid: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CalculatorConfig {
    pub fallback_tax_rate: f64,
    pub defaults: LoanParameters,
    pub initial_unit: Option<Unit>,
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        Self {
            fallback_tax_rate: DEFAULT_FALLBACK_TAX_RATE,
            defaults: LoanParameters::default(),
            initial_unit: Some(Unit::priced(DEFAULT_UNIT_PRICE)),
        }
    }
}
