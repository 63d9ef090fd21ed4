use tracing::debug;

use super::engine::{derive_payment, derive_tax};
use super::types::{CalculatorConfig, DerivedBreakdown, LoanParameters, TaxSource, Unit};

/// Receives every breakdown the controller publishes.
pub trait BreakdownObserver {
    fn breakdown_changed(&mut self, breakdown: &DerivedBreakdown);
}

impl<F> BreakdownObserver for F
where
    F: FnMut(&DerivedBreakdown),
{
    fn breakdown_changed(&mut self, breakdown: &DerivedBreakdown) {
        self(breakdown)
    }
}

/// Owns the primary inputs of one calculator session and keeps the derived
/// tax and payment breakdown consistent with them.
///
/// Every mutating call runs the full chain, tax first and payment second,
/// before returning. Observers only hear about breakdowns that differ from
/// the previously published one.
pub struct DerivedStateController {
    fallback_tax_rate: f64,
    defaults: LoanParameters,
    unit: Option<Unit>,
    params: LoanParameters,
    tax_source: TaxSource,
    yearly_property_tax: f64,
    breakdown: DerivedBreakdown,
    observers: Vec<Box<dyn BreakdownObserver>>,
}

impl DerivedStateController {
    pub fn new(config: CalculatorConfig) -> Self {
        let mut controller = Self {
            fallback_tax_rate: config.fallback_tax_rate,
            defaults: config.defaults,
            unit: config.initial_unit.filter(Unit::is_usable),
            params: config.defaults,
            tax_source: TaxSource::UnitRate,
            yearly_property_tax: 0.0,
            breakdown: DerivedBreakdown::default(),
            observers: Vec::new(),
        };
        controller.yearly_property_tax = controller.derive_yearly_tax();
        controller.breakdown = controller.derive_breakdown();
        controller
    }

    /// Replaces the selected unit. Units without a finite positive price are
    /// dropped and the current selection is kept.
    pub fn select_unit(&mut self, unit: Unit) -> bool {
        if !unit.is_usable() {
            debug!(price = unit.price, unit_id = %unit.unit_id, "ignoring unusable unit");
            return false;
        }
        debug!(price = unit.price, unit_id = %unit.unit_id, "unit selected");
        self.unit = Some(unit);
        self.recompute_from_tax();
        true
    }

    pub fn clear_unit(&mut self) {
        self.unit = None;
        self.recompute_from_tax();
    }

    pub fn set_tax_source(&mut self, source: TaxSource) {
        self.tax_source = source;
        self.recompute_from_tax();
    }

    pub fn set_down_payment_percent(&mut self, value: f64) {
        self.params.down_payment_percent = value;
        self.recompute_payment();
    }

    pub fn set_interest_rate(&mut self, value: f64) {
        self.params.interest_rate_percent = value;
        self.recompute_payment();
    }

    pub fn set_loan_term(&mut self, value: f64) {
        self.params.loan_term_years = value;
        self.recompute_payment();
    }

    pub fn set_insurance_yearly(&mut self, value: f64) {
        self.params.insurance_yearly = value;
        self.recompute_payment();
    }

    pub fn reset_parameters(&mut self) {
        self.params = self.defaults;
        self.recompute_payment();
    }

    /// Registers an observer and hands it the current breakdown right away.
    pub fn subscribe<O>(&mut self, mut observer: O)
    where
        O: BreakdownObserver + 'static,
    {
        observer.breakdown_changed(&self.breakdown);
        self.observers.push(Box::new(observer));
    }

    pub fn current_breakdown(&self) -> DerivedBreakdown {
        self.breakdown
    }

    pub fn yearly_property_tax(&self) -> f64 {
        self.yearly_property_tax
    }

    pub fn selected_unit(&self) -> Option<&Unit> {
        self.unit.as_ref()
    }

    pub fn parameters(&self) -> LoanParameters {
        self.params
    }

    pub fn tax_source(&self) -> TaxSource {
        self.tax_source
    }

    pub fn fallback_tax_rate(&self) -> f64 {
        self.fallback_tax_rate
    }

    pub fn is_valid(&self) -> bool {
        self.breakdown.is_valid
    }

    fn derive_yearly_tax(&self) -> f64 {
        derive_tax(self.unit.as_ref(), self.tax_source, self.fallback_tax_rate)
    }

    fn derive_breakdown(&self) -> DerivedBreakdown {
        derive_payment(self.unit.as_ref(), self.yearly_property_tax, &self.params)
    }

    fn recompute_from_tax(&mut self) {
        self.yearly_property_tax = self.derive_yearly_tax();
        self.recompute_payment();
    }

    fn recompute_payment(&mut self) {
        let next = self.derive_breakdown();
        if next == self.breakdown {
            return;
        }
        self.breakdown = next;
        debug!(
            monthly_total = next.monthly_total,
            is_valid = next.is_valid,
            "breakdown published"
        );
        for observer in &mut self.observers {
            observer.breakdown_changed(&next);
        }
    }
}

impl Default for DerivedStateController {
    fn default() -> Self {
        Self::new(CalculatorConfig::default())
    }
}
