use super::types::{DerivedBreakdown, LoanParameters, TaxSource, Unit};

const MONTHS_PER_YEAR: f64 = 12.0;

pub fn compute(price: f64, yearly_tax: f64, params: &LoanParameters) -> DerivedBreakdown {
    if !inputs_are_usable(price, yearly_tax, params) {
        return degenerate_breakdown(params.insurance_yearly);
    }

    let down_payment_amount = price * (params.down_payment_percent / 100.0);
    let loan_amount = price - down_payment_amount;
    let monthly_rate = params.interest_rate_percent / 100.0 / MONTHS_PER_YEAR;
    let num_payments = params.loan_term_years * MONTHS_PER_YEAR;

    let monthly_principal_interest = if monthly_rate > 0.0 {
        let growth = (1.0 + monthly_rate).powf(num_payments);
        loan_amount * (monthly_rate * growth) / (growth - 1.0)
    } else {
        loan_amount / num_payments
    };

    let monthly_tax = round_half_up(yearly_tax / MONTHS_PER_YEAR);
    let monthly_insurance = params.insurance_yearly / MONTHS_PER_YEAR;
    let monthly_total = monthly_principal_interest + monthly_tax + monthly_insurance;

    if !(down_payment_amount.is_finite()
        && monthly_principal_interest.is_finite()
        && monthly_total.is_finite())
    {
        return degenerate_breakdown(params.insurance_yearly);
    }

    DerivedBreakdown {
        down_payment_amount,
        yearly_property_tax: yearly_tax,
        monthly_principal_interest,
        monthly_tax,
        monthly_insurance,
        monthly_total,
        is_valid: true,
    }
}

pub fn effective_tax_rate(unit: &Unit, fallback_tax_rate: f64) -> f64 {
    unit.tax_rate.unwrap_or(fallback_tax_rate)
}

pub fn derive_tax(unit: Option<&Unit>, source: TaxSource, fallback_tax_rate: f64) -> f64 {
    match (source, unit) {
        (TaxSource::YearlyAmount(amount), _) => amount,
        (_, None) => 0.0,
        (TaxSource::UnitRate, Some(unit)) => {
            round_half_up(unit.price * effective_tax_rate(unit, fallback_tax_rate))
        }
        (TaxSource::Rate(rate), Some(unit)) => round_half_up(unit.price * rate),
    }
}

pub fn derive_payment(
    unit: Option<&Unit>,
    yearly_tax: f64,
    params: &LoanParameters,
) -> DerivedBreakdown {
    let price = unit.map_or(0.0, |unit| unit.price);
    compute(price, yearly_tax, params)
}

/// Rounds to the nearest integer with ties going toward positive infinity.
pub fn round_half_up(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let floor = value.floor();
    if value - floor >= 0.5 {
        floor + 1.0
    } else {
        floor
    }
}

fn inputs_are_usable(price: f64, yearly_tax: f64, params: &LoanParameters) -> bool {
    let all_finite = [
        price,
        yearly_tax,
        params.down_payment_percent,
        params.interest_rate_percent,
        params.loan_term_years,
        params.insurance_yearly,
    ]
    .iter()
    .all(|v| v.is_finite());

    all_finite
        && price > 0.0
        && params.down_payment_percent >= 0.0
        && params.interest_rate_percent >= 0.0
        && params.loan_term_years > 0.0
}

// Insurance does not depend on the loan, so it survives invalid loan inputs.
fn degenerate_breakdown(insurance_yearly: f64) -> DerivedBreakdown {
    let monthly_insurance = if insurance_yearly.is_finite() {
        insurance_yearly / MONTHS_PER_YEAR
    } else {
        0.0
    };
    DerivedBreakdown {
        monthly_insurance,
        monthly_total: monthly_insurance,
        ..DerivedBreakdown::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, prop_assert_eq, prop_assume, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_params() -> LoanParameters {
        LoanParameters {
            down_payment_percent: 20.0,
            interest_rate_percent: 7.5,
            loan_term_years: 30.0,
            insurance_yearly: 1_200.0,
        }
    }

    fn assert_degenerate(breakdown: &DerivedBreakdown, insurance_yearly: f64) {
        assert!(!breakdown.is_valid);
        assert_eq!(breakdown.down_payment_amount, 0.0);
        assert_eq!(breakdown.yearly_property_tax, 0.0);
        assert_eq!(breakdown.monthly_principal_interest, 0.0);
        assert_eq!(breakdown.monthly_tax, 0.0);
        assert_eq!(breakdown.monthly_insurance, insurance_yearly / 12.0);
        assert_eq!(breakdown.monthly_total, insurance_yearly / 12.0);
    }

    #[test]
    fn scenario_unit_rate_with_interest() {
        let unit = Unit {
            price: 650_000.0,
            tax_rate: Some(0.0078),
            unit_id: "Lot-12".to_string(),
            plan: "Plan-A".to_string(),
        };
        let yearly_tax = derive_tax(Some(&unit), TaxSource::UnitRate, 0.0125);
        assert_eq!(yearly_tax, 5_070.0);

        let breakdown = derive_payment(Some(&unit), yearly_tax, &sample_params());
        assert!(breakdown.is_valid);
        assert_approx(breakdown.down_payment_amount, 130_000.0);
        assert_eq!(breakdown.monthly_tax, 423.0);
        assert_approx(breakdown.monthly_principal_interest, 3_635.915_444_474_4);
        assert_approx(breakdown.monthly_insurance, 100.0);
        assert_approx(
            breakdown.monthly_total,
            3_635.915_444_474_4 + 423.0 + 100.0,
        );
    }

    #[test]
    fn scenario_zero_interest_uses_fallback_rate() {
        let unit = Unit::priced(700_000.0);
        let params = LoanParameters {
            interest_rate_percent: 0.0,
            ..sample_params()
        };
        let yearly_tax = derive_tax(Some(&unit), TaxSource::UnitRate, 0.0125);
        assert_eq!(yearly_tax, 8_750.0);

        let breakdown = derive_payment(Some(&unit), yearly_tax, &params);
        assert_eq!(breakdown.monthly_principal_interest, 560_000.0 / 360.0);
        assert_approx(breakdown.monthly_principal_interest, 1_555.555_555_555_6);
        assert_eq!(breakdown.monthly_tax, 729.0);
        assert_eq!(breakdown.monthly_insurance, 100.0);
    }

    #[test]
    fn negative_price_keeps_only_insurance() {
        let breakdown = compute(-100.0, 1_000.0, &sample_params());
        assert_degenerate(&breakdown, 1_200.0);
    }

    #[test]
    fn missing_unit_is_degenerate() {
        let breakdown = derive_payment(None, 5_000.0, &sample_params());
        assert_degenerate(&breakdown, 1_200.0);
    }

    #[test]
    fn each_invalid_parameter_degrades() {
        let cases = [
            LoanParameters {
                down_payment_percent: -1.0,
                ..sample_params()
            },
            LoanParameters {
                interest_rate_percent: -0.5,
                ..sample_params()
            },
            LoanParameters {
                loan_term_years: 0.0,
                ..sample_params()
            },
            LoanParameters {
                loan_term_years: -15.0,
                ..sample_params()
            },
            LoanParameters {
                interest_rate_percent: f64::NAN,
                ..sample_params()
            },
            LoanParameters {
                down_payment_percent: f64::INFINITY,
                ..sample_params()
            },
        ];
        for params in cases {
            let breakdown = compute(500_000.0, 6_000.0, &params);
            assert_degenerate(&breakdown, 1_200.0);
        }
    }

    #[test]
    fn non_finite_price_or_tax_degrades() {
        assert_degenerate(&compute(f64::NAN, 100.0, &sample_params()), 1_200.0);
        assert_degenerate(&compute(f64::INFINITY, 100.0, &sample_params()), 1_200.0);
        assert_degenerate(&compute(300_000.0, f64::NAN, &sample_params()), 1_200.0);
    }

    #[test]
    fn non_finite_insurance_yields_all_zero() {
        let params = LoanParameters {
            insurance_yearly: f64::NAN,
            ..sample_params()
        };
        let breakdown = compute(300_000.0, 3_000.0, &params);
        assert_eq!(breakdown, DerivedBreakdown::default());
    }

    #[test]
    fn overflowing_growth_degrades_instead_of_returning_nan() {
        let params = LoanParameters {
            interest_rate_percent: 1.0e6,
            loan_term_years: 1_000.0,
            ..sample_params()
        };
        let breakdown = compute(1.0e300, 0.0, &params);
        assert_degenerate(&breakdown, 1_200.0);
    }

    #[test]
    fn down_payment_above_price_passes_through_negative_loan() {
        let params = LoanParameters {
            down_payment_percent: 120.0,
            interest_rate_percent: 0.0,
            loan_term_years: 10.0,
            insurance_yearly: 0.0,
        };
        let breakdown = compute(120_000.0, 0.0, &params);
        assert!(breakdown.is_valid);
        assert_approx(breakdown.down_payment_amount, 144_000.0);
        assert_approx(breakdown.monthly_principal_interest, -24_000.0 / 120.0);
    }

    #[test]
    fn insurance_is_not_rounded_but_tax_is() {
        let params = LoanParameters {
            insurance_yearly: 1_000.0,
            ..sample_params()
        };
        let breakdown = compute(200_000.0, 1_000.0, &params);
        assert_eq!(breakdown.monthly_tax, 83.0);
        assert_eq!(breakdown.monthly_insurance, 1_000.0 / 12.0);
    }

    #[test]
    fn explicit_tax_sources() {
        let unit = Unit {
            tax_rate: Some(0.02),
            ..Unit::priced(400_000.0)
        };
        assert_eq!(derive_tax(Some(&unit), TaxSource::Rate(0.01), 0.0125), 4_000.0);
        assert_eq!(
            derive_tax(Some(&unit), TaxSource::YearlyAmount(3_500.0), 0.0125),
            3_500.0
        );
        assert_eq!(derive_tax(None, TaxSource::UnitRate, 0.0125), 0.0);
        assert_eq!(derive_tax(None, TaxSource::YearlyAmount(3_500.0), 0.0125), 3_500.0);
    }

    #[test]
    fn yearly_tax_is_rounded_to_whole_units() {
        let unit = Unit {
            tax_rate: Some(0.0111),
            ..Unit::priced(123_456.0)
        };
        // 123456 * 0.0111 = 1370.3616
        assert_eq!(derive_tax(Some(&unit), TaxSource::UnitRate, 0.0125), 1_370.0);
    }

    #[test]
    fn round_half_up_breaks_ties_upward() {
        assert_eq!(round_half_up(422.5), 423.0);
        assert_eq!(round_half_up(422.49), 422.0);
        assert_eq!(round_half_up(-2.5), -2.0);
        assert_eq!(round_half_up(-2.51), -3.0);
        assert_eq!(round_half_up(0.0), 0.0);
        assert!(round_half_up(f64::NAN).is_nan());
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_total_is_exact_sum_of_components(
            price in 1_000u32..5_000_000,
            tax_bp in 0u32..400,
            down_pct in 0u32..101,
            rate_bp in 0u32..2_000,
            term in 1u32..41,
            insurance in 0u32..10_000
        ) {
            let params = LoanParameters {
                down_payment_percent: down_pct as f64,
                interest_rate_percent: rate_bp as f64 / 100.0,
                loan_term_years: term as f64,
                insurance_yearly: insurance as f64,
            };
            let unit = Unit {
                tax_rate: Some(tax_bp as f64 / 10_000.0),
                ..Unit::priced(price as f64)
            };
            let yearly_tax = derive_tax(Some(&unit), TaxSource::UnitRate, 0.0125);
            let b = derive_payment(Some(&unit), yearly_tax, &params);
            prop_assert!(b.is_valid);
            prop_assert_eq!(
                b.monthly_total,
                b.monthly_principal_interest + b.monthly_tax + b.monthly_insurance
            );
        }

        #[test]
        fn prop_zero_interest_is_straight_line(
            price in 1_000u32..5_000_000,
            down_pct in 0u32..101,
            term in 1u32..41
        ) {
            let params = LoanParameters {
                down_payment_percent: down_pct as f64,
                interest_rate_percent: 0.0,
                loan_term_years: term as f64,
                insurance_yearly: 0.0,
            };
            let price = price as f64;
            let b = compute(price, 0.0, &params);
            let loan_amount = price - price * (down_pct as f64 / 100.0);
            prop_assert_eq!(b.monthly_principal_interest, loan_amount / (term as f64 * 12.0));
        }

        #[test]
        fn prop_invalid_inputs_leave_only_insurance(
            price in -1_000_000i64..1_000_000,
            down_pct in -50i32..101,
            rate_bp in -500i32..2_000,
            term in -5i32..41,
            insurance in 0u32..10_000
        ) {
            let params = LoanParameters {
                down_payment_percent: down_pct as f64,
                interest_rate_percent: rate_bp as f64 / 100.0,
                loan_term_years: term as f64,
                insurance_yearly: insurance as f64,
            };
            let invalid = price <= 0 || down_pct < 0 || rate_bp < 0 || term <= 0;
            let b = compute(price as f64, 4_000.0, &params);
            prop_assert_eq!(b.is_valid, !invalid);
            if invalid {
                prop_assert_eq!(b.monthly_total, insurance as f64 / 12.0);
                prop_assert_eq!(b.monthly_principal_interest, 0.0);
                prop_assert_eq!(b.monthly_tax, 0.0);
                prop_assert_eq!(b.down_payment_amount, 0.0);
            }
        }

        #[test]
        fn prop_larger_down_payment_lowers_principal_interest(
            price in 10_000u32..5_000_000,
            down_pct in 0u32..99,
            step in 1u32..10,
            rate_bp in 1u32..2_000,
            term in 1u32..41
        ) {
            let higher_pct = (down_pct + step).min(99);
            prop_assume!(higher_pct > down_pct);
            let base = LoanParameters {
                down_payment_percent: down_pct as f64,
                interest_rate_percent: rate_bp as f64 / 100.0,
                loan_term_years: term as f64,
                insurance_yearly: 0.0,
            };
            let raised = LoanParameters {
                down_payment_percent: higher_pct as f64,
                ..base
            };
            let low = compute(price as f64, 0.0, &base);
            let high = compute(price as f64, 0.0, &raised);
            prop_assert!(high.monthly_principal_interest < low.monthly_principal_interest);
        }

        #[test]
        fn prop_compute_is_bit_identical_across_calls(
            price in 1u32..5_000_000,
            tax in 0u32..50_000,
            down_pct in 0u32..101,
            rate_bp in 0u32..2_000,
            term in 1u32..41,
            insurance in 0u32..10_000
        ) {
            let params = LoanParameters {
                down_payment_percent: down_pct as f64,
                interest_rate_percent: rate_bp as f64 / 100.0,
                loan_term_years: term as f64,
                insurance_yearly: insurance as f64,
            };
            let first = compute(price as f64, tax as f64, &params);
            let second = compute(price as f64, tax as f64, &params);
            prop_assert_eq!(first.monthly_total.to_bits(), second.monthly_total.to_bits());
            prop_assert_eq!(
                first.monthly_principal_interest.to_bits(),
                second.monthly_principal_interest.to_bits()
            );
            prop_assert_eq!(first, second);
        }
    }
}
