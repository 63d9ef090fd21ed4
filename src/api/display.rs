use serde::Serialize;

use crate::core::DerivedBreakdown;

pub const PRINCIPAL_INTEREST_LABEL: &str = "Principal & Interest";
pub const PROPERTY_TAX_LABEL: &str = "Property Tax";
pub const INSURANCE_LABEL: &str = "Home Insurance";

#[derive(Debug, Clone, Serialize)]
pub struct ChartSegment {
    pub label: &'static str,
    pub value: f64,
    pub color: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplaySummary {
    pub monthly_total: String,
    pub principal_interest: String,
    pub monthly_tax: String,
    pub monthly_insurance: String,
    pub down_payment: String,
    pub yearly_property_tax: String,
}

/// Segments for the payment doughnut. Empty when there is no loan to chart.
pub fn chart_segments(breakdown: &DerivedBreakdown) -> Vec<ChartSegment> {
    if !breakdown.is_valid || breakdown.monthly_total <= 0.0 {
        return Vec::new();
    }
    vec![
        ChartSegment {
            label: PRINCIPAL_INTEREST_LABEL,
            value: breakdown.monthly_principal_interest,
            color: "#1f78b4",
        },
        ChartSegment {
            label: PROPERTY_TAX_LABEL,
            value: breakdown.monthly_tax,
            color: "#ff7f00",
        },
        ChartSegment {
            label: INSURANCE_LABEL,
            value: breakdown.monthly_insurance,
            color: "#33a02c",
        },
    ]
}

pub fn summarize(breakdown: &DerivedBreakdown) -> DisplaySummary {
    DisplaySummary {
        monthly_total: format_dollars(breakdown.monthly_total),
        principal_interest: format_dollars(breakdown.monthly_principal_interest),
        monthly_tax: format_dollars(breakdown.monthly_tax),
        monthly_insurance: format_dollars(breakdown.monthly_insurance),
        down_payment: format_dollars(breakdown.down_payment_amount),
        yearly_property_tax: format_dollars(breakdown.yearly_property_tax),
    }
}

pub fn render_text(label: &str, breakdown: &DerivedBreakdown) -> String {
    let summary = summarize(breakdown);
    let selected = if label.is_empty() { "Not specified" } else { label };
    let mut out = String::new();
    out.push_str(&format!("Selected home: {selected}\n"));
    out.push_str(&format!("Estimated payment: {}/mo\n", summary.monthly_total));
    if !breakdown.is_valid {
        out.push_str("Enter your loan details to see the payment breakdown.\n");
        return out;
    }
    out.push_str(&format!("  Down payment:          {}\n", summary.down_payment));
    out.push_str(&format!(
        "  {PRINCIPAL_INTEREST_LABEL}:  {}\n",
        summary.principal_interest
    ));
    out.push_str(&format!("  {PROPERTY_TAX_LABEL}:          {}\n", summary.monthly_tax));
    out.push_str(&format!("  {INSURANCE_LABEL}:        {}\n", summary.monthly_insurance));
    out
}

/// Whole-dollar amount with comma grouping, e.g. `$4,159`.
pub fn format_dollars(amount: f64) -> String {
    if !amount.is_finite() {
        return "$0".to_string();
    }
    let rounded = amount.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0.0 {
        format!("$-{grouped}")
    } else {
        format!("${grouped}")
    }
}
