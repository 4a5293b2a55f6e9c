//! Financing plan selection.
//!
//! A Landivo property exposes up to three payment plans. When a campaign has
//! financing enabled, one plan per property is chosen for display according
//! to a [`PlanStrategy`].

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPlan {
    pub plan_number: u8,
    #[serde(default)]
    pub down_payment: f64,
    #[serde(default)]
    pub loan_amount: f64,
    #[serde(default)]
    pub interest_rate: f64,
    #[serde(default)]
    pub monthly_payment: f64,
    #[serde(default)]
    pub is_available: bool,
}

/// Rule used to pick one plan among a property's available plans.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanStrategy {
    #[default]
    #[serde(rename = "plan-1")]
    Plan1,
    #[serde(rename = "plan-2")]
    Plan2,
    #[serde(rename = "plan-3")]
    Plan3,
    #[serde(rename = "monthly-low")]
    MonthlyLow,
    #[serde(rename = "monthly-high")]
    MonthlyHigh,
    #[serde(rename = "down-payment-low")]
    DownPaymentLow,
    #[serde(rename = "down-payment-high")]
    DownPaymentHigh,
    #[serde(rename = "interest-low")]
    InterestLow,
    #[serde(rename = "interest-high")]
    InterestHigh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Extreme {
    Lowest,
    Highest,
}

impl PlanStrategy {
    fn fixed_plan(self) -> Option<u8> {
        match self {
            Self::Plan1 => Some(1),
            Self::Plan2 => Some(2),
            Self::Plan3 => Some(3),
            _ => None,
        }
    }

    fn objective(self) -> Option<(fn(&PaymentPlan) -> f64, Extreme)> {
        let monthly: fn(&PaymentPlan) -> f64 = |p| p.monthly_payment;
        let down: fn(&PaymentPlan) -> f64 = |p| p.down_payment;
        let interest: fn(&PaymentPlan) -> f64 = |p| p.interest_rate;
        match self {
            Self::Plan1 | Self::Plan2 | Self::Plan3 => None,
            Self::MonthlyLow => Some((monthly, Extreme::Lowest)),
            Self::MonthlyHigh => Some((monthly, Extreme::Highest)),
            Self::DownPaymentLow => Some((down, Extreme::Lowest)),
            Self::DownPaymentHigh => Some((down, Extreme::Highest)),
            Self::InterestLow => Some((interest, Extreme::Lowest)),
            Self::InterestHigh => Some((interest, Extreme::Highest)),
        }
    }
}

/// Plan shown when the requested fixed plan is unavailable.
const FALLBACK_PLAN: u8 = 1;

/// Select a plan for display.
///
/// - Fixed strategies pick plan N when available, else plan 1 when available,
///   else nothing (the property is shown without financing).
/// - Min/max strategies pick the available plan with the lowest/highest value
///   of the named field; ties go to the lowest `plan_number`.
pub fn select_plan(plans: &[PaymentPlan], strategy: PlanStrategy) -> Option<&PaymentPlan> {
    let available = || plans.iter().filter(|p| p.is_available);

    if let Some(wanted) = strategy.fixed_plan() {
        let by_number = |n: u8| available().find(|p| p.plan_number == n);
        return by_number(wanted).or_else(|| by_number(FALLBACK_PLAN));
    }

    let (value, extreme) = strategy.objective()?;
    available().min_by(|a, b| {
        let by_value = match extreme {
            Extreme::Lowest => value(a).total_cmp(&value(b)),
            Extreme::Highest => value(b).total_cmp(&value(a)),
        };
        match by_value {
            Ordering::Equal => a.plan_number.cmp(&b.plan_number),
            other => other,
        }
    })
}

/// The lowest monthly payment among available plans.
pub fn lowest_monthly_payment(plans: &[PaymentPlan]) -> Option<f64> {
    select_plan(plans, PlanStrategy::MonthlyLow).map(|p| p.monthly_payment)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
