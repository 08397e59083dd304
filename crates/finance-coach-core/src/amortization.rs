use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::config::{MAX_PROJECTION_MONTHS, MAX_SCHEDULE_MONTHS, UNPAYABLE_MONTHS};
use crate::types::{Money, Percent, Rate};

const MONTHS_PER_YEAR: Decimal = dec!(12);

/// One row of a month-by-month amortization table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmortizationRow {
    pub month: u32,
    pub payment: Money,
    pub interest: Money,
    pub principal: Money,
    pub balance: Money,
}

/// Convert an APR in percent (12 = 12%) to a monthly decimal rate (0.01).
pub fn monthly_rate(annual_rate_percent: Percent) -> Rate {
    annual_rate_percent / Decimal::ONE_HUNDRED / MONTHS_PER_YEAR
}

/// Interest accrued on `balance` in one month.
pub fn monthly_interest(balance: Money, annual_rate_percent: Percent) -> Money {
    balance * monthly_rate(annual_rate_percent)
}

/// True when `payment` covers more than one month of interest.
pub fn is_payable(balance: Money, payment: Money, annual_rate_percent: Percent) -> bool {
    if balance <= Decimal::ZERO {
        return true;
    }
    payment > Decimal::ZERO && payment > monthly_interest(balance, annual_rate_percent)
}

/// Months needed to clear `balance` paying `payment` each month.
///
/// n = ln(P / (P - B*r)) / ln(1 + r), rounded up. Returns
/// [`UNPAYABLE_MONTHS`] when the payment never clears the balance. A payable
/// debt keeps its real count even past the sentinel; test payability with
/// [`is_payable`].
pub fn months_to_payoff(balance: Money, payment: Money, annual_rate_percent: Percent) -> u32 {
    if balance <= Decimal::ZERO {
        return 0;
    }
    if payment <= Decimal::ZERO {
        return UNPAYABLE_MONTHS;
    }

    let r = monthly_rate(annual_rate_percent);
    if r.is_zero() {
        return ceil_months(balance / payment);
    }

    let interest = balance * r;
    if payment <= interest {
        return UNPAYABLE_MONTHS;
    }

    let n = (payment / (payment - interest)).ln() / (Decimal::ONE + r).ln();
    ceil_months(n)
}

fn ceil_months(n: Decimal) -> u32 {
    n.ceil().to_u32().unwrap_or(u32::MAX)
}

/// Interest paid over `months` level payments: `payment * months - balance`,
/// floored at zero. The final payment is treated as a full one.
pub fn total_interest(balance: Money, payment: Money, months: u32) -> Money {
    (payment * Decimal::from(months) - balance).max(Decimal::ZERO)
}

/// Compute (1 + r)^n via iterative multiplication (avoids Decimal::powd drift).
///
/// Saturates at `Decimal::MAX` instead of overflowing.
pub(crate) fn compound(rate: Rate, n: u32) -> Decimal {
    let mut result = Decimal::ONE;
    let factor = Decimal::ONE + rate;
    for _ in 0..n {
        result = result.saturating_mul(factor);
        if result == Decimal::MAX {
            break;
        }
    }
    result
}

/// `a / b`, clamped to the signed `Decimal` range when the quotient overflows.
fn saturating_div(a: Decimal, b: Decimal) -> Decimal {
    a.checked_div(b).unwrap_or(if a.is_sign_negative() == b.is_sign_negative() {
        Decimal::MAX
    } else {
        Decimal::MIN
    })
}

/// Value after `months` of compound growth with a contribution at the end
/// of every month.
///
/// FV = PV*(1+r)^n + C*((1+r)^n - 1)/r; with r = 0 this is PV + C*n.
/// Values beyond the `Decimal` range saturate at `Decimal::MAX` / `MIN`.
pub fn future_value(
    present_value: Money,
    monthly_contribution: Money,
    monthly_rate: Rate,
    months: u32,
) -> Money {
    if monthly_rate.is_zero() {
        return present_value
            .saturating_add(monthly_contribution.saturating_mul(Decimal::from(months)));
    }
    let factor = compound(monthly_rate, months);
    let grown = present_value.saturating_mul(factor);
    let annuity = saturating_div(
        monthly_contribution.saturating_mul(factor - Decimal::ONE),
        monthly_rate,
    );
    grown.saturating_add(annuity)
}

/// Smallest month count at which [`future_value`] reaches `target`.
///
/// Binary search over `0..=MAX_PROJECTION_MONTHS`. Returns
/// `MAX_PROJECTION_MONTHS` when the target is out of reach inside the
/// horizon; callers treat that value as "not reachable".
pub fn months_to_reach_target(
    present_value: Money,
    monthly_contribution: Money,
    monthly_rate: Rate,
    target: Money,
) -> u32 {
    if present_value >= target {
        return 0;
    }
    if future_value(present_value, monthly_contribution, monthly_rate, MAX_PROJECTION_MONTHS)
        < target
    {
        return MAX_PROJECTION_MONTHS;
    }

    let (mut lo, mut hi) = (0u32, MAX_PROJECTION_MONTHS);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if future_value(present_value, monthly_contribution, monthly_rate, mid) >= target {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    lo
}

/// Month-by-month amortization table, capped at [`MAX_SCHEDULE_MONTHS`].
///
/// Stops when the balance reaches zero. An unpayable debt yields the full
/// capped table with a growing balance, saturating at `Decimal::MAX`.
pub fn amortization_schedule(
    balance: Money,
    payment: Money,
    annual_rate_percent: Percent,
) -> Vec<AmortizationRow> {
    let r = monthly_rate(annual_rate_percent);
    let mut rows = Vec::new();
    let mut remaining = balance;
    let mut month = 0;

    while remaining > Decimal::ZERO && month < MAX_SCHEDULE_MONTHS {
        month += 1;
        let interest = remaining.saturating_mul(r);
        let due = remaining.saturating_add(interest);
        let paid = payment.max(Decimal::ZERO).min(due);
        remaining = due - paid;
        rows.push(AmortizationRow {
            month,
            payment: paid,
            interest,
            principal: paid.saturating_sub(interest),
            balance: remaining,
        });
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_months_to_payoff_reference_case() {
        // 5000 at 12% APR paying 200/month: ln(200/150)/ln(1.01) = 28.91
        assert_eq!(months_to_payoff(dec!(5000), dec!(200), dec!(12)), 29);
        // 250/month: ln(250/200)/ln(1.01) = 22.43
        assert_eq!(months_to_payoff(dec!(5000), dec!(250), dec!(12)), 23);
    }

    #[test]
    fn test_months_to_payoff_zero_rate_is_ceil() {
        assert_eq!(months_to_payoff(dec!(1000), dec!(300), Decimal::ZERO), 4);
        assert_eq!(months_to_payoff(dec!(900), dec!(300), Decimal::ZERO), 3);
    }

    #[test]
    fn test_months_to_payoff_unpayable_sentinel() {
        // Interest is exactly 50/month
        assert_eq!(months_to_payoff(dec!(5000), dec!(50), dec!(12)), UNPAYABLE_MONTHS);
        assert_eq!(months_to_payoff(dec!(5000), dec!(10), dec!(12)), UNPAYABLE_MONTHS);
        assert_eq!(months_to_payoff(dec!(5000), Decimal::ZERO, dec!(0)), UNPAYABLE_MONTHS);
        assert!(!is_payable(dec!(5000), dec!(50), dec!(12)));
    }

    #[test]
    fn test_months_to_payoff_clears_exactly_at_n() {
        for (balance, payment, apr) in [
            (dec!(5000), dec!(200), dec!(12)),
            (dec!(12000), dec!(450), dec!(19.9)),
            (dec!(800), dec!(75), dec!(5)),
        ] {
            let n = months_to_payoff(balance, payment, apr);
            let r = monthly_rate(apr);
            let mut b = balance;
            for _ in 0..(n - 1) {
                b = b * (Decimal::ONE + r) - payment;
            }
            assert!(b > Decimal::ZERO, "balance after n-1 months should be positive");
            b = b * (Decimal::ONE + r) - payment;
            assert!(b <= Decimal::ZERO, "balance after n months should be cleared");
        }
    }

    #[test]
    fn test_total_interest_floors_at_zero() {
        assert_eq!(total_interest(dec!(5000), dec!(200), 29), dec!(800));
        assert_eq!(total_interest(dec!(5000), dec!(200), 10), Decimal::ZERO);
    }

    #[test]
    fn test_future_value_zero_rate_is_addition() {
        assert_eq!(future_value(dec!(1000), dec!(100), Decimal::ZERO, 12), dec!(2200));
    }

    #[test]
    fn test_future_value_compounds() {
        // 1000 at 1%/month for 12 months, no contribution
        let fv = future_value(dec!(1000), Decimal::ZERO, dec!(0.01), 12);
        assert!((fv - dec!(1126.83)).abs() < dec!(0.01), "fv={fv}");
    }

    #[test]
    fn test_months_to_reach_target() {
        assert_eq!(months_to_reach_target(dec!(500), dec!(10), dec!(0.01), dec!(500)), 0);
        // No growth: 0 + 100*n >= 1000 at n = 10
        assert_eq!(months_to_reach_target(Decimal::ZERO, dec!(100), Decimal::ZERO, dec!(1000)), 10);
        // Unreachable
        assert_eq!(
            months_to_reach_target(Decimal::ZERO, Decimal::ZERO, Decimal::ZERO, dec!(1)),
            MAX_PROJECTION_MONTHS
        );
    }

    #[test]
    fn test_payable_count_not_clamped_to_sentinel() {
        // 0% APR, 10_000 at 5/month needs 2000 months but is payable
        assert_eq!(months_to_payoff(dec!(10000), dec!(5), Decimal::ZERO), 2000);
        assert!(is_payable(dec!(10000), dec!(5), Decimal::ZERO));
    }

    #[test]
    fn test_future_value_saturates_on_high_return() {
        // 80% a year compounded monthly for 100 years exceeds the Decimal range
        let fv = future_value(dec!(100000), dec!(1000), dec!(0.8) / dec!(12), MAX_PROJECTION_MONTHS);
        assert_eq!(fv, Decimal::MAX);
        // 120_000 * 1.05^n - 20_000 >= 2_000_000 first holds at n = 58
        assert_eq!(
            months_to_reach_target(dec!(100000), dec!(1000), dec!(0.05), dec!(2_000_000)),
            58
        );
    }

    #[test]
    fn test_schedule_matches_closed_form() {
        let rows = amortization_schedule(dec!(5000), dec!(200), dec!(12));
        assert_eq!(rows.len() as u32, months_to_payoff(dec!(5000), dec!(200), dec!(12)));
        assert_eq!(rows.last().unwrap().balance, Decimal::ZERO);
        assert!(rows[0].interest == dec!(50));
    }

    #[test]
    fn test_schedule_caps_unpayable_debt() {
        let rows = amortization_schedule(dec!(5000), dec!(40), dec!(12));
        assert_eq!(rows.len() as u32, MAX_SCHEDULE_MONTHS);
        assert!(rows.last().unwrap().balance > dec!(5000));
    }

    #[test]
    fn test_schedule_high_apr_saturates() {
        // 400% APR payday loan: 33% a month on 500 is never covered by 10
        let rows = amortization_schedule(dec!(500), dec!(10), dec!(400));
        assert_eq!(rows.len() as u32, MAX_SCHEDULE_MONTHS);
        assert!(rows.last().unwrap().balance > dec!(1_000_000_000_000));
    }
}
