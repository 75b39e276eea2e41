//! # Revenue Aggregation
//!
//! Turns settled payments into daily, monthly, hourly, per-method, and
//! per-item figures.
//!
//! ## Bucketing
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  payments.paid_at (UTC) ──► RevenueZone (REVENUE_TZ) ──► local date    │
//! │                                                          local hour     │
//! │                                                          local month    │
//! │                                                                         │
//! │  Query bounds go the other way:                                        │
//! │    2025-01-15 ──► local midnight ──► UTC instant ──► [from, to)        │
//! │                                                                         │
//! │  Every interval is half-open. from >= to is simply empty.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The store fetches payments by `paid_at` range without locks; everything
//! here is arithmetic over those rows. Sums are exact integer minor units;
//! only `avg` divides, and it rounds half-to-even.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{MenuItemId, OrderLine, Payment, PaymentMethod};
use crate::validation::{validate_month, DateOrInstant};

// =============================================================================
// Interval
// =============================================================================

/// A half-open range `[from, to)` of UTC instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Interval {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl Interval {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    /// `from >= to` contains nothing.
    pub fn is_empty(&self) -> bool {
        self.from >= self.to
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.from <= instant && instant < self.to
    }
}

// =============================================================================
// Revenue Zone
// =============================================================================

/// The process-wide IANA zone every bucket boundary is computed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevenueZone(Tz);

impl Default for RevenueZone {
    fn default() -> Self {
        RevenueZone(Tz::UTC)
    }
}

impl RevenueZone {
    pub fn new(tz: Tz) -> Self {
        RevenueZone(tz)
    }

    pub fn tz(&self) -> Tz {
        self.0
    }

    /// The instant local `date` begins.
    ///
    /// When midnight falls inside a DST gap the first valid local time after
    /// the gap is used. An ambiguous midnight takes the earlier instant.
    pub fn local_midnight(&self, date: NaiveDate) -> DateTime<Utc> {
        let midnight = date.and_time(chrono::NaiveTime::MIN);
        // Gaps are at most a few hours; step by minutes until one resolves.
        for minutes in 0..(24 * 60) {
            let candidate = midnight + Duration::minutes(minutes);
            if let Some(local) = self.0.from_local_datetime(&candidate).earliest() {
                return local.with_timezone(&Utc);
            }
        }
        // No zone skips an entire day's worth of minutes at once.
        Utc.from_utc_datetime(&midnight)
    }

    /// `[midnight(date), midnight(date + 1))`.
    ///
    /// Not always 24 hours: DST days are 23 or 25.
    pub fn day_interval(&self, date: NaiveDate) -> Interval {
        let next = date.succ_opt().unwrap_or(NaiveDate::MAX);
        Interval::new(self.local_midnight(date), self.local_midnight(next))
    }

    /// `[first of month, first of next month)` in local time.
    pub fn month_interval(&self, year: i32, month: u32) -> CoreResult<Interval> {
        validate_month(year, month)?;
        let start = first_of_month(year, month)?;
        let (next_year, next_month) = if month == 12 {
            (year + 1, 1)
        } else {
            (year, month + 1)
        };
        let end = first_of_month(next_year, next_month)?;
        Ok(Interval::new(self.local_midnight(start), self.local_midnight(end)))
    }

    /// `[midnight(from), midnight(to))`; `to` is exclusive.
    pub fn dates_interval(&self, from: NaiveDate, to: NaiveDate) -> Interval {
        Interval::new(self.local_midnight(from), self.local_midnight(to))
    }

    /// Resolves a query bound: dates become local midnight.
    pub fn resolve(&self, bound: DateOrInstant) -> DateTime<Utc> {
        match bound {
            DateOrInstant::Date(date) => self.local_midnight(date),
            DateOrInstant::Instant(instant) => instant,
        }
    }

    /// Builds `[from, to)` from two query bounds.
    pub fn interval(&self, from: DateOrInstant, to: DateOrInstant) -> Interval {
        Interval::new(self.resolve(from), self.resolve(to))
    }

    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.0).date_naive()
    }

    pub fn local_hour(&self, instant: DateTime<Utc>) -> u32 {
        instant.with_timezone(&self.0).hour()
    }
}

fn first_of_month(year: i32, month: u32) -> CoreResult<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
        CoreError::Validation(ValidationError::InvalidFormat {
            field: "month".to_string(),
            reason: format!("{year}-{month:02} is not a calendar month"),
        })
    })
}

// =============================================================================
// Report Rows
// =============================================================================

/// Revenue for one local day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct DailyRevenue {
    #[ts(as = "String")]
    pub date: NaiveDate,
    #[ts(type = "string")]
    pub total: Money,
    pub count: i64,
}

/// Revenue for one local calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct MonthlyRevenue {
    pub year: i32,
    pub month: u32,
    #[ts(type = "string")]
    pub total: Money,
    pub count: i64,
}

/// Revenue for one local hour of a day (0..=23).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct HourlyRevenue {
    pub hour: u32,
    #[ts(type = "string")]
    pub total: Money,
    pub count: i64,
}

/// Revenue taken by one payment method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct MethodRevenue {
    pub method: PaymentMethod,
    #[ts(type = "string")]
    pub total: Money,
    pub count: i64,
}

/// Units and revenue sold for one menu item across settled orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct ItemSales {
    pub item_id: MenuItemId,
    pub name: String,
    pub quantity: i64,
    #[ts(type = "string")]
    pub revenue: Money,
}

/// Summary statistics over the payments in an interval.
///
/// An empty interval reports zeros throughout, never nulls.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, TS)]
#[ts(export)]
pub struct RevenueStats {
    pub count: i64,
    #[ts(type = "string")]
    pub sum: Money,
    #[ts(type = "string")]
    pub avg: Money,
    #[ts(type = "string")]
    pub min: Money,
    #[ts(type = "string")]
    pub max: Money,
}

// =============================================================================
// Aggregations
// =============================================================================

fn within<'a>(payments: &'a [Payment], interval: Interval) -> impl Iterator<Item = &'a Payment> {
    payments.iter().filter(move |p| interval.contains(p.paid_at))
}

/// Running `(total, count)` for one bucket.
fn tally(bucket: &mut (Money, i64), amount: Money) -> CoreResult<()> {
    bucket.0 = bucket.0.checked_add(amount)?;
    bucket.1 += 1;
    Ok(())
}

/// Sum and count of the payments inside `interval`.
pub fn sum_in(payments: &[Payment], interval: Interval) -> CoreResult<(Money, i64)> {
    let mut bucket = (Money::ZERO, 0);
    for p in within(payments, interval) {
        tally(&mut bucket, p.amount)?;
    }
    Ok(bucket)
}

/// One row per local day that has payments, ascending by date.
pub fn daily_series(
    zone: &RevenueZone,
    payments: &[Payment],
    interval: Interval,
) -> CoreResult<Vec<DailyRevenue>> {
    let mut days: BTreeMap<NaiveDate, (Money, i64)> = BTreeMap::new();
    for p in within(payments, interval) {
        tally(days.entry(zone.local_date(p.paid_at)).or_default(), p.amount)?;
    }
    Ok(days
        .into_iter()
        .map(|(date, (total, count))| DailyRevenue { date, total, count })
        .collect())
}

/// One row per local month that has payments, ascending.
pub fn monthly_series(
    zone: &RevenueZone,
    payments: &[Payment],
    interval: Interval,
) -> CoreResult<Vec<MonthlyRevenue>> {
    let mut months: BTreeMap<(i32, u32), (Money, i64)> = BTreeMap::new();
    for p in within(payments, interval) {
        let date = zone.local_date(p.paid_at);
        tally(months.entry((date.year(), date.month())).or_default(), p.amount)?;
    }
    Ok(months
        .into_iter()
        .map(|((year, month), (total, count))| MonthlyRevenue {
            year,
            month,
            total,
            count,
        })
        .collect())
}

/// One row per local hour of `date` that has payments, ascending.
///
/// On a fall-back day the repeated hour collects both passes.
pub fn hourly_series(
    zone: &RevenueZone,
    payments: &[Payment],
    date: NaiveDate,
) -> CoreResult<Vec<HourlyRevenue>> {
    let mut hours: BTreeMap<u32, (Money, i64)> = BTreeMap::new();
    for p in within(payments, zone.day_interval(date)) {
        tally(hours.entry(zone.local_hour(p.paid_at)).or_default(), p.amount)?;
    }
    Ok(hours
        .into_iter()
        .map(|(hour, (total, count))| HourlyRevenue { hour, total, count })
        .collect())
}

/// Revenue per payment method, highest first; ties by method name.
pub fn by_method(payments: &[Payment], interval: Interval) -> CoreResult<Vec<MethodRevenue>> {
    let mut methods: BTreeMap<PaymentMethod, (Money, i64)> = BTreeMap::new();
    for p in within(payments, interval) {
        tally(methods.entry(p.method).or_default(), p.amount)?;
    }
    let mut rows: Vec<MethodRevenue> = methods
        .into_iter()
        .map(|(method, (total, count))| MethodRevenue {
            method,
            total,
            count,
        })
        .collect();
    rows.sort_by(|a, b| {
        b.total
            .cmp(&a.total)
            .then_with(|| a.method.as_str().cmp(b.method.as_str()))
    });
    Ok(rows)
}

/// Count, sum, rounded average, min and max of the payments in `interval`.
pub fn stats(payments: &[Payment], interval: Interval) -> CoreResult<RevenueStats> {
    let amounts: Vec<Money> = within(payments, interval).map(|p| p.amount).collect();
    let Some((&min, &max)) = amounts.iter().min().zip(amounts.iter().max()) else {
        return Ok(RevenueStats::default());
    };

    let count = amounts.len() as i64;
    let sum = Money::checked_sum(amounts.iter().copied())?;
    let avg = div_round_half_even(i128::from(sum.to_minor()), i128::from(count));

    Ok(RevenueStats {
        count,
        sum,
        avg: Money::from_minor(avg as i64),
        min,
        max,
    })
}

/// `num / den` for non-negative `num` and positive `den`, ties to even.
fn div_round_half_even(num: i128, den: i128) -> i128 {
    let quotient = num / den;
    let twice_remainder = (num % den) * 2;
    match twice_remainder.cmp(&den) {
        std::cmp::Ordering::Greater => quotient + 1,
        std::cmp::Ordering::Equal if quotient % 2 == 1 => quotient + 1,
        _ => quotient,
    }
}

/// Folds settled lines into per-item totals.
///
/// The name is the greatest snapshot seen, so the result does not depend on
/// line order; stores that can see the live catalog may replace it.
pub fn tally_items<'a, I>(lines: I) -> CoreResult<Vec<ItemSales>>
where
    I: IntoIterator<Item = &'a OrderLine>,
{
    let mut items: BTreeMap<MenuItemId, ItemSales> = BTreeMap::new();
    for line in lines {
        let revenue = line.line_total()?;
        let entry = items.entry(line.item_id).or_insert_with(|| ItemSales {
            item_id: line.item_id,
            name: line.name_snapshot.clone(),
            quantity: 0,
            revenue: Money::ZERO,
        });
        entry.quantity += i64::from(line.quantity);
        entry.revenue = entry.revenue.checked_add(revenue)?;
        if line.name_snapshot > entry.name {
            entry.name = line.name_snapshot.clone();
        }
    }
    Ok(items.into_values().collect())
}

/// Top `k` items by revenue; ties by item id.
pub fn rank_items(mut items: Vec<ItemSales>, k: usize) -> Vec<ItemSales> {
    items.sort_by(|a, b| b.revenue.cmp(&a.revenue).then(a.item_id.cmp(&b.item_id)));
    items.truncate(k);
    items
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LineId, OrderId, PaymentId};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn pay(id: i64, minor: i64, method: PaymentMethod, paid_at: DateTime<Utc>) -> Payment {
        Payment {
            id: PaymentId(id),
            order_id: OrderId(id),
            amount: Money::from_minor(minor),
            method,
            reference: None,
            paid_at,
        }
    }

    /// 120 + 50 + 330 on 2025-01-15 UTC, plus neighbours on either side.
    fn fixture() -> Vec<Payment> {
        vec![
            pay(1, 7000, PaymentMethod::Cash, at(2025, 1, 14, 23, 59)),
            pay(2, 12000, PaymentMethod::Cash, at(2025, 1, 15, 0, 0)),
            pay(3, 5000, PaymentMethod::Card, at(2025, 1, 15, 12, 30)),
            pay(4, 33000, PaymentMethod::Qr, at(2025, 1, 15, 12, 45)),
            pay(5, 9900, PaymentMethod::Wallet, at(2025, 1, 16, 0, 0)),
        ]
    }

    #[test]
    fn test_interval() {
        let i = Interval::new(at(2025, 1, 15, 0, 0), at(2025, 1, 16, 0, 0));
        assert!(i.contains(at(2025, 1, 15, 0, 0)));
        assert!(!i.contains(at(2025, 1, 16, 0, 0)));
        assert!(!i.is_empty());
        assert!(Interval::new(i.to, i.from).is_empty());
        assert!(Interval::new(i.from, i.from).is_empty());
    }

    #[test]
    fn test_daily_total() {
        let zone = RevenueZone::default();
        let (total, count) = sum_in(&fixture(), zone.day_interval(date(2025, 1, 15))).unwrap();
        assert_eq!(total.to_string(), "500.00");
        assert_eq!(count, 3);
    }

    #[test]
    fn test_day_boundaries_follow_zone() {
        let zone = RevenueZone::new(chrono_tz::Asia::Bangkok);
        // Bangkok midnight is 17:00 UTC the day before.
        let day = zone.day_interval(date(2025, 1, 15));
        assert_eq!(day.from, at(2025, 1, 14, 17, 0));
        assert_eq!(day.to, at(2025, 1, 15, 17, 0));

        let (total, count) = sum_in(&fixture(), day).unwrap();
        assert_eq!(count, 4);
        assert_eq!(total.to_minor(), 7000 + 12000 + 5000 + 33000);
    }

    #[test]
    fn test_dst_gap_midnight() {
        // Santiago springs forward at local midnight: 00:00 does not exist.
        let zone = RevenueZone::new(chrono_tz::America::Santiago);
        let start = zone.local_midnight(date(2024, 9, 8));
        let local = start.with_timezone(&zone.tz());
        assert_eq!(local.date_naive(), date(2024, 9, 8));
        assert_eq!(local.hour(), 1);
    }

    #[test]
    fn test_dst_day_lengths() {
        let zone = RevenueZone::new(chrono_tz::Europe::Berlin);
        let spring = zone.day_interval(date(2025, 3, 30));
        assert_eq!(spring.to - spring.from, Duration::hours(23));
        let autumn = zone.day_interval(date(2025, 10, 26));
        assert_eq!(autumn.to - autumn.from, Duration::hours(25));
    }

    #[test]
    fn test_month_interval() {
        let zone = RevenueZone::default();
        let dec = zone.month_interval(2024, 12).unwrap();
        assert_eq!(dec.from, at(2024, 12, 1, 0, 0));
        assert_eq!(dec.to, at(2025, 1, 1, 0, 0));
        assert!(zone.month_interval(2025, 13).is_err());
    }

    #[test]
    fn test_daily_series_omits_empty_days() {
        let zone = RevenueZone::default();
        let rows = daily_series(
            &zone,
            &fixture(),
            zone.dates_interval(date(2025, 1, 10), date(2025, 1, 20)),
        )
        .unwrap();
        let dates: Vec<_> = rows.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![date(2025, 1, 14), date(2025, 1, 15), date(2025, 1, 16)]);
        assert_eq!(rows[1].total.to_minor(), 50000);
    }

    #[test]
    fn test_monthly_series() {
        let zone = RevenueZone::default();
        let mut payments = fixture();
        payments.push(pay(6, 100, PaymentMethod::Cash, at(2025, 2, 1, 8, 0)));
        let rows = monthly_series(
            &zone,
            &payments,
            zone.dates_interval(date(2025, 1, 1), date(2025, 3, 1)),
        )
        .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!((rows[0].year, rows[0].month, rows[0].count), (2025, 1, 5));
        assert_eq!((rows[1].month, rows[1].total.to_minor()), (2, 100));
    }

    #[test]
    fn test_hourly_series_respects_zone() {
        let utc = hourly_series(&RevenueZone::default(), &fixture(), date(2025, 1, 15)).unwrap();
        assert_eq!(
            utc.iter().map(|r| (r.hour, r.count)).collect::<Vec<_>>(),
            vec![(0, 1), (12, 2)]
        );

        let bkk = RevenueZone::new(chrono_tz::Asia::Bangkok);
        let local = hourly_series(&bkk, &fixture(), date(2025, 1, 15)).unwrap();
        assert_eq!(
            local.iter().map(|r| r.hour).collect::<Vec<_>>(),
            vec![6, 7, 19]
        );
    }

    #[test]
    fn test_by_method_sorted_desc() {
        let zone = RevenueZone::default();
        let rows = by_method(&fixture(), zone.day_interval(date(2025, 1, 15))).unwrap();
        let order: Vec<_> = rows.iter().map(|r| r.method).collect();
        assert_eq!(
            order,
            vec![PaymentMethod::Qr, PaymentMethod::Cash, PaymentMethod::Card]
        );
    }

    #[test]
    fn test_by_method_ties_by_name() {
        let t = at(2025, 1, 15, 10, 0);
        let payments = vec![
            pay(1, 100, PaymentMethod::Wallet, t),
            pay(2, 100, PaymentMethod::Card, t),
            pay(3, 100, PaymentMethod::Cash, t),
        ];
        let rows = by_method(&payments, Interval::new(t, t + Duration::hours(1))).unwrap();
        let order: Vec<_> = rows.iter().map(|r| r.method.as_str()).collect();
        assert_eq!(order, vec!["card", "cash", "wallet"]);
    }

    #[test]
    fn test_stats() {
        let zone = RevenueZone::default();
        let s = stats(&fixture(), zone.dates_interval(date(2025, 1, 15), date(2025, 1, 16))).unwrap();
        assert_eq!(s.count, 3);
        assert_eq!(s.sum.to_string(), "500.00");
        assert_eq!(s.avg.to_string(), "166.67");
        assert_eq!(s.min.to_string(), "50.00");
        assert_eq!(s.max.to_string(), "330.00");
    }

    #[test]
    fn test_stats_empty_is_zero() {
        let zone = RevenueZone::default();
        let inverted = zone.dates_interval(date(2025, 1, 16), date(2025, 1, 15));
        assert_eq!(stats(&fixture(), inverted).unwrap(), RevenueStats::default());
        assert_eq!(sum_in(&fixture(), inverted).unwrap(), (Money::ZERO, 0));
        assert!(daily_series(&zone, &fixture(), inverted).unwrap().is_empty());
    }

    #[test]
    fn test_sums_agree() {
        let zone = RevenueZone::new(chrono_tz::Asia::Bangkok);
        let payments = fixture();
        let interval = zone.dates_interval(date(2025, 1, 1), date(2025, 2, 1));

        let total = stats(&payments, interval).unwrap().sum;
        let daily = Money::checked_sum(
            daily_series(&zone, &payments, interval)
                .unwrap()
                .into_iter()
                .map(|r| r.total),
        )
        .unwrap();
        let methods = Money::checked_sum(
            by_method(&payments, interval)
                .unwrap()
                .into_iter()
                .map(|r| r.total),
        )
        .unwrap();

        assert_eq!(total, daily);
        assert_eq!(total, methods);
    }

    #[test]
    fn test_div_round_half_even() {
        assert_eq!(div_round_half_even(50000, 3), 16667);
        assert_eq!(div_round_half_even(5, 2), 2);
        assert_eq!(div_round_half_even(7, 2), 4);
        assert_eq!(div_round_half_even(9, 4), 2);
        assert_eq!(div_round_half_even(0, 5), 0);
    }

    #[test]
    fn test_tally_and_rank_items() {
        let now = at(2025, 1, 15, 12, 0);
        let mk = |id: i64, item: i64, qty: i32, price: i64| OrderLine {
            id: LineId(id),
            order_id: OrderId(1),
            item_id: MenuItemId(item),
            name_snapshot: format!("item {item}"),
            quantity: qty,
            unit_price: Money::from_minor(price),
            notes: None,
            created_at: now,
            updated_at: now,
        };
        let lines = vec![
            mk(1, 10, 2, 12000),
            mk(2, 11, 1, 5550),
            mk(3, 10, 1, 12000),
            mk(4, 12, 3, 12000),
        ];
        let items = tally_items(&lines).unwrap();
        assert_eq!(items.len(), 3);

        let ranked = rank_items(items, 2);
        assert_eq!(ranked.len(), 2);
        // 10 and 12 both earned 360.00; lower id first.
        assert_eq!(ranked[0].item_id, MenuItemId(10));
        assert_eq!(ranked[0].quantity, 3);
        assert_eq!(ranked[0].revenue.to_minor(), 36000);
        assert_eq!(ranked[1].item_id, MenuItemId(12));
    }
}
