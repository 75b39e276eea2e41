//! # Revenue Service
//!
//! Revenue reports over settled payments.
//!
//! Reports never take locks: payments are immutable once committed, so a
//! plain read sees a consistent set. Bucketing happens in dinein-core, in
//! the configured [`RevenueZone`].
//!
//! ## Reports
//! | Method         | Interval                                  | Rows            |
//! |----------------|-------------------------------------------|-----------------|
//! | `daily`        | local day                                 | one             |
//! | `monthly`      | local month                               | one             |
//! | `daily_range`  | `[from, to)`                              | per day, sparse |
//! | `monthly_range`| `[from, to)`                              | per month       |
//! | `hourly`       | local day                                 | per hour, sparse|
//! | `by_method`    | `[from, to)`                              | per method      |
//! | `top_items`    | `[from, to)`                              | top `limit`     |
//! | `stats`        | `[from, to)`                              | one             |

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;

use dinein_core::revenue::{
    self, DailyRevenue, HourlyRevenue, ItemSales, MethodRevenue, MonthlyRevenue, RevenueStats,
};
use dinein_core::validation::{validate_limit, DateOrInstant};
use dinein_core::{Interval, Payment, RevenueZone};
use dinein_db::Store;

use crate::error::EngineResult;
use crate::retry::with_retry;

/// Revenue reports in one time zone.
pub struct RevenueService<S> {
    store: Arc<S>,
    zone: RevenueZone,
    max_attempts: u32,
}

impl<S> Clone for RevenueService<S> {
    fn clone(&self) -> Self {
        RevenueService {
            store: Arc::clone(&self.store),
            zone: self.zone,
            max_attempts: self.max_attempts,
        }
    }
}

impl<S: Store> RevenueService<S> {
    pub fn new(store: Arc<S>, zone: RevenueZone, max_attempts: u32) -> Self {
        RevenueService {
            store,
            zone,
            max_attempts,
        }
    }

    pub fn zone(&self) -> RevenueZone {
        self.zone
    }

    /// Total for one local day.
    pub async fn daily(&self, date: NaiveDate) -> EngineResult<DailyRevenue> {
        let interval = self.zone.day_interval(date);
        let payments = self.payments(interval).await?;
        let (total, count) = revenue::sum_in(&payments, interval)?;
        Ok(DailyRevenue { date, total, count })
    }

    /// Total for one local calendar month.
    pub async fn monthly(&self, year: i32, month: u32) -> EngineResult<MonthlyRevenue> {
        let interval = self.zone.month_interval(year, month)?;
        let payments = self.payments(interval).await?;
        let (total, count) = revenue::sum_in(&payments, interval)?;
        Ok(MonthlyRevenue {
            year,
            month,
            total,
            count,
        })
    }

    /// Days with payments, ascending.
    pub async fn daily_range(
        &self,
        from: DateOrInstant,
        to: DateOrInstant,
    ) -> EngineResult<Vec<DailyRevenue>> {
        let interval = self.zone.interval(from, to);
        let payments = self.payments(interval).await?;
        Ok(revenue::daily_series(&self.zone, &payments, interval)?)
    }

    /// Months with payments, ascending.
    pub async fn monthly_range(
        &self,
        from: DateOrInstant,
        to: DateOrInstant,
    ) -> EngineResult<Vec<MonthlyRevenue>> {
        let interval = self.zone.interval(from, to);
        let payments = self.payments(interval).await?;
        Ok(revenue::monthly_series(&self.zone, &payments, interval)?)
    }

    /// Hours of a local day that have payments, ascending.
    pub async fn hourly(&self, date: NaiveDate) -> EngineResult<Vec<HourlyRevenue>> {
        let payments = self.payments(self.zone.day_interval(date)).await?;
        Ok(revenue::hourly_series(&self.zone, &payments, date)?)
    }

    /// Revenue per payment method, highest first.
    pub async fn by_method(
        &self,
        from: DateOrInstant,
        to: DateOrInstant,
    ) -> EngineResult<Vec<MethodRevenue>> {
        let interval = self.zone.interval(from, to);
        let payments = self.payments(interval).await?;
        Ok(revenue::by_method(&payments, interval)?)
    }

    /// Best sellers by revenue. `limit` defaults to 10, capped at 100.
    pub async fn top_items(
        &self,
        from: DateOrInstant,
        to: DateOrInstant,
        limit: Option<i64>,
    ) -> EngineResult<Vec<ItemSales>> {
        let k = validate_limit(limit)?;
        let interval = self.zone.interval(from, to);
        if interval.is_empty() {
            return Ok(Vec::new());
        }

        let store = &self.store;
        let items = with_retry("item_sales", self.max_attempts, || async move {
            Ok(store.item_sales_between(interval).await?)
        })
        .await?;
        debug!(from = %interval.from, to = %interval.to, items = items.len(), "Item sales read");
        Ok(revenue::rank_items(items, k))
    }

    pub async fn stats(&self, from: DateOrInstant, to: DateOrInstant) -> EngineResult<RevenueStats> {
        let interval = self.zone.interval(from, to);
        let payments = self.payments(interval).await?;
        Ok(revenue::stats(&payments, interval)?)
    }

    async fn payments(&self, interval: Interval) -> EngineResult<Vec<Payment>> {
        if interval.is_empty() {
            return Ok(Vec::new());
        }
        let store = &self.store;
        let payments = with_retry("payments_between", self.max_attempts, || async move {
            Ok(store.payments_between(interval).await?)
        })
        .await?;
        debug!(
            from = %interval.from,
            to = %interval.to,
            payments = payments.len(),
            "Payments read"
        );
        Ok(payments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use dinein_core::{ManualClock, MenuItemId, Money, PaymentMethod};
    use dinein_db::{MemoryStore, NewOrderLine, NewPayment, StoreTx};

    /// Settles a one-line order for `minor` at `at`.
    async fn pay(
        store: &MemoryStore,
        clock: &ManualClock,
        table: dinein_core::TableId,
        item: MenuItemId,
        minor: i64,
        method: PaymentMethod,
        at: DateTime<Utc>,
    ) {
        clock.set(at);
        let mut tx = store.begin().await.unwrap();
        let order = tx.insert_open_order(table).await.unwrap();
        tx.insert_line(NewOrderLine {
            order_id: order.id,
            item_id: item,
            name_snapshot: "Dish".to_string(),
            quantity: 1,
            unit_price: Money::from_minor(minor),
            notes: None,
        })
        .await
        .unwrap();
        let payment = tx
            .insert_payment(NewPayment {
                order_id: order.id,
                amount: Money::from_minor(minor),
                method,
                reference: None,
            })
            .await
            .unwrap();
        tx.close_order(order.id, dinein_core::OrderStatus::Closed, Some(payment.paid_at))
            .await
            .unwrap();
        tx.commit().await.unwrap();
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn fixture(zone: RevenueZone) -> RevenueService<MemoryStore> {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()));
        let store = Arc::new(MemoryStore::with_clock(clock.clone()));
        let category = store.insert_category("Mains").await.unwrap();
        let item = store
            .insert_menu_item(category, "Pad Thai", Money::from_minor(12000))
            .await
            .unwrap()
            .id;
        let table = store.insert_table(1, 4, "qr-1").await.unwrap().id;

        let at = |h: u32, m: u32| Utc.with_ymd_and_hms(2025, 1, 15, h, m, 0).unwrap();
        pay(&store, &clock, table, item, 12000, PaymentMethod::Cash, at(3, 0)).await;
        pay(&store, &clock, table, item, 5000, PaymentMethod::Card, at(9, 30)).await;
        pay(&store, &clock, table, item, 33000, PaymentMethod::Cash, at(20, 15)).await;
        // Next UTC day, and next month.
        pay(&store, &clock, table, item, 7000, PaymentMethod::Qr, at(23, 59) + Duration::minutes(2)).await;
        pay(
            &store,
            &clock,
            table,
            item,
            1000,
            PaymentMethod::Wallet,
            Utc.with_ymd_and_hms(2025, 2, 3, 12, 0, 0).unwrap(),
        )
        .await;

        RevenueService::new(store, zone, 3)
    }

    #[tokio::test]
    async fn test_daily_and_stats() {
        let revenue = fixture(RevenueZone::default()).await;

        let day = revenue.daily(date(2025, 1, 15)).await.unwrap();
        assert_eq!(day.total.to_string(), "500.00");
        assert_eq!(day.count, 3);

        let stats = revenue
            .stats(
                DateOrInstant::Date(date(2025, 1, 15)),
                DateOrInstant::Date(date(2025, 1, 16)),
            )
            .await
            .unwrap();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.sum.to_string(), "500.00");
        assert_eq!(stats.avg.to_string(), "166.67");
        assert_eq!(stats.min.to_string(), "50.00");
        assert_eq!(stats.max.to_string(), "330.00");

        let empty = revenue.daily(date(2025, 3, 1)).await.unwrap();
        assert_eq!(empty.total, Money::ZERO);
        assert_eq!(empty.count, 0);
    }

    #[tokio::test]
    async fn test_zone_moves_day_boundaries() {
        let bangkok = RevenueZone::new(chrono_tz::Asia::Bangkok);
        let revenue = fixture(bangkok).await;

        // 20:15 and 00:01 UTC both fall on 16 January in Bangkok (UTC+7).
        let day = revenue.daily(date(2025, 1, 16)).await.unwrap();
        assert_eq!(day.total.to_string(), "400.00");
        assert_eq!(day.count, 2);

        let hours: Vec<u32> = revenue
            .hourly(date(2025, 1, 15))
            .await
            .unwrap()
            .iter()
            .map(|h| h.hour)
            .collect();
        assert_eq!(hours, vec![10, 16]);
    }

    #[tokio::test]
    async fn test_ranges_agree() {
        let revenue = fixture(RevenueZone::default()).await;
        let from = DateOrInstant::Date(date(2025, 1, 1));
        let to = DateOrInstant::Date(date(2025, 3, 1));

        let stats = revenue.stats(from, to).await.unwrap();
        let daily = revenue.daily_range(from, to).await.unwrap();
        let methods = revenue.by_method(from, to).await.unwrap();
        let monthly = revenue.monthly_range(from, to).await.unwrap();

        let sum = |it: Vec<Money>| Money::checked_sum(it.into_iter()).unwrap();
        assert_eq!(stats.sum.to_string(), "580.00");
        assert_eq!(sum(daily.iter().map(|d| d.total).collect()), stats.sum);
        assert_eq!(sum(methods.iter().map(|m| m.total).collect()), stats.sum);
        assert_eq!(sum(monthly.iter().map(|m| m.total).collect()), stats.sum);

        assert_eq!(daily.len(), 3);
        assert_eq!(monthly.len(), 2);
        assert_eq!(methods[0].method, PaymentMethod::Cash);
        assert_eq!(methods[0].total.to_string(), "450.00");

        let january = revenue.monthly(2025, 1).await.unwrap();
        assert_eq!(january.total.to_string(), "570.00");
        assert!(revenue.monthly(2025, 13).await.is_err());
    }

    #[tokio::test]
    async fn test_empty_and_inverted_intervals() {
        let revenue = fixture(RevenueZone::default()).await;
        let a = DateOrInstant::Date(date(2025, 1, 16));
        let b = DateOrInstant::Date(date(2025, 1, 15));

        assert!(revenue.daily_range(a, b).await.unwrap().is_empty());
        assert!(revenue.by_method(a, a).await.unwrap().is_empty());
        assert!(revenue.top_items(a, b, None).await.unwrap().is_empty());
        assert_eq!(revenue.stats(a, b).await.unwrap(), RevenueStats::default());
    }

    #[tokio::test]
    async fn test_top_items_limit() {
        let revenue = fixture(RevenueZone::default()).await;
        let from = DateOrInstant::Date(date(2025, 1, 1));
        let to = DateOrInstant::Date(date(2026, 1, 1));

        let top = revenue.top_items(from, to, Some(500)).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].name, "Pad Thai");
        assert_eq!(top[0].quantity, 5);
        assert_eq!(top[0].revenue.to_string(), "580.00");

        assert!(revenue.top_items(from, to, Some(0)).await.is_err());
    }
}
