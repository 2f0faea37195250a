use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{Result, SalesError};
use crate::models::{GroupBy, PerformanceRow, RecordFilter, Sale, SortField, SortOrder, SummaryNode};
use crate::store::RecordStore;

// Sums are kept in integer cents so a parent total is exactly the sum of
// its children however the records are grouped.
fn to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

fn from_cents(cents: i64) -> f64 {
    cents as f64 / 100.0
}

#[derive(Default)]
struct Bucket<'a> {
    items: u64,
    sales: i64,
    commission: i64,
    remaining: i64,
    stores: BTreeSet<&'a str>,
    vendors: BTreeSet<&'a str>,
}

impl<'a> Bucket<'a> {
    fn add(&mut self, sale: &'a Sale) {
        self.items += 1;
        self.sales += to_cents(sale.sale_price);
        self.commission += to_cents(sale.commission);
        self.remaining += to_cents(sale.remaining);
        self.stores.insert(&sale.store);
        self.vendors.insert(&sale.vendor);
    }

    fn into_node(self, period: String) -> SummaryNode {
        SummaryNode {
            period,
            items_sold: self.items,
            total_sales: from_cents(self.sales),
            total_commission: from_cents(self.commission),
            total_remaining: from_cents(self.remaining),
            unique_stores: self.stores.len(),
            unique_vendors: self.vendors.len(),
        }
    }
}

fn group_key(group_by: GroupBy, sale: &Sale) -> &str {
    let date = sale.date.as_str();
    match group_by {
        GroupBy::Year => date.get(..4).unwrap_or(date),
        GroupBy::Month => date.get(..7).unwrap_or(date),
        GroupBy::Day => date.get(..10).unwrap_or(date),
        GroupBy::Store => &sale.store,
        GroupBy::Vendor => &sale.vendor,
    }
}

fn sale_of<R: AsRef<Sale>>(record: &R) -> &Sale {
    record.as_ref()
}

fn year_of(date: &str) -> Option<i32> {
    date.get(..4)?.parse().ok()
}

fn month_of(date: &str) -> Option<u32> {
    date.get(5..7)?.parse().ok()
}

fn day_of(date: &str) -> Option<u32> {
    date.get(8..10)?.parse().ok()
}

fn check_month(month: u32) -> Result<()> {
    if (1..=12).contains(&month) {
        Ok(())
    } else {
        Err(SalesError::InvalidPeriod {
            param: "month",
            value: month.to_string(),
        })
    }
}

/// Everything a pivot view needs for one optional year.
#[derive(Debug, Clone, Serialize)]
pub struct PivotData {
    pub yearly: Vec<SummaryNode>,
    pub monthly: Vec<SummaryNode>,
    pub daily: Vec<SummaryNode>,
}

// ---------------------------------------------------------------------------
// Summarizer
// ---------------------------------------------------------------------------

/// Year / month / day rollups over decoded records.
///
/// Records are held in insertion order; drill-down uses that order to break
/// ties between records on the same date.
pub struct Summarizer<R> {
    records: Vec<R>,
}

impl<R: AsRef<Sale>> Summarizer<R> {
    pub fn new(records: Vec<R>) -> Self {
        Self { records }
    }

    fn sales(&self) -> impl Iterator<Item = &Sale> {
        self.records.iter().map(sale_of)
    }

    fn rollup<F>(&self, group_by: GroupBy, keep: F) -> Vec<SummaryNode>
    where
        F: Fn(&Sale) -> bool,
    {
        let mut buckets: BTreeMap<&str, Bucket<'_>> = BTreeMap::new();
        for sale in self.sales().filter(|s| keep(*s)) {
            buckets.entry(group_key(group_by, sale)).or_default().add(sale);
        }
        buckets
            .into_iter()
            .rev()
            .map(|(period, bucket)| bucket.into_node(period.to_string()))
            .collect()
    }

    /// One node per year, most recent first.
    pub fn yearly(&self) -> Vec<SummaryNode> {
        self.rollup(GroupBy::Year, |_| true)
    }

    /// One node per year-month, most recent first.
    pub fn monthly(&self, year: Option<i32>) -> Vec<SummaryNode> {
        self.rollup(GroupBy::Month, |s| year.map_or(true, |y| year_of(&s.date) == Some(y)))
    }

    /// One node per calendar day, most recent first.
    pub fn daily(&self, year: Option<i32>, month: Option<u32>) -> Result<Vec<SummaryNode>> {
        if let Some(m) = month {
            check_month(m)?;
        }
        Ok(self.rollup(GroupBy::Day, |s| {
            year.map_or(true, |y| year_of(&s.date) == Some(y))
                && month.map_or(true, |m| month_of(&s.date) == Some(m))
        }))
    }

    pub fn pivot(&self, year: Option<i32>) -> PivotData {
        let yearly = self
            .yearly()
            .into_iter()
            .filter(|node| year.map_or(true, |y| node.period == format!("{y:04}")))
            .collect();
        PivotData {
            yearly,
            monthly: self.monthly(year),
            daily: self.rollup(GroupBy::Day, |s| year.map_or(true, |y| year_of(&s.date) == Some(y))),
        }
    }

    /// Rollup grouped by period, store or vendor, restricted to the given
    /// year, store and vendor. Groups sort by key, descending.
    pub fn custom(
        &self,
        group_by: GroupBy,
        year: Option<i32>,
        store: Option<&str>,
        vendor: Option<&str>,
    ) -> Vec<SummaryNode> {
        self.rollup(group_by, |s| {
            year.map_or(true, |y| year_of(&s.date) == Some(y))
                && store.map_or(true, |st| s.store == st)
                && vendor.map_or(true, |v| s.vendor == v)
        })
    }

    /// Member records of one period, newest date first and, within a date,
    /// latest inserted first.
    pub fn drill_down(&self, year: i32, month: Option<u32>, day: Option<u32>) -> Result<Vec<&R>> {
        if !(1000..=9999).contains(&year) {
            return Err(SalesError::InvalidPeriod {
                param: "year",
                value: year.to_string(),
            });
        }
        if let Some(m) = month {
            check_month(m)?;
        }
        if let Some(d) = day {
            let valid = match month {
                Some(m) => NaiveDate::from_ymd_opt(year, m, d).is_some(),
                None => (1..=31).contains(&d),
            };
            if !valid {
                return Err(SalesError::InvalidPeriod {
                    param: "day",
                    value: d.to_string(),
                });
            }
        }

        let mut members: Vec<(usize, &R)> = self
            .records
            .iter()
            .enumerate()
            .filter(|(_, r)| {
                let date = &sale_of(*r).date;
                year_of(date) == Some(year)
                    && month.map_or(true, |m| month_of(date) == Some(m))
                    && day.map_or(true, |d| day_of(date) == Some(d))
            })
            .collect();
        members.sort_by(|(ia, a), (ib, b)| {
            sale_of(*b)
                .date
                .cmp(&sale_of(*a).date)
                .then_with(|| ib.cmp(ia))
        });
        Ok(members.into_iter().map(|(_, r)| r).collect())
    }

    pub fn by_store(&self) -> Vec<PerformanceRow> {
        self.performance(|s| (&s.store, &s.vendor))
    }

    pub fn by_vendor(&self) -> Vec<PerformanceRow> {
        self.performance(|s| (&s.vendor, &s.store))
    }

    // `key` yields (grouping name, counterpart name).
    fn performance<'s, F>(&'s self, key: F) -> Vec<PerformanceRow>
    where
        F: Fn(&'s Sale) -> (&'s String, &'s String),
    {
        #[derive(Default)]
        struct Acc<'a> {
            items: u64,
            sales: i64,
            commission: i64,
            remaining: i64,
            first: Option<&'a str>,
            last: Option<&'a str>,
            counterparts: BTreeSet<&'a str>,
        }

        let mut groups: BTreeMap<&str, Acc<'_>> = BTreeMap::new();
        for sale in self.sales() {
            let (name, counterpart) = key(sale);
            let acc = groups.entry(name.as_str()).or_default();
            acc.items += 1;
            acc.sales += to_cents(sale.sale_price);
            acc.commission += to_cents(sale.commission);
            acc.remaining += to_cents(sale.remaining);
            let date = sale.date.as_str();
            acc.first = Some(acc.first.map_or(date, |f| f.min(date)));
            acc.last = Some(acc.last.map_or(date, |l| l.max(date)));
            acc.counterparts.insert(counterpart.as_str());
        }

        let mut rows: Vec<PerformanceRow> = groups
            .into_iter()
            .map(|(name, acc)| PerformanceRow {
                name: name.to_string(),
                total_items: acc.items,
                total_sales: from_cents(acc.sales),
                total_commission: from_cents(acc.commission),
                total_remaining: from_cents(acc.remaining),
                avg_sale_price: from_cents(acc.sales) / acc.items as f64,
                first_sale_date: acc.first.unwrap_or_default().to_string(),
                last_sale_date: acc.last.unwrap_or_default().to_string(),
                unique_counterparts: acc.counterparts.len(),
            })
            .collect();
        rows.sort_by(|a, b| {
            b.total_sales
                .total_cmp(&a.total_sales)
                .then_with(|| a.name.cmp(&b.name))
        });
        rows
    }
}

/// Build a summarizer over stored records, optionally limited to one year.
/// Records load oldest first so insertion order survives.
pub fn from_store<S: RecordStore + ?Sized>(
    store: &S,
    year: Option<i32>,
) -> Result<Summarizer<crate::models::StoredSale>> {
    let mut filter = RecordFilter {
        sort_by: SortField::Id,
        sort_order: SortOrder::Asc,
        limit: None,
        ..Default::default()
    };
    if let Some(y) = year {
        filter.date_from = Some(format!("{y:04}-01-01"));
        filter.date_to = Some(format!("{y:04}-12-31"));
    }
    let page = store.query(&filter)?;
    Ok(Summarizer::new(page.records))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sale(store: &str, vendor: &str, date: &str, price: f64) -> Sale {
        Sale {
            store: store.into(),
            vendor: vendor.into(),
            date: date.into(),
            description: "item".into(),
            sale_price: price,
            commission: (price * 0.1 * 100.0).round() / 100.0,
            remaining: price - (price * 0.1 * 100.0).round() / 100.0,
        }
    }

    fn sample() -> Summarizer<Sale> {
        Summarizer::new(vec![
            sale("Downtown", "Acme", "2023-12-31", 19.99),
            sale("Downtown", "Acme", "2024-01-15", 899.99),
            sale("Mall", "Globex", "2024-01-15", 0.1),
            sale("Mall", "Acme", "2024-01-16", 0.2),
            sale("Downtown", "Initech", "2024-03-02", 1299.0),
            sale("Mall", "Globex", "2024-03-02", 0.3),
        ])
    }

    fn cents_sum<'a>(nodes: impl Iterator<Item = &'a SummaryNode>) -> i64 {
        nodes.map(|n| to_cents(n.total_sales)).sum()
    }

    #[test]
    fn test_yearly() {
        let yearly = sample().yearly();
        let periods: Vec<_> = yearly.iter().map(|n| n.period.as_str()).collect();
        assert_eq!(periods, vec!["2024", "2023"]);
        assert_eq!(yearly[0].items_sold, 5);
        assert_eq!(yearly[0].unique_stores, 2);
        assert_eq!(yearly[0].unique_vendors, 3);
        assert_eq!(yearly[0].total_sales, 2199.59);
    }

    #[test]
    fn test_monthly_filtered_by_year() {
        let monthly = sample().monthly(Some(2024));
        let periods: Vec<_> = monthly.iter().map(|n| n.period.as_str()).collect();
        assert_eq!(periods, vec!["2024-03", "2024-01"]);
        assert_eq!(monthly[1].items_sold, 3);
        assert_eq!(monthly[1].total_sales, 900.29);
    }

    #[test]
    fn test_daily() {
        let s = sample();
        let daily = s.daily(Some(2024), Some(1)).unwrap();
        let periods: Vec<_> = daily.iter().map(|n| n.period.as_str()).collect();
        assert_eq!(periods, vec!["2024-01-16", "2024-01-15"]);
        assert_eq!(daily[1].items_sold, 2);
        assert_eq!(s.daily(None, None).unwrap().len(), 4);
        assert!(matches!(
            s.daily(Some(2024), Some(13)),
            Err(SalesError::InvalidPeriod { param: "month", .. })
        ));
    }

    #[test]
    fn test_parent_sums_equal_children() {
        let s = sample();
        for year in s.yearly() {
            let y: i32 = year.period.parse().unwrap();
            let months = s.monthly(Some(y));
            let days = s.daily(Some(y), None).unwrap();
            assert_eq!(to_cents(year.total_sales), cents_sum(months.iter()));
            assert_eq!(to_cents(year.total_sales), cents_sum(days.iter()));
            assert_eq!(year.items_sold, months.iter().map(|m| m.items_sold).sum::<u64>());
            assert_eq!(year.items_sold, days.iter().map(|d| d.items_sold).sum::<u64>());
            let commission: i64 = months.iter().map(|m| to_cents(m.total_commission)).sum();
            assert_eq!(to_cents(year.total_commission), commission);
            let remaining: i64 = days.iter().map(|d| to_cents(d.total_remaining)).sum();
            assert_eq!(to_cents(year.total_remaining), remaining);
        }
    }

    #[test]
    fn test_drill_down_order() {
        let s = sample();
        let records = s.drill_down(2024, Some(1), None).unwrap();
        let got: Vec<_> = records.iter().map(|r| (r.date.as_str(), r.store.as_str())).collect();
        assert_eq!(
            got,
            vec![("2024-01-16", "Mall"), ("2024-01-15", "Mall"), ("2024-01-15", "Downtown")]
        );
        assert_eq!(s.drill_down(2024, None, None).unwrap().len(), 5);
        assert_eq!(s.drill_down(2024, Some(3), Some(2)).unwrap().len(), 2);
        assert!(s.drill_down(2022, None, None).unwrap().is_empty());
    }

    #[test]
    fn test_drill_down_rejects_bad_keys() {
        let s = sample();
        for (month, day, param) in [(Some(0), None, "month"), (Some(2), Some(30), "day"), (None, Some(32), "day")] {
            match s.drill_down(2024, month, day) {
                Err(SalesError::InvalidPeriod { param: p, .. }) => assert_eq!(p, param),
                other => panic!("expected invalid {param}, got {:?}", other.map(|r| r.len())),
            }
        }
        assert!(s.drill_down(2024, Some(2), Some(29)).is_ok());
        assert!(s.drill_down(24, None, None).is_err());
    }

    #[test]
    fn test_pivot() {
        let pivot = sample().pivot(Some(2023));
        assert_eq!(pivot.yearly.len(), 1);
        assert_eq!(pivot.monthly.len(), 1);
        assert_eq!(pivot.daily.len(), 1);
        assert_eq!(pivot.daily[0].period, "2023-12-31");
    }

    #[test]
    fn test_store_and_vendor_performance() {
        let s = sample();
        let stores = s.by_store();
        assert_eq!(stores[0].name, "Downtown");
        assert_eq!(stores[0].total_items, 3);
        assert_eq!(stores[0].first_sale_date, "2023-12-31");
        assert_eq!(stores[0].last_sale_date, "2024-03-02");
        assert_eq!(stores[0].unique_counterparts, 2);

        let vendors = s.by_vendor();
        let names: Vec<_> = vendors.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["Initech", "Acme", "Globex"]);
        assert_eq!(vendors[2].total_sales, 0.4);
        assert_eq!(vendors[2].avg_sale_price, 0.2);
        assert_eq!(vendors[1].unique_counterparts, 2);
    }

    #[test]
    fn test_custom_by_store_within_year() {
        let nodes = sample().custom(GroupBy::Store, Some(2024), None, None);
        let keys: Vec<_> = nodes.iter().map(|n| n.period.as_str()).collect();
        assert_eq!(keys, vec!["Mall", "Downtown"]);
        assert_eq!(nodes[1].items_sold, 2);
        assert_eq!(nodes[1].total_sales, 2198.99);
        assert_eq!(nodes[0].unique_vendors, 2);
    }

    #[test]
    fn test_custom_filters_store_and_vendor() {
        let s = sample();
        let nodes = s.custom(GroupBy::Month, None, Some("Mall"), Some("Globex"));
        let keys: Vec<_> = nodes.iter().map(|n| n.period.as_str()).collect();
        assert_eq!(keys, vec!["2024-03", "2024-01"]);
        assert_eq!(s.custom(GroupBy::Year, None, None, None), s.yearly());
        assert!(s.custom(GroupBy::Day, None, Some("Nowhere"), None).is_empty());
    }

    #[test]
    fn test_empty_input() {
        let s: Summarizer<Sale> = Summarizer::new(Vec::new());
        assert!(s.yearly().is_empty());
        assert!(s.by_store().is_empty());
    }

    #[test]
    fn test_from_store_limits_to_year() {
        use crate::store::SqliteStore;

        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(&dir.path().join("test.db")).unwrap();
        store
            .create_batch(&[
                sale("Downtown", "Acme", "2023-12-31", 19.99),
                sale("Mall", "Globex", "2024-01-15", 100.0),
                sale("Mall", "Acme", "2024-01-15", 50.0),
            ])
            .unwrap();

        let all = from_store(&store, None).unwrap();
        assert_eq!(all.yearly().len(), 2);

        let only_2024 = from_store(&store, Some(2024)).unwrap();
        let yearly = only_2024.yearly();
        assert_eq!(yearly.len(), 1);
        assert_eq!(yearly[0].total_sales, 150.0);

        // same date: the later insert comes first
        let drilled = only_2024.drill_down(2024, Some(1), Some(15)).unwrap();
        assert_eq!(drilled[0].sale.vendor, "Acme");
        assert_eq!(drilled[1].sale.vendor, "Globex");
    }
}
