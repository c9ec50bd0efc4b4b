#[cfg(test)]
mod tests {
    use super::super::store::*;
    use analysis_core::{MarketData, StockRecord};
    use chrono::{Duration, NaiveDate};

    fn record(code: &str, name: &str, day: i64, close: f64, volume: f64, tx: u64) -> StockRecord {
        StockRecord {
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(day),
            stock_code: code.to_string(),
            stock_name: name.to_string(),
            group: Some("11".into()),
            open: close,
            close,
            high: close,
            low: close,
            volume,
            num_transactions: tx,
            capital: close * volume,
        }
    }

    fn sample_store() -> StockStore {
        let mut records = Vec::new();
        for day in 0..40 {
            records.push(record("TN0001800457", "BIAT", day, 90.0 + day as f64 * 0.5, 2000.0, 20));
        }
        for day in 0..10 {
            records.push(record("TN9999999999", "PETITE VALEUR", day, 5.0, 50.0, 1));
        }
        StockStore::new(records)
    }

    #[test]
    fn test_store_groups_and_sorts() {
        let store = sample_store();
        assert_eq!(store.len(), 50);
        assert_eq!(store.get_all_stocks(), vec!["TN0001800457", "TN9999999999"]);
        let history = store.history("TN0001800457");
        assert!(history.windows(2).all(|w| w[0].date < w[1].date));
        assert!(store.history("UNKNOWN").is_empty());
    }

    #[test]
    fn test_duplicate_session_keeps_last() {
        let store = StockStore::new(vec![
            record("TN0001800457", "BIAT", 0, 90.0, 10.0, 1),
            record("TN0001800457", "BIAT", 0, 95.0, 10.0, 1),
        ]);
        assert_eq!(store.history("TN0001800457").len(), 1);
        assert_eq!(store.get_current_price("TN0001800457").unwrap(), 95.0);
    }

    #[test]
    fn test_get_stock_data_filters() {
        let store = sample_store();
        let start = NaiveDate::from_ymd_opt(2024, 1, 11).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 20).unwrap();
        let rows = store
            .get_stock_data("TN0001800457", Some(start), Some(end), None)
            .unwrap();
        assert_eq!(rows.len(), 10);
        assert!(store.get_stock_data("NOPE", None, None, None).is_err());

        let rows = store
            .get_stock_data("TN9999999999", None, None, Some(100.0))
            .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_liquid_stocks_and_ranking() {
        let store = sample_store();
        assert_eq!(store.get_liquid_stocks(1000.0, 30), vec!["TN0001800457"]);
        let ranks = store.most_liquid(5);
        assert_eq!(ranks.len(), 2);
        assert_eq!(ranks[0].code, "TN0001800457");
        assert_eq!(ranks[0].name, "BIAT");
        assert!(ranks[0].liq_score > ranks[1].liq_score);
    }

    #[test]
    fn test_names_fall_back_to_data_then_code() {
        let store = sample_store();
        assert_eq!(store.get_stock_name("TN0001800457"), "BIAT");
        assert_eq!(store.get_stock_name("TN9999999999"), "PETITE VALEUR");
        assert_eq!(store.get_stock_name("TN0000000001"), "TN0000000001");
    }

    #[test]
    fn test_summary_and_history() {
        let store = sample_store();
        let summary = store.get_stock_summary("TN0001800457").unwrap();
        assert_eq!(summary.num_data_points, 40);
        assert_eq!(summary.current_price, 109.5);
        assert_eq!(summary.previous_close, 109.0);
        assert!((summary.change_pct - 0.5 / 109.0 * 100.0).abs() < 1e-9);
        assert_eq!(summary.min_price_30d, 95.0);
        assert_eq!(summary.max_price_30d, 109.5);
        assert_eq!(summary.date_range, "2024-01-01 to 2024-02-09");
        assert_eq!(store.get_price_history("TN0001800457", 5).len(), 5);
        assert!(store.get_stock_summary("NOPE").is_err());
    }

    #[test]
    fn test_market_data_impl() {
        let store = sample_store();
        let closes = store.closes("TN0001800457");
        assert_eq!(closes.len(), 40);
        assert_eq!(store.current_price("TN9999999999").unwrap(), 5.0);
        assert!(store.current_price("NOPE").is_err());
        assert_eq!(store.volatility("TN9999999999", 30), Some(0.0));
    }
}
