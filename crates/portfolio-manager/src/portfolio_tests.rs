#[cfg(test)]
mod tests {
    use super::super::error::PortfolioError;
    use super::super::metrics::CASH_KEY;
    use super::super::portfolio::*;
    use analysis_core::RiskProfile;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    const ATTIJARI: &str = "TN0001600154";
    const BIAT: &str = "TN0001800457";

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    /// 100 ATTIJARI at 50, half sold at 55, then a losing BIAT round trip.
    fn traded_portfolio() -> Portfolio {
        let mut p = Portfolio::default();
        p.buy(ATTIJARI, "ATTIJARI BANK", 100, dec!(50), day(1)).unwrap();
        p.sell(ATTIJARI, 50, dec!(55), day(2)).unwrap();
        p.buy(BIAT, "BIAT", 10, dec!(100), day(3)).unwrap();
        p.sell(BIAT, 10, dec!(90), day(3)).unwrap();
        p
    }

    #[test]
    fn test_defaults() {
        let p = Portfolio::default();
        assert_eq!(p.name(), "Mon Portefeuille");
        assert_eq!(p.cash(), dec!(10000));
        assert_eq!(p.profile(), RiskProfile::Moderate);
        assert!(p.holdings().is_empty());
    }

    #[test]
    fn test_buy_then_sell_restores_cash_exactly() {
        let cases = [
            (38u64, dec!(51.5)),
            (1000, dec!(0.55)),
            (7, dec!(12.345)),
            (3, dec!(93.9)),
            (1, dec!(0.001)),
        ];
        for (quantity, price) in cases {
            let mut p = Portfolio::default();
            p.buy(BIAT, "BIAT", 10, dec!(93.9), day(1)).unwrap();
            let before = p.cash();

            p.buy(ATTIJARI, "ATTIJARI BANK", quantity, price, day(2)).unwrap();
            let sale = p.sell(ATTIJARI, quantity, price, day(2)).unwrap();

            assert_eq!(p.cash(), before, "{} @ {}", quantity, price);
            assert_eq!(sale.profit_loss, Some(Decimal::ZERO));
            assert!(p.holding(ATTIJARI).is_none());
        }
    }

    #[test]
    fn test_round_trip_on_top_of_existing_position() {
        let mut p = Portfolio::default();
        p.buy(ATTIJARI, "ATTIJARI BANK", 10, dec!(50), day(1)).unwrap();
        let before = p.cash();
        p.buy(ATTIJARI, "ATTIJARI BANK", 7, dec!(53.123), day(2)).unwrap();
        p.sell(ATTIJARI, 7, dec!(53.123), day(2)).unwrap();
        assert_eq!(p.cash(), before);
        assert_eq!(p.holding(ATTIJARI).unwrap().quantity, 10);
    }

    #[test]
    fn test_weighted_average_and_realized_profit() {
        let mut p = Portfolio::default();
        p.buy(ATTIJARI, "ATTIJARI BANK", 10, dec!(50), day(1)).unwrap();
        p.buy(ATTIJARI, "ATTIJARI BANK", 30, dec!(54), day(2)).unwrap();

        let holding = p.holding(ATTIJARI).unwrap();
        assert_eq!(holding.avg_price, dec!(53));
        assert_eq!(holding.quantity, 40);
        assert_eq!(holding.first_buy_date, day(1));
        assert_eq!(holding.last_buy_date, day(2));

        let sale = p.sell(ATTIJARI, 20, dec!(60), day(3)).unwrap();
        assert_eq!(sale.kind, TransactionType::Sell);
        assert_eq!(sale.total, dec!(1200));
        assert_eq!(sale.profit_loss, Some(dec!(140)));
        assert_eq!(sale.cash_after, dec!(9080));
        assert_eq!(p.holding(ATTIJARI).unwrap().quantity, 20);
        assert_eq!(p.holding(ATTIJARI).unwrap().avg_price, dec!(53));
    }

    #[test]
    fn test_rejected_orders_leave_ledger_untouched() {
        let mut p = Portfolio::default();
        p.buy(ATTIJARI, "ATTIJARI BANK", 10, dec!(50), day(1)).unwrap();
        let cash = p.cash();

        let err = p.buy(BIAT, "BIAT", 1000, dec!(51.5), day(2)).unwrap_err();
        assert!(matches!(err, PortfolioError::InsufficientFunds { .. }));
        assert_eq!(
            err.to_string(),
            "Fonds insuffisants. Requis: 51500.00 TND, Disponible: 9500.00 TND"
        );

        let err = p.sell(BIAT, 1, dec!(90), day(2)).unwrap_err();
        assert_eq!(err.to_string(), format!("Vous ne possedez pas {}", BIAT));

        let err = p.sell(ATTIJARI, 11, dec!(50), day(2)).unwrap_err();
        assert_eq!(err.to_string(), "Quantite insuffisante. Disponible: 10, Demande: 11");

        assert!(matches!(
            p.buy(BIAT, "BIAT", 0, dec!(90), day(2)),
            Err(PortfolioError::InvalidQuantity)
        ));
        assert!(matches!(
            p.buy(BIAT, "BIAT", 1, dec!(0), day(2)),
            Err(PortfolioError::InvalidPrice(_))
        ));
        assert!(matches!(
            p.sell(ATTIJARI, 1, dec!(-1), day(2)),
            Err(PortfolioError::InvalidPrice(_))
        ));
        assert!(err.is_rejection());

        assert_eq!(p.cash(), cash);
        assert_eq!(p.transactions().len(), 1);
    }

    #[test]
    fn test_full_sale_removes_position() {
        let mut p = Portfolio::default();
        p.buy(ATTIJARI, "ATTIJARI BANK", 10, dec!(50), day(1)).unwrap();
        p.sell(ATTIJARI, 10, dec!(52), day(2)).unwrap();
        assert!(p.holdings().is_empty());
        assert_eq!(p.realized_profit(), dec!(20));
    }

    #[test]
    fn test_daily_value_last_write_wins() {
        let p = traded_portfolio();
        let values: Vec<(NaiveDate, Decimal)> = p.daily_values().iter().map(|d| (d.date, d.value)).collect();
        assert_eq!(
            values,
            vec![(day(1), dec!(10000)), (day(2), dec!(10500)), (day(3), dec!(10150))]
        );
    }

    #[test]
    fn test_performance_metrics() {
        let p = traded_portfolio();
        let prices = PriceMap::from([(ATTIJARI.to_string(), dec!(60))]);
        let m = p.performance_metrics(&prices);

        assert_eq!(m.total_value, 10650.0);
        assert_eq!(m.cash, 7650.0);
        assert_eq!(m.holdings_value, 3000.0);
        assert_eq!(m.total_gain_loss, 650.0);
        assert_eq!(m.roi_percentage, 6.5);
        assert_eq!(m.realized_profit, 150.0);
        assert_eq!(m.unrealized_profit, 500.0);
        assert_eq!(m.win_rate, 50.0);
        assert_eq!(m.max_drawdown, 3.33);
        assert!(m.sharpe_ratio > 0.0);
        assert_eq!((m.num_positions, m.num_transactions, m.num_closed_trades), (1, 4, 2));
    }

    #[test]
    fn test_fresh_portfolio_metrics_are_zero() {
        let m = Portfolio::default().performance_metrics(&PriceMap::new());
        assert_eq!(m.roi_percentage, 0.0);
        assert_eq!(m.win_rate, 0.0);
        assert_eq!(m.sharpe_ratio, 0.0);
        assert_eq!(m.max_drawdown, 0.0);
    }

    #[test]
    fn test_allocation_includes_cash() {
        let p = traded_portfolio();
        let prices = PriceMap::from([(ATTIJARI.to_string(), dec!(60))]);
        let allocation = p.allocation(&prices);
        assert_eq!(allocation[CASH_KEY], 71.83);
        assert_eq!(allocation[ATTIJARI], 28.17);

        let empty = Portfolio::default().allocation(&PriceMap::new());
        assert_eq!(empty.len(), 1);
        assert_eq!(empty[CASH_KEY], 100.0);
    }

    #[test]
    fn test_position_details_sorted_by_value() {
        let mut p = Portfolio::default();
        p.buy(ATTIJARI, "ATTIJARI BANK", 10, dec!(10), day(1)).unwrap();
        p.buy(BIAT, "BIAT", 5, dec!(100), day(1)).unwrap();
        let prices = PriceMap::from([(ATTIJARI.to_string(), dec!(12))]);

        let details = p.position_details(&prices);
        assert_eq!(details[0].stock_code, BIAT);
        assert_eq!(details[0].current_price, 100.0);
        assert!(!details[0].is_profitable);
        assert_eq!(details[1].gain_loss, 20.0);
        assert_eq!(details[1].gain_loss_pct, 20.0);
        assert!(details[1].is_profitable);
    }

    #[test]
    fn test_transaction_history_newest_first() {
        let p = traded_portfolio();
        let recent = p.transaction_history(Some(2), None);
        assert_eq!(recent.len(), 2);
        assert_eq!((recent[0].kind, recent[0].stock_code.as_str()), (TransactionType::Sell, BIAT));
        assert_eq!((recent[1].kind, recent[1].stock_code.as_str()), (TransactionType::Buy, BIAT));

        let sells = p.transaction_history(None, Some(TransactionType::Sell));
        let codes: Vec<&str> = sells.iter().map(|t| t.stock_code.as_str()).collect();
        assert_eq!(codes, vec![BIAT, ATTIJARI]);
        assert_eq!(TransactionType::parse("vente"), Some(TransactionType::Sell));
        assert_eq!(TransactionType::parse("hold"), None);
    }

    #[test]
    fn test_snapshot() {
        let mut p = traded_portfolio();
        let prices = PriceMap::from([(ATTIJARI.to_string(), dec!(60))]);
        let snap = p.take_snapshot(&prices, day(4));
        assert_eq!(snap.total_value, dec!(10650));
        assert_eq!(snap.num_positions, 1);
        assert_eq!(p.snapshots().len(), 1);
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("bvmt_portfolio_{}_{}.json", std::process::id(), line!()));
        let mut p = traded_portfolio();
        p.take_snapshot(&PriceMap::new(), day(4));
        p.save(&path).unwrap();

        let loaded = Portfolio::load(&path).unwrap();
        assert_eq!(loaded.name(), p.name());
        assert_eq!(loaded.cash(), p.cash());
        assert_eq!(loaded.holdings(), p.holdings());
        assert_eq!(loaded.transactions(), p.transactions());
        assert_eq!(loaded.daily_values().len(), 3);

        // older files carry snapshots only
        let mut raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        raw.as_object_mut().unwrap().remove("daily_values");
        std::fs::write(&path, raw.to_string()).unwrap();
        let legacy = Portfolio::load(&path).unwrap();
        assert_eq!(legacy.daily_values().len(), 1);
        assert_eq!(legacy.daily_values()[0].date, day(4));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_export_transactions_csv() {
        let p = traded_portfolio();
        let mut out = Vec::new();
        assert_eq!(p.export_transactions_csv(&mut out).unwrap(), 4);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(
            lines[0],
            "type,stock_code,stock_name,quantity,price,total,date,timestamp,cash_after,profit_loss"
        );
        assert!(lines[1].starts_with("BUY,TN0001600154,ATTIJARI BANK,100,50,5000,2024-03-01,"));
        assert!(lines[1].ends_with(','));
        assert!(lines[2].starts_with("SELL,TN0001600154,ATTIJARI BANK,50,55,2750,2024-03-02,"));
    }
}
