// ═══════════════════════════════════════════════════════════════════
// Service Tests — CategoryService, AggregationService,
// PortfolioService, PriceSimulator
// ═══════════════════════════════════════════════════════════════════

use chrono::Utc;
use std::collections::HashMap;

use finance_dashboard_core::errors::CoreError;
use finance_dashboard_core::models::portfolio::{PortfolioHolding, TradingPosition};
use finance_dashboard_core::models::record::{BudgetLimit, FinancialRecord};
use finance_dashboard_core::services::aggregation_service::{percent_of, AggregationService};
use finance_dashboard_core::services::category_service::{
    CategoryService, FALLBACK_COLOR, FALLBACK_ICON,
};
use finance_dashboard_core::services::portfolio_service::PortfolioService;
use finance_dashboard_core::services::simulation::{base_price, PriceSimulator};

fn rec(date: &str, category: &str, amount: f64) -> FinancialRecord {
    FinancialRecord::new(date, category, amount)
}

// ═══════════════════════════════════════════════════════════════════
//  CategoryService
// ═══════════════════════════════════════════════════════════════════

mod category_service {
    use super::*;

    #[test]
    fn known_labels_have_icons() {
        let svc = CategoryService::new();
        assert_eq!(svc.classify("Housing"), ("Home", "#41B883"));
        assert_eq!(svc.classify("Food"), ("Pizza", "#FF6384"));
        assert_eq!(svc.icon_for("Groceries"), "ShoppingCart");
        assert_eq!(svc.icon_for("Dining Out"), "Utensils");
        assert_eq!(svc.icon_for("Healthcare"), "HeartPulse");
        assert_eq!(svc.color_for("Shopping"), "#9966FF");
    }

    #[test]
    fn known_label_without_color_is_gray() {
        let svc = CategoryService::new();
        assert_eq!(svc.classify("Utilities"), ("Monitor", FALLBACK_COLOR));
    }

    #[test]
    fn unknown_label_falls_back() {
        let svc = CategoryService::new();
        assert_eq!(svc.classify("Crypto Gambling"), (FALLBACK_ICON, FALLBACK_COLOR));
        assert_eq!(svc.classify(""), (FALLBACK_ICON, FALLBACK_COLOR));
    }

    #[test]
    fn matching_is_case_sensitive() {
        let svc = CategoryService::new();
        assert_eq!(svc.icon_for("housing"), FALLBACK_ICON);
    }

    #[test]
    fn covers_required_labels() {
        let svc = CategoryService::new();
        let known: Vec<&str> = svc.known_categories().collect();
        for label in [
            "Housing", "Groceries", "Food", "Transportation", "Dining Out", "Entertainment",
            "Utilities", "Travel", "Bills", "Healthcare", "Education", "Shopping", "Other",
        ] {
            assert!(known.contains(&label), "missing {label}");
            assert_ne!(svc.icon_for(label), FALLBACK_ICON);
        }
    }
}

// ═══════════════════════════════════════════════════════════════════
//  AggregationService — budget
// ═══════════════════════════════════════════════════════════════════

mod aggregate_budget {
    use super::*;

    #[test]
    fn food_and_salary_scenario() {
        let records = vec![
            rec("2025-01-02", "Food", -20.0),
            rec("2025-01-03", "Food", -30.0),
            rec("2025-01-04", "Salary", 500.0),
        ];
        let limits = vec![BudgetLimit::new("Food", 100.0)];

        let report = AggregationService::new().aggregate_budget(&records, &limits);

        let food = report.summary_for("Food").unwrap();
        assert_eq!(food.spent, 50.0);
        assert_eq!(food.budget, 100.0);
        assert_eq!(food.icon, "Pizza");
        let salary = report.summary_for("Salary").unwrap();
        assert_eq!(salary.spent, 0.0);
        assert_eq!(salary.budget, 0.0);

        assert_eq!(report.total_spent, 50.0);
        assert_eq!(report.total_budget, 100.0);
        assert_eq!(report.percent_spent, 50.0);
    }

    #[test]
    fn zero_budget_means_zero_percent() {
        let records = vec![rec("2025-01-02", "Food", -50.0)];
        let report = AggregationService::new().aggregate_budget(&records, &[]);
        assert_eq!(report.total_budget, 0.0);
        assert_eq!(report.total_spent, 50.0);
        assert_eq!(report.percent_spent, 0.0);
        assert!(report.percent_spent.is_finite());
    }

    #[test]
    fn total_spent_is_sum_of_expenses_across_categories() {
        let records = vec![
            rec("2025-01-01", "Housing", -1200.0),
            rec("2025-01-02", "Food", -45.5),
            rec("2025-01-03", "Travel", -300.25),
            rec("2025-01-04", "Refund", 80.0),
            rec("2025-01-05", "Food", -4.5),
            rec("2025-01-06", "Bills", -100.0),
        ];
        let expected: f64 = records
            .iter()
            .filter(|r| r.amount < 0.0)
            .map(|r| r.amount.abs())
            .sum();
        let report = AggregationService::new().aggregate_budget(&records, &[]);
        assert!((report.total_spent - expected).abs() < 1e-9);
    }

    #[test]
    fn categories_in_order_of_first_appearance() {
        let records = vec![
            rec("2025-01-01", "Travel", -1.0),
            rec("2025-01-02", "Food", -1.0),
            rec("2025-01-03", "Travel", -1.0),
            rec("2025-01-04", "Bills", -1.0),
        ];
        let report = AggregationService::new().aggregate_budget(&records, &[]);
        let order: Vec<&str> = report.summaries.iter().map(|s| s.category.as_str()).collect();
        assert_eq!(order, vec!["Travel", "Food", "Bills"]);
    }

    #[test]
    fn duplicate_limits_last_wins() {
        let records = vec![rec("2025-01-01", "Food", -10.0)];
        let limits = vec![BudgetLimit::new("Food", 100.0), BudgetLimit::new("Food", 40.0)];
        let report = AggregationService::new().aggregate_budget(&records, &limits);
        assert_eq!(report.total_budget, 40.0);
        assert_eq!(report.percent_spent, 25.0);
    }

    #[test]
    fn limit_without_records_is_not_counted() {
        let records = vec![rec("2025-01-01", "Food", -10.0)];
        let limits = vec![BudgetLimit::new("Food", 20.0), BudgetLimit::new("Travel", 500.0)];
        let report = AggregationService::new().aggregate_budget(&records, &limits);
        assert_eq!(report.summaries.len(), 1);
        assert_eq!(report.total_budget, 20.0);
    }

    #[test]
    fn percent_is_rounded() {
        let records = vec![rec("2025-01-01", "Food", -1.0)];
        let limits = vec![BudgetLimit::new("Food", 3.0)];
        let report = AggregationService::new().aggregate_budget(&records, &limits);
        assert_eq!(report.percent_spent, 33.0);
    }

    #[test]
    fn empty_input() {
        let report = AggregationService::new().aggregate_budget(&[], &[]);
        assert!(report.summaries.is_empty());
        assert_eq!(report.total_budget, 0.0);
        assert_eq!(report.total_spent, 0.0);
        assert_eq!(report.percent_spent, 0.0);
    }

    #[test]
    fn percent_of_helper() {
        assert_eq!(percent_of(50.0, 0.0), 0.0);
        assert_eq!(percent_of(0.0, 0.0), 0.0);
        assert_eq!(percent_of(150.0, 100.0), 150.0);
    }
}

// ═══════════════════════════════════════════════════════════════════
//  AggregationService — overview
// ═══════════════════════════════════════════════════════════════════

mod aggregate_overview {
    use super::*;

    #[test]
    fn monthly_balance_sums() {
        let records = vec![
            rec("2025-01-05", "Salary", 3000.0),
            rec("2025-01-10", "Housing", -1200.0),
            rec("2025-01-20", "Food", -300.0),
        ];
        let report = AggregationService::new().aggregate_overview(&records).unwrap();
        assert_eq!(report.balance_history.len(), 1);
        let jan = &report.balance_history[0];
        assert_eq!(jan.month, "Jan");
        assert_eq!(jan.income, 3000.0);
        assert_eq!(jan.expenses, 1500.0);
        assert_eq!(jan.balance, 1500.0);
        assert_eq!(report.total_balance, 1500.0);
    }

    #[test]
    fn balance_history_is_chronological_for_reverse_input() {
        let records = vec![
            rec("2025-04-01", "Food", -10.0),
            rec("2025-03-01", "Food", -10.0),
            rec("2025-02-01", "Food", -10.0),
            rec("2025-01-01", "Food", -10.0),
        ];
        let report = AggregationService::new().aggregate_overview(&records).unwrap();
        let months: Vec<&str> = report.balance_history.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(months, vec!["Jan", "Feb", "Mar", "Apr"]);
    }

    #[test]
    fn balance_history_is_chronological_for_category_major_input() {
        let records = vec![
            rec("2025-03-15", "Food", -10.0),
            rec("2025-01-15", "Food", -10.0),
            rec("2025-02-01", "Salary", 100.0),
            rec("2025-03-01", "Salary", 100.0),
            rec("2025-01-01", "Salary", 100.0),
        ];
        let report = AggregationService::new().aggregate_overview(&records).unwrap();
        let months: Vec<&str> = report.balance_history.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(months, vec!["Jan", "Feb", "Mar"]);
        for m in &report.balance_history {
            assert_eq!(m.balance, m.income - m.expenses);
        }
    }

    #[test]
    fn same_month_of_different_years_is_merged() {
        let records = vec![
            rec("2024-01-10", "Salary", 100.0),
            rec("2025-01-10", "Salary", 200.0),
        ];
        let report = AggregationService::new().aggregate_overview(&records).unwrap();
        assert_eq!(report.balance_history.len(), 1);
        assert_eq!(report.balance_history[0].income, 300.0);
    }

    #[test]
    fn category_totals_use_absolute_values() {
        let records = vec![
            rec("2025-01-01", "Food", -20.0),
            rec("2025-01-02", "Food", 5.0),
            rec("2025-01-03", "Travel", -100.0),
        ];
        let report = AggregationService::new().aggregate_overview(&records).unwrap();
        let food = &report.expenses_by_category[0];
        assert_eq!(food.category, "Food");
        assert_eq!(food.value, 25.0);
        assert_eq!(food.color, "#FF6384");
        assert_eq!(report.expenses_by_category[1].value, 100.0);
    }

    #[test]
    fn recent_transactions_top_five_newest_first() {
        let records: Vec<FinancialRecord> = (1..=8)
            .map(|d| rec(&format!("2025-01-{d:02}"), "Food", -(d as f64)))
            .collect();
        let report = AggregationService::new().aggregate_overview(&records).unwrap();
        let dates: Vec<&str> = report.recent_transactions.iter().map(|t| t.date.as_str()).collect();
        assert_eq!(
            dates,
            vec!["2025-01-08", "2025-01-07", "2025-01-06", "2025-01-05", "2025-01-04"]
        );
    }

    #[test]
    fn recent_transactions_shorter_than_five() {
        let records = vec![rec("2025-01-01", "Food", -1.0), rec("2025-01-03", "Food", -1.0)];
        let report = AggregationService::new().aggregate_overview(&records).unwrap();
        assert_eq!(report.recent_transactions.len(), 2);
        assert_eq!(report.recent_transactions[0].date, "2025-01-03");
    }

    #[test]
    fn recent_transactions_compare_real_timestamps() {
        let records = vec![
            rec("2025-01-02T09:00:00Z", "Food", -1.0),
            rec("2025-01-02T18:00:00Z", "Travel", -1.0),
            rec("2025-01-01", "Bills", -1.0),
        ];
        let report = AggregationService::new().aggregate_overview(&records).unwrap();
        assert_eq!(report.recent_transactions[0].category, "Travel");
        assert_eq!(report.recent_transactions[2].category, "Bills");
    }

    #[test]
    fn description_falls_back_to_category() {
        let records = vec![
            FinancialRecord::with_description("2025-01-02", "Food", -12.0, "Farmers market"),
            rec("2025-01-01", "Bills", -50.0),
        ];
        let report = AggregationService::new().aggregate_overview(&records).unwrap();
        assert_eq!(report.recent_transactions[0].description, "Farmers market");
        assert_eq!(report.recent_transactions[1].description, "Bills");
    }

    #[test]
    fn unparseable_date_fails_the_pass() {
        let records = vec![rec("2025-01-01", "Food", -1.0), rec("yesterday", "Food", -1.0)];
        let result = AggregationService::new().aggregate_overview(&records);
        match result {
            Err(CoreError::InvalidDate(raw)) => assert_eq!(raw, "yesterday"),
            other => panic!("expected InvalidDate, got {other:?}"),
        }
    }

    #[test]
    fn empty_input() {
        let report = AggregationService::new().aggregate_overview(&[]).unwrap();
        assert!(report.balance_history.is_empty());
        assert!(report.expenses_by_category.is_empty());
        assert!(report.recent_transactions.is_empty());
        assert_eq!(report.total_balance, 0.0);
    }
}

// ═══════════════════════════════════════════════════════════════════
//  PortfolioService
// ═══════════════════════════════════════════════════════════════════

mod portfolio_service {
    use super::*;

    fn holding(symbol: &str, shares: f64, current_price: Option<f64>) -> PortfolioHolding {
        PortfolioHolding {
            symbol: symbol.into(),
            shares,
            purchase_price: 1.0,
            current_price,
        }
    }

    fn position(symbol: &str, unrealized_pl: f64) -> TradingPosition {
        TradingPosition {
            symbol: symbol.into(),
            quantity: 1.0,
            market_value: 100.0,
            unrealized_pl,
        }
    }

    #[test]
    fn totals() {
        let svc = PortfolioService::new();
        let summary = svc.summarize(
            &[holding("AAPL", 10.0, Some(150.0)), holding("MSFT", 2.0, Some(300.0))],
            &[position("TSLA", 25.0), position("NVDA", -10.5)],
        );
        assert_eq!(summary.total_investment, 2100.0);
        assert_eq!(summary.total_unrealized_pl, 14.5);
    }

    #[test]
    fn unpriced_holding_contributes_nothing() {
        let svc = PortfolioService::new();
        let total = svc.total_investment(&[holding("AAPL", 10.0, None), holding("MSFT", 1.0, Some(5.0))]);
        assert_eq!(total, 5.0);
    }

    #[test]
    fn empty_inputs() {
        let summary = PortfolioService::new().summarize(&[], &[]);
        assert_eq!(summary.total_investment, 0.0);
        assert_eq!(summary.total_unrealized_pl, 0.0);
    }

    #[test]
    fn holding_without_current_price_deserializes() {
        let json = r#"{"symbol":"AAPL","shares":3,"purchase_price":120.0,"current_price":null}"#;
        let h: PortfolioHolding = serde_json::from_str(json).unwrap();
        assert_eq!(h.current_price, None);
    }
}

// ═══════════════════════════════════════════════════════════════════
//  PriceSimulator
// ═══════════════════════════════════════════════════════════════════

mod price_simulator {
    use super::*;

    #[test]
    fn step_stays_within_swing() {
        let mut sim = PriceSimulator::with_seed(7);
        for _ in 0..1_000 {
            let next = sim.next_price(200.0);
            assert!((194.0..=206.0).contains(&next), "{next} out of range");
        }
    }

    #[test]
    fn prices_are_rounded_to_cents() {
        let mut sim = PriceSimulator::with_seed(3);
        for _ in 0..100 {
            let next = sim.next_price(123.45);
            assert!(((next * 100.0).round() - next * 100.0).abs() < 1e-6);
        }
    }

    #[test]
    fn same_seed_same_walk() {
        let mut a = PriceSimulator::with_seed(42);
        let mut b = PriceSimulator::with_seed(42);
        for _ in 0..10 {
            assert_eq!(a.next_price(100.0), b.next_price(100.0));
        }
    }

    #[test]
    fn base_prices() {
        assert_eq!(base_price("AAPL"), 174.82);
        assert_eq!(base_price("TSLA"), 224.57);
        assert_eq!(base_price("ZZZZ"), 100.0);
    }

    #[test]
    fn tick_produces_one_row_per_symbol() {
        let mut sim = PriceSimulator::with_seed(1);
        let symbols = vec!["AAPL".to_string(), "XYZ".to_string()];
        let mut known = HashMap::new();
        known.insert("XYZ".to_string(), 10.0);
        let now = Utc::now();

        let rows = sim.tick(&symbols, &known, now);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].symbol, "AAPL");
        assert!((rows[0].price - 174.82).abs() <= 174.82 * 0.03 + 0.01);
        assert!((rows[1].price - 10.0).abs() <= 0.31);
        assert!(rows.iter().all(|r| r.timestamp == now));
    }
}
