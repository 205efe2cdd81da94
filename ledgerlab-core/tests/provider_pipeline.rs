//! Providers feeding the simulator end to end.

use chrono::NaiveDate;
use ledgerlab_core::domain::{Mode, PriceFrame};
use ledgerlab_core::engine::run_backtest;
use ledgerlab_core::signals::{
    DecisionProvider, MaCrossoverProvider, PositionOutput, Rebalance, SmaPositionProvider,
};
use ledgerlab_core::SimConfig;

fn trending_frame() -> PriceFrame {
    let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    let n = 120;
    let dates = (0..n as u64).map(|i| start + chrono::Days::new(i)).collect();
    // Up for 60 days, then down.
    let a: Vec<f64> = (0..n)
        .map(|i| if i < 60 { 100.0 + i as f64 } else { 160.0 - (i - 60) as f64 })
        .collect();
    let b: Vec<f64> = (0..n).map(|i| 50.0 + (i as f64 * 0.2).sin() * 5.0).collect();
    let opens = vec![a.clone(), b.clone()];
    PriceFrame::new(dates, vec!["A".into(), "B".into()], opens, vec![a, b]).unwrap()
}

#[test]
fn crossover_signals_trade_the_trend() {
    let prices = trending_frame();
    let decisions = MaCrossoverProvider::new(5, 20)
        .unwrap()
        .decisions(&prices)
        .unwrap();
    let config = SimConfig::builder(100_000.0, Mode::Signals, prices.tickers().to_vec())
        .build()
        .unwrap();

    let ledger = run_backtest(&prices, &decisions, &config).unwrap();
    assert_eq!(ledger.len(), prices.len() - 1);

    // Nothing can trade before the slow window fills.
    assert!(ledger
        .fills()
        .iter()
        .all(|f| prices.date_index(f.decision_date).unwrap() >= 19));

    // In the uptrend A is held.
    assert!(ledger.position(40, "A").unwrap() > 0);
    // Late in the downtrend A has been sold.
    assert_eq!(ledger.position(prices.len() - 2, "A"), Some(0));
}

#[test]
fn equal_weight_output_keeps_cash_buffer() {
    let prices = trending_frame();
    let decisions = SmaPositionProvider::new(
        5,
        20,
        PositionOutput::Weights {
            cash_buffer: 0.25,
            rebalance: Rebalance::OnSignal,
        },
    )
    .unwrap()
    .decisions(&prices)
    .unwrap();
    assert_eq!(decisions.mode(), Mode::Weights);

    let config = SimConfig::builder(100_000.0, Mode::Weights, prices.tickers().to_vec())
        .build()
        .unwrap();
    let ledger = run_backtest(&prices, &decisions, &config).unwrap();

    for row in ledger.rows() {
        assert!(row.positions.iter().all(|&q| q >= 0));
        // Targets never exceed the invested fraction, so cash stays non-negative.
        assert!(row.cash >= 0.0);
    }
}
