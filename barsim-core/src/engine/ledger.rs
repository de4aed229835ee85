//! Daily ledger: per-date, per-instrument portfolio accounting.
//!
//! The ledger records raw material during the replay (closing prices and
//! trades) and computes results in a single strictly date-ordered pass at
//! finalize time. Because `finalize` reads the raw records and never
//! mutates them, calling it twice yields identical output.

use crate::domain::{ConfigError, InstrumentSpec, InstrumentTable, Trade};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Finalized accounting for one instrument on one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentDailyResult {
    pub date: NaiveDate,
    pub symbol: String,
    /// Previous date's close; 0 for the first date an instrument appears.
    pub pre_close: f64,
    pub close_price: f64,
    /// Position carried into the day (= previous date's closing position).
    pub start_pos: f64,
    pub end_pos: f64,
    pub trades: Vec<Trade>,
    pub trade_count: usize,
    pub turnover: f64,
    pub commission: f64,
    pub slippage: f64,
    /// PnL of trades executed this day, measured to the day's close.
    pub trading_pnl: f64,
    /// Carry PnL on the position held into the day.
    pub holding_pnl: f64,
    pub total_pnl: f64,
    pub net_pnl: f64,
}

impl InstrumentDailyResult {
    fn compute(
        date: NaiveDate,
        symbol: &str,
        close_price: f64,
        pre_close: f64,
        start_pos: f64,
        trades: &[Trade],
        spec: &InstrumentSpec,
    ) -> Self {
        let mut end_pos = start_pos;
        let mut turnover = 0.0;
        let mut commission = 0.0;
        let mut slippage = 0.0;
        let mut trading_pnl = 0.0;

        for trade in trades {
            let pos_change = trade.position_delta();
            end_pos += pos_change;

            let notional = trade.price * trade.volume * spec.size;
            turnover += notional;
            commission += notional * spec.rate;
            slippage += trade.volume * spec.size * spec.slippage;
            trading_pnl += pos_change * (close_price - trade.price) * spec.size;
        }

        let holding_pnl = start_pos * (close_price - pre_close) * spec.size;
        let total_pnl = trading_pnl + holding_pnl;
        let net_pnl = total_pnl - commission - slippage;

        Self {
            date,
            symbol: symbol.to_string(),
            pre_close,
            close_price,
            start_pos,
            end_pos,
            trades: trades.to_vec(),
            trade_count: trades.len(),
            turnover,
            commission,
            slippage,
            trading_pnl,
            holding_pnl,
            total_pnl,
            net_pnl,
        }
    }
}

/// Portfolio-level aggregation of one date's instrument results.
///
/// Carries the per-instrument close map that seeds the next date's
/// pre-close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioDailyResult {
    pub date: NaiveDate,
    pub close_prices: BTreeMap<String, f64>,
    pub instrument_results: BTreeMap<String, InstrumentDailyResult>,
    pub trade_count: usize,
    pub turnover: f64,
    pub commission: f64,
    pub slippage: f64,
    pub trading_pnl: f64,
    pub holding_pnl: f64,
    pub total_pnl: f64,
    pub net_pnl: f64,
}

impl PortfolioDailyResult {
    fn new(date: NaiveDate) -> Self {
        Self {
            date,
            close_prices: BTreeMap::new(),
            instrument_results: BTreeMap::new(),
            trade_count: 0,
            turnover: 0.0,
            commission: 0.0,
            slippage: 0.0,
            trading_pnl: 0.0,
            holding_pnl: 0.0,
            total_pnl: 0.0,
            net_pnl: 0.0,
        }
    }

    fn absorb(&mut self, result: InstrumentDailyResult) {
        self.trade_count += result.trade_count;
        self.turnover += result.turnover;
        self.commission += result.commission;
        self.slippage += result.slippage;
        self.trading_pnl += result.trading_pnl;
        self.holding_pnl += result.holding_pnl;
        self.total_pnl += result.total_pnl;
        self.net_pnl += result.net_pnl;
        self.close_prices
            .insert(result.symbol.clone(), result.close_price);
        self.instrument_results.insert(result.symbol.clone(), result);
    }
}

/// Raw per-day records plus the finalize pass.
#[derive(Debug, Clone, Default)]
pub struct DailyLedger {
    closes: BTreeMap<NaiveDate, BTreeMap<String, f64>>,
    trades: BTreeMap<NaiveDate, BTreeMap<String, Vec<Trade>>>,
}

impl DailyLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an instrument's closing price for a date. Idempotent in
    /// the last-write-wins sense: intraday intervals update the same
    /// date many times and the final bar of the day sticks.
    pub fn record_close(&mut self, date: NaiveDate, symbol: &str, close_price: f64) {
        self.closes
            .entry(date)
            .or_default()
            .insert(symbol.to_string(), close_price);
    }

    /// Append a trade to its instrument and trade date.
    pub fn record_trade(&mut self, trade: Trade) {
        self.trades
            .entry(trade.datetime.date_naive())
            .or_default()
            .entry(trade.symbol.clone())
            .or_default()
            .push(trade);
    }

    /// Number of dates with at least one recorded close or trade.
    pub fn day_count(&self) -> usize {
        self.dates().len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty() && self.trades.is_empty()
    }

    fn dates(&self) -> BTreeSet<NaiveDate> {
        self.closes
            .keys()
            .chain(self.trades.keys())
            .copied()
            .collect()
    }

    /// Single pass in ascending date order: compute every instrument's
    /// daily result, threading each date's close and closing position
    /// forward as the next date's pre-close and opening position.
    ///
    /// Instruments absent from the instrument table are a configuration
    /// error. A ledger with closes but no trades still produces correct
    /// holding-only results for every date.
    pub fn finalize(
        &self,
        instruments: &InstrumentTable,
    ) -> Result<Vec<PortfolioDailyResult>, ConfigError> {
        let mut pre_closes: BTreeMap<String, f64> = BTreeMap::new();
        let mut start_poses: BTreeMap<String, f64> = BTreeMap::new();
        let mut results = Vec::new();
        static NO_TRADES: Vec<Trade> = Vec::new();

        for date in self.dates() {
            let closes = self.closes.get(&date);
            let day_trades = self.trades.get(&date);

            // Instruments observed on this date, via close or trade.
            let mut symbols: BTreeSet<&str> = BTreeSet::new();
            if let Some(closes) = closes {
                symbols.extend(closes.keys().map(String::as_str));
            }
            if let Some(day_trades) = day_trades {
                symbols.extend(day_trades.keys().map(String::as_str));
            }

            let mut daily = PortfolioDailyResult::new(date);
            for symbol in symbols {
                let spec = instruments.get(symbol)?;
                let pre_close = pre_closes.get(symbol).copied().unwrap_or(0.0);
                let close_price = closes
                    .and_then(|c| c.get(symbol).copied())
                    .unwrap_or(pre_close);
                let start_pos = start_poses.get(symbol).copied().unwrap_or(0.0);
                let trades = day_trades
                    .and_then(|t| t.get(symbol))
                    .unwrap_or(&NO_TRADES);

                let result = InstrumentDailyResult::compute(
                    date, symbol, close_price, pre_close, start_pos, trades, spec,
                );

                pre_closes.insert(symbol.to_string(), result.close_price);
                start_poses.insert(symbol.to_string(), result.end_pos);
                daily.absorb(result);
            }
            results.push(daily);
        }
        Ok(results)
    }
}
