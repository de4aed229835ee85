//! Post-hoc statistics over the finalized daily ledger.
//!
//! Pure arithmetic: daily results and starting capital in, summary out.
//! Non-finite intermediate values (empty spans, zero drawdown, zero
//! variance) are sanitized to zero rather than leaking into reports.

use barsim_core::engine::PortfolioDailyResult;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Trading days per year used for annualization.
const TRADING_DAYS_PER_YEAR: f64 = 240.0;

/// Aggregate statistics for one backtest run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BacktestStatistics {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub total_days: usize,
    pub profit_days: usize,
    pub loss_days: usize,
    pub capital: f64,
    pub end_balance: f64,
    /// Most negative balance excursion from the running peak, in currency.
    pub max_drawdown: f64,
    /// Same excursion as a percentage of the peak.
    pub max_ddpercent: f64,
    /// Days from the peak to the deepest trough.
    pub max_drawdown_duration: i64,
    pub total_net_pnl: f64,
    pub daily_net_pnl: f64,
    pub total_commission: f64,
    pub daily_commission: f64,
    pub total_slippage: f64,
    pub daily_slippage: f64,
    pub total_turnover: f64,
    pub daily_turnover: f64,
    pub total_trade_count: usize,
    pub daily_trade_count: f64,
    /// Total return in percent of starting capital.
    pub total_return: f64,
    pub annual_return: f64,
    /// Mean daily log return, in percent.
    pub daily_return: f64,
    /// Std of daily log returns, in percent.
    pub return_std: f64,
    pub sharpe_ratio: f64,
    pub return_drawdown_ratio: f64,
}

/// Compute all statistics from the ascending-date daily result sequence.
pub fn compute_statistics(daily: &[PortfolioDailyResult], capital: f64) -> BacktestStatistics {
    if daily.is_empty() {
        return BacktestStatistics {
            capital,
            ..Default::default()
        };
    }

    let total_days = daily.len();
    let net_pnls: Vec<f64> = daily.iter().map(|d| d.net_pnl).collect();

    // Balance series and daily log returns.
    let mut balance = Vec::with_capacity(total_days);
    let mut returns = Vec::with_capacity(total_days);
    let mut running = capital;
    let mut prev: Option<f64> = None;
    for pnl in &net_pnls {
        running += pnl;
        balance.push(running);
        let r = match prev {
            Some(p) if p > 0.0 && running > 0.0 => (running / p).ln(),
            _ => 0.0,
        };
        returns.push(r);
        prev = Some(running);
    }

    // Drawdown series against the running peak.
    let mut peak = f64::MIN;
    let mut drawdown = Vec::with_capacity(total_days);
    let mut ddpercent = Vec::with_capacity(total_days);
    for &b in &balance {
        peak = peak.max(b);
        let dd = b - peak;
        drawdown.push(dd);
        ddpercent.push(if peak > 0.0 { dd / peak * 100.0 } else { 0.0 });
    }

    let trough_ix = argmin(&drawdown);
    let max_drawdown = drawdown[trough_ix];
    let max_ddpercent = ddpercent[trough_ix];
    let max_drawdown_duration = if max_drawdown < 0.0 {
        let peak_ix = argmax(&balance[..=trough_ix]);
        (daily[trough_ix].date - daily[peak_ix].date).num_days()
    } else {
        0
    };

    let end_balance = balance[total_days - 1];
    let total_net_pnl: f64 = net_pnls.iter().sum();
    let total_commission: f64 = daily.iter().map(|d| d.commission).sum();
    let total_slippage: f64 = daily.iter().map(|d| d.slippage).sum();
    let total_turnover: f64 = daily.iter().map(|d| d.turnover).sum();
    let total_trade_count: usize = daily.iter().map(|d| d.trade_count).sum();

    let days = total_days as f64;
    let total_return = (end_balance / capital - 1.0) * 100.0;
    let daily_net_pnl = total_net_pnl / days;
    let pnl_std = std_dev(&net_pnls);
    let sharpe_ratio = if pnl_std > 0.0 {
        daily_net_pnl / pnl_std * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    };

    let stats = BacktestStatistics {
        start_date: Some(daily[0].date),
        end_date: Some(daily[total_days - 1].date),
        total_days,
        profit_days: net_pnls.iter().filter(|&&p| p > 0.0).count(),
        loss_days: net_pnls.iter().filter(|&&p| p < 0.0).count(),
        capital,
        end_balance,
        max_drawdown,
        max_ddpercent,
        max_drawdown_duration,
        total_net_pnl,
        daily_net_pnl,
        total_commission,
        daily_commission: total_commission / days,
        total_slippage,
        daily_slippage: total_slippage / days,
        total_turnover,
        daily_turnover: total_turnover / days,
        total_trade_count,
        daily_trade_count: total_trade_count as f64 / days,
        total_return,
        annual_return: total_return / days * TRADING_DAYS_PER_YEAR,
        daily_return: mean(&returns) * 100.0,
        return_std: std_dev(&returns) * 100.0,
        sharpe_ratio,
        return_drawdown_ratio: -total_net_pnl / max_drawdown,
    };
    stats.sanitized()
}

impl BacktestStatistics {
    /// Replace non-finite float fields with zero.
    fn sanitized(mut self) -> Self {
        for field in [
            &mut self.capital,
            &mut self.end_balance,
            &mut self.max_drawdown,
            &mut self.max_ddpercent,
            &mut self.total_net_pnl,
            &mut self.daily_net_pnl,
            &mut self.total_commission,
            &mut self.daily_commission,
            &mut self.total_slippage,
            &mut self.daily_slippage,
            &mut self.total_turnover,
            &mut self.daily_turnover,
            &mut self.daily_trade_count,
            &mut self.total_return,
            &mut self.annual_return,
            &mut self.daily_return,
            &mut self.return_std,
            &mut self.sharpe_ratio,
            &mut self.return_drawdown_ratio,
        ] {
            if !field.is_finite() {
                *field = 0.0;
            }
        }
        self
    }
}

impl fmt::Display for BacktestStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fmt_date = |d: Option<NaiveDate>| d.map_or("-".to_string(), |d| d.to_string());
        writeln!(f, "{}", "-".repeat(30))?;
        writeln!(f, "first trading day:\t{}", fmt_date(self.start_date))?;
        writeln!(f, "last trading day:\t{}", fmt_date(self.end_date))?;
        writeln!(f, "total trading days:\t{}", self.total_days)?;
        writeln!(f, "profitable days:\t{}", self.profit_days)?;
        writeln!(f, "loss days:\t\t{}", self.loss_days)?;
        writeln!(f, "starting capital:\t{:.2}", self.capital)?;
        writeln!(f, "ending capital:\t\t{:.2}", self.end_balance)?;
        writeln!(f, "total return:\t\t{:.2}%", self.total_return)?;
        writeln!(f, "annualized return:\t{:.2}%", self.annual_return)?;
        writeln!(f, "max drawdown:\t\t{:.2}", self.max_drawdown)?;
        writeln!(f, "max drawdown percent:\t{:.2}%", self.max_ddpercent)?;
        writeln!(f, "max drawdown days:\t{}", self.max_drawdown_duration)?;
        writeln!(f, "total net pnl:\t\t{:.2}", self.total_net_pnl)?;
        writeln!(f, "total commission:\t{:.2}", self.total_commission)?;
        writeln!(f, "total slippage:\t\t{:.2}", self.total_slippage)?;
        writeln!(f, "total turnover:\t\t{:.2}", self.total_turnover)?;
        writeln!(f, "total trade count:\t{}", self.total_trade_count)?;
        writeln!(f, "daily net pnl:\t\t{:.2}", self.daily_net_pnl)?;
        writeln!(f, "daily return:\t\t{:.2}%", self.daily_return)?;
        writeln!(f, "return std:\t\t{:.2}%", self.return_std)?;
        writeln!(f, "sharpe ratio:\t\t{:.2}", self.sharpe_ratio)?;
        write!(f, "return/drawdown:\t{:.2}", self.return_drawdown_ratio)
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n-1 denominator).
fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

fn argmin(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v < values[best] {
            best = i;
        }
    }
    best
}

fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}
