//! Divergence monitor loop.
//!
//! Every `interval` the monitor evaluates each tracked symbol against the
//! price board, classifies the breach count into a level, applies the
//! cooldown book and dispatches through the notifier. The cooldown book is
//! owned by this task alone; the board is only read cell by cell, so no
//! lock is held while the notifier is awaited.

use crate::{
    evaluate_symbol, format_alert_message, signed, AlertContext, CooldownBook, CooldownPolicy, Decision,
    Evaluation, ExceededEntry, Notifier, PriceBoard, SymbolEvaluation, Thresholds,
};
use chrono::{DateTime, Utc};
use spread_core::{AlertLevel, Exchange, ThresholdMode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Resolved monitor settings.
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub symbols: Vec<String>,
    /// Exchanges whose spot prices are compared
    pub exchanges: Vec<Exchange>,
    /// Exchange whose futures price is the reference
    pub reference_exchange: Exchange,
    pub thresholds: Thresholds,
    pub interval: Duration,
    pub cooldowns: CooldownPolicy,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            symbols: vec!["TSLAX_USDT".to_string()],
            exchanges: vec![Exchange::GateIO],
            reference_exchange: Exchange::GateIO,
            thresholds: Thresholds::default(),
            interval: Duration::from_secs(1),
            cooldowns: CooldownPolicy::default(),
        }
    }
}

/// What happened to one symbol in one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// No reference price yet
    Cold,
    /// Nothing breached
    Idle,
    /// Breached but inside the cooldown window
    Cooling,
    /// Notifier confirmed delivery
    Dispatched { escalated: bool },
    /// Notifier reported failure; cooldown left untouched
    DispatchFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolOutcome {
    pub symbol: String,
    pub level: Option<AlertLevel>,
    pub exceeded: Vec<ExceededEntry>,
    pub action: Action,
}

impl SymbolOutcome {
    fn new(symbol: &str, action: Action) -> Self {
        Self {
            symbol: symbol.to_string(),
            level: None,
            exceeded: Vec::new(),
            action,
        }
    }
}

pub struct DivergenceMonitor {
    settings: MonitorSettings,
    board: PriceBoard,
    notifier: Arc<dyn Notifier>,
    book: CooldownBook,
}

impl DivergenceMonitor {
    /// Create a monitor and register every tracked symbol in the cooldown
    /// book with both levels at "never".
    pub fn new(settings: MonitorSettings, board: PriceBoard, notifier: Arc<dyn Notifier>) -> Self {
        let mut book = CooldownBook::new(settings.cooldowns);
        for symbol in &settings.symbols {
            book.register(symbol);
        }
        Self {
            settings,
            board,
            notifier,
            book,
        }
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    pub fn cooldown_book(&self) -> &CooldownBook {
        &self.book
    }

    fn log_banner(&self) {
        let s = &self.settings;
        let exchanges: Vec<&str> = s.exchanges.iter().map(|e| e.key()).collect();
        info!("Starting tiered divergence monitor");
        info!("  Symbols: {}", s.symbols.join(", "));
        info!("  Exchanges: {}", exchanges.join(", "));
        info!("  Reference: {} futures", s.reference_exchange);
        info!(
            "  Threshold: {}{}",
            s.thresholds.default,
            s.thresholds.mode.unit()
        );
        for (symbol, threshold) in &s.thresholds.overrides {
            info!("  Threshold[{}]: {}{}", symbol, threshold, s.thresholds.mode.unit());
        }
        info!(
            "  Cooldown: WARN {}s, EMERGENCY {}s (via {})",
            s.cooldowns.warn.num_seconds(),
            s.cooldowns.emergency.num_seconds(),
            self.notifier.name()
        );
    }

    /// Run forever: sleep one interval, then evaluate every symbol.
    pub async fn run(mut self) {
        self.log_banner();
        loop {
            tokio::time::sleep(self.settings.interval).await;
            self.run_cycle_at(Utc::now()).await;
        }
    }

    /// Evaluate every tracked symbol once with an explicit clock.
    pub async fn run_cycle_at(&mut self, now: DateTime<Utc>) -> Vec<SymbolOutcome> {
        let symbols = self.settings.symbols.clone();
        let mut outcomes = Vec::with_capacity(symbols.len());
        for symbol in &symbols {
            outcomes.push(self.check_symbol(symbol, now).await);
        }
        outcomes
    }

    async fn check_symbol(&mut self, symbol: &str, now: DateTime<Utc>) -> SymbolOutcome {
        let evaluation = match evaluate_symbol(
            &self.board,
            symbol,
            self.settings.reference_exchange,
            &self.settings.exchanges,
            &self.settings.thresholds,
        ) {
            SymbolEvaluation::Cold => return SymbolOutcome::new(symbol, Action::Cold),
            SymbolEvaluation::Evaluated(e) => e,
        };

        self.log_observations(&evaluation);

        let Some(level) = evaluation.level else {
            return SymbolOutcome::new(symbol, Action::Idle);
        };

        let decision = self.book.decide(symbol, level, now);
        let action = match decision {
            Decision::Cooling { remaining } => {
                debug!(
                    symbol,
                    level = %level,
                    remaining_secs = remaining.num_seconds(),
                    "breach within cooldown"
                );
                Action::Cooling
            }
            Decision::Dispatch | Decision::Escalate => {
                let escalated = decision == Decision::Escalate;
                self.dispatch(&evaluation, level, escalated, now).await
            }
        };

        SymbolOutcome {
            symbol: symbol.to_string(),
            level: Some(level),
            exceeded: evaluation.exceeded,
            action,
        }
    }

    async fn dispatch(
        &mut self,
        evaluation: &Evaluation,
        level: AlertLevel,
        escalated: bool,
        now: DateTime<Utc>,
    ) -> Action {
        let symbol = evaluation.symbol.as_str();
        let message = format_alert_message(&AlertContext {
            symbol,
            level,
            reference: &evaluation.reference,
            exceeded: &evaluation.exceeded,
            mode: self.settings.thresholds.mode,
            at: now,
        });

        if escalated {
            warn!("{}: alert escalated WARN → EMERGENCY", symbol);
        }
        warn!(
            "{} alert for {}: {} exchange(s) over threshold",
            level,
            symbol,
            evaluation.exceeded.len()
        );

        if self.notifier.send(&message).await {
            self.book.record(symbol, level, now);
            info!("{}: {} alert delivered via {}", symbol, level, self.notifier.name());
            Action::Dispatched { escalated }
        } else {
            error!(
                "{}: {} alert not delivered via {}, will retry next cycle",
                symbol,
                level,
                self.notifier.name()
            );
            Action::DispatchFailed
        }
    }

    fn log_observations(&self, evaluation: &Evaluation) {
        let reference = &evaluation.reference;
        for obs in &evaluation.observations {
            let diff = match self.settings.thresholds.mode {
                ThresholdMode::Percentage => format!("{}%", signed(obs.divergence.diff_pct, 2)),
                ThresholdMode::Absolute => signed(obs.divergence.diff, 4),
            };
            debug!(
                "{} | {} futures: {} vs {} spot: {} = {}{}",
                evaluation.symbol,
                reference.exchange,
                reference.price,
                obs.exchange,
                obs.spot_price,
                diff,
                if obs.breached { " (breach)" } else { "" }
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use spread_core::{MarketType, PriceSample};
    use std::str::FromStr;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<String>>,
        fail: AtomicBool,
    }

    impl RecordingNotifier {
        fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }

        fn set_failing(&self, fail: bool) {
            self.fail.store(fail, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, text: &str) -> bool {
            if self.fail.load(Ordering::SeqCst) {
                return false;
            }
            self.sent.lock().unwrap().push(text.to_string());
            true
        }
    }

    const SYMBOL: &str = "TSLAX_USDT";

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn settings() -> MonitorSettings {
        MonitorSettings {
            symbols: vec![SYMBOL.to_string(), "X_USDT".to_string()],
            exchanges: vec![Exchange::GateIO, Exchange::Bybit],
            reference_exchange: Exchange::GateIO,
            thresholds: Thresholds::new(dec("0.5"), ThresholdMode::Percentage),
            interval: Duration::from_secs(1),
            cooldowns: CooldownPolicy::default(),
        }
    }

    fn set(board: &PriceBoard, exchange: Exchange, market: MarketType, price: &str) {
        board.update(PriceSample::new(exchange, SYMBOL, market, dec(price)));
    }

    fn setup() -> (DivergenceMonitor, PriceBoard, Arc<RecordingNotifier>) {
        let board = PriceBoard::new();
        let notifier = Arc::new(RecordingNotifier::default());
        let monitor = DivergenceMonitor::new(settings(), board.clone(), notifier.clone());
        (monitor, board, notifier)
    }

    fn action_for(outcomes: &[SymbolOutcome], symbol: &str) -> Action {
        outcomes
            .iter()
            .find(|o| o.symbol == symbol)
            .map(|o| o.action.clone())
            .unwrap()
    }

    #[tokio::test]
    async fn test_symbols_registered_at_startup() {
        let (monitor, _, _) = setup();
        let book = monitor.cooldown_book();
        assert!(book.is_registered(SYMBOL));
        assert!(book.is_registered("X_USDT"));
        assert_eq!(book.last(SYMBOL, AlertLevel::Warn), DateTime::<Utc>::UNIX_EPOCH);
    }

    #[tokio::test]
    async fn test_cold_symbol_never_alerts() {
        let (mut monitor, board, notifier) = setup();
        // Spot only; no futures reference for either symbol
        set(&board, Exchange::Bybit, MarketType::Spot, "1");

        for i in 0..5 {
            let outcomes = monitor.run_cycle_at(t(i)).await;
            assert_eq!(action_for(&outcomes, "X_USDT"), Action::Cold);
            assert_eq!(action_for(&outcomes, SYMBOL), Action::Cold);
        }
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_end_to_end_warn_for_bybit_only() {
        let (mut monitor, board, notifier) = setup();
        set(&board, Exchange::GateIO, MarketType::Futures, "440.42");
        set(&board, Exchange::Bybit, MarketType::Spot, "437.00");
        set(&board, Exchange::GateIO, MarketType::Spot, "438.50");

        let outcomes = monitor.run_cycle_at(t(0)).await;
        let outcome = outcomes.iter().find(|o| o.symbol == SYMBOL).unwrap();

        assert_eq!(outcome.level, Some(AlertLevel::Warn));
        assert_eq!(outcome.exceeded.len(), 1);
        assert_eq!(outcome.exceeded[0].exchange, Exchange::Bybit);
        assert_eq!(outcome.action, Action::Dispatched { escalated: false });

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("<b>BYBIT</b> spot: $437.00"));
        assert!(!sent[0].contains("GATEIO"));
    }

    #[tokio::test]
    async fn test_warn_cooldown_suppresses_second_breach() {
        let (mut monitor, board, notifier) = setup();
        set(&board, Exchange::GateIO, MarketType::Futures, "110");
        set(&board, Exchange::Bybit, MarketType::Spot, "100");

        let first = monitor.run_cycle_at(t(0)).await;
        let second = monitor.run_cycle_at(t(100)).await;

        assert_eq!(action_for(&first, SYMBOL), Action::Dispatched { escalated: false });
        assert_eq!(action_for(&second, SYMBOL), Action::Cooling);
        assert_eq!(notifier.sent().len(), 1);

        // Window elapsed
        let third = monitor.run_cycle_at(t(300)).await;
        assert_eq!(action_for(&third, SYMBOL), Action::Dispatched { escalated: false });
        assert_eq!(notifier.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_escalation_dispatches_immediately() {
        let (mut monitor, board, notifier) = setup();
        set(&board, Exchange::GateIO, MarketType::Futures, "110");
        set(&board, Exchange::Bybit, MarketType::Spot, "100");
        set(&board, Exchange::GateIO, MarketType::Spot, "110");

        // An earlier EMERGENCY keeps the plain EMERGENCY cooldown active at t=60
        monitor.book.record(SYMBOL, AlertLevel::Emergency, t(-100));

        let warn = monitor.run_cycle_at(t(0)).await;
        assert_eq!(action_for(&warn, SYMBOL), Action::Dispatched { escalated: false });

        // Second exchange joins the breach
        set(&board, Exchange::GateIO, MarketType::Spot, "100");
        let emergency = monitor.run_cycle_at(t(60)).await;
        let outcome = emergency.iter().find(|o| o.symbol == SYMBOL).unwrap();
        assert_eq!(outcome.level, Some(AlertLevel::Emergency));
        assert_eq!(outcome.action, Action::Dispatched { escalated: true });

        let sent = notifier.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent[1].contains("[EMERGENCY]"));
        assert_eq!(monitor.cooldown_book().last(SYMBOL, AlertLevel::Emergency), t(60));

        // Escalation is consumed: next EMERGENCY waits for its own cooldown
        let again = monitor.run_cycle_at(t(61)).await;
        assert_eq!(action_for(&again, SYMBOL), Action::Cooling);
    }

    #[tokio::test]
    async fn test_failed_dispatch_keeps_cooldown_and_retries() {
        let (mut monitor, board, notifier) = setup();
        set(&board, Exchange::GateIO, MarketType::Futures, "110");
        set(&board, Exchange::Bybit, MarketType::Spot, "100");

        notifier.set_failing(true);
        let first = monitor.run_cycle_at(t(0)).await;
        assert_eq!(action_for(&first, SYMBOL), Action::DispatchFailed);
        assert_eq!(
            monitor.cooldown_book().last(SYMBOL, AlertLevel::Warn),
            DateTime::<Utc>::UNIX_EPOCH
        );

        notifier.set_failing(false);
        let second = monitor.run_cycle_at(t(1)).await;
        assert_eq!(action_for(&second, SYMBOL), Action::Dispatched { escalated: false });
        assert_eq!(monitor.cooldown_book().last(SYMBOL, AlertLevel::Warn), t(1));
    }

    #[tokio::test]
    async fn test_cycle_is_idempotent_without_state_change() {
        let (mut monitor, board, notifier) = setup();
        set(&board, Exchange::GateIO, MarketType::Futures, "110");
        set(&board, Exchange::Bybit, MarketType::Spot, "100");
        notifier.set_failing(true);

        let a = monitor.run_cycle_at(t(0)).await;
        let b = monitor.run_cycle_at(t(0)).await;
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_breach_clears_to_idle() {
        let (mut monitor, board, _) = setup();
        set(&board, Exchange::GateIO, MarketType::Futures, "110");
        set(&board, Exchange::Bybit, MarketType::Spot, "100");
        monitor.run_cycle_at(t(0)).await;

        set(&board, Exchange::Bybit, MarketType::Spot, "110");
        let outcomes = monitor.run_cycle_at(t(1)).await;
        assert_eq!(action_for(&outcomes, SYMBOL), Action::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_loop_polls_on_interval() {
        let board = PriceBoard::new();
        let notifier = Arc::new(RecordingNotifier::default());
        board.update(PriceSample::new(Exchange::GateIO, SYMBOL, MarketType::Futures, dec("110")));
        board.update(PriceSample::new(Exchange::Bybit, SYMBOL, MarketType::Spot, dec("100")));

        let monitor = DivergenceMonitor::new(settings(), board, notifier.clone());
        let handle = tokio::spawn(monitor.run());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(notifier.sent().len(), 1);

        handle.abort();
    }
}
