//! The usage ledger: persisted counters and their accounting rules.
//!
//! [`apply_record`] holds the pure rules (day rollover, retention, weekly
//! sum, rolling average). [`Ledger`] wraps them around a [`LedgerStorage`]
//! with serialized writes, event broadcast and sync push.
//!
//! # Day rollover
//!
//! The ledger has no timer. A new day is noticed when a record arrives and
//! the most recent history entry is dated earlier: the running daily total
//! is archived under that entry's date before the new volume is added.
//! Reads apply the same rule without writing, so [`Ledger::summary`] reports
//! zero daily usage on a fresh day.

use std::sync::Arc;

use time::{Date, Duration};
use tokio::sync::Mutex;
use tracing::{debug, info};

use dropquery_types::{
    AppFlags, DailyTotal, DisplayUnit, LedgerState, LedgerSummary, ModelTag, UsageRecord,
    is_valid_volume,
};

use crate::clock::Clock;
use crate::context::ContextHandle;
use crate::error::{Error, Result};
use crate::events::{EventDispatcher, EventReceiver, LedgerEvent};
use crate::onboarding::SurveyAnswers;
use crate::storage::LedgerStorage;
use crate::sync::{NoopSync, SyncClient, SyncEvent};

/// Retention and averaging parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerConfig {
    /// History keeps records dated `today - retention_days` or later.
    pub retention_days: u16,
    /// Maximum archived days kept in `daily_history`.
    pub daily_history_cap: usize,
    /// Number of most recent archived days averaged.
    pub average_window: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            retention_days: 7,
            daily_history_cap: 30,
            average_window: 7,
        }
    }
}

impl LedgerConfig {
    /// Check the parameters are usable.
    pub fn validate(&self) -> Result<()> {
        if self.daily_history_cap == 0 {
            return Err(Error::InvalidConfig(
                "daily_history_cap must be at least 1".to_string(),
            ));
        }
        if self.average_window == 0 {
            return Err(Error::InvalidConfig(
                "average_window must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn cutoff(&self, today: Date) -> Date {
        today
            .checked_sub(Duration::days(i64::from(self.retention_days)))
            .unwrap_or(Date::MIN)
    }
}

/// Archive `usage_ml` under `date`, replacing an existing entry for that
/// date and evicting the oldest entries beyond `cap`.
pub fn archive_day(daily_history: &mut Vec<DailyTotal>, date: Date, usage_ml: f64, cap: usize) {
    let entry = DailyTotal { date, usage_ml };
    match daily_history.binary_search_by(|d| d.date.cmp(&date)) {
        Ok(i) => daily_history[i] = entry,
        Err(i) => daily_history.insert(i, entry),
    }
    if daily_history.len() > cap {
        let excess = daily_history.len() - cap;
        daily_history.drain(..excess);
    }
}

/// Mean of the last `window` archived days, or `current_day_ml` when
/// nothing is archived yet.
pub fn rolling_average(daily_history: &[DailyTotal], window: usize, current_day_ml: f64) -> f64 {
    if daily_history.is_empty() || window == 0 {
        return current_day_ml;
    }
    let recent = &daily_history[daily_history.len().saturating_sub(window)..];
    recent.iter().map(|d| d.usage_ml).sum::<f64>() / recent.len() as f64
}

/// Apply one record to `state`.
///
/// Rollover, append, prune, weekly recompute and average recompute, in that
/// order. The caller validates the volume.
pub fn apply_record(state: &mut LedgerState, record: UsageRecord, today: Date, config: &LedgerConfig) {
    if let Some(last) = state.last_record()
        && last.date != today
    {
        let archived_date = last.date;
        archive_day(
            &mut state.daily_history,
            archived_date,
            state.daily_usage_ml,
            config.daily_history_cap,
        );
        debug!("Archived {} ml for {}", state.daily_usage_ml, archived_date);
        state.daily_usage_ml = 0.0;
    }

    state.daily_usage_ml += record.water_usage_ml;
    state.total_usage_ml += record.water_usage_ml;
    state.history.push(record);

    let cutoff = config.cutoff(today);
    state.history.retain(|r| r.date >= cutoff);
    state.weekly_usage_ml = state.history_sum();

    state.average_usage_ml = rolling_average(
        &state.daily_history,
        config.average_window,
        state.daily_usage_ml,
    );
}

/// Read-only view of `state` as of `today`, without writing the rollover.
pub fn summarize(state: &LedgerState, today: Date, config: &LedgerConfig) -> LedgerSummary {
    let recorded_today = state.last_record().is_some_and(|r| r.date == today);
    let cutoff = config.cutoff(today);
    LedgerSummary {
        daily_usage_ml: if recorded_today {
            state.daily_usage_ml
        } else {
            0.0
        },
        weekly_usage_ml: state
            .history
            .iter()
            .filter(|r| r.date >= cutoff && r.date <= today)
            .map(|r| r.water_usage_ml)
            .sum(),
        total_usage_ml: state.total_usage_ml,
        average_usage_ml: state.average_usage_ml,
        query_count: state.history.len(),
        queries_today: state.history.iter().filter(|r| r.date == today).count(),
        display_unit: state.display_unit,
        last_record: state.last_record().cloned(),
    }
}

/// Persisted usage ledger.
///
/// All mutations run under one async mutex, so concurrent callers never lose
/// updates. Mutations work on a copy of the loaded state and only become
/// visible once the storage write succeeds.
pub struct Ledger<S> {
    storage: S,
    clock: Arc<dyn Clock>,
    config: LedgerConfig,
    events: EventDispatcher,
    sync: Arc<dyn SyncClient>,
    context: ContextHandle,
    write_lock: Mutex<()>,
}

impl<S> std::fmt::Debug for Ledger<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("config", &self.config)
            .field("context_valid", &self.context.is_valid())
            .finish_non_exhaustive()
    }
}

impl<S: LedgerStorage> Ledger<S> {
    /// Ledger with default config, no sync and a fresh context.
    pub fn new(storage: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage,
            clock,
            config: LedgerConfig::default(),
            events: EventDispatcher::default(),
            sync: Arc::new(NoopSync),
            context: ContextHandle::new(),
            write_lock: Mutex::new(()),
        }
    }

    /// Use custom retention and averaging parameters.
    #[must_use]
    pub fn with_config(mut self, config: LedgerConfig) -> Self {
        self.config = config;
        self
    }

    /// Mirror events to `sync`.
    #[must_use]
    pub fn with_sync(mut self, sync: Arc<dyn SyncClient>) -> Self {
        self.sync = sync;
        self
    }

    /// Share a runtime context probe.
    #[must_use]
    pub fn with_context(mut self, context: ContextHandle) -> Self {
        self.context = context;
        self
    }

    /// Broadcast on an existing dispatcher.
    #[must_use]
    pub fn with_events(mut self, events: EventDispatcher) -> Self {
        self.events = events;
        self
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn context(&self) -> &ContextHandle {
        &self.context
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Subscribe to ledger events.
    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    fn ensure_context(&self) -> Result<()> {
        if self.context.is_valid() {
            Ok(())
        } else {
            Err(Error::ContextInvalidated)
        }
    }

    /// Record one detected query.
    ///
    /// Rejects non-finite or negative volumes without touching state.
    pub async fn record_query(&self, model: ModelTag, volume_ml: f64) -> Result<UsageRecord> {
        if !is_valid_volume(volume_ml) {
            return Err(Error::InvalidVolume(volume_ml));
        }
        self.ensure_context()?;

        let _guard = self.write_lock.lock().await;
        let mut state = self.storage.load_state().await?;
        let now = self.clock.now();
        let today = now.date();
        let record = UsageRecord {
            date: today,
            model,
            water_usage_ml: volume_ml,
            timestamp: now,
        };

        apply_record(&mut state, record.clone(), today, &self.config);
        self.storage.save_state(&state).await?;

        info!(
            "Recorded {} query: {} ml (daily {} ml)",
            model, volume_ml, state.daily_usage_ml
        );

        self.events.send(LedgerEvent::Recorded {
            summary: summarize(&state, today, &self.config),
            record: record.clone(),
        });

        let user_id = match self.storage.load_flags().await {
            Ok(flags) => flags.user_id,
            Err(e) => {
                debug!("Could not read user id for sync: {}", e);
                None
            }
        };
        self.sync
            .push(SyncEvent::query(user_id, model, volume_ml, now));

        Ok(record)
    }

    /// Display view of the ledger as of today.
    pub async fn summary(&self) -> Result<LedgerSummary> {
        self.ensure_context()?;
        let state = self.storage.load_state().await?;
        Ok(summarize(&state, self.clock.today(), &self.config))
    }

    /// Raw persisted state.
    pub async fn state(&self) -> Result<LedgerState> {
        self.ensure_context()?;
        self.storage.load_state().await
    }

    /// Persisted flags.
    pub async fn flags(&self) -> Result<AppFlags> {
        self.ensure_context()?;
        self.storage.load_flags().await
    }

    /// Change the display unit preference.
    pub async fn set_display_unit(&self, unit: DisplayUnit) -> Result<()> {
        self.ensure_context()?;
        let _guard = self.write_lock.lock().await;
        let mut state = self.storage.load_state().await?;
        if state.display_unit == unit {
            return Ok(());
        }
        state.display_unit = unit;
        self.storage.save_state(&state).await?;
        info!("Display unit set to {}", unit);
        self.events.send(LedgerEvent::DisplayUnitChanged { unit });
        Ok(())
    }

    /// Wipe every key and re-seed zero state with default flags.
    ///
    /// `reset_in_progress` is set before the wipe; the re-seeded flags clear
    /// it again, so it stays set only if the wipe fails.
    pub async fn reset(&self) -> Result<()> {
        self.ensure_context()?;
        let _guard = self.write_lock.lock().await;

        let mut flags = self.storage.load_flags().await.unwrap_or_default();
        flags.reset_in_progress = true;
        self.storage.save_flags(&flags).await?;

        self.storage
            .reset(&LedgerState::default(), &AppFlags::default())
            .await?;

        info!("Ledger reset");
        self.events.send(LedgerEvent::Reset);
        Ok(())
    }

    /// Anonymous sync identity, generated on first use.
    pub async fn user_id(&self) -> Result<String> {
        self.ensure_context()?;
        let _guard = self.write_lock.lock().await;
        self.ensure_user_id().await.map(|(id, _)| id)
    }

    async fn ensure_user_id(&self) -> Result<(String, AppFlags)> {
        let mut flags = self.storage.load_flags().await?;
        if let Some(id) = &flags.user_id {
            return Ok((id.clone(), flags));
        }
        let id = uuid::Uuid::new_v4().to_string();
        flags.user_id = Some(id.clone());
        self.storage.save_flags(&flags).await?;
        debug!("Generated user id {}", id);
        Ok((id, flags))
    }

    /// Mark the survey completed and push the profile to sync.
    ///
    /// The profile's average is the ledger's rolling average, or the survey
    /// baseline while the ledger has none. Returns the user id.
    pub async fn complete_onboarding(&self, answers: SurveyAnswers) -> Result<String> {
        self.ensure_context()?;
        let _guard = self.write_lock.lock().await;

        let (user_id, mut flags) = self.ensure_user_id().await?;
        flags.survey_completed = true;
        flags.reset_in_progress = false;
        self.storage.save_flags(&flags).await?;

        let state = self.storage.load_state().await?;
        let average_usage_ml = if state.average_usage_ml > 0.0 {
            state.average_usage_ml
        } else {
            answers.estimate_baseline_ml()
        };

        info!("Onboarding completed for {}", user_id);
        self.events.send(LedgerEvent::OnboardingCompleted);
        self.sync.push(SyncEvent::Profile {
            user_id: user_id.clone(),
            survey_answers: answers,
            average_usage_ml,
        });
        Ok(user_id)
    }
}
