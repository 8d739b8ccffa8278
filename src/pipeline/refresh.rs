// src/pipeline/refresh.rs

//! Periodic cache refresh: one loop per entity class.
//!
//! A run bootstraps a single protocol client for the whole batch (the
//! component switches entities via `set` without re-bootstrapping),
//! walks every known entity for week 0, advances the shared client one
//! week, walks them again for week 1, and only then swaps the cache.
//! Any single failure aborts the run with the previous records intact.
//! Entity fetches are strictly sequential: week navigation is
//! state-dependent, and the pacing doubles as a rate limit.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::CacheConfig;
use crate::models::{CacheRecord, EntityClass, Event, PageTarget, WeekSlot};
use crate::services::{ProtocolClient, Transport};
use crate::storage::CacheStore;

/// Background refresh job for one entity class.
pub struct RefreshScheduler {
    class: EntityClass,
    target: PageTarget,
    entities: Vec<String>,
    transport: Arc<Transport>,
    store: Arc<CacheStore>,
    config: CacheConfig,
    last_success: Option<DateTime<Utc>>,
}

impl RefreshScheduler {
    pub fn new(
        class: EntityClass,
        target: PageTarget,
        entities: Vec<String>,
        transport: Arc<Transport>,
        store: Arc<CacheStore>,
        config: CacheConfig,
    ) -> Self {
        Self {
            class,
            target,
            entities,
            transport,
            store,
            config,
            last_success: None,
        }
    }

    /// When the last fully successful run finished.
    pub fn last_success(&self) -> Option<DateTime<Utc>> {
        self.last_success
    }

    /// Run one full refresh batch. Returns whether the cache was
    /// replaced. All errors are caught here: a failed batch is logged
    /// and leaves the store untouched.
    pub async fn run_once(&mut self) -> bool {
        log::info!("{}: refreshing schedule cache...", self.class.label());

        let mut client = match ProtocolClient::connect(&self.transport, &self.target).await {
            Ok(client) => client,
            Err(error) => {
                log::error!("{}: could not initialize client: {error}", self.class.label());
                return false;
            }
        };

        let mut records: HashMap<String, CacheRecord> = HashMap::new();

        // week 0: the fresh client already sits on the current week
        if let Err(_) = self.fetch_week(&mut client, WeekSlot::Current, &mut records).await {
            log::warn!("{}: refresh aborted (week 0)", self.class.label());
            return false;
        }

        // week 1: advance the shared client once for the whole pass
        if let Err(error) = client.change_week(1).await {
            log::error!("{}: week navigation failed: {error}", self.class.label());
            return false;
        }
        if let Err(_) = self.fetch_week(&mut client, WeekSlot::Next, &mut records).await {
            log::warn!("{}: refresh aborted (week 1)", self.class.label());
            return false;
        }

        self.store.replace_all(records).await;
        self.last_success = Some(Utc::now());
        log::info!("{}: schedule cache updated", self.class.label());
        true
    }

    /// Endless refresh loop: run, then sleep the base interval, with an
    /// extra cool-down after failures so a struggling origin is not
    /// hammered.
    pub async fn run(mut self) {
        loop {
            let ok = self.run_once().await;
            let delay = if ok {
                self.config.update_interval
            } else {
                self.config.update_interval + self.config.failure_backoff
            };
            log::info!(
                "{}: next refresh in {}s",
                self.class.label(),
                delay.as_secs()
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Fetch one week for every entity, pacing requests with the batch
    /// delay. The first failure aborts the pass.
    async fn fetch_week(
        &self,
        client: &mut ProtocolClient<'_>,
        week: WeekSlot,
        records: &mut HashMap<String, CacheRecord>,
    ) -> Result<(), ()> {
        for entity in &self.entities {
            match client.fetch_entity_schedule(entity).await {
                Ok(events) => {
                    self.commit(records, entity, week, events);
                }
                Err(error) => {
                    log::error!(
                        "{}: fetch failed for {entity} (week {}): {error}",
                        self.class.label(),
                        week.offset()
                    );
                    return Err(());
                }
            }

            if !self.config.batch_delay.is_zero() {
                tokio::time::sleep(self.config.batch_delay).await;
            }
        }
        Ok(())
    }

    fn commit(
        &self,
        records: &mut HashMap<String, CacheRecord>,
        entity: &str,
        week: WeekSlot,
        events: Vec<Event>,
    ) {
        let record = records.entry(entity.to_string()).or_default();
        *record.week_mut(week) = events;
        record.written_at = Utc::now();
    }
}
