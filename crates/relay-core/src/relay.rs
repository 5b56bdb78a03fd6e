//! Fetch -> order -> filter -> deliver -> advance, one route at a time.

use chrono::{DateTime, Utc};
use tokio::time::sleep;

use crate::{
    dispatch::dispatch,
    domain::{MessageId, Route},
    messaging::{
        port::{MessageSource, RelayTransport},
        types::{FetchQuery, MAX_FETCH_LIMIT},
    },
    pacing::PacingPolicy,
    payload::{build_payload, is_empty_message},
    watermark::{WatermarkStore, Watermarks},
    Result,
};

/// When watermarks are written back during a pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PersistMode {
    /// One save after every route completed successfully.
    #[default]
    EndOfPass,
    /// Save after each route whose watermark moved. A later failure keeps
    /// earlier routes' progress.
    PerRoute,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RouteReport {
    pub route: String,
    pub fetched: usize,
    pub dispatched: usize,
    pub skipped_seen: usize,
    pub skipped_empty: usize,
    pub previous: Option<MessageId>,
    pub current: Option<MessageId>,
}

impl RouteReport {
    pub fn advanced(&self) -> bool {
        self.current != self.previous
    }
}

#[derive(Clone, Debug)]
pub struct PassOutcome {
    pub watermarks: Watermarks,
    pub routes: Vec<RouteReport>,
    pub saves: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl PassOutcome {
    pub fn dispatched(&self) -> usize {
        self.routes.iter().map(|r| r.dispatched).sum()
    }
}

pub struct RelayEngine<'a> {
    source: &'a dyn MessageSource,
    transport: &'a dyn RelayTransport,
    pacing: &'a dyn PacingPolicy,
    fetch_limit: u8,
    dry_run: bool,
}

impl<'a> RelayEngine<'a> {
    pub fn new(
        source: &'a dyn MessageSource,
        transport: &'a dyn RelayTransport,
        pacing: &'a dyn PacingPolicy,
    ) -> Self {
        Self {
            source,
            transport,
            pacing,
            fetch_limit: MAX_FETCH_LIMIT,
            dry_run: false,
        }
    }

    pub fn with_fetch_limit(mut self, limit: u8) -> Self {
        self.fetch_limit = limit;
        self
    }

    /// Log what would be relayed; no delivery, no state change.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Relay everything new on one route and advance its watermark in `watermarks`.
    ///
    /// Errors abort the route; the watermark is only touched after every
    /// candidate went through.
    pub async fn relay_route(
        &self,
        route: &Route,
        watermarks: &mut Watermarks,
    ) -> Result<RouteReport> {
        let start = watermarks.get(&route.source);
        let query = FetchQuery::new(start, self.fetch_limit);

        tracing::info!(
            route = %route,
            after = ?start.map(|m| m.0),
            limit = query.limit,
            "fetching"
        );
        let mut candidates = self.source.fetch_messages(&route.source, query).await?;
        // Stable: accidental duplicate ids keep their fetched order.
        candidates.sort_by_key(|m| m.id);

        let mut report = RouteReport {
            route: route.to_string(),
            fetched: candidates.len(),
            previous: start,
            current: start,
            ..Default::default()
        };
        let mut max_seen = start;

        for msg in &candidates {
            // The API is exclusive on `after`, but do not trust it.
            if start.is_some_and(|w| msg.id <= w) {
                report.skipped_seen += 1;
                continue;
            }

            let payload = if is_empty_message(msg) {
                None
            } else {
                build_payload(msg)
            };

            match payload {
                None => {
                    tracing::debug!(id = msg.id.0, "nothing to relay");
                    report.skipped_empty += 1;
                }
                Some(_) if self.dry_run => {
                    tracing::info!(id = msg.id.0, route = %route, "dry run: would relay");
                }
                Some(payload) => {
                    tracing::debug!(id = msg.id.0, target = %route.target, "relaying");
                    dispatch(self.transport, &route.target, &payload).await?;
                    report.dispatched += 1;

                    let delay = self.pacing.delay_after(report.dispatched);
                    if !delay.is_zero() {
                        sleep(delay).await;
                    }
                }
            }

            max_seen = max_seen.max(Some(msg.id));
        }

        if self.dry_run {
            return Ok(report);
        }

        match max_seen {
            Some(id) if watermarks.advance(&route.source, id) => {
                tracing::info!(
                    source = %route.source,
                    from = ?start.map(|m| m.0),
                    to = id.0,
                    "watermark advanced"
                );
            }
            _ => {
                tracing::info!(source = %route.source, at = ?start.map(|m| m.0), "no advance");
            }
        }
        report.current = watermarks.get(&route.source);

        Ok(report)
    }

    /// Run every route in order, then persist according to `mode`.
    ///
    /// The first route error ends the pass. With `EndOfPass` nothing is saved
    /// in that case.
    pub async fn run_pass(
        &self,
        routes: &[Route],
        mut watermarks: Watermarks,
        store: &dyn WatermarkStore,
        mode: PersistMode,
    ) -> Result<PassOutcome> {
        let started_at = Utc::now();
        let mut reports = Vec::with_capacity(routes.len());
        let mut saves = 0usize;

        for route in routes {
            let report = self.relay_route(route, &mut watermarks).await?;
            tracing::info!(
                route = %route,
                fetched = report.fetched,
                relayed = report.dispatched,
                seen = report.skipped_seen,
                empty = report.skipped_empty,
                "route done"
            );

            if mode == PersistMode::PerRoute && report.advanced() && !self.dry_run {
                store.save(&watermarks)?;
                saves += 1;
            }
            reports.push(report);
        }

        if mode == PersistMode::EndOfPass && !self.dry_run {
            tracing::info!(sources = watermarks.len(), "saving state");
            store.save(&watermarks)?;
            saves += 1;
        }

        Ok(PassOutcome {
            watermarks,
            routes: reports,
            saves,
            started_at,
            finished_at: Utc::now(),
        })
    }
}
