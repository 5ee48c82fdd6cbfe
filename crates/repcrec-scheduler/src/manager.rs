//! Transaction manager
//!
//! Orchestrates every operation of the simulation: it owns the sites, the
//! live transactions, the queue of blocked operations and the deadlock
//! detector. Each submission retries the queue, attempts the new operation
//! and, for reads and writes, resolves any deadlock the operation created.

use crate::deadlock::{select_victim, Access, DeadlockDetector};
use crate::error::{SchedulerError, SchedulerResult};
use repcrec_site::Site;
use repcrec_types::{
    AbortReason, DumpReport, Event, OpKind, Operation, Outcome, ReadResult, SimConfig, SiteId,
    Timestamp, Transaction, TxId, TxKind, Value, VarId,
};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Top-level orchestrator of the simulation
#[derive(Debug)]
pub struct TransactionManager {
    config: SimConfig,
    /// Sites in ID order; site `n` lives at index `n - 1`
    sites: Vec<Site>,
    /// Live transactions
    transactions: BTreeMap<TxId, Transaction>,
    /// Operations waiting for locks or sites, oldest first
    blocked: VecDeque<Operation>,
    detector: DeadlockDetector,
    /// Time of the last accepted submission
    clock: Option<Timestamp>,
}

impl TransactionManager {
    /// Create a manager with every site up and holding initial values
    pub fn new(config: SimConfig) -> Self {
        let sites = config.site_ids().map(|id| Site::new(id, &config)).collect();
        Self {
            config,
            sites,
            transactions: BTreeMap::new(),
            blocked: VecDeque::new(),
            detector: DeadlockDetector::new(),
            clock: None,
        }
    }

    /// Process one operation
    ///
    /// Returns every event produced: completions of previously blocked
    /// operations first, then the outcome of `op`, then deadlock aborts if
    /// `op` closed wait-for cycles.
    pub fn submit(&mut self, op: Operation) -> Vec<Event> {
        if let Some(previous) = self.clock {
            if op.at <= previous {
                let err = SchedulerError::NonMonotonicTime {
                    previous,
                    got: op.at,
                };
                return vec![self.reject(&op, err)];
            }
        }
        self.clock = Some(op.at);

        let mut events = self.retry_blocked();

        match self.execute(&op, true) {
            Ok(Some(outcome)) => events.push(Event::new(op.at, outcome)),
            Ok(None) => {
                tracing::debug!(op = %op.kind, "operation blocked");
                self.blocked.push_back(op);
                events.push(Event::new(op.at, Outcome::Blocked { op: op.kind }));
            }
            Err(err) => events.push(self.reject(&op, err)),
        }

        if op.kind.is_access() {
            while let Some(outcome) = self.resolve_deadlock() {
                events.push(Event::new(op.at, outcome));
            }
        }

        events
    }

    /// Keep retrying blocked operations after the input is exhausted
    ///
    /// Each round advances the clock by one tick. Stops when the queue is
    /// empty or a round makes no progress.
    pub fn finish(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        while !self.blocked.is_empty() {
            let before = self.blocked.len();
            self.clock = Some(self.now() + 1);

            let produced = self.retry_blocked();
            let progressed = !produced.is_empty() || self.blocked.len() != before;
            events.extend(produced);
            if !progressed {
                break;
            }
        }
        events
    }

    // ==================== Introspection ====================

    /// Simulation configuration
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Time of the last accepted submission (0 before the first)
    pub fn now(&self) -> Timestamp {
        self.clock.unwrap_or(0)
    }

    /// A live transaction
    pub fn transaction(&self, tx_id: TxId) -> Option<&Transaction> {
        self.transactions.get(&tx_id)
    }

    /// Whether a transaction has begun and not yet finished
    pub fn is_live(&self, tx_id: TxId) -> bool {
        self.transactions.contains_key(&tx_id)
    }

    /// Live transactions in ID order
    pub fn transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.values()
    }

    /// A site by ID
    pub fn site(&self, site: SiteId) -> Option<&Site> {
        if self.config.contains_site(site) {
            self.sites.get(site.index())
        } else {
            None
        }
    }

    /// All sites in ID order
    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    /// Queued operations, oldest first
    pub fn blocked_operations(&self) -> impl Iterator<Item = &Operation> {
        self.blocked.iter()
    }

    /// The wait-for graph
    pub fn detector(&self) -> &DeadlockDetector {
        &self.detector
    }

    /// Committed state of every site
    pub fn dump(&self) -> DumpReport {
        DumpReport {
            sites: self.sites.iter().map(Site::dump).collect(),
        }
    }

    // ==================== Scheduling ====================

    /// Re-attempt every queued operation in FIFO order
    fn retry_blocked(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        let queued: Vec<Operation> = self.blocked.iter().copied().collect();

        for op in queued {
            // An abort earlier in this sweep may already have dropped it
            if !self.blocked.iter().any(|q| q.at == op.at) {
                continue;
            }
            if let Some(tx_id) = op.tx() {
                if !self.is_live(tx_id) {
                    self.unqueue(op.at);
                    continue;
                }
            }

            match self.execute(&op, false) {
                Ok(Some(outcome)) => {
                    tracing::debug!(op = %op.kind, "blocked operation completed");
                    self.unqueue(op.at);
                    events.push(Event::new(op.at, outcome));
                }
                Ok(None) => {}
                Err(err) => {
                    self.unqueue(op.at);
                    events.push(self.reject(&op, err));
                }
            }
        }

        events
    }

    fn unqueue(&mut self, at: Timestamp) {
        if let Some(pos) = self.blocked.iter().position(|q| q.at == at) {
            self.blocked.remove(pos);
        }
    }

    fn reject(&self, op: &Operation, err: SchedulerError) -> Event {
        tracing::warn!(op = %op.kind, at = op.at, "invalid operation: {}", err);
        Event::new(
            op.at,
            Outcome::Rejected {
                op: op.kind,
                reason: err.to_string(),
            },
        )
    }

    /// Abort the youngest member of a wait-for cycle, if there is one
    fn resolve_deadlock(&mut self) -> Option<Outcome> {
        let cycle = self.detector.find_cycle()?;
        let victim = select_victim(
            cycle
                .iter()
                .filter_map(|tx_id| self.transactions.get(tx_id))
                .map(|tx| (tx.id, tx.start_time)),
        )?;
        tracing::info!(?cycle, victim = %victim, "deadlock detected");
        Some(self.abort(victim, AbortReason::Deadlock))
    }

    /// Dispatch an operation
    ///
    /// `Ok(None)` means the operation cannot proceed yet. On the first
    /// attempt the operation is appended to its transaction's log and, for
    /// accesses, recorded in the wait-for graph.
    fn execute(&mut self, op: &Operation, first_attempt: bool) -> SchedulerResult<Option<Outcome>> {
        match op.kind {
            OpKind::Begin { tx } => self.begin(op, tx, TxKind::ReadWrite).map(Some),
            OpKind::BeginRo { tx } => self.begin(op, tx, TxKind::ReadOnly).map(Some),
            OpKind::Read { tx, var } => {
                self.check_var(var)?;
                if first_attempt {
                    self.log(op, tx, Some(Access::Read))?;
                }
                self.read(tx, var)
            }
            OpKind::Write { tx, var, value } => {
                self.check_var(var)?;
                if self.live(tx)?.is_read_only() {
                    return Err(SchedulerError::ReadOnlyWrite(tx));
                }
                if first_attempt {
                    self.log(op, tx, Some(Access::Write))?;
                }
                self.write(tx, var, value)
            }
            OpKind::End { tx } => {
                if first_attempt {
                    self.log(op, tx, None)?;
                }
                self.end(tx, op.at)
            }
            OpKind::Fail { site } => self.fail(site).map(Some),
            OpKind::Recover { site } => self.recover(site).map(Some),
            OpKind::Dump => Ok(Some(Outcome::Dump(self.dump()))),
        }
    }

    fn log(&mut self, op: &Operation, tx_id: TxId, access: Option<Access>) -> SchedulerResult<()> {
        let tx = self
            .transactions
            .get_mut(&tx_id)
            .ok_or(SchedulerError::UnknownTransaction(tx_id))?;
        tx.record(*op);

        if let (Some(access), Some(var)) = (access, op.var()) {
            if !tx.is_read_only() {
                self.detector.record(tx_id, access, var);
            }
        }
        Ok(())
    }

    fn live(&self, tx_id: TxId) -> SchedulerResult<&Transaction> {
        self.transactions
            .get(&tx_id)
            .ok_or(SchedulerError::UnknownTransaction(tx_id))
    }

    fn check_var(&self, var: VarId) -> SchedulerResult<()> {
        if self.config.contains_var(var) {
            Ok(())
        } else {
            Err(SchedulerError::UnknownVariable(var))
        }
    }

    fn site_index(&self, site: SiteId) -> SchedulerResult<usize> {
        if self.config.contains_site(site) {
            Ok(site.index())
        } else {
            Err(SchedulerError::UnknownSite(site))
        }
    }

    // ==================== Operations ====================

    fn begin(&mut self, op: &Operation, tx_id: TxId, kind: TxKind) -> SchedulerResult<Outcome> {
        if self.is_live(tx_id) {
            return Err(SchedulerError::DuplicateTransaction(tx_id));
        }

        let mut tx = Transaction::new(tx_id, op.at, kind);
        tx.record(*op);
        self.transactions.insert(tx_id, tx);

        if kind == TxKind::ReadOnly {
            for site in self.sites.iter_mut().filter(|site| site.is_up()) {
                site.capture_snapshot(op.at);
            }
        }

        tracing::debug!(tx = %tx_id, ?kind, start = op.at, "transaction began");
        Ok(Outcome::Began { tx: tx_id, kind })
    }

    fn read(&mut self, tx_id: TxId, var: VarId) -> SchedulerResult<Option<Outcome>> {
        let tx = self.live(tx_id)?;
        if tx.is_read_only() {
            let start = tx.start_time;
            Ok(self.read_snapshot(tx_id, start, var))
        } else {
            Ok(self.read_locked(tx_id, var))
        }
    }

    /// Read-only read from the snapshot taken at the transaction's start
    fn read_snapshot(&mut self, tx_id: TxId, start: Timestamp, var: VarId) -> Option<Outcome> {
        let read = |site: &Site, value: Value| {
            Outcome::Read(ReadResult {
                tx: tx_id,
                site: site.id(),
                var,
                value,
            })
        };

        if !self.config.is_replicated(var) {
            let site = &self.sites[self.config.home_site(var).index()];
            return match site.snapshot_value(start, var) {
                Some(value) if site.is_up() => Some(read(site, value)),
                _ => None,
            };
        }

        let mut held_by_down_site = false;
        for site in &self.sites {
            if let Some(value) = site.snapshot_value(start, var) {
                if site.is_up() {
                    return Some(read(site, value));
                }
                held_by_down_site = true;
            }
        }

        if held_by_down_site {
            None
        } else {
            Some(self.abort(tx_id, AbortReason::NoDataForReadOnly))
        }
    }

    /// Read-write read under a shared lock from the first usable copy
    fn read_locked(&mut self, tx_id: TxId, var: VarId) -> Option<Outcome> {
        for site_id in self.config.sites_for(var) {
            let site = &mut self.sites[site_id.index()];
            if !site.is_up() || !site.data().is_available(var) {
                continue;
            }
            match site.locks_mut().acquire_read(tx_id, var) {
                Ok(()) => {
                    let value = site.data().read(tx_id, var)?;
                    tracing::debug!(tx = %tx_id, var = %var, site = %site_id, value, "read");
                    return Some(Outcome::Read(ReadResult {
                        tx: tx_id,
                        site: site_id,
                        var,
                        value,
                    }));
                }
                Err(holder) => {
                    tracing::debug!(tx = %tx_id, var = %var, site = %site_id, holder = %holder, "read lock refused");
                }
            }
        }
        None
    }

    /// Write under exclusive locks at every up copy, all or nothing
    fn write(&mut self, tx_id: TxId, var: VarId, value: Value) -> SchedulerResult<Option<Outcome>> {
        let targets: Vec<SiteId> = self
            .config
            .sites_for(var)
            .into_iter()
            .filter(|site| self.sites[site.index()].is_up())
            .collect();

        if targets.is_empty() {
            tracing::debug!(tx = %tx_id, var = %var, "no site up for write");
            return Ok(None);
        }

        for site_id in &targets {
            if let Err(holder) = self.sites[site_id.index()].locks().check_write(tx_id, var) {
                tracing::debug!(tx = %tx_id, var = %var, site = %site_id, holder = %holder, "write lock refused");
                return Ok(None);
            }
        }

        for site_id in &targets {
            let site = &mut self.sites[site_id.index()];
            if site.locks_mut().acquire_write(tx_id, var).is_ok() {
                site.data_mut().buffer_write(tx_id, var, value);
            }
        }

        tracing::debug!(tx = %tx_id, var = %var, value, sites = targets.len(), "write buffered");
        Ok(Some(Outcome::Written {
            tx: tx_id,
            var,
            sites: targets,
        }))
    }

    fn end(&mut self, tx_id: TxId, at: Timestamp) -> SchedulerResult<Option<Outcome>> {
        let tx = self.live(tx_id)?;
        if tx.is_marked_for_abort() {
            return Ok(Some(self.abort(tx_id, AbortReason::SiteFailure)));
        }

        let waiting = self
            .blocked
            .iter()
            .any(|op| op.tx() == Some(tx_id) && op.at != at);
        if waiting {
            return Ok(None);
        }

        Ok(Some(self.commit(tx_id)))
    }

    fn commit(&mut self, tx_id: TxId) -> Outcome {
        let now = self.now();
        let snapshot = self
            .transactions
            .get(&tx_id)
            .filter(|tx| tx.is_read_only())
            .map(|tx| tx.start_time);

        for site in &mut self.sites {
            if site.is_up() {
                let written = site.data_mut().commit(tx_id, now);
                if !written.is_empty() {
                    tracing::debug!(tx = %tx_id, site = %site.id(), ?written, "committed at site");
                }
            }
            if let Some(start) = snapshot {
                site.drop_snapshot(start);
            }
            site.locks_mut().release_all(tx_id);
        }

        self.transactions.remove(&tx_id);
        self.detector.purge(tx_id);

        tracing::info!(tx = %tx_id, at = now, "transaction committed");
        Outcome::Committed { tx: tx_id }
    }

    /// Abort a transaction and release everything it holds
    ///
    /// Safe to call for a transaction that is already gone.
    fn abort(&mut self, tx_id: TxId, reason: AbortReason) -> Outcome {
        let snapshot = self
            .transactions
            .get(&tx_id)
            .filter(|tx| tx.is_read_only())
            .map(|tx| tx.start_time);

        for site in &mut self.sites {
            site.locks_mut().release_all(tx_id);
            site.data_mut().revert(tx_id);
            if let Some(start) = snapshot {
                site.drop_snapshot(start);
            }
        }

        self.blocked.retain(|op| op.tx() != Some(tx_id));
        self.detector.purge(tx_id);
        self.transactions.remove(&tx_id);

        tracing::info!(tx = %tx_id, %reason, "transaction aborted");
        Outcome::Aborted { tx: tx_id, reason }
    }

    fn fail(&mut self, site_id: SiteId) -> SchedulerResult<Outcome> {
        let index = self.site_index(site_id)?;

        let mut dependents = self.sites[index].locks().all_transactions();
        dependents.extend(self.waiting_on(site_id));

        for tx_id in dependents {
            if let Some(tx) = self.transactions.get_mut(&tx_id) {
                tx.mark_for_abort();
                tracing::info!(tx = %tx_id, site = %site_id, "transaction marked for abort");
            }
        }
        self.sites[index].fail();

        Ok(Outcome::SiteFailed { site: site_id })
    }

    /// Read-write transactions with a queued access whose copies include `site_id`
    fn waiting_on(&self, site_id: SiteId) -> BTreeSet<TxId> {
        self.blocked
            .iter()
            .filter_map(|op| Some((op.tx()?, op.var()?)))
            .filter(|(tx_id, var)| {
                self.transactions
                    .get(tx_id)
                    .is_some_and(|tx| !tx.is_read_only())
                    && self.config.hosts(site_id, *var)
            })
            .map(|(tx_id, _)| tx_id)
            .collect()
    }

    fn recover(&mut self, site_id: SiteId) -> SchedulerResult<Outcome> {
        let index = self.site_index(site_id)?;
        self.sites[index].recover();
        Ok(Outcome::SiteRecovered { site: site_id })
    }
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repcrec_types::TxStatus;

    fn tx(id: u32) -> TxId {
        TxId::new(id)
    }

    fn var(id: u32) -> VarId {
        VarId::new(id)
    }

    fn site(id: u32) -> SiteId {
        SiteId::new(id)
    }

    /// Drives a manager with automatically increasing timestamps
    struct Driver {
        tm: TransactionManager,
        time: Timestamp,
    }

    impl Driver {
        fn new() -> Self {
            Self {
                tm: TransactionManager::default(),
                time: 0,
            }
        }

        fn run(&mut self, kind: OpKind) -> Vec<Outcome> {
            self.time += 1;
            self.tm
                .submit(Operation::new(self.time, kind))
                .into_iter()
                .map(|event| event.outcome)
                .collect()
        }

        fn begin(&mut self, id: u32) -> Vec<Outcome> {
            self.run(OpKind::Begin { tx: tx(id) })
        }

        fn begin_ro(&mut self, id: u32) -> Vec<Outcome> {
            self.run(OpKind::BeginRo { tx: tx(id) })
        }

        fn read(&mut self, t: u32, v: u32) -> Vec<Outcome> {
            self.run(OpKind::Read { tx: tx(t), var: var(v) })
        }

        fn write(&mut self, t: u32, v: u32, value: Value) -> Vec<Outcome> {
            self.run(OpKind::Write {
                tx: tx(t),
                var: var(v),
                value,
            })
        }

        fn end(&mut self, t: u32) -> Vec<Outcome> {
            self.run(OpKind::End { tx: tx(t) })
        }

        fn fail(&mut self, s: u32) -> Vec<Outcome> {
            self.run(OpKind::Fail { site: site(s) })
        }

        fn recover(&mut self, s: u32) -> Vec<Outcome> {
            self.run(OpKind::Recover { site: site(s) })
        }
    }

    fn read_value(outcomes: &[Outcome]) -> Option<Value> {
        outcomes.iter().find_map(|outcome| match outcome {
            Outcome::Read(result) => Some(result.value),
            _ => None,
        })
    }

    fn is_blocked(outcomes: &[Outcome]) -> bool {
        outcomes.iter().any(|o| matches!(o, Outcome::Blocked { .. }))
    }

    // ==================== Begin ====================

    #[test]
    fn test_begin_creates_transaction() {
        let mut d = Driver::new();
        let out = d.begin(1);
        assert_eq!(
            out,
            vec![Outcome::Began {
                tx: tx(1),
                kind: TxKind::ReadWrite
            }]
        );
        let t = d.tm.transaction(tx(1)).unwrap();
        assert_eq!(t.start_time, 1);
        assert_eq!(t.status, TxStatus::Active);
    }

    #[test]
    fn test_duplicate_begin_rejected() {
        let mut d = Driver::new();
        d.begin(1);
        let out = d.begin(1);
        assert!(matches!(out[0], Outcome::Rejected { .. }));
        assert_eq!(d.tm.transaction(tx(1)).unwrap().start_time, 1);
    }

    #[test]
    fn test_begin_ro_snapshots_up_sites() {
        let mut d = Driver::new();
        d.fail(3);
        d.begin_ro(1);
        assert!(d.tm.site(site(1)).unwrap().has_snapshot(2));
        assert!(!d.tm.site(site(3)).unwrap().has_snapshot(2));
    }

    // ==================== Reads ====================

    #[test]
    fn test_read_initial_value() {
        let mut d = Driver::new();
        d.begin(1);
        assert_eq!(read_value(&d.read(1, 3)), Some(30));
        assert_eq!(read_value(&d.read(1, 2)), Some(20));
    }

    #[test]
    fn test_read_own_write() {
        let mut d = Driver::new();
        d.begin(1);
        d.write(1, 2, 7);
        assert_eq!(read_value(&d.read(1, 2)), Some(7));
    }

    #[test]
    fn test_read_blocked_by_writer() {
        let mut d = Driver::new();
        d.begin(1);
        d.begin(2);
        d.write(1, 1, 5);
        assert!(is_blocked(&d.read(2, 1)));

        let out = d.end(1);
        assert!(out.contains(&Outcome::Committed { tx: tx(1) }));

        // Retried on the next submission
        let out = d.run(OpKind::Dump);
        assert_eq!(read_value(&out), Some(5));
    }

    #[test]
    fn test_unknown_transaction_rejected() {
        let mut d = Driver::new();
        let out = d.read(9, 2);
        assert!(matches!(&out[0], Outcome::Rejected { reason, .. } if reason.contains("T9")));
        assert_eq!(d.tm.blocked_operations().count(), 0);
    }

    #[test]
    fn test_unknown_variable_rejected() {
        let mut d = Driver::new();
        d.begin(1);
        let out = d.read(1, 21);
        assert!(matches!(&out[0], Outcome::Rejected { reason, .. } if reason.contains("x21")));
    }

    // ==================== Writes ====================

    #[test]
    fn test_replicated_write_locks_every_up_site() {
        let mut d = Driver::new();
        d.fail(4);
        d.begin(1);
        let out = d.write(1, 2, 9);

        match &out[0] {
            Outcome::Written { sites, .. } => {
                assert_eq!(sites.len(), 9);
                assert!(!sites.contains(&site(4)));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_write_all_or_nothing() {
        let mut d = Driver::new();
        d.begin(1);
        d.begin(2);
        // T1 reads x2 at site 1 only
        d.read(1, 2);
        assert!(is_blocked(&d.write(2, 2, 5)));

        // No site may keep a lock for T2
        for s in d.tm.sites() {
            assert!(!s.locks().holds_write(tx(2), var(2)));
            assert!(!s.data().has_buffer(tx(2)));
        }
    }

    #[test]
    fn test_write_no_site_up_blocks() {
        let mut d = Driver::new();
        d.begin(1);
        d.fail(2);
        assert!(is_blocked(&d.write(1, 1, 4)));
    }

    #[test]
    fn test_read_only_write_rejected() {
        let mut d = Driver::new();
        d.begin_ro(1);
        let out = d.write(1, 2, 4);
        assert!(matches!(out[0], Outcome::Rejected { .. }));
    }

    // ==================== End ====================

    #[test]
    fn test_commit_makes_value_visible() {
        let mut d = Driver::new();
        d.begin(1);
        d.write(1, 4, 44);
        d.end(1);

        assert!(!d.tm.is_live(tx(1)));
        for s in d.tm.sites() {
            assert_eq!(s.data().current_value(var(4)), Some(44));
            assert!(s.locks().is_empty());
        }
    }

    #[test]
    fn test_commit_at_end_time() {
        let mut d = Driver::new();
        d.begin(1);
        d.write(1, 3, 1);
        d.end(1);
        let copy = d.tm.site(site(4)).unwrap().data().variable(var(3)).unwrap();
        assert_eq!(copy.history().keys().copied().collect::<Vec<_>>(), vec![0, 3]);
    }

    #[test]
    fn test_end_deferred_while_operation_blocked() {
        let mut d = Driver::new();
        d.begin(1);
        d.begin(2);
        d.write(1, 1, 5);
        d.write(2, 1, 6);
        assert!(is_blocked(&d.end(2)));

        let out = d.end(1);
        assert!(out.contains(&Outcome::Committed { tx: tx(1) }));

        // Next submission retries T2's write, then its END
        let out = d.run(OpKind::Dump);
        assert!(out.iter().any(|o| matches!(o, Outcome::Written { tx: t, .. } if *t == tx(2))));
        assert!(out.contains(&Outcome::Committed { tx: tx(2) }));
        assert_eq!(
            d.tm.site(site(2)).unwrap().data().current_value(var(1)),
            Some(6)
        );
    }

    #[test]
    fn test_end_twice_rejected() {
        let mut d = Driver::new();
        d.begin(1);
        d.end(1);
        assert!(matches!(d.end(1)[0], Outcome::Rejected { .. }));
    }

    // ==================== Failure & Recovery ====================

    #[test]
    fn test_fail_marks_lock_holders() {
        let mut d = Driver::new();
        d.begin(1);
        d.begin(2);
        d.write(1, 1, 5);
        d.read(2, 3);
        d.fail(2);

        assert_eq!(d.tm.transaction(tx(1)).unwrap().status, TxStatus::MarkedForAbort);
        assert_eq!(d.tm.transaction(tx(2)).unwrap().status, TxStatus::Active);

        let out = d.end(1);
        assert_eq!(
            out,
            vec![Outcome::Aborted {
                tx: tx(1),
                reason: AbortReason::SiteFailure
            }]
        );
    }

    #[test]
    fn test_fail_marks_waiting_transactions() {
        let mut d = Driver::new();
        d.begin(1);
        d.begin(2);
        d.begin(3);
        d.begin_ro(4);
        d.write(1, 1, 5);
        assert!(is_blocked(&d.write(2, 1, 6)));
        // x3 lives at site 4 only
        d.write(1, 3, 7);
        assert!(is_blocked(&d.read(3, 3)));
        d.fail(2);

        assert_eq!(d.tm.transaction(tx(1)).unwrap().status, TxStatus::MarkedForAbort);
        assert_eq!(d.tm.transaction(tx(2)).unwrap().status, TxStatus::MarkedForAbort);
        // Waiting on site 4, not on the failed site
        assert_eq!(d.tm.transaction(tx(3)).unwrap().status, TxStatus::Active);
        assert_eq!(d.tm.transaction(tx(4)).unwrap().status, TxStatus::Active);

        // T2's write never ran, its END aborts all the same
        d.end(1);
        let out = d.end(2);
        assert!(out.contains(&Outcome::Aborted {
            tx: tx(2),
            reason: AbortReason::SiteFailure
        }));
    }

    #[test]
    fn test_recover_replicated_unavailable() {
        let mut d = Driver::new();
        for s in 1..=10 {
            d.fail(s);
        }
        for s in 1..=10 {
            d.recover(s);
        }
        d.begin(1);
        assert!(is_blocked(&d.read(1, 2)));
        assert_eq!(read_value(&d.read(1, 1)), Some(10));
    }

    #[test]
    fn test_invalid_site_rejected() {
        let mut d = Driver::new();
        assert!(matches!(d.fail(11)[0], Outcome::Rejected { .. }));
        assert!(matches!(d.recover(0)[0], Outcome::Rejected { .. }));
    }

    // ==================== Read-only ====================

    #[test]
    fn test_read_only_ignores_later_commits() {
        let mut d = Driver::new();
        d.begin_ro(1);
        d.begin(2);
        d.write(2, 2, 99);
        d.end(2);
        assert_eq!(read_value(&d.read(1, 2)), Some(20));
    }

    #[test]
    fn test_read_only_not_blocked_by_locks() {
        let mut d = Driver::new();
        d.begin(1);
        d.write(1, 2, 5);
        d.begin_ro(2);
        assert_eq!(read_value(&d.read(2, 2)), Some(20));
        assert!(d.tm.sites().iter().all(|s| !s.locks().all_transactions().contains(&tx(2))));
    }

    #[test]
    fn test_read_only_no_data_aborts() {
        let mut d = Driver::new();
        for s in 1..=10 {
            d.fail(s);
        }
        for s in 1..=10 {
            d.recover(s);
        }
        d.begin_ro(1);
        let out = d.read(1, 2);
        assert_eq!(
            out,
            vec![Outcome::Aborted {
                tx: tx(1),
                reason: AbortReason::NoDataForReadOnly
            }]
        );
        assert!(!d.tm.is_live(tx(1)));
    }

    #[test]
    fn test_read_only_waits_for_down_site() {
        let mut d = Driver::new();
        d.begin_ro(1);
        for s in 1..=10 {
            d.fail(s);
        }
        assert!(is_blocked(&d.read(1, 2)));
        d.recover(5);
        // The read is retried before the next operation runs
        let out = d.run(OpKind::Dump);
        assert_eq!(read_value(&out), Some(20));
    }

    #[test]
    fn test_read_only_commit_drops_snapshot() {
        let mut d = Driver::new();
        d.begin_ro(1);
        d.end(1);
        assert!(d.tm.sites().iter().all(|s| !s.has_snapshot(1)));
    }

    // ==================== Deadlock ====================

    #[test]
    fn test_deadlock_aborts_youngest() {
        let mut d = Driver::new();
        d.begin(1);
        d.begin(2);
        d.write(1, 1, 10);
        d.write(2, 3, 30);
        assert!(is_blocked(&d.write(1, 3, 11)));

        let out = d.write(2, 1, 31);
        assert!(out.contains(&Outcome::Aborted {
            tx: tx(2),
            reason: AbortReason::Deadlock
        }));
        assert!(!d.tm.is_live(tx(2)));
        assert!(!d.tm.detector().has_cycle());

        // T1's write now goes through
        let out = d.end(1);
        assert!(out.iter().any(|o| matches!(o, Outcome::Written { tx: t, .. } if *t == tx(1))));
        assert!(out.contains(&Outcome::Committed { tx: tx(1) }));
    }

    // ==================== Drain ====================

    #[test]
    fn test_finish_drains_queue() {
        let mut d = Driver::new();
        d.begin(1);
        d.fail(2);
        d.write(1, 1, 3);
        d.recover(2);

        let events = d.tm.finish();
        assert!(events
            .iter()
            .any(|e| matches!(e.outcome, Outcome::Written { .. })));
        assert_eq!(d.tm.blocked_operations().count(), 0);
        assert!(d.tm.now() > d.time);
    }

    #[test]
    fn test_finish_stops_without_progress() {
        let mut d = Driver::new();
        d.begin(1);
        d.fail(2);
        d.write(1, 1, 3);

        assert!(d.tm.finish().is_empty());
        assert_eq!(d.tm.blocked_operations().count(), 1);
    }

    #[test]
    fn test_non_monotonic_time_rejected() {
        let mut tm = TransactionManager::default();
        tm.submit(Operation::new(5, OpKind::Begin { tx: tx(1) }));
        let events = tm.submit(Operation::new(5, OpKind::Begin { tx: tx(2) }));
        assert!(matches!(events[0].outcome, Outcome::Rejected { .. }));
        assert!(!tm.is_live(tx(2)));
        assert_eq!(tm.now(), 5);
    }
}
