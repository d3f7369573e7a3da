mod availability;
mod conflict;
mod error;
mod ledger;
mod mutations;
mod policy;
mod pricing;
mod queries;

pub use availability::{free_rooms, AvailabilitySearch, FilterKey, FilterSet, Relaxation, RoomFilter};
pub use error::EngineError;
pub use ledger::Ledger;
pub use mutations::{BookingRequest, PendingConfirmation};
pub use policy::{rule_class, CancellationQuote};
pub use pricing::{compute_price, ExtraLine, PriceBreakdown, PriceOptions};
pub use queries::{BlockSummary, CalendarDay};

use std::collections::{BTreeSet, HashMap, HashSet};
use std::io;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use ulid::Ulid;

use crate::calendar::PeriodIndex;
use crate::inventory::Inventory;
use crate::loader::SessionData;
use crate::model::*;
use crate::notify::NotifyHub;
use crate::rules::Rules;
use crate::tariff::TariffTable;
use crate::wal::Wal;

struct Journal {
    wal: Wal,
    compact_threshold: u64,
}

/// One booking session: immutable reference data plus the owned ledger.
pub struct Engine {
    inventory: Inventory,
    tariff: TariffTable,
    rules: Rules,
    calendar: PeriodIndex,
    ledger: Ledger,
    /// Quote token → unconfirmed booking.
    pending: HashMap<Ulid, mutations::PendingQuote>,
    /// Bookings seeded from an external list rather than the journal.
    imported: HashSet<Ulid>,
    journal: Option<Journal>,
    pub notify: Arc<NotifyHub>,
}

impl Engine {
    /// In-memory session. Imported bookings that clash with earlier ones are skipped.
    pub fn new(data: SessionData, notify: Arc<NotifyHub>) -> Self {
        let SessionData {
            inventory,
            tariff,
            rules,
            periods,
            bookings,
        } = data;
        let mut engine = Self {
            inventory,
            tariff,
            rules,
            calendar: PeriodIndex::new(periods),
            ledger: Ledger::new(),
            pending: HashMap::new(),
            imported: HashSet::new(),
            journal: None,
            notify,
        };
        for booking in bookings {
            let id = booking.id;
            match engine.ledger.add(booking) {
                Ok(()) => {
                    engine.imported.insert(id);
                }
                Err(e) => warn!(%id, "skipping imported booking: {e}"),
            }
        }
        engine
    }

    /// Session backed by a journal at `path`: replays it, then appends every change to it.
    pub fn open(
        data: SessionData,
        path: &Path,
        compact_threshold: u64,
        notify: Arc<NotifyHub>,
    ) -> io::Result<Self> {
        let mut engine = Self::new(data, notify);
        let events = Wal::replay(path)?;
        for event in &events {
            if let Err(e) = engine.ledger.apply(event) {
                debug!(id = %event.booking_id(), "journal event not applied: {e}");
            }
        }
        info!(events = events.len(), bookings = engine.ledger.len(), "journal replayed");
        engine.journal = Some(Journal {
            wal: Wal::open(path)?,
            compact_threshold,
        });
        Ok(engine)
    }

    pub fn calendar(&self) -> &PeriodIndex {
        &self.calendar
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn tariff(&self) -> &TariffTable {
        &self.tariff
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Ledger events touching rooms in `block`.
    pub fn subscribe(&self, block: &str) -> broadcast::Receiver<Event> {
        self.notify.subscribe(block)
    }

    /// Journal append, then apply, then notify. Callers validate first, so apply cannot fail
    /// after a successful append.
    fn persist_and_apply(&mut self, event: Event) -> Result<(), EngineError> {
        if let Some(journal) = &mut self.journal {
            journal
                .wal
                .append(&event)
                .map_err(|e| EngineError::WalError(e.to_string()))?;
        }
        self.ledger.apply(&event)?;
        if let Some(booking) = self.ledger.get(event.booking_id()) {
            let blocks: BTreeSet<&str> = booking.rooms.iter().map(|r| r.block.as_str()).collect();
            for block in blocks {
                self.notify.send(block, &event);
            }
        }
        self.maybe_compact();
        Ok(())
    }

    fn maybe_compact(&mut self) {
        let Some(journal) = &mut self.journal else {
            return;
        };
        if journal.wal.appends_since_compact() < journal.compact_threshold {
            return;
        }
        let events = snapshot_events(&self.ledger, &self.imported);
        let result = Wal::write_compact_file(journal.wal.path(), &events)
            .and_then(|()| journal.wal.swap_compact_file());
        match result {
            Ok(()) => {
                info!(events = events.len(), "journal compacted");
                metrics::counter!(crate::observability::JOURNAL_COMPACTIONS_TOTAL).increment(1);
            }
            Err(e) => warn!("journal compaction failed: {e}"),
        }
    }
}

/// Minimal event list that rebuilds the journaled part of the ledger.
/// Imported bookings come back from their source; only their cancellations are kept.
fn snapshot_events(ledger: &Ledger, imported: &HashSet<Ulid>) -> Vec<Event> {
    ledger
        .iter()
        .filter_map(|b| {
            if !imported.contains(&b.id) {
                Some(Event::BookingConfirmed { booking: b.clone() })
            } else {
                b.cancelled_at.map(|cancelled_at| Event::BookingCancelled {
                    id: b.id,
                    cancelled_at,
                })
            }
        })
        .collect()
}
