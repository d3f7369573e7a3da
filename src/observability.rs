use std::net::SocketAddr;

use crate::engine::EngineError;

// ── Booking flow ────────────────────────────────────────────────

/// Counter: quotes handed out by `request_booking`.
pub const QUOTES_ISSUED_TOTAL: &str = "clubstay_quotes_issued_total";

/// Counter: quotes dropped or refused because they outlived their TTL.
pub const QUOTES_EXPIRED_TOTAL: &str = "clubstay_quotes_expired_total";

/// Counter: booking requests refused. Labels: reason.
pub const REQUESTS_REJECTED_TOTAL: &str = "clubstay_requests_rejected_total";

pub const BOOKINGS_CONFIRMED_TOTAL: &str = "clubstay_bookings_confirmed_total";

pub const BOOKINGS_CANCELLED_TOTAL: &str = "clubstay_bookings_cancelled_total";

/// Histogram: availability search latency in seconds.
pub const AVAILABILITY_QUERY_DURATION_SECONDS: &str = "clubstay_availability_query_duration_seconds";

// ── Session and storage ─────────────────────────────────────────

/// Counter: data sources replaced by built-in defaults. Labels: source.
pub const DATA_LOAD_FALLBACKS_TOTAL: &str = "clubstay_data_load_fallbacks_total";

pub const JOURNAL_COMPACTIONS_TOTAL: &str = "clubstay_journal_compactions_total";

/// Counter: rejected member/admin secrets.
pub const AUTH_FAILURES_TOTAL: &str = "clubstay_auth_failures_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}

/// Short label for an error, for the `reason` metric label.
pub fn error_label(err: &EngineError) -> &'static str {
    match err {
        EngineError::InvalidRange { .. } => "invalid_range",
        EngineError::ClosedPeriod { .. } => "closed_period",
        EngineError::RoomUnavailable { .. } => "room_unavailable",
        EngineError::UnknownRoom(_) => "unknown_room",
        EngineError::DuplicateRoom(_) => "duplicate_room",
        EngineError::NoRoomsSelected => "no_rooms_selected",
        EngineError::DuplicateBooking(_) => "duplicate_booking",
        EngineError::NotFound(_) => "not_found",
        EngineError::AlreadyCancelled(_) => "already_cancelled",
        EngineError::QuoteExpired(_) => "quote_expired",
        EngineError::OccupancyMismatch { .. } => "occupancy_mismatch",
        EngineError::OccupancyOutOfBounds { .. } => "occupancy_out_of_bounds",
        EngineError::TooManyOpenBookings { .. } => "too_many_open_bookings",
        EngineError::GroupPolicy(_) => "group_policy",
        EngineError::MissingRate { .. } => "missing_rate",
        EngineError::NoCancellationRule { .. } => "no_cancellation_rule",
        EngineError::LimitExceeded(_) => "limit_exceeded",
        EngineError::WalError(_) => "journal",
    }
}
