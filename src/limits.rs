/// Longest stay a single request may cover.
pub const MAX_STAY_NIGHTS: i64 = 30;

pub const MAX_ROOMS_PER_BOOKING: usize = 40;

/// Restricted periods wider than this are skipped when building the day index.
pub const MAX_PERIOD_SPAN_DAYS: i64 = 400;

pub const MAX_CALENDAR_MONTHS: u32 = 24;

pub const MAX_INVENTORY_ROOMS: usize = 10_000;

/// How long a quote stays confirmable.
pub const QUOTE_TTL_SECS: i64 = 900;

pub const MAX_MEMBER_ID_LEN: usize = 64;
