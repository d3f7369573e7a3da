use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde_json::{json, Value};
use tracing::info;
use ulid::Ulid;

use clubstay::auth::SharedSecretGate;
use clubstay::engine::{BookingRequest, Engine, FilterSet};
use clubstay::loader::{self, DataSources};
use clubstay::model::DateRange;
use clubstay::notify::NotifyHub;

const USAGE: &str = "usage: clubstay <command>
  calendar [FROM] [MONTHS]
  availability CHECK_IN CHECK_OUT [--wheelchair] [--pets] [--ac] [--single] [--group]
               [--min N] [--max N] [--adults N]
  book --secret S            (booking request JSON on stdin)
  bookings MEMBER
  cancel ID --secret S";

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Positional arguments, bare `--flags`, and `--option value` pairs.
struct Args {
    positional: Vec<String>,
    flags: HashSet<String>,
    options: HashMap<String, String>,
}

impl Args {
    fn parse(raw: &[String], valued: &[&str]) -> CliResult<Self> {
        let mut args = Args {
            positional: Vec::new(),
            flags: HashSet::new(),
            options: HashMap::new(),
        };
        let mut it = raw.iter();
        while let Some(arg) = it.next() {
            match arg.strip_prefix("--") {
                Some(name) if valued.contains(&name) => {
                    let value = it.next().ok_or_else(|| format!("--{name} needs a value"))?;
                    args.options.insert(name.to_string(), value.clone());
                }
                Some(name) => {
                    args.flags.insert(name.to_string());
                }
                None => args.positional.push(arg.clone()),
            }
        }
        Ok(args)
    }

    fn flag(&self, name: &str) -> bool {
        self.flags.contains(name)
    }

    fn number(&self, name: &str) -> CliResult<Option<u32>> {
        match self.options.get(name) {
            Some(v) => match v.parse::<u32>() {
                Ok(n) => Ok(Some(n)),
                Err(_) => Err(format!("--{name} expects a number, got {v:?}").into()),
            },
            None => Ok(None),
        }
    }

    fn date(&self, idx: usize, what: &str) -> CliResult<NaiveDate> {
        let raw = self.positional.get(idx).ok_or_else(|| format!("missing {what}\n{USAGE}"))?;
        raw.parse::<NaiveDate>()
            .map_err(|_| format!("{what} must be YYYY-MM-DD, got {raw:?}").into())
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

fn run(engine: &mut Engine, gate: &SharedSecretGate, argv: &[String]) -> CliResult<Value> {
    let Some((command, rest)) = argv.split_first() else {
        return Err(USAGE.into());
    };
    let today = chrono::Local::now().date_naive();

    match command.as_str() {
        "calendar" => {
            let args = Args::parse(rest, &[])?;
            let from = match args.positional.first() {
                Some(_) => args.date(0, "FROM")?,
                None => today,
            };
            let months = match args.positional.get(1) {
                Some(m) => m.parse().map_err(|_| format!("MONTHS must be a number, got {m:?}"))?,
                None => 6,
            };
            Ok(serde_json::to_value(engine.vacancy_calendar(from, months)?)?)
        }
        "availability" => {
            let args = Args::parse(rest, &["min", "max", "adults"])?;
            let range = DateRange::new(args.date(0, "CHECK_IN")?, args.date(1, "CHECK_OUT")?);
            let filters = FilterSet {
                wheelchair: args.flag("wheelchair"),
                pets: args.flag("pets"),
                ac: args.flag("ac"),
                single: args.flag("single"),
                min_occupants: args.number("min")?,
                max_occupants: args.number("max")?,
                group: args.flag("group"),
            };
            let adults = args.number("adults")?.unwrap_or(1);
            let search = engine.find_available_with_fallback(range, &filters, adults)?;
            let blocks = engine.block_summary(range)?;
            Ok(json!({
                "tier": engine.calendar().season_tier(&range),
                "nights": range.nights(),
                "search": search,
                "blocks": blocks,
            }))
        }
        "book" => {
            let args = Args::parse(rest, &["secret"])?;
            let secret = args.options.get("secret").ok_or("book needs --secret")?;
            if !gate.verify_member(secret) {
                return Err("member secret rejected".into());
            }
            let mut body = String::new();
            std::io::stdin().read_to_string(&mut body)?;
            let request: BookingRequest = serde_json::from_str(&body)?;
            let pending = engine.request_booking(&request)?;
            let booking = engine.confirm_booking(pending.token)?;
            Ok(json!({
                "booking": booking,
                "quote": pending.quote,
                "display_total": pending.quote.display_total(),
            }))
        }
        "bookings" => {
            let member = rest.first().ok_or_else(|| format!("missing MEMBER\n{USAGE}"))?;
            Ok(serde_json::to_value(engine.bookings_for(member))?)
        }
        "cancel" => {
            let args = Args::parse(rest, &["secret"])?;
            let secret = args.options.get("secret").ok_or("cancel needs --secret")?;
            if gate.verify(secret).is_none() {
                return Err("secret rejected".into());
            }
            let raw = args.positional.first().ok_or_else(|| format!("missing ID\n{USAGE}"))?;
            let id = Ulid::from_string(raw).map_err(|e| format!("bad booking id {raw:?}: {e}"))?;
            let quote = engine.cancel_booking(id)?;
            Ok(json!({ "id": id, "cancellation": quote }))
        }
        other => Err(format!("unknown command {other:?}\n{USAGE}").into()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let metrics_port: Option<u16> = std::env::var("CLUBSTAY_METRICS_PORT")
        .ok()
        .and_then(|s| s.parse().ok());
    clubstay::observability::init(metrics_port);

    let data_dir = PathBuf::from(std::env::var("CLUBSTAY_DATA_DIR").unwrap_or_else(|_| "./data".into()));
    let journal = std::env::var("CLUBSTAY_JOURNAL")
        .map(PathBuf::from)
        .unwrap_or_else(|_| data_dir.join("ledger.wal"));
    let load_timeout = Duration::from_millis(env_or("CLUBSTAY_LOAD_TIMEOUT_MS", 2000));
    let compact_threshold: u64 = env_or("CLUBSTAY_COMPACT_THRESHOLD", 1000);
    let gate = SharedSecretGate::new(
        std::env::var("CLUBSTAY_MEMBER_SECRET").unwrap_or_else(|_| "123".into()),
        std::env::var("CLUBSTAY_ADMIN_SECRET").unwrap_or_else(|_| "admin123".into()),
    );

    info!("  data_dir: {}", data_dir.display());
    info!("  journal: {}", journal.display());

    let data = loader::load_session(&DataSources::in_dir(&data_dir, load_timeout)).await;
    let mut engine = Engine::open(data, &journal, compact_threshold, Arc::new(NotifyHub::new()))?;

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let output = run(&mut engine, &gate, &argv)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
