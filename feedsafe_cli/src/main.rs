use chrono::{Local, TimeZone, Utc};
use clap::{Parser, Subcommand};
use feedsafe_core::drink_log::read_entries;
use feedsafe_core::feeds::merge_feeds;
use feedsafe_core::time::{parse_iso, MS_PER_HOUR, MS_PER_MINUTE};
use feedsafe_core::*;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "feedsafe")]
#[command(about = "Plan breastfeeding around drinks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the countdown for the current session (default)
    Status {
        /// Evaluate at this instant (ISO-8601) instead of now
        #[arg(long)]
        at: Option<String>,

        /// Keep updating once per second until it is safe
        #[arg(long)]
        watch: bool,

        /// Stop watching after this many ticks
        #[arg(long, requires = "watch")]
        ticks: Option<u64>,
    },

    /// Log a drink you just had (or had at --at)
    Log {
        /// Beverage type (wine, beer, cocktail, other, or a custom id)
        #[arg(long = "type", default_value = "wine")]
        drink_type: String,

        #[arg(long, default_value_t = 1)]
        glasses: u32,

        /// When the drink was consumed (ISO-8601), defaults to now
        #[arg(long)]
        at: Option<String>,
    },

    /// Convert a beverage to standard drinks
    Convert {
        /// Alcohol by volume, in percent
        #[arg(long)]
        abv: f64,

        /// Volume in ml
        #[arg(long)]
        volume: f64,
    },

    /// Plan an evening: drinks, feeds, pumps and the safe-to-feed time
    Plan {
        /// Planned drink as TYPE@TIME or TYPE:GLASSES@TIME (repeatable)
        #[arg(long = "drink", required = true)]
        drinks: Vec<String>,

        /// Start of the evening (ISO-8601), defaults to now
        #[arg(long)]
        start: Option<String>,

        /// Last breastfeed before the evening (ISO-8601)
        #[arg(long)]
        last_feed: Option<String>,

        /// A feed you already know the time of (repeatable)
        #[arg(long = "feed")]
        feeds: Vec<String>,

        /// minimal or conservative (defaults to config)
        #[arg(long)]
        strategy: Option<String>,

        /// Extra minutes after clearance (defaults to config)
        #[arg(long)]
        margin: Option<i64>,

        /// Show the plan without saving it
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the last saved plan
    Show,

    /// End the session and forget logged drinks
    Clear,
}

fn main() -> Result<()> {
    feedsafe_core::logging::init_with_level("warn");

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    tracing::debug!("Using data directory {:?}", data_dir);

    let catalog = config.catalog();
    let errors = catalog.validate();
    if !errors.is_empty() {
        eprintln!("Beverage catalog errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::Config("Invalid beverage catalog".into()));
    }

    match cli.command {
        Some(Commands::Status { at, watch, ticks }) => {
            cmd_status(&data_dir, &config, at.as_deref(), watch, ticks)
        }
        Some(Commands::Log {
            drink_type,
            glasses,
            at,
        }) => cmd_log(&data_dir, &catalog, &drink_type, glasses, at.as_deref()),
        Some(Commands::Convert { abv, volume }) => cmd_convert(&config, abv, volume),
        Some(Commands::Plan {
            drinks,
            start,
            last_feed,
            feeds,
            strategy,
            margin,
            dry_run,
        }) => cmd_plan(
            &data_dir,
            &config,
            &catalog,
            PlanArgs {
                drinks,
                start,
                last_feed,
                feeds,
                strategy,
                margin,
                dry_run,
            },
        ),
        Some(Commands::Show) => cmd_show(&data_dir),
        Some(Commands::Clear) => cmd_clear(&data_dir),
        None => cmd_status(&data_dir, &config, None, false, None),
    }
}

fn drink_log_path(data_dir: &Path) -> PathBuf {
    data_dir.join("drinks.jsonl")
}

fn plan_path(data_dir: &Path) -> PathBuf {
    data_dir.join("plan.json")
}

fn parse_instant(value: Option<&str>, what: &str) -> Result<i64> {
    match value {
        None => Ok(Utc::now().timestamp_millis()),
        Some(s) => parse_iso(s)
            .ok_or_else(|| Error::Input(format!("{} is not an ISO-8601 time: {}", what, s))),
    }
}

fn cmd_status(
    data_dir: &Path,
    config: &Config,
    at: Option<&str>,
    watch: bool,
    ticks: Option<u64>,
) -> Result<()> {
    let entries = read_entries(&drink_log_path(data_dir))?;
    let engine = CountdownEngine::new(
        entries,
        &config.profile,
        config.planning.safety_margin_minutes,
    );
    print_issues(engine.issues());

    if engine.entries().is_empty() {
        println!("No drinks logged - safe to feed.");
        return Ok(());
    }

    let fixed = match at {
        Some(_) => Some(parse_instant(at, "--at")?),
        None => None,
    };

    let mut tick: u64 = 0;
    loop {
        // With --at the clock is simulated so runs are reproducible
        let now = match fixed {
            Some(start) => start + tick as i64 * 1_000,
            None => Utc::now().timestamp_millis(),
        };
        let status = engine.status(now);
        print_status(&status);

        tick += 1;
        let done = status.is_safe || ticks.map_or(false, |limit| tick >= limit);
        if !watch || done {
            break;
        }
        std::thread::sleep(std::time::Duration::from_secs(1));
    }

    Ok(())
}

fn print_status(status: &CountdownStatus) {
    if status.is_safe {
        println!("✓ Safe to feed");
    } else {
        println!(
            "Wait {} (safe at {})",
            format_duration(status.remaining_ms),
            format_time(status.safe_at)
        );
    }
}

fn cmd_log(
    data_dir: &Path,
    catalog: &BeverageCatalog,
    drink_type: &str,
    glasses: u32,
    at: Option<&str>,
) -> Result<()> {
    let beverage = catalog.get(drink_type).ok_or_else(|| {
        Error::Input(format!(
            "unknown beverage type {} (known: {})",
            drink_type,
            catalog.ids().join(", ")
        ))
    })?;
    if glasses == 0 {
        return Err(Error::Input("glasses must be at least 1".into()));
    }

    let timestamp = parse_instant(at, "--at")?;
    let mut entry = DrinkEntry::new(timestamp, glasses, beverage.multiplier);
    entry.drink_type_id = Some(beverage.id.clone());

    let mut log = JsonlDrinkLog::new(drink_log_path(data_dir));
    log.append(&entry)?;

    println!(
        "✓ Logged {} x {} at {}",
        glasses,
        beverage.name,
        format_time(timestamp)
    );
    Ok(())
}

fn cmd_convert(config: &Config, abv: f64, volume: f64) -> Result<()> {
    let drinks = feedsafe_core::converter::to_standard_drinks_with(
        abv,
        volume,
        config.profile.std_drink_grams,
    );
    println!(
        "{} ml at {}% = {:.2} standard drinks ({} g each)",
        volume, abv, drinks, config.profile.std_drink_grams
    );
    Ok(())
}

struct PlanArgs {
    drinks: Vec<String>,
    start: Option<String>,
    last_feed: Option<String>,
    feeds: Vec<String>,
    strategy: Option<String>,
    margin: Option<i64>,
    dry_run: bool,
}

fn cmd_plan(
    data_dir: &Path,
    config: &Config,
    catalog: &BeverageCatalog,
    args: PlanArgs,
) -> Result<()> {
    let now = Utc::now().timestamp_millis();
    let start_time = match args.start.as_deref() {
        Some(_) => parse_instant(args.start.as_deref(), "--start")?,
        None => now,
    };
    let last_feed_time = match args.last_feed.as_deref() {
        Some(_) => Some(parse_instant(args.last_feed.as_deref(), "--last-feed")?),
        None => None,
    };
    let strategy = match args.strategy.as_deref() {
        Some(s) => s.parse::<Strategy>()?,
        None => config.planning.strategy,
    };

    let planned_drinks = args
        .drinks
        .iter()
        .map(|spec| parse_drink_spec(spec))
        .collect::<Result<Vec<_>>>()?;

    let manual_feeds = args
        .feeds
        .iter()
        .map(|t| {
            parse_instant(Some(t), "--feed")
                .map(|time| FeedPrediction::manual(time, config.planning.feed_amount_ml))
        })
        .collect::<Result<Vec<_>>>()?;

    let predicted = feedsafe_core::predict_feeds(
        Some(last_feed_time.unwrap_or(start_time - MS_PER_HOUR)),
        config.planning.feed_interval_hours,
        config.planning.feed_amount_ml,
        now,
    );
    let predicted_feeds =
        merge_feeds(&predicted, &manual_feeds, config.planning.feed_interval_hours);

    let request = PlanRequest {
        planned_drinks,
        predicted_feeds,
        start_time,
        last_feed_time: last_feed_time.map(TimeInput::Millis),
        strategy,
        safety_margin_minutes: args.margin.unwrap_or(config.planning.safety_margin_minutes),
    };

    tracing::debug!(
        "Planning {} drinks against {} feeds ({} entered)",
        request.planned_drinks.len(),
        request.predicted_feeds.len(),
        manual_feeds.len()
    );
    let plan = generate_plan(&request, catalog);
    print_issues(&plan.issues);

    if plan.moments.is_empty() {
        println!("No usable drinks - nothing to plan.");
        return Ok(());
    }

    print_moments(&plan.moments);

    if args.dry_run {
        println!("\n[Dry run - plan not saved]");
        return Ok(());
    }

    let stored = PersistedPlan::from_plan(
        &request,
        &plan,
        start_time,
        config.planning.feed_duration_min,
        now,
    );
    let path = plan_path(data_dir);
    stored.save(&path)?;
    println!("\n✓ Plan saved to {}", path.display());

    Ok(())
}

/// `wine@2026-10-18T20:00` or `beer:2@2026-10-18T21:00`
fn parse_drink_spec(spec: &str) -> Result<PlannedDrink> {
    let (kind, time) = spec
        .split_once('@')
        .ok_or_else(|| Error::Input(format!("drink {} must look like TYPE@TIME", spec)))?;

    let (kind, amount) = match kind.split_once(':') {
        Some((kind, glasses)) => {
            let glasses: f64 = glasses
                .parse()
                .map_err(|_| Error::Input(format!("bad glass count in {}", spec)))?;
            (kind, Some(glasses))
        }
        None => (kind, None),
    };

    // Unparseable times are left for the planner to drop and report
    let mut drink = PlannedDrink::new(kind.trim(), TimeInput::Text(time.trim().to_string()));
    drink.amount = amount;
    Ok(drink)
}

fn cmd_show(data_dir: &Path) -> Result<()> {
    let path = plan_path(data_dir);
    let Some(stored) = PersistedPlan::load(&path)? else {
        println!("No saved plan.");
        return Ok(());
    };

    let (moments, issues) = stored.to_moments();
    print_issues(&issues);
    println!("Strategy: {:?}", stored.strategy);
    print_moments(&moments);
    Ok(())
}

fn cmd_clear(data_dir: &Path) -> Result<()> {
    let mut log = JsonlDrinkLog::new(drink_log_path(data_dir));
    let dropped = log.clear()?;
    println!("✓ Cleared {} logged drinks", dropped);
    Ok(())
}

fn print_moments(moments: &[PlanningMoment]) {
    println!();
    for moment in moments {
        let marker = match moment.status {
            MomentStatus::Safe => "✓",
            MomentStatus::Warning => "!",
            MomentStatus::Unsafe => "✗",
        };
        println!(
            "  {}  {} {:<6} {:<20} {}",
            format_time(moment.time),
            marker,
            moment.kind.type_name(),
            moment.label,
            moment.description
        );
    }
}

fn print_issues(issues: &[InputIssue]) {
    for issue in issues {
        eprintln!(
            "warning: ignored {} {}: {}",
            issue.record,
            issue.id.as_deref().unwrap_or(""),
            issue.reason
        );
    }
}

fn format_time(ms: i64) -> String {
    match Local.timestamp_millis_opt(ms).single() {
        Some(dt) => dt.format("%a %H:%M").to_string(),
        None => ms.to_string(),
    }
}

fn format_duration(ms: i64) -> String {
    let minutes = (ms + MS_PER_MINUTE - 1) / MS_PER_MINUTE;
    format!("{}h {:02}m", minutes / 60, minutes % 60)
}
