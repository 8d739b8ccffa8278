//! sirius-schedule CLI
//!
//! Runs the background refresh loops, serves one-off schedule queries,
//! and renders two-week iCalendar files from the cache.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use sirius_schedule::{
    config::Config,
    error::{AppError, Result},
    models::{EntityClass, Event, WeekSlot, load_roster},
    pipeline::RefreshScheduler,
    services::{ProtocolClient, Transport, TransportConfig},
    storage::CacheStore,
    utils::ics::{self, CalendarKind},
};

/// sirius-schedule - Sirius University timetable scraper
#[derive(Parser, Debug)]
#[command(
    name = "sirius-schedule",
    version,
    about = "Schedule scraper and two-week cache for the Sirius University timetable"
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the schedule for one entity and print it as JSON
    Fetch {
        /// Group name or teacher id
        entity: String,

        /// Relative week offset (0 = current week)
        #[arg(short, long, default_value_t = 0)]
        week: i64,

        /// Look up a teacher instead of a group
        #[arg(long)]
        teacher: bool,

        /// Skip the cache even for weeks 0 and 1
        #[arg(long)]
        live: bool,
    },

    /// Run the periodic cache refresh loops for groups and teachers
    Refresh {
        /// Run a single refresh batch per class and exit
        #[arg(long)]
        once: bool,
    },

    /// Render a two-week iCalendar for one entity
    Calendar {
        /// Group name or teacher id
        entity: String,

        /// Render a teacher calendar instead of a group calendar
        #[arg(long)]
        teacher: bool,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<std::path::PathBuf>,
    },

    /// Validate the environment configuration
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::from_env();
    config.validate()?;

    match cli.command {
        Command::Fetch {
            entity,
            week,
            teacher,
            live,
        } => {
            let class = entity_class(teacher);
            let events = fetch_schedule(&config, class, &entity, week, live).await?;
            println!("{}", serde_json::to_string_pretty(&events)?);
        }

        Command::Refresh { once } => run_refresh(&config, once).await?,

        Command::Calendar {
            entity,
            teacher,
            output,
        } => {
            let class = entity_class(teacher);
            let calendar = render_calendar(&config, class, &entity).await?;
            match output {
                Some(path) => {
                    tokio::fs::write(&path, calendar).await?;
                    log::info!("Calendar written to {}", path.display());
                }
                None => println!("{calendar}"),
            }
        }

        Command::Validate => {
            log::info!("Configuration OK");
            log::info!("  group page:       {}", config.origin.group_page);
            log::info!("  group endpoint:   {}", config.origin.group_endpoint);
            log::info!("  teacher page:     {}", config.origin.teacher_page);
            log::info!("  teacher endpoint: {}", config.origin.teacher_endpoint);
            log::info!("  cache dir:        {}", config.cache.dir.display());
        }
    }

    Ok(())
}

fn entity_class(teacher: bool) -> EntityClass {
    if teacher {
        EntityClass::Teacher
    } else {
        EntityClass::Group
    }
}

/// Answer a schedule query with the read-through chain: disk cache,
/// memory cache, then a one-off live session. Weeks outside the two
/// cached slots are always served live and never cached.
async fn fetch_schedule(
    config: &Config,
    class: EntityClass,
    entity: &str,
    week: i64,
    force_live: bool,
) -> Result<Vec<Event>> {
    let slot = if force_live {
        None
    } else {
        WeekSlot::from_offset(week)
    };

    let store = CacheStore::new(&config.cache.dir, class);
    if let Some(slot) = slot {
        store.load().await?;
        if let Some(events) = store.get(entity, slot).await {
            return Ok(events);
        }
    }

    let events = live_fetch(config, class, entity, week).await?;

    // week-scoped write-back, memory only for this process
    if let Some(slot) = slot {
        store.put(entity, slot, events.clone()).await;
    }
    Ok(events)
}

/// Bootstrap a fresh single-tenant session and fetch one schedule.
async fn live_fetch(
    config: &Config,
    class: EntityClass,
    entity: &str,
    week: i64,
) -> Result<Vec<Event>> {
    let transport = Transport::new(TransportConfig::from(&config.fetch))?;
    let target = class.target(&config.origin);

    let mut client = ProtocolClient::connect(&transport, &target).await?;
    client.change_week(week).await?;
    client.fetch_entity_schedule(entity).await
}

/// Two-week calendar, preferring the cache and falling back to a live
/// session for both weeks.
async fn render_calendar(config: &Config, class: EntityClass, entity: &str) -> Result<String> {
    let store = CacheStore::new(&config.cache.dir, class);
    store.load().await?;

    let week0 = store.get(entity, WeekSlot::Current).await;
    let week1 = store.get(entity, WeekSlot::Next).await;

    let mut events = Vec::new();
    match (week0, week1) {
        (Some(mut w0), Some(mut w1)) => {
            events.append(&mut w0);
            events.append(&mut w1);
        }
        _ => {
            let transport = Transport::new(TransportConfig::from(&config.fetch))?;
            let target = class.target(&config.origin);
            let mut client = ProtocolClient::connect(&transport, &target).await?;

            events.extend(client.fetch_entity_schedule(entity).await?);
            client.change_week(1).await?;
            events.extend(client.fetch_entity_schedule(entity).await?);
        }
    }

    let (kind, name) = match class {
        EntityClass::Group => (CalendarKind::Group, format!("Расписание {entity}")),
        EntityClass::Teacher => (CalendarKind::Teacher, "Расписание преподавателя".to_string()),
    };
    Ok(ics::render_calendar(&events, &name, kind))
}

/// Start both refresh loops. With `once` set, each class runs a single
/// batch and the process reports failure if either batch failed.
async fn run_refresh(config: &Config, once: bool) -> Result<()> {
    let group_task = spawn_class(config, EntityClass::Group, once).await?;
    let teacher_task = spawn_class(config, EntityClass::Teacher, once).await?;

    let (groups_ok, teachers_ok) = tokio::join!(group_task, teacher_task);
    let groups_ok = groups_ok.unwrap_or(false);
    let teachers_ok = teachers_ok.unwrap_or(false);

    if once && !(groups_ok && teachers_ok) {
        return Err(AppError::config("refresh batch failed"));
    }
    Ok(())
}

/// Build the scheduler for one class and spawn its task.
async fn spawn_class(
    config: &Config,
    class: EntityClass,
    once: bool,
) -> Result<tokio::task::JoinHandle<bool>> {
    let roster_path = match class {
        EntityClass::Group => &config.roster.groups_file,
        EntityClass::Teacher => &config.roster.teachers_file,
    };
    let entities = match load_roster(roster_path).await {
        Ok(entities) => entities,
        Err(error) => {
            log::error!("could not load {} roster: {error}", class.label());
            Vec::new()
        }
    };
    log::info!("{}: {} entities", class.label(), entities.len());

    let store = Arc::new(CacheStore::new(&config.cache.dir, class));
    store.load().await?;

    let transport = Arc::new(Transport::new(TransportConfig::from(&config.fetch))?);
    let mut scheduler = RefreshScheduler::new(
        class,
        class.target(&config.origin),
        entities,
        transport,
        store,
        config.cache.clone(),
    );

    Ok(tokio::spawn(async move {
        if once {
            scheduler.run_once().await
        } else {
            scheduler.run().await;
            true
        }
    }))
}
