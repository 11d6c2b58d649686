use std::env;
use std::net::SocketAddr;

use chrono::{TimeZone, Utc};
use contracts::{CompletionEvent, QuestDifficulty, TaskCategory, TaskDifficulty};
use progression_api::{serve, EngineApi};
use tracing_subscriber::EnvFilter;

fn print_usage() {
    println!("dailyxp <command>");
    println!("commands:");
    println!("  status <user_id>");
    println!("  create <user_id>");
    println!("  complete-task <user_id> <category> <difficulty>");
    println!("    category: health|work|creativity|social|learning");
    println!("    difficulty: easy|medium|hard");
    println!("  complete-quest-step <user_id> <category> <difficulty> <step_count> [done]");
    println!("    difficulty: easy|medium|hard|legendary; pass 'done' when the step finishes the quest");
    println!("  roll-day <user_id>");
    println!("  catalog");
    println!("  serve [addr]");
    println!("    default addr: 127.0.0.1:8080");
    println!("  simulate <user_id> <days> [sqlite_path]");
    println!("    runs a deterministic multi-day completion demo and persists to sqlite");
}

fn default_sqlite_path() -> String {
    std::env::var("DAILYXP_SQLITE_PATH")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| "dailyxp_profiles.sqlite".to_string())
}

fn open_api() -> Result<EngineApi, String> {
    let mut api = EngineApi::new();
    api.attach_sqlite_store(default_sqlite_path())
        .map_err(|err| format!("failed to attach sqlite store: {err}"))?;
    Ok(api)
}

fn parse_category(value: Option<&String>) -> Result<TaskCategory, String> {
    let raw = value.ok_or_else(|| "missing category".to_string())?;
    TaskCategory::parse(raw).ok_or_else(|| format!("invalid category: {raw}"))
}

fn parse_socket_addr(value: Option<&String>) -> Result<SocketAddr, String> {
    let raw = value.map(String::as_str).unwrap_or("127.0.0.1:8080");
    raw.parse::<SocketAddr>()
        .map_err(|_| format!("invalid addr: {raw}"))
}

fn run_status(args: &[String]) -> Result<(), String> {
    let user_id = args.get(2).ok_or_else(|| "missing user_id".to_string())?;
    let mut api = open_api()?;
    let snapshot = api
        .open_profile(user_id)
        .map_err(|err| format!("failed to load profile: {err}"))?
        .clone();
    println!("{snapshot}");
    if let Some(unlocks) = api.unlocks(user_id) {
        for entry in unlocks {
            println!(
                "  [{}] {} {} ({})",
                entry.unlock_order,
                entry.reward.icon,
                entry.reward.name,
                entry.reward.kind.as_str()
            );
        }
    }
    Ok(())
}

fn run_create(args: &[String]) -> Result<(), String> {
    let user_id = args.get(2).ok_or_else(|| "missing user_id".to_string())?;
    let mut api = open_api()?;
    let snapshot = api
        .create_profile(user_id, Utc::now(), false)
        .map_err(|err| format!("failed to create profile: {err}"))?;
    println!("created: {snapshot}");
    Ok(())
}

fn run_complete_task(args: &[String]) -> Result<(), String> {
    let user_id = args.get(2).ok_or_else(|| "missing user_id".to_string())?;
    let category = parse_category(args.get(3))?;
    let difficulty_raw = args.get(4).ok_or_else(|| "missing difficulty".to_string())?;
    let difficulty = TaskDifficulty::parse(difficulty_raw)
        .ok_or_else(|| format!("invalid difficulty: {difficulty_raw}"))?;

    let mut api = open_api()?;
    api.open_profile(user_id)
        .map_err(|err| format!("failed to load profile: {err}"))?;
    let completion_count = api.completions(user_id).map(<[_]>::len).unwrap_or(0);

    let occurred_at = Utc::now();
    let event = CompletionEvent::task(
        format!("evt_{}_{:06}", occurred_at.timestamp_millis(), completion_count + 1),
        user_id,
        category,
        difficulty.xp_value(),
        occurred_at,
    );

    let outcome = api
        .complete(&event)
        .map_err(|err| format!("completion failed: {err}"))?;
    print_outcome_summary(&outcome);
    Ok(())
}

fn run_complete_quest_step(args: &[String]) -> Result<(), String> {
    let user_id = args.get(2).ok_or_else(|| "missing user_id".to_string())?;
    let category = parse_category(args.get(3))?;
    let difficulty_raw = args.get(4).ok_or_else(|| "missing difficulty".to_string())?;
    let difficulty = QuestDifficulty::parse(difficulty_raw)
        .ok_or_else(|| format!("invalid difficulty: {difficulty_raw}"))?;
    let step_count_raw = args.get(5).ok_or_else(|| "missing step_count".to_string())?;
    let step_count = step_count_raw
        .parse::<u32>()
        .map_err(|_| format!("invalid step_count: {step_count_raw}"))?;
    let quest_completed = args.get(6).map(String::as_str) == Some("done");

    let mut api = open_api()?;
    api.open_profile(user_id)
        .map_err(|err| format!("failed to load profile: {err}"))?;
    let completion_count = api.completions(user_id).map(<[_]>::len).unwrap_or(0);

    let occurred_at = Utc::now();
    let event = CompletionEvent::quest_step(
        format!("evt_{}_{:06}", occurred_at.timestamp_millis(), completion_count + 1),
        user_id,
        category,
        difficulty.step_xp(step_count),
        occurred_at,
        quest_completed,
    );

    let outcome = api
        .complete(&event)
        .map_err(|err| format!("completion failed: {err}"))?;
    print_outcome_summary(&outcome);
    Ok(())
}

fn run_roll_day(args: &[String]) -> Result<(), String> {
    let user_id = args.get(2).ok_or_else(|| "missing user_id".to_string())?;
    let mut api = open_api()?;
    let snapshot = api
        .roll_day(user_id, Utc::now().date_naive())
        .map_err(|err| format!("roll-day failed: {err}"))?;
    println!("{snapshot}");
    Ok(())
}

fn run_catalog() {
    let api = EngineApi::new();
    for definition in api.catalog().iter() {
        println!(
            "{} {:12} {:18} {}",
            definition.icon,
            definition.kind.as_str(),
            definition.reward_id,
            definition.description
        );
    }
}

fn print_outcome_summary(outcome: &contracts::CompletionOutcome) {
    println!("{}", outcome.snapshot);
    for notification in &outcome.notifications {
        println!("  {}", notification.message);
    }
}

fn run_simulation(args: &[String]) -> Result<(), String> {
    let user_id = args
        .get(2)
        .cloned()
        .ok_or_else(|| "missing user_id".to_string())?;
    let days = args
        .get(3)
        .ok_or_else(|| "missing days".to_string())?
        .parse::<u32>()
        .map_err(|_| "invalid days".to_string())?;
    let sqlite_path = args
        .get(4)
        .cloned()
        .filter(|path| !path.trim().is_empty())
        .unwrap_or_else(default_sqlite_path);

    let created_at = Utc
        .with_ymd_and_hms(2024, 1, 1, 8, 0, 0)
        .single()
        .ok_or_else(|| "invalid base date".to_string())?;
    let mut api = EngineApi::new();
    api.attach_sqlite_store(&sqlite_path)
        .map_err(|err| format!("failed to attach sqlite store: {err}"))?;
    api.create_profile(&user_id, created_at, true)
        .map_err(|err| format!("failed to initialize profile: {err}"))?;

    let categories = TaskCategory::ALL;
    let difficulties = [
        TaskDifficulty::Easy,
        TaskDifficulty::Medium,
        TaskDifficulty::Hard,
    ];

    let mut completions = 0_u64;
    for day in 0..days {
        for slot in 0..3_u32 {
            let occurred_at = created_at
                + chrono::Duration::days(i64::from(day))
                + chrono::Duration::hours(i64::from(slot) * 4);
            let index = (day * 3 + slot) as usize;
            let event = CompletionEvent::task(
                format!("evt_sim_{:06}", index),
                &user_id,
                categories[index % categories.len()],
                difficulties[index % difficulties.len()].xp_value(),
                occurred_at,
            );
            api.complete(&event)
                .map_err(|err| format!("completion failed on day {day}: {err}"))?;
            completions += 1;
        }
    }

    api.flush_persistence_checked()
        .map_err(|err| format!("persistence error after simulation: {err}"))?;

    let snapshot = api
        .snapshot(&user_id)
        .ok_or_else(|| "profile missing after simulation".to_string())?;
    println!(
        "simulated user_id={} days={} completions={} -> {} sqlite={}",
        user_id, days, completions, snapshot, sqlite_path
    );
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(String::as_str);

    let result = match command {
        Some("status") => run_status(&args),
        Some("create") => run_create(&args),
        Some("complete-task") => run_complete_task(&args),
        Some("complete-quest-step") => run_complete_quest_step(&args),
        Some("roll-day") => run_roll_day(&args),
        Some("catalog") => {
            run_catalog();
            Ok(())
        }
        Some("serve") => match parse_socket_addr(args.get(2)) {
            Ok(addr) => {
                println!("serving api on http://{addr}");
                if let Err(err) = serve(addr).await {
                    eprintln!("server error: {err}");
                    std::process::exit(1);
                }
                Ok(())
            }
            Err(err) => Err(err),
        },
        Some("simulate") => run_simulation(&args),
        _ => {
            print_usage();
            Ok(())
        }
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        print_usage();
        std::process::exit(2);
    }
}
