//*** START FILE: src/main.rs ***//
use clap::Parser;
use hanzi_flashcards::config::{load_config_from_file, Config, SessionOptions};
use hanzi_flashcards::session::{
    DriverUpdate, FieldView, Phase, SelectionPolicy, SessionDriver, SessionEvent, SessionState,
};
use hanzi_flashcards::snapshot_io::{JsonFileStore, SnapshotStore};
use hanzi_flashcards::EntryField;
use log::error;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(name = "hanzi_flashcards")]
#[command(about = "Self-quiz on Chinese characters and their pinyin")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "flashcards.toml")]
    config: String,

    /// JSON rows file, overrides `entries_path`
    #[arg(short, long)]
    entries: Option<PathBuf>,

    /// Snapshot file, overrides `snapshot_path`
    #[arg(short, long)]
    snapshot: Option<PathBuf>,

    /// Show low `priority` values earlier in each cycle
    #[arg(long)]
    priority: bool,

    /// Shorter pause after a correct answer
    #[arg(long)]
    fast: bool,

    /// Also move on automatically after a wrong answer
    #[arg(long)]
    auto_advance_incorrect: bool,

    /// Ignore the saved session and load the rows file again
    #[arg(long)]
    reload: bool,

    /// Fixed random seed, for reproducible card order
    #[arg(long)]
    seed: Option<u64>,
}

fn resolve_config(args: &Args) -> Result<Config, Box<dyn Error>> {
    let mut config = if Path::new(&args.config).exists() {
        load_config_from_file(&args.config)?
    } else if let Some(entries) = &args.entries {
        Config {
            entries_path: entries.clone(),
            snapshot_path: PathBuf::from("flashcards.snapshot.json"),
            session: SessionOptions::default(),
        }
    } else {
        return Err(format!(
            "Config file '{}' not found and no --entries given.",
            args.config
        )
        .into());
    };

    if let Some(entries) = &args.entries {
        config.entries_path = entries.clone();
    }
    if let Some(snapshot) = &args.snapshot {
        config.snapshot_path = snapshot.clone();
    }
    config.session.priority_aware |= args.priority;
    config.session.fast_mode |= args.fast;
    config.session.auto_advance_on_incorrect |= args.auto_advance_incorrect;
    config.session.validate()?;
    Ok(config)
}

fn field_line(label: &str, view: FieldView<'_>) -> Option<String> {
    match view {
        FieldView::Absent => None,
        FieldView::Hidden => Some(format!("{}: ******", label)),
        FieldView::Shown(value) => Some(format!("{}: {}", label, value)),
    }
}

fn render_card(state: &SessionState) {
    let Some(card) = state.card_view() else {
        println!("⏳ No entries available. Type :reload to try again.");
        return;
    };
    let counters = state.counters();
    println!();
    println!(
        "── card {}/{} ── ✅ {} ❌ {} ──",
        state.already_shown().len(),
        state.entries().len(),
        counters.correct,
        counters.incorrect
    );
    let labels = [
        (EntryField::Primary, "汉字 (Hán tự)"),
        (EntryField::Phonetic, "Pinyin (phiên âm)"),
        (EntryField::Reading, "Chữ HÁN"),
        (EntryField::Gloss, "Nghĩa"),
        (EntryField::Example, "Ví dụ"),
    ];
    for (field, label) in labels {
        if let Some(line) = field_line(label, card.field(field)) {
            println!("{}", line);
        }
    }
    if card.is_revealed() {
        println!("(Enter or :next to continue)");
    } else {
        println!("汉字 (Hán tự)?");
    }
}

fn render_update(state: &SessionState, update: &DriverUpdate) {
    if let Some(message) = &update.unavailable {
        println!("⏳ {}", message);
    }
    if let Some(evaluation) = update.evaluation {
        if evaluation.is_correct() {
            println!("✅ Đúng! 💯");
        } else if let Some(entry) = state.current_entry() {
            println!("❌ Sai! - {} - {}", entry.primary(), entry.phonetic());
        }
    }
    if let Some(speech) = &update.speech {
        println!("🔊 [{}] {}", speech.language, speech.text);
    }
    if update.presented.is_some() || update.evaluation.is_some() {
        render_card(state);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();
    let config = resolve_config(&args)?;

    let rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let state = SessionState::new(SelectionPolicy::from_options(config.session.priority_aware), rng);

    let mut store = JsonFileStore::new(&config.snapshot_path);
    if args.reload {
        store.clear()?;
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut driver = SessionDriver::new(state, store, config.session.clone(), tx);

    if driver.resume() == Phase::Loading {
        println!("Loading entries from {} ...", config.entries_path.display());
        driver.request_reload(config.entries_path.clone());
    } else {
        render_card(driver.state());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pending_primary: Option<String> = None;

    loop {
        let event = tokio::select! {
            Some(event) = rx.recv() => event,
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim().to_string();
                match line.as_str() {
                    ":quit" | ":q" => break,
                    ":stats" => {
                        let c = driver.state().counters();
                        println!("correct {} / incorrect {} / answered {}", c.correct, c.incorrect, c.total_answered);
                        continue;
                    }
                    ":reload" => {
                        pending_primary = None;
                        driver.request_reload(config.entries_path.clone());
                        continue;
                    }
                    ":next" => SessionEvent::ManualAdvance,
                    _ => match driver.state().phase() {
                        Phase::Loading => {
                            println!("⏳ No entries available. Type :reload to try again.");
                            continue;
                        }
                        Phase::Resolved if line.is_empty() => SessionEvent::ManualAdvance,
                        Phase::Resolved => {
                            println!("(Enter or :next to continue)");
                            continue;
                        }
                        Phase::AwaitingAnswer => match pending_primary.take() {
                            None => {
                                pending_primary = Some(line.clone());
                                println!("Pinyin (phiên âm)?");
                                SessionEvent::PrimaryDraft(line)
                            }
                            Some(primary) => SessionEvent::Submit { primary, phonetic: line },
                        },
                    },
                }
            }
        };

        if matches!(event, SessionEvent::ManualAdvance | SessionEvent::EntriesLoaded(_)) {
            pending_primary = None;
        }
        match driver.handle(event) {
            Ok(update) => render_update(driver.state(), &update),
            Err(e) => error!("{}", e),
        }
    }

    driver.shutdown();
    Ok(())
}
//*** END FILE: src/main.rs ***//
