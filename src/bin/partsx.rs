// Native binary for partsx - inspect the comparison list and print settings

use anyhow::{anyhow, Context, Result};
use std::path::Path;

use partsx::{
    compare_store::{ComparisonStore, StoreOptions},
    config::{load, CompareCommand, Command, Config},
    debug,
    device::{self, DeviceClassifier, DeviceProfile, HeadlessProbe},
    pdf::{normalize_pdf_filename, PdfBlob, PdfOptions},
    platform::{self, HeadlessHost},
    print::{self, ShareOutcome},
    storage::SqliteStorage,
    types::{CompareItem, ItemId, PrintRequest},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (safe to ignore if not found)
    let _ = dotenvy::dotenv();

    let (cfg, command) = load().context("Failed to load configuration")?;
    platform::init_logging(cfg.log_level);
    if let Some(list) = &cfg.debug {
        debug::set_from_list(list);
    } else {
        debug::init_once();
    }
    if log::log_enabled!(log::Level::Debug) {
        cfg.print_summary();
    }

    match command {
        Command::Compare { favorites, action } => run_compare(&cfg, favorites, action),
        Command::Device {
            user_agent,
            platform,
            touch_points,
            no_print,
        } => run_device(user_agent, platform, touch_points, no_print),
        Command::PdfOptions { filename } => run_pdf_options(&cfg, filename),
        Command::Deliver { file, filename } => run_deliver(&cfg, &file, filename).await,
    }
}

fn run_compare(cfg: &Config, favorites: bool, action: CompareCommand) -> Result<()> {
    let storage = SqliteStorage::open(&cfg.store_path)?;
    let options = if favorites {
        StoreOptions::favorites()
    } else {
        cfg.store_options()
    };
    let store: ComparisonStore<CompareItem, _> = ComparisonStore::with_options(storage, options);

    match action {
        CompareCommand::List => {}
        CompareCommand::Add { json } => {
            let item: CompareItem =
                serde_json::from_str(&json).context("Item must be a JSON object with an id")?;
            let id = item.id.clone();
            if !store.add_item(item) {
                let reason = if store.is_in_comparison(&id) {
                    "already in the list".to_string()
                } else {
                    format!("list is full ({} of {})", store.len(), store.capacity())
                };
                return Err(anyhow!("{id} not added: {reason}"));
            }
        }
        CompareCommand::Remove { id } => store.remove_item(&ItemId::new(id)),
        CompareCommand::Has { id } => {
            println!("{}", store.is_in_comparison(&ItemId::new(id)));
            return Ok(());
        }
        CompareCommand::Clear => store.clear_all(),
    }

    let items = store.get_items();
    println!("{}", serde_json::to_string_pretty(&items)?);
    eprintln!("{} of {} slots used", items.len(), store.capacity());
    Ok(())
}

fn run_device(
    user_agent: Option<String>,
    platform: Option<String>,
    touch_points: Option<u32>,
    no_print: bool,
) -> Result<()> {
    let profile = if user_agent.is_none() && platform.is_none() && touch_points.is_none() {
        // No signals given: describe this process.
        DeviceClassifier::new(HeadlessProbe).profile()
    } else {
        let class = device::classify(user_agent.as_deref(), platform.as_deref(), touch_points);
        DeviceProfile::new(class, !no_print)
    };
    println!("{}", serde_json::to_string_pretty(&profile)?);
    Ok(())
}

fn run_pdf_options(cfg: &Config, filename: String) -> Result<()> {
    let request = PrintRequest::new(filename)
        .page_size(cfg.page_size)
        .orientation(cfg.orientation);
    let opts = PdfOptions::for_request(&request, cfg.margin_mm);
    println!("{}", serde_json::to_string_pretty(&opts.to_json())?);
    Ok(())
}

async fn run_deliver(cfg: &Config, file: &Path, filename: Option<String>) -> Result<()> {
    let bytes =
        std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let name = filename
        .or_else(|| file.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_default();
    let blob = PdfBlob::new(normalize_pdf_filename(&name), bytes);

    let host = HeadlessHost::with_download_dir(&cfg.download_dir);
    match print::deliver(&host, &blob).await? {
        ShareOutcome::Downloaded => {
            println!("{}", cfg.download_dir.join(&blob.filename).display())
        }
        ShareOutcome::Shared => println!("shared {}", blob.filename),
    }
    Ok(())
}
