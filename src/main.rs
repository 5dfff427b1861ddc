use anyhow::{bail, Context};
use periodic_nav::{init_tracing, DocumentSource, NavigatorSettings, PeriodView, VaultSource};
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let Some(vault_dir) = args.next() else {
        bail!("usage: periodic-nav <vault-dir> [settings-file]");
    };
    let settings_path = args.next().map(PathBuf::from);

    let log_dir = std::env::var_os("PERIODIC_NAV_LOG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("periodic-nav"));
    init_tracing(&log_dir).context("failed to initialise logging")?;

    let settings = match settings_path {
        Some(path) => NavigatorSettings::load(&path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => NavigatorSettings::default(),
    };

    let mut source = VaultSource::new(&vault_dir);
    let documents = source.load()?;
    let today = chrono::Local::now().date_naive();
    tracing::info!(vault = %vault_dir, today = %today, "building navigator");

    let mut view = PeriodView::new(settings, documents, today)?;
    let columns = view.columns();
    println!("{}", serde_json::to_string_pretty(&columns)?);
    Ok(())
}
