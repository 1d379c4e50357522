use std::fs;

use part_dropper::prelude::*;
use part_dropper_demos::{init_logging, prepare, run_session, DemoConfig};

fn main() -> anyhow::Result<()> {
    init_logging();
    let config = DemoConfig::from_args("drop.ron")?;

    let mut dropper = PartDropper::try_new(config.drop.clone())?.with_event_sink(VecSink::new());
    prepare(&mut dropper, &config)?;
    run_session(&mut dropper, &config)?;

    let summary = dropper.try_export_flattened_scene(&config.output)?;
    let layer = dropper
        .scene()
        .and_then(|scene| scene.saved_file(&summary.path))
        .ok_or_else(|| anyhow::anyhow!("export did not persist '{}'", summary.path.display()))?;

    let dump = summary.path.with_extension("ron");
    if let Some(dir) = dump.parent() {
        fs::create_dir_all(dir)?;
    }
    let text = ron::ser::to_string_pretty(layer, ron::ser::PrettyConfig::default())?;
    fs::write(&dump, text)?;

    let events = dropper.event_sink().as_slice();
    let settled = events
        .iter()
        .filter(|e| matches!(e, DropEvent::PartPolled { settled: true, .. }))
        .count();
    log::info!(
        "Flattened {} parts ({} settle polls) into '{}'; layer dumped to '{}'.",
        summary.part_count,
        settled,
        summary.path.display(),
        dump.display()
    );
    Ok(())
}
