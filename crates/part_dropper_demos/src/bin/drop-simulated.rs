use part_dropper::prelude::*;
use part_dropper_demos::{init_logging, prepare, run_session, DemoConfig};

fn main() -> anyhow::Result<()> {
    init_logging();
    let config = DemoConfig::from_args("drop.ron")?;

    let mut spawned = 0u32;
    let sink = FnSink::new(|event| match event {
        DropEvent::PartSpawned { .. } => spawned += 1,
        DropEvent::PartPolled {
            index,
            displacement,
            settled: true,
            ..
        } => log::debug!("part {index} settled after moving {displacement:.3}"),
        DropEvent::Warning { context, message } => log::warn!("{context}: {message}"),
        _ => {}
    });

    let mut dropper = PartDropper::try_new(config.drop.clone())?.with_event_sink(sink);
    prepare(&mut dropper, &config)?;
    let part_count = run_session(&mut dropper, &config)?;
    drop(dropper);

    log::info!("Session finished with {part_count} parts ({spawned} spawn events).");
    Ok(())
}
