//! Offline render of the demo skirmish to PNG, flat and isometric.
//!
//! Run: cargo run --bin render-board -- [seed] [out-dir]

use std::path::PathBuf;

use hexview::ViewConfig;
use hexview_core::{Phase, Point, VisualSettings};
use hexview_demos::skirmish;
use hexview_render::Pixmap;
use hexview_render::canvas::pixmap_to_rgba;

fn render(seed: u64, isometric: bool, out: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = ViewConfig {
        settings: VisualSettings {
            isometric,
            ..VisualSettings::default()
        },
        ..ViewConfig::default()
    };
    let mut view = skirmish(seed, Phase::Firing, config)?;
    let rect = view.geometry().board_rect(view.board(), isometric);
    view.set_view_size(Point::new(rect.width(), rect.height()));
    view.scroll_to(rect.min);

    let mut frame = Pixmap::new(rect.width().max(1) as u32, rect.height().max(1) as u32)
        .ok_or("board too large to render")?;
    let report = view.paint(&mut frame)?;
    pixmap_to_rgba(&frame).save(out)?;
    println!(
        "{}: {} tiles, {} sprites",
        out.display(),
        report.tiles_drawn,
        report.sprites_drawn
    );
    Ok(())
}

fn main() {
    let mut args = std::env::args().skip(1);
    let seed = args.next().and_then(|s| s.parse().ok()).unwrap_or(7);
    let dir = PathBuf::from(args.next().unwrap_or_else(|| ".".into()));

    for (isometric, name) in [(false, "board.png"), (true, "board_iso.png")] {
        if let Err(e) = render(seed, isometric, &dir.join(name)) {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
