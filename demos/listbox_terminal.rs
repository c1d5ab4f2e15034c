//! Interactive listbox in the terminal.
//!
//! Click the toggle or press Space to open the list, use the arrow keys and
//! Space to pick a fruit, Esc to close. Ctrl-C quits. Set
//! `LISTBOX_LOG=/path/to/file` to capture structured JSON logs.

use std::env;
use std::io;
use std::sync::{Arc, Mutex};

use room_listbox::{
    AnsiSurface, CliDriver, FileSink, ListboxConfig, ListboxNotification, ListboxRuntime, Logger,
    NotificationKind, OptionDecl, PageResources, Rect, Result, RuntimeConfig,
};

fn main() -> Result<()> {
    let mut config = RuntimeConfig::default();
    if let Ok(path) = env::var("LISTBOX_LOG") {
        config.logger = Some(Logger::new(FileSink::new(path, 1 << 20)?));
        config.enable_metrics();
    }

    let options = vec![
        OptionDecl::with_value("Apple", "apple"),
        OptionDecl::with_value("Banana", "banana"),
        OptionDecl::with_value("Cherry", "cherry"),
        OptionDecl::new("Dragon fruit"),
        OptionDecl::with_value("Elderberry", "elderberry"),
    ];

    let surface = AnsiSurface::new(io::stdout(), Rect::new(2, 1, 30, 6));
    let layout = surface.layout();
    let page = PageResources::new();
    let mut runtime = ListboxRuntime::mount(
        config,
        &ListboxConfig::new()
            .with_instance("fruit")
            .with_placeholder("Pick a fruit"),
        options,
        Box::new(surface),
        &page,
        None,
    )?
    .with_layout(layout);

    let picked = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&picked);
    runtime
        .controller_mut()
        .subscribe(move |notification: &ListboxNotification| {
            if notification.kind == NotificationKind::Change {
                if let Ok(mut guard) = sink.lock() {
                    guard.push(notification.value.clone());
                }
            }
        });

    let runtime = CliDriver::new(runtime).run()?;
    let last = runtime.controller().value().to_owned();
    runtime.unmount();

    if let Ok(guard) = picked.lock() {
        println!("changes: {}", guard.join(" -> "));
    }
    println!("selected: {last}");
    Ok(())
}
