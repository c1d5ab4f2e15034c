use std::io;
use std::time::Duration;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use room_listbox::logging::{LogEvent, LogSink};
use room_listbox::{
    AnsiSurface, HitTarget, HostEvent, ListboxConfig, ListboxRuntime, Logger, LoggingResult,
    MemorySurface, OptionDecl, PageResources, Rect, Result, RuntimeConfig,
};

#[derive(Clone, Default)]
struct NullSink;

impl LogSink for NullSink {
    fn log(&self, _event: &LogEvent) -> LoggingResult<()> {
        Ok(())
    }
}

fn options(count: usize) -> Vec<OptionDecl> {
    (0..count)
        .map(|idx| OptionDecl::with_value(format!("Option {idx}"), format!("opt-{idx}")))
        .collect()
}

fn key(code: KeyCode) -> HostEvent {
    HostEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
}

fn keyboard_script(options: usize) -> Vec<HostEvent> {
    let mut events = Vec::new();
    for round in 0..8 {
        events.push(HostEvent::PointerDown(HitTarget::Toggle));
        for _ in 0..(round % options) {
            events.push(key(KeyCode::Down));
        }
        events.push(key(KeyCode::Up));
        events.push(key(KeyCode::Char(' ')));
    }
    events
}

fn config() -> RuntimeConfig {
    let mut config = RuntimeConfig {
        logger: Some(Logger::new(NullSink)),
        metrics_interval: Duration::from_millis(0),
        ..RuntimeConfig::default()
    };
    config.enable_metrics();
    config
}

fn build_memory_runtime(count: usize) -> Result<ListboxRuntime> {
    ListboxRuntime::mount(
        config(),
        &ListboxConfig::new().with_placeholder("Choose one"),
        options(count),
        Box::new(MemorySurface::new()),
        &PageResources::new(),
        None,
    )
}

fn build_ansi_runtime(count: usize) -> Result<ListboxRuntime> {
    let surface = AnsiSurface::new(io::sink(), Rect::new(0, 0, 32, count as u16 + 1));
    let layout = surface.layout();
    Ok(ListboxRuntime::mount(
        config(),
        &ListboxConfig::new(),
        options(count),
        Box::new(surface),
        &PageResources::new(),
        None,
    )?
    .with_layout(layout))
}

fn runtime_memory_script(c: &mut Criterion) {
    let script = keyboard_script(12);
    c.bench_function("runtime_memory_script", |b| {
        b.iter(|| {
            let mut runtime = build_memory_runtime(12).expect("runtime");
            runtime
                .run_scripted(black_box(script.clone()))
                .expect("scripted run");
        });
    });
}

fn runtime_ansi_script(c: &mut Criterion) {
    let script = keyboard_script(12);
    c.bench_function("runtime_ansi_script", |b| {
        b.iter(|| {
            let mut runtime = build_ansi_runtime(12).expect("runtime");
            runtime
                .run_scripted(black_box(script.clone()))
                .expect("scripted run");
        });
    });
}

criterion_group!(benches, runtime_memory_script, runtime_ansi_script);
criterion_main!(benches);
