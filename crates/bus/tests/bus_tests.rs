//! Integration tests for SurfaceBus and SurfaceDispatcher

use autocoder_bus::{EventKind, SurfaceBus, SurfaceDispatcher, SurfaceEvent};
use std::sync::{Arc, Mutex};

#[tokio::test]
async fn test_events_arrive_in_order() {
    let (bus, mut rx) = SurfaceBus::channel();

    bus.line("=== MODEL RESPONSE ===");
    bus.file_upsert("app.py", "print('hi')");
    bus.finished("completed", 1);

    match rx.recv().await.unwrap() {
        SurfaceEvent::Line { text, .. } => assert_eq!(text, "=== MODEL RESPONSE ==="),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(
        rx.recv().await.unwrap(),
        SurfaceEvent::file_upsert("app.py", "print('hi')")
    );
    assert_eq!(
        rx.recv().await.unwrap(),
        SurfaceEvent::finished("completed", 1)
    );
}

#[tokio::test]
async fn test_cloned_bus_shares_surface() {
    let (bus, mut rx) = SurfaceBus::channel();
    let clone = bus.clone();

    bus.line("one");
    clone.line("two");

    let mut texts = Vec::new();
    for _ in 0..2 {
        if let Some(SurfaceEvent::Line { text, .. }) = rx.recv().await {
            texts.push(text);
        }
    }
    assert_eq!(texts, vec!["one", "two"]);
}

#[tokio::test]
async fn test_dispatcher_routes_by_kind() {
    let (bus, rx) = SurfaceBus::channel();
    let lines = Arc::new(Mutex::new(Vec::new()));
    let files = Arc::new(Mutex::new(Vec::new()));

    let mut dispatcher = SurfaceDispatcher::new(rx);
    let lines_for_handler = Arc::clone(&lines);
    dispatcher.on(EventKind::Line, move |event| {
        if let SurfaceEvent::Line { text, .. } = event {
            lines_for_handler.lock().unwrap().push(text);
        }
    });
    let files_for_handler = Arc::clone(&files);
    dispatcher.on(EventKind::FileUpsert, move |event| {
        if let SurfaceEvent::FileUpsert { path, .. } = event {
            files_for_handler.lock().unwrap().push(path);
        }
    });

    let handle = tokio::spawn(dispatcher.run());

    bus.line("first");
    bus.file_upsert("a/b.txt", "x");
    bus.finished("completed", 1); // no handler registered, ignored
    bus.line("second");
    drop(bus);

    handle.await.unwrap();

    assert_eq!(*lines.lock().unwrap(), vec!["first", "second"]);
    assert_eq!(*files.lock().unwrap(), vec!["a/b.txt"]);
}

#[tokio::test]
async fn test_dispatcher_handler_overwrite() {
    let (bus, rx) = SurfaceBus::channel();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let mut dispatcher = SurfaceDispatcher::new(rx);
    dispatcher.on(EventKind::Line, |_| panic!("replaced handler must not run"));
    let seen_for_handler = Arc::clone(&seen);
    dispatcher.on(EventKind::Line, move |_| {
        seen_for_handler.lock().unwrap().push(());
    });

    let handle = tokio::spawn(dispatcher.run());
    bus.line("x");
    drop(bus);
    handle.await.unwrap();

    assert_eq!(seen.lock().unwrap().len(), 1);
}
