//! Tests for `src/log/writer.rs`: asynchronous log writer.

use tokio::sync::mpsc;

use owlcore::log::{LogReport, LogWriter, WriterState};

fn start() -> (LogWriter, mpsc::UnboundedReceiver<LogReport>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let writer = LogWriter::start(tx).expect("writer should start");
    (writer, rx)
}

#[test]
fn sequential_writes_land_in_order() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let path = tmp.path().join("alice");
    let (mut writer, _rx) = start();

    writer.submit_write(&path, "first\n");
    writer.submit_write(&path, "second\n");
    writer.shutdown();

    let contents = std::fs::read_to_string(&path).expect("log file should exist");
    assert_eq!(contents, "first\nsecond\n");
}

#[test]
fn shutdown_flushes_every_prior_write() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let (mut writer, mut rx) = start();

    let mut expected = String::new();
    for i in 0..500 {
        let line = format!("line {i}\n");
        writer.submit_write(&tmp.path().join("bulk"), &line);
        writer.submit_write(&tmp.path().join(format!("f{}", i % 7)), &line);
        expected.push_str(&line);
    }
    writer.shutdown();
    assert_eq!(writer.state(), WriterState::Stopped);

    let contents = std::fs::read_to_string(tmp.path().join("bulk")).expect("bulk log exists");
    assert_eq!(contents, expected);
    for f in 0..7 {
        let lines = std::fs::read_to_string(tmp.path().join(format!("f{f}")))
            .expect("per-file log exists");
        assert!(!lines.is_empty());
    }
    assert!(rx.try_recv().is_err(), "no failures expected");
}

#[test]
fn appends_to_existing_content() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let path = tmp.path().join("existing");
    std::fs::write(&path, "old\n").expect("seed file");

    let (mut writer, _rx) = start();
    writer.submit_write(&path, "new");
    writer.shutdown();

    let contents = std::fs::read_to_string(&path).expect("log file should exist");
    assert_eq!(contents, "old\nnew");
}

#[test]
fn open_failure_is_reported_and_later_writes_continue() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let missing = tmp.path().join("no-such-dir").join("alice");
    let good = tmp.path().join("bob");
    let (mut writer, mut rx) = start();

    writer.submit_write(&missing, "lost\n");
    writer.submit_write(&good, "kept\n");
    writer.shutdown();

    let report = rx.try_recv().expect("failure should be reported");
    assert_eq!(report.filename, missing);
    assert!(report.message.contains("unable to open file"));
    assert!(rx.try_recv().is_err());

    assert!(!missing.exists());
    let contents = std::fs::read_to_string(&good).expect("later write should land");
    assert_eq!(contents, "kept\n");
}

#[test]
fn drop_shuts_down_and_flushes() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let path = tmp.path().join("dropped");
    {
        let (writer, _rx) = start();
        writer.submit_write(&path, "flushed on drop\n");
    }
    let contents = std::fs::read_to_string(&path).expect("log file should exist");
    assert_eq!(contents, "flushed on drop\n");
}
