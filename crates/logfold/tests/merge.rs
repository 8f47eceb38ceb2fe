//! End-to-end merge tests: stdin-shaped input in, merged records out.

use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use logfold::config::MergeConfig;
use logfold::event::{Clock, Event};
use logfold::merge::Merger;

#[derive(Clone, Default)]
struct CaptureSink(Arc<Mutex<Vec<u8>>>);

impl CaptureSink {
    fn contents(&self) -> Vec<u8> {
        self.0.lock().unwrap().clone()
    }
}

impl Write for CaptureSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

struct FixedClock;

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2017, 1, 6, 16, 25, 18).unwrap()
    }
}

async fn merge(input: &str, config: MergeConfig) -> String {
    let sink = CaptureSink::default();
    let event = Event::with_clock(Box::new(sink.clone()), config.event_config(), FixedClock)
        .expect("valid config");
    let mut merger =
        Merger::new(event.clone(), &config).auto_flush_delay(Duration::from_secs(60));
    merger
        .run(Cursor::new(input.as_bytes().to_vec()))
        .await
        .expect("merge run");
    event.close().await;
    String::from_utf8(sink.contents()).expect("utf-8 output")
}

fn ctx(pairs: &[(&str, &str)]) -> std::collections::BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

const INPUT: &str = "2017/01/06 16:25:18 some log message\n\
panic: runtime error: invalid memory address or nil pointer dereference\n\
\n\
goroutine 1 [running]:\n\
main.main()\n\
\t/go/src/app/main.go:10 +0x80\n\
2017/01/06 16:25:42 another log message\n";

const PANIC_MERGED: &str = "panic: runtime error: invalid memory address or nil pointer \
dereference\\n\\ngoroutine 1 [running]:\\nmain.main()\\n\\t/go/src/app/main.go:10 +0x80";

const INPUT_MIXED: &str = "2017/01/06 16:25:18 some log message\n\
{\"level\":\"info\",\"msg\":\"hello\"}\n\
2017/01/06 16:25:42 another log message\n";

const INPUT_PREFIX: &str = "app: 2017/01/06 16:25:18 some log message\n\
app: 2017/01/06 16:25:42 another log message\n\
not a header line\n";

#[tokio::test]
async fn default_merges_panic_into_one_record() {
    let out = merge(INPUT, MergeConfig::default()).await;
    assert_eq!(
        out,
        format!(
            "2017/01/06 16:25:18 some log message\n{}\n2017/01/06 16:25:42 another log message\n",
            PANIC_MERGED
        )
    );
}

#[tokio::test]
async fn strip_removes_log_headers() {
    let config = MergeConfig {
        strip: true,
        ..Default::default()
    };
    let out = merge(INPUT, config).await;
    assert_eq!(
        out,
        format!("some log message\n{}\nanother log message\n", PANIC_MERGED)
    );
}

#[tokio::test]
async fn max_len_truncates_each_record() {
    let config = MergeConfig {
        max_len: 15,
        strip: true,
        ..Default::default()
    };
    let out = merge(INPUT, config).await;
    assert_eq!(out, "some log[8]…\npanic:[131]…\nanother[12]…\n");
    for record in out.split_inclusive('\n') {
        assert!(record.len() <= 15, "record too long: {:?}", record);
    }
}

#[tokio::test]
async fn json_output_wraps_records() {
    let config = MergeConfig {
        strip: true,
        json: true,
        ..Default::default()
    };
    let out = merge(INPUT, config).await;
    assert_eq!(
        out,
        format!(
            "{{\"message\":\"some log message\"}}\n{{\"message\":\"{}\"}}\n{{\"message\":\"another log message\"}}\n",
            PANIC_MERGED
        )
    );
}

#[tokio::test]
async fn json_output_respects_max_len() {
    let config = MergeConfig {
        max_len: 26,
        strip: true,
        json: true,
        ..Default::default()
    };
    let out = merge(INPUT, config).await;
    assert_eq!(
        out,
        "{\"message\":\"some[12]…\"}\n{\"message\":\"pan[134]…\"}\n{\"message\":\"anot[15]…\"}\n"
    );
}

#[tokio::test]
async fn json_output_merges_context() {
    let config = MergeConfig {
        strip: true,
        json: true,
        context: ctx(&[("foo", "bar")]),
        ..Default::default()
    };
    let out = merge(INPUT, config).await;
    assert_eq!(
        out,
        format!(
            "{{\"foo\":\"bar\",\"message\":\"some log message\"}}\n{{\"foo\":\"bar\",\"message\":\"{}\"}}\n{{\"foo\":\"bar\",\"message\":\"another log message\"}}\n",
            PANIC_MERGED
        )
    );
}

#[tokio::test]
async fn json_output_adds_timestamp() {
    let config = MergeConfig {
        strip: true,
        json: true,
        add_timestamp: true,
        context: ctx(&[("foo", "bar")]),
        ..Default::default()
    };
    let out = merge(INPUT, config).await;
    assert_eq!(
        out,
        format!(
            "{{\"foo\":\"bar\",\"message\":\"some log message\",\"time\":\"2017-01-06T16:25:18Z\"}}\n\
{{\"foo\":\"bar\",\"message\":\"{}\",\"time\":\"2017-01-06T16:25:18Z\"}}\n\
{{\"foo\":\"bar\",\"message\":\"another log message\",\"time\":\"2017-01-06T16:25:18Z\"}}\n",
            PANIC_MERGED
        )
    );
}

#[tokio::test]
async fn prefix_is_required_before_the_timestamp() {
    let config = MergeConfig {
        prefix: "app: ".to_string(),
        ..Default::default()
    };
    let out = merge(INPUT_PREFIX, config).await;
    // The third line is not a header, so it continues the second event.
    assert_eq!(
        out,
        "app: 2017/01/06 16:25:18 some log message\n\
app: 2017/01/06 16:25:42 another log message\\nnot a header line\n"
    );
}

#[tokio::test]
async fn prefix_and_timestamp_are_stripped_together() {
    let config = MergeConfig {
        prefix: "app: ".to_string(),
        strip: true,
        ..Default::default()
    };
    let out = merge(INPUT_PREFIX, config).await;
    assert_eq!(
        out,
        "some log message\nanother log message\\nnot a header line\n"
    );
}

#[tokio::test]
async fn json_passthrough_keeps_objects_intact() {
    let config = MergeConfig {
        strip: true,
        json: true,
        allow_json: true,
        ..Default::default()
    };
    let out = merge(INPUT_MIXED, config).await;
    assert_eq!(
        out,
        "{\"message\":\"some log message\"}\n\
{\"level\":\"info\",\"msg\":\"hello\"}\n\
{\"message\":\"another log message\"}\n"
    );
}

#[tokio::test]
async fn json_input_is_escaped_when_passthrough_is_off() {
    let config = MergeConfig {
        strip: true,
        json: true,
        ..Default::default()
    };
    let out = merge(INPUT_MIXED, config).await;
    // Without pass-through the JSON line is just another continuation.
    assert_eq!(
        out,
        "{\"message\":\"some log message\\n{\\\"level\\\":\\\"info\\\",\\\"msg\\\":\\\"hello\\\"}\"}\n\
{\"message\":\"another log message\"}\n"
    );
}

#[tokio::test]
async fn json_passthrough_merges_context() {
    let config = MergeConfig {
        strip: true,
        json: true,
        allow_json: true,
        context: ctx(&[("foo", "bar")]),
        ..Default::default()
    };
    let out = merge(INPUT_MIXED, config).await;
    assert_eq!(
        out,
        "{\"foo\":\"bar\",\"message\":\"some log message\"}\n\
{\"foo\":\"bar\",\"level\":\"info\",\"msg\":\"hello\"}\n\
{\"foo\":\"bar\",\"message\":\"another log message\"}\n"
    );
}

#[tokio::test]
async fn reader_truncated_lines_are_forced_continuations() {
    // A line longer than the reader cap arrives in chunks; the second
    // chunk looks like a panic header but must not be classified.
    let long_line = format!("{}panic: boom", "b".repeat(4096));
    let input = format!("first\n{}\n", long_line);
    let out = merge(&input, MergeConfig::default()).await;
    assert_eq!(out, format!("first\\n{}\n", long_line));
}
