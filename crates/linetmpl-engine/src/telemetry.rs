// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Optional OpenTelemetry instrumentation. Everything here is a no-op unless
//! the `telemetry` feature is compiled in and [`enable`] has been called.
#![cfg_attr(not(feature = "telemetry"), allow(dead_code))]

#[cfg(feature = "telemetry")]
mod otel {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::OnceLock;
    use std::time::Duration;

    use opentelemetry::global;
    use opentelemetry::metrics::{Counter, Histogram};
    use opentelemetry::trace::SpanKind;
    use opentelemetry::{trace::Span as _, trace::Tracer, KeyValue};

    const METER_NAME: &str = "linetmpl_engine";
    const TRACER_NAME: &str = "linetmpl_engine";

    static ENABLED: AtomicBool = AtomicBool::new(false);
    static HANDLES: OnceLock<Handles> = OnceLock::new();

    struct Handles {
        tracer: opentelemetry::global::BoxedTracer,
        parse_hist: Histogram<f64>,
        parse_counter: Counter<u64>,
        export_counter: Counter<u64>,
    }

    impl Handles {
        fn new() -> Self {
            let meter = global::meter(METER_NAME);
            let parse_hist = meter
                .f64_histogram("linetmpl.parse.duration_ms")
                .with_description("Parse duration in milliseconds")
                .init();
            let parse_counter = meter
                .u64_counter("linetmpl.parse.count")
                .with_description("Number of template parses")
                .init();
            let export_counter = meter
                .u64_counter("linetmpl.export.count")
                .with_description("Number of tree exports")
                .init();
            Self {
                tracer: global::tracer(TRACER_NAME),
                parse_hist,
                parse_counter,
                export_counter,
            }
        }
    }

    fn handles() -> &'static Handles {
        HANDLES.get_or_init(Handles::new)
    }

    pub fn enable() {
        ENABLED.store(true, Ordering::Relaxed);
    }

    pub fn disable() {
        ENABLED.store(false, Ordering::Relaxed);
    }

    fn enabled() -> bool {
        ENABLED.load(Ordering::Relaxed)
    }

    pub fn record_parse(template: &str, template_len: usize, duration: Duration, success: bool) {
        if !enabled() {
            return;
        }
        let hs = handles();
        let duration_ms = duration.as_secs_f64() * 1_000.0;
        let attrs = [
            KeyValue::new("template.name", template.to_string()),
            KeyValue::new("template.length", template_len as i64),
            KeyValue::new("parse.success", success),
        ];
        hs.parse_counter.add(1, &attrs);
        hs.parse_hist.record(duration_ms, &attrs);
        let mut span = hs
            .tracer
            .span_builder("Template::parse")
            .with_kind(SpanKind::Internal)
            .start(&hs.tracer);
        span.set_attribute(KeyValue::new("template.name", template.to_string()));
        span.set_attribute(KeyValue::new("parse.duration_ms", duration_ms));
        span.set_attribute(KeyValue::new("parse.success", success));
        span.end();
    }

    pub fn record_export(template: &str, nodes: usize, success: bool) {
        if !enabled() {
            return;
        }
        let attrs = [
            KeyValue::new("template.name", template.to_string()),
            KeyValue::new("tree.nodes", nodes as i64),
            KeyValue::new("export.success", success),
        ];
        handles().export_counter.add(1, &attrs);
    }
}

#[cfg(not(feature = "telemetry"))]
mod otel {
    use std::time::Duration;

    pub fn enable() {}
    pub fn disable() {}
    pub fn record_parse(
        _template: &str,
        _template_len: usize,
        _duration: Duration,
        _success: bool,
    ) {
    }
    pub fn record_export(_template: &str, _nodes: usize, _success: bool) {}
}

pub use otel::{disable, enable, record_export, record_parse};
