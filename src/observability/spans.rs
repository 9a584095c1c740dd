//! Structured span definitions for tracing.

use std::time::Instant;

use tracing::{Level, Span, field, span};

/// Span for an inbound HTTP request, tagged with a fresh request id.
pub fn request_span(method: &str, path: &str) -> Span {
    let request_id = uuid::Uuid::new_v4();
    span!(
        Level::INFO,
        "http.request",
        request_id = %request_id,
        method = method,
        path = path,
    )
}

/// Helper for tracking one extractor call within a span.
pub struct ExtractionSpan {
    span: Span,
    start: Instant,
}

impl ExtractionSpan {
    pub fn new(provider: &'static str, model: &str) -> Self {
        let span = span!(
            Level::INFO,
            "extractor.call",
            provider = provider,
            model = model,
            input_chars = field::Empty,
            triples = field::Empty,
            kept = field::Empty,
            latency_ms = field::Empty,
        );
        Self {
            span,
            start: Instant::now(),
        }
    }

    pub fn record_input(&self, text: &str) {
        self.span.record("input_chars", text.chars().count() as u64);
    }

    /// `parsed` is what the model returned, `kept` what survived cleaning.
    pub fn record_triples(&self, parsed: usize, kept: usize) {
        self.span.record("triples", parsed as u64);
        self.span.record("kept", kept as u64);
    }

    pub fn finish(self) {
        let latency_ms = self.start.elapsed().as_millis() as u64;
        self.span.record("latency_ms", latency_ms);
        self.span.in_scope(|| tracing::info!(latency_ms, "extraction finished"));
    }

    pub fn span(&self) -> &Span {
        &self.span
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_span() {
        let span = ExtractionSpan::new("ollama", "llama3.1");
        span.record_input("Rust was created at Mozilla.");
        span.record_triples(14, 12);
        span.finish();
    }

    #[test]
    fn test_request_span() {
        let span = request_span("POST", "/analyze");
        let _guard = span.enter();
    }
}
