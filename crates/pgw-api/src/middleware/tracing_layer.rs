//! # Request/Response Tracing
//!
//! Configures `tower_http::trace::TraceLayer` so every request, admitted or
//! rejected, gets a span with method, URI, and status code.

/// Build the `TraceLayer` wrapped around the whole service.
pub fn layer() -> tower_http::trace::TraceLayer<
    tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>,
> {
    tower_http::trace::TraceLayer::new_for_http()
}
