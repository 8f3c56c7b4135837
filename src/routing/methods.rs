//! The single method table shared by validation and route registration.

use axum::routing::MethodFilter;

/// Every method an endpoint may declare, keyed by canonical name.
pub const METHOD_TABLE: [(&str, MethodFilter); 7] = [
    ("GET", MethodFilter::GET),
    ("PUT", MethodFilter::PUT),
    ("POST", MethodFilter::POST),
    ("DELETE", MethodFilter::DELETE),
    ("OPTIONS", MethodFilter::OPTIONS),
    ("PATCH", MethodFilter::PATCH),
    ("HEAD", MethodFilter::HEAD),
];

/// Look up the dispatch filter for a method name, ignoring case.
pub fn method_filter(name: &str) -> Option<MethodFilter> {
    METHOD_TABLE
        .iter()
        .find(|(canonical, _)| canonical.eq_ignore_ascii_case(name))
        .map(|(_, filter)| *filter)
}

pub fn is_supported_method(name: &str) -> bool {
    method_filter(name).is_some()
}
