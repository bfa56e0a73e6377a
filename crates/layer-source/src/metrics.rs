//! Counters for source refresh activity and OGC traffic.

use metrics::counter;

pub fn record_stale_check(source_id: &str) {
    counter!("wms_source_stale_checks_total", "source" => source_id.to_string()).increment(1);
}

/// A near-real-time source was refreshed on its interval.
pub fn record_refresh(source_id: &str) {
    counter!("wms_source_refresh_total", "source" => source_id.to_string()).increment(1);
}

/// A tile URL template had to be rebuilt.
pub fn record_refetch(source_id: &str) {
    counter!("wms_source_refetch_total", "source" => source_id.to_string()).increment(1);
}

pub fn record_ogc_request(operation: &'static str) {
    counter!("ogc_requests_total", "operation" => operation).increment(1);
}

pub fn record_ogc_error(operation: &'static str) {
    counter!("ogc_request_errors_total", "operation" => operation).increment(1);
}
