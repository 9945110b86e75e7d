use std::time::Duration;

use metrics::{counter, histogram};

/// Metrics recorded around storage and image codec calls.
///
/// Nothing is exported unless the host application installs a recorder.
#[derive(Debug, Clone, Copy, Default)]
pub struct StorageMetrics;

impl StorageMetrics {
    /// Storage operations by `operation` and `status`
    pub const OPERATIONS_TOTAL: &'static str = "walletcare_storage_operations_total";
    /// Storage operation latency by `operation`
    pub const OPERATION_DURATION: &'static str = "walletcare_storage_operation_duration_seconds";
    /// Failed storage operations by `operation`
    pub const ERRORS_TOTAL: &'static str = "walletcare_storage_errors_total";
    /// Codec calls by `direction` and `status`
    pub const CODEC_OPERATIONS_TOTAL: &'static str = "walletcare_codec_operations_total";
    /// Size of the raw image handled by the codec, by `direction`
    pub const CODEC_BYTES: &'static str = "walletcare_codec_bytes";

    /// Record one storage operation
    pub fn record_operation(operation: &'static str, duration: Duration, success: bool) {
        let status = if success { "success" } else { "error" };

        counter!(Self::OPERATIONS_TOTAL, "operation" => operation, "status" => status).increment(1);
        histogram!(Self::OPERATION_DURATION, "operation" => operation).record(duration.as_secs_f64());

        if !success {
            counter!(Self::ERRORS_TOTAL, "operation" => operation).increment(1);
        }
    }

    /// Record one encode or decode call; `bytes` is the raw image size when known
    pub fn record_codec(direction: &'static str, bytes: Option<usize>, success: bool) {
        let status = if success { "success" } else { "error" };

        counter!(Self::CODEC_OPERATIONS_TOTAL, "direction" => direction, "status" => status).increment(1);
        if let Some(bytes) = bytes {
            #[allow(clippy::cast_precision_loss)]
            histogram!(Self::CODEC_BYTES, "direction" => direction).record(bytes as f64);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_without_a_recorder_is_a_no_op() {
        StorageMetrics::record_operation("insert_exam", Duration::from_millis(3), true);
        StorageMetrics::record_operation("insert_exam", Duration::from_millis(3), false);
        StorageMetrics::record_codec("encode", Some(1024), true);
        StorageMetrics::record_codec("decode", None, false);
    }

    #[test]
    fn metric_names_share_a_prefix() {
        for name in [
            StorageMetrics::OPERATIONS_TOTAL,
            StorageMetrics::OPERATION_DURATION,
            StorageMetrics::ERRORS_TOTAL,
            StorageMetrics::CODEC_OPERATIONS_TOTAL,
            StorageMetrics::CODEC_BYTES,
        ] {
            assert!(name.starts_with("walletcare_"));
        }
    }
}
