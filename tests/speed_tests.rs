// Throughput math, including the host/peripheral perspective swap

use rm01_share::models::ByteCounters;
use rm01_share::speed::peripheral_rates;

fn counters(received: u64, transmitted: u64) -> ByteCounters {
    ByteCounters {
        received,
        transmitted,
    }
}

#[test]
fn host_rx_maps_to_peripheral_upload() {
    // Host received 500 bytes in one second; nothing was transmitted. From
    // the RM-01's perspective that is 500 B/s of upload and zero download.
    let sample = peripheral_rates(counters(1000, 500), counters(1500, 500), 1.0);
    assert_eq!(sample.upload_bytes_per_sec, 500.0);
    assert_eq!(sample.download_bytes_per_sec, 0.0);
}

#[test]
fn host_tx_maps_to_peripheral_download() {
    let sample = peripheral_rates(counters(0, 1000), counters(0, 3000), 2.0);
    assert_eq!(sample.upload_bytes_per_sec, 0.0);
    assert_eq!(sample.download_bytes_per_sec, 1000.0);
}

#[test]
fn counter_decrease_yields_zero_not_negative() {
    let sample = peripheral_rates(counters(1000, 800), counters(200, 100), 1.0);
    assert_eq!(sample.upload_bytes_per_sec, 0.0);
    assert_eq!(sample.download_bytes_per_sec, 0.0);
}

#[test]
fn zero_or_negative_elapsed_yields_zero_rates() {
    let sample = peripheral_rates(counters(0, 0), counters(1000, 1000), 0.0);
    assert_eq!(sample.upload_bytes_per_sec, 0.0);
    assert_eq!(sample.download_bytes_per_sec, 0.0);
}

#[test]
fn fractional_intervals_scale_rates() {
    let sample = peripheral_rates(counters(0, 0), counters(250, 500), 0.5);
    assert_eq!(sample.upload_bytes_per_sec, 500.0);
    assert_eq!(sample.download_bytes_per_sec, 1000.0);
}
