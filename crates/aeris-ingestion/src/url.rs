//! Harmony OGC API Coverages rangeset URL construction.

use aeris_common::BoundingBox;
use chrono::{DateTime, Utc};

pub fn build_tempo_rangeset_url(
    harmony_base_url: &str,
    collection_id: &str,
    variable: &str,
    bbox: BoundingBox,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
) -> String {
    let st = start_time.format("%Y-%m-%dT%H:%M:%S%.3fZ");
    let et = end_time.format("%Y-%m-%dT%H:%M:%S%.3fZ");
    let base = format!(
        "{}/{}/ogc-api-coverages/1.0.0/collections/{}/coverage/rangeset",
        harmony_base_url.trim_end_matches('/'),
        collection_id,
        variable
    );
    format!(
        "{base}?subset=lon({w}:{e})&subset=lat({s}:{n})&subset=time(\"{st}\":\"{et}\")&format=image/tiff",
        w = bbox.west,
        e = bbox.east,
        s = bbox.south,
        n = bbox.north,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn url_contains_subset_and_format() {
        let start = Utc.with_ymd_and_hms(2026, 7, 26, 12, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 7, 26, 13, 0, 0).unwrap();
        let url = build_tempo_rangeset_url(
            "https://harmony.earthdata.nasa.gov",
            "C2930763263-LARC_CLOUD",
            "all",
            BoundingBox::conus(),
            start,
            end,
        );
        assert!(url.contains("subset=lon(-125:-66)"));
        assert!(url.contains("subset=lat(24:50)"));
        assert!(url.contains("format=image/tiff"));
        assert!(url.ends_with("coverage/rangeset?subset=lon(-125:-66)&subset=lat(24:50)&subset=time(\"2026-07-26T12:00:00.000Z\":\"2026-07-26T13:00:00.000Z\")&format=image/tiff"));
    }
}
