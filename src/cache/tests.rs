#[cfg(test)]
mod tests {
    use crate::cache::result::ChunkedResult;
    use crate::cache::store::{ChunkLookup, ResultCache};
    use crate::data::types::Measurement;
    use std::time::{Duration, Instant};

    fn rows(n: usize) -> Vec<Measurement> {
        (0..n)
            .map(|i| Measurement {
                latitude: 34.0,
                longitude: -118.0,
                timestamp: format!("2020-08-15T{:02}:00", i % 24),
                parameter: "PM2.5".to_string(),
                value: i as f64,
                unit: "UG/M3".to_string(),
                aqi: 0,
                site_name: String::new(),
                date: "20200815".to_string(),
            })
            .collect()
    }

    fn result(uid: &str, n: usize, chunk_size: usize, ttl: Duration) -> ChunkedResult {
        ChunkedResult::new(
            uid.to_string(),
            rows(n),
            chunk_size,
            ttl,
            vec!["A".to_string()],
        )
    }

    const TTL: Duration = Duration::from_secs(60);

    // ============================================================
    // CHUNK ARITHMETIC
    // ============================================================

    #[test]
    fn test_chunk_count_is_ceiling_division() {
        let r = result("u", 1050, 200, TTL);
        assert_eq!(r.total_chunks, 6);
        assert_eq!(r.total_records(), 1050);

        assert_eq!(r.chunk(0).unwrap().rows.len(), 200);
        assert_eq!(r.chunk(4).unwrap().rows.len(), 200);
        let last = r.chunk(5).unwrap();
        assert_eq!(last.rows.len(), 50);
        assert!(last.is_last);
        assert!(!r.chunk(0).unwrap().is_last);
    }

    #[test]
    fn test_exact_multiple_has_no_ragged_chunk() {
        let r = result("u", 400, 200, TTL);
        assert_eq!(r.total_chunks, 2);
        assert_eq!(r.chunk(1).unwrap().rows.len(), 200);
    }

    #[test]
    fn test_empty_result_has_one_empty_last_chunk() {
        let r = result("u", 0, 200, TTL);
        assert_eq!(r.total_chunks, 1);
        assert_eq!(r.total_records(), 0);

        let only = r.chunk(0).unwrap();
        assert!(only.rows.is_empty());
        assert!(only.is_last);
    }

    #[test]
    fn test_chunk_index_out_of_range() {
        let r = result("u", 10, 200, TTL);
        assert!(r.chunk(1).is_none());
    }

    #[test]
    fn test_zero_chunk_size_clamped() {
        let r = result("u", 10, 0, TTL);
        assert_eq!(r.chunk_size, 1);
        assert_eq!(r.total_chunks, 10);
    }

    // ============================================================
    // CACHE LOOKUPS
    // ============================================================

    #[test]
    fn test_put_then_lookup_hit() {
        let cache = ResultCache::new(TTL);
        cache.put(result("uid-1", 5, 200, TTL));

        match cache.lookup_chunk("uid-1", 0) {
            ChunkLookup::Hit(r) => assert_eq!(r.total_records(), 5),
            _ => panic!("expected hit"),
        }
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_unknown_uid() {
        let cache = ResultCache::new(TTL);
        assert!(matches!(
            cache.lookup_chunk("never-seen", 0),
            ChunkLookup::Unknown
        ));
    }

    #[test]
    fn test_out_of_range_index_on_live_uid() {
        let cache = ResultCache::new(TTL);
        cache.put(result("uid-1", 5, 200, TTL));
        assert!(matches!(
            cache.lookup_chunk("uid-1", 7),
            ChunkLookup::OutOfRange(_)
        ));
    }

    #[test]
    fn test_repeated_chunk_fetch_is_identical() {
        let cache = ResultCache::new(TTL);
        cache.put(result("uid-1", 42, 10, TTL));

        let first = match cache.lookup_chunk("uid-1", 2) {
            ChunkLookup::Hit(r) => serde_json::to_string(r.chunk(2).unwrap().rows).unwrap(),
            _ => panic!("expected hit"),
        };
        let second = match cache.lookup_chunk("uid-1", 2) {
            ChunkLookup::Hit(r) => serde_json::to_string(r.chunk(2).unwrap().rows).unwrap(),
            _ => panic!("expected hit"),
        };
        assert_eq!(first, second);
    }

    // ============================================================
    // TTL AND EVICTION
    // ============================================================

    #[test]
    fn test_expired_entry_reports_uid_expired() {
        let short = Duration::from_millis(20);
        let cache = ResultCache::new(short);
        cache.put(result("uid-1", 5, 200, short));

        std::thread::sleep(Duration::from_millis(40));

        // The evictor has not run; the lookup itself must notice expiry.
        assert!(matches!(
            cache.lookup_chunk("uid-1", 0),
            ChunkLookup::Expired
        ));
        assert!(cache.get("uid-1").is_none());
    }

    #[test]
    fn test_evict_expired_unlinks_and_leaves_tombstone() {
        let short = Duration::from_millis(20);
        let cache = ResultCache::new(short);
        cache.put(result("old", 5, 200, short));
        cache.put(result("fresh", 5, 200, Duration::from_secs(60)));

        std::thread::sleep(Duration::from_millis(40));
        let evicted = cache.evict_expired();

        assert_eq!(evicted, 1);
        assert_eq!(cache.len(), 1);
        assert!(matches!(cache.lookup_chunk("old", 0), ChunkLookup::Expired));
        assert!(matches!(
            cache.lookup_chunk("fresh", 0),
            ChunkLookup::Hit(_)
        ));
    }

    #[test]
    fn test_reader_survives_concurrent_eviction() {
        let short = Duration::from_millis(20);
        let cache = ResultCache::new(short);
        cache.put(result("uid-1", 30, 10, short));

        let held = match cache.lookup_chunk("uid-1", 1) {
            ChunkLookup::Hit(r) => r,
            _ => panic!("expected hit"),
        };

        std::thread::sleep(Duration::from_millis(40));
        cache.evict_expired();

        // The unlinked entry stays readable through the held handle.
        assert_eq!(held.chunk(1).unwrap().rows.len(), 10);
    }

    #[test]
    fn test_fresh_entry_not_evicted() {
        let cache = ResultCache::new(TTL);
        cache.put(result("uid-1", 5, 200, TTL));
        assert_eq!(cache.evict_expired(), 0);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_is_expired_boundary() {
        let r = result("u", 1, 200, Duration::from_secs(60));
        assert!(!r.is_expired(Instant::now()));
        assert!(r.is_expired(Instant::now() + Duration::from_secs(61)));
    }
}
