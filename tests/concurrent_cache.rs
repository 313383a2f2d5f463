mod common;

use common::{Fixture, RawRecord};
use lcindex::siblings::cache::SiblingCache;
use lcindex::siblings::SiblingPair;
use lcindex::{build, IndexConfig, LightcurveFile};

#[test]
fn test_concurrent_stores_lose_nothing() {
    let fixture = Fixture::from_text("");
    let config = IndexConfig::default();
    let threads = 8u64;
    let per_thread = 10u64;

    std::thread::scope(|s| {
        for t in 0..threads {
            let config = &config;
            let raw = &fixture.raw;
            s.spawn(move || {
                let cache = SiblingCache::for_raw_file(config, raw);
                for i in 0..per_thread {
                    let a = (t * per_thread + i) * 2;
                    cache.store(SiblingPair::new(a, a + 1, 0.5)).unwrap();
                }
            });
        }
    });

    let mut pairs = SiblingCache::for_raw_file(&config, &fixture.raw)
        .pairs()
        .unwrap();
    assert_eq!(pairs.len() as u64, threads * per_thread);
    // rows are in append order; every offset must appear exactly once
    pairs.sort_by_key(|p| p.offset_a);
    assert!(pairs.windows(2).all(|w| w[0].offset_a < w[1].offset_a));
    assert!(pairs.iter().all(|p| p.offset_b == p.offset_a + 1));
}

#[test]
fn test_concurrent_locate_sibling() {
    // 20 well separated g/r pairs on one sensor channel
    let records: Vec<RawRecord> = (0..20u64)
        .flat_map(|i| {
            let ra = 10.0 + i as f64 * 0.01;
            [
                RawRecord::new(1000 + i, 1, 5, ra, -20.0, 3),
                RawRecord::new(2000 + i, 2, 5, ra + 0.5 / 3600.0, -20.0, 3),
            ]
        })
        .collect();
    let fixture = Fixture::new(&records);
    build(&fixture.raw, &IndexConfig::default()).unwrap();

    let files: Vec<LightcurveFile> = (0..4)
        .map(|_| LightcurveFile::open(&fixture.raw, IndexConfig::default()).unwrap())
        .collect();

    std::thread::scope(|s| {
        for (rank, file) in files.iter().enumerate() {
            s.spawn(move || {
                for record in file.records_for_rank(rank, 4).unwrap() {
                    assert!(file.locate_sibling(record).unwrap().is_some());
                }
            });
        }
    });

    let cache = files[0].sibling_cache();
    assert_eq!(cache.pairs().unwrap().len(), 20);
    for record in files[0].records() {
        let sibling = files[0].sibling_record(record).unwrap().unwrap();
        assert_eq!(sibling.object_id % 1000, record.object_id % 1000);
    }
}

#[test]
fn test_concurrent_claims_on_one_offset() {
    let fixture = Fixture::from_text("");
    let config = IndexConfig::default();

    // every thread pairs a different offset with offset 0
    let kept: Vec<SiblingPair> = std::thread::scope(|s| {
        let handles: Vec<_> = (1..=8u64)
            .map(|t| {
                let config = &config;
                let raw = &fixture.raw;
                s.spawn(move || {
                    SiblingCache::for_raw_file(config, raw)
                        .store(SiblingPair::new(0, t, 0.5))
                        .unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let pairs = SiblingCache::for_raw_file(&config, &fixture.raw)
        .pairs()
        .unwrap();
    assert_eq!(pairs.len(), 1);
    assert!(kept.iter().all(|p| *p == pairs[0]));
}
