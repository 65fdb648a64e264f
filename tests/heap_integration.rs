//! Record-manager integration tests: many records, mixed mutations,
//! reopen, and a randomized stress pass.

use std::collections::HashMap;

use minirel::heap::{HeapManager, Rid};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::tempdir;

#[test]
fn test_interleaved_insert_delete_update() {
    let dir = tempdir().unwrap();
    let mgr = HeapManager::new(dir.path());
    mgr.create_file("rel", 16, 2).unwrap();
    let file = mgr.open_file("rel").unwrap();

    let mut live: HashMap<Rid, (Vec<u8>, Vec<bool>)> = HashMap::new();
    for i in 0..50u8 {
        let data = vec![i; 16];
        let is_null = vec![i % 2 == 0, i % 3 == 0];
        let rid = file.insert(&data, &is_null).unwrap();
        live.insert(rid, (data, is_null));
    }

    // Delete every fifth record.
    let doomed: Vec<Rid> = live.keys().copied().filter(|r| r.slot % 5 == 0).collect();
    for rid in doomed {
        file.delete(rid).unwrap();
        live.remove(&rid);
    }

    // Rewrite the rest in place.
    for (rid, (data, is_null)) in live.iter_mut() {
        data.reverse();
        is_null.swap(0, 1);
        let mut rec = file.record(*rid).unwrap();
        rec.data = data.clone();
        rec.is_null = is_null.clone();
        file.update(&rec).unwrap();
    }

    let mut scan = file.scan(None);
    let mut seen = 0;
    while let Some(rec) = scan.next_record().unwrap() {
        let (data, is_null) = &live[&rec.rid];
        assert_eq!(&rec.data, data);
        assert_eq!(&rec.is_null, is_null);
        seen += 1;
    }
    assert_eq!(seen, live.len());
}

#[test]
fn test_records_survive_reopen() {
    let dir = tempdir().unwrap();
    let mgr = HeapManager::new(dir.path());
    mgr.create_file("rel", 8, 1).unwrap();

    let mut expected = HashMap::new();
    {
        let file = mgr.open_file("rel").unwrap();
        for i in 0..200u8 {
            let data = vec![i; 8];
            let rid = file.insert(&data, &[i % 4 == 0]).unwrap();
            expected.insert(rid, data);
        }
    }

    let file = mgr.open_file("rel").unwrap();
    let mut scan = file.scan(None);
    let mut seen = 0;
    while let Some(rec) = scan.next_record().unwrap() {
        assert_eq!(rec.data, expected[&rec.rid]);
        seen += 1;
    }
    assert_eq!(seen, expected.len());
}

#[test]
fn test_randomized_stress() {
    let dir = tempdir().unwrap();
    let mgr = HeapManager::new(dir.path());
    mgr.create_file("rel", 32, 3).unwrap();
    let file = mgr.open_file("rel").unwrap();

    let mut rng = StdRng::seed_from_u64(42);
    let mut live: HashMap<Rid, (Vec<u8>, Vec<bool>)> = HashMap::new();

    for _ in 0..2000 {
        let roll: u8 = rng.gen_range(0..10);
        if roll < 6 || live.is_empty() {
            let data: Vec<u8> = (0..32).map(|_| rng.gen()).collect();
            let is_null: Vec<bool> = (0..3).map(|_| rng.gen()).collect();
            let rid = file.insert(&data, &is_null).unwrap();
            assert!(live.insert(rid, (data, is_null)).is_none());
        } else if roll < 8 {
            let rid = *live.keys().nth(rng.gen_range(0..live.len())).unwrap();
            file.delete(rid).unwrap();
            live.remove(&rid);
        } else {
            let rid = *live.keys().nth(rng.gen_range(0..live.len())).unwrap();
            let data: Vec<u8> = (0..32).map(|_| rng.gen()).collect();
            let is_null: Vec<bool> = (0..3).map(|_| rng.gen()).collect();
            let mut rec = file.record(rid).unwrap();
            rec.data = data.clone();
            rec.is_null = is_null.clone();
            file.update(&rec).unwrap();
            live.insert(rid, (data, is_null));
        }
    }

    let mut scan = file.scan(None);
    let mut seen = 0;
    while let Some(rec) = scan.next_record().unwrap() {
        let (data, is_null) = &live[&rec.rid];
        assert_eq!(&rec.data, data);
        assert_eq!(&rec.is_null, is_null);
        seen += 1;
    }
    assert_eq!(seen, live.len());
}
