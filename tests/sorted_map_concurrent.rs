use lexmap::{Direction, SortedMap};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use test_log::test;

const THREADS: u64 = 4;
const ITEM_COUNT: u64 = 2_000;

fn key(thread: u64, x: u64) -> [u8; 16] {
    let mut buf = [0; 16];
    buf[..8].copy_from_slice(&thread.to_be_bytes());
    buf[8..].copy_from_slice(&x.to_be_bytes());
    buf
}

#[test]
fn sorted_map_concurrent_writers() -> lexmap::Result<()> {
    let map = SortedMap::new();

    let writers = (0..THREADS)
        .map(|thread| {
            let map = map.clone();

            std::thread::spawn(move || -> lexmap::Result<()> {
                for x in 0..ITEM_COUNT {
                    map.put(key(thread, x), "v")?;
                }
                for x in (0..ITEM_COUNT).filter(|x| x % 2 == 0) {
                    map.remove(key(thread, x))?;
                }
                Ok(())
            })
        })
        .collect::<Vec<_>>();

    for writer in writers {
        writer.join().expect("writer should not panic")?;
    }

    assert_eq!(THREADS * ITEM_COUNT / 2, map.len());
    assert_eq!(THREADS * ITEM_COUNT / 2, map.iter_all().count() as u64);

    Ok(())
}

#[test]
fn sorted_map_iterate_while_writing() -> lexmap::Result<()> {
    let map = SortedMap::new();
    let done = Arc::new(AtomicBool::default());

    for x in 0..ITEM_COUNT {
        map.put(key(0, x), "v")?;
    }

    let writer = {
        let map = map.clone();
        let done = done.clone();

        std::thread::spawn(move || -> lexmap::Result<()> {
            let mut round = 0;

            while !done.load(Ordering::Relaxed) {
                for x in (round % 3..ITEM_COUNT).step_by(3) {
                    map.remove(key(0, x))?;
                }
                for x in (round % 3..ITEM_COUNT).step_by(3) {
                    map.put(key(0, x), "w")?;
                }
                round += 1;
            }

            Ok(())
        })
    };

    for direction in [Direction::Forward, Direction::Backward].into_iter().cycle().take(20) {
        let keys = map
            .iter(None, direction, 0, usize::MAX)
            .map(|(k, _)| k)
            .collect::<Vec<_>>();

        // Keys are never yielded twice and stay in order
        for pair in keys.windows(2) {
            match direction {
                Direction::Forward => assert!(pair[0] < pair[1]),
                Direction::Backward => assert!(pair[0] > pair[1]),
            }
        }
        assert!(keys.len() as u64 <= ITEM_COUNT);
    }

    done.store(true, Ordering::Relaxed);
    writer.join().expect("writer should not panic")?;

    assert_eq!(ITEM_COUNT, map.len());

    Ok(())
}

#[test]
fn sorted_map_concurrent_readers() -> lexmap::Result<()> {
    let map = SortedMap::new();
    for x in 0..ITEM_COUNT {
        map.put(key(0, x), x.to_string())?;
    }

    let readers = (0..THREADS)
        .map(|_| {
            let map = map.clone();

            std::thread::spawn(move || -> lexmap::Result<()> {
                for x in 0..ITEM_COUNT {
                    assert_eq!(Some(x.to_string().into()), map.get(key(0, x))?);
                }
                Ok(())
            })
        })
        .collect::<Vec<_>>();

    for reader in readers {
        reader.join().expect("reader should not panic")?;
    }

    Ok(())
}
