use parking_lot::Mutex;
use pool_ecs::{EcsError, EntityId, Query, Result, World, WorldConfig};
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Velocity {
    x: f32,
    y: f32,
}

#[derive(Debug, Clone, Copy)]
struct Frozen;

#[derive(Debug, Clone, Copy)]
struct Marker;

fn world_with_workers(threads: usize) -> World {
    World::with_config(WorldConfig {
        worker_threads: Some(threads),
        ..WorldConfig::default()
    })
    .unwrap()
}

/// Chunk bounds and the positions visited in each chunk
type ChunkLog = Mutex<Vec<((usize, usize), Vec<usize>)>>;

fn record_chunks(query: &Query, world: &mut World, chunk_size: usize) -> Result<ChunkLog> {
    let log: ChunkLog = Mutex::new(Vec::new());
    query.run_parallel(world, chunk_size, 0, |it| {
        let bounds = it.bounds();
        let mut positions = Vec::new();
        while it.advance().is_some() {
            positions.extend((*it).position());
        }
        log.lock().push((bounds, positions));
        Ok(())
    })?;
    Ok(log)
}

#[test]
fn test_parallel_query_basic() -> Result<()> {
    let mut world = world_with_workers(4);

    for i in 0..5000 {
        let e = world.spawn()?;
        world.add_component(e, Position { x: i as f32, y: 0.0 })?;
        world.add_component(e, Velocity { x: 1.0, y: 1.0 })?;
    }
    for i in 0..5000 {
        let e = world.spawn()?;
        world.add_component(e, Position { x: i as f32, y: 100.0 })?;
        world.add_component(e, Velocity { x: 2.0, y: 2.0 })?;
    }

    let query = Query::builder(&mut world)
        .with::<Position>()
        .with::<Velocity>()
        .build()?;

    query.run_parallel(&mut world, 256, 0, |it| {
        while it.advance().is_some() {
            if let Some((pos, vel)) = it.get_pair_mut::<Position, Velocity>() {
                pos.x += vel.x;
                pos.y += vel.y;
            }
        }
        Ok(())
    })?;

    let mut count = 0;
    let mut it = query.iter(&mut world)?;
    while it.advance().is_some() {
        let pos = it.get::<Position>().copied();
        match pos {
            Some(pos) if pos.y < 50.0 => assert_eq!(pos.y, 1.0),
            Some(pos) => assert_eq!(pos.y, 102.0),
            None => panic!("matched entity without Position"),
        }
        count += 1;
    }
    assert_eq!(count, 10000);
    Ok(())
}

#[test]
fn test_scenario_chunks_of_four_over_ten() -> Result<()> {
    let mut world = world_with_workers(4);
    for i in 0..10 {
        let e = world.spawn()?;
        world.add_component(e, Position { x: i as f32, y: 0.0 })?;
    }
    let query = Query::builder(&mut world).with::<Position>().build()?;

    let mut log = record_chunks(&query, &mut world, 4)?.into_inner();
    log.sort_by_key(|(bounds, _)| std::cmp::Reverse(bounds.1));

    let bounds: Vec<_> = log.iter().map(|(bounds, _)| *bounds).collect();
    assert_eq!(bounds, vec![(6, 10), (2, 6), (0, 2)]);

    let mut visited: Vec<usize> = log.into_iter().flat_map(|(_, p)| p).collect();
    visited.sort_unstable();
    assert_eq!(visited, (0..10).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn test_scenario_single_match_in_single_chunk() -> Result<()> {
    let mut world = world_with_workers(2);
    let mut entities = Vec::new();
    for i in 0..3 {
        let e = world.spawn()?;
        world.add_component(e, Position { x: i as f32, y: 0.0 })?;
        entities.push(e);
    }
    world.add_component(entities[0], Marker)?;
    world.add_component(entities[2], Marker)?;

    let query = Query::builder(&mut world)
        .with::<Position>()
        .without::<Marker>()
        .build()?;

    let calls = AtomicUsize::new(0);
    let seen: Mutex<Vec<EntityId>> = Mutex::new(Vec::new());
    query.run_parallel(&mut world, 3, 0, |it| {
        calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(it.bounds(), (0, 3));
        seen.lock().extend(it.by_ref());
        Ok(())
    })?;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(seen.into_inner(), vec![entities[1]]);
    Ok(())
}

#[test]
fn test_scenario_excluded_entity_skipped() -> Result<()> {
    let mut world = world_with_workers(2);
    let moving = world.spawn()?;
    world.add_component(moving, Position { x: 0.0, y: 0.0 })?;
    world.add_component(moving, Velocity { x: 1.0, y: 0.0 })?;
    let frozen = world.spawn()?;
    world.add_component(frozen, Position { x: 0.0, y: 0.0 })?;
    world.add_component(frozen, Velocity { x: 1.0, y: 0.0 })?;
    world.add_component(frozen, Frozen)?;

    let query = Query::builder(&mut world)
        .with::<Position>()
        .with::<Velocity>()
        .without::<Frozen>()
        .build()?;

    query.run_parallel(&mut world, 1, 0, |it| {
        while it.advance().is_some() {
            if let Some((pos, vel)) = it.get_pair_mut::<Position, Velocity>() {
                pos.x += vel.x;
            }
        }
        Ok(())
    })?;

    assert_eq!(world.get::<Position>(moving).map(|p| p.x), Some(1.0));
    assert_eq!(world.get::<Position>(frozen).map(|p| p.x), Some(0.0));
    Ok(())
}

#[test]
fn test_scenario_single_worker_runs_chunks_sequentially() -> Result<()> {
    let mut world = world_with_workers(4);
    for i in 0..9 {
        let e = world.spawn()?;
        world.add_component(e, Position { x: i as f32, y: 0.0 })?;
    }
    let query = Query::builder(&mut world).with::<Position>().build()?;

    let active = AtomicUsize::new(0);
    let peak = AtomicUsize::new(0);
    let completed = AtomicUsize::new(0);
    query.run_parallel(&mut world, 3, 1, |it| {
        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        assert_eq!(it.worker_id(), 0);
        std::thread::sleep(Duration::from_millis(5));
        while it.advance().is_some() {}
        active.fetch_sub(1, Ordering::SeqCst);
        completed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })?;

    assert_eq!(peak.load(Ordering::SeqCst), 1);
    assert_eq!(completed.load(Ordering::SeqCst), 3);
    Ok(())
}

#[test]
fn test_every_match_visited_exactly_once() -> Result<()> {
    let mut world = world_with_workers(4);
    for i in 0..2_000 {
        let e = world.spawn()?;
        world.add_component(e, Position { x: i as f32, y: 0.0 })?;
        if i % 3 != 0 {
            world.add_component(e, Velocity { x: 1.0, y: 0.0 })?;
        }
        if i % 7 == 0 {
            world.add_component(e, Frozen)?;
        }
    }
    let query = Query::builder(&mut world)
        .with::<Position>()
        .with::<Velocity>()
        .without::<Frozen>()
        .build()?;

    let expected: Vec<EntityId> = query.iter(&mut world)?.collect();

    let visits: Mutex<FxHashMap<EntityId, usize>> = Mutex::new(FxHashMap::default());
    let workers = world.workers().worker_count();
    query.run_parallel(&mut world, 37, 0, |it| {
        assert!(it.worker_id() < workers);
        let mut local = Vec::new();
        while let Some(e) = it.advance() {
            local.push(e);
        }
        let mut visits = visits.lock();
        for e in local {
            *visits.entry(e).or_default() += 1;
        }
        Ok(())
    })?;

    let visits = visits.into_inner();
    assert_eq!(visits.len(), expected.len());
    assert!(expected.iter().all(|e| visits.get(e) == Some(&1)));
    Ok(())
}

#[test]
fn test_chunks_disjoint_and_reverse_ordered() -> Result<()> {
    let mut world = world_with_workers(3);
    for i in 0..500 {
        let e = world.spawn()?;
        world.add_component(e, Position { x: i as f32, y: 0.0 })?;
    }
    let query = Query::builder(&mut world).with::<Position>().build()?;

    let mut log = record_chunks(&query, &mut world, 64)?.into_inner();
    log.sort_by_key(|(bounds, _)| bounds.0);

    for pair in log.windows(2) {
        assert_eq!(pair[0].0 .1, pair[1].0 .0, "chunks must tile the domain");
    }
    for ((from, before), positions) in &log {
        assert!(positions.windows(2).all(|w| w[0] > w[1]));
        assert!(positions.iter().all(|p| p >= from && p < before));
    }
    Ok(())
}

#[test]
fn test_failed_chunks_release_guard_and_finish_siblings() -> Result<()> {
    let mut world = world_with_workers(4);
    for i in 0..40 {
        let e = world.spawn()?;
        world.add_component(e, Position { x: i as f32, y: 0.0 })?;
    }
    let query = Query::builder(&mut world).with::<Position>().build()?;
    let before = world.blockers();

    let finished = AtomicUsize::new(0);
    let result = query.run_parallel(&mut world, 10, 0, |it| {
        let (from, _) = it.bounds();
        while it.advance().is_some() {}
        finished.fetch_add(1, Ordering::SeqCst);
        match from {
            0 => panic!("chunk exploded"),
            10 => Err(EcsError::Callback("bad chunk".to_string())),
            _ => Ok(()),
        }
    });

    assert!(matches!(
        result,
        Err(EcsError::ChunkPanicked { .. }) | Err(EcsError::Callback(_))
    ));
    assert_eq!(finished.load(Ordering::SeqCst), 4);
    assert_eq!(world.blockers(), before);

    // Structural changes work again after the failed run
    let e = world.spawn()?;
    world.add_component(e, Position { x: 0.0, y: 0.0 })?;
    Ok(())
}

#[test]
fn test_panic_reports_chunk_bounds() -> Result<()> {
    let mut world = world_with_workers(1);
    for i in 0..4 {
        let e = world.spawn()?;
        world.add_component(e, Position { x: i as f32, y: 0.0 })?;
    }
    let query = Query::builder(&mut world).with::<Position>().build()?;

    let result = query.run_parallel(&mut world, 4, 0, |_| panic!("boom"));
    assert_eq!(
        result,
        Err(EcsError::ChunkPanicked {
            worker: 0,
            from: 0,
            before: 4,
            message: "boom".to_string(),
        })
    );
    assert_eq!(world.blockers(), 0);
    Ok(())
}

#[test]
fn test_empty_domain_never_calls_back() -> Result<()> {
    let mut world = world_with_workers(2);
    let e = world.spawn()?;
    world.add_component(e, Position { x: 0.0, y: 0.0 })?;
    let query = Query::builder(&mut world)
        .with::<Position>()
        .with::<Velocity>()
        .build()?;

    let calls = AtomicUsize::new(0);
    query.run_parallel(&mut world, 8, 0, |_| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })?;
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[test]
fn test_per_worker_scratch_buffers() -> Result<()> {
    let mut world = world_with_workers(4);
    for i in 0..1_000 {
        let e = world.spawn()?;
        world.add_component(e, Position { x: i as f32, y: 0.0 })?;
    }
    let query = Query::builder(&mut world).with::<Position>().build()?;

    let scratch: Vec<Mutex<f32>> = (0..world.workers().worker_count())
        .map(|_| Mutex::new(0.0))
        .collect();
    query.run_parallel(&mut world, 50, 0, |it| {
        let mut sum = 0.0;
        while it.advance().is_some() {
            sum += it.get::<Position>().map_or(0.0, |p| p.x);
        }
        *scratch[it.worker_id()].lock() += sum;
        Ok(())
    })?;

    let total: f32 = scratch.iter().map(|s| *s.lock()).sum();
    assert_eq!(total, (0..1_000).sum::<i32>() as f32);
    Ok(())
}

#[test]
fn test_global_pool_world() -> Result<()> {
    let mut world = World::new();
    for i in 0..100 {
        let e = world.spawn()?;
        world.add_component(e, Velocity { x: i as f32, y: 0.0 })?;
    }
    let query = Query::builder(&mut world).with::<Velocity>().build()?;

    query.run_parallel(&mut world, 16, 64, |it| {
        while it.advance().is_some() {
            if let Some(vel) = it.get_mut::<Velocity>() {
                vel.y = vel.x * 2.0;
            }
        }
        Ok(())
    })?;

    let mut it = query.iter(&mut world)?;
    while it.advance().is_some() {
        let vel = it.get::<Velocity>().copied();
        assert!(vel.is_some_and(|v| v.y == v.x * 2.0));
    }
    Ok(())
}
