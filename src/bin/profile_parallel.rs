#![allow(dead_code, unused_imports)]

use pool_ecs::{Query, World, WorldConfig};
use std::time::Instant;

#[derive(Debug, Clone)]
struct Position(f32, f32, f32);

#[derive(Debug, Clone)]
struct Velocity(f32, f32, f32);

#[derive(Debug, Clone)]
struct Frozen;

#[cfg(feature = "profiling")]
fn populate(world: &mut World, count: usize) -> pool_ecs::Result<()> {
    let _span = tracing::info_span!("populate", count = count).entered();
    for i in 0..count {
        let entity = world.spawn()?;
        world.add_component(entity, Position(i as f32, 0.0, 0.0))?;
        world.add_component(entity, Velocity(1.0, 0.5, 0.0))?;
        if i % 10 == 0 {
            world.add_component(entity, Frozen)?;
        }
    }
    Ok(())
}

#[cfg(feature = "profiling")]
fn main() -> pool_ecs::Result<()> {
    let _guard = pool_ecs::profiling::init_file_tracing("trace.log")?;

    let mut world = World::with_config(WorldConfig {
        worker_threads: Some(4),
        ..WorldConfig::default()
    })?;
    populate(&mut world, 100_000)?;

    let query = Query::builder(&mut world)
        .with::<Position>()
        .with::<Velocity>()
        .without::<Frozen>()
        .build()?;

    println!("Profiling run_parallel over 100k entities...");
    let start = Instant::now();
    for _ in 0..100 {
        query.run_parallel(&mut world, 4_096, 0, |it| {
            while it.advance().is_some() {
                if let Some((pos, vel)) = it.get_pair_mut::<Position, Velocity>() {
                    pos.0 += vel.0;
                    pos.1 += vel.1;
                    pos.2 += vel.2;
                }
            }
            Ok(())
        })?;
    }
    println!("100 dispatches complete in: {:?}", start.elapsed());
    Ok(())
}

#[cfg(not(feature = "profiling"))]
fn main() {
    println!("profile_parallel binary requires --features profiling");
}
