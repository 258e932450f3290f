use std::process::ExitCode;

use capsule_octree::SessionConfig;
use capsule_sim::{demo_session, Walker};
use nalgebra::{Point3, Vector3};

const TICKS: u32 = 240;
const DT: f32 = 1.0 / 60.0;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => {
            log::info!("loading config from {path}");
            SessionConfig::load(path)?
        }
        None => SessionConfig::default(),
    };

    let mut session = demo_session(config)?;
    session.spawn_character(Point3::new(0.0, 3.0, 2.0));
    let reader = session.reader();

    // Walk toward the wall, dropping onto the floor on the way.
    let mut walker = Walker::new(Vector3::new(2.5, 0.0, 0.0), -9.8);
    for tick in 0..TICKS {
        let outcome = walker.step(&mut session, DT)?;
        if tick % 30 == 0 || outcome.exhausted {
            let snapshot = reader.snapshot();
            log::info!(
                "tick {:>3}: foot ({:.3}, {:.3}, {:.3}) grounded={} candidates={} contact={:?}",
                snapshot.tick,
                snapshot.capsule.start.x,
                snapshot.capsule.start.y - snapshot.capsule.radius,
                snapshot.capsule.start.z,
                snapshot.grounded,
                outcome.candidates,
                snapshot.contact.map(|c| c.normal)
            );
        }
    }

    let capsule = session.capsule();
    log::info!(
        "final segment ({:.3}, {:.3}, {:.3}) -> ({:.3}, {:.3}, {:.3})",
        capsule.start.x,
        capsule.start.y,
        capsule.start.z,
        capsule.end.x,
        capsule.end.y,
        capsule.end.z
    );
    Ok(())
}
