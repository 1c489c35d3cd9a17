//! Fixed-rate tick loop and the optional render-rate sampling loop.
//!
//! The tick thread owns the simulation. It publishes a frame and a camera
//! target after every tick through [`SynchronizedStorage`]; the render thread
//! promotes the pending values once per frame and interpolates entity
//! positions between ticks.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use anyhow::{anyhow, Context, Result};
use glam::DVec2;
use log::{debug, info, trace};
use tilemotion_core::{EntitySnapshot, SynchronizedStorage, Vector};
use tilemotion_world::query;

use crate::simulation::Simulation;

/// Cells visible on either side of the camera target at zoom 1.
const HALF_VIEW_CELLS: DVec2 = DVec2::new(8.0, 6.0);

/// Timing for a run.
#[derive(Clone, Copy, Debug)]
pub(crate) struct RunConfig {
    /// Ticks to simulate.
    pub(crate) ticks: u64,
    /// Simulated duration of a tick.
    pub(crate) tick: Duration,
    /// Interval between render samples.
    pub(crate) render: Duration,
    /// Paces ticks against the wall clock and runs the render loop.
    pub(crate) realtime: bool,
}

/// Where the render loop looks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct CameraState {
    /// World position at the centre of the view.
    pub(crate) target: DVec2,
    /// Magnification; 2.0 shows half as many cells.
    pub(crate) zoom: f64,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            target: DVec2::ZERO,
            zoom: 1.0,
        }
    }
}

impl CameraState {
    /// World-space rectangle covered by the camera.
    #[must_use]
    pub(crate) fn viewport(&self) -> Viewport {
        let half = HALF_VIEW_CELLS / self.zoom.max(f64::EPSILON);
        Viewport {
            min: self.target - half,
            max: self.target + half,
        }
    }
}

/// Axis-aligned world-space rectangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Viewport {
    /// Lower corner.
    pub(crate) min: DVec2,
    /// Upper corner.
    pub(crate) max: DVec2,
}

impl Viewport {
    /// Whether the point lies inside the rectangle, edges included.
    #[must_use]
    pub(crate) fn contains(&self, point: DVec2) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }
}

/// Entity state published by the tick loop after each tick.
#[derive(Clone, Debug)]
struct Frame {
    tick: u64,
    entities: Vec<EntitySnapshot>,
    published: Instant,
}

impl Frame {
    fn capture(simulation: &Simulation) -> Self {
        Self {
            tick: query::tick_index(simulation.world()),
            entities: query::entity_view(simulation.world()).into_vec(),
            published: Instant::now(),
        }
    }
}

/// Runs the simulation for the configured number of ticks and hands it back.
pub(crate) fn run(simulation: Simulation, config: RunConfig) -> Result<Simulation> {
    let camera = Arc::new(SynchronizedStorage::new(CameraState::default()));
    let frames = Arc::new(SynchronizedStorage::new(Frame::capture(&simulation)));
    let shutdown = Arc::new(AtomicBool::new(false));

    let render = if config.realtime {
        let camera = Arc::clone(&camera);
        let frames = Arc::clone(&frames);
        let shutdown = Arc::clone(&shutdown);
        Some(
            thread::Builder::new()
                .name("render".to_string())
                .spawn(move || render_loop(&camera, &frames, &shutdown, config))
                .context("failed to spawn render thread")?,
        )
    } else {
        None
    };

    let tick = {
        let camera = Arc::clone(&camera);
        let frames = Arc::clone(&frames);
        let shutdown = Arc::clone(&shutdown);
        thread::Builder::new()
            .name("tick".to_string())
            .spawn(move || {
                let simulation = tick_loop(simulation, &camera, &frames, config);
                shutdown.store(true, Ordering::Release);
                simulation
            })
            .context("failed to spawn tick thread")?
    };

    let joined = tick.join();
    shutdown.store(true, Ordering::Release);
    if let Some(render) = render {
        let rendered = render
            .join()
            .map_err(|_| anyhow!("render thread panicked"))?;
        info!("rendered {rendered} frames");
    }
    joined.map_err(|_| anyhow!("tick thread panicked"))
}

fn tick_loop(
    mut simulation: Simulation,
    camera: &SynchronizedStorage<CameraState>,
    frames: &SynchronizedStorage<Frame>,
    config: RunConfig,
) -> Simulation {
    let started = Instant::now();

    for index in 0..config.ticks {
        let events = simulation.step(config.tick);
        trace!("tick {index} produced {} events", events.len());

        let frame = Frame::capture(&simulation);
        if let Some(player) = query::player(simulation.world()) {
            let mut state = camera.pending();
            state.target = to_dvec(player.position);
            camera.set(state);
        }
        frames.set(frame);

        if config.realtime {
            let deadline = started + config.tick.saturating_mul(saturating_u32(index + 1));
            let now = Instant::now();
            if deadline > now {
                thread::sleep(deadline - now);
            }
        }
    }

    debug!("tick loop finished after {:?}", started.elapsed());
    simulation
}

fn render_loop(
    camera: &SynchronizedStorage<CameraState>,
    frames: &SynchronizedStorage<Frame>,
    shutdown: &AtomicBool,
    config: RunConfig,
) -> u64 {
    let mut rendered = 0_u64;

    while !shutdown.load(Ordering::Acquire) {
        camera.apply_pending();
        frames.apply_pending();
        let view = camera.get();
        let frame = frames.get();

        let delta = interpolation_delta(frame.published.elapsed(), config.tick);
        let viewport = view.viewport();
        let visible = frame
            .entities
            .iter()
            .map(|entity| to_dvec(entity.interpolated_position(delta)))
            .filter(|position| viewport.contains(*position))
            .count();
        trace!(
            "frame {rendered}: tick {} delta {delta:.2}, {visible} of {} entities in view around {}",
            frame.tick,
            frame.entities.len(),
            view.target
        );

        rendered = rendered.saturating_add(1);
        thread::sleep(config.render);
    }

    rendered
}

/// Fraction of a tick elapsed since the latest frame, clamped to `[0, 1]`.
fn interpolation_delta(elapsed: Duration, tick: Duration) -> f64 {
    if tick.is_zero() {
        return 0.0;
    }
    (elapsed.as_secs_f64() / tick.as_secs_f64()).clamp(0.0, 1.0)
}

fn to_dvec(vector: Vector) -> DVec2 {
    DVec2::new(vector.x, vector.y)
}

fn saturating_u32(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
