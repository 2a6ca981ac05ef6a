//! Interactive render engine for the Mandelbrot set.
//!
//! A [Renderer] owns one viewport per numeric backend and a band scheduler that fills a shared
//! [FrameBuffer]. Shells feed it view changes (pan, zoom, resize, backend switches); each change
//! cancels the frame in flight and, if a render was requested, starts a fresh one.
//!
//! Rendering occurs in these steps:
//! -   Snapshot the active backend's viewport into a row source for the current size and depth.
//! -   Split the frame into one band of rows per thread.
//! -   Each band computes escape counts a row at a time, colors them through the palette,
//!     and stores them into the frame; band listeners hear about each band as it finishes.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use mandel_core::Size;

pub mod backend;
mod error;
pub mod frame;
pub mod latch;
pub mod palette;
pub mod scheduler;

pub use error::{Error, Result};
pub use frame::FrameBuffer;
pub use palette::Palette;
pub use scheduler::{BandEvent, BandListener, BandOutcome};

use backend::Plane;
use latch::Completion;
use scheduler::{Job, TileScheduler};

/// Zoom factor for one notch of the wheel towards the user.
pub const ZOOM_FACTOR_IN: f64 = 0.8;
/// Zoom factor for one notch of the wheel away from the user.
pub const ZOOM_FACTOR_OUT: f64 = 1.2;
/// Wheel delta reported for one notch.
pub const WHEEL_DELTA: i32 = 120;

/// Converts a mouse-wheel delta into a zoom factor: each notch scales by
/// [ZOOM_FACTOR_IN] (positive delta) or [ZOOM_FACTOR_OUT] (negative delta).
pub fn wheel_zoom_factor(delta: i32) -> f64 {
    let notches = f64::from(delta) / f64::from(WHEEL_DELTA);
    if delta > 0 {
        ZOOM_FACTOR_IN.powf(notches)
    } else if delta < 0 {
        ZOOM_FACTOR_OUT.powf(-notches)
    } else {
        1.0
    }
}

/// The view every backend starts from, and returns to on reset.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct InitialView {
    pub x_origin: f64,
    pub y_origin: f64,
    pub x_extent: f64,
}

impl Default for InitialView {
    fn default() -> Self {
        InitialView {
            x_origin: -2.0,
            y_origin: -1.2,
            x_extent: 3.0,
        }
    }
}

/// Construction parameters for a [Renderer].
#[derive(Clone, Debug)]
pub struct RendererConfig {
    pub size: Size,
    pub palette: Palette,
    pub initial: InitialView,
    /// Index into [backend::formats].
    pub backend: usize,
}

impl Default for RendererConfig {
    fn default() -> Self {
        RendererConfig {
            size: Size::new(800, 600),
            palette: Palette::default(),
            initial: InitialView::default(),
            backend: 0,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct RenderSettings {
    max_iterations: usize,
    threads: usize,
}

pub struct Renderer {
    planes: Vec<Box<dyn Plane>>,
    active: usize,
    initial: InitialView,
    frame: Arc<FrameBuffer>,
    palette: Arc<Palette>,
    scheduler: TileScheduler,
    /// Set by the first `render` call; later view changes re-render with it.
    settings: Option<RenderSettings>,
    listener: Option<BandListener>,
    zoom_level: f64,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Result<Self> {
        if config.size.pixels() == 0 {
            return Err(Error::InvalidArgument(format!(
                "cannot render a {}x{} frame",
                config.size.width, config.size.height
            )));
        }
        let mut planes = backend::create_all();
        if config.backend >= planes.len() {
            return Err(Error::InvalidArgument(format!(
                "backend {} is not registered",
                config.backend
            )));
        }
        let InitialView {
            x_origin,
            y_origin,
            x_extent,
        } = config.initial;
        for plane in planes.iter_mut() {
            plane.set_view(x_origin, y_origin, x_extent)?;
        }
        Ok(Renderer {
            planes,
            active: config.backend,
            initial: config.initial,
            frame: Arc::new(FrameBuffer::new(config.size)),
            palette: Arc::new(config.palette),
            scheduler: TileScheduler::new(),
            settings: None,
            listener: None,
            zoom_level: 1.0,
        })
    }

    /// Names of the available backends, in index order.
    pub fn backends(&self) -> Vec<&'static str> {
        backend::formats().collect()
    }

    pub fn active_backend(&self) -> &'static str {
        backend::formats().nth(self.active).unwrap_or("unknown")
    }

    /// Switches backends. Each backend keeps its own view; the zoom level restarts at 1.
    pub fn set_backend(&mut self, index: usize) -> Result<()> {
        if index >= self.planes.len() {
            return Err(Error::InvalidArgument(format!(
                "backend {} is not registered",
                index
            )));
        }
        self.scheduler.terminate();
        self.active = index;
        self.zoom_level = 1.0;
        tracing::info!("switched to backend {}", self.active_backend());
        self.restart()
    }

    pub fn set_backend_by_name(&mut self, name: &str) -> Result<()> {
        let index = backend::index_of(name)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown numeric format {}", name)))?;
        self.set_backend(index)
    }

    /// Replaces the view that [Renderer::reset_viewport] returns to, and moves every backend to it.
    pub fn set_initial_viewport(&mut self, x_origin: f64, y_origin: f64, x_extent: f64) -> Result<()> {
        // Fresh planes, so a view one backend can't hold leaves every backend untouched.
        let mut planes = backend::create_all();
        for plane in planes.iter_mut() {
            plane.set_view(x_origin, y_origin, x_extent)?;
        }
        self.scheduler.terminate();
        self.planes = planes;
        self.initial = InitialView {
            x_origin,
            y_origin,
            x_extent,
        };
        self.zoom_level = 1.0;
        self.restart()
    }

    /// Returns the active backend to the initial view.
    pub fn reset_viewport(&mut self) -> Result<()> {
        self.scheduler.terminate();
        let InitialView {
            x_origin,
            y_origin,
            x_extent,
        } = self.initial;
        self.planes[self.active].set_view(x_origin, y_origin, x_extent)?;
        self.zoom_level = 1.0;
        self.restart()
    }

    /// Sets the active backend's view from typed-in coordinates.
    /// Returns false, leaving the view unchanged, if any of them fails to parse.
    pub fn try_set_viewport(&mut self, x_origin: &str, y_origin: &str, x_extent: &str) -> bool {
        self.scheduler.terminate();
        let applied = self.planes[self.active].parse_view(x_origin, y_origin, x_extent);
        if let Err(err) = &applied {
            tracing::warn!("rejected viewport ({}, {}, {}): {}", x_origin, y_origin, x_extent, err);
        } else {
            self.zoom_level = 1.0;
        }
        if let Err(err) = self.restart() {
            tracing::error!("failed to restart rendering: {}", err);
        }
        applied.is_ok()
    }

    /// Receives a notification as each band of each frame finishes.
    pub fn on_band_complete(&mut self, listener: impl Fn(&BandEvent) + Send + Sync + 'static) {
        self.listener = Some(Arc::new(listener));
    }

    /// Starts rendering the current view, replacing any frame in progress.
    /// Later view changes re-render with the same depth and thread count.
    pub fn render(&mut self, max_iterations: usize, threads: usize) -> Result<()> {
        if max_iterations == 0 {
            return Err(Error::InvalidArgument(
                "must iterate at least once".to_string(),
            ));
        }
        if threads == 0 {
            return Err(Error::InvalidArgument("must provide >=1 thread".to_string()));
        }
        let settings = RenderSettings {
            max_iterations,
            threads,
        };
        self.settings = Some(settings);
        self.launch(settings)
    }

    fn launch(&mut self, settings: RenderSettings) -> Result<()> {
        let size = self.frame.size();
        tracing::info!(
            "starting render with format {} at {}x{}, {} iterations on {} threads",
            self.active_backend(),
            size.width,
            size.height,
            settings.max_iterations,
            settings.threads
        );
        let source = self.planes[self.active].prepare(size, settings.max_iterations)?;

        // Report the end of the job once every band has.
        let bands = settings.threads;
        let finished = Arc::new(AtomicUsize::new(0));
        let user = self.listener.clone();
        let backend_name = self.active_backend();
        let listener: BandListener = Arc::new(move |event: &BandEvent| {
            if let Some(user) = &user {
                user(event);
            }
            let done = finished.fetch_add(1, Ordering::AcqRel) + 1;
            if done == bands {
                tracing::info!("finished render with format {}", backend_name);
            }
        });

        self.scheduler.start(Job {
            source,
            frame: self.frame.clone(),
            palette: self.palette.clone(),
            threads: settings.threads,
            listener: Some(listener),
        })
    }

    /// Re-renders with the last requested settings, if there are any.
    fn restart(&mut self) -> Result<()> {
        match self.settings {
            Some(settings) => self.launch(settings),
            None => Ok(()),
        }
    }

    /// Drags the view by `(dx, dy)` pixels.
    pub fn pan(&mut self, dx: i32, dy: i32) -> Result<()> {
        self.scheduler.terminate();
        let size = self.frame.size();
        self.planes[self.active].pan(dx, dy, size)?;
        self.restart()
    }

    /// Zooms by `factor` around pixel `(px, py)`; factors below one zoom in.
    pub fn zoom_at(&mut self, px: i32, py: i32, factor: f64) -> Result<()> {
        self.scheduler.terminate();
        let size = self.frame.size();
        self.planes[self.active].zoom(px, py, factor, size)?;
        self.zoom_level /= factor;
        self.restart()
    }

    /// Zooms for a mouse-wheel movement; see [wheel_zoom_factor].
    pub fn zoom_wheel(&mut self, px: i32, py: i32, delta: i32) -> Result<()> {
        self.zoom_at(px, py, wheel_zoom_factor(delta))
    }

    /// Replaces the frame with a blank one of the new size.
    /// Dimensions below one pixel are raised to one.
    pub fn resize(&mut self, width: usize, height: usize) -> Result<()> {
        self.scheduler.terminate();
        let size = Size::new(width.max(1), height.max(1));
        if size != self.frame.size() {
            self.frame = Arc::new(FrameBuffer::new(size));
        }
        self.restart()
    }

    /// The plane coordinate under a pixel, in the active backend's precision.
    pub fn coordinate_at(&self, px: usize, py: usize) -> Result<String> {
        self.planes[self.active].coordinate_at(px, py, self.frame.size())
    }

    /// Status line for the pixel under the cursor.
    pub fn status_at(&self, px: usize, py: usize) -> Result<String> {
        Ok(format!(
            "Zoom:{:.2}x || Current Coordinates:{}",
            self.zoom_level,
            self.coordinate_at(px, py)?
        ))
    }

    /// Magnification relative to the last reset or backend switch.
    pub fn zoom_level(&self) -> f64 {
        self.zoom_level
    }

    /// The frame being rendered into. Replaced on resize.
    pub fn frame(&self) -> Arc<FrameBuffer> {
        self.frame.clone()
    }

    pub fn size(&self) -> Size {
        self.frame.size()
    }

    /// Blocks until the current frame is finished.
    pub fn wait(&mut self) {
        self.scheduler.wait();
    }

    /// Cancels the current frame and waits for its workers to exit.
    pub fn terminate(&mut self) {
        self.scheduler.terminate();
    }

    /// Resolves when the current frame is finished.
    pub fn completion(&self) -> Completion {
        self.scheduler.completion()
    }

    pub fn is_rendering(&self) -> bool {
        self.scheduler.is_running()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frame::OPAQUE_BLACK;
    use std::sync::Mutex;

    fn renderer() -> Renderer {
        Renderer::new(RendererConfig::default()).unwrap()
    }

    #[test]
    fn default_view_fixture() {
        let mut r = renderer();
        r.render(100, 4).unwrap();
        r.wait();
        let frame = r.frame();
        let palette = Palette::default();
        // Top-left corner, (-2, -1.2), leaves the disc on the first step.
        assert_eq!(frame.pixel(0, 0), Some(palette.pixel(Some(1), 10)));
        // Near the plane's origin: inside the set.
        assert_eq!(frame.pixel(533, 320), Some(OPAQUE_BLACK));
        // Right edge, x close to 1: escapes quickly.
        assert_eq!(frame.pixel(799, 320), Some(palette.pixel(Some(3), 10)));
        assert!(frame.snapshot().iter().all(|p| p >> 24 == 0xFF));
    }

    #[test]
    fn configuration_is_validated() {
        let zero = RendererConfig {
            size: Size::new(0, 10),
            ..RendererConfig::default()
        };
        assert!(Renderer::new(zero).is_err());
        let unknown = RendererConfig {
            backend: 99,
            ..RendererConfig::default()
        };
        assert!(Renderer::new(unknown).is_err());

        let mut r = renderer();
        assert!(r.render(0, 4).is_err());
        assert!(r.render(10, 0).is_err());
        assert!(r.set_backend(99).is_err());
        assert!(r.set_backend_by_name("f16").is_err());
    }

    #[test]
    fn backends_switch_by_name() {
        let mut r = renderer();
        assert_eq!(r.active_backend(), "f64");
        assert_eq!(r.backends().len(), 7);
        r.set_backend_by_name("decimal128").unwrap();
        assert_eq!(r.active_backend(), "decimal128");
        assert_eq!(r.coordinate_at(0, 0).unwrap(), "-2, -1.2");
    }

    #[test]
    fn each_backend_keeps_its_view() {
        let mut r = renderer();
        r.pan(400, 0).unwrap();
        assert_eq!(r.coordinate_at(0, 0).unwrap(), "-3.5, -1.2");
        r.set_backend(5).unwrap();
        assert_eq!(r.coordinate_at(0, 0).unwrap(), "-2, -1.2");
        r.set_backend(0).unwrap();
        assert_eq!(r.coordinate_at(0, 0).unwrap(), "-3.5, -1.2");
        r.reset_viewport().unwrap();
        assert_eq!(r.coordinate_at(0, 0).unwrap(), "-2, -1.2");
    }

    #[test]
    fn initial_view_applies_to_every_backend() {
        let mut r = renderer();
        r.set_backend_by_name("f32").unwrap();
        r.pan(80, 0).unwrap();
        r.set_backend(0).unwrap();
        r.set_initial_viewport(-1.5, -1.0, 2.0).unwrap();
        for index in 0..r.backends().len() {
            r.set_backend(index).unwrap();
            assert_eq!(r.coordinate_at(0, 0).unwrap(), "-1.5, -1", "{}", r.active_backend());
        }
        r.pan(400, 0).unwrap();
        r.reset_viewport().unwrap();
        assert_eq!(r.coordinate_at(0, 0).unwrap(), "-1.5, -1");
        // f32 can't hold it, so no backend moves.
        assert!(r.set_initial_viewport(1e300, 0.0, 1.0).is_err());
        assert_eq!(r.coordinate_at(0, 0).unwrap(), "-1.5, -1");
    }

    #[test]
    fn zoom_tracks_magnification() {
        let mut r = renderer();
        r.zoom_wheel(400, 300, WHEEL_DELTA).unwrap();
        assert!((r.zoom_level() - 1.25).abs() < 1e-12);
        assert!(r.status_at(0, 0).unwrap().starts_with("Zoom:1.25x || Current Coordinates:"));
        r.zoom_wheel(400, 300, -WHEEL_DELTA).unwrap();
        assert!((r.zoom_level() - 1.25 / 1.2).abs() < 1e-12);
        assert!(r.zoom_at(0, 0, -1.0).is_err());
        r.set_backend(0).unwrap();
        assert_eq!(r.zoom_level(), 1.0);
    }

    #[test]
    fn wheel_factors() {
        assert_eq!(wheel_zoom_factor(0), 1.0);
        assert!((wheel_zoom_factor(120) - 0.8).abs() < 1e-12);
        assert!((wheel_zoom_factor(240) - 0.64).abs() < 1e-12);
        assert!((wheel_zoom_factor(-120) - 1.2).abs() < 1e-12);
    }

    #[test]
    fn rational_zoom_round_trips_exactly() {
        let mut r = renderer();
        r.set_backend_by_name("rational").unwrap();
        let before = r.coordinate_at(17, 29).unwrap();
        r.zoom_at(311, 97, 0.5).unwrap();
        r.zoom_at(311, 97, 2.0).unwrap();
        assert_eq!(r.coordinate_at(17, 29).unwrap(), before);
        assert_eq!(r.zoom_level(), 1.0);
    }

    #[test]
    fn typed_viewports() {
        let mut r = renderer();
        assert!(r.try_set_viewport("-0.75", "0.1", "0.01"));
        assert_eq!(r.coordinate_at(0, 0).unwrap(), "-0.75, 0.1");
        assert!(!r.try_set_viewport("-0.75", "oops", "0.01"));
        assert_eq!(r.coordinate_at(0, 0).unwrap(), "-0.75, 0.1");
    }

    #[test]
    fn view_changes_restart_rendering() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut r = Renderer::new(RendererConfig {
            size: Size::new(40, 30),
            ..RendererConfig::default()
        })
        .unwrap();
        {
            let events = events.clone();
            r.on_band_complete(move |e| events.lock().unwrap().push(e.outcome.clone()));
        }

        // Nothing renders until asked.
        r.pan(3, 3).unwrap();
        r.wait();
        assert!(events.lock().unwrap().is_empty());

        r.render(30, 2).unwrap();
        r.wait();
        assert_eq!(events.lock().unwrap().len(), 2);

        r.pan(-3, -3).unwrap();
        r.wait();
        assert_eq!(events.lock().unwrap().len(), 4);

        r.resize(20, 10).unwrap();
        r.wait();
        assert_eq!(r.size(), Size::new(20, 10));
        assert_eq!(r.frame().snapshot().len(), 200);
        assert_eq!(events.lock().unwrap().len(), 6);
        assert!(events
            .lock()
            .unwrap()
            .iter()
            .all(|o| *o == BandOutcome::Completed));

        r.resize(0, 0).unwrap();
        assert_eq!(r.size(), Size::new(1, 1));
    }

    #[test]
    fn completion_future() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let mut r = renderer();
        r.render(50, 3).unwrap();
        rt.block_on(r.completion());
        assert!(!r.is_rendering());
        r.terminate();
    }
}
