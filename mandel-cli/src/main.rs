use std::{
    path::{Path, PathBuf},
    process::ExitCode,
    time::{Duration, Instant},
};

use clap::{Parser, Subcommand};
use mandel_core::{mandelbrot::EscapeVector, Size};
use mandel_render::{
    backend, BandEvent, BandOutcome, FrameBuffer, InitialView, Palette, Renderer, RendererConfig,
};
use tracing_subscriber::EnvFilter;

/// Renders the Mandelbrot set with interchangeable number types.
#[derive(Debug, Parser)]
#[command(name = "mandel", version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Render one frame through the interactive engine and write it as PNG.
    Render(RenderArgs),
    /// Render the same view with several backends and report where they disagree.
    Compare(CompareArgs),
    /// List the available backends.
    List,
}

#[derive(Debug, clap::Args)]
struct RenderArgs {
    /// Backend name, as shown by `list`.
    #[arg(long, default_value = "f64")]
    backend: String,

    #[arg(long, default_value_t = 100)]
    iterations: usize,

    #[arg(long, default_value_t = default_threads())]
    threads: usize,

    #[arg(long, default_value_t = 800)]
    width: usize,

    #[arg(long, default_value_t = 600)]
    height: usize,

    /// Starting view as X0,Y0,EXTENT; parsed by the backend at full precision.
    #[arg(long, value_parser = parse_view, allow_hyphen_values = true)]
    view: Option<View>,

    /// Drag by DX,DY pixels. Repeatable; applied in order, before any zoom.
    #[arg(long = "pan", value_parser = parse_pan, allow_hyphen_values = true)]
    pans: Vec<Pan>,

    /// Zoom by F around pixel PX,PY. Repeatable; applied in order.
    #[arg(long = "zoom", value_parser = parse_zoom, allow_hyphen_values = true)]
    zooms: Vec<Zoom>,

    #[arg(long)]
    out: PathBuf,
}

#[derive(Debug, clap::Args)]
struct CompareArgs {
    /// Backends to render; every backend but `rational` if omitted.
    #[arg(long = "backend")]
    backends: Vec<String>,

    #[arg(long, default_value_t = 100)]
    iterations: usize,

    #[arg(long, default_value_t = 400)]
    width: usize,

    #[arg(long, default_value_t = 300)]
    height: usize,

    #[arg(long, value_parser = parse_view, allow_hyphen_values = true)]
    view: Option<View>,

    #[arg(long)]
    out_dir: PathBuf,
}

#[derive(Clone, Debug, PartialEq)]
struct View {
    x_origin: String,
    y_origin: String,
    x_extent: String,
}

#[derive(Copy, Clone, Debug, PartialEq)]
struct Pan {
    dx: i32,
    dy: i32,
}

#[derive(Copy, Clone, Debug, PartialEq)]
struct Zoom {
    px: i32,
    py: i32,
    factor: f64,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Render(#[from] mandel_render::Error),
    #[error(transparent)]
    Numeric(#[from] mandel_core::Error),
    #[error("backend {backend} rejected the view {view:?}")]
    View { backend: String, view: View },
    #[error("could not write {path}: {source}")]
    Image {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("could not create {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn default_threads() -> usize {
    num_cpus::get()
}

fn split<const N: usize>(text: &str, shape: &str) -> Result<[String; N], String> {
    let parts: Vec<String> = text.split(',').map(|p| p.trim().to_string()).collect();
    parts
        .try_into()
        .map_err(|_| format!("expected {}, got {:?}", shape, text))
}

fn parse_view(text: &str) -> Result<View, String> {
    let [x_origin, y_origin, x_extent] = split(text, "X0,Y0,EXTENT")?;
    Ok(View {
        x_origin,
        y_origin,
        x_extent,
    })
}

fn parse_pan(text: &str) -> Result<Pan, String> {
    let [dx, dy] = split(text, "DX,DY")?;
    let int = |v: &str| v.parse::<i32>().map_err(|e| format!("{:?}: {}", v, e));
    Ok(Pan {
        dx: int(&dx)?,
        dy: int(&dy)?,
    })
}

fn parse_zoom(text: &str) -> Result<Zoom, String> {
    let [px, py, factor] = split(text, "PX,PY,F")?;
    let int = |v: &str| v.parse::<i32>().map_err(|e| format!("{:?}: {}", v, e));
    let factor: f64 = factor
        .parse()
        .map_err(|e| format!("{:?}: {}", factor, e))?;
    if !factor.is_finite() || factor <= 0.0 {
        return Err(format!("zoom factor must be positive, got {}", factor));
    }
    Ok(Zoom {
        px: int(&px)?,
        py: int(&py)?,
        factor,
    })
}

/// A file name for a backend: alphanumerics kept, everything else collapsed to `_`.
fn file_stem(backend: &str) -> String {
    let replaced: String = backend
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    replaced.trim_matches('_').to_string()
}

fn save(frame: &FrameBuffer, path: &Path) -> Result<(), CliError> {
    frame
        .to_image()?
        .save(path)
        .map_err(|source| CliError::Image {
            path: path.to_owned(),
            source,
        })
}

fn render(args: RenderArgs) -> Result<(), CliError> {
    let size = Size::new(args.width, args.height);
    let mut renderer = Renderer::new(RendererConfig {
        size,
        ..RendererConfig::default()
    })?;
    renderer.set_backend_by_name(&args.backend)?;
    renderer.on_band_complete(|event: &BandEvent| match &event.outcome {
        BandOutcome::Failed(err) => {
            tracing::warn!("band {} (rows {:?}) failed: {}", event.band, event.rows, err)
        }
        outcome => tracing::debug!("band {} (rows {:?}): {:?}", event.band, event.rows, outcome),
    });

    if let Some(view) = &args.view {
        if !renderer.try_set_viewport(&view.x_origin, &view.y_origin, &view.x_extent) {
            return Err(CliError::View {
                backend: args.backend,
                view: view.clone(),
            });
        }
    }
    for Pan { dx, dy } in &args.pans {
        renderer.pan(*dx, *dy)?;
    }
    for Zoom { px, py, factor } in &args.zooms {
        renderer.zoom_at(*px, *py, *factor)?;
    }

    let start = Instant::now();
    renderer.render(args.iterations, args.threads)?;
    renderer.wait();
    tracing::info!("rendered in {:?}", start.elapsed());

    println!(
        "{}",
        renderer.status_at(size.width / 2, size.height / 2)?
    );
    save(&renderer.frame(), &args.out)
}

/// Evaluates the view with one backend, without going through the scheduler.
fn evaluate(
    name: &str,
    view: Option<&View>,
    size: Size,
    iterations: usize,
) -> Result<(EscapeVector, Duration), CliError> {
    let mut plane = backend::create(name)?;
    match view {
        Some(view) => plane.parse_view(&view.x_origin, &view.y_origin, &view.x_extent)?,
        None => {
            let initial = InitialView::default();
            plane.set_view(initial.x_origin, initial.y_origin, initial.x_extent)?
        }
    }
    let start = Instant::now();
    let escapes = plane.evaluate_parallel(size, iterations)?;
    Ok((escapes, start.elapsed()))
}

fn compare(args: CompareArgs) -> Result<(), CliError> {
    let size = Size::new(args.width, args.height);
    let names: Vec<String> = if args.backends.is_empty() {
        backend::formats()
            .filter(|name| *name != "rational")
            .map(str::to_string)
            .collect()
    } else {
        args.backends.clone()
    };
    std::fs::create_dir_all(&args.out_dir).map_err(|source| CliError::Io {
        path: args.out_dir.clone(),
        source,
    })?;

    let view = args.view.as_ref();
    let (reference, _) = evaluate("f64", view, size, args.iterations)?;
    let palette = Palette::default();
    for name in &names {
        let (escapes, elapsed) = evaluate(name, view, size, args.iterations)?;
        let differing = escapes
            .iter()
            .zip(&reference)
            .filter(|(a, b)| a != b)
            .count();
        tracing::info!(
            "{}: {:?}, {} of {} pixels differ from f64",
            name,
            elapsed,
            differing,
            size.pixels()
        );

        let frame = FrameBuffer::new(size);
        frame.paint(&escapes, &palette, args.iterations)?;
        save(&frame, &args.out_dir.join(format!("{}.png", file_stem(name))))?;
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let result = match args.command {
        Command::Render(args) => render(args),
        Command::Compare(args) => compare(args),
        Command::List => {
            for name in backend::formats() {
                println!("{}", name);
            }
            Ok(())
        }
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_line_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_event_lists() {
        let args = Args::try_parse_from([
            "mandel",
            "render",
            "--backend",
            "FixedDecimal<16>",
            "--view",
            "-0.75,0.1,0.01",
            "--pan",
            "-10,5",
            "--pan",
            "3,-3",
            "--zoom",
            "400,300,0.8",
            "--out",
            "frame.png",
        ])
        .unwrap();
        let Command::Render(render) = args.command else {
            panic!("expected the render subcommand");
        };
        assert_eq!(render.backend, "FixedDecimal<16>");
        assert_eq!(
            render.view,
            Some(View {
                x_origin: "-0.75".to_string(),
                y_origin: "0.1".to_string(),
                x_extent: "0.01".to_string(),
            })
        );
        assert_eq!(render.pans, vec![Pan { dx: -10, dy: 5 }, Pan { dx: 3, dy: -3 }]);
        assert_eq!(
            render.zooms,
            vec![Zoom {
                px: 400,
                py: 300,
                factor: 0.8
            }]
        );
        assert_eq!(render.iterations, 100);
    }

    #[test]
    fn defaults_use_every_cpu() {
        let args = Args::try_parse_from(["mandel", "render", "--out", "frame.png"]).unwrap();
        let Command::Render(render) = args.command else {
            panic!("expected the render subcommand");
        };
        assert_eq!(render.threads, num_cpus::get());
        assert_eq!(render.backend, "f64");
        assert!(render.pans.is_empty() && render.zooms.is_empty());
    }

    #[test]
    fn rejects_malformed_events() {
        assert!(parse_pan("1").is_err());
        assert!(parse_pan("1,2,3").is_err());
        assert!(parse_pan("a,2").is_err());
        assert!(parse_zoom("1,2,0").is_err());
        assert!(parse_zoom("1,2,nan").is_err());
        assert!(parse_view("1,2").is_err());
    }

    #[test]
    fn backend_file_names() {
        assert_eq!(file_stem("FixedDecimal<16>"), "FixedDecimal_16");
        assert_eq!(file_stem("f64"), "f64");
    }
}
