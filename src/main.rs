use std::cell::RefCell;
use std::process::ExitCode;
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use colored::*;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use rusty_facetrack::callbacks::CaptureController;
use rusty_facetrack::capture::CaptureGate;
use rusty_facetrack::config::SessionConfig;
use rusty_facetrack::engine::TrackingEngine;
use rusty_facetrack::frame_loop::FrameLoop;
use rusty_facetrack::frame_writer::FrameWriter;
use rusty_facetrack::resources::ResourceBundle;
use rusty_facetrack::sensor::SensorModel;
use rusty_facetrack::simulated::SimulatedEngine;
use rusty_facetrack::source::open_source;

mod args;

use args::Args;

const LOGGER_NAME: &str = "rusty-face-test";

fn init_logging(verbose: bool) {
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::builder()
                .with_default_directive(log_level.into())
                .from_env_lossy(),
        )
        .init();
}

fn main() -> ExitCode {
    // A bare invocation shows usage rather than failing
    if std::env::args_os().len() <= 1 {
        return match Args::command().print_help() {
            Ok(()) => ExitCode::SUCCESS,
            Err(_) => ExitCode::FAILURE,
        };
    }

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp
            | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
            | ErrorKind::DisplayVersion => {
                let _ = e.print();
                return ExitCode::SUCCESS;
            }
            _ => {
                init_logging(false);
                tracing::error!("Invalid arguments: {}", e.render());
                return ExitCode::FAILURE;
            }
        },
    };

    init_logging(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    info!("Starting {} v{}", rusty_facetrack::NAME, rusty_facetrack::VERSION);

    if args.list {
        return list_cameras();
    }

    if let Some(path) = &args.boilerplate {
        SessionConfig::default().save(path)?;
        println!("{}", format!("Wrote default session config to {}", path.display()).green());
        return Ok(());
    }

    // clap enforces these unless --boilerplate or --list was given
    let (Some(input), Some(output), Some(models)) = (&args.input, &args.output, &args.models) else {
        anyhow::bail!("--input, --output and --models are required");
    };

    let config = match &args.config {
        Some(path) => SessionConfig::from_file(path)?,
        None => args.session_flags().into_config()?,
    };
    info!("Session config: {:?}", config);

    let resources = ResourceBundle::load(models, LOGGER_NAME)?;
    let logger = resources.span().clone();

    let mut source = open_source(input)?;
    let size = source
        .frame_size()
        .with_context(|| format!("Unable to determine frame size of {}", source.name()))?;
    info!("Input: {} ({})", source.name(), size);

    let sensor = SensorModel::for_frame(size, args.focal_length);
    let engine = SimulatedEngine::new();
    info!("Engine: {}", engine.name());
    let mut session = engine.create_session(sensor, resources, &config)?;
    let format = session.texture_format();

    let writer = FrameWriter::new(output)?;
    let mut controller = CaptureController::new(logger, CaptureGate::new(args.capture))
        .with_writer(writer)
        .with_annotation(config.annotation);
    controller.set_size_hint(size, format);

    let mut frame_loop = FrameLoop::new();
    if args.preview {
        let sink = open_preview(size, format)?;
        controller = controller.with_preview(Rc::clone(&sink));
        frame_loop = frame_loop.with_preview(sink);
    }

    let controller = Rc::new(RefCell::new(controller));
    session.add_callbacks(Box::new(Rc::clone(&controller)));

    let loop_stats = frame_loop.run(source.as_mut(), session.as_mut())?;
    let stats = controller.borrow().stats();

    println!("{}", "Run summary".bold());
    println!("  frames:        {}", loop_stats.frames);
    println!("  fps:           {:.2}", loop_stats.fps());
    println!("  captures:      {}", stats.captures.to_string().green());
    println!("  saved:         {} -> {}", stats.saved, output.display());
    if loop_stats.mismatches > 0 {
        println!("  mismatches:    {}", loop_stats.mismatches.to_string().yellow());
    }
    let errors = loop_stats.engine_errors + stats.failures;
    if errors > 0 {
        println!("  errors:        {}", errors.to_string().red());
    }

    Ok(())
}

#[cfg(feature = "preview")]
fn open_preview(
    size: rusty_facetrack::types::Size,
    format: rusty_facetrack::types::TextureFormat,
) -> Result<Rc<RefCell<rusty_facetrack::preview::PreviewSink>>> {
    use rusty_facetrack::preview::{MinifbSurface, PreviewSink};

    let surface = MinifbSurface::new(LOGGER_NAME, size.width as usize, size.height as usize)?;
    let mut sink = PreviewSink::new(Box::new(surface));
    sink.initialize(size, format);
    Ok(Rc::new(RefCell::new(sink)))
}

#[cfg(not(feature = "preview"))]
fn open_preview(
    _size: rusty_facetrack::types::Size,
    _format: rusty_facetrack::types::TextureFormat,
) -> Result<Rc<RefCell<rusty_facetrack::preview::PreviewSink>>> {
    anyhow::bail!("--preview requested but this build has no window support (enable the 'preview' feature)")
}

#[cfg(feature = "camera")]
fn list_cameras() -> Result<()> {
    rusty_facetrack::camera::list_cameras()
}

#[cfg(not(feature = "camera"))]
fn list_cameras() -> Result<()> {
    anyhow::bail!("--list requires the 'camera' feature")
}
