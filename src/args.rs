use clap::{ArgAction, Parser};
use std::path::PathBuf;

use rusty_facetrack::capture::CaptureVolume;
use rusty_facetrack::config::SessionFlags;

/// Command line interface for face model fitting
#[derive(Parser, Debug)]
#[command(name = "rusty-face-test", author, version, about, long_about = None)]
pub struct Args {
    /// Input image, .txt image list, or camera index
    #[arg(short, long, required_unless_present_any = ["boilerplate", "list"])]
    pub input: Option<String>,

    /// Output directory for annotated frames
    #[arg(short, long, required_unless_present_any = ["boilerplate", "list"])]
    pub output: Option<PathBuf>,

    /// Model factory configuration file (JSON)
    #[arg(short, long, required_unless_present_any = ["boilerplate", "list"])]
    pub models: Option<PathBuf>,

    /// Session configuration file (JSON); replaces the discrete session flags
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Focal length in pixels
    #[arg(short, long)]
    pub focal_length: Option<f32>,

    /// Track multiple faces
    #[arg(long)]
    pub multi_face: bool,

    /// Minimum detection distance
    #[arg(long)]
    pub min: Option<f32>,

    /// Maximum detection distance
    #[arg(long)]
    pub max: Option<f32>,

    /// Face finder interval in seconds
    #[arg(long)]
    pub interval: Option<f32>,

    /// ACF detector calibration offset
    #[arg(long)]
    pub calibration: Option<f32>,

    /// Regressor crop scale
    #[arg(long)]
    pub scale: Option<f32>,

    /// Consecutive hits required to start a track
    #[arg(long)]
    pub min_track_hits: Option<u32>,

    /// Consecutive misses allowed before a track is dropped
    #[arg(long)]
    pub max_track_misses: Option<u32>,

    /// Minimum separation between faces
    #[arg(long)]
    pub separation: Option<f32>,

    /// Disable the optimized (latency adding) pipeline
    #[arg(long)]
    pub simple: bool,

    /// Draw annotations on output frames
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub annotation: bool,

    /// Capture volume as x,y,z,radius,cooldown
    #[arg(long)]
    pub capture: Option<CaptureVolume>,

    /// Show a live preview window
    #[arg(short, long)]
    pub preview: bool,

    /// Write a default session configuration to this file and exit
    #[arg(short, long)]
    pub boilerplate: Option<PathBuf>,

    /// List available cameras and exit
    #[arg(long)]
    pub list: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn session_flags(&self) -> SessionFlags {
        SessionFlags {
            focal_length: self.focal_length,
            min_distance: self.min,
            max_distance: self.max,
            multi_face: self.multi_face,
            interval: self.interval,
            calibration: self.calibration,
            scale: self.scale,
            min_track_hits: self.min_track_hits,
            max_track_misses: self.max_track_misses,
            separation: self.separation,
            simple: self.simple,
            annotation: self.annotation,
        }
    }
}
