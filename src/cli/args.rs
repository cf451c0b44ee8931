// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::DetectorBackend;

/// CLI arguments parser.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(after_help = r#"Examples:
    medai-inference estimate --image warrior.jpg --pose 2-1
    medai-inference estimate -i warrior.jpg -p 2-1 --backend yolo --model yolo11n-pose.onnx
    medai-inference estimate -i squat.png -p 3-1 --feedback --final
    medai-inference reference --pose 1-2
    medai-inference poses

Environment:
    GROQ_API_KEY        API key for reference generation and feedback
    GROQ_API_ENDPOINT   Override the chat-completions endpoint"#)]
pub struct Cli {
    #[command(subcommand)]
    /// Subcommand to execute.
    pub command: Commands,
}

/// Commands for the CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Estimate and score the pose in an image
    Estimate(EstimateArgs),
    /// Print the reference pose for a pose id
    Reference(ReferenceArgs),
    /// List the supported poses
    Poses,
}

/// Detector backend as accepted on the command line.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendArg {
    Movenet,
    Yolo,
    None,
}

impl From<BackendArg> for DetectorBackend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Movenet => Self::MoveNet,
            BackendArg::Yolo => Self::Yolo,
            BackendArg::None => Self::None,
        }
    }
}

/// Arguments for the estimate command.
#[derive(Args, Debug)]
#[allow(clippy::struct_excessive_bools)]
pub struct EstimateArgs {
    /// Path to the image file (JPEG, PNG or WebP)
    #[arg(short, long)]
    pub image: PathBuf,

    /// Pose id from the catalogue, e.g. 2-1
    #[arg(short, long)]
    pub pose: String,

    /// Path to the ONNX landmark model
    #[arg(short, long)]
    pub model: Option<PathBuf>,

    /// Detector backend (defaults to yolo when a model is given, none otherwise)
    #[arg(long, value_enum)]
    pub backend: Option<BackendArg>,

    /// Person confidence threshold for the YOLO backend
    #[arg(long, default_value_t = 0.25)]
    pub conf: f32,

    /// Also request coaching feedback
    #[arg(long, default_value_t = false)]
    pub feedback: bool,

    /// Mark the feedback as the last of the session
    #[arg(long = "final", default_value_t = false)]
    pub is_final: bool,

    /// Print the result as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Show verbose output
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub verbose: bool,
}

impl EstimateArgs {
    /// Backend to load, inferring YOLO when only a model path is given.
    #[must_use]
    pub fn backend(&self) -> DetectorBackend {
        match (self.backend, &self.model) {
            (Some(arg), _) => arg.into(),
            (None, Some(_)) => DetectorBackend::Yolo,
            (None, None) => DetectorBackend::None,
        }
    }
}

/// Arguments for the reference command.
#[derive(Args, Debug)]
pub struct ReferenceArgs {
    /// Pose id from the catalogue, e.g. 2-1
    #[arg(short, long)]
    pub pose: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_estimate_args_defaults() {
        let args = Cli::parse_from(["app", "estimate", "--image", "pose.jpg", "--pose", "2-1"]);
        match args.command {
            Commands::Estimate(estimate) => {
                assert_eq!(estimate.image, PathBuf::from("pose.jpg"));
                assert_eq!(estimate.pose, "2-1");
                assert!(estimate.model.is_none());
                assert_eq!(estimate.backend(), DetectorBackend::None);
                assert!((estimate.conf - 0.25).abs() < f32::EPSILON);
                assert!(!estimate.feedback);
                assert!(!estimate.is_final);
                assert!(estimate.verbose);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_estimate_args_custom() {
        let args = Cli::parse_from([
            "app",
            "estimate",
            "-i",
            "squat.png",
            "-p",
            "3-1",
            "--model",
            "movenet.onnx",
            "--backend",
            "movenet",
            "--feedback",
            "--final",
            "--verbose",
            "false",
        ]);
        match args.command {
            Commands::Estimate(estimate) => {
                assert_eq!(estimate.model, Some(PathBuf::from("movenet.onnx")));
                assert_eq!(estimate.backend(), DetectorBackend::MoveNet);
                assert!(estimate.feedback);
                assert!(estimate.is_final);
                assert!(!estimate.verbose);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_model_implies_yolo() {
        let args = Cli::parse_from(["app", "estimate", "-i", "a.jpg", "-p", "1-1", "-m", "pose.onnx"]);
        let Commands::Estimate(estimate) = args.command else {
            panic!("expected estimate");
        };
        assert_eq!(estimate.backend(), DetectorBackend::Yolo);
    }

    #[test]
    fn test_reference_and_poses() {
        let args = Cli::parse_from(["app", "reference", "--pose", "1-3"]);
        assert!(matches!(args.command, Commands::Reference(ReferenceArgs { ref pose }) if pose == "1-3"));
        assert!(matches!(Cli::parse_from(["app", "poses"]).command, Commands::Poses));
        assert!(Cli::try_parse_from(["app", "estimate", "--pose", "1-1"]).is_err());
    }
}
