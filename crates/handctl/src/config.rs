//! Command-line and environment configuration.

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
};

use clap::{Parser, Subcommand};

use crate::{detector::DetectorConfig, server::DEFAULT_MAX_BODY_BYTES};

#[derive(Parser, Debug)]
#[command(version, about = "Serves robot commands recognized from hand gestures")]
pub struct Args {
    /// Hand landmark network. MUST be an `.onnx` file.
    #[arg(short, long, env = "HANDCTL_MODEL")]
    pub model: PathBuf,

    /// Minimum presence score to accept a hand found in a full frame.
    #[arg(long, default_value_t = DetectorConfig::DEFAULT_MIN_DETECTION_CONFIDENCE)]
    pub min_detection_confidence: f32,

    /// Minimum presence score to keep tracking a hand from the previous frame.
    #[arg(long, default_value_t = DetectorConfig::DEFAULT_MIN_TRACKING_CONFIDENCE)]
    pub min_tracking_confidence: f32,

    #[arg(long, env = "HANDCTL_HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,

    #[arg(short, long, env = "HANDCTL_PORT", default_value_t = 5000)]
    pub port: u16,

    /// Largest accepted request body, in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_BODY_BYTES)]
    pub max_body_bytes: usize,

    #[command(subcommand)]
    pub mode: Option<Mode>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Run the HTTP server (default).
    Serve,
    /// Classify the gesture in a single image file and print the command.
    Detect {
        /// A JPEG, PNG or GIF image.
        image: PathBuf,
    },
}

impl Args {
    pub fn detector_config(&self) -> DetectorConfig {
        DetectorConfig {
            min_detection_confidence: self.min_detection_confidence,
            min_tracking_confidence: self.min_tracking_confidence,
        }
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn mode(&self) -> Mode {
        self.mode.clone().unwrap_or(Mode::Serve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["handctl", "--model", "hand.onnx"]).unwrap();
        assert_eq!(args.model, PathBuf::from("hand.onnx"));
        assert_eq!(args.listen_addr(), "0.0.0.0:5000".parse().unwrap());
        assert_eq!(args.detector_config(), DetectorConfig::default());
        assert_eq!(args.max_body_bytes, 16 * 1024 * 1024);
        assert_eq!(args.mode(), Mode::Serve);
    }

    #[test]
    fn overrides() {
        let args = Args::try_parse_from([
            "handctl",
            "--model",
            "hand.onnx",
            "--host",
            "127.0.0.1",
            "--port",
            "8080",
            "--min-detection-confidence",
            "0.5",
            "--min-tracking-confidence",
            "0.3",
        ])
        .unwrap();
        assert_eq!(args.listen_addr(), "127.0.0.1:8080".parse().unwrap());
        assert_eq!(args.detector_config().min_detection_confidence, 0.5);
        assert_eq!(args.detector_config().min_tracking_confidence, 0.3);
    }

    #[test]
    fn detect_subcommand() {
        let args =
            Args::try_parse_from(["handctl", "--model", "hand.onnx", "detect", "frame.png"])
                .unwrap();
        assert_eq!(
            args.mode(),
            Mode::Detect {
                image: PathBuf::from("frame.png")
            }
        );
    }

    #[test]
    fn rejects_bad_port() {
        assert!(Args::try_parse_from(["handctl", "--model", "m.onnx", "--port", "99999"]).is_err());
    }
}
