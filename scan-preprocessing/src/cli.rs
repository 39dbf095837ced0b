/// Argument parsing shared by the command line tools.
///
/// Arguments are passed without the program name. Usage problems come back
/// as `PreprocessError::Usage`; the binaries print them and exit with 1.
use crate::config::{ConvertConfig, PipelineConfig, load_config};
use crate::error::{PreprocessError, Result};
use std::path::{Path, PathBuf};

pub const PREPROCESS_USAGE: &str =
    "Usage: batch_preprocess --input-dir <input_folder> --output-dir <output_folder> [--config <config.json>]";
pub const SPLIT_USAGE: &str = "Usage: batch_split <ply_dir> [--config <config.json>]";
pub const CONVERT_USAGE: &str =
    "Usage: convert_to_bin <input> <output.bin|output.npy> [--scale <factor>] [--config <config.json>]";
pub const LABELS_USAGE: &str =
    "Usage: convert_labels --input-dir <label_folder> --output-dir <output_folder> [--scale <factor>] [--config <config.json>]";

#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessArgs {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SplitArgs {
    pub dir: PathBuf,
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConvertArgs {
    pub input: PathBuf,
    pub output: PathBuf,
    pub scale: Option<f64>,
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelArgs {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub scale: Option<f64>,
    pub config: Option<PathBuf>,
}

pub fn parse_preprocess_args(args: &[String]) -> Result<PreprocessArgs> {
    if !(args.len() == 4 || args.len() == 6) {
        return Err(usage(PREPROCESS_USAGE));
    }

    let mut input_dir = None;
    let mut output_dir = None;
    let mut config = None;
    for pair in args.chunks(2) {
        let value = PathBuf::from(&pair[1]);
        match pair[0].as_str() {
            "--input-dir" => input_dir = Some(value),
            "--output-dir" => output_dir = Some(value),
            "--config" => config = Some(value),
            other => return Err(usage(format!("Unknown argument: {}", other))),
        }
    }

    match (input_dir, output_dir) {
        (Some(input_dir), Some(output_dir)) => Ok(PreprocessArgs {
            input_dir,
            output_dir,
            config,
        }),
        _ => Err(usage(PREPROCESS_USAGE)),
    }
}

pub fn parse_split_args(args: &[String]) -> Result<SplitArgs> {
    match args {
        [dir] if !dir.starts_with("--") => Ok(SplitArgs {
            dir: PathBuf::from(dir),
            config: None,
        }),
        [dir, flag, config] if flag == "--config" && !dir.starts_with("--") => Ok(SplitArgs {
            dir: PathBuf::from(dir),
            config: Some(PathBuf::from(config)),
        }),
        _ => Err(usage(SPLIT_USAGE)),
    }
}

pub fn parse_convert_args(args: &[String]) -> Result<ConvertArgs> {
    let (input, output, flags) = match args {
        [input, output, flags @ ..] if !input.starts_with("--") && !output.starts_with("--") => {
            (input, output, flags)
        }
        _ => return Err(usage(CONVERT_USAGE)),
    };
    if flags.len() % 2 != 0 {
        return Err(usage(CONVERT_USAGE));
    }

    let mut scale = None;
    let mut config = None;
    for pair in flags.chunks(2) {
        match pair[0].as_str() {
            "--scale" => scale = Some(parse_scale(&pair[1])?),
            "--config" => config = Some(PathBuf::from(&pair[1])),
            other => return Err(usage(format!("Unknown argument: {}", other))),
        }
    }
    Ok(ConvertArgs {
        input: PathBuf::from(input),
        output: PathBuf::from(output),
        scale,
        config,
    })
}

pub fn parse_label_args(args: &[String]) -> Result<LabelArgs> {
    if args.len() % 2 != 0 || !(4..=8).contains(&args.len()) {
        return Err(usage(LABELS_USAGE));
    }

    let mut input_dir = None;
    let mut output_dir = None;
    let mut scale = None;
    let mut config = None;
    for pair in args.chunks(2) {
        match pair[0].as_str() {
            "--input-dir" => input_dir = Some(PathBuf::from(&pair[1])),
            "--output-dir" => output_dir = Some(PathBuf::from(&pair[1])),
            "--scale" => scale = Some(parse_scale(&pair[1])?),
            "--config" => config = Some(PathBuf::from(&pair[1])),
            other => return Err(usage(format!("Unknown argument: {}", other))),
        }
    }

    match (input_dir, output_dir) {
        (Some(input_dir), Some(output_dir)) => Ok(LabelArgs {
            input_dir,
            output_dir,
            scale,
            config,
        }),
        _ => Err(usage(LABELS_USAGE)),
    }
}

/// Loads the optional config file, falling back to defaults.
pub fn resolve_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => load_config(path),
        None => Ok(PipelineConfig::default()),
    }
}

/// Conversion settings: `--scale` wins over the config file, which wins
/// over the default magnify factor.
pub fn resolve_convert_config(scale: Option<f64>, config: Option<&Path>) -> Result<ConvertConfig> {
    let mut convert = resolve_config(config)?.convert;
    if let Some(scale) = scale {
        convert.scale_factor = scale;
    }
    convert.validate()?;
    Ok(convert)
}

/// Installs the `env_logger` backend with an `info` default.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

fn parse_scale(value: &str) -> Result<f64> {
    value
        .parse()
        .map_err(|_| usage(format!("Invalid scale factor: {}", value)))
}

fn usage(msg: impl Into<String>) -> PreprocessError {
    PreprocessError::Usage(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn preprocess_flags_in_any_order() {
        let parsed =
            parse_preprocess_args(&args(&["--output-dir", "out", "--input-dir", "in"])).unwrap();
        assert_eq!(parsed.input_dir, PathBuf::from("in"));
        assert_eq!(parsed.output_dir, PathBuf::from("out"));
        assert_eq!(parsed.config, None);

        let parsed = parse_preprocess_args(&args(&[
            "--input-dir", "in", "--output-dir", "out", "--config", "c.json",
        ]))
        .unwrap();
        assert_eq!(parsed.config, Some(PathBuf::from("c.json")));
    }

    #[test]
    fn preprocess_rejects_bad_arity_and_unknown_flags() {
        assert!(matches!(
            parse_preprocess_args(&args(&["--input-dir", "in"])),
            Err(PreprocessError::Usage(_))
        ));
        let err = parse_preprocess_args(&args(&["--input-dir", "in", "--out", "x"])).unwrap_err();
        assert_eq!(err.to_string(), "Unknown argument: --out");
        // both flags required even with the right count
        assert!(parse_preprocess_args(&args(&["--input-dir", "a", "--input-dir", "b"])).is_err());
    }

    #[test]
    fn split_takes_one_positional_directory() {
        assert_eq!(
            parse_split_args(&args(&["scans"])).unwrap().dir,
            PathBuf::from("scans")
        );
        assert!(parse_split_args(&args(&["scans", "--config", "c.json"]))
            .unwrap()
            .config
            .is_some());
        assert!(parse_split_args(&args(&[])).is_err());
        assert!(parse_split_args(&args(&["a", "b"])).is_err());
        assert!(parse_split_args(&args(&["--config"])).is_err());
    }

    #[test]
    fn convert_takes_paths_and_optional_scale() {
        let parsed = parse_convert_args(&args(&["in.ply", "out.bin"])).unwrap();
        assert_eq!(parsed.scale, None);
        let parsed = parse_convert_args(&args(&["in.ply", "out.bin", "--scale", "2.5"])).unwrap();
        assert_eq!(parsed.scale, Some(2.5));
        assert!(parse_convert_args(&args(&["in.ply", "out.bin", "--scale", "big"])).is_err());
        assert!(parse_convert_args(&args(&["in.ply"])).is_err());
    }

    #[test]
    fn convert_accepts_config_and_rejects_unknown_flags() {
        let parsed = parse_convert_args(&args(&[
            "in.ply", "out.npy", "--config", "c.json", "--scale", "4",
        ]))
        .unwrap();
        assert_eq!(parsed.config, Some(PathBuf::from("c.json")));
        assert_eq!(parsed.scale, Some(4.0));

        let err = parse_convert_args(&args(&["in.ply", "out.bin", "--magnify", "4"])).unwrap_err();
        assert_eq!(err.to_string(), "Unknown argument: --magnify");
        assert!(parse_convert_args(&args(&["in.ply", "out.bin", "--scale"])).is_err());
        assert!(parse_convert_args(&args(&["--scale", "2", "in.ply"])).is_err());
    }

    #[test]
    fn scale_flag_overrides_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "convert": { "scale_factor": 5.0 } }"#).unwrap();

        assert_eq!(resolve_convert_config(None, Some(&path)).unwrap().scale_factor, 5.0);
        assert_eq!(
            resolve_convert_config(Some(2.0), Some(&path)).unwrap().scale_factor,
            2.0
        );
        assert_eq!(resolve_convert_config(None, None).unwrap().scale_factor, 20.0);
        assert!(matches!(
            resolve_convert_config(Some(f64::INFINITY), None),
            Err(PreprocessError::InvalidScale(_))
        ));
    }

    #[test]
    fn label_args_need_both_directories() {
        let parsed = parse_label_args(&args(&[
            "--input-dir", "labels", "--output-dir", "txt", "--scale", "20",
        ]))
        .unwrap();
        assert_eq!(parsed.input_dir, PathBuf::from("labels"));
        assert_eq!(parsed.scale, Some(20.0));
        assert_eq!(parsed.config, None);

        assert!(parse_label_args(&args(&["--input-dir", "labels"])).is_err());
        assert!(parse_label_args(&args(&["--input-dir", "a", "--scale", "2"])).is_err());
        assert!(parse_label_args(&args(&["--input-dir", "a", "--output-dir"])).is_err());
    }

    #[test]
    fn missing_config_falls_back_to_defaults() {
        assert_eq!(resolve_config(None).unwrap(), PipelineConfig::default());
    }
}
