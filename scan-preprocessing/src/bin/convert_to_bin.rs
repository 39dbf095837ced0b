/// Converts one point file into fixed f32 records (.bin or .npy)
use scan_preprocessing::batch::convert_file;
use scan_preprocessing::cli::{init_logging, parse_convert_args, resolve_convert_config};
use std::env;

fn main() {
    init_logging();
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> scan_preprocessing::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let args = parse_convert_args(&args)?;
    let config = resolve_convert_config(args.scale, args.config.as_deref())?;

    let count = convert_file(&args.input, &args.output, config.scale_factor)?;
    println!("Conversion completed: {} records -> {}", count, args.output.display());
    Ok(())
}
