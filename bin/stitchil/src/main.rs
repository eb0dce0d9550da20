use stitchil::*;

use clap::{crate_version, value_parser, Arg, Command};
use std::path::PathBuf;

fn main() -> Result<(), stitch::Error> {
    env_logger::init();

    let matches = Command::new("IL stitcher")
        .version(crate_version!())
        .about("Stitch calls to patch routines into the methods of a compiled module")
        .arg(
            Arg::new("TARGET")
                .help("Module to patch")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .index(1),
        )
        .arg(
            Arg::new("PATCH")
                .help("Module holding the patch routines")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .index(2),
        )
        .get_matches();

    let target = matches.get_one::<PathBuf>("TARGET").unwrap();
    let patch = matches.get_one::<PathBuf>("PATCH").unwrap();

    let settings = Settings::new();
    let output = stitch::run(target, patch, &settings)?;
    log::info!("Wrote {:?}", output);

    Ok(())
}
