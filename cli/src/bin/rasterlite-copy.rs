use clap::Parser;
use rasterlite_cli::{gdal_style_args, run, CopyArgs};

#[allow(clippy::print_stderr)]
fn main() {
    let args = CopyArgs::parse_from(gdal_style_args(std::env::args_os()));

    if let Err(err) = run(&args) {
        eprintln!("Error: {}", snafu::Report::from_error(err));
        std::process::exit(1);
    }
}
