use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};

use log::{error, info};
use rastertopos::{Config, CupsRasterReader, Error, JobSummary, PrintSession};

//
// CUPS calls filters as: rastertopos job-id user title copies options [filename]
//

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| writeln!(buf, "{}: {}", record.level(), record.args()))
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 6 || args.len() > 7 {
        eprintln!("usage: rastertopos job-id user title copies options [filename]");
        std::process::exit(1);
    }

    match run(&args[5], args.get(6)) {
        Ok(summary) => info!("printed {} pages", summary.pages),
        Err(err) => {
            error!("{}", err);
            std::process::exit(1);
        }
    }
}

fn run(options: &str, filename: Option<&String>) -> Result<JobSummary, Error> {
    let config = Config::new().apply_options(options)?;

    let input: Box<dyn Read> = match filename {
        Some(path) => Box::new(File::open(path)?),
        None => Box::new(io::stdin()),
    };
    let reader = CupsRasterReader::new(BufReader::new(input))?;

    let stdout = io::stdout();
    let out = BufWriter::new(stdout.lock());

    PrintSession::new(reader, out, config).run()
}
