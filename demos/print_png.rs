use image::GenericImageView;
use rastertopos::{Config, MemorySource, PageHeader, PrintSession};
use std::{env, fs::File, io::BufWriter};

//
// cargo run --example print_png photo.png photo.bin [threshold|diffusion]
//
// Converts a picture to the printer command stream. The picture is used at
// its own size, scale it to the paper width (576 dots for 80mm) beforehand.
//

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 3 {
        println!("usage: print_png <input.png> <output.bin> [threshold|diffusion]");
        return;
    }

    let dither_mode = match args.get(3).map(String::as_str) {
        None | Some("threshold") => 0,
        Some("diffusion") => 1,
        Some(other) => {
            eprintln!("Error: Unknown dither mode '{}'", other);
            return;
        }
    };

    let picture = image::open(&args[1]).unwrap().grayscale();
    let (width, length) = picture.dimensions();
    let bytes = picture.to_luma8().into_raw();
    let rows = bytes
        .chunks(width as usize)
        .map(|row| row.to_vec())
        .collect();

    let mut header = PageHeader::greyscale(width, length);
    header.integers[0] = dither_mode;
    header.advance_media = 2;
    header.cut_media = 2;

    let source = MemorySource::new().page(header, rows);
    let file = BufWriter::new(File::create(&args[2]).unwrap());

    match PrintSession::new(source, file, Config::new()).run() {
        Ok(_) => println!("{}x{} picture written to {}", width, length, args[2]),
        Err(err) => panic!("Conversion failed: {}", err),
    }
}
