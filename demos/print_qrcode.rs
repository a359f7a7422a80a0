use qrcode::QrCode;
use rastertopos::{Config, FeedStyle, MemorySource, PageHeader, PrintSession};
use std::{env, fs::File, io::BufWriter};

//
// cargo run --example print_qrcode [COUNT] [OUTPUT]
//
// Renders COUNT receipts with a QR code each and writes the printer command
// stream to OUTPUT (default: qrcode.bin). Send it with e.g. `cat qrcode.bin > /dev/usb/lp0`.
//

/// 80mm paper at 203 dpi.
const PAPER_WIDTH: u32 = 576;

fn print_usage() {
    println!("Usage: cargo run --example print_qrcode [COUNT] [OUTPUT]");
    println!("  COUNT   number of receipts, default 2");
    println!("  OUTPUT  command stream file, default qrcode.bin");
}

fn main() {
    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "[{}:{}] {} - {}",
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.level(),
                record.args()
            )
        })
        .init();

    let args: Vec<String> = env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return;
    }

    let count: u16 = match args.get(1).map(|s| s.parse()) {
        Some(Ok(n)) => n,
        Some(Err(_)) => {
            eprintln!("Error: COUNT must be a number");
            print_usage();
            return;
        }
        None => 2,
    };
    let output = args.get(2).map(String::as_str).unwrap_or("qrcode.bin");

    let mut source = MemorySource::new();
    for (header, rows) in (Label { counter: count }) {
        source = source.page(header, rows);
    }

    let file = BufWriter::new(File::create(output).unwrap());
    let config = Config::new().feed_style(FeedStyle::EscD);

    match PrintSession::new(source, file, config).run() {
        Ok(summary) => println!("wrote {} receipts to {}", summary.pages, output),
        Err(err) => println!("ERROR {:#?}", err),
    }
}

struct Label {
    counter: u16,
}

impl Iterator for Label {
    type Item = (PageHeader, Vec<Vec<u8>>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.counter > 0 {
            let qrcode = QrCode::new(format!("12345-{}", self.counter)).unwrap();
            let qrcode = qrcode
                .render::<image::Luma<u8>>()
                .quiet_zone(true)
                .min_dimensions(200, 200)
                .build();
            let (width, length) = qrcode.dimensions();

            // Center the code on a white page as wide as the paper.
            let offset = (PAPER_WIDTH.saturating_sub(width) / 2) as usize;
            let rows = (0..length)
                .map(|y| {
                    let mut row = vec![255u8; PAPER_WIDTH as usize];
                    for x in 0..width.min(PAPER_WIDTH) {
                        row[offset + x as usize] = qrcode.get_pixel(x, y)[0];
                    }
                    row
                })
                .collect();

            let mut header = PageHeader::greyscale(PAPER_WIDTH, length);
            header.advance_media = 4; // advance after every receipt
            header.advance_distance = 48;
            header.cut_media = 4; // cut after every receipt

            self.counter = self.counter - 1;
            Some((header, rows))
        } else {
            None
        }
    }
}
