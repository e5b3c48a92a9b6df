//! Render the first page of a PDF to PNG and print its outline
//!
//! Usage: cargo run --features pdfium --example render_to_png <pdf_path> [output.png] [scale]

use pdfium_bridge::{Bridge, MemorySurface, PdfBookmark, Size, SurfaceFormat, Viewport};
use std::env;
use std::fs::File;
use std::io::BufWriter;

fn print_outline(entries: &[PdfBookmark], depth: usize) {
    for entry in entries {
        let target = entry
            .page_index
            .map(|index| format!("page {}", index + 1))
            .unwrap_or_else(|| "-".to_string());
        println!("{}{} ({})", "  ".repeat(depth), entry.title, target);
        print_outline(&entry.children, depth + 1);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <pdf_path> [output.png] [scale]", args[0]);
        std::process::exit(1);
    }

    let pdf_path = &args[1];
    let output = args.get(2).map(|s| s.as_str()).unwrap_or("page1.png");
    let scale = args.get(3).map(|s| s.parse::<f64>()).transpose()?.unwrap_or(1.0);

    let bridge = Bridge::with_pdfium();
    let doc = bridge.open_file(File::open(pdf_path)?, None)?;
    println!("Opened {}: {} pages", pdf_path, bridge.page_count(doc)?);

    let meta = bridge.document_meta(doc)?;
    if !meta.title.is_empty() {
        println!("Title: {}", meta.title);
    }
    if !meta.author.is_empty() {
        println!("Author: {}", meta.author);
    }

    let outline = bridge.bookmarks(doc)?;
    if !outline.is_empty() {
        println!("\nOutline:");
        print_outline(&outline, 1);
    }

    let mut size = Size::default();
    let page = bridge.open_page(doc, 0, &mut size)?;
    let width = (f64::from(size.width) * scale).round().max(1.0) as u32;
    let height = (f64::from(size.height) * scale).round().max(1.0) as u32;
    println!("\nPage 1: {} x {} points, rendering at {} x {}", size.width, size.height, width, height);

    for link in bridge.links(doc, page)? {
        match (link.dest_page_index, &link.uri) {
            (Some(index), _) => println!("  link -> page {}", index + 1),
            (None, Some(uri)) => println!("  link -> {}", uri),
            (None, None) => {}
        }
    }

    let mut surface = MemorySurface::new(width, height, SurfaceFormat::Rgba8888);
    bridge.render_page_bitmap_default(
        page,
        &mut surface,
        Viewport::new(0, 0, width as i32, height as i32),
        true,
    )?;

    let writer = BufWriter::new(File::create(output)?);
    let mut encoder = png::Encoder::new(writer, width, height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(surface.pixels())?;
    println!("Wrote {}", output);

    bridge.close_page(page)?;
    bridge.close_document(doc)?;
    Ok(())
}
