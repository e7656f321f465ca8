//! Login QR rendering: PNG data URLs for the HTTP API and Unicode blocks for the terminal.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{ImageBuffer, ImageFormat, Luma};
use qrcode::{Color, EcLevel, QrCode};

use crate::{Error, Result};

const MODULE_SIZE: u32 = 8;
const QUIET_ZONE: u32 = 4;

fn encode(data: &str) -> Result<QrCode> {
    if data.trim().is_empty() {
        return Err(Error::Qr("QR payload is empty".into()));
    }
    QrCode::with_error_correction_level(data.as_bytes(), EcLevel::L)
        .map_err(|e| Error::Qr(format!("QR generation failed: {e}")))
}

/// Render the QR code as PNG bytes.
pub fn render_png(data: &str) -> Result<Vec<u8>> {
    let code = encode(data)?;
    let modules = code.width() as u32;
    let img_size = (modules + QUIET_ZONE * 2) * MODULE_SIZE;

    let img = ImageBuffer::from_fn(img_size, img_size, |x, y| {
        let (cx, cy) = (x / MODULE_SIZE, y / MODULE_SIZE);
        if cx < QUIET_ZONE || cy < QUIET_ZONE {
            return Luma([255u8]);
        }
        let (mx, my) = (cx - QUIET_ZONE, cy - QUIET_ZONE);
        if mx >= modules || my >= modules {
            return Luma([255u8]);
        }
        match code[(mx as usize, my as usize)] {
            Color::Dark => Luma([0u8]),
            Color::Light => Luma([255u8]),
        }
    });

    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| Error::Qr(format!("PNG encoding failed: {e}")))?;
    Ok(buf.into_inner())
}

/// Render the QR code as a `data:image/png;base64,...` URL.
pub fn render_data_url(data: &str) -> Result<String> {
    let png = render_png(data)?;
    Ok(format!("data:image/png;base64,{}", STANDARD.encode(png)))
}

/// Render the QR code for a terminal, two module rows per text line.
pub fn render_terminal(data: &str) -> Result<String> {
    let code = encode(data)?;
    let width = code.width();
    let colors = code.into_colors();
    let is_dark = |row: usize, col: usize| row < width && colors[row * width + col] == Color::Dark;

    let mut out = String::new();
    for row in (0..width).step_by(2) {
        for col in 0..width {
            out.push(match (is_dark(row, col), is_dark(row + 1, col)) {
                (true, true) => '█',
                (true, false) => '▀',
                (false, true) => '▄',
                (false, false) => ' ',
            });
        }
        out.push('\n');
    }
    Ok(out)
}
