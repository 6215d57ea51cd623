use crate::detection::domain::face_mesh::LandmarkPoint;

pub const MARKER_RADIUS: f64 = 6.0;
pub const MARKER_COLOR: [u8; 4] = [0, 255, 0, 255];

/// Transparent RGBA layer the size of the video frame, meant to be drawn
/// over the live preview. Purely cosmetic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Overlay {
    pub width: u32,
    pub height: u32,
    pub frame_index: usize,
    pub rgba: Vec<u8>,
}

impl Overlay {
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([self.rgba[i], self.rgba[i + 1], self.rgba[i + 2], self.rgba[i + 3]])
    }
}

/// Draws a filled disc at the nose tip. Parts of the disc outside the frame
/// are clipped.
pub fn render_nose_marker(width: u32, height: u32, frame_index: usize, nose: LandmarkPoint) -> Overlay {
    let mut rgba = vec![0u8; width as usize * height as usize * 4];

    let cx = nose.x * width as f64;
    let cy = nose.y * height as f64;
    let r = MARKER_RADIUS;

    let x0 = (cx - r).floor().max(0.0) as u32;
    let y0 = (cy - r).floor().max(0.0) as u32;
    let x1 = ((cx + r).ceil().max(0.0) as u32).min(width);
    let y1 = ((cy + r).ceil().max(0.0) as u32).min(height);

    for y in y0..y1 {
        for x in x0..x1 {
            let dx = x as f64 + 0.5 - cx;
            let dy = y as f64 + 0.5 - cy;
            if dx * dx + dy * dy <= r * r {
                let i = (y as usize * width as usize + x as usize) * 4;
                rgba[i..i + 4].copy_from_slice(&MARKER_COLOR);
            }
        }
    }

    Overlay {
        width,
        height,
        frame_index,
        rgba,
    }
}
