//! Debug annotations drawn onto result canvases

use image::Rgba;

use crate::types::{Ellipse, EyeModel, FaceModel, Image4b, Point2D};

/// Green is identical in RGBA and BGRA order
pub const ANNOTATION_COLOR: Rgba<u8> = Rgba([0, 255, 0, 255]);

const POINT_RADIUS: i32 = 2;

fn put_pixel(image: &mut Image4b, x: i32, y: i32, color: Rgba<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < image.width() && (y as u32) < image.height() {
        image.put_pixel(x as u32, y as u32, color);
    }
}

pub fn fill_circle(image: &mut Image4b, center: Point2D, radius: i32, color: Rgba<u8>) {
    let cx = center.x.round() as i32;
    let cy = center.y.round() as i32;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                put_pixel(image, cx + dx, cy + dy, color);
            }
        }
    }
}

/// One pixel wide outline of a rotated ellipse
pub fn draw_ellipse(image: &mut Image4b, ellipse: &Ellipse, color: Rgba<u8>) {
    let a = ellipse.width / 2.0;
    let b = ellipse.height / 2.0;
    if a <= 0.0 || b <= 0.0 {
        return;
    }
    let (sin, cos) = ellipse.angle.to_radians().sin_cos();
    // Enough samples that neighbouring points touch
    let steps = ((a.max(b) * std::f32::consts::TAU).ceil() as usize).max(16);
    for i in 0..steps {
        let t = i as f32 / steps as f32 * std::f32::consts::TAU;
        let (x, y) = (a * t.cos(), b * t.sin());
        let px = ellipse.center.x + x * cos - y * sin;
        let py = ellipse.center.y + x * sin + y * cos;
        put_pixel(image, px.round() as i32, py.round() as i32, color);
    }
}

pub fn draw_eye(image: &mut Image4b, eye: &EyeModel) {
    draw_ellipse(image, &eye.iris, ANNOTATION_COLOR);
    draw_ellipse(image, &eye.pupil, ANNOTATION_COLOR);
    for p in eye.eyelids.iter().chain(&eye.crease) {
        fill_circle(image, *p, POINT_RADIUS, ANNOTATION_COLOR);
    }
}

pub fn draw_face(image: &mut Image4b, face: &FaceModel) {
    for p in &face.landmarks {
        fill_circle(image, *p, POINT_RADIUS, ANNOTATION_COLOR);
    }
    for eye in &face.eyes {
        draw_eye(image, eye);
    }
}
