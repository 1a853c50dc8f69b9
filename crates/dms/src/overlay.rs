//! Overlay rendering of evaluation annotations

use frame_codec::Frame;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::analysis::{Annotation, OverlayLine, Region};
use crate::font;

const RED: Rgb<u8> = Rgb([255, 0, 0]);
const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
const BLUE: Rgb<u8> = Rgb([0, 0, 255]);

const LABEL_X: u32 = 10;
const LABEL_SCALE: u32 = 2;

fn line_color(line: OverlayLine) -> Rgb<u8> {
    match line {
        OverlayLine::Status | OverlayLine::Alert => RED,
        OverlayLine::EyeCount | OverlayLine::Openness => BLUE,
        OverlayLine::Counter => GREEN,
    }
}

/// Draw all annotations onto the frame, in order
pub fn render(frame: &mut Frame, annotations: &[Annotation]) {
    let image = frame.image_mut();
    for annotation in annotations {
        match annotation {
            Annotation::FaceBox(region) => draw_box(image, region, GREEN),
            Annotation::EyeBox(region) => draw_box(image, region, BLUE),
            Annotation::Label { line, text } => {
                let top = line.baseline().saturating_sub(font::text_height(LABEL_SCALE));
                font::draw_text(image, LABEL_X, top, text, line_color(*line), LABEL_SCALE);
            }
        }
    }
}

/// Two-pixel rectangle outline
fn draw_box(image: &mut RgbImage, region: &Region, color: Rgb<u8>) {
    if region.width == 0 || region.height == 0 {
        return;
    }
    let outer = Rect::at(region.x as i32, region.y as i32).of_size(region.width, region.height);
    draw_hollow_rect_mut(image, outer, color);

    if region.width > 2 && region.height > 2 {
        let inner = Rect::at(region.x as i32 + 1, region.y as i32 + 1)
            .of_size(region.width - 2, region.height - 2);
        draw_hollow_rect_mut(image, inner, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank(width: u32, height: u32) -> Frame {
        Frame::new(RgbImage::new(width, height))
    }

    #[test]
    fn test_face_box_is_green() {
        let mut frame = blank(100, 100);
        render(&mut frame, &[Annotation::FaceBox(Region::new(20, 20, 30, 30))]);
        let image = frame.image();
        assert_eq!(image.get_pixel(20, 20), &GREEN);
        assert_eq!(image.get_pixel(21, 21), &GREEN);
        assert_eq!(image.get_pixel(35, 35), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_eye_box_is_blue() {
        let mut frame = blank(100, 100);
        render(&mut frame, &[Annotation::EyeBox(Region::new(40, 40, 10, 6))]);
        assert_eq!(frame.image().get_pixel(49, 45), &BLUE);
    }

    #[test]
    fn test_alert_label_drawn_above_baseline() {
        let mut frame = blank(320, 200);
        render(
            &mut frame,
            &[Annotation::Label {
                line: OverlayLine::Alert,
                text: "DROWSINESS ALERT!".to_string(),
            }],
        );
        let image = frame.image();
        let red_pixels = image.pixels().filter(|p| **p == RED).count();
        assert!(red_pixels > 0);
        // Nothing drawn on or below the baseline
        for x in 0..320 {
            assert_eq!(image.get_pixel(x, 150), &Rgb([0, 0, 0]));
        }
    }

    #[test]
    fn test_boxes_past_the_edge_are_clipped() {
        let mut frame = blank(50, 50);
        render(&mut frame, &[Annotation::FaceBox(Region::new(40, 40, 30, 30))]);
        assert_eq!(frame.image().get_pixel(40, 40), &GREEN);
    }
}
