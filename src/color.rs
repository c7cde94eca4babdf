use eframe::egui::Color32;
use palette::{Hsl, IntoColor, LinSrgb, Mix, Srgb};

fn to_color32(rgb: Srgb) -> Color32 {
    let rgb: Srgb<u8> = rgb.into_format();
    Color32::from_rgb(rgb.red, rgb.green, rgb.blue)
}

// ---------------------------------------------------------------------------
// Bar palette
// ---------------------------------------------------------------------------

/// `n` colours running from deep violet to yellow-green, for ranked bars.
pub fn ranked_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    let span = (n.max(2) - 1) as f32;
    (0..n)
        .map(|i| {
            let t = i as f32 / span;
            let hue = 270.0 - t * 190.0;
            let hsl = Hsl::new(hue, 0.65, 0.35 + 0.25 * t);
            let rgb: Srgb = hsl.into_color();
            to_color32(rgb)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Heatmap
// ---------------------------------------------------------------------------

/// Fill colour for a heatmap cell; `t` is the cell's share of the maximum.
pub fn heat_color(t: f32) -> Color32 {
    let t = t.clamp(0.0, 1.0);
    let low: LinSrgb = Srgb::new(0.97f32, 0.98, 1.0).into_linear();
    let high: LinSrgb = Srgb::new(0.03f32, 0.19, 0.42).into_linear();
    to_color32(Srgb::from_linear(low.mix(high, t)))
}

/// Black or white, whichever reads better on `background`.
pub fn contrast_text(background: Color32) -> Color32 {
    let rgb = Srgb::new(background.r(), background.g(), background.b()).into_format::<f32>();
    let lin: LinSrgb = rgb.into_linear();
    let luminance = 0.2126 * lin.red + 0.7152 * lin.green + 0.0722 * lin.blue;
    if luminance > 0.18 {
        Color32::BLACK
    } else {
        Color32::WHITE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_has_requested_length() {
        assert!(ranked_palette(0).is_empty());
        assert_eq!(ranked_palette(1).len(), 1);
        assert_eq!(ranked_palette(15).len(), 15);
    }

    #[test]
    fn heatmap_ends_pick_readable_text() {
        assert_eq!(contrast_text(heat_color(0.0)), Color32::BLACK);
        assert_eq!(contrast_text(heat_color(1.0)), Color32::WHITE);
    }
}
