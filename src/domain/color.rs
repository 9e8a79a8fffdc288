/// Deterministic colors derived from small integer codes.
///
/// Player ids (0..8) and button/gate ids (0..16) are spread evenly around
/// the hue wheel so every id gets a distinct, stable color. A code outside
/// its range is a data-model bug upstream and surfaces as
/// `GameError::InvalidColorCode`.

use crate::error::{GameError, Result};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Rgba { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Rgba { r, g, b, a }
    }

    pub const WHITE: Rgba = Rgba::rgb(255, 255, 255);
    pub const BACKGROUND: Rgba = Rgba::rgb(32, 32, 32);
    pub const WIN_ZONE: Rgba = Rgba::rgba(127, 255, 127, 204);
    pub const WIN_TEXT: Rgba = Rgba::rgb(32, 32, 32);
    pub const MENU_BUTTON: Rgba = Rgba::rgb(100, 240, 100);
    pub const VICTORY: Rgba = Rgba::rgb(100, 255, 100);

    /// Build from HSVA in the conventional ranges:
    /// hue 0..360, saturation/value/alpha 0..100.
    pub fn from_hsva(h: f32, s: f32, v: f32, a: f32) -> Self {
        let s = (s / 100.0).clamp(0.0, 1.0);
        let v = (v / 100.0).clamp(0.0, 1.0);
        let a = (a / 100.0).clamp(0.0, 1.0);
        let h = (h.rem_euclid(360.0)) / 60.0;

        let sector = h.floor();
        let f = h - sector;
        let p = v * (1.0 - s);
        let q = v * (1.0 - s * f);
        let t = v * (1.0 - s * (1.0 - f));

        let (r, g, b) = match sector as u32 {
            0 => (v, t, p),
            1 => (q, v, p),
            2 => (p, v, t),
            3 => (p, q, v),
            4 => (t, p, v),
            _ => (v, p, q),
        };

        Rgba {
            r: to_byte(r),
            g: to_byte(g),
            b: to_byte(b),
            a: to_byte(a),
        }
    }
}

#[inline]
fn to_byte(channel: f32) -> u8 {
    (channel * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Pick a hue for `code` out of `range` evenly spaced slots of `hue_span`
/// degrees, then apply the given saturation/value/alpha.
pub fn rough_hsva_color(code: u32, range: u32, hue_span: f32, s: f32, v: f32, a: f32) -> Result<Rgba> {
    if code >= range {
        return Err(GameError::InvalidColorCode { code, range });
    }
    let hue = (hue_span / range as f32 * code as f32).trunc();
    Ok(Rgba::from_hsva(hue, s, v, a))
}

/// Color slot for 3-bit codes (players).
pub fn byte_color(code: u32, s: f32, v: f32, a: f32) -> Result<Rgba> {
    rough_hsva_color(code, 8, 360.0, s, v, a)
}

/// Color slot for 4-bit codes (buttons and gates).
pub fn hex_color(code: u32, s: f32, v: f32, a: f32) -> Result<Rgba> {
    rough_hsva_color(code, 16, 360.0, s, v, a)
}

pub fn player_color(player_id: u8) -> Result<Rgba> {
    byte_color(player_id as u32, 80.0, 100.0, 85.0)
}

/// Buttons and gates share a palette per id; the active variant is more saturated.
pub fn button_color(button_id: u8, active: bool) -> Result<Rgba> {
    let saturation = if active { 80.0 } else { 60.0 };
    hex_color(button_id as u32, saturation, 100.0, 85.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pure_red_at_hue_zero() {
        let c = Rgba::from_hsva(0.0, 100.0, 100.0, 100.0);
        assert_eq!(c, Rgba::rgb(255, 0, 0));
    }

    #[test]
    fn hue_sectors() {
        assert_eq!(Rgba::from_hsva(120.0, 100.0, 100.0, 100.0), Rgba::rgb(0, 255, 0));
        assert_eq!(Rgba::from_hsva(240.0, 100.0, 100.0, 100.0), Rgba::rgb(0, 0, 255));
        assert_eq!(Rgba::from_hsva(0.0, 0.0, 100.0, 100.0), Rgba::WHITE);
    }

    #[test]
    fn player_colors_are_distinct() {
        let colors: Vec<Rgba> = (0..8).map(|id| player_color(id).unwrap()).collect();
        for i in 0..colors.len() {
            for j in (i + 1)..colors.len() {
                assert_ne!(colors[i], colors[j], "players {i} and {j} share a color");
            }
        }
    }

    #[test]
    fn color_is_deterministic() {
        assert_eq!(button_color(5, true).unwrap(), button_color(5, true).unwrap());
        assert_ne!(button_color(5, true).unwrap(), button_color(5, false).unwrap());
    }

    #[test]
    fn out_of_range_code_is_rejected() {
        assert!(matches!(
            player_color(8),
            Err(GameError::InvalidColorCode { code: 8, range: 8 })
        ));
        assert!(matches!(
            button_color(16, false),
            Err(GameError::InvalidColorCode { code: 16, range: 16 })
        ));
        assert!(button_color(15, false).is_ok());
    }

    #[test]
    fn alpha_follows_percentage() {
        let c = player_color(0).unwrap();
        assert_eq!(c.a, 217); // 85% of 255
    }
}
