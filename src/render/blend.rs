//! Per-pixel blend functions.
//!
//! Every function composites one source pixel over one destination pixel
//! with a layer opacity, returning the new destination. Channels are
//! straight (non-premultiplied) 8-bit values.
//!
//! Three families share the module: separable modes expressed in
//! normalized floats (multiply through linear burn), integer modes
//! with exact fixed-point formulas (linear light through divide), and
//! HSL modes that recombine hue, saturation and luminosity between the
//! two pixels. Dissolve needs per-pixel dithering and deliberately
//! falls back to normal.

use super::Rgba;

/// Signature shared by every blend mode.
pub type BlendFn = fn(Rgba, Rgba, u8) -> Rgba;

/// Resolve a blend mode to its function. Accepts both long-form names
/// and raw 4-byte keys; unknown modes blend as normal.
pub fn blend_fn(mode: &str) -> BlendFn {
    match mode {
        "normal" | "norm" => normal,
        "multiply" | "mul " => multiply,
        "screen" | "scrn" => screen,
        "overlay" | "over" => overlay,
        "darken" | "dark" => darken,
        "lighten" | "lite" => lighten,
        "color_dodge" | "div " => color_dodge,
        "color_burn" | "idiv" => color_burn,
        "hard_light" | "hLit" => hard_light,
        "soft_light" | "sLit" => soft_light,
        "difference" | "diff" => difference,
        "exclusion" | "smud" => exclusion,
        "linear_dodge" | "lddg" => linear_dodge,
        "linear_burn" | "lbrn" => linear_burn,
        "linear_light" | "lLit" => linear_light,
        "vivid_light" | "vLit" => vivid_light,
        "pin_light" | "pLit" => pin_light,
        "hard_mix" | "hMix" => hard_mix,
        "subtract" | "fsub" => subtract,
        "divide" | "fdiv" => divide,
        "hue" | "hue " => hue,
        "saturation" | "sat " => saturation,
        "color" | "colr" => color,
        "luminosity" | "lum " => luminosity,
        "darker_color" | "dkCl" => darker_color,
        "lighter_color" | "lgCl" => lighter_color,
        "dissolve" | "diss" => dissolve,
        "passthrough" | "pass" => normal,
        _ => normal,
    }
}

/// Source-over compositing in integer arithmetic.
pub fn normal(src: Rgba, dst: Rgba, opacity: u8) -> Rgba {
    let alpha = u32::from(opacity) * u32::from(src.a) / 255;
    if alpha == 0 {
        return dst;
    }
    if alpha == 255 && dst.a == 0 {
        return src;
    }

    let da = u32::from(dst.a);
    let out_alpha = alpha + da * (255 - alpha) / 255;
    if out_alpha == 0 {
        return Rgba::TRANSPARENT;
    }

    let ch = |s: u8, d: u8| -> u8 {
        ((u32::from(s) * alpha + u32::from(d) * da * (255 - alpha) / 255) / out_alpha) as u8
    };

    Rgba {
        r: ch(src.r, dst.r),
        g: ch(src.g, dst.g),
        b: ch(src.b, dst.b),
        a: out_alpha as u8,
    }
}

// Separable float modes

fn blend_float(src: Rgba, dst: Rgba, opacity: u8, f: fn(f64, f64) -> f64) -> Rgba {
    let (sr, sg, sb, sa) = to_float(src);
    let (dr, dg, db, da) = to_float(dst);

    let alpha = f64::from(opacity) / 255.0 * sa;
    if alpha == 0.0 {
        return dst;
    }

    let out_alpha = alpha + da * (1.0 - alpha);
    if out_alpha == 0.0 {
        return Rgba::TRANSPARENT;
    }

    let ch = |s: f64, d: f64| -> u8 {
        let blended = f(s, d);
        let out = (blended * alpha + d * da * (1.0 - alpha)) / out_alpha;
        clamp_unit(out)
    };

    Rgba {
        r: ch(sr, dr),
        g: ch(sg, dg),
        b: ch(sb, db),
        a: clamp_unit(out_alpha),
    }
}

fn to_float(p: Rgba) -> (f64, f64, f64, f64) {
    (
        f64::from(p.r) / 255.0,
        f64::from(p.g) / 255.0,
        f64::from(p.b) / 255.0,
        f64::from(p.a) / 255.0,
    )
}

fn clamp_unit(v: f64) -> u8 {
    (v * 255.0).clamp(0.0, 255.0) as u8
}

pub fn multiply(src: Rgba, dst: Rgba, opacity: u8) -> Rgba {
    blend_float(src, dst, opacity, |s, d| s * d)
}

pub fn screen(src: Rgba, dst: Rgba, opacity: u8) -> Rgba {
    blend_float(src, dst, opacity, |s, d| 1.0 - (1.0 - s) * (1.0 - d))
}

pub fn overlay(src: Rgba, dst: Rgba, opacity: u8) -> Rgba {
    blend_float(src, dst, opacity, |s, d| {
        if d < 0.5 {
            2.0 * s * d
        } else {
            1.0 - 2.0 * (1.0 - s) * (1.0 - d)
        }
    })
}

pub fn darken(src: Rgba, dst: Rgba, opacity: u8) -> Rgba {
    blend_float(src, dst, opacity, f64::min)
}

pub fn lighten(src: Rgba, dst: Rgba, opacity: u8) -> Rgba {
    blend_float(src, dst, opacity, f64::max)
}

pub fn color_dodge(src: Rgba, dst: Rgba, opacity: u8) -> Rgba {
    blend_float(src, dst, opacity, |s, d| {
        if s >= 1.0 { 1.0 } else { (d / (1.0 - s)).min(1.0) }
    })
}

pub fn color_burn(src: Rgba, dst: Rgba, opacity: u8) -> Rgba {
    blend_float(src, dst, opacity, |s, d| {
        if s <= 0.0 { 0.0 } else { (1.0 - (1.0 - d) / s).max(0.0) }
    })
}

pub fn hard_light(src: Rgba, dst: Rgba, opacity: u8) -> Rgba {
    blend_float(src, dst, opacity, |s, d| {
        if s < 0.5 {
            2.0 * s * d
        } else {
            1.0 - 2.0 * (1.0 - s) * (1.0 - d)
        }
    })
}

/// Soft light using the Pegtop formula.
pub fn soft_light(src: Rgba, dst: Rgba, opacity: u8) -> Rgba {
    blend_float(src, dst, opacity, |s, d| (1.0 - 2.0 * s) * d * d + 2.0 * s * d)
}

pub fn difference(src: Rgba, dst: Rgba, opacity: u8) -> Rgba {
    blend_float(src, dst, opacity, |s, d| (s - d).abs())
}

pub fn exclusion(src: Rgba, dst: Rgba, opacity: u8) -> Rgba {
    blend_float(src, dst, opacity, |s, d| s + d - 2.0 * s * d)
}

pub fn linear_dodge(src: Rgba, dst: Rgba, opacity: u8) -> Rgba {
    blend_float(src, dst, opacity, |s, d| (s + d).min(1.0))
}

pub fn linear_burn(src: Rgba, dst: Rgba, opacity: u8) -> Rgba {
    blend_float(src, dst, opacity, |s, d| (s + d - 1.0).max(0.0))
}

// Integer fixed-point modes

fn blend_integer(src: Rgba, dst: Rgba, opacity: u8, f: fn(u8, u8) -> u8) -> Rgba {
    let alpha = u32::from(opacity) * u32::from(src.a) / 255;
    if alpha == 0 {
        return dst;
    }
    if dst.a == 0 {
        return Rgba { a: alpha as u8, ..src };
    }

    let da = u32::from(dst.a);
    let out_alpha = alpha + da * (255 - alpha) / 255;
    if out_alpha == 0 {
        return Rgba::TRANSPARENT;
    }

    let ch = |s: u8, d: u8| -> u8 {
        let blended = u32::from(f(s, d));
        ((blended * alpha + u32::from(d) * da * (255 - alpha) / 255) / out_alpha) as u8
    };

    Rgba {
        r: ch(src.r, dst.r),
        g: ch(src.g, dst.g),
        b: ch(src.b, dst.b),
        a: out_alpha as u8,
    }
}

/// Linear light, kept in shifted fixed-point form so half-gray source
/// pixels pass the destination through unchanged.
pub fn linear_light(src: Rgba, dst: Rgba, opacity: u8) -> Rgba {
    if dst.a == 0 {
        let out_a = (u32::from(src.a) * u32::from(opacity) / 255) as u8;
        return Rgba { a: out_a, ..src };
    }
    if src.a == 0 {
        return dst;
    }

    let src_alpha = (u32::from(src.a) * u32::from(opacity)) >> 8;
    let dst_alpha = u32::from(dst.a);
    let mix_denom = src_alpha + (((256 - src_alpha) * dst_alpha) >> 8);
    let mix_alpha = if mix_denom == 0 { 0 } else { (src_alpha << 8) / mix_denom };
    let out_alpha = dst_alpha + (((256 - dst_alpha) * src_alpha) >> 8);

    let ch = |s: u8, d: u8| -> u8 {
        let blended = if d < 255 {
            (u32::from(s) * u32::from(s) / u32::from(255 - d)).min(255)
        } else {
            255
        };
        let d = i64::from(d);
        let mixed = ((d << 8) + (i64::from(blended) - d) * i64::from(mix_alpha)) >> 8;
        mixed.clamp(0, 255) as u8
    };

    Rgba {
        r: ch(src.r, dst.r),
        g: ch(src.g, dst.g),
        b: ch(src.b, dst.b),
        a: out_alpha.min(255) as u8,
    }
}

pub fn vivid_light(src: Rgba, dst: Rgba, opacity: u8) -> Rgba {
    blend_integer(src, dst, opacity, |s, d| {
        if s == 255 && d == 255 {
            return 255;
        }
        if s == 255 {
            return d;
        }
        if d == 255 {
            return 255;
        }
        let term1 = u32::from(d) * u32::from(d) / u32::from(255 - s);
        let term2 = u32::from(s) * u32::from(s) / u32::from(255 - d);
        ((term1 + term2) >> 1).min(255) as u8
    })
}

pub fn pin_light(src: Rgba, dst: Rgba, opacity: u8) -> Rgba {
    blend_integer(src, dst, opacity, |s, d| {
        if s >= 128 {
            d.max(((u16::from(s) - 128) * 2).min(255) as u8)
        } else {
            d.min((u16::from(s) * 2).min(255) as u8)
        }
    })
}

pub fn hard_mix(src: Rgba, dst: Rgba, opacity: u8) -> Rgba {
    blend_integer(src, dst, opacity, |s, d| {
        if u16::from(s) + u16::from(d) <= 255 { 0 } else { 255 }
    })
}

pub fn subtract(src: Rgba, dst: Rgba, opacity: u8) -> Rgba {
    blend_integer(src, dst, opacity, |s, d| d.saturating_sub(s))
}

pub fn divide(src: Rgba, dst: Rgba, opacity: u8) -> Rgba {
    blend_integer(src, dst, opacity, |s, d| {
        if s == 0 {
            255
        } else {
            (u32::from(d) * 255 / u32::from(s)).min(255) as u8
        }
    })
}

// HSL modes

fn blend_hsl(
    src: Rgba,
    dst: Rgba,
    opacity: u8,
    combine: fn((f64, f64, f64), (f64, f64, f64)) -> (f64, f64, f64),
) -> Rgba {
    let alpha = u32::from(opacity) * u32::from(src.a) / 255;
    if alpha == 0 {
        return dst;
    }
    if dst.a == 0 {
        return Rgba { a: alpha as u8, ..src };
    }

    let src_hsl = rgb_to_hsl(src.r, src.g, src.b);
    let dst_hsl = rgb_to_hsl(dst.r, dst.g, dst.b);
    let (h, s, l) = combine(src_hsl, dst_hsl);
    let (br, bg, bb) = hsl_to_rgb(h, s, l);

    let da = u32::from(dst.a);
    let out_alpha = alpha + da * (255 - alpha) / 255;
    if out_alpha == 0 {
        return Rgba::TRANSPARENT;
    }

    let ch = |blended: u8, d: u8| -> u8 {
        ((u32::from(blended) * alpha + u32::from(d) * da * (255 - alpha) / 255) / out_alpha) as u8
    };

    Rgba {
        r: ch(br, dst.r),
        g: ch(bg, dst.g),
        b: ch(bb, dst.b),
        a: out_alpha as u8,
    }
}

/// Hue from source; saturation and luminosity from destination.
pub fn hue(src: Rgba, dst: Rgba, opacity: u8) -> Rgba {
    blend_hsl(src, dst, opacity, |s, d| (s.0, d.1, d.2))
}

/// Saturation from source; hue and luminosity from destination.
pub fn saturation(src: Rgba, dst: Rgba, opacity: u8) -> Rgba {
    blend_hsl(src, dst, opacity, |s, d| (d.0, s.1, d.2))
}

/// Hue and saturation from source; luminosity from destination.
pub fn color(src: Rgba, dst: Rgba, opacity: u8) -> Rgba {
    blend_hsl(src, dst, opacity, |s, d| (s.0, s.1, d.2))
}

/// Luminosity from source; hue and saturation from destination.
pub fn luminosity(src: Rgba, dst: Rgba, opacity: u8) -> Rgba {
    blend_hsl(src, dst, opacity, |s, d| (d.0, d.1, s.2))
}

// Luma comparison modes, using the 299/587/114 weighting.

fn luma(p: Rgba) -> u32 {
    u32::from(p.r) * 299 + u32::from(p.g) * 587 + u32::from(p.b) * 114
}

fn blend_picked(src: Rgba, dst: Rgba, opacity: u8, pick_src: bool) -> Rgba {
    let alpha = u32::from(opacity) * u32::from(src.a) / 255;
    if alpha == 0 {
        return dst;
    }
    if dst.a == 0 {
        return Rgba { a: alpha as u8, ..src };
    }

    let picked = if pick_src { src } else { dst };
    let da = u32::from(dst.a);
    let out_alpha = alpha + da * (255 - alpha) / 255;
    if out_alpha == 0 {
        return Rgba::TRANSPARENT;
    }

    let ch = |blended: u8, d: u8| -> u8 {
        ((u32::from(blended) * alpha + u32::from(d) * da * (255 - alpha) / 255) / out_alpha) as u8
    };

    Rgba {
        r: ch(picked.r, dst.r),
        g: ch(picked.g, dst.g),
        b: ch(picked.b, dst.b),
        a: out_alpha as u8,
    }
}

pub fn darker_color(src: Rgba, dst: Rgba, opacity: u8) -> Rgba {
    blend_picked(src, dst, opacity, luma(src) < luma(dst))
}

pub fn lighter_color(src: Rgba, dst: Rgba, opacity: u8) -> Rgba {
    blend_picked(src, dst, opacity, luma(src) > luma(dst))
}

/// Dissolve needs per-pixel random dithering; composited as normal.
pub fn dissolve(src: Rgba, dst: Rgba, opacity: u8) -> Rgba {
    normal(src, dst, opacity)
}

fn rgb_to_hsl(r: u8, g: u8, b: u8) -> (f64, f64, f64) {
    let rf = f64::from(r) / 255.0;
    let gf = f64::from(g) / 255.0;
    let bf = f64::from(b) / 255.0;

    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;

    let l = (max + min) / 2.0;
    if delta == 0.0 {
        return (0.0, 0.0, l);
    }

    let s = if l < 0.5 {
        delta / (max + min)
    } else {
        delta / (2.0 - max - min)
    };

    let mut h = if max == rf {
        let mut h = (gf - bf) / delta;
        if gf < bf {
            h += 6.0;
        }
        h
    } else if max == gf {
        (bf - rf) / delta + 2.0
    } else {
        (rf - gf) / delta + 4.0
    };
    h *= 60.0;

    (h, s, l)
}

fn hsl_to_rgb(h: f64, s: f64, l: f64) -> (u8, u8, u8) {
    if s == 0.0 {
        let v = (l * 255.0) as u8;
        return (v, v, v);
    }

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;

    fn hue_to_rgb(p: f64, q: f64, mut t: f64) -> f64 {
        if t < 0.0 {
            t += 1.0;
        }
        if t > 1.0 {
            t -= 1.0;
        }
        if t < 1.0 / 6.0 {
            p + (q - p) * 6.0 * t
        } else if t < 0.5 {
            q
        } else if t < 2.0 / 3.0 {
            p + (q - p) * (2.0 / 3.0 - t) * 6.0
        } else {
            p
        }
    }

    let h = h / 360.0;
    (
        (hue_to_rgb(p, q, h + 1.0 / 3.0) * 255.0) as u8,
        (hue_to_rgb(p, q, h) * 255.0) as u8,
        (hue_to_rgb(p, q, h - 1.0 / 3.0) * 255.0) as u8,
    )
}
