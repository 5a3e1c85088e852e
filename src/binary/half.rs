//! IEEE-754 binary16 conversion
//!
//! Stroke width and alpha are stored as half floats. Conversion from `f32`
//! rounds to nearest, ties to even; overflow saturates to infinity.

/// Convert an `f32` to half-float bits
pub fn f32_to_f16_bits(value: f32) -> u16 {
    let bits = value.to_bits();
    let sign = ((bits >> 16) & 0x8000) as u16;
    let exp = ((bits >> 23) & 0xff) as i32;
    let mantissa = bits & 0x007f_ffff;

    // Inf / NaN
    if exp == 0xff {
        let nan = if mantissa != 0 { 0x0200 } else { 0 };
        return sign | 0x7c00 | nan;
    }

    let half_exp = exp - 127 + 15;
    if half_exp >= 0x1f {
        return sign | 0x7c00;
    }

    if half_exp <= 0 {
        // Too small even for a subnormal
        if half_exp < -10 {
            return sign;
        }
        let m = mantissa | 0x0080_0000;
        let shift = (14 - half_exp) as u32;
        let half_m = m >> shift;
        let round_bit = 1u32 << (shift - 1);
        let rounded = if (m & round_bit) != 0 && (m & (3 * round_bit - 1)) != 0 {
            half_m + 1
        } else {
            half_m
        };
        return sign | rounded as u16;
    }

    let round_bit = 0x0000_1000;
    let mut out = ((half_exp as u32) << 10) | (mantissa >> 13);
    // A carry out of the mantissa correctly bumps the exponent
    if (mantissa & round_bit) != 0 && (mantissa & (3 * round_bit - 1)) != 0 {
        out += 1;
    }
    sign | out as u16
}

/// Convert half-float bits to an `f32`
pub fn f16_bits_to_f32(bits: u16) -> f32 {
    let sign = ((bits & 0x8000) as u32) << 16;
    let exp = ((bits >> 10) & 0x1f) as u32;
    let mantissa = (bits & 0x03ff) as u32;

    match (exp, mantissa) {
        (0, 0) => f32::from_bits(sign),
        (0, m) => {
            // subnormal: m * 2^-24
            let magnitude = m as f32 / 16_777_216.0;
            if sign != 0 {
                -magnitude
            } else {
                magnitude
            }
        }
        (0x1f, 0) => f32::from_bits(sign | 0x7f80_0000),
        (0x1f, m) => f32::from_bits(sign | 0x7fc0_0000 | (m << 13)),
        (e, m) => f32::from_bits(sign | ((e + 127 - 15) << 23) | (m << 13)),
    }
}

/// Round an `f32` through half precision
pub fn quantize(value: f32) -> f32 {
    f16_bits_to_f32(f32_to_f16_bits(value))
}
