use std::fmt;
use std::str::FromStr;

/// 8 位 RGBA 颜色（非预乘）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::opaque(0, 0, 0);
    pub const WHITE: Rgba = Rgba::opaque(255, 255, 255);

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// `#rrggbb`（不含透明度，透明度通过 `opacity()` 单独输出到 SVG）
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn opacity(self) -> f32 {
        f32::from(self.a) / 255.0
    }
}

/// 颜色解析失败
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported color '{0}' (expected #rgb, #rgba, #rrggbb, #rrggbbaa or a basic color name)")]
pub struct ColorParseError(pub String);

impl FromStr for Rgba {
    type Err = ColorParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let s = raw.trim();
        let err = || ColorParseError(raw.to_string());

        if let Some(hex) = s.strip_prefix('#') {
            if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(err());
            }
            let nibble = |i: usize| u8::from_str_radix(&hex[i..=i], 16).map(|v| v * 17);
            let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16);
            let parsed = match hex.len() {
                3 | 4 => (|| {
                    Ok::<_, std::num::ParseIntError>(Rgba {
                        r: nibble(0)?,
                        g: nibble(1)?,
                        b: nibble(2)?,
                        a: if hex.len() == 4 { nibble(3)? } else { 255 },
                    })
                })(),
                6 | 8 => (|| {
                    Ok::<_, std::num::ParseIntError>(Rgba {
                        r: byte(0)?,
                        g: byte(2)?,
                        b: byte(4)?,
                        a: if hex.len() == 8 { byte(6)? } else { 255 },
                    })
                })(),
                _ => return Err(err()),
            };
            return parsed.map_err(|_| err());
        }

        named_color(&s.to_ascii_lowercase()).ok_or_else(err)
    }
}

fn named_color(name: &str) -> Option<Rgba> {
    let c = match name {
        "black" => Rgba::BLACK,
        "white" => Rgba::WHITE,
        "red" => Rgba::opaque(255, 0, 0),
        "green" => Rgba::opaque(0, 128, 0),
        "lime" => Rgba::opaque(0, 255, 0),
        "blue" => Rgba::opaque(0, 0, 255),
        "yellow" => Rgba::opaque(255, 255, 0),
        "orange" => Rgba::opaque(255, 165, 0),
        "purple" => Rgba::opaque(128, 0, 128),
        "pink" => Rgba::opaque(255, 192, 203),
        "gray" | "grey" => Rgba::opaque(128, 128, 128),
        "transparent" => Rgba {
            r: 0,
            g: 0,
            b: 0,
            a: 0,
        },
        _ => return None,
    };
    Some(c)
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "{}", self.to_hex())
        } else {
            write!(f, "{}{:02x}", self.to_hex(), self.a)
        }
    }
}
