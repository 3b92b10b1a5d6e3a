use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// RGB 颜色（8 位分量，覆盖完整 RGB 空间）。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let [r, g, b]: [u8; 3] = rng.gen();
        Self { r, g, b }
    }

    /// 渲染器使用的归一化分量（每个分量落在 [0,1] 区间）。
    pub fn normalized(&self) -> [f32; 3] {
        [
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
        ]
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseColorError {
    pub input: String,
}

impl fmt::Display for ParseColorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid color literal: {}", self.input)
    }
}

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseColorError {
            input: value.to_string(),
        };
        let hex = value.strip_prefix('#').ok_or_else(invalid)?;
        // 按字节校验长度与字符集；非 ASCII 输入在切片之前就被拒绝。
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let component = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| invalid())
        };
        Ok(Self {
            r: component(0..2)?,
            g: component(2..4)?,
            b: component(4..6)?,
        })
    }
}

/// 生成 `pairs` 对颜色：每个随机颜色恰好出现两次。
///
/// 不保证不同对之间的颜色互异，这里保留原始行为（见 DESIGN.md）。
pub fn generate_pairs<R: Rng + ?Sized>(pairs: u32, rng: &mut R) -> Vec<Color> {
    let mut colors = Vec::with_capacity(pairs as usize * 2);
    for _ in 0..pairs {
        let color = Color::random(rng);
        colors.push(color);
        colors.push(color);
    }
    colors
}

/// 生成成对颜色并洗牌，得到整副牌堆。
pub fn build_deck<R: Rng + ?Sized>(pairs: u32, rng: &mut R) -> Vec<Color> {
    let mut deck = generate_pairs(pairs, rng);
    deck.shuffle(rng);
    deck
}
