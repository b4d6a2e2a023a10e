use colorgrad::Gradient;
use plotters::style::RGBColor;

/// Categorical palette for foreground groups, cycled by group index
pub const CATEGORICAL: [RGBColor; 5] = [
    RGBColor(255, 0, 0),
    RGBColor(0, 128, 0),
    RGBColor(255, 165, 0),
    RGBColor(0, 0, 255),
    RGBColor(128, 0, 128),
];

/// Colour for background populations
pub const LIGHT_GRAY: RGBColor = RGBColor(211, 211, 211);

/// Colour of the `index`-th foreground group
pub fn categorical_color(index: usize) -> RGBColor {
    CATEGORICAL[index % CATEGORICAL.len()]
}

/// Continuous colour maps for expression values
///
/// All maps are perceptually uniform sequential gradients from colorgrad.
/// `Viridis` is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMaps {
    #[default]
    Viridis,
    Plasma,
    Inferno,
    Magma,
    Turbo,
    Cividis,
}

impl ColorMaps {
    /// Map a value in `[0, 1]` to a colour; values outside are clamped
    pub fn map(&self, value: f32) -> RGBColor {
        let clamped = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
        let [r, g, b, _] = match self {
            ColorMaps::Viridis => colorgrad::preset::viridis().at(clamped).to_rgba8(),
            ColorMaps::Plasma => colorgrad::preset::plasma().at(clamped).to_rgba8(),
            ColorMaps::Inferno => colorgrad::preset::inferno().at(clamped).to_rgba8(),
            ColorMaps::Magma => colorgrad::preset::magma().at(clamped).to_rgba8(),
            ColorMaps::Turbo => colorgrad::preset::turbo().at(clamped).to_rgba8(),
            ColorMaps::Cividis => colorgrad::preset::cividis().at(clamped).to_rgba8(),
        };
        RGBColor(r, g, b)
    }
}

impl std::str::FromStr for ColorMaps {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "viridis" => Ok(ColorMaps::Viridis),
            "plasma" => Ok(ColorMaps::Plasma),
            "inferno" => Ok(ColorMaps::Inferno),
            "magma" => Ok(ColorMaps::Magma),
            "turbo" => Ok(ColorMaps::Turbo),
            "cividis" => Ok(ColorMaps::Cividis),
            other => Err(anyhow::anyhow!("Unknown colour map '{}'", other)),
        }
    }
}
