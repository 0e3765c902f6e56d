use ratatui::style::Color;

pub const KNOWN_CATEGORIES: [&str; 18] = [
    "bug", "dark", "dragon", "electric", "fairy", "fighting", "fire", "flying", "ghost", "grass",
    "ground", "ice", "normal", "poison", "psychic", "rock", "steel", "water",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "light" => Theme::Light,
            _ => Theme::Dark,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    pub fn palette(self) -> Palette {
        match self {
            Theme::Dark => DARK,
            Theme::Light => LIGHT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub bg: Color,
    pub panel_bg: Color,
    pub panel_focused_bg: Color,
    pub panel_selected_bg: Color,
    pub border_idle: Color,
    pub border_focused: Color,
    pub text_primary: Color,
    pub text_secondary: Color,
    pub accent: Color,
    pub highlight: Color,
    pub success: Color,
    pub error: Color,
    pub bar: Color,
}

const DARK: Palette = Palette {
    bg: Color::Rgb(30, 30, 46),
    panel_bg: Color::Rgb(24, 24, 36),
    panel_focused_bg: Color::Rgb(49, 50, 68),
    panel_selected_bg: Color::Rgb(69, 71, 90),
    border_idle: Color::Rgb(49, 50, 68),
    border_focused: Color::Rgb(137, 180, 250),
    text_primary: Color::Rgb(205, 214, 244),
    text_secondary: Color::Rgb(166, 173, 200),
    accent: Color::Rgb(137, 180, 250),
    highlight: Color::Rgb(249, 226, 175),
    success: Color::Rgb(166, 227, 161),
    error: Color::Rgb(243, 139, 168),
    bar: Color::Rgb(116, 199, 236),
};

const LIGHT: Palette = Palette {
    bg: Color::Rgb(249, 250, 251),
    panel_bg: Color::Rgb(255, 255, 255),
    panel_focused_bg: Color::Rgb(229, 231, 235),
    panel_selected_bg: Color::Rgb(254, 243, 199),
    border_idle: Color::Rgb(209, 213, 219),
    border_focused: Color::Rgb(59, 130, 246),
    text_primary: Color::Rgb(17, 24, 39),
    text_secondary: Color::Rgb(107, 114, 128),
    accent: Color::Rgb(37, 99, 235),
    highlight: Color::Rgb(202, 138, 4),
    success: Color::Rgb(22, 163, 74),
    error: Color::Rgb(220, 38, 38),
    bar: Color::Rgb(59, 130, 246),
};

/// Badge color for a category; unknown categories get a neutral gray.
pub fn category_color(category: &str) -> Color {
    match category.trim().to_ascii_lowercase().as_str() {
        "bug" => Color::Rgb(22, 163, 74),
        "dark" => Color::Rgb(40, 40, 40),
        "dragon" => Color::Rgb(30, 64, 175),
        "electric" => Color::Rgb(250, 204, 21),
        "fairy" => Color::Rgb(249, 168, 212),
        "fighting" => Color::Rgb(220, 38, 38),
        "fire" => Color::Rgb(249, 115, 22),
        "flying" => Color::Rgb(209, 213, 219),
        "ghost" => Color::Rgb(107, 33, 168),
        "grass" => Color::Rgb(34, 197, 94),
        "ground" => Color::Rgb(161, 98, 7),
        "ice" => Color::Rgb(147, 197, 253),
        "normal" => Color::Rgb(156, 163, 175),
        "poison" => Color::Rgb(147, 51, 234),
        "psychic" => Color::Rgb(236, 72, 153),
        "rock" => Color::Rgb(133, 77, 14),
        "steel" => Color::Rgb(75, 85, 99),
        "water" => Color::Rgb(59, 130, 246),
        _ => Color::Rgb(120, 120, 120),
    }
}

/// Dark text on the pale badges, light text elsewhere.
pub fn category_text_color(category: &str) -> Color {
    match category.trim().to_ascii_lowercase().as_str() {
        "electric" | "fairy" | "flying" | "ice" | "normal" => Color::Rgb(17, 24, 39),
        _ => Color::Rgb(255, 255, 255),
    }
}
