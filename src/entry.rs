use serde::{Deserialize, Serialize};

pub const MAX_BASE_STAT: u32 = 255;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ImageRefs {
    #[serde(default)]
    pub front: Option<String>,
    #[serde(default)]
    pub back: Option<String>,
    #[serde(default)]
    pub artwork: Option<String>,
}

impl ImageRefs {
    pub fn primary(&self) -> Option<&str> {
        self.artwork
            .as_deref()
            .filter(|url| !url.is_empty())
            .or_else(|| self.front.as_deref().filter(|url| !url.is_empty()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stat {
    pub name: String,
    pub base_value: u32,
}

impl Stat {
    pub fn display_name(&self) -> String {
        self.name.replace('-', " ")
    }

    pub fn bar_percent(&self) -> f64 {
        stat_bar_percent(self.base_value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: u32,
    pub name: String,
    pub images: ImageRefs,
    pub categories: Vec<String>,
    pub stats: Vec<Stat>,
    pub abilities: Vec<String>,
}

impl Entry {
    pub fn display_label(&self) -> String {
        display_label(self.id)
    }

    pub fn display_name(&self) -> String {
        capitalize(&self.name)
    }

    pub fn has_category(&self, category: &str) -> bool {
        let wanted = category.trim();
        self.categories
            .iter()
            .any(|have| have.eq_ignore_ascii_case(wanted))
    }

    pub fn display_abilities(&self) -> Vec<String> {
        self.abilities
            .iter()
            .map(|ability| ability.replace('-', " "))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRef {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CatalogPage {
    pub results: Vec<EntryRef>,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
}

impl CatalogPage {
    pub fn has_next(&self) -> bool {
        self.next.as_deref().is_some_and(|next| !next.is_empty())
    }

    pub fn has_previous(&self) -> bool {
        self.previous
            .as_deref()
            .is_some_and(|previous| !previous.is_empty())
    }
}

pub fn display_label(id: u32) -> String {
    format!("#{:0>3}", id)
}

pub fn stat_bar_percent(base_value: u32) -> f64 {
    let clamped = base_value.min(MAX_BASE_STAT);
    f64::from(clamped) / f64::from(MAX_BASE_STAT) * 100.0
}

pub fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: u32, name: &str, categories: &[&str]) -> Entry {
        Entry {
            id,
            name: name.into(),
            images: ImageRefs::default(),
            categories: categories.iter().map(|c| c.to_string()).collect(),
            stats: Vec::new(),
            abilities: Vec::new(),
        }
    }

    #[test]
    fn label_pads_to_three_digits() {
        assert_eq!(display_label(7), "#007");
        assert_eq!(display_label(25), "#025");
        assert_eq!(display_label(150), "#150");
        assert_eq!(display_label(1025), "#1025");
    }

    #[test]
    fn stat_bar_scales_against_255() {
        let width = stat_bar_percent(128);
        assert!((width - 50.196).abs() < 0.01, "width was {width}");
        assert_eq!(stat_bar_percent(0), 0.0);
        assert_eq!(stat_bar_percent(255), 100.0);
        assert_eq!(stat_bar_percent(300), 100.0);
    }

    #[test]
    fn primary_image_prefers_artwork() {
        let mut images = ImageRefs {
            front: Some("front.png".into()),
            back: Some("back.png".into()),
            artwork: Some("art.png".into()),
        };
        assert_eq!(images.primary(), Some("art.png"));
        images.artwork = None;
        assert_eq!(images.primary(), Some("front.png"));
        images.front = None;
        assert_eq!(images.primary(), None);
    }

    #[test]
    fn category_match_ignores_case() {
        let pikachu = entry(25, "pikachu", &["electric"]);
        assert!(pikachu.has_category("Electric"));
        assert!(!pikachu.has_category("Water"));
    }

    #[test]
    fn display_helpers() {
        let mime = entry(122, "mr-mime", &["psychic", "fairy"]);
        assert_eq!(mime.display_name(), "Mr-mime");
        let stat = Stat {
            name: "special-attack".into(),
            base_value: 100,
        };
        assert_eq!(stat.display_name(), "special attack");
    }
}
