use std::sync::Arc;

use anyhow::{anyhow, Context, Result};

use crate::catalog;
use crate::entry::{CatalogPage, Entry, EntryRef, ImageRefs, Stat};

pub trait CatalogService: Send + Sync {
    fn fetch_page(&self, limit: usize, offset: usize) -> Result<CatalogPage>;
    fn fetch_detail(&self, identifier: &str) -> Result<Entry>;
    fn fetch_categories(&self) -> Result<Vec<String>>;
    fn search_references(&self, query: &str) -> Result<Vec<EntryRef>>;
}

pub struct PokeApiCatalogService {
    client: Arc<catalog::Client>,
}

impl PokeApiCatalogService {
    pub fn new(client: Arc<catalog::Client>) -> Self {
        Self { client }
    }
}

impl CatalogService for PokeApiCatalogService {
    fn fetch_page(&self, limit: usize, offset: usize) -> Result<CatalogPage> {
        self.client
            .fetch_page(limit, offset)
            .with_context(|| format!("fetch catalog page (limit {limit}, offset {offset})"))
    }

    fn fetch_detail(&self, identifier: &str) -> Result<Entry> {
        self.client
            .fetch_detail(identifier)
            .with_context(|| format!("fetch entry detail for {identifier:?}"))
    }

    fn fetch_categories(&self) -> Result<Vec<String>> {
        self.client
            .fetch_categories()
            .context("fetch category list")
    }

    fn search_references(&self, query: &str) -> Result<Vec<EntryRef>> {
        self.client
            .search_references(query)
            .with_context(|| format!("search catalog for {query:?}"))
    }
}

/// Offline catalog backing `--demo` and the tests.
#[derive(Debug, Clone)]
pub struct MockCatalogService {
    entries: Vec<Entry>,
}

impl Default for MockCatalogService {
    fn default() -> Self {
        Self::new(sample_entries())
    }
}

impl MockCatalogService {
    pub fn new(entries: Vec<Entry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }
}

impl CatalogService for MockCatalogService {
    fn fetch_page(&self, limit: usize, offset: usize) -> Result<CatalogPage> {
        let total = self.entries.len();
        let start = offset.min(total);
        let end = start.saturating_add(limit).min(total);
        let results = self.entries[start..end]
            .iter()
            .map(|entry| EntryRef {
                name: entry.name.clone(),
                url: format!("demo://pokemon/{}", entry.id),
            })
            .collect();
        Ok(CatalogPage {
            results,
            count: total as u64,
            next: (end < total).then(|| format!("demo://pokemon?offset={end}&limit={limit}")),
            previous: (start > 0).then(|| {
                let prev = start.saturating_sub(limit);
                format!("demo://pokemon?offset={prev}&limit={limit}")
            }),
        })
    }

    fn fetch_detail(&self, identifier: &str) -> Result<Entry> {
        let wanted = identifier.trim().to_lowercase();
        self.entries
            .iter()
            .find(|entry| entry.name == wanted || entry.id.to_string() == wanted)
            .cloned()
            .ok_or_else(|| anyhow!("no catalog entry named {wanted:?}"))
    }

    fn fetch_categories(&self) -> Result<Vec<String>> {
        let mut categories: Vec<String> = Vec::new();
        for entry in &self.entries {
            for category in &entry.categories {
                if !categories.contains(category) {
                    categories.push(category.clone());
                }
            }
        }
        categories.sort();
        Ok(categories)
    }

    fn search_references(&self, query: &str) -> Result<Vec<EntryRef>> {
        let needle = query.trim().to_lowercase();
        Ok(self
            .entries
            .iter()
            .filter(|entry| entry.name.contains(&needle))
            .map(|entry| EntryRef {
                name: entry.name.clone(),
                url: format!("demo://pokemon/{}", entry.id),
            })
            .collect())
    }
}

fn sample_entry(
    id: u32,
    name: &str,
    categories: &[&str],
    stats: [u32; 6],
    abilities: &[&str],
) -> Entry {
    const STAT_NAMES: [&str; 6] = [
        "hp",
        "attack",
        "defense",
        "special-attack",
        "special-defense",
        "speed",
    ];
    let sprite_base = "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon";
    Entry {
        id,
        name: name.to_string(),
        images: ImageRefs {
            front: Some(format!("{sprite_base}/{id}.png")),
            back: Some(format!("{sprite_base}/back/{id}.png")),
            artwork: Some(format!("{sprite_base}/other/official-artwork/{id}.png")),
        },
        categories: categories.iter().map(|c| c.to_string()).collect(),
        stats: STAT_NAMES
            .iter()
            .zip(stats)
            .map(|(name, base_value)| Stat {
                name: name.to_string(),
                base_value,
            })
            .collect(),
        abilities: abilities.iter().map(|a| a.to_string()).collect(),
    }
}

#[rustfmt::skip]
pub fn sample_entries() -> Vec<Entry> {
    vec![
        sample_entry(1, "bulbasaur", &["grass", "poison"], [45, 49, 49, 65, 65, 45], &["overgrow", "chlorophyll"]),
        sample_entry(4, "charmander", &["fire"], [39, 52, 43, 60, 50, 65], &["blaze", "solar-power"]),
        sample_entry(6, "charizard", &["fire", "flying"], [78, 84, 78, 109, 85, 100], &["blaze", "solar-power"]),
        sample_entry(7, "squirtle", &["water"], [44, 48, 65, 50, 64, 43], &["torrent", "rain-dish"]),
        sample_entry(25, "pikachu", &["electric"], [35, 55, 40, 50, 50, 90], &["static", "lightning-rod"]),
        sample_entry(39, "jigglypuff", &["normal", "fairy"], [115, 45, 20, 45, 25, 20], &["cute-charm", "competitive"]),
        sample_entry(66, "machop", &["fighting"], [70, 80, 50, 35, 35, 35], &["guts", "no-guard"]),
        sample_entry(74, "geodude", &["rock", "ground"], [40, 80, 100, 30, 30, 20], &["rock-head", "sturdy"]),
        sample_entry(81, "magnemite", &["electric", "steel"], [25, 35, 70, 95, 55, 45], &["magnet-pull", "sturdy"]),
        sample_entry(92, "gastly", &["ghost", "poison"], [30, 35, 30, 100, 35, 80], &["levitate"]),
        sample_entry(122, "mr-mime", &["psychic", "fairy"], [40, 45, 65, 100, 120, 90], &["soundproof", "filter"]),
        sample_entry(123, "scyther", &["bug", "flying"], [70, 110, 80, 55, 80, 105], &["swarm", "technician"]),
        sample_entry(131, "lapras", &["water", "ice"], [130, 85, 80, 85, 95, 60], &["water-absorb", "shell-armor"]),
        sample_entry(143, "snorlax", &["normal"], [160, 110, 65, 65, 110, 30], &["immunity", "thick-fat"]),
        sample_entry(149, "dragonite", &["dragon", "flying"], [91, 134, 95, 100, 100, 80], &["inner-focus", "multiscale"]),
        sample_entry(150, "mewtwo", &["psychic"], [106, 110, 90, 154, 90, 130], &["pressure", "unnerve"]),
        sample_entry(197, "umbreon", &["dark"], [95, 65, 110, 60, 130, 65], &["synchronize", "inner-focus"]),
        sample_entry(213, "shuckle", &["bug", "rock"], [20, 10, 230, 10, 230, 5], &["sturdy", "gluttony"]),
        sample_entry(242, "blissey", &["normal"], [255, 10, 10, 75, 135, 55], &["natural-cure", "serene-grace"]),
        sample_entry(282, "gardevoir", &["psychic", "fairy"], [68, 65, 65, 125, 115, 80], &["synchronize", "trace"]),
        sample_entry(448, "lucario", &["fighting", "steel"], [70, 110, 70, 115, 70, 90], &["steadfast", "inner-focus"]),
        sample_entry(700, "sylveon", &["fairy"], [95, 65, 65, 110, 130, 60], &["cute-charm", "pixilate"]),
    ]
}
