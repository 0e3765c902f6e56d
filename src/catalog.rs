use std::time::Duration;

use anyhow::{bail, Context, Result};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::USER_AGENT;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::entry::{CatalogPage, Entry, EntryRef, ImageRefs, Stat};

pub const POKEAPI_BASE: &str = "https://pokeapi.co/api/v2";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Reference window scanned by the global name search.
pub const SEARCH_WINDOW: usize = 1000;

const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned status {status}")]
    Status { url: String, status: StatusCode },
    #[error("no catalog entry named {identifier:?}")]
    NotFound { identifier: String },
    #[error("decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("entry identifier must not be empty")]
    InvalidIdentifier,
    #[error("invalid endpoint url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub user_agent: String,
    pub base_url: String,
    pub timeout: Option<Duration>,
    pub http_client: Option<HttpClient>,
}

pub struct Client {
    http: HttpClient,
    user_agent: String,
    base_url: String,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.user_agent.trim().is_empty() {
            bail!("catalog client user agent required");
        }

        let base_url = if config.base_url.trim().is_empty() {
            POKEAPI_BASE.to_string()
        } else {
            config.base_url.trim().trim_end_matches('/').to_string()
        };
        Url::parse(&base_url).with_context(|| format!("parse catalog base url {base_url:?}"))?;

        let http = match config.http_client {
            Some(client) => client,
            None => HttpClient::builder()
                .timeout(config.timeout.unwrap_or(DEFAULT_TIMEOUT))
                .build()
                .context("build catalog http client")?,
        };

        Ok(Client {
            http,
            user_agent: config.user_agent,
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn fetch_page(&self, limit: usize, offset: usize) -> Result<CatalogPage, CatalogError> {
        let mut url = self.endpoint("pokemon")?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string())
            .append_pair("offset", &offset.to_string());
        let page: PageResponse = self.get_json(url, None)?;
        Ok(page.into_page())
    }

    pub fn fetch_detail(&self, identifier: &str) -> Result<Entry, CatalogError> {
        let identifier = identifier.trim().to_lowercase();
        if identifier.is_empty() {
            return Err(CatalogError::InvalidIdentifier);
        }
        let encoded = utf8_percent_encode(&identifier, PATH_SEGMENT).to_string();
        let url = self.endpoint(&format!("pokemon/{encoded}"))?;
        let detail: DetailResponse = self.get_json(url, Some(&identifier))?;
        Ok(detail.into_entry())
    }

    pub fn fetch_categories(&self) -> Result<Vec<String>, CatalogError> {
        let url = self.endpoint("type")?;
        let listing: NamedListing = self.get_json(url, None)?;
        Ok(listing
            .results
            .into_iter()
            .map(|resource| resource.name)
            .collect())
    }

    pub fn search_references(&self, query: &str) -> Result<Vec<EntryRef>, CatalogError> {
        let needle = query.trim().to_lowercase();
        let page = self.fetch_page(SEARCH_WINDOW, 0)?;
        Ok(page
            .results
            .into_iter()
            .filter(|reference| reference.name.to_lowercase().contains(&needle))
            .collect())
    }

    fn endpoint(&self, path: &str) -> Result<Url, CatalogError> {
        let raw = format!("{}/{}", self.base_url, path);
        Url::parse(&raw).map_err(|source| CatalogError::InvalidUrl { url: raw, source })
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        identifier: Option<&str>,
    ) -> Result<T, CatalogError> {
        let url_text = url.to_string();
        let response = self
            .http
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .map_err(|source| CatalogError::Transport {
                url: url_text.clone(),
                source,
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            if let Some(identifier) = identifier {
                return Err(CatalogError::NotFound {
                    identifier: identifier.to_string(),
                });
            }
        }
        if !status.is_success() {
            return Err(CatalogError::Status {
                url: url_text,
                status,
            });
        }

        response
            .json()
            .map_err(|source| CatalogError::Decode {
                url: url_text,
                source,
            })
    }
}

#[derive(Debug, Clone, Deserialize)]
struct NamedResource {
    name: String,
    #[serde(default)]
    url: String,
}

#[derive(Debug, Clone, Deserialize)]
struct NamedListing {
    #[serde(default)]
    results: Vec<NamedResource>,
}

#[derive(Debug, Clone, Deserialize)]
struct PageResponse {
    #[serde(default)]
    count: u64,
    #[serde(default)]
    next: Option<String>,
    #[serde(default)]
    previous: Option<String>,
    #[serde(default)]
    results: Vec<NamedResource>,
}

impl PageResponse {
    fn into_page(self) -> CatalogPage {
        CatalogPage {
            results: self
                .results
                .into_iter()
                .map(|resource| EntryRef {
                    name: resource.name,
                    url: resource.url,
                })
                .collect(),
            count: self.count,
            next: self.next,
            previous: self.previous,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct DetailResponse {
    id: u32,
    name: String,
    #[serde(default)]
    sprites: Sprites,
    #[serde(default)]
    types: Vec<TypeSlot>,
    #[serde(default)]
    stats: Vec<StatSlot>,
    #[serde(default)]
    abilities: Vec<AbilitySlot>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct Sprites {
    #[serde(default)]
    front_default: Option<String>,
    #[serde(default)]
    back_default: Option<String>,
    #[serde(default)]
    other: Option<OtherSprites>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct OtherSprites {
    #[serde(default, rename = "official-artwork")]
    official_artwork: Option<Artwork>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct Artwork {
    #[serde(default)]
    front_default: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct TypeSlot {
    #[serde(default)]
    slot: u32,
    #[serde(rename = "type")]
    kind: NamedResource,
}

#[derive(Debug, Clone, Deserialize)]
struct StatSlot {
    base_stat: u32,
    stat: NamedResource,
}

#[derive(Debug, Clone, Deserialize)]
struct AbilitySlot {
    #[serde(default)]
    slot: u32,
    ability: NamedResource,
}

impl DetailResponse {
    fn into_entry(self) -> Entry {
        let mut types = self.types;
        types.sort_by_key(|slot| slot.slot);
        let mut abilities = self.abilities;
        abilities.sort_by_key(|slot| slot.slot);

        let artwork = self
            .sprites
            .other
            .and_then(|other| other.official_artwork)
            .and_then(|art| art.front_default);

        Entry {
            id: self.id,
            name: self.name.to_lowercase(),
            images: ImageRefs {
                front: self.sprites.front_default,
                back: self.sprites.back_default,
                artwork,
            },
            categories: types
                .into_iter()
                .map(|slot| slot.kind.name.to_lowercase())
                .collect(),
            stats: self
                .stats
                .into_iter()
                .map(|slot| Stat {
                    name: slot.stat.name,
                    base_value: slot.base_stat,
                })
                .collect(),
            abilities: abilities
                .into_iter()
                .map(|slot| slot.ability.name)
                .collect(),
        }
    }
}
