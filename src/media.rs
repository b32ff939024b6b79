use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;

use crate::error::FetchError;
use crate::types::{Includes, Item, MediaDescriptor, MediaType, Variant};

/// A media attachment resolved to a concrete URL and output file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPlan {
    pub kind: MediaType,
    pub url: String,
    pub file_name: String,
}

// Per-item running numbers, one per media role.
#[derive(Default)]
struct RoleCounters {
    photo: usize,
    video: usize,
    gif: usize,
}

impl RoleCounters {
    fn next(&mut self, kind: &MediaType) -> Option<usize> {
        let slot = match kind {
            MediaType::Photo => &mut self.photo,
            MediaType::Video => &mut self.video,
            MediaType::AnimatedGif => &mut self.gif,
            MediaType::Other(_) => return None,
        };
        *slot += 1;
        Some(*slot)
    }
}

/// Resolve every attachment of `item` against the batch's includes table.
///
/// Keys missing from the table, unknown media types and descriptors without a
/// usable URL are skipped. File names are `<role>_<n><ext>` where `n` counts
/// attachments of that role within the item.
pub fn resolve_media(item: &Item, includes: &Includes) -> Vec<MediaPlan> {
    let mut counters = RoleCounters::default();
    let mut plans = Vec::new();
    for key in item.media_keys() {
        let Some(desc) = includes.find_media(key) else {
            tracing::debug!(post = %item.id, media_key = %key, "media key not in includes");
            continue;
        };
        let (Some(role), Some(n)) = (desc.kind.role(), counters.next(&desc.kind)) else {
            continue;
        };
        let Some(url) = select_url(desc) else {
            tracing::debug!(post = %item.id, media_key = %key, "no downloadable url");
            continue;
        };
        let ext = media_extension(&desc.kind, url);
        plans.push(MediaPlan { kind: desc.kind.clone(), url: url.to_string(), file_name: format!("{role}_{n}{ext}") });
    }
    plans
}

fn select_url(desc: &MediaDescriptor) -> Option<&str> {
    match desc.kind {
        MediaType::Photo => desc.url.as_deref().filter(|u| !u.is_empty()),
        MediaType::Video => best_variant(desc.variants()),
        MediaType::AnimatedGif => desc.variants().first().and_then(|v| v.url.as_deref()).filter(|u| !u.is_empty()),
        MediaType::Other(_) => None,
    }
}

/// URL of the variant with the strictly highest bitrate. Variants without a
/// bitrate (streaming playlists) or without a URL never win.
pub fn best_variant(variants: &[Variant]) -> Option<&str> {
    let mut best: Option<(u64, &str)> = None;
    for v in variants {
        let (Some(rate), Some(url)) = (v.bit_rate, v.url.as_deref()) else { continue };
        if url.is_empty() {
            continue;
        }
        if rate > best.map_or(0, |(r, _)| r) {
            best = Some((rate, url));
        }
    }
    best.map(|(_, url)| url)
}

pub fn media_extension(kind: &MediaType, url: &str) -> &'static str {
    match kind {
        MediaType::Photo => photo_extension(url),
        MediaType::Video => ".mp4",
        MediaType::AnimatedGif => ".gif",
        MediaType::Other(_) => ".bin",
    }
}

fn photo_extension(url: &str) -> &'static str {
    let path = match url::Url::parse(url) {
        Ok(u) => u.path().to_ascii_lowercase(),
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_ascii_lowercase(),
    };
    if path.ends_with(".png") {
        ".png"
    } else if path.ends_with(".webp") {
        ".webp"
    } else {
        // .jpg, .jpeg and anything unrecognised
        ".jpg"
    }
}

/// Downloads one URL to a file.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Returns the number of bytes written.
    async fn download(&self, url: &str, dest: &Path) -> Result<u64, FetchError>;
}

pub struct HttpMediaFetcher {
    client: reqwest::Client,
}

impl HttpMediaFetcher {
    /// `timeout` bounds connecting and each read, not the whole transfer.
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl MediaFetcher for HttpMediaFetcher {
    async fn download(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
        let resp = self.client.get(url).send().await?.error_for_status()?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = resp.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(written)
    }
}

/// Download every plan into `dir`. Individual failures are logged and skipped.
/// Returns how many files were written.
pub async fn download_all(plans: &[MediaPlan], dir: &Path, fetcher: &dyn MediaFetcher) -> usize {
    let mut saved = 0;
    for plan in plans {
        let dest = dir.join(&plan.file_name);
        tracing::info!(file = %plan.file_name, "downloading media");
        match fetcher.download(&plan.url, &dest).await {
            Ok(bytes) => {
                tracing::debug!(file = %dest.display(), bytes, "media saved");
                saved += 1;
            }
            Err(e) => {
                tracing::warn!(url = %plan.url, file = %dest.display(), error = %e, "media download failed");
                // drop any partial file
                let _ = tokio::fs::remove_file(&dest).await;
            }
        }
    }
    saved
}
