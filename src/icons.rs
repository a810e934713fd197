//! Icon loading and indicator tinting
//!
//! Loads PNG icons from standard XDG icon directories and caches them. The
//! selection indicator can tint itself from an icon's dominant color when
//! the entry asks for it; entries without a usable icon fall back to the
//! configured frame color.

use std::collections::HashMap;
use std::fs;

/// Icon cache storing loaded RGBA pixel data
pub struct IconCache {
    /// Cached icons: icon_name -> (width, height, rgba_data)
    cache: HashMap<String, Option<IconData>>,
    /// Preferred icon size
    icon_size: u32,
}

/// Loaded icon data
#[derive(Clone)]
pub struct IconData {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>, // RGBA bytes
}

impl IconCache {
    pub fn new(icon_size: u32) -> Self {
        Self {
            cache: HashMap::new(),
            icon_size,
        }
    }

    /// Get or load an icon by name (requires mutable access)
    pub fn get(&mut self, icon_name: &str) -> Option<&IconData> {
        if !self.cache.contains_key(icon_name) {
            let icon_data = self.load_icon(icon_name);
            self.cache.insert(icon_name.to_string(), icon_data);
        }
        self.cache.get(icon_name).and_then(|o| o.as_ref())
    }

    /// Load an icon from disk
    fn load_icon(&self, icon_name: &str) -> Option<IconData> {
        // If it's already a path, try loading directly
        if icon_name.starts_with('/') {
            return self.load_png_file(icon_name);
        }

        let icon_path = self.find_icon(icon_name)?;
        self.load_png_file(&icon_path)
    }

    /// Find icon file path by name
    fn find_icon(&self, icon_name: &str) -> Option<String> {
        let search_paths = self.icon_search_paths();

        // Sizes to try (prefer larger for quality, will be scaled down)
        let sizes = ["256x256", "128x128", "96x96", "64x64", "48x48"];
        let categories = ["apps", "applications", "places", "status"];

        let names_to_try = [icon_name.to_string(), icon_name.to_lowercase()];

        for name in &names_to_try {
            for base_path in &search_paths {
                for size in &sizes {
                    for category in &categories {
                        let path = format!("{}/{}/{}/{}.png", base_path, size, category, name);
                        if fs::metadata(&path).is_ok() {
                            return Some(path);
                        }
                    }
                }
            }

            // Pixmaps as fallback
            let pixmap = format!("/usr/share/pixmaps/{}.png", name);
            if fs::metadata(&pixmap).is_ok() {
                return Some(pixmap);
            }
        }

        tracing::debug!("Icon not found: {}", icon_name);
        None
    }

    fn icon_search_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();

        if let Ok(home) = std::env::var("HOME") {
            paths.push(format!("{}/.local/share/icons/hicolor", home));
            paths.push(format!("{}/.icons/hicolor", home));
        }

        let themes = ["Adwaita", "gnome", "hicolor", "mate"];
        for theme in &themes {
            paths.push(format!("/usr/share/icons/{}", theme));
        }

        paths
    }

    /// Load a PNG icon file
    fn load_png_file(&self, path: &str) -> Option<IconData> {
        let data = fs::read(path).ok()?;

        let img = image::load_from_memory(&data).ok()?;
        let rgba = img.to_rgba8();

        // Resize to target size if needed
        let (width, height) = (rgba.width(), rgba.height());
        let target = self.icon_size;

        let final_img = if width != target || height != target {
            image::imageops::resize(&rgba, target, target, image::imageops::FilterType::Lanczos3)
        } else {
            rgba
        };

        tracing::debug!("Loaded icon: {} ({}x{} -> {}x{})", path, width, height, target, target);

        Some(IconData {
            width: target,
            height: target,
            data: final_img.into_raw(),
        })
    }
}

/// Dominant color of an RGBA image, for tinting the selection indicator.
/// Transparent pixels are skipped; images with nothing opaque fall back to
/// `fallback`. Colors are bucketed to 4 bits per channel and the average of
/// the most common bucket wins, so anti-aliased edges don't dominate.
pub fn dominant_color(icon: &IconData, fallback: [f32; 4]) -> [f32; 4] {
    let mut buckets: HashMap<(u8, u8, u8), (u64, u64, u64, u64)> = HashMap::new();

    for px in icon.data.chunks_exact(4) {
        let (r, g, b, a) = (px[0], px[1], px[2], px[3]);
        if a < 128 {
            continue;
        }
        let key = (r >> 4, g >> 4, b >> 4);
        let bucket = buckets.entry(key).or_insert((0, 0, 0, 0));
        bucket.0 += r as u64;
        bucket.1 += g as u64;
        bucket.2 += b as u64;
        bucket.3 += 1;
    }

    let Some((_, (r, g, b, count))) = buckets
        .into_iter()
        .max_by_key(|(_, (_, _, _, count))| *count)
    else {
        return fallback;
    };

    [
        (r / count) as f32 / 255.0,
        (g / count) as f32 / 255.0,
        (b / count) as f32 / 255.0,
        1.0,
    ]
}
