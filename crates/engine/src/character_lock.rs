//! Character lock: pins a reference character (and optionally a product and a
//! brand palette) into every generation prompt so that storyboard frames and
//! video takes of the same project stay visually consistent.
//!
//! Everything here is plain string templating. The output depends only on the
//! inputs, so the same configuration always produces the same prompt.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharacterReference {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub reference_image_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductReference {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub reference_image_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharacterLockConfig {
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    pub character: CharacterReference,
    #[serde(default)]
    pub product: Option<ProductReference>,
    /// Hex colors (`#RRGGBB`) the frame should favour.
    #[serde(default)]
    pub brand_palette: Vec<String>,
}

fn enabled_by_default() -> bool {
    true
}

/// Append the lock instructions to `base`.
///
/// A disabled lock returns `base` untouched. Optional sections (reference
/// image, product, palette) are emitted only when their field is set.
pub fn build_locked_prompt(base: &str, config: &CharacterLockConfig) -> String {
    if !config.enabled {
        return base.to_string();
    }

    let mut sections: Vec<String> = vec![base.trim().to_string()];

    let character = &config.character;
    sections.push(format!(
        "CHARACTER CONSISTENCY: The main character is {}. {} Keep their face, \
         hairstyle, body type, wardrobe and age identical in every frame.",
        character.name.trim(),
        character.description.trim()
    ));

    if let Some(url) = non_empty(&character.reference_image_url) {
        sections.push(format!(
            "REFERENCE IMAGE: Match the character exactly as shown in {}.",
            url
        ));
    }

    if let Some(product) = &config.product {
        let mut block = format!(
            "PRODUCT PLACEMENT: Feature {} naturally in the scene. {}",
            product.name.trim(),
            product.description.trim()
        );
        if let Some(url) = non_empty(&product.reference_image_url) {
            block.push_str(&format!(" Match the product as shown in {}.", url));
        }
        sections.push(block);
    }

    if !config.brand_palette.is_empty() {
        sections.push(format!(
            "BRAND PALETTE: Favour these colors in wardrobe, set dressing and \
             grading: {}.",
            config.brand_palette.join(", ")
        ));
    }

    sections.push(
        "Do not alter the character's identity between shots. Consistency takes \
         priority over stylistic variation."
            .to_string(),
    );

    sections.join("\n\n")
}

/// Reference images to pass as conditioning inputs, character first.
pub fn reference_images(config: &CharacterLockConfig) -> Vec<&str> {
    if !config.enabled {
        return Vec::new();
    }
    let mut urls = Vec::new();
    if let Some(url) = non_empty(&config.character.reference_image_url) {
        urls.push(url);
    }
    if let Some(url) = config
        .product
        .as_ref()
        .and_then(|p| non_empty(&p.reference_image_url))
    {
        urls.push(url);
    }
    urls
}

pub fn validate_palette(palette: &[String]) -> EngineResult<()> {
    for color in palette {
        let valid = color.len() == 7
            && color.starts_with('#')
            && color[1..].chars().all(|c| c.is_ascii_hexdigit());
        if !valid {
            return Err(EngineError::Validation(format!(
                "palette color must look like #RRGGBB, got {:?}",
                color
            )));
        }
    }
    Ok(())
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
