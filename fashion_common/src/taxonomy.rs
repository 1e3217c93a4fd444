//! Clothing type normalization and style category lookup.
//!
//! Both mappings are plain constant tables so they can be audited and extended
//! without touching the matching code.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Normalized clothing type, e.g. `t-shirt` or `dress-pants`.
///
/// Labels the taxonomy does not know pass through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClothingType(String);

impl ClothingType {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this type is one of the table entries rather than a passthrough label.
    pub fn is_known(&self) -> bool {
        CLOTHING_TYPES.iter().any(|(name, _)| *name == self.0)
    }
}

impl fmt::Display for ClothingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ClothingType {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StyleCategory {
    Casual,
    ClassyElegant,
    BusinessOffice,
    BusinessCasual,
    Streetwear,
    Athleisure,
    Bohemian,
    Minimalist,
    Preppy,
    Grunge,
    VintageRetro,
    Y2k,
    EdgyPunk,
    Goth,
    Chic,
    Romantic,
    Cottagecore,
    ArtsyEclectic,
    AvantGarde,
    ResortCruise,
    EveningFormal,
}

impl StyleCategory {
    pub const ALL: [StyleCategory; 21] = [
        StyleCategory::Casual,
        StyleCategory::ClassyElegant,
        StyleCategory::BusinessOffice,
        StyleCategory::BusinessCasual,
        StyleCategory::Streetwear,
        StyleCategory::Athleisure,
        StyleCategory::Bohemian,
        StyleCategory::Minimalist,
        StyleCategory::Preppy,
        StyleCategory::Grunge,
        StyleCategory::VintageRetro,
        StyleCategory::Y2k,
        StyleCategory::EdgyPunk,
        StyleCategory::Goth,
        StyleCategory::Chic,
        StyleCategory::Romantic,
        StyleCategory::Cottagecore,
        StyleCategory::ArtsyEclectic,
        StyleCategory::AvantGarde,
        StyleCategory::ResortCruise,
        StyleCategory::EveningFormal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StyleCategory::Casual => "casual",
            StyleCategory::ClassyElegant => "classy-elegant",
            StyleCategory::BusinessOffice => "business-office",
            StyleCategory::BusinessCasual => "business-casual",
            StyleCategory::Streetwear => "streetwear",
            StyleCategory::Athleisure => "athleisure",
            StyleCategory::Bohemian => "bohemian",
            StyleCategory::Minimalist => "minimalist",
            StyleCategory::Preppy => "preppy",
            StyleCategory::Grunge => "grunge",
            StyleCategory::VintageRetro => "vintage-retro",
            StyleCategory::Y2k => "y2k",
            StyleCategory::EdgyPunk => "edgy-punk",
            StyleCategory::Goth => "goth",
            StyleCategory::Chic => "chic",
            StyleCategory::Romantic => "romantic",
            StyleCategory::Cottagecore => "cottagecore",
            StyleCategory::ArtsyEclectic => "artsy-eclectic",
            StyleCategory::AvantGarde => "avant-garde",
            StyleCategory::ResortCruise => "resort-cruise",
            StyleCategory::EveningFormal => "evening-formal",
        }
    }

    /// Items listed under this style.
    pub fn items(&self) -> &'static [&'static str] {
        STYLE_ITEMS
            .iter()
            .find(|(style, _)| style == self)
            .map(|(_, items)| *items)
            .unwrap_or(&[])
    }
}

impl fmt::Display for StyleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Clothing types and the detector labels / synonyms that map onto them.
pub const CLOTHING_TYPES: &[(&str, &[&str])] = &[
    // tops
    ("t-shirt", &["t-shirt", "tee", "tank", "tank top", "basic tee"]),
    ("button-shirt", &["button-up", "dress shirt", "button shirt", "formal shirt"]),
    ("polo", &["polo shirt", "polo", "collared shirt"]),
    ("hoodie", &["hoodie", "sweatshirt", "pullover"]),
    ("sweater", &["sweater", "jumper", "cardigan", "knitwear"]),
    ("blazer", &["blazer", "sport coat", "suit jacket"]),
    ("jacket", &["jacket", "coat", "outerwear"]),
    ("blouse", &["blouse", "silk shirt", "dressy top"]),
    ("crop-top", &["crop top", "cropped shirt", "belly shirt"]),
    ("tube-top", &["tube top", "bandeau", "strapless top"]),
    // bottoms
    ("jeans", &["jeans", "denim pants", "blue jeans"]),
    ("cargo-pants", &["cargo pants", "utility pants", "tactical pants"]),
    ("dress-pants", &["dress pants", "slacks", "trousers", "formal pants"]),
    ("chinos", &["chinos", "khakis", "casual pants"]),
    ("shorts", &["shorts", "short pants"]),
    ("cargo-shorts", &["cargo shorts", "utility shorts"]),
    ("skirt", &["skirt", "mini skirt", "maxi skirt", "pencil skirt"]),
    ("leggings", &["leggings", "tights", "yoga pants"]),
    ("joggers", &["joggers", "track pants", "sweatpants"]),
    // dresses
    ("dress", &["dress", "gown", "frock"]),
    ("maxi-dress", &["maxi dress", "long dress"]),
    ("mini-dress", &["mini dress", "short dress"]),
    ("cocktail-dress", &["cocktail dress", "party dress"]),
    // footwear
    ("sneakers", &["sneakers", "trainers", "athletic shoes"]),
    ("boots", &["boots", "ankle boots", "combat boots"]),
    ("loafers", &["loafers", "slip-on shoes", "moccasins"]),
    ("heels", &["high heels", "pumps", "stilettos"]),
    ("sandals", &["sandals", "flip-flops", "slides"]),
    // accessories
    ("hat", &["hat", "cap", "beanie", "baseball cap"]),
    ("bag", &["bag", "handbag", "purse", "backpack"]),
    ("belt", &["belt", "waist belt", "leather belt"]),
];

/// Items that belong to each style, in declaration order of [`StyleCategory`].
pub const STYLE_ITEMS: &[(StyleCategory, &[&str])] = &[
    (
        StyleCategory::Casual,
        &[
            "t-shirt", "jeans", "hoodie", "sneakers", "shorts", "cargo-shorts", "joggers",
            "tank-top", "polo", "chinos", "sandals", "cap",
        ],
    ),
    (
        StyleCategory::ClassyElegant,
        &[
            "blazer", "dress-pants", "button-shirt", "blouse", "pencil-skirt", "cocktail-dress",
            "heels", "loafers", "silk-blouse", "tailored-pants",
        ],
    ),
    (
        StyleCategory::BusinessOffice,
        &[
            "blazer", "dress-pants", "button-shirt", "blouse", "suit-jacket", "formal-shirt",
            "pencil-skirt", "dress-shoes", "briefcase",
        ],
    ),
    (
        StyleCategory::BusinessCasual,
        &[
            "chinos", "loafers", "cardigan", "polo", "blouse", "khakis", "casual-blazer",
            "dress-pants", "button-shirt",
        ],
    ),
    (
        StyleCategory::Streetwear,
        &[
            "t-shirt", "hoodie", "sneakers", "cap", "graphic-tee", "joggers", "track-jacket",
            "oversized-hoodie", "basketball-shorts",
        ],
    ),
    (
        StyleCategory::Athleisure,
        &[
            "leggings", "joggers", "track-jacket", "athletic-shoes", "sports-bra", "tank-top",
            "sweatshirt", "running-shoes", "yoga-pants",
        ],
    ),
    (
        StyleCategory::Bohemian,
        &[
            "maxi-dress", "flowy-dress", "peasant-blouse", "fringe-jacket", "sandals",
            "wide-leg-pants", "crochet-top", "earthy-tones",
        ],
    ),
    (
        StyleCategory::Minimalist,
        &[
            "simple-tee", "straight-pants", "clean-blazer", "white-shirt", "black-pants",
            "neutral-dress", "simple-sneakers",
        ],
    ),
    (
        StyleCategory::Preppy,
        &[
            "polo", "pleated-skirt", "loafers", "cardigan", "khakis", "button-down",
            "tennis-shoes", "blazer",
        ],
    ),
    (
        StyleCategory::Grunge,
        &[
            "flannel", "ripped-jeans", "band-tee", "combat-boots", "leather-jacket", "torn-pants",
            "oversized-shirt",
        ],
    ),
    (
        StyleCategory::VintageRetro,
        &[
            "vintage-dress", "flare-jeans", "retro-tee", "vintage-jacket", "classic-sneakers",
            "mom-jeans", "vintage-blouse",
        ],
    ),
    (
        StyleCategory::Y2k,
        &[
            "baby-tee", "low-rise-jeans", "platform-shoes", "metallic-top", "mini-skirt",
            "sparkly-accessories", "crop-top",
        ],
    ),
    (
        StyleCategory::EdgyPunk,
        &[
            "leather-jacket", "ripped-jeans", "studded-belt", "combat-boots", "band-tee",
            "plaid-pants", "spiked-accessories",
        ],
    ),
    (
        StyleCategory::Goth,
        &[
            "black-dress", "corset", "platform-boots", "black-lace", "dark-makeup", "black-jacket",
            "gothic-accessories",
        ],
    ),
    (
        StyleCategory::Chic,
        &[
            "tailored-blazer", "high-quality-jeans", "silk-blouse", "designer-bag",
            "stylish-heels", "trendy-dress", "fashion-forward-pieces",
        ],
    ),
    (
        StyleCategory::Romantic,
        &[
            "floral-dress", "ruffled-blouse", "pastel-colors", "lace-top", "flowing-skirt",
            "delicate-jewelry", "soft-cardigan",
        ],
    ),
    (
        StyleCategory::Cottagecore,
        &[
            "flowy-dress", "puff-sleeves", "apron", "peasant-blouse", "midi-skirt", "cardigans",
            "vintage-inspired",
        ],
    ),
    (
        StyleCategory::ArtsyEclectic,
        &[
            "colorful-prints", "unusual-silhouettes", "bold-patterns", "artistic-pieces",
            "unique-combinations", "statement-pieces",
        ],
    ),
    (
        StyleCategory::AvantGarde,
        &[
            "architectural-shapes", "asymmetrical-pieces", "experimental-design",
            "unconventional-silhouettes", "futuristic-elements",
        ],
    ),
    (
        StyleCategory::ResortCruise,
        &[
            "linen-sets", "kaftans", "straw-hats", "flowy-pants", "beach-dress", "sandals",
            "light-fabrics",
        ],
    ),
    (
        StyleCategory::EveningFormal,
        &[
            "gown", "tuxedo", "cocktail-dress", "formal-suit", "dress-shoes", "elegant-heels",
            "formal-accessories",
        ],
    ),
];

/// Keyword fallback used when neither exact nor fuzzy synonym matching hits.
const TYPE_KEYWORDS: &[(&[&str], &str)] = &[
    (&["shirt", "top", "blouse"], "t-shirt"),
    (&["pants", "jeans", "trouser"], "jeans"),
    (&["dress", "gown"], "dress"),
    (&["shoe", "boot", "sneaker"], "sneakers"),
    (&["jacket", "coat"], "jacket"),
];

/// Styles inferred from the type name when no style lists it.
const STYLE_FALLBACKS: &[(&[&str], &[StyleCategory])] = &[
    (
        &["t-shirt", "jeans", "hoodie", "sneakers"],
        &[StyleCategory::Casual, StyleCategory::Streetwear],
    ),
    (
        &["blazer", "dress-pants", "button-shirt"],
        &[StyleCategory::BusinessOffice, StyleCategory::ClassyElegant],
    ),
    (
        &["dress", "gown", "heels"],
        &[StyleCategory::ClassyElegant, StyleCategory::EveningFormal],
    ),
    (&["athletic", "sports", "gym"], &[StyleCategory::Athleisure]),
    (&["vintage", "retro"], &[StyleCategory::VintageRetro]),
];

/// Labels that count as wearable items (or people wearing them).
pub const FASHION_KEYWORDS: &[&str] = &[
    "person", "shirt", "pants", "dress", "jacket", "shoes", "bag", "hat", "skirt", "shorts",
    "coat", "hoodie", "sweater", "jeans", "boots", "sneakers", "sandals", "t-shirt", "blouse",
    "blazer", "tie", "socks", "gloves", "scarf", "belt", "backpack", "handbag", "sunglasses",
];

/// Maps a raw detector label onto a [`ClothingType`].
///
/// Tries the type names and synonyms exactly (case-insensitive), then substring
/// matches in either direction, then a keyword fallback. Unknown labels are
/// returned unchanged.
pub fn normalize_clothing_type(raw_label: &str) -> ClothingType {
    let label = raw_label.trim().to_lowercase();
    if label.is_empty() {
        return ClothingType(raw_label.to_string());
    }

    if let Some((name, _)) = CLOTHING_TYPES.iter().find(|(name, _)| *name == label) {
        return ClothingType(name.to_string());
    }

    if let Some((name, _)) = CLOTHING_TYPES
        .iter()
        .find(|(_, synonyms)| synonyms.iter().any(|s| *s == label))
    {
        return ClothingType(name.to_string());
    }

    if let Some((name, _)) = CLOTHING_TYPES.iter().find(|(_, synonyms)| {
        synonyms
            .iter()
            .any(|s| label.contains(s) || s.contains(label.as_str()))
    }) {
        return ClothingType(name.to_string());
    }

    if let Some((_, name)) = TYPE_KEYWORDS
        .iter()
        .find(|(terms, _)| terms.iter().any(|t| label.contains(t)))
    {
        return ClothingType(name.to_string());
    }

    log::debug!("No clothing type for label {raw_label:?}, passing it through");
    ClothingType(raw_label.to_string())
}

/// Style categories whose item lists contain `clothing_type`, in declaration
/// order. Falls back to keyword inference and never returns an empty list.
pub fn applicable_styles(clothing_type: &ClothingType) -> Vec<StyleCategory> {
    let needle = clothing_type.as_str().to_lowercase();
    let styles: Vec<StyleCategory> = STYLE_ITEMS
        .iter()
        .filter(|(_, items)| items.contains(&needle.as_str()))
        .map(|(style, _)| *style)
        .collect();
    if !styles.is_empty() {
        return styles;
    }

    STYLE_FALLBACKS
        .iter()
        .find(|(terms, _)| terms.iter().any(|t| needle.contains(t)))
        .map(|(_, styles)| styles.to_vec())
        .unwrap_or_else(|| vec![StyleCategory::Casual])
}

/// Whether a detector label names something wearable.
pub fn is_fashion_item(label: &str) -> bool {
    let label = label.to_lowercase();
    FASHION_KEYWORDS.iter().any(|k| label.contains(k))
}

/// Guesses a clothing type from the proportions of a photo of a single item.
pub fn infer_type_from_shape(width: u32, height: u32) -> ClothingType {
    let aspect = if width == 0 {
        1.0
    } else {
        height as f32 / width as f32
    };
    let name = if aspect > 1.5 {
        "dress"
    } else if aspect < 0.8 {
        "pants"
    } else {
        "t-shirt"
    };
    ClothingType(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn styles_of(label: &str) -> Vec<&'static str> {
        applicable_styles(&normalize_clothing_type(label))
            .iter()
            .map(|s| s.as_str())
            .collect()
    }

    #[test]
    fn exact_synonym_match() {
        assert_eq!(normalize_clothing_type("Tee").as_str(), "t-shirt");
        assert_eq!(normalize_clothing_type("slacks").as_str(), "dress-pants");
        assert_eq!(normalize_clothing_type("HANDBAG").as_str(), "bag");
        assert_eq!(normalize_clothing_type("cardigan").as_str(), "sweater");
    }

    #[test]
    fn fuzzy_match_in_either_direction() {
        // label contains a synonym
        assert_eq!(normalize_clothing_type("red hoodie zip").as_str(), "hoodie");
        // synonym contains the label
        assert_eq!(normalize_clothing_type("sweatpant").as_str(), "joggers");
    }

    #[test]
    fn keyword_fallback_and_passthrough() {
        assert_eq!(normalize_clothing_type("nightgown").as_str(), "dress");
        assert_eq!(normalize_clothing_type("overshirt").as_str(), "t-shirt");
        assert_eq!(normalize_clothing_type("umbrella").as_str(), "umbrella");
        assert!(!normalize_clothing_type("umbrella").is_known());
    }

    #[test]
    fn type_names_normalize_to_themselves() {
        for (name, _) in CLOTHING_TYPES {
            assert_eq!(normalize_clothing_type(name).as_str(), *name);
        }
    }

    #[test]
    fn styles_from_tables() {
        assert_eq!(styles_of("t-shirt"), vec!["casual", "streetwear"]);
        assert_eq!(
            styles_of("blazer"),
            vec!["classy-elegant", "business-office", "preppy"]
        );
        assert_eq!(styles_of("crop top"), vec!["y2k"]);
        assert_eq!(styles_of("sandals"), vec!["casual", "bohemian", "resort-cruise"]);
    }

    #[test]
    fn styles_fallback_rules() {
        assert_eq!(
            styles_of("dress"),
            vec!["classy-elegant", "evening-formal"]
        );
        assert_eq!(
            applicable_styles(&normalize_clothing_type("gym vest")),
            vec![StyleCategory::Athleisure]
        );
        assert_eq!(
            applicable_styles(&normalize_clothing_type("retro visor")),
            vec![StyleCategory::VintageRetro]
        );
        assert_eq!(styles_of("umbrella"), vec!["casual"]);
    }

    #[test]
    fn style_names_match_serde() {
        for style in StyleCategory::ALL {
            let json = serde_json::to_string(&style).unwrap();
            assert_eq!(json, format!("\"{}\"", style.as_str()));
            assert!(!style.items().is_empty());
        }
        assert_eq!(STYLE_ITEMS.len(), StyleCategory::ALL.len());
    }

    #[test]
    fn fashion_keywords() {
        assert!(is_fashion_item("person"));
        assert!(is_fashion_item("Handbag"));
        assert!(is_fashion_item("tie"));
        assert!(!is_fashion_item("car"));
        assert!(!is_fashion_item("clothing_item"));
    }

    #[test]
    fn shape_inference() {
        assert_eq!(infer_type_from_shape(100, 200).as_str(), "dress");
        assert_eq!(infer_type_from_shape(200, 100).as_str(), "pants");
        assert_eq!(infer_type_from_shape(100, 100).as_str(), "t-shirt");
    }
}
